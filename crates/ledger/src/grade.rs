use core::str::FromStr;

use serde::{Deserialize, Serialize};

use kitroom_core::DomainError;

/// Quality classification of physical stock.
///
/// Grades partition quantity-on-hand per item: every bucket is keyed by
/// (item code, grade). Issues always draw from [`Grade::New`]; returns land
/// in whatever grade the item comes back in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    New,
    Good,
    Used,
    Damaged,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::New, Grade::Good, Grade::Used, Grade::Damaged];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::New => "new",
            Grade::Good => "good",
            Grade::Used => "used",
            Grade::Damaged => "damaged",
        }
    }
}

impl core::fmt::Display for Grade {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Grade::New),
            "good" => Ok(Grade::Good),
            "used" => Ok(Grade::Used),
            "damaged" => Ok(Grade::Damaged),
            other => Err(DomainError::validation(format!(
                "unknown grade: {other:?} (expected one of: new, good, used, damaged)"
            ))),
        }
    }
}
