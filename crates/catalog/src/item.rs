use serde::{Deserialize, Serialize};

use kitroom_core::{DomainError, DomainResult, Entity, ItemCode};

/// Catalog entry: one distinct workwear item definition.
///
/// Identity is the numeric code; the (kind, color, size) tuple must be unique
/// across the catalog. Attributes are mutable, the code never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    code: ItemCode,
    kind: String,
    color: String,
    size: String,
}

impl Item {
    /// Rebuild an item from stored fields. No validation; storage is trusted
    /// to only hold rows that passed [`ItemDraft`] validation on the way in.
    pub fn from_parts(code: ItemCode, kind: String, color: String, size: String) -> Self {
        Self {
            code,
            kind,
            color,
            size,
        }
    }

    pub fn code(&self) -> ItemCode {
        self.code
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    /// The uniqueness key of this item.
    pub fn attribute_tuple(&self) -> (&str, &str, &str) {
        (&self.kind, &self.color, &self.size)
    }

    /// Apply a validated patch, returning whether anything changed.
    pub fn apply_patch(&mut self, patch: &ItemPatch) -> bool {
        let mut changed = false;
        if let Some(kind) = &patch.kind {
            if *kind != self.kind {
                self.kind = kind.clone();
                changed = true;
            }
        }
        if let Some(color) = &patch.color {
            if *color != self.color {
                self.color = color.clone();
                changed = true;
            }
        }
        if let Some(size) = &patch.size {
            if *size != self.size {
                self.size = size.clone();
                changed = true;
            }
        }
        changed
    }
}

impl Entity for Item {
    type Id = ItemCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }
}

/// Validated attributes for a not-yet-registered item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub kind: String,
    pub color: String,
    pub size: String,
}

impl ItemDraft {
    /// Trim and validate the attribute tuple. All three are required.
    pub fn new(
        kind: impl Into<String>,
        color: impl Into<String>,
        size: impl Into<String>,
    ) -> DomainResult<Self> {
        Ok(Self {
            kind: required_attribute("kind", kind.into())?,
            color: required_attribute("color", color.into())?,
            size: required_attribute("size", size.into())?,
        })
    }

    /// Materialize the draft under an assigned code.
    pub fn into_item(self, code: ItemCode) -> Item {
        Item {
            code,
            kind: self.kind,
            color: self.color,
            size: self.size,
        }
    }
}

/// Partial attribute update for an existing item. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemPatch {
    pub kind: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl ItemPatch {
    /// Trim and validate every present field.
    pub fn validated(self) -> DomainResult<Self> {
        Ok(Self {
            kind: self
                .kind
                .map(|v| required_attribute("kind", v))
                .transpose()?,
            color: self
                .color
                .map(|v| required_attribute("color", v))
                .transpose()?,
            size: self
                .size
                .map(|v| required_attribute("size", v))
                .transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.color.is_none() && self.size.is_none()
    }
}

fn required_attribute(name: &str, value: String) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{name} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Assign the code for the next registration.
///
/// Codes grow strictly from the highest code on record, clamped so a fresh
/// registration never lands below [`ItemCode::FLOOR`] even when legacy rows
/// carry smaller codes.
pub fn next_code(current_max: Option<i64>) -> ItemCode {
    let base = current_max.unwrap_or(0).max(ItemCode::FLOOR - 1);
    ItemCode::new(base + 1).expect("code floor arithmetic yields a positive code")
}
