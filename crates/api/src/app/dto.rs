use chrono::{DateTime, Utc};
use serde::Deserialize;

use kitroom_core::EmployeeId;
use kitroom_ledger::Grade;
use kitroom_store::BatchReturnEntry;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterItemRequest {
    pub kind: String,
    pub color: String,
    pub size: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub kind: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub employee_id: EmployeeId,
    pub item_code: i64,
    pub quantity: i64,
    pub reason: String,
    pub issued_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    pub grade: Grade,
    pub returned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct BatchReturnRequest {
    pub returns: Vec<BatchReturnEntry>,
    pub returned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CorrectGradeRequest {
    pub grade: Grade,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub item_code: i64,
    pub quantity: i64,
    pub supplier: Option<String>,
    pub note: Option<String>,
    pub ordered_at: Option<DateTime<Utc>>,
}
