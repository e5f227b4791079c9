//! Loan (borrow) records shared by every item kind, and their API views

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Loan lifecycle state.
///
/// `Overdue` is derived from the due date on every read; the stored column is
/// only a cached copy refreshed whenever the engine touches the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "ACTIVE",
            LoanStatus::Overdue => "OVERDUE",
            LoanStatus::Returned => "RETURNED",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(LoanStatus::Active),
            "OVERDUE" => Ok(LoanStatus::Overdue),
            "RETURNED" => Ok(LoanStatus::Returned),
            other => Err(AppError::Validation(format!("Unknown loan status: {}", other))),
        }
    }
}

/// Loan row, identical for book and apparatus loans
#[derive(Debug, Clone, FromRow)]
pub struct LoanRecord {
    pub id: i32,
    pub student_id: i32,
    pub item_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub extensions_used: i32,
    pub fine_amount: Decimal,
    pub fine_paid: bool,
    pub is_damaged: bool,
    pub status: String,
}

impl LoanRecord {
    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }

    pub fn status(&self) -> LoanStatus {
        if self.is_returned() {
            return LoanStatus::Returned;
        }
        self.status.parse().unwrap_or(LoanStatus::Active)
    }

    pub fn set_status(&mut self, status: LoanStatus) {
        self.status = status.as_str().to_string();
    }
}

/// Loan row joined with item and student labels for display
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    #[sqlx(flatten)]
    pub loan: LoanRecord,
    pub item_label: String,
    pub student_name: String,
    pub roll_number: String,
}

/// Catalog item as seen by the loan engine, whatever its kind
#[derive(Debug, Clone, FromRow)]
pub struct CatalogEntry {
    pub id: i32,
    pub label: String,
    pub total: i32,
    pub available: i32,
    /// Loans of this item cannot be extended
    pub extension_exempt: bool,
    /// Fixed fine charged on a damaged return
    pub damage_fine: Decimal,
}

/// Book loan as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookLoanView {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub student_id: i32,
    pub student_name: String,
    pub roll_number: String,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub extensions_used: i32,
    pub fine_amount: Decimal,
    pub fine_paid: bool,
    pub status: LoanStatus,
}

impl From<LoanRow> for BookLoanView {
    fn from(row: LoanRow) -> Self {
        let status = row.loan.status();
        Self {
            id: row.loan.id,
            book_id: row.loan.item_id,
            book_title: row.item_label,
            student_id: row.loan.student_id,
            student_name: row.student_name,
            roll_number: row.roll_number,
            borrowed_at: row.loan.borrowed_at,
            due_date: row.loan.due_date,
            returned_at: row.loan.returned_at,
            extensions_used: row.loan.extensions_used,
            fine_amount: row.loan.fine_amount,
            fine_paid: row.loan.fine_paid,
            status,
        }
    }
}

/// Apparatus loan as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApparatusLoanView {
    pub id: i32,
    pub apparatus_id: i32,
    pub apparatus_name: String,
    pub student_id: i32,
    pub student_name: String,
    pub roll_number: String,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub is_damaged: bool,
    pub damage_fine: Decimal,
    pub fine_paid: bool,
    pub status: LoanStatus,
}

impl From<LoanRow> for ApparatusLoanView {
    fn from(row: LoanRow) -> Self {
        let status = row.loan.status();
        Self {
            id: row.loan.id,
            apparatus_id: row.loan.item_id,
            apparatus_name: row.item_label,
            student_id: row.loan.student_id,
            student_name: row.student_name,
            roll_number: row.roll_number,
            borrow_date: row.loan.borrowed_at,
            return_date: row.loan.returned_at,
            is_damaged: row.loan.is_damaged,
            damage_fine: row.loan.fine_amount,
            fine_paid: row.loan.fine_paid,
            status,
        }
    }
}

/// Borrow request; the student is given by id or by badge
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLoan {
    /// Book or apparatus ID
    pub item_id: i32,
    pub student_id: Option<i32>,
    #[validate(length(min = 1, max = 50, message = "rfid_uid must not be empty"))]
    pub rfid_uid: Option<String>,
}

/// Return request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnLoan {
    /// Apparatus only: the unit came back damaged
    pub is_damaged: Option<bool>,
    /// Return time to record (RFC 3339 or YYYY-MM-DD); defaults to now
    pub as_of: Option<String>,
}

/// Requested return time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsOf {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

impl AsOf {
    /// Resolve against the borrow time. A bare date means the start of that
    /// UTC day, except on the borrow day itself where it means the borrow time.
    pub fn resolve(self, borrowed_at: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            AsOf::Instant(at) => at,
            AsOf::Day(day) if day == borrowed_at.date_naive() => borrowed_at,
            AsOf::Day(day) => day.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

impl ReturnLoan {
    /// Parse `as_of` as RFC 3339 or YYYY-MM-DD
    pub fn as_of(&self) -> AppResult<Option<AsOf>> {
        let Some(raw) = self.as_of.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Some(AsOf::Instant(ts.with_timezone(&Utc))));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|d| Some(AsOf::Day(d)))
            .map_err(|_| AppError::Validation(format!("Invalid as_of date: {}", raw)))
    }
}

/// Loan list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    /// active, overdue or returned
    pub status: Option<String>,
    pub student_id: Option<i32>,
    /// Only loans with an unpaid, non-zero fine
    pub unpaid_fines: Option<bool>,
}
