//! Loan lifecycle rules.
//!
//! Every loan goes `ACTIVE -> (OVERDUE) -> RETURNED`. `OVERDUE` is never a
//! stored transition of its own: [`recompute`] derives it from the due date
//! each time a loan is read or about to be mutated.
//!
//! The rules that differ between books and apparatus live in a [`LoanPolicy`]
//! selected through the [`ItemKind`] marker type, so the borrow/return engine
//! in `services::loans` is written once for every kind of catalog item.
//!
//! All functions here are pure and take the evaluation time as an argument.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::loan::{ApparatusLoanView, BookLoanView, CatalogEntry, LoanRecord, LoanRow, LoanStatus},
};

/// Kind-specific rules of a loan
pub trait LoanPolicy: Clone + Send + Sync + 'static {
    /// Due date of a loan created at `borrowed_at`, if the kind has one
    fn due_date(&self, borrowed_at: DateTime<Utc>) -> Option<DateTime<Utc>>;

    /// Fine accrued by a loan due at `due` when evaluated at `at`
    fn overdue_fine(&self, due: DateTime<Utc>, at: DateTime<Utc>) -> Decimal;

    /// Validate an extension request and return the new due date.
    /// Must not mutate anything: a refused extension leaves the loan as it was.
    fn extended_due_date(
        &self,
        loan: &LoanRecord,
        item: &CatalogEntry,
        now: DateTime<Utc>,
    ) -> AppResult<DateTime<Utc>>;

    /// Final fine and damage flag of a loan returned at `returned_at`
    fn return_fine(
        &self,
        loan: &LoanRecord,
        item: &CatalogEntry,
        returned_at: DateTime<Utc>,
        damaged: bool,
    ) -> (Decimal, bool);
}

/// A kind of lendable catalog item and where its rows live
pub trait ItemKind: Send + Sync + 'static {
    type Policy: LoanPolicy;
    type View: From<LoanRow> + serde::Serialize + Send;

    /// Human-readable noun used in messages
    const NOUN: &'static str;
    const ITEM_TABLE: &'static str;
    const LOAN_TABLE: &'static str;
    const LABEL_COLUMN: &'static str;
    const TOTAL_COLUMN: &'static str;
    const AVAILABLE_COLUMN: &'static str;
    /// SQL expression (over the item table) for `CatalogEntry::extension_exempt`
    const EXEMPT_EXPR: &'static str;
    /// SQL expression (over the item table) for `CatalogEntry::damage_fine`
    const DAMAGE_FINE_EXPR: &'static str;
    /// A student may hold at most one unreturned copy of the same item
    const ONE_ACTIVE_PER_STUDENT: bool;

    fn policy(config: &LoansConfig) -> Self::Policy;
}

/// Library books: fixed loan period, extensions, per-day overdue fines
pub struct BookKind;

/// Lab apparatus: returned on demand, one-time damage fine
pub struct ApparatusKind;

impl ItemKind for BookKind {
    type Policy = BookPolicy;
    type View = BookLoanView;

    const NOUN: &'static str = "Book";
    const ITEM_TABLE: &'static str = "books";
    const LOAN_TABLE: &'static str = "book_loans";
    const LABEL_COLUMN: &'static str = "title";
    const TOTAL_COLUMN: &'static str = "total_copies";
    const AVAILABLE_COLUMN: &'static str = "available_copies";
    const EXEMPT_EXPR: &'static str = "is_important";
    const DAMAGE_FINE_EXPR: &'static str = "0::numeric";
    const ONE_ACTIVE_PER_STUDENT: bool = true;

    fn policy(config: &LoansConfig) -> BookPolicy {
        BookPolicy::from(config)
    }
}

impl ItemKind for ApparatusKind {
    type Policy = ApparatusPolicy;
    type View = ApparatusLoanView;

    const NOUN: &'static str = "Apparatus";
    const ITEM_TABLE: &'static str = "apparatus";
    const LOAN_TABLE: &'static str = "apparatus_loans";
    const LABEL_COLUMN: &'static str = "name";
    const TOTAL_COLUMN: &'static str = "total_quantity";
    const AVAILABLE_COLUMN: &'static str = "available_quantity";
    const EXEMPT_EXPR: &'static str = "FALSE";
    const DAMAGE_FINE_EXPR: &'static str = "damage_fine";
    const ONE_ACTIVE_PER_STUDENT: bool = false;

    fn policy(_config: &LoansConfig) -> ApparatusPolicy {
        ApparatusPolicy
    }
}

/// Book loan rules
#[derive(Debug, Clone)]
pub struct BookPolicy {
    pub loan_days: i64,
    pub extension_days: i64,
    pub max_extensions: i32,
    pub fine_per_day: i64,
    pub block_early_reextension: bool,
}

impl From<&LoansConfig> for BookPolicy {
    fn from(config: &LoansConfig) -> Self {
        Self {
            loan_days: config.loan_days,
            extension_days: config.extension_days,
            max_extensions: config.max_extensions,
            fine_per_day: config.fine_per_day,
            block_early_reextension: config.block_early_reextension,
        }
    }
}

impl LoanPolicy for BookPolicy {
    fn due_date(&self, borrowed_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Some(end_of_day(borrowed_at + Duration::days(self.loan_days)))
    }

    fn overdue_fine(&self, due: DateTime<Utc>, at: DateTime<Utc>) -> Decimal {
        Decimal::from(days_overdue(due, at) * self.fine_per_day)
    }

    fn extended_due_date(
        &self,
        loan: &LoanRecord,
        item: &CatalogEntry,
        now: DateTime<Utc>,
    ) -> AppResult<DateTime<Utc>> {
        if loan.is_returned() {
            return Err(AppError::Forbidden("Cannot extend a returned loan".to_string()));
        }
        if item.extension_exempt {
            return Err(AppError::Forbidden(format!(
                "'{}' is marked important and cannot be extended",
                item.label
            )));
        }
        if loan.extensions_used >= self.max_extensions {
            return Err(AppError::Forbidden(format!(
                "Maximum extensions reached ({}/{})",
                loan.extensions_used, self.max_extensions
            )));
        }
        let due = loan
            .due_date
            .ok_or_else(|| AppError::Forbidden("Loan has no due date".to_string()))?;

        let step = Duration::days(self.extension_days);
        if self.block_early_reextension && loan.extensions_used > 0 {
            let previous_due = due - step;
            if now < previous_due {
                return Err(AppError::Forbidden(format!(
                    "Extension not allowed before the previous due date ({})",
                    previous_due.format("%Y-%m-%d")
                )));
            }
        }

        Ok(end_of_day(due + step))
    }

    fn return_fine(
        &self,
        loan: &LoanRecord,
        _item: &CatalogEntry,
        returned_at: DateTime<Utc>,
        _damaged: bool,
    ) -> (Decimal, bool) {
        if loan.fine_paid {
            return (loan.fine_amount, false);
        }
        let late = loan
            .due_date
            .map(|due| self.overdue_fine(due, returned_at))
            .unwrap_or(Decimal::ZERO);
        (loan.fine_amount.max(late), false)
    }
}

/// Apparatus loan rules
#[derive(Debug, Clone, Copy)]
pub struct ApparatusPolicy;

impl LoanPolicy for ApparatusPolicy {
    fn due_date(&self, _borrowed_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        None
    }

    fn overdue_fine(&self, _due: DateTime<Utc>, _at: DateTime<Utc>) -> Decimal {
        Decimal::ZERO
    }

    fn extended_due_date(
        &self,
        loan: &LoanRecord,
        _item: &CatalogEntry,
        _now: DateTime<Utc>,
    ) -> AppResult<DateTime<Utc>> {
        if loan.is_returned() {
            return Err(AppError::Forbidden("Cannot extend a returned loan".to_string()));
        }
        Err(AppError::Forbidden(
            "Apparatus loans have no due date and cannot be extended".to_string(),
        ))
    }

    fn return_fine(
        &self,
        _loan: &LoanRecord,
        item: &CatalogEntry,
        _returned_at: DateTime<Utc>,
        damaged: bool,
    ) -> (Decimal, bool) {
        if damaged {
            (item.damage_fine, true)
        } else {
            (Decimal::ZERO, false)
        }
    }
}

/// Last second of the UTC day containing `at`
pub fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc() + Duration::seconds(86_399)
}

/// Whole days between `due` and `at`; any started day counts as a full day
pub fn days_overdue(due: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    if at <= due {
        return 0;
    }
    let delta = at - due;
    let days = delta.num_days();
    if delta > Duration::days(days) {
        days + 1
    } else {
        days
    }
}

/// Refresh the derived status and accrued fine of a loan as of `now`.
///
/// A paid fine is frozen. A loan pushed back into the future by an extension
/// returns to `ACTIVE` but keeps whatever fine it had already accrued.
pub fn recompute<P: LoanPolicy>(policy: &P, loan: &mut LoanRecord, now: DateTime<Utc>) {
    if loan.is_returned() {
        loan.set_status(LoanStatus::Returned);
        return;
    }
    let Some(due) = loan.due_date else {
        loan.set_status(LoanStatus::Active);
        return;
    };

    if now > due {
        loan.set_status(LoanStatus::Overdue);
        if !loan.fine_paid {
            loan.fine_amount = loan.fine_amount.max(policy.overdue_fine(due, now));
        }
    } else {
        loan.set_status(LoanStatus::Active);
    }
}

/// Fresh loan values for a borrow at `now`
pub fn new_loan<P: LoanPolicy>(
    policy: &P,
    student_id: i32,
    item: &CatalogEntry,
    now: DateTime<Utc>,
) -> AppResult<LoanRecord> {
    if item.available <= 0 {
        return Err(AppError::Conflict("No copies available".to_string()));
    }
    Ok(LoanRecord {
        id: 0,
        student_id,
        item_id: item.id,
        borrowed_at: now,
        due_date: policy.due_date(now),
        returned_at: None,
        extensions_used: 0,
        fine_amount: Decimal::ZERO,
        fine_paid: false,
        is_damaged: false,
        status: LoanStatus::Active.as_str().to_string(),
    })
}

/// Extend a loan in place; on error the loan is untouched
pub fn extend<P: LoanPolicy>(
    policy: &P,
    loan: &mut LoanRecord,
    item: &CatalogEntry,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let new_due = policy.extended_due_date(loan, item, now)?;

    // Accrue up to now before the due date moves
    recompute(policy, loan, now);
    loan.due_date = Some(new_due);
    loan.extensions_used += 1;
    recompute(policy, loan, now);
    Ok(())
}

/// Close a loan at `returned_at` and finalize its fine
pub fn settle_return<P: LoanPolicy>(
    policy: &P,
    loan: &mut LoanRecord,
    item: &CatalogEntry,
    returned_at: DateTime<Utc>,
    damaged: bool,
) -> AppResult<()> {
    if loan.is_returned() {
        return Err(AppError::Forbidden("Loan already returned".to_string()));
    }
    if returned_at < loan.borrowed_at {
        return Err(AppError::Validation(
            "Return date cannot precede the borrow date".to_string(),
        ));
    }

    let (fine, is_damaged) = policy.return_fine(loan, item, returned_at, damaged);
    loan.fine_amount = fine;
    loan.is_damaged = is_damaged;
    loan.returned_at = Some(returned_at);
    loan.set_status(LoanStatus::Returned);
    Ok(())
}

/// Mark the fine of a loan as paid
pub fn pay_fine<P: LoanPolicy>(
    policy: &P,
    loan: &mut LoanRecord,
    now: DateTime<Utc>,
) -> AppResult<()> {
    recompute(policy, loan, now);
    if loan.fine_paid {
        return Err(AppError::Forbidden("Fine already paid".to_string()));
    }
    if loan.fine_amount <= Decimal::ZERO {
        return Err(AppError::Forbidden("No fine to pay".to_string()));
    }
    loan.fine_paid = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn book_policy() -> BookPolicy {
        BookPolicy::from(&LoansConfig::default())
    }

    fn book(available: i32, important: bool) -> CatalogEntry {
        CatalogEntry {
            id: 7,
            label: "Operating Systems".to_string(),
            total: 1,
            available,
            extension_exempt: important,
            damage_fine: Decimal::ZERO,
        }
    }

    fn microscope(damage_fine: i64) -> CatalogEntry {
        CatalogEntry {
            id: 3,
            label: "Microscope".to_string(),
            total: 4,
            available: 4,
            extension_exempt: false,
            damage_fine: Decimal::from(damage_fine),
        }
    }

    fn book_loan(due: DateTime<Utc>) -> LoanRecord {
        LoanRecord {
            id: 1,
            student_id: 10,
            item_id: 7,
            borrowed_at: due - Duration::days(14),
            due_date: Some(due),
            returned_at: None,
            extensions_used: 0,
            fine_amount: Decimal::ZERO,
            fine_paid: false,
            is_damaged: false,
            status: "ACTIVE".to_string(),
        }
    }

    #[test]
    fn test_days_overdue_rounds_partial_days_up() {
        let due = at(2024, 1, 10, 23, 59, 59);
        assert_eq!(days_overdue(due, due), 0);
        assert_eq!(days_overdue(due, due - Duration::hours(5)), 0);
        assert_eq!(days_overdue(due, due + Duration::seconds(1)), 1);
        assert_eq!(days_overdue(due, due + Duration::days(1)), 1);
        assert_eq!(days_overdue(due, due + Duration::days(1) + Duration::seconds(1)), 2);
    }

    #[test]
    fn test_overdue_fine_two_days() {
        let mut loan = book_loan(at(2024, 1, 10, 23, 59, 59));
        recompute(&book_policy(), &mut loan, at(2024, 1, 12, 0, 0, 1));
        assert_eq!(loan.status(), LoanStatus::Overdue);
        assert_eq!(loan.fine_amount, Decimal::from(2));
    }

    #[test]
    fn test_fine_rate_is_configurable() {
        let policy = BookPolicy {
            fine_per_day: 5,
            ..book_policy()
        };
        let due = at(2024, 1, 10, 23, 59, 59);
        assert_eq!(policy.overdue_fine(due, due + Duration::hours(30)), Decimal::from(10));
    }

    #[test]
    fn test_due_date_snaps_to_end_of_day() {
        let due = book_policy().due_date(at(2024, 3, 1, 9, 15, 0)).unwrap();
        assert_eq!(due, at(2024, 3, 15, 23, 59, 59));
        assert_eq!(ApparatusPolicy.due_date(at(2024, 3, 1, 9, 15, 0)), None);
    }

    #[test]
    fn test_borrow_last_copy() {
        let now = at(2024, 3, 1, 9, 0, 0);
        let loan = new_loan(&book_policy(), 10, &book(1, false), now).unwrap();
        assert_eq!(loan.status(), LoanStatus::Active);
        assert_eq!(loan.due_date, Some(at(2024, 3, 15, 23, 59, 59)));

        let err = new_loan(&book_policy(), 11, &book(0, false), now).unwrap_err();
        match err {
            AppError::Conflict(msg) => assert_eq!(msg, "No copies available"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_extend_moves_due_date_by_a_week() {
        let due = at(2024, 3, 15, 23, 59, 59);
        let mut loan = book_loan(due);
        extend(&book_policy(), &mut loan, &book(0, false), at(2024, 3, 10, 12, 0, 0)).unwrap();
        assert_eq!(loan.due_date, Some(at(2024, 3, 22, 23, 59, 59)));
        assert_eq!(loan.extensions_used, 1);
        assert_eq!(loan.status(), LoanStatus::Active);
    }

    #[test]
    fn test_third_extension_refused_and_loan_unchanged() {
        let policy = BookPolicy {
            block_early_reextension: false,
            ..book_policy()
        };
        let mut loan = book_loan(at(2024, 3, 15, 23, 59, 59));
        let now = at(2024, 3, 10, 12, 0, 0);
        extend(&policy, &mut loan, &book(0, false), now).unwrap();
        extend(&policy, &mut loan, &book(0, false), now).unwrap();
        assert_eq!(loan.extensions_used, 2);

        let before = loan.clone();
        let err = extend(&policy, &mut loan, &book(0, false), now).unwrap_err();
        match err {
            AppError::Forbidden(msg) => assert_eq!(msg, "Maximum extensions reached (2/2)"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(loan.extensions_used, before.extensions_used);
        assert_eq!(loan.due_date, before.due_date);
        assert_eq!(loan.fine_amount, before.fine_amount);
    }

    #[test]
    fn test_important_book_cannot_be_extended() {
        let mut loan = book_loan(at(2024, 3, 15, 23, 59, 59));
        let err = extend(&book_policy(), &mut loan, &book(0, true), at(2024, 3, 10, 0, 0, 0));
        assert!(matches!(err, Err(AppError::Forbidden(_))));
        assert_eq!(loan.extensions_used, 0);
    }

    #[test]
    fn test_returned_loan_cannot_be_extended() {
        let mut loan = book_loan(at(2024, 3, 15, 23, 59, 59));
        loan.returned_at = Some(at(2024, 3, 12, 0, 0, 0));
        let err = extend(&book_policy(), &mut loan, &book(1, false), at(2024, 3, 13, 0, 0, 0));
        assert!(matches!(err, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_reextension_waits_for_previous_due_date() {
        let policy = book_policy();
        let first_due = at(2024, 3, 15, 23, 59, 59);
        let mut loan = book_loan(first_due);

        extend(&policy, &mut loan, &book(0, false), at(2024, 3, 10, 12, 0, 0)).unwrap();
        assert_eq!(loan.due_date, Some(at(2024, 3, 22, 23, 59, 59)));

        // Still before the first due date: stacking is refused
        let err = extend(&policy, &mut loan, &book(0, false), at(2024, 3, 11, 12, 0, 0));
        assert!(matches!(err, Err(AppError::Forbidden(_))));
        assert_eq!(loan.extensions_used, 1);

        // Once the previous due date is reached the second extension goes through
        extend(&policy, &mut loan, &book(0, false), first_due).unwrap();
        assert_eq!(loan.extensions_used, 2);
        assert_eq!(loan.due_date, Some(at(2024, 3, 29, 23, 59, 59)));
    }

    #[test]
    fn test_stacking_allowed_when_guard_disabled() {
        let policy = BookPolicy {
            block_early_reextension: false,
            ..book_policy()
        };
        let mut loan = book_loan(at(2024, 3, 15, 23, 59, 59));
        let now = at(2024, 3, 2, 0, 0, 0);
        extend(&policy, &mut loan, &book(0, false), now).unwrap();
        extend(&policy, &mut loan, &book(0, false), now).unwrap();
        assert_eq!(loan.due_date, Some(at(2024, 3, 29, 23, 59, 59)));
    }

    #[test]
    fn test_extension_of_overdue_loan_keeps_accrued_fine() {
        let policy = book_policy();
        let due = at(2024, 3, 15, 23, 59, 59);
        let mut loan = book_loan(due);

        let now = at(2024, 3, 18, 10, 0, 0);
        recompute(&policy, &mut loan, now);
        assert_eq!(loan.status(), LoanStatus::Overdue);
        assert_eq!(loan.fine_amount, Decimal::from(3));

        extend(&policy, &mut loan, &book(0, false), now).unwrap();
        assert_eq!(loan.due_date, Some(at(2024, 3, 22, 23, 59, 59)));
        assert_eq!(loan.status(), LoanStatus::Active);
        assert_eq!(loan.fine_amount, Decimal::from(3));

        // Reading again later, still before the new due date
        recompute(&policy, &mut loan, at(2024, 3, 20, 0, 0, 0));
        assert_eq!(loan.status(), LoanStatus::Active);
        assert_eq!(loan.fine_amount, Decimal::from(3));
    }

    #[test]
    fn test_return_after_extension_keeps_accrued_fine() {
        let policy = book_policy();
        let mut loan = book_loan(at(2024, 3, 15, 23, 59, 59));
        extend(&policy, &mut loan, &book(0, false), at(2024, 3, 17, 8, 0, 0)).unwrap();
        assert_eq!(loan.fine_amount, Decimal::from(2));

        settle_return(&policy, &mut loan, &book(0, false), at(2024, 3, 19, 0, 0, 0), false).unwrap();
        assert_eq!(loan.status(), LoanStatus::Returned);
        assert_eq!(loan.fine_amount, Decimal::from(2));
    }

    #[test]
    fn test_return_computes_fine_as_of_date() {
        let policy = book_policy();
        let mut loan = book_loan(at(2024, 1, 10, 23, 59, 59));
        settle_return(&policy, &mut loan, &book(0, false), at(2024, 1, 12, 0, 0, 1), false).unwrap();
        assert_eq!(loan.returned_at, Some(at(2024, 1, 12, 0, 0, 1)));
        assert_eq!(loan.fine_amount, Decimal::from(2));
        assert!(!loan.is_damaged);

        // Finalized: later reads do not change it
        recompute(&policy, &mut loan, at(2024, 6, 1, 0, 0, 0));
        assert_eq!(loan.fine_amount, Decimal::from(2));
        assert_eq!(loan.status(), LoanStatus::Returned);
    }

    #[test]
    fn test_on_time_return_has_no_fine() {
        let policy = book_policy();
        let mut loan = book_loan(at(2024, 1, 10, 23, 59, 59));
        settle_return(&policy, &mut loan, &book(0, false), at(2024, 1, 10, 23, 59, 59), false).unwrap();
        assert_eq!(loan.fine_amount, Decimal::ZERO);
    }

    #[test]
    fn test_double_return_refused() {
        let policy = book_policy();
        let mut loan = book_loan(at(2024, 1, 10, 23, 59, 59));
        settle_return(&policy, &mut loan, &book(0, false), at(2024, 1, 9, 0, 0, 0), false).unwrap();
        let err = settle_return(&policy, &mut loan, &book(0, false), at(2024, 1, 11, 0, 0, 0), false);
        assert!(matches!(err, Err(AppError::Forbidden(_))));
        assert_eq!(loan.returned_at, Some(at(2024, 1, 9, 0, 0, 0)));
    }

    #[test]
    fn test_return_before_borrow_rejected() {
        let policy = book_policy();
        let mut loan = book_loan(at(2024, 1, 10, 23, 59, 59));
        let err = settle_return(&policy, &mut loan, &book(0, false), at(2023, 12, 1, 0, 0, 0), false);
        assert!(matches!(err, Err(AppError::Validation(_))));
        assert!(loan.returned_at.is_none());
    }

    #[test]
    fn test_damaged_apparatus_return_and_payment() {
        let now = at(2024, 2, 1, 10, 0, 0);
        let item = microscope(50);
        let mut loan = new_loan(&ApparatusPolicy, 10, &item, now).unwrap();
        assert_eq!(loan.due_date, None);

        settle_return(&ApparatusPolicy, &mut loan, &item, now + Duration::hours(3), true).unwrap();
        assert!(loan.is_damaged);
        assert_eq!(loan.fine_amount, Decimal::from(50));
        assert!(!loan.fine_paid);

        pay_fine(&ApparatusPolicy, &mut loan, now + Duration::days(1)).unwrap();
        assert!(loan.fine_paid);
        assert_eq!(loan.fine_amount, Decimal::from(50));
    }

    #[test]
    fn test_undamaged_apparatus_return_is_free() {
        let now = at(2024, 2, 1, 10, 0, 0);
        let item = microscope(50);
        let mut loan = new_loan(&ApparatusPolicy, 10, &item, now).unwrap();
        settle_return(&ApparatusPolicy, &mut loan, &item, now + Duration::days(30), false).unwrap();
        assert_eq!(loan.fine_amount, Decimal::ZERO);
        assert!(!loan.is_damaged);

        let err = pay_fine(&ApparatusPolicy, &mut loan, now + Duration::days(31));
        assert!(matches!(err, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_apparatus_cannot_be_extended() {
        let now = at(2024, 2, 1, 10, 0, 0);
        let item = microscope(50);
        let mut loan = new_loan(&ApparatusPolicy, 10, &item, now).unwrap();
        let err = extend(&ApparatusPolicy, &mut loan, &item, now);
        assert!(matches!(err, Err(AppError::Forbidden(_))));
        assert_eq!(loan.extensions_used, 0);
    }

    #[test]
    fn test_paying_twice_is_an_error() {
        let policy = book_policy();
        let mut loan = book_loan(at(2024, 1, 10, 23, 59, 59));
        let now = at(2024, 1, 13, 12, 0, 0);
        pay_fine(&policy, &mut loan, now).unwrap();
        assert!(loan.fine_paid);
        assert_eq!(loan.fine_amount, Decimal::from(3));

        let err = pay_fine(&policy, &mut loan, now).unwrap_err();
        match err {
            AppError::Forbidden(msg) => assert_eq!(msg, "Fine already paid"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(loan.fine_paid);
        assert_eq!(loan.fine_amount, Decimal::from(3));
    }

    #[test]
    fn test_paid_fine_is_frozen() {
        let policy = book_policy();
        let mut loan = book_loan(at(2024, 1, 10, 23, 59, 59));
        pay_fine(&policy, &mut loan, at(2024, 1, 12, 12, 0, 0)).unwrap();
        assert_eq!(loan.fine_amount, Decimal::from(2));

        recompute(&policy, &mut loan, at(2024, 1, 20, 12, 0, 0));
        assert_eq!(loan.status(), LoanStatus::Overdue);
        assert_eq!(loan.fine_amount, Decimal::from(2));

        settle_return(&policy, &mut loan, &book(0, false), at(2024, 1, 25, 0, 0, 0), false).unwrap();
        assert_eq!(loan.fine_amount, Decimal::from(2));
    }

    #[test]
    fn test_nothing_to_pay_on_active_loan() {
        let policy = book_policy();
        let mut loan = book_loan(at(2024, 1, 10, 23, 59, 59));
        let err = pay_fine(&policy, &mut loan, at(2024, 1, 5, 0, 0, 0));
        assert!(matches!(err, Err(AppError::Forbidden(_))));
        assert!(!loan.fine_paid);
    }
}
