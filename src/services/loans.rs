//! Borrow / extend / return / pay engine, written once for every item kind

use chrono::{DateTime, Utc};

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        loan::{CreateLoan, LoanQuery, LoanRow, LoanStatus, ReturnLoan},
        student::{normalize_rfid_uid, Student},
    },
    repository::{
        loans::{LoanFilter, LoansRepository},
        Repository,
    },
};

use super::policy::{self, ItemKind};

pub struct LoansService<K: ItemKind> {
    repository: Repository,
    loans: LoansRepository<K>,
    policy: K::Policy,
}

impl<K: ItemKind> Clone for LoansService<K> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            loans: self.loans.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<K: ItemKind> LoansService<K> {
    pub fn new(repository: Repository, loans: LoansRepository<K>, config: &LoansConfig) -> Self {
        Self {
            repository,
            loans,
            policy: K::policy(config),
        }
    }

    /// Borrow one copy of an item
    pub async fn borrow(&self, request: &CreateLoan) -> AppResult<K::View> {
        let student = self.resolve_student(request).await?;
        if !student.is_active {
            return Err(AppError::Forbidden("Student account is inactive".to_string()));
        }
        let now = Utc::now();

        let mut tx = self.loans.pool().begin().await?;

        let item = self.loans.lock_item(&mut tx, request.item_id).await?;
        if K::ONE_ACTIVE_PER_STUDENT && self.loans.has_active(&mut tx, student.id, item.id).await? {
            return Err(AppError::Conflict(format!(
                "Student already has an active borrow of '{}'",
                item.label
            )));
        }

        let mut loan = policy::new_loan(&self.policy, student.id, &item, now)?;
        if !self.loans.decrement_available(&mut tx, item.id).await? {
            return Err(AppError::Conflict("No copies available".to_string()));
        }
        loan.id = self.loans.insert(&mut tx, &loan).await?;

        tx.commit().await?;

        tracing::info!(
            kind = K::NOUN,
            loan_id = loan.id,
            item_id = item.id,
            student_id = student.id,
            due_date = ?loan.due_date,
            "Item borrowed"
        );

        self.view(loan.id, now).await
    }

    /// Extend the due date of a loan
    pub async fn extend(&self, id: i32) -> AppResult<K::View> {
        let now = Utc::now();
        let mut tx = self.loans.pool().begin().await?;

        let mut loan = self.loans.lock(&mut tx, id).await?;
        let item = self.loans.get_item(&mut tx, loan.item_id).await?;
        policy::extend(&self.policy, &mut loan, &item, now)?;
        self.loans.save(&mut tx, &loan).await?;

        tx.commit().await?;

        tracing::info!(
            kind = K::NOUN,
            loan_id = id,
            extensions_used = loan.extensions_used,
            due_date = ?loan.due_date,
            "Loan extended"
        );

        self.view(id, now).await
    }

    /// Return a loan, at `as_of` when given (past or future)
    pub async fn return_loan(&self, id: i32, request: &ReturnLoan) -> AppResult<K::View> {
        let now = Utc::now();
        let as_of = request.as_of()?;
        let damaged = request.is_damaged.unwrap_or(false);

        let mut tx = self.loans.pool().begin().await?;

        let mut loan = self.loans.lock(&mut tx, id).await?;
        let returned_at = as_of.map_or(now, |as_of| as_of.resolve(loan.borrowed_at));
        let item = self.loans.get_item(&mut tx, loan.item_id).await?;
        policy::settle_return(&self.policy, &mut loan, &item, returned_at, damaged)?;

        if !self.loans.increment_available(&mut tx, item.id).await? {
            tracing::warn!(
                kind = K::NOUN,
                item_id = item.id,
                "Returned copy found the shelf already full"
            );
        }
        self.loans.save(&mut tx, &loan).await?;

        tx.commit().await?;

        tracing::info!(
            kind = K::NOUN,
            loan_id = id,
            fine = %loan.fine_amount,
            is_damaged = loan.is_damaged,
            "Loan returned"
        );

        self.view(id, now).await
    }

    /// Mark the fine of a loan as paid
    pub async fn pay_fine(&self, id: i32) -> AppResult<K::View> {
        let now = Utc::now();
        let mut tx = self.loans.pool().begin().await?;

        let mut loan = self.loans.lock(&mut tx, id).await?;
        policy::pay_fine(&self.policy, &mut loan, now)?;
        self.loans.save(&mut tx, &loan).await?;

        tx.commit().await?;

        tracing::info!(kind = K::NOUN, loan_id = id, amount = %loan.fine_amount, "Fine paid");

        self.view(id, now).await
    }

    /// Get a loan with its status and fine evaluated now
    pub async fn get(&self, id: i32) -> AppResult<K::View> {
        self.view(id, Utc::now()).await
    }

    /// List loans with their status and fine evaluated now
    pub async fn list(&self, query: &LoanQuery) -> AppResult<Vec<K::View>> {
        let status = query
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<LoanStatus>)
            .transpose()?;
        let filter = LoanFilter {
            status,
            student_id: query.student_id,
            unpaid_fines: query.unpaid_fines.unwrap_or(false),
        };

        let now = Utc::now();
        let rows = self.loans.list(filter, now).await?;
        Ok(rows.into_iter().map(|row| self.evaluate(row, now)).collect())
    }

    /// Loans of one student
    pub async fn for_student(&self, student_id: i32) -> AppResult<Vec<K::View>> {
        self.list(&LoanQuery {
            student_id: Some(student_id),
            ..Default::default()
        })
        .await
    }

    async fn view(&self, id: i32, now: DateTime<Utc>) -> AppResult<K::View> {
        let row = self.loans.get_row(id).await?;
        Ok(self.evaluate(row, now))
    }

    fn evaluate(&self, mut row: LoanRow, now: DateTime<Utc>) -> K::View {
        policy::recompute(&self.policy, &mut row.loan, now);
        row.into()
    }

    async fn resolve_student(&self, request: &CreateLoan) -> AppResult<Student> {
        match (request.student_id, request.rfid_uid.as_deref()) {
            (Some(id), _) => self.repository.students.get_by_id(id).await,
            (None, Some(raw)) => {
                let uid = normalize_rfid_uid(raw)?;
                self.repository
                    .students
                    .find_by_uid(&uid)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("No student with RFID UID {}", uid)))
            }
            (None, None) => Err(AppError::Validation(
                "student_id or rfid_uid required".to_string(),
            )),
        }
    }
}
