//! Ledger storage.
//!
//! The ledger of each user (profile, balance, expenses, budgets and
//! recurring templates) lives behind the `LedgerStore` trait so services can
//! run against PostgreSQL in production and against an in-memory store in
//! tests and local runs.
//!
//! # Consistency
//!
//! Every operation that writes an expense also applies the matching
//! `BalanceDelta` in the same atomic step. A missing balance record is left
//! missing: the delta is skipped rather than creating a balance from zero.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    balance::{Balance, BalanceDelta},
    budget::{Budget, BudgetDraft, UpsertOutcome},
    expense::{Expense, ExpenseEdit, ExpenseFilter},
    profile::{Profile, ProfileRequest},
    recurring::RecurringExpense,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Ledger store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The balance adjustment would push a field outside `±MAX_BALANCE`.
    /// Nothing was written.
    #[error("balance adjustment out of range")]
    BalanceOutOfRange,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Per-user ledger persistence.
///
/// All methods are scoped by the verified user id; a record that belongs to
/// another user behaves exactly like a missing one.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Check that the backing store is reachable.
    async fn ping(&self) -> StoreResult<()>;

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>>;

    /// Merge `name`/`email` into the profile, creating it if needed.
    async fn save_profile(
        &self,
        user_id: &str,
        profile: &ProfileRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<Profile>;

    async fn get_balance(&self, user_id: &str) -> StoreResult<Option<Balance>>;

    /// Overwrite both balance fields.
    async fn set_balance(&self, user_id: &str, balance: &Balance) -> StoreResult<Balance>;

    /// Record a new expense and charge it to the balance.
    async fn insert_expense(
        &self,
        user_id: &str,
        expense: &Expense,
        now: DateTime<Utc>,
    ) -> StoreResult<Expense>;

    async fn get_expense(&self, user_id: &str, id: Uuid) -> StoreResult<Option<Expense>>;

    /// Expenses matching `filter`, newest `date` first.
    async fn list_expenses(
        &self,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> StoreResult<Vec<Expense>>;

    /// Apply `edit` to an existing expense and move the balance from the old
    /// record to the new one. Returns `None` when the expense does not exist.
    async fn replace_expense(
        &self,
        user_id: &str,
        id: Uuid,
        edit: &ExpenseEdit,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Expense>>;

    /// Remove an expense and refund it to the balance. Returns the removed
    /// record, or `None` when it did not exist.
    async fn delete_expense(
        &self,
        user_id: &str,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Expense>>;

    /// Insert or overwrite the budget keyed by `(category, period)`.
    async fn upsert_budget(
        &self,
        user_id: &str,
        draft: &BudgetDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<(Budget, UpsertOutcome)>;

    async fn list_budgets(&self, user_id: &str) -> StoreResult<Vec<Budget>>;

    /// Idempotent: deleting an unknown id is not an error.
    async fn delete_budget(&self, user_id: &str, id: Uuid) -> StoreResult<()>;

    async fn insert_recurring(
        &self,
        user_id: &str,
        template: &RecurringExpense,
    ) -> StoreResult<RecurringExpense>;

    async fn list_recurring(&self, user_id: &str) -> StoreResult<Vec<RecurringExpense>>;

    async fn list_active_recurring(&self, user_id: &str) -> StoreResult<Vec<RecurringExpense>>;

    /// Idempotent: deleting an unknown id is not an error.
    async fn delete_recurring(&self, user_id: &str, id: Uuid) -> StoreResult<()>;

    /// Fire one occurrence of a template.
    ///
    /// Atomically, and only if the template is still active and its
    /// `next_due` still equals `expected_due`: set `next_due` to `advanced`,
    /// record `expense` and charge it to the balance. Returns `false` when the
    /// compare failed because another caller already fired this occurrence
    /// (or the template was deleted or deactivated), in which case nothing
    /// was written.
    async fn fire_recurring(
        &self,
        user_id: &str,
        template_id: Uuid,
        expected_due: DateTime<Utc>,
        advanced: DateTime<Utc>,
        expense: &Expense,
    ) -> StoreResult<bool>;

    /// Users owning at least one active template due at `now`.
    async fn users_with_due_recurring(&self, now: DateTime<Utc>) -> StoreResult<Vec<String>>;
}

/// The balance to write after `delta`, computed before anything is changed.
///
/// `None` means no write: the balance is absent (it stays absent) or the
/// delta is zero.
pub(crate) fn adjusted_balance(
    balance: Option<&Balance>,
    delta: BalanceDelta,
    now: DateTime<Utc>,
) -> StoreResult<Option<Balance>> {
    match balance {
        Some(balance) if !delta.is_zero() => balance
            .adjusted(delta, now)
            .map(Some)
            .ok_or(StoreError::BalanceOutOfRange),
        _ => Ok(None),
    }
}
