//! PostgreSQL ledger store.
//!
//! # Atomicity Guarantees
//!
//! Every write that touches an expense runs inside one database transaction
//! together with its balance adjustment. The balance row is locked with
//! `FOR UPDATE` before the new amounts are computed, so concurrent requests
//! for the same user serialize on it instead of overwriting each other. An
//! adjustment outside `±MAX_BALANCE` fails and the transaction is rolled
//! back. Budget uniqueness is enforced by the `(user_id, category, period)`
//! unique constraint and `ON CONFLICT DO UPDATE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{LedgerStore, StoreResult, adjusted_balance};
use crate::{
    db::DbPool,
    models::{
        balance::{Balance, BalanceDelta},
        budget::{Budget, BudgetDraft, UpsertOutcome},
        expense::{Expense, ExpenseEdit, ExpenseFilter},
        profile::{Profile, ProfileRequest},
        recurring::RecurringExpense,
    },
};

/// Ledger store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: DbPool,
}

impl PgLedgerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Budget row plus whether the upsert inserted it.
///
/// `xmax = 0` holds only for a row version created by an INSERT, which is
/// how the upsert reports "created" versus "updated".
#[derive(sqlx::FromRow)]
struct UpsertedBudget {
    #[sqlx(flatten)]
    budget: Budget,
    inserted: bool,
}

/// Adjust the user's balance row, if there is one.
async fn apply_balance_delta(
    conn: &mut PgConnection,
    user_id: &str,
    delta: BalanceDelta,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    if delta.is_zero() {
        return Ok(());
    }

    let current = sqlx::query_as::<_, Balance>(
        r#"
        SELECT cash_amount, online_amount, updated_at
        FROM balances
        WHERE user_id = $1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(next) = adjusted_balance(current.as_ref(), delta, now)? else {
        tracing::debug!(user_id, "no balance record, adjustment skipped");
        return Ok(());
    };

    sqlx::query(
        r#"
        UPDATE balances
        SET cash_amount = $2, online_amount = $3, updated_at = $4
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(next.cash_amount)
    .bind(next.online_amount)
    .bind(next.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_expense_row(
    conn: &mut PgConnection,
    user_id: &str,
    expense: &Expense,
) -> Result<Expense, sqlx::Error> {
    sqlx::query_as::<_, Expense>(
        r#"
        INSERT INTO expenses (id, user_id, amount, kind, category, description, date, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, amount, kind, category, description, date, created_at
        "#,
    )
    .bind(expense.id)
    .bind(user_id)
    .bind(expense.amount)
    .bind(expense.kind.as_str())
    .bind(&expense.category)
    .bind(&expense.description)
    .bind(expense.date)
    .bind(expense.created_at)
    .fetch_one(&mut *conn)
    .await
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT name, email, updated_at FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn save_profile(
        &self,
        user_id: &str,
        profile: &ProfileRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<Profile> {
        let saved = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id, name, email, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET name = COALESCE(EXCLUDED.name, profiles.name),
                email = COALESCE(EXCLUDED.email, profiles.email),
                updated_at = EXCLUDED.updated_at
            RETURNING name, email, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn get_balance(&self, user_id: &str) -> StoreResult<Option<Balance>> {
        let balance = sqlx::query_as::<_, Balance>(
            "SELECT cash_amount, online_amount, updated_at FROM balances WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    async fn set_balance(&self, user_id: &str, balance: &Balance) -> StoreResult<Balance> {
        let saved = sqlx::query_as::<_, Balance>(
            r#"
            INSERT INTO balances (user_id, cash_amount, online_amount, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET cash_amount = EXCLUDED.cash_amount,
                online_amount = EXCLUDED.online_amount,
                updated_at = EXCLUDED.updated_at
            RETURNING cash_amount, online_amount, updated_at
            "#,
        )
        .bind(user_id)
        .bind(balance.cash_amount)
        .bind(balance.online_amount)
        .bind(balance.updated_at.unwrap_or_else(Utc::now))
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn insert_expense(
        &self,
        user_id: &str,
        expense: &Expense,
        now: DateTime<Utc>,
    ) -> StoreResult<Expense> {
        let mut tx = self.pool.begin().await?;

        let saved = insert_expense_row(&mut tx, user_id, expense).await?;
        apply_balance_delta(&mut tx, user_id, BalanceDelta::charge(&saved), now).await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn get_expense(&self, user_id: &str, id: Uuid) -> StoreResult<Option<Expense>> {
        let expense = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, amount, kind, category, description, date, created_at
            FROM expenses
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(expense)
    }

    async fn list_expenses(
        &self,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> StoreResult<Vec<Expense>> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT id, amount, kind, category, description, date, created_at \
             FROM expenses WHERE user_id = ",
        );
        query.push_bind(user_id.to_string());

        if let Some(category) = &filter.category {
            query.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(start) = filter.start {
            query.push(" AND date >= ").push_bind(start);
        }
        if let Some(end) = filter.end {
            query.push(" AND date <= ").push_bind(end);
        }
        query.push(" ORDER BY date DESC");

        let expenses = query
            .build_query_as::<Expense>()
            .fetch_all(&self.pool)
            .await?;

        Ok(expenses)
    }

    async fn replace_expense(
        &self,
        user_id: &str,
        id: Uuid,
        edit: &ExpenseEdit,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Expense>> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so a concurrent edit or delete waits for this one
        let old = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, amount, kind, category, description, date, created_at
            FROM expenses
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(old) = old else {
            tx.rollback().await?;
            return Ok(None);
        };

        let updated = edit.apply_to(&old);

        sqlx::query(
            r#"
            UPDATE expenses
            SET amount = $3, kind = $4, category = $5, description = $6, date = $7
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(updated.amount)
        .bind(updated.kind.as_str())
        .bind(&updated.category)
        .bind(&updated.description)
        .bind(updated.date)
        .execute(&mut *tx)
        .await?;

        apply_balance_delta(&mut tx, user_id, BalanceDelta::replace(&old, &updated), now).await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_expense(
        &self,
        user_id: &str,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Expense>> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query_as::<_, Expense>(
            r#"
            DELETE FROM expenses
            WHERE id = $1 AND user_id = $2
            RETURNING id, amount, kind, category, description, date, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(removed) = removed else {
            tx.rollback().await?;
            return Ok(None);
        };

        apply_balance_delta(&mut tx, user_id, BalanceDelta::refund(&removed), now).await?;

        tx.commit().await?;
        Ok(Some(removed))
    }

    async fn upsert_budget(
        &self,
        user_id: &str,
        draft: &BudgetDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<(Budget, UpsertOutcome)> {
        let row = sqlx::query_as::<_, UpsertedBudget>(
            r#"
            INSERT INTO budgets (id, user_id, category, limit_amount, period, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, category, period) DO UPDATE
            SET limit_amount = EXCLUDED.limit_amount,
                updated_at = EXCLUDED.updated_at
            RETURNING id, category, limit_amount, period, updated_at, (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&draft.category)
        .bind(draft.limit_amount)
        .bind(draft.period.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let outcome = if row.inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        };

        Ok((row.budget, outcome))
    }

    async fn list_budgets(&self, user_id: &str) -> StoreResult<Vec<Budget>> {
        let budgets = sqlx::query_as::<_, Budget>(
            r#"
            SELECT id, category, limit_amount, period, updated_at
            FROM budgets
            WHERE user_id = $1
            ORDER BY category, period
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(budgets)
    }

    async fn delete_budget(&self, user_id: &str, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM budgets WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_recurring(
        &self,
        user_id: &str,
        template: &RecurringExpense,
    ) -> StoreResult<RecurringExpense> {
        let saved = sqlx::query_as::<_, RecurringExpense>(
            r#"
            INSERT INTO recurring_expenses (
                id, user_id, amount, kind, category, description,
                frequency, next_due, active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, amount, kind, category, description,
                      frequency, next_due, active, created_at
            "#,
        )
        .bind(template.id)
        .bind(user_id)
        .bind(template.amount)
        .bind(template.kind.as_str())
        .bind(&template.category)
        .bind(&template.description)
        .bind(template.frequency.as_str())
        .bind(template.next_due)
        .bind(template.active)
        .bind(template.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn list_recurring(&self, user_id: &str) -> StoreResult<Vec<RecurringExpense>> {
        let templates = sqlx::query_as::<_, RecurringExpense>(
            r#"
            SELECT id, amount, kind, category, description,
                   frequency, next_due, active, created_at
            FROM recurring_expenses
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(templates)
    }

    async fn list_active_recurring(&self, user_id: &str) -> StoreResult<Vec<RecurringExpense>> {
        let templates = sqlx::query_as::<_, RecurringExpense>(
            r#"
            SELECT id, amount, kind, category, description,
                   frequency, next_due, active, created_at
            FROM recurring_expenses
            WHERE user_id = $1 AND active
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(templates)
    }

    async fn delete_recurring(&self, user_id: &str, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM recurring_expenses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn fire_recurring(
        &self,
        user_id: &str,
        template_id: Uuid,
        expected_due: DateTime<Utc>,
        advanced: DateTime<Utc>,
        expense: &Expense,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-swap on next_due: only one caller can claim this occurrence
        let claimed = sqlx::query(
            r#"
            UPDATE recurring_expenses
            SET next_due = $4
            WHERE id = $1 AND user_id = $2 AND active AND next_due = $3
            "#,
        )
        .bind(template_id)
        .bind(user_id)
        .bind(expected_due)
        .bind(advanced)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let saved = insert_expense_row(&mut tx, user_id, expense).await?;
        apply_balance_delta(
            &mut tx,
            user_id,
            BalanceDelta::charge(&saved),
            saved.created_at,
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn users_with_due_recurring(&self, now: DateTime<Utc>) -> StoreResult<Vec<String>> {
        let users = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT user_id
            FROM recurring_expenses
            WHERE active AND next_due <= $1
            ORDER BY user_id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
