//! In-memory ledger store.
//!
//! All ledgers sit behind one async mutex, so every trait method runs as a
//! single critical section and the compound writes (expense + balance,
//! compare-and-swap on `next_due`) are atomic with respect to each other.
//! The adjusted balance is computed before any field is touched, so a
//! rejected adjustment leaves the ledger unchanged.
//! Budgets are keyed by `(category, period)`, which makes the upsert a plain
//! map insert.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{LedgerStore, StoreResult, adjusted_balance};
use crate::models::{
    balance::{Balance, BalanceDelta},
    budget::{Budget, BudgetDraft, BudgetPeriod, UpsertOutcome},
    expense::{Expense, ExpenseEdit, ExpenseFilter},
    profile::{Profile, ProfileRequest},
    recurring::RecurringExpense,
};

#[derive(Debug, Default)]
struct UserLedger {
    profile: Option<Profile>,
    balance: Option<Balance>,
    expenses: HashMap<Uuid, Expense>,
    budgets: HashMap<(String, BudgetPeriod), Budget>,
    recurring: HashMap<Uuid, RecurringExpense>,
}

#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    ledgers: Mutex<HashMap<String, UserLedger>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        let ledgers = self.ledgers.lock().await;
        Ok(ledgers.get(user_id).and_then(|l| l.profile.clone()))
    }

    async fn save_profile(
        &self,
        user_id: &str,
        profile: &ProfileRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<Profile> {
        let mut ledgers = self.ledgers.lock().await;
        let ledger = ledgers.entry(user_id.to_string()).or_default();

        let (old_name, old_email) = match ledger.profile.take() {
            Some(p) => (p.name, p.email),
            None => (None, None),
        };

        let saved = Profile {
            name: profile.name.clone().or(old_name),
            email: profile.email.clone().or(old_email),
            updated_at: now,
        };
        ledger.profile = Some(saved.clone());

        Ok(saved)
    }

    async fn get_balance(&self, user_id: &str) -> StoreResult<Option<Balance>> {
        let ledgers = self.ledgers.lock().await;
        Ok(ledgers.get(user_id).and_then(|l| l.balance.clone()))
    }

    async fn set_balance(&self, user_id: &str, balance: &Balance) -> StoreResult<Balance> {
        let mut ledgers = self.ledgers.lock().await;
        let ledger = ledgers.entry(user_id.to_string()).or_default();
        ledger.balance = Some(balance.clone());
        Ok(balance.clone())
    }

    async fn insert_expense(
        &self,
        user_id: &str,
        expense: &Expense,
        now: DateTime<Utc>,
    ) -> StoreResult<Expense> {
        let mut ledgers = self.ledgers.lock().await;
        let ledger = ledgers.entry(user_id.to_string()).or_default();

        let balance =
            adjusted_balance(ledger.balance.as_ref(), BalanceDelta::charge(expense), now)?;

        ledger.expenses.insert(expense.id, expense.clone());
        if balance.is_some() {
            ledger.balance = balance;
        }

        Ok(expense.clone())
    }

    async fn get_expense(&self, user_id: &str, id: Uuid) -> StoreResult<Option<Expense>> {
        let ledgers = self.ledgers.lock().await;
        Ok(ledgers
            .get(user_id)
            .and_then(|l| l.expenses.get(&id).cloned()))
    }

    async fn list_expenses(
        &self,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> StoreResult<Vec<Expense>> {
        let ledgers = self.ledgers.lock().await;
        let mut expenses: Vec<Expense> = ledgers
            .get(user_id)
            .map(|l| {
                l.expenses
                    .values()
                    .filter(|e| filter.matches(e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(expenses)
    }

    async fn replace_expense(
        &self,
        user_id: &str,
        id: Uuid,
        edit: &ExpenseEdit,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Expense>> {
        let mut ledgers = self.ledgers.lock().await;
        let Some(ledger) = ledgers.get_mut(user_id) else {
            return Ok(None);
        };
        let Some(old) = ledger.expenses.get(&id).cloned() else {
            return Ok(None);
        };

        let updated = edit.apply_to(&old);
        let balance = adjusted_balance(
            ledger.balance.as_ref(),
            BalanceDelta::replace(&old, &updated),
            now,
        )?;

        ledger.expenses.insert(id, updated.clone());
        if balance.is_some() {
            ledger.balance = balance;
        }

        Ok(Some(updated))
    }

    async fn delete_expense(
        &self,
        user_id: &str,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Expense>> {
        let mut ledgers = self.ledgers.lock().await;
        let Some(ledger) = ledgers.get_mut(user_id) else {
            return Ok(None);
        };
        let Some(removed) = ledger.expenses.get(&id).cloned() else {
            return Ok(None);
        };
        let balance =
            adjusted_balance(ledger.balance.as_ref(), BalanceDelta::refund(&removed), now)?;

        ledger.expenses.remove(&id);
        if balance.is_some() {
            ledger.balance = balance;
        }

        Ok(Some(removed))
    }

    async fn upsert_budget(
        &self,
        user_id: &str,
        draft: &BudgetDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<(Budget, UpsertOutcome)> {
        let mut ledgers = self.ledgers.lock().await;
        let ledger = ledgers.entry(user_id.to_string()).or_default();
        let key = (draft.category.clone(), draft.period);

        let (id, outcome) = match ledger.budgets.get(&key) {
            Some(existing) => (existing.id, UpsertOutcome::Updated),
            None => (Uuid::new_v4(), UpsertOutcome::Created),
        };

        let budget = Budget {
            id,
            category: draft.category.clone(),
            limit_amount: draft.limit_amount,
            period: draft.period,
            updated_at: now,
        };
        ledger.budgets.insert(key, budget.clone());

        Ok((budget, outcome))
    }

    async fn list_budgets(&self, user_id: &str) -> StoreResult<Vec<Budget>> {
        let ledgers = self.ledgers.lock().await;
        let mut budgets: Vec<Budget> = ledgers
            .get(user_id)
            .map(|l| l.budgets.values().cloned().collect())
            .unwrap_or_default();

        budgets.sort_by(|a, b| (&a.category, a.period).cmp(&(&b.category, b.period)));
        Ok(budgets)
    }

    async fn delete_budget(&self, user_id: &str, id: Uuid) -> StoreResult<()> {
        let mut ledgers = self.ledgers.lock().await;
        if let Some(ledger) = ledgers.get_mut(user_id) {
            ledger.budgets.retain(|_, budget| budget.id != id);
        }
        Ok(())
    }

    async fn insert_recurring(
        &self,
        user_id: &str,
        template: &RecurringExpense,
    ) -> StoreResult<RecurringExpense> {
        let mut ledgers = self.ledgers.lock().await;
        let ledger = ledgers.entry(user_id.to_string()).or_default();
        ledger.recurring.insert(template.id, template.clone());
        Ok(template.clone())
    }

    async fn list_recurring(&self, user_id: &str) -> StoreResult<Vec<RecurringExpense>> {
        let ledgers = self.ledgers.lock().await;
        let mut templates: Vec<RecurringExpense> = ledgers
            .get(user_id)
            .map(|l| l.recurring.values().cloned().collect())
            .unwrap_or_default();

        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(templates)
    }

    async fn list_active_recurring(&self, user_id: &str) -> StoreResult<Vec<RecurringExpense>> {
        let mut templates = self.list_recurring(user_id).await?;
        templates.retain(|t| t.active);
        Ok(templates)
    }

    async fn delete_recurring(&self, user_id: &str, id: Uuid) -> StoreResult<()> {
        let mut ledgers = self.ledgers.lock().await;
        if let Some(ledger) = ledgers.get_mut(user_id) {
            ledger.recurring.remove(&id);
        }
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
        let mut ledgers = self.ledgers.lock().await;
        let Some(ledger) = ledgers.get_mut(user_id) else {
            return Ok(false);
        };

        match ledger.recurring.get(&template_id) {
            Some(template) if template.active && template.next_due == expected_due => {}
            _ => return Ok(false),
        }
        let balance = adjusted_balance(
            ledger.balance.as_ref(),
            BalanceDelta::charge(expense),
            expense.created_at,
        )?;

        if let Some(template) = ledger.recurring.get_mut(&template_id) {
            template.next_due = advanced;
        }
        ledger.expenses.insert(expense.id, expense.clone());
        if balance.is_some() {
            ledger.balance = balance;
        }

        Ok(true)
    }

    async fn users_with_due_recurring(&self, now: DateTime<Utc>) -> StoreResult<Vec<String>> {
        let ledgers = self.ledgers.lock().await;
        let mut users: Vec<String> = ledgers
            .iter()
            .filter(|(_, l)| l.recurring.values().any(|t| t.is_due(now)))
            .map(|(user, _)| user.clone())
            .collect();

        users.sort();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{expense::PaymentType, recurring::Frequency};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap()
    }

    fn expense(kind: PaymentType, amount: i64) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            amount: Decimal::new(amount, 0),
            kind,
            category: "Food".to_string(),
            description: String::new(),
            date: now(),
            created_at: now(),
        }
    }

    fn balance(cash: i64, online: i64) -> Balance {
        Balance {
            cash_amount: Decimal::new(cash, 0),
            online_amount: Decimal::new(online, 0),
            updated_at: Some(now()),
        }
    }

    #[tokio::test]
    async fn test_insert_without_balance_leaves_balance_absent() {
        let store = MemoryLedgerStore::new();

        store
            .insert_expense("u1", &expense(PaymentType::Cash, 10), now())
            .await
            .unwrap();

        assert!(store.get_balance("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ledgers_are_isolated_per_user() {
        let store = MemoryLedgerStore::new();
        let e = expense(PaymentType::Cash, 10);
        store.insert_expense("alice", &e, now()).await.unwrap();

        assert!(store.get_expense("bob", e.id).await.unwrap().is_none());
        assert!(store.delete_expense("bob", e.id, now()).await.unwrap().is_none());
        assert!(store.get_expense("alice", e.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_refunds_balance() {
        let store = MemoryLedgerStore::new();
        store.set_balance("u1", &balance(100, 100)).await.unwrap();
        let e = expense(PaymentType::Cash, 20);
        store.insert_expense("u1", &e, now()).await.unwrap();

        store.delete_expense("u1", e.id, now()).await.unwrap();

        let b = store.get_balance("u1").await.unwrap().unwrap();
        assert_eq!(b.cash_amount, Decimal::new(100, 0));
        assert_eq!(b.online_amount, Decimal::new(100, 0));
    }

    #[tokio::test]
    async fn test_fire_recurring_is_compare_and_swap() {
        let store = MemoryLedgerStore::new();
        let due = now() - Duration::days(1);
        let template = RecurringExpense {
            id: Uuid::new_v4(),
            amount: Decimal::new(5, 0),
            kind: PaymentType::Online,
            category: "Subscriptions".to_string(),
            description: "news".to_string(),
            frequency: Frequency::Daily,
            next_due: due,
            active: true,
            created_at: due,
        };
        store.insert_recurring("u1", &template).await.unwrap();
        let advanced = Frequency::Daily.advance(due).unwrap();

        let first = store
            .fire_recurring("u1", template.id, due, advanced, &template.materialize(now()))
            .await
            .unwrap();
        let second = store
            .fire_recurring("u1", template.id, due, advanced, &template.materialize(now()))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        let expenses = store
            .list_expenses("u1", &ExpenseFilter::default())
            .await
            .unwrap();
        assert_eq!(expenses.len(), 1);
    }

    #[tokio::test]
    async fn test_users_with_due_recurring_skips_inactive() {
        let store = MemoryLedgerStore::new();
        let due = now() - Duration::hours(1);
        let mut template = RecurringExpense {
            id: Uuid::new_v4(),
            amount: Decimal::new(5, 0),
            kind: PaymentType::Cash,
            category: "Gym".to_string(),
            description: String::new(),
            frequency: Frequency::Monthly,
            next_due: due,
            active: true,
            created_at: due,
        };
        store.insert_recurring("due-user", &template).await.unwrap();
        template.id = Uuid::new_v4();
        template.active = false;
        store.insert_recurring("idle-user", &template).await.unwrap();

        let users = store.users_with_due_recurring(now()).await.unwrap();

        assert_eq!(users, vec!["due-user".to_string()]);
    }

    #[tokio::test]
    async fn test_out_of_range_adjustment_writes_nothing() {
        use crate::{models::balance::MAX_BALANCE, store::StoreError};

        let store = MemoryLedgerStore::new();
        let floor = Balance {
            cash_amount: -Decimal::from(MAX_BALANCE),
            online_amount: Decimal::ZERO,
            updated_at: Some(now()),
        };
        store.set_balance("u1", &floor).await.unwrap();

        let e = expense(PaymentType::Cash, 5);
        let err = store.insert_expense("u1", &e, now()).await.unwrap_err();
        assert!(matches!(err, StoreError::BalanceOutOfRange));

        assert!(store.get_expense("u1", e.id).await.unwrap().is_none());
        assert_eq!(store.get_balance("u1").await.unwrap(), Some(floor));

        let due = now() - Duration::days(1);
        let template = RecurringExpense {
            id: Uuid::new_v4(),
            amount: Decimal::new(5, 0),
            kind: PaymentType::Cash,
            category: "Rent".to_string(),
            description: String::new(),
            frequency: Frequency::Daily,
            next_due: due,
            active: true,
            created_at: due,
        };
        store.insert_recurring("u1", &template).await.unwrap();
        let advanced = Frequency::Daily.advance(due).unwrap();

        let fired = store
            .fire_recurring("u1", template.id, due, advanced, &template.materialize(now()))
            .await;
        assert!(matches!(fired, Err(StoreError::BalanceOutOfRange)));

        let templates = store.list_recurring("u1").await.unwrap();
        assert_eq!(templates[0].next_due, due);
        let all = store
            .list_expenses("u1", &ExpenseFilter::default())
            .await
            .unwrap();
        assert!(all.is_empty());
    }
}
