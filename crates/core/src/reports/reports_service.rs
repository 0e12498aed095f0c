use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{AgeBucket, AgeingRow, CategoryOutstanding, CurrencyTotal};
use crate::errors::Result;
use crate::ledger::{Expense, ExpenseRepositoryTrait};

pub trait ReportsServiceTrait: Send + Sync {
    /// Totals and counts per transaction currency.
    fn summary(&self) -> Result<Vec<CurrencyTotal>>;

    /// Home-currency amount still owed, per category.
    fn outstanding(&self) -> Result<Vec<CategoryOutstanding>>;

    /// Unreimbursed home-currency amount by age relative to `today`.
    fn ageing(&self, today: NaiveDate) -> Result<Vec<AgeingRow>>;
}

/// Aggregates computed in memory so money stays in `Decimal`.
pub struct ReportsService {
    repository: Arc<dyn ExpenseRepositoryTrait>,
}

impl ReportsService {
    pub fn new(repository: Arc<dyn ExpenseRepositoryTrait>) -> Self {
        Self { repository }
    }
}

fn is_outstanding(expense: &Expense) -> bool {
    expense.reimbursable && !expense.is_reimbursed()
}

impl ReportsServiceTrait for ReportsService {
    fn summary(&self) -> Result<Vec<CurrencyTotal>> {
        let mut totals: BTreeMap<String, CurrencyTotal> = BTreeMap::new();
        for expense in self.repository.load_all_expenses()? {
            let entry = totals
                .entry(expense.currency.clone())
                .or_insert_with(|| CurrencyTotal {
                    currency: expense.currency.clone(),
                    total_amount: Decimal::ZERO,
                    count: 0,
                });
            entry.total_amount += expense.amount;
            entry.count += 1;
        }
        Ok(totals.into_values().collect())
    }

    fn outstanding(&self) -> Result<Vec<CategoryOutstanding>> {
        let names: HashMap<i64, String> = self
            .repository
            .list_categories()?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let mut totals: BTreeMap<Option<i64>, Decimal> = BTreeMap::new();
        for expense in self
            .repository
            .load_all_expenses()?
            .into_iter()
            .filter(is_outstanding)
        {
            *totals.entry(expense.category_id).or_default() += expense.home_amount();
        }

        Ok(totals
            .into_iter()
            .map(|(category_id, total_outstanding)| CategoryOutstanding {
                category_id,
                category_name: category_id.and_then(|id| names.get(&id).cloned()),
                total_outstanding,
            })
            .collect())
    }

    fn ageing(&self, today: NaiveDate) -> Result<Vec<AgeingRow>> {
        let mut buckets: BTreeMap<AgeBucket, Decimal> = BTreeMap::new();
        for expense in self
            .repository
            .load_all_expenses()?
            .into_iter()
            .filter(|e| !e.is_reimbursed())
        {
            let age = (today - expense.txn_date).num_days();
            *buckets.entry(AgeBucket::for_age_days(age)).or_default() += expense.home_amount();
        }
        Ok(buckets
            .into_iter()
            .map(|(bucket, total)| AgeingRow { bucket, total })
            .collect())
    }
}
