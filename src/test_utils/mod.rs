//! Helper functions and stub implementations shared between unit tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicI64, Ordering},
    },
    time::Duration,
};

use time::macros::date;

use crate::{
    Error,
    api::BudgetApi,
    models::{
        BankLink, BankLinkStatus, BudgetGoal, BudgetStatus, BulkImportResult, Category,
        CategoryDraft, CategoryId, CategoryType, CheckoutSession, LinkSession, Plan,
        SubscriptionStatus, SummaryPeriod, Transaction, TransactionDraft, TransactionId,
        TransactionSummary, YearMonth,
    },
};

/// A fixed summary used wherever the exact totals do not matter.
pub fn summary() -> TransactionSummary {
    TransactionSummary {
        income: 3000.0,
        expenses: 1200.0,
        net: 1800.0,
    }
}

/// A budget goal for the given category and month.
pub fn goal(category_id: CategoryId, month: YearMonth) -> BudgetGoal {
    BudgetGoal {
        category_id,
        month,
        monthly_budget: Some(500.0),
        spent_amount: 120.0,
        status: BudgetStatus::Budgeted,
    }
}

/// An active subscription.
pub fn subscription() -> SubscriptionStatus {
    SubscriptionStatus {
        plan: Some("plus-monthly".to_owned()),
        active: true,
        renews_at: Some(date!(2024 - 04 - 01)),
    }
}

/// A category with the given name.
pub fn category(id: CategoryId, name: &str, is_default: bool) -> Category {
    Category {
        id,
        name: name.to_owned(),
        color: "#4caf50".to_owned(),
        icon: "cart".to_owned(),
        category_type: CategoryType::Both,
        is_default,
    }
}

/// An in-memory [BudgetApi] for exercising the coordinator and cache layers
/// without a server.
///
/// Every call is counted by method name; mutations hand back records built
/// from the submitted drafts with IDs from an internal counter.
pub struct StubApi {
    transactions: Mutex<Vec<Transaction>>,
    categories: Mutex<Vec<Category>>,
    goals: Mutex<Vec<BudgetGoal>>,
    import_result: Mutex<Option<BulkImportResult>>,
    import_delay: Mutex<Option<Duration>>,
    last_import_body: Mutex<Option<String>>,
    fail_next: AtomicBool,
    next_id: AtomicI64,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl StubApi {
    pub fn new() -> Self {
        Self {
            transactions: Mutex::new(Vec::new()),
            categories: Mutex::new(Vec::new()),
            goals: Mutex::new(Vec::new()),
            import_result: Mutex::new(None),
            import_delay: Mutex::new(None),
            last_import_body: Mutex::new(None),
            fail_next: AtomicBool::new(false),
            next_id: AtomicI64::new(100),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_transactions(&self, transactions: Vec<Transaction>) {
        *self.transactions.lock().unwrap() = transactions;
    }

    pub fn set_categories(&self, categories: Vec<Category>) {
        *self.categories.lock().unwrap() = categories;
    }

    pub fn set_goals(&self, goals: Vec<BudgetGoal>) {
        *self.goals.lock().unwrap() = goals;
    }

    pub fn set_import_result(&self, result: BulkImportResult) {
        *self.import_result.lock().unwrap() = Some(result);
    }

    pub fn set_import_delay(&self, delay: Duration) {
        *self.import_delay.lock().unwrap() = Some(delay);
    }

    /// Makes the next call fail with a server error.
    pub fn fail_next_call(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// How many times the named method has been called.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn import_calls(&self) -> usize {
        self.calls("import_transactions")
    }

    /// The CSV text most recently submitted to the import endpoint.
    pub fn last_import_body(&self) -> Option<String> {
        self.last_import_body.lock().unwrap().clone()
    }

    fn begin(&self, method: &'static str) -> Result<(), Error> {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::Api {
                status: 500,
                message: "stub failure".to_owned(),
            });
        }

        Ok(())
    }

    fn next_id(&self) -> TransactionId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl BudgetApi for StubApi {
    async fn transactions(&self) -> Result<Vec<Transaction>, Error> {
        self.begin("transactions")?;
        Ok(self.transactions.lock().unwrap().clone())
    }

    async fn create_transaction(&self, draft: &TransactionDraft) -> Result<Transaction, Error> {
        self.begin("create_transaction")?;
        Ok(draft.clone().into_transaction(self.next_id(), None))
    }

    async fn update_transaction(
        &self,
        id: TransactionId,
        draft: &TransactionDraft,
    ) -> Result<Transaction, Error> {
        self.begin("update_transaction")?;
        Ok(draft.clone().into_transaction(id, None))
    }

    async fn delete_transaction(&self, _id: TransactionId) -> Result<(), Error> {
        self.begin("delete_transaction")
    }

    async fn transaction_summary(
        &self,
        _period: SummaryPeriod,
    ) -> Result<TransactionSummary, Error> {
        self.begin("transaction_summary")?;
        Ok(summary())
    }

    async fn import_transactions(&self, csv_text: &str) -> Result<BulkImportResult, Error> {
        self.begin("import_transactions")?;
        *self.last_import_body.lock().unwrap() = Some(csv_text.to_owned());

        let delay = *self.import_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self
            .import_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(BulkImportResult {
                imported_count: 0,
                created_categories: vec![],
                failed_rows: vec![],
            }))
    }

    async fn categories(&self) -> Result<Vec<Category>, Error> {
        self.begin("categories")?;
        Ok(self.categories.lock().unwrap().clone())
    }

    async fn create_category(&self, draft: &CategoryDraft) -> Result<Category, Error> {
        self.begin("create_category")?;
        Ok(Category {
            id: self.next_id(),
            name: draft.name.clone(),
            color: draft.color.clone(),
            icon: draft.icon.clone(),
            category_type: draft.category_type,
            is_default: false,
        })
    }

    async fn update_category(
        &self,
        id: CategoryId,
        draft: &CategoryDraft,
    ) -> Result<Category, Error> {
        self.begin("update_category")?;
        Ok(Category {
            id,
            name: draft.name.clone(),
            color: draft.color.clone(),
            icon: draft.icon.clone(),
            category_type: draft.category_type,
            is_default: false,
        })
    }

    async fn delete_category(&self, _id: CategoryId) -> Result<(), Error> {
        self.begin("delete_category")
    }

    async fn budget_goals(&self, _month: YearMonth) -> Result<Vec<BudgetGoal>, Error> {
        self.begin("budget_goals")?;
        Ok(self.goals.lock().unwrap().clone())
    }

    async fn set_budget_goal(
        &self,
        category_id: CategoryId,
        month: YearMonth,
        monthly_budget: f64,
    ) -> Result<BudgetGoal, Error> {
        self.begin("set_budget_goal")?;
        Ok(BudgetGoal {
            category_id,
            month,
            monthly_budget: Some(monthly_budget),
            spent_amount: 0.0,
            status: BudgetStatus::Budgeted,
        })
    }

    async fn delete_budget_goal(
        &self,
        _category_id: CategoryId,
        _month: YearMonth,
    ) -> Result<(), Error> {
        self.begin("delete_budget_goal")
    }

    async fn create_link_session(&self) -> Result<LinkSession, Error> {
        self.begin("create_link_session")?;
        Ok(LinkSession {
            link_token: "stub-link-token".to_owned(),
        })
    }

    async fn exchange_public_token(&self, _public_token: &str) -> Result<BankLink, Error> {
        self.begin("exchange_public_token")?;
        Ok(BankLink {
            id: "bank-1".to_owned(),
            institution_name: "Stub Bank".to_owned(),
            account_name: "Everyday".to_owned(),
            status: BankLinkStatus::Connected,
            last_synced: None,
        })
    }

    async fn bank_links(&self) -> Result<Vec<BankLink>, Error> {
        self.begin("bank_links")?;
        Ok(vec![])
    }

    async fn sync_bank(&self, _id: &str) -> Result<(), Error> {
        self.begin("sync_bank")
    }

    async fn disconnect_bank(&self, _id: &str) -> Result<(), Error> {
        self.begin("disconnect_bank")
    }

    async fn remove_bank(&self, _id: &str) -> Result<(), Error> {
        self.begin("remove_bank")
    }

    async fn subscription(&self) -> Result<SubscriptionStatus, Error> {
        self.begin("subscription")?;
        Ok(subscription())
    }

    async fn plans(&self) -> Result<Vec<Plan>, Error> {
        self.begin("plans")?;
        Ok(vec![Plan {
            id: "plus-monthly".to_owned(),
            name: "Plus".to_owned(),
            price_cents: 499,
        }])
    }

    async fn create_checkout_session(&self, _plan_id: &str) -> Result<CheckoutSession, Error> {
        self.begin("create_checkout_session")?;
        Ok(CheckoutSession {
            url: "https://pay.example.com/session/stub".to_owned(),
        })
    }

    async fn cancel_subscription(&self) -> Result<SubscriptionStatus, Error> {
        self.begin("cancel_subscription")?;
        Ok(SubscriptionStatus {
            active: false,
            ..subscription()
        })
    }

    async fn resume_subscription(&self) -> Result<SubscriptionStatus, Error> {
        self.begin("resume_subscription")?;
        Ok(subscription())
    }
}
