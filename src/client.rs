//! Ties the HTTP client and the query cache together into the operations
//! the app's UI calls.
//!
//! Mutations follow the optimistic pattern throughout: snapshot the cached
//! list, patch it in place, issue the network call, and restore the
//! snapshot when the call fails. Invalidations fire only after a success
//! response is observed, never speculatively.

use std::{future::Future, sync::Arc, time::Duration};

use time::{Date, OffsetDateTime};

use crate::{
    Error,
    api::{ApiClient, BudgetApi},
    cache::{Mutation, QueryCache},
    config::ClientConfig,
    csv::{SkippedRow, parse_transactions_csv, serialize_transactions},
    import::import_rows,
    models::{
        BankLink, BudgetGoal, BulkImportResult, Category, CategoryDraft, CategoryId,
        CheckoutSession, LinkSession, Plan, SubscriptionStatus, SummaryPeriod, Transaction,
        TransactionDraft, TransactionId, TransactionSummary, YearMonth,
    },
};

/// The ID given to an optimistically prepended transaction until the
/// server assigns the real one. Server IDs are always positive.
const PENDING_ID: TransactionId = -1;

/// The outcome of importing a CSV document: the server's result plus the
/// rows the parser dropped before submission.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvImportOutcome {
    /// The server's verbatim import result.
    pub result: BulkImportResult,
    /// Rows dropped during parsing, with line numbers and reasons.
    pub skipped: Vec<SkippedRow>,
}

/// The client-side face of the budgeting service.
///
/// Owns the [QueryCache] for one authenticated session and a [BudgetApi]
/// implementation. All reads are served from the cache when fresh and
/// fetched single-flight otherwise; all mutations keep the cache consistent
/// per the invalidation rules in [crate::cache].
pub struct BudgetClient<A: BudgetApi> {
    api: A,
    cache: QueryCache,
    timeout: Duration,
    #[cfg(test)]
    fixed_today: Option<Date>,
}

impl BudgetClient<ApiClient> {
    /// Builds a client backed by the real HTTP API.
    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        Ok(Self::new(ApiClient::new(config)?, config.timeout()))
    }
}

impl<A: BudgetApi> BudgetClient<A> {
    /// Builds a client over any [BudgetApi] implementation with an empty
    /// cache.
    ///
    /// `timeout` bounds the slow operations (bulk import, bank removal);
    /// ordinary CRUD calls are not raced against it.
    pub fn new(api: A, timeout: Duration) -> Self {
        Self {
            api,
            cache: QueryCache::new(),
            timeout,
            #[cfg(test)]
            fixed_today: None,
        }
    }

    #[cfg(test)]
    fn with_today(api: A, timeout: Duration, today: Date) -> Self {
        Self {
            fixed_today: Some(today),
            ..Self::new(api, timeout)
        }
    }

    /// The session's cache, for inspection and for sharing with other
    /// components that need to read cached values.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn today(&self) -> Date {
        #[cfg(test)]
        if let Some(today) = self.fixed_today {
            return today;
        }

        OffsetDateTime::now_utc().date()
    }

    /// Races an operation against the client-enforced timeout.
    ///
    /// A timeout only means the client stops waiting; the request is not
    /// cancelled server-side and may still complete.
    async fn with_timeout<T>(
        &self,
        operation: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }

    // --- Reads -----------------------------------------------------------

    /// The transaction list, fetched when absent or stale.
    pub async fn transactions(&self) -> Result<Vec<Arc<Transaction>>, Error> {
        self.cache
            .transactions()
            .get_or_fetch(|| async {
                let transactions = self.api.transactions().await?;
                Ok(transactions.into_iter().map(Arc::new).collect())
            })
            .await
    }

    /// The server-computed totals for one period.
    pub async fn summary(&self, period: SummaryPeriod) -> Result<TransactionSummary, Error> {
        let entry = self.cache.summary(period);
        entry
            .get_or_fetch(|| self.api.transaction_summary(period))
            .await
    }

    /// The category list.
    pub async fn categories(&self) -> Result<Vec<Category>, Error> {
        self.cache
            .categories()
            .get_or_fetch(|| self.api.categories())
            .await
    }

    /// The budget goals for one month.
    pub async fn budget_goals(&self, month: YearMonth) -> Result<Vec<BudgetGoal>, Error> {
        let entry = self.cache.budget_goals(month);
        entry.get_or_fetch(|| self.api.budget_goals(month)).await
    }

    /// The user's subscription status.
    pub async fn subscription(&self) -> Result<SubscriptionStatus, Error> {
        self.cache
            .subscription()
            .get_or_fetch(|| self.api.subscription())
            .await
    }

    // --- Transaction mutations -------------------------------------------

    /// Creates a transaction.
    ///
    /// The cached list is patched with a placeholder record before the call
    /// and the placeholder is swapped for the server's record on success;
    /// the list itself is never invalidated. Summaries and the affected
    /// budget months go stale.
    pub async fn add_transaction(&self, draft: TransactionDraft) -> Result<Transaction, Error> {
        let snapshot = self.cache.transactions().snapshot();
        self.cache
            .prepend_transaction(Arc::new(draft.clone().into_transaction(PENDING_ID, None)));

        match self.api.create_transaction(&draft).await {
            Ok(created) => {
                self.cache
                    .replace_transaction(PENDING_ID, Arc::new(created.clone()));
                self.cache.invalidate_after(
                    &Mutation::AddTransaction { date: created.date },
                    self.today(),
                );
                Ok(created)
            }
            Err(error) => {
                self.cache.transactions().restore(snapshot);
                Err(error)
            }
        }
    }

    /// Updates a transaction by ID.
    ///
    /// When the pre-edit record is not cached, the months whose budget
    /// goals are affected cannot be computed and every cached budget month
    /// is invalidated instead.
    pub async fn edit_transaction(
        &self,
        id: TransactionId,
        draft: TransactionDraft,
    ) -> Result<Transaction, Error> {
        let previous = self.cache.transaction_by_id(id);
        let snapshot = self.cache.transactions().snapshot();

        let bank_link = previous.as_ref().and_then(|cached| cached.bank_link.clone());
        self.cache
            .replace_transaction(id, Arc::new(draft.clone().into_transaction(id, bank_link)));

        match self.api.update_transaction(id, &draft).await {
            Ok(updated) => {
                self.cache.replace_transaction(id, Arc::new(updated.clone()));
                self.cache.invalidate_after(
                    &Mutation::EditTransaction {
                        old_date: previous.map(|cached| cached.date),
                        new_date: updated.date,
                    },
                    self.today(),
                );
                Ok(updated)
            }
            Err(error) => {
                self.cache.transactions().restore(snapshot);
                Err(error)
            }
        }
    }

    /// Deletes a transaction by ID.
    pub async fn delete_transaction(&self, id: TransactionId) -> Result<(), Error> {
        let previous = self.cache.transaction_by_id(id);
        let snapshot = self.cache.transactions().snapshot();

        self.cache.remove_transaction(id);

        match self.api.delete_transaction(id).await {
            Ok(()) => {
                self.cache.invalidate_after(
                    &Mutation::DeleteTransaction {
                        date: previous.map(|cached| cached.date),
                    },
                    self.today(),
                );
                Ok(())
            }
            Err(error) => {
                self.cache.transactions().restore(snapshot);
                Err(error)
            }
        }
    }

    // --- Import / export -------------------------------------------------

    /// Parses a CSV document and submits its rows as one bulk import.
    ///
    /// Parsing problems with individual rows do not abort the import; they
    /// are reported in [CsvImportOutcome::skipped]. A missing required
    /// column aborts before any network call.
    pub async fn import_csv(&self, text: &str) -> Result<CsvImportOutcome, Error> {
        let parsed = parse_transactions_csv(text)?;

        if parsed.rows.is_empty() {
            return Err(Error::EmptyImport);
        }

        let result = import_rows(&self.api, &self.cache, &parsed.rows, self.timeout).await?;

        Ok(CsvImportOutcome {
            result,
            skipped: parsed.skipped,
        })
    }

    /// Renders the user's transactions as CSV text for download.
    pub async fn export_csv(&self) -> Result<String, Error> {
        let transactions = self.transactions().await?;
        let names = self
            .categories()
            .await?
            .into_iter()
            .map(|category| (category.id, category.name))
            .collect();

        Ok(serialize_transactions(
            transactions.iter().map(|transaction| transaction.as_ref()),
            &names,
        ))
    }

    // --- Budget goals ----------------------------------------------------

    /// Sets (upserting) the budget for one category and month. Only that
    /// month's goal cache goes stale.
    pub async fn set_budget_goal(
        &self,
        category_id: CategoryId,
        month: YearMonth,
        monthly_budget: f64,
    ) -> Result<BudgetGoal, Error> {
        let goal = self
            .api
            .set_budget_goal(category_id, month, monthly_budget)
            .await?;
        self.cache
            .invalidate_after(&Mutation::BudgetGoalChanged { month }, self.today());
        Ok(goal)
    }

    /// Removes the budget for one category and month.
    pub async fn delete_budget_goal(
        &self,
        category_id: CategoryId,
        month: YearMonth,
    ) -> Result<(), Error> {
        self.api.delete_budget_goal(category_id, month).await?;
        self.cache
            .invalidate_after(&Mutation::BudgetGoalChanged { month }, self.today());
        Ok(())
    }

    // --- Categories ------------------------------------------------------

    /// Creates a category and patches the cached list.
    pub async fn create_category(&self, draft: CategoryDraft) -> Result<Category, Error> {
        let category = self.api.create_category(&draft).await?;
        self.cache
            .categories()
            .patch(|list| list.push(category.clone()));
        Ok(category)
    }

    /// Updates a category by ID and patches the cached list.
    pub async fn update_category(
        &self,
        id: CategoryId,
        draft: CategoryDraft,
    ) -> Result<Category, Error> {
        let category = self.api.update_category(id, &draft).await?;
        self.cache.categories().patch(|list| {
            if let Some(slot) = list.iter_mut().find(|cached| cached.id == id) {
                *slot = category.clone();
            }
        });
        Ok(category)
    }

    /// Deletes a category by ID.
    ///
    /// # Errors
    ///
    /// Returns [Error::DefaultCategoryDelete] without issuing a network
    /// call when the cached category is one of the built-in defaults.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), Error> {
        if let Some(categories) = self.cache.categories().value() {
            if categories
                .iter()
                .any(|category| category.id == id && category.is_default)
            {
                return Err(Error::DefaultCategoryDelete);
            }
        }

        self.api.delete_category(id).await?;
        self.cache
            .categories()
            .patch(|list| list.retain(|category| category.id != id));
        Ok(())
    }

    // --- Bank connections ------------------------------------------------

    /// Opens a link session with the bank-aggregation service.
    pub async fn create_link_session(&self) -> Result<LinkSession, Error> {
        self.api.create_link_session().await
    }

    /// Exchanges the aggregation SDK's public token for a connected bank.
    pub async fn connect_bank(&self, public_token: &str) -> Result<BankLink, Error> {
        self.api.exchange_public_token(public_token).await
    }

    /// Lists the user's connected banks. Not cached; the list is read
    /// rarely and only from the settings screen.
    pub async fn bank_links(&self) -> Result<Vec<BankLink>, Error> {
        self.api.bank_links().await
    }

    /// Triggers a sync for one connected bank, then forces the transaction
    /// list and summaries to refetch, since the sync may have inserted
    /// records.
    pub async fn sync_bank(&self, id: &str) -> Result<(), Error> {
        self.api.sync_bank(id).await?;
        self.cache.transactions().invalidate();
        self.cache.invalidate_summaries();
        Ok(())
    }

    /// Disconnects a bank, keeping its historical transactions. Applies
    /// the client-enforced timeout.
    pub async fn disconnect_bank(&self, id: &str) -> Result<(), Error> {
        self.with_timeout(self.api.disconnect_bank(id)).await?;
        self.cache
            .invalidate_after(&Mutation::BankRemoved, self.today());
        Ok(())
    }

    /// Removes a bank connection and its synced transactions. Applies the
    /// client-enforced timeout.
    pub async fn remove_bank(&self, id: &str) -> Result<(), Error> {
        self.with_timeout(self.api.remove_bank(id)).await?;
        self.cache
            .invalidate_after(&Mutation::BankRemoved, self.today());
        Ok(())
    }

    // --- Subscription ----------------------------------------------------

    /// Lists the plans available for checkout.
    pub async fn plans(&self) -> Result<Vec<Plan>, Error> {
        self.api.plans().await
    }

    /// Creates a hosted checkout session for one plan.
    pub async fn create_checkout_session(&self, plan_id: &str) -> Result<CheckoutSession, Error> {
        self.api.create_checkout_session(plan_id).await
    }

    /// Cancels the subscription and stores the returned status.
    pub async fn cancel_subscription(&self) -> Result<SubscriptionStatus, Error> {
        let status = self.api.cancel_subscription().await?;
        self.cache.subscription().set(status.clone());
        Ok(status)
    }

    /// Resumes a cancelled subscription and stores the returned status.
    pub async fn resume_subscription(&self) -> Result<SubscriptionStatus, Error> {
        let status = self.api.resume_subscription().await?;
        self.cache.subscription().set(status.clone());
        Ok(status)
    }

    // --- Session ---------------------------------------------------------

    /// Clears every cached value. Called on logout; keys repopulate lazily
    /// after the next login.
    pub fn log_out(&self) {
        tracing::debug!("clearing session cache on logout");
        self.cache.clear();
    }
}

#[cfg(test)]
mod budget_client_tests {
    use std::{sync::Arc, time::Duration};

    use time::macros::date;

    use crate::{
        Error,
        cache::CacheStatus,
        models::{
            SummaryPeriod, Transaction, TransactionDraft, TransactionType, YearMonth,
        },
        test_utils::{StubApi, category, goal},
    };

    use super::BudgetClient;

    const TIMEOUT: Duration = Duration::from_secs(30);
    const TODAY: time::Date = date!(2024 - 03 - 15);

    const JANUARY: YearMonth = YearMonth { year: 2024, month: 1 };
    const MARCH: YearMonth = YearMonth { year: 2024, month: 3 };

    fn transaction(id: i64, date: time::Date) -> Transaction {
        Transaction {
            id,
            amount: 10.0,
            description: format!("transaction {id}"),
            category_id: 1,
            date,
            transaction_type: TransactionType::Expense,
            bank_link: None,
        }
    }

    fn draft(date: time::Date) -> TransactionDraft {
        TransactionDraft {
            amount: 25.0,
            description: "lunch".to_owned(),
            category_id: 1,
            date,
            transaction_type: TransactionType::Expense,
        }
    }

    fn client_with_data() -> BudgetClient<StubApi> {
        let api = StubApi::new();
        api.set_transactions(vec![
            transaction(1, date!(2024 - 03 - 10)),
            transaction(2, date!(2024 - 02 - 20)),
        ]);
        api.set_goals(vec![goal(1, MARCH)]);
        BudgetClient::with_today(api, TIMEOUT, TODAY)
    }

    #[tokio::test]
    async fn reads_are_served_from_cache_after_the_first_fetch() {
        let client = client_with_data();

        client.transactions().await.expect("fetch failed");
        client.transactions().await.expect("fetch failed");

        assert_eq!(client.api.calls("transactions"), 1);
    }

    #[tokio::test]
    async fn add_patches_the_list_and_invalidates_summaries_and_months() {
        let client = client_with_data();
        client.transactions().await.expect("fetch failed");
        for period in SummaryPeriod::ALL {
            client.summary(period).await.expect("fetch failed");
        }
        client.budget_goals(JANUARY).await.expect("fetch failed");
        client.budget_goals(MARCH).await.expect("fetch failed");

        // Dated in January while "today" is in March: both months' budget
        // caches must go stale.
        let created = client
            .add_transaction(draft(date!(2024 - 01 - 05)))
            .await
            .expect("add failed");

        let cache = client.cache();
        assert_eq!(
            cache.transactions().status(),
            CacheStatus::Fresh,
            "the list must be patched, not invalidated"
        );
        let list = cache.transactions().value().expect("no cached list");
        assert_eq!(list[0].id, created.id, "the new record must be prepended");
        assert_eq!(list.len(), 3);

        for period in SummaryPeriod::ALL {
            assert_eq!(cache.summary(period).status(), CacheStatus::Stale);
        }
        assert_eq!(cache.budget_goals(JANUARY).status(), CacheStatus::Stale);
        assert_eq!(cache.budget_goals(MARCH).status(), CacheStatus::Stale);
    }

    #[tokio::test]
    async fn edit_replaces_only_the_edited_record() {
        let client = client_with_data();
        let before = client.transactions().await.expect("fetch failed");
        for period in SummaryPeriod::ALL {
            client.summary(period).await.expect("fetch failed");
        }

        client
            .edit_transaction(1, draft(date!(2024 - 03 - 11)))
            .await
            .expect("edit failed");

        let after = client
            .cache()
            .transactions()
            .value()
            .expect("no cached list");
        assert!(
            !Arc::ptr_eq(&before[0], &after[0]),
            "the edited record must be a new object"
        );
        assert!(
            Arc::ptr_eq(&before[1], &after[1]),
            "unrelated records must keep their identity"
        );
        for period in SummaryPeriod::ALL {
            assert_eq!(
                client.cache().summary(period).status(),
                CacheStatus::Stale
            );
        }
    }

    #[tokio::test]
    async fn failed_add_rolls_back_the_optimistic_prepend() {
        let client = client_with_data();
        let before = client.transactions().await.expect("fetch failed");

        client.api.fail_next_call();
        let result = client.add_transaction(draft(date!(2024 - 03 - 12))).await;

        assert!(matches!(result, Err(Error::Api { .. })));
        let after = client
            .cache()
            .transactions()
            .value()
            .expect("no cached list");
        assert_eq!(before.len(), after.len(), "the prepend must be rolled back");
        assert!(Arc::ptr_eq(&before[0], &after[0]));
    }

    #[tokio::test]
    async fn failed_edit_restores_the_original_record() {
        let client = client_with_data();
        let before = client.transactions().await.expect("fetch failed");

        client.api.fail_next_call();
        let result = client.edit_transaction(1, draft(date!(2024 - 03 - 12))).await;

        assert!(result.is_err());
        let after = client
            .cache()
            .transactions()
            .value()
            .expect("no cached list");
        assert!(Arc::ptr_eq(&before[0], &after[0]));
    }

    #[tokio::test]
    async fn failed_delete_restores_the_removed_record() {
        let client = client_with_data();
        client.transactions().await.expect("fetch failed");

        client.api.fail_next_call();
        let result = client.delete_transaction(1).await;

        assert!(result.is_err());
        let list = client
            .cache()
            .transactions()
            .value()
            .expect("no cached list");
        assert_eq!(list.len(), 2, "the removal must be rolled back");
    }

    #[tokio::test]
    async fn delete_patches_the_list_and_invalidates_months() {
        let client = client_with_data();
        client.transactions().await.expect("fetch failed");
        client.budget_goals(MARCH).await.expect("fetch failed");

        client.delete_transaction(1).await.expect("delete failed");

        let cache = client.cache();
        assert_eq!(cache.transactions().status(), CacheStatus::Fresh);
        let list = cache.transactions().value().expect("no cached list");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, 2);
        assert_eq!(cache.budget_goals(MARCH).status(), CacheStatus::Stale);
    }

    #[tokio::test]
    async fn deleting_a_default_category_is_refused_client_side() {
        let client = client_with_data();
        client
            .api
            .set_categories(vec![category(1, "Groceries", true)]);
        client.categories().await.expect("fetch failed");

        let result = client.delete_category(1).await;

        assert!(matches!(result, Err(Error::DefaultCategoryDelete)));
        assert_eq!(client.api.calls("delete_category"), 0);
    }

    #[tokio::test]
    async fn budget_goal_change_touches_only_its_month() {
        let client = client_with_data();
        client.transactions().await.expect("fetch failed");
        client.budget_goals(JANUARY).await.expect("fetch failed");
        client.budget_goals(MARCH).await.expect("fetch failed");

        client
            .set_budget_goal(1, JANUARY, 400.0)
            .await
            .expect("set failed");

        let cache = client.cache();
        assert_eq!(cache.budget_goals(JANUARY).status(), CacheStatus::Stale);
        assert_eq!(cache.budget_goals(MARCH).status(), CacheStatus::Fresh);
        assert_eq!(cache.transactions().status(), CacheStatus::Fresh);
    }

    #[tokio::test]
    async fn remove_bank_invalidates_transactions_and_categories() {
        let client = client_with_data();
        client.transactions().await.expect("fetch failed");
        client.categories().await.expect("fetch failed");

        client.remove_bank("bank-1").await.expect("remove failed");

        assert_eq!(
            client.cache().transactions().status(),
            CacheStatus::Stale
        );
        assert_eq!(client.cache().categories().status(), CacheStatus::Stale);
    }

    #[tokio::test]
    async fn log_out_clears_every_cached_group() {
        let client = client_with_data();
        client.transactions().await.expect("fetch failed");
        client.subscription().await.expect("fetch failed");

        client.log_out();

        assert_eq!(client.cache().transactions().status(), CacheStatus::Absent);
        assert_eq!(client.cache().subscription().status(), CacheStatus::Absent);
    }

    #[tokio::test]
    async fn export_renders_cached_transactions_with_category_names() {
        let client = client_with_data();
        client
            .api
            .set_categories(vec![category(1, "Groceries", false)]);

        let text = client.export_csv().await.expect("export failed");

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Type,Category,Description,Amount,Bank,Account")
        );
        assert_eq!(
            lines.next(),
            Some("2024-03-10,expense,Groceries,transaction 1,10,,")
        );
    }
}
