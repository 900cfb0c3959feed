//! The client-side query cache and its invalidation rules.
//!
//! The cache holds one entry per value-group the app reads: the transaction
//! list, per-period transaction summaries, per-month budget goals, the
//! category list, and the subscription status. Each entry moves through the
//! states absent → fetching → fresh → stale; staleness is resolved lazily on
//! the next read, never by a background refresh.
//!
//! Invalidation is deliberately asymmetric: summaries and budget goals are
//! server-computed aggregates that cannot be cheaply patched client-side, so
//! any mutation that could change totals invalidates them wholesale. The raw
//! transaction list, by contrast, is patched in place on single-record
//! mutations so an add, edit, or delete never forces a full-list refetch.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use time::Date;
use tokio::sync::watch;

use crate::{
    Error,
    models::{
        BudgetGoal, Category, SubscriptionStatus, SummaryPeriod, Transaction, TransactionId,
        TransactionSummary, YearMonth,
    },
};

/// The lifecycle state of one cached value-group.
enum CacheState<T> {
    /// Nothing has been fetched for this key yet.
    Absent,
    /// A fetch is in flight. Readers that arrive now wait on the channel
    /// instead of issuing a duplicate request.
    Fetching(watch::Receiver<()>),
    /// The cached value is current.
    Fresh(T),
    /// An invalidation rule fired; the value is served no longer and the
    /// next read refetches.
    Stale(T),
}

impl<T: Clone> Clone for CacheState<T> {
    fn clone(&self) -> Self {
        match self {
            CacheState::Absent => CacheState::Absent,
            CacheState::Fetching(rx) => CacheState::Fetching(rx.clone()),
            CacheState::Fresh(value) => CacheState::Fresh(value.clone()),
            CacheState::Stale(value) => CacheState::Stale(value.clone()),
        }
    }
}

/// The externally observable state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Nothing has been fetched for this key yet.
    Absent,
    /// A fetch is in flight.
    Fetching,
    /// The cached value is current.
    Fresh,
    /// The next read will refetch.
    Stale,
}

/// What a reader should do next, decided under the entry lock.
enum ReadAction<'a, T> {
    Done(T),
    Wait(watch::Receiver<()>),
    Fetch(FetchRollback<'a, T>),
}

/// Restores an entry's prior state when the fetching future ends without
/// completing, including being dropped mid-fetch.
///
/// The sender lives here so waiting readers are woken whichever way the
/// fetch ends; without the rollback a cancelled fetch would leave the
/// entry in the fetching state with no fetch in flight, wedging the key
/// for every later reader.
struct FetchRollback<'a, T> {
    entry: &'a Entry<T>,
    previous: Option<CacheState<T>>,
    _sender: watch::Sender<()>,
}

impl<T> FetchRollback<'_, T> {
    /// Stores the fetched value, marking the entry fresh. The prior state
    /// is discarded and the drop that follows only wakes the waiters.
    fn complete(mut self, value: T) {
        self.previous = None;
        *lock_state(self.entry) = CacheState::Fresh(value);
    }
}

impl<T> Drop for FetchRollback<'_, T> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *lock_state(self.entry) = previous;
        }
        // `_sender` drops after the state is settled, so woken readers
        // never observe the fetching state without a fetch in flight.
    }
}

fn lock_state<T>(entry: &Entry<T>) -> MutexGuard<'_, CacheState<T>> {
    entry
        .state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One cached value-group.
///
/// An entry is both the storage for the value and the coordination point
/// for single-flight fetching: concurrent readers of an entry that is
/// already being fetched all await the same in-flight result.
pub struct Entry<T> {
    state: Mutex<CacheState<T>>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(CacheState::Absent),
        }
    }
}

impl<T: Clone> Entry<T> {
    fn lock(&self) -> MutexGuard<'_, CacheState<T>> {
        // A poisoned lock only means another reader panicked partway
        // through; the state itself is always left consistent.
        lock_state(self)
    }

    /// The externally observable state of the entry.
    pub fn status(&self) -> CacheStatus {
        match &*self.lock() {
            CacheState::Absent => CacheStatus::Absent,
            CacheState::Fetching(_) => CacheStatus::Fetching,
            CacheState::Fresh(_) => CacheStatus::Fresh,
            CacheState::Stale(_) => CacheStatus::Stale,
        }
    }

    /// The cached value, fresh or stale, without triggering a fetch.
    pub fn value(&self) -> Option<T> {
        match &*self.lock() {
            CacheState::Fresh(value) | CacheState::Stale(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Marks the entry stale so the next read refetches. The last value is
    /// kept for rollback snapshots.
    pub fn invalidate(&self) {
        let mut state = self.lock();

        if let CacheState::Fresh(value) = &*state {
            *state = CacheState::Stale(value.clone());
        }
        // An in-flight fetch is left alone: it will land as fresh and any
        // staleness it races with is resolved by the next mutation.
    }

    /// Stores a value, marking the entry fresh.
    pub fn set(&self, value: T) {
        *self.lock() = CacheState::Fresh(value);
    }

    /// Drops everything cached for this entry.
    pub fn clear(&self) {
        *self.lock() = CacheState::Absent;
    }

    /// Patches the cached value in place without changing its freshness.
    ///
    /// Does nothing when no value is cached, since there is nothing to
    /// patch and the next read fetches the post-mutation state anyway.
    pub fn patch(&self, apply: impl FnOnce(&mut T)) {
        let mut state = self.lock();

        match &mut *state {
            CacheState::Fresh(value) | CacheState::Stale(value) => apply(value),
            _ => {}
        }
    }

    /// Clones the entry's state so an optimistic patch can be reverted.
    pub fn snapshot(&self) -> EntrySnapshot<T> {
        EntrySnapshot {
            state: self.lock().clone(),
        }
    }

    /// Restores a snapshot taken before an optimistic patch.
    pub fn restore(&self, snapshot: EntrySnapshot<T>) {
        *self.lock() = snapshot.state;
    }

    /// Returns the cached value, fetching it when the entry is absent or
    /// stale.
    ///
    /// Single-flight: when a fetch is already in flight, the caller awaits
    /// that fetch's completion and then re-reads rather than issuing a
    /// duplicate request. On a fetch error the entry is restored to its
    /// prior state so a later read retries.
    ///
    /// Cancellation-safe: dropping the returned future mid-fetch (a
    /// timeout, a `select!` race, an aborted task) also restores the prior
    /// state, so the entry never stays in the fetching state with no fetch
    /// in flight.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<T, Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        loop {
            let action = {
                let mut state = self.lock();

                match &*state {
                    CacheState::Fresh(value) => ReadAction::Done(value.clone()),
                    CacheState::Fetching(rx) => ReadAction::Wait(rx.clone()),
                    CacheState::Absent | CacheState::Stale(_) => {
                        let (sender, rx) = watch::channel(());
                        let previous = std::mem::replace(&mut *state, CacheState::Fetching(rx));
                        ReadAction::Fetch(FetchRollback {
                            entry: self,
                            previous: Some(previous),
                            _sender: sender,
                        })
                    }
                }
            };

            match action {
                ReadAction::Done(value) => return Ok(value),
                ReadAction::Wait(mut rx) => {
                    // Waking happens when the fetching reader drops its
                    // sender; a closed-channel error wakes us just the same.
                    let _ = rx.changed().await;
                }
                ReadAction::Fetch(rollback) => {
                    return match fetch().await {
                        Ok(value) => {
                            rollback.complete(value.clone());
                            Ok(value)
                        }
                        // Dropping the rollback restores the prior state
                        // and wakes every waiting reader.
                        Err(error) => Err(error),
                    };
                }
            }
        }
    }
}

/// A point-in-time copy of an entry's state, used to roll back optimistic
/// patches when the confirming network call fails.
pub struct EntrySnapshot<T> {
    state: CacheState<T>,
}

/// A snapshot of the transaction-list entry.
pub type TransactionsSnapshot = EntrySnapshot<Vec<Arc<Transaction>>>;

/// A mutation whose success requires cache invalidation.
///
/// Applied through [QueryCache::invalidate_after] once the mutating network
/// call's success response has been observed, never speculatively.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// A single transaction was created.
    AddTransaction {
        /// The day the new transaction falls on.
        date: Date,
    },
    /// A single transaction was updated.
    EditTransaction {
        /// The day the transaction was on before the edit, when known. When
        /// the pre-edit record was not cached the affected months cannot be
        /// computed, and every budget month is invalidated instead.
        old_date: Option<Date>,
        /// The day the transaction is on after the edit.
        new_date: Date,
    },
    /// A single transaction was deleted.
    DeleteTransaction {
        /// The day the deleted transaction was on, when known. As with
        /// edits, an unknown date falls back to wholesale invalidation.
        date: Option<Date>,
    },
    /// A bulk CSV import completed with at least one row inserted.
    BulkImport,
    /// A budget goal was set or removed for one month.
    BudgetGoalChanged {
        /// The month whose goals changed.
        month: YearMonth,
    },
    /// A bank connection was disconnected or removed.
    BankRemoved,
}

/// The client-side cache of everything the app reads from the service.
///
/// Explicitly constructed and passed by reference; there is no ambient
/// global. The cache is scoped to one authenticated session and cleared
/// wholesale on logout.
#[derive(Default)]
pub struct QueryCache {
    transactions: Entry<Vec<Arc<Transaction>>>,
    summaries: Mutex<HashMap<SummaryPeriod, Arc<Entry<TransactionSummary>>>>,
    budget_goals: Mutex<HashMap<YearMonth, Arc<Entry<Vec<BudgetGoal>>>>>,
    categories: Entry<Vec<Category>>,
    subscription: Entry<SubscriptionStatus>,
}

impl QueryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_summaries(
        &self,
    ) -> MutexGuard<'_, HashMap<SummaryPeriod, Arc<Entry<TransactionSummary>>>> {
        self.summaries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_budget_goals(
        &self,
    ) -> MutexGuard<'_, HashMap<YearMonth, Arc<Entry<Vec<BudgetGoal>>>>> {
        self.budget_goals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The cached transaction list.
    ///
    /// Records are stored behind [Arc] so in-place patches replace only the
    /// touched record; untouched records keep their identity across
    /// mutations.
    pub fn transactions(&self) -> &Entry<Vec<Arc<Transaction>>> {
        &self.transactions
    }

    /// The summary entry for one period, created absent on first access.
    pub fn summary(&self, period: SummaryPeriod) -> Arc<Entry<TransactionSummary>> {
        self.lock_summaries().entry(period).or_default().clone()
    }

    /// The budget-goal entry for one month, created absent on first access.
    pub fn budget_goals(&self, month: YearMonth) -> Arc<Entry<Vec<BudgetGoal>>> {
        self.lock_budget_goals().entry(month).or_default().clone()
    }

    /// The cached category list.
    pub fn categories(&self) -> &Entry<Vec<Category>> {
        &self.categories
    }

    /// The cached subscription status.
    pub fn subscription(&self) -> &Entry<SubscriptionStatus> {
        &self.subscription
    }

    /// Prepends an (optimistically created) transaction to the cached list.
    pub fn prepend_transaction(&self, transaction: Arc<Transaction>) {
        self.transactions
            .patch(|list| list.insert(0, transaction));
    }

    /// Replaces the cached record with the given ID, keeping its position.
    /// The ID may differ from `transaction.id` when a placeholder record is
    /// being swapped for the server-assigned one.
    pub fn replace_transaction(&self, id: TransactionId, transaction: Arc<Transaction>) {
        self.transactions.patch(|list| {
            if let Some(slot) = list.iter_mut().find(|cached| cached.id == id) {
                *slot = transaction;
            }
        });
    }

    /// Removes the cached record with the given ID.
    pub fn remove_transaction(&self, id: TransactionId) {
        self.transactions
            .patch(|list| list.retain(|cached| cached.id != id));
    }

    /// Looks up a cached transaction by ID.
    pub fn transaction_by_id(&self, id: TransactionId) -> Option<Arc<Transaction>> {
        self.transactions
            .value()?
            .into_iter()
            .find(|cached| cached.id == id)
    }

    /// Marks every summary period stale.
    pub fn invalidate_summaries(&self) {
        for entry in self.lock_summaries().values() {
            entry.invalidate();
        }
    }

    /// Marks one month's budget goals stale.
    pub fn invalidate_budget_month(&self, month: YearMonth) {
        if let Some(entry) = self.lock_budget_goals().get(&month) {
            entry.invalidate();
        }
    }

    /// Marks every cached budget month stale.
    ///
    /// The fallback when the precisely affected months cannot be computed;
    /// over-invalidation is always preferred over a silent no-op.
    pub fn invalidate_all_budget_months(&self) {
        for entry in self.lock_budget_goals().values() {
            entry.invalidate();
        }
    }

    /// Applies the invalidation rules for a successful mutation.
    ///
    /// `today` anchors which month counts as the current month. Called only
    /// after the mutating call's success response is observed; in-place
    /// patches, by contrast, are applied optimistically before the call.
    pub fn invalidate_after(&self, mutation: &Mutation, today: Date) {
        let current = YearMonth::from(today);

        match mutation {
            Mutation::AddTransaction { date } => {
                self.invalidate_summaries();
                self.invalidate_affected_months(&[YearMonth::from(*date)], current);
            }
            Mutation::EditTransaction { old_date, new_date } => {
                self.invalidate_summaries();
                match old_date {
                    Some(old_date) => self.invalidate_affected_months(
                        &[YearMonth::from(*old_date), YearMonth::from(*new_date)],
                        current,
                    ),
                    None => self.invalidate_all_budget_months(),
                }
            }
            Mutation::DeleteTransaction { date } => {
                self.invalidate_summaries();
                match date {
                    Some(date) => {
                        self.invalidate_affected_months(&[YearMonth::from(*date)], current)
                    }
                    None => self.invalidate_all_budget_months(),
                }
            }
            Mutation::BulkImport => {
                self.transactions.invalidate();
                self.invalidate_summaries();
                self.categories.invalidate();
                // Budget goals are not invalidated after an import; their
                // spent amounts catch up on the next month-change or goal
                // edit. See the import notes in DESIGN.md.
            }
            Mutation::BudgetGoalChanged { month } => {
                self.invalidate_budget_month(*month);
            }
            Mutation::BankRemoved => {
                self.transactions.invalidate();
                self.categories.invalidate();
            }
        }
    }

    /// Invalidates the budget months a transaction mutation touched, plus
    /// the current month when it is not among them (its totals shift even
    /// when the record itself belongs to another month).
    fn invalidate_affected_months(&self, months: &[YearMonth], current: YearMonth) {
        for month in months {
            self.invalidate_budget_month(*month);
        }

        if !months.contains(&current) {
            self.invalidate_budget_month(current);
        }
    }

    /// Drops every cached value. Called on logout; each key repopulates
    /// lazily on first access after the next login.
    pub fn clear(&self) {
        self.transactions.clear();
        self.lock_summaries().clear();
        self.lock_budget_goals().clear();
        self.categories.clear();
        self.subscription.clear();
    }
}
