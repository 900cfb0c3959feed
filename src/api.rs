//! The HTTP client for the remote budgeting service.
//!
//! Every remote endpoint the app consumes lives behind the [BudgetApi]
//! trait so the orchestration and cache layers can be exercised against a
//! stub in tests. [ApiClient] is the real implementation.

use reqwest::{RequestBuilder, Response, Url, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::{
    Error,
    config::ClientConfig,
    models::{
        BankLink, BudgetGoal, BulkImportResult, Category, CategoryDraft, CategoryId,
        CheckoutSession, LinkSession, Plan, SubscriptionStatus, SummaryPeriod, Transaction,
        TransactionDraft, TransactionId, TransactionSummary, YearMonth,
    },
};

/// The error body the service attaches to non-success responses.
#[derive(Debug, serde::Deserialize)]
struct ErrorResponse {
    error: String,
}

/// The remote operations the client depends on.
///
/// Mirrors the service's REST surface one method per endpoint. All methods
/// are single request/response round-trips with no client-side retry.
#[allow(async_fn_in_trait)]
pub trait BudgetApi {
    /// Lists the user's transactions, newest first.
    async fn transactions(&self) -> Result<Vec<Transaction>, Error>;

    /// Creates a transaction and returns the stored record with its
    /// server-assigned ID.
    async fn create_transaction(&self, draft: &TransactionDraft) -> Result<Transaction, Error>;

    /// Updates a transaction by ID and returns the stored record.
    async fn update_transaction(
        &self,
        id: TransactionId,
        draft: &TransactionDraft,
    ) -> Result<Transaction, Error>;

    /// Deletes a transaction by ID.
    async fn delete_transaction(&self, id: TransactionId) -> Result<(), Error>;

    /// Fetches the server-computed totals for one period.
    async fn transaction_summary(
        &self,
        period: SummaryPeriod,
    ) -> Result<TransactionSummary, Error>;

    /// Submits CSV text to the bulk-import endpoint in one round-trip.
    ///
    /// The endpoint accepts CSV text rather than structured JSON; see
    /// [crate::csv::serialize_rows] for the expected column set.
    async fn import_transactions(&self, csv_text: &str) -> Result<BulkImportResult, Error>;

    /// Lists the user's categories.
    async fn categories(&self) -> Result<Vec<Category>, Error>;

    /// Creates a category.
    async fn create_category(&self, draft: &CategoryDraft) -> Result<Category, Error>;

    /// Updates a category by ID.
    async fn update_category(
        &self,
        id: CategoryId,
        draft: &CategoryDraft,
    ) -> Result<Category, Error>;

    /// Deletes a category by ID.
    async fn delete_category(&self, id: CategoryId) -> Result<(), Error>;

    /// Fetches the budget goals for one month.
    async fn budget_goals(&self, month: YearMonth) -> Result<Vec<BudgetGoal>, Error>;

    /// Sets (upserting) the budget for one category and month.
    async fn set_budget_goal(
        &self,
        category_id: CategoryId,
        month: YearMonth,
        monthly_budget: f64,
    ) -> Result<BudgetGoal, Error>;

    /// Removes the budget for one category and month.
    async fn delete_budget_goal(&self, category_id: CategoryId, month: YearMonth)
    -> Result<(), Error>;

    /// Opens a link session with the bank-aggregation service.
    async fn create_link_session(&self) -> Result<LinkSession, Error>;

    /// Exchanges the aggregation SDK's public token for a connected bank.
    async fn exchange_public_token(&self, public_token: &str) -> Result<BankLink, Error>;

    /// Lists the user's connected banks.
    async fn bank_links(&self) -> Result<Vec<BankLink>, Error>;

    /// Triggers a transaction sync for one connected bank.
    async fn sync_bank(&self, id: &str) -> Result<(), Error>;

    /// Disconnects a bank, keeping its historical transactions.
    async fn disconnect_bank(&self, id: &str) -> Result<(), Error>;

    /// Removes a bank connection and its synced transactions.
    async fn remove_bank(&self, id: &str) -> Result<(), Error>;

    /// Fetches the user's subscription status.
    async fn subscription(&self) -> Result<SubscriptionStatus, Error>;

    /// Lists the plans available for checkout.
    async fn plans(&self) -> Result<Vec<Plan>, Error>;

    /// Creates a hosted checkout session for one plan.
    async fn create_checkout_session(&self, plan_id: &str) -> Result<CheckoutSession, Error>;

    /// Cancels the subscription at the end of the current period.
    async fn cancel_subscription(&self) -> Result<SubscriptionStatus, Error>;

    /// Resumes a cancelled subscription.
    async fn resume_subscription(&self) -> Result<SubscriptionStatus, Error>;
}

/// The HTTP implementation of [BudgetApi].
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    token: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client for the service at the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidBaseUrl] when the configured URL does not
    /// parse.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        // A trailing slash keeps Url::join from replacing the last path
        // segment of the base URL.
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        let base_url = Url::parse(&base)
            .map_err(|error| Error::InvalidBaseUrl(config.base_url.clone(), error.to_string()))?;

        Ok(Self {
            base_url,
            token: config.api_token.clone(),
            http: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|error| Error::InvalidBaseUrl(self.base_url.to_string(), error.to_string()))
    }

    fn get(&self, path: &str) -> Result<RequestBuilder, Error> {
        Ok(self.http.get(self.endpoint(path)?).bearer_auth(&self.token))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder, Error> {
        Ok(self.http.post(self.endpoint(path)?).bearer_auth(&self.token))
    }

    fn put(&self, path: &str) -> Result<RequestBuilder, Error> {
        Ok(self.http.put(self.endpoint(path)?).bearer_auth(&self.token))
    }

    fn delete(&self, path: &str) -> Result<RequestBuilder, Error> {
        Ok(self
            .http
            .delete(self.endpoint(path)?)
            .bearer_auth(&self.token))
    }

    /// Sends a request and deserializes the success body.
    async fn expect_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, Error> {
        let response = request.send().await?;

        if response.status().is_success() {
            return Ok(response.json().await?);
        }

        Err(Self::error_from(response).await)
    }

    /// Sends a request whose success body carries nothing of interest.
    async fn expect_empty(request: RequestBuilder) -> Result<(), Error> {
        let response = request.send().await?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(Self::error_from(response).await)
    }

    /// Maps a non-success response to a typed error, using the body's
    /// error message when one is provided.
    async fn error_from(response: Response) -> Error {
        let status = response.status().as_u16();
        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| "unknown error".to_owned());

        Error::Api { status, message }
    }
}

impl BudgetApi for ApiClient {
    async fn transactions(&self) -> Result<Vec<Transaction>, Error> {
        Self::expect_json(self.get("transactions")?).await
    }

    async fn create_transaction(&self, draft: &TransactionDraft) -> Result<Transaction, Error> {
        Self::expect_json(self.post("transactions")?.json(draft)).await
    }

    async fn update_transaction(
        &self,
        id: TransactionId,
        draft: &TransactionDraft,
    ) -> Result<Transaction, Error> {
        Self::expect_json(self.put(&format!("transactions/{id}"))?.json(draft)).await
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<(), Error> {
        Self::expect_empty(self.delete(&format!("transactions/{id}"))?).await
    }

    async fn transaction_summary(
        &self,
        period: SummaryPeriod,
    ) -> Result<TransactionSummary, Error> {
        Self::expect_json(
            self.get("transactions/summary")?
                .query(&[("period", period.as_str())]),
        )
        .await
    }

    async fn import_transactions(&self, csv_text: &str) -> Result<BulkImportResult, Error> {
        Self::expect_json(
            self.post("transactions/import")?
                .header(CONTENT_TYPE, "text/csv")
                .body(csv_text.to_owned()),
        )
        .await
    }

    async fn categories(&self) -> Result<Vec<Category>, Error> {
        Self::expect_json(self.get("categories")?).await
    }

    async fn create_category(&self, draft: &CategoryDraft) -> Result<Category, Error> {
        Self::expect_json(self.post("categories")?.json(draft)).await
    }

    async fn update_category(
        &self,
        id: CategoryId,
        draft: &CategoryDraft,
    ) -> Result<Category, Error> {
        Self::expect_json(self.put(&format!("categories/{id}"))?.json(draft)).await
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), Error> {
        Self::expect_empty(self.delete(&format!("categories/{id}"))?).await
    }

    async fn budget_goals(&self, month: YearMonth) -> Result<Vec<BudgetGoal>, Error> {
        Self::expect_json(
            self.get("budget-goals")?
                .query(&[("month", month.to_string())]),
        )
        .await
    }

    async fn set_budget_goal(
        &self,
        category_id: CategoryId,
        month: YearMonth,
        monthly_budget: f64,
    ) -> Result<BudgetGoal, Error> {
        Self::expect_json(self.put("budget-goals")?.json(&json!({
            "categoryId": category_id,
            "month": month,
            "monthlyBudget": monthly_budget,
        })))
        .await
    }

    async fn delete_budget_goal(
        &self,
        category_id: CategoryId,
        month: YearMonth,
    ) -> Result<(), Error> {
        Self::expect_empty(self.delete("budget-goals")?.query(&[
            ("category", category_id.to_string()),
            ("month", month.to_string()),
        ]))
        .await
    }

    async fn create_link_session(&self) -> Result<LinkSession, Error> {
        Self::expect_json(self.post("banks/link-session")?).await
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<BankLink, Error> {
        Self::expect_json(
            self.post("banks/exchange")?
                .json(&json!({ "publicToken": public_token })),
        )
        .await
    }

    async fn bank_links(&self) -> Result<Vec<BankLink>, Error> {
        Self::expect_json(self.get("banks")?).await
    }

    async fn sync_bank(&self, id: &str) -> Result<(), Error> {
        Self::expect_empty(self.post(&format!("banks/{id}/sync"))?).await
    }

    async fn disconnect_bank(&self, id: &str) -> Result<(), Error> {
        Self::expect_empty(self.post(&format!("banks/{id}/disconnect"))?).await
    }

    async fn remove_bank(&self, id: &str) -> Result<(), Error> {
        Self::expect_empty(self.delete(&format!("banks/{id}"))?).await
    }

    async fn subscription(&self) -> Result<SubscriptionStatus, Error> {
        Self::expect_json(self.get("subscription")?).await
    }

    async fn plans(&self) -> Result<Vec<Plan>, Error> {
        Self::expect_json(self.get("subscription/plans")?).await
    }

    async fn create_checkout_session(&self, plan_id: &str) -> Result<CheckoutSession, Error> {
        Self::expect_json(
            self.post("subscription/checkout")?
                .json(&json!({ "planId": plan_id })),
        )
        .await
    }

    async fn cancel_subscription(&self) -> Result<SubscriptionStatus, Error> {
        Self::expect_json(self.post("subscription/cancel")?).await
    }

    async fn resume_subscription(&self) -> Result<SubscriptionStatus, Error> {
        Self::expect_json(self.post("subscription/resume")?).await
    }
}
