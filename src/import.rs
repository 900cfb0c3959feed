//! The bulk-import coordinator: submits parsed CSV rows to the remote
//! service in one batch and reconciles the caches with the outcome.

use std::time::Duration;

use crate::{
    Error,
    api::BudgetApi,
    cache::{Mutation, QueryCache},
    csv::{CsvRow, serialize_rows},
    models::BulkImportResult,
};

/// Submits parsed rows to the bulk-import endpoint as a single batch.
///
/// The rows are re-serialized into CSV text with the fixed import column
/// set (a Description column is synthesized when the source document lacked
/// one) because the endpoint accepts CSV text rather than JSON. One network
/// round-trip, no retries; the server's result is passed through verbatim,
/// without re-validating it against the input.
///
/// On success with at least one imported row, the transaction list, every
/// summary period, and the category list are invalidated — new categories
/// may have been created server-side even when `created_categories` is
/// empty in a race with another session. Rows that failed server-side
/// validation are reported inside the Ok result, not as an error.
///
/// # Errors
///
/// - [Error::EmptyImport] when `rows` is empty; nothing is submitted.
/// - [Error::Timeout] when the call outlives `timeout`. The request is not
///   cancelled server-side and may still complete after the client gives
///   up. No caches are invalidated.
/// - [Error::NothingImported] when the call succeeds but zero rows were
///   inserted. No caches are invalidated, because nothing changed.
/// - [Error::Transport] / [Error::Api] for failed calls; no rows were
///   imported.
pub async fn import_rows<A: BudgetApi>(
    api: &A,
    cache: &QueryCache,
    rows: &[CsvRow],
    timeout: Duration,
) -> Result<BulkImportResult, Error> {
    if rows.is_empty() {
        return Err(Error::EmptyImport);
    }

    let csv_text = serialize_rows(rows);

    let result = match tokio::time::timeout(timeout, api.import_transactions(&csv_text)).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!("bulk import did not complete within {timeout:?}");
            return Err(Error::Timeout(timeout));
        }
    };

    if result.imported_count == 0 {
        return Err(Error::NothingImported {
            failed_rows: result.failed_rows,
        });
    }

    if !result.failed_rows.is_empty() {
        tracing::warn!(
            "bulk import inserted {} rows but {} failed server-side validation",
            result.imported_count,
            result.failed_rows.len()
        );
    }

    let today = time::OffsetDateTime::now_utc().date();
    cache.invalidate_after(&Mutation::BulkImport, today);

    Ok(result)
}
