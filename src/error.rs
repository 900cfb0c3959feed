//! Defines the app level error type used throughout the client.

use std::time::Duration;

use crate::models::FailedRow;

/// The errors that may occur in the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required column could not be located in the CSV header row.
    ///
    /// Header matching is case-insensitive and order-independent, so this
    /// error means the column is entirely absent, not merely renamed or
    /// moved. The import is aborted before any network call is made.
    #[error("the CSV file is missing the required column \"{0}\"")]
    MissingColumn(&'static str),

    /// The CSV file contained a valid header but no importable rows.
    #[error("the CSV file contains no importable rows")]
    EmptyImport,

    /// The bulk import call succeeded at the HTTP level but the server
    /// imported zero rows.
    ///
    /// No caches are invalidated when this error is returned, because
    /// nothing changed server-side.
    #[error("no rows were imported ({} rows failed server-side validation)", failed_rows.len())]
    NothingImported {
        /// The per-row failures reported by the server.
        failed_rows: Vec<FailedRow>,
    },

    /// A network call failed in transit.
    ///
    /// Any optimistic cache update already applied for the failed operation
    /// is rolled back before this error is surfaced.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    #[error("the server rejected the request with status {status}: {message}")]
    Api {
        /// The HTTP status code of the response.
        status: u16,
        /// The error message from the response body, if one was provided.
        message: String,
    },

    /// A client-enforced timeout elapsed before the operation completed.
    ///
    /// The underlying request is not aborted server-side; the operation may
    /// still complete after the client gives up.
    #[error("the operation did not complete within {0:?}")]
    Timeout(Duration),

    /// The configured base URL could not be parsed or joined with an
    /// endpoint path.
    #[error("\"{0}\" is not a valid base URL: {1}")]
    InvalidBaseUrl(String, String),

    /// The user tried to delete one of the built-in default categories.
    #[error("default categories cannot be deleted")]
    DefaultCategoryDelete,

    /// An error occurred while reading or writing the client config file.
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    /// The client config file was not valid JSON.
    #[error("could not parse config file: {0}")]
    Json(#[from] serde_json::Error),
}
