//! Renders transactions back into CSV text, for export downloads and for
//! the bulk-import request body.

use std::collections::HashMap;

use time::Date;

use crate::{
    csv::CsvRow,
    models::{CategoryId, Transaction},
};

/// The header row of an exported CSV document.
pub const EXPORT_HEADER: &str = "Date,Type,Category,Description,Amount,Bank,Account";

/// The header row of the CSV text submitted to the bulk-import endpoint.
///
/// The endpoint requires this exact column set, so a Description column is
/// always present even when the rows were parsed from a document without
/// one.
pub const IMPORT_HEADER: &str = "Date,Type,Category,Description,Amount";

/// The category name rendered when a transaction's category ID is not in
/// the lookup.
const UNKNOWN_CATEGORY: &str = "Unknown Category";

/// Renders transactions as CSV text for download.
///
/// `category_names` maps category IDs to names; transactions whose category
/// is not in the map are rendered with the name "Unknown Category". The
/// Bank and Account columns are filled from the transaction's bank-link
/// metadata when present and left empty otherwise.
///
/// Amounts are rendered as plain numbers, without a currency symbol.
/// Parsing the output reproduces the same rows (see
/// [crate::csv::parse_transactions_csv]).
pub fn serialize_transactions<'a, I>(
    transactions: I,
    category_names: &HashMap<CategoryId, String>,
) -> String
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut text = EXPORT_HEADER.to_owned();

    for transaction in transactions {
        let category = category_names
            .get(&transaction.category_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CATEGORY);
        let (bank, account) = match &transaction.bank_link {
            Some(link) => (link.bank.as_str(), link.account.as_str()),
            None => ("", ""),
        };

        text.push('\n');
        text.push_str(&format!(
            "{},{},{},{},{},{},{}",
            format_date(transaction.date),
            transaction.transaction_type,
            escape_field(category),
            escape_field(&transaction.description),
            transaction.amount,
            escape_field(bank),
            escape_field(account),
        ));
    }

    text
}

/// Renders parsed rows as CSV text for the bulk-import endpoint.
///
/// Uses the fixed [IMPORT_HEADER] column set; rows parsed from a document
/// without a Description column carry an empty description, which is
/// rendered as an empty field rather than the column being omitted.
pub fn serialize_rows(rows: &[CsvRow]) -> String {
    let mut text = IMPORT_HEADER.to_owned();

    for row in rows {
        text.push('\n');
        text.push_str(&format!(
            "{},{},{},{},{}",
            format_date(row.date),
            row.transaction_type,
            escape_field(&row.category),
            escape_field(&row.description),
            row.amount,
        ));
    }

    text
}

/// Renders a date as `YYYY-MM-DD`.
fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Wraps a field in double quotes when it contains a delimiter.
///
/// Double quotes inside the field are dropped: the parser treats every `"`
/// as a state toggle, so there is no way to emit a literal one.
fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', ""))
    } else {
        value.to_owned()
    }
}
