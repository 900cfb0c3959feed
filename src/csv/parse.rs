//! Parses raw CSV text into [CsvRow] records.

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{Error, csv::CsvRow, models::TransactionType};

/// The date formats accepted on import. The first match wins.
const DATE_FORMATS: [&[BorrowedFormatItem]; 3] = [
    format_description!("[year]-[month]-[day]"),
    format_description!("[month]/[day]/[year]"),
    format_description!("[year]/[month]/[day]"),
];

/// The rows parsed out of one CSV document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsv {
    /// The rows that passed validation, in document order.
    pub rows: Vec<CsvRow>,
    /// The rows that were dropped, with the line number and reason, so the
    /// caller can report them instead of leaving the user to infer skips
    /// from a row-count mismatch.
    pub skipped: Vec<SkippedRow>,
}

/// A data row that was dropped during parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// The zero-based line number of the row in the document. The header is
    /// line 0.
    pub line_number: usize,
    /// Why the row was dropped.
    pub reason: String,
}

/// The column positions located in the header row.
struct ColumnMap {
    date: usize,
    transaction_type: usize,
    category: usize,
    amount: usize,
    description: Option<usize>,
    width: usize,
}

impl ColumnMap {
    /// Locates the expected columns in a header row.
    ///
    /// A column matches when its header text contains the expected word,
    /// ignoring case, so "Transaction Date", "date" and "DATE" all resolve
    /// the date column. Column order does not matter.
    ///
    /// Returns [Error::MissingColumn] naming the first of Date, Type,
    /// Category, or Amount that cannot be located. Description is optional.
    fn from_header(fields: &[String]) -> Result<Self, Error> {
        let find = |needle: &str| {
            fields
                .iter()
                .position(|field| field.to_lowercase().contains(needle))
        };

        Ok(Self {
            date: find("date").ok_or(Error::MissingColumn("Date"))?,
            transaction_type: find("type").ok_or(Error::MissingColumn("Type"))?,
            category: find("category").ok_or(Error::MissingColumn("Category"))?,
            amount: find("amount").ok_or(Error::MissingColumn("Amount"))?,
            description: find("description"),
            width: fields.len(),
        })
    }
}

/// Parses CSV text into transaction rows.
///
/// Expects `text` to start with a header row naming at least the Date,
/// Type, Category, and Amount columns (see [ColumnMap::from_header]), with
/// one data row per subsequent line. Blank lines are ignored.
///
/// Data rows that fail validation are dropped with a warning rather than
/// aborting the document: a row is dropped when its field count does not
/// match the header, its date does not parse in any accepted format, its
/// type is not income/expense, or its amount is not numeric after stripping
/// `$` and `,`. Dropped rows are reported in [ParsedCsv::skipped].
///
/// Amounts are stored as absolute values; the sign is carried by the type
/// column.
///
/// # Errors
///
/// Returns [Error::MissingColumn] when a required column cannot be located
/// in the header. No other input aborts the parse.
pub fn parse_transactions_csv(text: &str) -> Result<ParsedCsv, Error> {
    let mut lines = text.lines();

    let header = lines.next().ok_or(Error::MissingColumn("Date"))?;
    let columns = ColumnMap::from_header(&split_fields(header))?;

    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for (line_number, line) in lines.enumerate().map(|(i, line)| (i + 1, line)) {
        if line.trim().is_empty() {
            continue;
        }

        match parse_row(line, &columns) {
            Ok(row) => rows.push(row),
            Err(reason) => {
                tracing::warn!("skipping CSV line {line_number}: {reason}");
                skipped.push(SkippedRow {
                    line_number,
                    reason,
                });
            }
        }
    }

    Ok(ParsedCsv { rows, skipped })
}

/// Validates one data row against the located columns.
///
/// Returns the reason for dropping the row instead of an [Error], since row
/// failures never abort the document.
fn parse_row(line: &str, columns: &ColumnMap) -> Result<CsvRow, String> {
    let fields = split_fields(line);

    if fields.len() != columns.width {
        return Err(format!(
            "expected {} fields, found {}",
            columns.width,
            fields.len()
        ));
    }

    let date = parse_date(&fields[columns.date])
        .ok_or_else(|| format!("could not parse \"{}\" as a date", fields[columns.date]))?;

    let transaction_type: TransactionType = fields[columns.transaction_type]
        .parse()
        .map_err(|error| format!("{error}"))?;

    let amount = parse_amount(&fields[columns.amount])
        .ok_or_else(|| format!("could not parse \"{}\" as an amount", fields[columns.amount]))?;

    let description = columns
        .description
        .map(|index| fields[index].clone())
        .unwrap_or_default();

    Ok(CsvRow {
        date,
        transaction_type,
        category: fields[columns.category].clone(),
        description,
        amount,
    })
}

/// Splits one CSV line into trimmed fields.
///
/// A double quote toggles an in-field state during which commas are literal.
/// Quote characters themselves are never emitted into the field.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    for character in line.chars() {
        match character {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(character),
        }
    }

    fields.push(field);

    fields
        .into_iter()
        .map(|field| field.trim().to_owned())
        .collect()
}

/// Parses a date in any of the accepted formats.
fn parse_date(text: &str) -> Option<Date> {
    DATE_FORMATS
        .iter()
        .find_map(|format| Date::parse(text, format).ok())
}

/// Parses an amount after stripping currency symbols and thousands
/// separators. Negative inputs yield their absolute value; the sign of a
/// row is carried by its type, not its amount.
fn parse_amount(text: &str) -> Option<f64> {
    let stripped: String = text
        .chars()
        .filter(|&character| character != '$' && character != ',')
        .collect();

    stripped.trim().parse::<f64>().ok().map(f64::abs)
}

#[cfg(test)]
mod parse_csv_tests {
    use time::macros::date;

    use crate::{Error, csv::CsvRow, models::TransactionType};

    use super::{parse_amount, parse_transactions_csv, split_fields};

    #[test]
    fn parses_two_row_document() {
        let text = "Date,Type,Category,Amount\n\
            2024-01-05,expense,Groceries,42.10\n\
            01/06/2024,income,Salary,\"2,000\"";
        let want = vec![
            CsvRow {
                date: date!(2024 - 01 - 05),
                transaction_type: TransactionType::Expense,
                category: "Groceries".to_owned(),
                description: String::new(),
                amount: 42.10,
            },
            CsvRow {
                date: date!(2024 - 01 - 06),
                transaction_type: TransactionType::Income,
                category: "Salary".to_owned(),
                description: String::new(),
                amount: 2000.0,
            },
        ];

        let result = parse_transactions_csv(text).expect("could not parse CSV");

        assert_eq!(want, result.rows);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn header_matches_any_order_and_casing() {
        let text = "AMOUNT,transaction category,Transaction Date,TYPE\n\
            42.10,Groceries,2024-01-05,expense";

        let result = parse_transactions_csv(text).expect("could not parse CSV");

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].category, "Groceries");
        assert_eq!(result.rows[0].amount, 42.10);
    }

    #[test]
    fn missing_required_column_fails() {
        let cases = [
            ("Type,Category,Amount\n", "Date"),
            ("Date,Category,Amount\n", "Type"),
            ("Date,Type,Amount\n", "Category"),
            ("Date,Type,Category\n", "Amount"),
        ];

        for (text, column) in cases {
            let result = parse_transactions_csv(text);

            assert!(
                matches!(result, Err(Error::MissingColumn(name)) if name == column),
                "want MissingColumn({column}), got {result:?}"
            );
        }
    }

    #[test]
    fn missing_description_column_is_not_an_error() {
        let text = "Date,Type,Category,Amount\n2024-01-05,expense,Groceries,1.00";

        let result = parse_transactions_csv(text).expect("could not parse CSV");

        assert_eq!(result.rows[0].description, "");
    }

    #[test]
    fn malformed_row_does_not_abort_document() {
        let text = "Date,Type,Category,Amount\n\
            2024-01-05,expense,Groceries,42.10\n\
            2024-01-06,expense,Groceries\n\
            2024-01-07,income,Salary,100.00";

        let result = parse_transactions_csv(text).expect("could not parse CSV");

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].line_number, 2);
    }

    #[test]
    fn bad_date_type_and_amount_rows_are_skipped() {
        let text = "Date,Type,Category,Amount\n\
            not a date,expense,Groceries,1.00\n\
            2024-01-05,transfer,Groceries,1.00\n\
            2024-01-05,expense,Groceries,one dollar\n\
            2024-01-05,expense,Groceries,1.00";

        let result = parse_transactions_csv(text).expect("could not parse CSV");

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.skipped.len(), 3);
    }

    #[test]
    fn amounts_are_normalized_unsigned() {
        for text in ["$1,234.50", "1234.50", "-1234.50"] {
            assert_eq!(parse_amount(text), Some(1234.50), "input: {text:?}");
        }
    }

    #[test]
    fn quoted_fields_keep_embedded_commas() {
        let fields = split_fields("2024-01-05,expense,\"Eating, Out\",\"1,200.00\"");

        assert_eq!(
            fields,
            vec!["2024-01-05", "expense", "Eating, Out", "1,200.00"]
        );
    }

    #[test]
    fn type_casing_is_normalized() {
        let text = "Date,Type,Category,Amount\n2024-01-05,EXPENSE,Groceries,1.00";

        let result = parse_transactions_csv(text).expect("could not parse CSV");

        assert_eq!(result.rows[0].transaction_type, TransactionType::Expense);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let text = "Date,Type,Category,Amount\n\n2024-01-05,expense,Groceries,1.00\n\n";

        let result = parse_transactions_csv(text).expect("could not parse CSV");

        assert_eq!(result.rows.len(), 1);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn empty_input_reports_missing_date_column() {
        let result = parse_transactions_csv("");

        assert!(matches!(result, Err(Error::MissingColumn("Date"))));
    }
}
