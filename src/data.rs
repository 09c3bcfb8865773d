//! Transaction loading from CSV using Polars
//!
//! Stand-in for the data-access layer: reads rows from a CSV export
//! (`id,amount,description,date,category,type`), drops invalid rows, and
//! restricts to the trailing analysis window.

use chrono::{Months, NaiveDate};
use polars::prelude::*;

use crate::features::{CategoryType, Transaction};

/// Load transactions from a CSV file, keeping only rows inside the trailing
/// `months` window ending at `as_of`.
///
/// Rows with non-positive amounts, unparseable dates, or an unknown category
/// type are filtered out. Bails when nothing valid remains.
pub fn load_transactions(
    file_path: &str,
    months: u32,
    as_of: NaiveDate,
) -> crate::Result<Vec<Transaction>> {
    let df = LazyCsvReader::new(file_path)
        .has_header(true)
        .finish()?
        .filter(col("amount").gt(lit(0.0)))
        .with_columns([
            col("amount").cast(DataType::Float64),
            col("id").cast(DataType::Int64),
        ])
        .collect()?;

    if df.height() == 0 {
        anyhow::bail!("No valid transactions found after filtering");
    }

    let window_start = as_of
        .checked_sub_months(Months::new(months))
        .ok_or_else(|| anyhow::anyhow!("Invalid trailing window of {months} months"))?;

    let ids = df.column("id")?.i64()?;
    let amounts = df.column("amount")?.f64()?;
    let descriptions = df.column("description")?.utf8()?;
    let dates = df.column("date")?.utf8()?;
    let categories = df.column("category")?.utf8()?;
    let types = df.column("type")?.utf8()?;

    let mut transactions = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let (Some(id), Some(amount)) = (ids.get(row), amounts.get(row)) else {
            continue;
        };
        let (Some(date_str), Some(category), Some(type_str)) =
            (dates.get(row), categories.get(row), types.get(row))
        else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d") else {
            continue;
        };
        let Ok(category_type) = type_str.parse::<CategoryType>() else {
            continue;
        };
        if date < window_start || date > as_of {
            continue;
        }

        transactions.push(Transaction {
            id,
            amount,
            description: descriptions.get(row).unwrap_or("").to_string(),
            date,
            category_name: category.trim().to_string(),
            category_type,
        });
    }

    if transactions.is_empty() {
        anyhow::bail!("No transactions fall inside the trailing {months}-month window");
    }

    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,amount,description,date,category,type").unwrap();
        writeln!(file, "1,600.0,groceries,2025-06-02,Food & Dining,expense").unwrap();
        writeln!(file, "2,200.0,bus pass,2025-06-03,Transportation,expense").unwrap();
        writeln!(file, "3,2000.0,salary,2025-06-01,Salary,income").unwrap();
        writeln!(file, "4,150.0,old purchase,2023-01-15,Shopping,expense").unwrap();
        file
    }

    #[test]
    fn test_load_transactions() {
        let file = create_test_csv();
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();

        let transactions =
            load_transactions(file.path().to_str().unwrap(), 6, as_of).unwrap();

        // The 2023 row falls outside the 6-month window
        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].category_name, "Food & Dining");
        assert_eq!(transactions[0].category_type, CategoryType::Expense);
        assert_eq!(transactions[2].category_type, CategoryType::Income);
    }

    #[test]
    fn test_window_filtering_excludes_everything() {
        let file = create_test_csv();
        let as_of = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

        let result = load_transactions(file.path().to_str().unwrap(), 6, as_of);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_rows_are_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,amount,description,date,category,type").unwrap();
        writeln!(file, "1,500.0,ok,2025-06-02,Shopping,expense").unwrap();
        writeln!(file, "2,300.0,bad date,not-a-date,Shopping,expense").unwrap();
        writeln!(file, "3,300.0,bad type,2025-06-03,Shopping,transfer").unwrap();

        let as_of = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let transactions =
            load_transactions(file.path().to_str().unwrap(), 6, as_of).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].id, 1);
    }
}
