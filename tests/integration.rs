//! Integration tests for the spending-persona analytics pipeline

use chrono::NaiveDate;
use finsight::classifier::DEFAULT_CLUSTER;
use finsight::features::total_income;
use finsight::{
    compute_insights, extract_features, load_transactions, retrain, InsightError,
    SpendingClassifier,
};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
}

/// Create a test CSV with a mixed transaction history. 2025-06-07 and
/// 2025-06-08 are a weekend.
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "id,amount,description,date,category,type").unwrap();

    writeln!(file, "1,12000.0,salary,2025-06-01,Salary,income").unwrap();
    writeln!(file, "2,600.0,groceries,2025-06-02,Food & Dining,expense").unwrap();
    writeln!(file, "3,450.0,restaurant,2025-06-07,Food & Dining,expense").unwrap();
    writeln!(file, "4,200.0,fuel,2025-06-03,Transportation,expense").unwrap();
    writeln!(file, "5,350.0,clothes,2025-06-08,Shopping,expense").unwrap();
    writeln!(file, "6,120.0,cinema,2025-06-08,Entertainment,expense").unwrap();
    writeln!(file, "7,800.0,electricity,2025-06-05,Bills & Utilities,expense").unwrap();
    writeln!(file, "8,250.0,pharmacy,2025-06-10,Healthcare,expense").unwrap();
    writeln!(file, "9,90.0,misc,2025-06-11,Other,expense").unwrap();
    writeln!(file, "10,300.0,groceries,2025-06-14,Food & Dining,expense").unwrap();
    writeln!(file, "11,180.0,taxi,2025-06-15,Transportation,expense").unwrap();
    writeln!(file, "12,400.0,dinner,2025-06-21,Food & Dining,expense").unwrap();

    file
}

#[test]
fn test_end_to_end_insights_cold_start() {
    let csv = create_test_csv();
    let model_dir = TempDir::new().unwrap();

    let transactions =
        load_transactions(csv.path().to_str().unwrap(), 6, as_of()).unwrap();
    assert_eq!(transactions.len(), 12);

    let classifier = SpendingClassifier::new(model_dir.path(), 3);
    let trailing_income = total_income(&transactions);
    assert_eq!(trailing_income, 12000.0);

    let report = compute_insights(&classifier, &transactions, trailing_income, 6).unwrap();

    // No persisted model anywhere: prediction degrades to the default persona
    assert_eq!(report.cluster_id, DEFAULT_CLUSTER);
    assert_eq!(report.cluster_insights.persona, "Balanced Saver");

    // Category percentages account for all spending
    let pct_sum: f64 = report.category_breakdown.iter().map(|c| c.percentage).sum();
    assert!((pct_sum - 100.0).abs() < 0.1);

    assert_eq!(report.spending_summary.top_category, "Food & Dining");
    assert!(report.total_savings_potential >= 0.0);
    assert!(!report.recommendations.is_empty());

    // Priorities come back in rank order
    let ranks: Vec<u8> = report
        .recommendations
        .iter()
        .map(|r| match format!("{:?}", r.priority).as_str() {
            "Critical" => 0,
            "High" => 1,
            "Medium" => 2,
            _ => 3,
        })
        .collect();
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_retrain_then_insights_uses_trained_model() {
    let csv = create_test_csv();
    let model_dir = TempDir::new().unwrap();

    let transactions =
        load_transactions(csv.path().to_str().unwrap(), 6, as_of()).unwrap();

    let classifier = SpendingClassifier::new(model_dir.path(), 3);
    retrain(&classifier, &transactions).unwrap();

    // A fresh classifier over the same directory picks the model up from disk
    let reloaded = SpendingClassifier::new(model_dir.path(), 3);
    let report = compute_insights(&reloaded, &transactions, 12000.0, 6).unwrap();
    assert!(report.cluster_id < 3);
}

#[test]
fn test_retrain_needs_ten_expense_rows() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "id,amount,description,date,category,type").unwrap();
    for i in 0..9 {
        writeln!(
            file,
            "{},100.0,item,2025-06-{:02},Shopping,expense",
            i + 1,
            i + 2
        )
        .unwrap();
    }

    let transactions =
        load_transactions(file.path().to_str().unwrap(), 6, as_of()).unwrap();
    assert_eq!(transactions.len(), 9);

    let model_dir = TempDir::new().unwrap();
    let classifier = SpendingClassifier::new(model_dir.path(), 3);
    assert!(matches!(
        retrain(&classifier, &transactions),
        Err(InsightError::InsufficientData)
    ));
}

#[test]
fn test_income_only_history_reports_insufficient_data() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "id,amount,description,date,category,type").unwrap();
    writeln!(file, "1,5000.0,salary,2025-06-01,Salary,income").unwrap();

    let transactions =
        load_transactions(file.path().to_str().unwrap(), 6, as_of()).unwrap();

    let model_dir = TempDir::new().unwrap();
    let classifier = SpendingClassifier::new(model_dir.path(), 3);
    let result = compute_insights(&classifier, &transactions, 5000.0, 6);
    assert!(matches!(result, Err(InsightError::InsufficientData)));
}

#[test]
fn test_insights_report_serializes() {
    let csv = create_test_csv();
    let model_dir = TempDir::new().unwrap();

    let transactions =
        load_transactions(csv.path().to_str().unwrap(), 6, as_of()).unwrap();
    let classifier = SpendingClassifier::new(model_dir.path(), 3);
    let report = compute_insights(&classifier, &transactions, 12000.0, 6).unwrap();

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"cluster_insights\""));
    assert!(json.contains("\"recommendations\""));
    assert!(json.contains("\"total_savings_potential\""));
    assert!(json.contains("\"spending_summary\""));
}

#[test]
fn test_feature_extraction_matches_breakdown() {
    let csv = create_test_csv();
    let transactions =
        load_transactions(csv.path().to_str().unwrap(), 6, as_of()).unwrap();

    let features = extract_features(&transactions).unwrap();
    let expense_total: f64 = transactions
        .iter()
        .filter(|t| t.is_expense())
        .map(|t| t.amount)
        .sum();
    assert!((features.total_expense - expense_total).abs() < 1e-9);
    assert_eq!(features.num_transactions, 11);
    assert_eq!(features.num_categories, 7);
}
