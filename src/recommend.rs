//! Rule-based recommendation engine
//!
//! Stateless evaluator over the extracted features, persona insights, and
//! (optionally) monthly income. Each rule is independently optional and
//! additive; overlapping rules may count the same spending twice, which is
//! a documented property of the savings totals rather than a bug.

use serde::Serialize;

use crate::classifier::ClusterInsights;
use crate::features::{round2, FeatureSet};

/// Urgency of a recommendation, in rank order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

/// Overspend level for a single category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// Severity from a category's share of total expense; None below 20%.
    fn from_percentage(percentage: f64) -> Option<Severity> {
        if percentage > 35.0 {
            Some(Severity::Severe)
        } else if percentage > 25.0 {
            Some(Severity::Moderate)
        } else if percentage > 20.0 {
            Some(Severity::Mild)
        } else {
            None
        }
    }

    /// Fraction of category spending the user is asked to cut.
    fn reduction_target(self) -> f64 {
        match self {
            Severity::Mild => 0.10,
            Severity::Moderate => 0.20,
            Severity::Severe => 0.30,
        }
    }

    fn priority(self) -> Priority {
        match self {
            Severity::Severe => Priority::Critical,
            Severity::Moderate => Priority::High,
            Severity::Mild => Priority::Medium,
        }
    }

    fn message_prefix(self) -> &'static str {
        match self {
            Severity::Severe => "HIGH ALERT",
            Severity::Moderate => "OPPORTUNITY",
            Severity::Mild => "SUGGESTION",
        }
    }
}

/// Rule-specific payload attached to a recommendation
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecommendationKind {
    HighSpend {
        category: String,
        current_percentage: f64,
        current_amount: f64,
        severity: Severity,
        reduction_percentage: f64,
    },
    WeekendSpending {
        current_percentage: f64,
        current_amount: f64,
    },
    Frequency {
        transaction_count: usize,
        avg_amount: f64,
    },
    BudgetAlignment {
        category: String,
        current_percentage: f64,
        optimal_range: String,
    },
    Persona {
        persona: String,
    },
}

/// One actionable recommendation with an estimated monthly savings figure
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub message: String,
    pub actionable_tip: String,
    pub potential_savings: f64,
}

/// Optimal percentage-of-income range for categories with a benchmark
fn optimal_range(category: &str) -> Option<(f64, f64)> {
    match category {
        "Food & Dining" => Some((15.0, 25.0)),
        "Transportation" => Some((10.0, 15.0)),
        "Shopping" => Some((5.0, 15.0)),
        "Entertainment" => Some((5.0, 10.0)),
        "Bills & Utilities" => Some((15.0, 25.0)),
        "Healthcare" => Some((5.0, 10.0)),
        "Other" => Some((5.0, 10.0)),
        _ => None,
    }
}

/// Actionable tip for a category at a given severity, with generic fallbacks
/// for categories without a dedicated entry.
fn category_tip(category: &str, severity: Severity) -> &'static str {
    match (category, severity) {
        ("Food & Dining", Severity::Severe) => {
            "Cook at home 5 days/week, limit dining out to special occasions"
        }
        ("Food & Dining", Severity::Moderate) => {
            "Meal prep on weekends, pack lunch 3 days/week"
        }
        ("Food & Dining", Severity::Mild) => {
            "Try cooking one new recipe weekly instead of ordering out"
        }
        ("Shopping", Severity::Severe) => {
            "Implement a 30-day rule: wait 30 days before any non-essential purchase"
        }
        ("Shopping", Severity::Moderate) => "Set a weekly shopping budget and stick to it",
        ("Shopping", Severity::Mild) => "Make a shopping list and avoid impulse buys",
        ("Entertainment", Severity::Severe) => {
            "Switch to free activities: parks, hiking, home movie nights"
        }
        ("Entertainment", Severity::Moderate) => "Limit paid entertainment to 2 times per month",
        ("Entertainment", Severity::Mild) => "Look for early-bird discounts and group deals",
        ("Transportation", Severity::Severe) => {
            "Consider carpooling or public transport for daily commute"
        }
        ("Transportation", Severity::Moderate) => "Combine errands to reduce fuel costs",
        ("Transportation", Severity::Mild) => {
            "Maintain vehicle regularly to improve fuel efficiency"
        }
        ("Bills & Utilities", Severity::Severe) => {
            "Audit all subscriptions, cancel unused services"
        }
        ("Bills & Utilities", Severity::Moderate) => "Switch to energy-efficient appliances",
        ("Bills & Utilities", Severity::Mild) => "Turn off lights/AC when not in use",
        (_, Severity::Severe) => "Track every expense and set strict category limits",
        (_, Severity::Moderate) => "Review this category weekly and find alternatives",
        (_, Severity::Mild) => "Look for ways to optimize spending",
    }
}

/// Format a rupee amount with thousands separators, no decimals
fn format_amount(amount: f64) -> String {
    let rounded = amount.round().abs() as u64;
    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Run every rule and collect the recommendations they emit.
///
/// `monthly_income` enables the budget-alignment rule when known and positive.
pub fn generate_recommendations(
    features: &FeatureSet,
    insights: &ClusterInsights,
    monthly_income: Option<f64>,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    recommendations.extend(high_spend_rule(features));

    if features.weekend_spending_ratio > 0.35 {
        recommendations.push(weekend_rule(features));
    }

    if let Some(rec) = frequency_rule(features) {
        recommendations.push(rec);
    }

    if let Some(income) = monthly_income {
        if income > 0.0 {
            recommendations.extend(budget_alignment_rule(features, income));
        }
    }

    if let Some(rec) = persona_rule(insights, features) {
        recommendations.push(rec);
    }

    recommendations
}

/// Top 3 categories by expense share, flagged when they cross the severity
/// thresholds. Savings estimate is the category total times the reduction
/// target for that severity.
fn high_spend_rule(features: &FeatureSet) -> Vec<Recommendation> {
    let mut sorted = features.category_stats.clone();
    sorted.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));

    sorted
        .iter()
        .take(3)
        .filter_map(|row| {
            let severity = Severity::from_percentage(row.percentage)?;
            let reduction = severity.reduction_target();
            let potential_savings = row.total * reduction;

            Some(Recommendation {
                kind: RecommendationKind::HighSpend {
                    category: row.category.clone(),
                    current_percentage: row.percentage,
                    current_amount: row.total,
                    severity,
                    reduction_percentage: reduction * 100.0,
                },
                priority: severity.priority(),
                message: format!(
                    "{}: You spend {:.1}% on {}. Reducing this by {}% could save you ₹{}/month",
                    severity.message_prefix(),
                    row.percentage,
                    row.category,
                    (reduction * 100.0) as u32,
                    format_amount(potential_savings),
                ),
                actionable_tip: category_tip(&row.category, severity).to_string(),
                potential_savings,
            })
        })
        .collect()
}

/// Weekend spending above 35% of the total; target ratio is 30%.
fn weekend_rule(features: &FeatureSet) -> Recommendation {
    const TARGET_RATIO: f64 = 0.30;
    let ratio = features.weekend_spending_ratio;
    let potential_savings = features.total_expense * (ratio - TARGET_RATIO);

    Recommendation {
        kind: RecommendationKind::WeekendSpending {
            current_percentage: ratio * 100.0,
            current_amount: features.total_expense * ratio,
        },
        priority: Priority::Medium,
        message: format!(
            "You spend {:.1}% on weekends. Setting a weekend budget could save ₹{}/month",
            ratio * 100.0,
            format_amount(potential_savings),
        ),
        actionable_tip: "Try meal prepping for weekends or planning free activities".to_string(),
        potential_savings,
    }
}

/// Many small transactions suggest impulse purchases worth consolidating.
fn frequency_rule(features: &FeatureSet) -> Option<Recommendation> {
    if features.num_transactions <= 100 || features.avg_transaction >= 500.0 {
        return None;
    }

    let potential_savings =
        features.avg_transaction * features.num_transactions as f64 * 0.15;

    Some(Recommendation {
        kind: RecommendationKind::Frequency {
            transaction_count: features.num_transactions,
            avg_amount: features.avg_transaction,
        },
        priority: Priority::Low,
        message: format!(
            "You made {} transactions. Consolidating small purchases could save ₹{}/month",
            features.num_transactions,
            format_amount(potential_savings),
        ),
        actionable_tip: "Use a shopping list and buy in bulk to reduce impulse purchases"
            .to_string(),
        potential_savings,
    })
}

/// Categories spending above their optimal percentage-of-income range.
fn budget_alignment_rule(features: &FeatureSet, income: f64) -> Vec<Recommendation> {
    features
        .category_stats
        .iter()
        .filter_map(|row| {
            let (min_pct, max_pct) = optimal_range(&row.category)?;
            let current_pct = row.total / income * 100.0;
            if current_pct <= max_pct {
                return None;
            }

            let optimal_amount = income * (max_pct / 100.0);
            let potential_savings = row.total - optimal_amount;

            Some(Recommendation {
                kind: RecommendationKind::BudgetAlignment {
                    category: row.category.clone(),
                    current_percentage: current_pct,
                    optimal_range: format!("{}-{}%", min_pct as u32, max_pct as u32),
                },
                priority: Priority::High,
                message: format!(
                    "{}: {:.1}% of income (optimal: {}-{}%). Aligning to budget could save ₹{}/month",
                    row.category,
                    current_pct,
                    min_pct as u32,
                    max_pct as u32,
                    format_amount(potential_savings),
                ),
                actionable_tip: format!(
                    "Set a monthly {} budget of ₹{}",
                    row.category,
                    format_amount(optimal_amount),
                ),
                potential_savings,
            })
        })
        .collect()
}

/// Persona-driven nudge: the struggling persona gets a critical push with a
/// 25% reduction target, the best persona gets a congratulation.
fn persona_rule(insights: &ClusterInsights, features: &FeatureSet) -> Option<Recommendation> {
    match insights.persona.as_str() {
        "Needs Improvement" => {
            let potential_savings = features.total_expense * 0.25;
            Some(Recommendation {
                kind: RecommendationKind::Persona {
                    persona: insights.persona.clone(),
                },
                priority: Priority::Critical,
                message: format!(
                    "Your spending pattern shows room for improvement. Following our top recommendations could save ₹{}/month",
                    format_amount(potential_savings),
                ),
                actionable_tip:
                    "Start with your highest expense category and set strict weekly limits"
                        .to_string(),
                potential_savings,
            })
        }
        "Budget Master" => Some(Recommendation {
            kind: RecommendationKind::Persona {
                persona: insights.persona.clone(),
            },
            priority: Priority::Low,
            message: "Excellent! You're a Budget Master. Keep up the great financial habits!"
                .to_string(),
            actionable_tip: "Consider investing your savings for long-term wealth building"
                .to_string(),
            potential_savings: 0.0,
        }),
        _ => None,
    }
}

/// Stable sort: ascending priority rank, then descending savings within
/// equal priority. Equal pairs keep their input order.
pub fn prioritize_recommendations(mut recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    recommendations.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then_with(|| b.potential_savings.total_cmp(&a.potential_savings))
    });
    recommendations
}

/// Sum of potential savings across all recommendations, rounded to 2
/// decimals. Deliberately not deduplicated: overlapping rules may count the
/// same spending twice.
pub fn total_savings_potential(recommendations: &[Recommendation]) -> f64 {
    round2(recommendations.iter().map(|r| r.potential_savings).sum())
}
