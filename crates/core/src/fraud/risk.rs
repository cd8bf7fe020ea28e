//! Session risk scoring, recommendations and the event timeline.

use serde::Serialize;

use super::catalog::FraudType;
use super::classify::{CustomerClassification, OrderClassification, NEW_CUSTOMER};
use super::monitoring::MonitoringAnalysis;
use super::truncate_with_ellipsis;

/// Failed calls in these categories count as critical.
const CRITICAL_CATEGORIES: &[&str] = &["risk_scoring", "external_checks"];

/// Average logged risk score above which it contributes to the session score.
const HIGH_AVERAGE_RISK: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    Minimal,
}

impl RiskLevel {
    /// HIGH at 70, MEDIUM at 40, LOW at 20.
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Medium
        } else if score >= 20.0 {
            Self::Low
        } else {
            Self::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Minimal => "MINIMAL",
        }
    }

    /// Display colour for the UI badge.
    pub fn color(&self) -> &'static str {
        match self {
            Self::High => "#ff4444",
            Self::Medium => "#ffaa00",
            Self::Low => "#ffcc00",
            Self::Minimal => "#00ff88",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Capped at 100.
    pub score: f64,
    pub color: &'static str,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub timestamp: Option<String>,
    pub event: String,
    pub status: &'static str,
    pub details: String,
}

fn has_calls(monitoring: &MonitoringAnalysis, category: &str) -> bool {
    monitoring
        .triggered_calls
        .get(category)
        .is_some_and(|calls| !calls.is_empty())
}

/// Score the session from monitoring health, customer type, fraud type
/// coverage and logged risk scores.
pub fn calculate_risk_level(
    monitoring: &MonitoringAnalysis,
    customer: &CustomerClassification,
    fraud_type: FraudType,
) -> RiskAssessment {
    let mut factors = Vec::new();
    let mut score = 0.0;

    // No analysed calls means no evidence about monitoring health either way.
    if monitoring.total_calls() > 0 {
        let rate = monitoring.success_rate;
        if rate < 0.5 {
            factors.push(format!("Low fraud monitoring success rate: {:.1}%", rate * 100.0));
            score += 30.0;
        } else if rate < 0.8 {
            factors.push(format!("Moderate fraud monitoring issues: {:.1}%", rate * 100.0));
            score += 15.0;
        }
    }

    let critical = monitoring
        .failed_calls
        .iter()
        .filter(|call| {
            call.category
                .as_deref()
                .is_some_and(|c| CRITICAL_CATEGORIES.contains(&c))
        })
        .count();
    if critical > 0 {
        factors.push(format!("Critical fraud checks failed: {critical}"));
        score += 25.0;
    }

    if customer.customer_type == NEW_CUSTOMER {
        factors.push("New customer transaction".to_string());
        score += 10.0;
    }

    match fraud_type {
        FraudType::DigitalFraud if !has_calls(monitoring, "device_fingerprinting") => {
            factors.push("No device fingerprinting performed".to_string());
            score += 20.0;
        }
        FraudType::AssistedFraud if !has_calls(monitoring, "behavioral_analysis") => {
            factors.push("No behavioral analysis performed".to_string());
            score += 15.0;
        }
        _ => {}
    }

    if !monitoring.risk_scores.is_empty() {
        let average = monitoring.risk_scores.iter().map(|s| s.score).sum::<f64>()
            / monitoring.risk_scores.len() as f64;
        if average > HIGH_AVERAGE_RISK {
            factors.push(format!("High average risk score: {average:.1}"));
            score += average * 0.3;
        }
    }

    let level = RiskLevel::from_score(score);
    RiskAssessment {
        level,
        score: score.min(100.0),
        color: level.color(),
        factors,
    }
}

/// Actionable follow-ups for the analyst.
pub fn generate_recommendations(
    fraud_type: FraudType,
    order: &OrderClassification,
    customer: &CustomerClassification,
    monitoring: &MonitoringAnalysis,
    risk: &RiskAssessment,
) -> Vec<String> {
    let mut recs = Vec::new();

    if matches!(risk.level, RiskLevel::High | RiskLevel::Medium) {
        recs.push("Recommend manual review for this transaction".to_string());
    }
    if risk.level == RiskLevel::High {
        recs.push("Consider blocking transaction pending further investigation".to_string());
    }

    let mut failed_categories: Vec<&str> = monitoring
        .failed_calls
        .iter()
        .filter_map(|call| call.category.as_deref())
        .collect();
    failed_categories.sort_unstable();
    failed_categories.dedup();
    for category in failed_categories {
        recs.push(format!("Review and fix {} monitoring system", category.replace('_', " ")));
    }

    if customer.customer_type == NEW_CUSTOMER {
        recs.push("Implement enhanced verification for new customer".to_string());
        recs.push("Consider lower transaction limits for first-time users".to_string());
    }

    match fraud_type {
        FraudType::DigitalFraud => {
            if !has_calls(monitoring, "device_fingerprinting") {
                recs.push("Implement comprehensive device fingerprinting".to_string());
            }
            recs.push("Review automated fraud detection rules".to_string());
        }
        FraudType::AssistedFraud => {
            recs.push("Enhance customer service fraud training".to_string());
            recs.push("Implement real-time behavioral monitoring".to_string());
        }
        FraudType::TransactionFraud | FraudType::IdentityFraud => {}
    }

    if matches!(order.order_type.as_str(), "withdrawal" | "transfer") {
        recs.push("Apply enhanced monitoring for money movement transactions".to_string());
    }

    if recs.is_empty() {
        recs.push("Transaction appears normal - continue standard monitoring".to_string());
    }
    recs
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// One event per categorized monitoring call.
pub fn create_timeline(monitoring: &MonitoringAnalysis) -> Vec<TimelineEvent> {
    monitoring
        .call_sequence
        .iter()
        .map(|call| TimelineEvent {
            timestamp: call.timestamp.clone(),
            event: format!("{}: {}", title_case(&call.category), call.call_type),
            status: if call.success { "Success" } else { "Failed" },
            details: truncate_with_ellipsis(&call.message, 100),
        })
        .collect()
}
