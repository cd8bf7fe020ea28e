//! Keyword classification of a session's order and customer.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::SessionLogs;

/// Order type → keywords that suggest it, in tie-break order.
pub const ORDER_PATTERNS: &[(&str, &[&str])] = &[
    ("purchase", &["buy", "purchase", "order", "checkout", "payment"]),
    ("refund", &["refund", "return", "chargeback", "reversal"]),
    ("subscription", &["subscription", "recurring", "monthly", "annual"]),
    ("transfer", &["transfer", "send", "p2p", "wire"]),
    ("withdrawal", &["withdraw", "cash_out", "atm", "disbursement"]),
    ("deposit", &["deposit", "add_funds", "top_up", "reload"]),
];

pub const NEW_CUSTOMER_INDICATORS: &[&str] =
    &["first_order", "registration", "new_account", "onboarding"];
pub const EXISTING_CUSTOMER_INDICATORS: &[&str] =
    &["repeat_customer", "returning", "loyalty", "previous_orders"];

pub const UNKNOWN: &str = "unknown";
pub const NEW_CUSTOMER: &str = "new_customer";
pub const EXISTING_CUSTOMER: &str = "existing_customer";

/// Keyword hits for one order type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternScore {
    pub score: usize,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderClassification {
    #[serde(rename = "type")]
    pub order_type: String,
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub amount: Option<Value>,
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub all_scores: BTreeMap<String, PatternScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerClassification {
    #[serde(rename = "type")]
    pub customer_type: String,
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub customer_id: Option<String>,
    pub registration_indicators: Vec<String>,
    pub history_indicators: Vec<String>,
}

fn matched(haystack: &str, patterns: &[&str]) -> Vec<String> {
    patterns
        .iter()
        .filter(|p| haystack.contains(**p))
        .map(|p| p.to_string())
        .collect()
}

/// Guess the order type from messages and API endpoints. Amount and currency
/// come from the first entry that carries them.
pub fn classify_order_type(logs: &SessionLogs) -> OrderClassification {
    let mut text = Vec::new();
    let mut amount = None;
    let mut currency = None;

    for (_, entry) in logs.entries() {
        if !entry.message.is_empty() {
            text.push(entry.message.to_lowercase());
        }
        if let Some(endpoint) = entry.detail_text("api_endpoint") {
            text.push(endpoint.to_lowercase());
        }
        if amount.is_none() {
            amount = entry
                .details
                .get("amount")
                .filter(|v| !v.is_null() && v.as_f64() != Some(0.0))
                .cloned();
        }
        if currency.is_none() {
            currency = entry.detail_text("currency");
        }
    }
    let combined = text.join(" ");

    let mut all_scores = BTreeMap::new();
    let mut best: Option<(&str, usize, usize)> = None;

    for &(order_type, patterns) in ORDER_PATTERNS {
        let hits = matched(&combined, patterns);
        if hits.is_empty() {
            continue;
        }
        let score = hits.len();
        if best.map_or(true, |(_, best_score, _)| score > best_score) {
            best = Some((order_type, score, patterns.len()));
        }
        all_scores.insert(order_type.to_string(), PatternScore { score, patterns: hits });
    }

    match best {
        Some((order_type, score, possible)) => OrderClassification {
            order_type: order_type.to_string(),
            confidence: (score as f64 / possible as f64).min(1.0),
            indicators: all_scores[order_type].patterns.clone(),
            amount,
            currency,
            all_scores,
        },
        None => OrderClassification {
            order_type: UNKNOWN.to_string(),
            confidence: 0.0,
            indicators: Vec::new(),
            amount,
            currency,
            all_scores,
        },
    }
}

/// Decide whether the session belongs to a new or an existing customer.
///
/// On a tie a known customer id tips the balance to existing with 0.5
/// confidence.
pub fn determine_customer_type(logs: &SessionLogs) -> CustomerClassification {
    let mut text = Vec::new();
    let mut customer_id = None;

    for (_, entry) in logs.entries() {
        if !entry.message.is_empty() {
            text.push(entry.message.to_lowercase());
        }
        for field in ["customer_id", "user_id", "account_id"] {
            if let Some(id) = entry.detail_text(field) {
                customer_id = Some(id);
            }
        }
    }
    let combined = text.join(" ");

    let registration = matched(&combined, NEW_CUSTOMER_INDICATORS);
    let history = matched(&combined, EXISTING_CUSTOMER_INDICATORS);

    let (customer_type, confidence, indicators) = if registration.len() > history.len() {
        (
            NEW_CUSTOMER,
            registration.len() as f64 / NEW_CUSTOMER_INDICATORS.len() as f64,
            registration.clone(),
        )
    } else if history.len() > registration.len() {
        (
            EXISTING_CUSTOMER,
            history.len() as f64 / EXISTING_CUSTOMER_INDICATORS.len() as f64,
            history.clone(),
        )
    } else if customer_id.is_some() {
        (EXISTING_CUSTOMER, 0.5, vec!["customer_id_present".to_string()])
    } else {
        (UNKNOWN, 0.0, Vec::new())
    };

    CustomerClassification {
        customer_type: customer_type.to_string(),
        confidence,
        indicators,
        customer_id,
        registration_indicators: registration,
        history_indicators: history,
    }
}
