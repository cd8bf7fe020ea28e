//! Supported fraud analysis types.

use serde::{Deserialize, Serialize};

/// Kind of fraud a session is analysed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudType {
    DigitalFraud,
    AssistedFraud,
    TransactionFraud,
    IdentityFraud,
}

impl FraudType {
    pub const ALL: [FraudType; 4] = [
        Self::DigitalFraud,
        Self::AssistedFraud,
        Self::TransactionFraud,
        Self::IdentityFraud,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DigitalFraud => "digital_fraud",
            Self::AssistedFraud => "assisted_fraud",
            Self::TransactionFraud => "transaction_fraud",
            Self::IdentityFraud => "identity_fraud",
        }
    }

    pub fn from_str_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

/// Display information for one fraud type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FraudTypeInfo {
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub focus_areas: &'static [&'static str],
}

impl FraudType {
    pub fn info(&self) -> FraudTypeInfo {
        match self {
            Self::DigitalFraud => FraudTypeInfo {
                title: "Digital Fraud Analysis",
                description: "Analyze automated/bot-driven fraudulent activities",
                icon: "🤖",
                focus_areas: &[
                    "Device fingerprinting",
                    "Automated behavior detection",
                    "Bot identification",
                    "Digital payment fraud",
                ],
            },
            Self::AssistedFraud => FraudTypeInfo {
                title: "Assisted Fraud Analysis",
                description: "Analyze human-assisted fraudulent activities",
                icon: "👥",
                focus_areas: &[
                    "Social engineering",
                    "Customer service fraud",
                    "Human behavior patterns",
                    "Account takeover",
                ],
            },
            Self::TransactionFraud => FraudTypeInfo {
                title: "Transaction Fraud Analysis",
                description: "Analyze suspicious transaction patterns",
                icon: "💳",
                focus_areas: &[
                    "Payment fraud",
                    "Transaction velocity",
                    "Amount anomalies",
                    "Cross-border fraud",
                ],
            },
            Self::IdentityFraud => FraudTypeInfo {
                title: "Identity Fraud Analysis",
                description: "Analyze identity theft and impersonation",
                icon: "🆔",
                focus_areas: &[
                    "Identity verification",
                    "Document fraud",
                    "Synthetic identity",
                    "Account creation fraud",
                ],
            },
        }
    }
}

/// The full catalog keyed by type name, for `/api/fraud-types`.
pub fn fraud_type_catalog() -> serde_json::Map<String, serde_json::Value> {
    FraudType::ALL
        .into_iter()
        .map(|t| {
            let info = serde_json::to_value(t.info()).unwrap_or_default();
            (t.as_str().to_string(), info)
        })
        .collect()
}
