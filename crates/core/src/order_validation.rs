//! Order completeness validation. Pure logic, no database access.
//!
//! The order store hands over a single row as an ordered column → value map
//! ([`OrderRecord`]); [`validate_record`] decides which columns are mandatory
//! under the configured [`MandatoryFieldPolicy`] and reports which of them
//! are missing. The report envelope ([`OrderValidationReport`]) is what the
//! `/api/validate-order` endpoint returns verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One order row: column name → scalar value, in database column order.
pub type OrderRecord = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const POLICY_ALLOWLIST: &str = "allowlist";
pub const POLICY_ALL_EXCEPT: &str = "all_except";

/// All valid policy names accepted from configuration.
pub const VALID_POLICIES: &[&str] = &[POLICY_ALLOWLIST, POLICY_ALL_EXCEPT];

/// Default mandatory columns for the allowlist policy.
pub const DEFAULT_MANDATORY_FIELDS: &[&str] = &[
    "order_id",
    "customer_id",
    "order_date",
    "delivery_address",
    "order_status",
    "total_amount",
];

/// Default exclusions for the all-except policy.
pub const DEFAULT_OPTIONAL_FIELDS: &[&str] = &[
    "created_date",
    "updated_date",
    "internal_notes",
    "customer_email",
    "customer_phone",
    "delivery_notes",
    "promo_code",
    "tracking_number",
];

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Which columns of an order row must be populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum MandatoryFieldPolicy {
    /// Only the listed columns are mandatory.
    Allowlist { fields: Vec<String> },
    /// Every returned column is mandatory except the listed ones.
    AllExcept { excluded: Vec<String> },
}

impl MandatoryFieldPolicy {
    /// Build a policy from its configuration name and the two field lists.
    pub fn from_config(
        name: &str,
        mandatory: Vec<String>,
        optional: Vec<String>,
    ) -> Result<Self, String> {
        match name.trim().to_ascii_lowercase().as_str() {
            POLICY_ALLOWLIST => Ok(Self::Allowlist { fields: mandatory }),
            POLICY_ALL_EXCEPT => Ok(Self::AllExcept { excluded: optional }),
            other => Err(format!(
                "Invalid order field policy '{other}'. Must be one of: {}",
                VALID_POLICIES.join(", ")
            )),
        }
    }

    /// The allowlist policy over [`DEFAULT_MANDATORY_FIELDS`].
    pub fn default_allowlist() -> Self {
        Self::Allowlist {
            fields: DEFAULT_MANDATORY_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }

    /// Column names are compared case-insensitively; some stores report
    /// them upper-cased.
    pub fn is_mandatory(&self, field: &str) -> bool {
        match self {
            Self::Allowlist { fields } => fields.iter().any(|f| f.eq_ignore_ascii_case(field)),
            Self::AllExcept { excluded } => !excluded.iter().any(|f| f.eq_ignore_ascii_case(field)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowlist { .. } => POLICY_ALLOWLIST,
            Self::AllExcept { .. } => POLICY_ALL_EXCEPT,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Validation outcome for a single column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValidation {
    pub field_name: String,
    pub value: Value,
    /// Always `true` for optional fields.
    pub is_valid: bool,
    pub is_mandatory: bool,
    pub error_message: Option<String>,
}

/// Aggregate counts, derived once from the field entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub total_fields: usize,
    pub mandatory_fields: usize,
    pub filled_mandatory_fields: usize,
    pub completion_percentage: f64,
}

/// Validation of one order row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderValidation {
    pub is_valid: bool,
    /// Failing mandatory columns in database column order, each once.
    pub missing_fields: Vec<String>,
    pub fields: Vec<FieldValidation>,
    pub summary: ValidationSummary,
}

/// Response envelope for an order validation request.
#[derive(Debug, Clone, Serialize)]
pub struct OrderValidationReport {
    /// Whether the lookup itself ran.
    pub success: bool,
    pub order_number: String,
    pub location_code: String,
    pub order_found: bool,
    #[serde(flatten)]
    pub validation: Option<OrderValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_data: Option<OrderRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub validated_at: DateTime<Utc>,
}

impl OrderValidationReport {
    /// The order was found and validated.
    pub fn found(
        order_number: &str,
        location_code: &str,
        policy: &MandatoryFieldPolicy,
        record: OrderRecord,
    ) -> Self {
        let validation = validate_record(&record, policy);
        Self {
            success: true,
            order_number: order_number.to_string(),
            location_code: location_code.to_string(),
            order_found: true,
            validation: Some(validation),
            order_data: Some(record),
            policy: Some(policy.as_str()),
            error: None,
            validated_at: Utc::now(),
        }
    }

    /// The query ran but matched no row. This is not an error.
    pub fn not_found(order_number: &str, location_code: &str) -> Self {
        Self {
            success: true,
            order_number: order_number.to_string(),
            location_code: location_code.to_string(),
            order_found: false,
            validation: None,
            order_data: None,
            policy: None,
            error: None,
            validated_at: Utc::now(),
        }
    }

    /// The lookup failed (connection, query error).
    pub fn failed(order_number: &str, location_code: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            order_number: order_number.to_string(),
            location_code: location_code.to_string(),
            order_found: false,
            validation: None,
            order_data: None,
            policy: None,
            error: Some(error.into()),
            validated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A value counts as populated when it is non-null and its string rendering,
/// trimmed, is non-empty.
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// `100 * filled / mandatory`, rounded to one decimal with ties away from
/// zero (`f64::round`), so 1 of 16 gives 6.3, not the banker's 6.2. An empty
/// mandatory set is complete by definition.
pub fn completion_percentage(filled: usize, mandatory: usize) -> f64 {
    if mandatory == 0 {
        return 100.0;
    }
    let raw = filled as f64 * 100.0 / mandatory as f64;
    (raw * 10.0).round() / 10.0
}

/// Validate one order row against a mandatory-field policy.
///
/// Columns are visited in the order the store returned them. Allowlisted
/// columns the row does not contain at all are reported missing after the
/// returned columns, in allowlist order.
pub fn validate_record(record: &OrderRecord, policy: &MandatoryFieldPolicy) -> OrderValidation {
    let mut fields = Vec::with_capacity(record.len());
    let mut missing_fields = Vec::new();

    for (name, value) in record {
        let is_mandatory = policy.is_mandatory(name);
        let is_valid = !is_mandatory || is_populated(value);
        if !is_valid {
            missing_fields.push(name.clone());
        }
        fields.push(field_entry(name, value.clone(), is_mandatory, is_valid));
    }

    if let MandatoryFieldPolicy::Allowlist { fields: allowlist } = policy {
        for wanted in allowlist {
            let present = record.keys().any(|k| k.eq_ignore_ascii_case(wanted));
            let already = missing_fields.iter().any(|m| m.eq_ignore_ascii_case(wanted));
            if !present && !already {
                missing_fields.push(wanted.clone());
                fields.push(field_entry(wanted, Value::Null, true, false));
            }
        }
    }

    let mandatory_fields = fields.iter().filter(|f| f.is_mandatory).count();
    let filled_mandatory_fields = fields
        .iter()
        .filter(|f| f.is_mandatory && f.is_valid)
        .count();

    OrderValidation {
        is_valid: missing_fields.is_empty(),
        missing_fields,
        summary: ValidationSummary {
            total_fields: record.len(),
            mandatory_fields,
            filled_mandatory_fields,
            completion_percentage: completion_percentage(filled_mandatory_fields, mandatory_fields),
        },
        fields,
    }
}

fn field_entry(name: &str, value: Value, is_mandatory: bool, is_valid: bool) -> FieldValidation {
    FieldValidation {
        field_name: name.to_string(),
        value,
        is_valid,
        is_mandatory,
        error_message: (!is_valid).then(|| format!("Field '{name}' is missing or empty")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> OrderRecord {
        value.as_object().cloned().expect("object literal")
    }

    fn allowlist(fields: &[&str]) -> MandatoryFieldPolicy {
        MandatoryFieldPolicy::Allowlist {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn missing_customer_gives_two_thirds() {
        let row = record(json!({"order_id": "O1", "customer_id": null, "total_amount": 9.99}));
        let policy = allowlist(&["order_id", "customer_id", "total_amount"]);

        let result = validate_record(&row, &policy);

        assert!(!result.is_valid);
        assert_eq!(result.missing_fields, vec!["customer_id"]);
        assert_eq!(result.summary.completion_percentage, 66.7);
        assert_eq!(result.summary.mandatory_fields, 3);
        assert_eq!(result.summary.filled_mandatory_fields, 2);
        assert_eq!(result.summary.total_fields, 3);
    }

    #[test]
    fn fully_populated_row_is_valid() {
        let row = record(json!({"order_id": "O1", "customer_id": "C9", "total_amount": 0}));
        let result = validate_record(&row, &allowlist(&["order_id", "customer_id", "total_amount"]));

        assert!(result.is_valid);
        assert!(result.missing_fields.is_empty());
        assert_eq!(result.summary.completion_percentage, 100.0);
    }

    #[test]
    fn whitespace_only_string_is_missing() {
        let row = record(json!({"order_id": "O1", "delivery_address": "   \t"}));
        let result = validate_record(&row, &allowlist(&["order_id", "delivery_address"]));

        assert_eq!(result.missing_fields, vec!["delivery_address"]);
        let entry = result
            .fields
            .iter()
            .find(|f| f.field_name == "delivery_address")
            .unwrap();
        assert_eq!(
            entry.error_message.as_deref(),
            Some("Field 'delivery_address' is missing or empty")
        );
    }

    #[test]
    fn optional_fields_are_always_valid() {
        let row = record(json!({"order_id": "O1", "promo_code": null}));
        let result = validate_record(&row, &allowlist(&["order_id"]));

        let promo = result.fields.iter().find(|f| f.field_name == "promo_code").unwrap();
        assert!(promo.is_valid);
        assert!(!promo.is_mandatory);
        assert!(result.is_valid);
    }

    #[test]
    fn missing_fields_follow_database_column_order() {
        let row = record(json!({
            "total_amount": null,
            "order_id": "",
            "order_status": "OPEN",
            "customer_id": null,
        }));
        let policy = MandatoryFieldPolicy::AllExcept { excluded: vec![] };

        let result = validate_record(&row, &policy);

        assert_eq!(
            result.missing_fields,
            vec!["total_amount", "order_id", "customer_id"]
        );
    }

    #[test]
    fn all_except_policy_skips_excluded_columns() {
        let row = record(json!({"order_id": "O1", "tracking_number": null, "notes": null}));
        let policy = MandatoryFieldPolicy::AllExcept {
            excluded: vec!["tracking_number".into()],
        };

        let result = validate_record(&row, &policy);

        assert_eq!(result.missing_fields, vec!["notes"]);
        assert_eq!(result.summary.mandatory_fields, 2);
        assert_eq!(result.summary.completion_percentage, 50.0);
    }

    #[test]
    fn allowlisted_column_absent_from_row_is_reported_once() {
        let row = record(json!({"order_id": "O1"}));
        let result = validate_record(&row, &allowlist(&["order_id", "order_status"]));

        assert_eq!(result.missing_fields, vec!["order_status"]);
        assert_eq!(result.summary.total_fields, 1);
        assert_eq!(result.summary.mandatory_fields, 2);
    }

    #[test]
    fn column_names_match_case_insensitively() {
        let row = record(json!({"ORDER_ID": "O1", "CUSTOMER_ID": null}));
        let result = validate_record(&row, &allowlist(&["order_id", "customer_id"]));

        assert_eq!(result.missing_fields, vec!["CUSTOMER_ID"]);
    }

    #[test]
    fn empty_mandatory_set_is_trivially_valid() {
        let row = record(json!({"order_id": null}));
        let result = validate_record(&row, &allowlist(&[]));

        assert!(result.is_valid);
        assert_eq!(result.summary.mandatory_fields, 0);
        assert_eq!(result.summary.completion_percentage, 100.0);
    }

    #[test]
    fn completion_rounds_to_one_decimal() {
        assert_eq!(completion_percentage(1, 3), 33.3);
        assert_eq!(completion_percentage(5, 6), 83.3);
        assert_eq!(completion_percentage(0, 4), 0.0);
        assert_eq!(completion_percentage(0, 0), 100.0);
    }

    #[test]
    fn completion_ties_round_away_from_zero() {
        // 6.25 and 43.75 are exact in binary, so these are true ties.
        assert_eq!(completion_percentage(1, 16), 6.3);
        assert_eq!(completion_percentage(7, 16), 43.8);
    }

    #[test]
    fn policy_from_config_rejects_unknown_name() {
        let err = MandatoryFieldPolicy::from_config("everything", vec![], vec![]).unwrap_err();
        assert!(err.contains("allowlist, all_except"));

        let policy =
            MandatoryFieldPolicy::from_config(" ALL_EXCEPT ", vec![], vec!["a".into()]).unwrap();
        assert_eq!(policy.as_str(), POLICY_ALL_EXCEPT);
    }

    #[test]
    fn not_found_report_serializes_without_validation_fields() {
        let report = OrderValidationReport::not_found("ORD-1", "NYC");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["order_found"], false);
        assert!(json.get("is_valid").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn found_report_flattens_validation() {
        let row = record(json!({"order_id": "O1", "customer_id": null}));
        let report = OrderValidationReport::found(
            "ORD-1",
            "NYC",
            &allowlist(&["order_id", "customer_id"]),
            row,
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["is_valid"], false);
        assert_eq!(json["missing_fields"], json!(["customer_id"]));
        assert_eq!(json["summary"]["completion_percentage"], 50.0);
        assert_eq!(json["policy"], "allowlist");
    }
}
