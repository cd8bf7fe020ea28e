//! JWT claims preview and cross-token comparison.
//!
//! Tokens found in a session's logs are decoded WITHOUT verifying their
//! signature. The result is a claims preview only, not trust-bearing: it
//! shows what a token says, never that the statement is genuine. Every
//! [`JwtAnalysis`] carries `trust_bearing: false` and [`CLAIMS_PREVIEW_NOTICE`].

use std::collections::BTreeSet;
use std::sync::LazyLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CLAIMS_PREVIEW_NOTICE: &str =
    "Claims preview only, not trust-bearing: token signatures were not verified.";

/// Claims that identify the caller; disagreement between tokens is flagged.
pub const IDENTITY_CLAIMS: &[&str] = &["sub", "user_id", "customer_id", "email", "client_id"];

/// Compact JWS: base64url header (always `{"...` → `eyJ`), payload, signature.
pub const TOKEN_PATTERN: &str = r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*";

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOKEN_PATTERN).expect("valid regex"));

/// Characters of the raw token echoed back in responses.
const TOKEN_PREVIEW_CHARS: usize = 20;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One decoded token. `claims` are unverified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenInspection {
    pub index: usize,
    pub token_preview: String,
    pub algorithm: Option<String>,
    pub header: Map<String, Value>,
    pub claims: Map<String, Value>,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
    pub expired: Option<bool>,
    pub error: Option<String>,
}

/// How one claim compares across the decoded tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimComparison {
    pub claim: String,
    /// Value per token, `null` where the token lacks the claim.
    pub values: Vec<Value>,
    pub present_in: usize,
    /// Every token carrying the claim has the same value.
    pub consistent: bool,
    pub identity_claim: bool,
}

/// Response body of a JWT analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JwtAnalysis {
    pub trust_bearing: bool,
    pub notice: &'static str,
    pub token_count: usize,
    pub decoded_count: usize,
    pub tokens: Vec<TokenInspection>,
    pub claim_comparison: Vec<ClaimComparison>,
    /// Identity claims whose values differ between tokens.
    pub identity_mismatches: Vec<String>,
    pub identity_consistent: bool,
}

// ---------------------------------------------------------------------------
// Extraction & decoding
// ---------------------------------------------------------------------------

/// Find JWT-shaped strings in `texts`, deduplicated in first-seen order.
pub fn extract_tokens<'a>(texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = Vec::new();
    for text in texts {
        for m in TOKEN_RE.find_iter(text) {
            let token = m.as_str().to_string();
            if !seen.contains(&token) {
                seen.push(token);
            }
        }
    }
    seen
}

fn decode_segment(segment: &str, what: &str) -> Result<Map<String, Value>, CoreError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| CoreError::Validation(format!("Token {what} is not base64url: {e}")))?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CoreError::Validation(format!("Token {what} is not a JSON object"))),
        Err(e) => Err(CoreError::Validation(format!("Token {what} is not JSON: {e}"))),
    }
}

/// Decode header and payload without any signature check.
pub fn decode_unverified(token: &str) -> Result<(Map<String, Value>, Map<String, Value>), CoreError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(CoreError::Validation(format!(
            "Token must have 3 segments, found {}",
            parts.len()
        )));
    }
    let header = decode_segment(parts[0], "header")?;
    let claims = decode_segment(parts[1], "payload")?;
    Ok((header, claims))
}

fn preview(token: &str) -> String {
    let head: String = token.chars().take(TOKEN_PREVIEW_CHARS).collect();
    format!("{head}...")
}

/// Inspect one token. Decode failures are reported in `error`, not raised.
pub fn inspect_token(index: usize, token: &str, now_epoch: i64) -> TokenInspection {
    let algorithm = jsonwebtoken::decode_header(token)
        .ok()
        .map(|h| format!("{:?}", h.alg));

    match decode_unverified(token) {
        Ok((header, claims)) => {
            let issued_at = claims.get("iat").and_then(Value::as_i64);
            let expires_at = claims.get("exp").and_then(Value::as_i64);
            TokenInspection {
                index,
                token_preview: preview(token),
                algorithm: algorithm.or_else(|| {
                    header.get("alg").and_then(Value::as_str).map(str::to_string)
                }),
                header,
                claims,
                issued_at,
                expires_at,
                expired: expires_at.map(|exp| exp <= now_epoch),
                error: None,
            }
        }
        Err(e) => TokenInspection {
            index,
            token_preview: preview(token),
            algorithm,
            header: Map::new(),
            claims: Map::new(),
            issued_at: None,
            expires_at: None,
            expired: None,
            error: Some(e.to_string()),
        },
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Compare every claim seen across the successfully decoded tokens.
pub fn compare_claims(tokens: &[TokenInspection]) -> Vec<ClaimComparison> {
    let decoded: Vec<&TokenInspection> = tokens.iter().filter(|t| t.error.is_none()).collect();

    let names: BTreeSet<&str> = decoded
        .iter()
        .flat_map(|t| t.claims.keys().map(String::as_str))
        .collect();

    names
        .into_iter()
        .map(|claim| {
            let values: Vec<Value> = decoded
                .iter()
                .map(|t| t.claims.get(claim).cloned().unwrap_or(Value::Null))
                .collect();
            let present: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
            let consistent = present.windows(2).all(|w| w[0] == w[1]);
            ClaimComparison {
                claim: claim.to_string(),
                present_in: present.len(),
                consistent,
                identity_claim: IDENTITY_CLAIMS.contains(&claim),
                values,
            }
        })
        .collect()
}

/// Decode and compare a set of tokens (already deduplicated).
pub fn analyze_tokens(tokens: &[String], now_epoch: i64) -> JwtAnalysis {
    let inspections: Vec<TokenInspection> = tokens
        .iter()
        .enumerate()
        .map(|(i, token)| inspect_token(i, token, now_epoch))
        .collect();
    let comparison = compare_claims(&inspections);
    let identity_mismatches: Vec<String> = comparison
        .iter()
        .filter(|c| c.identity_claim && !c.consistent)
        .map(|c| c.claim.clone())
        .collect();

    JwtAnalysis {
        trust_bearing: false,
        notice: CLAIMS_PREVIEW_NOTICE,
        token_count: inspections.len(),
        decoded_count: inspections.iter().filter(|t| t.error.is_none()).count(),
        identity_consistent: identity_mismatches.is_empty(),
        identity_mismatches,
        claim_comparison: comparison,
        tokens: inspections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token(claims: Value) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"not-checked")).unwrap()
    }

    #[test]
    fn extracts_bearer_tokens_once_in_order() {
        let a = token(json!({"sub": "u1"}));
        let b = token(json!({"sub": "u2"}));
        let lines = [
            format!("Authorization: Bearer {a}"),
            format!("retry with token={b} and again {a}"),
            "no token here".to_string(),
        ];

        let found = extract_tokens(lines.iter().map(String::as_str));

        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn decodes_without_signature_check() {
        let t = token(json!({"sub": "u1", "exp": 100}));
        let tampered = format!("{}.forged", t.rsplit_once('.').unwrap().0);

        let inspection = inspect_token(0, &tampered, 200);

        assert_eq!(inspection.error, None);
        assert_eq!(inspection.claims["sub"], "u1");
        assert_eq!(inspection.algorithm.as_deref(), Some("HS256"));
        assert_eq!(inspection.expired, Some(true));
    }

    #[test]
    fn malformed_tokens_report_errors() {
        assert_matches!(decode_unverified("abc.def"), Err(CoreError::Validation(_)));
        let inspection = inspect_token(1, "eyJ!!!.x.y", 0);
        assert!(inspection.error.is_some());
        assert!(inspection.claims.is_empty());
    }

    #[test]
    fn identity_mismatch_is_flagged() {
        let tokens = vec![
            token(json!({"sub": "u1", "scope": "read", "email": "a@x.io"})),
            token(json!({"sub": "u2", "scope": "read"})),
        ];

        let analysis = analyze_tokens(&tokens, 0);

        assert!(!analysis.trust_bearing);
        assert_eq!(analysis.notice, CLAIMS_PREVIEW_NOTICE);
        assert_eq!(analysis.decoded_count, 2);
        assert_eq!(analysis.identity_mismatches, vec!["sub"]);
        assert!(!analysis.identity_consistent);

        let email = analysis.claim_comparison.iter().find(|c| c.claim == "email").unwrap();
        assert!(email.consistent);
        assert_eq!(email.present_in, 1);
        assert_eq!(email.values, vec![json!("a@x.io"), Value::Null]);
    }

    #[test]
    fn no_tokens_is_consistent() {
        let analysis = analyze_tokens(&[], 0);
        assert_eq!(analysis.token_count, 0);
        assert!(analysis.identity_consistent);
    }
}
