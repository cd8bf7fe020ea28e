//! Prompt templates and generation parameters for every LLM call.
//!
//! Prompts are plain strings; parsing the replies is the job of
//! [`crate::llm_json`] and the individual services.

use serde_json::Value;

use crate::log_query::LogEntry;

/// Sampling parameters for one kind of completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

pub const JIRA_PARSE_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.1,
    max_tokens: None,
};

pub const SECURITY_ANALYSIS_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.3,
    max_tokens: Some(600),
};

pub const API_CALL_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.2,
    max_tokens: Some(800),
};

pub const SESSION_INSIGHTS_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.2,
    max_tokens: Some(600),
};

// ---------------------------------------------------------------------------
// Jira
// ---------------------------------------------------------------------------

pub fn jira_parse_prompt(user_query: &str) -> String {
    format!(
        r#"Parse the following user query about Jira tickets and extract relevant information:

User Query: "{user_query}"

Extract and return a JSON object with the following fields (set to null if not mentioned):
- query_type: one of ["story_search", "epic_search", "status_filter", "assignee_filter", "date_range", "project_filter"]
- project_key: project abbreviation (e.g., "PROJ", "DEV")
- assignee: person's name or username
- status: ticket status (e.g., "To Do", "In Progress", "Done")
- epic_key: specific epic identifier
- story_key: specific story identifier
- date_from: start date in YYYY-MM-DD format
- date_to: end date in YYYY-MM-DD format
- keywords: array of relevant search terms

Examples:
- "Show me all stories assigned to John" -> {{"query_type": "assignee_filter", "assignee": "John"}}
- "Find epic PROJ-123" -> {{"query_type": "epic_search", "epic_key": "PROJ-123"}}
- "Stories in progress for project DEV" -> {{"query_type": "status_filter", "project_key": "DEV", "status": "In Progress"}}

Return only the JSON object:"#
    )
}

/// Flatten a Jira description, which is either plain text or an Atlassian
/// Document Format tree, into text.
pub fn description_text(description: &Value) -> String {
    fn collect(node: &Value, out: &mut Vec<String>) {
        match node {
            Value::String(s) => out.push(s.clone()),
            Value::Object(obj) => {
                if let Some(Value::String(text)) = obj.get("text") {
                    out.push(text.clone());
                }
                if let Some(content) = obj.get("content") {
                    collect(content, out);
                }
            }
            Value::Array(items) => items.iter().for_each(|item| collect(item, out)),
            _ => {}
        }
    }

    let mut parts = Vec::new();
    collect(description, &mut parts);
    parts.join(" ").trim().to_string()
}

fn field_name(fields: &Value, key: &str) -> String {
    fields
        .pointer(&format!("/{key}/name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Render the parts of an issue that matter for a security review.
pub fn issue_security_context(issue: &Value) -> String {
    let fields = issue.get("fields").cloned().unwrap_or(Value::Null);
    let key = issue.get("key").and_then(Value::as_str).unwrap_or_default();
    let summary = fields.get("summary").and_then(Value::as_str).unwrap_or_default();

    let description = match fields.get("description") {
        None | Some(Value::Null) => "No description provided".to_string(),
        Some(value) => description_text(value),
    };

    let labels = fields
        .get("labels")
        .and_then(Value::as_array)
        .map(|labels| labels.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(", "))
        .unwrap_or_default();

    let components = fields
        .get("components")
        .and_then(Value::as_array)
        .map(|comps| {
            comps
                .iter()
                .filter_map(|c| c.get("name").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    format!(
        "Issue Key: {key}\n\
         Summary: {summary}\n\
         Description: {description}\n\
         Type: {issue_type}\n\
         Priority: {priority}\n\
         Status: {status}\n\
         Labels: {labels}\n\
         Components: {components}",
        issue_type = field_name(&fields, "issuetype"),
        priority = field_name(&fields, "priority"),
        status = field_name(&fields, "status"),
    )
}

pub fn security_analysis_prompt(issue_context: &str) -> String {
    format!(
        r#"You are a cybersecurity expert analyzing a Jira issue for fraud and security risks.

Issue Details:
{issue_context}

Provide a comprehensive fraud & security impact analysis in simple, non-technical language that a business manager can understand.

Focus on:
1. Security risks this issue might create
2. Potential exploitation vectors for fraud
3. Business impact assessment
4. Risk level (Low/Medium/High/Critical)
5. Specific mitigation recommendations

Return your analysis in the following JSON format:
{{
    "analysis": "Detailed analysis text here...",
    "risk_level": "Low/Medium/High/Critical",
    "recommendations": ["recommendation 1", "recommendation 2", ...]
}}

Keep recommendations actionable and business-focused. Avoid technical jargon."#
    )
}

// ---------------------------------------------------------------------------
// Fraud analysis
// ---------------------------------------------------------------------------

/// Describe one log line for the per-call analysis prompt.
pub fn log_context(entry: &LogEntry, source_type: &str) -> String {
    let mut lines = vec![
        format!("Timestamp: {}", entry.timestamp.as_deref().unwrap_or("Unknown")),
        format!("Log Level: {}", entry.level),
        format!("Source: {source_type}"),
        format!(
            "Component: {}",
            if entry.component.is_empty() { "Unknown" } else { entry.component.as_str() }
        ),
    ];

    if !entry.message.is_empty() {
        lines.push(format!("Message: {}", entry.message));
    }

    let labelled = [
        ("api_endpoint", "API Endpoint"),
        ("http_method", "HTTP Method"),
        ("status_code", "Status Code"),
        ("risk_score", "Risk Score"),
        ("decision", "Decision"),
        ("auth_result", "Auth Result"),
        ("gateway_response", "Gateway Response"),
        ("payment_id", "Payment ID"),
    ];
    for (key, label) in labelled {
        if let Some(value) = entry.detail_text(key) {
            lines.push(format!("{label}: {value}"));
        }
    }
    if let Some(ms) = entry.detail_text("response_time") {
        lines.push(format!("Response Time: {ms}ms"));
    }
    if let Some(amount) = entry.detail_text("amount") {
        let currency = entry.detail_text("currency").unwrap_or_default();
        lines.push(format!("Amount: {amount} {currency}").trim_end().to_string());
    }

    for (key, value) in &entry.raw_data {
        if matches!(key.as_str(), "message" | "@timestamp" | "timestamp" | "level") {
            continue;
        }
        let rendered = match value {
            Value::Null => continue,
            Value::String(s) if s.is_empty() => continue,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        lines.push(format!("{key}: {rendered}"));
    }

    lines.join("\n")
}

pub fn api_call_prompt(fraud_type: &str, log_context: &str) -> String {
    format!(
        r#"You are a fraud analysis expert examining API logs. Analyze this API call/log entry and provide insights.

Fraud Analysis Type: {fraud_type}
Log Entry Context:
{log_context}

Please analyze this API call and provide a JSON response with the following structure:
{{
    "api_endpoint": "extracted endpoint or service name",
    "http_method": "HTTP method if available",
    "request_purpose": "what this API call is trying to accomplish",
    "response_analysis": "analysis of the response/outcome",
    "is_successful": true/false,
    "error_details": "error description if failed, null if successful",
    "fraud_relevance": "how this relates to fraud detection/prevention",
    "risk_indicators": ["list", "of", "potential", "risk", "indicators"],
    "business_impact": "potential business impact of this call",
    "recommendations": "specific recommendations for this API call",
    "processing_time_ms": extracted_time_if_available,
    "status_code": extracted_status_code_if_available,
    "confidence_score": 0.0-1.0
}}

Focus on:
1. Whether the API call succeeded or failed
2. What fraud monitoring/prevention purpose it serves
3. Any error patterns or issues
4. Risk indicators or suspicious patterns
5. Business impact and recommendations"#
    )
}

/// `call_summary` is the pretty-printed JSON list of per-call summaries.
pub fn session_insights_prompt(fraud_type: &str, call_summary: &str) -> String {
    format!(
        r#"You are a fraud analysis expert reviewing a complete session analysis. Based on the API call analyses below, provide high-level insights.

Fraud Type: {fraud_type}
API Call Summary: {call_summary}

Provide a JSON response with:
{{
    "overall_session_health": "assessment of the session",
    "key_findings": ["finding1", "finding2", "finding3"],
    "fraud_risk_assessment": "overall fraud risk evaluation",
    "critical_issues": ["issue1", "issue2"],
    "positive_indicators": ["indicator1", "indicator2"],
    "recommended_actions": ["action1", "action2"],
    "session_score": 0-100,
    "confidence_level": "high/medium/low"
}}"#
    )
}
