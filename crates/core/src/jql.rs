//! Structured Jira filters and their rendering into JQL.
//!
//! The LLM turns a free-text question into a [`JiraQuery`]; [`build_jql`]
//! renders it deterministically. When the model's answer is unusable,
//! [`JiraQuery::keyword_fallback`] searches stories by the raw words instead.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static ISSUE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*-\d+$").expect("valid regex"));

/// `PROJ-123` style key, upper case. Anything else must not reach a URL path.
pub fn is_issue_key(key: &str) -> bool {
    ISSUE_KEY_RE.is_match(key)
}

/// JQL used when no clause applies, and by the connection probe.
pub const MATCH_ALL_JQL: &str = "project is not EMPTY";

/// Kind of search the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    #[default]
    StorySearch,
    EpicSearch,
    StatusFilter,
    AssigneeFilter,
    DateRange,
    ProjectFilter,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StorySearch => "story_search",
            Self::EpicSearch => "epic_search",
            Self::StatusFilter => "status_filter",
            Self::AssigneeFilter => "assignee_filter",
            Self::DateRange => "date_range",
            Self::ProjectFilter => "project_filter",
        }
    }
}

/// Filter fields extracted from a natural-language question.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JiraQuery {
    #[serde(default)]
    pub query_type: QueryType,
    #[serde(default)]
    pub project_key: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub epic_key: Option<String>,
    #[serde(default)]
    pub story_key: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keywords: Vec<String>,
}

impl JiraQuery {
    /// Story search over the whitespace-separated words of the question.
    pub fn keyword_fallback(user_query: &str) -> Self {
        Self {
            query_type: QueryType::StorySearch,
            keywords: user_query.split_whitespace().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    /// Parse the model's JSON answer. `query_type: null` counts as absent.
    pub fn from_llm_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut value = value;
        if let Some(obj) = value.as_object_mut() {
            if obj.get("query_type").is_some_and(|v| v.is_null()) {
                obj.remove("query_type");
            }
        }
        serde_json::from_value(value)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Quote a value for use inside a JQL string literal.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Render a [`JiraQuery`] as JQL. Clauses are joined with `AND`.
pub fn build_jql(query: &JiraQuery) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(project) = non_blank(&query.project_key) {
        parts.push(format!("project = {}", quote(project)));
    }

    match query.query_type {
        QueryType::EpicSearch => parts.push("issuetype = Epic".to_string()),
        QueryType::StorySearch => parts.push("issuetype = Story".to_string()),
        _ => {}
    }

    if let Some(epic) = non_blank(&query.epic_key) {
        parts.push(format!("key = {}", quote(epic)));
    }
    if let Some(story) = non_blank(&query.story_key) {
        parts.push(format!("key = {}", quote(story)));
    }
    if let Some(assignee) = non_blank(&query.assignee) {
        parts.push(format!("assignee ~ {}", quote(assignee)));
    }
    if let Some(status) = non_blank(&query.status) {
        parts.push(format!("status = {}", quote(status)));
    }
    if let Some(from) = non_blank(&query.date_from) {
        parts.push(format!("created >= {}", quote(from)));
    }
    if let Some(to) = non_blank(&query.date_to) {
        parts.push(format!("created <= {}", quote(to)));
    }

    let keyword_clauses: Vec<String> = query
        .keywords
        .iter()
        .map(|kw| kw.trim())
        .filter(|kw| !kw.is_empty())
        .map(|kw| format!("summary ~ {q} OR description ~ {q}", q = quote(kw)))
        .collect();
    if !keyword_clauses.is_empty() {
        parts.push(format!("({})", keyword_clauses.join(" OR ")));
    }

    if parts.is_empty() {
        MATCH_ALL_JQL.to_string()
    } else {
        parts.join(" AND ")
    }
}
