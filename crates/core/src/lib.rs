//! Domain logic for the Beacon integration backend.
//!
//! Everything in this crate is pure: no network, no database. The API crate
//! loads data through the connectors and the order store, then hands it to
//! these functions for validation, classification, query building and
//! document rendering.

pub mod error;
pub mod fraud;
pub mod jenkins_jobs;
pub mod jql;
pub mod jwt_inspect;
pub mod llm_json;
pub mod log_query;
pub mod masking;
pub mod order_validation;
pub mod prompts;
pub mod report_doc;
pub mod request_fields;
