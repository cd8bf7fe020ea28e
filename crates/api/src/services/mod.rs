//! Stateless façades, one per downstream system.
//!
//! A service validates its input, calls its downstream (and the model where
//! it needs one), and reshapes the answer into a response body. Downstream
//! failures are reported inside the body as `success: false`; only input
//! errors surface as [`crate::error::AppError`].

pub mod fraud;
pub mod jenkins;
pub mod jira;
pub mod jwt;
pub mod logs;
pub mod orders;
pub mod reports;
pub mod security;
