//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async read methods
//! that accept `&PgPool` as the first argument.

pub mod order_repo;

pub use order_repo::OrderRepo;
