//! Query functions over the injected connection. Each takes any
//! `ConnectionTrait`, so handlers pass either the pool or an open transaction.

pub mod follows;
pub mod posts;
pub mod users;
