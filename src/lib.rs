//! Client-side feed cache for a small social network: paginated post listings held in a
//! shared query cache, patched in place by confirmed mutations.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
