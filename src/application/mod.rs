//! Feed application services: commands, mutations, pagination and the per-view session.

pub mod commands;
pub mod draft;
pub mod error;
pub mod feed;
pub mod mutations;
pub mod pagination;
