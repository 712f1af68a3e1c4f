//! HTTP handlers

pub mod cache;
pub mod health;
pub mod search;
pub mod sources;
