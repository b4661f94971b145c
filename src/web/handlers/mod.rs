//! HTTP request handlers, organized by domain

pub mod admin;
pub mod export;
pub mod health;
