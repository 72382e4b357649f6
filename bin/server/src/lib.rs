//! sessiongate HTTP server.
//!
//! Exchanges identity provider ID tokens for session cookies, gates every
//! other route on a valid session, and stores application users in
//! PostgreSQL.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
