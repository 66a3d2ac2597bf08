//! Bill Intake Service Library
//!
//! Lead capture for utility bills: a two-step submission wizard, storage of
//! uploaded bills and submission records, admin notification by mail, PDF text
//! extraction for review, and the admin dashboard.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Domain logic and shared errors/models.
//! - `integrations`: External service clients.
//! - `admin`: Admin dashboard, sign-in and bill download.
//! - `auth`: Admin session verification.
//! - `circuit_breaker`: Circuit breaker for outbound mail.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Submission record storage.
//! - `errors`: Error handling types.
//! - `extraction`: PDF text extraction.
//! - `handlers`: HTTP request handlers and shared state.
//! - `models`: Core data models.
//! - `notifier`: Admin mail notifications.
//! - `progress`: Analysis progress sessions.
//! - `rate_schedule`: Utility rate schedule catalog.
//! - `routes`: Router assembly and middleware.
//! - `storage`: Bill blob storage.
//! - `submission`: Submission orchestration.
//! - `validation`: Input validation rules.
//! - `wizard`: Submission wizard state machine.

pub mod api;
pub mod core;
pub mod integrations;

pub mod admin;
pub mod auth;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod extraction;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod progress;
pub mod rate_schedule;
pub mod routes;
pub mod storage;
pub mod submission;
pub mod validation;
pub mod wizard;
