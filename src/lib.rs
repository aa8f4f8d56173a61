//! Campus-RS Library
//!
//! Core of a multi-tenant education platform: identity and role profiles
//! provisioned in units of work, with cross-aggregate hydration on reads.

pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod services;
pub mod state;
pub mod utils;

pub use state::AppState;
