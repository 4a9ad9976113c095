//! # Provisioning API Library
//!
//! This library provides the core functionality for the Provisioning API
//! service: the tenant provisioning saga, its collaborator interfaces, and
//! the HTTP surface for checkout, trial, signup, and operator flows.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod notifier;
pub mod reassignment;
pub mod retry;
pub mod saga;
pub mod server;
pub mod stores;
pub mod telemetry;
pub use migration;
