//! # Tenant Provisioning Saga
//!
//! One parameterized orchestrator drives all three provisioning flows
//! (paid checkout, free trial, public signup). The flows differ only in a
//! small set of variation points carried on the request; they share the
//! same step order, the same compensation rules, and the same outcome
//! shape.

pub mod orchestrator;
pub mod request;

pub use orchestrator::{ProvisioningReceipt, ProvisioningSaga};
pub use request::{FlowKind, FlowOptions, ProvisioningRequest};
