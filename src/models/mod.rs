//! # Data Models
//!
//! This module contains all the data models used throughout the Provisioning API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod admin_user;
pub mod location;
pub mod purchase_record;
pub mod tenant;

pub use admin_user::Entity as AdminUser;
pub use location::Entity as Location;
pub use purchase_record::Entity as PurchaseRecord;
pub use tenant::Entity as Tenant;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "tenant-provisioning".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
