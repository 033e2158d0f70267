//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for inserts and patches

pub mod notification;
pub mod plan;
pub mod push_subscription;
pub mod usage;
pub mod user;
