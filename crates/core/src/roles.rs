//! Well-known role names carried in the `role` claim of access tokens.

/// Full access, including the usage/cost dashboard.
pub const ROLE_ADMIN: &str = "admin";

/// Regular end user.
pub const ROLE_USER: &str = "user";
