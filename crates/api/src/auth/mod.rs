//! Bearer token validation.
//!
//! Identity is issued elsewhere; this service only verifies HS256 tokens
//! signed with the shared `JWT_SECRET`.

pub mod jwt;
