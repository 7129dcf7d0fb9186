//! Usage: Domain modules (business concepts and use-cases).

pub mod entitlements;
