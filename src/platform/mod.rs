//! Usage: Outbound platform (Discord) API surface.

pub mod api;
pub mod discord;
pub mod metadata;
