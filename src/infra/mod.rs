//! Usage: Infrastructure helpers (settings loading).

pub mod settings;
