//! Usage: Process-level wiring helpers (logging).

pub mod logging;
