pub mod error;
pub(crate) mod security;
pub(crate) mod time;
