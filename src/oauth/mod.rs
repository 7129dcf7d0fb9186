//! Usage: OAuth2 authorization-code flow for linked roles.
//!
//! `authorize` builds the consent redirect, `state` seals the anti-forgery token,
//! `callback` runs the verify/exchange/fetch/authorize/push pipeline.

pub mod authorize;
pub mod callback;
pub mod state;
pub mod token_exchange;
