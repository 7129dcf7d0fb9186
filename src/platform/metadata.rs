//! Usage: Role-connection metadata schema and its one-time registration (bot-authenticated).

use super::discord::DiscordApi;
use crate::domain::entitlements::EntitlementFlag;
use crate::shared::error::AppResult;
use crate::shared::security::sanitize_error_body_snippet;
use reqwest::header::AUTHORIZATION;
use serde::{Serialize, Serializer};

/// Platform metadata comparison types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataType {
    IntegerLessThanOrEqual = 1,
    IntegerGreaterThanOrEqual = 2,
    IntegerEqual = 3,
    IntegerNotEqual = 4,
    DatetimeLessThanOrEqual = 5,
    DatetimeGreaterThanOrEqual = 6,
    BooleanEqual = 7,
    BooleanNotEqual = 8,
}

impl Serialize for MetadataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: MetadataType,
}

fn describe(flag: EntitlementFlag) -> (&'static str, &'static str) {
    match flag {
        EntitlementFlag::LumiPremium => ("LUMI Premium User", "Has bought or received premium."),
        EntitlementFlag::ServerOwner => ("Server Owner", "Is the owner of this server."),
        EntitlementFlag::BugHunter => ("Bug Hunter", "Helps by looking for bugs and mistakes."),
    }
}

/// One boolean_eq record per entitlement flag.
pub fn metadata_schema() -> Vec<MetadataRecord> {
    EntitlementFlag::ALL
        .into_iter()
        .map(|flag| {
            let (name, description) = describe(flag);
            MetadataRecord {
                key: flag.as_key(),
                name,
                description,
                kind: MetadataType::BooleanEqual,
            }
        })
        .collect()
}

/// Overwrite the application's metadata schema. No retry; the platform reply is logged
/// and returned.
pub async fn register_metadata_schema(
    api: &DiscordApi,
    bot_token: &str,
) -> AppResult<serde_json::Value> {
    let schema = metadata_schema();
    let response = api
        .client()
        .put(api.metadata_schema_url())
        .header(AUTHORIZATION, format!("Bot {}", bot_token.trim()))
        .json(&schema)
        .send()
        .await
        .map_err(|e| format!("SYSTEM_ERROR: metadata schema request failed: {e}"))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("SYSTEM_ERROR: metadata schema response read failed: {e}"))?;
    if !status.is_success() {
        tracing::error!(status = status.as_u16(), "metadata schema registration rejected");
        return Err(format!(
            "SYSTEM_ERROR: metadata schema endpoint returned status={} body={}",
            status.as_u16(),
            sanitize_error_body_snippet(&body)
        )
        .into());
    }

    tracing::info!(records = schema.len(), "metadata schema registered");
    tracing::debug!(response = %body, "metadata schema response");
    serde_json::from_str(&body)
        .map_err(|e| format!("SYSTEM_ERROR: metadata schema response json invalid: {e}").into())
}
