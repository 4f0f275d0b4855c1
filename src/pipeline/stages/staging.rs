//! Escalation triggers that come from the document itself.

use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::Metadata;
use crate::pipeline::stage::{passthrough, Stage};
use crate::version::game::GAME_VERSION_KEYS;
use serde_json::Value;

const DEFAULT_STAGING_REASON: &str = "Netkan requests staging";

/// Escalates when the netkan asks for it (`x_netkan_staging`) or when the
/// document claims explicit game compatibility, which automated inflation
/// cannot verify.
pub struct StagingStage;

fn game_version_claims(metadata: &Metadata) -> Vec<String> {
    GAME_VERSION_KEYS
        .iter()
        .filter_map(|key| {
            let value = match metadata.get(key)? {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            if value.is_empty() || value.eq_ignore_ascii_case("any") {
                None
            } else {
                Some(format!("{} {}", key, value))
            }
        })
        .collect()
}

impl Stage for StagingStage {
    fn name(&self) -> &str {
        "staging"
    }

    fn transform(&self, metadata: Metadata, ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        if metadata.staged() {
            let reason = metadata
                .staging_reason()
                .unwrap_or(DEFAULT_STAGING_REASON)
                .to_string();
            ctx.escalate(reason);
        }

        let claims = game_version_claims(&metadata);
        if !claims.is_empty() {
            ctx.escalate(format!(
                "Game version compatibility needs review for {} {}: {}",
                metadata.identifier(),
                metadata.version().map_or(String::new(), |v| v.to_string()),
                claims.join(", ")
            ));
        }

        passthrough(metadata)
    }
}
