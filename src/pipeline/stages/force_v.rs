use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::Metadata;
use crate::pipeline::stage::{passthrough, Stage};
use serde_json::Value;

/// `x_netkan_force_v`: keep a leading `v` on versions from hosts that
/// sometimes drop it, so ordering against older `v`-prefixed releases holds.
pub struct ForceVStage;

impl Stage for ForceVStage {
    fn name(&self) -> &str {
        "force_v"
    }

    fn transform(&self, metadata: Metadata, _ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        if !metadata.flag("x_netkan_force_v") {
            return passthrough(metadata);
        }
        let version = match metadata.get("version").and_then(Value::as_str) {
            Some(version) if !version.starts_with('v') => format!("v{}", version),
            _ => return passthrough(metadata),
        };

        log::debug!("Forcing v prefix: {}", version);
        let updated = metadata.edit(|json| {
            json.insert("version".into(), Value::String(version));
            Ok(())
        })?;
        Ok(vec![updated])
    }
}
