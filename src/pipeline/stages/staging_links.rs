use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::Metadata;
use crate::pipeline::stage::{passthrough, Stage};
use serde_json::{Map, Value};

/// Adds a markdown table of the document's resources to the escalation
/// reasons, so a reviewer has the relevant links at hand.
pub struct StagingLinksStage;

fn resource_table(resources: &Map<String, Value>) -> Option<String> {
    let rows: Vec<String> = resources
        .iter()
        .filter_map(|(name, url)| url.as_str().map(|url| format!("{} | <{}>", name, url)))
        .collect();
    if rows.is_empty() {
        return None;
    }
    Some(format!("Resource | URL\n:-- | :--\n{}", rows.join("\n")))
}

impl Stage for StagingLinksStage {
    fn name(&self) -> &str {
        "staging_links"
    }

    fn transform(&self, metadata: Metadata, ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        if ctx.is_escalated() && ctx.staging_links {
            if let Some(table) = metadata
                .get("resources")
                .and_then(Value::as_object)
                .and_then(resource_table)
            {
                ctx.add_escalation_detail(table);
            }
        }
        passthrough(metadata)
    }
}
