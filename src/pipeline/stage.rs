//! The stage abstraction every transformation implements.

use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::Metadata;

/// A named unit of the inflation pipeline.
///
/// A stage maps one document to zero or more documents. Stages with nothing
/// to do return their input unchanged as a single-element vector; stages
/// that expand upstream releases return one document per release. Side
/// effects that must be visible to the rest of the run go through `ctx`.
///
/// # Example
///
/// ```rust
/// use netkan::context::RunContext;
/// use netkan::metadata::Metadata;
/// use netkan::pipeline::{FnStage, Stage};
/// use serde_json::json;
///
/// let stage = FnStage::new("noop", |metadata, _ctx| Ok(vec![metadata]));
/// let doc = Metadata::from_value(json!({"identifier": "Mod"})).unwrap();
/// let out = stage.transform(doc.clone(), &mut RunContext::new()).unwrap();
/// assert!(out[0].same_document(&doc));
/// ```
pub trait Stage: Send + Sync {
    /// Get the stage name, used for logging and override triggers.
    fn name(&self) -> &str;

    fn transform(&self, metadata: Metadata, ctx: &mut RunContext) -> Result<Vec<Metadata>>;
}

/// Identity result for stages that do not apply.
pub fn passthrough(metadata: Metadata) -> Result<Vec<Metadata>> {
    Ok(vec![metadata])
}

/// A stage built from a closure.
///
/// Useful for one-off stages in tests and for wiring small adjustments
/// into a pipeline without a dedicated type.
pub struct FnStage<F> {
    name: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(Metadata, &mut RunContext) -> Result<Vec<Metadata>> + Send + Sync,
{
    /// Create a new stage with a name and transformation function.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(Metadata, &mut RunContext) -> Result<Vec<Metadata>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, metadata: Metadata, ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        (self.func)(metadata, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fn_stage_runs_closure() {
        let stage = FnStage::new("escalate", |metadata, ctx: &mut RunContext| {
            ctx.escalate("because");
            passthrough(metadata)
        });
        let doc = Metadata::from_value(json!({"identifier": "Mod"})).unwrap();
        let mut ctx = RunContext::new();

        let out = stage.transform(doc, &mut ctx).unwrap();

        assert_eq!(stage.name(), "escalate");
        assert_eq!(out.len(), 1);
        assert!(ctx.is_escalated());
    }
}
