//! Pipeline builder for composing inflation stages.
//!
//! Stage order is a dependency graph by convention: reference resolution,
//! then version shaping, then derived metadata, then stripping. The builder
//! records that order explicitly and, when asked, surrounds every stage with
//! a versioned-override checkpoint so netkan authors can target any point in
//! the run with `before:`/`after:`.

use super::stage::Stage;
use super::stages::{epoch::EPOCH_STAGE, versioned_override::VersionedOverrideStage};
use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::Metadata;

/// Trigger tag matching the start and the end of a pipeline.
pub const ALL_STAGES_TRIGGER: &str = "$all";

/// Builder for constructing pipelines.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = PipelineBuilder::new()
///     .stage(MetaNetkanStage::new(raw_text))
///     .when(config.trust_version_files, |p| p.stage(VersionFileStage::new(reader)))
///     .stage(EpochStage)
///     .with_overrides()
///     .build();
/// ```
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
    overrides: bool,
}

impl PipelineBuilder {
    /// Create a new empty pipeline builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage to the end of the pipeline.
    pub fn stage<S>(mut self, stage: S) -> Self
    where
        S: Stage + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    /// Add an already boxed stage.
    pub fn boxed_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Add stages conditionally.
    ///
    /// If the condition is true, `f` is applied. Otherwise, this is a no-op.
    pub fn when<F>(self, condition: bool, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        if condition {
            f(self)
        } else {
            self
        }
    }

    /// Interleave versioned-override checkpoints around every stage.
    pub fn with_overrides(mut self) -> Self {
        self.overrides = true;
        self
    }

    /// Build the final pipeline ready for execution.
    pub fn build(self) -> Pipeline {
        let stages = if self.overrides {
            interleave_overrides(self.stages)
        } else {
            self.stages
        };
        Pipeline { stages }
    }
}

/// Checkpoint `i` sits before stage `i` and after stage `i - 1`. Untagged
/// stanzas fire at the checkpoint in front of epoch correction, or at the
/// final checkpoint when there is none.
fn interleave_overrides(stages: Vec<Box<dyn Stage>>) -> Vec<Box<dyn Stage>> {
    let names: Vec<String> = stages.iter().map(|s| s.name().to_string()).collect();
    let epoch_index = names.iter().position(|n| n == EPOCH_STAGE);
    let count = names.len();

    let checkpoint = |i: usize| {
        let mut before = Vec::new();
        let mut after = Vec::new();
        if i == 0 {
            before.push(ALL_STAGES_TRIGGER.to_string());
        }
        if i == count {
            after.push(ALL_STAGES_TRIGGER.to_string());
        }
        if let Some(name) = names.get(i) {
            before.push(name.clone());
        }
        if i > 0 {
            after.push(names[i - 1].clone());
        }
        let untagged = epoch_index.map_or(i == count, |e| e == i);
        Box::new(VersionedOverrideStage::new(before, after, untagged)) as Box<dyn Stage>
    };

    let mut interleaved = Vec::with_capacity(count * 2 + 1);
    for (i, stage) in stages.into_iter().enumerate() {
        interleaved.push(checkpoint(i));
        interleaved.push(stage);
    }
    interleaved.push(checkpoint(count));
    interleaved
}

/// A built pipeline ready for execution.
///
/// The pipeline can be run many times with different inputs.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Run one document through every stage.
    pub fn run(&self, initial: Metadata, ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        super::run(initial, ctx, &self.stages)
    }

    /// Get the number of stages in this pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::{passthrough, FnStage};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    type StageFn = fn(Metadata, &mut RunContext) -> Result<Vec<Metadata>>;

    fn named(name: &'static str) -> FnStage<StageFn> {
        let identity: StageFn = |m, _ctx| passthrough(m);
        FnStage::new(name, identity)
    }

    #[test]
    fn test_when_adds_stages_conditionally() {
        let pipeline = PipelineBuilder::new()
            .stage(named("a"))
            .when(false, |p| p.stage(named("b")))
            .when(true, |p| p.stage(named("c")))
            .build();
        assert_eq!(pipeline.stage_names(), vec!["a", "c"]);
    }

    #[test]
    fn test_overrides_surround_every_stage() {
        let pipeline = PipelineBuilder::new()
            .stage(named("a"))
            .stage(named("b"))
            .with_overrides()
            .build();
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "versioned_override",
                "a",
                "versioned_override",
                "b",
                "versioned_override"
            ]
        );
    }

    #[test]
    fn test_override_checkpoints_fire_on_their_triggers() {
        let pipeline = PipelineBuilder::new()
            .stage(FnStage::new("a", |m: Metadata, _ctx: &mut RunContext| {
                m.edit(|json| {
                    json.insert("seen_by_a".into(), json.get("mark").cloned().unwrap_or(json!(null)));
                    Ok(())
                })
                .map(|m| vec![m])
            }))
            .stage(named("b"))
            .with_overrides()
            .build();

        let doc = Metadata::from_value(json!({
            "identifier": "Mod",
            "version": "1.0",
            "x_netkan_override": [
                {"version": "1.0", "before": "a", "override": {"mark": "before-a"}},
                {"version": "1.0", "after": "$all", "override": {"last": true}},
                {"version": "1.0", "override": {"untagged": true}}
            ]
        }))
        .unwrap();

        let out = pipeline.run(doc, &mut RunContext::new()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("seen_by_a"), Some(&json!("before-a")));
        assert_eq!(out[0].get("last"), Some(&json!(true)));
        assert_eq!(out[0].get("untagged"), Some(&json!(true)));
    }
}
