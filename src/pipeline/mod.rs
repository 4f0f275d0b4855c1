//! The inflation pipeline.
//!
//! A pipeline is an ordered list of [`Stage`]s run as a flat-map fold: the
//! working set starts as the single input document, and each stage replaces
//! it with the concatenation of its outputs for every document in the set.
//! One stage can therefore turn one netkan into several documents (one per
//! upstream release), and every later stage then runs on each of them.
//!
//! The [`RunContext`] is shared by all branches. Documents are not: every
//! change produces a new [`Metadata`], so siblings never observe each other.

pub mod builder;
pub mod stage;
pub mod stages;

pub use builder::{Pipeline, PipelineBuilder, ALL_STAGES_TRIGGER};
pub use stage::{passthrough, FnStage, Stage};

use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::Metadata;

/// Run `initial` through `stages` in order.
pub fn run(
    initial: Metadata,
    ctx: &mut RunContext,
    stages: &[Box<dyn Stage>],
) -> Result<Vec<Metadata>> {
    let total = stages.len();
    let mut working = vec![initial];

    for (i, stage) in stages.iter().enumerate() {
        log::info!("Stage {}/{}: {}", i + 1, total, stage.name());

        let mut next = Vec::with_capacity(working.len());
        for metadata in working {
            next.extend(stage.transform(metadata, ctx)?);
        }
        if next.len() > 1 {
            log::debug!("{} produced {} documents", stage.name(), next.len());
        }
        working = next;
    }

    Ok(working)
}
