//! Epoch handling and out-of-order correction.
//!
//! Every version emitted for an identifier during a run must be at least as
//! high as the highest one seen so far. An author can pin an epoch with
//! `x_netkan_epoch`; beyond that, a version that would sort below the
//! running maximum gets its epoch raised until it no longer does.
//!
//! A promotion on a reliable host is surfaced as an escalation reason for a
//! human to confirm. On a host flagged unreliable the same situation is far
//! more likely to be a stale listing, so the run fails instead.

use crate::context::RunContext;
use crate::errors::{InflateError, Result};
use crate::metadata::Metadata;
use crate::pipeline::stage::{passthrough, Stage};
use crate::version::ModuleVersion;
use serde_json::Value;

pub const EPOCH_STAGE: &str = "epoch";

const EPOCH_KEY: &str = "x_netkan_epoch";
const ALLOW_OUT_OF_ORDER_KEY: &str = "x_netkan_allow_out_of_order";

/// The author's explicit epoch, if any. Zero counts as none.
fn explicit_epoch(metadata: &Metadata) -> Result<Option<u64>> {
    let epoch = match metadata.get(EPOCH_KEY) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    match epoch {
        Some(0) => Ok(None),
        Some(epoch) => Ok(Some(epoch)),
        None => Err(metadata.bad(format!(
            "{} must be an unsigned integer, found {}",
            EPOCH_KEY,
            metadata.get(EPOCH_KEY).map_or(String::new(), Value::to_string)
        ))),
    }
}

/// Raise the epoch of `current` to the lowest one that is no longer below
/// `floor`. `None` when that epoch does not fit in a `u64`.
pub fn correct_order(current: &ModuleVersion, floor: &ModuleVersion) -> Option<ModuleVersion> {
    if current >= floor {
        return Some(current.clone());
    }
    // Below the floor means the epoch is at most the floor's.
    let corrected = current.with_epoch(floor.epoch());
    if corrected >= *floor {
        Some(corrected)
    } else {
        corrected.increment_epoch()
    }
}

pub struct EpochStage;

impl Stage for EpochStage {
    fn name(&self) -> &str {
        EPOCH_STAGE
    }

    fn transform(&self, metadata: Metadata, ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        let raw_version = match metadata.get("version") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                log::warn!("{} has no version, skipping epoch check", metadata.identifier());
                return passthrough(metadata);
            }
        };

        let epoch = explicit_epoch(&metadata)?;
        let original = match epoch {
            Some(epoch) => {
                log::debug!("Applying epoch {} to {}", epoch, raw_version);
                ModuleVersion::parse(&format!("{}:{}", epoch, raw_version))
            }
            None => ModuleVersion::parse(&raw_version),
        };
        let prerelease = metadata.prerelease();

        let mut current = original.clone();
        let check_order = !ctx.allow_out_of_order && !metadata.flag(ALLOW_OUT_OF_ORDER_KEY);
        if check_order {
            if let Some(highest) = ctx.ordering_floor(prerelease).cloned() {
                current = correct_order(&original, &highest).ok_or_else(|| {
                    metadata.bad(format!(
                        "cannot raise the epoch of {} above {}",
                        original, highest
                    ))
                })?;
                if current.epoch() != original.epoch() && original < highest && highest < current {
                    if ctx.is_unreliable_source() {
                        return Err(InflateError::OutOfOrderVersion {
                            identifier: metadata.identifier().to_string(),
                            original: original.to_string(),
                            highest: highest.to_string(),
                            corrected: current.to_string(),
                        });
                    }
                    ctx.escalate(format!(
                        "Auto-epoching out of order version: {} < {} < {}",
                        original, highest, current
                    ));
                }
            }
        }

        ctx.record_version(&current, prerelease);

        if epoch.is_none() && current == original {
            return passthrough(metadata);
        }
        let updated = metadata.edit(|json| {
            json.insert("version".into(), Value::String(current.to_string()));
            Ok(())
        })?;
        Ok(vec![updated])
    }
}
