use crate::context::RunContext;
use crate::errors::Result;
use crate::metadata::{Metadata, KREF, RESERVED_PREFIX, VREF};
use crate::pipeline::stage::{passthrough, Stage};
use serde_json::{Map, Value};

pub(crate) fn is_internal(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX) || key == KREF || key == VREF
}

fn contains_internal(value: &Value) -> bool {
    match value {
        Value::Object(map) => map
            .iter()
            .any(|(key, value)| is_internal(key) || contains_internal(value)),
        Value::Array(items) => items.iter().any(contains_internal),
        _ => false,
    }
}

fn strip_object(map: &mut Map<String, Value>) {
    map.retain(|key, _| !is_internal(key));
    map.values_mut().for_each(strip_value);
}

fn strip_value(value: &mut Value) {
    match value {
        Value::Object(map) => strip_object(map),
        Value::Array(items) => items.iter_mut().for_each(strip_value),
        _ => {}
    }
}

/// Removes pipeline directives (`x_netkan*`, `$kref`, `$vref`) at every
/// nesting level before output.
pub struct StripStage;

impl Stage for StripStage {
    fn name(&self) -> &str {
        "strip"
    }

    fn transform(&self, metadata: Metadata, _ctx: &mut RunContext) -> Result<Vec<Metadata>> {
        let dirty = metadata
            .json()
            .iter()
            .any(|(key, value)| is_internal(key) || contains_internal(value));
        if !dirty {
            return passthrough(metadata);
        }

        let updated = metadata.edit(|json| {
            strip_object(json);
            Ok(())
        })?;
        Ok(vec![updated])
    }
}
