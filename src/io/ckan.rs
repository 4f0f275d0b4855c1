use crate::errors::Result;
use crate::metadata::Metadata;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::path::{Path, PathBuf};

const UNSAFE_FILE_NAME_CHARS: [char; 3] = [':', '/', '\\'];

/// `<identifier>-<version>.ckan`. The epoch separator and path separators
/// become `-` so the file always lands directly in the output directory.
pub fn ckan_file_name(metadata: &Metadata) -> String {
    let version = metadata
        .get("version")
        .map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        })
        .unwrap_or_default();
    format!(
        "{}-{}.ckan",
        metadata.identifier().replace(UNSAFE_FILE_NAME_CHARS, "-"),
        version.replace(UNSAFE_FILE_NAME_CHARS, "-")
    )
}

/// Pretty JSON with `indent` spaces and a trailing newline.
pub fn render_ckan(metadata: &Metadata, indent: usize) -> Result<String> {
    let indent = " ".repeat(indent);
    let mut buffer = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(indent.as_bytes()));
    metadata.json().serialize(&mut serializer)?;
    let mut text = String::from_utf8_lossy(&buffer).into_owned();
    text.push('\n');
    Ok(text)
}

pub fn write_ckan(directory: &Path, metadata: &Metadata, indent: usize) -> Result<PathBuf> {
    super::ensure_dir(directory)?;
    let path = directory.join(ckan_file_name(metadata));
    super::write_file(&path, &render_ckan(metadata, indent)?)?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}
