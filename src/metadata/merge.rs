use super::Metadata;
use crate::errors::{InflateError, Result};
use serde_json::Value;

/// Merge documents that inflated to the same version into one.
///
/// The first document is the base. Download URLs are unioned in order of
/// appearance, the highest `spec_version` wins, and any disagreement about
/// the download's size or hashes is fatal since the URLs would then not be
/// mirrors of the same file.
pub fn merge_group(group: &[Metadata]) -> Result<Metadata> {
    let (first, rest) = match group.split_first() {
        Some(split) => split,
        None => {
            return Err(InflateError::bad_metadata(
                "<unknown>",
                "cannot merge an empty group of documents",
            ))
        }
    };
    if rest.is_empty() {
        return Ok(first.clone());
    }

    let first_download = first.download().unwrap_or_default();
    for other in rest {
        let other_download = other.download().unwrap_or_default();
        check_same(first, other, "download_size", &first_download, &other_download)?;
        check_hashes(first, other, &first_download, &other_download)?;
    }

    let mut downloads: Vec<String> = Vec::new();
    for url in group.iter().flat_map(Metadata::downloads) {
        if !downloads.contains(&url) {
            downloads.push(url);
        }
    }
    let spec_version = group.iter().filter_map(Metadata::spec_version).max();

    first.edit(|json| {
        let download = match downloads.as_slice() {
            [single] => Value::String(single.clone()),
            many => Value::Array(many.iter().cloned().map(Value::String).collect()),
        };
        json.insert("download".into(), download);
        if let Some(spec) = spec_version {
            json.insert("spec_version".into(), spec.to_json());
        }
        Ok(())
    })
}

fn check_same(
    first: &Metadata,
    other: &Metadata,
    property: &str,
    first_download: &str,
    other_download: &str,
) -> Result<()> {
    match (first.get(property), other.get(property)) {
        (Some(a), Some(b)) if a != b => Err(InflateError::DownloadMismatch {
            identifier: first.identifier().to_string(),
            property: property.to_string(),
            first: first_download.to_string(),
            second: other_download.to_string(),
        }),
        _ => Ok(()),
    }
}

fn check_hashes(
    first: &Metadata,
    other: &Metadata,
    first_download: &str,
    other_download: &str,
) -> Result<()> {
    let hash = |doc: &Metadata, algorithm: &str| {
        doc.get("download_hash")
            .and_then(|h| h.get(algorithm))
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase)
    };
    for algorithm in ["sha1", "sha256"] {
        if let (Some(a), Some(b)) = (hash(first, algorithm), hash(other, algorithm)) {
            if a != b {
                return Err(InflateError::DownloadMismatch {
                    identifier: first.identifier().to_string(),
                    property: format!("download_hash.{}", algorithm),
                    first: first_download.to_string(),
                    second: other_download.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Metadata {
        Metadata::from_value(value).unwrap()
    }

    #[test]
    fn test_single_document_is_unchanged() {
        let only = doc(json!({"identifier": "Mod", "download": "https://a/1.zip"}));
        let merged = merge_group(std::slice::from_ref(&only)).unwrap();
        assert!(merged.same_document(&only));
    }

    #[test]
    fn test_downloads_are_unioned_and_spec_version_raised() {
        let merged = merge_group(&[
            doc(json!({"identifier": "Mod", "spec_version": "v1.32", "download": "https://a/1.zip"})),
            doc(json!({"identifier": "Mod", "spec_version": "v1.4", "download": "https://b/1.zip"})),
            doc(json!({"identifier": "Mod", "spec_version": "v1.34", "download": "https://a/1.zip"})),
        ])
        .unwrap();

        assert_eq!(
            merged.get("download"),
            Some(&json!(["https://a/1.zip", "https://b/1.zip"]))
        );
        assert_eq!(merged.get("spec_version"), Some(&json!("v1.34")));
    }

    #[test]
    fn test_size_mismatch_is_fatal() {
        let err = merge_group(&[
            doc(json!({"identifier": "Mod", "download": "https://a/1.zip", "download_size": 100})),
            doc(json!({"identifier": "Mod", "download": "https://b/1.zip", "download_size": 200})),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("does not match download from"));
    }

    #[test]
    fn test_hash_mismatch_is_fatal_but_case_insensitive() {
        let hashed = |url: &str, sha1: &str| {
            doc(json!({
                "identifier": "Mod",
                "download": url,
                "download_hash": {"sha1": sha1}
            }))
        };

        assert!(merge_group(&[hashed("https://a", "ABC"), hashed("https://b", "abc")]).is_ok());
        let err = merge_group(&[hashed("https://a", "ABC"), hashed("https://b", "DEF")]).unwrap_err();
        assert!(matches!(err, InflateError::DownloadMismatch { .. }));
    }
}
