//! Error types for netkan inflation.
//!
//! Every fatal condition the pipeline can hit is a distinct variant carrying
//! enough context (identifier, offending value) to diagnose it without a
//! backtrace. Errors are propagated by early return; a batch driver catches
//! them per file and carries on with the next one.
//!
//! # Example
//!
//! ```rust
//! use netkan::errors::InflateError;
//!
//! let err = InflateError::bad_metadata("AwesomeMod", "x_netkan_epoch must be an unsigned integer");
//! assert!(err.to_string().contains("AwesomeMod"));
//! assert!(err.is_malformed_input());
//! ```

use thiserror::Error;

/// Main error type for inflation
#[derive(Debug, Error)]
pub enum InflateError {
    /// Author mistakes: unparsable stanzas, wrong property types, bad references
    #[error("Bad metadata in {identifier}: {message}")]
    BadMetadata { identifier: String, message: String },

    /// An adapter found nothing for a reference the document requires
    #[error("Nothing found for {reference} in {identifier}: {message}")]
    ReferenceNotFound {
        identifier: String,
        reference: String,
        message: String,
    },

    /// Ordering violation reported by a host known to return stale data
    #[error(
        "Out-of-order version found on unreliable host: {original} < {highest} < {corrected} ({identifier})"
    )]
    OutOfOrderVersion {
        identifier: String,
        original: String,
        highest: String,
        corrected: String,
    },

    /// An override stanza pins more than one distinct version with `=`
    #[error("Ambiguous x_netkan_override version match in {identifier}: {versions}")]
    AmbiguousOverride { identifier: String, versions: String },

    /// Two documents with the same version disagree about their download
    #[error("{identifier}: {property} of download from {first} does not match download from {second}")]
    DownloadMismatch {
        identifier: String,
        property: String,
        first: String,
        second: String,
    },

    #[error("Generated {generated} modules for {identifier} but only {requested} requested")]
    TooManyReleases {
        identifier: String,
        generated: usize,
        requested: usize,
    },

    /// An external adapter failed while answering a request
    #[error("{host} failed for {reference}: {message}")]
    Source {
        host: String,
        reference: String,
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl InflateError {
    /// Create a malformed-input error for a document
    pub fn bad_metadata(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadMetadata {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    /// Create a missing-reference-target error
    pub fn reference_not_found(
        identifier: impl Into<String>,
        reference: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ReferenceNotFound {
            identifier: identifier.into(),
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Create an adapter failure
    pub fn adapter_failure(
        host: impl Into<String>,
        reference: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Source {
            host: host.into(),
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by the author's netkan rather than the environment.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::BadMetadata { .. } | Self::AmbiguousOverride { .. }
        )
    }

    /// The identifier of the offending document, when the error names one.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::BadMetadata { identifier, .. }
            | Self::ReferenceNotFound { identifier, .. }
            | Self::OutOfOrderVersion { identifier, .. }
            | Self::AmbiguousOverride { identifier, .. }
            | Self::DownloadMismatch { identifier, .. }
            | Self::TooManyReleases { identifier, .. } => Some(identifier.as_str()),
            _ => None,
        }
    }
}

/// Result type alias for inflation operations
pub type Result<T> = std::result::Result<T, InflateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_message_names_all_versions() {
        let err = InflateError::OutOfOrderVersion {
            identifier: "Mod".into(),
            original: "1.0.8".into(),
            highest: "v1.0.7".into(),
            corrected: "1:1.0.8".into(),
        };
        assert_eq!(
            err.to_string(),
            "Out-of-order version found on unreliable host: 1.0.8 < v1.0.7 < 1:1.0.8 (Mod)"
        );
        assert_eq!(err.identifier(), Some("Mod"));
        assert!(!err.is_malformed_input());
    }

    #[test]
    fn test_download_mismatch_message() {
        let err = InflateError::DownloadMismatch {
            identifier: "Mod".into(),
            property: "download_size".into(),
            first: "https://a/1.zip".into(),
            second: "https://b/1.zip".into(),
        };
        assert!(err.to_string().contains("does not match download from"));
    }

    #[test]
    fn test_wrapped_errors_have_no_identifier() {
        let err: InflateError = std::io::Error::other("boom").into();
        assert_eq!(err.identifier(), None);
        assert!(InflateError::Config("bad".into()).identifier().is_none());
    }
}
