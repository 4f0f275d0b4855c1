//! Inflation stages.
//!
//! Each stage turns one document into zero or more documents. Stages that
//! have nothing to do hand their input back unchanged, so most of them are
//! cheap on documents they do not apply to.
//!
//! Main pipeline, in order: `metanetkan`, one release stage per host,
//! `version_file`, `version_edit`, `force_v`, `epoch`, `staging`.
//! Finishing pipeline, run after merging: `spec_version`, `property_sort`,
//! `staging_links`, `strip`.

pub mod epoch;
pub mod force_v;
pub mod metanetkan;
pub mod property_sort;
pub mod releases;
pub mod spec_version;
pub mod staging;
pub mod staging_links;
pub mod strip;
pub mod version_edit;
pub mod version_file;
pub mod versioned_override;

pub use epoch::EpochStage;
pub use force_v::ForceVStage;
pub use metanetkan::MetaNetkanStage;
pub use property_sort::PropertySortStage;
pub use releases::ReleaseStage;
pub use spec_version::SpecVersionStage;
pub use staging::StagingStage;
pub use staging_links::StagingLinksStage;
pub use strip::StripStage;
pub use version_edit::VersionEditStage;
pub use version_file::VersionFileStage;
pub use versioned_override::VersionedOverrideStage;
