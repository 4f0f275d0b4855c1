//! Run-scoped state shared by every stage and every fan-out branch.
//!
//! One [`RunContext`] lives for the inflation of one netkan file. Stages take
//! it by `&mut` next to the document they transform, so escalation and the
//! running version maxima are visible to every later stage and sibling
//! branch. Unrelated netkans must each get their own context.

use crate::version::ModuleVersion;

#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// How many upstream releases to expand; `None` expands all of them
    pub release_limit: Option<usize>,
    /// How many of the newest upstream releases to skip before expanding
    pub release_skip: Option<usize>,
    /// Forces prerelease matching on or off regardless of the netkan
    pub prerelease: Option<bool>,
    /// Skip the out-of-order check for every document in the run
    pub allow_out_of_order: bool,
    /// Render a resource table into the escalation reasons
    pub staging_links: bool,
    escalate: bool,
    escalate_reasons: Vec<String>,
    unreliable_source: bool,
    highest_version: Option<ModuleVersion>,
    highest_prerelease_version: Option<ModuleVersion>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            release_limit: Some(1),
            staging_links: true,
            ..Default::default()
        }
    }

    pub fn with_release_limit(mut self, limit: Option<usize>) -> Self {
        self.release_limit = limit;
        self
    }

    pub fn with_release_skip(mut self, skip: Option<usize>) -> Self {
        self.release_skip = skip;
        self
    }

    pub fn with_prerelease(mut self, prerelease: Option<bool>) -> Self {
        self.prerelease = prerelease;
        self
    }

    pub fn with_allow_out_of_order(mut self, allow: bool) -> Self {
        self.allow_out_of_order = allow;
        self
    }

    pub fn with_staging_links(mut self, enabled: bool) -> Self {
        self.staging_links = enabled;
        self
    }

    /// Seed the running maximum, e.g. with the newest version already published.
    pub fn with_highest_version(mut self, version: Option<ModuleVersion>) -> Self {
        self.highest_version = version;
        self
    }

    pub fn with_highest_prerelease_version(mut self, version: Option<ModuleVersion>) -> Self {
        self.highest_prerelease_version = version;
        self
    }

    /// Mark the run for human review and record why.
    pub fn escalate(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        log::info!("Escalating: {}", reason);
        self.escalate = true;
        self.escalate_reasons.push(reason);
    }

    /// Append detail to an already escalated run without escalating it.
    /// Repeated details are recorded once.
    pub fn add_escalation_detail(&mut self, detail: impl Into<String>) {
        let detail = detail.into();
        if self.escalate && !self.escalate_reasons.contains(&detail) {
            self.escalate_reasons.push(detail);
        }
    }

    pub fn is_escalated(&self) -> bool {
        self.escalate
    }

    pub fn escalate_reasons(&self) -> &[String] {
        &self.escalate_reasons
    }

    pub fn mark_unreliable_source(&mut self) {
        self.unreliable_source = true;
    }

    pub fn is_unreliable_source(&self) -> bool {
        self.unreliable_source
    }

    pub fn highest_version(&self) -> Option<&ModuleVersion> {
        self.highest_version.as_ref()
    }

    pub fn highest_prerelease_version(&self) -> Option<&ModuleVersion> {
        self.highest_prerelease_version.as_ref()
    }

    /// The floor a new version must clear.
    ///
    /// Stable versions are held to the stable maximum; prereleases to
    /// whichever of the two maxima is higher.
    pub fn ordering_floor(&self, prerelease: bool) -> Option<&ModuleVersion> {
        if !prerelease {
            return self.highest_version.as_ref();
        }
        match (&self.highest_version, &self.highest_prerelease_version) {
            (Some(stable), Some(pre)) => Some(if pre > stable { pre } else { stable }),
            (stable, pre) => pre.as_ref().or(stable.as_ref()),
        }
    }

    /// Raise the matching running maximum to `version` if it is higher.
    pub fn record_version(&mut self, version: &ModuleVersion, prerelease: bool) {
        let slot = if prerelease {
            &mut self.highest_prerelease_version
        } else {
            &mut self.highest_version
        };
        if slot.as_ref().is_none_or(|current| version > current) {
            *slot = Some(version.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ModuleVersion {
        ModuleVersion::parse(s)
    }

    #[test]
    fn test_defaults() {
        let ctx = RunContext::new();
        assert_eq!(ctx.release_limit, Some(1));
        assert!(ctx.staging_links);
        assert!(!ctx.is_escalated());
        assert!(!ctx.is_unreliable_source());
        assert!(ctx.highest_version().is_none());
    }

    #[test]
    fn test_escalation_accumulates_reasons() {
        let mut ctx = RunContext::new();
        ctx.add_escalation_detail("ignored");
        assert!(ctx.escalate_reasons().is_empty());

        ctx.escalate("first");
        ctx.escalate("second");
        ctx.add_escalation_detail("table");
        assert!(ctx.is_escalated());
        assert_eq!(ctx.escalate_reasons(), ["first", "second", "table"]);
    }

    #[test]
    fn test_ordering_floor_for_prereleases_uses_higher_maximum() {
        let ctx = RunContext::new()
            .with_highest_version(Some(v("2.0")))
            .with_highest_prerelease_version(Some(v("1.0")));
        assert_eq!(ctx.ordering_floor(true), Some(&v("2.0")));
        assert_eq!(ctx.ordering_floor(false), Some(&v("2.0")));

        let ctx = RunContext::new()
            .with_highest_version(Some(v("1.0")))
            .with_highest_prerelease_version(Some(v("3.0")));
        assert_eq!(ctx.ordering_floor(true), Some(&v("3.0")));
        assert_eq!(ctx.ordering_floor(false), Some(&v("1.0")));

        let ctx = RunContext::new().with_highest_prerelease_version(Some(v("1.0")));
        assert_eq!(ctx.ordering_floor(true), Some(&v("1.0")));
        assert_eq!(ctx.ordering_floor(false), None);
    }

    #[test]
    fn test_record_version_only_raises() {
        let mut ctx = RunContext::new();
        ctx.record_version(&v("1.0"), false);
        ctx.record_version(&v("0.9"), false);
        ctx.record_version(&v("5.0"), true);
        assert_eq!(ctx.highest_version(), Some(&v("1.0")));
        assert_eq!(ctx.highest_prerelease_version(), Some(&v("5.0")));
    }
}
