//! Listing filters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which resources a listing should include.
///
/// An empty filter (see [`ListFilter::all`]) includes everything. Drivers
/// may push the filter down to the engine or apply it themselves with the
/// `matches_*` helpers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListFilter {
    /// `Some(true)` keeps only dangling resources, `Some(false)` drops them.
    pub dangling: Option<bool>,
    /// `key` or `key=value` label constraints; all must hold.
    pub labels: Vec<String>,
    /// Name fragments; a resource matches if its name contains any of them.
    pub names: Vec<String>,
}

impl ListFilter {
    /// A filter that includes every resource.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Keep only dangling (or only non-dangling) resources.
    #[must_use]
    pub fn dangling(mut self, dangling: bool) -> Self {
        self.dangling = Some(dangling);
        self
    }

    /// Add a `key` or `key=value` label constraint.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Add a name fragment.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Returns `true` if no constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dangling.is_none() && self.labels.is_empty() && self.names.is_empty()
    }

    /// Check the dangling constraint against a resource's dangling flag.
    #[must_use]
    pub fn matches_dangling(&self, dangling: bool) -> bool {
        self.dangling.is_none_or(|want| want == dangling)
    }

    /// Check every label constraint against a resource's labels.
    #[must_use]
    pub fn matches_labels(&self, labels: &BTreeMap<String, String>) -> bool {
        self.labels.iter().all(|constraint| match constraint.split_once('=') {
            Some((key, value)) => labels.get(key).is_some_and(|v| v == value),
            None => labels.contains_key(constraint.as_str()),
        })
    }

    /// Check the name fragments against a set of names for one resource.
    #[must_use]
    pub fn matches_names<'a>(&self, mut names: impl Iterator<Item = &'a str>) -> bool {
        if self.names.is_empty() {
            return true;
        }
        names.any(|name| self.names.iter().any(|fragment| name.contains(fragment.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = ListFilter::all();
        assert!(filter.is_empty());
        assert!(filter.matches_dangling(true));
        assert!(filter.matches_dangling(false));
        assert!(filter.matches_labels(&BTreeMap::new()));
        assert!(filter.matches_names(std::iter::empty()));
    }

    #[test]
    fn dangling_constraint() {
        let filter = ListFilter::all().dangling(true);
        assert!(filter.matches_dangling(true));
        assert!(!filter.matches_dangling(false));
        assert!(!filter.is_empty());
    }

    #[test]
    fn label_key_and_key_value() {
        let present = labels(&[("tier", "web"), ("team", "core")]);
        assert!(ListFilter::all().with_label("tier").matches_labels(&present));
        assert!(ListFilter::all().with_label("tier=web").matches_labels(&present));
        assert!(!ListFilter::all().with_label("tier=db").matches_labels(&present));
        assert!(!ListFilter::all().with_label("owner").matches_labels(&present));
        assert!(
            !ListFilter::all()
                .with_label("tier=web")
                .with_label("team=ops")
                .matches_labels(&present)
        );
    }

    #[test]
    fn name_fragments() {
        let filter = ListFilter::all().with_name("web");
        assert!(filter.matches_names(["frontend-web"].into_iter()));
        assert!(!filter.matches_names(["db"].into_iter()));
        assert!(!filter.matches_names(std::iter::empty()));
    }
}
