//! Template resolution policy: platform template first, then the common one.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::spec::Platform;

/// Suffix every template file carries.
pub const TEMPLATE_SUFFIX: &str = ".j2";

/// One way of naming a template candidate for a planned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// `{platform}/{path}.j2`
    PlatformSpecific,
    /// `{path}.j2`
    Common,
}

/// Candidates are tried in this order; the first that exists wins.
pub const RESOLUTION_ORDER: [Candidate; 2] = [Candidate::PlatformSpecific, Candidate::Common];

impl Candidate {
    pub fn template_name(self, platform: Platform, rel_path: &str) -> String {
        match self {
            Self::PlatformSpecific => format!("{platform}/{rel_path}{TEMPLATE_SUFFIX}"),
            Self::Common => format!("{rel_path}{TEMPLATE_SUFFIX}"),
        }
    }
}

/// Anything that can answer whether a named template exists.
pub trait TemplateLookup {
    fn exists(&self, name: &str) -> bool;
}

impl<T: TemplateLookup + ?Sized> TemplateLookup for &T {
    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }
}

/// Every candidate name for `rel_path`, in resolution order.
pub fn candidate_names(platform: Platform, rel_path: &str) -> Vec<String> {
    RESOLUTION_ORDER
        .iter()
        .map(|c| c.template_name(platform, rel_path))
        .collect()
}

/// Name of the template to render for `rel_path`, or `None` when no candidate exists.
pub fn resolve_template(
    lookup: &impl TemplateLookup,
    platform: Platform,
    rel_path: &str,
) -> Option<String> {
    candidate_names(platform, rel_path)
        .into_iter()
        .find(|name| lookup.exists(name))
}

static TEMPLATE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{%|%\}|\{#").expect("static regex"));

/// First leftover template-syntax marker in rendered output, if any.
pub fn find_template_marker(rendered: &str) -> Option<&str> {
    TEMPLATE_MARKER_RE.find(rendered).map(|m| m.as_str())
}
