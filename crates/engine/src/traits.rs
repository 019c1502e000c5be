use std::time::Duration;

use flowsync_core::{FieldMap, FieldValue, FlowId, FlowRecord};
use thiserror::Error;

use crate::config::DiscoveryDefaults;

/// Failure reported by a discovery source. Carried through opaquely.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DiscoveryError(pub String);

/// Where and how to ask the discovery system about one flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryParams {
    pub is04_base_url: Option<String>,
    pub is05_base_url: Option<String>,
    pub is04_version: String,
    pub is05_version: String,
    pub timeout: Duration,
}

fn text_field(record: &FlowRecord, key: &str) -> Option<String> {
    match record.get(key) {
        Some(FieldValue::Text(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Base URLs always end with a slash so relative resource paths join cleanly.
fn with_trailing_slash(url: String) -> String {
    if url.ends_with('/') { url } else { format!("{url}/") }
}

impl DiscoveryParams {
    /// Parameters for a record, falling back to configured defaults for
    /// anything the record doesn't carry.
    pub fn for_record(record: &FlowRecord, defaults: &DiscoveryDefaults) -> Self {
        Self {
            is04_base_url: text_field(record, "nmos_is04_base_url").map(with_trailing_slash),
            is05_base_url: text_field(record, "nmos_is05_base_url").map(with_trailing_slash),
            is04_version: text_field(record, "nmos_is04_version")
                .unwrap_or_else(|| defaults.is04_version.clone()),
            is05_version: text_field(record, "nmos_is05_version")
                .unwrap_or_else(|| defaults.is05_version.clone()),
            timeout: Duration::from_secs(defaults.timeout_secs),
        }
    }
}

/// External discovery collaborator.
pub trait DiscoverySource {
    /// Fetch the discovery system's view of a flow. The mapping may be
    /// partial; absent keys say nothing about the canonical record.
    fn fetch_candidate(
        &self,
        identifier: &FlowId,
        params: &DiscoveryParams,
    ) -> Result<FieldMap, DiscoveryError>;
}

/// Authorization collaborator consulted before any lock transition.
pub trait Authorizer {
    fn can_toggle_lock(&self, identifier: &FlowId) -> bool;
}
