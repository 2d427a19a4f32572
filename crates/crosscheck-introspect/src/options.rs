use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::inference::RelationDetector;

/// Hard ceiling on implicit-relation candidates kept per discovery.
pub const MAX_CANDIDATES: usize = 1000;

/// Options that control how discovery behaves.
#[derive(Clone)]
pub struct DiscoveryOptions {
    pub include_system_schemas: bool,
    pub include_views: bool,
    pub schemas: Option<Vec<String>>,
    /// Upper bound for each metadata query.
    pub query_timeout: Duration,
    pub inference: InferenceOptions,
    /// Extra detectors run after the built-in naming rules.
    pub detectors: Vec<Arc<dyn RelationDetector>>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            include_system_schemas: false,
            include_views: true,
            schemas: None,
            query_timeout: Duration::from_secs(30),
            inference: InferenceOptions::default(),
            detectors: Vec::new(),
        }
    }
}

impl fmt::Debug for DiscoveryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detectors: Vec<&str> = self.detectors.iter().map(|d| d.name()).collect();
        f.debug_struct("DiscoveryOptions")
            .field("include_system_schemas", &self.include_system_schemas)
            .field("include_views", &self.include_views)
            .field("schemas", &self.schemas)
            .field("query_timeout", &self.query_timeout)
            .field("inference", &self.inference)
            .field("detectors", &detectors)
            .finish()
    }
}

/// Options for implicit-relation inference.
#[derive(Debug, Clone)]
pub struct InferenceOptions {
    pub max_candidates: usize,
    pub timeout: Duration,
}

impl InferenceOptions {
    pub fn candidate_limit(&self) -> usize {
        self.max_candidates.min(MAX_CANDIDATES)
    }
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            max_candidates: MAX_CANDIDATES,
            timeout: Duration::from_secs(5),
        }
    }
}
