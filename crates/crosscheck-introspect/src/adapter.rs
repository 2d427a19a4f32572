use async_trait::async_trait;

use crosscheck_core::SchemaModel;

use crate::errors::DiscoveryError;
use crate::options::DiscoveryOptions;

/// Trait implemented by database adapters that can discover a schema model.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Enumerate tables, declared and implicit relations, and return a
    /// scored, ranked schema model.
    async fn discover(&self, opts: &DiscoveryOptions) -> Result<SchemaModel, DiscoveryError>;
}
