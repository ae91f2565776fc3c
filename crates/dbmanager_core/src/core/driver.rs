use std::time::Duration;

use async_trait::async_trait;
use derive_builder::Builder;

use super::error::{MResult, ManagerError};

pub const DEFAULT_MIN_POOL_SIZE: u32 = 5;
pub const DEFAULT_MAX_POOL_SIZE: u32 = 50;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a driver needs to open its connection pool.
#[derive(Clone, Debug, PartialEq, Eq, Builder)]
#[builder(build_fn(error = "ManagerError"))]
pub struct ConnectOptions {
    #[builder(setter(into))]
    pub uri: String,

    #[builder(default = "DEFAULT_MIN_POOL_SIZE")]
    pub min_pool_size: u32,

    #[builder(default = "DEFAULT_MAX_POOL_SIZE")]
    pub max_pool_size: u32,

    /// Budget for connecting plus the liveness ping.
    #[builder(default = "DEFAULT_CONNECT_TIMEOUT")]
    pub timeout: Duration,
}

impl ConnectOptions {
    pub fn builder() -> ConnectOptionsBuilder {
        ConnectOptionsBuilder::default()
    }

    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            min_pool_size: DEFAULT_MIN_POOL_SIZE,
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Opens clients for one backing store.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Client: ClientHandle;

    fn driver_name(&self) -> String;

    /// Builds a client. Implementations may connect lazily; the registry
    /// follows up with [`ClientHandle::ping`] before handing the client out.
    async fn connect(&self, options: &ConnectOptions) -> MResult<Self::Client>;
}

/// A pooled connection to the store.
#[async_trait]
pub trait ClientHandle: Send + Sync + 'static {
    type Database: DatabaseHandle;

    async fn ping(&self) -> MResult<()>;
    fn database(&self, name: &str) -> Self::Database;
    async fn close(&self) -> MResult<()>;
}

#[async_trait]
pub trait DatabaseHandle: Send + Sync + 'static {
    type Collection: Send + Sync;

    fn name(&self) -> &str;

    /// Derives a collection handle. Never checks that the collection exists.
    fn collection(&self, name: &str) -> Self::Collection;

    /// Collection names in the order the store reports them.
    async fn list_collection_names(&self) -> MResult<Vec<String>>;
}

pub type DatabaseOf<C> = <<C as Connector>::Client as ClientHandle>::Database;
pub type CollectionOf<C> = <DatabaseOf<C> as DatabaseHandle>::Collection;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_pool_defaults() {
        let options = ConnectOptions::builder()
            .uri("mongodb://localhost:27017")
            .build()
            .unwrap();
        assert_eq!(options, ConnectOptions::new("mongodb://localhost:27017"));
        assert_eq!(options.timeout, Duration::from_secs(5));
    }

    #[test]
    fn builder_without_uri_reports_missing_key() {
        let err = ConnectOptions::builder().max_pool_size(10u32).build().unwrap_err();
        assert!(matches!(err, ManagerError::MissingConfiguration { ref key } if key == "uri"));
    }
}
