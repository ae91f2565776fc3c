use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    config::{redact_uri, Config, DEFAULT_DATABASE, URI_KEY},
    core::{
        driver::{ClientHandle, CollectionOf, ConnectOptions, Connector, DatabaseHandle, DatabaseOf},
        error::{MResult, ManagerError},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryState {
    Uninitialized,
    Connecting,
    Ready,
    Closed,
}

/// A live client plus the database handles derived from it.
struct Live<C: Connector> {
    client: C::Client,
    databases: DashMap<String, Arc<DatabaseOf<C>>>,
}

enum Slot<C: Connector> {
    Uninitialized,
    Connecting,
    Ready(Arc<Live<C>>),
    Closed,
}

impl<C: Connector> Slot<C> {
    fn state(&self) -> RegistryState {
        match self {
            Self::Uninitialized => RegistryState::Uninitialized,
            Self::Connecting => RegistryState::Connecting,
            Self::Ready(_) => RegistryState::Ready,
            Self::Closed => RegistryState::Closed,
        }
    }
}

/// One lazily opened client and a name-keyed cache of its database handles.
///
/// The first data access connects; concurrent first callers share that single
/// attempt. After [`ConnectionRegistry::close`] the next access reconnects.
pub struct ConnectionRegistry<C: Connector> {
    config: Config,
    connector: C,
    connect_lock: Mutex<()>,
    slot: RwLock<Slot<C>>,
}

impl<C: Connector> ConnectionRegistry<C> {
    pub fn new(config: Config, connector: C) -> Self {
        info!(config = %config, driver = %connector.driver_name(), "Initializing connection registry");
        Self {
            config,
            connector,
            connect_lock: Mutex::new(()),
            slot: RwLock::new(Slot::Uninitialized),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn state(&self) -> RegistryState {
        self.slot.read().state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == RegistryState::Ready
    }

    fn current(&self) -> Option<Arc<Live<C>>> {
        match &*self.slot.read() {
            Slot::Ready(live) => Some(live.clone()),
            _ => None,
        }
    }

    async fn live(&self) -> MResult<Arc<Live<C>>> {
        if let Some(live) = self.current() {
            return Ok(live);
        }

        let _guard = self.connect_lock.lock().await;
        // Another caller may have connected while we waited for the lock.
        if let Some(live) = self.current() {
            return Ok(live);
        }

        if self.config.uri.is_empty() {
            error!("Missing database configuration: {URI_KEY:?}");
            return Err(ManagerError::missing(URI_KEY));
        }

        let previous = std::mem::replace(&mut *self.slot.write(), Slot::Connecting);
        let previous = match previous {
            Slot::Closed => Slot::Closed,
            _ => Slot::Uninitialized,
        };

        match self.connect().await {
            Ok(client) => {
                let live = Arc::new(Live { client, databases: DashMap::new() });
                *self.slot.write() = Slot::Ready(live.clone());
                info!(uri = %self.config.redacted_uri(), "Connected to database");
                Ok(live)
            }
            Err(e) => {
                *self.slot.write() = previous;
                error!(uri = %self.config.redacted_uri(), error = %e, "Database connection failed");
                Err(e)
            }
        }
    }

    async fn connect(&self) -> MResult<C::Client> {
        let options = ConnectOptions::builder().uri(self.config.uri.clone()).build()?;
        let timeout = options.timeout;

        let attempt = async {
            let client = self.connector.connect(&options).await?;
            client.ping().await?;
            Ok::<_, ManagerError>(client)
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(ManagerError::timeout(format!(
                "no response from {} within {timeout:?}",
                redact_uri(&options.uri)
            ))),
        }
    }

    /// The database used when a caller names none. An empty configured name
    /// falls back to [`DEFAULT_DATABASE`].
    pub fn default_database(&self) -> &str {
        match self.config.default_database.as_str() {
            "" => DEFAULT_DATABASE,
            name => name,
        }
    }

    /// Returns the handle for `name`, or for the default database when `name`
    /// is `None` or empty.
    ///
    /// Connects first if no client is live. Repeated calls with the same name
    /// return the same `Arc` until the registry is closed.
    pub async fn get_database(&self, name: Option<&str>) -> MResult<Arc<DatabaseOf<C>>> {
        let live = self.live().await?;

        let name = name.filter(|n| !n.is_empty()).unwrap_or_else(|| self.default_database());

        if let Some(database) = live.databases.get(name) {
            debug!(database = name, "Using cached database handle");
            return Ok(database.clone());
        }

        debug!(database = name, "Opening database handle");
        let database = live
            .databases
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(live.client.database(name)))
            .clone();
        Ok(database)
    }

    pub async fn list_collection_names(&self, database: Option<&str>) -> MResult<Vec<String>> {
        self.get_database(database).await?.list_collection_names().await
    }

    /// Derives a collection handle. The collection does not need to exist yet.
    pub async fn get_collection(&self, collection: &str, database: Option<&str>) -> MResult<CollectionOf<C>> {
        Ok(self.get_database(database).await?.collection(collection))
    }

    /// Shuts the client down and drops every cached handle.
    ///
    /// Closing with no live client only logs a warning. The registry is
    /// `Closed` and free to reconnect before the driver finishes shutting down.
    pub async fn close(&self) -> MResult<()> {
        let previous = {
            let _guard = self.connect_lock.lock().await;
            let mut slot = self.slot.write();
            if matches!(*slot, Slot::Ready(_)) {
                std::mem::replace(&mut *slot, Slot::Closed)
            } else {
                Slot::Uninitialized
            }
        };

        match previous {
            Slot::Ready(live) => {
                live.client.close().await?;
                info!("Database connection closed");
                Ok(())
            }
            _ => {
                warn!("Attempted to close a non-existent database connection");
                Ok(())
            }
        }
    }
}

/// Holds the one process-wide registry for connector `C`.
///
/// ```ignore
/// static REGISTRY: RegistryCell<MyConnector> = RegistryCell::new();
/// let registry = REGISTRY.get_or_init(None, MyConnector::default);
/// ```
pub struct RegistryCell<C: Connector> {
    cell: OnceLock<Arc<ConnectionRegistry<C>>>,
}

impl<C: Connector> RegistryCell<C> {
    pub const fn new() -> Self {
        Self { cell: OnceLock::new() }
    }

    pub fn get(&self) -> Option<Arc<ConnectionRegistry<C>>> {
        self.cell.get().cloned()
    }

    /// Returns the shared registry, constructing it on first use.
    ///
    /// The first caller's config wins; without one, [`Config::from_env`] is
    /// used. A different config passed later is ignored with a warning.
    pub fn get_or_init(&self, config: Option<Config>, connector: impl FnOnce() -> C) -> Arc<ConnectionRegistry<C>> {
        let mut supplied = config;
        let registry = self.cell.get_or_init(|| {
            let config = supplied.take().unwrap_or_else(Config::from_env);
            Arc::new(ConnectionRegistry::new(config, connector()))
        });

        if let Some(ignored) = supplied {
            if &ignored != registry.config() {
                warn!(
                    active = %registry.config(),
                    ignored = %ignored,
                    "Connection registry already initialized, ignoring new config"
                );
            }
        }

        registry.clone()
    }
}

impl<C: Connector> Default for RegistryCell<C> {
    fn default() -> Self {
        Self::new()
    }
}
