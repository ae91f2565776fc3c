//! An in-memory driver for exercising [`dbmanager_core::ConnectionRegistry`]
//! without a database server.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use dbmanager_core::{ClientHandle, ConnectOptions, Connector, DatabaseHandle, MResult, ManagerError};
use parking_lot::{Mutex, RwLock};

#[derive(Debug, Default)]
struct Stats {
    connects: AtomicUsize,
    pings: AtomicUsize,
    closes: AtomicUsize,
}

/// Collection names per database, shared by every client of one connector.
type Catalog = Arc<RwLock<HashMap<String, Vec<String>>>>;

#[derive(Clone, Default)]
pub struct MemoryConnector {
    stats: Arc<Stats>,
    catalog: Catalog,
    failures: Arc<Mutex<VecDeque<ManagerError>>>,
    delay: Option<Duration>,
    stall_close: bool,
    last_options: Arc<Mutex<Option<ConnectOptions>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connect sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Client `close` marks the client closed and then never returns.
    pub fn with_stalled_close(mut self) -> Self {
        self.stall_close = true;
        self
    }

    pub fn with_collections(self, database: impl AsRef<str>, names: &[&str]) -> Self {
        self.catalog.write().insert(
            database.as_ref().to_string(),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    /// Makes the next connect attempt fail with `error`.
    pub fn fail_next(&self, error: ManagerError) {
        self.failures.lock().push_back(error);
    }

    pub fn connects(&self) -> usize {
        self.stats.connects.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.stats.pings.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.stats.closes.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<ConnectOptions> {
        self.last_options.lock().clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Client = MemoryClient;

    fn driver_name(&self) -> String {
        String::from("memory")
    }

    async fn connect(&self, options: &ConnectOptions) -> MResult<MemoryClient> {
        let id = self.stats.connects.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_options.lock() = Some(options.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }

        Ok(MemoryClient {
            id,
            stats: self.stats.clone(),
            catalog: self.catalog.clone(),
            closed: AtomicBool::new(false),
            stall_close: self.stall_close,
        })
    }
}

pub struct MemoryClient {
    id: usize,
    stats: Arc<Stats>,
    catalog: Catalog,
    closed: AtomicBool,
    stall_close: bool,
}

impl MemoryClient {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientHandle for MemoryClient {
    type Database = MemoryDatabase;

    async fn ping(&self) -> MResult<()> {
        self.stats.pings.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() {
            return Err(ManagerError::connection("client is closed"));
        }
        Ok(())
    }

    fn database(&self, name: &str) -> MemoryDatabase {
        MemoryDatabase { name: name.to_string(), client_id: self.id, catalog: self.catalog.clone() }
    }

    async fn close(&self) -> MResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        if self.stall_close {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct MemoryDatabase {
    name: String,
    client_id: usize,
    catalog: Catalog,
}

impl std::fmt::Debug for MemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDatabase")
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl MemoryDatabase {
    /// Which connect attempt (1-based) produced the client behind this handle.
    pub fn client_id(&self) -> usize {
        self.client_id
    }
}

#[async_trait]
impl DatabaseHandle for MemoryDatabase {
    type Collection = MemoryCollection;

    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> MemoryCollection {
        MemoryCollection { database: self.name.clone(), name: name.to_string() }
    }

    async fn list_collection_names(&self) -> MResult<Vec<String>> {
        Ok(self.catalog.read().get(&self.name).cloned().unwrap_or_default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryCollection {
    pub database: String,
    pub name: String,
}
