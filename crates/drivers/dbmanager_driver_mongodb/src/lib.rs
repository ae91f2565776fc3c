use std::ops::Deref;

use async_trait::async_trait;
use dbmanager_core::{ClientHandle, ConnectOptions, Connector, DatabaseHandle, MResult, ManagerError};
use mongodb::{
    bson::{doc, Document},
    error::{Error, ErrorKind},
    options::ClientOptions,
    Client, Collection, Database,
};
use tracing::debug;

pub use mongodb;

const DRIVER_NAME: &str = "mongodb";

/// Server selection running out of time is the driver's way of saying
/// nothing answered; everything else is a plain connection failure.
fn connection_error(error: Error) -> ManagerError {
    match error.kind.as_ref() {
        ErrorKind::ServerSelection { .. } => ManagerError::timeout(error),
        _ => ManagerError::connection(error),
    }
}

fn driver_error(error: Error) -> ManagerError {
    ManagerError::driver(DRIVER_NAME, error)
}

#[derive(Clone, Debug, Default)]
pub struct MongoConnector {
    app_name: Option<String>,
}

impl MongoConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reported to the server in the connection handshake.
    pub fn with_app_name(app_name: impl AsRef<str>) -> Self {
        Self { app_name: Some(app_name.as_ref().to_string()) }
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Client = MongoClient;

    fn driver_name(&self) -> String {
        String::from(DRIVER_NAME)
    }

    async fn connect(&self, options: &ConnectOptions) -> MResult<MongoClient> {
        let mut client_options = ClientOptions::parse(&options.uri).await.map_err(connection_error)?;
        client_options.min_pool_size = Some(options.min_pool_size);
        client_options.max_pool_size = Some(options.max_pool_size);
        client_options.server_selection_timeout = Some(options.timeout);
        client_options.connect_timeout = Some(options.timeout);
        if let Some(app_name) = &self.app_name {
            client_options.app_name = Some(app_name.clone());
        }

        debug!(
            min_pool_size = options.min_pool_size,
            max_pool_size = options.max_pool_size,
            timeout = ?options.timeout,
            "Creating MongoDB client"
        );
        Client::with_options(client_options)
            .map(MongoClient)
            .map_err(connection_error)
    }
}

#[derive(Clone, Debug)]
pub struct MongoClient(Client);

impl MongoClient {
    pub fn inner(&self) -> &Client {
        &self.0
    }
}

#[async_trait]
impl ClientHandle for MongoClient {
    type Database = MongoDatabase;

    async fn ping(&self) -> MResult<()> {
        self.0
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(connection_error)
    }

    fn database(&self, name: &str) -> MongoDatabase {
        MongoDatabase(self.0.database(name))
    }

    /// Does not wait for outstanding cursors or sessions to be dropped.
    async fn close(&self) -> MResult<()> {
        self.0.clone().shutdown().immediate(true).await;
        Ok(())
    }
}

/// A `mongodb::Database`; derefs to it for anything beyond the registry's needs.
#[derive(Clone, Debug)]
pub struct MongoDatabase(Database);

impl Deref for MongoDatabase {
    type Target = Database;

    fn deref(&self) -> &Database {
        &self.0
    }
}

#[async_trait]
impl DatabaseHandle for MongoDatabase {
    type Collection = Collection<Document>;

    fn name(&self) -> &str {
        self.0.name()
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.0.collection(name)
    }

    async fn list_collection_names(&self) -> MResult<Vec<String>> {
        self.0.list_collection_names().await.map_err(driver_error)
    }
}
