//! A process-wide MongoDB connection with cached database handles.
//!
//! ```no_run
//! # async fn run() -> dbmanager::MResult<()> {
//! let manager = dbmanager::get_instance(None);
//! let _users = manager.get_collection("users", None).await?;
//! let _names = manager.list_collection_names(Some("reporting")).await?;
//! manager.close().await?;
//! # Ok(())
//! # }
//! ```

pub use dbmanager_core::{
    client::{self, ConnectionRegistry, RegistryCell, RegistryState},
    config::{self, Config, FileFormat},
    core::{
        self,
        driver::{ClientHandle, CollectionOf, ConnectOptions, Connector, DatabaseHandle, DatabaseOf},
        error::{ConnectionFailure, MResult, ManagerError as Error},
    },
};

pub use dbmanager_core;

#[cfg(feature = "mongodb")]
pub mod drivers {
    pub use dbmanager_driver_mongodb::{mongodb, MongoClient, MongoConnector, MongoDatabase};
}

#[cfg(feature = "mongodb")]
pub use global::{default_database, get_instance, DatabaseManager};

#[cfg(feature = "mongodb")]
mod global {
    use std::sync::Arc;

    use dbmanager_core::{Config, ConnectionRegistry, MResult, RegistryCell};
    use dbmanager_driver_mongodb::{MongoConnector, MongoDatabase};

    pub type DatabaseManager = ConnectionRegistry<MongoConnector>;

    static MANAGER: RegistryCell<MongoConnector> = RegistryCell::new();

    /// The process-wide manager. Built from `config`, or from the environment
    /// when `None`, on the first call; later configs are ignored.
    pub fn get_instance(config: Option<Config>) -> Arc<DatabaseManager> {
        MANAGER.get_or_init(config, MongoConnector::new)
    }

    /// The configured default database of the process-wide manager.
    pub async fn default_database() -> MResult<Arc<MongoDatabase>> {
        get_instance(None).get_database(None).await
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn get_instance_returns_one_manager_without_connecting() {
            let first = get_instance(Some(Config::new("mongodb://manager-test:27017", "manager_test")));
            let second = get_instance(None);

            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(second.config().default_database, "manager_test");
            assert!(!second.is_connected());
        }
    }
}
