pub mod client;
pub mod config;
pub mod core;

pub use async_trait::async_trait;
pub use client::{ConnectionRegistry, RegistryCell, RegistryState};
pub use config::{Config, FileFormat};
pub use crate::core::{
    driver::{ClientHandle, CollectionOf, ConnectOptions, Connector, DatabaseHandle, DatabaseOf},
    error::{ConnectionFailure, MResult, ManagerError},
};
