pub mod driver;
pub mod error;
