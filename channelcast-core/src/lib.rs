pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod transaction;

pub mod encoder;
pub mod engine;
pub mod locker;
pub mod position;
pub mod resolver;
pub mod supervisor;

#[cfg(test)]
pub mod test_helpers;

pub use config::Config;
pub use error::{Error, Result};
pub use transaction::UnitOfWork;
