//! Concrete implementations of the ports.

pub mod csv_adapter;
pub mod file_config_adapter;
#[cfg(feature = "http")]
pub mod http_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
