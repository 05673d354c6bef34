pub mod apk;
pub mod auth;
pub mod backend;
pub mod events;
pub mod schema;

pub use backend::DuckDbBackend;

/// Re-export the `duckdb` crate so consumers (especially tests) can use
/// `apkdrop_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
