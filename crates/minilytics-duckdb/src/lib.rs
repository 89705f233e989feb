pub mod backend;
pub mod queries;
pub mod schema;

pub use backend::DuckDbBackend;

// Re-exported so integration tests can use `duckdb::params!` against
// `conn_for_test()` without their own duckdb dependency line.
pub use duckdb;
