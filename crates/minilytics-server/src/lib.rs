pub mod app;
pub mod cache;
pub mod datadir;
pub mod error;
pub mod geo;
pub mod routes;
pub mod state;
