pub mod api;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod rooms;
pub mod sweeper;
pub mod wal;
