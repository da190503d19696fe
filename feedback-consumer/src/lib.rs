pub mod app_context;
pub mod config;
pub mod consumer;
pub mod metrics_consts;
pub mod server;
pub mod sink;
pub mod types;
