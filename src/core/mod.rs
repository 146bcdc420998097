pub mod config;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod formatter;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod process;
pub mod view;
