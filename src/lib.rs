pub mod app;
pub mod capture;
pub mod cli;
pub mod compositor;
pub mod config;
pub mod global;
pub mod library;
pub mod poller;
pub mod recorder;
pub mod store;
pub mod upload;
