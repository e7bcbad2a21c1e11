pub mod app;
pub mod btcrpc;
pub mod config;
