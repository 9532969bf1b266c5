pub mod app;
pub mod config;
pub mod debounce;
pub mod error;
pub mod mime;
pub mod proxy;
pub mod recorder;
pub mod request_log;
pub mod storage;
pub mod tools;
pub mod ui;
