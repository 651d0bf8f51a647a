// The binary entry point is main.rs; this file declares the module tree so
// integration tests can drive the controller via `studyquest::app::*`.

pub mod api;
pub mod app;
pub mod bus;
pub mod clock;
pub mod config;
pub mod engine;
pub mod event;
pub mod logging;
pub mod session;
pub mod store;
pub mod ui;
pub mod worker;
