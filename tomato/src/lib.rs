//! Pomodoro timer: session clock, focus statistics and the terminal front end.

pub mod app;
pub mod clock;
pub mod config;
pub mod ipc;
pub mod ledger;
pub mod notify;
pub mod persistence;
pub mod settings;
pub mod ui;
