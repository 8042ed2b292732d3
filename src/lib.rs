//! Filesystem IPC between short-lived assistant hook processes (producers)
//! and a long-lived tray responder, coordinated entirely through atomic
//! file creates and renames in a shared state directory.

pub mod channel;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod gc;
pub mod hooks;
pub mod liveness;
pub mod poller;
pub mod store;
