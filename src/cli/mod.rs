pub mod config_cmd;
pub mod install;
pub mod queue;
pub mod sessions;
pub mod watch;
