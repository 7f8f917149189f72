pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod install;
pub mod runner;
pub mod tool_event;
pub mod util;
