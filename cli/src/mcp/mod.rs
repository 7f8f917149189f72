pub mod protocol;
pub mod server;
pub mod tools;

pub use server::{serve, serve_stdio};
pub use tools::Tools;
