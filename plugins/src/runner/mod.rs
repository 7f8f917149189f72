pub mod cursor;

pub use cursor::CursorRunnerPlugin;
