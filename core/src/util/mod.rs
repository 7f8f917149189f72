mod tail_bytes;
mod text;

pub use tail_bytes::TailBytes;
pub use text::{preview, strip_ansi, truncate_chars};
