//! Audio stages of the export pipeline
//!
//! Everything before encoding operates on decoded PCM held in an
//! [`AudioBuffer`]. Each stage consumes its input and returns a new
//! buffer; no stage mutates a buffer it was handed.

pub mod buffer;
pub mod encoder;
pub mod enhance;
pub mod trim;

pub use buffer::{AudioBuffer, ChannelLayout};
pub use encoder::{encode_mp3, BITRATE_KBPS};
pub use enhance::{enhance, EnhancementSettings};
pub use trim::{trim, TrimRange};
