//! Implements the Minecraft protocol.

pub const PROTOCOL_VERSION: i32 = 47; // 1.8.x

pub mod crypto;
pub mod decoder;
pub mod encoder;
pub mod framing;
pub mod packets;

pub use decoder::{DecodeError, Decoder};
pub use encoder::Encoder;

/// Limit to avoid out-of-memory DOS.
const BUFFER_LIMIT: usize = 1024 * 1024; // 1 MiB
