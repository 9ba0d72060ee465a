//! Packet handlers the pipe loop dispatches into.

pub mod encryption;
pub mod handshake;
pub mod play;

/// What the pipe does with a dispatched packet afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Reconstruct the packet and forward it unchanged.
    Forward,
    /// The handler swallowed (or replaced) the packet.
    Consume,
}
