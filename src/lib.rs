//! Man-in-the-middle proxy for the Minecraft 1.8 (protocol 47) wire protocol.
//!
//! The proxied connection looks like this:
//! Minecraft client => this proxy (plaintext TCP) => destination server (encrypted TCP)
//!
//! The proxy accepts a plaintext client connection, opens its own TCP
//! connection to the destination server, and relays framed packets in both
//! directions. When the server requests encryption during Login, the proxy
//! completes the Mojang session handshake itself using the operator's
//! credentials and enables AES/CFB8 on the upstream leg only; the client
//! never sees an Encryption Request and keeps talking plaintext.
//!
//! In the Play state the proxy watches for a handful of packets: the server
//! brand (to detect Hypixel), system chat messages carrying `/locraw`
//! output (to track the current Bedwars mode), and Respawn packets (to
//! re-query the location). Serverbound chat starting with `/sc` is consumed
//! and answered with Bedwars statistics fetched from the Hypixel API,
//! rendered as a fabricated clientbound chat message.

pub mod config;
pub mod handlers;
pub mod hypixel;
pub mod listener;
pub mod mojang;
pub mod overlay;
pub mod pipe;
pub mod protocol;
pub mod session;
