//! Typed views of the handful of packets the proxy parses or fabricates.
//!
//! Full parsing of the protocol is _not_ implemented. Everything the proxy
//! does not need to see is relayed as opaque payload bytes; the types here
//! cover only the packets that are rewritten, consumed, or injected.

use super::{decoder, DecodeError, Decoder, Encoder};
use serde::{Deserialize, Serialize};

/// Packet ids for protocol 47, by state and direction.
pub mod id {
    /// Handshaking, client → server.
    pub const HANDSHAKE: i32 = 0x00;

    /// Login, server → client.
    pub const ENCRYPTION_REQUEST: i32 = 0x01;
    pub const LOGIN_SUCCESS: i32 = 0x02;
    pub const SET_COMPRESSION: i32 = 0x03;

    /// Login, client → server.
    pub const ENCRYPTION_RESPONSE: i32 = 0x01;

    /// Play, client → server.
    pub const SERVERBOUND_CHAT: i32 = 0x01;

    /// Play, server → client.
    pub const CLIENTBOUND_CHAT: i32 = 0x02;
    pub const RESPAWN: i32 = 0x07;
    pub const PLUGIN_MESSAGE: i32 = 0x3F;
}

/// The Handshaking-state intention packet.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    /// Raw intent field: 1 = Status, 2 = Login. Anything else is rejected
    /// by the handshake handler.
    pub next_state: i32,
}

impl Handshake {
    /// Decodes the fields following the packet id.
    pub fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        Ok(Self {
            protocol_version: decoder.read_var_int()?,
            server_address: decoder.read_string()?.to_owned(),
            server_port: decoder.read_u16()?,
            next_state: decoder.read_var_int()?,
        })
    }

    /// Serializes a full payload (`id || fields`).
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        let mut encoder = Encoder::new(&mut payload);
        encoder.write_var_int(id::HANDSHAKE);
        encoder.write_var_int(self.protocol_version);
        encoder.write_string(&self.server_address);
        encoder.write_u16(self.server_port);
        encoder.write_var_int(self.next_state);
        payload
    }
}

/// The Login-state Encryption Request sent by the server.
#[derive(Debug, Clone)]
pub struct EncryptionRequest {
    pub server_id: String,
    /// DER-encoded SubjectPublicKeyInfo.
    pub public_key: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl EncryptionRequest {
    /// Decodes the fields following the packet id.
    pub fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        let server_id = decoder.read_string()?.to_owned();
        let key_length = usize::try_from(decoder.read_var_int()?)?;
        let public_key = decoder.consume_slice(key_length)?.to_vec();
        let token_length = usize::try_from(decoder.read_var_int()?)?;
        let verify_token = decoder.consume_slice(token_length)?.to_vec();
        Ok(Self {
            server_id,
            public_key,
            verify_token,
        })
    }
}

/// Builds the client Encryption Response payload from the two RSA-encrypted
/// blobs.
pub fn encryption_response(encrypted_secret: &[u8], encrypted_token: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    let mut encoder = Encoder::new(&mut payload);
    encoder.write_var_int(id::ENCRYPTION_RESPONSE);
    encoder.write_prefixed_bytes(encrypted_secret);
    encoder.write_prefixed_bytes(encrypted_token);
    payload
}

/// Builds a serverbound chat message payload.
pub fn serverbound_chat(message: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    let mut encoder = Encoder::new(&mut payload);
    encoder.write_var_int(id::SERVERBOUND_CHAT);
    encoder.write_string(message);
    payload
}

/// Where a clientbound chat message is rendered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum ChatPosition {
    Chat = 0,
    System = 1,
    ActionBar = 2,
}

/// The narrow slice of the chat JSON document the proxy reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub extra: Vec<String>,
    #[serde(default)]
    pub text: String,
}

/// Builds a clientbound chat message payload carrying `text`.
pub fn clientbound_chat(text: &str, position: ChatPosition) -> Vec<u8> {
    let message = ChatMessage {
        extra: vec![text.to_owned()],
        text: String::new(),
    };
    let json = serde_json::to_string(&message).expect("chat message serializes");

    let mut payload = Vec::new();
    let mut encoder = Encoder::new(&mut payload);
    encoder.write_var_int(id::CLIENTBOUND_CHAT);
    encoder.write_string(&json);
    encoder.write_u8(position as u8);
    payload
}

/// A Play-state plugin message.
#[derive(Debug, Clone)]
pub struct PluginMessage {
    pub channel: String,
    pub data: Vec<u8>,
}

impl PluginMessage {
    /// Decodes the fields following the packet id.
    ///
    /// Some servers truncate the data field mid-string; a short count there
    /// yields whatever bytes were present rather than an error.
    pub fn decode(decoder: &mut Decoder) -> decoder::Result<Self> {
        let channel = decoder.read_string()?.to_owned();
        let data = match decoder.read_var_int() {
            Ok(length) => {
                let length = usize::try_from(length)?;
                let available = length.min(decoder.buffer().len());
                decoder.consume_slice(available)?.to_vec()
            }
            Err(DecodeError::EndOfStream(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        Ok(Self { channel, data })
    }
}
