//! Length-prefixed packet framing with optional zlib compression.
//!
//! With the compression threshold disabled (negative), every frame is
//! `VarInt(len) || id || data`. Once a threshold is set, every frame is
//! `VarInt(outer len) || VarInt(data len) || body`, where the body is the
//! zlib-compressed payload if the uncompressed payload reached the
//! threshold, or the payload verbatim with a zero data-length marker
//! otherwise.

use super::{
    crypto::{EncryptionKey, StreamDecryptor, StreamEncryptor},
    DecodeError, Encoder, BUFFER_LIMIT,
};
use flate2::Compression;
use std::io::{ErrorKind, Read, Write};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The proxy mostly relays small packets, so time spent on higher
/// compression levels is wasted. A compliant peer only needs the output
/// to inflate.
const COMPRESSION_LEVEL: Compression = Compression::fast();

/// An error while reading or writing framed packets.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The peer closed the connection or the pipe broke mid-frame.
    #[error("peer disconnected")]
    Disconnected,
    #[error("packet length of {0} exceeds maximum allowed")]
    TooLarge(usize),
    #[error("frame length {0} is shorter than its data-length prefix")]
    LengthUnderflow(usize),
    #[error("compressed packet inflated to {got} bytes, expected {expected}")]
    InflateMismatch { expected: usize, got: usize },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("zlib error: {0}")]
    Zlib(std::io::Error),
    #[error(transparent)]
    Io(std::io::Error),
}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted => FrameError::Disconnected,
            _ => FrameError::Io(e),
        }
    }
}

impl FrameError {
    /// True for errors that mean the peer went away rather than misbehaved.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, FrameError::Disconnected)
    }
}

pub type Result<T, E = FrameError> = std::result::Result<T, E>;

/// One framed packet: the outer length as read off the wire plus the
/// decompressed payload (`id || data`).
#[derive(Debug, Clone)]
pub struct Frame {
    pub length: usize,
    pub payload: Vec<u8>,
}

/// Reads framed packets from a byte source, decrypting once the upstream
/// cipher has been installed.
pub struct FrameReader<R> {
    stream: R,
    cipher: Option<StreamDecryptor>,
    buffer: Vec<u8>,
    pos: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            cipher: None,
            buffer: Vec::new(),
            pos: 0,
        }
    }

    /// Installs the CFB8 decryptor. All bytes read after this call pass
    /// through it.
    pub fn enable_decryption(&mut self, key: EncryptionKey) {
        self.cipher = Some(StreamDecryptor::new(key));
    }

    async fn fill_buffer(&mut self) -> Result<()> {
        let mut chunk = [0u8; 256];
        let bytes_read = self.stream.read(&mut chunk).await?;
        if bytes_read == 0 {
            return Err(FrameError::Disconnected);
        }
        if let Some(cipher) = &mut self.cipher {
            cipher.decrypt(&mut chunk[..bytes_read]);
        }
        self.buffer.clear();
        self.pos = 0;
        self.buffer.extend_from_slice(&chunk[..bytes_read]);
        Ok(())
    }

    async fn read_u8(&mut self) -> Result<u8> {
        if self.pos == self.buffer.len() {
            self.fill_buffer().await?;
        }
        let byte = self.buffer[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            if self.pos == self.buffer.len() {
                self.fill_buffer().await?;
            }
            let take = (n - out.len()).min(self.buffer.len() - self.pos);
            out.extend_from_slice(&self.buffer[self.pos..self.pos + take]);
            self.pos += take;
        }
        Ok(out)
    }

    async fn read_var_int(&mut self) -> Result<(i32, usize)> {
        let mut num_read = 0u32;
        let mut result = 0i32;
        loop {
            let read = self.read_u8().await?;
            let value = i32::from(read & 0b0111_1111);
            result |= value.overflowing_shl(7 * num_read).0;

            num_read += 1;

            if num_read > 5 {
                return Err(DecodeError::VarIntTooLong.into());
            }
            if read & 0b1000_0000 == 0 {
                break;
            }
        }
        Ok((result, num_read as usize))
    }

    /// Reads one packet under the given compression threshold.
    ///
    /// A zero outer length yields an empty frame; the caller skips it and
    /// resumes reading.
    pub async fn read_frame(&mut self, threshold: i32) -> Result<Frame> {
        let (length, _) = self.read_var_int().await?;
        let length = usize::try_from(length).map_err(DecodeError::from)?;
        if length > BUFFER_LIMIT {
            return Err(FrameError::TooLarge(length));
        }
        if length == 0 {
            return Ok(Frame {
                length: 0,
                payload: Vec::new(),
            });
        }

        if threshold < 0 {
            let payload = self.read_exact(length).await?;
            return Ok(Frame { length, payload });
        }

        let (data_length, prefix_len) = self.read_var_int().await?;
        let body_len = length
            .checked_sub(prefix_len)
            .ok_or(FrameError::LengthUnderflow(length))?;
        let body = self.read_exact(body_len).await?;
        let payload = inflate_body(data_length, body)?;
        Ok(Frame { length, payload })
    }
}

fn inflate_body(data_length: i32, body: Vec<u8>) -> Result<Vec<u8>> {
    if data_length == 0 {
        return Ok(body);
    }
    let expected = usize::try_from(data_length).map_err(DecodeError::from)?;
    if expected > BUFFER_LIMIT {
        return Err(FrameError::TooLarge(expected));
    }

    let mut payload = Vec::with_capacity(expected);
    flate2::read::ZlibDecoder::new(&body[..])
        .take(BUFFER_LIMIT as u64 + 1)
        .read_to_end(&mut payload)
        .map_err(FrameError::Zlib)?;
    if payload.len() != expected {
        return Err(FrameError::InflateMismatch {
            expected,
            got: payload.len(),
        });
    }
    Ok(payload)
}

/// Encodes one packet payload (`id || data`) into wire bytes under the
/// given compression threshold.
pub fn encode_frame(payload: &[u8], threshold: i32) -> Result<Vec<u8>> {
    let uncompressed_length =
        i32::try_from(payload.len()).map_err(|_| FrameError::TooLarge(payload.len()))?;

    let mut frame = Vec::new();
    let mut encoder = Encoder::new(&mut frame);

    if threshold < 0 {
        encoder.write_var_int(uncompressed_length);
        encoder.write_slice(payload);
        return Ok(frame);
    }

    let mut body = Vec::new();
    let mut body_encoder = Encoder::new(&mut body);
    if payload.len() >= threshold as usize {
        let mut deflater = flate2::write::ZlibEncoder::new(Vec::new(), COMPRESSION_LEVEL);
        deflater.write_all(payload).map_err(FrameError::Zlib)?;
        let compressed = deflater.finish().map_err(FrameError::Zlib)?;
        body_encoder.write_var_int(uncompressed_length);
        body_encoder.write_slice(&compressed);
    } else {
        body_encoder.write_var_int(0);
        body_encoder.write_slice(payload);
    }

    let outer_length =
        i32::try_from(body.len()).map_err(|_| FrameError::TooLarge(body.len()))?;
    encoder.write_var_int(outer_length);
    encoder.write_slice(&body);
    Ok(frame)
}

/// Writes framed packets to a byte sink, encrypting once the upstream
/// cipher has been installed.
pub struct FrameWriter<W> {
    stream: W,
    cipher: Option<StreamEncryptor>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream,
            cipher: None,
        }
    }

    /// Installs the CFB8 encryptor. All frames written after this call pass
    /// through it.
    pub fn enable_encryption(&mut self, key: EncryptionKey) {
        self.cipher = Some(StreamEncryptor::new(key));
    }

    /// Frames and writes one packet payload under the given threshold.
    pub async fn write_frame(&mut self, payload: &[u8], threshold: i32) -> Result<()> {
        let mut frame = encode_frame(payload, threshold)?;
        if let Some(cipher) = &mut self.cipher {
            cipher.encrypt(&mut frame);
        }
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    /// Half-closes the underlying stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
