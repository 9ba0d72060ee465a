use std::{num::TryFromIntError, str::Utf8Error};

/// An error while decoding packet fields.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("need at least {0} more bytes")]
    EndOfStream(usize),
    #[error("varint is too long")]
    VarIntTooLong,
    #[error("string exceeds max allowed length")]
    StringTooLong,
    #[error(transparent)]
    Utf8(#[from] Utf8Error),
    #[error(transparent)]
    IntConversion(#[from] TryFromIntError),
}

pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

const MAX_STRING_LENGTH: usize = i16::MAX as usize;

/// A raw decoder for a Minecraft bitstream.
#[derive(Debug)]
pub struct Decoder<'a> {
    buffer: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Creates a decoder from the buffer it will read from.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    /// Gets the remaining buffer.
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Returns if there is no data left in the buffer.
    pub fn is_finished(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consumes `n` bytes from the buffer, returning them as a slice.
    pub fn consume_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        if n <= self.buffer.len() {
            let (data, buffer) = self.buffer.split_at(n);
            self.buffer = buffer;
            Ok(data)
        } else {
            Err(DecodeError::EndOfStream(n - self.buffer.len()))
        }
    }

    /// Consumes `N` bytes into an array.
    pub fn consume<const N: usize>(&mut self) -> Result<[u8; N]> {
        let data = self.consume_slice(N)?;
        Ok(<[u8; N]>::try_from(data).expect("slice has length N"))
    }

    /// Reads an unsigned byte from the stream.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.consume::<1>().map(|[x]| x)
    }

    /// Reads an unsigned short from the stream.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.consume().map(u16::from_be_bytes)
    }

    /// Reads a signed int from the stream.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.consume().map(i32::from_be_bytes)
    }

    /// Reads a VarInt from the stream.
    pub fn read_var_int(&mut self) -> Result<i32> {
        self.read_var_int_with_size().map(|(x, _)| x)
    }

    /// Reads a VarInt from the stream, additionally
    /// returning the number of bytes read.
    pub fn read_var_int_with_size(&mut self) -> Result<(i32, usize)> {
        let mut num_read = 0;
        let mut result = 0;

        loop {
            let read = self.read_u8()?;
            let value = i32::from(read & 0b0111_1111);
            result |= value.overflowing_shl(7 * num_read).0;

            num_read += 1;

            if num_read > 5 {
                return Err(DecodeError::VarIntTooLong);
            }
            if read & 0b1000_0000 == 0 {
                break;
            }
        }
        Ok((result, num_read as usize))
    }

    /// Reads a varint-prefixed string from the stream.
    pub fn read_string(&mut self) -> Result<&'a str> {
        let length = usize::try_from(self.read_var_int()?)?;

        if length > MAX_STRING_LENGTH {
            return Err(DecodeError::StringTooLong);
        }

        let bytes = std::str::from_utf8(self.consume_slice(length)?)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Encoder;

    #[test]
    fn var_int_roundtrip() {
        for x in [0, 1, 127, 128, 255, 300, 25565, i32::MAX, -1, i32::MIN] {
            let mut buf = Vec::new();
            let written = Encoder::new(&mut buf).write_var_int(x);
            let (decoded, read) = Decoder::new(&buf).read_var_int_with_size().unwrap();
            assert_eq!(decoded, x);
            assert_eq!(read, written);
            assert_eq!(read, buf.len());
        }
    }

    #[test]
    fn var_int_emission_length() {
        let cases = [(0, 1), (127, 1), (128, 2), (16383, 2), (16384, 3), (2097151, 3), (2097152, 4), (i32::MAX, 5)];
        for (x, expected_len) in cases {
            let mut buf = Vec::new();
            Encoder::new(&mut buf).write_var_int(x);
            assert_eq!(buf.len(), expected_len, "length mismatch for {x}");
        }
    }

    #[test]
    fn var_int_too_long() {
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(
            Decoder::new(&bytes).read_var_int(),
            Err(DecodeError::VarIntTooLong)
        ));
    }

    #[test]
    fn var_int_truncated() {
        let bytes = [0x80, 0x80];
        assert!(matches!(
            Decoder::new(&bytes).read_var_int(),
            Err(DecodeError::EndOfStream(_))
        ));
    }

    #[test]
    fn string_roundtrip() {
        let mut buf = Vec::new();
        Encoder::new(&mut buf).write_string("mc.hypixel.net");
        assert_eq!(Decoder::new(&buf).read_string().unwrap(), "mc.hypixel.net");
    }

    #[test]
    fn string_truncated_is_end_of_stream() {
        let mut buf = Vec::new();
        Encoder::new(&mut buf).write_string("hello");
        buf.truncate(3);
        assert!(matches!(
            Decoder::new(&buf).read_string(),
            Err(DecodeError::EndOfStream(_))
        ));
    }
}
