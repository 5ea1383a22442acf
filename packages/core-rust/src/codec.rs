//! Byte layouts of stored keys and values.
//!
//! No type tag or version is stored; the accessor chosen by the caller fixes
//! the layout of both key and value:
//!
//! | Field kind | Layout |
//! |---|---|
//! | string key | raw UTF-8 bytes, no terminator |
//! | string value | UTF-8 bytes followed by one NUL |
//! | 32-bit integer key/value | 4 bytes, native endian |
//! | unsigned 64-bit value | 8 bytes, native endian |
//!
//! Decoders check lengths and terminators instead of reinterpreting memory.

use thiserror::Error;

/// A stored record does not have the layout its accessor expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Fixed-width field with the wrong byte length.
    #[error("expected {expected} bytes, found {actual}")]
    Width {
        /// Width required by the field kind.
        expected: usize,
        /// Width actually stored.
        actual: usize,
    },
    /// String value without its trailing NUL.
    #[error("string value is not NUL-terminated")]
    MissingTerminator,
    /// String bytes that are not UTF-8.
    #[error("string is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Encodes a string key: its bytes, unterminated.
#[must_use]
pub fn encode_str_key(key: &str) -> &[u8] {
    key.as_bytes()
}

/// Decodes a string key.
///
/// # Errors
///
/// Returns [`CodecError::Utf8`] if the bytes are not UTF-8.
pub fn decode_str_key(bytes: &[u8]) -> Result<&str, CodecError> {
    Ok(std::str::from_utf8(bytes)?)
}

/// Encodes a string value with its NUL terminator.
#[must_use]
pub fn encode_str_value(value: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(value.len() + 1);
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
    buf
}

/// Decodes a NUL-terminated string value.
///
/// Reading stops at the first NUL, so a value containing an interior NUL is
/// truncated there, as any C reader of the same layout would see it.
///
/// # Errors
///
/// Returns [`CodecError::MissingTerminator`] if there is no NUL, or
/// [`CodecError::Utf8`] if the bytes before it are not UTF-8.
pub fn decode_str_value(bytes: &[u8]) -> Result<&str, CodecError> {
    let end = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or(CodecError::MissingTerminator)?;
    Ok(std::str::from_utf8(&bytes[..end])?)
}

/// Encodes a 32-bit integer key or value.
#[must_use]
pub fn encode_i32(value: i32) -> [u8; 4] {
    value.to_ne_bytes()
}

/// Decodes a 32-bit integer key or value.
///
/// # Errors
///
/// Returns [`CodecError::Width`] unless `bytes` is exactly 4 bytes long.
pub fn decode_i32(bytes: &[u8]) -> Result<i32, CodecError> {
    let raw: [u8; 4] = bytes.try_into().map_err(|_| CodecError::Width {
        expected: 4,
        actual: bytes.len(),
    })?;
    Ok(i32::from_ne_bytes(raw))
}

/// Encodes an unsigned 64-bit value.
#[must_use]
pub fn encode_u64(value: u64) -> [u8; 8] {
    value.to_ne_bytes()
}

/// Decodes an unsigned 64-bit value.
///
/// # Errors
///
/// Returns [`CodecError::Width`] unless `bytes` is exactly 8 bytes long.
pub fn decode_u64(bytes: &[u8]) -> Result<u64, CodecError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| CodecError::Width {
        expected: 8,
        actual: bytes.len(),
    })?;
    Ok(u64::from_ne_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_value_layout_is_nul_terminated() {
        assert_eq!(encode_str_value("GET"), b"GET\0".to_vec());
        assert_eq!(encode_str_value(""), vec![0]);
    }

    #[test]
    fn string_key_layout_has_no_terminator() {
        assert_eq!(encode_str_key("10.0.0.1"), b"10.0.0.1");
    }

    #[test]
    fn decode_str_value_stops_at_first_nul() {
        assert_eq!(decode_str_value(b"HTTP/1.1\0").unwrap(), "HTTP/1.1");
        assert_eq!(decode_str_value(b"ab\0cd\0").unwrap(), "ab");
    }

    #[test]
    fn decode_str_value_requires_terminator() {
        assert_eq!(decode_str_value(b"abc"), Err(CodecError::MissingTerminator));
        assert_eq!(decode_str_value(b""), Err(CodecError::MissingTerminator));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert!(matches!(decode_str_value(&[0xff, 0xfe, 0]), Err(CodecError::Utf8(_))));
        assert!(matches!(decode_str_key(&[0xc3]), Err(CodecError::Utf8(_))));
    }

    #[test]
    fn integer_layout_is_native_endian() {
        assert_eq!(encode_i32(-1), (-1i32).to_ne_bytes());
        assert_eq!(encode_u64(42), 42u64.to_ne_bytes());
        assert_eq!(decode_i32(&encode_i32(i32::MIN)).unwrap(), i32::MIN);
        assert_eq!(decode_u64(&encode_u64(u64::MAX)).unwrap(), u64::MAX);
    }

    #[test]
    fn fixed_width_decoders_check_length() {
        assert_eq!(
            decode_i32(&[1, 2, 3]),
            Err(CodecError::Width { expected: 4, actual: 3 })
        );
        assert_eq!(
            decode_u64(&encode_i32(7)),
            Err(CodecError::Width { expected: 8, actual: 4 })
        );
        assert_eq!(
            CodecError::Width { expected: 8, actual: 4 }.to_string(),
            "expected 8 bytes, found 4"
        );
    }
}
