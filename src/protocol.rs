//! IEEE-488.2 definite-length block decoding.
//!
//! Siglent hardcopy responses embed raw binary data in the otherwise
//! text-oriented SCPI stream using the definite-length block convention:
//! a `#` marker byte, one ASCII digit giving the number of length digits
//! that follow, that many ASCII digits giving the payload length, then
//! exactly that many raw payload bytes.

use crate::error::ScopeError;
use crate::transport::ScpiTransport;
use log::debug;

/// Payloads are read in bounded chunks rather than one allocation sized by
/// the declared length, so a corrupt or implausibly large length surfaces as
/// a transport-timed-out read instead of a giant up-front allocation.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Decode one definite-length block from the transport.
///
/// The framing is validated strictly: any violation aborts the decode with
/// [`ScopeError::Protocol`] and no partial payload is returned, since a
/// truncated or misaligned frame cannot be safely reinterpreted.
pub fn read_definite_block<T: ScpiTransport + ?Sized>(
    transport: &mut T,
) -> Result<Vec<u8>, ScopeError> {
    // '#' marker plus the digit-count byte
    let header = transport.read_raw(2)?;
    if header.len() < 2 || header[0] != b'#' {
        debug!("Bad block header: {:02x?}", header);
        return Err(ScopeError::Protocol("invalid response header".to_string()));
    }

    let num_digits = match (header[1] as char).to_digit(10) {
        Some(n) if n > 0 => n as usize,
        _ => return Err(ScopeError::Protocol("invalid length format".to_string())),
    };

    let length_bytes = transport.read_raw(num_digits)?;
    if length_bytes.len() < num_digits {
        return Err(ScopeError::Protocol(format!(
            "truncated length field: expected {} digits, got {}",
            num_digits,
            length_bytes.len()
        )));
    }

    let data_length: usize = std::str::from_utf8(&length_bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            ScopeError::Protocol(format!("invalid length digits: {:02x?}", length_bytes))
        })?;

    debug!("Block header declares {data_length} payload bytes");

    let mut payload = Vec::with_capacity(data_length.min(READ_CHUNK_SIZE));
    while payload.len() < data_length {
        let want = (data_length - payload.len()).min(READ_CHUNK_SIZE);
        let chunk = transport.read_raw(want)?;
        if chunk.is_empty() {
            break;
        }
        payload.extend_from_slice(&chunk);
    }

    if payload.len() != data_length {
        return Err(ScopeError::Protocol(format!(
            "data length mismatch: expected {}, got {}",
            data_length,
            payload.len()
        )));
    }

    debug!("Decoded definite-length block ({} bytes)", payload.len());
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::QueryResponse;
    use std::collections::VecDeque;

    /// Transport stub that serves `read_raw` from a fixed byte sequence.
    struct ByteStream {
        bytes: VecDeque<u8>,
    }

    impl ByteStream {
        fn new(bytes: &[u8]) -> Self {
            Self {
                bytes: bytes.iter().copied().collect(),
            }
        }
    }

    impl ScpiTransport for ByteStream {
        fn write(&mut self, _command: &str) -> Result<(), ScopeError> {
            Ok(())
        }

        fn query(&mut self, command: &str) -> Result<QueryResponse, ScopeError> {
            Err(ScopeError::InvalidCommand(command.to_string()))
        }

        fn read_raw(&mut self, n: usize) -> Result<Vec<u8>, ScopeError> {
            let take = n.min(self.bytes.len());
            Ok(self.bytes.drain(..take).collect())
        }
    }

    #[test]
    fn test_decode_single_digit_length() {
        let mut stream = ByteStream::new(b"#18imgbytes");
        let payload = read_definite_block(&mut stream).unwrap();
        assert_eq!(payload, b"imgbytes");
    }

    #[test]
    fn test_decode_multi_digit_length() {
        let mut body = vec![0u8; 1200];
        body[0] = 0x89; // PNG magic start
        let mut framed = b"#41200".to_vec();
        framed.extend_from_slice(&body);

        let mut stream = ByteStream::new(&framed);
        let payload = read_definite_block(&mut stream).unwrap();
        assert_eq!(payload.len(), 1200);
        assert_eq!(payload[0], 0x89);
    }

    #[test]
    fn test_trailing_bytes_left_on_transport() {
        let mut stream = ByteStream::new(b"#15hello\n");
        let payload = read_definite_block(&mut stream).unwrap();
        assert_eq!(payload, b"hello");
        // Terminator stays behind for the session layer.
        assert_eq!(stream.read_raw(1).unwrap(), b"\n");
    }

    #[test]
    fn test_invalid_header_marker() {
        let mut stream = ByteStream::new(b"!18imgbytes");
        let err = read_definite_block(&mut stream).unwrap_err();
        match err {
            ScopeError::Protocol(msg) => assert_eq!(msg, "invalid response header"),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_stream_is_invalid_header() {
        let mut stream = ByteStream::new(b"");
        let err = read_definite_block(&mut stream).unwrap_err();
        assert!(matches!(err, ScopeError::Protocol(msg) if msg == "invalid response header"));
    }

    #[test]
    fn test_zero_digit_count_rejected() {
        let mut stream = ByteStream::new(b"#0");
        let err = read_definite_block(&mut stream).unwrap_err();
        match err {
            ScopeError::Protocol(msg) => assert_eq!(msg, "invalid length format"),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_digit_count_rejected() {
        let mut stream = ByteStream::new(b"#x12345");
        let err = read_definite_block(&mut stream).unwrap_err();
        assert!(matches!(err, ScopeError::Protocol(msg) if msg == "invalid length format"));
    }

    #[test]
    fn test_short_payload_reports_both_counts() {
        // Declares 8 bytes but only 5 arrive.
        let mut stream = ByteStream::new(b"#18hello");
        let err = read_definite_block(&mut stream).unwrap_err();
        match err {
            ScopeError::Protocol(msg) => {
                assert_eq!(msg, "data length mismatch: expected 8, got 5")
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_length_digits_rejected() {
        let mut stream = ByteStream::new(b"#2ab??");
        let err = read_definite_block(&mut stream).unwrap_err();
        assert!(matches!(err, ScopeError::Protocol(_)));
    }
}
