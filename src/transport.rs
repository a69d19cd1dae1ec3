use crate::error::ScopeError;

/// One logical response to a SCPI query.
///
/// The instrument answers some queries with raw binary data (hardcopy
/// payloads) and others with text. Which one arrives is not known until the
/// bytes are inspected, so the two cases are kept as an explicit variant
/// instead of an untyped buffer. Consumers must pattern-match; for hardcopy
/// retrieval a text response always means an instrument-side error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResponse {
    /// Raw binary payload, returned unchanged.
    Binary(Vec<u8>),
    /// Decoded text response with the line terminator stripped.
    Text(String),
}

impl QueryResponse {
    pub fn is_binary(&self) -> bool {
        matches!(self, QueryResponse::Binary(_))
    }

    pub fn len(&self) -> usize {
        match self {
            QueryResponse::Binary(data) => data.len(),
            QueryResponse::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Transport capability required from an instrument session.
///
/// The capture engine consumes this trait; it never owns the session. A
/// concrete implementation over TCP lives in [`crate::connection`], and mock
/// implementations back the engine tests.
///
/// The instrument is a single-session stateful device, so all methods take
/// `&mut self`: one capture call holds the transport exclusively for its
/// duration and transactions never interleave.
pub trait ScpiTransport {
    /// Send a command without waiting for a response.
    fn write(&mut self, command: &str) -> Result<(), ScopeError>;

    /// Send a command and read one logical response.
    fn query(&mut self, command: &str) -> Result<QueryResponse, ScopeError>;

    /// Read up to `n` raw bytes, blocking until data arrives or the
    /// transport times out. May return fewer than `n` bytes when the stream
    /// ends early; callers that need an exact count must check the length.
    fn read_raw(&mut self, n: usize) -> Result<Vec<u8>, ScopeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_len() {
        assert_eq!(QueryResponse::Binary(vec![1, 2, 3]).len(), 3);
        assert_eq!(QueryResponse::Text("ok".to_string()).len(), 2);
        assert!(QueryResponse::Binary(Vec::new()).is_empty());
    }

    #[test]
    fn test_query_response_is_binary() {
        assert!(QueryResponse::Binary(vec![0x89]).is_binary());
        assert!(!QueryResponse::Text("error".to_string()).is_binary());
    }
}
