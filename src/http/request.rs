//! Request identity for tracing.
//!
//! Every dispatched request gets a fresh id so its resolution, connect,
//! and relay events can be correlated in the logs.

use uuid::Uuid;

/// Unique identifier for one client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }
}
