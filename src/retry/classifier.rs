//! Retryable vs fatal classification
//!
//! Classification is structural first: the error kind and any status code
//! carried by the failure decide. Message matching is only the fallback for
//! network failures that arrive without a status code.

use once_cell::sync::Lazy;
use regex::RegexSet;

use crate::errors::TraderError;

/// Outcome of classifying a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retryable,
    Fatal,
}

impl Classification {
    pub fn is_retryable(self) -> bool {
        matches!(self, Classification::Retryable)
    }
}

/// Transient-fault signatures for status-less failures
static TRANSIENT_SIGNATURES: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        // rate limiting
        r"(?i)rate[\s_-]?limit|too many requests",
        // timeouts
        r"(?i)timed?[\s_-]?out|timeout|etimedout",
        // connection reset / refused / hang-up
        r"(?i)econnreset|econnrefused|connection reset|connection refused|socket hang up|broken pipe|epipe",
        // DNS temporary failure
        r"(?i)eai_again|temporary failure in name resolution|dns error",
        r"(?i)internal server error",
        r"(?i)connection terminated|connection closed before message completed",
    ])
    .unwrap_or_else(|_| RegexSet::empty())
});

/// Classify a raw failure given its message and optional status code.
///
/// With a status: retryable iff 429, 408 or >= 500. Without one: retryable
/// iff the message matches a transient-fault signature.
pub fn classify_failure(message: &str, status: Option<u16>) -> Classification {
    match status {
        Some(code) if code == 429 || code == 408 || code >= 500 => Classification::Retryable,
        Some(_) => Classification::Fatal,
        None if TRANSIENT_SIGNATURES.is_match(message) => Classification::Retryable,
        None => Classification::Fatal,
    }
}

/// Classify an engine error. Only network-kind failures can be retryable.
pub fn classify(error: &TraderError) -> Classification {
    match error {
        TraderError::Api { status, message } | TraderError::Rpc { status, message } => {
            classify_failure(message, *status)
        }
        TraderError::Validation(_)
        | TraderError::Transaction { .. }
        | TraderError::Retry { .. }
        | TraderError::Internal(_) => Classification::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;

    #[test]
    fn test_status_codes() {
        assert_eq!(classify_failure("", Some(429)), Classification::Retryable);
        assert_eq!(classify_failure("", Some(408)), Classification::Retryable);
        assert_eq!(classify_failure("", Some(500)), Classification::Retryable);
        assert_eq!(classify_failure("", Some(503)), Classification::Retryable);
        assert_eq!(classify_failure("", Some(404)), Classification::Fatal);
        assert_eq!(classify_failure("", Some(400)), Classification::Fatal);
    }

    #[test]
    fn test_status_takes_precedence_over_message() {
        // A 404 stays fatal even when the body mentions a timeout
        assert_eq!(
            classify_failure("upstream timeout", Some(404)),
            Classification::Fatal
        );
    }

    #[test]
    fn test_message_signatures() {
        for msg in [
            "429 Too Many Requests",
            "rate limit exceeded",
            "request timed out",
            "ETIMEDOUT",
            "read ECONNRESET",
            "connect ECONNREFUSED 127.0.0.1:8899",
            "socket hang up",
            "getaddrinfo EAI_AGAIN api.example.com",
            "Internal Server Error",
            "Connection terminated unexpectedly",
        ] {
            assert!(
                classify_failure(msg, None).is_retryable(),
                "expected retryable: {msg}"
            );
        }

        for msg in ["invalid account data", "custom program error: 0x1771", ""] {
            assert_eq!(classify_failure(msg, None), Classification::Fatal, "{msg}");
        }
    }

    #[test]
    fn test_structural_classification() {
        assert_eq!(
            classify(&ValidationError::EmptySecret.into()),
            Classification::Fatal
        );
        assert_eq!(
            classify(&TraderError::transaction("buy", "timed out", vec![], None)),
            Classification::Fatal
        );
        assert_eq!(
            classify(&TraderError::rpc_with_status(502, "bad gateway")),
            Classification::Retryable
        );
        assert_eq!(
            classify(&TraderError::rpc("socket hang up")),
            Classification::Retryable
        );
    }
}
