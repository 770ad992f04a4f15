//! Maps what a transport observed onto a typed outcome.
//!
//! # Design
//! `classify` is a pure function of the payload, the transport error and the
//! status code. The checks run in a fixed order:
//!
//! 1. 2xx is a success, whatever else came along.
//! 2. Any transport error on a non-2xx response is `Unknown`.
//! 3. A 4xx with a UTF-8 payload is surfaced verbatim as `WithPayload`.
//! 4. Everything else is `Unknown`.

use crate::error::{RequestError, TransportError};

/// Classified result of one exchange: the payload on success.
pub type Outcome = Result<Option<Vec<u8>>, RequestError>;

pub fn classify(body: Option<Vec<u8>>, error: Option<TransportError>, status: u16) -> Outcome {
    if (200..=299).contains(&status) {
        return Ok(body);
    }

    if error.is_some() {
        return Err(RequestError::Unknown);
    }

    match body {
        Some(body) if (400..=499).contains(&status) => match std::str::from_utf8(&body) {
            Ok(text) => {
                tracing::debug!(status, payload = text, "client error with payload");
                Err(RequestError::WithPayload { body, cause: error })
            }
            Err(_) => Err(RequestError::Unknown),
        },
        _ => Err(RequestError::Unknown),
    }
}
