use holoplay_cbor::Value;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] holoplay_transport::TransportError),

    /// A request did not complete successfully.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The driver did not answer in time.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The connection is closed.
    #[error("client disconnected")]
    Disconnected,
}

/// Why an outcome handle completed without a successful reply.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    /// The driver replied with a non-zero `error` field. Carries the full reply.
    #[error("driver rejected request ({})", error_field(.0))]
    Rejected(Value),

    /// The request was cancelled before a reply arrived.
    #[error("request cancelled")]
    Cancelled,

    /// The retransmission cap was reached with no reply.
    #[error("no reply after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// The correlator went away before a reply arrived.
    #[error("request abandoned before a reply arrived")]
    Abandoned,
}

impl RequestError {
    /// The rejected reply, if this is a driver rejection.
    pub fn reply(&self) -> Option<&Value> {
        match self {
            RequestError::Rejected(reply) => Some(reply),
            _ => None,
        }
    }
}

fn error_field(reply: &Value) -> String {
    match reply.get("error") {
        Some(Value::Integer(code)) => format!("error {code}"),
        Some(other) => format!("error field is {}", other.kind()),
        None => "no error field".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_names_error_code() {
        let err = RequestError::Rejected(Value::map([("error", 2)]));
        assert_eq!(err.to_string(), "driver rejected request (error 2)");

        let err = RequestError::Rejected(Value::from("nope"));
        assert_eq!(err.to_string(), "driver rejected request (no error field)");
    }
}
