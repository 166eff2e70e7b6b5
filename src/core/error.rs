use thiserror::Error;

/// A basic error that occurs while processing a WAMP message.
#[derive(Debug, Error)]
pub enum BasicError {
    /// A generic resource was not found.
    ///
    /// WAMP defines standard URIs for not finding specific resource types. This error should only
    /// be used when the standard URI cannot be used.
    #[error("{0}")]
    NotFound(String),
    /// An invalid argument was passed.
    #[error("{0}")]
    InvalidArgument(String),
    /// The operation is not allowed based on process configuration or declared roles.
    #[error("{0}")]
    NotAllowed(String),
    /// Some internal error occurred.
    ///
    /// Should only be used when there is no other error variant that describes the error, since
    /// the message is very vague and not very useful for debugging.
    #[error("{0}")]
    Internal(String),
}

impl BasicError {
    /// The trailing URI component for the error.
    pub fn uri_component(&self) -> &str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotAllowed(_) => "not_allowed",
            Self::Internal(_) => "internal",
        }
    }
}

/// An interaction error that occurs while processing a WAMP message.
///
/// Interaction errors are clearly defined in the WAMP standard and are reserved for errors that
/// peers must be able to parse easily.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// The incoming message violates the WAMP protocol.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// The subscription being referenced does not exist.
    #[error("no such subscription")]
    NoSuchSubscription,
    /// The realm being referenced does not exist.
    #[error("The realm '{0}' does not exist.")]
    NoSuchRealm(String),
    /// The URI in the message is not valid under the router's validation mode.
    #[error("invalid URI: {0}")]
    InvalidUri(String),
}

impl InteractionError {
    /// The trailing URI component for the error.
    pub fn uri_component(&self) -> &str {
        match self {
            Self::ProtocolViolation(_) => "protocol_violation",
            Self::NoSuchSubscription => "no_such_subscription",
            Self::NoSuchRealm(_) => "no_such_realm",
            Self::InvalidUri(_) => "invalid_uri",
        }
    }
}

#[cfg(test)]
mod error_test {
    use crate::core::{
        error::{
            BasicError,
            InteractionError,
        },
        uri::Uri,
    };

    #[test]
    fn maps_errors_to_uris() {
        assert_eq!(
            Uri::for_error(&BasicError::NotAllowed("peer is not a subscriber".to_owned()).into())
                .as_ref(),
            "wamp.error.not_allowed"
        );
        assert_eq!(
            Uri::for_error(&InteractionError::NoSuchRealm("myapp".to_owned()).into()).as_ref(),
            "wamp.error.no_such_realm"
        );
        assert_eq!(
            Uri::for_error(&InteractionError::NoSuchSubscription.into()).as_ref(),
            "wamp.error.no_such_subscription"
        );
        assert_eq!(
            Uri::for_error(&anyhow::Error::msg("anything else")).as_ref(),
            "wamp.error.internal"
        );
    }

    #[test]
    fn no_such_realm_names_the_realm() {
        assert_eq!(
            InteractionError::NoSuchRealm("unknown.realm".to_owned()).to_string(),
            "The realm 'unknown.realm' does not exist."
        );
    }
}
