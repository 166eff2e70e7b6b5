use anyhow::Error;

use crate::{
    core::{
        close::CloseReason,
        types::{
            Dictionary,
            Value,
        },
        uri::Uri,
    },
    message::message::{
        AbortMessage,
        ErrorMessage,
        GoodbyeMessage,
        Message,
    },
};

/// Builds the ABORT message describing an error, with the human-readable text in the details.
pub fn abort_message_for_error(error: &Error) -> Message {
    let mut details = Dictionary::default();
    details.insert("message".to_owned(), Value::String(error.to_string()));
    Message::Abort(AbortMessage {
        details,
        reason: Uri::for_error(error),
    })
}

/// Builds a GOODBYE message carrying the close reason URI.
pub fn goodbye_with_close_reason(close_reason: CloseReason) -> Message {
    Message::Goodbye(GoodbyeMessage {
        details: Dictionary::default(),
        reason: close_reason.uri(),
    })
}

/// The GOODBYE reply confirming the end of a session.
pub fn goodbye_and_out() -> Message {
    goodbye_with_close_reason(CloseReason::GoodbyeAndOut)
}

/// Builds the ERROR reply for a failed request.
///
/// The request type and request ID are copied from the offending message so the peer can
/// correlate the reply.
pub fn error_for_request(message: &Message, error: &Error) -> Message {
    Message::Error(ErrorMessage {
        request_type: message.tag(),
        request: message.request_id().unwrap_or_default(),
        details: Dictionary::default(),
        error: Uri::for_error(error),
        ..Default::default()
    })
}
