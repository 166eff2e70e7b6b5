use crate::core::uri::Uri;

/// Why a WAMP session is being closed.
///
/// Each reason maps to a standard `wamp.close.*` URI carried in the GOODBYE message.
#[derive(Debug, Default, Clone, Copy)]
pub enum CloseReason {
    #[default]
    Normal,
    SystemShutdown,
    CloseRealm,
    Killed,
    GoodbyeAndOut,
}

impl CloseReason {
    /// URI for the close reason.
    pub fn uri(&self) -> Uri {
        let component = match self {
            Self::Normal => "normal",
            Self::SystemShutdown => "system_shutdown",
            Self::CloseRealm => "close_realm",
            Self::Killed => "killed",
            Self::GoodbyeAndOut => "goodbye_and_out",
        };
        Uri::from_known(format!("wamp.close.{component}"))
    }
}

#[cfg(test)]
mod close_test {
    use crate::core::close::CloseReason;

    #[test]
    fn maps_reasons_to_uris() {
        assert_eq!(
            CloseReason::GoodbyeAndOut.uri().as_ref(),
            "wamp.close.goodbye_and_out"
        );
        assert_eq!(
            CloseReason::SystemShutdown.uri().as_ref(),
            "wamp.close.system_shutdown"
        );
    }
}
