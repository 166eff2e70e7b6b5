use std::{
    fmt::Display,
    sync::LazyLock,
};

use regex::Regex;
use serde::{
    de::{
        Unexpected,
        Visitor,
    },
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::core::error::{
    BasicError,
    InteractionError,
};

/// Error for an invalid URI.
#[derive(Debug, Error)]
#[error("invalid URI")]
pub struct InvalidUri;

/// Validates a strict URI: lowercase-alphanumeric segments separated by single dots.
pub fn validate_strict_uri<S>(uri: S) -> Result<(), InvalidUri>
where
    S: AsRef<str>,
{
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^([0-9a-z_]+\.)*([0-9a-z_]+)$").unwrap());
    if !RE.is_match(uri.as_ref()) {
        return Err(InvalidUri);
    }
    Ok(())
}

/// Validates a loose URI: any non-empty string without whitespace.
pub fn validate_loose_uri<S>(uri: S) -> Result<(), InvalidUri>
where
    S: AsRef<str>,
{
    let uri = uri.as_ref();
    if uri.is_empty() || uri.contains(char::is_whitespace) {
        return Err(InvalidUri);
    }
    Ok(())
}

/// How strictly the router validates URIs chosen by peers.
///
/// A router-wide setting. URIs always satisfy the loose rules by construction; strict mode
/// additionally constrains them to the recommended dotted-lowercase form.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    #[default]
    Strict,
    Loose,
}

impl ValidationMode {
    /// Validates a URI against this mode.
    pub fn validate(&self, uri: &Uri) -> Result<(), InvalidUri> {
        match self {
            Self::Strict => validate_strict_uri(uri),
            Self::Loose => validate_loose_uri(uri),
        }
    }
}

impl TryFrom<&str> for ValidationMode {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "strict" => Ok(Self::Strict),
            "loose" => Ok(Self::Loose),
            _ => Err("unsupported validation mode"),
        }
    }
}

/// A dot-separated identifier naming a WAMP resource, such as a realm or a topic.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Uri(String);

impl Uri {
    /// Constructs a URI directly from a value known to be valid, skipping validation.
    pub(crate) fn from_known<S>(value: S) -> Self
    where
        S: Into<String>,
    {
        Self(value.into())
    }

    /// Whether the URI falls under the `wamp.` prefix reserved for the router.
    pub fn is_reserved(&self) -> bool {
        self.0 == "wamp" || self.0.starts_with("wamp.")
    }

    /// Splits the URI into its components.
    pub fn split(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The `wamp.error.*` URI describing an error.
    pub fn for_error(error: &anyhow::Error) -> Uri {
        let component = if let Some(error) = error.downcast_ref::<InteractionError>() {
            error.uri_component()
        } else if let Some(error) = error.downcast_ref::<BasicError>() {
            error.uri_component()
        } else {
            "internal"
        };
        Uri::from_known(format!("wamp.error.{component}"))
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Uri {
    type Error = InvalidUri;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_strict_uri(&value)?;
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Uri {
    type Error = InvalidUri;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate_strict_uri(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl From<Uri> for String {
    fn from(value: Uri) -> Self {
        value.0
    }
}

struct UriVisitor;

impl<'de> Visitor<'de> for UriVisitor {
    type Value = Uri;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a URI")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        // Decoding enforces the loose shape only. Strict-mode conformance is checked by the
        // router against its configured validation mode.
        validate_loose_uri(v).map_err(|_| E::invalid_value(Unexpected::Str(v), &self))?;
        Ok(Uri(v.to_owned()))
    }
}

impl<'de> Deserialize<'de> for Uri {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(UriVisitor)
    }
}
