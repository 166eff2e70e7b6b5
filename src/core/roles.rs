use thiserror::Error;

use crate::core::{
    hash::HashSet,
    types::{
        Dictionary,
        Value,
    },
};

/// A role a peer may declare when establishing a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PeerRole {
    // Calls RPC endpoints.
    Caller,
    // Registers RPC endpoints.
    Callee,
    // Publishes events to topics.
    Publisher,
    // Subscribes to events for topics.
    Subscriber,
}

impl PeerRole {
    pub fn key_for_details(&self) -> &str {
        match self {
            Self::Caller => "caller",
            Self::Callee => "callee",
            Self::Publisher => "publisher",
            Self::Subscriber => "subscriber",
        }
    }
}

impl TryFrom<&str> for PeerRole {
    type Error = InvalidRoles;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "caller" => Ok(Self::Caller),
            "callee" => Ok(Self::Callee),
            "publisher" => Ok(Self::Publisher),
            "subscriber" => Ok(Self::Subscriber),
            _ => Err(InvalidRoles::UnknownRole(value.to_owned())),
        }
    }
}

/// A role the router implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouterRole {
    // Supports RPC calls.
    Dealer,
    // Supports pub/sub.
    Broker,
}

impl RouterRole {
    pub fn key_for_details(&self) -> &str {
        match self {
            Self::Dealer => "dealer",
            Self::Broker => "broker",
        }
    }
}

/// Error for an invalid `roles` dictionary in a HELLO message.
#[derive(Debug, Error)]
pub enum InvalidRoles {
    #[error("details are missing a roles dictionary")]
    Missing,
    #[error("roles dictionary is empty")]
    Empty,
    #[error("{0} is not a client role")]
    UnknownRole(String),
    #[error("features for role {0} must be a dictionary")]
    InvalidFeatures(String),
}

/// The set of roles a peer declared in its HELLO details.
#[derive(Debug, Default, Clone)]
pub struct PeerRoles {
    roles: HashSet<PeerRole>,
}

impl PeerRoles {
    /// Parses the `roles` entry of a HELLO details dictionary.
    ///
    /// The entry must be a non-empty dictionary whose keys are client roles and whose values are
    /// (possibly empty) dictionaries of role features.
    pub fn try_from_details(details: &Dictionary) -> Result<Self, InvalidRoles> {
        let roles = match details.get("roles") {
            Some(Value::Dictionary(roles)) => roles,
            _ => return Err(InvalidRoles::Missing),
        };
        if roles.is_empty() {
            return Err(InvalidRoles::Empty);
        }
        let mut parsed = HashSet::default();
        for (key, features) in roles {
            if !matches!(features, Value::Dictionary(_)) {
                return Err(InvalidRoles::InvalidFeatures(key.clone()));
            }
            parsed.insert(PeerRole::try_from(key.as_str())?);
        }
        Ok(Self { roles: parsed })
    }

    /// Checks whether the peer declared the given role.
    pub fn contains(&self, role: PeerRole) -> bool {
        self.roles.contains(&role)
    }
}

/// Renders the router's advertised roles as a details dictionary value.
pub fn router_roles_details<I>(roles: I) -> Value
where
    I: IntoIterator<Item = RouterRole>,
{
    let mut details = Dictionary::default();
    for role in roles {
        details.insert(
            role.key_for_details().to_owned(),
            Value::Dictionary(Dictionary::default()),
        );
    }
    Value::Dictionary(details)
}

#[cfg(test)]
mod roles_test {
    use crate::core::{
        roles::{
            router_roles_details,
            InvalidRoles,
            PeerRole,
            PeerRoles,
            RouterRole,
        },
        types::{
            Dictionary,
            Value,
        },
    };

    fn details_with_roles(roles: Value) -> Dictionary {
        Dictionary::from_iter([("roles".to_owned(), roles)])
    }

    #[test]
    fn parses_declared_roles() {
        let details = details_with_roles(Value::Dictionary(Dictionary::from_iter([
            (
                "publisher".to_owned(),
                Value::Dictionary(Dictionary::default()),
            ),
            (
                "subscriber".to_owned(),
                Value::Dictionary(Dictionary::default()),
            ),
        ])));
        assert_matches::assert_matches!(PeerRoles::try_from_details(&details), Ok(roles) => {
            assert!(roles.contains(PeerRole::Publisher));
            assert!(roles.contains(PeerRole::Subscriber));
            assert!(!roles.contains(PeerRole::Caller));
        });
    }

    #[test]
    fn rejects_missing_or_empty_roles() {
        assert_matches::assert_matches!(
            PeerRoles::try_from_details(&Dictionary::default()),
            Err(InvalidRoles::Missing)
        );
        assert_matches::assert_matches!(
            PeerRoles::try_from_details(&details_with_roles(Value::Dictionary(
                Dictionary::default()
            ))),
            Err(InvalidRoles::Empty)
        );
    }

    #[test]
    fn rejects_unknown_roles_and_non_dictionary_features() {
        assert_matches::assert_matches!(
            PeerRoles::try_from_details(&details_with_roles(Value::Dictionary(
                Dictionary::from_iter([(
                    "broker".to_owned(),
                    Value::Dictionary(Dictionary::default()),
                )])
            ))),
            Err(InvalidRoles::UnknownRole(role)) => {
                assert_eq!(role, "broker");
            }
        );
        assert_matches::assert_matches!(
            PeerRoles::try_from_details(&details_with_roles(Value::Dictionary(
                Dictionary::from_iter([("publisher".to_owned(), Value::Bool(true))])
            ))),
            Err(InvalidRoles::InvalidFeatures(role)) => {
                assert_eq!(role, "publisher");
            }
        );
    }

    #[test]
    fn renders_router_roles() {
        assert_matches::assert_matches!(
            router_roles_details([RouterRole::Broker]),
            Value::Dictionary(details) => {
                assert_matches::assert_matches!(
                    details.get("broker"),
                    Some(Value::Dictionary(features)) => {
                        assert!(features.is_empty());
                    }
                );
                assert!(!details.contains_key("dealer"));
            }
        );
    }
}
