use std::fmt::Display;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::lock::Mutex;
use serde::{
    de::{
        Unexpected,
        Visitor,
    },
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::core::{
    error::BasicError,
    hash::HashSet,
};

/// An identifier used across WAMP messages.
///
/// IDs are restricted to 53 bits so that their values survive a round trip through IEEE-754
/// doubles, which is all JSON guarantees.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Id(u64);

impl Id {
    pub const MIN: u64 = 1;
    pub const MAX: u64 = (1 << 53) - 1;
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error)]
#[error("{value} is out of range for IDs")]
pub struct IdOutOfRange {
    value: u64,
}

impl IdOutOfRange {
    fn new(value: u64) -> Self {
        Self { value }
    }
}

impl TryFrom<u64> for Id {
    type Error = IdOutOfRange;
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value < Self::MIN || value > Self::MAX {
            Err(IdOutOfRange::new(value))
        } else {
            Ok(Id(value))
        }
    }
}

impl From<Id> for u64 {
    fn from(value: Id) -> Self {
        value.0
    }
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = Id;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "an unsigned integer in the range [{}, {}]",
            Id::MIN,
            Id::MAX
        )
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Id::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_u64(IdVisitor)
    }
}

/// An allocator for [`Id`]s within one scope (global, router, or session).
///
/// The allocator does not track liveness itself. Callers pass the set of IDs currently live in
/// the scope, and the allocator guarantees the returned ID is not among them.
#[async_trait]
pub trait IdAllocator: Send + Sync {
    async fn generate_id(&self, excluding: &HashSet<Id>) -> Result<Id>;
}

/// An [`IdAllocator`] that draws IDs uniformly at random, resampling on collision.
#[derive(Default)]
pub struct RandomIdAllocator {}

#[async_trait]
impl IdAllocator for RandomIdAllocator {
    async fn generate_id(&self, excluding: &HashSet<Id>) -> Result<Id> {
        for _ in 0..64 {
            let id = Id(rand::random::<u64>() % Id::MAX + 1);
            if !excluding.contains(&id) {
                return Ok(id);
            }
        }
        Err(BasicError::Internal("id scope exhausted random sampling".to_owned()).into())
    }
}

/// An [`IdAllocator`] that hands out sequential IDs, skipping live ones.
#[derive(Default)]
pub struct SequentialIdAllocator {
    next: Mutex<u64>,
}

#[async_trait]
impl IdAllocator for SequentialIdAllocator {
    async fn generate_id(&self, excluding: &HashSet<Id>) -> Result<Id> {
        let mut lock = self.next.lock().await;
        loop {
            *lock = *lock % Id::MAX + 1;
            let id = Id::try_from(*lock)?;
            if !excluding.contains(&id) {
                return Ok(id);
            }
        }
    }
}

#[cfg(test)]
mod id_test {
    use crate::core::{
        hash::HashSet,
        id::{
            Id,
            IdAllocator,
            RandomIdAllocator,
            SequentialIdAllocator,
        },
    };

    #[test]
    fn fails_deserialization_out_of_range() {
        assert_matches::assert_matches!(serde_json::from_str::<Id>(r#"0"#), Err(err) => {
            assert!(err.to_string().contains("expected an unsigned integer in the range"));
        });
        assert_matches::assert_matches!(serde_json::from_str::<Id>(r#"9007199254740992"#), Err(err) => {
            assert!(err.to_string().contains("expected an unsigned integer in the range"));
        });
    }

    #[test]
    fn deserializes_max_id() {
        assert_matches::assert_matches!(
            serde_json::from_str::<Id>(r#"9007199254740991"#),
            Ok(id) => {
                assert_eq!(u64::from(id), Id::MAX);
            }
        );
    }

    #[tokio::test]
    async fn random_allocator_avoids_excluded_ids() {
        let allocator = RandomIdAllocator::default();
        let mut live = HashSet::default();
        for _ in 0..100 {
            let id = allocator.generate_id(&live).await.unwrap();
            assert!(!live.contains(&id));
            live.insert(id);
        }
    }

    #[tokio::test]
    async fn sequential_allocator_skips_excluded_ids() {
        let allocator = SequentialIdAllocator::default();
        let live = HashSet::from_iter([Id::try_from(2).unwrap()]);
        assert_matches::assert_matches!(allocator.generate_id(&live).await, Ok(id) => {
            assert_eq!(u64::from(id), 1);
        });
        assert_matches::assert_matches!(allocator.generate_id(&live).await, Ok(id) => {
            assert_eq!(u64::from(id), 3);
        });
    }
}
