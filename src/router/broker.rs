use anyhow::Result;
use log::error;

use crate::core::{
    error::{
        BasicError,
        InteractionError,
    },
    hash::{
        HashMap,
        HashSet,
    },
    id::Id,
    uri::Uri,
};

/// A subscription, coalescing every subscriber of one topic in one realm.
///
/// All peers subscribed to the same topic share one subscription ID. A subscription with no
/// subscribers is deleted, so the subscriber set is never empty.
#[derive(Debug)]
pub struct Subscription {
    pub id: Id,
    pub topic: Uri,
    /// Subscribed sessions, by session ID.
    pub subscribers: HashSet<Id>,
}

/// The pub/sub state of one realm.
///
/// Subscriptions are indexed both by ID (the key peers use to unsubscribe) and by topic (the
/// coalescing key for subscribe and publish). The two tables always agree; a mismatch is an
/// internal invariant violation that refuses the operation instead of corrupting state.
#[derive(Default)]
pub struct Broker {
    subscriptions: HashMap<Id, Subscription>,
    subscriptions_by_topic: HashMap<Uri, Id>,
}

impl Broker {
    /// The ID of the subscription covering the topic, if any.
    pub fn subscription_id_for_topic(&self, topic: &Uri) -> Result<Option<Id>> {
        let id = match self.subscriptions_by_topic.get(topic) {
            Some(id) => *id,
            None => return Ok(None),
        };
        if !self.subscriptions.contains_key(&id) {
            error!("Subscription {id} for topic {topic} is indexed but does not exist");
            return Err(
                BasicError::Internal(format!("subscription table out of sync for {topic}")).into(),
            );
        }
        Ok(Some(id))
    }

    /// The subscription covering the topic, if any.
    pub fn subscription_for_topic(&self, topic: &Uri) -> Result<Option<&Subscription>> {
        Ok(self
            .subscription_id_for_topic(topic)?
            .and_then(|id| self.subscriptions.get(&id)))
    }

    /// Adds a session to an existing subscription.
    ///
    /// Idempotent: subscribing to the same topic twice leaves the subscription unchanged.
    pub fn add_subscriber(&mut self, id: Id, session: Id) -> Result<()> {
        let subscription = self
            .subscriptions
            .get_mut(&id)
            .ok_or(InteractionError::NoSuchSubscription)?;
        subscription.subscribers.insert(session);
        Ok(())
    }

    /// Creates a new subscription for a topic with one initial subscriber.
    pub fn insert_subscription(&mut self, id: Id, topic: Uri, session: Id) {
        self.subscriptions_by_topic.insert(topic.clone(), id);
        self.subscriptions.insert(
            id,
            Subscription {
                id,
                topic,
                subscribers: HashSet::from_iter([session]),
            },
        );
    }

    /// Removes a session from a subscription, deleting the subscription if it has no subscribers
    /// left.
    ///
    /// The session need not be a subscriber; removing an absent session is a no-op. An unknown
    /// subscription ID is an error.
    pub fn unsubscribe(&mut self, session: Id, id: Id) -> Result<()> {
        let subscription = self
            .subscriptions
            .get_mut(&id)
            .ok_or(InteractionError::NoSuchSubscription)?;
        subscription.subscribers.remove(&session);
        if subscription.subscribers.is_empty() {
            let topic = subscription.topic.clone();
            self.subscriptions.remove(&id);
            self.subscriptions_by_topic.remove(&topic);
        }
        Ok(())
    }

    /// Removes a session from every subscription, deleting subscriptions left without
    /// subscribers.
    ///
    /// Runs when a session closes or its peer disconnects.
    pub fn purge_session(&mut self, session: Id) {
        let mut emptied = Vec::new();
        for subscription in self.subscriptions.values_mut() {
            subscription.subscribers.remove(&session);
            if subscription.subscribers.is_empty() {
                emptied.push((subscription.id, subscription.topic.clone()));
            }
        }
        for (id, topic) in emptied {
            self.subscriptions.remove(&id);
            self.subscriptions_by_topic.remove(&topic);
        }
    }

    /// All live subscription IDs in the realm.
    pub fn subscription_ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.subscriptions.keys().copied()
    }

    /// The number of live subscriptions in the realm.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

#[cfg(test)]
mod broker_test {
    use crate::{
        core::{
            error::InteractionError,
            id::Id,
            uri::Uri,
        },
        router::broker::Broker,
    };

    fn id(value: u64) -> Id {
        Id::try_from(value).unwrap()
    }

    fn topic() -> Uri {
        Uri::try_from("com.myapp.mytopic1").unwrap()
    }

    #[test]
    fn coalesces_subscribers_of_one_topic() {
        let mut broker = Broker::default();
        broker.insert_subscription(id(100), topic(), id(1));
        assert_matches::assert_matches!(broker.subscription_id_for_topic(&topic()), Ok(Some(sub)) => {
            assert_eq!(sub, id(100));
        });
        assert_matches::assert_matches!(broker.add_subscriber(id(100), id(2)), Ok(()));
        assert_matches::assert_matches!(broker.subscription_for_topic(&topic()), Ok(Some(subscription)) => {
            assert_eq!(subscription.subscribers.len(), 2);
        });
        assert_eq!(broker.subscription_count(), 1);
    }

    #[test]
    fn resubscribing_is_idempotent() {
        let mut broker = Broker::default();
        broker.insert_subscription(id(100), topic(), id(1));
        assert_matches::assert_matches!(broker.add_subscriber(id(100), id(1)), Ok(()));
        assert_matches::assert_matches!(broker.subscription_for_topic(&topic()), Ok(Some(subscription)) => {
            assert_eq!(subscription.subscribers.len(), 1);
        });
    }

    #[test]
    fn deletes_subscription_when_last_subscriber_leaves() {
        let mut broker = Broker::default();
        broker.insert_subscription(id(100), topic(), id(1));
        assert_matches::assert_matches!(broker.add_subscriber(id(100), id(2)), Ok(()));
        assert_matches::assert_matches!(broker.unsubscribe(id(1), id(100)), Ok(()));
        assert_matches::assert_matches!(broker.subscription_id_for_topic(&topic()), Ok(Some(_)));
        assert_matches::assert_matches!(broker.unsubscribe(id(2), id(100)), Ok(()));
        assert_matches::assert_matches!(broker.subscription_id_for_topic(&topic()), Ok(None));
        assert_eq!(broker.subscription_count(), 0);
    }

    #[test]
    fn unsubscribe_with_unknown_id_fails() {
        let mut broker = Broker::default();
        assert_matches::assert_matches!(broker.unsubscribe(id(1), id(100)), Err(err) => {
            assert_matches::assert_matches!(
                err.downcast::<InteractionError>(),
                Ok(InteractionError::NoSuchSubscription)
            );
        });
    }

    #[test]
    fn unsubscribe_by_non_subscriber_is_a_no_op() {
        let mut broker = Broker::default();
        broker.insert_subscription(id(100), topic(), id(1));
        assert_matches::assert_matches!(broker.unsubscribe(id(2), id(100)), Ok(()));
        assert_matches::assert_matches!(broker.subscription_for_topic(&topic()), Ok(Some(subscription)) => {
            assert_eq!(subscription.subscribers.len(), 1);
        });
    }

    #[test]
    fn purges_session_from_all_subscriptions() {
        let mut broker = Broker::default();
        let other_topic = Uri::try_from("com.myapp.mytopic2").unwrap();
        broker.insert_subscription(id(100), topic(), id(1));
        broker.insert_subscription(id(101), other_topic.clone(), id(1));
        assert_matches::assert_matches!(broker.add_subscriber(id(100), id(2)), Ok(()));

        broker.purge_session(id(1));

        // The shared subscription survives with the remaining subscriber.
        assert_matches::assert_matches!(broker.subscription_for_topic(&topic()), Ok(Some(subscription)) => {
            assert!(subscription.subscribers.contains(&id(2)));
            assert_eq!(subscription.subscribers.len(), 1);
        });
        // The solo subscription is gone.
        assert_matches::assert_matches!(broker.subscription_id_for_topic(&other_topic), Ok(None));
    }
}
