use crate::{
    core::{
        hash::{
            HashMap,
            HashSet,
        },
        id::Id,
        uri::Uri,
    },
    router::{
        broker::Broker,
        session::SessionHandle,
    },
};

/// Configuration for a realm hosted on a router.
#[derive(Debug, Clone)]
pub struct RealmConfig {
    pub name: String,
    pub uri: Uri,
}

/// A session attached to a realm.
pub struct RealmSession {
    pub session: SessionHandle,
}

/// A realm, which is an administrative routing namespace.
///
/// Messages never cross realms. A realm exists from router boot (or first use, when realms are
/// auto-created) until router shutdown.
pub struct Realm {
    pub config: RealmConfig,
    pub sessions: HashMap<Id, RealmSession>,
    pub broker: Broker,
}

impl Realm {
    pub fn new(config: RealmConfig) -> Self {
        Self {
            config,
            sessions: HashMap::default(),
            broker: Broker::default(),
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.config.uri
    }

    /// The number of live sessions attached to the realm.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// The owner of all realms on a router, along with the state shared across realms.
///
/// The manager is guarded by a single lock on the router, which serializes every mutation of
/// realms, sessions, subscriptions, and publications.
#[derive(Default)]
pub struct RealmManager {
    realms: HashMap<Uri, Realm>,
    publications: HashSet<Id>,
}

impl RealmManager {
    pub fn get(&self, uri: &Uri) -> Option<&Realm> {
        self.realms.get(uri)
    }

    pub fn get_mut(&mut self, uri: &Uri) -> Option<&mut Realm> {
        self.realms.get_mut(uri)
    }

    pub fn insert(&mut self, realm: Realm) {
        let uri = realm.uri().clone();
        self.realms.insert(uri, realm);
    }

    pub fn realms(&self) -> impl Iterator<Item = &Realm> {
        self.realms.values()
    }

    /// All session IDs live across the router.
    ///
    /// Session IDs are drawn from the global scope, so a new ID must not collide with any of
    /// these.
    pub fn session_ids(&self) -> HashSet<Id> {
        self.realms
            .values()
            .flat_map(|realm| realm.sessions.keys())
            .copied()
            .collect()
    }

    /// All subscription IDs live across the router.
    ///
    /// Subscription IDs are drawn from the router scope.
    pub fn subscription_ids(&self) -> HashSet<Id> {
        self.realms
            .values()
            .flat_map(|realm| realm.broker.subscription_ids())
            .collect()
    }

    /// The live publication ID set.
    ///
    /// Publication IDs are drawn from the global scope, excluding this set, so that in-flight
    /// publications never share an ID.
    pub fn publications(&self) -> &HashSet<Id> {
        &self.publications
    }

    pub fn record_publication(&mut self, id: Id) {
        self.publications.insert(id);
    }
}
