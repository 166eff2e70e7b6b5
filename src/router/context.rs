use std::sync::Arc;

use anyhow::Result;
use futures_util::lock::MutexGuard;
use log::info;

use crate::{
    core::{
        error::InteractionError,
        uri::Uri,
    },
    router::{
        realm::{
            Realm,
            RealmConfig,
            RealmManager,
        },
        router::Router,
    },
};

/// The context of a task running for a router.
///
/// Used to share ownership of the router across many tasks.
pub struct RouterContext<S>
where
    S: 'static,
{
    router: Arc<Router<S>>,
}

impl<S> RouterContext<S> {
    /// Constructs a new context wrapper around a router.
    pub fn new(router: Router<S>) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    pub fn router(&self) -> &Router<S> {
        self.router.as_ref()
    }

    /// Enters the named realm, locking the router's shared state.
    ///
    /// If the realm does not exist, it is created when the router allows realms to be
    /// auto-created. Otherwise, the realm lookup fails.
    pub async fn realm_context(&self, realm: &Uri) -> Result<RealmContext<'_, S>> {
        let mut manager = self.router.realm_manager.lock().await;
        if manager.get(realm).is_none() {
            if !self.router.config.auto_create_realms {
                return Err(InteractionError::NoSuchRealm(realm.to_string()).into());
            }
            info!("Creating realm {realm} on first use");
            manager.insert(Realm::new(RealmConfig {
                name: realm.to_string(),
                uri: realm.clone(),
            }));
        }
        Ok(RealmContext {
            context: self,
            manager,
            realm: realm.clone(),
        })
    }
}

impl<S> Clone for RouterContext<S> {
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
        }
    }
}

/// The context of one realm within a router.
///
/// Holds the realm manager lock for its whole lifetime, so all realm and session mutations made
/// through a context are serialized with every other router task.
pub struct RealmContext<'router, S>
where
    S: 'static,
{
    context: &'router RouterContext<S>,
    manager: MutexGuard<'router, RealmManager>,
    realm: Uri,
}

impl<'router, S> RealmContext<'router, S> {
    pub fn router(&self) -> &Router<S> {
        self.context.router()
    }

    pub fn manager(&self) -> &RealmManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut RealmManager {
        &mut self.manager
    }

    pub fn realm(&self) -> Result<&Realm> {
        self.manager
            .get(&self.realm)
            .ok_or_else(|| InteractionError::NoSuchRealm(self.realm.to_string()).into())
    }

    pub fn realm_mut(&mut self) -> Result<&mut Realm> {
        let realm = &self.realm;
        self.manager
            .get_mut(realm)
            .ok_or_else(|| InteractionError::NoSuchRealm(realm.to_string()).into())
    }
}
