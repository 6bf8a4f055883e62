use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::data_models::{Entitlement, Identity};
use crate::error::SessionError;
use crate::storage::{KeyValueStore, keys, lock};

pub type Listener = Arc<dyn Fn(Option<&Identity>) + Send + Sync>;

type ListenerMap = Mutex<BTreeMap<u64, Listener>>;

/// Claims we read out of the provider's credential payload.
#[derive(Deserialize)]
struct CredentialClaims {
    name: String,
    email: String,
    #[serde(default)]
    picture: String,
}

/// Decode the payload segment of a JWT-shaped credential.
///
/// The signature segment is never checked.
pub fn decode_credential(raw: &str) -> Result<Identity, SessionError> {
    let payload = raw
        .trim()
        .split('.')
        .nth(1)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| SessionError::InvalidCredential("missing payload segment".into()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SessionError::InvalidCredential(format!("bad base64: {e}")))?;

    let claims: CredentialClaims = serde_json::from_slice(&bytes)
        .map_err(|e| SessionError::InvalidCredential(format!("bad claims: {e}")))?;

    Ok(Identity::new(claims.name, claims.email, claims.picture))
}

/// Build an unsigned credential carrying `identity`. Demo and test use only.
pub fn encode_demo_credential(identity: &Identity) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "name": identity.name,
        "email": identity.email,
        "picture": identity.picture,
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.")
}

/// Removes its listener when unsubscribed or dropped.
#[must_use = "dropping the handle removes the listener"]
pub struct ListenerHandle {
    id: u64,
    listeners: Weak<ListenerMap>,
}

impl ListenerHandle {
    pub fn unsubscribe(self) {}
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).remove(&self.id);
        }
    }
}

/// Signed-in identity and subscription flag, persisted in a [`KeyValueStore`].
pub struct SessionStore {
    store: Box<dyn KeyValueStore>,
    listeners: Arc<ListenerMap>,
    next_listener_id: AtomicU64,
}

impl SessionStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            listeners: Arc::new(Mutex::new(BTreeMap::new())),
            next_listener_id: AtomicU64::new(0),
        }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        let raw = match self.store.get(keys::USER) {
            Ok(raw) => raw?,
            Err(e) => {
                log::error!("failed to read stored identity: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                log::error!("stored identity is corrupt, ignoring it: {e}");
                None
            }
        }
    }

    pub fn sign_in(&self, raw_credential: &str) -> Result<Identity, SessionError> {
        let identity = decode_credential(raw_credential)?;
        let serialized = serde_json::to_string(&identity)
            .map_err(|e| SessionError::Storage(e.into()))?;
        self.store.set(keys::USER, &serialized)?;
        log::info!("signed in as {}", identity.email);
        self.notify_listeners();
        Ok(identity)
    }

    /// Clears identity and subscription. Emits a change event even when nobody was signed in.
    pub fn sign_out(&self) -> Result<(), SessionError> {
        self.store.remove(keys::USER)?;
        self.store.remove(keys::SUBSCRIPTION)?;
        log::info!("signed out");
        self.notify_listeners();
        Ok(())
    }

    pub fn subscribe(&self) -> Result<(), SessionError> {
        if self.current_identity().is_none() {
            return Err(SessionError::NotSignedIn);
        }
        self.store.set(keys::SUBSCRIPTION, "true")?;
        log::info!("subscription activated");
        self.notify_listeners();
        Ok(())
    }

    pub fn is_subscribed(&self) -> bool {
        match self.store.get(keys::SUBSCRIPTION) {
            Ok(flag) => flag.is_some(),
            Err(e) => {
                log::error!("failed to read subscription flag: {e}");
                false
            }
        }
    }

    pub fn entitlement(&self, free_searches_used: u32) -> Entitlement {
        Entitlement {
            signed_in: self.current_identity().is_some(),
            subscribed: self.is_subscribed(),
            free_searches_used,
        }
    }

    /// Register `listener`. It is called right away with the current identity,
    /// then after every state change until the returned handle goes away.
    pub fn on_change<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(Option<&Identity>) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener = Arc::new(listener);
        lock(&self.listeners).insert(id, listener.clone());

        listener(self.current_identity().as_ref());

        ListenerHandle {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    fn notify_listeners(&self) {
        let identity = self.current_identity();
        // snapshot so listeners may drop handles without deadlocking
        let listeners: Vec<Listener> = lock(&self.listeners).values().cloned().collect();
        for listener in listeners {
            listener(identity.as_ref());
        }
    }
}
