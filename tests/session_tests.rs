use std::sync::{Arc, Mutex};

use metube::data_models::Identity;
use metube::error::SessionError;
use metube::session::{SessionStore, encode_demo_credential};
use metube::storage::{FileStore, KeyValueStore, MemoryStore, keys};

fn identity() -> Identity {
    Identity::new(
        "Ravi".to_string(),
        "ravi@example.com".to_string(),
        "https://example.com/ravi.png".to_string(),
    )
}

#[test]
fn test_subscribe_without_identity_fails() {
    let session = SessionStore::new(Box::new(MemoryStore::new()));
    let events = Arc::new(Mutex::new(0));
    let events_clone = events.clone();
    let _handle = session.on_change(move |_| *events_clone.lock().unwrap() += 1);

    let err = session.subscribe().unwrap_err();
    assert!(matches!(err, SessionError::NotSignedIn));
    assert!(!session.is_subscribed());
    assert_eq!(*events.lock().unwrap(), 1);
}

#[test]
fn test_sign_out_clears_everything() {
    let session = SessionStore::new(Box::new(MemoryStore::new()));
    session.sign_in(&encode_demo_credential(&identity())).unwrap();
    session.subscribe().unwrap();
    assert!(session.is_subscribed());
    assert_eq!(session.current_identity(), Some(identity()));

    session.sign_out().unwrap();
    assert!(!session.is_subscribed());
    assert_eq!(session.current_identity(), None);

    // signing out twice is fine
    session.sign_out().unwrap();
}

#[test]
fn test_sign_in_replaces_identity_wholesale() {
    let session = SessionStore::new(Box::new(MemoryStore::new()));
    session.sign_in(&encode_demo_credential(&identity())).unwrap();

    let other = Identity::new("Mei".to_string(), "mei@example.com".to_string(), String::new());
    session.sign_in(&encode_demo_credential(&other)).unwrap();
    assert_eq!(session.current_identity(), Some(other));
}

#[test]
fn test_file_backed_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    {
        let session = SessionStore::new(Box::new(FileStore::open(&path).unwrap()));
        session.sign_in(&encode_demo_credential(&identity())).unwrap();
        session.subscribe().unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get(keys::SUBSCRIPTION).unwrap().as_deref(), Some("true"));
    assert!(store.get(keys::USER).unwrap().is_some());

    let session = SessionStore::new(Box::new(store));
    assert_eq!(session.current_identity(), Some(identity()));
    assert!(session.is_subscribed());

    session.sign_out().unwrap();
    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get(keys::USER).unwrap(), None);
    assert_eq!(store.get(keys::SUBSCRIPTION).unwrap(), None);
}

#[test]
fn test_listener_sees_current_identity_first() {
    let session = SessionStore::new(Box::new(MemoryStore::new()));
    session.sign_in(&encode_demo_credential(&identity())).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let handle = session.on_change(move |identity| {
        seen_clone.lock().unwrap().push(identity.cloned());
    });
    session.sign_out().unwrap();
    drop(handle);
    session.sign_in(&encode_demo_credential(&identity())).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![Some(identity()), None]);
}
