//! Multi-device scenarios run in process against the real method handlers.

use keeper_client::ClientError;
use keeper_core::{SecretId, SecretType};
use keeper_integration_tests::{codec, device, memory_registry, registry_over};
use keeper_secrets::{CachedSecret, SecretContent};
use keeper_server::SqliteSecretStore;
use std::sync::Arc;

fn body(record: &CachedSecret) -> String {
    match record {
        CachedSecret::Text(t) => t.text.expose_secret().to_string(),
        other => panic!("expected a text secret, got {other:?}"),
    }
}

#[tokio::test]
async fn test_note_hello_world_with_stale_second_device() {
    let registry = memory_registry().await;
    let laptop = device(&registry, "alice", codec(1));
    let phone = device(&registry, "alice", codec(1));

    let id = laptop
        .create("note", SecretContent::text("hello"))
        .await
        .unwrap();
    assert_eq!(id, SecretId::new(1));

    let fresh = laptop.get(id).await.unwrap();
    assert_eq!(body(&fresh), "hello");
    let t1 = fresh.updated_at();

    // the phone read the note before the laptop's edit
    let phone_copy = phone.get(id).await.unwrap();
    assert_eq!(phone_copy.updated_at(), t1);

    laptop
        .edit_known(id, "note", SecretContent::text("world"), t1, false)
        .await
        .unwrap();
    let t2 = laptop.get(id).await.unwrap().updated_at();
    assert!(t2 > t1);

    let stale = phone
        .edit_known(id, "note", SecretContent::text("from phone"), t1, false)
        .await;
    assert!(matches!(stale, Err(ClientError::VersionConflict(_))));
    let current = laptop.get(id).await.unwrap();
    assert_eq!(body(&current), "world");
    assert_eq!(current.updated_at(), t2);

    // the conflict resynced the phone's cache to the laptop's edit
    let cached = phone.cache().get(SecretType::Text, id).await.unwrap();
    assert_eq!(body(&cached), "world");

    phone
        .edit_known(id, "note", SecretContent::text("from phone"), t1, true)
        .await
        .unwrap();
    let forced = laptop.get(id).await.unwrap();
    assert_eq!(body(&forced), "from phone");
    assert!(forced.updated_at() > t2);
}

#[tokio::test]
async fn test_owners_are_isolated() {
    let registry = memory_registry().await;
    let alice = device(&registry, "alice", codec(1));
    let bob = device(&registry, "bob", codec(2));

    let id = alice
        .create("bank", SecretContent::login_password("alice", "s3cret"))
        .await
        .unwrap();

    assert!(matches!(bob.get(id).await, Err(ClientError::NotFound(_))));
    assert!(matches!(bob.delete(id).await, Err(ClientError::NotFound(_))));
    assert!(matches!(
        bob.edit(id, "mine", SecretContent::login_password("bob", "x"), true)
            .await,
        Err(ClientError::NotFound(_))
    ));
    assert!(bob.list(SecretType::LoginPassword).await.unwrap().is_empty());

    // alice's secret survived bob's attempts
    assert_eq!(alice.get(id).await.unwrap().title(), "bank");
}

#[tokio::test]
async fn test_soft_delete_hides_from_get_but_not_from_listing() {
    let registry = memory_registry().await;
    let laptop = device(&registry, "alice", codec(1));
    let phone = device(&registry, "alice", codec(1));

    let keep = laptop
        .create("keep", SecretContent::text("a"))
        .await
        .unwrap();
    let dropped = laptop
        .create("drop", SecretContent::text("b"))
        .await
        .unwrap();
    phone.sync_engine().sync_all().await;

    laptop.delete(dropped).await.unwrap();
    assert!(matches!(laptop.get(dropped).await, Err(ClientError::NotFound(_))));
    assert!(laptop.get(keep).await.is_ok());

    // the phone still serves its cached copy until it syncs
    let before = phone.cache().get(SecretType::Text, dropped).await.unwrap();
    assert!(!before.is_deleted());

    phone.sync_engine().sync_all().await;
    let listed = phone.list(SecretType::Text).await.unwrap();
    assert_eq!(listed.len(), 2);
    let gone = listed.iter().find(|r| r.id() == dropped).unwrap();
    assert!(gone.is_deleted());
    assert_eq!(gone.title(), "");

    // deleting again is not an error
    laptop.delete(dropped).await.unwrap();
}

#[tokio::test]
async fn test_foreign_key_items_are_skipped_during_sync() {
    let registry = memory_registry().await;
    let good = device(&registry, "alice", codec(1));
    let misconfigured = device(&registry, "alice", codec(9));

    let readable = good
        .create("readable", SecretContent::text("ok"))
        .await
        .unwrap();
    let unreadable = misconfigured
        .create("unreadable", SecretContent::text("??"))
        .await
        .unwrap();

    let report = good.sync_engine().sync_all().await;
    let text = &report.synced[&SecretType::Text];
    assert_eq!(text.synced, 1);
    assert_eq!(text.skipped[0].id, unreadable);
    assert!(good.cache().get(SecretType::Text, readable).await.is_some());

    assert!(matches!(
        good.get(unreadable).await,
        Err(ClientError::Decode(_))
    ));
}

#[tokio::test]
async fn test_card_and_binary_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteSecretStore::open(dir.path().join("keeper.db"))
        .await
        .unwrap();
    let registry = registry_over(Arc::new(store)).await;
    let client = device(&registry, "alice", codec(4));

    let card = client
        .create(
            "visa",
            SecretContent::card("4111111111111111", "123", "12/30"),
        )
        .await
        .unwrap();
    match client.get(card).await.unwrap() {
        CachedSecret::Card(c) => {
            assert_eq!(c.card_number.expose_secret(), "4111111111111111");
            assert_eq!(c.expiry, "12/30");
        }
        other => panic!("expected a card, got {other:?}"),
    }

    let source = dir.path().join("photo.jpg");
    let target = dir.path().join("restored.jpg");
    let bytes: Vec<u8> = (0..=255).collect();
    std::fs::write(&source, &bytes).unwrap();

    let blob = client.create_binary("photo", &source).await.unwrap();
    client.get_binary(blob, &target).await.unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), bytes);
    assert!(matches!(client.get(blob).await, Err(ClientError::WrongMethod(_))));
    assert!(matches!(
        client.list(SecretType::Binary).await,
        Err(ClientError::WrongMethod(_))
    ));
    assert_eq!(client.list_binary().await.unwrap().len(), 1);
}
