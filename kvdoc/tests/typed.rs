mod common;

use common::memory_store;
use kvdoc::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    created_at: Option<bson::DateTime>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<bson::DateTime>,
    name: String,
    age: i32,
}

impl Document for User {
    fn collection_name() -> &'static str {
        "users"
    }
}

impl User {
    fn new(name: &str, age: i32) -> Self {
        Self { id: None, created_at: None, updated_at: None, name: name.to_string(), age }
    }
}

#[tokio::test]
async fn typed_collection_round_trips_documents() {
    let store = memory_store();
    let users = store.typed_collection::<User>();
    assert_eq!(users.name(), "users");

    let mut forged = User::new("Alice", 30);
    forged.id = Some("forged".to_string());

    let alice = users.create(&forged).await.unwrap();
    let id = alice.id.clone().unwrap();
    assert_ne!(id, "forged");
    assert!(alice.created_at.is_some());

    let retrieved = users.retrieve(FindOptions::by_id(&id)).await.unwrap();
    assert_eq!(retrieved, alice);

    let older = users
        .update(UpdateOptions::by_id(&id, Patch::new().set("age", 31)))
        .await
        .unwrap();
    assert_eq!(older.age, 31);
    assert!(older.updated_at.is_some());

    let replaced = users
        .replace(ReplaceOptions::by_id(&id, User::new("Alicia", 32)))
        .await
        .unwrap();
    assert_eq!(replaced.id.as_deref(), Some(id.as_str()));
    assert_eq!(replaced.created_at, alice.created_at);
    assert_eq!(replaced.name, "Alicia");

    users.create(&User::new("Bob", 20)).await.unwrap();

    let adults = users
        .list(ListOptions::builder().filter(Filter::gte("age", 30)).build())
        .await
        .unwrap();
    assert_eq!(adults, vec![replaced.clone()]);

    // the untyped accessor sees the same records
    assert_eq!(users.collection().list(ListOptions::new()).await.unwrap().len(), 2);

    let deleted = users.delete(DeleteOptions::by_id(&id)).await.unwrap();
    assert_eq!(deleted, replaced);
    assert_eq!(users.find(FindOptions::by_id(&id)).await.unwrap(), None);

    assert_eq!(users.truncate().await.unwrap(), 1);
}

#[tokio::test]
async fn typed_replace_addresses_records_by_filter() {
    let store = memory_store();
    let users = store.typed_collection::<User>();

    let alice = users.create(&User::new("Alice", 30)).await.unwrap();
    let bob = users.create(&User::new("Bob", 20)).await.unwrap();

    let mut forged = User::new("Robert", 21);
    forged.id = Some(alice.id.clone().unwrap());

    let replaced = users
        .replace(ReplaceOptions::by_filter(Filter::eq("name", "Bob"), forged))
        .await
        .unwrap();
    assert_eq!(replaced.id, bob.id);
    assert_eq!(replaced.created_at, bob.created_at);
    assert_eq!(replaced.name, "Robert");

    // alice is untouched
    let kept = users
        .retrieve(FindOptions::by_id(alice.id.clone().unwrap()))
        .await
        .unwrap();
    assert_eq!(kept, alice);

    let err = users
        .replace(ReplaceOptions::by_filter(Filter::eq("name", "Carol"), User::new("Carol", 40)))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
