mod common;

use common::{FixedClock, counting_store, id_of};
use kvdoc::{memory::InMemoryKv, prelude::*};

fn store_with(relations: &[(&str, &str, &str)]) -> DocumentStore<InMemoryKv> {
    relations
        .iter()
        .fold(
            DocumentStore::builder(InMemoryKv::new()).clock(FixedClock::default()),
            |builder, (collection, field, target)| builder.relation(*collection, *field, *target),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn embedded_array_relations_are_populated_with_selection() {
    let store = store_with(&[("users", "addresses.cityId", "cities")]);

    let tehran = store
        .collection("cities")
        .create(doc! { "name": "Tehran", "population": 9_000_000 })
        .await
        .unwrap();

    let user = store
        .collection("users")
        .create(doc! {
            "name": "Yoones",
            "addresses": [
                { "street": "Mantegh", "cityId": id_of(&tehran) },
                { "street": "Nowhere", "cityId": "missing" },
            ],
        })
        .await
        .unwrap();

    let populated = store
        .collection("users")
        .retrieve(
            FindOptions::by_id(id_of(&user))
                .populate(PopulateSpec::new().fields("addresses.cityId", ["name"])),
        )
        .await
        .unwrap();

    assert_eq!(
        populated.get_array("addresses").unwrap(),
        &vec![
            Bson::Document(doc! { "street": "Mantegh", "cityId": { "name": "Tehran" } }),
            Bson::Document(doc! { "street": "Nowhere", "cityId": Bson::Null }),
        ]
    );
    assert_eq!(populated.get_str("name").unwrap(), "Yoones");
}

#[tokio::test]
async fn string_relation_embeds_the_referenced_record() {
    let store = store_with(&[("posts", "author", "users")]);

    let author = store
        .collection("users")
        .create(doc! { "name": "Alice", "email": "alice@example.com" })
        .await
        .unwrap();
    store
        .collection("posts")
        .create(doc! { "title": "Hello", "author": id_of(&author) })
        .await
        .unwrap();

    let whole = store
        .collection("posts")
        .list(ListOptions::builder().populate(PopulateSpec::new().all("author")).build())
        .await
        .unwrap();
    assert_eq!(whole[0].get_document("author").unwrap(), &author);

    let selected = store
        .collection("posts")
        .list(
            ListOptions::builder()
                .populate(PopulateSpec::new().fields("author", ["name"]))
                .select(["title", "author"])
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(
        selected,
        vec![doc! { "title": "Hello", "author": { "name": "Alice" } }]
    );
}

#[tokio::test]
async fn id_arrays_keep_order_and_drop_dangling_ids() {
    let store = store_with(&[("posts", "tags", "tags")]);
    let tags = store.collection("tags");

    let rust = tags.create(doc! { "label": "rust" }).await.unwrap();
    let kv = tags.create(doc! { "label": "kv" }).await.unwrap();

    let post = store
        .collection("posts")
        .create(doc! { "tags": [id_of(&kv), "missing", id_of(&rust)] })
        .await
        .unwrap();

    let populated = store
        .collection("posts")
        .retrieve(
            FindOptions::by_id(id_of(&post))
                .populate(PopulateSpec::new().fields("tags", ["label"])),
        )
        .await
        .unwrap();

    assert_eq!(
        populated.get_array("tags").unwrap(),
        &vec![
            Bson::Document(doc! { "label": "kv" }),
            Bson::Document(doc! { "label": "rust" }),
        ]
    );
}

#[tokio::test]
async fn dangling_scalar_reference_becomes_null() {
    let store = store_with(&[("posts", "author", "users")]);

    let post = store
        .collection("posts")
        .create(doc! { "author": "gone" })
        .await
        .unwrap();

    let populated = store
        .collection("posts")
        .retrieve(FindOptions::by_id(id_of(&post)).populate(PopulateSpec::new().all("author")))
        .await
        .unwrap();

    assert_eq!(populated.get("author"), Some(&Bson::Null));
}

#[tokio::test]
async fn missing_relation_is_an_error() {
    let store = store_with(&[]);

    let post = store
        .collection("posts")
        .create(doc! { "author": "someone" })
        .await
        .unwrap();

    let err = store
        .collection("posts")
        .retrieve(FindOptions::by_id(id_of(&post)).populate(PopulateSpec::new().all("author")))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DocumentStoreError::RelationNotRegistered { ref collection, ref field }
            if collection == "posts" && field == "author"
    ));
}

#[tokio::test]
async fn fields_out_of_scope_are_untouched() {
    let store = store_with(&[("posts", "author", "users"), ("posts", "meta", "metas")]);

    let post = store
        .collection("posts")
        .create(doc! { "author": "someone", "editor": "someone else", "meta": { "lang": "en" } })
        .await
        .unwrap();

    let found = store
        .collection("posts")
        .find(FindOptions::by_id(id_of(&post)).populate(PopulateSpec::new().all("editor.x")))
        .await;

    // editor is in scope but has no relation
    assert!(matches!(found, Err(DocumentStoreError::RelationNotRegistered { .. })));

    let untouched = store
        .collection("posts")
        .find(FindOptions::by_id(id_of(&post)).populate(PopulateSpec::new().all("meta")))
        .await
        .unwrap();

    // a single embedded document is not a reference
    assert_eq!(untouched, Some(post));
}

#[tokio::test]
async fn listed_fields_require_a_relation_whatever_they_hold() {
    let store = store_with(&[]);

    let post = store
        .collection("posts")
        .create(doc! {
            "author": Bson::Null,
            "tags": [],
            "score": 3,
            "meta": { "lang": "en" },
        })
        .await
        .unwrap();

    for field in ["author", "tags", "score", "meta"] {
        let err = store
            .collection("posts")
            .find(FindOptions::by_id(id_of(&post)).populate(PopulateSpec::new().all(field)))
            .await
            .unwrap_err();

        assert!(
            matches!(
                err,
                DocumentStoreError::RelationNotRegistered { field: ref f, .. } if f == field
            ),
            "{field}: {err}"
        );
    }
}

#[tokio::test]
async fn empty_embedded_arrays_need_no_relation_lookup() {
    let store = store_with(&[("users", "addresses.cityId", "cities")]);

    let user = store
        .collection("users")
        .create(doc! { "name": "Nomad", "addresses": [] })
        .await
        .unwrap();

    let populated = store
        .collection("users")
        .retrieve(
            FindOptions::by_id(id_of(&user))
                .populate(PopulateSpec::new().fields("addresses.cityId", ["name"])),
        )
        .await
        .unwrap();

    assert_eq!(populated, user);
}

#[tokio::test]
async fn nested_paths_populate_inside_referenced_records() {
    let store = store_with(&[("posts", "author", "users"), ("users", "cityId", "cities")]);

    let city = store
        .collection("cities")
        .create(doc! { "name": "Tehran", "population": 9_000_000 })
        .await
        .unwrap();
    let author = store
        .collection("users")
        .create(doc! { "name": "Alice", "cityId": id_of(&city) })
        .await
        .unwrap();
    let post = store
        .collection("posts")
        .create(doc! { "title": "Hello", "author": id_of(&author) })
        .await
        .unwrap();

    let populated = store
        .collection("posts")
        .retrieve(
            FindOptions::by_id(id_of(&post)).populate(
                PopulateSpec::new()
                    .fields("author", ["name", "cityId"])
                    .fields("author.cityId", ["name"]),
            ),
        )
        .await
        .unwrap();

    assert_eq!(
        populated.get_document("author").unwrap(),
        &doc! { "name": "Alice", "cityId": { "name": "Tehran" } }
    );

    // without the nested path the id stays as stored
    let shallow = store
        .collection("posts")
        .retrieve(FindOptions::by_id(id_of(&post)).populate(PopulateSpec::new().all("author")))
        .await
        .unwrap();

    assert_eq!(
        shallow.get_document("author").unwrap().get_str("cityId").unwrap(),
        id_of(&city)
    );
}

#[tokio::test]
async fn cyclic_relations_stop_at_the_deepest_path() {
    let relations = RelationRegistry::builder()
        .register("users", "friend", "users")
        .build()
        .unwrap();
    let (store, backend) = counting_store(relations);
    let users = store.collection("users");

    let alice = users.create(doc! { "name": "Alice" }).await.unwrap();
    let bob = users
        .create(doc! { "name": "Bob", "friend": id_of(&alice) })
        .await
        .unwrap();
    users
        .update(UpdateOptions::by_id(id_of(&alice), Patch::new().set("friend", id_of(&bob))))
        .await
        .unwrap();

    let gets = backend.gets();

    let populated = users
        .retrieve(
            FindOptions::by_id(id_of(&alice))
                .populate(PopulateSpec::new().fields("friend", ["name", "friend"]).all("friend.friend"))
                .select(["name", "friend"]),
        )
        .await
        .unwrap();

    let friend = populated.get_document("friend").unwrap();
    assert_eq!(friend.get_str("name").unwrap(), "Bob");

    let friend_of_friend = friend.get_document("friend").unwrap();
    assert_eq!(friend_of_friend.get_str("name").unwrap(), "Alice");
    assert_eq!(friend_of_friend.get_str("friend").unwrap(), id_of(&bob));

    // one lookup for alice, one per populated hop
    assert_eq!(backend.gets() - gets, 3);
}
