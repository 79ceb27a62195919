mod common;

use appbase_core::{Entity, StoreError};
use common::{gadget, open_memory_store, widget, Gadget, Stray, Widget};

#[test]
fn widget_scenario_assigns_sequential_ids_and_tracks_deletes() {
    let store = open_memory_store();

    let mut first = widget("a");
    let mut second = widget("b");
    assert!(store.save(&mut first));
    assert!(store.save(&mut second));
    assert_eq!(first.id(), 1);
    assert_eq!(second.id(), 2);

    let names: Vec<String> = store
        .list::<Widget>()
        .into_iter()
        .map(|widget| widget.name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(store.count::<Widget>(), 2);

    assert!(store.delete(&first));
    assert_eq!(store.list::<Widget>(), vec![second.clone()]);
    assert_eq!(store.count::<Widget>(), 1);
}

#[test]
fn save_then_load_roundtrips_fields_and_timestamps() {
    let store = open_memory_store();

    let mut saved = widget("sprocket");
    saved.weight = Some(2.5);
    assert!(saved.is_new());
    assert!(store.save(&mut saved));

    assert!(!saved.is_new());
    assert!(saved.base.created_at > 0);
    assert_eq!(saved.base.created_at, saved.base.updated_at);

    let loaded = store.load_by_id::<Widget>(saved.id()).unwrap();
    assert_eq!(loaded, saved);
}

#[test]
fn save_on_persisted_entity_updates_in_place() {
    let store = open_memory_store();

    let mut entity = widget("draft");
    store.save(&mut entity);
    let id = entity.id();
    let created_at = entity.base.created_at;

    entity.name = "final".to_string();
    entity.weight = Some(7.0);
    assert!(store.save(&mut entity));

    assert_eq!(entity.id(), id);
    assert_eq!(entity.base.created_at, created_at);
    assert!(entity.base.updated_at >= created_at);
    assert_eq!(store.count::<Widget>(), 1);

    let loaded = store.load_by_id::<Widget>(id).unwrap();
    assert_eq!(loaded.name, "final");
    assert_eq!(loaded.weight, Some(7.0));
}

#[test]
fn save_on_rebuilt_entity_keeps_stored_creation_time() {
    let store = open_memory_store();
    let mut original = widget("draft");
    assert!(store.save(&mut original));
    store
        .with_connection(|conn| {
            conn.execute(
                "UPDATE widget SET created_at = 1000 WHERE id = ?1;",
                [original.id()],
            )
            .unwrap()
        })
        .unwrap();

    let mut rebuilt = widget("final");
    rebuilt.base.id = original.id();
    assert_eq!(rebuilt.base.created_at, 0);
    assert!(store.save(&mut rebuilt));

    assert_eq!(rebuilt.base.created_at, 1000);
    let loaded = store.load_by_id::<Widget>(original.id()).unwrap();
    assert_eq!(loaded, rebuilt);
}

#[test]
fn save_with_unknown_identity_inserts_under_that_identity() {
    let store = open_memory_store();

    let mut entity = widget("imported");
    entity.base.id = 42;
    assert!(store.save(&mut entity));

    assert_eq!(entity.id(), 42);
    assert!(entity.base.created_at > 0);
    assert_eq!(store.load_by_id::<Widget>(42).unwrap().name, "imported");

    let mut next = widget("after import");
    store.save(&mut next);
    assert_eq!(next.id(), 43);
}

#[test]
fn save_accepts_owned_and_boxed_values_alike() {
    let store = open_memory_store();

    let mut owned = widget("owned");
    let mut boxed = Box::new(widget("boxed"));
    assert!(store.save(&mut owned));
    assert!(store.save(&mut *boxed));

    assert_eq!(owned.id(), 1);
    assert_eq!(boxed.id(), 2);
    assert!(store.delete(&*boxed));
    assert!(store.delete(&owned));
    assert_eq!(store.count::<Widget>(), 0);
}

#[test]
fn delete_is_idempotent_and_rejects_unsaved_entities() {
    let store = open_memory_store();

    let mut entity = widget("short lived");
    store.save(&mut entity);

    assert!(store.delete(&entity));
    assert!(store.load_by_id::<Widget>(entity.id()).is_none());
    assert!(store.delete(&entity));
    assert!(store.load_by_id::<Widget>(entity.id()).is_none());

    let unsaved = widget("never saved");
    assert!(!store.delete(&unsaved));
    assert!(matches!(
        store.try_delete(&unsaved),
        Err(StoreError::UnsavedEntity { type_name: "Widget" })
    ));
}

#[test]
fn load_by_id_treats_zero_and_non_numeric_identity_as_absent() {
    let store = open_memory_store();
    let mut entity = widget("only");
    store.save(&mut entity);

    assert!(store.load_by_id::<Widget>(0).is_none());
    assert!(store.load_by_id::<Gadget>(0).is_none());
    assert!(store.load_by_id::<Widget>("abc").is_none());
    assert!(store.load_by_id::<Widget>(99_u32).is_none());
    assert_eq!(store.load_by_id::<Widget>("1").unwrap(), entity);
    assert_eq!(store.load_by_id::<Widget>(1_usize).unwrap(), entity);

    assert!(matches!(
        store.try_load_by_id::<Widget>("abc"),
        Err(StoreError::InvalidIdentity { type_name: "Widget" })
    ));
    let err = store.try_load_by_id::<Widget>(0).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn load_or_create_returns_prototype_for_zero_identity() {
    let store = open_memory_store();
    let mut entity = widget("existing");
    store.save(&mut entity);

    let fresh = store.load_or_create::<Widget>(0).unwrap();
    assert!(fresh.is_new());
    assert_eq!(fresh, Widget::default());

    assert_eq!(
        store.load_or_create::<Widget>(entity.id()),
        store.load_by_id::<Widget>(entity.id())
    );
    assert!(store.load_or_create::<Widget>(500).is_none());
    assert!(store.load_or_create::<Widget>("not a number").is_none());
}

#[test]
fn load_by_id_strict_returns_existing_entity() {
    let store = open_memory_store();
    let mut entity = gadget("switch", true);
    store.save(&mut entity);

    let loaded: Gadget = store.load_by_id_strict(entity.id());
    assert_eq!(loaded, entity);
}

#[test]
#[should_panic(expected = "cannot load model object Widget[id=7]")]
fn load_by_id_strict_panics_when_missing() {
    let store = open_memory_store();
    let _ = store.load_by_id_strict::<Widget, _>(7);
}

#[test]
fn first_returns_lowest_identity_or_none() {
    let store = open_memory_store();
    assert!(store.first::<Gadget>().is_none());

    let mut one = gadget("one", false);
    let mut two = gadget("two", true);
    store.save(&mut one);
    store.save(&mut two);

    assert_eq!(store.first::<Gadget>().unwrap(), one);
    assert!(matches!(
        store.try_first::<Widget>(),
        Err(StoreError::NotFound { id: None, .. })
    ));
}

#[test]
fn entity_types_do_not_share_rows() {
    let store = open_memory_store();
    store.save(&mut widget("w"));
    store.save(&mut gadget("g", true));
    store.save(&mut gadget("h", false));

    assert_eq!(store.count::<Widget>(), 1);
    assert_eq!(store.count::<Gadget>(), 2);
    assert_eq!(store.list::<Gadget>()[1].label, "h");
    assert!(!store.list::<Gadget>()[1].enabled);
}

#[test]
fn unregistered_type_degrades_to_empty_results() {
    let store = open_memory_store();
    let mut stray = Stray {
        note: "lost".to_string(),
        ..Stray::default()
    };

    assert!(store.prepare_query::<Stray>().is_none());
    assert!(store.load_by_id::<Stray>(1).is_none());
    assert!(store.load_or_create::<Stray>(1).is_none());
    assert!(store.first::<Stray>().is_none());
    assert!(store.list::<Stray>().is_empty());
    assert_eq!(store.count::<Stray>(), 0);
    assert!(!store.save(&mut stray));
    assert!(stray.is_new());

    stray.base.id = 3;
    assert!(!store.delete(&stray));
    assert!(matches!(
        store.try_list::<Stray>(),
        Err(StoreError::Unregistered("Stray"))
    ));
}

#[test]
fn store_is_usable_from_several_threads() {
    let store = open_memory_store();

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let store = &store;
            scope.spawn(move || {
                for index in 0..10 {
                    let mut entity = widget(&format!("w{worker}-{index}"));
                    assert!(store.save(&mut entity));
                }
            });
        }
    });

    assert_eq!(store.count::<Widget>(), 40);
    let mut ids: Vec<i64> = store.list::<Widget>().iter().map(Entity::id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 40);
}
