mod common;

use appbase_core::{Direction, Entity, ModelRegistry, Store, StoreConfig, StoreError};
use common::{gadget, open_memory_store, widget, Gadget, Widget};

fn seed_widgets(store: &Store) {
    for (name, weight) in [("bolt", Some(1.5)), ("nut", None), ("gear", Some(4.0))] {
        let mut entity = widget(name);
        entity.weight = weight;
        assert!(store.save(&mut entity));
    }
}

#[test]
fn prepared_count_on_empty_store_is_zero_and_leaves_no_residue() {
    let store = open_memory_store();
    store.save(&mut gadget("lever", true));

    let query = store.prepare_query::<Widget>().unwrap();
    assert_eq!(store.count_with(query), 0);

    assert_eq!(store.count::<Gadget>(), 1);
}

#[test]
fn filter_applies_only_to_the_call_it_is_passed_to() {
    let store = open_memory_store();
    seed_widgets(&store);

    let query = store
        .prepare_query::<Widget>()
        .unwrap()
        .where_eq("name", "nut".to_string());
    assert_eq!(store.count_with(query), 1);

    assert_eq!(store.count::<Widget>(), 3);
    assert_eq!(store.list::<Widget>().len(), 3);
}

#[test]
fn list_with_combines_filters_ordering_and_paging() {
    let store = open_memory_store();
    seed_widgets(&store);

    let query = store
        .prepare_query::<Widget>()
        .unwrap()
        .filter_raw("weight IS NOT NULL")
        .order_by("weight", Direction::Desc);
    let names: Vec<String> = store
        .list_with(query)
        .into_iter()
        .map(|entity| entity.name)
        .collect();
    assert_eq!(names, vec!["gear", "bolt"]);

    let page = store
        .prepare_query::<Widget>()
        .unwrap()
        .order_by("name", Direction::Asc)
        .limit(2)
        .offset(1);
    let names: Vec<String> = store
        .list_with(page)
        .into_iter()
        .map(|entity| entity.name)
        .collect();
    assert_eq!(names, vec!["gear", "nut"]);
}

#[test]
fn filter_binds_positional_parameters() {
    let store = open_memory_store();
    seed_widgets(&store);

    let query = store
        .prepare_query::<Widget>()
        .unwrap()
        .filter("weight > ? AND weight < ?", [1.0, 2.0]);
    let matched = store.list_with(query);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name, "bolt");
}

#[test]
fn first_with_honors_query_ordering() {
    let store = open_memory_store();
    seed_widgets(&store);

    let heaviest = store
        .prepare_query::<Widget>()
        .unwrap()
        .filter_raw("weight IS NOT NULL")
        .order_by("weight", Direction::Desc);
    assert_eq!(store.first_with(heaviest).unwrap().name, "gear");

    let none = store
        .prepare_query::<Widget>()
        .unwrap()
        .where_eq("name", "missing".to_string());
    assert!(store.first_with(none).is_none());
}

#[test]
fn load_by_id_with_requires_the_row_to_match_the_filter() {
    let store = open_memory_store();
    seed_widgets(&store);
    let nut = store
        .first_with(
            store
                .prepare_query::<Widget>()
                .unwrap()
                .where_eq("name", "nut".to_string()),
        )
        .unwrap();

    let weighted = store
        .prepare_query::<Widget>()
        .unwrap()
        .filter_raw("weight IS NOT NULL");
    assert!(store.load_by_id_with(weighted, nut.id()).is_none());

    let by_name = store
        .prepare_query::<Widget>()
        .unwrap()
        .where_eq("name", "nut".to_string());
    assert_eq!(store.load_by_id_with(by_name, nut.id()).unwrap(), nut);
}

#[test]
fn invalid_predicate_surfaces_as_store_error() {
    let store = open_memory_store();
    seed_widgets(&store);

    let broken = store
        .prepare_query::<Widget>()
        .unwrap()
        .filter_raw("no_such_column = 1");
    assert!(matches!(
        store.try_count_with(broken),
        Err(StoreError::Db(_))
    ));

    let broken = store
        .prepare_query::<Widget>()
        .unwrap()
        .filter_raw("no_such_column = 1");
    assert_eq!(store.count_with(broken), 0);
    assert_eq!(store.count::<Widget>(), 3);
}

#[test]
fn prepare_query_requires_open_store_and_registered_type() {
    let mut store = Store::new(
        StoreConfig::in_memory(),
        ModelRegistry::new().with::<Widget>().unwrap(),
    );
    assert!(store.prepare_query::<Widget>().is_none());

    store.open().unwrap();
    assert!(store.prepare_query::<Widget>().is_some());
    assert!(store.prepare_query::<Gadget>().is_none());
    assert!(matches!(
        store.try_prepare_query::<Gadget>(),
        Err(StoreError::Unregistered("Gadget"))
    ));

    let query = store.prepare_query::<Widget>().unwrap();
    store.close();
    assert_eq!(store.count_with(query), 0);
    assert_eq!(Widget::table_name(), "widget");
}

#[test]
fn oversized_limit_and_offset_are_clamped() {
    let store = open_memory_store();
    seed_widgets(&store);

    let query = store.prepare_query::<Widget>().unwrap().limit(u64::MAX);
    assert_eq!(store.list_with(query).len(), 3);

    let query = store.prepare_query::<Widget>().unwrap().offset(u64::MAX);
    assert!(store.try_list_with(query).unwrap().is_empty());
}
