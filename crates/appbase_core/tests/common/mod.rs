#![allow(dead_code)]

use appbase_core::{ModelRegistry, Store, StoreConfig};

appbase_core::entity! {
    pub struct Widget {
        pub name: String,
        pub weight: Option<f64>,
    }
}

appbase_core::entity! {
    pub struct Gadget {
        pub label: String,
        pub enabled: bool,
    }
}

appbase_core::entity! {
    /// Never registered.
    pub struct Stray {
        pub note: String,
    }
}

pub fn registry() -> ModelRegistry {
    ModelRegistry::new()
        .with::<Widget>()
        .unwrap()
        .with::<Gadget>()
        .unwrap()
}

pub fn open_memory_store() -> Store {
    let mut store = Store::new(StoreConfig::in_memory(), registry());
    store.open().unwrap();
    store
}

pub fn widget(name: &str) -> Widget {
    Widget {
        name: name.to_string(),
        ..Widget::default()
    }
}

pub fn gadget(label: &str, enabled: bool) -> Gadget {
    Gadget {
        label: label.to_string(),
        enabled,
        ..Gadget::default()
    }
}

pub fn table_columns(store: &Store, table: &str) -> Vec<String> {
    store
        .with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT name FROM pragma_table_info(?1);")
                .unwrap();
            let names = stmt
                .query_map([table], |row| row.get::<_, String>(0))
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
            names
        })
        .unwrap()
}
