//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise `appbase_core` end to end: register, open, save, list, count, delete.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `appbase_cli [DB_PATH]`. Without a path an in-memory store is used.
//! Setting `APPBASE_LOG_DIR` to an absolute directory enables file logging.

use appbase_core::{
    core_version, default_log_level, init_logging, Entity, LogConfig, ModelRegistry, Store,
    StoreConfig,
};
use std::process::ExitCode;

appbase_core::entity! {
    struct Widget {
        name: String,
    }
}

fn main() -> ExitCode {
    if let Some(log_dir) = std::env::var_os("APPBASE_LOG_DIR") {
        if let Err(err) = init_logging(&LogConfig::new(default_log_level(), log_dir)) {
            eprintln!("logging disabled: {err}");
        }
    }

    let config = match std::env::args_os().nth(1) {
        Some(path) => StoreConfig::file(path),
        None => StoreConfig::in_memory(),
    };

    let mut registry = ModelRegistry::new();
    if let Err(err) = registry.register::<Widget>() {
        eprintln!("model registration failed: {err}");
        return ExitCode::FAILURE;
    }

    let mut store = Store::new(config, registry);
    if let Err(err) = store.open() {
        eprintln!("cannot open database: {err}");
        return ExitCode::FAILURE;
    }

    println!("appbase_core version={}", core_version());
    for name in ["a", "b"] {
        let mut widget = Widget {
            name: name.to_string(),
            ..Widget::default()
        };
        if !store.save(&mut widget) {
            eprintln!("cannot save widget {name}");
            store.close();
            return ExitCode::FAILURE;
        }
        println!("saved widget name={} id={}", widget.name, widget.id());
    }

    let widgets = store.list::<Widget>();
    println!("count={}", store.count::<Widget>());
    if let Some(oldest) = widgets.first() {
        println!("deleted id={} ok={}", oldest.id(), store.delete(oldest));
    }
    for widget in store.list::<Widget>() {
        println!("remaining name={} id={}", widget.name, widget.id());
    }

    store.close();
    ExitCode::SUCCESS
}
