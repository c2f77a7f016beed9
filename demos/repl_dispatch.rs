//! Dispatch example.
//!
//! Registers a few commands on a router over a mutable host and
//! invokes them the way an interactive shell would, including the
//! generated usage listing.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p argdecl-demos --example repl_dispatch
//! ```

use argdecl_core::{Caster, Value, validator};
use argdecl_dispatch::{CommandEntry, GroupFilter, ParamSpec, Router, UsageOptions};

struct Store {
    items: Vec<String>,
}

fn build_router() -> Router<Store> {
    let mut router = Router::new();
    router
        .register(
            CommandEntry::new("add", |store: &mut Store, values| {
                let Some(item) = values[0].as_str() else {
                    unreachable!("caster guarantees a string");
                };
                store.items.push(item.to_owned());
                Ok(Value::Int(store.items.len() as i64))
            })
            .alias("a")
            .order(1.0)
            .doc("add an item to the store. Returns the new size.")
            .param(ParamSpec::new("item")),
        )
        .expect("register add");

    router
        .register(
            CommandEntry::new("take", |store: &mut Store, values| {
                let n = values[0].as_int().unwrap_or(1) as usize;
                let taken: Vec<Value> = store
                    .items
                    .drain(..n.min(store.items.len()))
                    .map(Value::from)
                    .collect();
                Ok(Value::List(taken))
            })
            .alias("t")
            .order(2.0)
            .doc("take the first N items out of the store.")
            .param(
                ParamSpec::new("n")
                    .optional()
                    .caster(Caster::Int)
                    .validator(validator::int().positive(false)),
            ),
        )
        .expect("register take");

    router
}

fn main() {
    let router = build_router();
    let mut store = Store { items: Vec::new() };

    println!("=== Usage listing ===");
    println!(
        "{}",
        router.usage_text(GroupFilter::Default, UsageOptions::default())
    );

    for line in ["add apple", "a banana", "take n=2", "take -1", "drop x"] {
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap();
        let args: Vec<String> = parts.map(ToString::to_string).collect();
        println!("\n> {line}");
        match router.invoke(&mut store, command, GroupFilter::Default, &args) {
            Ok(result) => println!("  => {}", result.repr()),
            Err(e) => println!("  error: {e}"),
        }
    }
}
