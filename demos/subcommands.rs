//! Subcommands example.
//!
//! Routes a command line through a `CommandSet`: the first token picks
//! a field table, and the rest of the line is parsed by that table.
//! Also shows table inheritance: both commands share a common base.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p argdecl-demos --example subcommands
//! ```

use argdecl_core::{CommandSet, DeclaredType, FieldSpec, FieldTable, SpecEdit, Value};

fn main() {
    let base = FieldTable::builder("Common")
        .field(
            "verbose",
            FieldSpec::new(DeclaredType::Bool).flag("-v").help("verbose output"),
        )
        .field(
            "retries",
            FieldSpec::new(DeclaredType::Int)
                .flag("--retries")
                .default(Value::Int(0))
                .help("retry count"),
        )
        .build()
        .expect("base table resolves");

    let fetch = FieldTable::builder("Fetch")
        .inherit(&base)
        .description("download an artifact")
        .field(
            "url",
            FieldSpec::positional("URL", DeclaredType::Str).help("source address"),
        )
        .override_field("retries", SpecEdit::new().default(Value::Int(3)))
        .build()
        .expect("fetch table resolves");

    let push = FieldTable::builder("Push")
        .inherit(&base)
        .description("upload an artifact")
        .field(
            "target",
            FieldSpec::positional("TARGET", DeclaredType::Str).help("destination"),
        )
        .build()
        .expect("push table resolves");

    let set = CommandSet::new("artifacts")
        .description("move artifacts around")
        .command("fetch", fetch)
        .and_then(|s| s.command("push", push))
        .expect("commands register");

    println!("=== Overview ===");
    print!("{}", set.render_help());

    for line in [
        vec!["fetch", "https://example.org/a.tar", "-v"],
        vec!["push", "mirror-1"],
        vec!["prune"],
    ] {
        let args: Vec<String> = line.iter().map(ToString::to_string).collect();
        println!("\n=== artifacts {} ===", line.join(" "));
        match set.parse(&args) {
            Ok((command, store)) => {
                println!("  command: {command}");
                for (name, value) in store.values() {
                    println!("  {name} = {}", value.repr());
                }
            }
            Err(e) => println!("  error (exit code {}): {e}", e.code()),
        }
    }
}
