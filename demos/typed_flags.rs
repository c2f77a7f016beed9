//! Typed flags example.
//!
//! Builds a field table for a small file-scanning tool, compiles it
//! into a parser, and shows parsing, validation, and the rendered
//! help document.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p argdecl-demos --example typed_flags
//! ```

use argdecl_core::{DeclaredType, FieldSpec, FieldTable, Parser, Value};
use argdecl_core::validator;

fn main() {
    let table = FieldTable::builder("Scan")
        .description("scan a directory tree for matching files")
        .field(
            "root",
            FieldSpec::positional("ROOT", DeclaredType::Path).help("directory to scan"),
        )
        .field(
            "threads",
            FieldSpec::new(DeclaredType::Int)
                .flag("-j")
                .flag("--threads")
                .default(Value::Int(4))
                .validator(validator::int().in_range(Some(1), Some(64)))
                .help("worker threads"),
        )
        .field(
            "pattern",
            FieldSpec::new(DeclaredType::List(Box::new(DeclaredType::Str)))
                .flag("-p")
                .flag("--pattern")
                .group("matching")
                .help("glob to match; repeatable"),
        )
        .field(
            "level",
            FieldSpec::new(DeclaredType::literal(["quiet", "normal", "loud"]))
                .flag("--level")
                .default(Value::Str("normal".into()))
                .aliases([
                    ("--quiet", Value::Str("quiet".into())),
                    ("--loud", Value::Str("loud".into())),
                ])
                .help("output level"),
        )
        .build()
        .expect("table resolves");

    let parser = Parser::new("scan", &table);

    println!("=== Help document ===");
    print!("{}", parser.render_help());

    println!("\n=== Parsing: scan /tmp -j 8 -p '*.rs' --quiet ===");
    let args: Vec<String> = ["/tmp", "-j", "8", "-p", "*.rs", "--quiet"]
        .iter()
        .map(ToString::to_string)
        .collect();
    match parser.parse(&args) {
        Ok(store) => {
            for (name, value) in store.values() {
                println!("  {name} = {}", value.repr());
            }
        }
        Err(e) => println!("  error: {e}"),
    }

    println!("\n=== Validation failure: scan /tmp -j 0 ===");
    let args: Vec<String> = ["/tmp", "-j", "0"].iter().map(ToString::to_string).collect();
    match parser.parse(&args) {
        Ok(_) => println!("  unexpectedly accepted"),
        Err(e) => println!("  error (exit code {}): {e}", e.code()),
    }

    println!("\n=== Machine-readable description ===");
    println!("{}", serde_json::to_string_pretty(&parser.to_json()).unwrap());
}
