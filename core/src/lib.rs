//! Declarative typed command-line fields.
//!
//! This crate turns field declarations into runnable argument parsers:
//!
//! - [`FieldSpec`] — one declared field: a typed flag or positional with
//!   casting, defaults, help, grouping, and validation.
//! - [`DeclaredType`] — the content-type language that drives keyword
//!   completion (optionals, lists, tuples, literals, unions).
//! - [`Validator`] — a frozen constraint tree built from fluent rule
//!   builders in [`validator`].
//! - [`FieldTable`] — the resolved field set of one declared type, with
//!   class-style inheritance, overriding, and removal.
//! - [`Parser`] — a table compiled against the token-parsing backend,
//!   with help groups, exclusive clusters, and shorthand aliases.
//! - [`CommandSet`] — first-token subcommand routing over several
//!   tables.
//!
//! # Example
//!
//! ```
//! use argdecl_core::{DeclaredType, FieldSpec, FieldTable, Parser, Value};
//! use argdecl_core::validator;
//!
//! let table = FieldTable::builder("Serve")
//!     .description("run the server")
//!     .field(
//!         "port",
//!         FieldSpec::new(DeclaredType::Int)
//!             .flag("-p")
//!             .flag("--port")
//!             .default(Value::Int(8080))
//!             .validator(validator::int().in_range(Some(1), Some(65535)))
//!             .help("listen port"),
//!     )
//!     .field("verbose", FieldSpec::new(DeclaredType::Bool).flag("-v"))
//!     .build()
//!     .unwrap();
//!
//! let parser = Parser::new("serve", &table);
//! let args: Vec<String> = vec!["-p".into(), "9000".into(), "-v".into()];
//! let store = parser.parse(&args).unwrap();
//! assert_eq!(store.get_raw("port"), Some(&Value::Int(9000)));
//! assert_eq!(store.get_raw("verbose"), Some(&Value::Bool(true)));
//! ```

pub mod backend;
pub mod cast;
pub mod error;
pub mod field;
pub mod infer;
pub mod parser;
pub mod table;
pub mod validator;
pub mod value;

pub use cast::Caster;
pub use error::{CastError, ConfigError, ParseError, ValidationError};
pub use field::{Action, FieldSpec, FieldStore, Nargs, SpecEdit};
pub use infer::DeclaredType;
pub use parser::{CommandSet, ExitPolicy, Parser};
pub use table::FieldTable;
pub use validator::Validator;
pub use value::Value;
