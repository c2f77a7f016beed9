//! Command dispatch routing over typed parameters.
//!
//! Where `argdecl-core` parses a full command line into a field store,
//! this crate routes single command words to handlers: a [`Router`]
//! holds [`CommandEntry`] registrations, resolves a command token
//! (names and aliases, optionally scoped to a group), binds the
//! remaining tokens to declared parameters with casting and validation,
//! and calls the handler against a mutable host value.
//!
//! # Example
//!
//! ```
//! use argdecl_dispatch::{CommandEntry, GroupFilter, ParamSpec, Router};
//! use argdecl_core::{Caster, Value};
//!
//! struct Counter(i64);
//!
//! let mut router: Router<Counter> = Router::new();
//! router
//!     .register(
//!         CommandEntry::new("bump", |host: &mut Counter, values| {
//!             host.0 += values[0].as_int().unwrap_or(1);
//!             Ok(Value::Int(host.0))
//!         })
//!         .alias("b")
//!         .doc("increase the counter.")
//!         .param(ParamSpec::new("by").caster(Caster::Int).optional()),
//!     )
//!     .unwrap();
//!
//! let mut counter = Counter(0);
//! let args = vec!["5".to_string()];
//! let result = router
//!     .invoke(&mut counter, "b", GroupFilter::Default, &args)
//!     .unwrap();
//! assert_eq!(result, Value::Int(5));
//! ```

pub mod entry;
pub mod format;
pub mod router;

pub use entry::{CommandEntry, Handler, ParamSpec};
pub use format::UsageOptions;
pub use router::{DispatchError, GroupFilter, Router};
