//! The router: command registration, lookup, and invocation.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use argdecl_core::error::ConfigError;
use argdecl_core::value::Value;

use crate::entry::{CommandEntry, ParamSpec};

/// Invocation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// No entry answers to the command token.
    #[error("unknown command: {command}")]
    CommandNotFound {
        /// The unmatched token.
        command: String,
        /// The group searched, if the lookup was scoped.
        group: Option<String>,
    },

    /// A parameter failed to bind, cast, or validate.
    #[error("command {command} argument \"{param}\" : {message}")]
    Argument {
        /// Command name.
        command: String,
        /// Parameter name.
        param: String,
        /// Underlying failure text.
        message: String,
    },

    /// The handler itself failed.
    #[error("{0}")]
    Handler(String),
}

/// Which entries a lookup considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupFilter<'a> {
    /// Only ungrouped entries.
    #[default]
    Default,
    /// Every entry.
    Any,
    /// Only entries in the named group.
    Named(&'a str),
}

impl GroupFilter<'_> {
    fn admits(&self, group: Option<&str>) -> bool {
        match self {
            GroupFilter::Default => group.is_none(),
            GroupFilter::Any => true,
            GroupFilter::Named(name) => group == Some(name),
        }
    }

    fn describe(&self) -> Option<String> {
        match self {
            GroupFilter::Named(name) => Some((*name).to_owned()),
            _ => None,
        }
    }
}

/// A set of registered commands over a host type `H`.
///
/// The host is the mutable context handlers operate on: a REPL session,
/// an application state, a test double.
pub struct Router<H> {
    entries: Vec<CommandEntry<H>>,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Router {
            entries: Vec::new(),
        }
    }
}

impl<H> Router<H> {
    /// An empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry. Within one group, every command name and
    /// alias must be unique.
    pub fn register(&mut self, entry: CommandEntry<H>) -> Result<(), ConfigError> {
        let mut names = vec![entry.command.as_str()];
        names.extend(entry.aliases.iter().map(String::as_str));
        for name in &names {
            let taken = self
                .entries
                .iter()
                .filter(|e| e.group == entry.group)
                .any(|e| e.answers_to(name));
            if taken {
                return Err(ConfigError::DuplicateCommand {
                    command: (*name).to_owned(),
                });
            }
        }
        debug!(command = %entry.command, group = ?entry.group, "registered command");
        self.entries.push(entry);
        Ok(())
    }

    /// Find the entry answering to a command token, in declaration
    /// order.
    pub fn find(&self, command: &str, filter: GroupFilter<'_>) -> Option<&CommandEntry<H>> {
        self.entries
            .iter()
            .filter(|e| filter.admits(e.group_name()))
            .find(|e| e.answers_to(command))
    }

    /// All admitted entries in declaration order.
    pub fn list(&self, filter: GroupFilter<'_>, include_hidden: bool) -> Vec<&CommandEntry<H>> {
        self.entries
            .iter()
            .filter(|e| filter.admits(e.group_name()))
            .filter(|e| include_hidden || !e.hidden)
            .collect()
    }

    /// Resolve and invoke a command against the host.
    ///
    /// Tokens of the form `name=value` where `name` is a declared
    /// parameter bind by keyword; the rest bind positionally, with a
    /// variadic tail collecting everything left over.
    pub fn invoke(
        &self,
        host: &mut H,
        command: &str,
        filter: GroupFilter<'_>,
        tokens: &[String],
    ) -> Result<Value, DispatchError> {
        let Some(entry) = self.find(command, filter) else {
            return Err(DispatchError::CommandNotFound {
                command: command.to_owned(),
                group: filter.describe(),
            });
        };
        debug!(command = %entry.command, tokens = tokens.len(), "invoking command");
        let values = bind_params(entry.command(), &entry.params, tokens)?;
        (entry.handler)(host, values)
    }
}

fn is_keyword_token(token: &str) -> Option<(&str, &str)> {
    let eq = token.find('=')?;
    let (name, value) = (&token[..eq], &token[eq + 1..]);
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some((name, value))
    } else {
        None
    }
}

fn bind_params(
    command: &str,
    params: &[ParamSpec],
    tokens: &[String],
) -> Result<Vec<Value>, DispatchError> {
    let mut keywords: HashMap<&str, &str> = HashMap::new();
    let mut positional: Vec<&str> = Vec::new();

    for token in tokens {
        match is_keyword_token(token) {
            Some((name, value)) if params.iter().any(|p| p.name == name) => {
                keywords.insert(name, value);
            }
            Some((name, _)) => {
                return Err(DispatchError::Argument {
                    command: command.to_owned(),
                    param: name.to_owned(),
                    message: "unknown keyword argument".to_owned(),
                });
            }
            None => positional.push(token),
        }
    }

    let mut queue = positional.into_iter();
    let mut values = Vec::with_capacity(params.len());
    for param in params {
        if param.variadic {
            let mut items = Vec::new();
            for token in queue.by_ref() {
                items.push(bind_one(command, param, token)?);
            }
            values.push(Value::List(items));
            continue;
        }
        let token = keywords.remove(param.name.as_str()).or_else(|| queue.next());
        match token {
            Some(token) => values.push(bind_one(command, param, token)?),
            None if param.optional => values.push(Value::None),
            None => {
                return Err(DispatchError::Argument {
                    command: command.to_owned(),
                    param: param.name.clone(),
                    message: "missing required argument".to_owned(),
                });
            }
        }
    }

    if let Some(extra) = queue.next() {
        return Err(DispatchError::Argument {
            command: command.to_owned(),
            param: extra.to_owned(),
            message: "unexpected extra argument".to_owned(),
        });
    }
    Ok(values)
}

fn bind_one(command: &str, param: &ParamSpec, token: &str) -> Result<Value, DispatchError> {
    let argument = |message: String| DispatchError::Argument {
        command: command.to_owned(),
        param: param.name.clone(),
        message,
    };
    let value = match &param.caster {
        Some(caster) => caster.cast(token).map_err(|e| argument(e.to_string()))?,
        None => Value::Str(token.to_owned()),
    };
    if let Some(validator) = &param.validator {
        validator
            .validate(&value)
            .map_err(|e| argument(e.to_string()))?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{CommandEntry, ParamSpec};
    use argdecl_core::cast::Caster;
    use argdecl_core::validator;

    type Host = Vec<String>;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn record(name: &'static str) -> CommandEntry<Host> {
        CommandEntry::new(name, move |host: &mut Host, values| {
            host.push(format!("{name}:{values:?}"));
            Ok(Value::None)
        })
    }

    #[test]
    fn find_matches_names_and_aliases() {
        let mut router: Router<Host> = Router::new();
        router.register(record("status").alias("st")).unwrap();
        assert!(router.find("status", GroupFilter::Default).is_some());
        assert!(router.find("st", GroupFilter::Default).is_some());
        assert!(router.find("stat", GroupFilter::Default).is_none());
    }

    #[test]
    fn groups_scope_lookup() {
        let mut router: Router<Host> = Router::new();
        router.register(record("go")).unwrap();
        router.register(record("go").group("admin")).unwrap();

        assert!(router.find("go", GroupFilter::Default).is_some());
        let admin = router.find("go", GroupFilter::Named("admin")).unwrap();
        assert_eq!(admin.group_name(), Some("admin"));
        assert_eq!(router.list(GroupFilter::Any, true).len(), 2);
    }

    #[test]
    fn duplicate_names_in_one_group_are_rejected() {
        let mut router: Router<Host> = Router::new();
        router.register(record("go").alias("g")).unwrap();
        let err = router.register(record("run").alias("g")).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateCommand { .. }));
        // the same name in another group is fine
        router.register(record("go").group("other")).unwrap();
    }

    #[test]
    fn invoke_binds_positionally() {
        let mut router: Router<Host> = Router::new();
        router
            .register(
                CommandEntry::new("add", |_: &mut Host, values| {
                    let a = values[0].as_int().unwrap();
                    let b = values[1].as_int().unwrap();
                    Ok(Value::Int(a + b))
                })
                .param(ParamSpec::new("a").caster(Caster::Int))
                .param(ParamSpec::new("b").caster(Caster::Int)),
            )
            .unwrap();

        let mut host = Host::new();
        let result = router
            .invoke(&mut host, "add", GroupFilter::Default, &tokens(&["2", "3"]))
            .unwrap();
        assert_eq!(result, Value::Int(5));
    }

    #[test]
    fn keyword_tokens_bind_by_name() {
        let mut router: Router<Host> = Router::new();
        router
            .register(
                CommandEntry::new("pow", |_: &mut Host, values| {
                    let base = values[0].as_int().unwrap();
                    let exp = values[1].as_int().unwrap() as u32;
                    Ok(Value::Int(base.pow(exp)))
                })
                .param(ParamSpec::new("base").caster(Caster::Int))
                .param(ParamSpec::new("exp").caster(Caster::Int)),
            )
            .unwrap();

        let mut host = Host::new();
        let result = router
            .invoke(
                &mut host,
                "pow",
                GroupFilter::Default,
                &tokens(&["exp=3", "2"]),
            )
            .unwrap();
        assert_eq!(result, Value::Int(8));
    }

    #[test]
    fn unknown_keyword_is_an_error() {
        let mut router: Router<Host> = Router::new();
        router
            .register(record("go").param(ParamSpec::new("a")))
            .unwrap();
        let mut host = Host::new();
        let err = router
            .invoke(&mut host, "go", GroupFilter::Default, &tokens(&["b=1"]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "command go argument \"b\" : unknown keyword argument"
        );
    }

    #[test]
    fn optional_binds_null_and_variadic_collects() {
        let mut router: Router<Host> = Router::new();
        router
            .register(
                CommandEntry::new("tail", |_: &mut Host, values| {
                    Ok(Value::List(values))
                })
                .param(ParamSpec::new("head").optional())
                .param(ParamSpec::new("rest").variadic().caster(Caster::Int)),
            )
            .unwrap();

        let mut host = Host::new();
        let result = router
            .invoke(
                &mut host,
                "tail",
                GroupFilter::Default,
                &tokens(&["x", "1", "2"]),
            )
            .unwrap();
        assert_eq!(
            result,
            Value::List(vec![
                Value::Str("x".into()),
                Value::List(vec![Value::Int(1), Value::Int(2)]),
            ])
        );

        let result = router
            .invoke(&mut host, "tail", GroupFilter::Default, &[])
            .unwrap();
        assert_eq!(
            result,
            Value::List(vec![Value::None, Value::List(Vec::new())])
        );
    }

    #[test]
    fn missing_required_argument() {
        let mut router: Router<Host> = Router::new();
        router
            .register(record("go").param(ParamSpec::new("a")))
            .unwrap();
        let mut host = Host::new();
        let err = router
            .invoke(&mut host, "go", GroupFilter::Default, &[])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "command go argument \"a\" : missing required argument"
        );
    }

    #[test]
    fn cast_and_validation_failures_are_prefixed() {
        let mut router: Router<Host> = Router::new();
        router
            .register(
                record("go").param(
                    ParamSpec::new("n")
                        .caster(Caster::Int)
                        .validator(validator::int().positive(false)),
                ),
            )
            .unwrap();

        let mut host = Host::new();
        let err = router
            .invoke(&mut host, "go", GroupFilter::Default, &tokens(&["x"]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "command go argument \"n\" : invalid int value: \"x\""
        );

        let err = router
            .invoke(&mut host, "go", GroupFilter::Default, &tokens(&["0"]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "command go argument \"n\" : not a positive value : 0"
        );
    }

    #[test]
    fn unmatched_command_reports_group() {
        let router: Router<Host> = Router::new();
        let mut host = Host::new();
        let err = router
            .invoke(&mut host, "nope", GroupFilter::Named("admin"), &[])
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::CommandNotFound {
                command: "nope".into(),
                group: Some("admin".into()),
            }
        );
    }

    #[test]
    fn handlers_mutate_the_host() {
        let mut router: Router<Host> = Router::new();
        router.register(record("mark")).unwrap();
        let mut host = Host::new();
        router
            .invoke(&mut host, "mark", GroupFilter::Default, &[])
            .unwrap();
        assert_eq!(host, vec!["mark:[]".to_owned()]);
    }
}
