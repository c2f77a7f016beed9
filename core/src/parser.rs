//! Parser assembly: compiling a field table into a runnable parser.
//!
//! This module bridges declarations and token parsing. A [`Parser`]
//! walks a [`FieldTable`] in declaration order and registers each field
//! with the [`Backend`](crate::backend::Backend): help groups open on
//! first sight, exclusive clusters are created per cluster name, and
//! shorthand aliases expand into constant-storing flags clustered with
//! their primary. Parsed values are applied back to a [`FieldStore`]
//! through each field's validator.

use serde_json::json;
use tracing::debug;

use crate::backend::{ArgConfig, Backend, ExGroupId, GroupId};
use crate::error::{ConfigError, ParseError};
use crate::field::{Action, FieldSpec, FieldStore};
use crate::table::FieldTable;

/// What to do when parsing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitPolicy {
    /// Print the message and terminate the process with the
    /// conventional code (0 for help, 2 otherwise).
    #[default]
    Exit,
    /// Hand the error back to the caller.
    Return,
}

/// A compiled parser for one field table.
pub struct Parser {
    table: FieldTable,
    backend: Backend,
}

impl Parser {
    /// Compile a table into a parser for the named program.
    pub fn new(prog: impl Into<String>, table: &FieldTable) -> Self {
        let prog = prog.into();
        let mut backend = Backend::new(prog.clone());
        if let Some(usage) = table.usage() {
            backend = backend.with_usage(usage.to_owned());
        }
        if let Some(description) = table.description() {
            backend = backend.with_description(description.to_owned());
        }
        if let Some(epilog) = table.epilog() {
            backend = backend.with_epilog(epilog.to_owned());
        }

        for field in table.fields() {
            register_field(&mut backend, field);
        }

        debug!(prog = %prog, fields = table.fields().len(), "assembled parser");
        Parser {
            table: table.clone(),
            backend,
        }
    }

    /// Parse tokens and apply the results to the store.
    ///
    /// Every field is assigned its parsed value (or its default, or null
    /// when neither exists), and each assignment runs the field's
    /// validator.
    pub fn parse_args(&self, store: &mut FieldStore, args: &[String]) -> Result<(), ParseError> {
        let ns = self.backend.parse(args)?;
        let mut values = ns.into_values();
        for field in self.table.fields() {
            let Some(name) = field.name() else { continue };
            let Some(value) = values.remove(name) else {
                continue;
            };
            field
                .set(store, value)
                .map_err(|source| ParseError::Validation {
                    field: name.to_owned(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Parse tokens into a fresh store.
    pub fn parse(&self, args: &[String]) -> Result<FieldStore, ParseError> {
        let mut store = FieldStore::new();
        self.parse_args(&mut store, args)?;
        Ok(store)
    }

    /// Parse with an exit policy. Under [`ExitPolicy::Exit`], help goes
    /// to stdout and errors to stderr with the usage banner, then the
    /// process terminates.
    pub fn parse_args_with(
        &self,
        store: &mut FieldStore,
        args: &[String],
        policy: ExitPolicy,
    ) -> Result<(), ParseError> {
        match self.parse_args(store, args) {
            Ok(()) => Ok(()),
            Err(err) if policy == ExitPolicy::Return => Err(err),
            Err(err) => {
                match &err {
                    ParseError::Help(text) => print!("{text}"),
                    other => {
                        eprintln!("{}", self.backend.usage_text());
                        eprintln!("{}: error: {other}", self.backend.prog());
                    }
                }
                std::process::exit(err.code());
            }
        }
    }

    /// The rendered help document.
    pub fn render_help(&self) -> String {
        self.backend.render_help()
    }

    /// The usage banner.
    pub fn usage_text(&self) -> String {
        self.backend.usage_text()
    }

    /// A machine-readable description of every visible field.
    pub fn to_json(&self) -> serde_json::Value {
        let fields: Vec<serde_json::Value> = self
            .table
            .fields()
            .iter()
            .filter(|f| !f.is_hidden())
            .map(|field| {
                json!({
                    "name": field.name(),
                    "type": field.declared().to_string(),
                    "flags": field.flags(),
                    "metavar": field.kwargs().metavar,
                    "required": field.is_required(),
                    "default": field.default_value(),
                    "choices": field.kwargs().choices,
                    "help": field.kwargs().help,
                    "group": field.group_name(),
                })
            })
            .collect();
        json!({
            "prog": self.backend.prog(),
            "description": self.table.description(),
            "fields": fields,
        })
    }
}

fn base_config(field: &FieldSpec) -> ArgConfig {
    let kw = field.kwargs();
    ArgConfig {
        action: kw.action,
        nargs: kw.nargs,
        constant: field.const_value_or_implied(),
        default: field.default_value(),
        caster: kw.caster.clone(),
        choices: kw.choices.clone(),
        required: field.is_required(),
        help: kw.help.clone(),
        metavar: kw.metavar.clone(),
        hidden: field.is_hidden(),
    }
}

fn register_field(backend: &mut Backend, field: &FieldSpec) {
    let Some(name) = field.name() else { return };
    let group: Option<GroupId> = field.group_name().map(|title| backend.open_group(title));
    let mut config = base_config(field);

    if field.is_positional() {
        let metavar = config
            .metavar
            .clone()
            .unwrap_or_else(|| name.to_uppercase());
        backend.add_positional(name, &metavar, config, group);
        return;
    }

    // a named cluster, or an implicit one when aliases need company
    let ex: Option<ExGroupId> = if field.ex_group_name().is_some() || !field.alias_entries().is_empty()
    {
        let required = field.is_required();
        let id = match field.ex_group_name() {
            Some(title) => backend.open_named_exclusive_group(title),
            None => backend.open_exclusive_group(false),
        };
        if required {
            // one member of the cluster must appear, not this one in
            // particular
            backend.require_exclusive_group(id);
            config.required = false;
        }
        Some(id)
    } else {
        None
    };

    backend.add_flag(name, field.flags(), config, group, ex);

    let primary = field.flags().first().cloned().unwrap_or_default();
    for (alias, constant) in field.alias_entries() {
        let alias_config = ArgConfig {
            action: Some(Action::StoreConst),
            constant: Some(constant.clone()),
            help: Some(format!("short for {primary}={}.", constant.repr())),
            hidden: field.is_hidden(),
            ..ArgConfig::default()
        };
        backend.add_flag(name, std::slice::from_ref(alias), alias_config, group, ex);
    }
}

/// A named set of subcommand tables sharing one program name.
///
/// The first token selects a command; the rest of the line is parsed by
/// that command's table. An optional parent table contributes fields to
/// every command; a command declaring the same attribute name wins over
/// the parent's declaration.
#[derive(Debug)]
pub struct CommandSet {
    prog: String,
    description: Option<String>,
    parent: Option<FieldTable>,
    commands: Vec<(String, FieldTable)>,
}

impl CommandSet {
    /// An empty command set for the named program.
    pub fn new(prog: impl Into<String>) -> Self {
        CommandSet {
            prog: prog.into(),
            description: None,
            parent: None,
            commands: Vec::new(),
        }
    }

    /// Set the overview description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the table of fields every command shares. Parent fields come
    /// first in each command's help; call before registering commands.
    pub fn parent(mut self, table: &FieldTable) -> Self {
        self.parent = Some(table.clone());
        self
    }

    /// Register a command with its field table.
    pub fn command(
        mut self,
        name: impl Into<String>,
        table: FieldTable,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if self.commands.iter().any(|(n, _)| *n == name) {
            return Err(ConfigError::DuplicateCommand { command: name });
        }
        let table = match &self.parent {
            Some(parent) => merge_with_parent(parent, &table)?,
            None => table,
        };
        self.commands.push((name, table));
        Ok(self)
    }

    /// Registered command names in registration order.
    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Parse a full line: select the command, then parse the rest.
    pub fn parse(&self, args: &[String]) -> Result<(String, FieldStore), ParseError> {
        let Some(first) = args.first() else {
            return Err(ParseError::Invalid("missing command".to_owned()));
        };
        if first == "-h" || first == "--help" {
            return Err(ParseError::Help(self.render_help()));
        }
        let Some((name, table)) = self.commands.iter().find(|(n, _)| n == first) else {
            return Err(ParseError::Invalid(format!("unknown command: {first}")));
        };
        let parser = Parser::new(format!("{} {name}", self.prog), table);
        let store = parser.parse(&args[1..])?;
        Ok((name.clone(), store))
    }

    /// The command overview document.
    pub fn render_help(&self) -> String {
        let mut out = format!(
            "usage: {} {{{}}} ...\n",
            self.prog,
            self.command_names().join(",")
        );
        if let Some(description) = &self.description {
            out.push('\n');
            out.push_str(description);
            out.push('\n');
        }
        out.push_str("\ncommands:\n");
        for (name, table) in &self.commands {
            match table.description() {
                Some(text) => out.push_str(&format!("  {name:<22}{text}\n")),
                None => out.push_str(&format!("  {name}\n")),
            }
        }
        out
    }
}

// parent fields first, the child's declaration winning on a shared name
fn merge_with_parent(parent: &FieldTable, child: &FieldTable) -> Result<FieldTable, ConfigError> {
    let mut builder = FieldTable::builder(child.owner())
        .inherit(child)
        .inherit(parent);
    if let Some(usage) = child.usage() {
        builder = builder.usage(usage);
    }
    if let Some(description) = child.description() {
        builder = builder.description(description);
    }
    if let Some(epilog) = child.epilog() {
        builder = builder.epilog(epilog);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::infer::DeclaredType;
    use crate::validator;
    use crate::value::Value;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn example_table() -> FieldTable {
        FieldTable::builder("Example")
            .description("an example")
            .field(
                "verbose",
                FieldSpec::new(DeclaredType::Bool).flag("-v").help("verbose"),
            )
            .field(
                "count",
                FieldSpec::new(DeclaredType::Int)
                    .flag("-n")
                    .default(Value::Int(1)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn parse_fills_the_store() {
        let table = example_table();
        let parser = Parser::new("example", &table);
        let store = parser.parse(&tokens(&["-v", "-n", "3"])).unwrap();
        assert_eq!(store.get_raw("verbose"), Some(&Value::Bool(true)));
        assert_eq!(store.get_raw("count"), Some(&Value::Int(3)));
    }

    #[test]
    fn unsupplied_fields_take_defaults() {
        let table = example_table();
        let parser = Parser::new("example", &table);
        let store = parser.parse(&[]).unwrap();
        assert_eq!(store.get_raw("verbose"), Some(&Value::Bool(false)));
        assert_eq!(store.get_raw("count"), Some(&Value::Int(1)));
    }

    #[test]
    fn validators_run_on_application() {
        let table = FieldTable::builder("Checked")
            .field(
                "n",
                FieldSpec::new(DeclaredType::Int)
                    .flag("-n")
                    .default(Value::Int(1))
                    .validator(validator::int().positive(false)),
            )
            .build()
            .unwrap();
        let parser = Parser::new("checked", &table);
        let err = parser.parse(&tokens(&["-n", "0"])).unwrap_err();
        assert_eq!(err.to_string(), "argument n: not a positive value : 0");
        assert_eq!(err.code(), 2);
    }

    #[test]
    fn aliases_expand_to_constants() {
        let table = FieldTable::builder("Leveled")
            .field(
                "level",
                FieldSpec::new(DeclaredType::Str)
                    .flag("--level")
                    .default(Value::Str("mid".into()))
                    .aliases([
                        ("--low", Value::Str("low".into())),
                        ("--high", Value::Str("high".into())),
                    ]),
            )
            .build()
            .unwrap();
        let parser = Parser::new("leveled", &table);

        let store = parser.parse(&tokens(&["--high"])).unwrap();
        assert_eq!(store.get_raw("level"), Some(&Value::Str("high".into())));

        let store = parser.parse(&tokens(&["--level", "low"])).unwrap();
        assert_eq!(store.get_raw("level"), Some(&Value::Str("low".into())));

        // primary and alias are mutually exclusive, repeats are not
        let err = parser
            .parse(&tokens(&["--level", "low", "--high"]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument --high: not allowed with argument --level"
        );
        let err = parser.parse(&tokens(&["--low", "--high"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument --high: not allowed with argument --low"
        );
        let store = parser.parse(&tokens(&["--high", "--high"])).unwrap();
        assert_eq!(store.get_raw("level"), Some(&Value::Str("high".into())));
    }

    #[test]
    fn alias_help_names_the_primary() {
        let table = FieldTable::builder("Leveled")
            .field(
                "level",
                FieldSpec::new(DeclaredType::Str)
                    .flag("--level")
                    .aliases([("--low", Value::Str("low".into()))]),
            )
            .build()
            .unwrap();
        let parser = Parser::new("leveled", &table);
        assert!(parser.render_help().contains("short for --level=\"low\"."));
    }

    #[test]
    fn named_cluster_spans_fields() {
        let table = FieldTable::builder("Clustered")
            .field(
                "fast",
                FieldSpec::new(DeclaredType::Bool).flag("--fast").ex_group("speed"),
            )
            .field(
                "slow",
                FieldSpec::new(DeclaredType::Bool).flag("--slow").ex_group("speed"),
            )
            .build()
            .unwrap();
        let parser = Parser::new("clustered", &table);
        let err = parser.parse(&tokens(&["--fast", "--slow"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument --slow: not allowed with argument --fast"
        );
    }

    #[test]
    fn required_cluster_member_requires_the_cluster() {
        let table = FieldTable::builder("Clustered")
            .field(
                "fast",
                FieldSpec::new(DeclaredType::Bool)
                    .flag("--fast")
                    .ex_group("speed")
                    .required(true),
            )
            .field(
                "slow",
                FieldSpec::new(DeclaredType::Bool).flag("--slow").ex_group("speed"),
            )
            .build()
            .unwrap();
        let parser = Parser::new("clustered", &table);

        assert!(parser.parse(&tokens(&["--slow"])).is_ok());
        let err = parser.parse(&[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "one of the arguments --fast --slow is required"
        );
    }

    #[test]
    fn groups_render_in_declaration_order() {
        let table = FieldTable::builder("Grouped")
            .field(
                "a",
                FieldSpec::new(DeclaredType::Str).flag("-a").group("first"),
            )
            .field(
                "b",
                FieldSpec::new(DeclaredType::Str).flag("-b").group("second"),
            )
            .field(
                "c",
                FieldSpec::new(DeclaredType::Str).flag("-c").group("first"),
            )
            .build()
            .unwrap();
        let parser = Parser::new("grouped", &table);
        let help = parser.render_help();
        let first = help.find("first:").unwrap();
        let second = help.find("second:").unwrap();
        assert!(first < second);
        let section = &help[first..second];
        assert!(section.contains("-a"));
        assert!(section.contains("-c"));
    }

    #[test]
    fn to_json_describes_fields() {
        let table = example_table();
        let parser = Parser::new("example", &table);
        let doc = parser.to_json();
        assert_eq!(doc["prog"], "example");
        let fields = doc["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0]["name"], "verbose");
        assert_eq!(fields[1]["default"], 1);
    }

    #[test]
    fn command_set_routes_by_first_token() {
        let add = FieldTable::builder("Add")
            .description("add things")
            .field("n", FieldSpec::new(DeclaredType::Int).flag("-n"))
            .build()
            .unwrap();
        let remove = FieldTable::builder("Remove")
            .field("n", FieldSpec::new(DeclaredType::Int).flag("-n"))
            .build()
            .unwrap();
        let set = CommandSet::new("tool")
            .command("add", add)
            .unwrap()
            .command("remove", remove)
            .unwrap();

        let (name, store) = set.parse(&tokens(&["add", "-n", "2"])).unwrap();
        assert_eq!(name, "add");
        assert_eq!(store.get_raw("n"), Some(&Value::Int(2)));

        let err = set.parse(&tokens(&["drop"])).unwrap_err();
        assert_eq!(err.to_string(), "unknown command: drop");
    }

    #[test]
    fn command_set_parent_fields_apply_to_every_command() {
        let common = FieldTable::builder("Common")
            .field("verbose", FieldSpec::new(DeclaredType::Bool).flag("-v"))
            .field(
                "retries",
                FieldSpec::new(DeclaredType::Int)
                    .flag("--retries")
                    .default(Value::Int(0)),
            )
            .build()
            .unwrap();
        let fetch = FieldTable::builder("Fetch")
            .field("url", FieldSpec::positional("URL", DeclaredType::Str))
            .field(
                "retries",
                FieldSpec::new(DeclaredType::Int)
                    .flag("--retries")
                    .default(Value::Int(3)),
            )
            .build()
            .unwrap();
        let set = CommandSet::new("tool")
            .parent(&common)
            .command("fetch", fetch)
            .unwrap();

        // parent flag available; the command's own declaration wins
        let (_, store) = set.parse(&tokens(&["fetch", "u", "-v"])).unwrap();
        assert_eq!(store.get_raw("verbose"), Some(&Value::Bool(true)));
        assert_eq!(store.get_raw("retries"), Some(&Value::Int(3)));
        assert_eq!(store.get_raw("url"), Some(&Value::Str("u".into())));

        let (_, store) = set
            .parse(&tokens(&["fetch", "u", "--retries", "7"]))
            .unwrap();
        assert_eq!(store.get_raw("retries"), Some(&Value::Int(7)));
    }

    #[test]
    fn command_set_rejects_duplicates() {
        let table = FieldTable::builder("A").build().unwrap();
        let err = CommandSet::new("tool")
            .command("x", table.clone())
            .unwrap()
            .command("x", table)
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateCommand { .. }));
    }

    #[test]
    fn command_overview_lists_commands() {
        let add = FieldTable::builder("Add")
            .description("add things")
            .build()
            .unwrap();
        let set = CommandSet::new("tool").command("add", add).unwrap();
        let err = set.parse(&tokens(&["--help"])).unwrap_err();
        assert_eq!(err.code(), 0);
        let ParseError::Help(text) = err else {
            panic!("expected help");
        };
        assert!(text.contains("usage: tool {add} ..."));
        assert!(text.contains("add things"));
    }
}
