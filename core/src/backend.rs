//! The token-parsing backend: flag matching, value consumption, and help
//! rendering.
//!
//! The backend knows nothing about field tables or validators. Parser
//! assembly (see [`crate::parser`]) compiles a table into backend
//! definitions; the backend turns a token slice into a [`Namespace`] of
//! raw parsed values, or a [`ParseError`] with the conventional exit
//! code 2 (0 for help requests).
//!
//! Accepted token shapes: `--flag value`, `--flag=value`, `-f value`,
//! `-f=value`, `-fVALUE`, positionals, and a literal `--` terminator
//! after which everything is positional. Tokens that look like negative
//! numbers are treated as values.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::cast::Caster;
use crate::error::ParseError;
use crate::field::{Action, Nargs};
use crate::value::Value;

/// Identifier of a titled help group.
pub type GroupId = usize;

/// Identifier of a mutually exclusive cluster.
pub type ExGroupId = usize;

/// Per-argument configuration handed to the backend.
#[derive(Debug, Clone, Default)]
pub struct ArgConfig {
    /// Parse action; `None` means plain store.
    pub action: Option<Action>,
    /// Token count.
    pub nargs: Option<Nargs>,
    /// Constant for const actions and valueless `?` occurrences.
    pub constant: Option<Value>,
    /// Value placed in the namespace when the argument is absent.
    pub default: Option<Value>,
    /// Token caster; raw strings without one.
    pub caster: Option<Caster>,
    /// Accepted rendered values.
    pub choices: Option<Vec<String>>,
    /// Whether the argument must be supplied.
    pub required: bool,
    /// Help text.
    pub help: Option<String>,
    /// Value placeholder; defaults to the uppercased destination.
    pub metavar: Option<String>,
    /// Suppress from help output.
    pub hidden: bool,
}

#[derive(Debug, Clone)]
struct ArgDef {
    dest: String,
    flags: Vec<String>,
    config: ArgConfig,
    group: Option<GroupId>,
    ex_group: Option<ExGroupId>,
}

impl ArgDef {
    fn action(&self) -> Action {
        self.config.action.unwrap_or(Action::Store)
    }

    fn is_positional(&self) -> bool {
        self.flags.is_empty()
    }

    fn display_name(&self) -> String {
        if let Some(flag) = self.flags.first() {
            flag.clone()
        } else {
            self.metavar()
        }
    }

    fn metavar(&self) -> String {
        self.config
            .metavar
            .clone()
            .unwrap_or_else(|| self.dest.to_uppercase())
    }
}

#[derive(Debug, Clone)]
struct ExGroup {
    name: Option<String>,
    required: bool,
}

/// The transient result of one parse: destination name to raw value.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    values: HashMap<String, Value>,
}

impl Namespace {
    /// Read one parsed value.
    pub fn get(&self, dest: &str) -> Option<&Value> {
        self.values.get(dest)
    }

    /// Consume the namespace into its value table.
    pub fn into_values(self) -> HashMap<String, Value> {
        self.values
    }
}

/// An assembled argument parser.
pub struct Backend {
    prog: String,
    usage: Option<String>,
    description: Option<String>,
    epilog: Option<String>,
    args: Vec<ArgDef>,
    groups: Vec<String>,
    ex_groups: Vec<ExGroup>,
}

impl Backend {
    /// A new parser for the named program.
    pub fn new(prog: impl Into<String>) -> Self {
        Backend {
            prog: prog.into(),
            usage: None,
            description: None,
            epilog: None,
            args: Vec::new(),
            groups: Vec::new(),
            ex_groups: Vec::new(),
        }
    }

    /// Replace the generated usage line.
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Set the description paragraph.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the epilog paragraph.
    pub fn with_epilog(mut self, epilog: impl Into<String>) -> Self {
        self.epilog = Some(epilog.into());
        self
    }

    /// Open (or reuse) a titled help group.
    pub fn open_group(&mut self, title: &str) -> GroupId {
        if let Some(i) = self.groups.iter().position(|t| t == title) {
            return i;
        }
        self.groups.push(title.to_owned());
        self.groups.len() - 1
    }

    /// Open a mutually exclusive cluster.
    pub fn open_exclusive_group(&mut self, required: bool) -> ExGroupId {
        self.ex_groups.push(ExGroup {
            name: None,
            required,
        });
        self.ex_groups.len() - 1
    }

    /// Open (or reuse) a cluster identified by name, so fields declared
    /// apart can share one cluster.
    pub fn open_named_exclusive_group(&mut self, name: &str) -> ExGroupId {
        if let Some(i) = self
            .ex_groups
            .iter()
            .position(|g| g.name.as_deref() == Some(name))
        {
            return i;
        }
        self.ex_groups.push(ExGroup {
            name: Some(name.to_owned()),
            required: false,
        });
        self.ex_groups.len() - 1
    }

    /// Require at least one member of an existing cluster.
    pub fn require_exclusive_group(&mut self, ex_group: ExGroupId) {
        if let Some(cluster) = self.ex_groups.get_mut(ex_group) {
            cluster.required = true;
        }
    }

    /// Register a flagged argument.
    pub fn add_flag(
        &mut self,
        dest: &str,
        flags: &[String],
        config: ArgConfig,
        group: Option<GroupId>,
        ex_group: Option<ExGroupId>,
    ) {
        self.args.push(ArgDef {
            dest: dest.to_owned(),
            flags: flags.to_vec(),
            config,
            group,
            ex_group,
        });
    }

    /// Register a positional argument.
    pub fn add_positional(
        &mut self,
        dest: &str,
        metavar: &str,
        mut config: ArgConfig,
        group: Option<GroupId>,
    ) {
        config.metavar.get_or_insert_with(|| metavar.to_owned());
        self.args.push(ArgDef {
            dest: dest.to_owned(),
            flags: Vec::new(),
            config,
            group,
            ex_group: None,
        });
    }

    fn find_flag(&self, flag: &str) -> Option<usize> {
        self.args
            .iter()
            .position(|a| a.flags.iter().any(|f| f == flag))
    }

    /// Parse a token slice into a namespace.
    pub fn parse(&self, tokens: &[String]) -> Result<Namespace, ParseError> {
        debug!(prog = %self.prog, tokens = tokens.len(), "parsing arguments");
        let mut state = ParseState {
            backend: self,
            ns: Namespace::default(),
            supplied: HashSet::new(),
            ex_used: HashMap::new(),
            accumulated: HashSet::new(),
            positionals: Vec::new(),
        };

        for arg in &self.args {
            let seed = arg.config.default.clone().unwrap_or(Value::None);
            state.ns.values.insert(arg.dest.clone(), seed);
        }

        let mut i = 0;
        let mut only_positional = false;
        while i < tokens.len() {
            let token = &tokens[i];
            if !only_positional && token == "--" {
                only_positional = true;
                i += 1;
                continue;
            }
            if !only_positional && (token == "-h" || token == "--help") {
                return Err(ParseError::Help(self.render_help()));
            }
            if !only_positional && looks_like_flag(token) {
                i = state.handle_flag(tokens, i)?;
            } else {
                state.positionals.push(token.clone());
                i += 1;
            }
        }

        state.assign_positionals()?;
        state.check_required()?;
        Ok(state.ns)
    }

    /// Render the help document.
    pub fn render_help(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("usage: {}\n", self.usage_line()));

        if let Some(description) = &self.description {
            out.push('\n');
            out.push_str(description);
            out.push('\n');
        }

        let positionals: Vec<&ArgDef> = self
            .args
            .iter()
            .filter(|a| a.is_positional() && !a.config.hidden)
            .collect();
        if !positionals.is_empty() {
            out.push_str("\npositional arguments:\n");
            for arg in positionals {
                push_entry(&mut out, &self.invocation(arg), arg.config.help.as_deref());
            }
        }

        out.push_str("\noptions:\n");
        push_entry(&mut out, "-h, --help", Some("show this help message and exit"));
        for arg in self
            .args
            .iter()
            .filter(|a| !a.is_positional() && !a.config.hidden && a.group.is_none())
        {
            push_entry(&mut out, &self.invocation(arg), arg.config.help.as_deref());
        }

        for (id, title) in self.groups.iter().enumerate() {
            let members: Vec<&ArgDef> = self
                .args
                .iter()
                .filter(|a| a.group == Some(id) && !a.config.hidden)
                .collect();
            if members.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{title}:\n"));
            for arg in members {
                push_entry(&mut out, &self.invocation(arg), arg.config.help.as_deref());
            }
        }

        if let Some(epilog) = &self.epilog {
            out.push('\n');
            out.push_str(epilog);
            out.push('\n');
        }
        out
    }

    /// The full `usage:` banner, for error output.
    pub fn usage_text(&self) -> String {
        format!("usage: {}", self.usage_line())
    }

    /// Program name.
    pub fn prog(&self) -> &str {
        &self.prog
    }

    fn usage_line(&self) -> String {
        if let Some(usage) = &self.usage {
            return usage.clone();
        }
        let mut parts = vec![self.prog.clone(), "[-h]".to_owned()];
        let mut seen_ex: HashSet<ExGroupId> = HashSet::new();
        for arg in self.args.iter().filter(|a| !a.is_positional()) {
            if arg.config.hidden {
                continue;
            }
            if let Some(ex) = arg.ex_group {
                if !seen_ex.insert(ex) {
                    continue;
                }
                let members: Vec<String> = self
                    .args
                    .iter()
                    .filter(|a| a.ex_group == Some(ex) && !a.config.hidden)
                    .map(|a| self.short_invocation(a))
                    .collect();
                let cluster = members.join(" | ");
                if self.ex_groups[ex].required {
                    parts.push(format!("({cluster})"));
                } else {
                    parts.push(format!("[{cluster}]"));
                }
                continue;
            }
            let inv = self.short_invocation(arg);
            if arg.config.required {
                parts.push(inv);
            } else {
                parts.push(format!("[{inv}]"));
            }
        }
        for arg in self.args.iter().filter(|a| a.is_positional()) {
            let metavar = arg.metavar();
            match arg.config.nargs {
                Some(Nargs::Optional) => parts.push(format!("[{metavar}]")),
                Some(Nargs::Star) => parts.push(format!("[{metavar} ...]")),
                Some(Nargs::Plus) => parts.push(format!("{metavar} [{metavar} ...]")),
                Some(Nargs::Fixed(n)) => {
                    parts.push(vec![metavar; n].join(" "));
                }
                None => parts.push(metavar),
            }
        }
        parts.join(" ")
    }

    fn short_invocation(&self, arg: &ArgDef) -> String {
        let flag = arg.flags.first().cloned().unwrap_or_default();
        if arg.action().takes_value() {
            format!("{flag} {}", arg.metavar())
        } else {
            flag
        }
    }

    fn invocation(&self, arg: &ArgDef) -> String {
        if arg.is_positional() {
            return arg.metavar();
        }
        let metavar = arg.metavar();
        arg.flags
            .iter()
            .map(|flag| {
                if arg.action().takes_value() {
                    format!("{flag} {metavar}")
                } else {
                    flag.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

const HELP_COLUMN: usize = 24;

fn push_entry(out: &mut String, invocation: &str, help: Option<&str>) {
    match help {
        Some(help) if !help.is_empty() => {
            if invocation.len() + 2 >= HELP_COLUMN {
                out.push_str(&format!("  {invocation}\n"));
                out.push_str(&format!("{:width$}{help}\n", "", width = HELP_COLUMN));
            } else {
                out.push_str(&format!(
                    "  {invocation:<width$}{help}\n",
                    width = HELP_COLUMN - 2
                ));
            }
        }
        _ => out.push_str(&format!("  {invocation}\n")),
    }
}

fn reject_inline(flag: &str, inline: &Option<String>) -> Result<(), ParseError> {
    match inline {
        Some(value) => Err(ParseError::Invalid(format!(
            "argument {flag}: ignored explicit argument {value:?}"
        ))),
        None => Ok(()),
    }
}

fn looks_like_flag(token: &str) -> bool {
    if !token.starts_with('-') || token.len() < 2 {
        return false;
    }
    // negative numbers are values
    !token[1..]
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '.')
        .unwrap_or(false)
}

struct ParseState<'a> {
    backend: &'a Backend,
    ns: Namespace,
    supplied: HashSet<String>,
    ex_used: HashMap<ExGroupId, (usize, String)>,
    accumulated: HashSet<String>,
    positionals: Vec<String>,
}

impl ParseState<'_> {
    fn handle_flag(&mut self, tokens: &[String], i: usize) -> Result<usize, ParseError> {
        let token = &tokens[i];
        let (index, flag, inline) = self.resolve_flag(token)?;
        let arg = &self.backend.args[index];

        self.check_exclusive(index, arg, &flag)?;
        self.supplied.insert(arg.dest.clone());

        match arg.action() {
            Action::StoreTrue => {
                reject_inline(&flag, &inline)?;
                self.ns.values.insert(arg.dest.clone(), Value::Bool(true));
                Ok(i + 1)
            }
            Action::StoreFalse => {
                reject_inline(&flag, &inline)?;
                self.ns.values.insert(arg.dest.clone(), Value::Bool(false));
                Ok(i + 1)
            }
            Action::StoreConst => {
                reject_inline(&flag, &inline)?;
                let constant = arg.config.constant.clone().unwrap_or(Value::None);
                self.ns.values.insert(arg.dest.clone(), constant);
                Ok(i + 1)
            }
            Action::AppendConst => {
                reject_inline(&flag, &inline)?;
                let constant = arg.config.constant.clone().unwrap_or(Value::None);
                self.append_value(&arg.dest.clone(), constant);
                Ok(i + 1)
            }
            Action::Count => {
                reject_inline(&flag, &inline)?;
                let current = self
                    .ns
                    .values
                    .get(&arg.dest)
                    .and_then(Value::as_int)
                    .unwrap_or(0);
                self.ns.values.insert(arg.dest.clone(), Value::Int(current + 1));
                Ok(i + 1)
            }
            Action::Store | Action::Append | Action::Extend => {
                self.consume_values(tokens, i, index, &flag, inline)
            }
        }
    }

    fn resolve_flag(&self, token: &str) -> Result<(usize, String, Option<String>), ParseError> {
        // exact flag first, then --flag=value / -f=value, then -fVALUE
        if let Some(index) = self.backend.find_flag(token) {
            return Ok((index, token.to_owned(), None));
        }
        if let Some(eq) = token.find('=') {
            let (flag, value) = (&token[..eq], &token[eq + 1..]);
            if let Some(index) = self.backend.find_flag(flag) {
                return Ok((index, flag.to_owned(), Some(value.to_owned())));
            }
        }
        if !token.starts_with("--") && token.chars().count() > 2 {
            // split after the second character, not at byte offset 2
            let cut = token
                .char_indices()
                .nth(2)
                .map(|(at, _)| at)
                .unwrap_or(token.len());
            let (flag, value) = token.split_at(cut);
            if let Some(index) = self.backend.find_flag(flag) {
                if self.backend.args[index].action().takes_value() {
                    return Ok((index, flag.to_owned(), Some(value.to_owned())));
                }
            }
        }
        Err(ParseError::Invalid(format!(
            "unrecognized arguments: {token}"
        )))
    }

    // exclusivity is tracked per registered argument, so repeating one
    // flag is fine while a sibling (an alias included) conflicts even
    // when both write to the same destination
    fn check_exclusive(&mut self, index: usize, arg: &ArgDef, flag: &str) -> Result<(), ParseError> {
        let Some(ex) = arg.ex_group else {
            return Ok(());
        };
        if let Some((used, previous)) = self.ex_used.get(&ex) {
            if *used != index {
                return Err(ParseError::Invalid(format!(
                    "argument {flag}: not allowed with argument {previous}"
                )));
            }
        }
        self.ex_used.insert(ex, (index, flag.to_owned()));
        Ok(())
    }

    fn consume_values(
        &mut self,
        tokens: &[String],
        i: usize,
        index: usize,
        flag: &str,
        inline: Option<String>,
    ) -> Result<usize, ParseError> {
        let arg = &self.backend.args[index];
        let mut raw: Vec<String> = Vec::new();
        let mut next = i + 1;

        if let Some(value) = inline {
            raw.push(value);
        } else {
            match arg.config.nargs {
                None => {
                    if next < tokens.len() && !looks_like_flag(&tokens[next]) {
                        raw.push(tokens[next].clone());
                        next += 1;
                    } else {
                        return Err(ParseError::Invalid(format!(
                            "argument {flag}: expected one argument"
                        )));
                    }
                }
                Some(Nargs::Optional) => {
                    if next < tokens.len() && !looks_like_flag(&tokens[next]) {
                        raw.push(tokens[next].clone());
                        next += 1;
                    } else {
                        // valueless occurrence stores the constant as-is
                        let constant = arg.config.constant.clone().unwrap_or(Value::None);
                        self.ns.values.insert(arg.dest.clone(), constant);
                        return Ok(next);
                    }
                }
                Some(Nargs::Star) | Some(Nargs::Plus) => {
                    while next < tokens.len() && !looks_like_flag(&tokens[next]) {
                        raw.push(tokens[next].clone());
                        next += 1;
                    }
                    if raw.is_empty() && arg.config.nargs == Some(Nargs::Plus) {
                        return Err(ParseError::Invalid(format!(
                            "argument {flag}: expected at least one argument"
                        )));
                    }
                }
                Some(Nargs::Fixed(n)) => {
                    while raw.len() < n && next < tokens.len() && !looks_like_flag(&tokens[next]) {
                        raw.push(tokens[next].clone());
                        next += 1;
                    }
                    if raw.len() != n {
                        return Err(ParseError::Invalid(format!(
                            "argument {flag}: expected {n} arguments"
                        )));
                    }
                }
            }
        }

        let values = cast_all(arg, flag, &raw)?;
        let dest = arg.dest.clone();
        let action = arg.action();
        let single = matches!(arg.config.nargs, None | Some(Nargs::Optional));
        let is_dict = matches!(arg.config.caster, Some(Caster::Dict { .. }));

        match action {
            Action::Store => {
                if is_dict && single {
                    self.merge_map(&dest, values.into_iter().next().unwrap_or(Value::None));
                } else if single {
                    self.ns
                        .values
                        .insert(dest, values.into_iter().next().unwrap_or(Value::None));
                } else {
                    self.ns.values.insert(dest, Value::List(values));
                }
            }
            Action::Append => {
                if single {
                    for value in values {
                        self.append_value(&dest, value);
                    }
                } else {
                    self.append_value(&dest, Value::List(values));
                }
            }
            Action::Extend => {
                // list-valued casts extend element-wise
                for value in values {
                    match value {
                        Value::List(items) => {
                            for item in items {
                                self.append_value(&dest, item);
                            }
                        }
                        value => self.append_value(&dest, value),
                    }
                }
            }
            _ => {}
        }
        Ok(next)
    }

    fn append_value(&mut self, dest: &str, value: Value) {
        // the first occurrence replaces the default; later ones extend
        let first = self.accumulated.insert(dest.to_owned());
        let entry = self.ns.values.entry(dest.to_owned()).or_insert(Value::None);
        match entry {
            Value::List(items) if !first => items.push(value),
            _ => *entry = Value::List(vec![value]),
        }
    }

    fn merge_map(&mut self, dest: &str, value: Value) {
        let first = self.accumulated.insert(dest.to_owned());
        let entry = self.ns.values.entry(dest.to_owned()).or_insert(Value::None);
        match (entry, value) {
            (Value::Map(existing), Value::Map(incoming)) if !first => {
                existing.extend(incoming);
            }
            (entry, value) => *entry = value,
        }
    }

    fn assign_positionals(&mut self) -> Result<(), ParseError> {
        let defs: Vec<usize> = self
            .backend
            .args
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_positional())
            .map(|(i, _)| i)
            .collect();

        // minimum token demand of the remaining positionals, so greedy
        // consumers leave enough behind
        let min_need: Vec<usize> = defs
            .iter()
            .map(|&i| match self.backend.args[i].config.nargs {
                None => 1,
                Some(Nargs::Fixed(n)) => n,
                Some(Nargs::Plus) => 1,
                Some(Nargs::Optional) | Some(Nargs::Star) => 0,
            })
            .collect();

        let mut cursor = 0usize;
        let total = self.positionals.len();
        for (pos, &index) in defs.iter().enumerate() {
            let arg = &self.backend.args[index];
            let rest_need: usize = min_need[pos + 1..].iter().sum();
            let available = total.saturating_sub(cursor).saturating_sub(rest_need);

            let take = match arg.config.nargs {
                None => {
                    if available < 1 {
                        return Err(ParseError::Invalid(format!(
                            "the following arguments are required: {}",
                            arg.metavar()
                        )));
                    }
                    1
                }
                Some(Nargs::Fixed(n)) => {
                    if available < n {
                        return Err(ParseError::Invalid(format!(
                            "argument {}: expected {n} arguments",
                            arg.metavar()
                        )));
                    }
                    n
                }
                Some(Nargs::Optional) => available.min(1),
                Some(Nargs::Star) => available,
                Some(Nargs::Plus) => {
                    if available < 1 {
                        return Err(ParseError::Invalid(format!(
                            "the following arguments are required: {}",
                            arg.metavar()
                        )));
                    }
                    available
                }
            };

            if take == 0 && matches!(arg.config.nargs, Some(Nargs::Optional)) {
                continue;
            }

            let raw: Vec<String> = self.positionals[cursor..cursor + take].to_vec();
            cursor += take;
            let name = arg.metavar();
            let mut values = cast_all(arg, &name, &raw)?;
            if arg.action() == Action::Extend {
                values = values
                    .into_iter()
                    .flat_map(|value| match value {
                        Value::List(items) => items,
                        value => vec![value],
                    })
                    .collect();
            }
            self.supplied.insert(arg.dest.clone());

            let single = matches!(arg.config.nargs, None | Some(Nargs::Optional));
            let dest = arg.dest.clone();
            if single {
                self.ns
                    .values
                    .insert(dest, values.into_iter().next().unwrap_or(Value::None));
            } else {
                self.ns.values.insert(dest, Value::List(values));
            }
        }

        if cursor < total {
            return Err(ParseError::Invalid(format!(
                "unrecognized arguments: {}",
                self.positionals[cursor..].join(" ")
            )));
        }
        Ok(())
    }

    fn check_required(&self) -> Result<(), ParseError> {
        let mut missing: Vec<String> = Vec::new();
        for arg in &self.backend.args {
            if arg.config.required
                && !arg.is_positional()
                && !self.supplied.contains(&arg.dest)
            {
                missing.push(arg.display_name());
            }
        }
        if !missing.is_empty() {
            return Err(ParseError::Invalid(format!(
                "the following arguments are required: {}",
                missing.join(", ")
            )));
        }

        for (id, cluster) in self.backend.ex_groups.iter().enumerate() {
            if cluster.required && !self.ex_used.contains_key(&id) {
                let members: Vec<String> = self
                    .backend
                    .args
                    .iter()
                    .filter(|a| a.ex_group == Some(id))
                    .map(|a| a.display_name())
                    .collect();
                return Err(ParseError::Invalid(format!(
                    "one of the arguments {} is required",
                    members.join(" ")
                )));
            }
        }
        Ok(())
    }
}

fn cast_all(arg: &ArgDef, flag: &str, raw: &[String]) -> Result<Vec<Value>, ParseError> {
    let mut values = Vec::with_capacity(raw.len());
    for token in raw {
        let value = match &arg.config.caster {
            Some(caster) => caster.cast(token).map_err(|source| ParseError::Cast {
                flag: flag.to_owned(),
                source,
            })?,
            None => Value::Str(token.clone()),
        };
        if let Some(choices) = &arg.config.choices {
            let rendered = value.to_string();
            if !choices.iter().any(|c| *c == rendered) {
                return Err(ParseError::Invalid(format!(
                    "argument {flag}: invalid choice: {rendered:?} (choose from {})",
                    choices.join(", ")
                )));
            }
        }
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn int_flag(backend: &mut Backend, dest: &str, flag: &str) {
        backend.add_flag(
            dest,
            &[flag.to_owned()],
            ArgConfig {
                caster: Some(Caster::Int),
                ..ArgConfig::default()
            },
            None,
            None,
        );
    }

    #[test]
    fn flag_value_forms() {
        let mut backend = Backend::new("test");
        int_flag(&mut backend, "a", "-a");

        for form in [&["-a", "1"][..], &["-a=1"], &["-a1"]] {
            let ns = backend.parse(&tokens(form)).unwrap();
            assert_eq!(ns.get("a"), Some(&Value::Int(1)), "{form:?}");
        }
    }

    #[test]
    fn long_flag_equals_form() {
        let mut backend = Backend::new("test");
        backend.add_flag(
            "name",
            &["--name".to_owned()],
            ArgConfig::default(),
            None,
            None,
        );
        let ns = backend.parse(&tokens(&["--name=x"])).unwrap();
        assert_eq!(ns.get("name"), Some(&Value::Str("x".into())));
    }

    #[test]
    fn unsupplied_flag_defaults_to_none() {
        let mut backend = Backend::new("test");
        int_flag(&mut backend, "a", "-a");
        let ns = backend.parse(&[]).unwrap();
        assert_eq!(ns.get("a"), Some(&Value::None));
    }

    #[test]
    fn store_true_and_count() {
        let mut backend = Backend::new("test");
        backend.add_flag(
            "v",
            &["-v".to_owned()],
            ArgConfig {
                action: Some(Action::Count),
                default: Some(Value::Int(0)),
                ..ArgConfig::default()
            },
            None,
            None,
        );
        backend.add_flag(
            "debug",
            &["--debug".to_owned()],
            ArgConfig {
                action: Some(Action::StoreTrue),
                default: Some(Value::Bool(false)),
                ..ArgConfig::default()
            },
            None,
            None,
        );
        let ns = backend
            .parse(&tokens(&["-v", "-v", "--debug"]))
            .unwrap();
        assert_eq!(ns.get("v"), Some(&Value::Int(2)));
        assert_eq!(ns.get("debug"), Some(&Value::Bool(true)));
    }

    #[test]
    fn append_accumulates() {
        let mut backend = Backend::new("test");
        backend.add_flag(
            "xs",
            &["-x".to_owned()],
            ArgConfig {
                action: Some(Action::Append),
                caster: Some(Caster::Int),
                default: Some(Value::List(Vec::new())),
                ..ArgConfig::default()
            },
            None,
            None,
        );
        let ns = backend.parse(&tokens(&["-x", "1", "-x", "2"])).unwrap();
        assert_eq!(
            ns.get("xs"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
    }

    #[test]
    fn append_restarts_from_default() {
        // default list contents never leak into a supplied parse
        let mut backend = Backend::new("test");
        backend.add_flag(
            "xs",
            &["-x".to_owned()],
            ArgConfig {
                action: Some(Action::Append),
                default: Some(Value::List(vec![Value::Str("seed".into())])),
                ..ArgConfig::default()
            },
            None,
            None,
        );
        let ns = backend.parse(&tokens(&["-x", "a"])).unwrap();
        assert_eq!(ns.get("xs"), Some(&Value::List(vec![Value::Str("a".into())])));
    }

    #[test]
    fn dict_occurrences_merge() {
        let mut backend = Backend::new("test");
        backend.add_flag(
            "env",
            &["-e".to_owned()],
            ArgConfig {
                caster: Some(Caster::Dict {
                    value: Box::new(Caster::Str),
                }),
                ..ArgConfig::default()
            },
            None,
            None,
        );
        let ns = backend.parse(&tokens(&["-e", "a=1", "-e", "b=2"])).unwrap();
        let map = ns.get("env").unwrap().as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], Value::Str("1".into()));
        assert_eq!(map["b"], Value::Str("2".into()));
    }

    #[test]
    fn positional_distribution() {
        let mut backend = Backend::new("test");
        backend.add_positional("first", "FIRST", ArgConfig::default(), None);
        backend.add_positional(
            "rest",
            "REST",
            ArgConfig {
                nargs: Some(Nargs::Star),
                action: Some(Action::Extend),
                default: Some(Value::List(Vec::new())),
                ..ArgConfig::default()
            },
            None,
        );
        let ns = backend.parse(&tokens(&["a", "b", "c"])).unwrap();
        assert_eq!(ns.get("first"), Some(&Value::Str("a".into())));
        assert_eq!(
            ns.get("rest"),
            Some(&Value::List(vec![
                Value::Str("b".into()),
                Value::Str("c".into())
            ]))
        );
    }

    #[test]
    fn optional_positional_keeps_default() {
        let mut backend = Backend::new("test");
        backend.add_positional(
            "a",
            "A",
            ArgConfig {
                nargs: Some(Nargs::Optional),
                default: Some(Value::Str("fallback".into())),
                ..ArgConfig::default()
            },
            None,
        );
        let ns = backend.parse(&[]).unwrap();
        assert_eq!(ns.get("a"), Some(&Value::Str("fallback".into())));
    }

    #[test]
    fn double_dash_ends_flags() {
        let mut backend = Backend::new("test");
        backend.add_positional(
            "items",
            "ITEMS",
            ArgConfig {
                nargs: Some(Nargs::Star),
                ..ArgConfig::default()
            },
            None,
        );
        let ns = backend.parse(&tokens(&["--", "-x", "-y"])).unwrap();
        assert_eq!(
            ns.get("items"),
            Some(&Value::List(vec![
                Value::Str("-x".into()),
                Value::Str("-y".into())
            ]))
        );
    }

    #[test]
    fn negative_numbers_are_values() {
        let mut backend = Backend::new("test");
        int_flag(&mut backend, "a", "-a");
        let ns = backend.parse(&tokens(&["-a", "-5"])).unwrap();
        assert_eq!(ns.get("a"), Some(&Value::Int(-5)));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let backend = Backend::new("test");
        let err = backend.parse(&tokens(&["-z"])).unwrap_err();
        assert_eq!(err.code(), 2);
        assert_eq!(err.to_string(), "unrecognized arguments: -z");
    }

    #[test]
    fn missing_value_is_rejected() {
        let mut backend = Backend::new("test");
        int_flag(&mut backend, "a", "-a");
        let err = backend.parse(&tokens(&["-a"])).unwrap_err();
        assert_eq!(err.to_string(), "argument -a: expected one argument");
    }

    #[test]
    fn cast_failure_names_the_flag() {
        let mut backend = Backend::new("test");
        int_flag(&mut backend, "a", "-a");
        let err = backend.parse(&tokens(&["-a", "x"])).unwrap_err();
        assert_eq!(err.to_string(), "argument -a: invalid int value: \"x\"");
        assert_eq!(err.code(), 2);
    }

    #[test]
    fn choices_are_enforced() {
        let mut backend = Backend::new("test");
        backend.add_flag(
            "level",
            &["--level".to_owned()],
            ArgConfig {
                choices: Some(vec!["low".into(), "high".into()]),
                ..ArgConfig::default()
            },
            None,
            None,
        );
        let err = backend.parse(&tokens(&["--level", "mid"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument --level: invalid choice: \"mid\" (choose from low, high)"
        );
    }

    #[test]
    fn required_flag_is_checked() {
        let mut backend = Backend::new("test");
        backend.add_flag(
            "a",
            &["-a".to_owned()],
            ArgConfig {
                required: true,
                ..ArgConfig::default()
            },
            None,
            None,
        );
        let err = backend.parse(&[]).unwrap_err();
        assert_eq!(err.to_string(), "the following arguments are required: -a");
    }

    #[test]
    fn exclusive_cluster_rejects_pairs() {
        let mut backend = Backend::new("test");
        let ex = backend.open_exclusive_group(false);
        backend.add_flag(
            "a",
            &["-a".to_owned()],
            ArgConfig {
                action: Some(Action::StoreTrue),
                ..ArgConfig::default()
            },
            None,
            Some(ex),
        );
        backend.add_flag(
            "b",
            &["-b".to_owned()],
            ArgConfig {
                action: Some(Action::StoreTrue),
                ..ArgConfig::default()
            },
            None,
            Some(ex),
        );

        assert!(backend.parse(&tokens(&["-a"])).is_ok());
        let err = backend.parse(&tokens(&["-a", "-b"])).unwrap_err();
        assert_eq!(err.to_string(), "argument -b: not allowed with argument -a");
    }

    #[test]
    fn exclusive_siblings_conflict_even_on_a_shared_destination() {
        let mut backend = Backend::new("test");
        let ex = backend.open_exclusive_group(false);
        for flag in ["--low", "--high"] {
            backend.add_flag(
                "level",
                &[flag.to_owned()],
                ArgConfig {
                    action: Some(Action::StoreConst),
                    constant: Some(Value::Str(flag.trim_start_matches('-').to_owned())),
                    ..ArgConfig::default()
                },
                None,
                Some(ex),
            );
        }

        // repeating one member stays legal
        let ns = backend.parse(&tokens(&["--low", "--low"])).unwrap();
        assert_eq!(ns.get("level"), Some(&Value::Str("low".into())));

        let err = backend.parse(&tokens(&["--low", "--high"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument --high: not allowed with argument --low"
        );
    }

    #[test]
    fn multibyte_short_token_is_rejected_not_split() {
        let mut backend = Backend::new("test");
        int_flag(&mut backend, "a", "-a");
        let err = backend.parse(&tokens(&["-é5"])).unwrap_err();
        assert_eq!(err.to_string(), "unrecognized arguments: -é5");
    }

    #[test]
    fn required_cluster_needs_one_member() {
        let mut backend = Backend::new("test");
        let ex = backend.open_exclusive_group(true);
        backend.add_flag(
            "a",
            &["-a".to_owned()],
            ArgConfig {
                action: Some(Action::StoreTrue),
                ..ArgConfig::default()
            },
            None,
            Some(ex),
        );
        backend.add_flag(
            "b",
            &["-b".to_owned()],
            ArgConfig {
                action: Some(Action::StoreTrue),
                ..ArgConfig::default()
            },
            None,
            Some(ex),
        );
        let err = backend.parse(&[]).unwrap_err();
        assert_eq!(err.to_string(), "one of the arguments -a -b is required");
    }

    #[test]
    fn help_interrupts_with_code_zero() {
        let mut backend = Backend::new("prog");
        int_flag(&mut backend, "a", "-a");
        let err = backend.parse(&tokens(&["--help"])).unwrap_err();
        assert_eq!(err.code(), 0);
        let ParseError::Help(text) = err else {
            panic!("expected help");
        };
        assert!(text.starts_with("usage: prog"));
        assert!(text.contains("-h, --help"));
    }

    #[test]
    fn help_hides_hidden_and_groups_sections() {
        let mut backend = Backend::new("prog").with_description("a test program");
        let group = backend.open_group("tuning");
        backend.add_flag(
            "secret",
            &["--secret".to_owned()],
            ArgConfig {
                hidden: true,
                ..ArgConfig::default()
            },
            None,
            None,
        );
        backend.add_flag(
            "rate",
            &["--rate".to_owned()],
            ArgConfig {
                help: Some("sample rate".into()),
                ..ArgConfig::default()
            },
            Some(group),
            None,
        );
        let text = backend.render_help();
        assert!(!text.contains("--secret"));
        assert!(text.contains("a test program"));
        assert!(text.contains("tuning:"));
        assert!(text.contains("--rate RATE"));
        assert!(text.contains("sample rate"));
    }
}
