//! Command entries: one registered, invokable command.

use std::fmt;
use std::sync::Arc;

use argdecl_core::cast::Caster;
use argdecl_core::validator::Validator;
use argdecl_core::value::Value;

use crate::router::DispatchError;

/// The callable side of an entry: receives the host and the bound
/// parameter values, one per declared parameter.
pub type Handler<H> =
    Arc<dyn Fn(&mut H, Vec<Value>) -> Result<Value, DispatchError> + Send + Sync>;

/// One declared parameter of a command.
#[derive(Clone)]
pub struct ParamSpec {
    pub(crate) name: String,
    pub(crate) optional: bool,
    pub(crate) variadic: bool,
    pub(crate) caster: Option<Caster>,
    pub(crate) validator: Option<Validator>,
}

impl ParamSpec {
    /// A required positional parameter.
    pub fn new(name: impl Into<String>) -> Self {
        ParamSpec {
            name: name.into(),
            optional: false,
            variadic: false,
            caster: None,
            validator: None,
        }
    }

    /// Allow omitting the parameter; it binds to null.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Collect every remaining token into a list. Only valid in tail
    /// position.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Cast tokens before binding.
    pub fn caster(mut self, caster: Caster) -> Self {
        self.caster = Some(caster);
        self
    }

    /// Validate bound values.
    pub fn validator(mut self, validator: impl Into<Validator>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("optional", &self.optional)
            .field("variadic", &self.variadic)
            .finish_non_exhaustive()
    }
}

/// A registered command: names, ordering, parameters, and handler.
pub struct CommandEntry<H> {
    pub(crate) group: Option<String>,
    pub(crate) command: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) order: f64,
    pub(crate) usage: Option<String>,
    pub(crate) doc: Option<String>,
    pub(crate) hidden: bool,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) handler: Handler<H>,
}

impl<H> CommandEntry<H> {
    /// A new entry for the named command.
    pub fn new(
        command: impl Into<String>,
        handler: impl Fn(&mut H, Vec<Value>) -> Result<Value, DispatchError> + Send + Sync + 'static,
    ) -> Self {
        CommandEntry {
            group: None,
            command: command.into(),
            aliases: Vec::new(),
            order: 0.0,
            usage: None,
            doc: None,
            hidden: false,
            params: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Put the entry in a named group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Add an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sort key for usage listings; entries compare ascending.
    pub fn order(mut self, order: f64) -> Self {
        self.order = order;
        self
    }

    /// Replace the generated signature in usage listings.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Documentation; the first sentence appears in usage listings.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Hide from usage listings.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Declare the next parameter.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Primary command name.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Group name, if grouped.
    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Alias names.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Declared parameters.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Whether the entry answers to the given token.
    pub fn answers_to(&self, token: &str) -> bool {
        self.command == token || self.aliases.iter().any(|a| a == token)
    }
}

impl<H> fmt::Debug for CommandEntry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("group", &self.group)
            .field("command", &self.command)
            .field("aliases", &self.aliases)
            .field("order", &self.order)
            .field("hidden", &self.hidden)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
