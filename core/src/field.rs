//! Field specifications: the declarative unit behind every flag and
//! positional argument.
//!
//! A [`FieldSpec`] is declared unbound, then bound once to an attribute
//! name by its owning table. Binding runs keyword completion: the
//! declared type is folded into a caster, an action, defaults, choices,
//! and a metavar, so the parser backend receives a fully specified
//! argument. The original declaration keywords are kept separately from
//! the completed ones, and overrides (see [`SpecEdit`]) always start
//! from the originals.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::cast::Caster;
use crate::error::{ConfigError, ValidationError};
use crate::infer::DeclaredType;
use crate::validator::Validator;
use crate::value::Value;

/// What the backend does when a field's flag or value is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Store the casted value.
    Store,
    /// Store the field's constant.
    StoreConst,
    /// Store `true`.
    StoreTrue,
    /// Store `false`.
    StoreFalse,
    /// Append the casted value to a list.
    Append,
    /// Append the field's constant to a list.
    AppendConst,
    /// Extend a list with every following value.
    Extend,
    /// Count occurrences.
    Count,
}

impl Action {
    /// Whether this action consumes value tokens.
    pub fn takes_value(self) -> bool {
        matches!(self, Action::Store | Action::Append | Action::Extend)
    }

    /// Whether this action accumulates into a list.
    pub fn is_collection(self) -> bool {
        matches!(self, Action::Append | Action::AppendConst | Action::Extend)
    }
}

/// How many value tokens a field consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nargs {
    /// Exactly `n` tokens, gathered into a list.
    Fixed(usize),
    /// Zero or one token (`?`).
    Optional,
    /// Zero or more tokens (`*`).
    Star,
    /// One or more tokens (`+`).
    Plus,
}

/// Declaration keywords for a field, mirrored before and after
/// completion.
#[derive(Debug, Clone, Default)]
pub struct ArgKwargs {
    /// Parse action.
    pub action: Option<Action>,
    /// Token count.
    pub nargs: Option<Nargs>,
    /// Constant for `StoreConst`/`AppendConst`.
    pub const_value: Option<Value>,
    /// Default value. `Some(Value::None)` is a present null default.
    pub default: Option<Value>,
    /// Token caster.
    pub caster: Option<Caster>,
    /// Accepted casted values.
    pub choices: Option<Vec<String>>,
    /// Whether the field must be supplied.
    pub required: Option<bool>,
    /// Help text.
    pub help: Option<String>,
    /// Value placeholder in usage lines.
    pub metavar: Option<String>,
}

/// Parsed values, keyed by attribute name.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct FieldStore {
    values: HashMap<String, Value>,
}

impl FieldStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw access without unset tracking.
    pub fn get_raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Store a value directly, bypassing validation.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Drop a value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Whether the field holds a value.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// All held values.
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }
}

/// One declared command-line field.
///
/// # Examples
///
/// ```
/// use argdecl_core::field::FieldSpec;
/// use argdecl_core::infer::DeclaredType;
///
/// let mut spec = FieldSpec::new(DeclaredType::Int)
///     .flag("-n")
///     .help("worker count");
/// spec.bind("workers", "Example").unwrap();
/// assert_eq!(spec.name(), Some("workers"));
/// ```
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: Option<String>,
    owner: Option<String>,
    declared: DeclaredType,
    flags: Vec<String>,
    group: Option<String>,
    ex_group: Option<String>,
    hidden: bool,
    validator: Option<Validator>,
    aliases: Vec<(String, Value)>,
    raw: ArgKwargs,
    kwargs: ArgKwargs,
}

impl FieldSpec {
    /// A new unbound field of the declared type.
    pub fn new(declared: DeclaredType) -> Self {
        FieldSpec {
            name: None,
            owner: None,
            declared,
            flags: Vec::new(),
            group: None,
            ex_group: None,
            hidden: false,
            validator: None,
            aliases: Vec::new(),
            raw: ArgKwargs::default(),
            kwargs: ArgKwargs::default(),
        }
    }

    /// A positional field named `metavar` in usage lines.
    pub fn positional(metavar: impl Into<String>, declared: DeclaredType) -> Self {
        let mut spec = FieldSpec::new(declared);
        spec.raw.metavar = Some(metavar.into());
        spec
    }

    /// A variable-length positional field collecting the remaining
    /// tokens into a list.
    pub fn variadic(metavar: impl Into<String>, declared: DeclaredType) -> Self {
        let mut spec = FieldSpec::new(declared);
        spec.raw.metavar = Some(metavar.into());
        spec.raw.nargs = Some(Nargs::Star);
        spec.raw.action = Some(Action::Extend);
        spec
    }

    /// Add one option flag.
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Add several option flags.
    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Shorthand flags expanding to constant values of the primary
    /// flag, rendered as one mutually exclusive cluster.
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        self.aliases
            .extend(aliases.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Put the field in a named help group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Put the field in a mutually exclusive cluster.
    pub fn ex_group(mut self, ex_group: impl Into<String>) -> Self {
        self.ex_group = Some(ex_group.into());
        self
    }

    /// Hide the field from help output.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Attach a validator, run on every assignment.
    pub fn validator(mut self, validator: impl Into<Validator>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    /// Set the parse action.
    pub fn action(mut self, action: Action) -> Self {
        self.raw.action = Some(action);
        self
    }

    /// Set the token count.
    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.raw.nargs = Some(nargs);
        self
    }

    /// Set the constant for const actions.
    pub fn const_value(mut self, value: Value) -> Self {
        self.raw.const_value = Some(value);
        self
    }

    /// Set the default value.
    pub fn default(mut self, value: Value) -> Self {
        self.raw.default = Some(value);
        self
    }

    /// Override the inferred caster.
    pub fn caster(mut self, caster: Caster) -> Self {
        self.raw.caster = Some(caster);
        self
    }

    /// Restrict accepted values.
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Mark the field as required.
    pub fn required(mut self, required: bool) -> Self {
        self.raw.required = Some(required);
        self
    }

    /// Set the help text. `{DEFAULT}` is replaced by the default value
    /// at bind time; otherwise the default is appended.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.raw.help = Some(help.into());
        self
    }

    /// Set the value placeholder for usage lines.
    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.raw.metavar = Some(metavar.into());
        self
    }

    /// Bind to an attribute of an owner and complete the keywords.
    ///
    /// Binding is one-shot: a bound specification cannot be reused for
    /// another attribute.
    pub fn bind(&mut self, name: &str, owner: &str) -> Result<(), ConfigError> {
        if self.name.is_some() {
            return Err(ConfigError::SpecReuse {
                owner: owner.to_owned(),
                field: name.to_owned(),
            });
        }
        for flag in &self.flags {
            if !flag.starts_with('-') {
                return Err(ConfigError::BadFlag { flag: flag.clone() });
            }
        }
        for (alias, _) in &self.aliases {
            if !alias.starts_with('-') {
                return Err(ConfigError::BadFlag {
                    flag: alias.clone(),
                });
            }
        }

        self.name = Some(name.to_owned());
        self.owner = Some(owner.to_owned());
        self.kwargs = self.complete(name)?;
        debug!(field = name, owner = owner, "bound field");
        Ok(())
    }

    fn complete(&self, name: &str) -> Result<ArgKwargs, ConfigError> {
        let mut kw = self.raw.clone();

        // a positional without a default consumes zero-or-one token
        if self.flags.is_empty() && kw.default.is_none() {
            kw.nargs.get_or_insert(Nargs::Optional);
        }

        if kw.caster.is_none() {
            if self.declared.is_bool() {
                complete_bool(&mut kw);
            }
            if self.declared.is_list() {
                kw.action.get_or_insert(Action::Append);
            } else {
                kw.action.get_or_insert(Action::Store);
            }

            match kw.action {
                Some(Action::Store) | Some(Action::StoreConst) => {
                    if self.declared.is_optional() {
                        kw.default.get_or_insert(Value::None);
                    }
                    if kw.caster.is_none() {
                        kw.caster = self.declared.caster();
                    }
                }
                Some(Action::Append) | Some(Action::AppendConst) | Some(Action::Extend) => {
                    kw.default.get_or_insert(Value::List(Vec::new()));
                    let elem = self.declared.list_elem().ok_or_else(|| {
                        ConfigError::BadDefinition(format!(
                            "{name}: collection action requires a list type, got {}",
                            self.declared
                        ))
                    })?;
                    kw.caster = elem.caster();
                }
                _ => {}
            }
        }

        if let DeclaredType::Literal(candidates) = &self.declared {
            // a candidate-less literal caster adopts the declared set
            if let Some(Caster::Literal {
                candidates: own, ..
            }) = &mut kw.caster
            {
                if own.is_empty() {
                    *own = candidates.clone();
                }
            }

            let completing = matches!(kw.caster, Some(Caster::Literal { complete: true, .. }));
            if !completing {
                kw.choices.get_or_insert_with(|| candidates.clone());
            }
            kw.metavar.get_or_insert_with(|| candidates.join("|"));
        }

        if let (Some(help), Some(default)) = (&kw.help, &kw.default) {
            let rendered = if help.contains("{DEFAULT}") {
                help.replace("{DEFAULT}", &default.repr())
            } else {
                format!("{help} (default: {})", default.repr())
            };
            kw.help = Some(rendered);
        }

        Ok(kw)
    }

    /// Derive a new unbound specification with edited keywords. Edits
    /// apply to the original declaration keywords, not the completed
    /// ones.
    pub fn with_edit(&self, edit: SpecEdit) -> Result<FieldSpec, ConfigError> {
        let field = self.name.clone().unwrap_or_else(|| "<unbound>".to_owned());

        let flags = match edit.flags {
            FlagEdit::Keep => self.flags.clone(),
            FlagEdit::Replace(list) => {
                self.check_flag_conversion(&field, !list.is_empty())?;
                list
            }
            FlagEdit::Append(extra) => {
                if self.flags.is_empty() && !extra.is_empty() {
                    return Err(ConfigError::IllegalOverride {
                        field,
                        reason: "cannot change positional argument to flagged".to_owned(),
                    });
                }
                let mut flags = self.flags.clone();
                flags.extend(extra);
                flags
            }
            FlagEdit::Rename(mapping) => self.rename_flags(&field, mapping, Vec::new())?,
            FlagEdit::RenameAppend(mapping, extra) => self.rename_flags(&field, mapping, extra)?,
        };

        let mut raw = self.raw.clone();
        raw.action = edit.action.apply(raw.action);
        raw.nargs = edit.nargs.apply(raw.nargs);
        raw.const_value = edit.const_value.apply(raw.const_value);
        raw.default = edit.default.apply(raw.default);
        raw.caster = edit.caster.apply(raw.caster);
        raw.choices = edit.choices.apply(raw.choices);
        raw.required = edit.required.apply(raw.required);
        raw.help = edit.help.apply(raw.help);
        raw.metavar = edit.metavar.apply(raw.metavar);

        Ok(FieldSpec {
            name: None,
            owner: None,
            declared: self.declared.clone(),
            flags,
            group: edit.group.apply(self.group.clone()),
            ex_group: edit.ex_group.apply(self.ex_group.clone()),
            hidden: edit.hidden.apply(Some(self.hidden)).unwrap_or(false),
            validator: edit.validator.apply(self.validator.clone()),
            aliases: self.aliases.clone(),
            kwargs: raw.clone(),
            raw,
        })
    }

    fn check_flag_conversion(&self, field: &str, flagged: bool) -> Result<(), ConfigError> {
        if self.flags.is_empty() && flagged {
            return Err(ConfigError::IllegalOverride {
                field: field.to_owned(),
                reason: "cannot change positional argument to flagged".to_owned(),
            });
        }
        if !self.flags.is_empty() && !flagged {
            return Err(ConfigError::IllegalOverride {
                field: field.to_owned(),
                reason: "cannot change flagged argument to positional".to_owned(),
            });
        }
        Ok(())
    }

    fn rename_flags(
        &self,
        field: &str,
        mapping: Vec<(String, Option<String>)>,
        extra: Vec<String>,
    ) -> Result<Vec<String>, ConfigError> {
        if self.flags.is_empty() && !extra.is_empty() {
            return Err(ConfigError::IllegalOverride {
                field: field.to_owned(),
                reason: "cannot change positional argument to flagged".to_owned(),
            });
        }
        let mut flags = Vec::new();
        for old in &self.flags {
            match mapping.iter().find(|(from, _)| from == old) {
                Some((_, Some(new))) => flags.push(new.clone()),
                Some((_, None)) => {}
                None => flags.push(old.clone()),
            }
        }
        flags.extend(extra);
        Ok(flags)
    }

    /// Attribute name, once bound.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Owning type name, once bound.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// The declared content type.
    pub fn declared(&self) -> &DeclaredType {
        &self.declared
    }

    /// Option flags; empty means positional.
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Whether the field is positional.
    pub fn is_positional(&self) -> bool {
        self.flags.is_empty()
    }

    /// Shorthand alias flags with their constants.
    pub fn alias_entries(&self) -> &[(String, Value)] {
        &self.aliases
    }

    /// Help group name, if grouped.
    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Mutually exclusive cluster name, if any.
    pub fn ex_group_name(&self) -> Option<&str> {
        self.ex_group.as_deref()
    }

    /// Whether the field is hidden from help.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// The attached validator, if any.
    pub fn validator_ref(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    /// Completed keywords (valid after binding).
    pub fn kwargs(&self) -> &ArgKwargs {
        &self.kwargs
    }

    /// Effective action after completion.
    pub fn effective_action(&self) -> Action {
        self.kwargs.action.unwrap_or(Action::Store)
    }

    /// Whether the field must be supplied.
    pub fn is_required(&self) -> bool {
        self.kwargs.required.unwrap_or(false)
    }

    /// The default value implied by the completed keywords, if any.
    pub fn default_value(&self) -> Option<Value> {
        if let Some(default) = &self.kwargs.default {
            return Some(default.clone());
        }
        if self.declared.is_bool() {
            return Some(Value::Bool(
                self.kwargs.action.unwrap_or(Action::StoreTrue) != Action::StoreTrue,
            ));
        }
        if self
            .kwargs
            .action
            .map(Action::is_collection)
            .unwrap_or(false)
        {
            return Some(Value::List(Vec::new()));
        }
        None
    }

    /// The constant stored by const actions, if any.
    pub fn const_value_or_implied(&self) -> Option<Value> {
        if let Some(value) = &self.kwargs.const_value {
            return Some(value.clone());
        }
        if self.declared.is_bool() {
            return Some(Value::Bool(
                self.kwargs.action.unwrap_or(Action::StoreTrue) == Action::StoreTrue,
            ));
        }
        None
    }

    /// Read the field's value from a store.
    pub fn get<'a>(&self, store: &'a FieldStore) -> Result<&'a Value, ValidationError> {
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| ValidationError::Invalid("unbound field".to_owned()))?;
        store
            .get_raw(name)
            .ok_or_else(|| ValidationError::Unset(name.to_owned()))
    }

    /// Validate and store a value.
    pub fn set(&self, store: &mut FieldStore, value: Value) -> Result<(), ValidationError> {
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| ValidationError::Invalid("unbound field".to_owned()))?;
        if let Some(validator) = &self.validator {
            validator.validate(&value)?;
        }
        store.insert(name, value);
        Ok(())
    }

    /// Drop the field's value, if present.
    pub fn unset(&self, store: &mut FieldStore) {
        if let Some(name) = self.name.as_deref() {
            store.remove(name);
        }
    }

    /// Assign the default, or unset when no default exists.
    pub fn apply_default(&self, store: &mut FieldStore) -> Result<(), ValidationError> {
        match self.default_value() {
            Some(value) => self.set(store, value),
            None => {
                self.unset(store);
                Ok(())
            }
        }
    }
}

fn complete_bool(kw: &mut ArgKwargs) {
    match &kw.default {
        None => {
            if kw.nargs.is_some() {
                kw.caster = Some(Caster::Bool);
                kw.action = Some(Action::Store);
            } else {
                kw.action.get_or_insert(Action::StoreTrue);
                kw.default.get_or_insert(Value::Bool(false));
            }
        }
        Some(default) if is_truthy(default) => {
            kw.action.get_or_insert(Action::StoreFalse);
        }
        Some(_) => {
            kw.action.get_or_insert(Action::StoreTrue);
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(x) => *x != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::List(items) => !items.is_empty(),
        Value::Map(entries) => !entries.is_empty(),
    }
}

/// A keyword change: keep the declared value, set a new one, or remove
/// it entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Edit<T> {
    /// Leave the declared value as is.
    #[default]
    Keep,
    /// Replace the declared value.
    Set(T),
    /// Remove the declared value.
    Unset,
}

impl<T> Edit<T> {
    fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Edit::Keep => current,
            Edit::Set(value) => Some(value),
            Edit::Unset => None,
        }
    }
}

/// How an override changes a field's option flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FlagEdit {
    /// Keep the declared flags.
    #[default]
    Keep,
    /// Replace the flag list.
    Replace(Vec<String>),
    /// Add flags after the declared ones.
    Append(Vec<String>),
    /// Rename flags; a `None` target removes the flag.
    Rename(Vec<(String, Option<String>)>),
    /// Rename and then add flags.
    RenameAppend(Vec<(String, Option<String>)>, Vec<String>),
}

/// A batch of keyword edits applied by [`FieldSpec::with_edit`].
#[derive(Debug, Clone, Default)]
pub struct SpecEdit {
    /// Flag change.
    pub flags: FlagEdit,
    /// Action change.
    pub action: Edit<Action>,
    /// Token-count change.
    pub nargs: Edit<Nargs>,
    /// Constant change.
    pub const_value: Edit<Value>,
    /// Default change.
    pub default: Edit<Value>,
    /// Caster change.
    pub caster: Edit<Caster>,
    /// Choice-set change.
    pub choices: Edit<Vec<String>>,
    /// Required change.
    pub required: Edit<bool>,
    /// Help-text change.
    pub help: Edit<String>,
    /// Metavar change.
    pub metavar: Edit<String>,
    /// Validator change.
    pub validator: Edit<Validator>,
    /// Help-group change.
    pub group: Edit<String>,
    /// Exclusive-cluster change.
    pub ex_group: Edit<String>,
    /// Visibility change.
    pub hidden: Edit<bool>,
}

impl SpecEdit {
    /// An edit that changes nothing.
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    /// Replace the help text.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Edit::Set(help.into());
        self
    }

    /// Replace the default value.
    pub fn default(mut self, value: Value) -> Self {
        self.default = Edit::Set(value);
        self
    }

    /// Remove the default value.
    pub fn unset_default(mut self) -> Self {
        self.default = Edit::Unset;
        self
    }

    /// Replace the validator.
    pub fn validator(mut self, validator: impl Into<Validator>) -> Self {
        self.validator = Edit::Set(validator.into());
        self
    }

    /// Replace the flag list.
    pub fn replace_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = FlagEdit::Replace(flags.into_iter().map(Into::into).collect());
        self
    }

    /// Add flags after the declared ones.
    pub fn add_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = FlagEdit::Append(flags.into_iter().map(Into::into).collect());
        self
    }

    /// Mark the field required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = Edit::Set(required);
        self
    }

    /// Hide or reveal the field.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Edit::Set(hidden);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator;

    fn bound(spec: FieldSpec, name: &str) -> FieldSpec {
        let mut spec = spec;
        spec.bind(name, "Test").unwrap();
        spec
    }

    #[test]
    fn bind_is_one_shot() {
        let mut spec = FieldSpec::new(DeclaredType::Str).flag("-a");
        spec.bind("a", "Test").unwrap();
        let err = spec.bind("b", "Test").unwrap_err();
        assert!(matches!(err, ConfigError::SpecReuse { .. }));
    }

    #[test]
    fn flags_must_be_dashed() {
        let mut spec = FieldSpec::new(DeclaredType::Str).flag("a");
        assert!(matches!(
            spec.bind("a", "Test"),
            Err(ConfigError::BadFlag { .. })
        ));
    }

    #[test]
    fn bool_flag_completion() {
        let spec = bound(FieldSpec::new(DeclaredType::Bool).flag("-v"), "verbose");
        assert_eq!(spec.effective_action(), Action::StoreTrue);
        assert_eq!(spec.default_value(), Some(Value::Bool(false)));
        assert_eq!(spec.const_value_or_implied(), Some(Value::Bool(true)));
    }

    #[test]
    fn bool_with_true_default_inverts() {
        let spec = bound(
            FieldSpec::new(DeclaredType::Bool)
                .flag("-q")
                .default(Value::Bool(true)),
            "quiet",
        );
        assert_eq!(spec.effective_action(), Action::StoreFalse);
        assert_eq!(spec.default_value(), Some(Value::Bool(true)));
    }

    #[test]
    fn bool_with_nargs_takes_textual_values() {
        let spec = bound(
            FieldSpec::new(DeclaredType::Bool)
                .flag("-b")
                .nargs(Nargs::Optional),
            "flagged",
        );
        assert_eq!(spec.effective_action(), Action::Store);
        let caster = spec.kwargs().caster.as_ref().unwrap();
        assert_eq!(caster.cast("yes").unwrap(), Value::Bool(true));
    }

    #[test]
    fn positional_without_default_is_optional_nargs() {
        let spec = bound(FieldSpec::positional("A", DeclaredType::Str), "a");
        assert_eq!(spec.kwargs().nargs, Some(Nargs::Optional));
        assert!(spec.is_positional());
    }

    #[test]
    fn optional_type_seeds_null_default() {
        let spec = bound(
            FieldSpec::new(DeclaredType::optional(DeclaredType::Int)).flag("-n"),
            "n",
        );
        assert_eq!(spec.default_value(), Some(Value::None));
    }

    #[test]
    fn list_completion_appends_elements() {
        let spec = bound(
            FieldSpec::new(DeclaredType::List(Box::new(DeclaredType::Int))).flag("-x"),
            "xs",
        );
        assert_eq!(spec.effective_action(), Action::Append);
        assert_eq!(spec.default_value(), Some(Value::List(Vec::new())));
        let caster = spec.kwargs().caster.as_ref().unwrap();
        assert_eq!(caster.cast("4").unwrap(), Value::Int(4));
    }

    #[test]
    fn literal_completion_sets_choices_and_metavar() {
        let spec = bound(
            FieldSpec::new(DeclaredType::literal(["a", "b", "c"])).flag("-l"),
            "l",
        );
        assert_eq!(
            spec.kwargs().choices.as_deref(),
            Some(&["a".to_owned(), "b".to_owned(), "c".to_owned()][..])
        );
        assert_eq!(spec.kwargs().metavar.as_deref(), Some("a|b|c"));
    }

    #[test]
    fn help_default_interpolation() {
        let spec = bound(
            FieldSpec::new(DeclaredType::Int)
                .flag("-n")
                .default(Value::Int(3))
                .help("count, default {DEFAULT}"),
            "n",
        );
        assert_eq!(spec.kwargs().help.as_deref(), Some("count, default 3"));

        let spec = bound(
            FieldSpec::new(DeclaredType::Int)
                .flag("-n")
                .default(Value::Int(3))
                .help("count"),
            "n",
        );
        assert_eq!(spec.kwargs().help.as_deref(), Some("count (default: 3)"));
    }

    #[test]
    fn optional_help_renders_capitalized_null_default() {
        let spec = bound(
            FieldSpec::new(DeclaredType::optional(DeclaredType::Int))
                .flag("-n")
                .help("limit"),
            "n",
        );
        assert_eq!(spec.kwargs().help.as_deref(), Some("limit (default: None)"));
    }

    #[test]
    fn set_runs_validator() {
        let spec = bound(
            FieldSpec::new(DeclaredType::Int)
                .flag("-n")
                .validator(validator::int().positive(false)),
            "n",
        );
        let mut store = FieldStore::new();
        assert!(spec.set(&mut store, Value::Int(3)).is_ok());
        assert_eq!(spec.get(&store).unwrap(), &Value::Int(3));

        let err = spec.set(&mut store, Value::Int(0)).unwrap_err();
        assert_eq!(err.to_string(), "not a positive value : 0");
    }

    #[test]
    fn get_before_set_reports_unset() {
        let spec = bound(FieldSpec::new(DeclaredType::Str).flag("-s"), "s");
        let store = FieldStore::new();
        let err = spec.get(&store).unwrap_err();
        assert!(matches!(err, ValidationError::Unset(_)));
    }

    #[test]
    fn edit_starts_from_original_keywords() {
        // help gets a default suffix at bind time; the override sees the
        // original text, not the completed one
        let base = bound(
            FieldSpec::new(DeclaredType::Int)
                .flag("-n")
                .default(Value::Int(3))
                .help("count"),
            "n",
        );
        assert_eq!(base.kwargs().help.as_deref(), Some("count (default: 3)"));

        let derived = bound(
            base.with_edit(SpecEdit::new().default(Value::Int(9))).unwrap(),
            "n",
        );
        assert_eq!(derived.kwargs().help.as_deref(), Some("count (default: 9)"));
    }

    #[test]
    fn edit_flag_forms() {
        let base = bound(
            FieldSpec::new(DeclaredType::Str).with_flags(["-a", "-b"]),
            "x",
        );

        let kept = base.with_edit(SpecEdit::new()).unwrap();
        assert_eq!(kept.flags(), &["-a", "-b"]);

        let replaced = base
            .with_edit(SpecEdit::new().replace_flags(["-c"]))
            .unwrap();
        assert_eq!(replaced.flags(), &["-c"]);

        let appended = base.with_edit(SpecEdit::new().add_flags(["-c"])).unwrap();
        assert_eq!(appended.flags(), &["-a", "-b", "-c"]);

        let renamed = base
            .with_edit(SpecEdit {
                flags: FlagEdit::Rename(vec![
                    ("-a".to_owned(), Some("-A".to_owned())),
                    ("-b".to_owned(), None),
                ]),
                ..SpecEdit::new()
            })
            .unwrap();
        assert_eq!(renamed.flags(), &["-A"]);

        let combined = base
            .with_edit(SpecEdit {
                flags: FlagEdit::RenameAppend(
                    vec![("-a".to_owned(), Some("-A".to_owned()))],
                    vec!["-c".to_owned()],
                ),
                ..SpecEdit::new()
            })
            .unwrap();
        assert_eq!(combined.flags(), &["-A", "-b", "-c"]);
    }

    #[test]
    fn edit_rejects_positional_conversion() {
        let positional = bound(FieldSpec::positional("A", DeclaredType::Str), "a");
        let err = positional
            .with_edit(SpecEdit::new().replace_flags(["-a"]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::IllegalOverride { .. }));

        let flagged = bound(FieldSpec::new(DeclaredType::Str).flag("-a"), "a");
        let err = flagged
            .with_edit(SpecEdit::new().replace_flags(Vec::<String>::new()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::IllegalOverride { .. }));
    }

    #[test]
    fn edit_can_unset_keywords() {
        let base = bound(
            FieldSpec::new(DeclaredType::Str)
                .flag("-s")
                .default(Value::Str("x".into())),
            "s",
        );
        let derived = bound(base.with_edit(SpecEdit::new().unset_default()).unwrap(), "s");
        assert_eq!(derived.default_value(), None);
    }

    #[test]
    fn edited_spec_is_rebindable() {
        let base = bound(FieldSpec::new(DeclaredType::Str).flag("-s"), "s");
        let mut derived = base.with_edit(SpecEdit::new()).unwrap();
        assert!(derived.bind("t", "Other").is_ok());
        assert_eq!(derived.owner(), Some("Other"));
    }
}
