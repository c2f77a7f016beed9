//! Field tables: the declaration registry for one parser type.
//!
//! A [`FieldTable`] collects the bound fields of a declared type,
//! including everything inherited from parent tables. Resolution follows
//! class-hierarchy rules: each attribute name appears once, the
//! most-derived declaration wins, and the field keeps the position where
//! the base-most ancestor first declared it. That keeps help output
//! stable when a derived type merely tweaks an inherited field.

use tracing::debug;

use crate::error::{ConfigError, ValidationError};
use crate::field::{FieldSpec, FieldStore, SpecEdit};

/// The resolved, ordered field set of one declared type.
///
/// # Examples
///
/// ```
/// use argdecl_core::field::FieldSpec;
/// use argdecl_core::infer::DeclaredType;
/// use argdecl_core::table::FieldTable;
///
/// let table = FieldTable::builder("Example")
///     .field("verbose", FieldSpec::new(DeclaredType::Bool).flag("-v"))
///     .build()
///     .unwrap();
/// assert_eq!(table.fields().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FieldTable {
    owner: String,
    fields: Vec<FieldSpec>,
    usage: Option<String>,
    description: Option<String>,
    epilog: Option<String>,
}

impl FieldTable {
    /// Start building a table for the named owner type.
    pub fn builder(owner: impl Into<String>) -> FieldTableBuilder {
        FieldTableBuilder {
            owner: owner.into(),
            inherited: Vec::new(),
            entries: Vec::new(),
            usage: None,
            description: None,
            epilog: None,
        }
    }

    /// Owner type name.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// All fields in stable declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field by attribute name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name() == Some(name))
    }

    /// Usage line for help output, if declared.
    pub fn usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    /// Description for help output, if declared.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Epilog for help output, if declared.
    pub fn epilog(&self) -> Option<&str> {
        self.epilog.as_deref()
    }

    /// A store seeded with every field's default. Fields without a
    /// default stay unset. Defaults run through their validators.
    pub fn with_defaults(&self) -> Result<FieldStore, ValidationError> {
        let mut store = FieldStore::new();
        for field in &self.fields {
            field.apply_default(&mut store)?;
        }
        Ok(store)
    }
}

/// Accumulates declarations and inherited tables, then resolves them.
pub struct FieldTableBuilder {
    owner: String,
    inherited: Vec<FieldTable>,
    entries: Vec<Entry>,
    usage: Option<String>,
    description: Option<String>,
    epilog: Option<String>,
}

enum Entry {
    Declare(String, FieldSpec),
    Override(String, SpecEdit),
    Remove(String),
}

impl FieldTableBuilder {
    /// Inherit every field of a parent table. Parents are consulted in
    /// the order given; for a name several parents declare, the first
    /// parent wins.
    pub fn inherit(mut self, parent: &FieldTable) -> Self {
        self.inherited.push(parent.clone());
        self
    }

    /// Declare a field, shadowing any inherited one of the same name.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.entries.push(Entry::Declare(name.into(), spec));
        self
    }

    /// Re-declare an inherited field with edited keywords.
    pub fn override_field(mut self, name: impl Into<String>, edit: SpecEdit) -> Self {
        self.entries.push(Entry::Override(name.into(), edit));
        self
    }

    /// Drop an inherited field entirely.
    pub fn remove_field(mut self, name: impl Into<String>) -> Self {
        self.entries.push(Entry::Remove(name.into()));
        self
    }

    /// Set the usage line.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Set a multi-line usage, joined the way continuation lines are
    /// indented in help output.
    pub fn usages<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        self.usage = Some(lines.join("\n       "));
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the epilog.
    pub fn epilog(mut self, epilog: impl Into<String>) -> Self {
        self.epilog = Some(epilog.into());
        self
    }

    /// Resolve inheritance and declarations into a table.
    pub fn build(mut self) -> Result<FieldTable, ConfigError> {
        // ordering pass: base-most first encounter decides position
        let mut order: Vec<String> = Vec::new();
        for parent in self.inherited.iter().rev() {
            for field in parent.fields() {
                if let Some(name) = field.name() {
                    if !order.iter().any(|n| n == name) {
                        order.push(name.to_owned());
                    }
                }
            }
        }
        let inherited_names = order.clone();

        let mut declared: Vec<(String, FieldSpec)> = Vec::new();
        let mut removed: Vec<String> = Vec::new();

        let entries = std::mem::take(&mut self.entries);
        for entry in entries {
            match entry {
                Entry::Declare(name, mut spec) => {
                    if declared.iter().any(|(n, _)| *n == name) {
                        return Err(ConfigError::DuplicateField {
                            owner: self.owner.clone(),
                            field: name,
                        });
                    }
                    // an inherited name only comes back via override_field
                    if inherited_names.iter().any(|n| *n == name) {
                        return Err(ConfigError::SpecReuse {
                            owner: self.owner.clone(),
                            field: name,
                        });
                    }
                    spec.bind(&name, &self.owner)?;
                    if !order.iter().any(|n| *n == name) {
                        order.push(name.clone());
                    }
                    declared.push((name, spec));
                }
                Entry::Override(name, edit) => {
                    let base = declared
                        .iter()
                        .find(|(n, _)| *n == name)
                        .map(|(_, s)| s.clone())
                        .or_else(|| self.lookup_inherited(&name));
                    let Some(base) = base else {
                        return Err(ConfigError::UnknownField {
                            owner: self.owner.clone(),
                            field: name,
                        });
                    };
                    let mut spec = base.with_edit(edit)?;
                    spec.bind(&name, &self.owner)?;
                    declared.retain(|(n, _)| *n != name);
                    declared.push((name, spec));
                }
                Entry::Remove(name) => {
                    if !order.iter().any(|n| *n == name)
                        && !declared.iter().any(|(n, _)| *n == name)
                    {
                        return Err(ConfigError::UnknownField {
                            owner: self.owner.clone(),
                            field: name,
                        });
                    }
                    declared.retain(|(n, _)| *n != name);
                    removed.push(name);
                }
            }
        }

        let mut fields = Vec::with_capacity(order.len());
        for name in &order {
            if removed.iter().any(|n| n == name) {
                continue;
            }
            let winner = declared
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, s)| s.clone())
                .or_else(|| self.lookup_inherited(name));
            if let Some(spec) = winner {
                fields.push(spec);
            }
        }

        debug!(owner = %self.owner, fields = fields.len(), "resolved field table");
        Ok(FieldTable {
            owner: self.owner,
            fields,
            usage: self.usage,
            description: self.description,
            epilog: self.epilog,
        })
    }

    fn lookup_inherited(&self, name: &str) -> Option<FieldSpec> {
        // most-derived lookup: parents in inheritance order
        for parent in &self.inherited {
            if let Some(spec) = parent.get(name) {
                return Some(spec.clone());
            }
        }
        None
    }
}
