//! Value validators: a small combinator algebra over parsed values.
//!
//! Validators run when a value is assigned to a field, after casting.
//! They are built fluently (see [`builders`]) and frozen into an
//! immutable [`Validator`] tree when attached to a field, so later edits
//! to a builder never leak into fields already declared.
//!
//! Composition follows two rules: `all` (conjunction) stops at the first
//! failing member and propagates its error; `any` (disjunction) tries
//! every member, mutes type-mismatch failures, and joins the remaining
//! failure messages with `"; "`.

pub mod builders;

use std::sync::Arc;

use crate::error::ValidationError;
use crate::value::Value;

pub use builders::{
    all, any, custom, custom_with, float, int, list, non_none, optional, path, str, tuple,
    FloatRules, IntRules, ListRules, PathRules, StrRules, TupleRules,
};

/// One evaluation step over a value. Returns `Err` with a message on
/// failure.
pub(crate) type RuleFn = dyn Fn(&Value) -> Result<(), ValidationError> + Send + Sync;

/// Shape tag for element-type checks inside list and tuple validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Boolean element.
    Bool,
    /// Integer element.
    Int,
    /// Float element.
    Float,
    /// String element.
    Str,
    /// Nested list element.
    List,
    /// Nested map element.
    Map,
}

impl ValueKind {
    /// Whether the value has exactly this shape.
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueKind::Bool, Value::Bool(_))
                | (ValueKind::Int, Value::Int(_))
                | (ValueKind::Float, Value::Float(_))
                | (ValueKind::Str, Value::Str(_))
                | (ValueKind::List, Value::List(_))
                | (ValueKind::Map, Value::Map(_))
        )
    }
}

/// Element selector for tuple item validators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSel {
    /// Every element.
    All,
    /// One position; negative counts from the end.
    One(i64),
    /// A set of positions.
    Many(Vec<i64>),
}

#[derive(Clone)]
pub(crate) enum LeafKind {
    Str,
    Int,
    Float,
    Path,
    List {
        elem: Option<ValueKind>,
        allow_empty: bool,
    },
    Tuple {
        shape: Vec<Option<ValueKind>>,
        variadic: bool,
    },
}

#[derive(Clone)]
pub(crate) enum Node {
    Pass,
    Leaf {
        kind: LeafKind,
        allow_none: bool,
        allow_nan: bool,
        rules: Vec<Arc<RuleFn>>,
    },
    Custom(Arc<RuleFn>),
    All(Vec<Node>),
    Any(Vec<Node>),
}

/// A frozen validator tree.
///
/// # Examples
///
/// ```
/// use argdecl_core::validator;
/// use argdecl_core::Value;
///
/// let v: validator::Validator = validator::int().in_range(Some(0), Some(10)).into();
/// assert!(v.validate(&Value::Int(5)).is_ok());
/// assert!(v.validate(&Value::Int(50)).is_err());
/// ```
#[derive(Clone)]
pub struct Validator(pub(crate) Node);

impl Validator {
    /// A validator that accepts everything.
    pub fn pass() -> Self {
        Validator(Node::Pass)
    }

    /// Check a value, returning the failure on rejection.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        eval(&self.0, value)
    }

    /// Whether the value passes.
    pub fn passes(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }

    /// Conjunction: both this and `other` must pass.
    pub fn and(self, other: impl Into<Validator>) -> Validator {
        let other = other.into();
        match (self.0, other.0) {
            (Node::All(mut members), Node::All(tail)) => {
                members.extend(tail);
                Validator(Node::All(members))
            }
            (Node::All(mut members), node) => {
                members.push(node);
                Validator(Node::All(members))
            }
            (node, Node::All(mut tail)) => {
                tail.insert(0, node);
                Validator(Node::All(tail))
            }
            (a, b) => Validator(Node::All(vec![a, b])),
        }
    }

    /// Disjunction: at least one of this and `other` must pass.
    pub fn or(self, other: impl Into<Validator>) -> Validator {
        let other = other.into();
        match (self.0, other.0) {
            (Node::Any(mut members), Node::Any(tail)) => {
                members.extend(tail);
                Validator(Node::Any(members))
            }
            (Node::Any(mut members), node) => {
                members.push(node);
                Validator(Node::Any(members))
            }
            (node, Node::Any(mut tail)) => {
                tail.insert(0, node);
                Validator(Node::Any(tail))
            }
            (a, b) => Validator(Node::Any(vec![a, b])),
        }
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn name(node: &Node) -> String {
            match node {
                Node::Pass => "pass".to_owned(),
                Node::Leaf { kind, .. } => match kind {
                    LeafKind::Str => "str".to_owned(),
                    LeafKind::Int => "int".to_owned(),
                    LeafKind::Float => "float".to_owned(),
                    LeafKind::Path => "path".to_owned(),
                    LeafKind::List { .. } => "list".to_owned(),
                    LeafKind::Tuple { .. } => "tuple".to_owned(),
                },
                Node::Custom(_) => "custom".to_owned(),
                Node::All(members) => {
                    let inner: Vec<String> = members.iter().map(name).collect();
                    format!("all({})", inner.join(", "))
                }
                Node::Any(members) => {
                    let inner: Vec<String> = members.iter().map(name).collect();
                    format!("any({})", inner.join(", "))
                }
            }
        }
        write!(f, "Validator({})", name(&self.0))
    }
}

fn eval(node: &Node, value: &Value) -> Result<(), ValidationError> {
    match node {
        Node::Pass => Ok(()),
        Node::Leaf {
            kind,
            allow_none,
            allow_nan,
            rules,
        } => eval_leaf(kind, *allow_none, *allow_nan, rules, value),
        Node::Custom(rule) => rule(value),
        Node::All(members) => {
            for member in members {
                eval(member, value)?;
            }
            Ok(())
        }
        Node::Any(members) => {
            if members.is_empty() {
                return Ok(());
            }
            let mut messages = Vec::new();
            for member in members {
                match eval(member, value) {
                    Ok(()) => return Ok(()),
                    Err(e) if e.is_type_mismatch() => {}
                    Err(e) => messages.push(e.to_string()),
                }
            }
            Err(ValidationError::Invalid(messages.join("; ")))
        }
    }
}

fn eval_leaf(
    kind: &LeafKind,
    allow_none: bool,
    allow_nan: bool,
    rules: &[Arc<RuleFn>],
    value: &Value,
) -> Result<(), ValidationError> {
    // NaN short-circuits the whole leaf when allowed
    if let Value::Float(x) = value {
        if x.is_nan() {
            return if allow_nan {
                Ok(())
            } else {
                Err(ValidationError::Invalid("NaN".to_owned()))
            };
        }
    }

    if value.is_none() {
        return if allow_none {
            Ok(())
        } else {
            Err(ValidationError::Invalid("None".to_owned()))
        };
    }

    match kind {
        LeafKind::Str | LeafKind::Path => {
            if value.as_str().is_none() {
                let name = if matches!(kind, LeafKind::Path) {
                    "path"
                } else {
                    "str"
                };
                return Err(ValidationError::TypeMismatch(format!(
                    "not instance of {name} : {value}"
                )));
            }
        }
        LeafKind::Int => {
            if value.as_int().is_none() {
                return Err(ValidationError::TypeMismatch(format!(
                    "not instance of int : {value}"
                )));
            }
        }
        LeafKind::Float => {
            if value.as_float().is_none() {
                return Err(ValidationError::TypeMismatch(format!(
                    "not instance of float : {value}"
                )));
            }
        }
        LeafKind::List { elem, allow_empty } => {
            let Some(items) = value.as_list() else {
                return Err(ValidationError::TypeMismatch(format!("not a list : {value}")));
            };
            if !allow_empty && items.is_empty() {
                return Err(ValidationError::Invalid(format!("empty list : {value}")));
            }
            if let Some(elem) = elem {
                for (i, item) in items.iter().enumerate() {
                    if !elem.matches(item) {
                        return Err(ValidationError::Invalid(format!(
                            "wrong element type at {i} : {item}"
                        )));
                    }
                }
            }
        }
        LeafKind::Tuple { shape, variadic } => {
            let Some(items) = value.as_list() else {
                return Err(ValidationError::TypeMismatch(format!("not a tuple : {value}")));
            };
            check_tuple_shape(shape, *variadic, items, value)?;
        }
    }

    for rule in rules {
        rule(value)?;
    }
    Ok(())
}

fn check_tuple_shape(
    shape: &[Option<ValueKind>],
    variadic: bool,
    items: &[Value],
    value: &Value,
) -> Result<(), ValidationError> {
    if shape.is_empty() {
        return Ok(());
    }
    if variadic {
        if items.len() < shape.len() {
            return Err(ValidationError::Invalid(format!(
                "length less than {} : {value}",
                shape.len()
            )));
        }
        for (i, item) in items.iter().enumerate() {
            let expect = if i < shape.len() {
                shape[i]
            } else {
                // the tail repeats the last declared position
                shape[shape.len() - 1]
            };
            if let Some(kind) = expect {
                if !kind.matches(item) {
                    return Err(ValidationError::Invalid(format!(
                        "wrong element type at {i} : {item}"
                    )));
                }
            }
        }
    } else {
        if items.len() != shape.len() {
            return Err(ValidationError::Invalid(format!(
                "length not match to {} : {value}",
                shape.len()
            )));
        }
        for (i, (item, expect)) in items.iter().zip(shape).enumerate() {
            if let Some(kind) = expect {
                if !kind.matches(item) {
                    return Err(ValidationError::Invalid(format!(
                        "wrong element type at {i} : {item}"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Run `inner` on the element at `index`, resolving negative positions
/// from the end and prefixing failures with the position.
pub(crate) fn check_item_at(
    inner: &Validator,
    index: i64,
    items: &[Value],
) -> Result<(), ValidationError> {
    let n = items.len() as i64;
    let resolved = if index < 0 { n + index } else { index };
    if resolved < 0 || resolved >= n {
        return Err(ValidationError::Invalid(format!(
            "index {index} out of size {n}"
        )));
    }
    inner
        .validate(&items[resolved as usize])
        .map_err(|e| ValidationError::Invalid(format!("at index {index}, {e}")))
}
