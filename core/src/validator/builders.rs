//! Fluent builders for [`Validator`] trees.
//!
//! Builders accumulate rules through chained methods and convert into a
//! frozen [`Validator`] via [`freeze`](StrRules::freeze) or `Into`.
//! Converting clones the accumulated rules, so a builder can keep being
//! extended and attached to further fields without affecting copies
//! already frozen.
//!
//! # Examples
//!
//! ```
//! use argdecl_core::validator;
//! use argdecl_core::Value;
//!
//! let v: validator::Validator = validator::str()
//!     .starts_with("img_")
//!     .length_in_range(None, Some(16))
//!     .into();
//! assert!(v.passes(&Value::Str("img_0001".into())));
//! assert!(!v.passes(&Value::Str("raw_0001".into())));
//! ```

use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::error::ValidationError;
use crate::value::Value;

use super::{check_item_at, ItemSel, LeafKind, Node, RuleFn, Validator, ValueKind};

/// Start a string validator.
pub fn str() -> StrRules {
    StrRules::default()
}

/// Start an integer validator.
pub fn int() -> IntRules {
    IntRules::default()
}

/// Start a float validator. Integer values coerce.
pub fn float() -> FloatRules {
    FloatRules::default()
}

/// Start a list validator.
pub fn list() -> ListRules {
    ListRules::default()
}

/// Start a tuple validator (a list checked by position).
pub fn tuple() -> TupleRules {
    TupleRules::default()
}

/// Start a path validator.
pub fn path() -> PathRules {
    PathRules::default()
}

/// Conjunction of validators. Empty input accepts everything.
pub fn all<I, V>(members: I) -> Validator
where
    I: IntoIterator<Item = V>,
    V: Into<Validator>,
{
    Validator(Node::All(members.into_iter().map(|v| v.into().0).collect()))
}

/// Disjunction of validators. Empty input accepts everything.
pub fn any<I, V>(members: I) -> Validator
where
    I: IntoIterator<Item = V>,
    V: Into<Validator>,
{
    Validator(Node::Any(members.into_iter().map(|v| v.into().0).collect()))
}

/// A validator that passes only for absent values.
pub fn optional() -> Validator {
    custom(|value| value.is_none())
}

/// A validator that passes for any present value.
pub fn non_none() -> Validator {
    custom(|value| !value.is_none())
}

/// Wrap a predicate; failures report `"validate failure"`.
pub fn custom<F>(predicate: F) -> Validator
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Validator(Node::Custom(Arc::new(move |value: &Value| {
        if predicate(value) {
            Ok(())
        } else {
            Err(ValidationError::Invalid("validate failure".to_owned()))
        }
    })))
}

/// Wrap a predicate with a message built from the rejected value.
pub fn custom_with<F, M>(predicate: F, message: M) -> Validator
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
    M: Fn(&Value) -> String + Send + Sync + 'static,
{
    Validator(Node::Custom(Arc::new(move |value: &Value| {
        if predicate(value) {
            Ok(())
        } else {
            Err(ValidationError::Invalid(message(value)))
        }
    })))
}

fn rule<F>(f: F) -> Arc<RuleFn>
where
    F: Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn fail(message: String) -> Result<(), ValidationError> {
    Err(ValidationError::Invalid(message))
}

/// String constraints.
#[derive(Clone, Default)]
pub struct StrRules {
    rules: Vec<Arc<RuleFn>>,
    allow_none: bool,
}

impl StrRules {
    /// Require the string length inside `[a, b]`; either bound may be
    /// open.
    pub fn length_in_range(mut self, a: Option<usize>, b: Option<usize>) -> Self {
        match (a, b) {
            (Some(a), None) => self.rules.push(rule(move |v| {
                let Value::Str(s) = v else { return Ok(()) };
                if a <= s.chars().count() {
                    Ok(())
                } else {
                    fail(format!("str length less than {a}: {s:?}"))
                }
            })),
            (None, Some(b)) => self.rules.push(rule(move |v| {
                let Value::Str(s) = v else { return Ok(()) };
                if s.chars().count() <= b {
                    Ok(())
                } else {
                    fail(format!("str length over {b}: {s:?}"))
                }
            })),
            (Some(a), Some(b)) => self.rules.push(rule(move |v| {
                let Value::Str(s) = v else { return Ok(()) };
                let n = s.chars().count();
                if a <= n && n <= b {
                    Ok(())
                } else {
                    fail(format!("str length out of range [{a}, {b}]: {s:?}"))
                }
            })),
            (None, None) => {}
        }
        self
    }

    /// Require a regular-expression match anchored at the start.
    ///
    /// # Panics
    ///
    /// Panics when `pattern` is not a valid regular expression.
    pub fn matches(mut self, pattern: &str) -> Self {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => panic!("invalid pattern {pattern:?}: {e}"),
        };
        let pattern = pattern.to_owned();
        self.rules.push(rule(move |v| {
            let Value::Str(s) = v else { return Ok(()) };
            match re.find(s) {
                Some(m) if m.start() == 0 => Ok(()),
                _ => fail(format!("str does not match to {pattern} : {s:?}")),
            }
        }));
        self
    }

    /// Require a prefix.
    pub fn starts_with(mut self, prefix: &str) -> Self {
        let prefix = prefix.to_owned();
        self.rules.push(rule(move |v| {
            let Value::Str(s) = v else { return Ok(()) };
            if s.starts_with(&prefix) {
                Ok(())
            } else {
                fail(format!("str does not start with {prefix}: {s:?}"))
            }
        }));
        self
    }

    /// Require a suffix.
    pub fn ends_with(mut self, suffix: &str) -> Self {
        let suffix = suffix.to_owned();
        self.rules.push(rule(move |v| {
            let Value::Str(s) = v else { return Ok(()) };
            if s.ends_with(&suffix) {
                Ok(())
            } else {
                fail(format!("str does not end with {suffix}: {s:?}"))
            }
        }));
        self
    }

    /// Require at least one of `texts` to occur as a substring.
    ///
    /// # Panics
    ///
    /// Panics when `texts` is empty.
    pub fn contains<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let texts: Vec<String> = texts.into_iter().map(Into::into).collect();
        assert!(!texts.is_empty(), "empty text list");
        self.rules.push(rule(move |v| {
            let Value::Str(s) = v else { return Ok(()) };
            if texts.iter().any(|text| s.contains(text.as_str())) {
                Ok(())
            } else {
                fail(format!("str does not contain one of {texts:?}: {s:?}"))
            }
        }));
        self
    }

    /// Require membership in a fixed option set.
    pub fn one_of<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        self.rules.push(rule(move |v| {
            let Value::Str(s) = v else { return Ok(()) };
            if options.iter().any(|o| o == s) {
                Ok(())
            } else {
                fail(format!("str not in allowed set {options:?}: {s:?}"))
            }
        }));
        self
    }

    /// Also accept absent values.
    pub fn optional(mut self) -> Self {
        self.allow_none = true;
        self
    }

    /// Freeze into an immutable validator.
    pub fn freeze(&self) -> Validator {
        Validator(Node::Leaf {
            kind: LeafKind::Str,
            allow_none: self.allow_none,
            allow_nan: false,
            rules: self.rules.clone(),
        })
    }
}

/// Integer constraints.
#[derive(Clone, Default)]
pub struct IntRules {
    rules: Vec<Arc<RuleFn>>,
    allow_none: bool,
}

impl IntRules {
    /// Require the value inside `[a, b]`; either bound may be open.
    pub fn in_range(mut self, a: Option<i64>, b: Option<i64>) -> Self {
        match (a, b) {
            (Some(a), None) => self.rules.push(rule(move |v| {
                let Some(it) = v.as_int() else { return Ok(()) };
                if a <= it {
                    Ok(())
                } else {
                    fail(format!("value less than {a}: {it}"))
                }
            })),
            (None, Some(b)) => self.rules.push(rule(move |v| {
                let Some(it) = v.as_int() else { return Ok(()) };
                if it <= b {
                    Ok(())
                } else {
                    fail(format!("value over {b}: {it}"))
                }
            })),
            (Some(a), Some(b)) => self.rules.push(rule(move |v| {
                let Some(it) = v.as_int() else { return Ok(()) };
                if a <= it && it <= b {
                    Ok(())
                } else {
                    fail(format!("value out of range [{a}, {b}]: {it}"))
                }
            })),
            (None, None) => {}
        }
        self
    }

    /// Require a positive value; `include_zero` admits zero.
    pub fn positive(mut self, include_zero: bool) -> Self {
        self.rules.push(rule(move |v| {
            let Some(it) = v.as_int() else { return Ok(()) };
            if include_zero {
                if it >= 0 {
                    Ok(())
                } else {
                    fail(format!("not a non-negative value : {it}"))
                }
            } else if it > 0 {
                Ok(())
            } else {
                fail(format!("not a positive value : {it}"))
            }
        }));
        self
    }

    /// Require a negative value; `include_zero` admits zero.
    pub fn negative(mut self, include_zero: bool) -> Self {
        self.rules.push(rule(move |v| {
            let Some(it) = v.as_int() else { return Ok(()) };
            if include_zero {
                if it <= 0 {
                    Ok(())
                } else {
                    fail(format!("not a non-positive value : {it}"))
                }
            } else if it < 0 {
                Ok(())
            } else {
                fail(format!("not a negative value : {it}"))
            }
        }));
        self
    }

    /// Also accept absent values.
    pub fn optional(mut self) -> Self {
        self.allow_none = true;
        self
    }

    /// Freeze into an immutable validator.
    pub fn freeze(&self) -> Validator {
        Validator(Node::Leaf {
            kind: LeafKind::Int,
            allow_none: self.allow_none,
            allow_nan: false,
            rules: self.rules.clone(),
        })
    }
}

/// Float constraints. Integer values pass the type guard and coerce.
#[derive(Clone, Default)]
pub struct FloatRules {
    rules: Vec<Arc<RuleFn>>,
    allow_none: bool,
    allow_nan: bool,
}

impl FloatRules {
    /// Require the value inside the open interval `(a, b)`; open bounds
    /// fall back to one-sided closed comparisons.
    pub fn in_range(mut self, a: Option<f64>, b: Option<f64>) -> Self {
        match (a, b) {
            (Some(a), None) => self.rules.push(rule(move |v| {
                let Some(it) = v.as_float() else { return Ok(()) };
                if a < it {
                    Ok(())
                } else {
                    fail(format!("value less than {a}: {it}"))
                }
            })),
            (None, Some(b)) => self.rules.push(rule(move |v| {
                let Some(it) = v.as_float() else { return Ok(()) };
                if it < b {
                    Ok(())
                } else {
                    fail(format!("value over {b}: {it}"))
                }
            })),
            (Some(a), Some(b)) => self.rules.push(rule(move |v| {
                let Some(it) = v.as_float() else { return Ok(()) };
                if a < it && it < b {
                    Ok(())
                } else {
                    fail(format!("value out of range ({a}, {b}): {it}"))
                }
            })),
            (None, None) => {}
        }
        self
    }

    /// Require the value inside the closed interval `[a, b]`.
    pub fn in_range_closed(mut self, a: Option<f64>, b: Option<f64>) -> Self {
        match (a, b) {
            (Some(a), None) => self.rules.push(rule(move |v| {
                let Some(it) = v.as_float() else { return Ok(()) };
                if a <= it {
                    Ok(())
                } else {
                    fail(format!("value less than {a}: {it}"))
                }
            })),
            (None, Some(b)) => self.rules.push(rule(move |v| {
                let Some(it) = v.as_float() else { return Ok(()) };
                if it <= b {
                    Ok(())
                } else {
                    fail(format!("value over {b}: {it}"))
                }
            })),
            (Some(a), Some(b)) => self.rules.push(rule(move |v| {
                let Some(it) = v.as_float() else { return Ok(()) };
                if a <= it && it <= b {
                    Ok(())
                } else {
                    fail(format!("value out of range [{a}, {b}]: {it}"))
                }
            })),
            (None, None) => {}
        }
        self
    }

    /// Admit NaN; an admitted NaN passes the whole leaf.
    pub fn allow_nan(mut self, allow: bool) -> Self {
        self.allow_nan = allow;
        self
    }

    /// Require a positive value; `include_zero` admits zero.
    pub fn positive(mut self, include_zero: bool) -> Self {
        self.rules.push(rule(move |v| {
            let Some(it) = v.as_float() else { return Ok(()) };
            if include_zero {
                if it >= 0.0 {
                    Ok(())
                } else {
                    fail(format!("not a non-negative value: {it}"))
                }
            } else if it > 0.0 {
                Ok(())
            } else {
                fail(format!("not a positive value: {it}"))
            }
        }));
        self
    }

    /// Require a negative value; `include_zero` admits zero.
    pub fn negative(mut self, include_zero: bool) -> Self {
        self.rules.push(rule(move |v| {
            let Some(it) = v.as_float() else { return Ok(()) };
            if include_zero {
                if it <= 0.0 {
                    Ok(())
                } else {
                    fail(format!("not a non-positive value : {it}"))
                }
            } else if it < 0.0 {
                Ok(())
            } else {
                fail(format!("not a negative value : {it}"))
            }
        }));
        self
    }

    /// Also accept absent values.
    pub fn optional(mut self) -> Self {
        self.allow_none = true;
        self
    }

    /// Freeze into an immutable validator.
    pub fn freeze(&self) -> Validator {
        Validator(Node::Leaf {
            kind: LeafKind::Float,
            allow_none: self.allow_none,
            allow_nan: self.allow_nan,
            rules: self.rules.clone(),
        })
    }
}

/// List constraints.
#[derive(Clone, Default)]
pub struct ListRules {
    elem: Option<ValueKind>,
    allow_empty: Option<bool>,
    rules: Vec<Arc<RuleFn>>,
    allow_none: bool,
}

impl ListRules {
    /// Require every element to have the given shape.
    pub fn of(mut self, elem: ValueKind) -> Self {
        self.elem = Some(elem);
        self
    }

    /// Admit or reject empty lists (admitted by default).
    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = Some(allow);
        self
    }

    /// Require the list length inside `[a, b]`.
    pub fn length_in_range(mut self, a: Option<usize>, b: Option<usize>) -> Self {
        match (a, b) {
            (Some(a), None) => self.rules.push(rule(move |v| {
                let Some(items) = v.as_list() else { return Ok(()) };
                if a <= items.len() {
                    Ok(())
                } else {
                    fail(format!("list length less than {a}: {}", items.len()))
                }
            })),
            (None, Some(b)) => self.rules.push(rule(move |v| {
                let Some(items) = v.as_list() else { return Ok(()) };
                if items.len() <= b {
                    Ok(())
                } else {
                    fail(format!("list length over {b}: {}", items.len()))
                }
            })),
            (Some(a), Some(b)) => self.rules.push(rule(move |v| {
                let Some(items) = v.as_list() else { return Ok(()) };
                let n = items.len();
                if a <= n && n <= b {
                    Ok(())
                } else {
                    fail(format!("list length out of range [{a}, {b}]: {n}"))
                }
            })),
            (None, None) => {}
        }
        self
    }

    /// Run a validator on every element, reporting the failing position.
    pub fn on_item(mut self, inner: impl Into<Validator>) -> Self {
        let inner = inner.into();
        self.rules.push(rule(move |v| {
            let Some(items) = v.as_list() else { return Ok(()) };
            for (i, item) in items.iter().enumerate() {
                inner
                    .validate(item)
                    .map_err(|e| ValidationError::Invalid(format!("at index {i}, {e}")))?;
            }
            Ok(())
        }));
        self
    }

    /// Also accept absent values.
    pub fn optional(mut self) -> Self {
        self.allow_none = true;
        self
    }

    /// Freeze into an immutable validator.
    pub fn freeze(&self) -> Validator {
        Validator(Node::Leaf {
            kind: LeafKind::List {
                elem: self.elem,
                allow_empty: self.allow_empty.unwrap_or(true),
            },
            allow_none: self.allow_none,
            allow_nan: false,
            rules: self.rules.clone(),
        })
    }
}

/// Tuple constraints: a list checked position by position.
#[derive(Clone, Default)]
pub struct TupleRules {
    shape: Vec<Option<ValueKind>>,
    variadic: bool,
    rules: Vec<Arc<RuleFn>>,
    allow_none: bool,
}

impl TupleRules {
    /// Require exactly `n` elements of any shape.
    pub fn with_len(mut self, n: usize) -> Self {
        self.shape = vec![None; n];
        self.variadic = false;
        self
    }

    /// Require the given element shapes by position; `None` entries
    /// accept anything.
    pub fn of(mut self, shape: Vec<Option<ValueKind>>) -> Self {
        self.shape = shape;
        self
    }

    /// Let the last declared position absorb a tail of extra elements.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Run a validator on the selected positions.
    pub fn on_item(mut self, sel: ItemSel, inner: impl Into<Validator>) -> Self {
        let inner = inner.into();
        self.rules.push(rule(move |v| {
            let Some(items) = v.as_list() else { return Ok(()) };
            match &sel {
                ItemSel::All => {
                    for i in 0..items.len() as i64 {
                        check_item_at(&inner, i, items)?;
                    }
                    Ok(())
                }
                ItemSel::One(i) => check_item_at(&inner, *i, items),
                ItemSel::Many(indices) => {
                    for &i in indices {
                        check_item_at(&inner, i, items)?;
                    }
                    Ok(())
                }
            }
        }));
        self
    }

    /// Also accept absent values.
    pub fn optional(mut self) -> Self {
        self.allow_none = true;
        self
    }

    /// Freeze into an immutable validator.
    pub fn freeze(&self) -> Validator {
        Validator(Node::Leaf {
            kind: LeafKind::Tuple {
                shape: self.shape.clone(),
                variadic: self.variadic,
            },
            allow_none: self.allow_none,
            allow_nan: false,
            rules: self.rules.clone(),
        })
    }
}

fn suffix_of(s: &str) -> String {
    match Path::new(s).extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => String::new(),
    }
}

/// Filesystem path constraints over string values.
#[derive(Clone, Default)]
pub struct PathRules {
    rules: Vec<Arc<RuleFn>>,
    allow_none: bool,
}

impl PathRules {
    /// Require the file extension (with leading dot) to equal `suffix`.
    pub fn is_suffix(mut self, suffix: &str) -> Self {
        let suffix = suffix.to_owned();
        self.rules.push(rule(move |v| {
            let Value::Str(s) = v else { return Ok(()) };
            if suffix_of(s) == suffix {
                Ok(())
            } else {
                fail(format!("suffix != {suffix}: {s}"))
            }
        }));
        self
    }

    /// Require the file extension to be one of `suffixes`.
    pub fn is_suffix_in<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let suffixes: Vec<String> = suffixes.into_iter().map(Into::into).collect();
        self.rules.push(rule(move |v| {
            let Value::Str(s) = v else { return Ok(()) };
            if suffixes.iter().any(|x| *x == suffix_of(s)) {
                Ok(())
            } else {
                fail(format!("suffix not in {suffixes:?}: {s}"))
            }
        }));
        self
    }

    /// Require the path to exist.
    pub fn is_exists(mut self) -> Self {
        self.rules.push(rule(move |v| {
            let Value::Str(s) = v else { return Ok(()) };
            if Path::new(s).exists() {
                Ok(())
            } else {
                fail(format!("path does not exist: {s}"))
            }
        }));
        self
    }

    /// Require the path to be a file.
    pub fn is_file(mut self) -> Self {
        self.rules.push(rule(move |v| {
            let Value::Str(s) = v else { return Ok(()) };
            if Path::new(s).is_file() {
                Ok(())
            } else {
                fail(format!("path is not a file: {s}"))
            }
        }));
        self
    }

    /// Require the path to be a directory.
    pub fn is_dir(mut self) -> Self {
        self.rules.push(rule(move |v| {
            let Value::Str(s) = v else { return Ok(()) };
            if Path::new(s).is_dir() {
                Ok(())
            } else {
                fail(format!("path is not a directory: {s}"))
            }
        }));
        self
    }

    /// Also accept absent values.
    pub fn optional(mut self) -> Self {
        self.allow_none = true;
        self
    }

    /// Freeze into an immutable validator.
    pub fn freeze(&self) -> Validator {
        Validator(Node::Leaf {
            kind: LeafKind::Path,
            allow_none: self.allow_none,
            allow_nan: false,
            rules: self.rules.clone(),
        })
    }
}

macro_rules! impl_into_validator {
    ($($builder:ty),+) => {
        $(
            impl From<$builder> for Validator {
                fn from(rules: $builder) -> Validator {
                    rules.freeze()
                }
            }

            impl From<&$builder> for Validator {
                fn from(rules: &$builder) -> Validator {
                    rules.freeze()
                }
            }
        )+
    };
}

impl_into_validator!(StrRules, IntRules, FloatRules, ListRules, TupleRules, PathRules);
