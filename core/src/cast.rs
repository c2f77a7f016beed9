//! Token casters: string-to-[`Value`] conversion strategies.
//!
//! A [`Caster`] is attached to every field and turns one raw command-line
//! token into a typed [`Value`]. Composite casters (unions, tuples,
//! delimited lists, key-value pairs) are built from the scalar ones.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::CastError;
use crate::value::Value;

/// Signature for user-supplied conversion functions.
pub type CastFn = dyn Fn(&str) -> Result<Value, CastError> + Send + Sync;

/// A conversion strategy from one token string to a [`Value`].
///
/// # Examples
///
/// ```
/// use argdecl_core::cast::Caster;
/// use argdecl_core::Value;
///
/// let caster = Caster::tuple(vec![Caster::Int], true);
/// let v = caster.cast("1,2,3").unwrap();
/// assert_eq!(v, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
/// ```
#[derive(Clone)]
pub enum Caster {
    /// Keep the token as-is.
    Str,
    /// Parse a signed integer.
    Int,
    /// Parse a float.
    Float,
    /// Recognize textual boolean tokens: `+`/`1`/`t`/`true`/`yes`/`y`
    /// are true, `-`/`0`/`f`/`false`/`n`/`no`/`x` are false
    /// (case-insensitive).
    Bool,
    /// Keep the token as a filesystem path.
    Path,
    /// Guess the shape: `TRUE`/`FALSE` (any case), then int, then float,
    /// then fall back to the string itself.
    Auto,
    /// Parse an integer, keeping the string on failure. Empty input
    /// yields [`Value::None`].
    TryInt,
    /// Parse a float, keeping the string on failure. Empty input yields
    /// [`Value::None`].
    TryFloat,
    /// Membership in a fixed candidate set, with optional unique-prefix
    /// completion.
    Literal {
        /// Accepted candidate strings.
        candidates: Vec<String>,
        /// Whether a unique prefix of a candidate is accepted.
        complete: bool,
    },
    /// Try each member in order; the first success wins.
    Union(Vec<Caster>),
    /// Split on a separator and cast each part, yielding a list.
    Split {
        /// Per-element caster.
        elem: Box<Caster>,
        /// Separator string (usually one character).
        sep: String,
        /// Values spliced in front when the token starts with
        /// `+` followed by the separator.
        prepend: Option<Vec<Value>>,
    },
    /// Split on commas and cast each part by position, yielding a list.
    /// With `variadic`, the last element caster repeats for the tail.
    Tuple {
        /// Positional element casters.
        elems: Vec<Caster>,
        /// Whether the last caster absorbs extra parts.
        variadic: bool,
    },
    /// Parse one `key=value`, `key:value`, or bare `key` entry into a
    /// single-entry map. Repeated occurrences merge at parse time.
    Dict {
        /// Caster for the value part. A bare key casts the empty string.
        value: Box<Caster>,
    },
    /// A user-supplied conversion function.
    Fn(Arc<CastFn>),
}

impl Caster {
    /// Delimited-list caster with the default `,` separator.
    pub fn list(elem: Caster) -> Self {
        Caster::Split {
            elem: Box::new(elem),
            sep: ",".to_owned(),
            prepend: None,
        }
    }

    /// Positional tuple caster over comma-separated parts.
    pub fn tuple(elems: Vec<Caster>, variadic: bool) -> Self {
        Caster::Tuple { elems, variadic }
    }

    /// Literal caster accepting exactly the given candidates.
    pub fn literal<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Caster::Literal {
            candidates: candidates.into_iter().map(Into::into).collect(),
            complete: false,
        }
    }

    /// Custom caster from a conversion function.
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<Value, CastError> + Send + Sync + 'static,
    {
        Caster::Fn(Arc::new(f))
    }

    /// The candidate set, when this caster restricts to choices.
    pub fn choices(&self) -> Option<&[String]> {
        match self {
            Caster::Literal { candidates, .. } => Some(candidates),
            _ => None,
        }
    }

    /// Convert one token into a typed value.
    pub fn cast(&self, token: &str) -> Result<Value, CastError> {
        match self {
            Caster::Str | Caster::Path => Ok(Value::Str(token.to_owned())),
            Caster::Int => cast_int(token),
            Caster::Float => cast_float(token),
            Caster::Bool => cast_bool(token),
            Caster::Auto => Ok(cast_auto(token)),
            Caster::TryInt => {
                if token.is_empty() {
                    Ok(Value::None)
                } else {
                    Ok(cast_int(token).unwrap_or_else(|_| Value::Str(token.to_owned())))
                }
            }
            Caster::TryFloat => {
                if token.is_empty() {
                    Ok(Value::None)
                } else {
                    Ok(cast_float(token).unwrap_or_else(|_| Value::Str(token.to_owned())))
                }
            }
            Caster::Literal {
                candidates,
                complete,
            } => cast_literal(candidates, *complete, token),
            Caster::Union(members) => {
                for member in members {
                    if let Ok(value) = member.cast(token) {
                        return Ok(value);
                    }
                }
                Err(CastError::NoAlternative(token.to_owned()))
            }
            Caster::Split { elem, sep, prepend } => cast_split(elem, sep, prepend.as_deref(), token),
            Caster::Tuple { elems, variadic } => cast_tuple(elems, *variadic, token),
            Caster::Dict { value } => cast_dict(value, token),
            Caster::Fn(f) => f(token),
        }
    }
}

impl fmt::Debug for Caster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caster::Str => write!(f, "Str"),
            Caster::Int => write!(f, "Int"),
            Caster::Float => write!(f, "Float"),
            Caster::Bool => write!(f, "Bool"),
            Caster::Path => write!(f, "Path"),
            Caster::Auto => write!(f, "Auto"),
            Caster::TryInt => write!(f, "TryInt"),
            Caster::TryFloat => write!(f, "TryFloat"),
            Caster::Literal {
                candidates,
                complete,
            } => write!(
                f,
                "Literal{}[{}]",
                if *complete { "*" } else { "" },
                candidates.join(", ")
            ),
            Caster::Union(members) => f.debug_tuple("Union").field(members).finish(),
            Caster::Split { elem, sep, .. } => {
                f.debug_struct("Split").field("elem", elem).field("sep", sep).finish()
            }
            Caster::Tuple { elems, variadic } => f
                .debug_struct("Tuple")
                .field("elems", elems)
                .field("variadic", variadic)
                .finish(),
            Caster::Dict { value } => f.debug_struct("Dict").field("value", value).finish(),
            Caster::Fn(_) => write!(f, "Fn(..)"),
        }
    }
}

fn cast_int(token: &str) -> Result<Value, CastError> {
    token
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|_| CastError::Int(token.to_owned()))
}

fn cast_float(token: &str) -> Result<Value, CastError> {
    token
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| CastError::Float(token.to_owned()))
}

fn cast_bool(token: &str) -> Result<Value, CastError> {
    match token.to_ascii_lowercase().as_str() {
        "+" | "1" | "t" | "true" | "yes" | "y" => Ok(Value::Bool(true)),
        "-" | "0" | "f" | "false" | "n" | "no" | "x" => Ok(Value::Bool(false)),
        _ => Err(CastError::Bool(token.to_owned())),
    }
}

fn cast_auto(token: &str) -> Value {
    if token.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = token.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(x) = token.parse::<f64>() {
        return Value::Float(x);
    }
    Value::Str(token.to_owned())
}

fn cast_literal(candidates: &[String], complete: bool, token: &str) -> Result<Value, CastError> {
    if candidates.iter().any(|c| c == token) {
        return Ok(Value::Str(token.to_owned()));
    }
    if complete {
        let matches: Vec<&String> = candidates.iter().filter(|c| c.starts_with(token)).collect();
        match matches.as_slice() {
            [] => {}
            [only] => return Ok(Value::Str((*only).clone())),
            many => {
                let joined: Vec<&str> = many.iter().map(|s| s.as_str()).collect();
                return Err(CastError::AmbiguousPrefix {
                    token: token.to_owned(),
                    matches: joined.join(", "),
                });
            }
        }
    }
    Err(CastError::Choice {
        token: token.to_owned(),
        allowed: candidates.join(", "),
    })
}

fn cast_split(
    elem: &Caster,
    sep: &str,
    prepend: Option<&[Value]>,
    token: &str,
) -> Result<Value, CastError> {
    let marker = format!("+{sep}");
    let (head, rest) = match (prepend, token.strip_prefix(&marker)) {
        (Some(values), Some(rest)) => (values.to_vec(), rest),
        _ => (Vec::new(), token),
    };
    let mut items = head;
    for part in rest.split(sep) {
        items.push(elem.cast(part)?);
    }
    Ok(Value::List(items))
}

fn cast_tuple(elems: &[Caster], variadic: bool, token: &str) -> Result<Value, CastError> {
    let parts: Vec<&str> = token.split(',').collect();
    if !variadic && parts.len() > elems.len() {
        return Err(CastError::TooManyValues {
            token: token.to_owned(),
            expect: elems.len(),
        });
    }
    let mut items = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let caster = if i < elems.len() {
            &elems[i]
        } else {
            // variadic tail repeats the last element caster
            elems.last().ok_or_else(|| CastError::TooManyValues {
                token: token.to_owned(),
                expect: 0,
            })?
        };
        items.push(caster.cast(part)?);
    }
    Ok(Value::List(items))
}

fn cast_dict(value: &Caster, token: &str) -> Result<Value, CastError> {
    let (key, raw) = if let Some(i) = token.find(':') {
        (&token[..i], &token[i + 1..])
    } else if let Some(i) = token.find('=') {
        (&token[..i], &token[i + 1..])
    } else {
        (token, "")
    };
    let mut entries = BTreeMap::new();
    entries.insert(key.to_owned(), value.cast(raw)?);
    Ok(Value::Map(entries))
}
