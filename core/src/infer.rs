//! Declared field types and caster inference.
//!
//! Rust has no runtime annotation reflection, so every field carries an
//! explicit [`DeclaredType`]. The inference engine maps a declared type to
//! the [`Caster`] used for its tokens; the rest of the derivation
//! (actions, defaults, choices, metavars) happens at bind time in
//! [`crate::field`].

use std::fmt;

use crate::cast::Caster;

/// The declared content type of a field.
///
/// # Examples
///
/// ```
/// use argdecl_core::infer::DeclaredType;
///
/// let t = DeclaredType::List(Box::new(DeclaredType::Int));
/// assert_eq!(t.to_string(), "[int]");
/// assert!(t.is_list());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    /// No declared shape; tokens stay as strings.
    Any,
    /// Boolean flag or textual boolean value.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point.
    Float,
    /// Plain text.
    Str,
    /// Filesystem path.
    Path,
    /// One of a fixed set of string candidates.
    Literal(Vec<String>),
    /// The inner type, or absent.
    Optional(Box<DeclaredType>),
    /// Any of the member types, tried in order.
    Union(Vec<DeclaredType>),
    /// Repeated occurrences collect elements of the inner type.
    List(Box<DeclaredType>),
    /// Comma-separated positions; `variadic` repeats the last one.
    Tuple {
        /// Positional element types.
        elems: Vec<DeclaredType>,
        /// Whether the last element repeats for the tail.
        variadic: bool,
    },
    /// `key=value` entries with values of the inner type.
    Dict(Box<DeclaredType>),
}

impl DeclaredType {
    /// Literal candidates convenience constructor.
    pub fn literal<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DeclaredType::Literal(candidates.into_iter().map(Into::into).collect())
    }

    /// Optional wrapper convenience constructor.
    pub fn optional(inner: DeclaredType) -> Self {
        DeclaredType::Optional(Box::new(inner))
    }

    /// Whether this type admits absence (is `Optional`).
    pub fn is_optional(&self) -> bool {
        matches!(self, DeclaredType::Optional(_))
    }

    /// Whether this is a boolean, through an `Optional` wrapper too.
    pub fn is_bool(&self) -> bool {
        match self {
            DeclaredType::Bool => true,
            DeclaredType::Optional(inner) => inner.is_bool(),
            _ => false,
        }
    }

    /// Whether this is a list type (collection semantics apply).
    pub fn is_list(&self) -> bool {
        matches!(self, DeclaredType::List(_))
    }

    /// The type with any `Optional` wrapper removed.
    pub fn strip_optional(&self) -> &DeclaredType {
        match self {
            DeclaredType::Optional(inner) => inner.strip_optional(),
            other => other,
        }
    }

    /// Literal candidates, seen through an `Optional` wrapper.
    pub fn literal_candidates(&self) -> Option<&[String]> {
        match self.strip_optional() {
            DeclaredType::Literal(candidates) => Some(candidates),
            _ => None,
        }
    }

    /// The element type of a list, seen through an `Optional` wrapper.
    pub fn list_elem(&self) -> Option<&DeclaredType> {
        match self.strip_optional() {
            DeclaredType::List(elem) => Some(elem),
            _ => None,
        }
    }

    /// Derive the token caster for this type.
    ///
    /// `None` means no conversion: the raw token is stored as a string.
    /// For list types this yields the per-element caster, since the
    /// collection itself is built by the repeated-occurrence action.
    pub fn caster(&self) -> Option<Caster> {
        match self {
            DeclaredType::Any => None,
            DeclaredType::Bool => Some(Caster::Bool),
            DeclaredType::Int => Some(Caster::Int),
            DeclaredType::Float => Some(Caster::Float),
            DeclaredType::Str => Some(Caster::Str),
            DeclaredType::Path => Some(Caster::Path),
            DeclaredType::Literal(candidates) => Some(Caster::Literal {
                candidates: candidates.clone(),
                complete: false,
            }),
            DeclaredType::Optional(inner) => inner.caster(),
            DeclaredType::Union(members) => {
                let casters: Vec<Caster> = members.iter().filter_map(DeclaredType::caster).collect();
                Some(Caster::Union(casters))
            }
            DeclaredType::List(elem) => elem.caster(),
            DeclaredType::Tuple { elems, variadic } => {
                let casters: Vec<Caster> = elems
                    .iter()
                    .map(|t| t.caster().unwrap_or(Caster::Str))
                    .collect();
                Some(Caster::tuple(casters, *variadic))
            }
            DeclaredType::Dict(value) => Some(Caster::Dict {
                value: Box::new(value.caster().unwrap_or(Caster::Str)),
            }),
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Any => write!(f, "any"),
            DeclaredType::Bool => write!(f, "bool"),
            DeclaredType::Int => write!(f, "int"),
            DeclaredType::Float => write!(f, "float"),
            DeclaredType::Str => write!(f, "str"),
            DeclaredType::Path => write!(f, "path"),
            DeclaredType::Literal(candidates) => {
                write!(f, "Literal[{}]", candidates.join(", "))
            }
            DeclaredType::Optional(inner) => write!(f, "{inner}?"),
            DeclaredType::Union(members) => {
                let names: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(f, "{}", names.join("|"))
            }
            DeclaredType::List(elem) => write!(f, "[{elem}]"),
            DeclaredType::Tuple { elems, variadic } => {
                let mut names: Vec<String> = elems.iter().map(ToString::to_string).collect();
                if *variadic {
                    names.push("...".to_owned());
                }
                write!(f, "({})", names.join(", "))
            }
            DeclaredType::Dict(value) => write!(f, "{{str: {value}}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn scalar_casters() {
        assert_eq!(
            DeclaredType::Int.caster().unwrap().cast("3").unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            DeclaredType::Bool.caster().unwrap().cast("yes").unwrap(),
            Value::Bool(true)
        );
        assert!(DeclaredType::Any.caster().is_none());
    }

    #[test]
    fn optional_delegates_to_inner() {
        let t = DeclaredType::optional(DeclaredType::Int);
        assert!(t.is_optional());
        assert_eq!(t.caster().unwrap().cast("7").unwrap(), Value::Int(7));
        assert_eq!(t.strip_optional(), &DeclaredType::Int);
    }

    #[test]
    fn list_caster_is_the_element_caster() {
        let t = DeclaredType::List(Box::new(DeclaredType::Int));
        assert_eq!(t.caster().unwrap().cast("5").unwrap(), Value::Int(5));
        assert_eq!(t.list_elem(), Some(&DeclaredType::Int));
    }

    #[test]
    fn union_tries_members_in_order() {
        let t = DeclaredType::Union(vec![DeclaredType::Int, DeclaredType::Str]);
        let caster = t.caster().unwrap();
        assert_eq!(caster.cast("5").unwrap(), Value::Int(5));
        assert_eq!(caster.cast("five").unwrap(), Value::Str("five".into()));
    }

    #[test]
    fn literal_candidates_seen_through_optional() {
        let t = DeclaredType::optional(DeclaredType::literal(["a", "b"]));
        assert_eq!(
            t.literal_candidates().unwrap(),
            &["a".to_owned(), "b".to_owned()]
        );
    }

    #[test]
    fn display_forms() {
        assert_eq!(DeclaredType::Int.to_string(), "int");
        assert_eq!(
            DeclaredType::Union(vec![DeclaredType::Str, DeclaredType::Int]).to_string(),
            "str|int"
        );
        let t = DeclaredType::Tuple {
            elems: vec![DeclaredType::Int],
            variadic: true,
        };
        assert_eq!(t.to_string(), "(int, ...)");
    }
}
