//! Error types for field declaration, casting, parsing, and validation.
//!
//! The taxonomy separates programmer misuse ([`ConfigError`], fatal at
//! definition time) from malformed CLI input ([`ParseError`], funneled
//! through an exit policy) and from constraint failures on values
//! ([`ValidationError`], raised on assignment or post-parse application).

use thiserror::Error;

/// Programmer misuse detected at type-definition time.
///
/// These are never recovered: a configuration error means the declared
/// field table or validator is wrong, not the input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A bound field specification was bound (or declared) a second time.
    #[error("{owner}.{field}: reuse of bound specification")]
    SpecReuse {
        /// Owner type name.
        owner: String,
        /// Attribute name.
        field: String,
    },

    /// Two fields in the same table share an attribute name.
    #[error("{owner}.{field}: duplicate field declaration")]
    DuplicateField {
        /// Owner type name.
        owner: String,
        /// Attribute name.
        field: String,
    },

    /// An override targeted a field the table does not declare.
    #[error("{owner}.{field}: no inherited field to override")]
    UnknownField {
        /// Owner type name.
        owner: String,
        /// Attribute name.
        field: String,
    },

    /// A flag string does not start with `-`.
    #[error("flag must start with '-': {flag:?}")]
    BadFlag {
        /// The offending flag string.
        flag: String,
    },

    /// An override would turn a positional field into a flagged one or
    /// a flagged field into a positional one.
    #[error("{field}: {reason}")]
    IllegalOverride {
        /// Attribute name.
        field: String,
        /// What the edit attempted.
        reason: String,
    },

    /// A caster or validator was built with malformed structure
    /// (e.g., a variadic tuple marker in a non-tail position).
    #[error("{0}")]
    BadDefinition(String),

    /// Two dispatch entries in the same group share a command or alias.
    #[error("duplicate command registration: {command}")]
    DuplicateCommand {
        /// The colliding command token.
        command: String,
    },
}

/// A value failed a validator constraint.
///
/// The [`TypeMismatch`](ValidationError::TypeMismatch) kind is raised by
/// leaf type guards and is muted inside `Or` aggregation: it still causes
/// the next branch to be tried, but contributes nothing to the joined
/// failure message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A substantive constraint failed.
    #[error("{0}")]
    Invalid(String),

    /// A leaf's required-type guard failed.
    #[error("{0}")]
    TypeMismatch(String),

    /// A field was read before any value was set and no default exists.
    #[error("field {0} has no value")]
    Unset(String),
}

impl ValidationError {
    /// Whether this failure is the muted type-mismatch kind.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, ValidationError::TypeMismatch(_))
    }
}

/// A token string could not be converted to a typed value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CastError {
    /// Not a valid integer.
    #[error("invalid int value: {0:?}")]
    Int(String),

    /// Not a valid float.
    #[error("invalid float value: {0:?}")]
    Float(String),

    /// Not a recognized boolean token.
    #[error("invalid bool value: {0:?}")]
    Bool(String),

    /// Not in the literal candidate set.
    #[error("invalid choice: {token:?} (choose from {allowed})")]
    Choice {
        /// The rejected token.
        token: String,
        /// Comma-joined candidate list.
        allowed: String,
    },

    /// A prefix matched more than one literal candidate.
    #[error("ambiguous value {token:?}: matches {matches}")]
    AmbiguousPrefix {
        /// The ambiguous token.
        token: String,
        /// Comma-joined matching candidates.
        matches: String,
    },

    /// Every member of a union caster rejected the token.
    #[error("no alternative accepts {0:?}")]
    NoAlternative(String),

    /// A fixed-arity tuple caster received too many parts.
    #[error("too many values in {token:?}: expected {expect}")]
    TooManyValues {
        /// The raw token.
        token: String,
        /// Declared arity.
        expect: usize,
    },

    /// A custom converter failed.
    #[error("{0}")]
    Custom(String),
}

/// Malformed command-line input, or a help request.
///
/// Every variant except [`Help`](ParseError::Help) carries exit code 2;
/// `Help` carries the rendered help text and exit code 0.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Generic malformed input (unrecognized flag, missing value, ...).
    #[error("{0}")]
    Invalid(String),

    /// A token failed its field's caster.
    #[error("argument {flag}: {source}")]
    Cast {
        /// The flag (or metavar) being parsed.
        flag: String,
        /// Underlying conversion failure.
        #[source]
        source: CastError,
    },

    /// A parsed value failed its field's validator during application.
    #[error("argument {field}: {source}")]
    Validation {
        /// Attribute name of the failing field.
        field: String,
        /// Underlying constraint failure.
        #[source]
        source: ValidationError,
    },

    /// `-h`/`--help` was supplied; carries the rendered help text.
    #[error("help requested")]
    Help(String),
}

impl ParseError {
    /// Process exit code for this error (0 for help, 2 otherwise).
    pub fn code(&self) -> i32 {
        match self {
            ParseError::Help(_) => 0,
            _ => 2,
        }
    }
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
