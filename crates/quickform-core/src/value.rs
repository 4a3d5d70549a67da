//! The value model shared by every form element.
//!
//! [`Value`] is the universal type used to carry default values, submitted
//! values, and processed (safe) values through the validation pipeline. Two
//! sentinel variants distinguish "the caller never supplied this" from
//! "present but empty":
//!
//! - [`Value::Unset`] — no value was ever supplied for this element.
//! - [`Value::UnsetMulti`] — same, but shaped like an empty sequence so that
//!   multi-value elements can iterate it safely.
//!
//! These are deliberately distinct from [`Value::Null`], `Value::Int(0)`,
//! `Value::Bool(false)`, and `Value::String("")`: collapsing "absent" into
//! "falsy" breaks required-field semantics and checkbox handling.

use std::fmt;

/// A dynamically typed form value.
///
/// # Examples
///
/// ```
/// use quickform_core::Value;
///
/// let v = Value::from(42_i64);
/// assert_eq!(v, Value::Int(42));
///
/// // Sentinels compare equal to Null but are distinct variants.
/// assert_eq!(Value::Unset, Value::Null);
/// assert!(!matches!(Value::Unset, Value::Null));
/// assert_ne!(Value::Int(0), Value::Unset);
/// ```
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// No value was ever supplied.
    Unset,
    /// No value was ever supplied; behaves as an empty sequence.
    UnsetMulti,
    /// Explicitly empty / no value.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// A date without time.
    Date(chrono::NaiveDate),
    /// A time without date.
    Time(chrono::NaiveTime),
    /// A list of values (multi-selects, checkbox groups).
    List(Vec<Value>),
}

impl Value {
    /// Returns `true` for the two "never supplied" sentinels.
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset | Self::UnsetMulti)
    }

    /// Returns `true` if a value was supplied (even an empty one).
    pub const fn is_given(&self) -> bool {
        !self.is_unset()
    }

    /// The emptiness predicate used by required-field checks and the
    /// `if_empty` substitution: covers the sentinels, `Null`, the empty
    /// string, and the empty list. `0`, `false`, and `"0"` are NOT empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Unset | Self::UnsetMulti | Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Date(_) | Self::Time(_) => false,
        }
    }

    /// Loose truthiness, used by checkbox-style elements where "empty" means
    /// "falsy" rather than "missing".
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Unset | Self::UnsetMulti | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Date(_) | Self::Time(_) => true,
            Self::List(items) => !items.is_empty(),
        }
    }

    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Converts to a list: lists are cloned, empty values produce an empty
    /// list, and scalars produce a single-item list.
    pub fn as_list(&self) -> Vec<Self> {
        match self {
            Self::List(items) => items.clone(),
            Self::Unset | Self::UnsetMulti | Self::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// Wraps this value in a `List` using [`as_list`](Self::as_list) rules.
    pub fn into_list(self) -> Self {
        match self {
            Self::List(_) => self,
            Self::Unset | Self::UnsetMulti | Self::Null => Self::List(Vec::new()),
            other => Self::List(vec![other]),
        }
    }

    /// The string normalization used for option-set membership comparisons,
    /// so that `Int(1)`, `String("1")`, and `Float(1.0)` all compare
    /// consistently even though submitted values round-trip through several
    /// representations.
    pub fn str_key(&self) -> String {
        self.to_string()
    }

    /// Returns the contained string slice, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Strips leading/trailing whitespace from string values; string items
    /// inside a list are stripped individually. Non-strings pass through.
    pub fn stripped(&self) -> Self {
        match self {
            Self::String(s) => Self::String(s.trim().to_string()),
            Self::List(items) => Self::List(items.iter().map(Self::stripped).collect()),
            other => other.clone(),
        }
    }
}

impl PartialEq for Value {
    /// The sentinel variants and `Null` all compare equal to one another;
    /// `UnsetMulti` additionally equals the empty list. Everything else is
    /// structural. Variant identity (via `matches!`) remains the way to tell
    /// "absent" apart from "explicitly empty".
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Unset | Self::UnsetMulti | Self::Null,
                Self::Unset | Self::UnsetMulti | Self::Null,
            ) => true,
            (Self::UnsetMulti, Self::List(items)) | (Self::List(items), Self::UnsetMulti) => {
                items.is_empty()
            }
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset | Self::UnsetMulti | Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::Time(t) => write!(f, "{t}"),
            Self::List(items) => {
                let keys: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", keys.join(", "))
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Unset
    }
}

// ── From implementations ───────────────────────────────────────────────

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
