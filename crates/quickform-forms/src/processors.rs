//! Value processors: the per-element validation/conversion pipeline steps.
//!
//! A [`Processor`] takes one submitted [`Value`] and either returns a
//! (possibly converted) value or fails with a [`ValueError`]. Processors run
//! in registration order and do not short-circuit: every processor sees the
//! output of the previous successful one, and every failure message is
//! collected by the owning element.
//!
//! [`apply_multi`] is the wrapper that adapts a scalar processor to
//! multi-value elements: in multi mode the processor maps over each list
//! item; in single mode a submitted list is itself a validation failure.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use quickform_core::{FormError, FormResult, Value, ValueError};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[a-zA-Z0-9.-]+(?::\d+)?(?:/[^\s]*)?$").expect("valid url regex")
});

/// Context handed to every processor invocation.
#[derive(Debug, Clone)]
pub struct ProcessState {
    /// Whether the owning element accepts multiple values.
    pub multiple: bool,
    /// The owning element's user-facing label (falls back to its id).
    pub label: String,
}

/// The target coercion type applied after all processors succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vtype {
    Bool,
    Int,
    Float,
    /// An alias of [`Vtype::Float`]: the value goes through `f64`, so
    /// inputs needing exact decimal arithmetic (or integers beyond 2^53)
    /// lose precision. Use `Str` and parse downstream when that matters.
    Decimal,
    Str,
}

impl Vtype {
    /// Parses a coercion-type tag. Several aliases are accepted for each
    /// type; anything else is a configuration error.
    pub fn from_tag(tag: &str) -> FormResult<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(Self::Bool),
            "int" | "integer" => Ok(Self::Int),
            "num" | "number" | "float" => Ok(Self::Float),
            "decimal" => Ok(Self::Decimal),
            "str" | "string" | "unicode" | "uni" => Ok(Self::Str),
            other => Err(FormError::InvalidVtype(other.to_string())),
        }
    }

    /// Coerces a single non-empty scalar to this type.
    pub fn coerce(self, value: Value) -> Result<Value, ValueError> {
        match self {
            Self::Bool => coerce_bool(value),
            Self::Int => coerce_int(value),
            Self::Float | Self::Decimal => coerce_float(value),
            Self::Str => Ok(Value::String(value.to_string())),
        }
    }
}

fn coerce_bool(value: Value) -> Result<Value, ValueError> {
    match &value {
        Value::Bool(_) => Ok(value),
        Value::Int(i) => Ok(Value::Bool(*i != 0)),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "no" | "n" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(ValueError::new("Enter a valid boolean value.")),
        },
        _ => Err(ValueError::new("Enter a valid boolean value.")),
    }
}

fn coerce_int(value: Value) -> Result<Value, ValueError> {
    match &value {
        Value::Int(_) => Ok(value),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(f) if f.fract() == 0.0 => Ok(Value::Int(*f as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ValueError::new("Enter a whole number.")),
        _ => Err(ValueError::new("Enter a whole number.")),
    }
}

fn coerce_float(value: Value) -> Result<Value, ValueError> {
    match &value {
        Value::Float(_) => Ok(value),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ValueError::new("Enter a number.")),
        _ => Err(ValueError::new("Enter a number.")),
    }
}

/// Option-set membership for select-style elements.
///
/// Membership is compared on [`Value::str_key`] so that `Int(1)` and
/// `String("1")` describe the same option. Keys in `invalid` fail outright;
/// keys in `treat_as_empty` (placeholder rows like "Choose:") convert to
/// [`Value::Null`] instead of failing.
#[derive(Debug, Clone, Default)]
pub struct SelectChoice {
    options: Vec<String>,
    invalid: Vec<String>,
    treat_as_empty: Vec<String>,
}

impl SelectChoice {
    pub fn new<I>(options: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self {
            options: options.into_iter().map(|v| v.into().str_key()).collect(),
            invalid: Vec::new(),
            treat_as_empty: Vec::new(),
        }
    }

    #[must_use]
    pub fn invalid<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.invalid
            .extend(keys.into_iter().map(|v| v.into().str_key()));
        self
    }

    #[must_use]
    pub fn treat_as_empty<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.treat_as_empty
            .extend(keys.into_iter().map(|v| v.into().str_key()));
        self
    }

    fn check(&self, value: Value) -> Result<Value, ValueError> {
        let key = value.str_key();
        if self.invalid.contains(&key) {
            return Err(ValueError::new("the value chosen is invalid"));
        }
        if !self.options.contains(&key) {
            return Err(ValueError::new(
                "the value did not come from the given options",
            ));
        }
        if self.treat_as_empty.contains(&key) {
            return Ok(Value::Null);
        }
        Ok(value)
    }
}

/// The resolved state of a confirm target at validation time.
#[derive(Debug, Clone)]
pub struct ConfirmOutcome {
    /// The target element's label, used in the mismatch message.
    pub label: String,
    /// The target's safe value, or `None` if the target itself failed
    /// validation (in which case the confirm check is skipped).
    pub value: Option<Value>,
}

/// Cross-field equality check ("repeat your password").
///
/// The processor only knows the target element's id; the owning form primes
/// it with a [`ConfirmOutcome`] before validation runs. An unprimed or
/// invalid-target confirm passes, so the user sees the target's own error
/// rather than a redundant mismatch.
#[derive(Debug, Clone)]
pub struct Confirm {
    target_id: String,
    outcome: Option<ConfirmOutcome>,
}

impl Confirm {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            outcome: None,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn prime(&mut self, outcome: ConfirmOutcome) {
        self.outcome = Some(outcome);
    }

    fn check(&self, value: Value) -> Result<Value, ValueError> {
        let Some(outcome) = &self.outcome else {
            return Ok(value);
        };
        let Some(target_value) = &outcome.value else {
            return Ok(value);
        };
        if *target_value == value {
            Ok(value)
        } else {
            Err(ValueError::new(format!(
                "does not match field \"{}\"",
                outcome.label
            )))
        }
    }
}

/// A custom processing function supplied by the application.
pub type CustomFn = Box<dyn Fn(Value, &ProcessState) -> Result<Value, ValueError> + Send + Sync>;

/// One step in an element's processing pipeline.
pub enum Processor {
    /// Restrict the value to a known option set.
    Select(SelectChoice),
    /// Require equality with another element's safe value.
    Confirm(Confirm),
    /// Maximum string length in characters.
    MaxLength(usize),
    /// Minimum string length in characters.
    MinLength(usize),
    /// Validate the value as an email address.
    Email,
    /// Validate the value as an http(s) URL.
    Url,
    /// Parse the value as a date (`YYYY-MM-DD` or `MM/DD/YYYY`).
    Date,
    /// Parse the value as a time (`HH:MM:SS` or `HH:MM`).
    Time,
    /// Coerce the value to the given type.
    Coerce(Vtype),
    /// An application-supplied function.
    Custom(CustomFn),
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(c) => f.debug_tuple("Select").field(c).finish(),
            Self::Confirm(c) => f.debug_tuple("Confirm").field(c).finish(),
            Self::MaxLength(n) => f.debug_tuple("MaxLength").field(n).finish(),
            Self::MinLength(n) => f.debug_tuple("MinLength").field(n).finish(),
            Self::Email => write!(f, "Email"),
            Self::Url => write!(f, "Url"),
            Self::Date => write!(f, "Date"),
            Self::Time => write!(f, "Time"),
            Self::Coerce(v) => f.debug_tuple("Coerce").field(v).finish(),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Processor {
    /// Runs this processor against a single scalar value.
    pub fn apply(&self, value: Value, state: &ProcessState) -> Result<Value, ValueError> {
        match self {
            Self::Select(choice) => choice.check(value),
            Self::Confirm(confirm) => confirm.check(value),
            Self::MaxLength(max) => check_length(value, |len| len <= *max, || {
                format!("Ensure this value has at most {max} characters")
            }),
            Self::MinLength(min) => check_length(value, |len| len >= *min, || {
                format!("Ensure this value has at least {min} characters")
            }),
            Self::Email => match value.as_str() {
                Some(s) if !EMAIL_RE.is_match(s) => {
                    Err(ValueError::new("Enter a valid email address."))
                }
                _ => Ok(value),
            },
            Self::Url => match value.as_str() {
                Some(s) if !URL_RE.is_match(s) => Err(ValueError::new("Enter a valid URL.")),
                _ => Ok(value),
            },
            Self::Date => parse_date(value),
            Self::Time => parse_time(value),
            Self::Coerce(vtype) => vtype.coerce(value),
            Self::Custom(func) => func(value, state),
        }
    }

    /// The inverse direction, used to turn a typed default value back into
    /// its display form. Most processors are identity here.
    pub fn from_python(&self, value: Value) -> Value {
        match self {
            Self::Date | Self::Time | Self::Coerce(_) => Value::String(value.to_string()),
            _ => value,
        }
    }
}

fn check_length(
    value: Value,
    ok: impl Fn(usize) -> bool,
    message: impl Fn() -> String,
) -> Result<Value, ValueError> {
    match value.as_str() {
        Some(s) => {
            let len = s.chars().count();
            if ok(len) {
                Ok(value)
            } else {
                Err(ValueError::new(format!("{} (it has {len}).", message())))
            }
        }
        None => Ok(value),
    }
}

fn parse_date(value: Value) -> Result<Value, ValueError> {
    match &value {
        Value::Date(_) => Ok(value),
        Value::String(s) => {
            let s = s.trim();
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| chrono::NaiveDate::parse_from_str(s, "%m/%d/%Y"))
                .map(Value::Date)
                .map_err(|_| ValueError::new("Enter a valid date."))
        }
        _ => Err(ValueError::new("Enter a valid date.")),
    }
}

fn parse_time(value: Value) -> Result<Value, ValueError> {
    match &value {
        Value::Time(_) => Ok(value),
        Value::String(s) => {
            let s = s.trim();
            chrono::NaiveTime::parse_from_str(s, "%H:%M:%S")
                .or_else(|_| chrono::NaiveTime::parse_from_str(s, "%H:%M"))
                .map(Value::Time)
                .map_err(|_| ValueError::new("Enter a valid time."))
        }
        _ => Err(ValueError::new("Enter a valid time.")),
    }
}

/// Adapts a scalar processor to the owning element's multiplicity.
///
/// Empty values (the unset sentinels, `Null`, empty strings and lists) pass
/// through untouched; emptiness is the required-check's concern, not the
/// processors'. In multi mode the processor maps over each non-empty list
/// item and the result is always a list. In single mode a submitted list is
/// rejected unless `multi_check` is disabled (the vtype coercion step turns
/// it off because the list shape was already vetted by the pipeline).
pub fn apply_multi(
    processor: &Processor,
    value: Value,
    state: &ProcessState,
    multi_check: bool,
) -> Result<Value, ValueError> {
    if value.is_empty() {
        return Ok(value);
    }
    if !state.multiple {
        if multi_check && value.is_list() {
            return Err(ValueError::new(
                "this field does not accept more than one value",
            ));
        }
        return processor.apply(value, state);
    }
    let mut out = Vec::new();
    for item in value.as_list() {
        if item.is_empty() {
            out.push(item);
        } else {
            out.push(processor.apply(item, state)?);
        }
    }
    Ok(Value::List(out))
}
