//! Form elements: fields, logical groups, static content, and file inputs.
//!
//! [`Field`] is the workhorse. It carries three distinct values through its
//! lifecycle (default, submitted, safe) and a tri-state [`Validity`]: the
//! processing pipeline runs lazily on the first `is_valid()` or `value()`
//! call and is cached until a new submitted value arrives.
//!
//! [`LogicalGroup`] models a set of related checkboxes or radio buttons that
//! submit under one name. [`StaticElement`] covers render-only and
//! pass-through content. [`FileField`] validates uploads against extension,
//! content-type, and size rules instead of running a value pipeline.

use std::fmt;

use quickform_core::{FormError, FormResult, Value};

use crate::processors::{
    apply_multi, ConfirmOutcome, ProcessState, Processor, SelectChoice, Vtype,
};
use crate::upload::{FileUpload, UploadInfo};

pub(crate) const REQUIRED_MSG: &str = "field is required";

/// The cached outcome of an element's processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    /// The pipeline has not run since the last submitted value was set.
    #[default]
    Unknown,
    Valid,
    Invalid,
}

/// The concrete kind of a [`Field`], carrying kind-specific configuration.
#[derive(Debug, Clone)]
pub enum ElementKind {
    Button,
    Text,
    Password {
        /// Whether the default value may be echoed back when rendering.
        default_ok: bool,
    },
    Hidden,
    Checkbox,
    Textarea {
        rows: u32,
        cols: u32,
    },
    Select {
        multiple: bool,
        /// `(value, display text)` rows, placeholders included.
        options: Vec<(Value, String)>,
    },
    Confirm,
    Date,
    Time,
    Email,
    Url,
    Submit {
        /// A fixed submit always displays its default value.
        fixed: bool,
    },
    Cancel {
        fixed: bool,
    },
    /// The internal kind backing a [`LogicalGroup`]. Not directly rendered.
    Group,
}

impl ElementKind {
    /// Resolves a kind tag used by the string-based element factory.
    pub fn from_tag(tag: &str) -> FormResult<Self> {
        match tag {
            "button" => Ok(Self::Button),
            "text" => Ok(Self::Text),
            "password" => Ok(Self::Password { default_ok: false }),
            "hidden" => Ok(Self::Hidden),
            "checkbox" => Ok(Self::Checkbox),
            "textarea" => Ok(Self::Textarea { rows: 7, cols: 40 }),
            "select" => Ok(Self::Select {
                multiple: false,
                options: Vec::new(),
            }),
            "mselect" => Ok(Self::Select {
                multiple: true,
                options: Vec::new(),
            }),
            "confirm" => Ok(Self::Confirm),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "email" => Ok(Self::Email),
            "url" => Ok(Self::Url),
            "submit" => Ok(Self::Submit { fixed: true }),
            "cancel" => Ok(Self::Cancel { fixed: true }),
            other => Err(FormError::UnknownElementType(other.to_string())),
        }
    }

    const fn is_multiple(&self) -> bool {
        matches!(self, Self::Select { multiple: true, .. })
    }
}

/// Matches caught external error text against a configured pattern and turns
/// it into a field error. All configured criteria must match; a handler with
/// none configured catches everything.
pub struct ExceptionHandler {
    substring: Option<String>,
    type_name: Option<String>,
    predicate: Option<Box<dyn Fn(&str) -> bool + Send + Sync>>,
    message: Option<String>,
}

impl fmt::Debug for ExceptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionHandler")
            .field("substring", &self.substring)
            .field("type_name", &self.type_name)
            .field("has_predicate", &self.predicate.is_some())
            .field("message", &self.message)
            .finish()
    }
}

impl ExceptionHandler {
    pub fn new() -> Self {
        Self {
            substring: None,
            type_name: None,
            predicate: None,
            message: None,
        }
    }

    #[must_use]
    pub fn substring(mut self, needle: impl Into<String>) -> Self {
        self.substring = Some(needle.into());
        self
    }

    #[must_use]
    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn predicate(mut self, pred: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Box::new(pred));
        self
    }

    /// The error message recorded on a match; defaults to the caught text.
    #[must_use]
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    fn matches(&self, text: &str, type_name: Option<&str>) -> bool {
        if let Some(pred) = &self.predicate {
            if !pred(text) {
                return false;
            }
        }
        if let Some(wanted) = &self.type_name {
            if type_name != Some(wanted.as_str()) {
                return false;
            }
        }
        if let Some(needle) = &self.substring {
            if !text.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }
}

impl Default for ExceptionHandler {
    fn default() -> Self {
        Self::new()
    }
}

struct PipelineStep {
    processor: Processor,
    message: Option<String>,
}

impl fmt::Debug for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStep")
            .field("processor", &self.processor)
            .field("message", &self.message)
            .finish()
    }
}

/// A single submittable form field.
#[derive(Debug)]
pub struct Field {
    id: String,
    kind: ElementKind,
    label: Option<String>,
    name_attr: Option<String>,
    vtype: Option<Vtype>,
    required: bool,
    strip: bool,
    multiple: bool,
    max_length: Option<usize>,
    if_missing: Value,
    if_empty: Value,
    if_invalid: Value,
    default_val: Value,
    submitted_val: Value,
    safe_val: Value,
    validity: Validity,
    errors: Vec<String>,
    notes: Vec<String>,
    pipeline: Vec<PipelineStep>,
    handlers: Vec<ExceptionHandler>,
}

impl Field {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        let multiple = kind.is_multiple();
        let mut field = Self {
            id: id.into(),
            label: None,
            name_attr: None,
            vtype: None,
            required: false,
            strip: true,
            multiple,
            max_length: None,
            if_missing: Value::Unset,
            if_empty: Value::Unset,
            if_invalid: Value::Unset,
            default_val: Value::Unset,
            submitted_val: if multiple {
                Value::UnsetMulti
            } else {
                Value::Unset
            },
            safe_val: Value::Unset,
            validity: Validity::Unknown,
            errors: Vec::new(),
            notes: Vec::new(),
            pipeline: Vec::new(),
            handlers: Vec::new(),
            kind,
        };
        match &field.kind {
            ElementKind::Checkbox => {
                field.vtype = Some(Vtype::Bool);
                field.if_empty = Value::Bool(false);
                field.default_val = Value::Bool(false);
            }
            ElementKind::Date => field.pipeline.push(PipelineStep {
                processor: Processor::Date,
                message: None,
            }),
            ElementKind::Time => field.pipeline.push(PipelineStep {
                processor: Processor::Time,
                message: None,
            }),
            ElementKind::Email => field.pipeline.push(PipelineStep {
                processor: Processor::Email,
                message: None,
            }),
            ElementKind::Url => field.pipeline.push(PipelineStep {
                processor: Processor::Url,
                message: None,
            }),
            ElementKind::Submit { .. } => field.default_val = Value::from("Submit"),
            ElementKind::Cancel { .. } => field.default_val = Value::from("Cancel"),
            _ => {}
        }
        field
    }

    // ── builders ───────────────────────────────────────────────────────

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    #[must_use]
    pub fn vtype(mut self, vtype: Vtype) -> Self {
        self.vtype = Some(vtype);
        self
    }

    #[must_use]
    pub fn if_missing(mut self, value: impl Into<Value>) -> Self {
        self.if_missing = value.into();
        self
    }

    #[must_use]
    pub fn if_empty(mut self, value: impl Into<Value>) -> Self {
        self.if_empty = value.into();
        self
    }

    #[must_use]
    pub fn if_invalid(mut self, value: impl Into<Value>) -> Self {
        self.if_invalid = value.into();
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.set_default_value(value.into());
        self
    }

    /// Overrides the HTML `name` attribute (defaults to the element id).
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name_attr = Some(name.into());
        self
    }

    /// Caps the string length and records the cap for rendering.
    #[must_use]
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self.pipeline.push(PipelineStep {
            processor: Processor::MaxLength(max),
            message: None,
        });
        self
    }

    // ── accessors ──────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// The label shown to users; falls back to the id.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub const fn is_required(&self) -> bool {
        self.required
    }

    pub fn set_required(&mut self, required: bool) {
        self.required = required;
        self.validity = Validity::Unknown;
    }

    pub fn set_vtype(&mut self, vtype: Vtype) {
        self.vtype = Some(vtype);
        self.validity = Validity::Unknown;
    }

    pub const fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub const fn max_length_attr(&self) -> Option<usize> {
        self.max_length
    }

    /// The HTML `name` attribute used for submission binding.
    pub fn submit_name(&self) -> &str {
        self.name_attr.as_deref().unwrap_or(&self.id)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Records an error and marks the field invalid, overriding any earlier
    /// pipeline outcome.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.validity = Validity::Invalid;
    }

    /// Drops an injected error by invalidating the cached outcome; the
    /// next validation re-derives the element's own messages.
    pub(crate) fn retract_error(&mut self, msg: &str) {
        if self.errors.iter().any(|e| e == msg) {
            self.validity = Validity::Unknown;
        }
    }

    pub(crate) fn submitted_value(&self) -> &Value {
        &self.submitted_val
    }

    /// Whether this field binds a value from submissions. Buttons never do.
    pub fn is_submittable(&self) -> bool {
        !matches!(self.kind, ElementKind::Button)
    }

    /// Whether this field contributes to the form's value mapping.
    pub fn is_returning(&self) -> bool {
        !matches!(
            self.kind,
            ElementKind::Button | ElementKind::Submit { .. } | ElementKind::Cancel { .. }
        )
    }

    // ── value lifecycle ────────────────────────────────────────────────

    pub fn set_default_value(&mut self, value: Value) {
        self.default_val = value;
    }

    /// Binds a submitted value, resetting the cached pipeline outcome.
    /// Checkboxes coerce to presence-truthiness at bind time.
    pub fn set_submitted_value(&mut self, value: Value) {
        self.submitted_val = if matches!(self.kind, ElementKind::Checkbox) && value.is_given() {
            Value::Bool(value.is_truthy())
        } else {
            value
        };
        self.validity = Validity::Unknown;
        self.errors.clear();
        self.safe_val = Value::Unset;
    }

    /// The value to render: fixed submit/cancel buttons always show their
    /// default, passwords never echo unless explicitly allowed, submitted
    /// values win over defaults, and typed defaults are converted back to
    /// display form by the pipeline.
    pub fn display_value(&self) -> Value {
        match &self.kind {
            ElementKind::Submit { fixed: true } | ElementKind::Cancel { fixed: true } => {
                return self.default_val.clone();
            }
            ElementKind::Password { default_ok: false } => return Value::Null,
            _ => {}
        }
        if self.submitted_val.is_given() {
            return self.submitted_val.clone();
        }
        let mut value = self.default_val.clone();
        if !value.is_empty() {
            for step in &self.pipeline {
                value = step.processor.from_python(value);
            }
        }
        value
    }

    // ── pipeline configuration ─────────────────────────────────────────

    pub fn add_processor(&mut self, processor: Processor) {
        self.pipeline.push(PipelineStep {
            processor,
            message: None,
        });
        self.validity = Validity::Unknown;
    }

    /// Like [`add_processor`](Self::add_processor) but overrides the error
    /// message the processor would produce.
    pub fn add_processor_with_msg(&mut self, processor: Processor, msg: impl Into<String>) {
        self.pipeline.push(PipelineStep {
            processor,
            message: Some(msg.into()),
        });
        self.validity = Validity::Unknown;
    }

    pub fn add_handler(&mut self, handler: ExceptionHandler) {
        self.handlers.push(handler);
    }

    /// Offers caught external error text to this field's handlers. The first
    /// matching handler records its message (or the text itself) as a field
    /// error and invalidates the field.
    pub fn handle_exception(&mut self, text: &str, type_name: Option<&str>) -> bool {
        for handler in &self.handlers {
            if handler.matches(text, type_name) {
                let msg = handler
                    .message
                    .clone()
                    .unwrap_or_else(|| text.to_string());
                self.errors.push(msg);
                self.validity = Validity::Invalid;
                return true;
            }
        }
        false
    }

    pub(crate) fn confirm_target(&self) -> Option<&str> {
        self.pipeline.iter().find_map(|step| match &step.processor {
            Processor::Confirm(c) => Some(c.target_id()),
            _ => None,
        })
    }

    pub(crate) fn prime_confirm(&mut self, outcome: ConfirmOutcome) {
        for step in &mut self.pipeline {
            if let Processor::Confirm(c) = &mut step.processor {
                c.prime(outcome.clone());
            }
        }
        self.validity = Validity::Unknown;
        self.errors.clear();
    }

    // ── validation ─────────────────────────────────────────────────────

    /// Emptiness as the required-check sees it. Checkboxes treat any falsy
    /// value as missing; everything else uses the standard predicate.
    fn required_missing(&self, value: &Value) -> bool {
        if matches!(self.kind, ElementKind::Checkbox) {
            !value.is_truthy()
        } else {
            value.is_empty()
        }
    }

    /// Empty values either take the `if_empty` substitute or collapse to
    /// `Null`; the unset sentinels stay as they are.
    fn empty_normalized(&self, value: Value) -> Value {
        if !value.is_empty() {
            return value;
        }
        if self.if_empty.is_given() {
            self.if_empty.clone()
        } else if value.is_unset() {
            value
        } else {
            Value::Null
        }
    }

    fn process(&mut self) {
        if self.validity != Validity::Unknown {
            return;
        }
        self.errors.clear();
        let mut value = self.submitted_val.clone();

        if self.strip {
            value = value.stripped();
        }
        if value.is_unset() && self.if_missing.is_given() {
            value = self.if_missing.clone();
        }
        value = self.empty_normalized(value);
        if self.required && self.required_missing(&value) {
            self.errors.push(REQUIRED_MSG.to_string());
        }

        let state = ProcessState {
            multiple: self.multiple,
            label: self.display_label().to_string(),
        };
        for step in &self.pipeline {
            match apply_multi(&step.processor, value.clone(), &state, true) {
                Ok(out) => value = out,
                Err(err) => self
                    .errors
                    .push(step.message.clone().unwrap_or(err.message)),
            }
        }
        // processors may have produced a new empty value
        value = self.empty_normalized(value);
        // multi-value fields always carry a list once processing is done
        if self.multiple && !value.is_list() && !value.is_unset() {
            value = value.into_list();
        }
        // a processor may have emptied the value (placeholder rows), so the
        // required check runs once more, without duplicating the message
        if self.required
            && self.required_missing(&value)
            && !self.errors.iter().any(|e| e == REQUIRED_MSG)
        {
            self.errors.push(REQUIRED_MSG.to_string());
        }

        if !value.is_empty() {
            if let Some(vtype) = self.vtype {
                match apply_multi(&Processor::Coerce(vtype), value.clone(), &state, false) {
                    Ok(out) => value = out,
                    Err(err) => self.errors.push(err.message),
                }
            }
        }

        if self.errors.is_empty() {
            self.safe_val = value;
            self.validity = Validity::Valid;
        } else if self.if_invalid.is_given() {
            // the messages stay readable; only the access behavior changes
            self.safe_val = self.if_invalid.clone();
            self.validity = Validity::Valid;
        } else {
            self.safe_val = Value::Unset;
            self.validity = Validity::Invalid;
        }
    }

    /// Runs the pipeline (if not cached) and reports validity.
    pub fn is_valid(&mut self) -> bool {
        self.process();
        self.validity == Validity::Valid
    }

    /// The processed safe value. Reading it from an invalid field is a
    /// programming error.
    pub fn value(&mut self) -> FormResult<Value> {
        self.process();
        if self.validity == Validity::Valid {
            Ok(self.safe_val.clone())
        } else {
            Err(FormError::InvalidValueAccess {
                label: self.display_label().to_string(),
            })
        }
    }
}

/// The kind of input a logical-group member renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Checkbox,
    Radio,
}

/// One checkbox or radio button belonging to a [`LogicalGroup`].
#[derive(Debug, Clone)]
pub struct GroupMember {
    pub id: String,
    pub label: String,
    /// The value submitted when this member is chosen. Must be unique
    /// within the group (compared on [`Value::str_key`]).
    pub value_key: Value,
    pub chosen: bool,
    pub kind: MemberKind,
}

/// A set of same-named checkboxes or radio buttons validated as one element.
///
/// The group owns a backing [`Field`] that runs the normal pipeline. Unless
/// auto-validation is disabled, an option-set processor built from the
/// member value keys is installed lazily on first validation, so members
/// registered after the group still count. Binding a value re-derives every
/// member's `chosen` flag.
#[derive(Debug)]
pub struct LogicalGroup {
    field: Field,
    members: Vec<GroupMember>,
    auto_validate: bool,
    invalid_keys: Vec<Value>,
    error_msg: Option<String>,
    select_installed: bool,
}

impl LogicalGroup {
    pub fn new(id: impl Into<String>, multiple: bool) -> Self {
        let mut field = Field::new(id, ElementKind::Group);
        field.multiple = multiple;
        if multiple {
            field.submitted_val = Value::UnsetMulti;
        }
        Self {
            field,
            members: Vec::new(),
            auto_validate: true,
            invalid_keys: Vec::new(),
            error_msg: None,
            select_installed: false,
        }
    }

    pub fn id(&self) -> &str {
        self.field.id()
    }

    pub const fn is_multiple(&self) -> bool {
        self.field.is_multiple()
    }

    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    pub fn errors(&self) -> &[String] {
        self.field.errors()
    }

    pub fn set_required(&mut self, required: bool) {
        self.field.required = required;
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.field.label = Some(label.into());
    }

    pub fn display_label(&self) -> &str {
        self.field.display_label()
    }

    /// Disables the automatic option-set processor.
    pub fn set_auto_validate(&mut self, auto: bool) {
        self.auto_validate = auto;
    }

    /// Marks member value keys that must be rejected even though rendered.
    pub fn add_invalid_key(&mut self, key: impl Into<Value>) {
        self.invalid_keys.push(key.into());
    }

    /// Overrides the option-set processor's error message.
    pub fn set_error_msg(&mut self, msg: impl Into<String>) {
        self.error_msg = Some(msg.into());
    }

    pub fn add_member(&mut self, member: GroupMember) -> FormResult<()> {
        let key = member.value_key.str_key();
        if self.members.iter().any(|m| m.value_key.str_key() == key) {
            return Err(FormError::DuplicateMember(key));
        }
        self.members.push(member);
        Ok(())
    }

    fn ensure_validator(&mut self) {
        if self.select_installed {
            return;
        }
        self.select_installed = true;
        if !self.auto_validate {
            return;
        }
        let mut choice = SelectChoice::new(self.members.iter().map(|m| m.value_key.clone()));
        if !self.invalid_keys.is_empty() {
            choice = choice.invalid(self.invalid_keys.clone());
        }
        let processor = Processor::Select(choice);
        match &self.error_msg {
            Some(msg) => self.field.add_processor_with_msg(processor, msg.clone()),
            None => self.field.add_processor(processor),
        }
    }

    fn apply_chosen(&mut self, value: &Value) {
        let keys: Vec<String> = value.as_list().iter().map(Value::str_key).collect();
        for member in &mut self.members {
            member.chosen = keys.contains(&member.value_key.str_key());
        }
    }

    pub fn set_default_value(&mut self, value: Value) {
        self.field.set_default_value(value.clone());
        if self.field.submitted_value().is_unset() {
            self.apply_chosen(&value);
        }
    }

    /// Binds a submitted value. Validation runs eagerly here so the chosen
    /// flags reflect the processed value; the cached outcome makes the later
    /// `is_valid()` call free.
    pub fn set_submitted_value(&mut self, value: Value) {
        self.field.set_submitted_value(value);
        self.ensure_validator();
        if self.field.submitted_value().is_given() && self.field.is_valid() {
            let safe = self.field.safe_val.clone();
            self.apply_chosen(&safe);
        }
    }

    pub fn is_valid(&mut self) -> bool {
        self.ensure_validator();
        self.field.is_valid()
    }

    /// The processed value: a list for multi (checkbox) groups, a scalar for
    /// single (radio) groups.
    pub fn value(&mut self) -> FormResult<Value> {
        self.ensure_validator();
        self.field.value()
    }

    pub(crate) fn field_mut(&mut self) -> &mut Field {
        &mut self.field
    }
}

/// What a [`StaticElement`] renders as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticKind {
    /// A label/value row with no input.
    Static,
    /// A heading; `tag` is the HTML tag name (`h1`..`h6`).
    Header { tag: String },
    /// Rendered as given and returned in the value mapping.
    Fixed,
    /// Not rendered at all, but returned in the value mapping.
    PassThru,
}

/// Render-only or pass-through content registered alongside real fields so
/// it keeps its place in the form's element order.
#[derive(Debug, Clone)]
pub struct StaticElement {
    id: String,
    kind: StaticKind,
    label: Option<String>,
    value: Value,
}

impl StaticElement {
    pub fn new(id: impl Into<String>, kind: StaticKind) -> Self {
        Self {
            id: id.into(),
            kind,
            label: None,
            value: Value::Unset,
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn kind(&self) -> &StaticKind {
        &self.kind
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn value(&self) -> Value {
        self.value.clone()
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    pub const fn is_renderable(&self) -> bool {
        !matches!(self.kind, StaticKind::PassThru)
    }

    /// Fixed and pass-through elements contribute to the value mapping; the
    /// value is safe by construction since it never comes from a submission.
    pub const fn is_returning(&self) -> bool {
        matches!(self.kind, StaticKind::Fixed | StaticKind::PassThru)
    }
}

/// A file input. Files do not run the value pipeline; instead the bound
/// upload is checked against extension, content-type, and size rules.
#[derive(Debug)]
pub struct FileField {
    id: String,
    label: Option<String>,
    required: bool,
    allowed_exts: Vec<String>,
    denied_exts: Vec<String>,
    allowed_types: Vec<String>,
    denied_types: Vec<String>,
    max_size: Option<u64>,
    upload: Option<FileUpload>,
    validity: Validity,
    errors: Vec<String>,
    notes: Vec<String>,
    handlers: Vec<ExceptionHandler>,
}

fn normalize_ext(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

impl FileField {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            required: false,
            allowed_exts: Vec::new(),
            denied_exts: Vec::new(),
            allowed_types: Vec::new(),
            denied_types: Vec::new(),
            max_size: None,
            upload: None,
            validity: Validity::Unknown,
            errors: Vec::new(),
            notes: Vec::new(),
            handlers: Vec::new(),
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.validity = Validity::Invalid;
    }

    pub(crate) fn retract_error(&mut self, msg: &str) {
        if self.errors.iter().any(|e| e == msg) {
            self.validity = Validity::Unknown;
        }
    }

    /// Extensions are normalized to lowercase with a leading dot, so
    /// `"JPG"`, `".jpg"`, and `"jpg"` all describe the same rule.
    pub fn allow_extension(&mut self, ext: &str) {
        self.allowed_exts.push(normalize_ext(ext));
    }

    pub fn deny_extension(&mut self, ext: &str) {
        self.denied_exts.push(normalize_ext(ext));
    }

    pub fn allow_type(&mut self, content_type: &str) {
        self.allowed_types.push(content_type.to_ascii_lowercase());
    }

    pub fn deny_type(&mut self, content_type: &str) {
        self.denied_types.push(content_type.to_ascii_lowercase());
    }

    /// Maximum upload size in bytes.
    pub fn set_max_size(&mut self, bytes: u64) {
        self.max_size = Some(bytes);
    }

    /// File elements have no value pipeline; attaching a processor is
    /// always a mistake.
    pub fn add_processor(&mut self, _processor: Processor) -> FormResult<()> {
        Err(FormError::ProcessorMisuse(format!(
            "file element \"{}\" does not accept processors",
            self.id
        )))
    }

    pub fn add_handler(&mut self, handler: ExceptionHandler) {
        self.handlers.push(handler);
    }

    pub fn handle_exception(&mut self, text: &str, type_name: Option<&str>) -> bool {
        for handler in &self.handlers {
            if handler.matches(text, type_name) {
                let msg = handler
                    .message
                    .clone()
                    .unwrap_or_else(|| text.to_string());
                self.errors.push(msg);
                self.validity = Validity::Invalid;
                return true;
            }
        }
        false
    }

    pub fn set_submitted_upload(&mut self, upload: FileUpload) {
        self.upload = Some(upload);
        self.validity = Validity::Unknown;
        self.errors.clear();
    }

    fn process(&mut self) {
        if self.validity != Validity::Unknown {
            return;
        }
        self.errors.clear();
        let uploaded = self.upload.as_ref().is_some_and(FileUpload::is_uploaded);
        if uploaded {
            if let Some(upload) = &self.upload {
                if let Some(name) = upload.file_name() {
                    let ext = name
                        .rsplit_once('.')
                        .map(|(_, e)| format!(".{}", e.to_ascii_lowercase()));
                    match &ext {
                        Some(ext)
                            if self.denied_exts.contains(ext)
                                || (!self.allowed_exts.is_empty()
                                    && !self.allowed_exts.contains(ext)) =>
                        {
                            self.errors.push("extension is not allowed".to_string());
                        }
                        None if !self.allowed_exts.is_empty() => {
                            self.errors.push("extension is not allowed".to_string());
                        }
                        _ => {}
                    }
                }
                if let Some(ct) = upload.content_type() {
                    let ct = ct.to_ascii_lowercase();
                    if self.denied_types.contains(&ct)
                        || (!self.allowed_types.is_empty() && !self.allowed_types.contains(&ct))
                    {
                        self.errors.push("content type is not allowed".to_string());
                    }
                }
                if let Some(max) = self.max_size {
                    if upload.content_length() > max {
                        self.errors.push("file is too large".to_string());
                    }
                }
            }
        } else if self.required {
            self.errors.push(REQUIRED_MSG.to_string());
        }
        self.validity = if self.errors.is_empty() {
            Validity::Valid
        } else {
            Validity::Invalid
        };
    }

    pub fn is_valid(&mut self) -> bool {
        self.process();
        self.validity == Validity::Valid
    }

    /// The validated upload, or `None` when nothing was uploaded (and the
    /// field is not required).
    pub fn value(&mut self) -> FormResult<Option<&FileUpload>> {
        self.process();
        if self.validity == Validity::Valid {
            Ok(self.upload.as_ref().filter(|u| u.is_uploaded()))
        } else {
            Err(FormError::InvalidValueAccess {
                label: self.display_label().to_string(),
            })
        }
    }

    /// The representation used in the form's value mapping: the file name,
    /// or `Null` when nothing was uploaded.
    pub(crate) fn value_for_map(&self) -> Value {
        match &self.upload {
            Some(upload) if upload.is_uploaded() => {
                Value::from(upload.file_name().unwrap_or_default())
            }
            _ => Value::Null,
        }
    }
}

/// Any element a form can hold.
#[derive(Debug)]
pub enum Element {
    Field(Field),
    Group(LogicalGroup),
    Static(StaticElement),
    File(FileField),
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Self::Field(f) => f.id(),
            Self::Group(g) => g.id(),
            Self::Static(s) => s.id(),
            Self::File(f) => f.id(),
        }
    }

    /// The HTML name this element binds from submissions.
    pub fn submit_name(&self) -> &str {
        match self {
            Self::Field(f) => f.submit_name(),
            Self::Group(g) => g.id(),
            Self::Static(s) => s.id(),
            Self::File(f) => f.id(),
        }
    }

    pub fn is_submittable(&self) -> bool {
        match self {
            Self::Field(f) => f.is_submittable(),
            Self::Group(_) => true,
            // files bind through set_files, statics never bind
            Self::Static(_) | Self::File(_) => false,
        }
    }

    pub fn is_returning(&self) -> bool {
        match self {
            Self::Field(f) => f.is_returning(),
            Self::Group(_) | Self::File(_) => true,
            Self::Static(s) => s.is_returning(),
        }
    }

    pub fn is_renderable(&self) -> bool {
        match self {
            Self::Field(_) | Self::Group(_) | Self::File(_) => true,
            Self::Static(s) => s.is_renderable(),
        }
    }

    pub fn is_valid(&mut self) -> bool {
        match self {
            Self::Field(f) => f.is_valid(),
            Self::Group(g) => g.is_valid(),
            Self::Static(_) => true,
            Self::File(f) => f.is_valid(),
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            Self::Field(f) => f.errors(),
            Self::Group(g) => g.errors(),
            Self::Static(_) => &[],
            Self::File(f) => f.errors(),
        }
    }

    pub fn handle_exception(&mut self, text: &str, type_name: Option<&str>) -> bool {
        match self {
            Self::Field(f) => f.handle_exception(text, type_name),
            Self::Group(g) => g.field_mut().handle_exception(text, type_name),
            Self::Static(_) => false,
            Self::File(f) => f.handle_exception(text, type_name),
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Self::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_field_mut(&mut self) -> Option<&mut Field> {
        match self {
            Self::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut LogicalGroup> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut FileField> {
        match self {
            Self::File(f) => Some(f),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_field_rejects_empty() {
        let mut f = Field::new("name", ElementKind::Text).required(true);
        f.set_submitted_value(Value::from(""));
        assert!(!f.is_valid());
        assert_eq!(f.errors(), &["field is required".to_string()]);
        assert!(matches!(
            f.value(),
            Err(FormError::InvalidValueAccess { .. })
        ));
    }

    #[test]
    fn test_strip_and_empty_normalization() {
        let mut f = Field::new("name", ElementKind::Text);
        f.set_submitted_value(Value::from("   "));
        assert!(f.is_valid());
        // stripped to "" and normalized to Null
        assert_eq!(f.value().unwrap(), Value::Null);
        assert!(matches!(f.value().unwrap(), Value::Null));

        let mut f = Field::new("name", ElementKind::Text).strip(false);
        f.set_submitted_value(Value::from(" x "));
        assert!(f.is_valid());
        assert_eq!(f.value().unwrap(), Value::from(" x "));
    }

    #[test]
    fn test_if_missing_and_if_empty() {
        let mut f = Field::new("n", ElementKind::Text).if_missing("fallback");
        assert!(f.is_valid());
        assert_eq!(f.value().unwrap(), Value::from("fallback"));

        let mut f = Field::new("n", ElementKind::Text).if_empty("filled");
        f.set_submitted_value(Value::from(""));
        assert!(f.is_valid());
        assert_eq!(f.value().unwrap(), Value::from("filled"));
    }

    #[test]
    fn test_if_invalid_fallback_keeps_error_detail() {
        let mut f = Field::new("n", ElementKind::Text)
            .vtype(Vtype::Int)
            .if_invalid(0_i64);
        f.set_submitted_value(Value::from("not a number"));
        assert!(f.is_valid());
        assert_eq!(f.value().unwrap(), Value::Int(0));
        // the fallback makes access succeed but the diagnostic stays visible
        assert_eq!(f.errors(), &["Enter a whole number.".to_string()]);

        f.set_submitted_value(Value::from("7"));
        assert!(f.is_valid());
        assert_eq!(f.value().unwrap(), Value::Int(7));
        assert!(f.errors().is_empty());
    }

    #[test]
    fn test_pipeline_does_not_short_circuit() {
        let mut f = Field::new("n", ElementKind::Text);
        f.add_processor(Processor::MinLength(5));
        f.add_processor(Processor::MaxLength(2));
        f.set_submitted_value(Value::from("abc"));
        assert!(!f.is_valid());
        assert_eq!(f.errors().len(), 2);
    }

    #[test]
    fn test_custom_message_override() {
        let mut f = Field::new("n", ElementKind::Text);
        f.add_processor_with_msg(Processor::MaxLength(2), "too long");
        f.set_submitted_value(Value::from("abc"));
        assert!(!f.is_valid());
        assert_eq!(f.errors(), &["too long".to_string()]);
    }

    #[test]
    fn test_validation_is_cached_and_reset_on_bind() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut f = Field::new("n", ElementKind::Text);
        f.add_processor(Processor::Custom(Box::new(move |v, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(v)
        })));
        f.set_submitted_value(Value::from("x"));
        assert!(f.is_valid());
        assert!(f.is_valid());
        let _ = f.value();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        f.set_submitted_value(Value::from("y"));
        assert!(f.is_valid());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_checkbox_semantics() {
        let mut f = Field::new("agree", ElementKind::Checkbox).required(true);
        // absent or falsy fails the required check
        f.set_submitted_value(Value::Bool(false));
        assert!(!f.is_valid());

        let mut f = Field::new("agree", ElementKind::Checkbox).required(true);
        f.set_submitted_value(Value::from("1"));
        assert!(f.is_valid());
        assert_eq!(f.value().unwrap(), Value::Bool(true));

        // not required and never submitted: if_empty(false) kicks in
        let mut f = Field::new("agree", ElementKind::Checkbox);
        assert!(f.is_valid());
        assert_eq!(f.value().unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_multi_select_vtype_int() {
        let mut f = Field::new(
            "nums",
            ElementKind::Select {
                multiple: true,
                options: vec![
                    (Value::Int(1), "one".into()),
                    (Value::Int(2), "two".into()),
                ],
            },
        )
        .vtype(Vtype::Int);
        f.add_processor(Processor::Select(SelectChoice::new(vec![1_i64, 2])));
        f.set_submitted_value(Value::List(vec![Value::from("1"), Value::from("2")]));
        assert!(f.is_valid());
        assert_eq!(
            f.value().unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_single_field_rejects_multiple_values() {
        let mut f = Field::new("n", ElementKind::Text);
        f.add_processor(Processor::MaxLength(10));
        f.set_submitted_value(Value::List(vec![Value::from("a"), Value::from("b")]));
        assert!(!f.is_valid());
        assert_eq!(
            f.errors(),
            &["this field does not accept more than one value".to_string()]
        );
    }

    #[test]
    fn test_display_value_rules() {
        // submitted wins over default
        let mut f = Field::new("n", ElementKind::Text).default_value("dflt");
        assert_eq!(f.display_value(), Value::from("dflt"));
        f.set_submitted_value(Value::from("sub"));
        assert_eq!(f.display_value(), Value::from("sub"));

        // passwords never echo their default
        let f = Field::new("pw", ElementKind::Password { default_ok: false })
            .default_value("secret");
        assert_eq!(f.display_value(), Value::Null);

        // fixed submit always shows its default
        let mut f = Field::new("go", ElementKind::Submit { fixed: true });
        f.set_submitted_value(Value::from("clicked"));
        assert_eq!(f.display_value(), Value::from("Submit"));

        // typed defaults render through from_python
        let f = Field::new("age", ElementKind::Text)
            .vtype(Vtype::Int)
            .default_value(Value::Int(7));
        assert_eq!(f.display_value(), Value::Int(7));
        let mut f = Field::new("when", ElementKind::Date);
        f.set_default_value(Value::Date(
            chrono::NaiveDate::from_ymd_opt(2010, 12, 3).unwrap(),
        ));
        assert_eq!(f.display_value(), Value::from("2010-12-03"));
    }

    #[test]
    fn test_exception_handlers() {
        let mut f = Field::new("n", ElementKind::Text);
        f.add_handler(
            ExceptionHandler::new()
                .substring("duplicate key")
                .message("that value is already taken"),
        );
        assert!(!f.handle_exception("connection refused", None));
        assert!(f.errors().is_empty());

        assert!(f.handle_exception("ERROR: duplicate key value", None));
        assert!(!f.is_valid());
        assert_eq!(f.errors(), &["that value is already taken".to_string()]);
    }

    #[test]
    fn test_exception_handler_type_and_predicate() {
        let mut f = Field::new("n", ElementKind::Text);
        f.add_handler(
            ExceptionHandler::new()
                .type_name("DbError")
                .message("database problem"),
        );
        assert!(!f.handle_exception("boom", Some("IoError")));
        assert!(f.handle_exception("boom", Some("DbError")));

        let mut f = Field::new("n", ElementKind::Text);
        f.add_handler(ExceptionHandler::new().predicate(|t| t.len() > 3));
        assert!(!f.handle_exception("abc", None));
        assert!(f.handle_exception("abcdef", None));
        // no message configured: the text itself becomes the error
        assert_eq!(f.errors(), &["abcdef".to_string()]);
    }

    #[test]
    fn test_logical_group_multi() {
        let mut g = LogicalGroup::new("colors", true);
        g.add_member(GroupMember {
            id: "colors-red".into(),
            label: "Red".into(),
            value_key: Value::from("red"),
            chosen: false,
            kind: MemberKind::Checkbox,
        })
        .unwrap();
        g.add_member(GroupMember {
            id: "colors-blue".into(),
            label: "Blue".into(),
            value_key: Value::from("blue"),
            chosen: false,
            kind: MemberKind::Checkbox,
        })
        .unwrap();

        g.set_submitted_value(Value::List(vec![Value::from("red")]));
        assert!(g.is_valid());
        assert_eq!(g.value().unwrap(), Value::List(vec![Value::from("red")]));
        assert!(g.members()[0].chosen);
        assert!(!g.members()[1].chosen);
    }

    #[test]
    fn test_logical_group_rejects_unknown_value() {
        let mut g = LogicalGroup::new("colors", true);
        g.add_member(GroupMember {
            id: "colors-red".into(),
            label: "Red".into(),
            value_key: Value::from("red"),
            chosen: false,
            kind: MemberKind::Checkbox,
        })
        .unwrap();
        g.set_submitted_value(Value::List(vec![Value::from("green")]));
        assert!(!g.is_valid());
        assert_eq!(
            g.errors(),
            &["the value did not come from the given options".to_string()]
        );
    }

    #[test]
    fn test_logical_group_duplicate_member() {
        let mut g = LogicalGroup::new("colors", true);
        let member = GroupMember {
            id: "colors-red".into(),
            label: "Red".into(),
            value_key: Value::from("red"),
            chosen: false,
            kind: MemberKind::Checkbox,
        };
        g.add_member(member.clone()).unwrap();
        assert!(matches!(
            g.add_member(member),
            Err(FormError::DuplicateMember(_))
        ));
    }

    #[test]
    fn test_radio_group_returns_scalar() {
        let mut g = LogicalGroup::new("size", false);
        for key in ["s", "m", "l"] {
            g.add_member(GroupMember {
                id: format!("size-{key}"),
                label: key.to_uppercase(),
                value_key: Value::from(key),
                chosen: false,
                kind: MemberKind::Radio,
            })
            .unwrap();
        }
        g.set_submitted_value(Value::from("m"));
        assert!(g.is_valid());
        assert_eq!(g.value().unwrap(), Value::from("m"));
        assert!(g.members()[1].chosen);
    }

    #[test]
    fn test_group_members_registered_after_creation_still_count() {
        let mut g = LogicalGroup::new("colors", true);
        g.add_member(GroupMember {
            id: "colors-red".into(),
            label: "Red".into(),
            value_key: Value::from("red"),
            chosen: false,
            kind: MemberKind::Checkbox,
        })
        .unwrap();
        // member added before any validation ran is part of the option set
        g.add_member(GroupMember {
            id: "colors-blue".into(),
            label: "Blue".into(),
            value_key: Value::from("blue"),
            chosen: false,
            kind: MemberKind::Checkbox,
        })
        .unwrap();
        g.set_submitted_value(Value::List(vec![Value::from("blue")]));
        assert!(g.is_valid());
    }

    #[test]
    fn test_static_element_flags() {
        let s = StaticElement::new("note", StaticKind::Static).with_value("hello");
        assert!(s.is_renderable());
        assert!(!s.is_returning());

        let p = StaticElement::new("token", StaticKind::PassThru).with_value("abc123");
        assert!(!p.is_renderable());
        assert!(p.is_returning());
        assert_eq!(p.value(), Value::from("abc123"));

        let f = StaticElement::new("kept", StaticKind::Fixed).with_value(5_i64);
        assert!(f.is_renderable());
        assert!(f.is_returning());
    }

    #[test]
    fn test_file_field_extension_rules() {
        let mut f = FileField::new("photo");
        f.allow_extension("JPG");
        f.allow_extension(".png");
        f.set_submitted_upload(FileUpload::new("me.jpg", "image/jpeg", 100));
        assert!(f.is_valid());

        f.set_submitted_upload(FileUpload::new("malware.exe", "application/owned", 100));
        assert!(!f.is_valid());
        assert_eq!(f.errors(), &["extension is not allowed".to_string()]);
    }

    #[test]
    fn test_file_field_type_and_size_rules() {
        let mut f = FileField::new("doc");
        f.deny_type("text/html");
        f.set_max_size(1000);

        f.set_submitted_upload(FileUpload::new("a.html", "text/HTML", 10));
        assert!(!f.is_valid());

        f.set_submitted_upload(FileUpload::new("a.txt", "text/plain", 2000));
        assert!(!f.is_valid());
        assert_eq!(f.errors(), &["file is too large".to_string()]);

        f.set_submitted_upload(FileUpload::new("a.txt", "text/plain", 500));
        assert!(f.is_valid());
    }

    #[test]
    fn test_file_field_required() {
        let mut f = FileField::new("photo").required(true);
        assert!(!f.is_valid());
        assert_eq!(f.errors(), &["field is required".to_string()]);

        let mut f = FileField::new("photo");
        assert!(f.is_valid());
        assert_eq!(f.value().unwrap(), None);
    }

    #[test]
    fn test_file_field_rejects_processors() {
        let mut f = FileField::new("photo");
        assert!(matches!(
            f.add_processor(Processor::MaxLength(5)),
            Err(FormError::ProcessorMisuse(_))
        ));
    }
}
