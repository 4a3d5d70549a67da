//! The form container: element registry, submission binding, and whole-form
//! validation.
//!
//! Every form carries a hidden marker field named `<form name>-submit-flag`.
//! Binding a payload that includes the marker makes the form "submitted";
//! validation and the absent-checkbox second pass only run for submitted
//! forms, so a fresh GET render never shows errors.

use std::collections::HashMap;

use quickform_core::logging::form_span;
use quickform_core::{FormError, FormResult, Value};

use crate::element::{
    Element, ElementKind, Field, FileField, GroupMember, LogicalGroup, MemberKind, StaticElement,
    StaticKind,
};
use crate::processors::{Confirm, ConfirmOutcome, Processor, SelectChoice};
use crate::submission::SubmissionSource;
use crate::upload::FileUpload;

/// A whole-form validation hook: receives the safe value mapping and returns
/// element-id to error-message pairs for any failures.
pub type FormValidator = Box<dyn Fn(&HashMap<String, Value>) -> HashMap<String, String> + Send + Sync>;

/// Configuration for select elements.
#[derive(Debug, Clone)]
pub struct SelectConfig {
    /// Placeholder rows prepended to the options. The default is the usual
    /// "Choose:" pair; `None` renders the options bare.
    pub choose: Option<Vec<(Value, String)>>,
    /// Whether to install the option-set processor automatically.
    pub auto_validate: bool,
    /// Option values rendered but rejected on submission.
    pub invalid: Vec<Value>,
    /// Overrides the option-set processor's error message.
    pub error_msg: Option<String>,
    pub required: bool,
    pub multiple: bool,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            choose: Some(vec![
                (Value::Int(-2), "Choose:".to_string()),
                (Value::Int(-1), "-----------".to_string()),
            ]),
            auto_validate: true,
            invalid: Vec::new(),
            error_msg: None,
            required: false,
            multiple: false,
        }
    }
}

/// An ordered collection of elements bound and validated as a unit.
pub struct Form {
    name: String,
    ident: String,
    elements: Vec<Element>,
    index: HashMap<String, usize>,
    validators: Vec<FormValidator>,
    // (element id, message) pairs applied by validators on the last run,
    // retracted before the next run so repeated calls don't stack them
    validator_errors: Vec<(String, String)>,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("name", &self.name)
            .field("elements", &self.elements)
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Form {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let ident = format!("{name}-submit-flag");
        let mut form = Self {
            name,
            ident: ident.clone(),
            elements: Vec::new(),
            index: HashMap::new(),
            validators: Vec::new(),
            validator_errors: Vec::new(),
        };
        let marker = Field::new(&ident, ElementKind::Hidden).default_value("submitted");
        form.index.insert(ident, 0);
        form.elements.push(Element::Field(marker));
        form
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The id of the hidden submission-marker field.
    pub fn ident_field(&self) -> &str {
        &self.ident
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    pub fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.index.get(id).map(|&i| &mut self.elements[i])
    }

    pub fn field_mut(&mut self, id: &str) -> Option<&mut Field> {
        self.element_mut(id).and_then(Element::as_field_mut)
    }

    // ── element registration ───────────────────────────────────────────

    fn register(&mut self, element: Element) -> FormResult<usize> {
        let id = element.id().to_string();
        if self.index.contains_key(&id) {
            return Err(FormError::DuplicateId(id));
        }
        let idx = self.elements.len();
        self.elements.push(element);
        self.index.insert(id, idx);
        Ok(idx)
    }

    /// Registers a pre-built field.
    pub fn add_field(&mut self, field: Field) -> FormResult<&mut Field> {
        let idx = self.register(Element::Field(field))?;
        self.elements[idx]
            .as_field_mut()
            .ok_or_else(|| FormError::Programming("registered element is not a field".into()))
    }

    /// The string-tag element factory. Kinds needing extra configuration
    /// (selects, confirms, files, group members) have dedicated methods.
    pub fn add_element(&mut self, tag: &str, id: &str, label: &str) -> FormResult<&mut Field> {
        if tag == "confirm" {
            return Err(FormError::Programming(
                "confirm elements need a match target; use add_confirm".into(),
            ));
        }
        let kind = ElementKind::from_tag(tag)?;
        self.add_field(Field::new(id, kind).label(label))
    }

    pub fn add_text(&mut self, id: &str, label: &str) -> FormResult<&mut Field> {
        self.add_element("text", id, label)
    }

    pub fn add_password(&mut self, id: &str, label: &str) -> FormResult<&mut Field> {
        self.add_element("password", id, label)
    }

    pub fn add_hidden(&mut self, id: &str) -> FormResult<&mut Field> {
        self.add_element("hidden", id, id)
    }

    pub fn add_checkbox(&mut self, id: &str, label: &str) -> FormResult<&mut Field> {
        self.add_element("checkbox", id, label)
    }

    pub fn add_textarea(&mut self, id: &str, label: &str) -> FormResult<&mut Field> {
        self.add_element("textarea", id, label)
    }

    pub fn add_date(&mut self, id: &str, label: &str) -> FormResult<&mut Field> {
        self.add_element("date", id, label)
    }

    pub fn add_time(&mut self, id: &str, label: &str) -> FormResult<&mut Field> {
        self.add_element("time", id, label)
    }

    pub fn add_email(&mut self, id: &str, label: &str) -> FormResult<&mut Field> {
        self.add_element("email", id, label)
    }

    pub fn add_url(&mut self, id: &str, label: &str) -> FormResult<&mut Field> {
        self.add_element("url", id, label)
    }

    pub fn add_button(&mut self, id: &str, label: &str) -> FormResult<&mut Field> {
        self.add_element("button", id, label)
    }

    pub fn add_submit(&mut self, id: &str) -> FormResult<&mut Field> {
        self.add_element("submit", id, id)
    }

    pub fn add_cancel(&mut self, id: &str) -> FormResult<&mut Field> {
        self.add_element("cancel", id, id)
    }

    /// Registers a select. Placeholder rows become selectable options that
    /// count as "no choice"; when the select is required they are rejected
    /// outright instead.
    pub fn add_select(
        &mut self,
        id: &str,
        label: &str,
        options: Vec<(Value, String)>,
        config: SelectConfig,
    ) -> FormResult<&mut Field> {
        let mut rows = Vec::new();
        let mut option_keys: Vec<Value> = options.iter().map(|(v, _)| v.clone()).collect();
        let mut invalid = config.invalid.clone();
        let mut treat_as_empty = Vec::new();
        if let Some(choose) = &config.choose {
            let keys: Vec<Value> = choose.iter().map(|(v, _)| v.clone()).collect();
            if config.required {
                invalid.extend(keys.clone());
            }
            treat_as_empty = keys.clone();
            rows.extend(choose.clone());
            option_keys.splice(0..0, keys);
        }
        rows.extend(options);

        let mut field = Field::new(
            id,
            ElementKind::Select {
                multiple: config.multiple,
                options: rows,
            },
        )
        .label(label)
        .required(config.required);

        if config.auto_validate {
            let choice = SelectChoice::new(option_keys)
                .invalid(invalid)
                .treat_as_empty(treat_as_empty);
            match &config.error_msg {
                Some(msg) => field.add_processor_with_msg(Processor::Select(choice), msg.clone()),
                None => field.add_processor(Processor::Select(choice)),
            }
        }
        self.add_field(field)
    }

    /// A multi-select; placeholder rows default off since "Choose:" makes
    /// no sense with multiple selection.
    pub fn add_mselect(
        &mut self,
        id: &str,
        label: &str,
        options: Vec<(Value, String)>,
        mut config: SelectConfig,
    ) -> FormResult<&mut Field> {
        config.multiple = true;
        config.choose = None;
        self.add_select(id, label, options, config)
    }

    /// Registers a confirm field checking equality against `match_id`,
    /// which must already exist and hold a value.
    pub fn add_confirm(&mut self, id: &str, label: &str, match_id: &str) -> FormResult<&mut Field> {
        match self.index.get(match_id).map(|&i| &self.elements[i]) {
            Some(Element::Field(_) | Element::Group(_)) => {}
            Some(_) => {
                return Err(FormError::Programming(format!(
                    "match element \"{match_id}\" does not hold a value"
                )))
            }
            None => {
                return Err(FormError::Programming(format!(
                    "match element \"{match_id}\" does not exist"
                )))
            }
        }
        let mut field = Field::new(id, ElementKind::Confirm).label(label);
        field.add_processor(Processor::Confirm(Confirm::new(match_id)));
        self.add_field(field)
    }

    pub fn add_file(&mut self, id: &str, label: &str) -> FormResult<&mut FileField> {
        let idx = self.register(Element::File(FileField::new(id).label(label)))?;
        self.elements[idx]
            .as_file_mut()
            .ok_or_else(|| FormError::Programming("registered element is not a file".into()))
    }

    fn add_static_element(&mut self, element: StaticElement) -> FormResult<()> {
        self.register(Element::Static(element)).map(|_| ())
    }

    /// Render-only label/value row.
    pub fn add_static(&mut self, id: &str, label: &str, value: impl Into<Value>) -> FormResult<()> {
        self.add_static_element(
            StaticElement::new(id, StaticKind::Static)
                .label(label)
                .with_value(value),
        )
    }

    /// A heading rendered with the given tag (`h1`..`h6`).
    pub fn add_header(&mut self, id: &str, text: &str, tag: &str) -> FormResult<()> {
        self.add_static_element(
            StaticElement::new(id, StaticKind::Header { tag: tag.to_string() }).with_value(text),
        )
    }

    /// Rendered and returned in the value mapping, but never bound from
    /// submissions.
    pub fn add_fixed(&mut self, id: &str, label: &str, value: impl Into<Value>) -> FormResult<()> {
        self.add_static_element(
            StaticElement::new(id, StaticKind::Fixed)
                .label(label)
                .with_value(value),
        )
    }

    /// Returned in the value mapping but never rendered.
    pub fn add_passthru(&mut self, id: &str, value: impl Into<Value>) -> FormResult<()> {
        self.add_static_element(StaticElement::new(id, StaticKind::PassThru).with_value(value))
    }

    fn group_for_member(&mut self, group_id: &str, multiple: bool) -> FormResult<&mut LogicalGroup> {
        if !self.index.contains_key(group_id) {
            self.register(Element::Group(LogicalGroup::new(group_id, multiple)))?;
        }
        let idx = self.index[group_id];
        match &mut self.elements[idx] {
            Element::Group(group) => Ok(group),
            _ => Err(FormError::Programming(format!(
                "element \"{group_id}\" is not a logical group"
            ))),
        }
    }

    /// Adds a checkbox member to a multi logical group, creating the group
    /// on first use.
    pub fn add_mcheckbox(
        &mut self,
        id: &str,
        label: &str,
        value: impl Into<Value>,
        group_id: &str,
    ) -> FormResult<()> {
        let member = GroupMember {
            id: id.to_string(),
            label: label.to_string(),
            value_key: value.into(),
            chosen: false,
            kind: MemberKind::Checkbox,
        };
        self.group_for_member(group_id, true)?.add_member(member)
    }

    /// Adds a radio member to a single-valued logical group, creating the
    /// group on first use.
    pub fn add_radio(
        &mut self,
        id: &str,
        label: &str,
        value: impl Into<Value>,
        group_id: &str,
    ) -> FormResult<()> {
        let member = GroupMember {
            id: id.to_string(),
            label: label.to_string(),
            value_key: value.into(),
            chosen: false,
            kind: MemberKind::Radio,
        };
        self.group_for_member(group_id, false)?.add_member(member)
    }

    pub fn add_validator(&mut self, validator: FormValidator) {
        self.validators.push(validator);
    }

    // ── binding ────────────────────────────────────────────────────────

    /// Applies default values by element id. File elements take no
    /// defaults and are skipped.
    pub fn set_defaults(&mut self, defaults: &HashMap<String, Value>) {
        for element in &mut self.elements {
            let Some(value) = defaults.get(element.id()) else {
                continue;
            };
            match element {
                Element::Field(f) => f.set_default_value(value.clone()),
                Element::Group(g) => g.set_default_value(value.clone()),
                Element::Static(s) => s.set_value(value.clone()),
                Element::File(_) => {}
            }
        }
    }

    /// Binds submitted data to every submittable element. Zero values under
    /// a key bind `Null`, one binds the scalar, more bind a list. When the
    /// submission carries the marker field, a second pass gives absent
    /// checkboxes `false` and absent logical groups their empty value, since
    /// browsers omit unchecked inputs entirely.
    pub fn set_submitted(&mut self, data: &impl SubmissionSource) {
        let span = form_span(&self.name);
        let _guard = span.enter();
        for element in &mut self.elements {
            if !element.is_submittable() {
                continue;
            }
            let Some(vals) = data.values(element.submit_name()) else {
                continue;
            };
            let value = match vals.len() {
                0 => Value::Null,
                1 => Value::from(vals[0]),
                _ => Value::List(vals.into_iter().map(Value::from).collect()),
            };
            match element {
                Element::Field(f) => f.set_submitted_value(value),
                Element::Group(g) => g.set_submitted_value(value),
                Element::Static(_) | Element::File(_) => {}
            }
        }
        if !self.is_submitted() {
            return;
        }
        tracing::debug!(form = %self.name, "binding submitted values");
        for element in &mut self.elements {
            if data.contains(element.submit_name()) {
                continue;
            }
            match element {
                Element::Field(f) if matches!(f.kind(), ElementKind::Checkbox) => {
                    f.set_submitted_value(Value::Bool(false));
                }
                Element::Group(g) => {
                    let empty = if g.is_multiple() {
                        Value::List(Vec::new())
                    } else {
                        Value::Null
                    };
                    g.set_submitted_value(empty);
                }
                _ => {}
            }
        }
    }

    /// Routes uploads to their file elements by id.
    pub fn set_files(&mut self, files: &HashMap<String, FileUpload>) {
        for element in &mut self.elements {
            if let Element::File(field) = element {
                if let Some(upload) = files.get(field.id()) {
                    field.set_submitted_upload(upload.clone());
                }
            }
        }
    }

    /// Whether the bound data contained this form's marker field.
    pub fn is_submitted(&self) -> bool {
        self.index
            .get(&self.ident)
            .and_then(|&i| self.elements[i].as_field())
            .is_some_and(|f| f.submitted_value().is_truthy())
    }

    /// Whether any cancel button came back with a value.
    pub fn is_cancelled(&self) -> bool {
        self.elements.iter().any(|el| {
            el.as_field().is_some_and(|f| {
                matches!(f.kind(), ElementKind::Cancel { .. })
                    && f.submitted_value().is_truthy()
            })
        })
    }

    // ── validation ─────────────────────────────────────────────────────

    /// Resolves every confirm field's target before element validation, so
    /// the confirm check compares against the target's safe value (and is
    /// skipped when the target itself is invalid).
    fn prime_confirms(&mut self) {
        let pairs: Vec<(usize, String)> = self
            .elements
            .iter()
            .enumerate()
            .filter_map(|(i, el)| {
                el.as_field()
                    .and_then(Field::confirm_target)
                    .map(|target| (i, target.to_string()))
            })
            .collect();
        for (idx, target_id) in pairs {
            let Some(&target_idx) = self.index.get(&target_id) else {
                continue;
            };
            let outcome = match &mut self.elements[target_idx] {
                Element::Field(f) => ConfirmOutcome {
                    label: f.display_label().to_string(),
                    value: f.is_valid().then(|| f.value().ok()).flatten(),
                },
                Element::Group(g) => ConfirmOutcome {
                    label: g.display_label().to_string(),
                    value: g.is_valid().then(|| g.value().ok()).flatten(),
                },
                _ => continue,
            };
            if let Some(field) = self.elements[idx].as_field_mut() {
                field.prime_confirm(outcome);
            }
        }
    }

    fn collect_valid_values(&mut self) -> HashMap<String, Value> {
        let mut values = HashMap::new();
        for element in &mut self.elements {
            if !element.is_returning() {
                continue;
            }
            let id = element.id().to_string();
            match element {
                Element::Field(f) => {
                    if let Ok(v) = f.value() {
                        values.insert(id, v);
                    }
                }
                Element::Group(g) => {
                    if let Ok(v) = g.value() {
                        values.insert(id, v);
                    }
                }
                Element::Static(s) => {
                    values.insert(id, s.value());
                }
                Element::File(f) => {
                    if f.is_valid() {
                        values.insert(id, f.value_for_map());
                    }
                }
            }
        }
        values
    }

    /// Validates every element and runs the form-level validators. An
    /// unsubmitted form is never valid.
    pub fn is_valid(&mut self) -> bool {
        if !self.is_submitted() {
            return false;
        }
        let span = form_span(&self.name);
        let _guard = span.enter();
        for (id, msg) in std::mem::take(&mut self.validator_errors) {
            if let Some(&idx) = self.index.get(&id) {
                match &mut self.elements[idx] {
                    Element::Field(f) => f.retract_error(&msg),
                    Element::Group(g) => g.field_mut().retract_error(&msg),
                    Element::File(f) => f.retract_error(&msg),
                    Element::Static(_) => {}
                }
            }
        }
        self.prime_confirms();
        let mut valid = true;
        for element in &mut self.elements {
            if !element.is_valid() {
                tracing::debug!(element = element.id(), errors = ?element.errors(), "element failed validation");
                valid = false;
            }
        }
        let values = self.collect_valid_values();
        for validator in &self.validators {
            for (id, msg) in validator(&values) {
                if let Some(&idx) = self.index.get(&id) {
                    match &mut self.elements[idx] {
                        Element::Field(f) => f.add_error(msg.clone()),
                        Element::Group(g) => g.field_mut().add_error(msg.clone()),
                        Element::File(f) => f.add_error(msg.clone()),
                        Element::Static(_) => {}
                    }
                    self.validator_errors.push((id, msg));
                    valid = false;
                }
            }
        }
        valid
    }

    /// The safe value mapping for all returning elements. Fails if any of
    /// them is invalid; validate first.
    pub fn get_values(&mut self) -> FormResult<HashMap<String, Value>> {
        let mut values = HashMap::new();
        for element in &mut self.elements {
            if !element.is_returning() {
                continue;
            }
            let id = element.id().to_string();
            let value = match element {
                Element::Field(f) => f.value()?,
                Element::Group(g) => g.value()?,
                Element::Static(s) => s.value(),
                Element::File(f) => {
                    f.value()?;
                    f.value_for_map()
                }
            };
            values.insert(id, value);
        }
        Ok(values)
    }

    /// A single element's safe value.
    pub fn get_value(&mut self, id: &str) -> FormResult<Value> {
        let Some(&idx) = self.index.get(id) else {
            return Err(FormError::Programming(format!(
                "element \"{id}\" does not exist"
            )));
        };
        match &mut self.elements[idx] {
            Element::Field(f) => f.value(),
            Element::Group(g) => g.value(),
            Element::Static(s) => Ok(s.value()),
            Element::File(f) => {
                f.value()?;
                Ok(f.value_for_map())
            }
        }
    }

    /// All element errors, keyed by element id.
    pub fn all_errors(&self) -> HashMap<String, Vec<String>> {
        self.elements
            .iter()
            .filter(|el| !el.errors().is_empty())
            .map(|el| (el.id().to_string(), el.errors().to_vec()))
            .collect()
    }

    /// Offers caught external error text to every element's handlers.
    /// Returns `true` if any element claimed it.
    pub fn handle_exception(&mut self, text: &str, type_name: Option<&str>) -> bool {
        let mut handled = false;
        for element in &mut self.elements {
            if element.handle_exception(text, type_name) {
                handled = true;
            }
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::SubmitData;

    fn submit(form_name: &str, rest: &str) -> SubmitData {
        let marker = format!("{form_name}-submit-flag=submitted");
        if rest.is_empty() {
            SubmitData::parse(&marker)
        } else {
            SubmitData::parse(&format!("{marker}&{rest}"))
        }
    }

    #[test]
    fn test_marker_field_gates_validation() {
        let mut form = Form::new("f");
        form.add_text("name", "Name").unwrap();
        // payload without the marker: the form is not submitted
        form.set_submitted(&SubmitData::parse("name=bob"));
        assert!(!form.is_submitted());
        assert!(!form.is_valid());

        form.set_submitted(&submit("f", "name=bob"));
        assert!(form.is_submitted());
        assert!(form.is_valid());
        assert_eq!(form.get_value("name").unwrap(), Value::from("bob"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut form = Form::new("f");
        form.add_text("name", "Name").unwrap();
        assert!(matches!(
            form.add_text("name", "Name again"),
            Err(FormError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_factory_rejects_unknown_tag() {
        let mut form = Form::new("f");
        assert!(matches!(
            form.add_element("blob", "x", "X"),
            Err(FormError::UnknownElementType(_))
        ));
        assert!(matches!(
            form.add_element("confirm", "x", "X"),
            Err(FormError::Programming(_))
        ));
    }

    #[test]
    fn test_absent_checkbox_cleared_only_when_submitted() {
        let mut form = Form::new("f");
        form.add_checkbox("agree", "Agree").unwrap();
        form.add_text("name", "Name").unwrap();

        // submitted without the checkbox: bound to false
        form.set_submitted(&submit("f", "name=bob"));
        assert!(form.is_valid());
        assert_eq!(form.get_value("agree").unwrap(), Value::Bool(false));

        // not submitted: checkbox untouched, keeps its unbound state
        let mut form = Form::new("f");
        form.add_checkbox("agree", "Agree").unwrap();
        form.set_submitted(&SubmitData::parse("other=1"));
        let field = form.element("agree").and_then(Element::as_field).unwrap();
        assert!(field.submitted_value().is_unset());
    }

    #[test]
    fn test_required_checkbox() {
        let mut form = Form::new("f");
        form.add_checkbox("agree", "Agree").unwrap().set_required(true);

        form.set_submitted(&submit("f", ""));
        assert!(!form.is_valid());
        assert_eq!(
            form.all_errors()["agree"],
            vec!["field is required".to_string()]
        );

        form.set_submitted(&submit("f", "agree=1"));
        assert!(form.is_valid());
        assert_eq!(form.get_value("agree").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_select_required_rejects_placeholder() {
        let options = vec![
            (Value::Int(1), "One".to_string()),
            (Value::Int(2), "Two".to_string()),
        ];
        let mut form = Form::new("f");
        form.add_select(
            "pick",
            "Pick",
            options.clone(),
            SelectConfig {
                required: true,
                ..SelectConfig::default()
            },
        )
        .unwrap();

        form.set_submitted(&submit("f", "pick=-2"));
        assert!(!form.is_valid());
        assert_eq!(
            form.all_errors()["pick"],
            vec!["the value chosen is invalid".to_string()]
        );

        // optional select: the placeholder counts as no choice
        let mut form = Form::new("f");
        form.add_select("pick", "Pick", options, SelectConfig::default())
            .unwrap();
        form.set_submitted(&submit("f", "pick=-2"));
        assert!(form.is_valid());
        assert_eq!(form.get_value("pick").unwrap(), Value::Null);
    }

    #[test]
    fn test_mselect_with_vtype() {
        let options = vec![
            (Value::Int(1), "One".to_string()),
            (Value::Int(2), "Two".to_string()),
            (Value::Int(3), "Three".to_string()),
        ];
        let mut form = Form::new("f");
        form.add_mselect("nums", "Numbers", options, SelectConfig::default())
            .unwrap()
            .set_vtype(crate::processors::Vtype::Int);

        form.set_submitted(&submit("f", "nums=1&nums=2"));
        assert!(form.is_valid());
        assert_eq!(
            form.get_value("nums").unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );

        // absent multi group/select binds nothing; a single value becomes a list
        form.set_submitted(&submit("f", "nums=3"));
        assert!(form.is_valid());
        assert_eq!(
            form.get_value("nums").unwrap(),
            Value::List(vec![Value::Int(3)])
        );
    }

    #[test]
    fn test_confirm_flow() {
        let mut form = Form::new("f");
        form.add_password("password", "Password").unwrap();
        form.add_confirm("confirm", "Confirm Password", "password")
            .unwrap();

        form.set_submitted(&submit("f", "password=secret&confirm=secret"));
        assert!(form.is_valid());

        form.set_submitted(&submit("f", "password=secret&confirm=other"));
        assert!(!form.is_valid());
        assert_eq!(
            form.all_errors()["confirm"],
            vec!["does not match field \"Password\"".to_string()]
        );
    }

    #[test]
    fn test_confirm_skipped_when_target_invalid() {
        let mut form = Form::new("f");
        form.add_email("email", "Email").unwrap();
        form.add_confirm("confirm", "Confirm Email", "email").unwrap();

        form.set_submitted(&submit("f", "email=notanemail&confirm=whatever"));
        assert!(!form.is_valid());
        let errors = form.all_errors();
        assert!(errors.contains_key("email"));
        // the confirm field shows no redundant mismatch error
        assert!(!errors.contains_key("confirm"));
    }

    #[test]
    fn test_confirm_requires_existing_target() {
        let mut form = Form::new("f");
        assert!(matches!(
            form.add_confirm("confirm", "Confirm", "nope"),
            Err(FormError::Programming(_))
        ));
    }

    #[test]
    fn test_group_members_via_form() {
        let mut form = Form::new("f");
        form.add_mcheckbox("opt-a", "A", "a", "opts").unwrap();
        form.add_mcheckbox("opt-b", "B", "b", "opts").unwrap();
        form.add_radio("size-s", "Small", "s", "size").unwrap();
        form.add_radio("size-l", "Large", "l", "size").unwrap();

        form.set_submitted(&submit("f", "opts=a&opts=b&size=l"));
        assert!(form.is_valid());
        assert_eq!(
            form.get_value("opts").unwrap(),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(form.get_value("size").unwrap(), Value::from("l"));
    }

    #[test]
    fn test_absent_groups_bind_empty_when_submitted() {
        let mut form = Form::new("f");
        form.add_mcheckbox("opt-a", "A", "a", "opts").unwrap();
        form.add_radio("size-s", "Small", "s", "size").unwrap();

        form.set_submitted(&submit("f", ""));
        assert!(form.is_valid());
        assert_eq!(form.get_value("opts").unwrap(), Value::List(vec![]));
        assert_eq!(form.get_value("size").unwrap(), Value::Null);
    }

    #[test]
    fn test_duplicate_group_member_value() {
        let mut form = Form::new("f");
        form.add_mcheckbox("opt-a", "A", "x", "opts").unwrap();
        assert!(matches!(
            form.add_mcheckbox("opt-b", "B", "x", "opts"),
            Err(FormError::DuplicateMember(_))
        ));
    }

    #[test]
    fn test_form_validators_run_against_value_mapping() {
        let mut form = Form::new("f");
        form.add_text("low", "Low").unwrap();
        form.add_text("high", "High").unwrap();
        form.add_validator(Box::new(|values| {
            let mut errors = HashMap::new();
            if let (Some(low), Some(high)) = (
                values.get("low").and_then(Value::as_str),
                values.get("high").and_then(Value::as_str),
            ) {
                if low > high {
                    errors.insert("low".to_string(), "must not exceed high".to_string());
                }
            }
            errors
        }));

        form.set_submitted(&submit("f", "low=b&high=a"));
        assert!(!form.is_valid());
        assert_eq!(
            form.all_errors()["low"],
            vec!["must not exceed high".to_string()]
        );

        form.set_submitted(&submit("f", "low=a&high=b"));
        assert!(form.is_valid());
    }

    #[test]
    fn test_validator_errors_do_not_accumulate() {
        let mut form = Form::new("f");
        form.add_text("low", "Low").unwrap();
        form.add_validator(Box::new(|_values| {
            let mut errors = HashMap::new();
            errors.insert("low".to_string(), "always bad".to_string());
            errors
        }));

        form.set_submitted(&submit("f", "low=x"));
        assert!(!form.is_valid());
        assert!(!form.is_valid());
        // validating again must not stack a second copy of the message
        assert_eq!(form.all_errors()["low"], vec!["always bad".to_string()]);
    }

    #[test]
    fn test_static_elements_in_value_mapping() {
        let mut form = Form::new("f");
        form.add_header("head", "Account", "h3").unwrap();
        form.add_static("note", "Note", "read carefully").unwrap();
        form.add_fixed("plan", "Plan", "basic").unwrap();
        form.add_passthru("token", "abc123").unwrap();
        form.add_submit("go").unwrap();

        form.set_submitted(&submit("f", ""));
        assert!(form.is_valid());
        let values = form.get_values().unwrap();
        // static/header rows render but do not return; submit buttons neither
        assert!(!values.contains_key("head"));
        assert!(!values.contains_key("note"));
        assert!(!values.contains_key("go"));
        assert_eq!(values["plan"], Value::from("basic"));
        assert_eq!(values["token"], Value::from("abc123"));
    }

    #[test]
    fn test_get_values_fails_on_invalid_element() {
        let mut form = Form::new("f");
        form.add_text("name", "Name").unwrap();
        form.set_submitted(&submit("f", "name=x"));
        form.field_mut("name").unwrap().add_error("bad");
        assert!(matches!(
            form.get_values(),
            Err(FormError::InvalidValueAccess { .. })
        ));
    }

    #[test]
    fn test_cancel_detection() {
        let mut form = Form::new("f");
        form.add_text("name", "Name").unwrap();
        form.add_cancel("cancel").unwrap();

        form.set_submitted(&submit("f", "cancel=Cancel"));
        assert!(form.is_submitted());
        assert!(form.is_cancelled());

        form.set_submitted(&submit("f", "name=bob"));
        assert!(!form.is_cancelled());
    }

    #[test]
    fn test_set_defaults() {
        let mut form = Form::new("f");
        form.add_text("name", "Name").unwrap();
        form.add_mcheckbox("opt-a", "A", "a", "opts").unwrap();
        form.add_mcheckbox("opt-b", "B", "b", "opts").unwrap();

        let mut defaults = HashMap::new();
        defaults.insert("name".to_string(), Value::from("bob"));
        defaults.insert("opts".to_string(), Value::List(vec![Value::from("b")]));
        form.set_defaults(&defaults);

        let field = form.element("name").and_then(Element::as_field).unwrap();
        assert_eq!(field.display_value(), Value::from("bob"));
        let Some(Element::Group(group)) = form.element("opts") else {
            panic!("opts is a group");
        };
        assert!(!group.members()[0].chosen);
        assert!(group.members()[1].chosen);
    }

    #[test]
    fn test_exception_fanout() {
        let mut form = Form::new("f");
        form.add_text("email", "Email").unwrap();
        form.field_mut("email").unwrap().add_handler(
            crate::element::ExceptionHandler::new()
                .substring("unique constraint")
                .message("that email is taken"),
        );

        form.set_submitted(&submit("f", "email=a@b.co"));
        assert!(form.is_valid());
        assert!(form.handle_exception("unique constraint violated: email", None));
        assert!(!form.handle_exception("disk on fire", None));
        assert_eq!(
            form.all_errors()["email"],
            vec!["that email is taken".to_string()]
        );
    }

    #[test]
    fn test_file_binding() {
        let mut form = Form::new("f");
        let file = form.add_file("photo", "Photo").unwrap();
        file.allow_extension("jpg");

        let mut files = HashMap::new();
        files.insert(
            "photo".to_string(),
            FileUpload::new("me.jpg", "image/jpeg", 512),
        );
        form.set_submitted(&submit("f", ""));
        form.set_files(&files);
        assert!(form.is_valid());
        assert_eq!(form.get_value("photo").unwrap(), Value::from("me.jpg"));
    }
}
