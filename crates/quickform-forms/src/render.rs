//! HTML rendering.
//!
//! Rendering is read-only: it consumes each element's display value, errors,
//! and notes, and never touches validation state. [`Renderer`] is the seam
//! for custom markup; [`BasicRenderer`] emits plain labeled rows suitable
//! for styling.

use std::fmt::Write as _;

use quickform_core::Value;

use crate::element::{
    Element, ElementKind, Field, FileField, GroupMember, LogicalGroup, MemberKind, StaticElement,
    StaticKind,
};
use crate::form::Form;

/// Produces markup for a form and its elements.
pub trait Renderer {
    fn render_element(&self, element: &Element, form_name: &str) -> String;

    /// Renders every renderable element in registration order.
    fn render_form(&self, form: &Form) -> String {
        let rows: Vec<String> = form
            .elements()
            .iter()
            .filter(|el| el.is_renderable())
            .map(|el| self.render_element(el, form.name()))
            .collect();
        rows.join("\n")
    }
}

/// The default renderer: one `<div class="field">` row per element with a
/// label, the input, and an error list.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRenderer;

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Renders attributes sorted by name so output is deterministic.
fn render_attrs(attrs: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = attrs.iter().collect();
    sorted.sort_by_key(|(name, _)| *name);
    let mut out = String::new();
    for (name, value) in sorted {
        let _ = write!(out, " {name}=\"{}\"", escape(value));
    }
    out
}

fn render_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape(e)))
        .collect();
    format!("<ul class=\"errorlist\">{items}</ul>")
}

fn render_notes(notes: &[String]) -> String {
    if notes.is_empty() {
        return String::new();
    }
    let items: String = notes
        .iter()
        .map(|n| format!("<li>{}</li>", escape(n)))
        .collect();
    format!("<ul class=\"notes\">{items}</ul>")
}

fn dom_id(form_name: &str, element_id: &str) -> String {
    format!("{form_name}-{element_id}")
}

fn label_tag(dom_id: &str, label: &str, required: bool) -> String {
    let class = if required { " class=\"required\"" } else { "" };
    format!("<label for=\"{dom_id}\"{class}>{}</label>", escape(label))
}

fn field_row(label: String, control: String, errors: &[String], notes: &[String]) -> String {
    format!(
        "<div class=\"field\">{label}{control}{}{}</div>",
        render_errors(errors),
        render_notes(notes)
    )
}

impl BasicRenderer {
    fn render_field(field: &Field, form_name: &str) -> String {
        let dom = dom_id(form_name, field.id());
        let display = field.display_value();

        let control = match field.kind() {
            ElementKind::Textarea { rows, cols } => {
                let attrs = render_attrs(&[
                    ("id", dom.clone()),
                    ("name", field.submit_name().to_string()),
                    ("rows", rows.to_string()),
                    ("cols", cols.to_string()),
                ]);
                format!("<textarea{attrs}>{}</textarea>", escape(&display.to_string()))
            }
            ElementKind::Select { multiple, options } => {
                Self::render_select(field, &dom, *multiple, options, &display)
            }
            other => {
                let input_type = match other {
                    ElementKind::Button => "button",
                    ElementKind::Password { .. } => "password",
                    ElementKind::Hidden => "hidden",
                    ElementKind::Checkbox => "checkbox",
                    ElementKind::Submit { .. } | ElementKind::Cancel { .. } => "submit",
                    _ => "text",
                };
                let mut attrs = vec![
                    ("id", dom.clone()),
                    ("name", field.submit_name().to_string()),
                    ("type", input_type.to_string()),
                ];
                if matches!(other, ElementKind::Checkbox) {
                    attrs.push(("value", "1".to_string()));
                    if display.is_truthy() {
                        attrs.push(("checked", "checked".to_string()));
                    }
                } else if !display.is_empty() {
                    attrs.push(("value", display.to_string()));
                }
                if let Some(max) = field.max_length_attr() {
                    attrs.push(("maxlength", max.to_string()));
                }
                format!("<input{}/>", render_attrs(&attrs))
            }
        };

        // hidden inputs and buttons render bare, without a label row
        match field.kind() {
            ElementKind::Hidden => control,
            ElementKind::Button | ElementKind::Submit { .. } | ElementKind::Cancel { .. } => {
                format!("<div class=\"buttons\">{control}</div>")
            }
            _ => field_row(
                label_tag(&dom, field.display_label(), field.is_required()),
                control,
                field.errors(),
                field.notes(),
            ),
        }
    }

    fn render_select(
        field: &Field,
        dom: &str,
        multiple: bool,
        options: &[(Value, String)],
        display: &Value,
    ) -> String {
        let chosen: Vec<String> = display.as_list().iter().map(Value::str_key).collect();
        let mut attrs = vec![
            ("id", dom.to_string()),
            ("name", field.submit_name().to_string()),
        ];
        if multiple {
            attrs.push(("multiple", "multiple".to_string()));
        }
        let mut out = format!("<select{}>", render_attrs(&attrs));
        for (value, text) in options {
            let key = value.str_key();
            let selected = if chosen.contains(&key) {
                " selected=\"selected\""
            } else {
                ""
            };
            let _ = write!(
                out,
                "<option value=\"{}\"{selected}>{}</option>",
                escape(&key),
                escape(text)
            );
        }
        out.push_str("</select>");
        out
    }

    fn render_group(group: &LogicalGroup, form_name: &str) -> String {
        let inputs: String = group
            .members()
            .iter()
            .map(|member| Self::render_member(member, group, form_name))
            .collect();
        field_row(
            label_tag(
                &dom_id(form_name, group.id()),
                group.display_label(),
                false,
            ),
            format!("<div class=\"group\">{inputs}</div>"),
            group.errors(),
            &[],
        )
    }

    fn render_member(member: &GroupMember, group: &LogicalGroup, form_name: &str) -> String {
        let dom = dom_id(form_name, &member.id);
        let input_type = match member.kind {
            MemberKind::Checkbox => "checkbox",
            MemberKind::Radio => "radio",
        };
        let mut attrs = vec![
            ("id", dom.clone()),
            ("name", group.id().to_string()),
            ("type", input_type.to_string()),
            ("value", member.value_key.str_key()),
        ];
        if member.chosen {
            attrs.push(("checked", "checked".to_string()));
        }
        format!(
            "<input{}/><label for=\"{dom}\">{}</label>",
            render_attrs(&attrs),
            escape(&member.label)
        )
    }

    fn render_static(element: &StaticElement, form_name: &str) -> String {
        match element.kind() {
            StaticKind::Header { tag } => {
                format!("<{tag}>{}</{tag}>", escape(&element.value().to_string()))
            }
            _ => format!(
                "<div class=\"static\" id=\"{}\"><label>{}</label><span>{}</span></div>",
                dom_id(form_name, element.id()),
                escape(element.display_label()),
                escape(&element.value().to_string())
            ),
        }
    }

    fn render_file(field: &FileField, form_name: &str) -> String {
        let dom = dom_id(form_name, field.id());
        let attrs = render_attrs(&[
            ("id", dom.clone()),
            ("name", field.id().to_string()),
            ("type", "file".to_string()),
        ]);
        field_row(
            label_tag(&dom, field.display_label(), false),
            format!("<input{attrs}/>"),
            field.errors(),
            field.notes(),
        )
    }
}

impl Renderer for BasicRenderer {
    fn render_element(&self, element: &Element, form_name: &str) -> String {
        match element {
            Element::Field(f) => Self::render_field(f, form_name),
            Element::Group(g) => Self::render_group(g, form_name),
            Element::Static(s) => Self::render_static(s, form_name),
            Element::File(f) => Self::render_file(f, form_name),
        }
    }
}

impl Form {
    /// Renders the whole form with the given renderer.
    pub fn render(&self, renderer: &impl Renderer) -> String {
        renderer.render_form(self)
    }
}
