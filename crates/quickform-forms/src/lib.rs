//! # quickform-forms
//!
//! Server-side form definition, submission binding, and validation.
//!
//! A [`Form`] owns an ordered set of elements. Each submittable element
//! carries a default value, a submitted value, and a processed safe value;
//! validation runs each element's processor pipeline lazily and caches the
//! outcome. Forms only validate once the hidden submission-marker field
//! comes back, so an initial render never shows errors.
//!
//! ## Modules
//!
//! - [`element`] - Fields, logical groups, static content, file inputs
//! - [`form`] - The form container and whole-form validation
//! - [`processors`] - Pipeline steps: option sets, confirms, coercions
//! - [`submission`] - Urlencoded payload parsing and the binding seam
//! - [`upload`] - Uploaded-file metadata
//! - [`render`] - HTML rendering
//!
//! ## Example
//!
//! ```
//! use quickform_forms::form::Form;
//! use quickform_forms::submission::SubmitData;
//! use quickform_core::Value;
//!
//! let mut form = Form::new("signup");
//! form.add_email("email", "Email").unwrap().set_required(true);
//! form.add_checkbox("news", "Send me news").unwrap();
//!
//! form.set_submitted(&SubmitData::parse(
//!     "signup-submit-flag=submitted&email=bob%40example.com",
//! ));
//! assert!(form.is_valid());
//! assert_eq!(
//!     form.get_value("email").unwrap(),
//!     Value::from("bob@example.com"),
//! );
//! assert_eq!(form.get_value("news").unwrap(), Value::Bool(false));
//! ```

pub mod element;
pub mod form;
pub mod processors;
pub mod render;
pub mod submission;
pub mod upload;

pub use element::{
    Element, ElementKind, ExceptionHandler, Field, FileField, GroupMember, LogicalGroup,
    MemberKind, StaticElement, StaticKind, Validity,
};
pub use form::{Form, FormValidator, SelectConfig};
pub use processors::{Confirm, ConfirmOutcome, ProcessState, Processor, SelectChoice, Vtype};
pub use render::{BasicRenderer, Renderer};
pub use submission::{SubmissionSource, SubmitData};
pub use upload::{FileUpload, UploadInfo};
