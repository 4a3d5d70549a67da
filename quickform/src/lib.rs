//! # quickform
//!
//! Server-side form definition, submission binding, and validation.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. You can depend on `quickform` for the whole library, or on the
//! individual crates for finer-grained control.
//!
//! ```
//! use quickform::forms::{Form, SubmitData};
//! use quickform::Value;
//!
//! let mut form = Form::new("login");
//! form.add_text("username", "Username").unwrap().set_required(true);
//! form.add_password("password", "Password").unwrap().set_required(true);
//!
//! form.set_submitted(&SubmitData::parse(
//!     "login-submit-flag=submitted&username=bob&password=hunter2",
//! ));
//! assert!(form.is_valid());
//! assert_eq!(form.get_value("username").unwrap(), Value::from("bob"));
//! ```

/// Value model, sentinels, error types, and logging helpers.
pub use quickform_core as core;

/// Forms, elements, processors, submissions, and rendering.
#[cfg(feature = "forms")]
pub use quickform_forms as forms;

pub use quickform_core::{FormError, FormResult, Value, ValueError};

// Third-party re-exports so downstream crates can stay on one version.
pub use chrono;
pub use serde;
pub use serde_json;
pub use tracing;
pub use tracing_subscriber;
