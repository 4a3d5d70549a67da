//! Uploaded-file metadata handed to file elements.
//!
//! Form code never reads file bodies; validation needs only the name, the
//! declared content type, and the byte length. Web-framework integrations
//! implement [`UploadInfo`] for their native upload type and convert with
//! [`FileUpload::from_info`].

/// The minimal view of an uploaded file that validation requires.
pub trait UploadInfo {
    fn file_name(&self) -> Option<&str>;
    fn content_type(&self) -> Option<&str>;
    fn content_length(&self) -> u64;

    /// Whether anything was actually uploaded. A bare file input submits an
    /// entry with no name and no bytes; that does not count.
    fn is_uploaded(&self) -> bool {
        self.file_name().is_some() || self.content_type().is_some() || self.content_length() > 0
    }
}

/// A plain-data [`UploadInfo`] implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileUpload {
    file_name: Option<String>,
    content_type: Option<String>,
    content_length: u64,
}

impl FileUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content_length: u64,
    ) -> Self {
        Self {
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            content_length,
        }
    }

    /// An empty entry, as submitted by a file input left blank.
    pub const fn missing() -> Self {
        Self {
            file_name: None,
            content_type: None,
            content_length: 0,
        }
    }

    pub fn from_info(info: &impl UploadInfo) -> Self {
        Self {
            file_name: info.file_name().map(ToString::to_string),
            content_type: info.content_type().map(ToString::to_string),
            content_length: info.content_length(),
        }
    }
}

impl UploadInfo for FileUpload {
    fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn content_length(&self) -> u64 {
        self.content_length
    }
}
