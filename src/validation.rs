use crate::common::MessageType;
use crate::error::ValidationError;
use crate::format::format_file_size;

pub const MAX_MESSAGE_LENGTH: usize = 2000;
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "audio/mpeg",
    "audio/wav",
    "video/mp4",
    "video/webm",
];

/// Metadata of a file the user wants to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

pub fn validate_message(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    let len = text.chars().count();
    if len > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::MessageTooLong {
            len,
            max: MAX_MESSAGE_LENGTH,
        });
    }
    Ok(())
}

pub fn validate_file_upload(upload: &FileUpload) -> Result<(), ValidationError> {
    let mime_type = upload.mime_type.to_ascii_lowercase();
    if !ALLOWED_MIME_TYPES.contains(&mime_type.as_str()) {
        return Err(ValidationError::UnsupportedFileType(upload.mime_type.clone()));
    }
    if upload.size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size: format_file_size(upload.size),
            max: format_file_size(MAX_UPLOAD_BYTES),
        });
    }
    Ok(())
}

/// Message type to announce when sending an accepted upload.
pub fn message_type_for_mime(mime_type: &str) -> MessageType {
    let top_level = mime_type.split('/').next().unwrap_or_default();
    match top_level.to_ascii_lowercase().as_str() {
        "image" => MessageType::Image,
        "audio" => MessageType::Audio,
        "video" => MessageType::Video,
        _ => MessageType::File,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn upload(size: u64, mime_type: &str) -> FileUpload {
        FileUpload {
            name: "brief".into(),
            size,
            mime_type: mime_type.into(),
        }
    }

    #[test]
    fn message_rules() {
        assert_eq!(validate_message(""), Err(ValidationError::EmptyMessage));
        assert_eq!(validate_message(" "), Err(ValidationError::EmptyMessage));
        assert_eq!(
            validate_message(&"a".repeat(2001)),
            Err(ValidationError::MessageTooLong { len: 2001, max: 2000 })
        );
        assert!(validate_message(&"a".repeat(2000)).is_ok());
        assert!(validate_message("hello").is_ok());
    }

    #[test]
    fn upload_size_limit() {
        assert!(validate_file_upload(&upload(5 * MB, "image/jpeg")).is_ok());
        assert_eq!(
            validate_file_upload(&upload(11 * MB, "image/jpeg")),
            Err(ValidationError::FileTooLarge {
                size: "11 MB".into(),
                max: "10 MB".into()
            })
        );
    }

    #[test]
    fn upload_type_allow_list() {
        assert_eq!(
            validate_file_upload(&upload(1024, "application/x-msdownload")),
            Err(ValidationError::UnsupportedFileType(
                "application/x-msdownload".into()
            ))
        );
        assert!(validate_file_upload(&upload(1024, "IMAGE/PNG")).is_ok());
    }

    #[test]
    fn disallowed_type_is_rejected_at_any_size() {
        assert_eq!(
            validate_file_upload(&upload(50 * MB, "application/x-msdownload")),
            Err(ValidationError::UnsupportedFileType(
                "application/x-msdownload".into()
            ))
        );
    }

    #[test]
    fn message_type_from_mime() {
        assert_eq!(message_type_for_mime("image/png"), MessageType::Image);
        assert_eq!(message_type_for_mime("audio/wav"), MessageType::Audio);
        assert_eq!(message_type_for_mime("video/mp4"), MessageType::Video);
        assert_eq!(message_type_for_mime("application/pdf"), MessageType::File);
    }
}
