//! Declared content-type validation for the two upload kinds.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("missing Content-Type for {0}")]
    Missing(&'static str),
    #[error("malformed Content-Type `{0}`")]
    Malformed(String),
    #[error("unsupported {kind} type `{found}`, expected one of: {allowed}")]
    Unsupported {
        kind: &'static str,
        found: String,
        allowed: String,
    },
}

/// The upload kinds accepted by the API, each with a fixed allow-list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadKind {
    Thumbnail,
    Video,
}

impl UploadKind {
    pub fn allowed(self) -> &'static [&'static str] {
        match self {
            UploadKind::Thumbnail => &["image/jpeg", "image/png"],
            UploadKind::Video => &["video/mp4"],
        }
    }

    /// Multipart field name carrying the file.
    pub fn field_name(self) -> &'static str {
        match self {
            UploadKind::Thumbnail => "thumbnail",
            UploadKind::Video => "video",
        }
    }

    /// Validate a declared content type, returning the bare media type
    /// (parameters stripped, lowercased) on success.
    pub fn validate(self, declared: Option<&str>) -> Result<String, MediaTypeError> {
        let declared = match declared.map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => return Err(MediaTypeError::Missing(self.field_name())),
        };

        let media_type = parse_media_type(declared)?;
        if self.allowed().contains(&media_type.as_str()) {
            Ok(media_type)
        } else {
            Err(MediaTypeError::Unsupported {
                kind: self.field_name(),
                found: media_type,
                allowed: self.allowed().join(", "),
            })
        }
    }
}

/// Parse `type/subtype[; params]` into a lowercased `type/subtype`.
pub fn parse_media_type(value: &str) -> Result<String, MediaTypeError> {
    let essence = value.split(';').next().unwrap_or("").trim();
    let malformed = || MediaTypeError::Malformed(value.to_string());

    let (kind, subtype) = essence.split_once('/').ok_or_else(malformed)?;
    if !is_token(kind) || !is_token(subtype) {
        return Err(malformed());
    }

    Ok(format!(
        "{}/{}",
        kind.to_ascii_lowercase(),
        subtype.to_ascii_lowercase()
    ))
}

/// RFC 2045 token: non-empty, visible ASCII, no tspecials.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(
                    b,
                    b'(' | b')'
                        | b'<'
                        | b'>'
                        | b'@'
                        | b','
                        | b';'
                        | b':'
                        | b'\\'
                        | b'"'
                        | b'/'
                        | b'['
                        | b']'
                        | b'?'
                        | b'='
                )
        })
}
