//! `multipart/form-data` body encoding.
//!
//! The encoder is byte-exact: text parts are written in insertion order and the
//! single file part always comes last, which is the field order the image host
//! expects. Values are inserted literally with no escaping, so a form must not
//! contain its own boundary; [`MultipartForm::pick_boundary`] guarantees that
//! for generated boundaries.

/// A text field of a multipart form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextPart {
    pub field_name: String,
    pub value: String,
}

/// The binary file field of a multipart form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    pub field_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Ordered text fields plus exactly one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartForm {
    text_parts: Vec<TextPart>,
    file: FilePart,
}

impl MultipartForm {
    /// Creates a form around its file part.
    #[must_use]
    pub fn new(file: FilePart) -> Self {
        Self {
            text_parts: Vec::new(),
            file,
        }
    }

    /// Appends a text field. Fields are encoded in the order they are added.
    #[must_use]
    pub fn with_text(mut self, field_name: impl Into<String>, value: impl Into<String>) -> Self {
        self.text_parts.push(TextPart {
            field_name: field_name.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn text_parts(&self) -> &[TextPart] {
        &self.text_parts
    }

    #[must_use]
    pub fn file(&self) -> &FilePart {
        &self.file
    }

    /// Returns true if `boundary` occurs anywhere in the form's names, values or file bytes.
    #[must_use]
    pub fn contains(&self, boundary: &str) -> bool {
        let needle = boundary.as_bytes();
        self.text_parts.iter().any(|part| {
            contains_bytes(part.field_name.as_bytes(), needle)
                || contains_bytes(part.value.as_bytes(), needle)
        }) || contains_bytes(self.file.field_name.as_bytes(), needle)
            || contains_bytes(self.file.file_name.as_bytes(), needle)
            || contains_bytes(self.file.mime_type.as_bytes(), needle)
            || contains_bytes(&self.file.bytes, needle)
    }

    /// Draws random boundaries until one does not occur inside the form.
    #[must_use]
    pub fn pick_boundary(&self) -> String {
        loop {
            let boundary = generate_boundary();
            if !self.contains(&boundary) {
                return boundary;
            }
            tracing::debug!("Boundary collided with form content, drawing another");
        }
    }

    /// The `Content-Type` header value for this form encoded with `boundary`.
    #[must_use]
    pub fn content_type(boundary: &str) -> String {
        format!("multipart/form-data; boundary={boundary}")
    }

    /// Total size in bytes of the encoded body.
    #[must_use]
    pub fn encoded_len(&self, boundary: &str) -> usize {
        let delimiter = boundary.len() + 4; // "--" + boundary + "\r\n"
        let text: usize = self
            .text_parts
            .iter()
            .map(|part| {
                delimiter
                    + r#"Content-Disposition: form-data; name="""#.len()
                    + part.field_name.len()
                    + 4
                    + part.value.len()
                    + 2
            })
            .sum();
        let file = delimiter
            + r#"Content-Disposition: form-data; name=""; filename="""#.len()
            + self.file.field_name.len()
            + self.file.file_name.len()
            + 2
            + "Content-Type: ".len()
            + self.file.mime_type.len()
            + 4
            + self.file.bytes.len()
            + 2;
        text + file + boundary.len() + 6
    }
}

/// Generates a random 128-bit boundary token rendered as 32 lowercase hex digits.
#[must_use]
pub fn generate_boundary() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Encodes `form` into a `multipart/form-data` body delimited by `boundary`.
#[must_use]
pub fn encode(form: &MultipartForm, boundary: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(form.encoded_len(boundary));

    for part in &form.text_parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                part.field_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(part.value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    let file = &form.file;
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            file.field_name, file.file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.mime_type).as_bytes());
    body.extend_from_slice(&file.bytes);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}
