//! Uploads to the third-party image host.
//!
//! The host takes an unsigned multipart POST (`upload_preset`, `folder`, then
//! `file`) and answers with JSON carrying a `secure_url`. These requests never
//! carry the backend's bearer token and never touch the session. Only HTTP 200
//! counts as success here, which is stricter than the backend's 2xx rule.

use crate::errors::ClientError;
use crate::http::error_helpers::deserialize_with_context;
use crate::http::loud_wire;
use crate::multipart::{self, FilePart, MultipartForm};
use reqwest::Client as ReqwestClient;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_UPLOAD_URL: &str = "https://api.cloudinary.com/v1_1/dx3sjrkgg/image/upload";
pub const DEFAULT_UPLOAD_PRESET: &str = "salon-services";
pub const DEFAULT_FOLDER: &str = "salon-services/images";

/// Where and how images are uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHostConfig {
    pub upload_url: String,
    pub upload_preset: String,
    pub folder: String,
}

impl Default for ImageHostConfig {
    fn default() -> Self {
        Self {
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            upload_preset: DEFAULT_UPLOAD_PRESET.to_string(),
            folder: DEFAULT_FOLDER.to_string(),
        }
    }
}

impl ImageHostConfig {
    /// Builds the upload form for `image`: preset and folder fields, then the file.
    #[must_use]
    pub fn form(&self, image: ImageFile) -> MultipartForm {
        MultipartForm::new(FilePart {
            field_name: "file".to_string(),
            file_name: image.file_name,
            mime_type: image.mime_type,
            bytes: image.bytes,
        })
        .with_text("upload_preset", self.upload_preset.clone())
        .with_text("folder", self.folder.clone())
    }
}

/// An already-encoded image ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl ImageFile {
    #[must_use]
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// A JPEG named `serviceImage.jpg`.
    #[must_use]
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "serviceImage.jpg", "image/jpeg")
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
}

/// Uploads `image` and returns its `secure_url`.
///
/// # Errors
///
/// - [`ClientError::InvalidInput`] for an empty image
/// - [`ClientError::Transport`] if the request fails or the body cannot be read
/// - [`ClientError::ImageHost`] for any status other than 200
/// - [`ClientError::Decode`] if the body is not JSON
/// - [`ClientError::MalformedResponse`] if `secure_url` is missing
pub async fn upload_image(
    http_client: &ReqwestClient,
    config: &ImageHostConfig,
    image: ImageFile,
) -> Result<String, ClientError> {
    if image.bytes.is_empty() {
        return Err(ClientError::InvalidInput(
            "Cannot upload an empty image".to_string(),
        ));
    }

    debug!(
        "Uploading image: size={} bytes, mime_type={}, file_name={}",
        image.bytes.len(),
        image.mime_type,
        image.file_name
    );

    let form = config.form(image);
    let boundary = form.pick_boundary();
    let content_type = MultipartForm::content_type(&boundary);
    let body = multipart::encode(&form, &boundary);

    let request_id = loud_wire::next_request_id();
    loud_wire::log_request(
        request_id,
        "POST",
        &config.upload_url,
        &[(CONTENT_TYPE.as_str().to_string(), content_type.clone())],
        None,
    );
    loud_wire::log_multipart(request_id, &form);

    let response = http_client
        .post(config.upload_url.as_str())
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            warn!("Image upload transport error: {}", e);
            loud_wire::log_transport_error(request_id, &e.to_string());
            ClientError::Transport(e.to_string())
        })?;

    let status = response.status().as_u16();
    loud_wire::log_response_status(request_id, status);
    if status != 200 {
        return Err(ClientError::ImageHost {
            status_code: status,
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    loud_wire::log_response_body(request_id, &body);

    let parsed: UploadResponse = deserialize_with_context(&body, "image host upload response")?;
    let url = parsed.secure_url.ok_or_else(|| {
        ClientError::MalformedResponse("image host response has no secure_url".to_string())
    })?;

    debug!("Image uploaded: {}", url);
    Ok(url)
}
