use chrono::Utc;
use uuid::Uuid;

use crate::core::config::UploadConfig;
use crate::shared::constants::{FALLBACK_EXTENSION, GENERIC_MIME_TYPE, MAX_FILE_NAME_LENGTH};
use crate::shared::validation::{file_extension, STORAGE_EXTENSION_REGEX};

/// Size and type limits checked before an upload touches the remote store
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_file_size: u64,
    pub allowed_mime_prefixes: Vec<String>,
    pub allowed_extensions: Vec<String>,
    /// Per-user storage quota shown against usage; not enforced on upload
    pub storage_quota_bytes: u64,
}

impl UploadPolicy {
    pub fn validate(&self, name: &str, mime_type: &str, size_bytes: u64) -> Result<(), String> {
        let name = name.trim();
        validate_file_name(name)?;

        if size_bytes > self.max_file_size {
            return Err(format!(
                "File size {} bytes exceeds the maximum of {} bytes",
                size_bytes, self.max_file_size
            ));
        }

        let mime_type = mime_type.trim().to_ascii_lowercase();
        let allowed = if mime_type.is_empty() || mime_type == GENERIC_MIME_TYPE {
            file_extension(name)
                .map(|ext| self.allowed_extensions.contains(&ext))
                .unwrap_or(false)
        } else {
            self.allowed_mime_prefixes
                .iter()
                .any(|prefix| mime_type.starts_with(prefix.as_str()))
        };

        if !allowed {
            return Err(format!("File type of '{}' is not allowed", name));
        }

        Ok(())
    }

    /// Fresh, collision-resistant blob key under the owner's prefix
    pub fn storage_key(&self, owner_id: &str, name: &str) -> String {
        let ext = file_extension(name.trim())
            .filter(|ext| STORAGE_EXTENSION_REGEX.is_match(ext))
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

        format!(
            "{}/{}-{}.{}",
            owner_id,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            ext
        )
    }
}

impl From<&UploadConfig> for UploadPolicy {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            allowed_mime_prefixes: config
                .allowed_mime_prefixes
                .iter()
                .map(|prefix| prefix.to_ascii_lowercase())
                .collect(),
            allowed_extensions: config.allowed_extensions.clone(),
            storage_quota_bytes: config.storage_quota_bytes,
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

/// Display names must be non-blank and at most 255 characters
pub fn validate_file_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("File name must not be empty".to_string());
    }
    if trimmed.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(format!(
            "File name must be at most {} characters",
            MAX_FILE_NAME_LENGTH
        ));
    }
    Ok(())
}
