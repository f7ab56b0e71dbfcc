use regex::Regex;
use std::path::Path;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

pub struct InputValidator;

impl InputValidator {
    pub fn validate_token(token: &str) -> AppResult<()> {
        let trimmed = token.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation(
                "token",
                "Team token cannot be empty (set it in the config file or STORY_UPLOADER_TOKEN)",
            ));
        }

        if token.contains(char::is_whitespace) {
            return Err(AppError::validation("token", "Team token contains whitespace"));
        }

        Ok(())
    }

    pub fn validate_resource_id(resource_id: &str) -> AppResult<()> {
        Uuid::parse_str(resource_id.trim())
            .map(|_| ())
            .map_err(|_| AppError::validation("resource_id", "Story id must be a UUID"))
    }

    /// Host is `name[:port]`; the scheme is always added by the client.
    pub fn validate_host(host: &str) -> AppResult<()> {
        if host.trim().is_empty() {
            return Err(AppError::validation("host", "Host cannot be empty"));
        }

        if host.contains("://") {
            return Err(AppError::validation(
                "host",
                "Host must not include a scheme, e.g. 'localhost:8080'",
            ));
        }

        let host_pattern = Regex::new(r"^[A-Za-z0-9.\-]+(:\d{1,5})?$").unwrap();
        if !host_pattern.is_match(host) {
            return Err(AppError::validation("host", "Host contains invalid characters"));
        }

        Ok(())
    }

    pub fn validate_path_prefix(path: &str) -> AppResult<()> {
        let trimmed = path.trim_matches('/');

        if trimmed.is_empty() {
            return Err(AppError::validation("path", "Path prefix cannot be empty"));
        }

        let safe_chars = Regex::new(r"^[A-Za-z0-9_\-./]+$").unwrap();
        if !safe_chars.is_match(trimmed) || trimmed.contains("..") {
            return Err(AppError::validation("path", "Path prefix contains invalid characters"));
        }

        Ok(())
    }

    pub fn validate_folder(folder: &Path) -> AppResult<()> {
        if folder.as_os_str().is_empty() {
            return Err(AppError::validation("folder", "Folder cannot be empty"));
        }

        if !folder.is_dir() {
            return Err(AppError::not_a_directory(&folder.to_string_lossy()));
        }

        Ok(())
    }

    pub fn validate_batch_size(batch_size: usize) -> AppResult<()> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(AppError::validation("batch_size", "Must be between 1 and 1000"));
        }

        Ok(())
    }

    /// Replace the bearer token with a fixed marker before anything is logged.
    pub fn redact_token(token: &str) -> String {
        if token.is_empty() {
            String::new()
        } else {
            "<redacted>".to_string()
        }
    }
}
