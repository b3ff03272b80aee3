use std::env;
use std::time::Duration;

use crate::shared::constants::ROLE_ADMIN;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub swagger: SwaggerConfig,
    pub minio: MinIOConfig,
    pub upload: UploadConfig,
    pub realtime: RealtimeConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Bearer token verification settings
///
/// Tokens are minted by the hosted auth provider and signed with a shared
/// HS256 secret; this service only verifies them.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub audience: String,
    pub jwt_leeway: Duration,
    pub admin_role: String,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// MinIO/S3 storage configuration for file blobs
#[derive(Debug, Clone)]
pub struct MinIOConfig {
    /// MinIO/S3 endpoint URL
    pub endpoint: String,
    /// Access key for authentication
    pub access_key: String,
    /// Secret key for authentication
    pub secret_key: String,
    /// Bucket name for storing files
    pub bucket: String,
    /// AWS region (for S3 compatibility)
    pub region: String,
    /// Presigned URL expiry time in seconds
    pub presigned_url_expiry_secs: u32,
}

/// Upload policy and quota settings
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_file_size: u64,
    pub allowed_mime_prefixes: Vec<String>,
    pub allowed_extensions: Vec<String>,
    pub storage_quota_bytes: u64,
}

/// Change-notification feed settings
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub reconnect_delay: Duration,
    pub event_buffer: usize,
}

/// Per-user session lifetime
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sessions unused for this long are closed and their cache dropped
    pub idle_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            minio: MinIOConfig::from_env()?,
            upload: UploadConfig::from_env()?,
            realtime: RealtimeConfig::from_env()?,
            session: SessionConfig::from_env()?,
        })
    }
}

/// Split a comma-separated variable into trimmed, non-empty entries
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let cors_allowed_origins =
            split_list(&env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()));

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }
}

impl AuthConfig {
    const DEFAULT_AUDIENCE: &'static str = "authenticated";
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60; // 1 minute

    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("AUTH_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "AUTH_JWT_SECRET environment variable is required".to_string())?;

        let audience =
            env::var("AUTH_AUDIENCE").unwrap_or_else(|_| Self::DEFAULT_AUDIENCE.to_string());

        let jwt_leeway_secs = env::var("JWT_LEEWAY")
            .unwrap_or_else(|_| Self::DEFAULT_JWT_LEEWAY_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "JWT_LEEWAY must be a valid number".to_string())?;

        let admin_role = env::var("AUTH_ADMIN_ROLE").unwrap_or_else(|_| ROLE_ADMIN.to_string());

        Ok(Self {
            jwt_secret,
            audience,
            jwt_leeway: Duration::from_secs(jwt_leeway_secs),
            admin_role,
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "File Haven API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "API documentation for File Haven".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl MinIOConfig {
    const DEFAULT_PRESIGNED_URL_EXPIRY_SECS: u32 = 3600; // 1 hour

    pub fn from_env() -> Result<Self, String> {
        let endpoint =
            env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());

        let access_key = env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let secret_key = env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let bucket = env::var("MINIO_BUCKET").unwrap_or_else(|_| "user-files".to_string());

        let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let presigned_url_expiry_secs = env::var("MINIO_PRESIGNED_URL_EXPIRY_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_PRESIGNED_URL_EXPIRY_SECS.to_string())
            .parse::<u32>()
            .map_err(|_| "MINIO_PRESIGNED_URL_EXPIRY_SECS must be a valid number".to_string())?;

        Ok(Self {
            endpoint,
            access_key,
            secret_key,
            bucket,
            region,
            presigned_url_expiry_secs,
        })
    }
}

impl UploadConfig {
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
    pub const DEFAULT_STORAGE_QUOTA_BYTES: u64 = 1024 * 1024 * 1024; // 1GB
    pub const DEFAULT_ALLOWED_MIME_PREFIXES: &'static str =
        "image/,application/pdf,text/,application/msword,application/vnd.openxmlformats";
    pub const DEFAULT_ALLOWED_EXTENSIONS: &'static str =
        "jpg,jpeg,png,gif,bmp,svg,webp,pdf,txt,csv,md,doc,docx,xlsx,pptx";

    pub fn from_env() -> Result<Self, String> {
        let max_file_size = env::var("UPLOAD_MAX_FILE_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_FILE_SIZE.to_string())
            .parse::<u64>()
            .map_err(|_| "UPLOAD_MAX_FILE_SIZE must be a valid number".to_string())?;

        let allowed_mime_prefixes = split_list(
            &env::var("UPLOAD_ALLOWED_MIME_PREFIXES")
                .unwrap_or_else(|_| Self::DEFAULT_ALLOWED_MIME_PREFIXES.to_string()),
        );

        let allowed_extensions = split_list(
            &env::var("UPLOAD_ALLOWED_EXTENSIONS")
                .unwrap_or_else(|_| Self::DEFAULT_ALLOWED_EXTENSIONS.to_string()),
        )
        .into_iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect();

        let storage_quota_bytes = env::var("STORAGE_QUOTA_BYTES")
            .unwrap_or_else(|_| Self::DEFAULT_STORAGE_QUOTA_BYTES.to_string())
            .parse::<u64>()
            .map_err(|_| "STORAGE_QUOTA_BYTES must be a valid number".to_string())?;

        if storage_quota_bytes == 0 {
            return Err("STORAGE_QUOTA_BYTES must be greater than zero".to_string());
        }

        Ok(Self {
            max_file_size,
            allowed_mime_prefixes,
            allowed_extensions,
            storage_quota_bytes,
        })
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            allowed_mime_prefixes: split_list(Self::DEFAULT_ALLOWED_MIME_PREFIXES),
            allowed_extensions: split_list(Self::DEFAULT_ALLOWED_EXTENSIONS),
            storage_quota_bytes: Self::DEFAULT_STORAGE_QUOTA_BYTES,
        }
    }
}

impl RealtimeConfig {
    const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;
    const DEFAULT_EVENT_BUFFER: usize = 256;

    pub fn from_env() -> Result<Self, String> {
        let reconnect_delay_secs = env::var("REALTIME_RECONNECT_DELAY_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_RECONNECT_DELAY_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "REALTIME_RECONNECT_DELAY_SECS must be a valid number".to_string())?;

        let event_buffer = env::var("REALTIME_EVENT_BUFFER")
            .unwrap_or_else(|_| Self::DEFAULT_EVENT_BUFFER.to_string())
            .parse::<usize>()
            .map_err(|_| "REALTIME_EVENT_BUFFER must be a valid number".to_string())?;

        if event_buffer == 0 {
            return Err("REALTIME_EVENT_BUFFER must be greater than zero".to_string());
        }

        Ok(Self {
            reconnect_delay: Duration::from_secs(reconnect_delay_secs.max(1)),
            event_buffer,
        })
    }
}

impl SessionConfig {
    const DEFAULT_IDLE_TTL_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        Self::parse_idle_ttl(env::var("SESSION_IDLE_TTL_SECS").ok().as_deref())
    }

    fn parse_idle_ttl(raw: Option<&str>) -> Result<Self, String> {
        let idle_ttl_secs = match raw {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| "SESSION_IDLE_TTL_SECS must be a valid number".to_string())?,
            None => Self::DEFAULT_IDLE_TTL_SECS,
        };

        if idle_ttl_secs == 0 {
            return Err("SESSION_IDLE_TTL_SECS must be greater than zero".to_string());
        }

        Ok(Self {
            idle_ttl: Duration::from_secs(idle_ttl_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_trims_and_drops_empty_entries() {
        assert_eq!(
            split_list(" image/ , application/pdf,, text/ "),
            vec!["image/", "application/pdf", "text/"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_upload_config_defaults_match_client_policy() {
        let config = UploadConfig::default();
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.storage_quota_bytes, 1024 * 1024 * 1024);
        assert!(config.allowed_mime_prefixes.contains(&"image/".to_string()));
        assert!(config
            .allowed_mime_prefixes
            .contains(&"application/vnd.openxmlformats".to_string()));
        assert!(config.allowed_extensions.contains(&"pdf".to_string()));
    }

    #[test]
    fn test_session_idle_ttl() {
        let default = SessionConfig::parse_idle_ttl(None).unwrap();
        assert_eq!(default.idle_ttl, Duration::from_secs(1800));

        let custom = SessionConfig::parse_idle_ttl(Some(" 90 ")).unwrap();
        assert_eq!(custom.idle_ttl, Duration::from_secs(90));

        assert!(SessionConfig::parse_idle_ttl(Some("0")).is_err());
        assert!(SessionConfig::parse_idle_ttl(Some("soon")).is_err());
    }
}
