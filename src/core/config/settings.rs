use super::parsing::{
    env_optional, env_or_default, is_supported_document_extension, parse_bool, parse_cors_origins,
    parse_environment, parse_i32, parse_string_list, parse_u16, parse_u64,
};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, DocumentSettings, QueueSettings,
    RuntimeSettings, S3Settings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings, VerificationSettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("ENROLLD_HOST", "0.0.0.0");
        let port = env_or_default("ENROLLD_PORT", "8000");

        let environment =
            parse_environment(env_optional("ENROLLD_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("ENROLLD_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Enrolld API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let extraction_api_key = env_or_default("EXTRACTION_API_KEY", "");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "enrolld");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "enrolld_db");
        let database_url = env_optional("DATABASE_URL");

        let s3_endpoint = env_or_default("S3_ENDPOINT", "https://s3.us-east-1.amazonaws.com");
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_bucket = env_or_default("S3_BUCKET", "enrolld-documents");
        let s3_region = env_or_default("S3_REGION", "us-east-1");

        let queue_url = env_or_default("UPLOAD_QUEUE_URL", "");
        let queue_region = env_or_default("UPLOAD_QUEUE_REGION", &s3_region);

        let verify_base_url = env_or_default("VERIFY_DOCS_URL", "http://localhost:5000");
        let verify_timeout_seconds = parse_u64(
            "VERIFY_DOCS_TIMEOUT_SECONDS",
            env_or_default("VERIFY_DOCS_TIMEOUT_SECONDS", "30"),
        )?;
        let retry_cooldown_seconds = parse_u64(
            "PRECHECK_RETRY_COOLDOWN_SECONDS",
            env_or_default("PRECHECK_RETRY_COOLDOWN_SECONDS", "3600"),
        )?;
        let sweep_interval_seconds = parse_u64(
            "PRECHECK_SWEEP_INTERVAL_SECONDS",
            env_or_default("PRECHECK_SWEEP_INTERVAL_SECONDS", "10"),
        )?;

        let identity_type_id = parse_i32(
            "IDENTITY_DOCUMENT_TYPE_ID",
            env_or_default("IDENTITY_DOCUMENT_TYPE_ID", "1"),
        )?;
        let transcript_type_id = parse_i32(
            "TRANSCRIPT_DOCUMENT_TYPE_ID",
            env_or_default("TRANSCRIPT_DOCUMENT_TYPE_ID", "3"),
        )?;
        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "10"))?;
        let allowed_extensions = parse_string_list(
            env_optional("ALLOWED_DOCUMENT_EXTENSIONS"),
            &["pdf", "jpg", "jpeg", "png"],
        );
        let presigned_url_expire_minutes = parse_u64(
            "PRESIGNED_URL_EXPIRE_MINUTES",
            env_or_default("PRESIGNED_URL_EXPIRE_MINUTES", "15"),
        )?;

        let log_level = env_or_default("ENROLLD_LOG_LEVEL", "info");
        let json = env_optional("ENROLLD_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { extraction_api_key },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
            },
            queue: QueueSettings { queue_url, region: queue_region },
            verification: VerificationSettings {
                base_url: verify_base_url,
                timeout_seconds: verify_timeout_seconds,
                retry_cooldown_seconds,
                sweep_interval_seconds,
            },
            documents: DocumentSettings {
                identity_type_id,
                transcript_type_id,
                max_upload_size_mb,
                allowed_extensions,
                presigned_url_expire_minutes,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn queue(&self) -> &QueueSettings {
        &self.queue
    }

    pub(crate) fn verification(&self) -> &VerificationSettings {
        &self.verification
    }

    pub(crate) fn documents(&self) -> &DocumentSettings {
        &self.documents
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.documents.allowed_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_DOCUMENT_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for extension in &self.documents.allowed_extensions {
            if !is_supported_document_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_DOCUMENT_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if self.verification.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "VERIFY_DOCS_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.verification.sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PRECHECK_SWEEP_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.documents.identity_type_id == self.documents.transcript_type_id {
            return Err(ConfigError::InvalidValue {
                field: "TRANSCRIPT_DOCUMENT_TYPE_ID",
                value: self.documents.transcript_type_id.to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.s3.access_key.is_empty() || self.s3.secret_key.is_empty() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }
        if self.security.extraction_api_key.is_empty() {
            return Err(ConfigError::MissingSecret("EXTRACTION_API_KEY"));
        }
        if self.verification.base_url.is_empty() {
            return Err(ConfigError::MissingSecret("VERIFY_DOCS_URL"));
        }

        Ok(())
    }
}
