use std::env;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::AthenaError;
use crate::types::{EncryptionConfig, EncryptionOption};

/// Region used when neither `ATHENA_REGION` nor `AWS_REGION` is set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default interval between two status fetches of the same execution.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default number of executions polled at the same time.
pub const DEFAULT_POLL_CONCURRENCY: usize = 5;

/// Default `MaxResults` for a full-result pagination run.
pub const DEFAULT_PAGE_SIZE: i32 = 1000;

// ── Env helpers ─────────────────────────────────────────────────

/// Load a `.env` file from the working directory (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Credentials ─────────────────────────────────────────────────

/// Where the AWS backend obtains its credentials.
///
/// Resolved once when the backend is built; the SDK credentials cache
/// refreshes the underlying provider only when the cached credentials expire.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialsSource {
    /// Standard provider chain: environment, shared files, ECS/EC2 metadata.
    #[default]
    DefaultChain,
    /// A named profile from the shared credentials/config files.
    Profile { name: String },
    /// Explicit keys.
    Static {
        access_key_id: String,
        #[serde(skip_serializing)]
        secret_access_key: String,
        #[serde(skip_serializing)]
        session_token: Option<String>,
    },
}

// Secrets never reach log lines through `{:?}` on a config.
impl fmt::Debug for CredentialsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultChain => f.write_str("DefaultChain"),
            Self::Profile { name } => f.debug_struct("Profile").field("name", name).finish(),
            Self::Static {
                access_key_id,
                session_token,
                ..
            } => f
                .debug_struct("Static")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<redacted>")
                .field("session_token", &session_token.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

impl CredentialsSource {
    fn from_env_profiled(profile: &str) -> Self {
        let key_id = profiled_env_opt(profile, "ATHENA_ACCESS_KEY_ID");
        let secret = profiled_env_opt(profile, "ATHENA_SECRET_ACCESS_KEY");
        if let (Some(access_key_id), Some(secret_access_key)) = (key_id, secret) {
            return Self::Static {
                access_key_id,
                secret_access_key,
                session_token: profiled_env_opt(profile, "ATHENA_SESSION_TOKEN"),
            };
        }
        match profiled_env_opt(profile, "ATHENA_AWS_PROFILE") {
            Some(name) => Self::Profile { name },
            None => Self::DefaultChain,
        }
    }

    /// Short label for startup logs (never includes secrets).
    pub fn label(&self) -> &str {
        match self {
            Self::DefaultChain => "default-chain",
            Self::Profile { .. } => "profile",
            Self::Static { .. } => "static",
        }
    }
}

// ── AthenaConfig ────────────────────────────────────────────────

/// Configuration for the Athena query client.
///
/// Reads from environment variables with optional profile prefix.
/// When `ATHENAQL_PROFILE=PROD`, checks `PROD_ATHENA_DATABASE` before `ATHENA_DATABASE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    /// AWS region for Athena queries.
    pub region: String,
    /// Default database for submitted queries.
    pub database: String,
    /// Default S3 path for query results. Must be set for real use.
    pub output_location: String,
    /// Optional Athena workgroup; omitted from requests when unset.
    pub workgroup: Option<String>,
    /// Optional result encryption; omitted from requests when unset.
    pub encryption: Option<EncryptionConfig>,
    /// Fixed delay between status fetches, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of executions polled concurrently.
    pub poll_concurrency: usize,
    /// Page size used when fetching a complete result set.
    pub page_size: i32,
    /// Custom endpoint (e.g. a local mock of the Athena API).
    pub endpoint_url: Option<String>,
    /// Credentials used by the AWS backend.
    pub credentials: CredentialsSource,
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            database: "default".to_string(),
            output_location: String::new(),
            workgroup: None,
            encryption: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_concurrency: DEFAULT_POLL_CONCURRENCY,
            page_size: DEFAULT_PAGE_SIZE,
            endpoint_url: None,
            credentials: CredentialsSource::DefaultChain,
        }
    }
}

impl AthenaConfig {
    /// Build config from environment variables.
    ///
    /// Reads `ATHENAQL_PROFILE` to determine the profile prefix.
    /// For each key, tries `{PROFILE}_ATHENA_*` first, then `ATHENA_*`.
    /// `ATHENA_REGION` falls back to `AWS_REGION` before using the default.
    pub fn from_env() -> Result<Self, AthenaError> {
        let profile = env_opt("ATHENAQL_PROFILE")
            .map(|s| s.to_uppercase())
            .unwrap_or_default();
        Self::from_env_profiled(&profile)
    }

    /// Build config for a specific named profile.
    ///
    /// Fails only when `ATHENA_ENCRYPTION_OPTION` names an unknown option.
    pub fn from_env_profiled(profile: &str) -> Result<Self, AthenaError> {
        let region = profiled_env_opt(profile, "ATHENA_REGION")
            .or_else(|| profiled_env_opt(profile, "AWS_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let encryption = match profiled_env_opt(profile, "ATHENA_ENCRYPTION_OPTION") {
            Some(raw) => Some(EncryptionConfig {
                option: raw.parse::<EncryptionOption>()?,
                kms_key: profiled_env_opt(profile, "ATHENA_KMS_KEY"),
            }),
            None => None,
        };

        Ok(Self {
            region,
            database: profiled_env_or(profile, "ATHENA_DATABASE", "default"),
            output_location: profiled_env_or(profile, "ATHENA_OUTPUT_LOCATION", ""),
            workgroup: profiled_env_opt(profile, "ATHENA_WORKGROUP"),
            encryption,
            poll_interval_ms: profiled_env_parse(
                profile,
                "ATHENA_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            ),
            poll_concurrency: profiled_env_parse(
                profile,
                "ATHENA_POLL_CONCURRENCY",
                DEFAULT_POLL_CONCURRENCY,
            ),
            page_size: profiled_env_parse(profile, "ATHENA_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            endpoint_url: profiled_env_opt(profile, "ATHENA_ENDPOINT_URL"),
            credentials: CredentialsSource::from_env_profiled(profile),
        })
    }

    /// Returns `true` when an output location has been configured.
    pub fn is_configured(&self) -> bool {
        !self.output_location.is_empty()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), AthenaError> {
        if self.poll_concurrency == 0 {
            return Err(AthenaError::Config("poll_concurrency must be at least 1".into()));
        }
        if self.poll_concurrency > Semaphore::MAX_PERMITS {
            return Err(AthenaError::Config(format!(
                "poll_concurrency must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                self.poll_concurrency
            )));
        }
        if self.page_size <= 0 {
            return Err(AthenaError::Config(format!(
                "page_size must be positive, got {}",
                self.page_size
            )));
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env-based tests must run serially to avoid interfering with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Helper: clear all ATHENA_* and profile env vars used by the config.
    fn clear_athena_env() {
        let keys = [
            "ATHENAQL_PROFILE",
            "ATHENA_REGION",
            "ATHENA_DATABASE",
            "ATHENA_OUTPUT_LOCATION",
            "ATHENA_WORKGROUP",
            "ATHENA_ENCRYPTION_OPTION",
            "ATHENA_KMS_KEY",
            "ATHENA_POLL_INTERVAL_MS",
            "ATHENA_POLL_CONCURRENCY",
            "ATHENA_PAGE_SIZE",
            "ATHENA_ENDPOINT_URL",
            "ATHENA_AWS_PROFILE",
            "ATHENA_ACCESS_KEY_ID",
            "ATHENA_SECRET_ACCESS_KEY",
            "ATHENA_SESSION_TOKEN",
            "AWS_REGION",
            "TEST_ATHENA_DATABASE",
            "TEST_ATHENA_REGION",
            "TEST_AWS_REGION",
        ];
        for k in keys {
            env::remove_var(k);
        }
    }

    #[test]
    fn defaults_when_no_env_vars() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_athena_env();

        let cfg = AthenaConfig::from_env_profiled("").unwrap();

        assert_eq!(cfg.region, "us-east-1");
        assert_eq!(cfg.database, "default");
        assert_eq!(cfg.output_location, "");
        assert!(cfg.workgroup.is_none());
        assert!(cfg.encryption.is_none());
        assert_eq!(cfg.poll_interval_ms, 1000);
        assert_eq!(cfg.poll_concurrency, 5);
        assert_eq!(cfg.page_size, 1000);
        assert_eq!(cfg.credentials, CredentialsSource::DefaultChain);
        assert!(!cfg.is_configured());
    }

    #[test]
    fn from_env_reads_vars() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_athena_env();

        env::set_var("ATHENA_DATABASE", "cloudtrail");
        env::set_var("ATHENA_OUTPUT_LOCATION", "s3://bucket/athena_temp/");
        env::set_var("ATHENA_POLL_CONCURRENCY", "8");
        env::set_var("ATHENA_ENCRYPTION_OPTION", "SSE_KMS");
        env::set_var("ATHENA_KMS_KEY", "arn:aws:kms:key/1");

        let cfg = AthenaConfig::from_env_profiled("").unwrap();

        assert_eq!(cfg.database, "cloudtrail");
        assert!(cfg.is_configured());
        assert_eq!(cfg.poll_concurrency, 8);
        let enc = cfg.encryption.expect("encryption configured");
        assert_eq!(enc.option, EncryptionOption::SseKms);
        assert_eq!(enc.kms_key.as_deref(), Some("arn:aws:kms:key/1"));

        clear_athena_env();
    }

    #[test]
    fn unknown_encryption_option_is_rejected() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_athena_env();

        env::set_var("ATHENA_ENCRYPTION_OPTION", "ROT13");
        let err = AthenaConfig::from_env_profiled("").unwrap_err();
        assert!(matches!(err, AthenaError::Config(_)));

        clear_athena_env();
    }

    #[test]
    fn region_falls_back_to_aws_region() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_athena_env();

        env::set_var("AWS_REGION", "us-west-2");
        let cfg = AthenaConfig::from_env_profiled("").unwrap();
        assert_eq!(cfg.region, "us-west-2");

        env::set_var("ATHENA_REGION", "eu-west-1");
        let cfg = AthenaConfig::from_env_profiled("").unwrap();
        assert_eq!(cfg.region, "eu-west-1");

        clear_athena_env();
    }

    #[test]
    fn profiled_env_takes_precedence() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_athena_env();

        env::set_var("ATHENA_DATABASE", "base_db");
        env::set_var("TEST_ATHENA_DATABASE", "test_db");
        env::set_var("TEST_AWS_REGION", "ap-northeast-1");

        let cfg = AthenaConfig::from_env_profiled("TEST").unwrap();
        assert_eq!(cfg.database, "test_db");
        assert_eq!(cfg.region, "ap-northeast-1");

        clear_athena_env();
    }

    #[test]
    fn credentials_source_selection() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_athena_env();

        env::set_var("ATHENA_AWS_PROFILE", "athena");
        let cfg = AthenaConfig::from_env_profiled("").unwrap();
        assert_eq!(
            cfg.credentials,
            CredentialsSource::Profile { name: "athena".into() }
        );

        // Explicit keys win over a profile name.
        env::set_var("ATHENA_ACCESS_KEY_ID", "AKIA123");
        env::set_var("ATHENA_SECRET_ACCESS_KEY", "secret");
        let cfg = AthenaConfig::from_env_profiled("").unwrap();
        assert_eq!(cfg.credentials.label(), "static");

        clear_athena_env();
    }

    #[test]
    fn static_credentials_never_serialize_secrets() {
        let source = CredentialsSource::Static {
            access_key_id: "AKIA123".into(),
            secret_access_key: "super-secret".into(),
            session_token: Some("token".into()),
        };
        let json = serde_json::to_string(&source).unwrap();
        assert!(json.contains("AKIA123"));
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("token\""));
    }

    #[test]
    fn invalid_number_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_athena_env();

        env::set_var("ATHENA_PAGE_SIZE", "lots");
        let cfg = AthenaConfig::from_env_profiled("").unwrap();
        assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);

        clear_athena_env();
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let cfg = AthenaConfig {
            poll_concurrency: 0,
            ..AthenaConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(AthenaError::Config(_))));
        assert!(AthenaConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_bounds_concurrency_by_semaphore_limit() {
        let at_limit = AthenaConfig {
            poll_concurrency: Semaphore::MAX_PERMITS,
            ..AthenaConfig::default()
        };
        assert!(at_limit.validate().is_ok());

        for poll_concurrency in [Semaphore::MAX_PERMITS + 1, usize::MAX] {
            let cfg = AthenaConfig {
                poll_concurrency,
                ..AthenaConfig::default()
            };
            match cfg.validate() {
                Err(AthenaError::Config(msg)) => assert!(msg.contains("at most")),
                other => panic!("expected config error, got {other:?}"),
            }
        }
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = AthenaConfig {
            credentials: CredentialsSource::Static {
                access_key_id: "AKIA123".into(),
                secret_access_key: "super-secret".into(),
                session_token: Some("session-tok".into()),
            },
            ..AthenaConfig::default()
        };
        let debug = format!("{cfg:?}");
        assert!(debug.contains("AKIA123"));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("session-tok"));

        let no_token = CredentialsSource::Static {
            access_key_id: "AKIA123".into(),
            secret_access_key: "super-secret".into(),
            session_token: None,
        };
        assert!(format!("{no_token:?}").contains("session_token: None"));
        assert_eq!(format!("{:?}", CredentialsSource::DefaultChain), "DefaultChain");
    }
}
