//! CLI-first configuration for the Keyward server.
//!
//! Uses `clap::Parser` for argument parsing with environment variable
//! fallbacks, and `bon::Builder` for test construction without CLI/env
//! interference.
//!
//! ```no_run
//! use clap::Parser;
//! use keyward_server::config::Cli;
//!
//! let cli = Cli::parse();
//! cli.config.validate().expect("invalid configuration");
//! ```
//!
//! ```
//! use keyward_server::config::{Config, CredentialSource};
//!
//! let config = Config::builder()
//!     .signing_secret("secret")
//!     .password_salt("salt")
//!     .credential_source(CredentialSource::Memory)
//!     .build();
//! assert!(config.validate().is_ok());
//! ```

use std::{
    collections::HashMap,
    convert::Infallible,
    fmt,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use bon::Builder;
use clap::Parser;
use serde::Deserialize;
use zeroize::Zeroizing;

/// Default HTTP listen address.
const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Default log level filter string.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default login endpoint path.
pub const DEFAULT_LOGIN_PATH: &str = "/auth/api/v1/login";

/// Default verify endpoint path.
pub const DEFAULT_VERIFY_PATH: &str = "/auth/api/v1/verify";

/// Path of the health endpoint. Not configurable.
pub const HEALTH_PATH: &str = "/healthz";

/// Default access token lifetime in seconds.
const DEFAULT_ACCESS_TTL_SECS: u64 = 60;

/// Default refresh token lifetime in seconds.
const DEFAULT_REFRESH_TTL_SECS: u64 = 3600;

/// Default credential store lookup timeout in milliseconds.
const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 2000;

/// Configuration errors. All are fatal at startup.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required setting is absent or empty.
    #[error("{flag} is required")]
    Missing {
        /// The CLI flag naming the setting.
        flag: &'static str,
    },

    /// A setting has an unusable value.
    #[error("{flag} {message}")]
    Invalid {
        /// The CLI flag naming the setting.
        flag: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The users file could not be read.
    #[error("failed to read users file {}: {source}", path.display())]
    UsersFileRead {
        /// Path that was read.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The users file is not valid YAML of the expected shape.
    #[error("failed to parse users file {}: {source}", path.display())]
    UsersFileParse {
        /// Path that was parsed.
        path: PathBuf,
        /// The parse failure.
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    fn invalid(flag: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid { flag, message: message.into() }
    }
}

/// A secret string (signing key, salt) scrubbed from memory on drop and
/// redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    /// The secret's bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Whether the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Secret {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Zeroizing::new(s.to_owned())))
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self(Zeroizing::new(s.to_owned()))
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self(Zeroizing::new(s))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Where principals are looked up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CredentialSource {
    /// Read-only table loaded from the users file.
    #[default]
    Static,
    /// In-memory key-value backend seeded from the users file.
    Memory,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    /// Automatically detect: JSON for non-TTY stdout, text otherwise.
    #[default]
    Auto,
    /// JSON structured logging.
    Json,
    /// Human-readable text format.
    Text,
}

/// Command-line interface for the Keyward server.
#[derive(Debug, Parser)]
#[command(name = "keyward")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If omitted, starts the server.
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Server configuration (flattened so flags appear at top level).
    #[command(flatten)]
    pub config: Config,
}

/// CLI subcommands.
#[derive(Debug, Clone, PartialEq, Eq, clap::Subcommand)]
pub enum CliCommand {
    /// Read a password from stdin and print its stored hash for the users file.
    HashPassword,
}

/// Configuration for the Keyward server.
///
/// All fields are configurable via CLI flags or environment variables.
/// Precedence: CLI arg > env var > default value.
///
/// The signing secret and password salt use `hide_env_values` and are held
/// as [`Secret`]s.
#[derive(Debug, Clone, Builder, Parser)]
#[command(name = "keyward")]
#[command(version)]
#[builder(on(String, into))]
pub struct Config {
    // ── Server ───────────────────────────────────────────────────────
    /// HTTP bind address.
    #[arg(long = "listen", env = "KEYWARD__LISTEN", default_value = DEFAULT_LISTEN)]
    #[builder(default = default_listen())]
    pub listen: SocketAddr,

    /// Prometheus exporter bind address. Metrics are not exported when unset.
    #[arg(long = "metrics-listen", env = "KEYWARD__METRICS_LISTEN")]
    pub metrics_listen: Option<SocketAddr>,

    /// Tracing-subscriber filter string (e.g., info, debug, trace).
    #[arg(long = "log-level", env = "KEYWARD__LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    #[builder(default = DEFAULT_LOG_LEVEL.to_string())]
    pub log_level: String,

    /// Log output format: auto, json, or text.
    #[arg(long = "log-format", env = "KEYWARD__LOG_FORMAT", value_enum, default_value = "auto")]
    #[builder(default)]
    pub log_format: LogFormat,

    // ── Secrets ──────────────────────────────────────────────────────
    /// HS256 signing secret. Changing it invalidates every outstanding token.
    #[arg(long = "signing-secret", env = "KEYWARD__SIGNING_SECRET", hide_env_values = true)]
    #[builder(into)]
    pub signing_secret: Option<Secret>,

    /// Salt for password hashes. Must match the salt the stored hashes were made with.
    #[arg(long = "password-salt", env = "KEYWARD__PASSWORD_SALT", hide_env_values = true)]
    #[builder(into)]
    pub password_salt: Option<Secret>,

    // ── Tokens ───────────────────────────────────────────────────────
    /// Access token lifetime in seconds.
    #[arg(long = "access-ttl-secs", env = "KEYWARD__ACCESS_TTL_SECS", default_value_t = DEFAULT_ACCESS_TTL_SECS)]
    #[builder(default = DEFAULT_ACCESS_TTL_SECS)]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds.
    #[arg(long = "refresh-ttl-secs", env = "KEYWARD__REFRESH_TTL_SECS", default_value_t = DEFAULT_REFRESH_TTL_SECS)]
    #[builder(default = DEFAULT_REFRESH_TTL_SECS)]
    pub refresh_ttl_secs: u64,

    /// Mark token cookies `Secure` (HTTPS only).
    #[arg(long = "secure-cookies", env = "KEYWARD__SECURE_COOKIES")]
    #[builder(default)]
    pub secure_cookies: bool,

    // ── Routes ───────────────────────────────────────────────────────
    /// Login endpoint path.
    #[arg(long = "login-path", env = "KEYWARD__LOGIN_PATH", default_value = DEFAULT_LOGIN_PATH)]
    #[builder(default = DEFAULT_LOGIN_PATH.to_string())]
    pub login_path: String,

    /// Verify endpoint path.
    #[arg(long = "verify-path", env = "KEYWARD__VERIFY_PATH", default_value = DEFAULT_VERIFY_PATH)]
    #[builder(default = DEFAULT_VERIFY_PATH.to_string())]
    pub verify_path: String,

    // ── Credentials ──────────────────────────────────────────────────
    /// YAML users file: `users: { <email>: <hash> }`.
    #[arg(long = "users-file", env = "KEYWARD__USERS_FILE")]
    pub users_file: Option<PathBuf>,

    /// Credential store: static or memory.
    #[arg(
        long = "credential-source",
        env = "KEYWARD__CREDENTIAL_SOURCE",
        value_enum,
        default_value = "static"
    )]
    #[builder(default)]
    pub credential_source: CredentialSource,

    /// Upper bound on a single credential store lookup, in milliseconds.
    #[arg(long = "lookup-timeout-ms", env = "KEYWARD__LOOKUP_TIMEOUT_MS", default_value_t = DEFAULT_LOOKUP_TIMEOUT_MS)]
    #[builder(default = DEFAULT_LOOKUP_TIMEOUT_MS)]
    pub lookup_timeout_ms: u64,
}

/// Unreserved URL characters plus `/`.
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '.' | '_' | '~')
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

impl Config {
    /// Validate required settings and cross-field rules.
    ///
    /// Must be called after parsing and before using the config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first offending flag.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.require_signing_secret()?;
        self.require_password_salt()?;

        if self.access_ttl_secs == 0 {
            return Err(ConfigError::invalid("--access-ttl-secs", "must be at least 1"));
        }
        let max_ttl_secs = keyward_authn::MAX_TTL.as_secs();
        for (flag, secs) in
            [("--access-ttl-secs", self.access_ttl_secs), ("--refresh-ttl-secs", self.refresh_ttl_secs)]
        {
            if secs > max_ttl_secs {
                return Err(ConfigError::invalid(flag, format!("must not exceed {max_ttl_secs}")));
            }
        }
        if self.refresh_ttl_secs < self.access_ttl_secs {
            return Err(ConfigError::invalid(
                "--refresh-ttl-secs",
                "must not be shorter than --access-ttl-secs",
            ));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(ConfigError::invalid("--lookup-timeout-ms", "must be at least 1"));
        }

        for (flag, path) in [("--login-path", &self.login_path), ("--verify-path", &self.verify_path)]
        {
            if !path.starts_with('/') {
                return Err(ConfigError::invalid(flag, format!("must start with '/', got: {path}")));
            }
            // Literal paths only: no axum captures or wildcards.
            if let Some(c) = path.chars().find(|c| !is_path_char(*c)) {
                return Err(ConfigError::invalid(
                    flag,
                    format!("contains unsupported character {c:?}, got: {path}"),
                ));
            }
            if path == HEALTH_PATH {
                return Err(ConfigError::invalid(flag, format!("must not be {HEALTH_PATH}")));
            }
        }
        if self.login_path == self.verify_path {
            return Err(ConfigError::invalid("--verify-path", "must differ from --login-path"));
        }

        Ok(())
    }

    /// Settings that are valid but probably unintended. Log these once
    /// logging is up.
    #[must_use]
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.users_file.is_none() {
            warnings.push("--users-file not set: no principal can log in");
        }
        warnings
    }

    /// The signing secret, if present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] otherwise.
    pub fn require_signing_secret(&self) -> Result<&Secret, ConfigError> {
        self.signing_secret
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing { flag: "--signing-secret" })
    }

    /// The password salt, if present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] otherwise.
    pub fn require_password_salt(&self) -> Result<&Secret, ConfigError> {
        self.password_salt
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing { flag: "--password-salt" })
    }

    /// Access token lifetime.
    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    /// Refresh token lifetime.
    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    /// Credential store lookup timeout.
    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    /// Loads the users table, or an empty one when no users file is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_users(&self) -> Result<HashMap<String, String>, ConfigError> {
        match &self.users_file {
            Some(path) => load_users_file(path),
            None => Ok(HashMap::new()),
        }
    }
}

/// Shape of the users file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UsersFile {
    #[serde(default)]
    users: HashMap<String, String>,
}

/// Reads `users: { <email>: <hash> }` from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::UsersFileRead`] or [`ConfigError::UsersFileParse`].
pub fn load_users_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::UsersFileRead { path: path.to_owned(), source })?;
    let file: UsersFile = serde_yaml::from_str(&contents)
        .map_err(|source| ConfigError::UsersFileParse { path: path.to_owned(), source })?;
    Ok(file.users)
}
