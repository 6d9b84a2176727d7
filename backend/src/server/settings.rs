//! Portal settings loaded via OrthoConfig.
//!
//! Values layer CLI flags over `PORTAL_*` environment variables. Session
//! cookie settings are separate; see
//! [`portal::inbound::http::session_config`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use portal::domain::StorageBackend;
use portal::inbound::http::state::DEFAULT_MAX_UPLOAD_BYTES;
use serde::{Deserialize, Deserializer};
use zeroize::Zeroizing;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STORAGE_ROOT: &str = "uploads";
const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:8080/api/v1/shared";
const DEFAULT_WORKER_POLL_MS: u64 = 1_000;

/// Runtime configuration for the portal server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PORTAL")]
pub struct PortalSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; in-memory repositories are used when absent.
    pub database_url: Option<String>,
    /// Redis URL; an in-process store is used when absent.
    pub redis_url: Option<String>,
    /// `local` or `cloudinary`.
    pub storage_backend: Option<String>,
    /// Root directory for local storage.
    pub storage_root: Option<PathBuf>,
    pub cloudinary_cloud_name: Option<String>,
    /// Cloudinary keys are numeric, so the environment layer may hand one
    /// over as an integer.
    #[serde(default, deserialize_with = "string_or_number")]
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,
    /// Largest accepted upload body in bytes.
    pub max_upload_bytes: Option<usize>,
    /// Prefix for share URLs handed to clients.
    pub share_base_url: Option<String>,
    /// Apply the general and strict request limits (default on).
    pub rate_limit_enabled: Option<bool>,
    /// Take client IPs from `X-Forwarded-For` (default off).
    pub trust_proxy: Option<bool>,
    /// Job worker idle delay in milliseconds.
    pub worker_poll_ms: Option<u64>,
    /// Apply pending migrations before serving (default on).
    pub run_migrations: Option<bool>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Signed(n) => n.to_string(),
        Raw::Unsigned(n) => n.to_string(),
    }))
}

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid PORTAL_BIND_ADDR '{value}': {message}")]
    BindAddr { value: String, message: String },
    #[error("invalid PORTAL_STORAGE_BACKEND: {0}")]
    StorageBackend(String),
    #[error("cloudinary storage requires PORTAL_{name}")]
    MissingCloudinary { name: &'static str },
}

/// Cloudinary credentials, checked for presence.
#[derive(Debug, Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: Zeroizing<String>,
}

impl PortalSettings {
    /// Listen address.
    ///
    /// # Errors
    /// Returns [`SettingsError::BindAddr`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: raw.to_owned(),
            message: err.to_string(),
        })
    }

    /// Selected file store, `local` by default.
    ///
    /// # Errors
    /// Returns [`SettingsError::StorageBackend`] for unknown names.
    pub fn storage_backend(&self) -> Result<StorageBackend, SettingsError> {
        self.storage_backend
            .as_deref()
            .map_or(Ok(StorageBackend::Local), StorageBackend::from_str)
            .map_err(SettingsError::StorageBackend)
    }

    /// Root directory for local storage.
    pub fn storage_root(&self) -> PathBuf {
        self.storage_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT))
    }

    /// Cloudinary credentials.
    ///
    /// # Errors
    /// Returns [`SettingsError::MissingCloudinary`] naming the first absent value.
    pub fn cloudinary(&self) -> Result<CloudinaryCredentials, SettingsError> {
        fn required(
            value: Option<&String>,
            name: &'static str,
        ) -> Result<String, SettingsError> {
            value
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .ok_or(SettingsError::MissingCloudinary { name })
        }
        Ok(CloudinaryCredentials {
            cloud_name: required(self.cloudinary_cloud_name.as_ref(), "CLOUDINARY_CLOUD_NAME")?,
            api_key: required(self.cloudinary_api_key.as_ref(), "CLOUDINARY_API_KEY")?,
            api_secret: Zeroizing::new(required(
                self.cloudinary_api_secret.as_ref(),
                "CLOUDINARY_API_SECRET",
            )?),
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Share URL prefix without a trailing slash.
    pub fn share_base_url(&self) -> String {
        self.share_base_url
            .as_deref()
            .unwrap_or(DEFAULT_SHARE_BASE_URL)
            .trim_end_matches('/')
            .to_owned()
    }

    pub fn rate_limit_enabled(&self) -> bool {
        self.rate_limit_enabled.unwrap_or(true)
    }

    pub fn trust_proxy(&self) -> bool {
        self.trust_proxy.unwrap_or(false)
    }

    pub fn run_migrations(&self) -> bool {
        self.run_migrations.unwrap_or(true)
    }

    /// Idle delay between empty queue polls.
    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_ms.unwrap_or(DEFAULT_WORKER_POLL_MS).max(1))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 14] = [
        "PORTAL_BIND_ADDR",
        "PORTAL_DATABASE_URL",
        "PORTAL_REDIS_URL",
        "PORTAL_STORAGE_BACKEND",
        "PORTAL_STORAGE_ROOT",
        "PORTAL_CLOUDINARY_CLOUD_NAME",
        "PORTAL_CLOUDINARY_API_KEY",
        "PORTAL_CLOUDINARY_API_SECRET",
        "PORTAL_MAX_UPLOAD_BYTES",
        "PORTAL_SHARE_BASE_URL",
        "PORTAL_RATE_LIMIT_ENABLED",
        "PORTAL_TRUST_PROXY",
        "PORTAL_WORKER_POLL_MS",
        "PORTAL_RUN_MIGRATIONS",
    ];

    fn cleared(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    fn load_from_empty_args() -> PortalSettings {
        PortalSettings::load_from_iter([OsString::from("portal")]).expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = lock_env(cleared(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default bind addr"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("addr")
        );
        assert!(settings.database_url.is_none());
        assert!(settings.redis_url.is_none());
        assert_eq!(
            settings.storage_backend().expect("default backend"),
            StorageBackend::Local
        );
        assert_eq!(settings.storage_root(), PathBuf::from(DEFAULT_STORAGE_ROOT));
        assert_eq!(settings.max_upload_bytes(), DEFAULT_MAX_UPLOAD_BYTES);
        assert!(settings.rate_limit_enabled());
        assert!(!settings.trust_proxy());
        assert!(settings.run_migrations());
        assert_eq!(settings.worker_poll_interval(), Duration::from_secs(1));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(cleared(&[
            ("PORTAL_BIND_ADDR", "127.0.0.1:9000"),
            ("PORTAL_DATABASE_URL", "postgres://portal@localhost/portal"),
            ("PORTAL_STORAGE_BACKEND", "Cloudinary"),
            ("PORTAL_MAX_UPLOAD_BYTES", "2048"),
            ("PORTAL_SHARE_BASE_URL", "https://portal.example/shared/"),
            ("PORTAL_TRUST_PROXY", "true"),
            ("PORTAL_RATE_LIMIT_ENABLED", "false"),
            ("PORTAL_RUN_MIGRATIONS", "false"),
            ("PORTAL_WORKER_POLL_MS", "250"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr().expect("addr").port(), 9000);
        assert_eq!(
            settings.database_url.as_deref(),
            Some("postgres://portal@localhost/portal")
        );
        assert_eq!(
            settings.storage_backend().expect("backend"),
            StorageBackend::Cloudinary
        );
        assert_eq!(settings.max_upload_bytes(), 2048);
        assert_eq!(settings.share_base_url(), "https://portal.example/shared");
        assert!(settings.trust_proxy());
        assert!(!settings.rate_limit_enabled());
        assert!(!settings.run_migrations());
        assert_eq!(settings.worker_poll_interval(), Duration::from_millis(250));
    }

    #[rstest]
    #[case("PORTAL_BIND_ADDR", "not-an-address")]
    #[case("PORTAL_STORAGE_BACKEND", "s3")]
    fn invalid_values_are_reported(#[case] name: &str, #[case] value: &str) {
        let _guard = lock_env(cleared(&[(name, value)]));

        let settings = load_from_empty_args();
        let failed = settings.bind_addr().is_err() || settings.storage_backend().is_err();
        assert!(failed, "{name}={value} should be rejected");
    }

    #[rstest]
    fn cloudinary_requires_every_credential() {
        let _guard = lock_env(cleared(&[
            ("PORTAL_CLOUDINARY_CLOUD_NAME", "demo"),
            ("PORTAL_CLOUDINARY_API_KEY", "1234"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(settings.cloudinary_api_key.as_deref(), Some("1234"));
        let err = settings.cloudinary().expect_err("secret missing");
        assert!(err.to_string().contains("CLOUDINARY_API_SECRET"));
    }

    #[rstest]
    fn numeric_cloudinary_key_loads_as_text() {
        let _guard = lock_env(cleared(&[
            ("PORTAL_STORAGE_BACKEND", "cloudinary"),
            ("PORTAL_CLOUDINARY_CLOUD_NAME", "demo"),
            ("PORTAL_CLOUDINARY_API_KEY", "873249871234567"),
            ("PORTAL_CLOUDINARY_API_SECRET", "shh"),
        ]));

        let settings = load_from_empty_args();
        let credentials = settings.cloudinary().expect("complete credentials");
        assert_eq!(credentials.api_key, "873249871234567");
        assert_eq!(credentials.cloud_name, "demo");
    }
}
