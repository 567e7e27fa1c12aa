//! Configuration types for ridb-dl

use crate::enrichment::FieldMapping;
use crate::error::{Error, Result};
use crate::filter::RecordFilter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Environment variable holding the RIDB API key
pub const API_KEY_ENV: &str = "REC_RIDB_API_KEY";

/// Fallback environment variable for the API key
pub const API_KEY_FALLBACK_ENV: &str = "API_KEY";

/// Environment variable pointing at a JSON configuration file
pub const CONFIG_FILE_ENV: &str = "RIDB_CONFIG";

/// Remote API settings (endpoints, credentials, response layout)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root (default: "https://ridb.recreation.gov/api/v1")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the paginated campsite collection under `base_url`
    #[serde(default = "default_campsites_path")]
    pub campsites_path: String,

    /// Path of the facility collection under `base_url`
    #[serde(default = "default_facilities_path")]
    pub facilities_path: String,

    /// API key sent with every request (None = header omitted)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Header carrying the API key (default: "apikey")
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Name of the list field holding items in a page response (default: "RECDATA")
    #[serde(default = "default_records_key")]
    pub records_key: String,

    /// Per-request timeout (None = client default)
    #[serde(default, with = "optional_duration_serde")]
    pub timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            campsites_path: default_campsites_path(),
            facilities_path: default_facilities_path(),
            api_key: None,
            api_key_header: default_api_key_header(),
            records_key: default_records_key(),
            timeout: None,
        }
    }
}

impl ApiConfig {
    /// URL of the paginated campsite collection
    pub fn campsites_url(&self) -> Result<Url> {
        self.endpoint(&self.campsites_path, None)
    }

    /// URL of a single facility
    pub fn facility_url(&self, facility_id: &str) -> Result<Url> {
        self.endpoint(&self.facilities_path, Some(facility_id))
    }

    fn endpoint(&self, collection: &str, item: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::config("api.base_url", format!("{}: {}", self.base_url, e)))?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                Error::config("api.base_url", format!("{} cannot be a base", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(collection.split('/').filter(|p| !p.is_empty()));
            if let Some(item) = item {
                path.push(item);
            }
        }
        Ok(url)
    }
}

/// Cursor settings for the paginated fetch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Items requested per page (default: 50)
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// `limit` used by the total-count probe request (default: 1)
    #[serde(default = "default_probe_limit")]
    pub probe_limit: u64,

    /// Stop after this many items even if the server reports more (None = all)
    #[serde(default)]
    pub max_records: Option<u64>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            probe_limit: default_probe_limit(),
            max_records: None,
        }
    }
}

/// Retry configuration for transient HTTP failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first request (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 120 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,

    /// HTTP statuses treated as transient (default: 429, 502, 503, 504)
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
            retry_statuses: default_retry_statuses(),
        }
    }
}

impl RetryConfig {
    /// Whether an HTTP status should be retried
    pub fn is_transient_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

/// What to do when a facility lookup fails after retries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentErrorPolicy {
    /// Abort the run (default)
    #[default]
    Abort,
    /// Log the facility id and continue without that record
    Skip,
}

/// Enrichment (facility join) settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Facility lookups allowed in flight per page (default: 1)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Failure handling for facility lookups
    #[serde(default)]
    pub on_error: EnrichmentErrorPolicy,

    /// Columns copied from the facility and its first organization
    #[serde(default = "FieldMapping::facility_defaults")]
    pub fields: Vec<FieldMapping>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            on_error: EnrichmentErrorPolicy::default(),
            fields: FieldMapping::facility_defaults(),
        }
    }
}

/// CSV output settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the CSV is written to (default: ".")
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Fixed file name; when unset a `<source_tag>_<timestamp>.csv` name is used
    #[serde(default)]
    pub file_name: Option<String>,

    /// Prefix for generated file names (default: "REC_RIDB")
    #[serde(default = "default_source_tag")]
    pub source_tag: String,

    /// Echo the CSV to stdout for small result sets
    #[serde(default)]
    pub stdout_preview: bool,

    /// Largest result set echoed by `stdout_preview` (default: 200)
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_name: None,
            source_tag: default_source_tag(),
            stdout_preview: false,
            preview_limit: default_preview_limit(),
        }
    }
}

impl OutputConfig {
    /// Path of the CSV for a run started at `now`
    pub fn output_path(&self, now: chrono::DateTime<chrono::Local>) -> PathBuf {
        let name = match &self.file_name {
            Some(name) => name.clone(),
            None => format!("{}_{}.csv", self.source_tag, now.format("%Y%m%dT%H%M%S")),
        };
        self.dir.join(name)
    }
}

/// Main configuration for a fetch run
///
/// Fields are organized into sub-configs:
/// - [`api`](ApiConfig): endpoints, key, response layout
/// - [`pagination`](PaginationConfig): page size and record cap
/// - [`retry`](RetryConfig): transient failure policy
/// - [`filter`](RecordFilter): campsite acceptance clauses
/// - [`enrichment`](EnrichmentConfig): facility join
/// - [`output`](OutputConfig): CSV destination
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Pagination settings
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Campsite acceptance clauses
    #[serde(default)]
    pub filter: RecordFilter,

    /// Facility join settings
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// CSV output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Build the configuration from the process environment
    ///
    /// Loads `.env` if present, then a JSON file named by `RIDB_CONFIG` (if set),
    /// then applies the individual `RIDB_*` / API key overrides.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(&PathBuf::from(path))?,
            None => Self::default(),
        };

        if let Some(key) = lookup(API_KEY_ENV).or_else(|| lookup(API_KEY_FALLBACK_ENV)) {
            config.api.api_key = Some(key);
        }
        if let Some(url) = lookup("RIDB_BASE_URL") {
            config.api.base_url = url;
        }
        if let Some(size) = lookup("RIDB_PAGE_SIZE") {
            config.pagination.page_size = parse_var("RIDB_PAGE_SIZE", &size)?;
        }
        if let Some(max) = lookup("RIDB_MAX_RECORDS") {
            config.pagination.max_records = Some(parse_var("RIDB_MAX_RECORDS", &max)?);
        }
        if let Some(n) = lookup("RIDB_CONCURRENCY") {
            config.enrichment.concurrency = parse_var("RIDB_CONCURRENCY", &n)?;
        }
        if let Some(dir) = lookup("RIDB_OUTPUT_DIR") {
            config.output.dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup("RIDB_OUTPUT_FILE") {
            config.output.file_name = Some(name);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file; missing sections take their defaults
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(CONFIG_FILE_ENV, format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            Error::config(CONFIG_FILE_ENV, format!("invalid {}: {}", path.display(), e))
        })
    }

    /// Reject settings that would make a run loop forever or never start
    pub fn validate(&self) -> Result<()> {
        if self.pagination.page_size == 0 {
            return Err(Error::config(
                "pagination.page_size",
                "page size must be greater than zero",
            ));
        }
        if self.pagination.probe_limit == 0 {
            return Err(Error::config(
                "pagination.probe_limit",
                "probe limit must be greater than zero",
            ));
        }
        if self.enrichment.concurrency == 0 {
            return Err(Error::config(
                "enrichment.concurrency",
                "concurrency must be greater than zero",
            ));
        }
        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "backoff multiplier must be a finite number of at least 1.0",
            ));
        }
        self.api.campsites_url()?;
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::config(name, format!("invalid value {value:?}: {e}")))
}

fn default_base_url() -> String {
    "https://ridb.recreation.gov/api/v1".to_string()
}

fn default_campsites_path() -> String {
    "campsites".to_string()
}

fn default_facilities_path() -> String {
    "facilities".to_string()
}

fn default_api_key_header() -> String {
    "apikey".to_string()
}

fn default_records_key() -> String {
    "RECDATA".to_string()
}

fn default_page_size() -> u64 {
    50
}

fn default_probe_limit() -> u64 {
    1
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(120)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_retry_statuses() -> Vec<u16> {
    vec![429, 502, 503, 504]
}

fn default_concurrency() -> usize {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_source_tag() -> String {
    "REC_RIDB".to_string()
}

fn default_preview_limit() -> usize {
    200
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_ridb_script_constants() {
        let config = Config::default();

        assert_eq!(config.api.base_url, "https://ridb.recreation.gov/api/v1");
        assert_eq!(config.api.records_key, "RECDATA");
        assert_eq!(config.pagination.page_size, 50);
        assert_eq!(config.pagination.probe_limit, 1);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_secs(1));
        assert_eq!(config.retry.retry_statuses, vec![429, 502, 503, 504]);
        assert_eq!(config.enrichment.concurrency, 1);
        assert_eq!(config.output.source_tag, "REC_RIDB");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn endpoint_urls_are_built_from_the_base() {
        let api = ApiConfig {
            base_url: "http://127.0.0.1:9000/api/v1/".to_string(),
            ..ApiConfig::default()
        };

        assert_eq!(
            api.campsites_url().unwrap().as_str(),
            "http://127.0.0.1:9000/api/v1/campsites"
        );
        assert_eq!(
            api.facility_url("233359").unwrap().as_str(),
            "http://127.0.0.1:9000/api/v1/facilities/233359"
        );
    }

    #[test]
    fn facility_ids_are_path_escaped() {
        let api = ApiConfig::default();
        let url = api.facility_url("a/b c").unwrap();
        assert!(
            url.as_str().ends_with("/facilities/a%2Fb%20c"),
            "unexpected url {url}"
        );
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("REC_RIDB_API_KEY", "secret"),
            ("RIDB_BASE_URL", "http://localhost:8080"),
            ("RIDB_PAGE_SIZE", "25"),
            ("RIDB_MAX_RECORDS", "200"),
            ("RIDB_CONCURRENCY", "4"),
            ("RIDB_OUTPUT_FILE", "RV_Sites.csv"),
        ]))
        .unwrap();

        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.pagination.page_size, 25);
        assert_eq!(config.pagination.max_records, Some(200));
        assert_eq!(config.enrichment.concurrency, 4);
        assert_eq!(config.output.file_name.as_deref(), Some("RV_Sites.csv"));
    }

    #[test]
    fn api_key_falls_back_to_generic_variable() {
        let config = Config::from_lookup(lookup_from(&[("API_KEY", "fallback")])).unwrap();
        assert_eq!(config.api.api_key.as_deref(), Some("fallback"));

        let config = Config::from_lookup(lookup_from(&[
            ("API_KEY", "fallback"),
            ("REC_RIDB_API_KEY", "primary"),
        ]))
        .unwrap();
        assert_eq!(config.api.api_key.as_deref(), Some("primary"));
    }

    #[test]
    fn invalid_env_values_are_rejected_with_their_key() {
        let err = Config::from_lookup(lookup_from(&[("RIDB_PAGE_SIZE", "fifty")])).unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("RIDB_PAGE_SIZE")),
            other => panic!("expected Config error, got {other:?}"),
        }

        let err = Config::from_lookup(lookup_from(&[("RIDB_PAGE_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = Config::from_lookup(lookup_from(&[("RIDB_BASE_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut config = Config::default();
        config.enrichment.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_finite_backoff_multiplier_is_rejected() {
        for multiplier in [f64::NAN, f64::INFINITY, 0.5] {
            let mut config = Config::default();
            config.retry.backoff_multiplier = multiplier;
            assert!(
                matches!(config.validate(), Err(Error::Config { .. })),
                "multiplier {multiplier}"
            );
        }
    }

    #[test]
    fn config_file_sections_default_independently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ridb.json");
        std::fs::write(
            &path,
            r#"{"pagination": {"page_size": 10}, "retry": {"max_delay": 30}}"#,
        )
        .unwrap();

        let config = Config::from_lookup(lookup_from(&[(
            "RIDB_CONFIG",
            path.to_str().unwrap(),
        )]))
        .unwrap();

        assert_eq!(config.pagination.page_size, 10);
        assert_eq!(config.pagination.probe_limit, 1);
        assert_eq!(config.retry.max_delay, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.filter.clauses.len(), 5);
        assert!(!config.enrichment.fields.is_empty());
    }

    #[test]
    fn api_key_is_never_serialized() {
        let mut config = Config::default();
        config.api.api_key = Some("secret".to_string());

        let json = serde_json::to_string(&config).expect("serialize failed");
        assert!(!json.contains("secret"));
    }

    #[test]
    fn duration_serde_serializes_as_seconds() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(120),
            ..RetryConfig::default()
        };

        let json = serde_json::to_value(&config).expect("serialize failed");
        assert_eq!(json["initial_delay"], 5);
        assert_eq!(json["max_delay"], 120);
    }

    #[test]
    fn generated_file_name_embeds_tag_and_timestamp() {
        use chrono::TimeZone;

        let output = OutputConfig {
            dir: PathBuf::from("/tmp/out"),
            ..OutputConfig::default()
        };
        let now = chrono::Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .unwrap();

        assert_eq!(
            output.output_path(now),
            PathBuf::from("/tmp/out/REC_RIDB_20240309T140507.csv")
        );

        let fixed = OutputConfig {
            file_name: Some("RV_Sites.csv".to_string()),
            ..OutputConfig::default()
        };
        assert_eq!(fixed.output_path(now), PathBuf::from("./RV_Sites.csv"));
    }

    #[test]
    fn transient_statuses_follow_configuration() {
        let mut retry = RetryConfig::default();
        assert!(retry.is_transient_status(503));
        assert!(!retry.is_transient_status(403));

        retry.retry_statuses.push(403);
        assert!(retry.is_transient_status(403));
    }
}
