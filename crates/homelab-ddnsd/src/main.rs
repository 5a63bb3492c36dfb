// # homelab-ddnsd - Homelab DDNS Daemon
//
// This is a THIN integration layer: all reconciliation logic lives in
// homelab-ddns-core. The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building the IP source and DNS provider
// 4. Running the reconciler until SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### DNS Provider
// - `DDNS_PROVIDER_BASE_URL`: API base URL (required)
// - `DDNS_PROVIDER_API_TOKEN`: API token (optional, default empty)
// - `DDNS_PROVIDER_ZONE_ID`: Zone ID (optional, default empty)
//
// ### IP Source
// - `DDNS_IP_SOURCE_URL`: Plain-text IP endpoint (default https://api.ipify.org)
//
// ### Reconciler
// - `DDNS_POLL_INTERVAL_SECS`: Delay between iterations (default 300)
// - `DDNS_HTTP_TIMEOUT_SECS`: Per-request timeout (default 30)
// - `DDNS_RECORD_LABEL`: Managed record label (default homelab)
// - `DDNS_MODE`: `live` (default) or `dry-run`
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export DDNS_PROVIDER_BASE_URL=https://api.cloudflare.com/client/v4
// export DDNS_PROVIDER_API_TOKEN=your_token
// export DDNS_PROVIDER_ZONE_ID=023e105f4ecef8ad9ca31a8372d0c353
// export DDNS_POLL_INTERVAL_SECS=300
//
// homelab-ddnsd
// ```

use anyhow::Result;
use homelab_ddns_cloudflare::CloudflareProvider;
use homelab_ddns_core::config::{
    DEFAULT_IP_SOURCE_URL, DEFAULT_RECORD_COMMENT, DEFAULT_RECORD_LABEL, HttpConfig,
    IpSourceConfig, ProviderConfig, ReconcilerConfig, RecordConfig,
};
use homelab_ddns_core::Reconciler;
use homelab_ddns_ip_http::HttpIpSource;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Name the daemon is installed under (systemd unit, logs)
const SERVICE_NAME: &str = "homelab-ddns";

/// How long the reconciler may take to wind down after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    provider_base_url: String,
    provider_api_token: String,
    provider_zone_id: String,
    ip_source_url: String,
    poll_interval_secs: u64,
    http_timeout_secs: u64,
    record_label: String,
    dry_run: bool,
    log_level: String,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("provider_base_url", &self.provider_base_url)
            .field("provider_api_token", &"<REDACTED>")
            .field("provider_zone_id", &self.provider_zone_id)
            .field("ip_source_url", &self.ip_source_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("record_label", &self.record_label)
            .field("dry_run", &self.dry_run)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mode = lookup("DDNS_MODE").unwrap_or_else(|| "live".to_string());
        let dry_run = match mode.to_lowercase().as_str() {
            "live" => false,
            "dry-run" => true,
            other => anyhow::bail!(
                "DDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        Ok(Self {
            provider_base_url: lookup("DDNS_PROVIDER_BASE_URL").ok_or_else(|| {
                anyhow::anyhow!(
                    "DDNS_PROVIDER_BASE_URL is required. \
                    Set it via: export DDNS_PROVIDER_BASE_URL=https://api.cloudflare.com/client/v4"
                )
            })?,
            provider_api_token: lookup("DDNS_PROVIDER_API_TOKEN").unwrap_or_default(),
            provider_zone_id: lookup("DDNS_PROVIDER_ZONE_ID").unwrap_or_default(),
            ip_source_url: lookup("DDNS_IP_SOURCE_URL")
                .unwrap_or_else(|| DEFAULT_IP_SOURCE_URL.to_string()),
            poll_interval_secs: parse_var(&lookup, "DDNS_POLL_INTERVAL_SECS", 300)?,
            http_timeout_secs: parse_var(&lookup, "DDNS_HTTP_TIMEOUT_SECS", 30)?,
            record_label: lookup("DDNS_RECORD_LABEL")
                .unwrap_or_else(|| DEFAULT_RECORD_LABEL.to_string()),
            dry_run,
            log_level: lookup("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This checks:
    /// - URL presence and scheme
    /// - Numeric ranges
    /// - Record label format
    /// - Obvious placeholder tokens
    fn validate(&self) -> Result<()> {
        validate_url("DDNS_PROVIDER_BASE_URL", &self.provider_base_url)?;
        validate_url("DDNS_IP_SOURCE_URL", &self.ip_source_url)?;

        // An empty token is allowed (anonymous providers), a template value is not
        let token_lower = self.provider_api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower == "token"
        {
            anyhow::bail!(
                "DDNS_PROVIDER_API_TOKEN appears to be a placeholder. \
                Use an actual API token from your DNS provider."
            );
        }

        if self.poll_interval_secs == 0 {
            anyhow::bail!("DDNS_POLL_INTERVAL_SECS must be greater than 0");
        }

        if !(1..=300).contains(&self.http_timeout_secs) {
            anyhow::bail!(
                "DDNS_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.http_timeout_secs
            );
        }

        validate_record_label(&self.record_label)?;

        // Validate log level
        parse_log_level(&self.log_level)?;

        Ok(())
    }

    /// Build the library configuration
    fn to_reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            poll_interval_secs: self.poll_interval_secs,
            provider: ProviderConfig::new(
                self.provider_base_url.clone(),
                self.provider_api_token.clone(),
                self.provider_zone_id.clone(),
            ),
            ip_source: IpSourceConfig {
                url: self.ip_source_url.clone(),
            },
            record: RecordConfig {
                label: self.record_label.clone(),
                comment: DEFAULT_RECORD_COMMENT.to_string(),
            },
            http: HttpConfig {
                request_timeout_secs: self.http_timeout_secs,
            },
        }
    }
}

/// Parse an optional numeric variable; present but malformed is an error
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a number. Got '{}': {}", key, raw, e)),
    }
}

fn validate_url(key: &str, url: &str) -> Result<()> {
    if url.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", key);
    }

    if !url.starts_with("https://") && !url.starts_with("http://") {
        anyhow::bail!("{} must use HTTP or HTTPS scheme. Got: {}", key, url);
    }

    if url.starts_with("http://") {
        eprintln!(
            "WARNING: {} uses HTTP (not HTTPS). \
                  This is less secure. Consider using HTTPS.",
            key
        );
    }

    Ok(())
}

/// Validate the record label (a name prefix, so dotted names are accepted)
///
/// Basic RFC 1035 label checks; not comprehensive but catches common errors.
fn validate_record_label(label: &str) -> Result<()> {
    if label.is_empty() {
        anyhow::bail!("DDNS_RECORD_LABEL cannot be empty");
    }

    if label.len() > 253 {
        anyhow::bail!(
            "DDNS_RECORD_LABEL too long: {} chars (max 253). Got: {}",
            label.len(),
            label
        );
    }

    for part in label.split('.') {
        if part.is_empty() {
            anyhow::bail!("DDNS_RECORD_LABEL has empty label: '{}'", label);
        }

        if part.len() > 63 {
            anyhow::bail!(
                "Label too long: {} chars (max 63). Label: '{}'",
                part.len(),
                part
            );
        }

        if !part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                part
            );
        }

        if part.starts_with('-') || part.ends_with('-') {
            anyhow::bail!("Label cannot start or end with hyphen. Label: '{}'", part);
        }
    }

    Ok(())
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting {} daemon", SERVICE_NAME);

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> DdnsExitCode {
    let reconciler_config = config.to_reconciler_config();

    let reconciler = match build_reconciler(&reconciler_config, config.dry_run) {
        Ok(reconciler) => reconciler,
        Err(e) => {
            error!("Startup error: {}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    info!(
        "Managing record '{}' in zone '{}' every {}s",
        reconciler_config.record.label,
        reconciler_config.provider.zone_id,
        reconciler_config.poll_interval_secs
    );

    let cancel = CancellationToken::new();
    let mut handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { reconciler.run(cancel).await }
    });

    tokio::select! {
        signal = wait_for_shutdown_signal() => match signal {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Shutdown error: {}", e),
        },
        result = &mut handle => {
            error!("Reconciler exited unexpectedly: {:?}", result);
            return DdnsExitCode::RuntimeError;
        }
    }

    info!("Shutting down daemon");
    cancel.cancel();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
        Ok(Ok(())) => DdnsExitCode::CleanShutdown,
        Ok(Err(e)) => {
            error!("Reconciler task failed: {}", e);
            DdnsExitCode::RuntimeError
        }
        Err(_) => {
            error!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT);
            DdnsExitCode::RuntimeError
        }
    }
}

/// Wire the HTTP IP source and the provider into a reconciler
fn build_reconciler(config: &ReconcilerConfig, dry_run: bool) -> Result<Reconciler> {
    let ip_source = HttpIpSource::from_config(&config.ip_source, &config.http)?;
    let provider = CloudflareProvider::from_config(&config.provider, &config.http, dry_run)?;

    Ok(Reconciler::new(
        Box::new(ip_source),
        Box::new(provider),
        config,
    )?)
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const BASE: (&str, &str) = (
        "DDNS_PROVIDER_BASE_URL",
        "https://api.cloudflare.com/client/v4",
    );

    #[test]
    fn base_url_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("DDNS_PROVIDER_BASE_URL"));
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[BASE]).unwrap();
        config.validate().unwrap();

        assert_eq!(config.provider_api_token, "");
        assert_eq!(config.provider_zone_id, "");
        assert_eq!(config.poll_interval_secs, 300);
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.record_label, "homelab");
        assert_eq!(config.ip_source_url, DEFAULT_IP_SOURCE_URL);
        assert!(!config.dry_run);
    }

    #[test]
    fn malformed_number_is_an_error() {
        let err = load(&[BASE, ("DDNS_POLL_INTERVAL_SECS", "five")]).unwrap_err();
        assert!(err.to_string().contains("DDNS_POLL_INTERVAL_SECS"));
    }

    #[test]
    fn zero_interval_fails_validation() {
        let config = load(&[BASE, ("DDNS_POLL_INTERVAL_SECS", "0")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn dry_run_mode_is_parsed() {
        let config = load(&[BASE, ("DDNS_MODE", "DRY-RUN")]).unwrap();
        assert!(config.dry_run);

        assert!(load(&[BASE, ("DDNS_MODE", "sometimes")]).is_err());
    }

    #[test]
    fn rejects_bad_scheme_and_placeholder_token() {
        let config = load(&[("DDNS_PROVIDER_BASE_URL", "ftp://dns.example.test")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[BASE, ("DDNS_PROVIDER_API_TOKEN", "your_token")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validates_record_label() {
        assert!(validate_record_label("homelab").is_ok());
        assert!(validate_record_label("homelab.example.com").is_ok());
        assert!(validate_record_label("-homelab").is_err());
        assert!(validate_record_label("home lab").is_err());
        assert!(validate_record_label("").is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let config = load(&[BASE, ("DDNS_LOG_LEVEL", "verbose")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn maps_to_reconciler_config() {
        let config = load(&[
            BASE,
            ("DDNS_PROVIDER_API_TOKEN", "cf-abcdef"),
            ("DDNS_PROVIDER_ZONE_ID", "zone-9"),
            ("DDNS_POLL_INTERVAL_SECS", "120"),
        ])
        .unwrap();

        let reconciler_config = config.to_reconciler_config();
        reconciler_config.validate().unwrap();
        assert_eq!(reconciler_config.poll_interval(), Duration::from_secs(120));
        assert_eq!(reconciler_config.provider.zone_id, "zone-9");
        assert_eq!(reconciler_config.provider.api_token, "cf-abcdef");
        assert_eq!(reconciler_config.record.comment, "Homelab DNS Record");
    }

    #[test]
    fn debug_output_hides_token() {
        let config = load(&[BASE, ("DDNS_PROVIDER_API_TOKEN", "cf-very-secret")]).unwrap();
        assert!(!format!("{:?}", config).contains("cf-very-secret"));
    }

    #[tokio::test]
    async fn builds_reconciler_from_valid_config() {
        let config = load(&[BASE, ("DDNS_PROVIDER_ZONE_ID", "zone-9")]).unwrap();
        assert!(build_reconciler(&config.to_reconciler_config(), true).is_ok());
    }
}
