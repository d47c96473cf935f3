// Telemetry
//
// Console logging through tracing-subscriber. Spans are also exported over OTLP
// when OTEL_EXPORTER_OTLP_ENDPOINT is set.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    trace::{SdkTracerProvider, Tracer},
    Resource,
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Service name reported when OTEL_SERVICE_NAME is unset
pub const DEFAULT_SERVICE_NAME: &str = "campus-notify";

/// Filter used when neither RUST_LOG nor LOG_LEVEL is set
pub const DEFAULT_LOG_FILTER: &str = "info";

const EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where logs go and how spans are labelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: Option<String>,
    /// Deployment environment, e.g. "production"
    pub environment: Option<String>,
    /// gRPC collector address; no export when unset
    pub otlp_endpoint: Option<String>,
    /// `EnvFilter` directives, e.g. "campus_notify_core=debug"
    pub log_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: None,
            environment: None,
            otlp_endpoint: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Read `OTEL_SERVICE_NAME`, `OTEL_SERVICE_VERSION`, `OTEL_ENVIRONMENT`,
    /// `OTEL_EXPORTER_OTLP_ENDPOINT` and `RUST_LOG` (or `LOG_LEVEL`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            service_name: lookup("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),
            service_version: lookup("OTEL_SERVICE_VERSION"),
            environment: lookup("OTEL_ENVIRONMENT"),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|e| !e.is_empty()),
            log_filter: lookup("RUST_LOG")
                .or_else(|| lookup("LOG_LEVEL"))
                .unwrap_or(defaults.log_filter),
        }
    }

    /// Replace the service name only if the environment left it at the default
    pub fn or_service_name(mut self, name: &str) -> Self {
        if self.service_name == DEFAULT_SERVICE_NAME {
            self.service_name = name.to_string();
        }
        self
    }

    /// Replace the log filter only if the environment left it at the default
    pub fn or_log_filter(mut self, filter: &str) -> Self {
        if self.log_filter == DEFAULT_LOG_FILTER {
            self.log_filter = filter.to_string();
        }
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.service_version = Some(version.to_string());
        self
    }

    fn resource(&self) -> Resource {
        let mut attributes = vec![KeyValue::new("service.name", self.service_name.clone())];
        if let Some(version) = &self.service_version {
            attributes.push(KeyValue::new("service.version", version.clone()));
        }
        if let Some(environment) = &self.environment {
            attributes.push(KeyValue::new("deployment.environment", environment.clone()));
        }
        Resource::builder().with_attributes(attributes).build()
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Flushes and stops the span exporter when dropped. Hold it until exit.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shut down tracer provider: {e}");
            }
        }
    }
}

/// Install the global subscriber
///
/// A collector that cannot be reached at startup is logged and skipped; console
/// logging still comes up.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(config.env_filter());

    let export = config
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| otlp_tracer(endpoint, &config));

    let (provider, otel_layer, export_error) = match export {
        Some(Ok((provider, tracer))) => (
            Some(provider),
            Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            None,
        ),
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(otel_layer)
        .init();

    match (&config.otlp_endpoint, export_error) {
        (Some(_), Some(e)) => {
            tracing::warn!(error = %e, "OTLP export unavailable, logging to console only")
        }
        (Some(endpoint), None) => tracing::info!(endpoint = %endpoint, "Exporting spans over OTLP"),
        (None, _) => tracing::debug!("OTLP export off"),
    }

    TelemetryGuard { provider }
}

fn otlp_tracer(
    endpoint: &str,
    config: &TelemetryConfig,
) -> Result<(SdkTracerProvider, Tracer), String> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .map_err(|e| e.to_string())?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(config.resource())
        .build();
    let tracer = provider.tracer(config.service_name.clone());

    Ok((provider, tracer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = TelemetryConfig::from_lookup(lookup(&[]));
        assert_eq!(config, TelemetryConfig::default());
        assert_eq!(config.service_name, "campus-notify");
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("OTEL_SERVICE_NAME", "notify-edge"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4317"),
            ("LOG_LEVEL", "warn"),
        ]));
        assert_eq!(config.service_name, "notify-edge");
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4317"));
        assert_eq!(config.log_filter, "warn");

        // RUST_LOG wins over LOG_LEVEL; a blank endpoint means no export
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("RUST_LOG", "debug"),
            ("LOG_LEVEL", "warn"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", ""),
        ]));
        assert_eq!(config.log_filter, "debug");
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_fallbacks_only_replace_defaults() {
        let config = TelemetryConfig::default()
            .or_service_name("campus-notify-control-plane")
            .or_log_filter("campus_notify_core=debug");
        assert_eq!(config.service_name, "campus-notify-control-plane");
        assert_eq!(config.log_filter, "campus_notify_core=debug");

        let config = TelemetryConfig::from_lookup(lookup(&[
            ("OTEL_SERVICE_NAME", "custom"),
            ("RUST_LOG", "trace"),
        ]))
        .or_service_name("campus-notify-control-plane")
        .or_log_filter("campus_notify_core=debug");
        assert_eq!(config.service_name, "custom");
        assert_eq!(config.log_filter, "trace");
    }
}
