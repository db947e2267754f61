//! Logging and optional trace export.
//!
//! Events always go to stderr through `tracing-subscriber`. When
//! `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans (login, store lookups, HTTP
//! requests) are also exported to an OTLP collector over gRPC.

use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use opentelemetry::{
    KeyValue, global, propagation::TextMapCompositePropagator, trace::TracerProvider as _,
};
use opentelemetry_otlp::{Compression, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
};
use std::{env, time::Duration};
use tonic::{
    metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{Level, debug, warn};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;
use url::Url;

const ENV_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const ENV_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
const ENV_INSTANCE_ID: &str = "OTEL_SERVICE_INSTANCE_ID";

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

// Capped regardless of RUST_LOG or -v.
const QUIET_TARGETS: [&str; 6] = [
    "hyper=error",
    "h2=error",
    "tokio=error",
    "tower=warn",
    "sqlx=warn",
    "opentelemetry_sdk=warn",
];

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Collector endpoint and the gRPC metadata sent with every export.
#[derive(Debug)]
struct OtlpSettings {
    endpoint: Url,
    metadata: MetadataMap,
}

impl OtlpSettings {
    /// `None` when no collector endpoint is configured.
    fn from_env() -> Result<Option<Self>> {
        let Ok(endpoint) = env::var(ENV_ENDPOINT) else {
            return Ok(None);
        };
        let headers = env::var(ENV_HEADERS).unwrap_or_default();

        Ok(Some(Self {
            endpoint: parse_endpoint(&endpoint)?,
            metadata: parse_metadata(&headers)?,
        }))
    }

    fn tls_config(&self) -> Option<ClientTlsConfig> {
        if self.endpoint.scheme() != "https" {
            return None;
        }
        self.endpoint
            .host_str()
            .map(|host| ClientTlsConfig::new().domain_name(host).with_native_roots())
    }
}

/// Parse the collector endpoint, assuming `https` when no scheme is given.
fn parse_endpoint(raw: &str) -> Result<Url> {
    let raw = raw.trim().trim_end_matches('/');
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let url = Url::parse(&with_scheme).with_context(|| format!("invalid {ENV_ENDPOINT}: {raw}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => bail!("unsupported {ENV_ENDPOINT} scheme: {other}"),
    }
}

/// Parse `key=value,key=value` into ASCII gRPC metadata.
///
/// Entries without `=` are skipped. Binary (`-bin`) keys are rejected.
fn parse_metadata(headers: &str) -> Result<MetadataMap> {
    let mut metadata = MetadataMap::new();

    for (key, value) in headers.split(',').filter_map(|pair| pair.split_once('=')) {
        let key = key.trim().to_ascii_lowercase();
        if key.ends_with("-bin") {
            bail!("binary metadata key {key} is not supported");
        }

        let name = MetadataKey::<Ascii>::from_bytes(key.as_bytes())
            .with_context(|| format!("invalid metadata key {key}"))?;
        let value = value
            .trim()
            .parse::<MetadataValue<Ascii>>()
            .with_context(|| format!("invalid metadata value for {key}"))?;
        metadata.insert(name, value);
    }

    Ok(metadata)
}

fn resource() -> Resource {
    let instance_id = env::var(ENV_INSTANCE_ID).unwrap_or_else(|_| Ulid::new().to_string());

    Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", instance_id),
            KeyValue::new("vcs.ref.head.revision", crate::GIT_COMMIT_HASH),
        ])
        .build()
}

fn install_tracer(settings: OtlpSettings) -> Result<Tracer> {
    let tls = settings.tls_config();

    let mut builder = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(settings.endpoint.as_str().trim_end_matches('/'))
        .with_compression(Compression::Gzip)
        .with_timeout(EXPORT_TIMEOUT)
        .with_metadata(settings.metadata);
    if let Some(tls) = tls {
        builder = builder.with_tls_config(tls);
    }

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(builder.build().context("failed to build OTLP exporter")?)
        .with_resource(resource())
        .build();

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
    let _ = TRACER_PROVIDER.set(provider);

    Ok(tracer)
}

fn env_filter(level: Level) -> Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    for directive in QUIET_TARGETS {
        filter = filter.add_directive(directive.parse()?);
    }

    Ok(filter)
}

/// Install the global subscriber; `None` logs errors only.
///
/// # Errors
///
/// Returns an error if the OTLP settings are invalid or a subscriber is already set.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let filter = env_filter(verbosity_level.unwrap_or(Level::ERROR))?;

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .pretty();

    let otel_layer = match OtlpSettings::from_env()? {
        Some(settings) => {
            let endpoint = settings.endpoint.to_string();
            let tracer = install_tracer(settings)?;
            Some((endpoint, tracing_opentelemetry::layer().with_tracer(tracer)))
        }
        None => None,
    };
    let (endpoint, otel_layer) = otel_layer.unzip();

    let subscriber = Registry::default()
        .with(fmt_layer)
        .with(otel_layer)
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(endpoint) = endpoint {
        debug!("exporting spans to {endpoint}");
    }

    Ok(())
}

/// Flush pending spans; does nothing when export is off.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(err) = provider.shutdown() {
            warn!("failed to flush spans: {err}");
        }
    }
}
