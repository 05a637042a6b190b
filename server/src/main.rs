use anyhow::{Context, Result};
use clap::Parser;
use lotto_execution::SettlementConfig;
use lotto_server::{Api, SeedFile, Server, ServerConfig};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() -> Result<()> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .and_then(|value| {
            let trimmed = value.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        });

    if let Some(endpoint) = endpoint {
        let service_name =
            std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "lotto-server".to_string());
        let rate = std::env::var("OTEL_SAMPLING_RATE")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .map(|value| value.clamp(0.0, 1.0))
            .unwrap_or(1.0);
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()
            .context("failed to build OTLP exporter")?;
        let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(rate))
            .with_resource(
                opentelemetry_sdk::Resource::builder_empty()
                    .with_attributes([opentelemetry::KeyValue::new("service.name", service_name)])
                    .build(),
            )
            .with_batch_exporter(exporter)
            .build();
        let tracer = tracer_provider.tracer("lotto-server");
        opentelemetry::global::set_tracer_provider(tracer_provider);

        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_filter(LevelFilter::INFO))
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// YAML file of lottery types, users and rounds to create at startup.
    #[arg(long)]
    seed_file: Option<PathBuf>,

    /// Upper bound on one settlement, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    settlement_timeout_ms: u64,

    /// Reject result submissions for rounds that are already completed.
    #[arg(long)]
    disallow_resettlement: bool,

    /// Period of the auto-close check in milliseconds (0 disables auto-close).
    #[arg(long, default_value_t = 1_000)]
    round_tick_ms: u64,

    /// HTTP rate limit per IP in requests per second (0 disables rate limiting).
    #[arg(long)]
    http_rate_limit_per_second: Option<u64>,

    /// HTTP rate limit burst size (0 disables rate limiting).
    #[arg(long)]
    http_rate_limit_burst: Option<u32>,

    /// Max request body size in bytes (0 disables limit).
    #[arg(long)]
    http_body_limit_bytes: Option<usize>,
}

fn is_production() -> bool {
    matches!(
        std::env::var("NODE_ENV").as_deref(),
        Ok("production") | Ok("prod")
    )
}

/// Maps an optional arg value to Option: 0 => None, Some(v) => Some(v), None => default
fn map_optional_limit<T: Copy + PartialEq + From<u8>>(
    arg: Option<T>,
    default: Option<T>,
) -> Option<T> {
    match arg {
        Some(v) if v == T::from(0) => None,
        Some(v) => Some(v),
        None => default,
    }
}

fn parse_env<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_allow_no_origin(var: &str) -> Option<bool> {
    match std::env::var(var).ok()?.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

fn build_config(args: &Args) -> Result<ServerConfig> {
    let defaults = ServerConfig::default();
    if args.settlement_timeout_ms == 0 {
        anyhow::bail!("settlement_timeout_ms must be > 0");
    }

    // Environment overrides flags for rate limiting.
    let http_rate_limit_per_second = parse_env("RATE_LIMIT_HTTP_PER_SEC")
        .or(args.http_rate_limit_per_second);
    let http_rate_limit_burst = parse_env("RATE_LIMIT_HTTP_BURST").or(args.http_rate_limit_burst);

    Ok(ServerConfig {
        settlement: SettlementConfig {
            timeout: Duration::from_millis(args.settlement_timeout_ms),
            allow_resettlement: !args.disallow_resettlement,
        },
        round_tick: (args.round_tick_ms > 0).then(|| Duration::from_millis(args.round_tick_ms)),
        http_rate_limit_per_second: map_optional_limit(
            http_rate_limit_per_second,
            defaults.http_rate_limit_per_second,
        ),
        http_rate_limit_burst: map_optional_limit(
            http_rate_limit_burst,
            defaults.http_rate_limit_burst,
        ),
        http_body_limit_bytes: map_optional_limit(
            args.http_body_limit_bytes,
            defaults.http_body_limit_bytes,
        ),
        allowed_origins: non_empty_env("ALLOWED_HTTP_ORIGINS")
            .map(|raw| raw.split(',').map(|origin| origin.trim().to_string()).collect())
            .unwrap_or_default(),
        allow_no_origin: parse_allow_no_origin("ALLOW_HTTP_NO_ORIGIN")
            .unwrap_or(!is_production()),
        admin_token: non_empty_env("ADMIN_AUTH_TOKEN"),
        metrics_token: non_empty_env("METRICS_AUTH_TOKEN"),
    })
}

fn require_env(var: &str) -> Result<String> {
    let value = std::env::var(var).unwrap_or_default();
    if value.trim().is_empty() {
        anyhow::bail!("Missing required env: {var}");
    }
    Ok(value)
}

fn ensure_production_env() -> Result<()> {
    if !is_production() {
        return Ok(());
    }

    require_env("ADMIN_AUTH_TOKEN")?;
    require_env("ALLOWED_HTTP_ORIGINS")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing()?;
    ensure_production_env()?;

    let config = build_config(&args)?;
    let round_tick = config.round_tick;
    let server = Arc::new(Server::new(config));

    if let Some(path) = &args.seed_file {
        let seed = SeedFile::load(path)?;
        let mut store = server.store().write().await;
        let summary = seed
            .apply(&mut *store, chrono::Utc::now())
            .await
            .with_context(|| format!("failed to apply seed file {}", path.display()))?;
        info!(
            lottery_types = summary.lottery_types,
            users = summary.users,
            rounds = summary.rounds,
            "seed loaded"
        );
    }

    let _ticker = round_tick.map(|period| server.spawn_round_ticker(period));

    let app = Api::new(server).router();
    let addr = SocketAddr::new(args.host, args.port);
    info!(?addr, "starting lotto server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
