use std::{net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use {
    anyhow::Context,
    clap::Parser,
    sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    zapgate_config::ZapgateConfig,
    zapgate_dedup::{DedupStore, EventDeduplicator, SqliteDedupStore},
    zapgate_gateway::AppState,
    zapgate_identity::{HttpTenantDirectory, IdentityLinker, SqlitePrincipalStore, TenantDirectory},
    zapgate_mcp::{ToolCaller, ToolSession},
    zapgate_pipeline::GenerateAndDeployPipeline,
    zapgate_whatsapp::ReplyDispatcher,
};

#[derive(Parser)]
#[command(name = "zapgate", about = "WhatsApp webhook gateway for MCP-backed code generation")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Path to the config file (defaults to ./zapgate.toml).
    #[arg(long, env = "ZAPGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long)]
    port: Option<u16>,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

async fn open_pool(config: &ZapgateConfig) -> anyhow::Result<SqlitePool> {
    match config.dedup.database_url {
        Some(ref url) => {
            let options = SqliteConnectOptions::from_str(url)
                .with_context(|| format!("invalid database url '{url}'"))?
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new().connect_with(options).await?;
            info!(url, "sqlite database opened");
            Ok(pool)
        },
        None => {
            warn!("no database configured, state will not survive a restart");
            // A >1 connection pool would see separate empty databases.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await?;
            Ok(pool)
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "zapgate starting");

    let config = zapgate_config::discover_and_load(cli.config.as_deref());

    let pool = open_pool(&config).await?;
    SqlitePrincipalStore::init(&pool).await.context("principal store init")?;

    // The durable gate only exists when a real database is configured; the
    // in-memory TTL fallback inside the deduplicator covers the rest.
    let dedup_store: Option<Arc<dyn DedupStore>> = if config.dedup.database_url.is_some() {
        SqliteDedupStore::init(&pool).await.context("dedup store init")?;
        Some(Arc::new(SqliteDedupStore::new(pool.clone())))
    } else {
        None
    };
    let dedup = Arc::new(EventDeduplicator::new(
        dedup_store,
        Duration::from_secs(config.dedup.ttl_secs),
    ));

    let directory: Option<Arc<dyn TenantDirectory>> = match config.identity.directory_url {
        Some(ref url) => Some(Arc::new(
            HttpTenantDirectory::new(url.clone()).context("tenant directory client")?,
        )),
        None => None,
    };
    let identity = Arc::new(IdentityLinker::new(
        Arc::new(SqlitePrincipalStore::new(pool)),
        directory,
        config.identity.default_tenant_id.clone(),
    ));

    info!(command = %config.mcp.command, "connecting tool session");
    let session = ToolSession::connect(&config.mcp.command, &config.mcp.args, &config.mcp.env)
        .await
        .context("tool session handshake")?
        .with_call_timeout(Duration::from_secs(config.mcp.call_timeout_secs));
    let tools: Arc<dyn ToolCaller> = Arc::new(session);

    let dispatcher = ReplyDispatcher::new(
        config.whatsapp.api_base.clone(),
        config.whatsapp.phone_number_id.clone(),
        config.whatsapp.access_token.clone(),
        config.whatsapp.max_chunk_len,
    )?;

    let state = Arc::new(AppState {
        dedup,
        identity: Arc::clone(&identity),
        tools: Arc::clone(&tools),
        pipeline: Arc::new(GenerateAndDeployPipeline::new(tools, identity)),
        replies: Arc::new(dispatcher),
        verify_token: config.whatsapp.verify_token.clone(),
        app_secret: config.whatsapp.app_secret.clone(),
        public_base_url: config.identity.public_base_url.clone(),
    });

    let bind = cli.bind.unwrap_or(config.server.bind);
    let port = cli.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {bind}:{port}"))?;

    zapgate_gateway::serve(addr, zapgate_gateway::build_app(state)).await
}
