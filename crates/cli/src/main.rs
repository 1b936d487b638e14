use std::{net::SocketAddr, sync::Arc};

use {
    clap::Parser,
    sqlx::sqlite::SqlitePoolOptions,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    deskbridge_bridge::{InboundDispatcher, OutboundDispatcher},
    deskbridge_desk::{InboxResolver, SqliteDeliveryLedger},
    deskbridge_gateway::AppState,
    deskbridge_messaging::{
        InMemoryTenantDirectory, SidecarMessenger, TenantConfig, TenantDirectory,
    },
};

#[derive(Parser)]
#[command(name = "deskbridge", about = "Messaging-network ↔ support-desk bridge")]
struct Cli {
    /// Address to bind to.
    #[arg(long, env = "DESKBRIDGE_BIND", default_value = "0.0.0.0")]
    bind: String,
    /// Port to listen on.
    #[arg(long, env = "DESKBRIDGE_PORT", default_value_t = 8080)]
    port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// SQLite URL for the delivery dedup ledger.
    #[arg(
        long,
        env = "DESKBRIDGE_LEDGER_DB",
        default_value = "sqlite://deskbridge.db?mode=rwc"
    )]
    ledger_db: String,

    /// Base URL of the network session sidecar.
    #[arg(long, env = "DESKBRIDGE_SIDECAR_URL")]
    sidecar_url: String,

    // Single-tenant bootstrap. Multi-tenant setups register additional
    // tenants through the directory at wiring time.
    /// Tenant id the sidecar and desk webhooks address.
    #[arg(long, env = "DESKBRIDGE_TENANT", default_value = "default")]
    tenant: String,
    /// Desk base URL.
    #[arg(long, env = "DESKBRIDGE_DESK_URL")]
    desk_url: String,
    /// Desk account id.
    #[arg(long, env = "DESKBRIDGE_DESK_ACCOUNT")]
    desk_account: String,
    /// Desk API access token.
    #[arg(long, env = "DESKBRIDGE_DESK_TOKEN")]
    desk_token: String,
    /// Desk inbox id (takes precedence over the inbox name).
    #[arg(long, env = "DESKBRIDGE_DESK_INBOX_ID")]
    desk_inbox_id: Option<u64>,
    /// Desk inbox name, resolved to an id on first use.
    #[arg(long, env = "DESKBRIDGE_DESK_INBOX_NAME")]
    desk_inbox_name: Option<String>,
    /// Forward the session's own outgoing messages as desk entries.
    #[arg(long, env = "DESKBRIDGE_MIRROR_SELF", default_value_t = false)]
    mirror_self_messages: bool,
    /// Send a single-emoji agent reply to a quoted message as a reaction.
    #[arg(long, env = "DESKBRIDGE_REACTION_SHORTCUT", default_value_t = false)]
    reaction_shortcut: bool,
    /// Drop inbound messages older than this many seconds.
    #[arg(long, env = "DESKBRIDGE_STALENESS_SECS", default_value_t = 30)]
    staleness_secs: u64,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    info!(version = env!("CARGO_PKG_VERSION"), "deskbridge starting");

    let directory = Arc::new(InMemoryTenantDirectory::new());
    directory
        .save(TenantConfig {
            tenant_id: cli.tenant.clone(),
            desk_url: cli.desk_url.clone(),
            account_id: cli.desk_account.clone(),
            access_token: cli.desk_token.clone(),
            inbox_id: cli.desk_inbox_id,
            inbox_name: cli.desk_inbox_name.clone(),
            mirror_self_messages: cli.mirror_self_messages,
            reaction_shortcut: cli.reaction_shortcut,
            staleness_secs: cli.staleness_secs,
        })
        .await?;
    info!(tenant = %cli.tenant, desk_url = %cli.desk_url, "tenant registered");

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&cli.ledger_db)
        .await?;
    SqliteDeliveryLedger::init(&pool).await?;
    let ledger = Arc::new(SqliteDeliveryLedger::new(pool));

    let directory: Arc<dyn TenantDirectory> = directory;
    let messenger = Arc::new(SidecarMessenger::new(&cli.sidecar_url)?);

    let inbound = Arc::new(
        InboundDispatcher::new(Arc::clone(&directory), Arc::new(InboxResolver::new()))
            .with_ledger(ledger),
    );
    let outbound = Arc::new(OutboundDispatcher::new(directory, messenger));

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    deskbridge_gateway::serve(addr, AppState { inbound, outbound }).await
}
