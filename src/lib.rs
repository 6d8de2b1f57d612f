pub mod api;
pub mod cli;
pub mod config;
pub mod constants;
pub mod db;
pub mod entities;
pub mod services;
pub mod state;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use cli::{Cli, Commands};
pub use config::Config;
use db::Store;
use services::Scheduler;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder().label("app", "reiche-auth")?;
        for (key, value) in &config.observability.loki_labels {
            builder = builder.extra_field(key.clone(), value.clone())?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_daemon(config, prometheus_handle).await,

        Commands::Init => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        Commands::CreateUser {
            email,
            password,
            name,
            profile_id,
            company_id,
        } => cmd_create_user(&config, &email, &password, name, profile_id, company_id).await,

        Commands::CleanupTokens => cmd_cleanup_tokens(config).await,
    }
}

async fn run_daemon(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        "Reiche Auth v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let state = api::create_app_state(config.clone(), prometheus_handle).await?;

    state.rate_limiter().start_sweeper(std::time::Duration::from_secs(
        config.rate_limit.sweep_interval_seconds,
    ));

    let scheduler = Arc::new(Scheduler::new(
        state.store().clone(),
        config.security.clone(),
    ));

    let scheduler_handle = {
        let sched = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = sched.start().await {
                error!("Scheduler error: {}", e);
            }
        })
    };

    let server_handle: Option<tokio::task::JoinHandle<()>> = if config.server.enabled {
        let port = config.server.port;
        info!("Starting auth API on port {}", port);

        let app = api::router(state.clone()).await;
        let addr = format!("0.0.0.0:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        Some(tokio::spawn(async move {
            info!("Auth service running at http://0.0.0.0:{}", port);
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler.stop().await;
    scheduler_handle.abort();
    if let Some(handle) = server_handle {
        handle.abort();
    }
    state.rate_limiter().shutdown().await;
    info!("Daemon stopped");

    Ok(())
}

async fn cmd_create_user(
    config: &Config,
    email: &str,
    password: &str,
    name: Option<String>,
    profile_id: i32,
    company_id: Option<i32>,
) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    let name = name.unwrap_or_else(|| {
        email
            .split('@')
            .next()
            .unwrap_or(email)
            .to_string()
    });

    let account = store
        .create_user(
            email,
            password,
            &name,
            profile_id,
            company_id,
            &config.security,
        )
        .await?;

    println!("✓ Created user: {} (ID: {})", account.email, account.id);
    println!(
        "  Profile: {} (level {})",
        account.profile_code, account.profile_level
    );
    if let Some(company) = account.company_name {
        println!("  Company: {}", company);
    }

    Ok(())
}

async fn cmd_cleanup_tokens(config: Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let scheduler = Scheduler::new(store, config.security.clone());

    scheduler.run_once().await?;

    println!("✓ Token retention pass complete.");
    Ok(())
}
