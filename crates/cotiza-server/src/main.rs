mod api;
mod middleware;

use std::sync::Arc;

use cotiza_scraper::{build_browser, ScrapeContext, ScraperOptions, SessionProfile};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = cotiza_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let branches = cotiza_core::load_branches_or_default(&config.branches_path)?;
    let browser = build_browser(&config)?;
    tracing::info!(
        env = %config.env,
        driver = %config.browser_driver,
        headless = config.browser_headless,
        branches = branches.len(),
        "scraper engine ready"
    );

    let ctx = ScrapeContext {
        browser: Arc::from(browser),
        profile: SessionProfile::from_config(&config),
        options: ScraperOptions::from_config(&config),
    };
    let auth = AuthState::from_env(config.is_development())?;
    let app = build_app(AppState::new(ctx, branches), auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
