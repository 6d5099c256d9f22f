//! iostat exporter daemon.
//!
//! - Scrape endpoint: /metrics (Prometheus text format)
//! - Samples `iostat -x` every interval into the metric store
//! - SIGHUP reloads the configuration, SIGINT/SIGTERM stop gracefully

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::oneshot;

use iostat_core::error::{IostatError, Result};
use iostat_exporter::{
    app_state::AppState,
    cli::Cli,
    config::{ConfigSource, ExporterConfig, ProcessIdentity},
    lifecycle::{install_signal_handlers, Lifecycle},
    logging,
    obs::ExporterMetrics,
    reload::ConfigReloader,
    router,
    scheduler::{Scheduler, TickSettings},
    store::MetricStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let source = cli.config_source();

    // Startup errors exit before the sampling loop exists.
    let cfg = match source.load() {
        Ok(cfg) => cfg,
        Err(e) => return fatal(&e),
    };
    let identity = match ProcessIdentity::resolve(&cfg.process) {
        Ok(identity) => identity,
        Err(e) => return fatal(&e),
    };
    if let Err(e) = logging::init(&cfg.log, identity.foreground) {
        return fatal(&e);
    }

    tracing::debug!(
        foreground = identity.foreground,
        uid = ?identity.uid,
        gid = ?identity.gid,
        chroot = %identity.chroot.display(),
        pidfile = %identity.pidfile.display(),
        "process identity resolved"
    );

    match run(source, cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "iostat-exporter failed");
            fatal(&e)
        }
    }
}

fn fatal(e: &IostatError) -> ExitCode {
    eprintln!("iostat-exporter: {e}");
    ExitCode::FAILURE
}

async fn run(source: ConfigSource, cfg: ExporterConfig) -> Result<()> {
    let listen = cfg.exporter.listen_addr()?;
    let settings = TickSettings::from_config(&cfg)?;

    let lifecycle = Lifecycle::new();
    let signals = install_signal_handlers(lifecycle.clone())?;

    let store = Arc::new(MetricStore::new());
    let metrics = Arc::new(ExporterMetrics::new());
    let state = AppState::new(Arc::clone(&store), Arc::clone(&metrics), lifecycle.clone());
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| IostatError::Internal(format!("failed to bind {listen}: {e}")))?;
    tracing::info!(%listen, "iostat-exporter listening");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    let scheduler = Scheduler::new(settings, store, metrics, lifecycle.clone())
        .with_reloader(ConfigReloader::new(source, cfg));
    let mut sampling = tokio::spawn(scheduler.run());

    let server_exit = tokio::select! {
        res = &mut sampling => {
            if let Err(e) = res {
                tracing::error!(error = %e, "scheduler task failed");
            }
            None
        }
        res = &mut server => Some(res),
    };
    if let Some(res) = server_exit {
        // The endpoint is gone; stop sampling too.
        lifecycle.request_terminate();
        if let Err(e) = sampling.await {
            tracing::error!(error = %e, "scheduler task failed");
        }
        signals.abort();
        return Err(match res {
            Ok(Ok(())) => IostatError::Internal("scrape server stopped unexpectedly".into()),
            Ok(Err(e)) => IostatError::Internal(format!("scrape server failed: {e}")),
            Err(e) => IostatError::Internal(format!("scrape server task failed: {e}")),
        });
    }

    let _ = stop_tx.send(());
    match server.await {
        Ok(Ok(())) => tracing::info!("scrape server drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "scrape server failed during shutdown"),
        Err(e) => tracing::error!(error = %e, "scrape server task failed"),
    }
    signals.abort();
    Ok(())
}
