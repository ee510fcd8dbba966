use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use click::constants::SESSION_PURGE_INTERVAL_SECS;
use click::metrics;
use click::server;
use click::server::HttpFrontend;
use click::utils::open_file_for_append;
use click::ActionEvent;
use click::ActionLink;
use click::ActionListener;
use click::ClickApp;
use click::ClickConfig;
use click::ClickServlet;
use click::Error;
use click::Mode;
use click::Page;
use click::PageCx;
use click::Result;
use click::SimpleTemplateEngine;
use click::SystemError;
use serde_json::json;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

const HOME_TEMPLATE: &str = r#"<html>
<head>
<title>Click</title>
$imports
</head>
<body>
<h2>Welcome</h2>
<p class="notice">$!notice</p>
<p>Clicks this session: $!clicks</p>
$increment
</body>
</html>
"#;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let config = ClickConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(config.app.mode, config.server.log_dir.as_deref())?;
    info!("starting click server with {:?}", config);

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    let app_config = config.clone();
    let servlet = Arc::new(ClickServlet::new(
        config.servlet.clone(),
        Arc::new(move || build_app(app_config.clone())),
    ));
    servlet.init()?;

    if config.server.enable_metrics {
        tokio::spawn(metrics::start_server(config.server.metrics_port, graceful_rx.clone()));
    }
    tokio::spawn(purge_expired_sessions(servlet.clone(), graceful_rx.clone()));
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    let frontend = HttpFrontend::from_config(servlet.clone(), &config.server);
    if let Err(e) = server::start_server(config.server.socket_addr()?, frontend, graceful_rx).await {
        error!("server stops: {:?}", e);
    }

    servlet.destroy();
    info!("Exiting program.");
    Ok(())
}

fn build_app(config: ClickConfig) -> Result<ClickApp> {
    let templates = SimpleTemplateEngine::new(&config.app.template_dir)
        .with_cache(config.app.mode.is_production())
        .with_template("/home.htm", HOME_TEMPLATE);
    ClickApp::builder(config)
        .template_engine(Arc::new(templates))
        .page::<HomePage>("/home.htm")
        .build()
}

/// Landing page counting link clicks in the session
#[derive(Default)]
struct HomePage;

impl Page for HomePage {
    fn on_init(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        let listener = ActionListener::new("increment", count_click);
        cx.add_control(Box::new(
            ActionLink::new("increment")
                .with_label("Click me")
                .with_listener(listener),
        ))?;
        Ok(())
    }

    fn on_render(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        let context = cx.context().clone();
        if let Some(notice) = context.session_attribute("notice") {
            cx.add_model("notice", notice)?;
        }
        let clicks = context.session_attribute("clicks").unwrap_or(json!(0));
        cx.add_model("clicks", clicks)
    }
}

/// Counts the click and redirects, so a reload does not count twice
fn count_click(event: &mut ActionEvent<'_>) -> Result<bool> {
    let context = event.context().clone();
    let clicks = context
        .session_attribute("clicks")
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
        + 1;
    context.set_session_attribute("clicks", json!(clicks));
    context.set_flash_attribute("notice", json!(format!("Clicked {} times", clicks)));
    event.state_mut().set_redirect("/home.htm");
    Ok(false)
}

async fn purge_expired_sessions(
    servlet: Arc<ClickServlet>,
    mut shutdown_signal: watch::Receiver<()>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(SESSION_PURGE_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let purged = servlet.sessions().purge_expired();
                if purged > 0 {
                    debug!(purged, "expired sessions purged");
                }
            }
            _ = shutdown_signal.changed() => break,
        }
    }
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::System(SystemError::SignalSendFailed(format!(
            "Failed to send shutdown signal: {}",
            e
        )))
    })?;

    info!("Shutdown completed");
    Ok(())
}

/// Logs to `log_dir/click.log` when set, else to stdout. `RUST_LOG` wins over
/// the mode's default level.
fn init_observability(
    mode: Mode,
    log_dir: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(mode.log_filter()));

    match log_dir {
        Some(dir) => {
            let log_file = open_file_for_append(dir.join("click.log"))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
            let base_subscriber = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_filter(filter);
            tracing_subscriber::registry().with(base_subscriber).init();
            Ok(Some(guard))
        }
        None => {
            let base_subscriber = tracing_subscriber::fmt::layer().with_filter(filter);
            tracing_subscriber::registry().with(base_subscriber).init();
            Ok(None)
        }
    }
}
