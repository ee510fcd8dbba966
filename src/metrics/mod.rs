use std::net::SocketAddr;

use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;


lazy_static! {
    pub static ref REQUEST_COUNTER: IntCounterVec = IntCounterVec::new(
        Opts::new("requests_total", "Requests served, by method and status"),
        &["method", "status"]
    )
    .expect("metric can not be created");

    pub static ref REQUEST_DURATION_METRIC: HistogramVec = HistogramVec::new(
        HistogramOpts::new("request_duration_ms", "Histogram of request handling time in ms")
            .buckets(exponential_buckets(1.0, 2.0, 12).expect("valid buckets")),
        &["method"]
    )
    .expect("metric can not be created");

    pub static ref RENDER_DURATION_METRIC: HistogramVec = HistogramVec::new(
        HistogramOpts::new("render_duration_ms", "Histogram of template render time in ms")
            .buckets(exponential_buckets(1.0, 2.0, 10).expect("valid buckets")),
        &["template"]
    )
    .expect("metric can not be created");

    pub static ref ERROR_PAGE_COUNTER: IntCounterVec = IntCounterVec::new(
        Opts::new("error_pages_total", "Requests answered by the error page, by failing page type"),
        &["page"]
    )
    .expect("metric can not be created");

    pub static ref APP_RELOAD_COUNTER: IntCounter =
        IntCounter::new("app_reloads_total", "Application reloads").expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new_custom(Some("click".to_string()), None)
        .expect("registry can be created");
}

/// Registers every Click metric with `registry`
pub fn register_custom_metrics(registry: &Registry) {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(REQUEST_COUNTER.clone()),
        Box::new(REQUEST_DURATION_METRIC.clone()),
        Box::new(RENDER_DURATION_METRIC.clone()),
        Box::new(ERROR_PAGE_COUNTER.clone()),
        Box::new(APP_RELOAD_COUNTER.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            error!("collector can not be registered: {}", e);
        }
    }
}

/// Serves `/metrics` on `port` until `shutdown_signal` changes.
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics(&REGISTRY);

    let metrics_route = warp::path!("metrics").map(|| REGISTRY.clone()).and_then(metrics_handler);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!("metrics server listening on {}", addr);
    let (_, server) = warp::serve(metrics_route).bind_with_graceful_shutdown(addr, async move {
        let _ = shutdown_signal.changed().await;
    });
    server.await;
}

pub(crate) async fn metrics_handler(registry: Registry) -> Result<impl Reply, Rejection> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    let mut res = String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("custom metrics could not be from_utf8'd: {}", e);
        String::default()
    });

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!("could not encode prometheus metrics: {}", e);
    };
    res.push_str(&String::from_utf8(buffer).unwrap_or_default());
    Ok(res)
}
