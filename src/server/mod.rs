//! HTTP front-end: adapts warp requests to [`Request`]s and runs the
//! synchronous servlet on tokio's blocking pool, one thread per request.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::Stream;
use futures::StreamExt;
use http::header::ALLOW;
use http::header::CONTENT_TYPE;
use http::header::COOKIE;
use http::header::RETRY_AFTER;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::StatusCode;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;
use warp::filters::path::FullPath;
use warp::hyper::body::Buf;
use warp::hyper::body::Bytes;
use warp::hyper::Body;
use warp::Filter;

use crate::constants::DEFAULT_MAX_BODY_BYTES;
use crate::constants::SESSION_COOKIE;
use crate::ClickServlet;
use crate::Error;
use crate::Principal;
use crate::Request;
use crate::RequestError;
use crate::Result;
use crate::ServerConfig;
use crate::SystemError;

/// Resolves the authenticated user of a request from its headers.
pub type PrincipalResolver = Arc<dyn Fn(&HeaderMap) -> Option<Principal> + Send + Sync>;

/// Principal from `X-Remote-User` and the comma separated `X-Remote-Roles`,
/// as set by an authenticating proxy.
///
/// Clients can send these headers themselves. Install this resolver only when
/// a fronting proxy overwrites them, see [`ServerConfig::trusted_proxy`].
pub fn proxy_header_principal(headers: &HeaderMap) -> Option<Principal> {
    let name = headers.get("x-remote-user")?.to_str().ok()?.trim();
    if name.is_empty() {
        return None;
    }
    let roles: HashSet<String> = headers
        .get("x-remote-roles")
        .and_then(|v| v.to_str().ok())
        .map(|roles| {
            roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some(Principal::new(name, roles))
}

/// What the adaptor needs to serve requests
#[derive(Clone)]
pub struct HttpFrontend {
    servlet: Arc<ClickServlet>,
    context_path: String,
    principal: Option<PrincipalResolver>,
    max_body_bytes: u64,
}

impl HttpFrontend {
    pub fn new(
        servlet: Arc<ClickServlet>,
        context_path: impl Into<String>,
    ) -> Self {
        Self {
            servlet,
            context_path: context_path.into(),
            principal: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Front-end as configured by `[server]`. Proxy headers are only read
    /// when `trusted_proxy` is set.
    pub fn from_config(
        servlet: Arc<ClickServlet>,
        config: &ServerConfig,
    ) -> Self {
        let frontend =
            Self::new(servlet, config.context_path.clone()).with_max_body_bytes(config.max_body_bytes);
        if config.trusted_proxy {
            info!("resolving principals from proxy headers");
            frontend.with_principal_resolver(Arc::new(proxy_header_principal))
        } else {
            frontend
        }
    }

    pub fn with_max_body_bytes(
        mut self,
        limit: u64,
    ) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn with_principal_resolver(
        mut self,
        resolver: PrincipalResolver,
    ) -> Self {
        self.principal = Some(resolver);
        self
    }

    /// Converts the raw HTTP parts into a servlet [`Request`]. Returns `None`
    /// for paths outside the context path.
    pub fn build_request(
        &self,
        method: Method,
        full_path: &str,
        query: &str,
        headers: HeaderMap,
        body: &[u8],
    ) -> Option<Request> {
        let path = if self.context_path.is_empty() {
            full_path
        } else {
            let rest = full_path.strip_prefix(self.context_path.as_str())?;
            if !rest.is_empty() && !rest.starts_with('/') {
                return None;
            }
            rest
        };

        let is_form = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        let session_id = session_cookie(&headers);
        let principal = self.principal.as_ref().and_then(|resolve| resolve(&headers));

        let mut request = Request::new(method, path)
            .with_context_path(self.context_path.clone())
            .with_headers(headers)
            .with_query(query);
        if is_form && !body.is_empty() {
            request = request.with_query(&String::from_utf8_lossy(body));
        }
        if let Some(id) = session_id {
            request = request.with_session_id(id);
        }
        if let Some(principal) = principal {
            request = request.with_principal(principal);
        }
        Some(request)
    }

    /// Serves one request on the blocking pool.
    pub async fn handle(
        &self,
        method: Method,
        full_path: String,
        query: String,
        headers: HeaderMap,
        body: Bytes,
    ) -> http::Response<Body> {
        let Some(request) = self.build_request(method.clone(), &full_path, &query, headers, &body) else {
            return status_response(StatusCode::NOT_FOUND, "Not Found");
        };

        let servlet = self.servlet.clone();
        let result = tokio::task::spawn_blocking(move || servlet.service(request))
            .await
            .map_err(Error::from)
            .and_then(|r| r);

        match result {
            Ok(response) => {
                let (status, headers, body) = response.into_parts();
                let body = if method == Method::HEAD { Vec::new() } else { body };
                let mut reply = http::Response::new(Body::from(body));
                *reply.status_mut() = status;
                *reply.headers_mut() = headers;
                reply
            }
            Err(e) => error_response(e),
        }
    }

    /// warp filter serving every path under the context path
    pub fn routes(&self) -> impl Filter<Extract = (http::Response<Body>,), Error = warp::Rejection> + Clone {
        let frontend = self.clone();
        warp::method()
            .and(warp::path::full())
            .and(
                warp::query::raw()
                    .or(warp::any().map(String::new))
                    .unify(),
            )
            .and(warp::header::headers_cloned())
            .and(limited_body(self.max_body_bytes))
            .then(
                move |method: Method,
                      path: FullPath,
                      query: String,
                      headers: HeaderMap,
                      body: BodyResult| {
                    let frontend = frontend.clone();
                    async move {
                        match body {
                            Ok(body) => {
                                frontend
                                    .handle(method, path.as_str().to_string(), query, headers, body)
                                    .await
                            }
                            Err(e) => error_response(e.into()),
                        }
                    }
                },
            )
    }
}

type BodyResult = std::result::Result<Bytes, RequestError>;

fn limited_body(limit: u64) -> impl Filter<Extract = (BodyResult,), Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || limit)
        .and(warp::body::stream())
        .then(read_body)
}

/// Collects the request body, giving up as soon as it grows past `limit`.
async fn read_body<S, B>(
    limit: u64,
    body: S,
) -> BodyResult
where
    S: Stream<Item = std::result::Result<B, warp::Error>>,
    B: Buf,
{
    futures::pin_mut!(body);
    let mut collected = Vec::new();
    while let Some(chunk) = body.next().await {
        let mut chunk = chunk.map_err(|e| RequestError::BodyRead(e.to_string()))?;
        if (collected.len() + chunk.remaining()) as u64 > limit {
            return Err(RequestError::PayloadTooLarge { limit });
        }
        while chunk.has_remaining() {
            let bytes = chunk.chunk();
            let len = bytes.len();
            collected.extend_from_slice(bytes);
            chunk.advance(len);
        }
    }
    Ok(Bytes::from(collected))
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn status_response(
    status: StatusCode,
    message: &str,
) -> http::Response<Body> {
    let mut reply = http::Response::new(Body::from(message.to_string()));
    *reply.status_mut() = status;
    reply
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=UTF-8"));
    reply
}

/// Maps failures the servlet could not answer itself to HTTP statuses.
pub(crate) fn error_response(error: Error) -> http::Response<Body> {
    match &error {
        Error::System(SystemError::Unavailable { reason, retry_after }) => {
            warn!("service unavailable: {}", reason);
            let mut reply = status_response(StatusCode::SERVICE_UNAVAILABLE, reason);
            if let Some(retry) = retry_after {
                reply
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry.as_secs()));
            }
            reply
        }
        Error::Request(RequestError::MethodNotAllowed(method)) => {
            debug!("method not allowed: {}", method);
            let mut reply = status_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            reply
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET, HEAD, POST"));
            reply
        }
        Error::Request(RequestError::PayloadTooLarge { limit }) => {
            debug!("request body over {} bytes rejected", limit);
            status_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
        }
        Error::Request(RequestError::BodyRead(reason)) => {
            debug!("unreadable request body: {}", reason);
            status_response(StatusCode::BAD_REQUEST, "Bad Request")
        }
        _ => {
            error!("request failed: {}", error);
            status_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// Serves `frontend` on `addr` until `shutdown_signal` changes.
pub async fn start_server(
    addr: SocketAddr,
    frontend: HttpFrontend,
    mut shutdown_signal: watch::Receiver<()>,
) -> Result<()> {
    let (bound, server) = warp::serve(frontend.routes())
        .try_bind_with_graceful_shutdown(addr, async move {
            let _ = shutdown_signal.changed().await;
            info!("http server shutting down");
        })
        .map_err(|e| SystemError::ServerStartFailed(e.to_string()))?;
    info!("click server listening on {}", bound);
    server.await;
    Ok(())
}
