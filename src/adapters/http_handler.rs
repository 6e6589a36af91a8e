use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    body::Body as AxumBody,
    extract::{
        ConnectInfo, DefaultBodyLimit, Multipart, Request as AxumRequest,
        multipart::MultipartRejection,
    },
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    middleware,
    routing::post,
};
use bytes::Bytes;
use eyre::{Result, WrapErr};
use hyper::{Request, Response};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::middleware::request_timing_middleware,
    core::{GatewayService, dispatch, error::DispatchError},
    ports::http_client::HttpClient,
};

/// Path of the reconfiguration endpoint.
pub const UPLOAD_PATH: &str = "/gw-upload";

/// Multipart field carrying the manifest on upload.
pub const UPLOAD_FIELD: &str = "config_file";

pub const NOT_FOUND_MESSAGE: &str = "Sigh, We Could Not Find The Route You Are Trying To Access";
pub const UPLOAD_OK_MESSAGE: &str = "Config File Uploaded Successfully";
pub const UPLOAD_PARSE_MESSAGE: &str = "An error occurred parsing config file";

/// Default `User-Agent` for callers that did not send one.
pub const DEFAULT_USER_AGENT: &str = concat!("gantry/", env!("CARGO_PKG_VERSION"));

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP_HEADERS: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// JSON body of every response the gateway produces itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayReply {
    pub status: bool,
    pub message: String,
}

impl GatewayReply {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
        }
    }
}

/// HTTP handler for the Gantry API gateway
#[derive(Clone)]
pub struct HttpHandler {
    gateway_service: Arc<GatewayService>,
    http_client: Arc<dyn HttpClient>,
}

impl HttpHandler {
    pub fn new(gateway_service: Arc<GatewayService>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            gateway_service,
            http_client,
        }
    }

    /// Resolve the request against the active routing table and forward it.
    ///
    /// One snapshot is taken up front and used for the whole request, even if
    /// a reconfiguration lands while the upstream is still responding.
    pub async fn handle_request(
        &self,
        req: Request<AxumBody>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<AxumBody>, eyre::Error> {
        let table = self.gateway_service.snapshot();

        let resolved = match dispatch::resolve(
            &table,
            req.method(),
            req.uri().path(),
            req.uri().query(),
        ) {
            Ok(resolved) => resolved,
            Err(e @ (DispatchError::RouteNotFound { .. }
            | DispatchError::NoUpstreamForMethod { .. })) => {
                tracing::info!(error = %e, revision = table.revision(), "Route not found");
                return json_reply(
                    StatusCode::NOT_FOUND,
                    &GatewayReply::failure(NOT_FOUND_MESSAGE),
                );
            }
            Err(DispatchError::UpstreamUrlParse { uri, reason }) => {
                tracing::error!(uri = %uri, reason = %reason, "Computed upstream url is invalid");
                return bad_gateway(&uri);
            }
        };

        let upstream = resolved.url.to_string();
        let Ok(upstream_uri) = upstream.parse::<hyper::Uri>() else {
            tracing::error!(uri = %upstream, "Upstream url is not a valid request uri");
            return bad_gateway(&upstream);
        };

        tracing::info!(
            listening_path = %resolved.listening_path,
            method = %resolved.method,
            upstream = %upstream,
            "Forwarding request"
        );

        let (mut parts, body) = req.into_parts();
        parts.uri = upstream_uri;
        prepare_forward_headers(&mut parts.headers, client_addr);
        let outgoing = Request::from_parts(parts, body);

        match self.http_client.send_request(outgoing).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::error!(uri = %upstream, error = %e, "Upstream request failed");
                bad_gateway(&upstream)
            }
        }
    }

    /// Replace the routing table from an uploaded manifest.
    pub async fn handle_upload(
        &self,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Response<AxumBody>, eyre::Error> {
        let manifest = match read_manifest_field(multipart).await {
            Ok(manifest) => manifest,
            Err(reason) => {
                tracing::warn!(reason = %reason, "Rejected manifest upload");
                return json_reply(
                    StatusCode::BAD_REQUEST,
                    &GatewayReply::failure(UPLOAD_PARSE_MESSAGE),
                );
            }
        };

        match self.gateway_service.reconfigure(&manifest).await {
            Ok(table) => {
                tracing::info!(
                    paths = table.len(),
                    routes = table.route_count(),
                    revision = table.revision(),
                    "Installed uploaded manifest"
                );
                json_reply(StatusCode::OK, &GatewayReply::success(UPLOAD_OK_MESSAGE))
            }
            Err(e) => json_reply(StatusCode::BAD_REQUEST, &GatewayReply::failure(e.to_string())),
        }
    }
}

/// Build the gateway router: the upload endpoint plus a catch-all proxy.
///
/// Non-POST requests to [`UPLOAD_PATH`] fall through to the proxy like any
/// other path.
pub fn build_router(handler: Arc<HttpHandler>, max_manifest_bytes: usize) -> Router {
    let proxy = {
        let handler = handler.clone();
        move |req: AxumRequest| {
            let handler = handler.clone();
            async move {
                let client_addr = req
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| *addr);
                Ok::<_, Infallible>(or_internal_error(
                    handler.handle_request(req, client_addr).await,
                ))
            }
        }
    };

    let upload = move |multipart: Result<Multipart, MultipartRejection>| {
        let handler = handler.clone();
        async move { Ok::<_, Infallible>(or_internal_error(handler.handle_upload(multipart).await)) }
    };

    Router::new()
        .route(
            UPLOAD_PATH,
            post(upload)
                .layer(DefaultBodyLimit::max(max_manifest_bytes))
                .fallback(proxy.clone()),
        )
        .fallback(proxy)
        .layer(middleware::from_fn(request_timing_middleware))
}

async fn read_manifest_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Bytes, String> {
    let mut multipart = multipart.map_err(|e| e.body_text())?;

    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        if field.name() == Some(UPLOAD_FIELD) {
            return field.bytes().await.map_err(|e| e.body_text());
        }
    }

    Err(format!("multipart field '{UPLOAD_FIELD}' is missing"))
}

/// Strip hop-by-hop headers, record the caller in `X-Forwarded-For` and make
/// sure a `User-Agent` is present. `Host` is set by the HTTP client from the
/// upstream URI.
fn prepare_forward_headers(headers: &mut HeaderMap, client_addr: Option<SocketAddr>) {
    // Headers named in `Connection` are hop-by-hop as well.
    let connection_listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in connection_listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
    headers.remove(header::HOST);

    if let Some(addr) = client_addr {
        let client_ip = addr.ip().to_string();
        let prior: Vec<&str> = headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .collect();
        let forwarded_for = if prior.is_empty() {
            client_ip
        } else {
            format!("{}, {client_ip}", prior.join(", "))
        };
        match HeaderValue::from_str(&forwarded_for) {
            Ok(value) => {
                headers.insert("x-forwarded-for", value);
            }
            Err(e) => tracing::warn!("Failed to build X-Forwarded-For header: {}", e),
        }
    }

    if !headers.contains_key(header::USER_AGENT) {
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(DEFAULT_USER_AGENT),
        );
    }
}

fn bad_gateway(uri: &str) -> Result<Response<AxumBody>> {
    json_reply(
        StatusCode::BAD_GATEWAY,
        &GatewayReply::failure(format!(
            "An error occurred accessing service with uri: {uri}"
        )),
    )
}

fn json_reply(status: StatusCode, reply: &GatewayReply) -> Result<Response<AxumBody>> {
    let body = serde_json::to_vec(reply).wrap_err("Failed to serialize gateway reply")?;
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(AxumBody::from(body))
        .wrap_err("Failed to build gateway reply")
}

fn or_internal_error(result: Result<Response<AxumBody>>) -> Response<AxumBody> {
    result.unwrap_or_else(|e| {
        tracing::error!("Request handling error: {:?}", e);
        let mut response = Response::new(AxumBody::from("Internal Server Error"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
