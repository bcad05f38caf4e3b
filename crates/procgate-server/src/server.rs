use crate::config::Config;
use crate::gateway::{Gateway, RequestHeaders};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use procgate_core::error::GatewayError;
use procgate_core::types::{GatewayResponse, ResultSet};
use procgate_core::version::ApiVersion;
use procgate_sql::executor::ProcedureExecutor;
use procgate_sql::postgres::PgProcedureExecutor;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const SUPPORTED_VERSIONS_HEADER: HeaderName = HeaderName::from_static("api-supported-versions");
pub const APPLICATION_NAME_HEADER: HeaderName = HeaderName::from_static("applicationname");

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<Gateway>,
    versions: Arc<Vec<ApiVersion>>,
    versions_header: HeaderValue,
}

impl AppState {
    pub fn new(config: &Config, executor: Arc<dyn ProcedureExecutor>) -> anyhow::Result<Self> {
        let versions = config.supported_versions()?;
        let listed = versions
            .iter()
            .map(ApiVersion::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Self {
            gateway: Arc::new(Gateway::from_config(config, executor)),
            versions: Arc::new(versions),
            versions_header: HeaderValue::from_str(&listed)?,
        })
    }

    fn negotiate(&self, segment: &str) -> Result<ApiVersion, GatewayError> {
        let version = ApiVersion::from_segment(segment)?;
        if self.versions.contains(&version) {
            Ok(version)
        } else {
            Err(GatewayError::UnsupportedVersion(segment.to_string()))
        }
    }

    fn reply(&self, status: StatusCode, body: GatewayResponse) -> Response {
        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert(SUPPORTED_VERSIONS_HEADER, self.versions_header.clone());
        response
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/:version/dynamic", get(probe).post(invoke))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    if config.metrics.enabled {
        spawn_metrics_listener(config.metrics.listen_addr.clone())?;
    }

    let executor = Arc::new(PgProcedureExecutor::new(Duration::from_secs(
        config.database.connect_timeout_secs,
    )));
    let state = AppState::new(&config, executor)?;

    let listener = TcpListener::bind(&config.server.listen_addr).await?;
    info!("procgate listening on {}", config.server.listen_addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("procgate stopped");
    Ok(())
}

fn spawn_metrics_listener(listen_addr: String) -> anyhow::Result<()> {
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;
    tokio::spawn(async move {
        let app = Router::new()
            .route(
                "/metrics",
                get(move || {
                    let handle = metrics_handle.clone();
                    async move { handle.render() }
                }),
            )
            .route("/health", get(|| async { "ok" }))
            .route("/ready", get(|| async { "ok" }));
        match TcpListener::bind(&listen_addr).await {
            Ok(listener) => {
                info!("metrics listening on {listen_addr}");
                if let Err(err) = axum::serve(listener, app).await {
                    error!("metrics listener error: {err}");
                }
            }
            Err(err) => error!("metrics bind error on {listen_addr}: {err}"),
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
    }
}

async fn probe(State(state): State<AppState>, Path(segment): Path<String>) -> Response {
    match state.negotiate(&segment) {
        Ok(version) => state.reply(StatusCode::OK, GatewayResponse::probe(version.to_string())),
        Err(err) => state.reply(StatusCode::BAD_REQUEST, GatewayResponse::failure(&err, Value::Null)),
    }
}

async fn invoke(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = Uuid::new_v4();
    counter!("gateway_request_total").increment(1);

    let data = serde_json::from_slice::<Value>(&body);
    let outcome = match &data {
        Ok(body) => dispatch(&state, &segment, &headers, body).await,
        Err(err) => Err(GatewayError::MalformedRequest(format!(
            "body is not valid JSON: {err}"
        ))),
    };
    let data = data.unwrap_or(Value::Null);
    let procedure = data
        .get("sqlCommand")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match outcome {
        Ok((version, results)) => {
            counter!("gateway_request_success_total").increment(1);
            info!(%request_id, procedure, rows = results.len(), "procedure executed");
            state.reply(
                StatusCode::OK,
                GatewayResponse::success(version.to_string(), results),
            )
        }
        Err(err) => {
            counter!("gateway_request_error_total", "kind" => err.kind()).increment(1);
            warn!(%request_id, procedure, kind = err.kind(), "request failed: {err}");
            let response = GatewayResponse::failure(&err, data);
            state.reply(StatusCode::BAD_REQUEST, response)
        }
    }
}

async fn dispatch(
    state: &AppState,
    segment: &str,
    headers: &HeaderMap,
    body: &Value,
) -> Result<(ApiVersion, ResultSet), GatewayError> {
    let version = state.negotiate(segment)?;
    let headers = RequestHeaders {
        authorization: header_str(headers, &AUTHORIZATION),
        application_name: header_str(headers, &APPLICATION_NAME_HEADER),
    };
    let results = state.gateway.invoke(&headers, body).await?;
    Ok((version, results))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
