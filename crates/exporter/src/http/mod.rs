//! 指标暴露服务
//!
//! 以 Prometheus 文本格式通过 HTTP GET 暴露注册表中的全部指标

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::metrics::MetricsRegistry;

/// 服务状态
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MetricsRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }
}

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(metrics_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 在已绑定的监听器上提供服务，直到进程退出
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.registry.render() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!("指标编码失败: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "OK"
}
