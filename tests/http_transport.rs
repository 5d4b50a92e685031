use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use authz_bootstrap::authz::AnonymousIdentity;
use authz_bootstrap::cache::{BootstrapRequest, BootstrapResponse, BootstrapTransport, HttpTransport};
use authz_bootstrap::{AppError, BootstrapCache, BootstrapConfig, LoadOptions};

const ETAG_V1: &str = "\"v1\"";

async fn bootstrap(State(hits): State<Arc<AtomicUsize>>, headers: HeaderMap) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    let revalidating = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        == Some(ETAG_V1);
    if revalidating {
        return StatusCode::NOT_MODIFIED.into_response();
    }
    (
        [(header::ETAG, ETAG_V1)],
        Json(json!({
            "menu": [{"code": "inicio", "label": "Inicio"}],
            "features": [{"module": "vendas", "code": "aprovar"}]
        })),
    )
        .into_response()
}

async fn spawn_server() -> Result<(SocketAddr, Arc<AtomicUsize>)> {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/bootstrap", get(bootstrap))
        .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/empty", get(|| async { StatusCode::OK }))
        .route("/garbage", get(|| async { "definitely not json" }))
        .route("/no-content", get(|| async { StatusCode::NO_CONTENT }))
        .route("/accepted", get(|| async { StatusCode::ACCEPTED }))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, hits))
}

fn transport(addr: SocketAddr, path: &str) -> HttpTransport {
    HttpTransport::new(reqwest::Client::new(), &format!("http://{addr}{path}"), None)
}

fn request(etag: Option<&str>) -> BootstrapRequest {
    BootstrapRequest {
        role_key: "default".to_string(),
        if_none_match: etag.map(str::to_string),
    }
}

#[tokio::test]
async fn test_http_transport_conditional_get() -> Result<()> {
    let (addr, hits) = spawn_server().await?;
    let http = transport(addr, "/api/bootstrap");

    match http.fetch(&request(None)).await? {
        BootstrapResponse::Modified { body, etag } => {
            assert_eq!(etag.as_deref(), Some(ETAG_V1));
            assert_eq!(body["menu"][0]["code"], "inicio");
        }
        other => anyhow::bail!("expected a full response, got {other:?}"),
    }

    let revalidated = http.fetch(&request(Some(ETAG_V1))).await?;
    assert_eq!(revalidated, BootstrapResponse::NotModified);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_http_transport_error_mapping() -> Result<()> {
    let (addr, _) = spawn_server().await?;

    let err = transport(addr, "/broken").fetch(&request(None)).await.unwrap_err();
    assert_eq!(err, AppError::status(500));

    let err = transport(addr, "/garbage").fetch(&request(None)).await.unwrap_err();
    assert_eq!(err.kind(), "decode");

    // other 2xx statuses carry no payload and must not replace a snapshot
    let err = transport(addr, "/no-content").fetch(&request(None)).await.unwrap_err();
    assert_eq!(err, AppError::status(204));
    let err = transport(addr, "/accepted").fetch(&request(None)).await.unwrap_err();
    assert_eq!(err, AppError::status(202));

    let empty = transport(addr, "/empty").fetch(&request(None)).await?;
    assert_eq!(
        empty,
        BootstrapResponse::Modified {
            body: serde_json::Value::Null,
            etag: None
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_cache_over_http_reuses_snapshot_on_304() -> Result<()> {
    let (addr, hits) = spawn_server().await?;
    let config = BootstrapConfig {
        base_url: Some(format!("http://{addr}/")),
        ..BootstrapConfig::default()
    };
    let cache = BootstrapCache::from_config(&config, Arc::new(AnonymousIdentity))?;

    let first = cache.load_bootstrap(LoadOptions::new()).await?;
    let again = cache.load_bootstrap(LoadOptions::new().force()).await?;

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(Arc::ptr_eq(&first, &again));
    assert!(cache.is_feature_enabled("vendas", "aprovar", None, None));
    let info = cache.entry_info(None).context("entry missing")?;
    assert_eq!(info.etag.as_deref(), Some(ETAG_V1));
    Ok(())
}
