//! HTTP routes and request handlers

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::{Body, Bytes};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use moonbot_core::{MoonbotError, PhotoTag, Settings, SettingsUpdate, StoreUsage};
use moonbot_media::CONTENT_TYPE as STREAM_CONTENT_TYPE;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

/// RFC 5987 `attr-char` minus the alphanumerics
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>MoonBot Live</title></head>
<body>
<h1>MoonBot Live</h1>
<img src="/video" alt="live feed"><br><br>
<button id="capture" style="width:200px;height:50px;">CAPTURE HIGH-RES PHOTO</button>
<p id="result"></p>
<script>
document.getElementById("capture").onclick = async () => {
  const res = await fetch("/capture", { method: "POST" });
  const body = await res.json();
  document.getElementById("result").textContent =
    body.status === "success" ? "Saved " + body.filename : "Error: " + body.message;
};
</script>
</body>
</html>
"#;

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/video", get(video_feed))
        .route("/capture", post(capture))
        .route("/burst", post(burst))
        .route("/gallery", get(gallery))
        .route("/photos/:name", get(photo))
        .route("/download/:name", get(download))
        .route("/delete/:name", post(delete_photo))
        .route("/delete_all", post(delete_all))
        .route("/system", get(system))
        .route("/settings", get(get_settings).post(update_settings))
        .with_state(state)
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Live multipart stream, one producer per connection
pub async fn video_feed(State(state): State<AppState>) -> Response {
    let viewer = state.open_viewer();
    (
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store"),
        ],
        Body::from_stream(viewer),
    )
        .into_response()
}

pub async fn capture(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let record = state.capture.capture_one(PhotoTag::Shot).await?;
    Ok(Json(json!({
        "status": "success",
        "filename": record.name,
        "photo": record,
    })))
}

/// Optional `/burst` body. `delay` is in seconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BurstRequest {
    pub count: Option<i64>,
    pub delay: Option<f64>,
}

impl BurstRequest {
    /// Resolve defaults and check limits
    fn resolve(&self, state: &AppState) -> Result<(u32, Duration), MoonbotError> {
        let limits = &state.config.burst;

        let count = match self.count {
            None => limits.default_count,
            Some(count) if (1..=i64::from(limits.max_count)).contains(&count) => count as u32,
            Some(count) => {
                return Err(MoonbotError::validation(
                    "count",
                    format!("{count} not in 1..={}", limits.max_count),
                ))
            }
        };

        let delay = match self.delay {
            None => limits.default_delay,
            Some(delay) if (0.0..=limits.max_delay.as_secs_f64()).contains(&delay) => {
                Duration::from_secs_f64(delay)
            }
            Some(delay) => {
                return Err(MoonbotError::validation(
                    "delay",
                    format!(
                        "{delay} not in 0..={} seconds",
                        limits.max_delay.as_secs_f64()
                    ),
                ))
            }
        };

        Ok((count, delay))
    }
}

/// Burst capture. An empty body uses the configured defaults.
pub async fn burst(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let request: BurstRequest = if body.iter().all(u8::is_ascii_whitespace) {
        BurstRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| MoonbotError::validation("body", e.to_string()))?
    };
    let (count, delay) = request.resolve(&state)?;

    let records = state.capture.capture_burst(count, delay).await;
    let files: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    Ok(Json(json!({
        "status": "success",
        "files": files,
        "count": records.len(),
    })))
}

pub async fn gallery(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let photos = state.store.list().await?;
    let total_size: u64 = photos.iter().map(|p| p.size).sum();
    Ok(Json(json!({
        "count": photos.len(),
        "total_size": total_size,
        "photos": photos,
    })))
}

pub async fn photo(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Response> {
    let bytes = state.store.read(&name).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

pub async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let bytes = state.store.read(&name).await?;
    let disposition = content_disposition(&name);
    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `attachment` disposition that stays a valid header value for any stored name
fn content_disposition(name: &str) -> String {
    let quotable = |c: char| (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\';
    if name.chars().all(quotable) {
        return format!("attachment; filename=\"{name}\"");
    }
    let fallback: String = name
        .chars()
        .map(|c| if quotable(c) { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        utf8_percent_encode(name, FILENAME_ENCODE_SET)
    )
}

pub async fn delete_photo(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    state.store.delete(&name).await?;
    Ok(Json(json!({ "status": "success" })))
}

pub async fn delete_all(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let deleted = state.store.delete_all().await?;
    Ok(Json(json!({ "status": "success", "deleted": deleted })))
}

/// Host telemetry and service health. Always answers, camera or not.
pub async fn system(State(state): State<AppState>) -> Json<Value> {
    let host = state.telemetry.snapshot(state.store.dir()).await;
    let usage = state.store.usage().await.unwrap_or_else(|e| {
        warn!(error = %e, "Photo store usage unavailable");
        StoreUsage::default()
    });
    let settings = state.settings.get();

    Json(json!({
        "cpu_temp": host.cpu_temp,
        "disk_total": host.disk_total,
        "disk_used": host.disk_used,
        "disk_free": host.disk_free,
        "disk_percent": host.disk_percent,
        "photo_count": usage.count,
        "photos_size": usage.total_size,
        "auto_capture_interval": settings.auto_capture_interval,
        "camera": {
            "device": state.gateway.device_name(),
            "stats": state.gateway.stats(),
        },
        "auto_capture": state.auto_capture.status(),
        "viewers": state.viewer_count(),
    }))
}

pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings.get())
}

pub async fn update_settings(
    State(state): State<AppState>,
    body: Result<Json<SettingsUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(update) = body.map_err(ApiError::from)?;
    let settings = state.settings.update(&update)?;
    Ok(Json(json!({ "status": "success", "settings": settings })))
}
