use super::page::{render_dashboard, CategoryListing, DashboardView};
use super::responses::{file_response, ApiError, Disposition};
use super::server::AppState;
use crate::error::LapsecamError;
use crate::media::Category;
use crate::session::{TimelapseParameters, VideoParameters};
use axum::body::Body;
use axum::extract::{Form, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Lenient integer query value; anything unparsable counts as absent
fn int_param(value: &Option<String>) -> Option<i64> {
    value.as_deref().and_then(|v| v.trim().parse().ok())
}

fn back_to_dashboard() -> Redirect {
    Redirect::to("/")
}

pub async fn dashboard_handler(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let mut listings = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        listings.push(CategoryListing {
            category,
            assets: state.store.list_assets(category).await?,
        });
    }

    let disk = match state.health.disk_usage().await {
        Ok(usage) => Some(usage.report()),
        Err(e) => {
            warn!("Disk usage unavailable: {}", e);
            None
        }
    };

    let view = DashboardView {
        listings,
        disk,
        temperature: state.health.cpu_temperature().await,
        session: state.session.status(),
        camera_available: state.session.camera_available(),
    };

    Ok(Html(render_dashboard(&view)))
}

pub async fn start_photo_capture_handler(State(state): State<AppState>) -> Redirect {
    match state.session.capture_photo().await {
        Ok(Some(asset)) => info!("Photo request stored {}", asset.key()),
        Ok(None) => warn!("Photo request ignored: no camera"),
        Err(e) if e.is_busy() => warn!("Photo request rejected: {}", e),
        // Already logged by the session
        Err(_) => {}
    }
    back_to_dashboard()
}

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    duration: Option<String>,
}

pub async fn start_video_capture_handler(
    State(state): State<AppState>,
    Query(query): Query<VideoQuery>,
) -> Redirect {
    let started = VideoParameters::from_request(int_param(&query.duration))
        .map_err(LapsecamError::from)
        .and_then(|params| state.session.start_video(params));

    match started {
        Ok(_) => info!("Video recording started"),
        Err(e) => warn!("Video request rejected: {}", e),
    }
    back_to_dashboard()
}

#[derive(Debug, Deserialize)]
pub struct TimelapseQuery {
    interval: Option<String>,
    duration: Option<String>,
}

pub async fn start_timelapse_handler(
    State(state): State<AppState>,
    Query(query): Query<TimelapseQuery>,
) -> Redirect {
    let started = TimelapseParameters::from_request(
        int_param(&query.interval),
        int_param(&query.duration),
    )
    .map_err(LapsecamError::from)
    .and_then(|params| state.session.start_timelapse(params));

    match started {
        Ok(_) => info!("Timelapse started"),
        Err(e) => warn!("Timelapse request rejected: {}", e),
    }
    back_to_dashboard()
}

pub async fn stop_timelapse_handler(State(state): State<AppState>) -> Redirect {
    if !state.session.stop() {
        debug!("Stop requested while idle");
    }
    back_to_dashboard()
}

/// Handler for the MJPEG live preview
pub async fn mjpeg_stream_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let Some(mut preview) = state.session.open_preview().await? else {
        return Ok((StatusCode::SERVICE_UNAVAILABLE, "No camera available").into_response());
    };

    info!("New MJPEG stream client connected");
    let frame_interval_period = state.frame_interval;
    let shutdown = state.shutdown.clone();

    let stream = async_stream::stream! {
        let mut frame_interval = interval(frame_interval_period);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut frames_streamed = 0u64;

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => None,
                frame = async {
                    frame_interval.tick().await;
                    preview.next_frame().await
                } => frame,
            };

            let Some(jpeg) = next else {
                info!("MJPEG stream closed after {} frames", frames_streamed);
                break;
            };
            frames_streamed += 1;

            yield Ok::<_, std::io::Error>(Bytes::from_static(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
            yield Ok(jpeg);
            yield Ok(Bytes::from_static(b"\r\n"));
        }
    };

    let headers = [
        (header::CONTENT_TYPE, "multipart/x-mixed-replace; boundary=frame"),
        (header::CACHE_CONTROL, "no-cache, private"),
        (header::PRAGMA, "no-cache"),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

pub async fn download_handler(
    State(state): State<AppState>,
    Path(filepath): Path<String>,
) -> Result<Response, ApiError> {
    let (category, name) = state.store.resolve(&filepath)?;
    let path = state.store.archive_asset(category, &name).await?;
    file_response(&path, Disposition::Attachment).await
}

pub async fn download_all_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Response, ApiError> {
    let category: Category = category.parse()?;
    let path = state.store.archive_category(category).await?;
    file_response(&path, Disposition::Attachment).await
}

pub async fn thumbnail_handler(
    State(state): State<AppState>,
    Path(filepath): Path<String>,
) -> Result<Response, ApiError> {
    let (category, name) = state.store.resolve(&filepath)?;
    let Some(asset) = state.store.describe(category, &name).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    match state.store.thumbnail_for(&asset).await? {
        Some(path) => file_response(&path, Disposition::Inline).await,
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    filepath: Option<String>,
}

pub async fn delete_handler(
    State(state): State<AppState>,
    Form(form): Form<DeleteForm>,
) -> Result<Redirect, ApiError> {
    if let Some(filepath) = form.filepath.filter(|p| !p.trim().is_empty()) {
        let (category, name) = state.store.resolve(&filepath)?;
        state.store.delete_asset(category, &name).await?;
    }
    Ok(back_to_dashboard())
}

pub async fn delete_all_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Redirect, ApiError> {
    let category: Category = category.parse()?;
    state.store.delete_category(category).await?;
    Ok(back_to_dashboard())
}

pub async fn disk_usage_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let usage = state.health.disk_usage().await?;
    Ok(Json(usage.report()))
}

pub async fn cpu_temperature_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "celsius": state.health.cpu_temperature().await }))
}

pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.session.status();
    Json(serde_json::json!({
        "status": snapshot.status,
        "cancel_requested": snapshot.cancel_requested,
        "camera_available": state.session.camera_available(),
    }))
}

pub async fn shutdown_handler(State(state): State<AppState>) -> Redirect {
    if !state.power.request_power_off() {
        error!("Shutdown requested but could not be started");
    }
    back_to_dashboard()
}
