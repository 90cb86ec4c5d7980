use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::pages;
use super::state::AppState;
use crate::clock::local_now;
use crate::constants::API_VERSION;
use crate::database::{NodeView, NormalizedReading, SensorReading};
use crate::display::{ElementId, TextBoard};
use crate::map::MapScene;
use crate::nodes::{store_id, Node};
use crate::telemetry::{TelemetryPanel, TelemetryReading};
use crate::views::{DroneView, NodeDetailView, NodeMapView, RefreshPeriods};

#[derive(RustEmbed)]
#[folder = "frontend/"]
struct Asset;

pub type ApiError = (StatusCode, Json<Value>);
pub type PageError = (StatusCode, Html<String>);

fn api_error(status: StatusCode, body: Value) -> ApiError {
    (status, Json(body))
}

fn internal_error(context: &str, e: anyhow::Error) -> ApiError {
    tracing::error!("{} failed: {:#}", context, e);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": format!("Failed to {}", context) }),
    )
}

fn page_error(status: StatusCode, message: &str) -> PageError {
    (status, Html(pages::error_page(message)))
}

/// Simple MIME type detection based on file extension
fn get_mime_type(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("json") => "application/json",
        Some("html") => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Deserialize)]
pub struct RegionQuery {
    pub region: Option<String>,
}

// ---- Drone telemetry ----

pub async fn drone_telemetry(State(state): State<AppState>) -> Result<Json<TelemetryReading>, ApiError> {
    let mut drone = state
        .drone
        .lock()
        .map_err(|_| internal_error("get drone telemetry", anyhow::anyhow!("simulator lock poisoned")))?;
    Ok(Json(drone.next_reading()))
}

#[derive(Debug, Serialize)]
pub struct DronePanel {
    pub reading: TelemetryReading,
    pub panel: TelemetryPanel,
}

/// One reading together with its display strings, for the drone page script.
pub async fn drone_panel(State(state): State<AppState>) -> Result<Json<DronePanel>, ApiError> {
    let Json(reading) = drone_telemetry(State(state)).await?;
    let panel = TelemetryPanel::from(&reading);
    Ok(Json(DronePanel { reading, panel }))
}

// ---- Nodes ----

fn nodes_in_scope(state: &AppState, region: Option<&str>) -> anyhow::Result<Vec<Node>> {
    match region {
        Some(region) => state.store.nodes_for_region(region),
        None => state.store.all_nodes(),
    }
}

fn node_map_view(nodes: &[Node], targets: &[ElementId]) -> NodeMapView<MapScene, TextBoard> {
    let mut view = NodeMapView::new(MapScene::new(), TextBoard::with_targets(targets));
    view.render(nodes);
    view
}

// Clock text for detail pages, rendered once at request time
fn detail_clock() -> TextBoard {
    let mut view = NodeDetailView::new(TextBoard::with_targets(&[ElementId::CurrentTime, ElementId::CurrentDate]));
    view.tick_clock(&local_now());
    view.surface().clone()
}

pub async fn api_nodes(
    State(state): State<AppState>,
    Query(query): Query<RegionQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(region) = query.region.filter(|r| !r.is_empty()) else {
        tracing::warn!("/api/nodes called without a region");
        return Err(api_error(StatusCode::BAD_REQUEST, json!({ "error": "region not specified" })));
    };

    let nodes = state
        .store
        .nodes_for_region(&region)
        .map_err(|e| internal_error("fetch nodes", e))?;
    tracing::info!("/api/nodes: {} node(s) for region {}", nodes.len(), region);

    if nodes.is_empty() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            json!({ "error": "No nodes found for this region", "region": region }),
        ));
    }

    Ok(Json(json!({
        "nodes": nodes,
        "region": region,
        "count": nodes.len(),
    })))
}

pub async fn api_node_map(
    State(state): State<AppState>,
    Query(query): Query<RegionQuery>,
) -> Result<Json<MapScene>, ApiError> {
    let nodes = nodes_in_scope(&state, query.region.as_deref()).map_err(|e| internal_error("render node map", e))?;
    Ok(Json(node_map_view(&nodes, &[]).into_map()))
}

pub async fn api_node(
    State(state): State<AppState>,
    AxumPath(node_id): AxumPath<String>,
) -> Result<Json<Value>, ApiError> {
    let sid = store_id(&node_id);
    let view = state.store.node_view(&sid).map_err(|e| internal_error("fetch node", e))?;

    match view {
        Some(view) => {
            let has_history = view.latest.is_some();
            Ok(Json(json!({ "node": view, "has_history": has_history })))
        }
        None => {
            tracing::warn!("/api/node/{}: node not found", node_id);
            Err(api_error(
                StatusCode::NOT_FOUND,
                json!({ "error": "Node not found", "node_id": node_id, "store_id": sid }),
            ))
        }
    }
}

pub async fn api_history(
    State(state): State<AppState>,
    AxumPath(node_id): AxumPath<String>,
) -> Result<Json<Value>, ApiError> {
    let sid = store_id(&node_id);
    let history: Vec<NormalizedReading> = state
        .store
        .history(&sid)
        .map_err(|e| internal_error("fetch history", e))?
        .iter()
        .map(SensorReading::normalize)
        .collect();

    Ok(Json(json!({
        "count": history.len(),
        "history": history,
        "node_id": node_id,
        "store_id": sid,
    })))
}

pub async fn api_parent_reports(
    State(state): State<AppState>,
    AxumPath(node_id): AxumPath<String>,
) -> Result<Json<Value>, ApiError> {
    let sid = store_id(&node_id);
    let reports = state
        .store
        .parent_reports(&sid)
        .map_err(|e| internal_error("fetch reports", e))?;

    Ok(Json(json!({
        "count": reports.len(),
        "reports": reports,
        "parent_id": node_id,
        "store_id": sid,
    })))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let node_count = state.store.node_count().ok();
    Json(json!({
        "status": if node_count.is_some() { "healthy" } else { "degraded" },
        "version": API_VERSION,
        "nodes": node_count,
        "endpoints": [
            "/api/drone_telemetry",
            "/api/drone_panel",
            "/api/nodes",
            "/api/node_map",
            "/api/node/<node_id>",
            "/api/history/<node_id>",
            "/api/parent/<node_id>/reports",
            "/api/health"
        ]
    }))
}

// ---- Pages ----

pub async fn index() -> Redirect {
    Redirect::to("/dashboard")
}

pub async fn dashboard_page(
    State(state): State<AppState>,
    Query(query): Query<RegionQuery>,
) -> Result<Html<String>, PageError> {
    let region = query.region.filter(|r| !r.is_empty());
    let nodes = nodes_in_scope(&state, region.as_deref()).map_err(|e| {
        tracing::error!("Error loading dashboard: {:#}", e);
        page_error(StatusCode::INTERNAL_SERVER_ERROR, "Σφάλμα φόρτωσης κόμβων.")
    })?;
    let mut view = node_map_view(
        &nodes,
        &[ElementId::DbUpdateTime, ElementId::CurrentTime, ElementId::CurrentDate],
    );
    view.tick_clock(&local_now());
    let html = pages::dashboard_page(region.as_deref(), &nodes, view.map());
    Ok(Html(pages::prefill(html, view.surface())))
}

pub async fn drone_page(State(state): State<AppState>) -> Html<String> {
    let settings = &state.settings;
    // Initial map only; the page script polls telemetry and moves the marker
    let view = DroneView::new(
        MapScene::new(),
        TextBoard::empty(),
        &settings.drone_image_url,
        RefreshPeriods::from(settings.as_ref()),
    );
    Html(pages::drone_page(
        &settings.drone_image_url,
        view.map(),
        view.marker(),
        settings.telemetry_interval_ms,
    ))
}

// Node view, hidden when the caller's region does not own the node
fn visible_node_view(state: &AppState, sid: &str, region: Option<&str>) -> anyhow::Result<Option<NodeView>> {
    let Some(view) = state.store.node_view(sid)? else {
        return Ok(None);
    };
    if let Some(region) = region {
        if !state.store.node_visible_to(sid, region)? {
            tracing::warn!("Node {} is not visible to region {}", sid, region);
            return Ok(None);
        }
    }
    Ok(Some(view))
}

pub async fn node_page(
    State(state): State<AppState>,
    AxumPath(node_id): AxumPath<String>,
    Query(query): Query<RegionQuery>,
) -> Result<Html<String>, PageError> {
    let region = query.region.filter(|r| !r.is_empty());
    let view = visible_node_view(&state, &store_id(&node_id), region.as_deref()).map_err(|e| {
        tracing::error!("Error in /node/{}: {:#}", node_id, e);
        page_error(StatusCode::INTERNAL_SERVER_ERROR, "Σφάλμα φόρτωσης κόμβου.")
    })?;
    match view {
        Some(view) => Ok(Html(pages::prefill(pages::node_page(&view), &detail_clock()))),
        None => Err(page_error(StatusCode::NOT_FOUND, &format!("Ο κόμβος {} δεν βρέθηκε.", node_id))),
    }
}

pub async fn nodes_page(
    State(state): State<AppState>,
    Query(query): Query<RegionQuery>,
) -> Result<Html<String>, PageError> {
    let region = query.region.filter(|r| !r.is_empty());
    let nodes = nodes_in_scope(&state, region.as_deref()).map_err(|e| {
        tracing::error!("Error rendering nodes: {:#}", e);
        page_error(StatusCode::INTERNAL_SERVER_ERROR, "Σφάλμα φόρτωσης κόμβων.")
    })?;
    Ok(Html(pages::prefill(pages::nodes_page(region.as_deref(), &nodes), &detail_clock())))
}

pub async fn history_page(
    State(state): State<AppState>,
    AxumPath(node_id): AxumPath<String>,
) -> Result<Html<String>, PageError> {
    let sid = store_id(&node_id);
    let lookup = state
        .store
        .node(&sid)
        .and_then(|node| Ok((node, state.store.history(&sid)?)));
    let (node, history) = lookup.map_err(|e| {
        tracing::error!("Error in /history/{}: {:#}", node_id, e);
        page_error(StatusCode::INTERNAL_SERVER_ERROR, "Σφάλμα φόρτωσης ιστορικού.")
    })?;

    // Readings alone are enough to show the page when the node has no record
    if node.is_none() && history.is_empty() {
        return Err(page_error(StatusCode::NOT_FOUND, &format!("Ο κόμβος {} δεν βρέθηκε.", node_id)));
    }
    let readings: Vec<NormalizedReading> = history.iter().map(SensorReading::normalize).collect();
    let html = pages::history_page(&sid, node.as_ref(), &readings);
    Ok(Html(pages::prefill(html, &detail_clock())))
}

pub async fn parent_page(
    State(state): State<AppState>,
    AxumPath(node_id): AxumPath<String>,
) -> Result<Html<String>, PageError> {
    let sid = store_id(&node_id);
    let lookup = state
        .store
        .node(&sid)
        .and_then(|node| Ok((node, state.store.parent_reports(&sid)?)));
    match lookup {
        Ok((Some(parent), reports)) => Ok(Html(pages::prefill(pages::parent_page(&parent, &reports), &detail_clock()))),
        Ok((None, _)) => Err(page_error(StatusCode::NOT_FOUND, &format!("Ο γονικός κόμβος {} δεν βρέθηκε.", node_id))),
        Err(e) => {
            tracing::error!("Error in /parent/{}: {:#}", node_id, e);
            Err(page_error(StatusCode::INTERNAL_SERVER_ERROR, "Σφάλμα φόρτωσης αναφορών."))
        }
    }
}

pub async fn static_asset(AxumPath(path): AxumPath<String>) -> Response {
    match Asset::get(&path) {
        Some(content) => (
            [
                (header::CONTENT_TYPE, get_mime_type(&path)),
                (header::CACHE_CONTROL, "public, max-age=3600"),
            ],
            content.data.into_owned(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn not_found() -> PageError {
    page_error(StatusCode::NOT_FOUND, "Η σελίδα δεν βρέθηκε.")
}
