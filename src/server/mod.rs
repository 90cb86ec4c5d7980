use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod handlers;
pub mod pages;
pub mod state;

pub use self::state::AppState;
use handlers::{
    api_history, api_node, api_node_map, api_nodes, api_parent_reports, dashboard_page, drone_page,
    drone_panel, drone_telemetry, health, history_page, index, node_page, nodes_page, not_found,
    parent_page, static_asset,
};

// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/dashboard", get(dashboard_page))
        .route("/drone", get(drone_page))
        .route("/nodes", get(nodes_page))
        .route("/node/:node_id", get(node_page))
        .route("/history/:node_id", get(history_page))
        .route("/parent/:node_id", get(parent_page))
        .route("/static/*path", get(static_asset))
        .route("/api/drone_telemetry", get(drone_telemetry))
        .route("/api/drone_panel", get(drone_panel))
        .route("/api/nodes", get(api_nodes))
        .route("/api/node_map", get(api_node_map))
        .route("/api/node/:node_id", get(api_node))
        .route("/api/history/:node_id", get(api_history))
        .route("/api/parent/:node_id/reports", get(api_parent_reports))
        .route("/api/health", get(health))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState) -> Result<()> {
    let addr = state.settings.bind_addr();
    let app = create_app(state);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("HTTP server listening on {}", addr);
    println!("   🌐 Server running at http://{}", addr);
    println!("   🗺️  Pages:");
    println!("      - /dashboard?region=<name> - Node map");
    println!("      - /drone - Drone surveillance");
    println!("      - /nodes?region=<name> - Node list");
    println!("      - /node/<id>, /parent/<id>, /history/<id> - Node details");
    println!("   📡 API: /api/drone_telemetry, /api/nodes, /api/node_map, /api/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NodeStore;
    use crate::settings::Settings;
    use crate::simulator::DroneSimulator;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        create_app(AppState::new(NodeStore::default(), DroneSimulator::seeded(42), Settings::default()))
    }

    fn with_region(path: &str, region: &str) -> String {
        let url = reqwest::Url::parse_with_params(&format!("http://localhost{}", path), &[("region", region)]).unwrap();
        format!("{}?{}", url.path(), url.query().unwrap_or_default())
    }

    async fn get(uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let (status, body) = get(uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn telemetry_has_the_reading_shape() {
        let (status, body) = get_json("/api/drone_telemetry").await;
        assert_eq!(status, StatusCode::OK);
        for key in ["location", "movement", "battery", "fire_detection"] {
            assert!(body.get(key).is_some(), "missing {}", key);
        }
        let reading: crate::telemetry::TelemetryReading = serde_json::from_value(body).unwrap();
        assert!((reading.battery.percentage - 77.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn panel_is_formatted() {
        let (status, body) = get_json("/api/drone_panel").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["panel"]["location"].as_str().unwrap().ends_with("° E"));
        assert_eq!(body["panel"]["battery"], "78% (11.1V)");
    }

    #[tokio::test]
    async fn nodes_require_a_region() {
        let (status, body) = get_json("/api/nodes").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "region not specified");
    }

    #[tokio::test]
    async fn nodes_for_region() {
        let (status, body) = get_json(&with_region("/api/nodes", "Ανατολικής Μακεδονίας και Θράκης")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 7);

        let (status, body) = get_json(&with_region("/api/nodes", "Κρήτης")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["region"], "Κρήτης");
    }

    #[tokio::test]
    async fn node_map_links_children_to_parents() {
        let (status, body) = get_json("/api/node_map").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["markers"].as_array().unwrap().len(), 7);
        assert_eq!(body["lines"].as_array().unwrap().len(), 5);
        assert_eq!(body["zoom"], 10);
    }

    #[tokio::test]
    async fn node_accepts_dotted_ids() {
        let (status, body) = get_json("/api/node/1.1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["node"]["node_id"], "N1_1");
        assert_eq!(body["has_history"], true);

        let (status, body) = get_json("/api/node/9.9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["store_id"], "N9_9");
    }

    #[tokio::test]
    async fn history_and_reports() {
        let (_, body) = get_json("/api/history/N1_1").await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["history"][0]["gas_and_smoke"], 0.1);

        let (_, body) = get_json("/api/parent/1/reports").await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["store_id"], "N1");
    }

    #[tokio::test]
    async fn health_lists_endpoints() {
        let (status, body) = get_json("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["nodes"], 7);
    }

    #[tokio::test]
    async fn pages_render() {
        let (status, body) = get("/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("window.NODE_MAP_SCENE"));

        let (status, body) = get("/drone").await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains("window.DRONE_MAP_SCENE = {\"center\":{\"lat\":40.8,\"lng\":23.5},\"zoom\":7"));
        assert!(html.contains("opentopomap"));

        let (status, body) = get("/node/1.2").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("Node 1.2"));

        let (status, _) = get("/parent/2").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get("/node/404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn node_page_respects_region() {
        let (status, _) = get(&with_region("/node/1.1", "Ανατολικής Μακεδονίας και Θράκης")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get(&with_region("/node/1.1", "Αρχηγείο / Ε.Σ.Κ.Ε.ΔΙ.Κ.")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get(&with_region("/node/1.1", "Κρήτης")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn nodes_page_lists_nodes() {
        let (status, body) = get("/nodes").await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains("href=\"/parent/1\""));
        assert!(html.contains("href=\"/node/2.2\""));

        let (status, body) = get(&with_region("/nodes", "Κρήτης")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("Δεν βρέθηκαν κόμβοι"));
    }

    #[tokio::test]
    async fn history_page_shows_readings_or_message() {
        let (status, body) = get("/history/N1_1").await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains("2024-01-15T10:00:00Z"));
        assert!(!html.contains("No historical data available"));

        let (status, body) = get("/history/1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("No historical data available"));

        let (status, _) = get("/history/N9_9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn root_redirects_to_dashboard() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/dashboard");
    }

    #[tokio::test]
    async fn static_assets_are_embedded() {
        let response = app()
            .oneshot(Request::builder().uri("/static/drone.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/javascript");

        let (status, body) = get("/static/scene.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("window.replayScene"));

        let (status, _) = get("/static/missing.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
