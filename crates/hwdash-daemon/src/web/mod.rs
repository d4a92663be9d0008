//! Read-only JSON API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::chart::{ChartSeries, ChartWindow};
use crate::snapshots::{MemorySnapshot, Metric};
use crate::state::{AppState, DeviceStatus, StaticInfo};

/// Creates the web router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/info", get(info))
        .route("/api/live", get(live))
        .route("/api/charts", get(charts))
        .route("/api/charts/:series", get(chart))
        .route("/api/memory", get(memory))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct InfoResponse {
    #[serde(flatten)]
    info: StaticInfo,
    devices: Vec<DeviceStatus>,
}

/// GET /api/info - Static hardware facts and snapshot readiness
async fn info(State(state): State<Arc<AppState>>) -> Response {
    // Readiness waits for any refresh in progress.
    let devices = {
        let state = state.clone();
        tokio::task::spawn_blocking(move || state.devices()).await
    };
    match devices {
        Ok(devices) => Json(InfoResponse {
            info: state.info().clone(),
            devices,
        })
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read device status: {e}"),
        )
            .into_response(),
    }
}

/// GET /api/live - Debounced live values
async fn live(State(state): State<Arc<AppState>>) -> Json<BTreeMap<Metric, Option<String>>> {
    Json(state.live())
}

/// GET /api/charts - Every configured chart window
async fn charts(State(state): State<Arc<AppState>>) -> Json<Vec<ChartWindow>> {
    Json(state.charts())
}

/// GET /api/charts/:series - One chart window
async fn chart(State(state): State<Arc<AppState>>, Path(series): Path<String>) -> Response {
    let Ok(series) = series.parse::<ChartSeries>() else {
        return (StatusCode::NOT_FOUND, format!("Unknown chart series '{series}'")).into_response();
    };
    match state.chart(series) {
        Some(window) => Json(window).into_response(),
        None => (StatusCode::NOT_FOUND, format!("Chart '{series}' is not enabled")).into_response(),
    }
}

/// GET /api/memory - Installed memory modules
async fn memory(State(state): State<Arc<AppState>>) -> Json<MemorySnapshot> {
    Json(state.memory().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{Aggregator, LiveValues};
    use crate::chart::ChartPoller;
    use crate::snapshots::{
        CpuSnapshot, DeviceSnapshot, GpuSnapshot, MotherboardSnapshot, Sources, StorageSnapshot,
    };
    use hwdash_hw::{Backend, FixtureBackend, StaticInventory};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn demo_state(cancel: &CancellationToken) -> (Arc<AppState>, ChartPoller) {
        let backend = FixtureBackend::demo();
        let inventory = Arc::new(StaticInventory::demo());
        let sources = Sources::new(
            move || Box::new(backend.clone()) as Box<dyn Backend>,
            inventory.clone(),
        );

        let cpu = CpuSnapshot::open(&sources).unwrap();
        let gpu = GpuSnapshot::open(&sources).unwrap();
        let board = MotherboardSnapshot::open(&sources).unwrap();
        let storage = StorageSnapshot::open(&sources).unwrap();
        let info = StaticInfo::collect(&cpu, &gpu, &board, &storage);
        let memory = MemorySnapshot::load(inventory.as_ref());

        let (inputs, live) = LiveValues::channels(Duration::from_secs(1), cancel);
        let snapshots: Vec<Box<dyn DeviceSnapshot>> =
            vec![Box::new(cpu), Box::new(gpu), Box::new(board), Box::new(storage)];
        let aggregator = Arc::new(Aggregator::new(snapshots, inputs));

        let snapshot = ChartSeries::CpuTemperature.open_snapshot(&sources).unwrap();
        let (poller, rx) = ChartPoller::new(ChartSeries::CpuTemperature, snapshot, 20);
        let state = AppState::new(info, memory, live, aggregator, vec![rx]);
        (Arc::new(state), poller)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_info_reports_devices() {
        let cancel = CancellationToken::new();
        let (state, _) = demo_state(&cancel);
        let response = info(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["devices"].as_array().map(Vec::len), Some(4));
        assert!(json["cpu"]["name"].is_string());
        assert!(json["board"]["manufacturer"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_lists_every_metric() {
        let cancel = CancellationToken::new();
        let (state, _) = demo_state(&cancel);
        let Json(values) = live(State(state)).await;
        assert_eq!(values.len(), Metric::ALL.len());
        assert!(values.values().all(Option::is_none));
    }

    #[tokio::test(start_paused = true)]
    async fn test_chart_lookup() {
        let cancel = CancellationToken::new();
        let (state, mut poller) = demo_state(&cancel);
        poller.poll();

        let response = chart(State(state.clone()), Path("cpu-temperature".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["series"], "cpu-temperature");
        assert_eq!(json["points"].as_array().map(Vec::len), Some(1));

        let disabled = chart(State(state.clone()), Path("gpu-clock".to_string())).await;
        assert_eq!(disabled.status(), StatusCode::NOT_FOUND);
        let unknown = chart(State(state), Path("fan".to_string())).await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_total() {
        let cancel = CancellationToken::new();
        let (state, _) = demo_state(&cancel);
        let Json(snapshot) = memory(State(state)).await;
        assert!(!snapshot.modules.is_empty());
        assert!(snapshot.total.ends_with(" GB"));
    }
}
