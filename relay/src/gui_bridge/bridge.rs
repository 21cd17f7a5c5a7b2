use crate::gui_bridge::model::{ModelSink, VisualizationModel};
use crate::workflow::runner::Runner;
use anyhow::{Context, Result};
use sacmescore::interface::{FileEvent, SweepEvent};
use sacmescore::prelude::{TrendError, TrendResult};
use sacmescore::processing::{Effect, IngestionGateway, SessionEvent};
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, reply::Response, Filter, Reply};

type SharedGateway = Arc<Mutex<IngestionGateway<ModelSink>>>;

fn status_for(error: &TrendError) -> StatusCode {
    if error.is_conflict() {
        StatusCode::CONFLICT
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

fn reply_for(result: TrendResult<Effect>) -> warp::reply::WithStatus<warp::reply::Json> {
    match result {
        Ok(_) => warp::reply::with_status(warp::reply::json(&json!({"status": "ok"})), StatusCode::OK),
        Err(err) => warp::reply::with_status(
            warp::reply::json(&json!({"status": "error", "message": err.to_string()})),
            status_for(&err),
        ),
    }
}

/// Hosts the HTTP endpoint and feeds incoming events through one gateway.
#[derive(Clone)]
pub struct GuiBridge {
    gateway: SharedGateway,
    state: Arc<RwLock<VisualizationModel>>,
}

impl GuiBridge {
    pub fn new(runner: &Runner) -> Result<Self> {
        let state = Arc::new(RwLock::new(VisualizationModel::default()));
        let gateway = runner.build_gateway(ModelSink::new(state.clone()))?;
        let bridge = Self {
            gateway: Arc::new(Mutex::new(gateway)),
            state,
        };
        bridge.sync_status(&bridge.lock());
        Ok(bridge)
    }

    /// Lifecycle events replace the rendered views; a rejected one leaves
    /// them as they were.
    pub fn handle(&self, event: SessionEvent) -> TrendResult<Effect> {
        let replaces_views = matches!(
            event,
            SessionEvent::Start { .. } | SessionEvent::Stop | SessionEvent::Reset
        );
        let mut gateway = self.lock();
        let saved = replaces_views.then(|| {
            let mut model = self.write_model();
            (model.trends.take(), model.sweep.take())
        });
        let result = gateway.handle(event);
        if let Some((trends, sweep)) = saved {
            let mut model = self.write_model();
            if result.is_err() {
                model.trends = trends;
                model.sweep = sweep;
            } else {
                model.revision += 1;
            }
        }
        self.sync_status(&gateway);
        result
    }

    pub fn with_gateway<R>(&self, apply: impl FnOnce(&mut IngestionGateway<ModelSink>) -> R) -> R {
        let mut gateway = self.lock();
        let out = apply(&mut *gateway);
        self.sync_status(&gateway);
        out
    }

    pub fn snapshot(&self) -> VisualizationModel {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn export_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.lock()
            .export_csv(&mut buffer)
            .context("writing session export")?;
        String::from_utf8(buffer).context("export produced invalid utf-8")
    }

    pub fn publish_status(&self, message: &str) {
        let model = self.snapshot();
        log::info!(
            "[bridge] {} (revision {}, accepted {}, rejected {})",
            message,
            model.revision,
            model.metrics.accepted,
            model.metrics.rejected + model.metrics.malformed
        );
    }

    /// Starts the HTTP endpoint on a background thread.
    pub fn serve(&self, addr: SocketAddr) -> Result<()> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building bridge runtime")?;
        let routes = self.routes();
        thread::spawn(move || {
            runtime.block_on(async move {
                match warp::serve(routes).try_bind_ephemeral(addr) {
                    Ok((bound, server)) => {
                        log::info!("bridge listening on http://{}", bound);
                        server.await;
                    }
                    Err(err) => log::error!("bridge failed to bind {}: {}", addr, err),
                }
            });
        });
        Ok(())
    }

    fn routes(&self) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone + Send + Sync + 'static {
        let bridge = self.clone();
        let bridge_filter = warp::any().map(move || bridge.clone());

        let payload_route = warp::path("payload")
            .and(warp::get())
            .and(bridge_filter.clone())
            .map(|bridge: GuiBridge| warp::reply::json(&bridge.snapshot()).into_response());

        let ingest_route = warp::path("ingest")
            .and(warp::post())
            .and(warp::body::json())
            .and(bridge_filter.clone())
            .map(|event: FileEvent, bridge: GuiBridge| {
                reply_for(bridge.handle(SessionEvent::File(event))).into_response()
            });

        let sweep_route = warp::path("sweep")
            .and(warp::post())
            .and(warp::body::json())
            .and(bridge_filter.clone())
            .map(|event: SweepEvent, bridge: GuiBridge| {
                reply_for(bridge.handle(SessionEvent::Sweep(event))).into_response()
            });

        let event_route = warp::path("event")
            .and(warp::post())
            .and(warp::body::json())
            .and(bridge_filter.clone())
            .map(|event: SessionEvent, bridge: GuiBridge| reply_for(bridge.handle(event)).into_response());

        let export_route = warp::path("export")
            .and(warp::get())
            .and(bridge_filter)
            .map(|bridge: GuiBridge| match bridge.export_csv() {
                Ok(csv) => warp::reply::with_header(csv, "content-type", "text/csv").into_response(),
                Err(err) => {
                    log::error!("export error: {:#}", err);
                    warp::reply::with_status(
                        warp::reply::json(&json!({"status": "error", "message": err.to_string()})),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )
                    .into_response()
                }
            });

        payload_route
            .or(ingest_route)
            .unify()
            .or(sweep_route)
            .unify()
            .or(event_route)
            .unify()
            .or(export_route)
            .unify()
    }

    fn lock(&self) -> MutexGuard<'_, IngestionGateway<ModelSink>> {
        self.gateway.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_model(&self) -> RwLockWriteGuard<'_, VisualizationModel> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn sync_status(&self, gateway: &IngestionGateway<ModelSink>) {
        let mut model = self.write_model();
        model.diagnostics = gateway.diagnostics();
        model.halted = gateway.session().halted().map(str::to_string);
        model.metrics = gateway.metrics();
    }
}
