//! REST API for the lattice optimizer.
//!
//! Provides HTTP endpoints for the lattice configurator frontend.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::catalog::{Catalog, CatalogError};
use crate::config::{ApiConfig, OptimizerConfig};
use crate::geometry::{AxisLayout, LatticeLayout};
use crate::model::{Cardboard, Comb, ItemSpec, NotchSelection, ValidationError};
use crate::optimizer::{
    Infeasible, LatticeConfig, OptimizeError, OptimizeEvent, SkipReason, Solution,
    optimize_with_progress,
};
use crate::packaging::CardboardChoice;
use crate::session::Session;
use crate::types::Axis;

#[derive(Clone)]
struct ApiState {
    optimizer_config: OptimizerConfig,
    catalog: Arc<Catalog>,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>lattice_pack API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the optimize endpoints.
///
/// `combs` and `cardboards` replace the service catalog for this request
/// only; omitted lists fall back to it.
#[derive(Deserialize, Clone, ToSchema)]
#[schema(
    example = json!({
        "item": { "w": 50.0, "d": 50.0, "h": 50.0, "m": 2.0, "q": 100 },
        "cardboards": [
            { "name": "K-700", "width": 700.0, "length": 700.0, "depth": 220.0, "price": 5.0 }
        ]
    })
)]
pub struct OptimizeRequest {
    pub item: ItemSpec,
    #[serde(default)]
    #[schema(nullable = true)]
    pub combs: Option<Vec<Comb>>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub cardboards: Option<Vec<Cardboard>>,
}

#[derive(Debug)]
struct ValidatedOptimizeRequest {
    item: ItemSpec,
    catalog: Catalog,
}

#[derive(Debug)]
enum OptimizeRequestValidationError {
    InvalidItem(ValidationError),
    InvalidCatalog(CatalogError),
}

impl OptimizeRequest {
    fn into_validated(
        self,
        service_catalog: &Catalog,
    ) -> Result<ValidatedOptimizeRequest, OptimizeRequestValidationError> {
        self.item
            .validate()
            .map_err(OptimizeRequestValidationError::InvalidItem)?;

        let overridden = self.combs.is_some() || self.cardboards.is_some();
        let catalog = Catalog::new(
            self.combs
                .unwrap_or_else(|| service_catalog.combs.clone()),
            self.cardboards
                .unwrap_or_else(|| service_catalog.cardboards.clone()),
        );
        if overridden {
            catalog
                .validate(false)
                .map_err(OptimizeRequestValidationError::InvalidCatalog)?;
        }

        Ok(ValidatedOptimizeRequest {
            item: self.item,
            catalog,
        })
    }
}

/// Best lattice together with the geometry of the chosen comb pair.
#[derive(Serialize, ToSchema)]
pub struct OptimizeResponse {
    pub solution: Solution,
    pub layout: LatticeLayout,
}

/// Final message of the optimize stream.
#[derive(Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum StreamOutcome {
    Completed { response: OptimizeResponse },
    Failed { reason_code: String, details: String },
}

/// Request structure for the lattice endpoint.
///
/// Missing notch selections start with every notch disengaged.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "axis1": "17NAC",
        "axis2": "3NAC",
        "notches2": [true, false, true]
    })
)]
pub struct LatticeRequest {
    pub axis1: String,
    pub axis2: String,
    #[serde(default)]
    #[schema(nullable = true)]
    pub notches1: Option<NotchSelection>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub notches2: Option<NotchSelection>,
}

#[derive(Debug)]
enum LatticeRequestError {
    UnknownComb(String),
    Invalid(ValidationError),
}

impl From<ValidationError> for LatticeRequestError {
    fn from(err: ValidationError) -> Self {
        LatticeRequestError::Invalid(err)
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason_code: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
            reason_code: None,
        }
    }

    fn with_reason(mut self, code: impl Into<String>) -> Self {
        self.reason_code = Some(code.into());
        self
    }

    fn respond(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    ErrorResponse::new("Invalid JSON data", err.to_string())
        .with_reason("invalid_json")
        .respond(StatusCode::UNPROCESSABLE_ENTITY)
}

fn validation_error(details: impl Into<String>) -> Response {
    ErrorResponse::new("Invalid input data", details)
        .with_reason("invalid_input")
        .respond(StatusCode::UNPROCESSABLE_ENTITY)
}

fn catalog_config_error(details: impl Into<String>) -> Response {
    ErrorResponse::new("Invalid catalog configuration", details)
        .with_reason("invalid_catalog")
        .respond(StatusCode::UNPROCESSABLE_ENTITY)
}

fn describe_failure(err: &OptimizeError) -> ErrorResponse {
    match err {
        OptimizeError::Invalid(err) => {
            ErrorResponse::new("Invalid input data", err.to_string()).with_reason("invalid_input")
        }
        OptimizeError::Infeasible(reason) => {
            ErrorResponse::new("No feasible lattice", reason.to_string()).with_reason(reason.code())
        }
    }
}

fn parse_optimize_request(
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
    service_catalog: &Catalog,
) -> Result<ValidatedOptimizeRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    match payload.into_validated(service_catalog) {
        Ok(validated) => Ok(validated),
        Err(OptimizeRequestValidationError::InvalidItem(err)) => {
            Err(validation_error(err.to_string()))
        }
        Err(OptimizeRequestValidationError::InvalidCatalog(err)) => {
            Err(catalog_config_error(err.to_string()))
        }
    }
}

/// Runs the optimizer and attaches the layout of the winning pair.
fn run_optimization(
    request: &ValidatedOptimizeRequest,
    config: &LatticeConfig,
    on_event: impl FnMut(&OptimizeEvent),
) -> Result<OptimizeResponse, OptimizeError> {
    let catalog = &request.catalog;
    let solution = optimize_with_progress(
        &catalog.combs,
        &catalog.cardboards,
        &request.item,
        config,
        on_event,
    )?;

    // both ids come from this catalog
    let (Some(comb1), Some(comb2)) = (catalog.comb(&solution.comb1), catalog.comb(&solution.comb2))
    else {
        return Err(Infeasible::NoViableCombination.into());
    };

    let mut session = Session::default();
    session.apply_solution(&solution);
    let layout = session.layout(comb1, comb2, config.thickness)?;

    Ok(OptimizeResponse { solution, layout })
}

/// Runs the optimizer on the blocking pool and forwards every event as JSON,
/// followed by exactly one `StreamOutcome`.
fn spawn_optimization_stream(
    request: ValidatedOptimizeRequest,
    config: LatticeConfig,
) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let result = run_optimization(&request, &config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // Receiver has closed the stream; remaining events are discarded.
                let _ = tx.blocking_send(json);
            }
        });

        let outcome = match result {
            Ok(response) => StreamOutcome::Completed { response },
            Err(err) => {
                let failure = describe_failure(&err);
                StreamOutcome::Failed {
                    reason_code: failure.reason_code.unwrap_or_default(),
                    details: failure.details,
                }
            }
        };
        if let Ok(json) = serde_json::to_string(&outcome) {
            let _ = tx.blocking_send(json);
        }
    });

    rx
}

fn build_lattice(
    request: LatticeRequest,
    catalog: &Catalog,
    thickness: f64,
) -> Result<LatticeLayout, LatticeRequestError> {
    let comb1 = catalog
        .comb(&request.axis1)
        .ok_or_else(|| LatticeRequestError::UnknownComb(request.axis1.clone()))?;
    let comb2 = catalog
        .comb(&request.axis2)
        .ok_or_else(|| LatticeRequestError::UnknownComb(request.axis2.clone()))?;

    let mut session = Session::default();
    session.select_comb(Axis::Axis1, comb1);
    session.select_comb(Axis::Axis2, comb2);
    if let Some(selection) = request.notches1 {
        session.set_selection(Axis::Axis1, comb1, selection)?;
    }
    if let Some(selection) = request.notches2 {
        session.set_selection(Axis::Axis2, comb2, selection)?;
    }

    Ok(session.layout(comb1, comb2, thickness)?)
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_optimize, handle_optimize_stream, handle_lattice, serve_catalog),
    components(
        schemas(
            OptimizeRequest,
            OptimizeResponse,
            StreamOutcome,
            LatticeRequest,
            ErrorResponse,
            ItemSpec,
            Comb,
            Cardboard,
            Catalog,
            Solution,
            CardboardChoice,
            SkipReason,
            LatticeLayout,
            AxisLayout,
            Axis
        )
    ),
    tags((name = "lattice", description = "Endpoints for lattice optimization"))
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests from the frontend.
/// Blocks until the server is terminated.
pub async fn start_api_server(
    config: ApiConfig,
    optimizer_config: OptimizerConfig,
    catalog: Catalog,
) -> std::io::Result<()> {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState {
        optimizer_config,
        catalog: Arc::new(catalog),
    };

    let app = Router::new()
        // API endpoints
        .route("/optimize", post(handle_optimize))
        .route("/optimize_stream", post(handle_optimize_stream))
        .route("/lattice", post(handle_lattice))
        .route("/catalog", get(serve_catalog))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|err| {
        log::error!("❌ Could not bind API server to {}: {}", addr, err);
        err
    })?;

    log::info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        log::info!("💡 Local access: http://localhost:{}", config.port());
    }
    log::info!("📦 API Endpoints: POST /optimize, POST /optimize_stream, POST /lattice, GET /catalog");
    log::info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /optimize endpoint.
///
/// Searches the comb catalog for the cheapest lattice per stored item.
///
/// # Parameters
/// * `payload` - JSON payload with the item and optional catalog overrides
///
/// # Returns
/// JSON response with the best solution and its lattice layout
#[utoipa::path(
    post,
    path = "/optimize",
    request_body = OptimizeRequest,
    responses(
        (status = 200, description = "Best lattice configuration", body = OptimizeResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, invalid catalog or no feasible lattice",
            body = ErrorResponse
        )
    ),
    tag = "lattice"
)]
async fn handle_optimize(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_optimize_request(payload, &state.catalog) {
        Ok(request) => request,
        Err(response) => return response,
    };

    log::info!(
        "📥 New optimize request: item {}x{}x{} (margin {}), quantity {}, {} combs, {} cardboards",
        request.item.w,
        request.item.d,
        request.item.h,
        request.item.m,
        request.item.q,
        request.catalog.combs.len(),
        request.catalog.cardboards.len()
    );

    let config = state.optimizer_config.lattice_config();
    match run_optimization(&request, &config, |_| {}) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => {
            log::info!("📭 No lattice returned: {}", err);
            describe_failure(&err).respond(StatusCode::UNPROCESSABLE_ENTITY)
        }
    }
}

/// Handler for POST /optimize_stream endpoint (SSE).
///
/// Streams optimizer events in real-time as Server-Sent Events (text/event-stream),
/// closed by a single `StreamOutcome` message.
#[utoipa::path(
    post,
    path = "/optimize_stream",
    request_body = OptimizeRequest,
    responses(
        (
            status = 200,
            description = "Streams optimizer events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or catalog",
            body = ErrorResponse
        )
    ),
    tag = "lattice"
)]
async fn handle_optimize_stream(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_optimize_request(payload, &state.catalog) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let rx = spawn_optimization_stream(request, state.optimizer_config.lattice_config());

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /lattice endpoint.
///
/// Lays out two catalog combs with the given notch selections, for drawing
/// the lattice and annotating its cells.
#[utoipa::path(
    post,
    path = "/lattice",
    request_body = LatticeRequest,
    responses(
        (status = 200, description = "Lattice geometry", body = LatticeLayout),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Unknown comb or mismatched notch selection",
            body = ErrorResponse
        )
    ),
    tag = "lattice"
)]
async fn handle_lattice(
    State(state): State<ApiState>,
    payload: Result<Json<LatticeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let thickness = state.optimizer_config.lattice_config().thickness;
    match build_lattice(request, &state.catalog, thickness) {
        Ok(layout) => (StatusCode::OK, Json(layout)).into_response(),
        Err(LatticeRequestError::UnknownComb(id)) => {
            ErrorResponse::new("Unknown comb", format!("No comb with id '{}'", id))
                .with_reason("unknown_comb")
                .respond(StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(LatticeRequestError::Invalid(err)) => validation_error(err.to_string()),
    }
}

/// Handler for GET /catalog endpoint.
#[utoipa::path(
    get,
    path = "/catalog",
    responses((status = 200, description = "Loaded comb and cardboard catalogs", body = Catalog)),
    tag = "lattice"
)]
async fn serve_catalog(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.catalog.as_ref().clone())
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
