// Game Shelf - Web Server
// REST API over the catalog store: browse games, upload cover images,
// inspect research progress. Writes go through the upload endpoint,
// which honors the write-then-invalidate cache contract.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, warn};

use game_shelf::{CatalogStore, Game, ImageLibrary, MasterListIndex};

/// Uploads above this size are rejected before the handler runs.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
struct AppState {
    catalog: Arc<CatalogStore>,
    master: Arc<MasterListIndex>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

/// Error body matching the frontend's expectations.
#[derive(Serialize)]
struct ApiError {
    error: bool,
    message: String,
    code: &'static str,
}

fn api_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            error: true,
            message: message.into(),
            code,
        }),
    )
        .into_response()
}

/// Game detail payload: the record plus its resolved image URL.
#[derive(Serialize)]
struct GameDetail {
    #[serde(flatten)]
    game: Game,
    image_url: Option<String>,
}

/// Health payload.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    games_loaded: usize,
    candidates_total: usize,
    candidates_researched: usize,
    images_directory: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.catalog.load_all();
    let master = state.master.load();

    Json(ApiResponse::ok(HealthResponse {
        status: "healthy",
        games_loaded: catalog.games.len(),
        candidates_total: master.total,
        candidates_researched: master.researched,
        images_directory: state.catalog.images().dir().display().to_string(),
    }))
}

/// GET /api/games - All games, sorted, with image status
async fn list_games(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.catalog.load_all();
    Json(ApiResponse::ok(snapshot.games.clone()))
}

/// GET /api/games/:id - Single game + resolved image URL
async fn get_game(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let game = match state.catalog.get_by_id(&id) {
        Some(game) => game,
        None => return api_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Game not found"),
    };

    let image_url = state
        .catalog
        .image_file_for(&id)
        .map(|filename| format!("/api/images/{}", urlencoding::encode(&filename)));

    Json(ApiResponse::ok(GameDetail { game, image_url })).into_response()
}

/// GET /api/master-list - Reconciled source-list view
async fn get_master_list(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.master.load();
    Json(ApiResponse::ok(&*snapshot)).into_response()
}

/// POST /api/refresh - Drop both caches (for out-of-band file edits)
async fn refresh_caches(State(state): State<AppState>) -> impl IntoResponse {
    state.catalog.invalidate();
    state.master.invalidate();
    Json(ApiResponse::ok("caches refreshed"))
}

/// Upload result payload.
#[derive(Serialize)]
struct UploadResponse {
    filename: String,
    path: String,
}

/// POST /api/games/:id/upload - Store a cover image for a game
///
/// The image is named `"{name} ({year}).{ext}"` so the catalog's
/// filename convention picks it up on the next load.
async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "NO_FILE", "No file provided");
    }

    let game = match state.catalog.get_by_id(&id) {
        Some(game) => game,
        None => return api_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Game not found"),
    };

    let (name, year) = match (game.name.as_deref(), game.year) {
        (Some(name), Some(year)) => (name, year),
        _ => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "INCOMPLETE_RECORD",
                "Game needs both name and year before an image can be filed",
            )
        }
    };

    let ext = match sniff_image_ext(&body) {
        Some(ext) => ext,
        None => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "INVALID_IMAGE",
                "Only PNG, JPEG and WEBP images are accepted",
            )
        }
    };

    let filename = sanitize_filename(&format!("{} ({}).{}", name, year, ext));
    let filepath = state.catalog.images().path_for(&filename);

    if let Err(err) = tokio::fs::write(&filepath, &body).await {
        error!(%filename, %err, "failed to write image");
        return api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "UPLOAD_ERROR",
            "Failed to store image",
        );
    }

    // Write-then-invalidate: the next catalog read must see has_image.
    state.catalog.invalidate();

    Json(ApiResponse::ok(UploadResponse {
        path: format!("/api/images/{}", urlencoding::encode(&filename)),
        filename,
    }))
    .into_response()
}

/// GET /api/images/:filename - Serve a cover image
async fn serve_image(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let decoded = urlencoding::decode(&filename)
        .map(|s| s.into_owned())
        .unwrap_or(filename);

    // Image filenames are flat; anything path-like is a traversal attempt.
    if decoded.contains('/') || decoded.contains('\\') || decoded.contains("..") {
        warn!(filename = %decoded, "rejected path-like image filename");
        return api_error(StatusCode::FORBIDDEN, "ACCESS_DENIED", "Access denied");
    }

    let filepath = state.catalog.images().path_for(&decoded);
    match tokio::fs::read(&filepath).await {
        Ok(bytes) => {
            let content_type = content_type_for(&decoded);
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(_) => api_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Image not found"),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Detect the image format from magic bytes and pick the extension.
fn sniff_image_ext(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// Keep letters, digits, spaces and `().-`; everything else becomes `_`.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == ' ' || c == '(' || c == ')' || c == '.' || c == '-'
            {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(str::to_ascii_lowercase) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

fn env_dir(var: &str, default: &str) -> PathBuf {
    env::var(var).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("🎲 Game Shelf - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let games_dir = env_dir("SHELF_GAMES_DIR", "games");
    let images_dir = env_dir("SHELF_IMAGES_DIR", "images");
    let lists_dir = env_dir("SHELF_LISTS_DIR", "sources/lists");

    let catalog = Arc::new(CatalogStore::new(
        games_dir.clone(),
        ImageLibrary::new(images_dir.clone()),
    ));
    let master = Arc::new(MasterListIndex::new(lists_dir, catalog.clone()));

    println!("✓ Games directory:  {}", games_dir.display());
    println!("✓ Images directory: {}", images_dir.display());

    let state = AppState { catalog, master };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/games", get(list_games))
        .route("/games/:id", get(get_game))
        .route("/games/:id/upload", post(upload_image))
        .route("/images/:filename", get(serve_image))
        .route("/master-list", get(get_master_list))
        .route("/refresh", post(refresh_caches))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    // Build main router: API plus the static frontend
    let app = Router::new()
        .nest("/api", api_routes)
        .fallback_service(ServeDir::new("public"))
        .layer(CorsLayer::permissive());

    // Start server
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:{}", port);
    println!("   API: http://localhost:{}/api/games", port);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
