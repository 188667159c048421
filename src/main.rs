use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, Server};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use arti_resolver::config::ResolverConfig;
use arti_resolver::{ArtifactRequest, CandidateResource, HttpTransport, ModuleCoordinate, PatternResolver};

const CONFIG_ENV: &str = "ARTI_RESOLVER_CONFIG";
const LISTEN_ENV: &str = "ARTI_RESOLVER_LISTEN";
const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

struct AppState {
    resolver: PatternResolver,
    transport: Arc<HttpTransport>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .with_context(|| format!("usage: arti-resolver <config.json> (or set {})", CONFIG_ENV))?;
    let config = ResolverConfig::load(&PathBuf::from(config_path))?;

    let transport = Arc::new(config.transport.build_transport());
    let resolver = config.build_resolver(transport.clone())?;
    let state = Arc::new(AppState { resolver, transport });

    let app = Router::new()
        .route("/descriptor/:org/:module/:revision", get(descriptor))
        .route("/artifact/:org/:module/:revision/:file", get(artifact))
        .with_state(state);

    let addr: SocketAddr = std::env::var(LISTEN_ENV)
        .unwrap_or_else(|_| DEFAULT_LISTEN.to_string())
        .parse()
        .with_context(|| format!("invalid listen address in {}", LISTEN_ENV))?;

    info!("serving resolver {} on {}", config.name, addr);
    Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

/// what a lookup found, as returned to clients
#[derive(Serialize)]
struct Selection {
    location: String,
    revision: String,
    last_modified: Option<String>,
}
impl From<&CandidateResource> for Selection {
    fn from(resource: &CandidateResource) -> Self {
        Selection {
            location: resource.location().to_string(),
            revision: resource.revision().to_string(),
            last_modified: resource.last_modified().map(|d| d.to_rfc3339()),
        }
    }
}

async fn descriptor(
    State(state): State<Arc<AppState>>,
    Path((org, module, revision)): Path<(String, String, String)>,
) -> Response {
    let coordinate = ModuleCoordinate::new(org, module, revision);

    match state.resolver.find_descriptor(&coordinate, None).await {
        Ok(Some(found)) => Json(Selection::from(&found.resource)).into_response(),
        Ok(None) => {
            state.resolver.log_descriptor_not_found(&coordinate);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => internal_error(e),
    }
}

async fn artifact(
    State(state): State<Arc<AppState>>,
    Path((org, module, revision, file)): Path<(String, String, String, String)>,
) -> Response {
    let (name, ext) = match file.rsplit_once('.') {
        Some(parts) => parts,
        None => return (StatusCode::BAD_REQUEST, "artifact file name must have an extension").into_response(),
    };
    let request = ArtifactRequest::new(ModuleCoordinate::new(org, module, revision), name, ext, ext);

    let found = match state.resolver.find_artifact(&request, None).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            state.resolver.log_artifact_not_found(&request);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => return internal_error(e),
    };

    match state.transport.open_stream(found.resource.location(), None).await {
        Ok(content) => ([(CONTENT_TYPE, "application/octet-stream")], content).into_response(),
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: anyhow::Error) -> Response {
    error!("{:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response()
}
