use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use eyre::Result;
use futures::StreamExt;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// A file listed by the fake index.
#[derive(Debug, Clone)]
pub struct ServedFile {
    pub name: String,
    pub body: Vec<u8>,
    pub package_type: &'static str,
    pub status: StatusCode,
    pub published_sha256: Option<String>,
    /// Send the body chunked, without a `Content-Length` header
    pub chunked: bool,
    /// On the first request, announce the full length but drop the
    /// connection after this many bytes
    pub truncate_first_response: Option<usize>,
}

impl ServedFile {
    pub fn wheel(name: &str, body: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            published_sha256: Some(sha256_hex(&body)),
            body,
            package_type: "bdist_wheel",
            status: StatusCode::OK,
            chunked: false,
            truncate_first_response: None,
        }
    }

    pub fn sdist(name: &str, body: Vec<u8>) -> Self {
        Self {
            package_type: "sdist",
            ..Self::wheel(name, body)
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_published_sha256(mut self, sha256: Option<&str>) -> Self {
        self.published_sha256 = sha256.map(str::to_string);
        self
    }

    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    pub fn truncated_once_after(mut self, bytes: usize) -> Self {
        self.truncate_first_response = Some(bytes);
        self
    }
}

struct IndexState {
    base_url: String,
    package: String,
    latest: Option<String>,
    releases: HashMap<String, Vec<ServedFile>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl IndexState {
    /// Counts a request and returns how many times the path has been hit.
    fn record(&self, uri: &Uri) -> usize {
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
        let count = hits.entry(uri.path().to_string()).or_default();
        *count += 1;
        *count
    }

    fn find_file(&self, name: &str) -> Option<&ServedFile> {
        self.releases
            .values()
            .flatten()
            .find(|file| file.name == name)
    }
}

/// In-process PyPI-style index serving JSON metadata and artifact bodies.
pub struct FakeIndex {
    base_url: String,
    state: Arc<IndexState>,
    handle: JoinHandle<()>,
}

impl FakeIndex {
    /// Starts an index for `package` whose newest release is `latest`.
    pub async fn start(
        package: &str,
        latest: Option<&str>,
        releases: Vec<(&str, Vec<ServedFile>)>,
    ) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let state = Arc::new(IndexState {
            base_url: base_url.clone(),
            package: package.to_string(),
            latest: latest.map(str::to_string),
            releases: releases
                .into_iter()
                .map(|(version, files)| (version.to_string(), files))
                .collect(),
            hits: Mutex::new(HashMap::new()),
        });

        let app = Router::new()
            .route("/pypi/:package/json", get(project_json))
            .route("/pypi/:package/:version/json", get(release_json))
            .route("/files/:name", get(file_body))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!("Fake index stopped: {}", err);
            }
        });

        Ok(Self {
            base_url,
            state,
            handle,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn file_url(&self, name: &str) -> String {
        format!("{}/files/{}", self.base_url, name)
    }

    /// Number of requests received for an artifact body.
    pub fn file_hits(&self, name: &str) -> usize {
        self.hits(&format!("/files/{name}"))
    }

    pub fn hits(&self, path: &str) -> usize {
        let hits = self.state.hits.lock().unwrap_or_else(|e| e.into_inner());
        hits.get(path).copied().unwrap_or(0)
    }

    pub fn total_file_hits(&self) -> usize {
        let hits = self.state.hits.lock().unwrap_or_else(|e| e.into_inner());
        hits.iter()
            .filter(|(path, _)| path.starts_with("/files/"))
            .map(|(_, count)| *count)
            .sum()
    }
}

impl Drop for FakeIndex {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn project_json(
    State(state): State<Arc<IndexState>>,
    Path(package): Path<String>,
    uri: Uri,
) -> Response {
    state.record(&uri);
    match &state.latest {
        Some(latest) if package == state.package => {
            Json(json!({ "info": { "name": package, "version": latest } })).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn release_json(
    State(state): State<Arc<IndexState>>,
    Path((package, version)): Path<(String, String)>,
    uri: Uri,
) -> Response {
    state.record(&uri);
    if package != state.package {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Some(files) = state.releases.get(&version) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let urls: Vec<_> = files
        .iter()
        .map(|file| {
            json!({
                "filename": file.name,
                "url": format!("{}/files/{}", state.base_url, file.name),
                "packagetype": file.package_type,
                "size": file.body.len(),
                "digests": { "sha256": file.published_sha256 },
            })
        })
        .collect();

    Json(json!({ "info": { "name": package, "version": version }, "urls": urls }))
        .into_response()
}

async fn file_body(
    State(state): State<Arc<IndexState>>,
    Path(name): Path<String>,
    uri: Uri,
) -> Response {
    let hits = state.record(&uri);
    let Some(file) = state.find_file(&name) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if file.status != StatusCode::OK {
        return (file.status, "unavailable").into_response();
    }

    if let Some(cut) = file.truncate_first_response.filter(|_| hits == 1) {
        return truncated_body(&file.body, cut);
    }

    if file.chunked {
        let chunks: Vec<Result<Vec<u8>, Infallible>> =
            file.body.chunks(1000).map(|c| Ok(c.to_vec())).collect();
        Body::from_stream(futures::stream::iter(chunks)).into_response()
    } else {
        file.body.clone().into_response()
    }
}

/// Declares the full length, sends `cut` bytes, then fails the body so the
/// server aborts the connection mid-transfer.
fn truncated_body(body: &[u8], cut: usize) -> Response {
    let head = body[..cut.min(body.len())].to_vec();
    let stream = futures::stream::iter([Ok::<_, std::io::Error>(head)]).chain(
        futures::stream::once(async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                "truncated",
            ))
        }),
    );
    (
        [(header::CONTENT_LENGTH, body.len().to_string())],
        Body::from_stream(stream),
    )
        .into_response()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Deterministic, non-repeating-looking test payload.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("wheelfetch_lib=debug,wheelfetch_e2e_tests=debug")
        .with_test_writer()
        .try_init()
        .ok();
}
