//! Web-root serving: path resolution, directory listings, file streaming,
//! and multipart upload.
//!
//! Every request path is reduced to its normal components before it touches
//! the filesystem; anything containing a parent or root component is treated
//! as not found, so traversal can never escape the web root. Upload
//! filenames are likewise reduced to their final path component.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use axum::body::Body;
use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::DateTime;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::infrastructure::http::{AppState, HttpError};

// ── Handlers ──────────────────────────────────────────────────────────────────

pub async fn browse_root(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Response, HttpError> {
    serve_entry(&state, "", params.contains_key("download")).await
}

pub async fn browse(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Response, HttpError> {
    serve_entry(&state, &path, params.contains_key("download")).await
}

pub async fn upload_root(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, HttpError> {
    save_uploads(&state, "", multipart).await
}

pub async fn upload(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
    multipart: Multipart,
) -> Result<Response, HttpError> {
    save_uploads(&state, &path, multipart).await
}

// ── Browsing ──────────────────────────────────────────────────────────────────

/// Resolves `request_path` under the web root and serves a directory listing
/// or the file content.
async fn serve_entry(
    state: &AppState,
    request_path: &str,
    force_download: bool,
) -> Result<Response, HttpError> {
    let relative =
        sanitize_request_path(request_path).ok_or_else(|| HttpError::not_found(request_path))?;
    let target = state.config.webroot.join(&relative);

    let metadata = tokio::fs::metadata(&target)
        .await
        .map_err(|_| HttpError::not_found(request_path))?;

    if metadata.is_dir() {
        let entries = collect_dir_entries(&target)
            .await
            .map_err(HttpError::internal)?;
        Ok(Html(render_listing(request_path, &entries)).into_response())
    } else {
        serve_file(&target, metadata.len(), force_download).await
    }
}

/// Streams a file from disk. With `force_download`, the browser is told to
/// save rather than render, regardless of type.
async fn serve_file(path: &Path, len: u64, force_download: bool) -> Result<Response, HttpError> {
    let file = tokio::fs::File::open(path).await.map_err(HttpError::internal)?;
    let body = Body::from_stream(ReaderStream::new(file));

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");

    let builder = Response::builder().header(header::CONTENT_LENGTH, len);
    let builder = if force_download {
        builder
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            )
    } else {
        builder.header(header::CONTENT_TYPE, mime_by_extension(file_name))
    };

    builder.body(body).map_err(HttpError::internal)
}

// ── Directory listings ────────────────────────────────────────────────────────

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    /// Modification time in Unix seconds, when the filesystem reports one.
    pub modified_secs: Option<i64>,
}

/// Reads a directory into listing rows, sorted case-insensitively by name.
pub(crate) async fn collect_dir_entries(dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        // An entry that vanishes between listing and stat is simply skipped.
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let modified_secs = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64);
        entries.push(DirEntryInfo {
            name,
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            modified_secs,
        });
    }

    entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(entries)
}

/// Renders the listing page: parent link, entry table, upload form, and the
/// clipboard export link.
pub(crate) fn render_listing(request_path: &str, entries: &[DirEntryInfo]) -> String {
    let display_path = if request_path.is_empty() {
        "/".to_string()
    } else {
        format!("/{request_path}")
    };

    let mut rows = String::new();
    if !request_path.is_empty() {
        let parent = parent_href(request_path);
        rows.push_str(&format!(
            "<tr><td><a href=\"{parent}\">../</a></td><td></td><td></td></tr>\n"
        ));
    }
    for entry in entries {
        let href = entry_href(request_path, &entry.name);
        let label = if entry.is_dir {
            format!("{}/", html_escape(&entry.name))
        } else {
            html_escape(&entry.name)
        };
        let size = if entry.is_dir {
            String::new()
        } else {
            human_size(entry.size)
        };
        let modified = entry
            .modified_secs
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        rows.push_str(&format!(
            "<tr><td><a href=\"{href}\">{label}</a></td><td>{size}</td><td>{modified}</td></tr>\n"
        ));
    }

    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\">\
         <title>sharebox: {title}</title></head>\n<body>\n\
         <h1>{title}</h1>\n\
         <p><a href=\"/clipboard/download\">download clipboard</a></p>\n\
         <table>\n<tr><th>name</th><th>size</th><th>modified</th></tr>\n{rows}</table>\n\
         <form method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\" multiple>\n\
         <button type=\"submit\">upload</button>\n</form>\n\
         </body></html>\n",
        title = html_escape(&display_path),
    )
}

fn entry_href(request_path: &str, name: &str) -> String {
    if request_path.is_empty() {
        format!("/{}", percent_encode_path(name))
    } else {
        format!(
            "/{}/{}",
            percent_encode_path(request_path),
            percent_encode_path(name)
        )
    }
}

fn parent_href(request_path: &str) -> String {
    match request_path.rsplit_once('/') {
        Some((parent, _)) => format!("/{}", percent_encode_path(parent)),
        None => "/".to_string(),
    }
}

// ── Upload ────────────────────────────────────────────────────────────────────

/// Saves each uploaded file part into the browsed directory, then redirects
/// back to it.
async fn save_uploads(
    state: &AppState,
    request_path: &str,
    mut multipart: Multipart,
) -> Result<Response, HttpError> {
    let relative =
        sanitize_request_path(request_path).ok_or_else(|| HttpError::not_found(request_path))?;
    let target_dir = state.config.webroot.join(&relative);

    let is_dir = tokio::fs::metadata(&target_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(HttpError::not_found(request_path));
    }

    let mut saved = 0usize;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(format!("invalid multipart request: {e}")))?
    {
        let Some(file_name) = field.file_name().map(sanitize_filename) else {
            continue;
        };
        if file_name.is_empty() {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| HttpError::bad_request(format!("failed to read upload: {e}")))?;
        let destination = target_dir.join(&file_name);
        tokio::fs::write(&destination, &data)
            .await
            .map_err(HttpError::internal)?;
        info!("uploaded {} ({} bytes)", destination.display(), data.len());
        saved += 1;
    }

    if saved == 0 {
        return Err(HttpError::bad_request("no file fields in upload"));
    }

    let back = if request_path.is_empty() {
        "/".to_string()
    } else {
        format!("/{request_path}")
    };
    Ok(Redirect::to(&back).into_response())
}

// ── Path and name hygiene ─────────────────────────────────────────────────────

/// Reduces a request path to its normal components relative to the web root.
///
/// Returns `None` for any path carrying a parent, root, or prefix component;
/// callers treat that as not found without touching the filesystem.
pub(crate) fn sanitize_request_path(raw: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(raw.trim_matches('/')).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(clean)
}

/// Reduces an uploaded filename to its final path component. `.` and `..`
/// become empty, which callers skip.
pub(crate) fn sanitize_filename(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or("");
    if last == "." || last == ".." {
        String::new()
    } else {
        last.to_string()
    }
}

/// Percent-encodes a path for use inside an href, leaving `/` and unreserved
/// characters intact.
pub(crate) fn percent_encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Escapes text for embedding in HTML.
pub(crate) fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Formats a byte count with decimal units, e.g. `1.5 kB`.
pub(crate) fn human_size(bytes: u64) -> String {
    const UNIT: u64 = 1000;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / UNIT as f64;
    let mut unit = 0usize;
    while value >= UNIT as f64 && unit < 5 {
        value /= UNIT as f64;
        unit += 1;
    }
    format!("{value:.1} {}B", ['k', 'M', 'G', 'T', 'P', 'E'][unit])
}

/// Maps a filename extension to a content type; the fallback is the generic
/// byte-stream type.
pub(crate) fn mime_by_extension(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" | "log" | "toml" | "yml" | "yaml" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
