//! Loading site resources: the directory index and markdown documents.
//!
//! A site is either served over HTTP or read from a local directory; both sit
//! behind [`Fetcher`]. Requests run on short-lived worker threads and report
//! back through a channel that the event loop drains, so the UI never blocks
//! on the network. Nothing is cancelled: a superseded document result still
//! arrives and is discarded by the model's path check.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::index::{IndexEntry, IndexError, parse_index};

/// Index locations tried after the configured one, in order.
pub const DEFAULT_INDEX_LOCATIONS: &[&str] = &[
    "assets/docs.json",
    "docs.json",
    "assets/index.json",
    "index/docs.json",
    "index/tree.json",
];

/// Default prefix under which documents live.
pub const DEFAULT_CONTENT_ROOT: &str = "content/";

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Characters escaped inside one path segment of a URL.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Resource loading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} for {location}")]
    Status { status: u16, location: String },

    /// The request could not be completed.
    #[error("request to {location} failed: {message}")]
    Transport { location: String, message: String },

    /// A local file could not be read.
    #[error("cannot read {location}: {message}")]
    Io { location: String, message: String },

    /// The path escapes the site or is empty.
    #[error("invalid location: {0}")]
    InvalidLocation(String),
}

/// Source of site resources.
pub trait Fetcher: Send + Sync {
    /// Fetch the text at `path`, relative to the site root.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] describing why the resource is unavailable.
    fn fetch_text(&self, path: &str) -> Result<String, FetchError>;

    /// Human-readable site location for the status bar.
    fn describe(&self) -> String;
}

/// Fetches from a site served over HTTP(S).
pub struct HttpFetcher {
    base: String,
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(base: &str) -> Self {
        let mut base = base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(HTTP_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self { base, agent }
    }

    /// Full URL for a site-relative path. Absolute URLs pass through.
    pub fn url_for(&self, path: &str) -> String {
        if is_absolute_url(path) {
            return path.to_string();
        }
        let encoded: Vec<String> = clean_relative(path)
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect();
        format!("{}{}", self.base, encoded.join("/"))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        let url = self.url_for(path);
        debug!(%url, "http fetch");
        let transport = |err: ureq::Error| FetchError::Transport {
            location: url.clone(),
            message: err.to_string(),
        };
        let mut response = self.agent.get(&url).call().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                location: url.clone(),
            });
        }
        response.body_mut().read_to_string().map_err(transport)
    }

    fn describe(&self) -> String {
        self.base.clone()
    }
}

/// Reads a site from a local directory.
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Local file for a site-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidLocation`] for empty paths and paths that
    /// would leave the site directory.
    pub fn file_for(&self, path: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(clean_relative(path));
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FetchError::InvalidLocation(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl Fetcher for DirFetcher {
    fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        let file = self.file_for(path)?;
        debug!(file = %file.display(), "local fetch");
        std::fs::read_to_string(&file).map_err(|err| FetchError::Io {
            location: file.display().to_string(),
            message: err.to_string(),
        })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

fn is_absolute_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

fn clean_relative(path: &str) -> &str {
    let path = path.trim();
    let path = path.strip_prefix("./").unwrap_or(path);
    path.trim_start_matches('/')
}

/// Pick the fetcher for a site argument: URLs go over HTTP, anything else is
/// a local directory.
pub fn fetcher_for_site(site: &str) -> Arc<dyn Fetcher> {
    if is_absolute_url(site) {
        Arc::new(HttpFetcher::new(site))
    } else {
        Arc::new(DirFetcher::new(site))
    }
}

/// Location of a document given its index path.
///
/// Paths already under `content_root` are kept; others get it prepended.
pub fn resolve_content_path(path: &str, content_root: &str) -> String {
    if is_absolute_url(path) {
        return path.to_string();
    }
    let path = clean_relative(path);
    let root = content_root.trim_matches('/');
    if root.is_empty()
        || path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
    {
        path.to_string()
    } else {
        format!("{root}/{path}")
    }
}

/// The configured index location followed by the defaults, without repeats.
pub fn index_candidates(primary: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for candidate in primary.into_iter().chain(DEFAULT_INDEX_LOCATIONS.iter().copied()) {
        let candidate = clean_relative(candidate).to_string();
        if !candidate.is_empty() && !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

/// Try each candidate until one yields a parseable index.
///
/// # Errors
///
/// Returns [`IndexError::Unavailable`] naming every location tried and the
/// last failure.
pub fn load_index(
    fetcher: &dyn Fetcher,
    candidates: &[String],
) -> Result<(String, Vec<IndexEntry>), IndexError> {
    let mut last = String::from("no index locations configured");
    for candidate in candidates {
        let parsed = fetcher
            .fetch_text(candidate)
            .map_err(|err| err.to_string())
            .and_then(|text| parse_index(&text).map_err(|err| err.to_string()));
        match parsed {
            Ok(entries) => {
                debug!(%candidate, entries = entries.len(), "index loaded");
                return Ok((candidate.clone(), entries));
            }
            Err(err) => {
                debug!(%candidate, %err, "index candidate failed");
                last = err;
            }
        }
    }
    warn!(%last, "directory index unavailable");
    Err(IndexError::Unavailable {
        tried: candidates.join(", "),
        last,
    })
}

/// Work handed to the background fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Index {
        candidates: Vec<String>,
    },
    Document {
        /// Index path, echoed back for the staleness check
        path: String,
        anchor: Option<String>,
        /// Resolved location actually fetched
        location: String,
    },
}

/// Completed work, delivered to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Index(Result<(String, Vec<IndexEntry>), IndexError>),
    Document {
        path: String,
        anchor: Option<String>,
        result: Result<String, FetchError>,
    },
}

/// Runs fetch requests off the UI thread.
pub struct FetchWorker {
    fetcher: Arc<dyn Fetcher>,
    tx: Sender<FetchOutcome>,
    rx: Receiver<FetchOutcome>,
}

impl FetchWorker {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { fetcher, tx, rx }
    }

    pub fn describe(&self) -> String {
        self.fetcher.describe()
    }

    /// Start `request` on its own thread.
    pub fn dispatch(&self, request: FetchRequest) {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let outcome = execute(fetcher.as_ref(), request);
            // The receiver only disappears on shutdown.
            let _ = tx.send(outcome);
        });
    }

    /// Run `request` on the calling thread.
    pub fn run_blocking(&self, request: FetchRequest) -> FetchOutcome {
        execute(self.fetcher.as_ref(), request)
    }

    /// Next completed request, if any.
    pub fn try_recv(&self) -> Option<FetchOutcome> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next completed request.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FetchOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }
}

fn execute(fetcher: &dyn Fetcher, request: FetchRequest) -> FetchOutcome {
    match request {
        FetchRequest::Index { candidates } => FetchOutcome::Index(load_index(fetcher, &candidates)),
        FetchRequest::Document {
            path,
            anchor,
            location,
        } => {
            let result = fetcher.fetch_text(&location);
            if let Err(err) = &result {
                warn!(%path, %err, "document fetch failed");
            }
            FetchOutcome::Document {
                path,
                anchor,
                result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_content_path_prefixes_once() {
        assert_eq!(resolve_content_path("guide/a.md", "content/"), "content/guide/a.md");
        assert_eq!(resolve_content_path("content/guide/a.md", "content/"), "content/guide/a.md");
        assert_eq!(resolve_content_path("./content/a.md", "content"), "content/a.md");
        assert_eq!(resolve_content_path("/contents.md", "content/"), "content/contents.md");
        assert_eq!(resolve_content_path("a.md", ""), "a.md");
        assert_eq!(
            resolve_content_path("https://x.test/a.md", "content/"),
            "https://x.test/a.md"
        );
    }

    #[test]
    fn test_index_candidates_put_primary_first_without_repeats() {
        let candidates = index_candidates(Some("./docs.json"));
        assert_eq!(candidates[0], "docs.json");
        assert_eq!(candidates.len(), DEFAULT_INDEX_LOCATIONS.len());
        assert_eq!(index_candidates(None).len(), DEFAULT_INDEX_LOCATIONS.len());
    }

    #[test]
    fn test_http_url_encodes_segments() {
        let fetcher = HttpFetcher::new("https://docs.test/site");
        assert_eq!(
            fetcher.url_for("content/第一章/a b.md"),
            "https://docs.test/site/content/%E7%AC%AC%E4%B8%80%E7%AB%A0/a%20b.md"
        );
        assert_eq!(fetcher.describe(), "https://docs.test/site/");
    }

    #[test]
    fn test_dir_fetcher_rejects_escapes() {
        let fetcher = DirFetcher::new("/srv/site");
        assert!(matches!(
            fetcher.file_for("../secret.md"),
            Err(FetchError::InvalidLocation(_))
        ));
        assert!(matches!(fetcher.file_for(""), Err(FetchError::InvalidLocation(_))));
        assert_eq!(
            fetcher.file_for("/content/a.md").unwrap(),
            PathBuf::from("/srv/site/content/a.md")
        );
    }

    #[test]
    fn test_dir_fetcher_reads_files_and_reports_missing() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.md"), "# A").expect("write");
        let fetcher = DirFetcher::new(dir.path());
        assert_eq!(fetcher.fetch_text("a.md").unwrap(), "# A");
        assert!(matches!(fetcher.fetch_text("b.md"), Err(FetchError::Io { .. })));
    }

    #[test]
    fn test_load_index_falls_back_past_missing_and_malformed() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("docs.json"), "{broken").expect("write");
        std::fs::create_dir_all(dir.path().join("index")).expect("mkdir");
        std::fs::write(
            dir.path().join("index/tree.json"),
            r#"[{"type": "file", "name": "a.md", "path": "a.md"}]"#,
        )
        .expect("write");
        let fetcher = DirFetcher::new(dir.path());

        let (found, entries) = load_index(&fetcher, &index_candidates(None)).unwrap();
        assert_eq!(found, "index/tree.json");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_load_index_reports_all_failures() {
        let dir = tempdir().expect("tempdir");
        let fetcher = DirFetcher::new(dir.path());
        let err = load_index(&fetcher, &index_candidates(Some("site.json"))).unwrap_err();
        let IndexError::Unavailable { tried, .. } = err else {
            panic!("expected unavailable");
        };
        assert!(tried.starts_with("site.json, assets/docs.json"));
    }

    #[test]
    fn test_worker_delivers_document_outcome() {
        let dir = tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("content")).expect("mkdir");
        std::fs::write(dir.path().join("content/a.md"), "# Hello").expect("write");
        let worker = FetchWorker::new(Arc::new(DirFetcher::new(dir.path())));

        worker.dispatch(FetchRequest::Document {
            path: "a.md".to_string(),
            anchor: Some("hello".to_string()),
            location: resolve_content_path("a.md", DEFAULT_CONTENT_ROOT),
        });
        let outcome = worker
            .recv_timeout(Duration::from_secs(5))
            .expect("outcome");
        assert_eq!(
            outcome,
            FetchOutcome::Document {
                path: "a.md".to_string(),
                anchor: Some("hello".to_string()),
                result: Ok("# Hello".to_string()),
            }
        );
        assert!(worker.try_recv().is_none());
    }
}
