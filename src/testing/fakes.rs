//! Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use crate::artifacts::{ArtifactManager, DirFixtureProvider};
use crate::config::ProbeConfig;
use crate::error::{SelfTestError, TransportError};
use crate::http::{HttpProbe, ProbeFuture, ProbeRequest, ProbeResponse, ResponseHeaders};
use crate::paths::{InstallationPaths, UploadLocationProvider};
use crate::report::{LineKind, NarrativeLine};
use crate::rewrite::{CacheRewriteResolver, RewriteDiagnosis};
use crate::storage::ConfigProvider;
use crate::testing::lock::LOCK_FILE_NAME;

#[derive(Clone, Default)]
pub struct CountingDiagnosis {
    calls: Arc<AtomicUsize>,
}

impl CountingDiagnosis {
    pub const LINE: &'static str = "rewrite rules were inspected";

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RewriteDiagnosis for CountingDiagnosis {
    fn diagnose_failed_rewrite(&self, _config: &ProbeConfig) -> Vec<NarrativeLine> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        vec![NarrativeLine::new(LineKind::Plain, Self::LINE)]
    }
}

pub struct StaticConfig(pub Option<ProbeConfig>);

impl ConfigProvider for StaticConfig {
    fn load_config(&self) -> Result<Option<ProbeConfig>, SelfTestError> {
        Ok(self.0.clone())
    }
}

pub struct BrokenConfig;

impl ConfigProvider for BrokenConfig {
    fn load_config(&self) -> Result<Option<ProbeConfig>, SelfTestError> {
        Err(SelfTestError::ConfigParse {
            path: PathBuf::from("config.json"),
            source: serde_json::from_str::<ProbeConfig>("{").unwrap_err(),
        })
    }
}

/// Replays queued outcomes in order and records every request it saw.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    outcomes: Arc<Mutex<VecDeque<Result<ProbeResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<ProbeRequest>>>,
}

impl ScriptedClient {
    pub fn respond(self, headers: ResponseHeaders) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Ok(ProbeResponse::new(200, headers)));
        self
    }

    pub fn refuse(self, message: &str) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Connect {
                url: "http://example.test".to_string(),
                chain: vec![message.to_string()],
            }));
        self
    }

    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpProbe for ScriptedClient {
    fn probe<'a>(&'a self, request: &'a ProbeRequest) -> ProbeFuture<'a> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")
        })
    }
}

/// Answers every request with webp headers after a delay, counting overlap.
#[derive(Clone, Default)]
pub struct SlowClient {
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl SlowClient {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl HttpProbe for SlowClient {
    fn probe<'a>(&'a self, _request: &'a ProbeRequest) -> ProbeFuture<'a> {
        Box::pin(async move {
            self.total.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ProbeResponse::new(200, webp_headers()))
        })
    }
}

/// Throwaway site layout with fixtures in place.
pub struct TestSite {
    _root: TempDir,
    pub upload_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub paths: Arc<dyn UploadLocationProvider>,
    fixtures_dir: PathBuf,
}

impl TestSite {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let content = root.path().join("wp-content");
        let upload_dir = content.join("uploads");
        let cache_dir = content.join("webp-express/webp-images/uploads");
        let fixtures_dir = root.path().join("fixtures");
        fs::create_dir_all(&upload_dir).unwrap();
        fs::create_dir_all(&cache_dir).unwrap();
        fs::create_dir_all(&fixtures_dir).unwrap();
        fs::write(fixtures_dir.join("test.jpg"), b"jpeg").unwrap();
        fs::write(fixtures_dir.join("test.png"), b"png").unwrap();

        let paths: Arc<dyn UploadLocationProvider> = Arc::new(InstallationPaths::new(
            &content,
            "http://example.test/wp-content",
            &upload_dir,
            "http://example.test/wp-content/uploads",
        ));
        Self {
            _root: root,
            upload_dir,
            cache_dir,
            paths,
            fixtures_dir,
        }
    }

    pub fn artifacts(&self) -> ArtifactManager {
        ArtifactManager::new(
            self.paths.clone(),
            Box::new(DirFixtureProvider::new(&self.fixtures_dir)),
        )
    }

    pub fn resolver(&self) -> CacheRewriteResolver {
        CacheRewriteResolver::new(self.paths.clone())
    }

    pub fn remove_fixtures(&self) {
        fs::remove_dir_all(&self.fixtures_dir).unwrap();
    }

    /// Names of files currently in the upload and cache folders, minus the run lock.
    pub fn files(&self) -> Vec<String> {
        let mut names = Vec::new();
        for dir in [&self.upload_dir, &self.cache_dir] {
            for entry in fs::read_dir(dir).unwrap() {
                let name = entry.unwrap().file_name().to_string_lossy().into_owned();
                if name != LOCK_FILE_NAME {
                    names.push(name);
                }
            }
        }
        names
    }
}

pub fn webp_headers() -> ResponseHeaders {
    ResponseHeaders::new()
        .with("content-type", "image/webp")
        .with("cache-control", "max-age=999")
}
