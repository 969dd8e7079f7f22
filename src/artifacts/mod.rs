//! # Test Artifacts
//!
//! Ephemeral files a self test run leaves behind: the source test images in
//! the upload folder and any alternate-format copies the probe provoked in
//! the cache folder. Cleanup is idempotent and never fails the run.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{ImageFormat, ProbeConfig};
use crate::error::SelfTestError;
use crate::paths::{UPLOADS_ROOT, UploadLocationProvider};
use crate::report::Narrative;

/// Every artifact name starts with this; cache cleanup matches on it.
pub const TEST_IMAGE_PREFIX: &str = "webp-express-test-image-";

/// Supplies the canonical source images copied into the upload folder.
pub trait FixtureProvider: Send + Sync {
    fn load(&self, format: ImageFormat) -> Result<Vec<u8>, SelfTestError>;
}

/// Reads `test.jpg` / `test.png` from a directory.
#[derive(Debug, Clone)]
pub struct DirFixtureProvider {
    dir: PathBuf,
}

impl DirFixtureProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn fixture_path(&self, format: ImageFormat) -> PathBuf {
        self.dir.join(format!("test.{}", format.extension()))
    }
}

impl FixtureProvider for DirFixtureProvider {
    fn load(&self, format: ImageFormat) -> Result<Vec<u8>, SelfTestError> {
        let path = self.fixture_path(format);
        fs::read(&path).map_err(|err| {
            tracing::debug!(path = %path.display(), error = %err, "test image unreadable");
            SelfTestError::FixtureMissing { format, path }
        })
    }
}

/// Deterministic upload-folder file name for a format's test image.
pub fn test_image_name(format: ImageFormat) -> String {
    format!("{TEST_IMAGE_PREFIX}{format}.{}", format.extension())
}

/// Outcome of one cleanup pass.
#[derive(Debug, Clone, Default)]
pub struct CleanupSummary {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<String>,
}

/// Owns creation and removal of test artifacts for the duration of a run.
pub struct ArtifactManager {
    paths: Arc<dyn UploadLocationProvider>,
    fixtures: Box<dyn FixtureProvider>,
}

impl ArtifactManager {
    pub fn new(paths: Arc<dyn UploadLocationProvider>, fixtures: Box<dyn FixtureProvider>) -> Self {
        Self { paths, fixtures }
    }

    /// Copy the test image for `format` into the upload folder and return its file name.
    pub fn create_test_image(
        &self,
        format: ImageFormat,
        narrative: &mut Narrative,
    ) -> Result<String, SelfTestError> {
        let name = test_image_name(format);
        let target = self.paths.upload_dir().join(&name);

        let result = self
            .fixtures
            .load(format)
            .and_then(|bytes| write_artifact(&target, &bytes));

        match &result {
            Ok(()) => {
                tracing::info!(path = %target.display(), "created test image");
                narrative.plain(format!("Copied a {format} test image into the upload folder ({name})"));
            }
            Err(err) => {
                tracing::warn!(path = %target.display(), error = %err, "could not create test image");
                narrative.error(format!("Could not create the {format} test image: {err}"));
            }
        }
        result.map(|()| name)
    }

    /// Delete the test images and any cache files they provoked.
    pub fn cleanup(&self, config: &ProbeConfig) -> CleanupSummary {
        let mut summary = CleanupSummary::default();

        for format in ImageFormat::ALL {
            let path = self.paths.upload_dir().join(test_image_name(format));
            remove_if_present(&path, &mut summary);
        }

        let cache_dir = self.paths.cache_dir_for_image_root(
            config.destination_folder,
            config.destination_structure,
            UPLOADS_ROOT,
        );
        if let Some(cache_dir) = cache_dir {
            remove_matching(&cache_dir, &mut summary);
        }

        tracing::info!(
            removed = summary.removed.len(),
            failures = summary.failures.len(),
            "cleaned up test artifacts"
        );
        summary
    }
}

fn write_artifact(target: &Path, bytes: &[u8]) -> Result<(), SelfTestError> {
    fs::write(target, bytes).map_err(|source| match source.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => {
            SelfTestError::UploadNotWritable {
                path: target.parent().unwrap_or(target).to_path_buf(),
                source,
            }
        }
        _ => SelfTestError::ArtifactWrite {
            path: target.to_path_buf(),
            source,
        },
    })
}

fn remove_if_present(path: &Path, summary: &mut CleanupSummary) {
    match fs::remove_file(path) {
        Ok(()) => summary.removed.push(path.to_path_buf()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not delete test artifact");
            summary
                .failures
                .push(format!("Could not delete {}: {err}", path.display()));
        }
    }
}

fn remove_matching(dir: &Path, summary: &mut CleanupSummary) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "could not list cache folder");
            summary
                .failures
                .push(format!("Could not list {}: {err}", dir.display()));
            return;
        }
    };

    for entry in entries.flatten() {
        let is_artifact = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(TEST_IMAGE_PREFIX));
        let is_file = entry.file_type().is_ok_and(|kind| kind.is_file());
        if is_artifact && is_file {
            remove_if_present(&entry.path(), summary);
        }
    }
}
