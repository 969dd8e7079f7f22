use std::path::{Path, PathBuf};

use crate::config::{DestinationFolder, DestinationStructure};

/// Image root holding user uploads. The only root the self test probes.
pub const UPLOADS_ROOT: &str = "uploads";

const CACHE_SUBDIR: &str = "webp-express/webp-images";
const DOC_ROOT_SUBDIR: &str = "doc-root";

/// Where uploads live and where their alternate-format files get cached.
pub trait UploadLocationProvider: Send + Sync {
    fn upload_dir(&self) -> &Path;

    /// Public URL of [`UploadLocationProvider::upload_dir`], without trailing slash.
    fn upload_url(&self) -> &str;

    /// Cache directory for an image root, or `None` for an unknown root.
    fn cache_dir_for_image_root(
        &self,
        folder: DestinationFolder,
        structure: DestinationStructure,
        root_key: &str,
    ) -> Option<PathBuf>;

    /// Public URL of [`UploadLocationProvider::cache_dir_for_image_root`].
    fn cache_url_for_image_root(
        &self,
        folder: DestinationFolder,
        structure: DestinationStructure,
        root_key: &str,
    ) -> Option<String>;
}

/// Directory layout of a single site installation.
#[derive(Debug, Clone)]
pub struct InstallationPaths {
    pub content_dir: PathBuf,
    pub content_url: String,
    pub upload_dir: PathBuf,
    pub upload_url: String,
    pub doc_root: Option<PathBuf>,
}

impl InstallationPaths {
    pub fn new(
        content_dir: impl Into<PathBuf>,
        content_url: impl Into<String>,
        upload_dir: impl Into<PathBuf>,
        upload_url: impl Into<String>,
    ) -> Self {
        Self {
            content_dir: content_dir.into(),
            content_url: trim_url(content_url.into()),
            upload_dir: upload_dir.into(),
            upload_url: trim_url(upload_url.into()),
            doc_root: None,
        }
    }

    pub fn with_doc_root(mut self, doc_root: impl Into<PathBuf>) -> Self {
        self.doc_root = Some(doc_root.into());
        self
    }

    /// Upload dir relative to the document root, as forward-slash segments.
    fn upload_rel_to_doc_root(&self) -> Option<Vec<String>> {
        let doc_root = self.doc_root.as_ref()?;
        let rel = self.upload_dir.strip_prefix(doc_root).ok()?;
        Some(
            rel.components()
                .map(|component| component.as_os_str().to_string_lossy().into_owned())
                .collect(),
        )
    }
}

impl UploadLocationProvider for InstallationPaths {
    fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    fn upload_url(&self) -> &str {
        &self.upload_url
    }

    fn cache_dir_for_image_root(
        &self,
        folder: DestinationFolder,
        structure: DestinationStructure,
        root_key: &str,
    ) -> Option<PathBuf> {
        if root_key != UPLOADS_ROOT {
            return None;
        }
        if folder == DestinationFolder::Mingled {
            return Some(self.upload_dir.clone());
        }

        let base = self.content_dir.join(CACHE_SUBDIR);
        match (structure, self.upload_rel_to_doc_root()) {
            (DestinationStructure::DocRoot, Some(segments)) => {
                let mut dir = base.join(DOC_ROOT_SUBDIR);
                dir.extend(segments);
                Some(dir)
            }
            _ => Some(base.join(root_key)),
        }
    }

    fn cache_url_for_image_root(
        &self,
        folder: DestinationFolder,
        structure: DestinationStructure,
        root_key: &str,
    ) -> Option<String> {
        if root_key != UPLOADS_ROOT {
            return None;
        }
        if folder == DestinationFolder::Mingled {
            return Some(self.upload_url.clone());
        }

        let base = format!("{}/{CACHE_SUBDIR}", self.content_url);
        match (structure, self.upload_rel_to_doc_root()) {
            (DestinationStructure::DocRoot, Some(segments)) if segments.is_empty() => {
                Some(format!("{base}/{DOC_ROOT_SUBDIR}"))
            }
            (DestinationStructure::DocRoot, Some(segments)) => {
                Some(format!("{base}/{DOC_ROOT_SUBDIR}/{}", segments.join("/")))
            }
            _ => Some(format!("{base}/{root_key}")),
        }
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
