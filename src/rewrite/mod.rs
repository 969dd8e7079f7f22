//! # Rewrite Rules
//!
//! Maps a source image URL to the URL its alternate-format copy is served
//! from, and explains why a redirect may not have fired.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AlterHtmlOptions, DestinationExtension, DestinationFolder, ImageFormat, ProbeConfig};
use crate::paths::UploadLocationProvider;
use crate::report::{LineKind, NarrativeLine};

const ALTERNATE_EXTENSION: &str = "webp";
const REALIZER_MARKER: &str = "webp-realizer";

/// Resolves the alternate-format URL for a source URL.
pub trait RewriteResolver: Send + Sync {
    /// `None` when the URL is outside the root, not an enabled image format,
    /// or (when `options.only_for_existing` is set) no alternate file exists yet.
    fn resolve_alternate_url(
        &self,
        source_url: &str,
        root_key: &str,
        root_base_url: &str,
        root_base_dir: &Path,
        options: &AlterHtmlOptions,
    ) -> Option<String>;
}

/// Produces root-cause hints when the redirect apparently never fired.
pub trait RewriteDiagnosis: Send + Sync {
    fn diagnose_failed_rewrite(&self, config: &ProbeConfig) -> Vec<NarrativeLine>;
}

/// Resolver for the plugin's cache layout.
pub struct CacheRewriteResolver {
    paths: Arc<dyn UploadLocationProvider>,
}

impl CacheRewriteResolver {
    pub fn new(paths: Arc<dyn UploadLocationProvider>) -> Self {
        Self { paths }
    }
}

impl RewriteResolver for CacheRewriteResolver {
    fn resolve_alternate_url(
        &self,
        source_url: &str,
        root_key: &str,
        root_base_url: &str,
        root_base_dir: &Path,
        options: &AlterHtmlOptions,
    ) -> Option<String> {
        let source_path = source_url.split(['?', '#']).next()?;
        let rel = source_path
            .strip_prefix(root_base_url.trim_end_matches('/'))?
            .strip_prefix('/')?;
        if rel.is_empty() {
            return None;
        }

        let (stem, ext) = rel.rsplit_once('.')?;
        let format = ImageFormat::from_extension(ext)?;
        if !options.enabled_formats.contains(format) {
            return None;
        }

        let dest_rel = match options.destination_extension {
            DestinationExtension::Append => format!("{rel}.{ALTERNATE_EXTENSION}"),
            DestinationExtension::Set => format!("{stem}.{ALTERNATE_EXTENSION}"),
        };

        let (dest_dir, dest_base_url) = match options.destination_folder {
            DestinationFolder::Mingled => (
                root_base_dir.to_path_buf(),
                root_base_url.trim_end_matches('/').to_string(),
            ),
            DestinationFolder::Separate => (
                self.paths.cache_dir_for_image_root(
                    options.destination_folder,
                    options.destination_structure,
                    root_key,
                )?,
                self.paths.cache_url_for_image_root(
                    options.destination_folder,
                    options.destination_structure,
                    root_key,
                )?,
            ),
        };

        if options.only_for_existing && !dest_dir.join(&dest_rel).exists() {
            return None;
        }

        Some(format!("{dest_base_url}/{dest_rel}"))
    }
}

/// Looks for the converter redirect rules in the `.htaccess` files that
/// should carry them.
pub struct HtaccessDiagnosis {
    paths: Arc<dyn UploadLocationProvider>,
}

impl HtaccessDiagnosis {
    pub fn new(paths: Arc<dyn UploadLocationProvider>) -> Self {
        Self { paths }
    }

    /// Cache dir first, then the upload dir unless both are the same folder.
    fn rules_dirs(&self, config: &ProbeConfig) -> Vec<PathBuf> {
        let upload_dir = self.paths.upload_dir().to_path_buf();
        let mut dirs = Vec::with_capacity(2);
        if let Some(cache_dir) = self.paths.cache_dir_for_image_root(
            config.destination_folder,
            config.destination_structure,
            crate::paths::UPLOADS_ROOT,
        ) && cache_dir != upload_dir
        {
            dirs.push(cache_dir);
        }
        dirs.push(upload_dir);
        dirs
    }
}

/// Hint for one `.htaccess`, and whether it carries the redirect rules.
fn inspect_htaccess(dir: &Path) -> (bool, NarrativeLine) {
    let htaccess = dir.join(".htaccess");
    match fs::read_to_string(&htaccess) {
        Ok(content) if content.contains(REALIZER_MARKER) => (
            true,
            NarrativeLine::new(
                LineKind::Plain,
                format!(
                    "The .htaccess in {} contains the rules for redirecting to the converter.",
                    dir.display()
                ),
            ),
        ),
        Ok(_) => (
            false,
            NarrativeLine::new(
                LineKind::Warn,
                format!(
                    "The .htaccess in {} has no rules for redirecting to the converter. \
                     Try saving the options again.",
                    dir.display()
                ),
            ),
        ),
        Err(err) => {
            tracing::debug!(path = %htaccess.display(), error = %err, "could not read .htaccess");
            (
                false,
                NarrativeLine::new(
                    LineKind::Warn,
                    format!(
                        "There is no readable .htaccess in {}. The rules for redirecting to the \
                         converter are placed there. Try saving the options again.",
                        dir.display()
                    ),
                ),
            )
        }
    }
}

impl RewriteDiagnosis for HtaccessDiagnosis {
    fn diagnose_failed_rewrite(&self, config: &ProbeConfig) -> Vec<NarrativeLine> {
        let mut lines = Vec::new();
        let mut rules_found = false;
        for dir in self.rules_dirs(config) {
            let (found, line) = inspect_htaccess(&dir);
            rules_found |= found;
            lines.push(line);
        }

        if rules_found {
            lines.push(NarrativeLine::new(
                LineKind::Plain,
                "So the rules are in place, but the server does not seem to act on them. \
                 Check that mod_rewrite is enabled and that AllowOverride permits .htaccess files.",
            ));
        }
        lines.push(NarrativeLine::new(
            LineKind::Plain,
            "If the server is not Apache (nginx for example), .htaccess files are ignored and the \
             redirect rules must be added to the server configuration by hand.",
        ));
        lines
    }
}
