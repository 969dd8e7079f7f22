use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use redirect_selftest::artifacts::{ArtifactManager, DirFixtureProvider};
use redirect_selftest::cli::{CliConfig, render_report};
use redirect_selftest::http::ReqwestProbeClient;
use redirect_selftest::paths::UploadLocationProvider;
use redirect_selftest::rewrite::{CacheRewriteResolver, HtaccessDiagnosis};
use redirect_selftest::storage::JsonConfigFile;
use redirect_selftest::{Collaborators, SelfTest, SelfTestError};

#[tokio::main]
async fn main() -> Result<ExitCode, SelfTestError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = CliConfig::parse();
    let paths: Arc<dyn UploadLocationProvider> = Arc::new(cli.installation_paths());

    let mut self_test = SelfTest::new(Collaborators {
        config: Box::new(JsonConfigFile::new(&cli.config)),
        paths: paths.clone(),
        artifacts: ArtifactManager::new(paths.clone(), Box::new(DirFixtureProvider::new(&cli.fixtures_dir))),
        resolver: Box::new(CacheRewriteResolver::new(paths.clone())),
        diagnosis: Box::new(HtaccessDiagnosis::new(paths)),
        client: Box::new(ReqwestProbeClient::new(cli.timeout())?),
    });
    if let Some(options) = cli.alter_html_options() {
        self_test = self_test.with_alter_html_options(options);
    }

    let report = self_test.run().await;
    println!("{}", render_report(&report, cli.format)?);

    Ok(if report.overall_success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
