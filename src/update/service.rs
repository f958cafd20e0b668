use crate::config::{ConfigStore, LauncherConfig};
use crate::update::{
    asset::{compile_pattern, resolve_asset},
    download,
    error::UpdateResult,
    launcher::{Attempt, LaunchState},
    release::{ChannelPolicy, VersionChange, describe_change, fetch_latest},
    traits::{AppRunner, Transport},
};
use log::{debug, error, info, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The app ran and exited with this code.
    Launched(i32),
    /// The app could not be started.
    LaunchFailed,
    NotYetDownloaded,
    /// The app file stayed missing after a self-heal attempt.
    Unrecoverable,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Launched(code) => *code,
            RunOutcome::LaunchFailed
            | RunOutcome::NotYetDownloaded
            | RunOutcome::Unrecoverable => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum UpdateStep {
    UpToDate(String),
    NoRelease,
    NoAsset(String),
    Installed(String),
}

pub struct UpdateLauncher<'a> {
    transport: &'a dyn Transport,
    runner: &'a dyn AppRunner,
    store: &'a dyn ConfigStore,
    app_dir: PathBuf,
}

impl<'a> UpdateLauncher<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        runner: &'a dyn AppRunner,
        store: &'a dyn ConfigStore,
        app_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            runner,
            store,
            app_dir: app_dir.into(),
        }
    }

    pub fn app_path(&self, config: &LauncherConfig) -> PathBuf {
        self.app_dir.join(&config.app_file)
    }

    /// Checks the feed, installs a newer build if there is one and then
    /// launches the app with `args`.
    pub fn run(&self, config: &mut LauncherConfig, args: &[OsString]) -> RunOutcome {
        self.run_attempt(config, args, Attempt::Initial)
    }

    fn run_attempt(
        &self,
        config: &mut LauncherConfig,
        args: &[OsString],
        attempt: Attempt,
    ) -> RunOutcome {
        self.update(config);
        self.launch(config, args, attempt)
    }

    fn update(&self, config: &mut LauncherConfig) {
        let app = self.app_path(config);
        match self.try_update(config, &app) {
            Ok(UpdateStep::UpToDate(tag)) => {
                info!("You already have the latest version ({tag}) downloaded.");
            }
            Ok(UpdateStep::NoRelease) => {
                warn!("No release in {} matches the channel settings.", config.repo_api);
            }
            Ok(UpdateStep::NoAsset(tag)) => {
                warn!(
                    "No asset matching '{}' found in release {tag}.",
                    config.file_pattern
                );
            }
            Ok(UpdateStep::Installed(tag)) => {
                info!("Download complete of: {}", app.display());
                info!("Updated to / downloaded version: {tag}");
                config.latest_version = tag;
                config.missing_file = false;
                self.persist(config);
            }
            Err(err) => {
                warn!("Update skipped, launching the installed app: {err}");
            }
        }
    }

    fn try_update(&self, config: &LauncherConfig, app: &Path) -> UpdateResult<UpdateStep> {
        let policy = ChannelPolicy::new(config.get_releases, config.get_prereleases);
        let Some(release) = fetch_latest(self.transport, &config.repo_api, policy)? else {
            return Ok(UpdateStep::NoRelease);
        };
        if config.latest_version == release.tag_name {
            return Ok(UpdateStep::UpToDate(release.tag_name));
        }
        let pattern = compile_pattern(&config.file_pattern)?;
        let Some(asset) = resolve_asset(&release, &pattern) else {
            return Ok(UpdateStep::NoAsset(release.tag_name));
        };
        match describe_change(&config.latest_version, &release.tag_name) {
            VersionChange::FirstInstall => info!("Installing {}", release.tag_name),
            VersionChange::Upgrade => {
                info!("Upgrading {} -> {}", config.latest_version, release.tag_name);
            }
            VersionChange::Downgrade => {
                warn!(
                    "Feed offers older {} than installed {}",
                    release.tag_name, config.latest_version
                );
            }
            VersionChange::Changed => {
                info!("Switching {} -> {}", config.latest_version, release.tag_name);
            }
        }
        debug!("downloading {} from {}", asset.name, asset.download_url);
        download::download_to(
            self.transport,
            &asset.download_url,
            app,
            asset.digest.as_deref(),
        )?;
        Ok(UpdateStep::Installed(release.tag_name))
    }

    fn launch(
        &self,
        config: &mut LauncherConfig,
        args: &[OsString],
        attempt: Attempt,
    ) -> RunOutcome {
        let app = self.app_path(config);
        match LaunchState::classify(app.exists(), config, attempt) {
            LaunchState::Healthy => {
                if config.missing_file {
                    config.missing_file = false;
                    self.persist(config);
                }
                debug!("launching {} with {} argument(s)", app.display(), args.len());
                match self.runner.run(&app, args) {
                    Ok(code) => RunOutcome::Launched(code),
                    Err(err) => {
                        error!("Failed to launch {}: {err}", app.display());
                        RunOutcome::LaunchFailed
                    }
                }
            }
            LaunchState::FirstMissing => {
                warn!(
                    "The app file '{}' is missing, downloading it again.",
                    app.display()
                );
                let recorded = std::mem::take(&mut config.latest_version);
                config.missing_file = true;
                self.persist(config);
                let outcome = self.run_attempt(config, args, Attempt::SelfHeal);
                if !config.has_recorded_version() {
                    config.latest_version = recorded;
                    self.persist(config);
                }
                outcome
            }
            LaunchState::StillMissing => {
                config.missing_file = false;
                self.persist(config);
                error!(
                    "There was some issue with the downloading, the app file '{}' is missing \
                     but should have been downloaded. Check the config and submit a bug if the \
                     issue persists.",
                    app.display()
                );
                RunOutcome::Unrecoverable
            }
            LaunchState::NeverDownloaded => {
                error!(
                    "The app file '{}' has not been downloaded yet.",
                    app.display()
                );
                RunOutcome::NotYetDownloaded
            }
        }
    }

    fn persist(&self, config: &LauncherConfig) {
        if let Err(err) = self.store.save(config) {
            error!("Failed to save config: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigResult, JsonConfigFile};
    use crate::update::traits::HttpResponse;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::Cursor;

    const FEED: &str = "https://feed.test/releases";

    #[derive(Default)]
    struct FakeTransport {
        routes: HashMap<String, (u16, Vec<u8>)>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeTransport {
        fn route(mut self, url: &str, status: u16, body: &[u8]) -> Self {
            self.routes.insert(url.to_string(), (status, body.to_vec()));
            self
        }

        fn calls_to(&self, url: &str) -> usize {
            self.calls.borrow().iter().filter(|call| *call == url).count()
        }
    }

    impl Transport for FakeTransport {
        fn get(&self, url: &str, _accept: &str) -> UpdateResult<HttpResponse> {
            self.calls.borrow_mut().push(url.to_string());
            let (status, body) = self
                .routes
                .get(url)
                .cloned()
                .unwrap_or((404, Vec::new()));
            Ok(HttpResponse {
                status,
                reason: "Reason".to_string(),
                body: Box::new(Cursor::new(body)),
            })
        }
    }

    #[derive(Default)]
    struct FakeRunner {
        runs: RefCell<Vec<(PathBuf, Vec<OsString>)>>,
    }

    impl AppRunner for FakeRunner {
        fn run(&self, app: &Path, args: &[OsString]) -> std::io::Result<i32> {
            self.runs
                .borrow_mut()
                .push((app.to_path_buf(), args.to_vec()));
            Ok(7)
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        saved: RefCell<Vec<LauncherConfig>>,
    }

    impl MemoryStore {
        fn last(&self) -> Option<LauncherConfig> {
            self.saved.borrow().last().cloned()
        }
    }

    impl ConfigStore for MemoryStore {
        fn save(&self, config: &LauncherConfig) -> ConfigResult<()> {
            self.saved.borrow_mut().push(config.clone());
            Ok(())
        }
    }

    fn feed_body(tag: &str, asset_url: &str) -> Vec<u8> {
        format!(
            r#"[{{"tag_name": "{tag}", "prerelease": false, "assets": [
                {{"name": "app-{tag}.exe", "browser_download_url": "https://x/other"}},
                {{"name": "app-{tag}.AppImage", "browser_download_url": "{asset_url}"}}
            ]}}]"#
        )
        .into_bytes()
    }

    // sha256("binary")
    const BINARY_SHA256: &str = "9a3a45d01531a20e89ac6ae10b0b0beb0492acd7216a368aa062d1a5fecaf9cd";

    fn feed_body_with_digest(tag: &str, asset_url: &str, digest: &str) -> Vec<u8> {
        format!(
            r#"[{{"tag_name": "{tag}", "prerelease": false, "assets": [
                {{"name": "app-{tag}.AppImage", "browser_download_url": "{asset_url}",
                  "digest": "sha256:{digest}"}}
            ]}}]"#
        )
        .into_bytes()
    }

    fn test_config(version: &str) -> LauncherConfig {
        LauncherConfig {
            repo_api: FEED.to_string(),
            file_pattern: r"app-.*\.AppImage".to_string(),
            app_file: "App.AppImage".to_string(),
            latest_version: version.to_string(),
            ..LauncherConfig::default()
        }
    }

    fn args() -> Vec<OsString> {
        vec![OsString::from("--flag"), OsString::from("file name.txt")]
    }

    #[test]
    fn run_downloads_new_release_then_launches_with_args() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = FakeTransport::default()
            .route(FEED, 200, &feed_body("v2", "https://x/app"))
            .route("https://x/app", 200, b"binary");
        let runner = FakeRunner::default();
        let store = MemoryStore::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
        let mut config = test_config("v1");

        let outcome = launcher.run(&mut config, &args());

        assert_eq!(outcome, RunOutcome::Launched(7));
        assert_eq!(config.latest_version, "v2");
        assert_eq!(store.last().unwrap().latest_version, "v2");
        assert_eq!(std::fs::read(dir.path().join("App.AppImage")).unwrap(), b"binary");
        assert_eq!(
            runner.runs.borrow().as_slice(),
            &[(dir.path().join("App.AppImage"), args())]
        );
    }

    #[test]
    fn run_skips_download_when_version_matches() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("App.AppImage"), b"installed").unwrap();
        let transport = FakeTransport::default()
            .route(FEED, 200, &feed_body("v1", "https://x/app"))
            .route("https://x/app", 200, b"binary");
        let runner = FakeRunner::default();
        let store = MemoryStore::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
        let mut config = test_config("v1");

        let outcome = launcher.run(&mut config, &[]);

        assert_eq!(outcome, RunOutcome::Launched(7));
        assert_eq!(transport.calls_to("https://x/app"), 0);
        assert!(store.saved.borrow().is_empty());
        assert_eq!(runner.runs.borrow().len(), 1);
    }

    #[test]
    fn run_launches_installed_app_when_feed_fails() {
        for status in [404, 500, 502] {
            let dir = tempfile::tempdir().expect("tempdir");
            std::fs::write(dir.path().join("App.AppImage"), b"installed").unwrap();
            let transport = FakeTransport::default().route(FEED, status, b"");
            let runner = FakeRunner::default();
            let store = MemoryStore::default();
            let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
            let mut config = test_config("v1");

            let outcome = launcher.run(&mut config, &[]);

            assert_eq!(outcome, RunOutcome::Launched(7), "status {status}");
            assert_eq!(config.latest_version, "v1");
        }
    }

    #[test]
    fn run_launches_installed_app_when_no_asset_matches() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("App.AppImage"), b"installed").unwrap();
        let transport = FakeTransport::default().route(FEED, 200, &feed_body("v2", "https://x/app"));
        let runner = FakeRunner::default();
        let store = MemoryStore::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
        let mut config = LauncherConfig {
            file_pattern: r"app-.*\.dmg".to_string(),
            ..test_config("v1")
        };

        let outcome = launcher.run(&mut config, &[]);

        assert_eq!(outcome, RunOutcome::Launched(7));
        assert_eq!(config.latest_version, "v1");
    }

    #[test]
    fn run_keeps_version_when_download_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("App.AppImage"), b"installed").unwrap();
        let transport = FakeTransport::default()
            .route(FEED, 200, &feed_body("v2", "https://x/app"))
            .route("https://x/app", 500, b"");
        let runner = FakeRunner::default();
        let store = MemoryStore::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
        let mut config = test_config("v1");

        let outcome = launcher.run(&mut config, &[]);

        assert_eq!(outcome, RunOutcome::Launched(7));
        assert_eq!(config.latest_version, "v1");
        assert!(store.saved.borrow().is_empty());
        assert_eq!(
            std::fs::read(dir.path().join("App.AppImage")).unwrap(),
            b"installed"
        );
    }

    #[test]
    fn run_self_heals_missing_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = FakeTransport::default()
            .route(FEED, 200, &feed_body("v1", "https://x/app"))
            .route("https://x/app", 200, b"binary");
        let runner = FakeRunner::default();
        let store = MemoryStore::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
        let mut config = test_config("v1");

        let outcome = launcher.run(&mut config, &args());

        assert_eq!(outcome, RunOutcome::Launched(7));
        assert_eq!(transport.calls_to(FEED), 2);
        assert_eq!(transport.calls_to("https://x/app"), 1);
        assert_eq!(config.latest_version, "v1");
        assert!(!config.missing_file);
        assert_eq!(runner.runs.borrow().len(), 1);
    }

    #[test]
    fn run_reports_still_missing_after_one_retry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = FakeTransport::default().route(FEED, 503, b"");
        let runner = FakeRunner::default();
        let store = MemoryStore::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
        let mut config = test_config("v1");

        let outcome = launcher.run(&mut config, &[]);

        assert_eq!(outcome, RunOutcome::Unrecoverable);
        assert_eq!(transport.calls_to(FEED), 2);
        assert!(runner.runs.borrow().is_empty());
        assert_eq!(config.latest_version, "v1");
        assert!(!config.missing_file);
        assert_eq!(store.last(), Some(config.clone()));
    }

    #[test]
    fn run_with_flag_already_set_does_not_retry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = FakeTransport::default().route(FEED, 503, b"");
        let runner = FakeRunner::default();
        let store = MemoryStore::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
        let mut config = LauncherConfig {
            missing_file: true,
            ..test_config("")
        };

        let outcome = launcher.run(&mut config, &[]);

        assert_eq!(outcome, RunOutcome::Unrecoverable);
        assert_eq!(transport.calls_to(FEED), 1);
        assert!(!config.missing_file);
    }

    #[test]
    fn run_reports_never_downloaded_without_retry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = FakeTransport::default().route(FEED, 404, b"");
        let runner = FakeRunner::default();
        let store = MemoryStore::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
        let mut config = test_config("");

        let outcome = launcher.run(&mut config, &[]);

        assert_eq!(outcome, RunOutcome::NotYetDownloaded);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(transport.calls_to(FEED), 1);
        assert!(store.saved.borrow().is_empty());
    }

    #[test]
    fn run_clears_stale_missing_flag_when_file_exists() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("App.AppImage"), b"installed").unwrap();
        let transport = FakeTransport::default().route(FEED, 404, b"");
        let runner = FakeRunner::default();
        let store = MemoryStore::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
        let mut config = LauncherConfig {
            missing_file: true,
            ..test_config("v1")
        };

        launcher.run(&mut config, &[]);

        assert!(!config.missing_file);
        assert!(!store.last().unwrap().missing_file);
    }

    #[test]
    fn run_installs_asset_matching_feed_digest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = FakeTransport::default()
            .route(FEED, 200, &feed_body_with_digest("v2", "https://x/app", BINARY_SHA256))
            .route("https://x/app", 200, b"binary");
        let runner = FakeRunner::default();
        let store = MemoryStore::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
        let mut config = test_config("v1");

        let outcome = launcher.run(&mut config, &[]);

        assert_eq!(outcome, RunOutcome::Launched(7));
        assert_eq!(config.latest_version, "v2");
        assert_eq!(std::fs::read(dir.path().join("App.AppImage")).unwrap(), b"binary");
    }

    #[test]
    fn run_rejects_asset_that_fails_feed_digest() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("App.AppImage"), b"installed").unwrap();
        let wrong = "0".repeat(64);
        let transport = FakeTransport::default()
            .route(FEED, 200, &feed_body_with_digest("v2", "https://x/app", &wrong))
            .route("https://x/app", 200, b"binary");
        let runner = FakeRunner::default();
        let store = MemoryStore::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &store, dir.path());
        let mut config = test_config("v1");

        let outcome = launcher.run(&mut config, &[]);

        assert_eq!(outcome, RunOutcome::Launched(7));
        assert_eq!(transport.calls_to("https://x/app"), 1);
        assert_eq!(config.latest_version, "v1");
        assert!(store.saved.borrow().is_empty());
        assert_eq!(
            std::fs::read(dir.path().join("App.AppImage")).unwrap(),
            b"installed"
        );
    }

    #[test]
    fn reloaded_config_reflects_completed_download() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = JsonConfigFile::new(dir.path().join("relaunch.json"));
        let transport = FakeTransport::default()
            .route(FEED, 200, &feed_body("v3.1.0", "https://x/app"))
            .route("https://x/app", 200, b"binary");
        let runner = FakeRunner::default();
        let launcher = UpdateLauncher::new(&transport, &runner, &file, dir.path());
        let mut config = LauncherConfig {
            missing_file: true,
            ..test_config("v3.0.0")
        };

        launcher.run(&mut config, &[]);
        let raw = std::fs::read_to_string(file.path()).unwrap();
        let (reloaded, created) = file.load_or_init(LauncherConfig::default()).unwrap();

        assert!(!created);
        assert_eq!(reloaded.latest_version, "v3.1.0");
        assert!(!reloaded.missing_file);
        assert!(!raw.contains("missing_file"));
    }
}
