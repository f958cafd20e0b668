use crate::config::LauncherConfig;

/// Which pass of the update-and-launch procedure is running. A self-heal
/// pass is never followed by another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Initial,
    SelfHeal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    /// The app file is on disk.
    Healthy,
    /// The app file vanished although a version is recorded; retry once.
    FirstMissing,
    /// Still gone after a retry; give up.
    StillMissing,
    /// Nothing was ever downloaded.
    NeverDownloaded,
}

impl LaunchState {
    pub fn classify(app_exists: bool, config: &LauncherConfig, attempt: Attempt) -> Self {
        if app_exists {
            LaunchState::Healthy
        } else if config.missing_file || attempt == Attempt::SelfHeal {
            LaunchState::StillMissing
        } else if config.has_recorded_version() {
            LaunchState::FirstMissing
        } else {
            LaunchState::NeverDownloaded
        }
    }
}
