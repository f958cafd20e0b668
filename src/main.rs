mod cli;
mod config;
mod error;
mod logging;
mod profiles;
mod runner;
mod update;

use log::{debug, info, warn};

use crate::{
    cli::Invocation,
    config::{JsonConfigFile, LauncherConfig},
    error::{AppError, AppResult},
    runner::ProcessRunner,
    update::{HttpClient, UpdateLauncher},
};

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("relaunch: {err}");
            1
        }
    };
    std::process::exit(code);
}

fn run() -> AppResult<i32> {
    let invocation = Invocation::from_args(std::env::args_os(), std::env::current_exe().ok())?;
    let dir = invocation.launcher_dir().to_path_buf();
    let stem = invocation.launcher_stem();

    let level = logging::level_from_env(std::env::var(logging::LOG_LEVEL_ENV).ok().as_deref());
    logging::init_logging(level, Some(dir.join(format!("{stem}.log")).as_path()));
    debug!("{} started from {}", cli::version_line(), invocation.launcher.display());

    let config_path = config::config_path_for(&invocation.launcher).ok_or_else(|| {
        AppError::LauncherPath(invocation.launcher.display().to_string())
    })?;
    let profile = profiles::resolve(&stem);
    let store = JsonConfigFile::new(config_path);
    let (mut config, created) =
        store.load_or_init(LauncherConfig::defaults(profile, std::env::consts::OS))?;
    if created {
        info!(
            "Created {} with {} defaults; edit it to change what gets downloaded.",
            store.path().display(),
            profile.id
        );
    }

    let transport = match HttpClient::new(config.allow_insecure) {
        Ok(transport) => transport,
        Err(err) => {
            warn!("Falling back to default TLS settings: {err}");
            HttpClient::new(false)?
        }
    };
    let runner = ProcessRunner;
    let launcher = UpdateLauncher::new(&transport, &runner, &store, dir);
    let outcome = launcher.run(&mut config, &invocation.forwarded);
    debug!("finished with {outcome:?}");
    Ok(outcome.exit_code())
}
