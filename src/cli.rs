use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// How the launcher itself was invoked. Every argument after the program
/// name belongs to the launched app; the launcher takes no flags of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub launcher: PathBuf,
    pub forwarded: Vec<OsString>,
}

impl Invocation {
    /// `current_exe` wins over `argv[0]`, which may be relative or a bare name
    /// found through `PATH`.
    pub fn from_args<I>(args: I, current_exe: Option<PathBuf>) -> AppResult<Self>
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut iter = args.into_iter();
        let argv0 = iter.next().map(PathBuf::from);
        let launcher = current_exe
            .or(argv0)
            .ok_or_else(|| AppError::LauncherPath("no program name".to_string()))?;
        Ok(Self {
            launcher,
            forwarded: iter.collect(),
        })
    }

    pub fn launcher_dir(&self) -> &Path {
        match self.launcher.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub fn launcher_stem(&self) -> String {
        self.launcher
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn build_version_tag() -> Option<&'static str> {
    option_env!("RELAUNCH_BUILD_VERSION").and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn version_tag_for_output(cargo_version: &str, build_tag: Option<&str>) -> String {
    build_tag.unwrap_or(cargo_version).to_string()
}

pub fn version_line() -> String {
    let tag = version_tag_for_output(env!("CARGO_PKG_VERSION"), build_version_tag());
    format!("relaunch {tag}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os_args(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    #[test]
    fn from_args_forwards_everything_after_program_name() {
        let args = os_args(&["relaunch", "--version", "-x", "a b"]);

        let invocation = Invocation::from_args(args, None).unwrap();

        assert_eq!(invocation.launcher, PathBuf::from("relaunch"));
        assert_eq!(invocation.forwarded, os_args(&["--version", "-x", "a b"]));
    }

    #[test]
    fn from_args_prefers_current_exe() {
        let args = os_args(&["relaunch"]);

        let invocation =
            Invocation::from_args(args, Some(PathBuf::from("/opt/apps/freetube.exe"))).unwrap();

        assert_eq!(invocation.launcher_dir(), Path::new("/opt/apps"));
        assert_eq!(invocation.launcher_stem(), "freetube");
        assert!(invocation.forwarded.is_empty());
    }

    #[test]
    fn from_args_without_program_name_fails() {
        let error = Invocation::from_args(Vec::new(), None).unwrap_err();

        assert!(matches!(error, AppError::LauncherPath(_)));
    }

    #[test]
    fn launcher_dir_of_bare_name_is_current_dir() {
        let invocation = Invocation::from_args(os_args(&["relaunch"]), None).unwrap();

        assert_eq!(invocation.launcher_dir(), Path::new("."));
    }

    #[test]
    fn version_tag_prefers_build_tag() {
        assert_eq!(version_tag_for_output("0.1.0", Some("v9.9.9")), "v9.9.9");
        assert_eq!(version_tag_for_output("0.1.0", None), "0.1.0");
    }
}
