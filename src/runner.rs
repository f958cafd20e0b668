use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus};

use crate::update::AppRunner;

pub struct ProcessRunner;

impl AppRunner for ProcessRunner {
    fn run(&self, app: &Path, args: &[OsString]) -> std::io::Result<i32> {
        let status = Command::new(app).args(args).status()?;
        Ok(exit_code(status))
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
