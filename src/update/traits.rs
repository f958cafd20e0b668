use crate::update::error::UpdateResult;
use std::ffi::OsString;
use std::io::Read;
use std::path::Path;

/// A response whose status has not been judged yet; callers classify it.
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport {
    fn get(&self, url: &str, accept: &str) -> UpdateResult<HttpResponse>;
}

pub trait AppRunner {
    /// Runs `app` to completion and returns its exit code.
    fn run(&self, app: &Path, args: &[OsString]) -> std::io::Result<i32>;
}
