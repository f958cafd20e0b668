use crate::update::error::{UpdateError, UpdateResult};
use crate::update::traits::Transport;
use sha2::Digest;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const CHUNK_SIZE: usize = 8192;

pub fn parse_sha256_digest(digest: &str) -> UpdateResult<String> {
    let trimmed = digest.trim();
    let Some(rest) = trimmed.strip_prefix("sha256:") else {
        return Err(UpdateError::InvalidDigest(trimmed.to_string()));
    };
    let hex = rest.trim();
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(UpdateError::InvalidDigest(trimmed.to_string()));
    }
    Ok(hex.to_ascii_lowercase())
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Sibling path the body is streamed into before it replaces `dest`.
pub fn part_path_for(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Streams `url` into `dest`. `dest` is only replaced once the whole body
/// has been written (and matched `digest`, when one is given); on failure the
/// previous file is left untouched.
pub fn download_to(
    transport: &dyn Transport,
    url: &str,
    dest: &Path,
    digest: Option<&str>,
) -> UpdateResult<u64> {
    let expected = digest.map(parse_sha256_digest).transpose()?;
    let response = transport.get(url, "application/octet-stream")?;
    if response.status != 200 {
        return Err(UpdateError::DownloadStatus {
            status: response.status,
            reason: response.reason,
        });
    }
    let part = part_path_for(dest);
    let install = || -> UpdateResult<u64> {
        let written = stream_to_file(response.body, &part, expected.as_deref())?;
        make_executable(&part)?;
        std::fs::rename(&part, dest)?;
        Ok(written)
    };
    install().inspect_err(|_| {
        let _ = std::fs::remove_file(&part);
    })
}

fn stream_to_file(
    mut body: impl Read,
    path: &Path,
    expected: Option<&str>,
) -> UpdateResult<u64> {
    let mut file = File::create(path)?;
    let mut hasher = sha2::Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let read = body.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])?;
        hasher.update(&buffer[..read]);
        written += read as u64;
    }
    file.flush()?;
    file.sync_all()?;
    if let Some(expected) = expected {
        let actual = to_hex(&hasher.finalize());
        if actual != expected {
            return Err(UpdateError::DigestMismatch);
        }
    }
    Ok(written)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
