use crate::update::error::{UpdateError, UpdateResult};
use crate::update::traits::{HttpResponse, Transport};
use semver::Version;
use std::io::Read;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub tag_name: String,
    pub prerelease: bool,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub download_url: String,
    pub digest: Option<String>,
}

/// Which release channels may be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPolicy {
    include_stable: bool,
    include_prerelease: bool,
}

impl ChannelPolicy {
    /// Disabling both channels is treated as stable-only.
    pub fn new(include_stable: bool, include_prerelease: bool) -> Self {
        Self {
            include_stable: include_stable || !include_prerelease,
            include_prerelease,
        }
    }

    pub fn accepts(&self, release: &Release) -> bool {
        if release.prerelease {
            self.include_prerelease
        } else {
            self.include_stable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChange {
    FirstInstall,
    Upgrade,
    Downgrade,
    Changed,
}

pub fn parse_version_tag(tag: &str) -> Result<Version, semver::Error> {
    let trimmed = tag.trim();
    let normalized = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(normalized)
}

/// Describes how `target` relates to the recorded tag. Only used for
/// reporting; whether to download is decided by plain tag equality.
pub fn describe_change(recorded: &str, target: &str) -> VersionChange {
    if recorded.trim().is_empty() {
        return VersionChange::FirstInstall;
    }
    match (parse_version_tag(recorded), parse_version_tag(target)) {
        (Ok(current), Ok(next)) if next > current => VersionChange::Upgrade,
        (Ok(current), Ok(next)) if next < current => VersionChange::Downgrade,
        _ => VersionChange::Changed,
    }
}

/// First release in feed order that the policy accepts.
pub fn select_release(releases: &[Release], policy: ChannelPolicy) -> Option<&Release> {
    releases.iter().find(|release| policy.accepts(release))
}

pub fn classify_response(response: HttpResponse) -> UpdateResult<String> {
    match response.status {
        404 => return Err(UpdateError::FeedNotFound),
        500..=599 => {
            return Err(UpdateError::FeedServerError {
                status: response.status,
                reason: response.reason,
            });
        }
        _ if !response.is_success() => {
            return Err(UpdateError::FeedStatus {
                status: response.status,
                reason: response.reason,
            });
        }
        _ => {}
    }
    let mut body = String::new();
    response.body.take(FEED_BODY_LIMIT).read_to_string(&mut body)?;
    if body.trim().is_empty() {
        return Err(UpdateError::FeedEmpty);
    }
    Ok(body)
}

const FEED_BODY_LIMIT: u64 = 32 * 1024 * 1024;

pub fn parse_releases_json(body: &str) -> UpdateResult<Vec<Release>> {
    let json = serde_json::from_str::<serde_json::Value>(body)
        .map_err(|error| UpdateError::FeedMalformed(error.to_string()))?;
    let Some(items) = json.as_array() else {
        if let Some(message) = json.get("message").and_then(|value| value.as_str()) {
            return Err(UpdateError::FeedMalformed(message.to_string()));
        }
        return Err(UpdateError::FeedMalformed(
            "expected a list of releases".to_string(),
        ));
    };
    let mut releases = Vec::new();
    for item in items {
        let tag_name = item
            .get("tag_name")
            .and_then(|value| value.as_str())
            .ok_or_else(|| UpdateError::FeedMalformed("release without tag_name".to_string()))?;
        let prerelease = item
            .get("prerelease")
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        let mut assets = Vec::new();
        if let Some(asset_items) = item.get("assets").and_then(|value| value.as_array()) {
            for asset in asset_items {
                let Some(name) = asset.get("name").and_then(|value| value.as_str()) else {
                    continue;
                };
                let Some(download_url) = asset
                    .get("browser_download_url")
                    .and_then(|value| value.as_str())
                else {
                    continue;
                };
                let digest = asset
                    .get("digest")
                    .and_then(|value| value.as_str())
                    .and_then(normalize_digest);
                assets.push(Asset {
                    name: name.to_string(),
                    download_url: download_url.to_string(),
                    digest,
                });
            }
        }
        releases.push(Release {
            tag_name: tag_name.to_string(),
            prerelease,
            assets,
        });
    }
    Ok(releases)
}

fn normalize_digest(digest: &str) -> Option<String> {
    let trimmed = digest.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Fetches the feed and picks a release. `Ok(None)` means the feed was read
/// fine but nothing matched the policy.
pub fn fetch_latest(
    transport: &dyn Transport,
    url: &str,
    policy: ChannelPolicy,
) -> UpdateResult<Option<Release>> {
    let response = transport.get(url, "application/vnd.github+json")?;
    let body = classify_response(response)?;
    let releases = parse_releases_json(&body)?;
    Ok(select_release(&releases, policy).cloned())
}
