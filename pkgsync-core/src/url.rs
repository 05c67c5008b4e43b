//! Distribution URL translation.
//!
//! A manifest's `dist.url` points at its artifact blob:
//!
//! ```text
//! https://{bucket}.{region}.{domain}/{prefix}{key}
//! ```
//!
//! Historical default-region URLs use the literal region segment `s3`, so that
//! alias is accepted for every repository regardless of its configured region.

use crate::types::Repository;

/// Region segment accepted for any repository.
pub const DEFAULT_REGION_ALIAS: &str = "s3";

/// Extract the artifact key from `url` if it lives inside `repo`.
///
/// Returns `None` when the URL points outside the repository (different host,
/// different prefix, or nothing after the prefix). Keys with an empty, `.` or
/// `..` segment are never inside a repository either.
pub fn extract_key(url: &str, repo: &Repository, domain: &str) -> Option<String> {
    let rest = url.strip_prefix("https://")?;
    let (host, path) = rest.split_once('/')?;

    let region = host
        .strip_prefix(repo.bucket.as_str())?
        .strip_prefix('.')?
        .strip_suffix(domain)?
        .strip_suffix('.')?;
    if region != repo.region && region != DEFAULT_REGION_ALIAS {
        return None;
    }

    let key = path.strip_prefix(repo.prefix.as_str())?;
    if !is_plain_key(key) {
        return None;
    }
    Some(key.to_owned())
}

/// True when every `/`-separated segment of `key` is a real name.
pub fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .split('/')
            .all(|segment| !matches!(segment, "" | "." | ".."))
}

/// Canonical URL for `key` inside `repo`.
pub fn rewrite_url(key: &str, repo: &Repository, domain: &str) -> String {
    format!(
        "https://{}.{}.{}/{}{}",
        repo.bucket, repo.region, domain, repo.prefix, key
    )
}
