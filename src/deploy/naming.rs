//! Derived resource names.

use sha2::{Digest, Sha256};

use crate::manifest::Manifest;
use crate::platform::ResourceId;

/// Longest bucket name the storage API accepts.
pub const MAX_BUCKET_NAME_LEN: usize = 63;

/// Hex characters of the hash suffix.
const HASH_SUFFIX_LEN: usize = 8;

/// Name of the project bucket: the first declared bucket, else one derived
/// from the project name and application ID.
#[must_use]
pub fn project_bucket_name(manifest: &Manifest, project: &str, app_id: ResourceId) -> String {
    manifest.project_bucket().map_or_else(
        || derived_bucket_name(project, app_id),
        |bucket| bucket.name.clone(),
    )
}

/// `<project>-<8 hex of sha256(project:application_id)>`, lowercased and
/// clamped to the bucket name limit.
#[must_use]
pub fn derived_bucket_name(project: &str, app_id: ResourceId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{project}:{app_id}").as_bytes());
    let digest = hex::encode(hasher.finalize());
    let suffix = &digest[..HASH_SUFFIX_LEN];

    let mut stem = sanitize(project);
    stem.truncate(MAX_BUCKET_NAME_LEN - HASH_SUFFIX_LEN - 1);
    let stem = stem.trim_end_matches('-');
    let stem = if stem.is_empty() { "edge" } else { stem };

    format!("{stem}-{suffix}")
}

/// Name of the default origin created for a project.
#[must_use]
pub fn default_origin_name(project: &str) -> String {
    format!("{project}-single")
}

/// Lowercases and replaces anything outside `[a-z0-9-]` with a hyphen,
/// collapsing runs and trimming the ends.
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars().map(|c| c.to_ascii_lowercase()) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    out.trim_end_matches('-').to_string()
}
