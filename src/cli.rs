//! Line-oriented identity input for the `idsync` binary.
//!
//! One JSON value per line: an identity object
//! (`{"externalId":..,"email":..,"firstName":..,"lastName":..}`) or `null` for sign-out.

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::identity::{ExternalIdentity, IdentityFeed};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LineStats {
    pub published: usize,
    pub skipped: usize,
}

/// Publish every well-formed line to `feed` until EOF. Blank lines are ignored and
/// malformed ones are logged and skipped.
pub async fn publish_lines<R>(reader: R, feed: &IdentityFeed) -> anyhow::Result<LineStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = LineStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await.context("failed to read identity input")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Option<ExternalIdentity>>(line) {
            Ok(identity) => {
                feed.publish(identity);
                stats.published += 1;
            }
            Err(e) => {
                warn!(line = line_no, "skipping malformed identity: {}", e);
                stats.skipped += 1;
            }
        }
    }
    Ok(stats)
}
