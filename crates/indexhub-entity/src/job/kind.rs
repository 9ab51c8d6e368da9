//! Known job types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The job types this system knows how to run.
///
/// `Job::job_type` stays a free-form string so rows written by newer
/// versions still load; unknown types simply fail dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Generate embeddings for one content item.
    EmbedContent,
    /// Re-chunk and re-embed one content item.
    ReindexItem,
    /// Walk all content in pages, fanning out `ReindexItem` jobs.
    ReindexAll,
    /// Delete old terminal jobs and reclaim stale ones.
    Cleanup,
}

impl JobKind {
    /// Return the job type string stored in `index_jobs.job_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmbedContent => "embed_content",
            Self::ReindexItem => "reindex_item",
            Self::ReindexAll => "reindex_all",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "embed_content" => Ok(Self::EmbedContent),
            "reindex_item" => Ok(Self::ReindexItem),
            "reindex_all" => Ok(Self::ReindexAll),
            "cleanup" => Ok(Self::Cleanup),
            other => Err(format!("unknown job type '{other}'")),
        }
    }
}
