pub mod runs;

use runs::{AlbumPolicy, RunError, TextRun};

/// A queue or watch-next item, kept as raw runs until a player record asks
/// for it. Queues list far more tracks than get played, and an odd byline on
/// an unplayed track must not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub video_id: String,
    pub title_runs: Vec<TextRun>,
    pub byline_runs: Vec<TextRun>,
}

/// Normalized metadata for one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMetadata {
    pub album: String,
    pub artists: Vec<String>,
    pub title: String,
    pub year: i32,
}

impl QueueMetadata {
    /// First credited artist. Only hand-built metadata can lack one.
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }
}

impl QueueEntry {
    pub fn metadata(&self, policy: AlbumPolicy) -> Result<QueueMetadata, RunError> {
        let title = match self.title_runs.as_slice() {
            [only] => only.text.clone(),
            other => return Err(RunError::TitleRuns(other.len())),
        };
        let byline = runs::classify_runs(&self.byline_runs, policy)?;
        Ok(QueueMetadata {
            album: byline.album,
            artists: byline.artists,
            title,
            year: byline.year,
        })
    }
}
