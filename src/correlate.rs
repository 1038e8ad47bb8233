use std::collections::HashMap;

use crate::capture::payload::PlayerRecord;
use crate::error::{Error, Result};
use crate::metadata::runs::AlbumPolicy;
use crate::metadata::{QueueEntry, QueueMetadata};
use crate::reassembly::StreamAsset;

/// What to do when a player record has no asset or no queue metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingPolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Leave the track out and report it at the end.
    Skip,
}

/// Per-(artist, album) track counters for one run.
#[derive(Debug, Default)]
pub struct TrackNumbers {
    last: HashMap<(String, String), u32>,
}

impl TrackNumbers {
    /// Next number for the group, starting at 1.
    pub fn assign(&mut self, artist: &str, album: &str) -> u32 {
        let n = self
            .last
            .entry((artist.to_string(), album.to_string()))
            .or_insert(0);
        *n += 1;
        *n
    }
}

/// A player record joined with its metadata and bytes.
#[derive(Debug)]
pub struct CorrelatedTrack<'a> {
    pub player: &'a PlayerRecord,
    pub metadata: QueueMetadata,
    pub asset: &'a StreamAsset,
    pub track_number: u32,
}

impl CorrelatedTrack<'_> {
    pub fn video_id(&self) -> &str {
        &self.player.video_id
    }

    /// `artist - year - album - title`, for logs and dry runs.
    pub fn label(&self) -> String {
        format!(
            "{} - {} - {} - {}",
            self.metadata.primary_artist().unwrap_or_default(),
            self.metadata.year,
            self.metadata.album,
            self.metadata.title
        )
    }
}

/// A track left out under [`MissingPolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub video_id: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Correlation<'a> {
    pub tracks: Vec<CorrelatedTrack<'a>>,
    pub skipped: Vec<Skipped>,
}

/// Join every player record, in encounter order, with its asset and queue
/// metadata, numbering tracks per (primary artist, album).
///
/// Misses abort or skip per `missing`. Shape and ambiguity errors always
/// abort. Nothing is written here, so an abort leaves no partial output.
pub fn correlate<'a>(
    players: &'a [PlayerRecord],
    queue: &HashMap<String, QueueEntry>,
    assets: &'a HashMap<String, StreamAsset>,
    album_policy: AlbumPolicy,
    missing: MissingPolicy,
) -> Result<Correlation<'a>> {
    let mut numbers = TrackNumbers::default();
    let mut out = Correlation::default();

    for player in players {
        match resolve(player, queue, assets, album_policy) {
            Ok((metadata, asset)) => {
                let track_number = numbers.assign(
                    metadata.primary_artist().unwrap_or_default(),
                    &metadata.album,
                );
                let track = CorrelatedTrack {
                    player,
                    metadata,
                    asset,
                    track_number,
                };
                log::info!("{} (track {})", track.label(), track.track_number);
                out.tracks.push(track);
            }
            Err(e) if e.is_correlation_miss() && missing == MissingPolicy::Skip => {
                log::warn!("Skipping: {e}");
                out.skipped.push(Skipped {
                    video_id: player.video_id.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(out)
}

fn resolve<'a>(
    player: &PlayerRecord,
    queue: &HashMap<String, QueueEntry>,
    assets: &'a HashMap<String, StreamAsset>,
    album_policy: AlbumPolicy,
) -> Result<(QueueMetadata, &'a StreamAsset)> {
    let video_id = &player.video_id;

    let file_id = player.stream.file_id().ok_or_else(|| {
        Error::shape(
            format!("player record {video_id}"),
            "stream reference has no id parameter",
        )
    })?;
    let asset = assets
        .get(&file_id)
        .ok_or_else(|| Error::miss(video_id, format!("no chunks captured for file {file_id}")))?;

    let entry = queue
        .get(video_id)
        .ok_or_else(|| Error::miss(video_id, "no queue or watch-next metadata"))?;
    let metadata = entry
        .metadata(album_policy)
        .map_err(|source| Error::AmbiguousMetadata {
            video_id: video_id.clone(),
            source,
        })?;

    Ok((metadata, asset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::payload::StreamReference;
    use crate::metadata::runs::{RunError, RunTag, TextRun};
    use crate::reassembly::Reassembler;

    fn player(video_id: &str, file_id: &str) -> PlayerRecord {
        PlayerRecord {
            video_id: video_id.into(),
            author: "A".into(),
            title: video_id.into(),
            stream: StreamReference::Url(format!(
                "https://rr1.googlevideo.com/videoplayback?id={file_id}"
            )),
        }
    }

    fn queue_entry(video_id: &str, artist: &str, album: &str) -> QueueEntry {
        QueueEntry {
            video_id: video_id.into(),
            title_runs: vec![TextRun::new(format!("Song {video_id}"), RunTag::Plain)],
            byline_runs: vec![
                TextRun::new(artist, RunTag::Artist),
                TextRun::new(" • ", RunTag::Plain),
                TextRun::new(album, RunTag::Album),
                TextRun::new(" • ", RunTag::Plain),
                TextRun::new("2020", RunTag::Plain),
            ],
        }
    }

    fn assets(ids: &[&str]) -> HashMap<String, StreamAsset> {
        let mut r = Reassembler::default();
        for id in ids {
            r.push(id, "AA==").unwrap();
        }
        r.finish()
    }

    fn index(entries: Vec<QueueEntry>) -> HashMap<String, QueueEntry> {
        entries
            .into_iter()
            .map(|e| (e.video_id.clone(), e))
            .collect()
    }

    #[test]
    fn test_track_numbers_dense_per_group() {
        let mut n = TrackNumbers::default();
        assert_eq!(n.assign("Y", "X"), 1);
        assert_eq!(n.assign("Y", "W"), 1);
        assert_eq!(n.assign("Y", "X"), 2);
        assert_eq!(n.assign("Z", "X"), 1);
        assert_eq!(n.assign("Y", "W"), 2);
        assert_eq!(n.assign("Y", "X"), 3);
    }

    #[test]
    fn test_interleaved_albums() {
        let players = vec![
            player("v1", "f1"),
            player("v2", "f2"),
            player("v3", "f3"),
            player("v4", "f4"),
        ];
        let queue = index(vec![
            queue_entry("v1", "Y", "Album X"),
            queue_entry("v2", "Y", "Album W"),
            queue_entry("v3", "Y", "Album X"),
            queue_entry("v4", "Z", "Album X"),
        ]);
        let assets = assets(&["f1", "f2", "f3", "f4"]);
        let c = correlate(
            &players,
            &queue,
            &assets,
            AlbumPolicy::Strict,
            MissingPolicy::Abort,
        )
        .unwrap();
        let numbers: Vec<(&str, u32)> = c
            .tracks
            .iter()
            .map(|t| (t.video_id(), t.track_number))
            .collect();
        assert_eq!(numbers, vec![("v1", 1), ("v2", 1), ("v3", 2), ("v4", 1)]);
    }

    #[test]
    fn test_missing_asset_aborts() {
        let players = vec![player("v1", "f1"), player("v2", "f2")];
        let queue = index(vec![queue_entry("v1", "Y", "X"), queue_entry("v2", "Y", "X")]);
        let assets = assets(&["f1"]);
        let err = correlate(
            &players,
            &queue,
            &assets,
            AlbumPolicy::Strict,
            MissingPolicy::Abort,
        )
        .unwrap_err();
        match err {
            Error::CorrelationMiss { video_id, .. } => assert_eq!(video_id, "v2"),
            other => panic!("expected CorrelationMiss, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_keeps_numbers_dense() {
        let players = vec![player("v1", "f1"), player("v2", "f2"), player("v3", "f3")];
        let queue = index(vec![queue_entry("v1", "Y", "X"), queue_entry("v3", "Y", "X")]);
        let assets = assets(&["f1", "f2", "f3"]);
        let c = correlate(
            &players,
            &queue,
            &assets,
            AlbumPolicy::Strict,
            MissingPolicy::Skip,
        )
        .unwrap();
        let numbers: Vec<(&str, u32)> = c
            .tracks
            .iter()
            .map(|t| (t.video_id(), t.track_number))
            .collect();
        assert_eq!(numbers, vec![("v1", 1), ("v3", 2)]);
        assert_eq!(c.skipped.len(), 1);
        assert_eq!(c.skipped[0].video_id, "v2");
    }

    #[test]
    fn test_ambiguity_is_fatal_even_when_skipping() {
        let players = vec![player("v1", "f1")];
        let mut entry = queue_entry("v1", "Y", "X");
        entry.byline_runs.retain(|r| r.tag != RunTag::Artist);
        let queue = index(vec![entry]);
        let assets = assets(&["f1"]);
        let err = correlate(
            &players,
            &queue,
            &assets,
            AlbumPolicy::Strict,
            MissingPolicy::Skip,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::AmbiguousMetadata {
                source: RunError::NoArtist,
                ..
            }
        ));
    }

    #[test]
    fn test_label() {
        let players = vec![player("v1", "f1")];
        let queue = index(vec![queue_entry("v1", "Artist Y", "Album X")]);
        let assets = assets(&["f1"]);
        let c = correlate(
            &players,
            &queue,
            &assets,
            AlbumPolicy::Strict,
            MissingPolicy::Abort,
        )
        .unwrap();
        assert_eq!(c.tracks[0].label(), "Artist Y - 2020 - Album X - Song v1");
    }
}
