use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::capture::payload::PlayerRecord;
use crate::capture::{self, Capture};
use crate::correlate::{self, MissingPolicy, Skipped};
use crate::error::{Error, Result};
use crate::har::{self, CaptureEntry};
use crate::metadata::QueueEntry;
use crate::metadata::runs::AlbumPolicy;
use crate::output::Materializer;
use crate::output::ffmpeg::Remuxer;
use crate::reassembly::{Reassembler, StreamAsset};

/// Everything gathered from the archives of one run.
#[derive(Debug, Default)]
pub struct PipelineState {
    chunks: Reassembler,
    players: Vec<PlayerRecord>,
    player_slots: HashMap<String, usize>,
    queue: HashMap<String, QueueEntry>,
    pub entries_seen: usize,
    pub entries_ignored: usize,
}

impl PipelineState {
    /// Classify one entry and file it in the right index.
    pub fn ingest(&mut self, entry: &CaptureEntry) -> Result<()> {
        self.entries_seen += 1;
        let capture = capture::classify(entry)?;
        log::trace!("{} <- {}", capture.kind(), entry.url());

        match capture {
            Capture::Player(record) => self.insert_player(record),
            Capture::Queue(items) | Capture::WatchNext(items) => {
                for item in items {
                    self.queue.insert(item.video_id.clone(), item);
                }
            }
            Capture::StreamChunk { file_id, body } => self.chunks.push(file_id, body)?,
            Capture::Irrelevant => self.entries_ignored += 1,
        }
        Ok(())
    }

    pub fn ingest_archive(&mut self, path: &Path) -> Result<()> {
        for entry in &har::load(path)? {
            self.ingest(entry)?;
        }
        Ok(())
    }

    // Last write wins, but the track keeps its first position.
    fn insert_player(&mut self, record: PlayerRecord) {
        match self.player_slots.get(&record.video_id) {
            Some(&slot) => {
                log::debug!("Player record for {} seen again", record.video_id);
                self.players[slot] = record;
            }
            None => {
                self.player_slots
                    .insert(record.video_id.clone(), self.players.len());
                self.players.push(record);
            }
        }
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn chunks(&self) -> &Reassembler {
        &self.chunks
    }
}

/// Read every archive, in order, into a fresh state.
pub fn index(archives: &[PathBuf]) -> Result<PipelineState> {
    let mut state = PipelineState::default();
    for path in archives {
        state.ingest_archive(path)?;
    }
    log::info!(
        "Indexed {} entries: {} players, {} queue items, {} files",
        state.entries_seen,
        state.players.len(),
        state.queue.len(),
        state.chunks.len()
    );
    Ok(state)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RebuildOptions {
    pub album_policy: AlbumPolicy,
    pub missing: MissingPolicy,
    pub dry_run: bool,
}

/// One correlated track as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOutcome {
    pub video_id: String,
    pub label: String,
    pub track_number: u32,
    /// Written file, or where it would go on a dry run.
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct RebuildResult {
    pub archives: usize,
    pub tracks: Vec<TrackOutcome>,
    pub skipped: Vec<Skipped>,
}

/// Run the whole rebuild: index, correlate, then write each track in turn.
pub fn rebuild<R: Remuxer>(
    archives: &[PathBuf],
    materializer: &Materializer<R>,
    options: RebuildOptions,
) -> Result<RebuildResult> {
    let state = index(archives)?;
    let PipelineState {
        chunks,
        players,
        queue,
        ..
    } = state;
    let assets = chunks.finish();

    let correlation = correlate::correlate(
        &players,
        &queue,
        &assets,
        options.album_policy,
        options.missing,
    )?;

    let mut result = RebuildResult {
        archives: archives.len(),
        tracks: Vec::with_capacity(correlation.tracks.len()),
        skipped: correlation.skipped,
    };

    let pb = if options.dry_run {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(correlation.tracks.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb
    };

    let mut destinations = HashSet::new();
    for track in &correlation.tracks {
        let mut spec = materializer.output_spec(track);
        if !destinations.insert(spec.path.clone()) {
            let taken = spec.path.display().to_string();
            spec.add_suffix(track.video_id());
            log::warn!(
                "{} already written this run, {} goes to {}",
                taken,
                track.video_id(),
                spec.path.display()
            );
            destinations.insert(spec.path.clone());
        }

        let path = if options.dry_run {
            spec.path
        } else {
            pb.set_message(track.metadata.title.clone());
            let path = materializer.write_spec(&spec)?;
            pb.inc(1);
            path
        };
        result.tracks.push(TrackOutcome {
            video_id: track.video_id().to_string(),
            label: track.label(),
            track_number: track.track_number,
            path,
        });
    }

    pb.finish_with_message(format!("{} tracks", result.tracks.len()));
    Ok(result)
}

/// Reassemble a single directly served asset (matched by file name in its
/// URL) across all archives.
pub fn collect_asset(archives: &[PathBuf], asset: &str) -> Result<StreamAsset> {
    let mut chunks = Reassembler::default();
    for path in archives {
        for entry in &har::load(path)? {
            if let Some(body) = capture::asset_chunk(entry, asset) {
                chunks.push(asset, body)?;
            }
        }
    }
    chunks
        .finish()
        .remove(asset)
        .ok_or_else(|| Error::NoChunks(asset.to_string()))
}

/// Reassemble one asset and remux it to `<root>/<asset>`.
pub fn extract<R: Remuxer>(
    archives: &[PathBuf],
    asset: &str,
    materializer: &Materializer<R>,
) -> Result<PathBuf> {
    let bytes = collect_asset(archives, asset)?;
    log::info!("{asset}: {} chunks, {} bytes", bytes.chunks(), bytes.len());
    materializer.materialize_asset(&bytes, asset)
}
