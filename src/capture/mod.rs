pub mod payload;

use crate::error::{Error, Result};
use crate::har::CaptureEntry;
use crate::metadata::QueueEntry;
use payload::{NextResponse, PlayerRecord, PlayerResponse, QueueResponse};

pub const PLAYER_PREFIX: &str = "https://music.youtube.com/youtubei/v1/player";
pub const QUEUE_PREFIX: &str = "https://music.youtube.com/youtubei/v1/music/get_queue";
pub const WATCH_NEXT_PREFIX: &str = "https://music.youtube.com/youtubei/v1/next?";
pub const STREAM_MARKER: &str = "/videoplayback?";

const JSON_MIME: &str = "application/json";
const STREAM_MIME: &str = "audio/mp4";
const ASSET_MIME: &str = "video/mp4";

// Player responses without this are ads or pre-roll checks.
const PLAYER_BODY_MARKER: &str = "\"videoDetails\"";
// Watch-next responses only carry a queue once the panel has loaded.
const WATCH_NEXT_BODY_MARKER: &str = "\"playlistPanelVideoRenderer\"";

/// A capture entry, tagged and decoded.
#[derive(Debug)]
pub enum Capture<'a> {
    Player(PlayerRecord),
    Queue(Vec<QueueEntry>),
    WatchNext(Vec<QueueEntry>),
    StreamChunk { file_id: &'a str, body: &'a str },
    Irrelevant,
}

impl Capture<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Capture::Player(_) => "player",
            Capture::Queue(_) => "queue",
            Capture::WatchNext(_) => "watch-next",
            Capture::StreamChunk { .. } => "stream chunk",
            Capture::Irrelevant => "irrelevant",
        }
    }
}

/// Tag one entry and decode its payload.
///
/// The endpoint is decided by URL alone; an entry on a known endpoint whose
/// MIME type or body marker doesn't match is irrelevant, not an error. Once
/// an entry is claimed, a body that doesn't decode is a shape mismatch.
pub fn classify(entry: &CaptureEntry) -> Result<Capture<'_>> {
    let url = entry.url();
    let mime = entry.mime_type();
    let body = entry.body();

    if url.starts_with(PLAYER_PREFIX) {
        if !mime.starts_with(JSON_MIME) || !body.contains(PLAYER_BODY_MARKER) {
            return Ok(Capture::Irrelevant);
        }
        let response: PlayerResponse = decode(url, body)?;
        let record = response
            .into_record()
            .map_err(|message| Error::shape(url, message))?;
        Ok(Capture::Player(record))
    } else if url.starts_with(QUEUE_PREFIX) {
        if !mime.starts_with(JSON_MIME) {
            return Ok(Capture::Irrelevant);
        }
        let response: QueueResponse = decode(url, body)?;
        let entries = response
            .queue_datas
            .into_iter()
            .map(|d| {
                d.content.into_renderer().ok_or_else(|| {
                    Error::shape(url, "queue item holds no playlistPanelVideoRenderer")
                })
            })
            .map(|r| r.map(|r| r.into_queue_entry()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Capture::Queue(entries))
    } else if url.starts_with(WATCH_NEXT_PREFIX) {
        if !mime.starts_with(JSON_MIME) || !body.contains(WATCH_NEXT_BODY_MARKER) {
            return Ok(Capture::Irrelevant);
        }
        let response: NextResponse = decode(url, body)?;
        let entries = response
            .into_renderers()
            .into_iter()
            .map(|r| r.into_queue_entry())
            .collect();
        Ok(Capture::WatchNext(entries))
    } else if url.contains(STREAM_MARKER) {
        if mime != STREAM_MIME {
            return Ok(Capture::Irrelevant);
        }
        let file_id = entry
            .query_param("id")
            .ok_or_else(|| Error::shape(url, "stream request has no id parameter"))?;
        Ok(Capture::StreamChunk { file_id, body })
    } else {
        Ok(Capture::Irrelevant)
    }
}

/// Body of a chunk of a directly served asset, e.g. `clip.mp4` in
/// `https://cdn.example/v/clip.mp4?bytestart=0`.
pub fn asset_chunk<'a>(entry: &'a CaptureEntry, asset: &str) -> Option<&'a str> {
    let needle = format!("/{asset}?");
    (entry.url().contains(&needle) && entry.mime_type() == ASSET_MIME).then(|| entry.body())
}

fn decode<T: serde::de::DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::shape(url, e.to_string()))
}
