//! Typed views of the music API's JSON payloads.
//!
//! Only the fields the rebuild needs are modeled. Decoding either produces a
//! complete value or a serde error, which the classifier reports as a shape
//! mismatch.

use std::borrow::Cow;

use serde::Deserialize;

use crate::metadata::QueueEntry;
use crate::metadata::runs::{RunTag, TextRun};

const PAGE_TYPE_ALBUM: &str = "MUSIC_PAGE_TYPE_ALBUM";
const PAGE_TYPE_ARTIST: &str = "MUSIC_PAGE_TYPE_ARTIST";

// ---------------------------------------------------------------------------
// player
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayerResponse {
    pub video_details: VideoDetails,
    pub streaming_data: StreamingData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoDetails {
    pub video_id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamingData {
    #[serde(default)]
    pub formats: Vec<StreamFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StreamFormat {
    pub signature_cipher: Option<String>,
    pub url: Option<String>,
}

/// Where a player record says its audio lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamReference {
    /// Form-encoded `s=..&sp=..&url=..` blob; the real URL is inside.
    SignatureCipher(String),
    Url(String),
}

impl StreamReference {
    fn from_format(format: &StreamFormat) -> Option<Self> {
        // The cipher form wins when a format carries both.
        match (&format.signature_cipher, &format.url) {
            (Some(cipher), _) => Some(Self::SignatureCipher(cipher.clone())),
            (None, Some(url)) => Some(Self::Url(url.clone())),
            (None, None) => None,
        }
    }

    /// The `id` query parameter of the stream URL. Chunks are grouped by it.
    pub fn file_id(&self) -> Option<String> {
        let url = match self {
            Self::SignatureCipher(cipher) => Cow::Owned(form_value(cipher, "url")?),
            Self::Url(url) => Cow::Borrowed(url.as_str()),
        };
        let query = url.split_once('?')?.1;
        let query = query.split('#').next().unwrap_or(query);
        form_value(query, "id")
    }
}

/// Per-video record from a player response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub video_id: String,
    pub author: String,
    pub title: String,
    pub stream: StreamReference,
}

impl PlayerResponse {
    pub(crate) fn into_record(self) -> Result<PlayerRecord, String> {
        let first = self
            .streaming_data
            .formats
            .first()
            .ok_or_else(|| "streamingData.formats is empty".to_string())?;
        let stream = StreamReference::from_format(first)
            .ok_or_else(|| "first format has neither signatureCipher nor url".to_string())?;
        Ok(PlayerRecord {
            video_id: self.video_details.video_id,
            author: self.video_details.author,
            title: self.video_details.title,
            stream,
        })
    }
}

// ---------------------------------------------------------------------------
// queue / watch-next
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueueResponse {
    pub queue_datas: Vec<QueueData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueData {
    pub content: RendererSlot,
}

/// A list item that holds a video renderer either directly or wrapped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RendererSlot {
    playlist_panel_video_renderer: Option<VideoRenderer>,
    playlist_panel_video_wrapper_renderer: Option<WrapperRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WrapperRenderer {
    primary_renderer: PrimaryRenderer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrimaryRenderer {
    playlist_panel_video_renderer: VideoRenderer,
}

impl RendererSlot {
    pub fn into_renderer(self) -> Option<VideoRenderer> {
        self.playlist_panel_video_renderer.or_else(|| {
            self.playlist_panel_video_wrapper_renderer
                .map(|w| w.primary_renderer.playlist_panel_video_renderer)
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoRenderer {
    pub video_id: String,
    #[serde(default)]
    pub title: RunList,
    #[serde(default)]
    pub long_byline_text: RunList,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RunList {
    #[serde(default)]
    pub runs: Vec<Run>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Run {
    pub text: String,
    pub navigation_endpoint: Option<NavigationEndpoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NavigationEndpoint {
    browse_endpoint: Option<BrowseEndpoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowseEndpoint {
    browse_endpoint_context_supported_configs: Option<BrowseConfigs>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowseConfigs {
    browse_endpoint_context_music_config: MusicConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MusicConfig {
    page_type: String,
}

impl Run {
    fn tag(&self) -> RunTag {
        let Some(endpoint) = &self.navigation_endpoint else {
            return RunTag::Plain;
        };
        let page_type = endpoint
            .browse_endpoint
            .as_ref()
            .and_then(|b| b.browse_endpoint_context_supported_configs.as_ref())
            .map(|c| c.browse_endpoint_context_music_config.page_type.as_str());
        match page_type {
            Some(PAGE_TYPE_ALBUM) => RunTag::Album,
            Some(PAGE_TYPE_ARTIST) => RunTag::Artist,
            _ => RunTag::Other,
        }
    }
}

impl RunList {
    fn into_text_runs(self) -> Vec<TextRun> {
        self.runs
            .into_iter()
            .map(|r| {
                let tag = r.tag();
                TextRun { text: r.text, tag }
            })
            .collect()
    }
}

impl VideoRenderer {
    pub fn into_queue_entry(self) -> QueueEntry {
        QueueEntry {
            video_id: self.video_id,
            title_runs: self.title.into_text_runs(),
            byline_runs: self.long_byline_text.into_text_runs(),
        }
    }
}

/// `/next` response. Only the queue panel inside the tabs matters.
#[derive(Debug, Deserialize)]
pub(crate) struct NextResponse {
    contents: Option<NextContents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextContents {
    single_column_music_watch_next_results_renderer: SingleColumnRenderer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SingleColumnRenderer {
    tabbed_renderer: TabbedRenderer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabbedRenderer {
    watch_next_tabbed_results_renderer: Option<WatchNextTabs>,
}

#[derive(Debug, Deserialize)]
struct WatchNextTabs {
    #[serde(default)]
    tabs: Vec<Tab>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tab {
    tab_renderer: TabRenderer,
}

#[derive(Debug, Deserialize)]
struct TabRenderer {
    content: Option<TabContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabContent {
    music_queue_renderer: Option<MusicQueueRenderer>,
}

#[derive(Debug, Deserialize)]
struct MusicQueueRenderer {
    content: Option<MusicQueueContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MusicQueueContent {
    playlist_panel_renderer: Option<PlaylistPanelRenderer>,
}

#[derive(Debug, Deserialize)]
struct PlaylistPanelRenderer {
    #[serde(default)]
    contents: Vec<RendererSlot>,
}

impl NextResponse {
    /// Every video renderer in the queue panel. Items of other kinds (automix
    /// previews and such) are dropped.
    pub fn into_renderers(self) -> Vec<VideoRenderer> {
        let tabs = self
            .contents
            .and_then(|c| {
                c.single_column_music_watch_next_results_renderer
                    .tabbed_renderer
                    .watch_next_tabbed_results_renderer
            })
            .map(|t| t.tabs)
            .unwrap_or_default();

        tabs.into_iter()
            .filter_map(|tab| tab.tab_renderer.content)
            .filter_map(|c| c.music_queue_renderer)
            .filter_map(|q| q.content)
            .filter_map(|c| c.playlist_panel_renderer)
            .flat_map(|p| p.contents)
            .filter_map(RendererSlot::into_renderer)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// query strings
// ---------------------------------------------------------------------------

/// First value for `key` in an `a=1&b=2` string, form-decoded.
pub(crate) fn form_value(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(k, _)| form_decode(k).as_deref() == Some(key))
        .and_then(|(_, v)| form_decode(v))
}

fn form_decode(s: &str) -> Option<String> {
    let spaced = s.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(Cow::into_owned)
}
