pub mod ffmpeg;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::correlate::CorrelatedTrack;
use crate::error::Result;
use crate::reassembly::StreamAsset;
use ffmpeg::Remuxer;

/// Tags written into every rebuilt file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    pub album: String,
    pub artists: Vec<String>,
    pub year: i32,
    pub title: String,
    pub track_number: u32,
}

impl TagSet {
    /// `key=value` pairs in the order ffmpeg receives them.
    pub fn metadata_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("album", self.album.clone()),
            ("artist", self.artists.join("; ")),
            ("date", self.year.to_string()),
            ("title", self.title.clone()),
            ("track", self.track_number.to_string()),
        ]
    }
}

/// Everything needed to write one track.
#[derive(Debug)]
pub struct OutputSpec<'a> {
    pub path: PathBuf,
    pub content: &'a [u8],
    pub tags: TagSet,
}

impl OutputSpec<'_> {
    /// `2020 - Song.m4a` becomes `2020 - Song (<video id>).m4a`.
    pub fn add_suffix(&mut self, video_id: &str) {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = sanitize_component(video_id);
        let name = match self.path.extension() {
            Some(ext) => format!("{stem} ({suffix}).{}", ext.to_string_lossy()),
            None => format!("{stem} ({suffix})"),
        };
        self.path.set_file_name(name);
    }
}

// Separators plus characters Windows and most mounts reject.
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap());

/// Make an artist or title usable as a single path component.
pub fn sanitize_component(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name, "_");
    let trimmed = replaced.trim().trim_end_matches('.').trim_end();
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Writes correlated tracks under an output root through a [`Remuxer`].
pub struct Materializer<R> {
    root: PathBuf,
    extension: String,
    remuxer: R,
}

impl<R: Remuxer> Materializer<R> {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>, remuxer: R) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            remuxer,
        }
    }

    pub fn remuxer(&self) -> &R {
        &self.remuxer
    }

    /// `<root>/<primary artist>/<year> - <title>.<ext>` plus tags.
    pub fn output_spec<'a>(&self, track: &CorrelatedTrack<'a>) -> OutputSpec<'a> {
        let meta = &track.metadata;
        let file_name = format!(
            "{} - {}.{}",
            meta.year,
            sanitize_component(&meta.title),
            self.extension
        );
        let path = self
            .root
            .join(sanitize_component(meta.primary_artist().unwrap_or_default()))
            .join(file_name);
        OutputSpec {
            path,
            content: track.asset.bytes(),
            tags: TagSet {
                album: meta.album.clone(),
                artists: meta.artists.clone(),
                year: meta.year,
                title: meta.title.clone(),
                track_number: track.track_number,
            },
        }
    }

    /// Write one track. Returns the destination path.
    pub fn materialize(&self, track: &CorrelatedTrack<'_>) -> Result<PathBuf> {
        self.write_spec(&self.output_spec(track))
    }

    /// Write a prepared spec, possibly with an adjusted path.
    pub fn write_spec(&self, spec: &OutputSpec<'_>) -> Result<PathBuf> {
        self.write(spec.content, &spec.tags.metadata_pairs(), &spec.path)?;
        Ok(spec.path.clone())
    }

    /// Write a bare asset as `<root>/<name>`, without tags.
    pub fn materialize_asset(&self, asset: &StreamAsset, name: &str) -> Result<PathBuf> {
        let path = self.root.join(sanitize_component(name));
        self.write(asset.bytes(), &[], &path)?;
        Ok(path)
    }

    fn write(&self, content: &[u8], metadata: &[(&'static str, String)], dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Removed on drop, whichever way the remux goes.
        let mut tmp = tempfile::Builder::new()
            .prefix("harmux-")
            .suffix(".tmp")
            .tempfile()?;
        tmp.write_all(content)?;
        tmp.flush()?;
        log::debug!(
            "{} bytes staged in {}",
            content.len(),
            tmp.path().display()
        );

        self.remuxer.remux(tmp.path(), metadata, dest)
    }
}
