use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// What a text run links to. The API marks album and artist names only by
/// the page type of their navigation link; everything else is plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTag {
    Album,
    Artist,
    /// Linked to some other page (channels, radios). Ignored.
    Other,
    /// No link at all: separators and the release year.
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub tag: RunTag,
}

impl TextRun {
    pub fn new(text: impl Into<String>, tag: RunTag) -> Self {
        Self {
            text: text.into(),
            tag,
        }
    }
}

/// How album-tagged runs reduce to one album name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlbumPolicy {
    /// Exactly one album run, anything else is ambiguous.
    #[default]
    Strict,
    /// The last album run wins.
    LastRun,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("no album run")]
    NoAlbum,
    #[error("{} album runs: {}", .0.len(), .0.join(", "))]
    MultipleAlbums(Vec<String>),
    #[error("no artist run")]
    NoArtist,
    #[error("no run holds a release year")]
    NoYear,
    #[error("expected one title run, found {0}")]
    TitleRuns(usize),
}

/// Album, artists and year decoded from a byline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Byline {
    pub album: String,
    /// Never empty. The first entry is the primary artist.
    pub artists: Vec<String>,
    pub year: i32,
}

// Leading decimal digits, like a lenient integer parse.
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d+)").unwrap());

/// Year signal of a plain run. `None` for non-numeric text and zero.
pub fn parse_year(text: &str) -> Option<i32> {
    let caps = YEAR_RE.captures(text)?;
    caps[1].parse::<i32>().ok().filter(|y| *y != 0)
}

/// Turn a byline's runs into album, artists and year.
///
/// Album runs give the album (reduced per `policy`), artist runs append in
/// order, plain runs are tried as the year. A plain run that doesn't parse
/// leaves any earlier year in place.
pub fn classify_runs(runs: &[TextRun], policy: AlbumPolicy) -> Result<Byline, RunError> {
    let mut albums: Vec<&str> = Vec::new();
    let mut artists: Vec<String> = Vec::new();
    let mut year: Option<i32> = None;

    for run in runs {
        match run.tag {
            RunTag::Album => albums.push(&run.text),
            RunTag::Artist => artists.push(run.text.clone()),
            RunTag::Plain => {
                if let Some(y) = parse_year(&run.text) {
                    year = Some(y);
                }
            }
            RunTag::Other => {}
        }
    }

    let album = match (policy, albums.as_slice()) {
        (_, []) => return Err(RunError::NoAlbum),
        (AlbumPolicy::Strict, [only]) => only.to_string(),
        (AlbumPolicy::Strict, many) => {
            return Err(RunError::MultipleAlbums(
                many.iter().map(|s| s.to_string()).collect(),
            ));
        }
        (AlbumPolicy::LastRun, [.., last]) => last.to_string(),
    };

    if artists.is_empty() {
        return Err(RunError::NoArtist);
    }
    let year = year.ok_or(RunError::NoYear)?;

    Ok(Byline {
        album,
        artists,
        year,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical() -> Vec<TextRun> {
        vec![
            TextRun::new("Artist Y", RunTag::Artist),
            TextRun::new(" & ", RunTag::Plain),
            TextRun::new("Artist Z", RunTag::Artist),
            TextRun::new(" • ", RunTag::Plain),
            TextRun::new("Album X", RunTag::Album),
            TextRun::new(" • ", RunTag::Plain),
            TextRun::new("2020", RunTag::Plain),
        ]
    }

    #[test]
    fn test_canonical_byline() {
        let b = classify_runs(&canonical(), AlbumPolicy::Strict).unwrap();
        assert_eq!(b.album, "Album X");
        assert_eq!(b.artists, vec!["Artist Y", "Artist Z"]);
        assert_eq!(b.year, 2020);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let runs = canonical();
        let first = classify_runs(&runs, AlbumPolicy::Strict).unwrap();
        let second = classify_runs(&runs, AlbumPolicy::Strict).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_trailing_separator_keeps_year() {
        let mut runs = canonical();
        runs.push(TextRun::new(" • ", RunTag::Plain));
        assert_eq!(classify_runs(&runs, AlbumPolicy::Strict).unwrap().year, 2020);
    }

    #[test]
    fn test_no_artist_is_ambiguous() {
        let runs = vec![
            TextRun::new("Album X", RunTag::Album),
            TextRun::new("2020", RunTag::Plain),
        ];
        assert_eq!(
            classify_runs(&runs, AlbumPolicy::Strict),
            Err(RunError::NoArtist)
        );
        assert_eq!(
            classify_runs(&runs, AlbumPolicy::LastRun),
            Err(RunError::NoArtist)
        );
    }

    #[test]
    fn test_no_year_is_ambiguous() {
        let runs = vec![
            TextRun::new("Artist Y", RunTag::Artist),
            TextRun::new("Album X", RunTag::Album),
            TextRun::new("Single", RunTag::Plain),
        ];
        assert_eq!(
            classify_runs(&runs, AlbumPolicy::Strict),
            Err(RunError::NoYear)
        );
    }

    #[test]
    fn test_two_albums_strict_vs_last_run() {
        let runs = vec![
            TextRun::new("Album X", RunTag::Album),
            TextRun::new("Artist Y", RunTag::Artist),
            TextRun::new("Album W", RunTag::Album),
            TextRun::new("1999", RunTag::Plain),
        ];
        assert_eq!(
            classify_runs(&runs, AlbumPolicy::Strict),
            Err(RunError::MultipleAlbums(vec![
                "Album X".into(),
                "Album W".into()
            ]))
        );
        assert_eq!(
            classify_runs(&runs, AlbumPolicy::LastRun).unwrap().album,
            "Album W"
        );
    }

    #[test]
    fn test_no_album() {
        let runs = vec![
            TextRun::new("Artist Y", RunTag::Artist),
            TextRun::new("2001", RunTag::Plain),
        ];
        assert_eq!(classify_runs(&runs, AlbumPolicy::LastRun), Err(RunError::NoAlbum));
    }

    #[test]
    fn test_other_links_are_ignored() {
        let runs = vec![
            TextRun::new("Artist Y", RunTag::Artist),
            TextRun::new("1984", RunTag::Other),
            TextRun::new("Album X", RunTag::Album),
            TextRun::new("1985", RunTag::Plain),
        ];
        let b = classify_runs(&runs, AlbumPolicy::Strict).unwrap();
        assert_eq!(b.artists, vec!["Artist Y"]);
        assert_eq!(b.year, 1985);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2020"), Some(2020));
        assert_eq!(parse_year("  1977 "), Some(1977));
        assert_eq!(parse_year("2004 (Remaster)"), Some(2004));
        assert_eq!(parse_year(" • "), None);
        assert_eq!(parse_year("0"), None);
        assert_eq!(parse_year("Vol. 2"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn test_error_messages() {
        let e = RunError::MultipleAlbums(vec!["A".into(), "B".into()]);
        assert_eq!(e.to_string(), "2 album runs: A, B");
    }
}
