use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// HAR document (partial: we only need the entries).
#[derive(Debug, Deserialize)]
pub struct Har {
    pub log: HarLog,
}

#[derive(Debug, Deserialize)]
pub struct HarLog {
    #[serde(default)]
    pub entries: Vec<CaptureEntry>,
}

/// One logged request/response pair.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureEntry {
    pub request: Request,
    pub response: Response,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub url: String,
    #[serde(default)]
    pub query_string: Vec<QueryParam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub content: Content,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub mime_type: String,
    /// Absent for empty bodies in most HAR writers.
    #[serde(default)]
    pub text: String,
}

impl CaptureEntry {
    pub fn url(&self) -> &str {
        &self.request.url
    }

    pub fn mime_type(&self) -> &str {
        &self.response.content.mime_type
    }

    pub fn body(&self) -> &str {
        &self.response.content.text
    }

    /// First value of a request query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.request
            .query_string
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

/// Read and parse one archive. Any parse failure is fatal for the run.
pub fn load(path: &Path) -> Result<Vec<CaptureEntry>> {
    let contents = std::fs::read(path)?;
    let har: Har = serde_json::from_slice(&contents).map_err(|source| Error::MalformedInput {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Loaded {} ({} entries)",
        path.display(),
        har.log.entries.len()
    );
    Ok(har.log.entries)
}

/// Expand CLI arguments into archive paths.
///
/// Files are kept in the order given. A directory contributes every `*.har`
/// file beneath it, sorted by path so runs are reproducible.
pub fn expand_paths(args: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for arg in args {
        if arg.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(arg)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| {
                    p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("har"))
                })
                .collect();
            found.sort();
            log::debug!("{}: {} archives", arg.display(), found.len());
            out.extend(found);
        } else {
            out.push(arg.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_deserialize() {
        let json = r#"{
            "request": {
                "url": "https://rr1.example/videoplayback?id=abc",
                "queryString": [{"name": "id", "value": "abc"}],
                "method": "GET"
            },
            "response": {"content": {"mimeType": "audio/mp4", "text": "AA==", "size": 1}}
        }"#;
        let e: CaptureEntry = serde_json::from_str(json).unwrap();
        assert_eq!(e.query_param("id"), Some("abc"));
        assert_eq!(e.query_param("itag"), None);
        assert_eq!(e.mime_type(), "audio/mp4");
        assert_eq!(e.body(), "AA==");
    }

    #[test]
    fn test_missing_text_is_empty() {
        let json = r#"{
            "request": {"url": "https://example.com/"},
            "response": {"content": {"mimeType": "text/html"}}
        }"#;
        let e: CaptureEntry = serde_json::from_str(json).unwrap();
        assert_eq!(e.body(), "");
        assert!(e.request.query_string.is_empty());
    }

    #[test]
    fn test_load_malformed_archive() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.har");
        std::fs::write(&path, "{\"log\": ").unwrap();
        match load(&path) {
            Err(Error::MalformedInput { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected MalformedInput, got {other:?}"),
        }
    }

    #[test]
    fn test_load_invalid_utf8_is_malformed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("binary.har");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        match load(&path) {
            Err(Error::MalformedInput { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected MalformedInput, got {other:?}"),
        }
    }

    #[test]
    fn test_expand_paths_sorts_directory_contents() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["b.har", "a.har", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let explicit = PathBuf::from("z.har");
        let paths = expand_paths(&[explicit.clone(), dir.path().to_path_buf()]);
        assert_eq!(
            paths,
            vec![explicit, dir.path().join("a.har"), dir.path().join("b.har")]
        );
    }
}
