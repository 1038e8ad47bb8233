use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// The external step that turns raw reassembled bytes into a tagged file.
pub trait Remuxer {
    /// Copy the streams of `input` into `dest`, setting each `key=value`
    /// metadata pair. Must block until the output is complete.
    fn remux(&self, input: &Path, metadata: &[(&'static str, String)], dest: &Path) -> Result<()>;
}

/// Lossless stream copy through an ffmpeg binary.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full argument list for one invocation.
    pub fn args(input: &Path, metadata: &[(&'static str, String)], dest: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());
        args.push("-c".into());
        args.push("copy".into());
        for (key, value) in metadata {
            args.push("-metadata".into());
            args.push(format!("{key}={value}").into());
        }
        for a in ["-movflags", "+faststart", "-y"] {
            args.push(a.into());
        }
        args.push(dest.as_os_str().to_owned());
        args
    }
}

impl Remuxer for Ffmpeg {
    fn remux(&self, input: &Path, metadata: &[(&'static str, String)], dest: &Path) -> Result<()> {
        let tool = self.program.display().to_string();
        log::debug!("{tool}: {} -> {}", input.display(), dest.display());

        let output = match Command::new(&self.program)
            .args(Self::args(input, metadata, dest))
            .output()
        {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ExternalToolFailure {
                    tool,
                    dest: dest.to_path_buf(),
                    status: "not started".into(),
                    stderr: "program not found".into(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "killed by signal".into());
            return Err(Error::ExternalToolFailure {
                tool,
                dest: dest.to_path_buf(),
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
