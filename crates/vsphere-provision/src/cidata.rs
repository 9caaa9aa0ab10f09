//! Local generation of cloud-init NoCloud ISOs.
//!
//! The ISO carries `user-data` verbatim and a two-line `meta-data` naming the
//! instance, under the `cidata` volume label cloud-init looks for. Images are
//! authored by `genisoimage`, or `mkisofs` when that is all the host has.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use crate::report;
use crate::{Error, Result};

const USER_DATA_FILE: &str = "user-data";
const META_DATA_FILE: &str = "meta-data";
const VOLUME_ID: &str = "cidata";

/// Render the NoCloud `meta-data` payload for an instance.
pub fn render_metadata(name: &str) -> String {
    format!("instance-id: {name}\n\tlocal-hostname: {name}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IsoTool {
    Genisoimage,
    Mkisofs,
}

impl IsoTool {
    /// In order of preference.
    const ALL: [IsoTool; 2] = [IsoTool::Genisoimage, IsoTool::Mkisofs];

    fn command(&self) -> &'static str {
        match self {
            Self::Genisoimage => "genisoimage",
            Self::Mkisofs => "mkisofs",
        }
    }

    fn args(&self, output: &Path, input: &Path) -> Vec<OsString> {
        let flags: &[&str] = match self {
            Self::Genisoimage => &["-volid", VOLUME_ID, "-joliet", "-rock"],
            Self::Mkisofs => &["-V", VOLUME_ID, "-J", "-R"],
        };

        let mut args = vec![OsString::from("-o"), output.as_os_str().to_owned()];
        args.extend(flags.iter().map(OsString::from));
        args.push(input.as_os_str().to_owned());
        args
    }
}

/// Builds userdata ISOs under a local working directory.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    work_dir: PathBuf,
    search_path: Option<OsString>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl ImageBuilder {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            search_path: None,
        }
    }

    /// Look for the ISO tools in `path` instead of `$PATH`.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Where the image for `name` is written.
    pub fn iso_path(&self, name: &str) -> PathBuf {
        self.work_dir.join(format!("{name}.iso"))
    }

    fn resolve_tool(&self) -> Option<(IsoTool, PathBuf)> {
        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));

        IsoTool::ALL.into_iter().find_map(|tool| {
            which::which_in(tool.command(), search_path.as_ref(), &self.work_dir)
                .ok()
                .map(|program| (tool, program))
        })
    }

    /// Generate the userdata ISO for instance `name`.
    ///
    /// The payload files are staged in a scratch directory that is removed
    /// before this returns, whatever the outcome. The returned image is
    /// deleted when dropped unless [`GeneratedImage::keep`] is called.
    pub async fn build(&self, userdata: &str, name: &str) -> Result<GeneratedImage> {
        let (tool, program) = self
            .resolve_tool()
            .ok_or_else(|| Error::ToolingUnavailable { vm: name.into() })?;

        let scratch = ScratchDir::create(&self.work_dir, name)?;

        write_payload(&scratch.path().join(USER_DATA_FILE), userdata.as_bytes()).await?;
        write_payload(
            &scratch.path().join(META_DATA_FILE),
            render_metadata(name).as_bytes(),
        )
        .await?;

        let image = GeneratedImage::new(self.iso_path(name));
        let args = tool.args(image.path(), scratch.path());
        let command_line = format!(
            "{} {}",
            tool.command(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        debug!(vm = name, command = %command_line, "generating userdata iso");
        let output = Command::new(&program)
            .args(&args)
            .output()
            .await
            .map_err(|source| Error::ToolSpawn {
                command: command_line.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(Error::ToolExecutionFailure {
                command: command_line,
                status: output.status,
                output: combined,
            });
        }

        Ok(image)
    }
}

async fn write_payload(path: &Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| Error::WriteFailure {
            path: path.to_path_buf(),
            source,
        })
}

/// A directory owned by one `build` call, removed on drop.
struct ScratchDir {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl ScratchDir {
    fn create(parent: &Path, name: &str) -> Result<Self> {
        let prefix = format!("{name}-");
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(parent)
            .map_err(|source| Error::WriteFailure {
                path: parent.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if let Err(source) = dir.close() {
            report::handle_error(&Error::Cleanup {
                path: self.path.clone(),
                source,
            });
        }
    }
}

/// A locally generated ISO, deleted on drop unless kept.
#[derive(Debug)]
pub struct GeneratedImage {
    path: PathBuf,
    keep: bool,
}

impl GeneratedImage {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leave the file in place and hand its path to the caller.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for GeneratedImage {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => report::handle_error(&Error::Cleanup {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
