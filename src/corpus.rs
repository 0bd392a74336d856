//! Local cache of the Khronos reference page sources.
//!
//! The DocBook sources for every API version live in the upstream
//! OpenGL-Refpages repository, one subdirectory per subset (`gl4`,
//! `es3.1`, ...). They are cloned once into a per-user cache directory
//! and read from there on every run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use directories::ProjectDirs;
use thiserror::Error;

/// Upstream repository holding the DocBook sources.
pub const REFPAGES_REPO: &str = "https://github.com/KhronosGroup/OpenGL-Refpages.git";

/// Errors that can occur while preparing the local source checkout.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("could not determine a cache directory for this platform")]
    NoCacheDir,
    #[error("git is not available on PATH")]
    GitNotAvailable,
    #[error("git clone exited unsuccessfully ({0})")]
    CloneFailed(std::process::ExitStatus),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Target OpenGL API family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    /// Desktop OpenGL.
    Gl,
    /// OpenGL ES.
    Gles,
}

impl std::str::FromStr for Api {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gl" => Ok(Api::Gl),
            "gles" => Ok(Api::Gles),
            _ => Err(format!("unknown API: {}", s)),
        }
    }
}

impl std::fmt::Display for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Api::Gl => write!(f, "gl"),
            Api::Gles => write!(f, "gles"),
        }
    }
}

/// Default on-disk location for the cloned sources.
pub fn cache_dir() -> Result<PathBuf, CorpusError> {
    ProjectDirs::from("", "", "glref")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .ok_or(CorpusError::NoCacheDir)
}

/// Subset directories documenting an API at a given version, newest
/// first, so that lookups across them prefer the most recent pages.
///
/// A version of 0 means any/latest and selects every subset for the
/// API. Each older subset is included alongside the newer ones because
/// the upstream pages are not copied forward between releases.
pub fn dir_names(api: Api, version: f32) -> Vec<&'static str> {
    let any = version == 0.0;
    let mut names = Vec::new();
    match api {
        Api::Gles => {
            if any || version > 3.1 {
                names.push("es3");
            }
            if any || version > 3.0 {
                names.push("es3.1");
            }
            if any || version > 2.0 {
                names.push("es3.0");
            }
            if any || version > 1.0 {
                names.push("es2.0");
            }
            names.push("es1.0");
        }
        Api::Gl => {
            if any || version > 2.1 {
                names.push("gl4");
            }
            names.push("gl2.1");
        }
    }
    names
}

/// Make sure the reference page sources exist at `dir`, cloning them on
/// first use. Returns true when a fresh clone was made.
///
/// TODO: refresh an existing checkout instead of assuming it is current.
pub fn ensure_refpages(dir: &Path) -> Result<bool, CorpusError> {
    if dir.join(".git").join("HEAD").exists() {
        return Ok(false);
    }

    ensure_git_available()?;
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)?;
    }

    // Stream git's own progress output straight to the console.
    let status = Command::new("git")
        .args(["clone", "--depth", "1", REFPAGES_REPO])
        .arg(dir)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;
    if !status.success() {
        return Err(CorpusError::CloneFailed(status));
    }
    Ok(true)
}

/// Check that git can be spawned at all, to tell "no git" apart from a
/// clone that failed.
fn ensure_git_available() -> Result<(), CorpusError> {
    Command::new("git")
        .arg("--version")
        .output()
        .map_err(|_| CorpusError::GitNotAvailable)?;
    Ok(())
}
