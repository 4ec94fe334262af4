//! Loading background-sound tracks from a directory
//!
//! Only immediate children with a `.wav` extension (any case) are considered.
//! A file that fails to decode is reported and skipped; a missing directory
//! yields an empty track set so the mixer degrades to pass-through.

use crate::domain::audio::{AudioDecoder, DecodeError, Result, SampleRate};
use crate::domain::mixer::TrackSettings;
use crate::domain::track::{AudioTrack, TrackId, TrackSet};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

const TRACK_EXTENSION: &str = "wav";

/// Errors from importing a file into the source directory
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid track name: {0}")]
    InvalidName(String),

    #[error("Not a .wav file: {0}")]
    NotWav(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Receives the outcome of each step of a library load
pub trait LoadEvents: Send + Sync {
    /// A file decoded successfully
    fn loaded(&self, name: &str, samples: usize);

    /// The source directory could not be read
    fn directory_missing(&self, dir: &Path, cause: &io::Error);

    /// A file was skipped because it could not be decoded
    fn failed(&self, error: &DecodeError);
}

/// Reports load events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl LoadEvents for TracingEvents {
    fn loaded(&self, name: &str, samples: usize) {
        info!(file = name, samples, "Loaded SFX file");
    }

    fn directory_missing(&self, dir: &Path, cause: &io::Error) {
        warn!(path = %dir.display(), error = %cause, "SFX directory unavailable");
    }

    fn failed(&self, error: &DecodeError) {
        error!(path = %error.path.display(), error = %error.reason, "Failed to load SFX file");
    }
}

/// Source directory of looping tracks plus how to decode them
#[derive(Clone)]
pub struct TrackLibrary {
    source_dir: PathBuf,
    sample_rate: SampleRate,
    decoder: Arc<dyn AudioDecoder>,
    settings: HashMap<String, TrackSettings>,
}

impl fmt::Debug for TrackLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackLibrary")
            .field("source_dir", &self.source_dir)
            .field("sample_rate", &self.sample_rate)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TrackLibrary {
    /// Create a library; fails when `sample_rate` is zero
    pub fn new(
        source_dir: impl Into<PathBuf>,
        sample_rate: SampleRate,
        decoder: Arc<dyn AudioDecoder>,
    ) -> Result<Self> {
        Ok(Self {
            source_dir: source_dir.into(),
            sample_rate: sample_rate.validate()?,
            decoder,
            settings: HashMap::new(),
        })
    }

    /// Per-file gain and mute settings, keyed by file name
    pub fn with_track_settings(mut self, settings: HashMap<String, TrackSettings>) -> Self {
        self.settings = settings;
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Decode every eligible file into a fresh track set
    ///
    /// Tracks are ordered by file name and start at cursor 0.
    pub fn load(&self, events: &dyn LoadEvents) -> Result<TrackSet> {
        let sample_rate = self.sample_rate.validate()?;

        let paths = match eligible_files(&self.source_dir) {
            Ok(paths) => paths,
            Err(e) => {
                events.directory_missing(&self.source_dir, &e);
                return Ok(TrackSet::empty(sample_rate));
            }
        };

        let mut tracks = Vec::with_capacity(paths.len());
        for path in paths {
            match self.load_track(&path, sample_rate) {
                Ok(track) => {
                    events.loaded(track.id().as_str(), track.len());
                    tracks.push(track);
                }
                Err(e) => events.failed(&e),
            }
        }

        debug!(
            path = %self.source_dir.display(),
            count = tracks.len(),
            "SFX library loaded"
        );
        Ok(TrackSet::new(sample_rate, tracks))
    }

    fn load_track(
        &self,
        path: &Path,
        sample_rate: SampleRate,
    ) -> std::result::Result<AudioTrack, DecodeError> {
        let name = file_name(path);
        let samples = self.decoder.decode(path, sample_rate)?;
        let track = AudioTrack::new(TrackId::new(name.clone()), samples)
            .map_err(|e| DecodeError::new(path, e))?;

        let gain = self
            .settings
            .get(&name)
            .map(TrackSettings::gain)
            .unwrap_or(1.0);

        Ok(track.with_gain(gain))
    }

    /// Names of eligible files in `dir`, sorted; empty when `dir` is missing
    pub fn list(dir: &Path) -> io::Result<Vec<String>> {
        match eligible_files(dir) {
            Ok(paths) => Ok(paths.iter().map(|p| file_name(p)).collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Copy `source` into `dir` as `name`, creating `dir` if needed
    pub fn import(
        dir: &Path,
        source: &Path,
        name: &str,
    ) -> std::result::Result<PathBuf, ImportError> {
        let as_path = Path::new(name);
        if name.is_empty() || as_path.file_name().and_then(|n| n.to_str()) != Some(name) {
            return Err(ImportError::InvalidName(name.to_string()));
        }
        if !is_eligible(as_path) {
            return Err(ImportError::NotWav(name.to_string()));
        }

        fs::create_dir_all(dir)?;
        let target = dir.join(name);
        fs::copy(source, &target)?;

        info!(path = %target.display(), "Imported SFX file");
        Ok(target)
    }
}

/// True when `path` carries a `.wav` extension in any case
pub fn is_eligible(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(TRACK_EXTENSION))
        .unwrap_or(false)
}

/// Eligible regular files directly inside `dir`, sorted by name
fn eligible_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_eligible(path))
        .collect();

    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
