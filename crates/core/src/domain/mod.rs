//! Domain entities and business rules

pub mod audio;
pub mod config;
pub mod library;
pub mod mixer;
pub mod track;
pub mod watch;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{AudioDecoder, AudioError, DecodeError, SampleRate};
pub use config::{ConfigError, ConfigManager, GateConfig, MurmurConfig, SfxConfig, TrackConfig};
pub use library::{ImportError, LoadEvents, TrackLibrary, TracingEvents};
pub use mixer::{
    channel, GateSettings, MixerHandle, MixerSettings, SfxMixer, TrackSettings, VolumeDecibels,
};
pub use track::{AudioTrack, TrackId, TrackSet};
pub use watch::DirectoryWatcher;
