//! Loading the SFX directory through the WAV decoder

use murmur_core::domain::{
    channel, ImportError, MixerSettings, MurmurConfig, SampleRate, TrackId, TrackLibrary,
};
use murmur_infra::audio::WavDecoder;
use murmur_tests::{write_corrupt, write_wav, write_wav_i16, RecordingEvents};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn library(dir: &Path) -> TrackLibrary {
    TrackLibrary::new(dir, SampleRate::Hz48000, Arc::new(WavDecoder::new())).unwrap()
}

#[test]
fn test_corrupt_file_is_skipped() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write_wav_i16(&dir.join("crowd.wav"), 2, 44100, &[8192; 882]).unwrap();
    write_wav(&dir.join("hum.wav"), 48000, &[0.1; 100]).unwrap();
    write_wav_i16(&dir.join("rain.WAV"), 1, 24000, &[-4096; 240]).unwrap();
    write_corrupt(&dir.join("broken.wav")).unwrap();
    std::fs::write(dir.join("readme.txt"), b"not audio").unwrap();

    let events = RecordingEvents::default();
    let set = library(dir).load(&events).unwrap();

    assert_eq!(set.len(), 3);
    assert_eq!(events.loaded_count(), 3);
    assert_eq!(events.failed_count(), 1);
    assert_eq!(events.failed.lock().unwrap()[0], dir.join("broken.wav"));

    let ids: Vec<_> = set.ids().iter().map(|id| id.as_str().to_string()).collect();
    assert_eq!(ids, vec!["crowd.wav", "hum.wav", "rain.WAV"]);

    // Everything arrives at the output rate
    assert_eq!(set.get(&TrackId::new("crowd.wav")).unwrap().len(), 480);
    assert_eq!(set.get(&TrackId::new("hum.wav")).unwrap().len(), 100);
    assert_eq!(set.get(&TrackId::new("rain.WAV")).unwrap().len(), 480);
    assert!(set.iter().all(|track| track.cursor() == 0));
}

#[test]
fn test_missing_directory_loads_nothing() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope");

    let events = RecordingEvents::default();
    let set = library(&missing).load(&events).unwrap();

    assert!(set.is_empty());
    assert_eq!(events.missing_count(), 1);

    let (_handle, mut mixer) = channel(MixerSettings::default(), set).unwrap();
    assert_eq!(mixer.mix(&[0.3, -0.3]), &[0.3, -0.3]);
}

#[test]
fn test_empty_wav_counts_as_failure() {
    let temp = TempDir::new().unwrap();
    write_wav(&temp.path().join("empty.wav"), 48000, &[]).unwrap();

    let events = RecordingEvents::default();
    let set = library(temp.path()).load(&events).unwrap();

    assert!(set.is_empty());
    assert_eq!(events.failed_count(), 1);
}

#[tokio::test]
async fn test_track_settings_from_config_file() {
    let temp = TempDir::new().unwrap();
    let sfx_dir = temp.path().join("sfx");
    std::fs::create_dir_all(&sfx_dir).unwrap();
    write_wav(&sfx_dir.join("birds.wav"), 48000, &[0.5; 8]).unwrap();
    write_wav(&sfx_dir.join("traffic.wav"), 48000, &[0.5; 8]).unwrap();

    let config_path = temp.path().join("config.toml");
    let toml = format!(
        r#"
[sfx]
enabled = true
output_sample_rate = 48000
source_dir = "{}"

[[sfx.tracks]]
file = "birds.wav"
gain_db = -6.0

[[sfx.tracks]]
file = "traffic.wav"
muted = true
"#,
        sfx_dir.display()
    );
    std::fs::write(&config_path, toml).unwrap();

    let config = MurmurConfig::load_from_file(&config_path).await.unwrap();
    let set = TrackLibrary::new(
        &config.sfx.source_dir,
        config.sfx.sample_rate(),
        Arc::new(WavDecoder::new()),
    )
    .unwrap()
    .with_track_settings(config.sfx.track_settings())
    .load(&RecordingEvents::default())
    .unwrap();

    let birds = set.get(&TrackId::new("birds.wav")).unwrap();
    let traffic = set.get(&TrackId::new("traffic.wav")).unwrap();
    assert!((birds.gain() - 0.501).abs() < 0.01);
    assert_eq!(traffic.gain(), 0.0);

    let (_handle, mut mixer) = channel(config.mixer_settings(), set).unwrap();
    let out = mixer.mix(&[0.0; 4]);
    assert!(out.iter().all(|&s| (s - 0.5 * birds_gain(&config)).abs() < 1e-6));
}

fn birds_gain(config: &MurmurConfig) -> f32 {
    config.sfx.track_settings()["birds.wav"].gain()
}

#[test]
fn test_import_then_list() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("recording.wav");
    write_wav(&source, 48000, &[0.2; 16]).unwrap();
    let sfx_dir = temp.path().join("sfx");

    let target = TrackLibrary::import(&sfx_dir, &source, "ambience.wav").unwrap();

    assert_eq!(target, sfx_dir.join("ambience.wav"));
    assert_eq!(TrackLibrary::list(&sfx_dir).unwrap(), vec!["ambience.wav"]);

    let set = library(&sfx_dir).load(&RecordingEvents::default()).unwrap();
    assert_eq!(set.len(), 1);
}

#[test]
fn test_import_rejects_bad_names() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("recording.wav");
    write_wav(&source, 48000, &[0.2; 16]).unwrap();
    let sfx_dir = temp.path().join("sfx");

    assert!(matches!(
        TrackLibrary::import(&sfx_dir, &source, "../escape.wav"),
        Err(ImportError::InvalidName(_))
    ));
    assert!(matches!(
        TrackLibrary::import(&sfx_dir, &source, "song.mp3"),
        Err(ImportError::NotWav(_))
    ));
    assert!(TrackLibrary::list(&sfx_dir).unwrap().is_empty());
}
