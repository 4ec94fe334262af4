//! End-to-end mixing with tracks decoded from real WAV files

use murmur_core::domain::{
    channel, GateSettings, MixerSettings, SampleRate, TrackLibrary, TrackSet, VolumeDecibels,
};
use murmur_infra::audio::WavDecoder;
use murmur_tests::{generate_sine_wave, write_wav, RecordingEvents};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn load(dir: &Path) -> TrackSet {
    TrackLibrary::new(dir, SampleRate::Hz48000, Arc::new(WavDecoder::new()))
        .unwrap()
        .load(&RecordingEvents::default())
        .unwrap()
}

#[test]
fn test_short_track_wraps_within_one_block() {
    let temp = TempDir::new().unwrap();
    write_wav(&temp.path().join("tick.wav"), 48000, &[0.1, 0.2, 0.3, 0.4]).unwrap();

    let (_handle, mut mixer) = channel(MixerSettings::default(), load(temp.path())).unwrap();
    let out = mixer.mix(&[0.0; 6]).to_vec();

    assert_eq!(out, vec![0.1, 0.2, 0.3, 0.4, 0.1, 0.2]);
    assert_eq!(mixer.tracks().iter().next().unwrap().cursor(), 2);
}

#[test]
fn test_empty_directory_passes_primary_through() {
    let temp = TempDir::new().unwrap();
    let primary = generate_sine_wave(440.0, 48000, 512);

    let (_handle, mut mixer) = channel(MixerSettings::default(), load(temp.path())).unwrap();

    assert_eq!(mixer.track_count(), 0);
    assert_eq!(mixer.mix(&primary), primary.as_slice());
}

#[test]
fn test_disabled_mixer_passes_primary_through() {
    let temp = TempDir::new().unwrap();
    write_wav(&temp.path().join("rain.wav"), 48000, &[0.5; 100]).unwrap();
    let settings = MixerSettings {
        enabled: false,
        ..MixerSettings::default()
    };
    let primary = generate_sine_wave(220.0, 48000, 256);

    let (handle, mut mixer) = channel(settings, load(temp.path())).unwrap();
    assert_eq!(mixer.mix(&primary), primary.as_slice());

    handle.set_enabled(true);
    assert_ne!(mixer.mix(&primary), primary.as_slice());
}

#[test]
fn test_block_boundaries_do_not_change_output() {
    let temp = TempDir::new().unwrap();
    let loop_a: Vec<f32> = (0..5).map(|i| i as f32 * 0.01).collect();
    let loop_b: Vec<f32> = (0..7).map(|i| -(i as f32) * 0.01).collect();
    write_wav(&temp.path().join("a.wav"), 48000, &loop_a).unwrap();
    write_wav(&temp.path().join("b.wav"), 48000, &loop_b).unwrap();
    let primary = generate_sine_wave(100.0, 48000, 64)
        .into_iter()
        .map(|s| s * 0.5)
        .collect::<Vec<_>>();

    let (_h1, mut whole) = channel(MixerSettings::default(), load(temp.path())).unwrap();
    let expected = whole.mix(&primary).to_vec();

    let (_h2, mut split) = channel(MixerSettings::default(), load(temp.path())).unwrap();
    let mut actual = Vec::new();
    let mut rest = primary.as_slice();
    for size in [3, 13, 1, 20, 27] {
        let (block, tail) = rest.split_at(size);
        actual.extend_from_slice(split.mix(block));
        rest = tail;
    }

    assert!(rest.is_empty());
    assert_eq!(actual, expected);
    let cursors: Vec<usize> = split.tracks().iter().map(|t| t.cursor()).collect();
    assert_eq!(cursors, vec![64 % 5, 64 % 7]);
}

#[test]
fn test_identical_loads_mix_identically() {
    let temp = TempDir::new().unwrap();
    for (name, freq) in [("wind.wav", 60.0), ("birds.wav", 2000.0), ("cafe.wav", 330.0)] {
        let samples = generate_sine_wave(freq, 48000, 997)
            .into_iter()
            .map(|s| s * 0.3)
            .collect::<Vec<_>>();
        write_wav(&temp.path().join(name), 48000, &samples).unwrap();
    }
    let primary = generate_sine_wave(440.0, 48000, 4096);

    let (_h1, mut first) = channel(MixerSettings::default(), load(temp.path())).unwrap();
    let (_h2, mut second) = channel(MixerSettings::default(), load(temp.path())).unwrap();

    for block in primary.chunks(480) {
        assert_eq!(first.mix(block), second.mix(block));
    }
}

#[test]
fn test_loud_tracks_are_clipped() {
    let temp = TempDir::new().unwrap();
    write_wav(&temp.path().join("a.wav"), 48000, &[0.9; 32]).unwrap();
    write_wav(&temp.path().join("b.wav"), 48000, &[0.9; 32]).unwrap();
    write_wav(&temp.path().join("c.wav"), 48000, &[-0.9; 16]).unwrap();
    let primary = vec![0.8f32; 128];

    let (_handle, mut mixer) = channel(MixerSettings::default(), load(temp.path())).unwrap();
    let out = mixer.mix(&primary);

    assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    assert_eq!(out[0], 1.0);
}

#[test]
fn test_master_gain_scales_every_track() {
    let temp = TempDir::new().unwrap();
    write_wav(&temp.path().join("hum.wav"), 48000, &[0.5; 10]).unwrap();

    let (handle, mut mixer) = channel(MixerSettings::default(), load(temp.path())).unwrap();
    handle.set_master_gain(VolumeDecibels::new(VolumeDecibels::MIN_GAIN));
    assert!(mixer.mix(&[0.0; 3]).iter().all(|&s| s == 0.0));

    // Silent blocks still move the loop forward
    assert_eq!(mixer.tracks().iter().next().unwrap().cursor(), 3);
    handle.set_master_gain(VolumeDecibels::unity());
    assert!(mixer.mix(&[0.0; 4]).iter().all(|&s| s == 0.5));
}

#[test]
fn test_gate_follows_primary_level() {
    let temp = TempDir::new().unwrap();
    write_wav(&temp.path().join("room.wav"), 48000, &[0.25; 480]).unwrap();
    let settings = MixerSettings {
        gate: Some(GateSettings {
            threshold_db: -20.0,
            hold_ms: 0,
        }),
        ..MixerSettings::default()
    };

    let (_handle, mut mixer) = channel(settings, load(temp.path())).unwrap();

    let quiet = vec![0.001f32; 120];
    assert_eq!(mixer.mix(&quiet), quiet.as_slice());
    assert_eq!(mixer.tracks().iter().next().unwrap().cursor(), 120);

    let speech = generate_sine_wave(200.0, 48000, 120);
    let out = mixer.mix(&speech).to_vec();
    assert!(out
        .iter()
        .zip(&speech)
        .all(|(mixed, voice)| (mixed - (voice + 0.25).clamp(-1.0, 1.0)).abs() < 1e-6));
}
