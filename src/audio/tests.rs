use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::error::Error;
use crate::library::{Codec, Track};

use super::*;

fn write_wav(path: &Path, channels: u16, rate: u32, frames: usize, value: i16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..frames * usize::from(channels) {
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
}

fn track(path: PathBuf) -> Track {
    let title = path.file_stem().unwrap().to_string_lossy().into_owned();
    Track {
        codec: Codec::from_path(&path),
        path,
        title,
        duration: None,
    }
}

fn options(mode: PlayMode, repeat: bool) -> EngineOptions {
    EngineOptions {
        mode,
        repeat,
        seed: Some(7),
        chunk_size: 256,
        ..EngineOptions::default()
    }
}

fn engine_with(dir: &Path, tracks: Vec<Track>, options: EngineOptions, program: &str) -> crate::error::Result<Engine> {
    let scratch = Arc::new(ScratchDir::open(dir.join("temp")).unwrap());
    let normalizer = Normalizer::new(program, options.layout, scratch.clone());
    Engine::new(tracks, options, normalizer, GainAnalyzer::default(), scratch)
}

/// Stereo 44.1 kHz fixtures, `frames` long each, filled with the given constant.
fn library(dir: &Path, specs: &[(&str, usize, i16)]) -> Vec<Track> {
    specs
        .iter()
        .map(|&(name, frames, value)| {
            let path = dir.join(name);
            write_wav(&path, 2, TARGET_SAMPLE_RATE, frames, value);
            track(path)
        })
        .collect()
}

fn pull(producer: &mut Producer, frames: usize) -> (usize, Vec<i16>) {
    let mut out = vec![-1; frames * 2];
    let n = producer.produce_interleaved(&mut out).unwrap();
    (n, out)
}

fn current_index(engine: &Engine) -> Option<usize> {
    engine.lock().open.as_ref().map(OpenTrack::index)
}

fn scratch_files(dir: &Path) -> usize {
    fs::read_dir(dir.join("temp")).unwrap().count()
}

#[test]
fn produce_fills_exact_length_across_track_boundary() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 1000, 1000), ("b.wav", 1000, 3000)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, false), "ffmpeg").unwrap());
    let mut producer = Producer::new(engine.clone());

    // Peak 1000 and 3000 both hit the gain ceiling of 2.0.
    let (n, out) = pull(&mut producer, 1500);
    assert_eq!(n, 1500);
    assert!(out[..2000].iter().all(|&s| s == 2000));
    assert!(out[2000..].iter().all(|&s| s == 6000));
    assert_eq!(current_index(&engine), Some(1));

    let (n, out) = pull(&mut producer, 1500);
    assert_eq!(n, 500);
    assert!(out[..1000].iter().all(|&s| s == 6000));
    assert!(out[1000..].iter().all(|&s| s == 0));
    assert!(engine.lock().is_drained());
}

#[test]
fn exhausted_single_track_keeps_yielding_silence() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("only.wav", 300, 500)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, false), "ffmpeg").unwrap());
    let mut producer = Producer::new(engine.clone());

    let (n, _) = pull(&mut producer, 400);
    assert_eq!(n, 300);
    for _ in 0..3 {
        let (n, out) = pull(&mut producer, 128);
        assert_eq!(n, 0);
        assert!(out.iter().all(|&s| s == 0));
    }
    let status = Controller::new(engine).status();
    assert!(status.drained);
    assert_eq!(status.state_label(), "Stopped");
}

#[test]
fn sequential_repeat_wraps_to_first_track() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 100, 1000), ("b.wav", 100, 3000)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, true), "ffmpeg").unwrap());
    let mut producer = Producer::new(engine.clone());

    let (n, out) = pull(&mut producer, 250);
    assert_eq!(n, 250);
    assert!(out[400..500].iter().all(|&s| s == 2000));
    assert_eq!(current_index(&engine), Some(0));
}

#[test]
fn repeat_one_replays_current_track() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 100, 1000), ("b.wav", 100, 3000)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::RepeatOne, false), "ffmpeg").unwrap());
    let mut producer = Producer::new(engine.clone());

    let (n, out) = pull(&mut producer, 350);
    assert_eq!(n, 350);
    assert!(out.iter().all(|&s| s == 2000));
    assert_eq!(current_index(&engine), Some(0));
}

#[test]
fn paused_engine_emits_silence_without_consuming() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 1000, 1000)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, false), "ffmpeg").unwrap());
    let controller = Controller::new(engine.clone());
    let mut producer = Producer::new(engine.clone());

    assert!(controller.toggle_pause());
    let (n, out) = pull(&mut producer, 200);
    assert_eq!(n, 200);
    assert!(out.iter().all(|&s| s == 0));
    assert_eq!(engine.lock().open.as_ref().unwrap().cursor(), WAV_HEADER_LEN);
    assert!(controller.describe().ends_with("Paused"));

    assert!(!controller.toggle_pause());
    let (_, out) = pull(&mut producer, 200);
    assert!(out.iter().all(|&s| s == 2000));
}

#[test]
fn mono_stream_fills_both_channels_of_a_stereo_block() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mono.wav");
    write_wav(&path, 1, TARGET_SAMPLE_RATE, 64, 1200);
    let options = EngineOptions {
        layout: ChannelLayout::Mono,
        ..options(PlayMode::Sequential, false)
    };
    let engine = Arc::new(engine_with(dir.path(), vec![track(path)], options, "ffmpeg").unwrap());
    let mut producer = Producer::new(engine);

    let mut left = vec![0i16; 32];
    let mut right = vec![0i16; 32];
    let n = producer
        .pull(FrameBlock::Stereo {
            left: &mut left,
            right: &mut right,
        })
        .unwrap();
    assert_eq!(n, 32);
    assert_eq!(left, right);
    assert!(left.iter().all(|&s| s == 2400));
}

#[test]
fn backward_seek_clamps_at_header() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 1000, 1000)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, false), "ffmpeg").unwrap());
    let controller = Controller::new(engine.clone());
    let mut producer = Producer::new(engine.clone());

    pull(&mut producer, 441);
    controller.update_position_at(Instant::now() + Duration::from_secs(20));
    controller.seek_backward(10.0);
    controller.update_position_at(Instant::now());

    let shared = engine.lock();
    assert_eq!(shared.open.as_ref().unwrap().cursor(), WAV_HEADER_LEN);
    assert_eq!(shared.playback.pending_seek_seconds, 0.0);
}

#[test]
fn forward_seek_is_frame_aligned_and_clamped_to_end() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 1000, 1000), ("b.wav", 100, 3000)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, false), "ffmpeg").unwrap());
    let controller = Controller::new(engine.clone());
    let mut producer = Producer::new(engine.clone());

    controller.seek_by(0.0001);
    controller.update_position();
    let cursor = engine.lock().open.as_ref().unwrap().cursor();
    assert_eq!((cursor - WAV_HEADER_LEN) % 4, 0);

    controller.seek_by(100.0);
    controller.update_position();
    assert_eq!(engine.lock().open.as_ref().unwrap().cursor(), WAV_HEADER_LEN + 4000);

    let (n, out) = pull(&mut producer, 50);
    assert_eq!(n, 50);
    assert!(out.iter().all(|&s| s == 6000));
}

#[test]
fn backward_seek_floor_uses_current_elapsed() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 1000, 1000)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, false), "ffmpeg").unwrap());
    let controller = Controller::new(engine.clone());

    // Five seconds of playback that no position update has accounted for yet.
    let earlier = Instant::now().checked_sub(Duration::from_secs(5)).unwrap();
    engine.lock().playback.last_update = earlier;

    controller.seek_backward(10.0);
    let shared = engine.lock();
    assert!(shared.playback.elapsed_seconds >= 5.0);
    assert_eq!(shared.playback.pending_seek_seconds, -shared.playback.elapsed_seconds);
}

#[test]
fn pause_freezes_elapsed_time() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 1000, 1000)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, false), "ffmpeg").unwrap());
    let controller = Controller::new(engine.clone());

    let start = Instant::now();
    controller.update_position_at(start + Duration::from_secs(2));
    assert!(controller.toggle_pause());
    let frozen = engine.lock().playback.elapsed_seconds;
    assert!(frozen >= 2.0);

    controller.update_position_at(start + Duration::from_secs(7));
    assert_eq!(engine.lock().playback.elapsed_seconds, frozen);
    assert_eq!(controller.status().elapsed, Duration::from_secs_f64(frozen));
}

#[test]
fn seek_never_queues_before_track_start() {
    let mut state = PlaybackState::new(Instant::now());
    state.elapsed_seconds = 4.0;
    state.queue_seek(-10.0);
    assert_eq!(state.pending_seek_seconds, -4.0);
}

#[test]
fn previous_restarts_track_after_threshold() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 1000, 1), ("b.wav", 1000, 2), ("c.wav", 1000, 3)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, true), "ffmpeg").unwrap());
    let controller = Controller::new(engine.clone());
    let mut producer = Producer::new(engine.clone());

    controller.next_track().unwrap();
    assert_eq!(current_index(&engine), Some(1));
    pull(&mut producer, 100);
    controller.update_position_at(Instant::now() + Duration::from_secs(5));

    controller.previous_track().unwrap();
    let shared = engine.lock();
    assert_eq!(shared.open.as_ref().map(OpenTrack::index), Some(1));
    assert_eq!(shared.open.as_ref().unwrap().cursor(), WAV_HEADER_LEN);
    assert_eq!(shared.playback.elapsed_seconds, 0.0);
}

#[test]
fn previous_within_threshold_steps_back_and_wraps() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 1000, 1), ("b.wav", 1000, 2), ("c.wav", 1000, 3)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, true), "ffmpeg").unwrap());
    let controller = Controller::new(engine.clone());

    controller.next_track().unwrap();
    controller.previous_track().unwrap();
    assert_eq!(current_index(&engine), Some(0));
    controller.previous_track().unwrap();
    assert_eq!(current_index(&engine), Some(2));
}

#[test]
fn next_in_repeat_one_moves_on() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 100, 1), ("b.wav", 100, 2)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::RepeatOne, true), "ffmpeg").unwrap());
    let controller = Controller::new(engine.clone());

    controller.next_track().unwrap();
    assert_eq!(current_index(&engine), Some(1));
}

#[test]
fn next_revives_a_drained_playlist() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 10, 1000)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, false), "ffmpeg").unwrap());
    let controller = Controller::new(engine.clone());
    let mut producer = Producer::new(engine.clone());

    pull(&mut producer, 20);
    assert!(controller.status().drained);
    controller.next_track().unwrap();
    assert_eq!(current_index(&engine), Some(0));
    let (n, _) = pull(&mut producer, 5);
    assert_eq!(n, 5);
}

#[test]
fn mode_controls_update_status() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 100, 1), ("b.wav", 100, 2)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, true), "ffmpeg").unwrap());
    let controller = Controller::new(engine);

    assert_eq!(controller.cycle_mode(), PlayMode::Shuffle);
    assert_eq!(controller.status().mode, PlayMode::Shuffle);
    controller.set_mode(PlayMode::RepeatOne);
    assert_eq!(controller.status().mode, PlayMode::RepeatOne);
    assert!(!controller.toggle_repeat());
    controller.set_repeat(true);
    assert!(controller.status().repeat);
}

#[test]
fn describe_renders_file_position_mode_and_state() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("intro.wav", 100, 1)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, true), "ffmpeg").unwrap());
    let controller = Controller::new(engine);

    controller.update_position_at(Instant::now() + Duration::from_secs(65));
    assert_eq!(controller.describe(), "intro.wav [01:05] Sequential Playing");
}

#[test]
fn empty_track_under_repeat_yields_silence_instead_of_spinning() {
    for (mode, repeat) in [(PlayMode::Sequential, true), (PlayMode::RepeatOne, false)] {
        let dir = TempDir::new().unwrap();
        let tracks = library(dir.path(), &[("empty.wav", 0, 0)]);
        let engine = Arc::new(engine_with(dir.path(), tracks, options(mode, repeat), "ffmpeg").unwrap());
        let controller = Controller::new(engine.clone());
        let mut producer = Producer::new(engine.clone());

        for _ in 0..3 {
            let (n, out) = pull(&mut producer, 64);
            assert_eq!(n, 64);
            assert!(out.iter().all(|&s| s == 0));
        }
        // The lock is free again.
        assert!(controller.toggle_pause());
        assert!(!controller.status().drained);
    }
}

#[test]
fn all_empty_playlist_gives_up_after_one_cycle() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 0, 0), ("b.wav", 0, 0), ("c.wav", 0, 0)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Shuffle, true), "ffmpeg").unwrap());
    let mut producer = Producer::new(engine.clone());

    let (n, out) = pull(&mut producer, 128);
    assert_eq!(n, 128);
    assert!(out.iter().all(|&s| s == 0));
}

#[test]
fn empty_track_is_skipped_when_others_have_audio() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 50, 1000), ("b.wav", 0, 0), ("c.wav", 50, 3000)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, true), "ffmpeg").unwrap());
    let mut producer = Producer::new(engine.clone());

    let (n, out) = pull(&mut producer, 150);
    assert_eq!(n, 150);
    assert!(out[..100].iter().all(|&s| s == 2000));
    assert!(out[100..200].iter().all(|&s| s == 6000));
    assert!(out[200..].iter().all(|&s| s == 2000));
}

#[test]
fn stop_is_idempotent_and_silences_output() {
    let dir = TempDir::new().unwrap();
    let tracks = library(dir.path(), &[("a.wav", 1000, 1000)]);
    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, true), "ffmpeg").unwrap());
    let mut producer = Producer::new(engine.clone());

    engine.stop();
    engine.stop();
    assert!(!engine.is_running());
    let (n, out) = pull(&mut producer, 64);
    assert_eq!(n, 0);
    assert!(out.iter().all(|&s| s == 0));
}

#[test]
fn gain_targets_headroom_and_is_capped() {
    let analyzer = GainAnalyzer::default();
    assert_eq!(analyzer.gain_for_peak(0), 1.0);
    assert_eq!(analyzer.gain_for_peak(100), 2.0);
    let loud = analyzer.gain_for_peak(32767);
    assert!((loud - 0.98).abs() < 1e-9);
}

#[test]
fn configured_gain_cap_cannot_exceed_ceiling() {
    let analyzer = GainAnalyzer::new(0.98, 5.0);
    assert_eq!(analyzer.gain_for_peak(100), GAIN_CEILING);
    assert_eq!(GainAnalyzer::new(0.98, 1.5).gain_for_peak(100), 1.5);
}

#[test]
fn peak_scan_uses_absolute_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("neg.wav");
    write_wav(&path, 2, TARGET_SAMPLE_RATE, 10, -20000);
    assert_eq!(scan_peak(&path).unwrap(), 20000);

    let silent = dir.path().join("silent.wav");
    write_wav(&silent, 1, TARGET_SAMPLE_RATE, 10, 0);
    assert_eq!(GainAnalyzer::default().analyze(&silent), 1.0);
}

#[test]
fn unreadable_file_is_treated_as_full_scale() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("junk.wav");
    fs::write(&path, b"not a wav").unwrap();
    assert!(matches!(scan_peak(&path), Err(Error::ProbeFailed { .. })));
    let gain = GainAnalyzer::default().analyze(&path);
    assert!((gain - 0.98).abs() < 1e-9);
}

#[test]
fn conversion_needed_unless_canonical_wav() {
    let dir = TempDir::new().unwrap();
    let scratch = Arc::new(ScratchDir::open(dir.path().join("temp")).unwrap());
    let stereo = Normalizer::new("ffmpeg", ChannelLayout::Stereo, scratch.clone());
    let mono = Normalizer::new("ffmpeg", ChannelLayout::Mono, scratch);

    let canonical = dir.path().join("ok.wav");
    write_wav(&canonical, 2, 44_100, 10, 1);
    let resampled = dir.path().join("hi.wav");
    write_wav(&resampled, 2, 48_000, 10, 1);
    let compressed = dir.path().join("song.mp3");
    fs::write(&compressed, b"ID3").unwrap();

    assert!(!stereo.needs_conversion(&track(canonical.clone())));
    assert!(mono.needs_conversion(&track(canonical.clone())));
    assert!(stereo.needs_conversion(&track(resampled)));
    assert!(stereo.needs_conversion(&track(compressed)));

    match stereo.resolve(&track(canonical.clone())).unwrap() {
        Resolved::Direct(path) => assert_eq!(path, canonical),
        Resolved::Transcoded(_) => panic!("canonical file was transcoded"),
    }
}

#[test]
fn transcoder_arguments_force_stream_format() {
    let dir = TempDir::new().unwrap();
    let scratch = Arc::new(ScratchDir::open(dir.path().join("temp")).unwrap());
    let normalizer = Normalizer::new("ffmpeg", ChannelLayout::Mono, scratch);
    let args: Vec<String> = normalizer
        .arguments(Path::new("in.mp3"), Path::new("out.wav"))
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let after = |flag: &str| {
        let pos = args.iter().position(|a| a == flag).unwrap();
        args[pos + 1].clone()
    };
    assert_eq!(after("-i"), "in.mp3");
    assert_eq!(after("-ar"), "44100");
    assert_eq!(after("-ac"), "1");
    assert_eq!(after("-c:a"), "pcm_s16le");
    assert_eq!(args.last().map(String::as_str), Some("out.wav"));
}

#[test]
fn failed_first_transcode_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("song.mp3");
    fs::write(&path, b"ID3").unwrap();

    let result = engine_with(dir.path(), vec![track(path)], options(PlayMode::Sequential, true), "false");
    assert!(matches!(result, Err(Error::TranscodeFailed { .. })));
    assert_eq!(scratch_files(dir.path()), 0);
}

#[test]
fn failed_transcode_mid_stream_halts_engine() {
    let dir = TempDir::new().unwrap();
    let mut tracks = library(dir.path(), &[("a.wav", 100, 1000)]);
    let mp3 = dir.path().join("b.mp3");
    fs::write(&mp3, b"ID3").unwrap();
    tracks.push(track(mp3));

    let engine = Arc::new(engine_with(dir.path(), tracks, options(PlayMode::Sequential, true), "false").unwrap());
    let controller = Controller::new(engine.clone());
    let mut producer = Producer::new(engine.clone());

    let mut out = vec![0i16; 400];
    let err = producer.produce_interleaved(&mut out).unwrap_err();
    assert!(matches!(err, Error::TranscodeFailed { .. }));
    assert!(out[200..].iter().all(|&s| s == 0));
    assert!(!engine.is_running());

    let status = controller.status();
    assert!(status.error.is_some());
    assert!(status.drained);
    let (n, _) = pull(&mut producer, 10);
    assert_eq!(n, 0);
}

#[cfg(unix)]
fn fake_transcoder(dir: &Path, fixture: &Path) -> PathBuf {
    slow_transcoder(dir, fixture, 0)
}

/// Shell stand-in for ffmpeg: waits `delay_secs`, then copies `fixture` to the last argument.
#[cfg(unix)]
fn slow_transcoder(dir: &Path, fixture: &Path, delay_secs: u32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-ffmpeg");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\nsleep {delay_secs}\nfor out in \"$@\"; do :; done\ncp '{}' \"$out\"\n",
            fixture.display()
        ),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[cfg(unix)]
#[test]
fn transcoded_track_is_spliced_and_its_artifact_removed() {
    let dir = TempDir::new().unwrap();
    let fixtures = dir.path().join("fixtures");
    fs::create_dir(&fixtures).unwrap();
    let decoded = fixtures.join("decoded.wav");
    write_wav(&decoded, 2, TARGET_SAMPLE_RATE, 200, 3000);
    let program = fake_transcoder(&fixtures, &decoded);

    let music = dir.path().join("music");
    fs::create_dir(&music).unwrap();
    let mut tracks = library(&music, &[("A.wav", 100, 1000)]);
    let mp3 = music.join("B.mp3");
    fs::write(&mp3, b"ID3").unwrap();
    tracks.push(track(mp3));

    let engine = Arc::new(
        engine_with(dir.path(), tracks, options(PlayMode::Sequential, false), &program.to_string_lossy()).unwrap(),
    );
    let mut producer = Producer::new(engine.clone());

    let (n, out) = pull(&mut producer, 150);
    assert_eq!(n, 150);
    assert!(out[..200].iter().all(|&s| s == 2000));
    assert!(out[200..].iter().all(|&s| s == 6000));
    assert!(engine.lock().open.as_ref().unwrap().is_transcoded());
    assert_eq!(scratch_files(dir.path()), 1);

    let (n, _) = pull(&mut producer, 500);
    assert_eq!(n, 150);
    assert_eq!(scratch_files(dir.path()), 0);
}

#[cfg(unix)]
#[test]
fn transcoded_artifact_is_removed_when_playlist_wraps() {
    let dir = TempDir::new().unwrap();
    let fixtures = dir.path().join("fixtures");
    fs::create_dir(&fixtures).unwrap();
    let decoded = fixtures.join("decoded.wav");
    write_wav(&decoded, 2, TARGET_SAMPLE_RATE, 200, 3000);
    let program = fake_transcoder(&fixtures, &decoded);

    let music = dir.path().join("music");
    fs::create_dir(&music).unwrap();
    let mut tracks = library(&music, &[("A.wav", 100, 1000)]);
    let mp3 = music.join("B.mp3");
    fs::write(&mp3, b"ID3").unwrap();
    tracks.push(track(mp3));

    let engine = Arc::new(
        engine_with(dir.path(), tracks, options(PlayMode::Sequential, true), &program.to_string_lossy()).unwrap(),
    );
    let mut producer = Producer::new(engine.clone());

    let (_, out) = pull(&mut producer, 150);
    assert!(out[200..].iter().all(|&s| s == 6000));
    assert_eq!(scratch_files(dir.path()), 1);

    // 150 frames left of B, then back to A.
    let (n, out) = pull(&mut producer, 200);
    assert_eq!(n, 200);
    assert!(out[..300].iter().all(|&s| s == 6000));
    assert!(out[300..].iter().all(|&s| s == 2000));
    assert_eq!(current_index(&engine), Some(0));
    assert_eq!(scratch_files(dir.path()), 0);
}

#[cfg(unix)]
#[test]
fn track_change_during_slow_load_supersedes_it() {
    use std::thread;

    let dir = TempDir::new().unwrap();
    let fixtures = dir.path().join("fixtures");
    fs::create_dir(&fixtures).unwrap();
    let decoded = fixtures.join("decoded.wav");
    write_wav(&decoded, 2, TARGET_SAMPLE_RATE, 200, 5000);
    let program = slow_transcoder(&fixtures, &decoded, 1);

    let music = dir.path().join("music");
    fs::create_dir(&music).unwrap();
    let mut tracks = library(&music, &[("A.wav", 100, 1000)]);
    let mp3 = music.join("B.mp3");
    fs::write(&mp3, b"ID3").unwrap();
    tracks.push(track(mp3));
    let c = music.join("C.wav");
    write_wav(&c, 2, TARGET_SAMPLE_RATE, 100, 3000);
    tracks.push(track(c));

    let engine = Arc::new(
        engine_with(dir.path(), tracks, options(PlayMode::Sequential, false), &program.to_string_lossy()).unwrap(),
    );
    let controller = Controller::new(engine.clone());

    let puller = {
        let engine = engine.clone();
        thread::spawn(move || {
            let mut producer = Producer::new(engine);
            pull(&mut producer, 150)
        })
    };

    // Wait until the pull has released the lock to transcode B.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        {
            let shared = engine.lock();
            if shared.open.is_none() && shared.playlist.current() == Some(1) {
                break;
            }
        }
        assert!(Instant::now() < deadline, "pull never started loading B");
        thread::sleep(Duration::from_millis(5));
    }

    // Controller calls are served while the load is in flight.
    assert_eq!(controller.status().index, Some(1));
    controller.next_track().unwrap();
    assert_eq!(current_index(&engine), Some(2));

    let (n, out) = puller.join().unwrap();
    assert_eq!(n, 150);
    assert!(out[..200].iter().all(|&s| s == 2000));
    assert!(out[200..].iter().all(|&s| s == 6000));
    assert_eq!(current_index(&engine), Some(2));
    assert_eq!(scratch_files(dir.path()), 0);
}
