// Integration tests for file-backed replay
//
// WAV fixtures are generated into a temporary directory with hound.

mod common;

use anyhow::Result;
use common::*;
use loqa_stream::{
    create_source, AudioFile, AudioFrameSource, CaptureError, Pacing, ReplaySource, SourceConfig,
    SourceKind,
};
use tempfile::TempDir;

#[test]
fn test_audio_file_open() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("meeting.wav");
    write_wav(&path, SAMPLE_RATE, 1.25, 0.5)?;

    let audio = AudioFile::open(&path)?;
    assert_eq!(audio.sample_rate, SAMPLE_RATE);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 20000);
    assert!((audio.duration_seconds - 1.25).abs() < 1e-9);
    assert!((audio.samples[0] - 0.5).abs() < 0.001);
    assert!(audio.path.contains("meeting.wav"));
    Ok(())
}

#[test]
fn test_audio_file_keeps_first_channel() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("stereo.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for _ in 0..100 {
        writer.write_sample(16384i16)?;
        writer.write_sample(-16384i16)?;
    }
    writer.finalize()?;

    let audio = AudioFile::open(&path)?;
    assert_eq!(audio.channels, 2);
    assert_eq!(audio.samples.len(), 100);
    assert!(audio.samples.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    Ok(())
}

#[test]
fn test_audio_file_reads_float_wav() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("float.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for _ in 0..10 {
        writer.write_sample(-0.25f32)?;
    }
    writer.finalize()?;

    let audio = AudioFile::open(&path)?;
    assert_eq!(audio.samples, vec![-0.25; 10]);
    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let result = AudioFile::open("/nonexistent/path/to/audio.wav");
    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[tokio::test]
async fn test_replay_from_file_pads_last_frame() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("meeting.wav");
    write_wav(&path, SAMPLE_RATE, 1.25, 0.5)?;

    let mut source = ReplaySource::from_file(&path, SourceConfig::default(), Pacing::Batch)?;
    assert_eq!(source.frame_count(), 3);
    assert!(source.name().contains("meeting.wav"));

    source.start().await?;
    let mut frames = Vec::new();
    while let Some(frame) = source.next_frame().await? {
        frames.push(frame);
    }

    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.len() == FRAME_SIZE));
    assert_eq!(frames[0].padding, 0);
    assert_eq!(frames[2].padding, 4000);
    assert_eq!(frames[2].content().len(), 4000);
    Ok(())
}

#[test]
fn test_replay_rejects_sample_rate_mismatch() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("44k.wav");
    write_wav(&path, 44100, 0.1, 0.5)?;

    let result = ReplaySource::from_file(&path, SourceConfig::default(), Pacing::Batch);
    let error = result.err().unwrap();
    assert!(matches!(
        error.downcast_ref::<CaptureError>(),
        Some(CaptureError::UnsupportedFormat { .. })
    ));
    assert!(error.to_string().contains("44100Hz"));
    Ok(())
}

#[test]
fn test_replay_rejects_empty_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("empty.wav");
    write_wav(&path, SAMPLE_RATE, 0.0, 0.0)?;

    let result = ReplaySource::from_file(&path, SourceConfig::default(), Pacing::Batch);
    assert!(matches!(
        result.err().unwrap().downcast_ref::<CaptureError>(),
        Some(CaptureError::Replay { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_create_source_for_replay() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("meeting.wav");
    write_wav(&path, SAMPLE_RATE, 0.5, 0.1)?;

    let kind = SourceKind::Replay {
        path,
        pacing: Pacing::Batch,
    };
    let mut source = create_source(kind, SourceConfig::default())?;
    assert!(!source.is_capturing());

    source.start().await?;
    assert!(source.is_capturing());
    assert!(source.next_frame().await?.is_some());
    assert!(source.next_frame().await?.is_none());

    source.stop().await?;
    assert!(!source.is_capturing());
    Ok(())
}

#[test]
fn test_create_source_missing_file() {
    let kind = SourceKind::Replay {
        path: "/nonexistent/meeting.wav".into(),
        pacing: Pacing::Realtime,
    };
    assert!(create_source(kind, SourceConfig::default()).is_err());
}
