use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Destination for finished audio artifacts (chunks and full-session files)
pub trait PersistenceSink: Send {
    /// Write mono 16-bit samples to `path`
    fn write(&mut self, samples: &[i16], sample_rate: u32, path: &Path) -> Result<()>;
}

/// Writes 16-bit PCM mono WAV files with hound
#[derive(Debug, Default, Clone)]
pub struct WavSink;

impl WavSink {
    pub fn new() -> Self {
        Self
    }
}

impl PersistenceSink for WavSink {
    fn write(&mut self, samples: &[i16], sample_rate: u32, path: &Path) -> Result<()> {
        // Create output directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV file")?;

        debug!("Wrote {} samples to {}", samples.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_wav_sink_creates_nested_directory() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("output").join("a.wav");

        WavSink::new().write(&[0, 100, -100, i16::MAX], 16000, &path)?;

        let reader = hound::WavReader::open(&path)?;
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.into_samples::<i16>().collect::<Result<_, _>>()?;
        assert_eq!(samples, vec![0, 100, -100, i16::MAX]);
        Ok(())
    }

    #[test]
    fn test_wav_sink_reports_unwritable_path() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let blocker = temp_dir.path().join("file");
        fs::write(&blocker, b"not a directory")?;

        let result = WavSink::new().write(&[0; 16], 16000, &blocker.join("a.wav"));
        assert!(result.is_err());
        Ok(())
    }
}
