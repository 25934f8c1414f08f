use std::time::{Duration, Instant};

use crate::error::VadError;
use crate::vad::VoiceActivity;

/// Result of classifying one VAD window
#[derive(Debug)]
pub enum Classification {
    Speech,
    Silence,
    /// The classifier failed; the window is treated as speech so no audio is dropped
    FailedOpen(VadError),
}

impl Classification {
    pub fn is_speech(&self) -> bool {
        !matches!(self, Classification::Silence)
    }
}

/// Classify a window against `threshold` (speech iff probability > threshold)
pub fn classify(
    vad: &mut dyn VoiceActivity,
    window: &[f32],
    sample_rate: u32,
    threshold: f32,
) -> Classification {
    match vad.speech_probability(window, sample_rate) {
        Ok(p) if p.is_nan() => Classification::FailedOpen(VadError::Inference {
            message: "classifier returned NaN".to_string(),
        }),
        Ok(p) if p > threshold => Classification::Speech,
        Ok(_) => Classification::Silence,
        Err(e) => Classification::FailedOpen(e),
    }
}

/// Debounced silence tracking
///
/// The silence timer only starts after `required` silence classifications
/// in a row; any speech clears both the counter and the timer.
#[derive(Debug, Clone)]
pub struct VoiceActivityTracker {
    required: u32,
    consecutive_silence: u32,
    silence_since: Option<Instant>,
}

impl VoiceActivityTracker {
    pub fn new(required: u32) -> Self {
        Self {
            required: required.max(1),
            consecutive_silence: 0,
            silence_since: None,
        }
    }

    pub fn observe(&mut self, is_speech: bool, now: Instant) {
        if is_speech {
            self.consecutive_silence = 0;
            self.silence_since = None;
            return;
        }

        self.consecutive_silence = self.consecutive_silence.saturating_add(1);
        if self.consecutive_silence >= self.required && self.silence_since.is_none() {
            self.silence_since = Some(now);
        }
    }

    /// How long the silence timer has been running, if it is
    pub fn silence_elapsed(&self, now: Instant) -> Option<Duration> {
        self.silence_since
            .map(|since| now.saturating_duration_since(since))
    }

    pub fn consecutive_silence(&self) -> u32 {
        self.consecutive_silence
    }

    pub fn silence_since(&self) -> Option<Instant> {
        self.silence_since
    }

    pub fn reset(&mut self) {
        self.consecutive_silence = 0;
        self.silence_since = None;
    }
}

/// Pure chunk-boundary rules
#[derive(Debug, Clone, Copy)]
pub struct BoundaryPolicy {
    pub silence_threshold: Duration,
    pub min_chunk_duration: Duration,
    pub max_chunk_duration: Duration,
}

impl BoundaryPolicy {
    /// Hard ceiling, independent of voice activity
    pub fn max_duration_reached(&self, chunk_elapsed: Duration) -> bool {
        chunk_elapsed >= self.max_chunk_duration
    }

    /// Silence boundary: enough silence AND a long enough chunk
    pub fn silence_flush_due(&self, chunk_elapsed: Duration, silence_elapsed: Option<Duration>) -> bool {
        match silence_elapsed {
            Some(silence) => {
                silence >= self.silence_threshold && chunk_elapsed >= self.min_chunk_duration
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedVad(Result<f32, ()>);

    impl VoiceActivity for FixedVad {
        fn speech_probability(&mut self, _window: &[f32], _rate: u32) -> Result<f32, VadError> {
            self.0.map_err(|_| VadError::Inference {
                message: "boom".to_string(),
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn policy() -> BoundaryPolicy {
        BoundaryPolicy {
            silence_threshold: Duration::from_secs(1),
            min_chunk_duration: Duration::from_secs(3),
            max_chunk_duration: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_classify_threshold_is_exclusive() {
        assert!(matches!(classify(&mut FixedVad(Ok(0.9)), &[], 16000, 0.5), Classification::Speech));
        assert!(matches!(classify(&mut FixedVad(Ok(0.5)), &[], 16000, 0.5), Classification::Silence));
        assert!(matches!(classify(&mut FixedVad(Ok(0.1)), &[], 16000, 0.5), Classification::Silence));
    }

    #[test]
    fn test_classify_fails_open() {
        let result = classify(&mut FixedVad(Err(())), &[], 16000, 0.5);
        assert!(result.is_speech());
        assert!(matches!(result, Classification::FailedOpen(_)));

        let nan = classify(&mut FixedVad(Ok(f32::NAN)), &[], 16000, 0.5);
        assert!(nan.is_speech());
    }

    #[test]
    fn test_timer_starts_after_required_silence() {
        let t0 = Instant::now();
        let mut tracker = VoiceActivityTracker::new(2);

        tracker.observe(false, t0);
        assert_eq!(tracker.consecutive_silence(), 1);
        assert!(tracker.silence_since().is_none());

        let t1 = t0 + Duration::from_millis(500);
        tracker.observe(false, t1);
        assert_eq!(tracker.consecutive_silence(), 2);
        assert_eq!(tracker.silence_since(), Some(t1));

        // Further silence keeps the original start
        tracker.observe(false, t1 + Duration::from_secs(1));
        assert_eq!(tracker.silence_since(), Some(t1));
    }

    #[test]
    fn test_speech_resets_counter_and_timer() {
        let t0 = Instant::now();
        let mut tracker = VoiceActivityTracker::new(3);

        tracker.observe(false, t0);
        tracker.observe(false, t0);
        tracker.observe(true, t0);

        assert_eq!(tracker.consecutive_silence(), 0);
        assert!(tracker.silence_since().is_none());
        assert!(tracker.silence_elapsed(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_max_duration_is_inclusive() {
        assert!(!policy().max_duration_reached(Duration::from_millis(9999)));
        assert!(policy().max_duration_reached(Duration::from_secs(10)));
        assert!(policy().max_duration_reached(Duration::from_secs(12)));
    }

    #[test]
    fn test_min_duration_defers_silence_flush() {
        let silence = Some(Duration::from_secs(2));
        assert!(!policy().silence_flush_due(Duration::from_secs(2), silence));
        assert!(policy().silence_flush_due(Duration::from_secs(3), silence));
    }

    #[test]
    fn test_silence_flush_needs_running_timer() {
        assert!(!policy().silence_flush_due(Duration::from_secs(5), None));
        assert!(!policy().silence_flush_due(Duration::from_secs(5), Some(Duration::from_millis(900))));
    }
}
