//! Startup microphone-off detection.
//!
//! Runs only until it resolves once per session: the first frame whose peak
//! reaches the amplitude threshold marks the microphone live, and an
//! uninterrupted run of near-zero audio for the configured duration marks it
//! off. After that the guard is inert, even if the input later goes quiet.

use std::time::{Duration, Instant};

use crate::audio::frame::is_near_silent;
use crate::audio::AudioFrame;

/// Outcome of the startup check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicStatus {
    Live,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// No frame observed yet this session
    Unchecked,
    /// Near-silent audio has been seen continuously since `since`
    TimerRunning { since: Instant },
    Resolved(MicStatus),
}

#[derive(Debug, Clone)]
pub struct SilenceGuard {
    amplitude_threshold: f32,
    duration: Duration,
    state: GuardState,
}

impl SilenceGuard {
    pub fn new(amplitude_threshold: f32, duration: Duration) -> Self {
        Self {
            amplitude_threshold,
            duration,
            state: GuardState::Unchecked,
        }
    }

    /// Re-arm for a new session
    pub fn reset(&mut self) {
        self.state = GuardState::Unchecked;
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, GuardState::Resolved(_))
    }

    /// Check a frame that ended at `now`.
    ///
    /// Returns `Some` only on the call that resolves the guard. Zero padding
    /// added by finite sources is not treated as captured audio.
    pub fn observe(&mut self, frame: &AudioFrame, now: Instant) -> Option<MicStatus> {
        if self.is_resolved() {
            return None;
        }

        let content = frame.content();
        if content.is_empty() {
            return None;
        }

        if !is_near_silent(content, self.amplitude_threshold) {
            self.state = GuardState::Resolved(MicStatus::Live);
            return Some(MicStatus::Live);
        }

        // The silent run started when this frame's audio began
        let since = match self.state {
            GuardState::TimerRunning { since } => since,
            _ => {
                let frame_start = now.checked_sub(frame.duration()).unwrap_or(now);
                self.state = GuardState::TimerRunning { since: frame_start };
                frame_start
            }
        };

        let silent_until = now
            .checked_sub(frame.duration().saturating_sub(frame.content_duration()))
            .unwrap_or(now);
        if silent_until.saturating_duration_since(since) >= self.duration {
            self.state = GuardState::Resolved(MicStatus::Off);
            return Some(MicStatus::Off);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(500);

    fn silent() -> AudioFrame {
        AudioFrame::new(vec![0.0; 8000], 16000)
    }

    fn loud() -> AudioFrame {
        AudioFrame::new(vec![0.2; 8000], 16000)
    }

    #[test]
    fn test_live_audio_resolves_immediately() {
        let t0 = Instant::now();
        let mut guard = SilenceGuard::new(0.01, Duration::from_secs(2));

        assert_eq!(guard.observe(&loud(), t0 + FRAME), Some(MicStatus::Live));
        assert_eq!(guard.state(), GuardState::Resolved(MicStatus::Live));

        // Never re-evaluates afterwards
        for i in 2..20 {
            assert_eq!(guard.observe(&silent(), t0 + FRAME * i), None);
        }
    }

    #[test]
    fn test_sustained_silence_resolves_off_once() {
        let t0 = Instant::now();
        let mut guard = SilenceGuard::new(0.01, Duration::from_secs(2));

        for i in 1..4 {
            assert_eq!(guard.observe(&silent(), t0 + FRAME * i), None);
        }
        assert!(matches!(guard.state(), GuardState::TimerRunning { .. }));

        // Fourth 500ms frame completes 2.0s of silence
        assert_eq!(guard.observe(&silent(), t0 + FRAME * 4), Some(MicStatus::Off));
        assert_eq!(guard.observe(&silent(), t0 + FRAME * 5), None);
        assert_eq!(guard.state(), GuardState::Resolved(MicStatus::Off));
    }

    #[test]
    fn test_loud_frame_before_threshold_wins() {
        let t0 = Instant::now();
        let mut guard = SilenceGuard::new(0.01, Duration::from_secs(2));

        guard.observe(&silent(), t0 + FRAME);
        guard.observe(&silent(), t0 + FRAME * 2);
        assert_eq!(guard.observe(&loud(), t0 + FRAME * 3), Some(MicStatus::Live));
    }

    #[test]
    fn test_padding_does_not_count_as_silence() {
        let t0 = Instant::now();
        let mut guard = SilenceGuard::new(0.01, Duration::from_secs(2));

        for i in 1..4 {
            guard.observe(&silent(), t0 + FRAME * i);
        }
        // Final frame: 100ms of real silence, 400ms of padding -> 1.6s total
        let tail = AudioFrame::padded(vec![0.0; 1600], 16000, 8000);
        assert_eq!(guard.observe(&tail, t0 + FRAME * 4), None);

        // A frame that is entirely padding is ignored
        let empty = AudioFrame::padded(Vec::new(), 16000, 8000);
        assert_eq!(guard.observe(&empty, t0 + FRAME * 5), None);
    }

    #[test]
    fn test_reset_rearms() {
        let t0 = Instant::now();
        let mut guard = SilenceGuard::new(0.01, Duration::from_secs(2));
        guard.observe(&loud(), t0 + FRAME);
        guard.reset();
        assert_eq!(guard.state(), GuardState::Unchecked);
    }
}
