//! Progress bands and the monotonic progress tracker.

use super::types::{GenerationMode, Stage};

/// Progress band `[start, end]` of a stage for the given mode.
pub fn stage_band(mode: GenerationMode, stage: Stage) -> (u8, u8) {
    match (mode, stage) {
        (_, Stage::Idle) => (0, 0),
        (_, Stage::Done) => (100, 100),
        (GenerationMode::Video, Stage::Uploading) => (0, 25),
        (GenerationMode::Video, Stage::Training) => (25, 50),
        (GenerationMode::Video, Stage::Voicing) => (50, 75),
        (GenerationMode::Video, Stage::Rendering) => (75, 100),
        (GenerationMode::Speech, Stage::Uploading) => (0, 50),
        (GenerationMode::Speech, Stage::Voicing) => (50, 100),
        // Speech sessions never train or render.
        (GenerationMode::Speech, Stage::Training) => (50, 50),
        (GenerationMode::Speech, Stage::Rendering) => (100, 100),
    }
}

/// Tracks the progress of one run. Values never decrease.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    mode: GenerationMode,
    stage: Stage,
    current: u8,
}

impl ProgressTracker {
    pub fn new(mode: GenerationMode) -> Self {
        Self {
            mode,
            stage: Stage::Idle,
            current: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn current(&self) -> u8 {
        self.current
    }

    /// Enter a stage; progress jumps to the start of its band.
    pub fn enter(&mut self, stage: Stage) -> u8 {
        self.stage = stage;
        let (start, _) = stage_band(self.mode, stage);
        self.advance_to(start)
    }

    /// Progress after `step` units of work in the current stage.
    ///
    /// Each step moves one percent further into the band, stopping one short
    /// of its end so only the next stage (or `done`) completes it.
    pub fn step(&mut self, step: u32) -> u8 {
        let (start, end) = stage_band(self.mode, self.stage);
        let ceiling = end.saturating_sub(1).max(start);
        let offset = step.min(u32::from(ceiling - start)) as u8;
        self.advance_to(start + offset)
    }

    /// Move to a fraction of the current band (`0.0..=1.0`), bounded like [`step`](Self::step).
    pub fn fraction(&mut self, fraction: f32) -> u8 {
        let (start, end) = stage_band(self.mode, self.stage);
        let span = f32::from(end - start);
        let steps = (span * fraction.clamp(0.0, 1.0)).floor() as u32;
        self.step(steps)
    }

    /// Mark the run finished.
    pub fn finish(&mut self) -> u8 {
        self.stage = Stage::Done;
        self.advance_to(100)
    }

    fn advance_to(&mut self, value: u8) -> u8 {
        self.current = self.current.max(value.min(100));
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_cover_range() {
        let stages = [
            Stage::Uploading,
            Stage::Training,
            Stage::Voicing,
            Stage::Rendering,
        ];
        let mut last_end = 0;
        for stage in stages {
            let (start, end) = stage_band(GenerationMode::Video, stage);
            assert_eq!(start, last_end);
            assert!(end > start);
            last_end = end;
        }
        assert_eq!(last_end, 100);
    }

    #[test]
    fn test_steps_stay_within_band() {
        let mut tracker = ProgressTracker::new(GenerationMode::Video);
        assert_eq!(tracker.enter(Stage::Training), 25);
        assert_eq!(tracker.step(1), 26);
        assert_eq!(tracker.step(10), 35);
        assert_eq!(tracker.step(1000), 49);
        assert_eq!(tracker.enter(Stage::Voicing), 50);
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut tracker = ProgressTracker::new(GenerationMode::Video);
        tracker.enter(Stage::Rendering);
        tracker.step(10);
        assert_eq!(tracker.step(2), 85);
        assert_eq!(tracker.enter(Stage::Uploading), 85);
        assert_eq!(tracker.finish(), 100);
    }

    #[test]
    fn test_speech_bands() {
        let mut tracker = ProgressTracker::new(GenerationMode::Speech);
        assert_eq!(tracker.enter(Stage::Uploading), 0);
        assert_eq!(tracker.fraction(0.5), 25);
        assert_eq!(tracker.enter(Stage::Voicing), 50);
        assert_eq!(tracker.fraction(1.0), 99);
        assert_eq!(tracker.finish(), 100);
    }
}
