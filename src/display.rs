//! Derived display fields consumed by the view layer.
//!
//! Pure functions only; nothing here touches collection state.

use serde::Serialize;

use crate::models::{Percent, Phase};

/// Severity band for a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressBand {
    High,
    Mid,
    Warn,
    Low,
    Critical,
}

/// Color band for a quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityBand {
    Green,
    Blue,
    Yellow,
    Red,
    Neutral,
}

/// Progress shown to users. Completed always reads 100 and cancelled 0,
/// for projects and works alike.
pub fn display_progress(progress: Percent, phase: Phase) -> Percent {
    match phase {
        Phase::Completed => Percent::FULL,
        Phase::Cancelled => Percent::ZERO,
        _ => progress,
    }
}

pub fn progress_band(progress: Percent, phase: Phase) -> ProgressBand {
    match phase {
        Phase::Completed => return ProgressBand::High,
        Phase::OnHold => return ProgressBand::Warn,
        Phase::Cancelled => return ProgressBand::Critical,
        Phase::Pending | Phase::Active => {}
    }
    match progress.get() {
        80.. => ProgressBand::High,
        50..=79 => ProgressBand::Mid,
        25..=49 => ProgressBand::Warn,
        _ => ProgressBand::Low,
    }
}

/// A zero score is treated like a missing one.
pub fn quality_band(score: Option<Percent>) -> QualityBand {
    match score.map(Percent::get) {
        None | Some(0) => QualityBand::Neutral,
        Some(90..) => QualityBand::Green,
        Some(80..=89) => QualityBand::Blue,
        Some(70..=79) => QualityBand::Yellow,
        Some(_) => QualityBand::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: i64) -> Percent {
        Percent::new(v)
    }

    #[test]
    fn progress_bands_follow_thresholds() {
        assert_eq!(progress_band(p(85), Phase::Active), ProgressBand::High);
        assert_eq!(progress_band(p(80), Phase::Active), ProgressBand::High);
        assert_eq!(progress_band(p(79), Phase::Active), ProgressBand::Mid);
        assert_eq!(progress_band(p(50), Phase::Active), ProgressBand::Mid);
        assert_eq!(progress_band(p(49), Phase::Pending), ProgressBand::Warn);
        assert_eq!(progress_band(p(25), Phase::Active), ProgressBand::Warn);
        assert_eq!(progress_band(p(24), Phase::Active), ProgressBand::Low);
        assert_eq!(progress_band(p(10), Phase::Active), ProgressBand::Low);
    }

    #[test]
    fn status_overrides_numeric_progress() {
        assert_eq!(progress_band(p(0), Phase::Completed), ProgressBand::High);
        assert_eq!(progress_band(p(95), Phase::OnHold), ProgressBand::Warn);
        assert_eq!(progress_band(p(95), Phase::Cancelled), ProgressBand::Critical);
    }

    #[test]
    fn quality_bands_follow_thresholds() {
        assert_eq!(quality_band(Some(p(95))), QualityBand::Green);
        assert_eq!(quality_band(Some(p(90))), QualityBand::Green);
        assert_eq!(quality_band(Some(p(85))), QualityBand::Blue);
        assert_eq!(quality_band(Some(p(80))), QualityBand::Blue);
        assert_eq!(quality_band(Some(p(75))), QualityBand::Yellow);
        assert_eq!(quality_band(Some(p(70))), QualityBand::Yellow);
        assert_eq!(quality_band(Some(p(60))), QualityBand::Red);
        assert_eq!(quality_band(None), QualityBand::Neutral);
        assert_eq!(quality_band(Some(p(0))), QualityBand::Neutral);
    }

    #[test]
    fn display_progress_forces_terminal_states() {
        assert_eq!(display_progress(p(40), Phase::Completed), Percent::FULL);
        assert_eq!(display_progress(p(40), Phase::Cancelled), Percent::ZERO);
        assert_eq!(display_progress(p(40), Phase::OnHold), p(40));
    }
}
