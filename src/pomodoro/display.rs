use serde::{Deserialize, Serialize};
use std::fmt;

pub const SESSION_GLYPH: char = '\u{25cf}'; // ●

/// Time shown on the panel, split into minutes and seconds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub minutes: u64,
    pub seconds: u64,
}

impl Clock {
    pub fn from_seconds(total: u64) -> Self {
        Self {
            minutes: total / 60,
            seconds: total % 60,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}

/// One glyph per completed pomodoro.
pub fn session_glyphs(completed: u32) -> String {
    std::iter::repeat_n(SESSION_GLYPH, completed as usize).collect()
}

/// Panel text: session glyphs, a space, then `MM:SS`.
pub fn panel_label(completed: u32, clock: Clock) -> String {
    format!("{} {}", session_glyphs(completed), clock)
}

/// Human readable duration setting, in whole minutes.
pub fn duration_label(seconds: u32) -> String {
    format!("{} minutes", seconds / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_decomposition() {
        for total in [0, 1, 59, 60, 61, 1499, 1500, 3599, 3600, 7261] {
            let clock = Clock::from_seconds(total);
            assert!(clock.seconds < 60);
            assert_eq!(clock.minutes, total / 60);
            assert_eq!(clock.total_seconds(), total);
        }
    }

    #[test]
    fn test_clock_formatting() {
        assert_eq!(Clock::from_seconds(0).to_string(), "00:00");
        assert_eq!(Clock::from_seconds(1500).to_string(), "25:00");
        assert_eq!(Clock::from_seconds(65).to_string(), "01:05");
        assert_eq!(Clock::from_seconds(6000).to_string(), "100:00");
    }

    #[test]
    fn test_session_glyphs() {
        assert_eq!(session_glyphs(0), "");
        assert_eq!(session_glyphs(3), "●●●");
        assert_eq!(session_glyphs(7).chars().count(), 7);
    }

    #[test]
    fn test_panel_label() {
        assert_eq!(panel_label(0, Clock::from_seconds(1500)), " 25:00");
        assert_eq!(panel_label(2, Clock::from_seconds(59)), "●● 00:59");
    }

    #[test]
    fn test_duration_label() {
        assert_eq!(duration_label(1500), "25 minutes");
        assert_eq!(duration_label(60), "1 minutes");
    }
}
