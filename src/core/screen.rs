//! Screen states of the display.

use std::fmt;

/// The screen currently shown. Exactly one is active at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenState {
    Dashboard,
    PreCall,
    Call,
    PostCallSupplication,
    Interval,
    CongregationStart,
    InPrayer,
    Remembrance,
}

impl ScreenState {
    /// Order in which a prayer's screens appear, starting from the dashboard.
    pub const SEQUENCE: [ScreenState; 8] = [
        ScreenState::Dashboard,
        ScreenState::PreCall,
        ScreenState::Call,
        ScreenState::PostCallSupplication,
        ScreenState::Interval,
        ScreenState::CongregationStart,
        ScreenState::InPrayer,
        ScreenState::Remembrance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenState::Dashboard => "dashboard",
            ScreenState::PreCall => "pre-call",
            ScreenState::Call => "call",
            ScreenState::PostCallSupplication => "post-call-supplication",
            ScreenState::Interval => "interval",
            ScreenState::CongregationStart => "congregation-start",
            ScreenState::InPrayer => "in-prayer",
            ScreenState::Remembrance => "remembrance",
        }
    }

    /// Heading shown on the screen.
    pub fn arabic_label(&self) -> &'static str {
        match self {
            ScreenState::Dashboard => "مواقيت الصلاة",
            ScreenState::PreCall => "اقترب موعد الأذان",
            ScreenState::Call => "حان الآن موعد الأذان",
            ScreenState::PostCallSupplication => "دعاء ما بعد الأذان",
            ScreenState::Interval => "الوقت المتبقي للإقامة",
            ScreenState::CongregationStart => "أقيمت الصلاة",
            ScreenState::InPrayer => "الصلاة قائمة",
            ScreenState::Remembrance => "أذكار ما بعد الصلاة",
        }
    }
}

impl fmt::Display for ScreenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_starts_at_dashboard_and_names_are_distinct() {
        assert_eq!(ScreenState::SEQUENCE[0], ScreenState::Dashboard);
        let names: std::collections::HashSet<_> =
            ScreenState::SEQUENCE.iter().map(|s| s.to_string()).collect();
        assert_eq!(names.len(), ScreenState::SEQUENCE.len());
    }
}
