use serde::{Deserialize, Serialize};

use super::mood::MoodValue;

/// Visual palette selector derived from the day's mood.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeTag {
    #[default]
    Default,
    Great,
    Good,
    Okay,
    Low,
    Struggling,
}

impl ThemeTag {
    pub fn for_mood(mood: MoodValue) -> Self {
        match mood.get() {
            5 => ThemeTag::Great,
            4 => ThemeTag::Good,
            3 => ThemeTag::Okay,
            2 => ThemeTag::Low,
            _ => ThemeTag::Struggling,
        }
    }

    /// Total over any raw input: absent or out-of-range values get `Default`.
    pub fn from_raw(mood: Option<i32>) -> Self {
        mood.and_then(|v| MoodValue::try_from(v).ok())
            .map(Self::for_mood)
            .unwrap_or_default()
    }

    /// Value of the presentation attribute (`data-theme`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeTag::Default => "default",
            ThemeTag::Great => "great",
            ThemeTag::Good => "good",
            ThemeTag::Okay => "okay",
            ThemeTag::Low => "low",
            ThemeTag::Struggling => "struggling",
        }
    }
}

impl std::fmt::Display for ThemeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
