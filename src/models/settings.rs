use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct NotificationSettings {
    pub daily_reminders: bool,
    pub mood_alerts: bool,
    pub weekly_reports: bool,
    pub emergency_contacts: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            daily_reminders: true,
            mood_alerts: false,
            weekly_reports: true,
            emergency_contacts: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PrivacySettings {
    pub share_with_therapist: bool,
    pub anonymous_data: bool,
    pub data_retention: DataRetention,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            share_with_therapist: false,
            anonymous_data: true,
            data_retention: DataRetention::OneYear,
        }
    }
}

/// How long mood history is kept before the retention sweep removes it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "data_retention")]
pub enum DataRetention {
    #[serde(rename = "3months")]
    #[sqlx(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    #[sqlx(rename = "6months")]
    SixMonths,
    #[default]
    #[serde(rename = "1year")]
    #[sqlx(rename = "1year")]
    OneYear,
    #[serde(rename = "2years")]
    #[sqlx(rename = "2years")]
    TwoYears,
    #[serde(rename = "indefinite")]
    #[sqlx(rename = "indefinite")]
    Indefinite,
}

impl DataRetention {
    /// Window length in days, `None` for indefinite retention.
    pub fn days(self) -> Option<i64> {
        match self {
            DataRetention::ThreeMonths => Some(90),
            DataRetention::SixMonths => Some(182),
            DataRetention::OneYear => Some(365),
            DataRetention::TwoYears => Some(730),
            DataRetention::Indefinite => None,
        }
    }

    /// Oldest date still retained when today is `today`.
    pub fn cutoff(self, today: NaiveDate) -> Option<NaiveDate> {
        self.days().map(|d| today - Duration::days(d))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, PartialEq)]
pub struct UserSettings {
    #[sqlx(flatten)]
    pub notifications: NotificationSettings,
    #[sqlx(flatten)]
    pub privacy: PrivacySettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationPatch {
    pub daily_reminders: Option<bool>,
    pub mood_alerts: Option<bool>,
    pub weekly_reports: Option<bool>,
    pub emergency_contacts: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrivacyPatch {
    pub share_with_therapist: Option<bool>,
    pub anonymous_data: Option<bool>,
    pub data_retention: Option<DataRetention>,
}

/// Partial update: absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub notifications: Option<NotificationPatch>,
    pub privacy: Option<PrivacyPatch>,
}

impl UserSettings {
    pub fn apply(mut self, patch: SettingsPatch) -> Self {
        if let Some(n) = patch.notifications {
            let cur = &mut self.notifications;
            cur.daily_reminders = n.daily_reminders.unwrap_or(cur.daily_reminders);
            cur.mood_alerts = n.mood_alerts.unwrap_or(cur.mood_alerts);
            cur.weekly_reports = n.weekly_reports.unwrap_or(cur.weekly_reports);
            cur.emergency_contacts = n.emergency_contacts.unwrap_or(cur.emergency_contacts);
        }
        if let Some(p) = patch.privacy {
            let cur = &mut self.privacy;
            cur.share_with_therapist = p.share_with_therapist.unwrap_or(cur.share_with_therapist);
            cur.anonymous_data = p.anonymous_data.unwrap_or(cur.anonymous_data);
            cur.data_retention = p.data_retention.unwrap_or(cur.data_retention);
        }
        self
    }
}
