//! Reminder domain model
//!
//! The record shape mirrors the persisted JSON (camelCase field names) so
//! existing reminder files load unchanged. Scheduling identity, delivery
//! statuses, and the edit-reset rule all live here.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.2.0: Cycle tracking for recurring reminders (recurringStatus)
//! - 1.1.0: Edit-reset rule moved into merge_edit
//! - 1.0.0: Initial model with schedule variants and delivery statuses

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Schedule types
// ============================================================================

/// Canonical weekday labels as stored in reminder records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub fn to_chrono(self) -> Weekday {
        match self {
            DayOfWeek::Sunday => Weekday::Sun,
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
        }
    }

    pub fn from_chrono(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "Sunday",
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
        }
    }
}

/// The schedule key of a reminder. Exactly one of `day`/`date` is present,
/// selected by the `scheduleMode` tag; the inactive field does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheduleMode", rename_all = "kebab-case")]
pub enum Schedule {
    DayOfWeek { day: DayOfWeek },
    SpecificDate { date: NaiveDate },
}

/// `one-time` reminders fire a single cycle; `recurring` reminders reset
/// their statuses after each completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderKind {
    OneTime,
    Recurring,
}

// ============================================================================
// Lead tags
// ============================================================================

/// Named pre-reminder offset: how long before the occurrence a secondary
/// notification fires.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LeadTag {
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "1w")]
    OneWeek,
}

impl LeadTag {
    pub const ALL: [LeadTag; 5] = [
        LeadTag::ThirtyMinutes,
        LeadTag::OneHour,
        LeadTag::OneDay,
        LeadTag::ThreeDays,
        LeadTag::OneWeek,
    ];

    pub fn duration(self) -> Duration {
        match self {
            LeadTag::ThirtyMinutes => Duration::minutes(30),
            LeadTag::OneHour => Duration::hours(1),
            LeadTag::OneDay => Duration::hours(24),
            LeadTag::ThreeDays => Duration::hours(72),
            LeadTag::OneWeek => Duration::hours(168),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LeadTag::ThirtyMinutes => "30m",
            LeadTag::OneHour => "1h",
            LeadTag::OneDay => "1d",
            LeadTag::ThreeDays => "3d",
            LeadTag::OneWeek => "1w",
        }
    }
}

impl fmt::Display for LeadTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Delivery status
// ============================================================================

/// Per-target delivery state: untouched → sent (terminal for the occurrence)
/// or untouched → failed (retried on a later tick).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatus {
    #[serde(default)]
    pub sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failed: bool,
}

impl DeliveryStatus {
    /// Records a successful delivery. Keeps the first `sent_at` if already
    /// sent, so a duplicate mark never rewrites delivery proof.
    pub fn mark_sent(&mut self, at: DateTime<Utc>) {
        if !self.sent {
            self.sent = true;
            self.sent_at = Some(at);
        }
        self.failed = false;
    }

    /// Records a failed attempt. Has no effect once sent.
    pub fn mark_failed(&mut self) {
        if !self.sent {
            self.failed = true;
        }
    }
}

/// Tracks the last completed occurrence of a recurring reminder so the next
/// cycle's statuses can be reset once the occurrence rolls over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_occurrence: Option<chrono::NaiveDateTime>,
}

/// A deliverable target within one reminder: the main notification or one
/// pre-reminder lead tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Main,
    Pre(LeadTag),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Main => f.write_str("main reminder"),
            Target::Pre(tag) => write!(f, "pre-reminder {tag}"),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("durationMinutes must be at least 1")]
    InvalidDuration,
    #[error("duplicate pre-reminder offset: {0}")]
    DuplicateLeadTag(LeadTag),
}

// ============================================================================
// Reminder
// ============================================================================

/// A reminder record owned by one contact (keyed by phone digits, or a
/// manual/no-phone pseudo-owner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub schedule: Schedule,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub duration_minutes: u32,
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    #[serde(default)]
    pub pre_reminder_offsets: Vec<LeadTag>,
    #[serde(default)]
    pub main_reminder_status: DeliveryStatus,
    #[serde(default)]
    pub pre_reminder_status: BTreeMap<LeadTag, DeliveryStatus>,
    #[serde(default)]
    pub recurring_status: RecurringStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer: Option<serde_json::Value>,
}

impl Reminder {
    /// A fresh reminder with untouched statuses and a one-hour duration.
    /// The id is assigned by the record store on first save.
    pub fn new(schedule: Schedule, time: NaiveTime, kind: ReminderKind) -> Self {
        Reminder {
            id: String::new(),
            schedule,
            time,
            duration_minutes: 60,
            kind,
            pre_reminder_offsets: Vec::new(),
            main_reminder_status: DeliveryStatus::default(),
            pre_reminder_status: BTreeMap::new(),
            recurring_status: RecurringStatus::default(),
            title: None,
            notes: None,
            category: None,
            buffer: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.duration_minutes < 1 {
            return Err(ValidationError::InvalidDuration);
        }
        let mut seen = BTreeSet::new();
        for tag in &self.pre_reminder_offsets {
            if !seen.insert(*tag) {
                return Err(ValidationError::DuplicateLeadTag(*tag));
            }
        }
        Ok(())
    }

    /// Status entry for one pre-reminder tag, if it was ever touched.
    pub fn pre_status(&self, tag: LeadTag) -> Option<&DeliveryStatus> {
        self.pre_reminder_status.get(&tag)
    }

    /// Marks one target as delivered. Already-sent targets are left alone.
    pub fn mark_target_sent(&mut self, target: Target, at: DateTime<Utc>) {
        match target {
            Target::Main => self.main_reminder_status.mark_sent(at),
            Target::Pre(tag) => self
                .pre_reminder_status
                .entry(tag)
                .or_default()
                .mark_sent(at),
        }
    }

    /// Marks one target as failed so the next tick retries it.
    pub fn mark_target_failed(&mut self, target: Target) {
        match target {
            Target::Main => self.main_reminder_status.mark_failed(),
            Target::Pre(tag) => self
                .pre_reminder_status
                .entry(tag)
                .or_default()
                .mark_failed(),
        }
    }

    /// True once the main reminder and every active pre-reminder are sent.
    pub fn fully_sent(&self) -> bool {
        self.main_reminder_status.sent
            && self
                .pre_reminder_offsets
                .iter()
                .all(|tag| self.pre_reminder_status.get(tag).map_or(false, |s| s.sent))
    }

    /// Returns every status entry to untouched. The only way out of `sent`.
    pub fn reset_statuses(&mut self) {
        self.main_reminder_status = DeliveryStatus::default();
        self.pre_reminder_status.clear();
        self.recurring_status = RecurringStatus::default();
    }

    /// Whether two records promise the same thing. Editing any of these
    /// fields invalidates prior delivery proof.
    fn same_schedule_identity(&self, other: &Reminder) -> bool {
        let mut mine = self.pre_reminder_offsets.clone();
        let mut theirs = other.pre_reminder_offsets.clone();
        mine.sort();
        theirs.sort();
        self.schedule == other.schedule
            && self.time == other.time
            && self.kind == other.kind
            && self.title == other.title
            && mine == theirs
    }

    /// Applies an edit on top of an existing record. If the schedule identity
    /// (day/date, time, type, title, offsets) changed, all statuses reset to
    /// untouched; otherwise the existing statuses are carried over so a stale
    /// client payload cannot clobber delivery proof.
    pub fn merge_edit(existing: &Reminder, mut edited: Reminder) -> Reminder {
        if existing.same_schedule_identity(&edited) {
            edited.main_reminder_status = existing.main_reminder_status.clone();
            edited.pre_reminder_status = existing.pre_reminder_status.clone();
            edited.recurring_status = existing.recurring_status.clone();
        } else {
            edited.reset_statuses();
        }
        edited
    }
}

/// Serializes time-of-day as `HH:MM` (accepts `HH:MM:SS` on read).
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn weekly(day: DayOfWeek, time: &str) -> Reminder {
        let mut r = Reminder::new(
            Schedule::DayOfWeek { day },
            NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            ReminderKind::Recurring,
        );
        r.id = "r1".to_string();
        r
    }

    // ---- serde shape ----

    #[test]
    fn test_serde_camel_case_round_trip() {
        let mut r = weekly(DayOfWeek::Sunday, "10:00");
        r.pre_reminder_offsets = vec![LeadTag::OneDay, LeadTag::OneHour];
        r.title = Some("clinic".to_string());

        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["scheduleMode"], "day-of-week");
        assert_eq!(value["day"], "Sunday");
        assert_eq!(value["time"], "10:00");
        assert_eq!(value["type"], "recurring");
        assert_eq!(value["durationMinutes"], 60);
        assert_eq!(value["preReminderOffsets"][0], "1d");

        let back: Reminder = serde_json::from_value(value).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_serde_specific_date() {
        let raw = serde_json::json!({
            "id": "abc",
            "scheduleMode": "specific-date",
            "date": "2025-03-14",
            "time": "09:30",
            "durationMinutes": 30,
            "type": "one-time"
        });
        let r: Reminder = serde_json::from_value(raw).unwrap();
        assert_eq!(
            r.schedule,
            Schedule::SpecificDate {
                date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
            }
        );
        assert_eq!(r.time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert!(!r.main_reminder_status.sent);
    }

    #[test]
    fn test_serde_accepts_seconds_in_time() {
        let raw = serde_json::json!({
            "scheduleMode": "day-of-week",
            "day": "Monday",
            "time": "14:00:00",
            "durationMinutes": 45,
            "type": "recurring"
        });
        let r: Reminder = serde_json::from_value(raw).unwrap();
        assert_eq!(r.time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
    }

    // ---- validation ----

    #[test]
    fn test_validate_rejects_zero_duration() {
        let mut r = weekly(DayOfWeek::Monday, "08:00");
        r.duration_minutes = 0;
        assert_eq!(r.validate(), Err(ValidationError::InvalidDuration));
    }

    #[test]
    fn test_validate_rejects_duplicate_offsets() {
        let mut r = weekly(DayOfWeek::Monday, "08:00");
        r.pre_reminder_offsets = vec![LeadTag::OneHour, LeadTag::OneDay, LeadTag::OneHour];
        assert_eq!(
            r.validate(),
            Err(ValidationError::DuplicateLeadTag(LeadTag::OneHour))
        );
    }

    // ---- status state machine ----

    #[test]
    fn test_mark_sent_is_terminal_and_clears_failed() {
        let mut status = DeliveryStatus::default();
        status.mark_failed();
        assert!(status.failed);

        let first = Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap();
        status.mark_sent(first);
        assert!(status.sent);
        assert!(!status.failed);
        assert_eq!(status.sent_at, Some(first));

        // A duplicate mark never rewrites the original proof.
        status.mark_sent(Utc.with_ymd_and_hms(2025, 1, 5, 11, 0, 0).unwrap());
        assert_eq!(status.sent_at, Some(first));

        // No transition out of sent via failure either.
        status.mark_failed();
        assert!(status.sent);
        assert!(!status.failed);
    }

    #[test]
    fn test_fully_sent_requires_all_active_targets() {
        let mut r = weekly(DayOfWeek::Sunday, "10:00");
        r.pre_reminder_offsets = vec![LeadTag::OneDay, LeadTag::OneHour];
        let at = Utc.with_ymd_and_hms(2025, 1, 4, 10, 0, 0).unwrap();

        r.mark_target_sent(Target::Main, at);
        r.mark_target_sent(Target::Pre(LeadTag::OneDay), at);
        assert!(!r.fully_sent());

        r.mark_target_sent(Target::Pre(LeadTag::OneHour), at);
        assert!(r.fully_sent());
    }

    // ---- edit-reset rule ----

    #[test]
    fn test_edit_time_resets_all_statuses() {
        let mut existing = weekly(DayOfWeek::Sunday, "10:00");
        existing.pre_reminder_offsets = vec![LeadTag::OneDay];
        let at = Utc.with_ymd_and_hms(2025, 1, 4, 10, 0, 0).unwrap();
        existing.mark_target_sent(Target::Main, at);
        existing.mark_target_sent(Target::Pre(LeadTag::OneDay), at);

        let mut edited = existing.clone();
        edited.time = NaiveTime::from_hms_opt(11, 0, 0).unwrap();

        let merged = Reminder::merge_edit(&existing, edited);
        assert!(!merged.main_reminder_status.sent);
        assert!(merged.pre_reminder_status.is_empty());
        assert!(merged.recurring_status.last_occurrence.is_none());
    }

    #[test]
    fn test_edit_notes_keeps_statuses() {
        let mut existing = weekly(DayOfWeek::Sunday, "10:00");
        let at = Utc.with_ymd_and_hms(2025, 1, 4, 10, 0, 0).unwrap();
        existing.mark_target_sent(Target::Main, at);

        let mut edited = existing.clone();
        edited.notes = Some("bring paperwork".to_string());
        // A stale client payload must not clobber delivery proof.
        edited.main_reminder_status = DeliveryStatus::default();

        let merged = Reminder::merge_edit(&existing, edited);
        assert!(merged.main_reminder_status.sent);
        assert_eq!(merged.notes.as_deref(), Some("bring paperwork"));
    }

    #[test]
    fn test_edit_title_and_offsets_reset() {
        let mut existing = weekly(DayOfWeek::Sunday, "10:00");
        let at = Utc.with_ymd_and_hms(2025, 1, 4, 10, 0, 0).unwrap();
        existing.mark_target_sent(Target::Main, at);

        let mut retitled = existing.clone();
        retitled.title = Some("new title".to_string());
        assert!(!Reminder::merge_edit(&existing, retitled).main_reminder_status.sent);

        let mut reoffset = existing.clone();
        reoffset.pre_reminder_offsets = vec![LeadTag::OneWeek];
        assert!(!Reminder::merge_edit(&existing, reoffset).main_reminder_status.sent);
    }

    #[test]
    fn test_offset_order_is_not_an_edit() {
        let mut existing = weekly(DayOfWeek::Sunday, "10:00");
        existing.pre_reminder_offsets = vec![LeadTag::OneDay, LeadTag::OneHour];
        let at = Utc.with_ymd_and_hms(2025, 1, 4, 10, 0, 0).unwrap();
        existing.mark_target_sent(Target::Main, at);

        let mut edited = existing.clone();
        edited.pre_reminder_offsets = vec![LeadTag::OneHour, LeadTag::OneDay];

        assert!(Reminder::merge_edit(&existing, edited).main_reminder_status.sent);
    }

    // ---- lead tags ----

    #[test]
    fn test_lead_tag_durations() {
        assert_eq!(LeadTag::ThirtyMinutes.duration(), Duration::minutes(30));
        assert_eq!(LeadTag::OneHour.duration(), Duration::minutes(60));
        assert_eq!(LeadTag::OneDay.duration(), Duration::hours(24));
        assert_eq!(LeadTag::ThreeDays.duration(), Duration::hours(72));
        assert_eq!(LeadTag::OneWeek.duration(), Duration::hours(168));
    }

    #[test]
    fn test_lead_tag_labels() {
        for tag in LeadTag::ALL {
            let json = serde_json::to_value(tag).unwrap();
            assert_eq!(json, tag.label());
        }
    }
}
