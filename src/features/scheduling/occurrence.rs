//! Occurrence resolver
//!
//! Pure calendar math over naive local datetimes (the bot runs in a single
//! configured locale; the scheduler applies the UTC offset before calling in).
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Day-of-week occurrences anchor to today when the weekday matches,
//!   so a late tick still delivers the same day
//! - 1.0.0: Initial resolver with lead-time offsets

use chrono::{Datelike, Duration, NaiveDateTime};

use crate::core::reminder::{LeadTag, Reminder, ReminderKind, Schedule, Target};

/// Computes the occurrence instant governing the reminder's current cycle.
///
/// - `specific-date`: exactly `date + time`. A date in the past is expired
///   for `recurring` reminders (specific dates do not recur); for `one-time`
///   reminders the past instant is returned and stays due until sent.
/// - `day-of-week`: the nearest date on or after the reference date whose
///   weekday matches, at the reminder's time-of-day. When today matches, the
///   occurrence is today even if the time already passed — "next occurrence
///   including today".
pub fn current_occurrence(reminder: &Reminder, reference: NaiveDateTime) -> Option<NaiveDateTime> {
    match &reminder.schedule {
        Schedule::SpecificDate { date } => {
            let occurrence = date.and_time(reminder.time);
            if occurrence < reference && reminder.kind == ReminderKind::Recurring {
                None
            } else {
                Some(occurrence)
            }
        }
        Schedule::DayOfWeek { day } => {
            let today = reference.date();
            let wanted = day.to_chrono().num_days_from_sunday();
            let current = today.weekday().num_days_from_sunday();
            let days_ahead = (wanted + 7 - current) % 7;
            Some((today + Duration::days(i64::from(days_ahead))).and_time(reminder.time))
        }
    }
}

/// Instant at which one pre-reminder lead tag comes due.
pub fn lead_due_instant(occurrence: NaiveDateTime, tag: LeadTag) -> NaiveDateTime {
    occurrence - tag.duration()
}

/// Every target whose due instant has passed and whose status is not `sent`.
pub fn due_targets(reminder: &Reminder, reference: NaiveDateTime) -> Vec<Target> {
    let Some(occurrence) = current_occurrence(reminder, reference) else {
        return Vec::new();
    };

    let mut due = Vec::new();
    if occurrence <= reference && !reminder.main_reminder_status.sent {
        due.push(Target::Main);
    }
    for &tag in &reminder.pre_reminder_offsets {
        let already_sent = reminder.pre_status(tag).map_or(false, |s| s.sent);
        if !already_sent && lead_due_instant(occurrence, tag) <= reference {
            due.push(Target::Pre(tag));
        }
    }
    due
}
