//! Message templates
//!
//! Pure `{day}` / `{time}` / `{date}` substitution plus the
//! [`TemplateSource`] capability the dispatcher pulls its texts from.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime};

use crate::core::reminder::DayOfWeek;

/// Which template a dispatch uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Main,
    PreReminder,
}

/// Values available to a template. A missing value leaves its placeholder
/// verbatim.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues {
    pub day: Option<String>,
    pub time: Option<String>,
    pub date: Option<String>,
}

impl TemplateValues {
    /// Formats the occurrence instant into day/time/date strings.
    pub fn for_occurrence(occurrence: NaiveDateTime) -> Self {
        TemplateValues {
            day: Some(DayOfWeek::from_chrono(occurrence.weekday()).label().to_string()),
            time: Some(occurrence.format("%H:%M").to_string()),
            date: Some(occurrence.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Substitutes `{day}`, `{time}`, and `{date}`. Literal substring
/// replacement, no escaping; unknown placeholders pass through untouched.
pub fn format_template(template: &str, values: &TemplateValues) -> String {
    let mut text = template.to_string();
    if let Some(day) = &values.day {
        text = text.replace("{day}", day);
    }
    if let Some(time) = &values.time {
        text = text.replace("{time}", time);
    }
    if let Some(date) = &values.date {
        text = text.replace("{date}", date);
    }
    text
}

/// Supplies the configured message texts.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn template_for(&self, kind: TemplateKind) -> String;
}

/// Fixed templates; the default texts cover the dry-run binary.
#[derive(Debug, Clone)]
pub struct StaticTemplates {
    pub main: String,
    pub pre: String,
}

impl Default for StaticTemplates {
    fn default() -> Self {
        StaticTemplates {
            main: "Reminder: your appointment is today, {day} {date}, at {time}.".to_string(),
            pre: "Heads up: you have an appointment on {day} {date} at {time}.".to_string(),
        }
    }
}

#[async_trait]
impl TemplateSource for StaticTemplates {
    async fn template_for(&self, kind: TemplateKind) -> String {
        match kind {
            TemplateKind::Main => self.main.clone(),
            TemplateKind::PreReminder => self.pre.clone(),
        }
    }
}
