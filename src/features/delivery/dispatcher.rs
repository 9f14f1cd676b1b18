//! Dispatcher
//!
//! Turns a due target into an outgoing message: resolves the delivery
//! identity, formats the template, sends with a timeout, and retries the
//! alternate address suffix once when the default suffix is structurally
//! wrong for the recipient. Also hosts the manual "send this reminder now"
//! path, which suppresses the automatic pre-reminders before sending so a
//! racing tick observes them as already sent.
//!
//! - **Version**: 1.3.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.3.0: Readiness probe guards both dispatch paths
//! - 1.2.0: Manual dispatch reverts its suppression marks when the send fails
//! - 1.1.0: Per-send timeout
//! - 1.0.0: Initial dispatch with suffix retry

use anyhow::{bail, Result};
use chrono::{FixedOffset, NaiveDateTime};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

use crate::core::clock::Clock;
use crate::core::reminder::{LeadTag, Reminder, Schedule, Target};
use crate::features::delivery::identity::resolve;
use crate::features::delivery::template::{
    format_template, TemplateKind, TemplateSource, TemplateValues,
};
use crate::features::scheduling::occurrence::current_occurrence;
use crate::messaging::{
    MessagingClient, Recipient, SendError, ALTERNATE_ADDRESS_SUFFIX, DEFAULT_ADDRESS_SUFFIX,
};
use crate::storage::RecordStore;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no delivery identity for owner '{0}'")]
    Unresolvable(String),
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Send(#[from] SendError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub struct Dispatcher {
    store: Arc<dyn RecordStore>,
    client: Arc<dyn MessagingClient>,
    templates: Arc<dyn TemplateSource>,
    clock: Arc<dyn Clock>,
    country_code: String,
    utc_offset: FixedOffset,
    send_timeout: Duration,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn RecordStore>,
        client: Arc<dyn MessagingClient>,
        templates: Arc<dyn TemplateSource>,
        clock: Arc<dyn Clock>,
        country_code: String,
        utc_offset: FixedOffset,
        send_timeout: Duration,
    ) -> Self {
        Dispatcher {
            store,
            client,
            templates,
            clock,
            country_code,
            utc_offset,
            send_timeout,
        }
    }

    fn local_now(&self) -> NaiveDateTime {
        self.clock.now().with_timezone(&self.utc_offset).naive_local()
    }

    /// Delivers one notification to the owner's resolved identity.
    pub async fn deliver(
        &self,
        owner: &str,
        kind: TemplateKind,
        occurrence: NaiveDateTime,
    ) -> Result<(), DeliveryError> {
        if !self.client.is_ready().await {
            return Err(DeliveryError::Send(SendError::NotReady));
        }

        let recipient = resolve(self.client.as_ref(), owner, &self.country_code)
            .await?
            .ok_or_else(|| DeliveryError::Unresolvable(owner.to_string()))?;

        let template = self.templates.template_for(kind).await;
        let text = format_template(&template, &TemplateValues::for_occurrence(occurrence));

        match self.attempt(&recipient, &text).await {
            Err(DeliveryError::Send(SendError::InvalidAddressType)) => {
                // The synthesized default suffix is wrong for this recipient;
                // try the alternate convention once before surfacing failure.
                if let Recipient::Address(address) = &recipient {
                    if let Some(base) = address.strip_suffix(DEFAULT_ADDRESS_SUFFIX) {
                        let alternate =
                            Recipient::Address(format!("{base}{ALTERNATE_ADDRESS_SUFFIX}"));
                        debug!("Retrying {owner} with alternate address {}", alternate.address());
                        return self.attempt(&alternate, &text).await;
                    }
                }
                Err(DeliveryError::Send(SendError::InvalidAddressType))
            }
            other => other,
        }
    }

    async fn attempt(&self, recipient: &Recipient, text: &str) -> Result<(), DeliveryError> {
        match tokio::time::timeout(self.send_timeout, self.client.send(recipient, text)).await {
            Err(_) => Err(DeliveryError::Timeout(self.send_timeout)),
            Ok(result) => result.map_err(DeliveryError::from),
        }
    }

    /// Manual dispatch: send the reminder immediately and suppress its
    /// automatic pre-reminders. The suppression marks land in one atomic
    /// update *before* the send so a concurrent tick never double-delivers;
    /// if the send then fails, the marks this call added are reverted to
    /// `failed`. The main reminder status is never touched.
    pub async fn send_now(&self, owner: &str, reminder_id: &str) -> Result<()> {
        // An unready client is a retryable condition; surface it before the
        // suppression marks so no status ever records it as a failure.
        if !self.client.is_ready().await {
            return Err(SendError::NotReady.into());
        }

        let at = self.clock.now();
        let newly_marked: Arc<Mutex<Vec<LeadTag>>> = Arc::new(Mutex::new(Vec::new()));
        let marks = newly_marked.clone();

        let updated = self
            .store
            .update_one(
                owner,
                reminder_id,
                Box::new(move |reminder| {
                    let tags = reminder.pre_reminder_offsets.clone();
                    for tag in tags {
                        let already = reminder.pre_status(tag).map_or(false, |s| s.sent);
                        if !already {
                            reminder.mark_target_sent(Target::Pre(tag), at);
                            marks.lock().expect("mark list poisoned").push(tag);
                        }
                    }
                }),
            )
            .await?;

        let Some(reminder) = updated else {
            bail!("reminder {reminder_id} not found for owner {owner}");
        };

        let reference = self.local_now();
        let occurrence = display_occurrence(&reminder, reference);

        match self.deliver(owner, TemplateKind::PreReminder, occurrence).await {
            Ok(()) => {
                info!("Manually dispatched reminder {reminder_id} to owner {owner}");
                Ok(())
            }
            Err(e) => {
                warn!("Manual dispatch of {reminder_id} failed: {e}");
                let tags = newly_marked.lock().expect("mark list poisoned").clone();
                self.store
                    .update_one(
                        owner,
                        reminder_id,
                        Box::new(move |reminder| {
                            for tag in tags {
                                if let Some(status) = reminder.pre_reminder_status.get_mut(&tag) {
                                    status.sent = false;
                                    status.sent_at = None;
                                    status.failed = true;
                                }
                            }
                        }),
                    )
                    .await?;
                Err(e.into())
            }
        }
    }
}

/// Occurrence instant used for message formatting. Falls back to the raw
/// scheduled instant for expired specific-date reminders so a manual send
/// still renders real values.
fn display_occurrence(reminder: &Reminder, reference: NaiveDateTime) -> NaiveDateTime {
    current_occurrence(reminder, reference).unwrap_or_else(|| match &reminder.schedule {
        Schedule::SpecificDate { date } => date.and_time(reminder.time),
        Schedule::DayOfWeek { .. } => reference,
    })
}
