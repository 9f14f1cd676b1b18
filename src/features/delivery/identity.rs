//! Delivery identity resolution
//!
//! Recipient addressing is heterogeneous: some contacts are addressed by a
//! phone-derived identifier, others only by an internal identifier unrelated
//! to the phone number, and the mapping is only reliably discoverable via the
//! live conversation list or a directory lookup. The resolver tries, in
//! order: known conversations, directory lookup, synthesized default address.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Country-prefix tolerant digit matching
//! - 1.0.0: Initial fallback chain

use anyhow::Result;
use log::{debug, warn};

use crate::messaging::{MessagingClient, Recipient, DEFAULT_ADDRESS_SUFFIX};

/// Strips everything but ASCII digits.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Digit prefix of an endpoint identifier (the part before the `@` suffix).
pub fn endpoint_digits(endpoint_id: &str) -> String {
    let prefix = endpoint_id.split('@').next().unwrap_or(endpoint_id);
    digits_only(prefix)
}

/// Structural digit-string match, tolerant of one side carrying the country
/// prefix the other side omits.
pub fn phone_matches(a: &str, b: &str, country_code: &str) -> bool {
    let a = digits_only(a);
    let b = digits_only(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a == format!("{country_code}{b}") || b == format!("{country_code}{a}")
}

/// Resolves the most reliable endpoint for a phone number.
///
/// 1. First structural match in the conversation list — the conversation
///    object when it carries a known delivery address, its bare id otherwise.
/// 2. Directory lookup of the phone-derived id; the internal (`lid`)
///    identifier wins when present.
/// 3. Synthesized default: digits plus the conventional suffix.
///
/// Returns `None` only when the owner key carries no digits at all (the
/// manual/no-phone pseudo-owner).
pub async fn resolve(
    client: &dyn MessagingClient,
    phone: &str,
    country_code: &str,
) -> Result<Option<Recipient>> {
    let digits = digits_only(phone);
    if digits.is_empty() {
        return Ok(None);
    }

    match client.list_conversations().await {
        Ok(conversations) => {
            for endpoint in conversations {
                if phone_matches(&digits, &endpoint_digits(&endpoint.id), country_code) {
                    debug!("Resolved {digits} via conversation {}", endpoint.id);
                    if endpoint.delivery_address.is_some() {
                        return Ok(Some(Recipient::Conversation(endpoint)));
                    }
                    return Ok(Some(Recipient::Address(endpoint.id)));
                }
            }
        }
        Err(e) => warn!("Conversation listing failed during resolution: {e}"),
    }

    let phone_id = format!("{digits}{DEFAULT_ADDRESS_SUFFIX}");
    match client.lookup_directory(&[phone_id.clone()]).await {
        Ok(entries) => {
            if let Some(lid) = entries.into_iter().find_map(|entry| entry.lid) {
                debug!("Resolved {digits} via directory to {lid}");
                return Ok(Some(Recipient::Address(lid)));
            }
        }
        Err(e) => warn!("Directory lookup failed for {phone_id}: {e}"),
    }

    debug!("No match for {digits}; synthesizing {phone_id}");
    Ok(Some(Recipient::Address(phone_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::mock::MockClient;
    use crate::messaging::{DirectoryEntry, Endpoint};

    // ---- digit normalization ----

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("+1 (555) 123-4567"), "15551234567");
        assert_eq!(digits_only("manual"), "");
    }

    #[test]
    fn test_endpoint_digits_strips_suffix() {
        assert_eq!(endpoint_digits("15551234567@c.us"), "15551234567");
        assert_eq!(endpoint_digits("15551234567"), "15551234567");
    }

    #[test]
    fn test_phone_matches_with_and_without_country_prefix() {
        assert!(phone_matches("15551234567", "15551234567", "1"));
        assert!(phone_matches("5551234567", "15551234567", "1"));
        assert!(phone_matches("15551234567", "5551234567", "1"));
        assert!(!phone_matches("5551234567", "5559876543", "1"));
        assert!(!phone_matches("", "5551234567", "1"));
    }

    // ---- fallback chain ----

    #[tokio::test]
    async fn test_conversation_match_returns_object_with_internal_address() {
        let client = MockClient::new();
        client.add_conversation(Endpoint {
            id: "15551234567@c.us".to_string(),
            name: Some("Dana".to_string()),
            delivery_address: Some("88443322110099@lid".to_string()),
        });

        let resolved = resolve(&client, "555-123-4567", "1").await.unwrap();
        match resolved {
            Some(Recipient::Conversation(endpoint)) => {
                assert_eq!(
                    endpoint.delivery_address.as_deref(),
                    Some("88443322110099@lid")
                );
            }
            other => panic!("expected conversation object, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_conversation_without_address_returns_bare_id() {
        let client = MockClient::new();
        client.add_conversation(Endpoint {
            id: "15551234567@c.us".to_string(),
            name: None,
            delivery_address: None,
        });

        let resolved = resolve(&client, "5551234567", "1").await.unwrap();
        assert_eq!(
            resolved,
            Some(Recipient::Address("15551234567@c.us".to_string()))
        );
    }

    #[tokio::test]
    async fn test_directory_lookup_wins_over_synthesis() {
        let client = MockClient::new();
        client.set_directory_entry(
            "5551234567@c.us",
            DirectoryEntry {
                lid: Some("77665544332211@lid".to_string()),
                pn: Some("5551234567@c.us".to_string()),
            },
        );

        let resolved = resolve(&client, "5551234567", "1").await.unwrap();
        assert_eq!(
            resolved,
            Some(Recipient::Address("77665544332211@lid".to_string()))
        );
    }

    #[tokio::test]
    async fn test_synthesizes_default_address_as_last_resort() {
        let client = MockClient::new();
        let resolved = resolve(&client, "5551234567", "1").await.unwrap();
        assert_eq!(
            resolved,
            Some(Recipient::Address("5551234567@c.us".to_string()))
        );
    }

    #[tokio::test]
    async fn test_no_digits_resolves_to_none() {
        let client = MockClient::new();
        assert_eq!(resolve(&client, "manual", "1").await.unwrap(), None);
    }
}
