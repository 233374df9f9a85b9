//! Tagged-line codec for repair metadata carried inside free-text notes.
//!
//! A notes field holds the human-readable body followed by at most one line
//! of the form `<<CARGOLINE_META>>{...json...}`. Lines that do not start with
//! the tag are the clean body and are preserved verbatim.

use crate::models::repair_metadata::RepairMetadata;

/// Reserved prefix of the metadata line
pub const METADATA_TAG: &str = "<<CARGOLINE_META>>";

/// Result of splitting a notes field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub clean_text: String,
    pub metadata: Option<RepairMetadata>,
}

/// Split `text` into its clean body and embedded metadata.
///
/// When several tag lines are present the last parsable one wins. A tag
/// line whose payload does not parse yields no metadata but is still
/// removed from the body.
pub fn decode(text: &str) -> Decoded {
    let mut clean = Vec::new();
    let mut metadata = None;

    for line in text.split('\n') {
        match line.strip_prefix(METADATA_TAG) {
            Some(payload) => match serde_json::from_str::<RepairMetadata>(payload.trim_end()) {
                Ok(parsed) => metadata = Some(parsed),
                Err(e) => tracing::debug!("Ignoring unparsable metadata line: {}", e),
            },
            None => clean.push(line),
        }
    }

    Decoded {
        clean_text: clean.join("\n"),
        metadata,
    }
}

/// Append `metadata` as a single tag line after the clean body.
///
/// Any tag line already present in `clean_text` is dropped first, so
/// re-encoding decoded text never duplicates the payload.
pub fn encode(clean_text: &str, metadata: &RepairMetadata) -> String {
    let body = decode(clean_text).clean_text;
    // serializing plain structs and enums cannot fail
    let payload = serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string());

    if body.is_empty() {
        format!("{}{}", METADATA_TAG, payload)
    } else {
        format!("{}\n{}{}", body, METADATA_TAG, payload)
    }
}

/// Return the clean body of `text`, borrowing when no tag line is present.
pub fn strip(text: &str) -> std::borrow::Cow<'_, str> {
    if text.contains(METADATA_TAG) {
        std::borrow::Cow::Owned(decode(text).clean_text)
    } else {
        std::borrow::Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::repair_metadata::{
        ApprovalState, HistoryEntry, MetadataStatus, RepairCosts, SparePart,
    };
    use rust_decimal::Decimal;

    fn sample() -> RepairMetadata {
        let mut m = RepairMetadata::started(RepairMetadata::ENTER_REPAIR_ACTION);
        m.technician = Some("Ayşe K.".to_string());
        m.operations = vec!["screen replacement".to_string(), "firmware update".to_string()];
        m.spare_parts = vec![SparePart {
            name: "LCD panel".to_string(),
            quantity: 1,
            unit_price: Some(Decimal::new(125000, 2)),
        }];
        m.costs = RepairCosts {
            labor: Decimal::new(30000, 2),
            parts: Decimal::new(125000, 2),
            total: Decimal::ZERO,
            currency: Some("TRY".to_string()),
        }
        .totaled();
        m.approval_state = ApprovalState::Approved;
        m.append_history(HistoryEntry::new("quote approved").with_note(Some("by phone".into())));
        m
    }

    #[test]
    fn test_round_trip() {
        let metadata = sample();
        let body = "Customer reports flicker.\nCall before delivery.";
        let decoded = decode(&encode(body, &metadata));
        assert_eq!(decoded.clean_text, body);
        assert_eq!(decoded.metadata, Some(metadata));
    }

    #[test]
    fn test_round_trip_empty_body() {
        let metadata = RepairMetadata::default();
        let encoded = encode("", &metadata);
        assert!(encoded.starts_with(METADATA_TAG));
        let decoded = decode(&encoded);
        assert_eq!(decoded.clean_text, "");
        assert_eq!(decoded.metadata, Some(metadata));
    }

    #[test]
    fn test_plain_text_preserved_byte_for_byte() {
        let text = "  line one \n\nline three\r\n<<not a tag\n";
        let decoded = decode(text);
        assert_eq!(decoded.clean_text, text);
        assert!(decoded.metadata.is_none());
        assert!(matches!(strip(text), std::borrow::Cow::Borrowed(_)));
    }

    #[test]
    fn test_reencode_does_not_duplicate() {
        let first = encode("body", &sample());
        let mut updated = decode(&first).metadata.unwrap();
        updated.status = MetadataStatus::Completed;
        let second = encode(&first, &updated);

        assert_eq!(second.matches(METADATA_TAG).count(), 1);
        assert_eq!(second.matches("body").count(), 1);
        assert_eq!(decode(&second).metadata.unwrap().status, MetadataStatus::Completed);
    }

    #[test]
    fn test_bad_payload_yields_no_metadata() {
        let decoded = decode("hello\n<<CARGOLINE_META>>{not json");
        assert_eq!(decoded.clean_text, "hello");
        assert!(decoded.metadata.is_none());
    }

    #[test]
    fn test_partial_payload_uses_defaults() {
        let decoded = decode("<<CARGOLINE_META>>{\"active\":true,\"status\":\"in_progress\"}");
        let m = decoded.metadata.unwrap();
        assert!(m.active);
        assert_eq!(m.status, MetadataStatus::InProgress);
        assert!(m.history.is_empty());
    }

    #[test]
    fn test_tag_between_body_lines() {
        let text = format!("a\n{}{{\"active\":true}}\nb", METADATA_TAG);
        let decoded = decode(&text);
        assert_eq!(decoded.clean_text, "a\nb");
        assert!(decoded.metadata.unwrap().active);
    }
}
