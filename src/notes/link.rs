//! `[CARGO:<uuid>]` link tags inside repair ticket notes

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::codec;

static CARGO_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[CARGO:([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\]")
        .expect("valid cargo tag regex")
});

/// Literal tag for a cargo id
pub fn cargo_tag(cargo_id: Uuid) -> String {
    format!("[CARGO:{}]", cargo_id)
}

/// First well-formed cargo link in the clean body of `notes`
pub fn extract_cargo_link(notes: &str) -> Option<Uuid> {
    let body = codec::strip(notes);
    let link = CARGO_TAG
        .captures_iter(&body)
        .find_map(|caps| Uuid::parse_str(&caps[1]).ok());
    link
}

/// Point `notes` at `cargo_id`, replacing any existing link tags.
///
/// The tag always goes into the clean body; an embedded metadata line is
/// carried over unchanged.
pub fn with_cargo_link(notes: Option<&str>, cargo_id: Uuid) -> String {
    let decoded = codec::decode(notes.unwrap_or(""));
    let body = link_body(&decoded.clean_text, &cargo_tag(cargo_id));
    match decoded.metadata {
        Some(ref metadata) => codec::encode(&body, metadata),
        None => body,
    }
}

fn link_body(body: &str, tag: &str) -> String {
    if CARGO_TAG.is_match(body) {
        let mut replaced = false;
        CARGO_TAG
            .replace_all(body, |_: &regex::Captures| {
                if replaced {
                    String::new()
                } else {
                    replaced = true;
                    tag.to_string()
                }
            })
            .into_owned()
    } else if body.trim().is_empty() {
        tag.to_string()
    } else {
        format!("{} {}", body.trim_end(), tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "3f2b8c1e-9a4d-4e7f-b2c1-0d9e8f7a6b5c";

    #[test]
    fn test_extract() {
        let id = Uuid::parse_str(ID).unwrap();
        assert_eq!(extract_cargo_link(&format!("Screen broken [CARGO:{}] urgent", ID)), Some(id));
        assert_eq!(extract_cargo_link("no tag here"), None);
        assert_eq!(extract_cargo_link("[CARGO:not-a-uuid]"), None);
        assert_eq!(extract_cargo_link(&format!("[CARGO:{}]", ID.to_uppercase())), Some(id));
    }

    #[test]
    fn test_with_cargo_link_appends() {
        let id = Uuid::parse_str(ID).unwrap();
        assert_eq!(with_cargo_link(None, id), format!("[CARGO:{}]", ID));
        assert_eq!(with_cargo_link(Some("note "), id), format!("note [CARGO:{}]", ID));
    }

    #[test]
    fn test_with_cargo_link_replaces() {
        let old = Uuid::new_v4();
        let new = Uuid::parse_str(ID).unwrap();
        let notes = format!("a {} b {}", cargo_tag(old), cargo_tag(old));
        let linked = with_cargo_link(Some(&notes), new);
        assert_eq!(linked, format!("a [CARGO:{}] b ", ID));
        assert_eq!(extract_cargo_link(&linked), Some(new));
    }

    #[test]
    fn test_link_keeps_metadata_line() {
        use crate::models::repair_metadata::{HistoryEntry, RepairMetadata};

        let id = Uuid::parse_str(ID).unwrap();
        let mut metadata = RepairMetadata::started(RepairMetadata::ENTER_REPAIR_ACTION);
        metadata.technician = Some("Ayşe K.".to_string());
        metadata.append_history(HistoryEntry::new("parts ordered"));

        let linked = with_cargo_link(Some(&codec::encode("screen cracked", &metadata)), id);
        let decoded = codec::decode(&linked);
        assert_eq!(decoded.clean_text, format!("screen cracked [CARGO:{}]", ID));
        assert_eq!(decoded.metadata, Some(metadata));
        assert_eq!(extract_cargo_link(&linked), Some(id));
    }

    #[test]
    fn test_tag_inside_metadata_is_not_a_link() {
        use crate::models::repair_metadata::{HistoryEntry, RepairMetadata};

        let mut metadata = RepairMetadata::default();
        metadata.append_history(HistoryEntry::new("moved").with_note(Some(format!("was [CARGO:{}]", ID))));
        let text = codec::encode("no link in body", &metadata);
        assert_eq!(extract_cargo_link(&text), None);
    }
}
