//! Typed response envelopes, one shape per call kind.
//!
//! The transport client never fails on a non-success HTTP status; it encodes
//! the outcome here (status, raw body, decoded error details) and lets the
//! caller decide. Only transport faults and undecodable success bodies
//! surface as errors.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::models::{File, Folder, ItemKind};

/// Vendor error payload decoded from `{"error": {"code", "message"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Bare status/content result: delete, restore, blob upload, download.
#[derive(Debug)]
pub struct StatusEnvelope {
    pub status: StatusCode,
    pub content: String,
    pub error: Option<ErrorDetails>,
}

/// One page of a list call, partitioned by the `type` discriminator.
#[derive(Debug, Default)]
pub struct ItemsPage<L> {
    pub files: Vec<File>,
    pub folders: Vec<Folder>,
    pub links: L,
}

/// Result of a list call. `page` is populated only on HTTP 200.
#[derive(Debug)]
pub struct ListEnvelope<L> {
    pub status: StatusCode,
    pub content: String,
    pub error: Option<ErrorDetails>,
    pub page: Option<ItemsPage<L>>,
}

/// Result of a single-entity GET. `instance` is populated only on HTTP 200.
#[derive(Debug)]
pub struct SingleEnvelope<T> {
    pub status: StatusCode,
    pub content: String,
    pub error: Option<ErrorDetails>,
    pub instance: Option<T>,
}

/// Result of a POST. `created` is populated on success when the server sent
/// a body; trigger-style endpoints legitimately send none.
#[derive(Debug)]
pub struct CreateEnvelope<T> {
    pub status: StatusCode,
    pub content: String,
    pub error: Option<ErrorDetails>,
    pub created: Option<T>,
}

/// Result of a PATCH. `updated` is populated only on HTTP 200.
#[derive(Debug)]
pub struct UpdateEnvelope<T> {
    pub status: StatusCode,
    pub content: String,
    pub error: Option<ErrorDetails>,
    pub updated: Option<T>,
}

/// Decode the `error` object if the body carries one. A body without one
/// (or without valid JSON at all) yields `None`, never a failure.
pub fn parse_error(body: &str) -> Option<ErrorDetails> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?.clone();
    serde_json::from_value(error).ok()
}

/// Extract the value of the single top-level property of `body`, whatever
/// that property is called. Creation endpoints wrap the new entity in a
/// container keyed by entity type; this is the unwrap-by-position contract.
pub fn unwrap_single_property<T: DeserializeOwned>(
    body: &str,
) -> Result<Option<T>, serde_json::Error> {
    let value: Value = serde_json::from_str(body)?;
    let Some(inner) = value.as_object().and_then(|obj| obj.values().next()) else {
        return Ok(None);
    };
    serde_json::from_value(inner.clone()).map(Some)
}

/// Partition raw list items into files and folders by their `type` field.
/// Items of an unrecognized type are dropped. Items of a known type that do
/// not decode are dropped too, with a warning.
pub fn split_items(items: &[Value]) -> (Vec<File>, Vec<Folder>) {
    let mut files = Vec::new();
    let mut folders = Vec::new();
    for item in items {
        let kind = item
            .get("type")
            .and_then(|v| serde_json::from_value::<ItemKind>(v.clone()).ok())
            .unwrap_or(ItemKind::Unknown);
        match kind {
            ItemKind::File => match serde_json::from_value::<File>(item.clone()) {
                Ok(file) => files.push(file),
                Err(err) => tracing::warn!(%err, "skipping undecodable file item"),
            },
            ItemKind::Folder => match serde_json::from_value::<Folder>(item.clone()) {
                Ok(folder) => folders.push(folder),
                Err(err) => tracing::warn!(%err, "skipping undecodable folder item"),
            },
            ItemKind::Unknown => {}
        }
    }
    (files, folders)
}

/// Parse a 200 list body: the `items` array partitioned by type, plus the
/// `_links` object decoded into the caller's link-set shape. A missing
/// `_links` object falls back to the link-set's default (all absent).
pub fn parse_page<L>(body: &str) -> Result<ItemsPage<L>, serde_json::Error>
where
    L: DeserializeOwned + Default,
{
    let value: Value = serde_json::from_str(body)?;
    let (files, folders) = match value.get("items").and_then(Value::as_array) {
        Some(items) => split_items(items),
        None => (Vec::new(), Vec::new()),
    };
    let links = match value.get("_links") {
        Some(links) => serde_json::from_value(links.clone())?,
        None => L::default(),
    };
    Ok(ItemsPage {
        files,
        folders,
        links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{PageLinks, TopLevelLinks};

    #[test]
    fn parse_error_reads_code_and_message() {
        let details =
            parse_error(r#"{"error": {"code": "FolderNotFound", "message": "gone"}}"#).unwrap();
        assert_eq!(details.code, "FolderNotFound");
        assert_eq!(details.message, "gone");
    }

    #[test]
    fn parse_error_tolerates_missing_or_malformed_error_object() {
        assert!(parse_error(r#"{"detail": "not the vendor shape"}"#).is_none());
        assert!(parse_error("plain text body").is_none());
        assert!(parse_error("").is_none());
        assert!(parse_error(r#"{"error": "just a string"}"#).is_none());
    }

    #[test]
    fn unwrap_single_property_ignores_the_property_name() {
        #[derive(Debug, Deserialize)]
        struct Entity {
            id: String,
        }

        let entity: Entity = unwrap_single_property(r#"{"folder": {"id": "abc"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(entity.id, "abc");

        let entity: Entity = unwrap_single_property(r#"{"anythingAtAll": {"id": "xyz"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(entity.id, "xyz");
    }

    #[test]
    fn unwrap_single_property_yields_none_for_empty_objects() {
        let entity: Option<Value> = unwrap_single_property("{}").unwrap();
        assert!(entity.is_none());
    }

    #[test]
    fn split_items_routes_by_type_and_drops_unknown() {
        let items = vec![
            serde_json::json!({"type": "file", "id": "f1", "displayName": "a.txt"}),
            serde_json::json!({"type": "folder", "id": "d1", "displayName": "sub"}),
            serde_json::json!({"type": "shortcut", "id": "s1", "displayName": "x"}),
            serde_json::json!({"id": "untyped", "displayName": "y"}),
        ];
        let (files, folders) = split_items(&items);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, "f1");
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].id, "d1");
    }

    #[test]
    fn parse_page_decodes_caller_chosen_link_set() {
        let body = r#"{
            "items": [],
            "_links": {
                "self": {"href": "https://api.test/storage?projectId=p"},
                "folder": {"href": "https://api.test/storage/folders/root"}
            }
        }"#;
        let page: ItemsPage<TopLevelLinks> = parse_page(body).unwrap();
        assert_eq!(
            page.links.folder.unwrap().href,
            "https://api.test/storage/folders/root"
        );

        let page: ItemsPage<PageLinks> = parse_page(body).unwrap();
        assert!(page.links.next.is_none());
    }

    #[test]
    fn parse_page_defaults_links_when_absent() {
        let page: ItemsPage<PageLinks> = parse_page(r#"{"items": []}"#).unwrap();
        assert!(page.links.current.is_none());
        assert!(page.files.is_empty() && page.folders.is_empty());
    }
}
