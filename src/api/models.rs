//! Entity and payload types for the Storage API.
//!
//! Everything here is camelCase on the wire. Folders and files share the
//! same base shape; the API tells them apart with a `type` discriminator on
//! list items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single named hyperlink as the API emits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

/// Cursor-style pagination links returned by list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLinks {
    #[serde(rename = "self")]
    pub current: Option<Link>,
    pub next: Option<Link>,
    pub prev: Option<Link>,
}

/// Link-set of the top-level listing. `folder` points at the root folder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopLevelLinks {
    #[serde(rename = "self")]
    pub current: Option<Link>,
    pub next: Option<Link>,
    pub prev: Option<Link>,
    pub folder: Option<Link>,
}

/// Related-entity links carried by folders and files under `_links`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLinks {
    pub created_by: Option<Link>,
    pub last_modified_by: Option<Link>,
    pub parent_folder: Option<Link>,
}

/// The `type` discriminator on raw list items. Values the client does not
/// know about decode to `Unknown` so the caller can drop them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    File,
    Folder,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub path: Option<String>,
    pub last_modified_by_display_name: Option<String>,
    pub created_date_time: Option<DateTime<Utc>>,
    pub last_modified_date_time: Option<DateTime<Utc>>,
    pub parent_folder_id: Option<String>,
    #[serde(rename = "_links")]
    pub links: Option<ItemLinks>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub path: Option<String>,
    pub size: Option<u64>,
    pub last_modified_by_display_name: Option<String>,
    pub created_date_time: Option<DateTime<Utc>>,
    pub last_modified_date_time: Option<DateTime<Utc>>,
    pub parent_folder_id: Option<String>,
    #[serde(rename = "_links")]
    pub links: Option<ItemLinks>,
}

/// Pre-signed upload handshake returned (wrapped) by the create-file and
/// update-content endpoints: PUT the bytes to `upload_url`, then POST
/// `complete_url` to confirm.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadLinks {
    pub upload_url: Link,
    pub complete_url: Link,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderCreate {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FolderCreate {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreate {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FileCreate {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_create_serializes_camel_case_without_nulls() {
        let payload = FolderCreate::new("Reports");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"displayName": "Reports"}));
    }

    #[test]
    fn folder_update_omits_unset_fields() {
        let payload = FolderUpdate::default();
        assert_eq!(serde_json::to_string(&payload).unwrap(), "{}");

        let payload = FolderUpdate {
            description: Some("notes".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"description": "notes"})
        );
    }

    #[test]
    fn item_kind_decodes_camel_case_strings() {
        let kind: ItemKind = serde_json::from_value(serde_json::json!("file")).unwrap();
        assert_eq!(kind, ItemKind::File);
        let kind: ItemKind = serde_json::from_value(serde_json::json!("folder")).unwrap();
        assert_eq!(kind, ItemKind::Folder);
        let kind: ItemKind = serde_json::from_value(serde_json::json!("shortcut")).unwrap();
        assert_eq!(kind, ItemKind::Unknown);
    }

    #[test]
    fn folder_decodes_entity_links() {
        let folder: Folder = serde_json::from_value(serde_json::json!({
            "id": "d1",
            "displayName": "sub",
            "parentFolderId": "root",
            "createdDateTime": "2024-03-01T10:00:00Z",
            "_links": {
                "parentFolder": {"href": "https://api.test/storage/folders/root"}
            }
        }))
        .unwrap();
        assert_eq!(folder.id, "d1");
        assert_eq!(folder.parent_folder_id.as_deref(), Some("root"));
        let links = folder.links.unwrap();
        assert_eq!(
            links.parent_folder.unwrap().href,
            "https://api.test/storage/folders/root"
        );
        assert!(links.created_by.is_none());
    }

    #[test]
    fn upload_links_decode_camel_case() {
        let links: FileUploadLinks = serde_json::from_value(serde_json::json!({
            "uploadUrl": {"href": "https://blob.test/1"},
            "completeUrl": {"href": "https://api.test/files/1/complete"}
        }))
        .unwrap();
        assert_eq!(links.upload_url.href, "https://blob.test/1");
        assert_eq!(links.complete_url.href, "https://api.test/files/1/complete");
    }
}
