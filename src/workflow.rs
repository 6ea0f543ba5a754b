//! Sequences storage operations against the API and tears down whatever it
//! created.
//!
//! The transport client reports every outcome in an envelope; this layer is
//! where an unexpected status becomes a halting error.

use std::path::{Path, PathBuf};

use reqwest::{Body, StatusCode};
use uuid::Uuid;

use crate::api::client::{ApiClient, ApiError};
use crate::api::envelope::{ErrorDetails, ItemsPage};
use crate::api::models::{
    File, FileCreate, FileUpdate, FileUploadLinks, Folder, FolderCreate, FolderUpdate, Link,
    PageLinks, TopLevelLinks,
};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Client(#[from] ApiError),
    #[error("{status}: {code} - {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("rate limited by the storage API; retry later")]
    Throttled,
    #[error("unexpected status {status}: {content}")]
    Unexpected {
        status: StatusCode,
        content: String,
    },
}

/// Map a non-success envelope into the halting error for this layer. 429
/// gets its own variant so callers can tell throttling from a hard failure.
fn unexpected(status: StatusCode, error: Option<ErrorDetails>, content: String) -> WorkflowError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return WorkflowError::Throttled;
    }
    match error {
        Some(details) => WorkflowError::Api {
            status,
            code: details.code,
            message: details.message,
        },
        None => WorkflowError::Unexpected { status, content },
    }
}

/// `$skip`/`$top` query fragment, empty when neither is set. Callers splice
/// it after an existing `?`-parameter or strip the leading `&`.
fn pagination_query(skip: Option<u32>, top: Option<u32>) -> String {
    let mut filter = String::new();
    if let Some(skip) = skip {
        filter.push_str(&format!("&$skip={skip}"));
    }
    if let Some(top) = top {
        filter.push_str(&format!("&$top={top}"));
    }
    filter
}

pub struct StorageWorkflow {
    client: ApiClient,
    project_id: String,
    created_folders: Vec<String>,
    created_files: Vec<String>,
    downloaded: Vec<PathBuf>,
}

impl StorageWorkflow {
    pub fn new(client: ApiClient, project_id: impl Into<String>) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            created_folders: Vec::new(),
            created_files: Vec::new(),
            downloaded: Vec::new(),
        }
    }

    /// Top-level files and folders; the link-set carries the root folder.
    pub async fn top_level_items(
        &self,
        skip: Option<u32>,
        top: Option<u32>,
    ) -> Result<ItemsPage<TopLevelLinks>, WorkflowError> {
        let path = format!(
            "/storage?projectId={}{}",
            self.project_id,
            pagination_query(skip, top)
        );
        let envelope = self.client.list::<TopLevelLinks>(&path, None).await?;
        if envelope.status != StatusCode::OK {
            return Err(unexpected(envelope.status, envelope.error, envelope.content));
        }
        let page = envelope.page.unwrap_or_default();
        tracing::info!(
            folders = page.folders.len(),
            files = page.files.len(),
            "retrieved top level items"
        );
        Ok(page)
    }

    pub async fn folder_items(
        &self,
        folder_id: &str,
        skip: Option<u32>,
        top: Option<u32>,
    ) -> Result<ItemsPage<PageLinks>, WorkflowError> {
        let filter = pagination_query(skip, top);
        let path = if filter.is_empty() {
            format!("/storage/folders/{folder_id}/list")
        } else {
            format!(
                "/storage/folders/{folder_id}/list?{}",
                filter.trim_start_matches('&')
            )
        };
        let envelope = self.client.list::<PageLinks>(&path, None).await?;
        if envelope.status != StatusCode::OK {
            return Err(unexpected(envelope.status, envelope.error, envelope.content));
        }
        let page = envelope.page.unwrap_or_default();
        tracing::info!(
            folder_id,
            folders = page.folders.len(),
            files = page.files.len(),
            "retrieved folder items"
        );
        Ok(page)
    }

    pub async fn recycle_bin_items(
        &self,
        skip: Option<u32>,
        top: Option<u32>,
    ) -> Result<ItemsPage<PageLinks>, WorkflowError> {
        let path = format!(
            "/storage/recycleBin?projectId={}{}",
            self.project_id,
            pagination_query(skip, top)
        );
        let envelope = self.client.list::<PageLinks>(&path, None).await?;
        if envelope.status != StatusCode::OK {
            return Err(unexpected(envelope.status, envelope.error, envelope.content));
        }
        let page = envelope.page.unwrap_or_default();
        tracing::info!(
            folders = page.folders.len(),
            files = page.files.len(),
            "retrieved recycle bin items"
        );
        Ok(page)
    }

    /// Follow a server-issued link to a single folder.
    pub async fn folder_from_link(&self, link: &Link) -> Result<Folder, WorkflowError> {
        let envelope = self
            .client
            .get_single::<Folder>(&link.href, "folder", None)
            .await?;
        if envelope.status != StatusCode::OK {
            return Err(unexpected(envelope.status, envelope.error, envelope.content));
        }
        envelope.instance.ok_or(WorkflowError::Unexpected {
            status: envelope.status,
            content: envelope.content,
        })
    }

    /// Follow a server-issued link to a single file.
    pub async fn file_from_link(&self, link: &Link) -> Result<File, WorkflowError> {
        let envelope = self
            .client
            .get_single::<File>(&link.href, "file", None)
            .await?;
        if envelope.status != StatusCode::OK {
            return Err(unexpected(envelope.status, envelope.error, envelope.content));
        }
        envelope.instance.ok_or(WorkflowError::Unexpected {
            status: envelope.status,
            content: envelope.content,
        })
    }

    /// Follow a pagination or navigation link to another listing page.
    pub async fn items_from_link(&self, link: &Link) -> Result<ItemsPage<PageLinks>, WorkflowError> {
        let envelope = self.client.list::<PageLinks>(&link.href, None).await?;
        if envelope.status != StatusCode::OK {
            return Err(unexpected(envelope.status, envelope.error, envelope.content));
        }
        Ok(envelope.page.unwrap_or_default())
    }

    pub async fn create_folder(
        &mut self,
        parent_folder_id: &str,
        payload: &FolderCreate,
    ) -> Result<Folder, WorkflowError> {
        let path = format!("/storage/folders/{parent_folder_id}/folders");
        let envelope = self.client.create::<_, Folder>(&path, payload, None).await?;
        if envelope.status != StatusCode::CREATED {
            return Err(unexpected(envelope.status, envelope.error, envelope.content));
        }
        let folder = envelope.created.ok_or(WorkflowError::Unexpected {
            status: envelope.status,
            content: envelope.content,
        })?;
        self.created_folders.push(folder.id.clone());
        tracing::info!(id = %folder.id, name = %folder.display_name, "created folder");
        Ok(folder)
    }

    /// Three-phase file creation: POST the metadata, PUT the bytes to the
    /// pre-signed URL, POST the completion link.
    pub async fn create_file(
        &mut self,
        parent_folder_id: &str,
        payload: &FileCreate,
        content: impl Into<Body>,
    ) -> Result<File, WorkflowError> {
        let path = format!("/storage/folders/{parent_folder_id}/files");
        let handshake = self
            .client
            .create::<_, FileUploadLinks>(&path, payload, None)
            .await?;
        if handshake.status != StatusCode::ACCEPTED {
            return Err(unexpected(
                handshake.status,
                handshake.error,
                handshake.content,
            ));
        }
        let links = handshake.created.ok_or(WorkflowError::Unexpected {
            status: handshake.status,
            content: handshake.content,
        })?;

        let file = self.finish_upload(&links, content).await?;
        self.created_files.push(file.id.clone());
        tracing::info!(id = %file.id, name = %file.display_name, "created file");
        Ok(file)
    }

    /// Replace a file's bytes through the same handshake as creation.
    pub async fn update_file_content(
        &self,
        file_id: &str,
        content: impl Into<Body>,
    ) -> Result<File, WorkflowError> {
        let path = format!("/storage/files/{file_id}/updateContent");
        let handshake = self.client.invoke::<FileUploadLinks>(&path, None).await?;
        if handshake.status != StatusCode::ACCEPTED {
            return Err(unexpected(
                handshake.status,
                handshake.error,
                handshake.content,
            ));
        }
        let links = handshake.created.ok_or(WorkflowError::Unexpected {
            status: handshake.status,
            content: handshake.content,
        })?;

        let file = self.finish_upload(&links, content).await?;
        tracing::info!(id = %file.id, "replaced file content");
        Ok(file)
    }

    /// Shared tail of the two upload handshakes.
    async fn finish_upload(
        &self,
        links: &FileUploadLinks,
        content: impl Into<Body>,
    ) -> Result<File, WorkflowError> {
        let upload = self
            .client
            .upload_blob(&links.upload_url.href, content)
            .await?;
        if upload.status != StatusCode::CREATED {
            return Err(WorkflowError::Unexpected {
                status: upload.status,
                content: upload.content,
            });
        }

        let confirm = self
            .client
            .invoke::<File>(&links.complete_url.href, None)
            .await?;
        if confirm.status != StatusCode::OK {
            return Err(unexpected(confirm.status, confirm.error, confirm.content));
        }
        confirm.created.ok_or(WorkflowError::Unexpected {
            status: confirm.status,
            content: confirm.content,
        })
    }

    pub async fn update_folder(
        &self,
        folder_id: &str,
        payload: &FolderUpdate,
    ) -> Result<Folder, WorkflowError> {
        let path = format!("/storage/folders/{folder_id}");
        let envelope = self.client.update::<_, Folder>(&path, payload, None).await?;
        if envelope.status != StatusCode::OK {
            return Err(unexpected(envelope.status, envelope.error, envelope.content));
        }
        envelope.updated.ok_or(WorkflowError::Unexpected {
            status: envelope.status,
            content: envelope.content,
        })
    }

    pub async fn update_file(
        &self,
        file_id: &str,
        payload: &FileUpdate,
    ) -> Result<File, WorkflowError> {
        let path = format!("/storage/files/{file_id}");
        let envelope = self.client.update::<_, File>(&path, payload, None).await?;
        if envelope.status != StatusCode::OK {
            return Err(unexpected(envelope.status, envelope.error, envelope.content));
        }
        envelope.updated.ok_or(WorkflowError::Unexpected {
            status: envelope.status,
            content: envelope.content,
        })
    }

    pub async fn download_file(&mut self, file_id: &str, dest: &Path) -> Result<(), WorkflowError> {
        let path = format!("/storage/files/{file_id}/download");
        let envelope = self.client.download(&path, dest, None).await?;
        if envelope.status != StatusCode::OK {
            return Err(WorkflowError::Unexpected {
                status: envelope.status,
                content: envelope.content,
            });
        }
        self.downloaded.push(dest.to_path_buf());
        tracing::info!(file_id, dest = %dest.display(), "downloaded file");
        Ok(())
    }

    pub async fn delete_folder(&self, folder_id: &str) -> Result<(), WorkflowError> {
        self.expect_deleted(format!("/storage/folders/{folder_id}"))
            .await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), WorkflowError> {
        self.expect_deleted(format!("/storage/files/{file_id}"))
            .await
    }

    /// Permanently remove a soft-deleted folder.
    pub async fn purge_folder(&self, folder_id: &str) -> Result<(), WorkflowError> {
        self.expect_deleted(format!("/storage/recycleBin/folders/{folder_id}"))
            .await
    }

    /// Permanently remove a soft-deleted file.
    pub async fn purge_file(&self, file_id: &str) -> Result<(), WorkflowError> {
        self.expect_deleted(format!("/storage/recycleBin/files/{file_id}"))
            .await
    }

    async fn expect_deleted(&self, path: String) -> Result<(), WorkflowError> {
        let envelope = self.client.delete(&path, None).await?;
        if envelope.status != StatusCode::NO_CONTENT {
            return Err(unexpected(envelope.status, envelope.error, envelope.content));
        }
        Ok(())
    }

    pub async fn restore_folder(&self, folder_id: &str) -> Result<(), WorkflowError> {
        self.expect_restored(format!("/storage/recycleBin/folders/{folder_id}/restore"))
            .await
    }

    pub async fn restore_file(&self, file_id: &str) -> Result<(), WorkflowError> {
        self.expect_restored(format!("/storage/recycleBin/files/{file_id}/restore"))
            .await
    }

    async fn expect_restored(&self, path: String) -> Result<(), WorkflowError> {
        let envelope = self.client.invoke_empty(&path, None).await?;
        if envelope.status != StatusCode::NO_CONTENT {
            return Err(unexpected(envelope.status, envelope.error, envelope.content));
        }
        Ok(())
    }

    /// Best-effort teardown of everything this workflow created: delete and
    /// purge recorded folders and files, remove downloaded local copies.
    /// Failures are collected and logged, never propagated.
    pub async fn cleanup(&mut self) -> Vec<String> {
        let mut problems = Vec::new();

        for id in std::mem::take(&mut self.created_folders) {
            if let Err(err) = self.delete_folder(&id).await {
                problems.push(format!("delete folder {id}: {err}"));
            }
            if let Err(err) = self.purge_folder(&id).await {
                problems.push(format!("purge folder {id}: {err}"));
            }
        }
        for id in std::mem::take(&mut self.created_files) {
            if let Err(err) = self.delete_file(&id).await {
                problems.push(format!("delete file {id}: {err}"));
            }
            if let Err(err) = self.purge_file(&id).await {
                problems.push(format!("purge file {id}: {err}"));
            }
        }
        for path in std::mem::take(&mut self.downloaded) {
            if path.exists() {
                if let Err(err) = tokio::fs::remove_file(&path).await {
                    problems.push(format!("remove local copy {}: {err}", path.display()));
                }
            }
        }

        for problem in &problems {
            tracing::warn!("cleanup step failed: {problem}");
        }
        problems
    }
}

/// The fixed demonstration sequence: list, create, upload, download, update,
/// delete, inspect the recycle bin, restore, then tear everything down.
pub async fn run_demo(client: ApiClient, project_id: &str, scratch_dir: &Path) -> anyhow::Result<()> {
    let mut workflow = StorageWorkflow::new(client, project_id);

    let top = workflow.top_level_items(None, None).await?;
    println!(
        "top level: {} folders, {} files",
        top.folders.len(),
        top.files.len()
    );

    let root_link = top
        .links
        .folder
        .ok_or_else(|| anyhow::anyhow!("top level listing carried no root folder link"))?;
    let root = workflow.folder_from_link(&root_link).await?;
    println!("root folder: {}", root.display_name);

    let result = demo_steps(&mut workflow, &root, scratch_dir).await;

    let problems = workflow.cleanup().await;
    if !problems.is_empty() {
        println!("cleanup finished with {} problem(s); see logs", problems.len());
    }
    result
}

async fn demo_steps(
    workflow: &mut StorageWorkflow,
    root: &Folder,
    scratch_dir: &Path,
) -> anyhow::Result<()> {
    let folder = workflow
        .create_folder(
            &root.id,
            &FolderCreate::new(format!("Test Folder - {}", Uuid::new_v4())),
        )
        .await?;
    println!("created folder {}", folder.display_name);

    let file = workflow
        .create_file(
            &root.id,
            &FileCreate::new(format!("Test File - {}.txt", Uuid::new_v4())),
            "test content",
        )
        .await?;
    println!("created file {}", file.display_name);

    let local_copy = scratch_dir.join(&file.display_name);
    workflow.download_file(&file.id, &local_copy).await?;
    println!("downloaded to {}", local_copy.display());

    let items = workflow.folder_items(&root.id, None, None).await?;
    println!(
        "root now holds {} folders, {} files",
        items.folders.len(),
        items.files.len()
    );

    let updated_folder = workflow
        .update_folder(
            &folder.id,
            &FolderUpdate {
                display_name: Some(format!("Test Folder update - {}", Uuid::new_v4())),
                description: Some("Updated description".into()),
            },
        )
        .await?;
    println!("renamed folder to {}", updated_folder.display_name);

    let updated_file = workflow
        .update_file(
            &file.id,
            &FileUpdate {
                display_name: Some(format!("Test file update - {}.txt", Uuid::new_v4())),
                description: Some("Updated description".into()),
            },
        )
        .await?;
    println!("renamed file to {}", updated_file.display_name);

    workflow.update_file_content(&file.id, "test content update").await?;
    println!("replaced file content");

    workflow.delete_folder(&folder.id).await?;
    workflow.delete_file(&file.id).await?;
    println!("moved folder and file to the recycle bin");

    let bin = workflow.recycle_bin_items(None, None).await?;
    println!(
        "recycle bin holds {} folders, {} files",
        bin.folders.len(),
        bin.files.len()
    );

    workflow.restore_folder(&folder.id).await?;
    workflow.restore_file(&file.id).await?;
    println!("restored folder and file");

    Ok(())
}
