use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    applications::{
        dto::{ApplicationView, ChangeStatusRequest, SubmitApplicationRequest, UpdateApplicationRequest},
        repo::ApplicationRepo,
        repo_types::{Application, Attachment, NewAttachment},
    },
    auth::extractors::Caller,
    db::{Store, StoreError},
    error::{AppError, AppResult},
    jobs::repo::JobRepo,
    storage::{delete_quietly, StorageClient},
    types::{ApplicationStatus, Role},
};

pub const DEFAULT_REJECTION_REASON: &str = "Your application was rejected.";
pub const AUTO_REJECTION_REASON: &str =
    "Your application was automatically rejected because another application was accepted.";

const PDF_MAGIC: &[u8] = b"%PDF";
const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A decoded PDF that passed the content checks but is not stored yet.
#[derive(Debug)]
pub struct PdfUpload {
    pub file_name: String,
    pub body: Bytes,
}

/// Decodes and checks an uploaded file. Accepts plain base64 or a data URL.
pub fn decode_pdf(file_name: &str, encoded: &str, max_bytes: usize) -> AppResult<PdfUpload> {
    let encoded = encoded
        .split_once(";base64,")
        .map(|(_, data)| data)
        .unwrap_or(encoded)
        .trim();
    let body = STANDARD
        .decode(encoded)
        .map_err(|_| AppError::validation("Invalid file encoding"))?;
    if body.len() > max_bytes {
        return Err(AppError::validation("File is too large"));
    }
    if !body.starts_with(PDF_MAGIC) {
        return Err(AppError::validation("Invalid PDF file content"));
    }
    Ok(PdfUpload {
        file_name: file_name.trim().to_string(),
        body: Bytes::from(body),
    })
}

fn decode_optional(
    file_name: Option<&str>,
    encoded: Option<&str>,
    max_bytes: usize,
) -> AppResult<Option<PdfUpload>> {
    match (file_name, encoded) {
        (Some(name), Some(data)) => decode_pdf(name, data, max_bytes).map(Some),
        (None, None) => Ok(None),
        _ => Err(AppError::validation("File name and file content must be provided together")),
    }
}

fn storage_key(application_id: i64) -> String {
    format!("applications/{application_id}/{}.pdf", Uuid::new_v4())
}

/// Puts the file under a fresh key and returns the key.
async fn upload_object(storage: &dyn StorageClient, application_id: i64, body: Bytes) -> AppResult<String> {
    let key = storage_key(application_id);
    storage
        .put_object(&key, body, PDF_CONTENT_TYPE)
        .await
        .map_err(|e| {
            error!(error = %e, application_id, "attachment upload failed");
            AppError::Internal(e)
        })?;
    Ok(key)
}

/// Uploads the file, then records it. The object is removed again if the row
/// cannot be written.
async fn store_attachment(
    store: &dyn Store,
    storage: &dyn StorageClient,
    application_id: i64,
    upload: PdfUpload,
) -> AppResult<Attachment> {
    let key = upload_object(storage, application_id, upload.body).await?;
    match store.create_attachment(application_id, &upload.file_name, &key).await {
        Ok(attachment) => Ok(attachment),
        Err(e) => {
            delete_quietly(storage, std::slice::from_ref(&key)).await;
            Err(e.into())
        }
    }
}

async fn with_attachment(store: &dyn Store, app: Application) -> AppResult<ApplicationView> {
    let attachment = store.attachment_for_application(app.id).await?;
    Ok(ApplicationView::new(app, attachment))
}

fn application_error(e: StoreError) -> AppError {
    match e {
        StoreError::NotFound => AppError::not_found("Application not found"),
        StoreError::StaleState(_) => AppError::validation("Only pending applications can be updated/deleted"),
        other => other.into(),
    }
}

/// Loads an application of the caller: 404 if absent, 403 if someone else's.
async fn own_application(store: &dyn Store, caller: Caller, id: i64) -> AppResult<Application> {
    let app = store
        .find_application(id)
        .await?
        .ok_or_else(|| AppError::not_found("Application not found"))?;
    if app.user_id != caller.id {
        warn!(application_id = id, user_id = caller.id, "access to foreign application");
        return Err(AppError::forbidden("You can only access your own applications"));
    }
    Ok(app)
}

// --- freelancer side ---

pub async fn submit(
    store: &dyn Store,
    storage: &dyn StorageClient,
    caller: Caller,
    req: SubmitApplicationRequest,
    max_bytes: usize,
) -> AppResult<i64> {
    let job_id = req
        .job_id
        .ok_or_else(|| AppError::validation("Missing required fields: job_id"))?;
    let job = store
        .find_job(job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    if !job.is_open() {
        return Err(AppError::validation("Job is not open for applications"));
    }
    caller.require(Role::Freelancer, "Only freelancers can apply for jobs")?;
    if store.find_application_for(caller.id, job_id).await?.is_some() {
        return Err(AppError::conflict("You have already applied for this job"));
    }

    // content checks happen before anything is written
    let upload = decode_optional(req.file_name.as_deref(), req.file_base64.as_deref(), max_bytes)?;

    let app = store
        .create_application(caller.id, job_id, req.description.trim())
        .await
        .map_err(|e| match e {
            StoreError::StaleState(_) => AppError::validation("Job is not open for applications"),
            StoreError::Conflict(_) => AppError::conflict("You have already applied for this job"),
            other => other.into(),
        })?;

    if let Some(upload) = upload {
        if let Err(e) = store_attachment(store, storage, app.id, upload).await {
            // leave no application behind without its file
            if let Err(cleanup) = store.delete_pending_application(app.id).await {
                error!(error = %cleanup, application_id = app.id, "rollback of application failed");
            }
            return Err(e);
        }
    }

    info!(application_id = app.id, job_id, user_id = caller.id, "application submitted");
    Ok(app.id)
}

pub async fn list_mine(store: &dyn Store, caller: Caller) -> AppResult<Vec<ApplicationView>> {
    caller.require(Role::Freelancer, "Only freelancers have applications")?;
    let apps = store.list_applications_by_user(caller.id).await?;
    let mut out = Vec::with_capacity(apps.len());
    for app in apps {
        out.push(with_attachment(store, app).await?);
    }
    Ok(out)
}

pub async fn get_mine(store: &dyn Store, caller: Caller, id: i64) -> AppResult<ApplicationView> {
    caller.require(Role::Freelancer, "Only freelancers have applications")?;
    match store.find_application(id).await? {
        Some(app) if app.user_id == caller.id => with_attachment(store, app).await,
        _ => Err(AppError::not_found("Application not found")),
    }
}

/// Edits a pending application. A new file is uploaded before any row
/// changes, and the replaced object is deleted only after the swap commits.
pub async fn update(
    store: &dyn Store,
    storage: &dyn StorageClient,
    caller: Caller,
    id: i64,
    req: UpdateApplicationRequest,
    max_bytes: usize,
) -> AppResult<ApplicationView> {
    caller.require(Role::Freelancer, "Only freelancers can update applications")?;
    let app = own_application(store, caller, id).await?;
    if app.status != ApplicationStatus::Pending {
        return Err(AppError::validation("Only pending applications can be updated/deleted"));
    }
    let upload = decode_optional(req.file_name.as_deref(), req.file_base64.as_deref(), max_bytes)?;

    let stored = match upload {
        Some(upload) => Some((upload_object(storage, id, upload.body).await?, upload.file_name)),
        None => None,
    };
    let file = stored.as_ref().map(|(key, file_name)| NewAttachment {
        file_name: file_name.as_str(),
        storage_key: key.as_str(),
    });

    let description = req.description.map(|d| d.trim().to_string());
    let revision = match store.update_pending_application(id, description, file).await {
        Ok(revision) => revision,
        Err(e) => {
            if let Some((key, _)) = stored {
                delete_quietly(storage, &[key]).await;
            }
            return Err(application_error(e));
        }
    };
    if let Some(old) = revision.replaced {
        delete_quietly(storage, &[old.storage_key]).await;
    }

    info!(application_id = id, "application updated");
    with_attachment(store, revision.application).await
}

/// Deletes a pending application. The store decides whether it is still
/// pending; its file is removed only once the row is gone.
pub async fn delete(store: &dyn Store, storage: &dyn StorageClient, caller: Caller, id: i64) -> AppResult<()> {
    caller.require(Role::Freelancer, "Only freelancers can delete applications")?;
    own_application(store, caller, id).await?;
    let attachment = store.attachment_for_application(id).await?;
    store.delete_pending_application(id).await.map_err(application_error)?;
    if let Some(attachment) = attachment {
        delete_quietly(storage, &[attachment.storage_key]).await;
    }
    info!(application_id = id, "application deleted");
    Ok(())
}

// --- client side ---

/// Accepts or rejects a pending application on one of the caller's open jobs.
pub async fn change_status(store: &dyn Store, caller: Caller, id: i64, req: ChangeStatusRequest) -> AppResult<()> {
    caller.require(Role::Client, "Only clients can change application status")?;
    let app = store
        .find_application(id)
        .await?
        .ok_or_else(|| AppError::not_found("Application not found"))?;
    let job = store
        .find_job(app.job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    if job.client_id != caller.id {
        warn!(application_id = id, user_id = caller.id, "status change on foreign job");
        return Err(AppError::forbidden("You can only manage applications to your own jobs"));
    }
    if !job.is_open() {
        return Err(AppError::forbidden("Job is not open for applications"));
    }
    if app.status != ApplicationStatus::Pending {
        return Err(AppError::validation("Only pending applications can be updated"));
    }

    let decision: ApplicationStatus = req.status.parse().map_err(AppError::Validation)?;
    match decision {
        ApplicationStatus::Accepted => {
            let outcome = store.accept_application(id, AUTO_REJECTION_REASON).await?;
            info!(
                application_id = id,
                job_id = outcome.job.id,
                freelancer_id = ?outcome.job.freelancer_id,
                auto_rejected = outcome.auto_rejected.len(),
                "application accepted"
            );
        }
        ApplicationStatus::Rejected => {
            let reason = req
                .rejection_reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
            store.reject_application(id, &reason).await?;
            info!(application_id = id, "application rejected");
        }
        ApplicationStatus::Pending => {
            return Err(AppError::validation("Status must be accepted or rejected"));
        }
    }
    Ok(())
}

// --- downloads ---

/// Attachment bytes with the name to offer the client.
#[derive(Debug)]
pub struct Download {
    pub file_name: String,
    pub body: Bytes,
}

pub async fn download_attachment(
    store: &dyn Store,
    storage: &dyn StorageClient,
    caller: Caller,
    id: i64,
) -> AppResult<Download> {
    let attachment = store
        .find_attachment(id)
        .await?
        .ok_or_else(|| AppError::not_found("Attachment not found"))?;
    let app = store
        .find_application(attachment.application_id)
        .await?
        .ok_or_else(|| AppError::not_found("Attachment not found"))?;

    let allowed = match caller.role {
        Role::Admin => true,
        Role::Freelancer => app.user_id == caller.id,
        Role::Client => store
            .find_job(app.job_id)
            .await?
            .map(|job| job.client_id == caller.id)
            .unwrap_or(false),
    };
    if !allowed {
        warn!(attachment_id = id, user_id = caller.id, "attachment download denied");
        return Err(AppError::forbidden("You do not have access to this file"));
    }

    let body = storage
        .get_object(&attachment.storage_key)
        .await?
        .ok_or_else(|| AppError::not_found("File not found"))?;
    Ok(Download {
        file_name: attachment.file_name,
        body,
    })
}
