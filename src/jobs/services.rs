use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::{
    applications::{dto::ApplicationView, repo::ApplicationRepo},
    auth::extractors::Caller,
    db::{Store, StoreError},
    error::{AppError, AppResult},
    jobs::{
        dto::{hourly_cap, ClientJobDetail, ClientJobView, CreateJobRequest, JobView, UpdateJobRequest},
        repo::JobRepo,
        repo_types::{Job, JobUpdate, NewJob},
    },
    skills::repo::SkillRepo,
    storage::{delete_quietly, StorageClient},
    types::{JobStatus, Role},
};

fn parse<T: std::str::FromStr<Err = String>>(value: &str) -> AppResult<T> {
    value.parse().map_err(AppError::Validation)
}

fn parse_opt<T: std::str::FromStr<Err = String>>(value: Option<String>) -> AppResult<Option<T>> {
    value.as_deref().map(parse).transpose()
}

/// Dedupes `ids` and checks that every one names a stored skill.
async fn known_skills(store: &dyn Store, ids: &[i64]) -> AppResult<Vec<i64>> {
    let unique: Vec<i64> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let found = store.find_skills(&unique).await?;
    if found.len() != unique.len() {
        return Err(AppError::validation("Invalid skills"));
    }
    Ok(unique)
}

async fn view(store: &dyn Store, job: Job, application_id: Option<i64>) -> AppResult<JobView> {
    let skills = store.job_skills(job.id).await?;
    Ok(JobView::new(job, skills, application_id))
}

/// The caller's application to `job_id`, if the caller is a freelancer.
async fn own_application(store: &dyn Store, caller: Caller, job_id: i64) -> AppResult<Option<i64>> {
    if caller.role != Role::Freelancer {
        return Ok(None);
    }
    Ok(store.find_application_for(caller.id, job_id).await?.map(|a| a.id))
}

fn job_error(e: StoreError) -> AppError {
    match e {
        StoreError::NotFound => AppError::not_found("Job not found"),
        StoreError::StaleState(_) => AppError::validation("It is only possible to update/delete open jobs"),
        other => other.into(),
    }
}

async fn load_job(store: &dyn Store, id: i64) -> AppResult<Job> {
    store
        .find_job(id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))
}

// --- public listing ---

pub async fn list_open(store: &dyn Store, caller: Caller) -> AppResult<Vec<JobView>> {
    let jobs = store.list_jobs_by_status(JobStatus::Open).await?;
    let mut out = Vec::with_capacity(jobs.len());
    for job in jobs {
        let application_id = own_application(store, caller, job.id).await?;
        out.push(view(store, job, application_id).await?);
    }
    Ok(out)
}

/// Open jobs are visible to everyone; others only to the owning client and
/// to freelancers who applied.
pub async fn get_job(store: &dyn Store, caller: Caller, id: i64) -> AppResult<JobView> {
    let job = load_job(store, id).await?;
    let application_id = own_application(store, caller, job.id).await?;
    let visible = job.is_open() || job.client_id == caller.id || application_id.is_some();
    if !visible {
        return Err(AppError::not_found("Job not found"));
    }
    view(store, job, application_id).await
}

// --- client side ---

pub async fn create(store: &dyn Store, caller: Caller, req: CreateJobRequest) -> AppResult<i64> {
    caller.require(Role::Client, "Only clients can create jobs")?;
    let skill_ids = known_skills(store, req.skills.as_deref().unwrap_or_default()).await?;
    let new = NewJob {
        client_id: caller.id,
        title: req.title.trim().to_string(),
        description: req.description.trim().to_string(),
        job_type: parse(&req.job_type)?,
        rate: parse(&req.rate)?,
        amount: req
            .amount
            .ok_or_else(|| AppError::validation("Missing required fields: amount"))?,
        length: parse(&req.length)?,
        hours_per_week: parse(&req.hours_per_week)?,
    };
    let job = store.create_job(new, &skill_ids).await?;
    info!(job_id = job.id, client_id = caller.id, "job created");
    Ok(job.id)
}

pub async fn client_jobs(store: &dyn Store, caller: Caller) -> AppResult<Vec<ClientJobView>> {
    caller.require(Role::Client, "Only clients can view their jobs")?;
    let jobs = store.list_jobs_by_client(caller.id).await?;
    let mut out = Vec::with_capacity(jobs.len());
    for job in jobs {
        let application_count = store.count_applications_by_job(job.id).await?;
        out.push(ClientJobView {
            job: view(store, job, None).await?,
            application_count,
        });
    }
    Ok(out)
}

pub async fn client_job(store: &dyn Store, caller: Caller, id: i64) -> AppResult<ClientJobDetail> {
    caller.require(Role::Client, "Only clients can view their jobs")?;
    let job = match store.find_job(id).await? {
        Some(job) if job.client_id == caller.id => job,
        _ => return Err(AppError::not_found("Job not found")),
    };
    let mut applications = Vec::new();
    for app in store.list_applications_by_job(job.id).await? {
        let attachment = store.attachment_for_application(app.id).await?;
        applications.push(ApplicationView::new(app, attachment));
    }
    Ok(ClientJobDetail {
        job: view(store, job, None).await?,
        applications,
    })
}

/// Checks run in a fixed order: exists, open, owned.
async fn editable_job(store: &dyn Store, caller: Caller, id: i64) -> AppResult<Job> {
    caller.require(Role::Client, "Only clients can manage jobs")?;
    let job = load_job(store, id).await?;
    if !job.is_open() {
        return Err(AppError::validation("It is only possible to update/delete open jobs"));
    }
    if job.client_id != caller.id {
        warn!(job_id = id, user_id = caller.id, "job change by non-owner");
        return Err(AppError::forbidden("You can only modify your own jobs"));
    }
    Ok(job)
}

pub async fn update_client_job(
    store: &dyn Store,
    caller: Caller,
    id: i64,
    req: UpdateJobRequest,
) -> AppResult<JobView> {
    let current = editable_job(store, caller, id).await?;
    let update = JobUpdate {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description.map(|d| d.trim().to_string()),
        job_type: parse_opt(req.job_type)?,
        rate: parse_opt(req.rate)?,
        amount: req.amount,
        length: parse_opt(req.length)?,
        hours_per_week: parse_opt(req.hours_per_week)?,
    };
    hourly_cap(
        update.rate.unwrap_or(current.rate),
        update.amount.unwrap_or(current.amount),
    )
    .map_err(|e| AppError::validation(e.message.map(|m| m.to_string()).unwrap_or_default()))?;

    let skill_ids = match req.skills {
        Some(ids) => Some(known_skills(store, &ids).await?),
        None => None,
    };
    let job = store
        .update_open_job(id, update, skill_ids.as_deref())
        .await
        .map_err(job_error)?;
    info!(job_id = id, "job updated");
    view(store, job, None).await
}

pub async fn delete_client_job(
    store: &dyn Store,
    storage: &dyn StorageClient,
    caller: Caller,
    id: i64,
) -> AppResult<()> {
    editable_job(store, caller, id).await?;
    let keys = store.attachment_keys_for_job(id).await?;
    store.delete_open_job(id).await.map_err(job_error)?;
    delete_quietly(storage, &keys).await;
    info!(job_id = id, files = keys.len(), "job deleted");
    Ok(())
}

// --- freelancer side ---

pub async fn freelancer_jobs(store: &dyn Store, caller: Caller) -> AppResult<Vec<JobView>> {
    caller.require(Role::Freelancer, "Only freelancers can view their jobs")?;
    let jobs = store.list_jobs_by_freelancer(caller.id).await?;
    let mut out = Vec::with_capacity(jobs.len());
    for job in jobs {
        let application_id = own_application(store, caller, job.id).await?;
        out.push(view(store, job, application_id).await?);
    }
    Ok(out)
}

pub async fn freelancer_job(store: &dyn Store, caller: Caller, id: i64) -> AppResult<JobView> {
    caller.require(Role::Freelancer, "Only freelancers can view their jobs")?;
    let job = match store.find_job(id).await? {
        Some(job) if job.freelancer_id == Some(caller.id) => job,
        _ => return Err(AppError::not_found("Job not found")),
    };
    let application_id = own_application(store, caller, job.id).await?;
    view(store, job, application_id).await
}

// --- admin ---

pub async fn admin_delete_job(store: &dyn Store, storage: &dyn StorageClient, id: i64) -> AppResult<()> {
    let keys = store.attachment_keys_for_job(id).await?;
    store.delete_job(id).await.map_err(job_error)?;
    delete_quietly(storage, &keys).await;
    info!(job_id = id, "job deleted by admin");
    Ok(())
}
