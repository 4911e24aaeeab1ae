//! In-process store with the same contracts as the Postgres one. Used by the
//! test suites and for running the API without a database.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use axum::async_trait;
use time::OffsetDateTime;

use crate::{
    applications::{
        repo::ApplicationRepo,
        repo_types::{Acceptance, Application, Attachment, NewAttachment, Revision},
    },
    auth::{
        repo::{RefreshTokenRepo, UserRepo},
        repo_types::{NewUser, User, UserUpdate},
    },
    db::{StoreError, StoreResult},
    jobs::{
        repo::JobRepo,
        repo_types::{Job, JobUpdate, NewJob},
    },
    skills::{repo::SkillRepo, repo_types::Skill},
    types::{ApplicationStatus, JobStatus, Role},
    users::{
        repo::ProfileRepo,
        repo_types::{ClientData, ClientUpdate, FreelancerData, FreelancerUpdate},
    },
};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    users: BTreeMap<i64, User>,
    freelancers: BTreeMap<i64, FreelancerData>,
    clients: BTreeMap<i64, ClientData>,
    skills: BTreeMap<i64, Skill>,
    freelancer_skills: BTreeSet<(i64, i64)>,
    jobs: BTreeMap<i64, Job>,
    job_skills: BTreeSet<(i64, i64)>,
    applications: BTreeMap<i64, Application>,
    attachments: BTreeMap<i64, Attachment>,
    refresh_tokens: Vec<(i64, String)>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn ensure_profile_row(&mut self, user_id: i64, role: Role) {
        match role {
            Role::Freelancer => {
                self.freelancers.entry(user_id).or_insert(FreelancerData {
                    user_id,
                    title: None,
                    description: None,
                    hourly_rate: None,
                    hours_per_week: None,
                });
            }
            Role::Client => {
                self.clients.entry(user_id).or_insert(ClientData {
                    user_id,
                    description: None,
                    company_name: None,
                    industry: None,
                    location: None,
                });
            }
            Role::Admin => {}
        }
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn remove_application(&mut self, id: i64) {
        self.applications.remove(&id);
        self.attachments.retain(|_, a| a.application_id != id);
    }

    fn remove_job(&mut self, id: i64) {
        self.jobs.remove(&id);
        self.job_skills.retain(|(job_id, _)| *job_id != id);
        let apps: Vec<i64> = self
            .applications
            .values()
            .filter(|a| a.job_id == id)
            .map(|a| a.id)
            .collect();
        for app in apps {
            self.remove_application(app);
        }
    }

    fn skills_of(&self, links: &BTreeSet<(i64, i64)>, owner: i64) -> Vec<Skill> {
        let mut skills: Vec<Skill> = links
            .iter()
            .filter(|(o, _)| *o == owner)
            .filter_map(|(_, skill_id)| self.skills.get(skill_id).cloned())
            .collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    fn set_job_skills(&mut self, job_id: i64, skill_ids: &[i64]) {
        self.job_skills.retain(|(j, _)| *j != job_id);
        for skill_id in skill_ids {
            if self.skills.contains_key(skill_id) {
                self.job_skills.insert((job_id, *skill_id));
            }
        }
    }
}

fn newest_first(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    jobs
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut inner = self.lock();
        if inner.email_taken(&new.email, None) {
            return Err(StoreError::Conflict("users_email_key".into()));
        }
        let id = inner.next_id();
        let user = User {
            id,
            email: new.email,
            password_hash: new.password_hash,
            name: new.name,
            surname: new.surname,
            role: new.role,
            ban: false,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(id, user.clone());
        inner.ensure_profile_row(id, new.role);
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.lock().users.values().cloned().collect())
    }

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .filter(|u| u.role == role)
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> StoreResult<User> {
        let mut inner = self.lock();
        if let Some(email) = &update.email {
            if inner.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict("users_email_key".into()));
            }
        }
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(surname) = update.surname {
            user.surname = surname;
        }
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        Ok(user.clone())
    }

    async fn set_role_and_ban(&self, id: i64, role: Option<Role>, ban: Option<bool>) -> StoreResult<User> {
        let mut inner = self.lock();
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(role) = role {
            user.role = role;
        }
        if let Some(ban) = ban {
            user.ban = ban;
        }
        let user = user.clone();
        if let Some(role) = role {
            inner.ensure_profile_row(id, role);
        }
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.users.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        inner.freelancers.remove(&id);
        inner.clients.remove(&id);
        inner.freelancer_skills.retain(|(u, _)| *u != id);
        inner.refresh_tokens.retain(|(u, _)| *u != id);

        let owned_jobs: Vec<i64> = inner
            .jobs
            .values()
            .filter(|j| j.client_id == id)
            .map(|j| j.id)
            .collect();
        for job in owned_jobs {
            inner.remove_job(job);
        }
        let own_apps: Vec<i64> = inner
            .applications
            .values()
            .filter(|a| a.user_id == id)
            .map(|a| a.id)
            .collect();
        for app in own_apps {
            inner.remove_application(app);
        }
        for job in inner.jobs.values_mut() {
            if job.freelancer_id == Some(id) {
                job.freelancer_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepo for MemoryStore {
    async fn replace_refresh_tokens(&self, user_id: i64, token: &str) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.refresh_tokens.retain(|(u, _)| *u != user_id);
        inner.refresh_tokens.push((user_id, token.to_string()));
        Ok(())
    }

    async fn rotate_refresh_token(&self, user_id: i64, old: &str, new: &str) -> StoreResult<()> {
        let mut inner = self.lock();
        let pos = inner
            .refresh_tokens
            .iter()
            .position(|(u, t)| *u == user_id && t == old)
            .ok_or(StoreError::NotFound)?;
        inner.refresh_tokens[pos].1 = new.to_string();
        Ok(())
    }

    async fn delete_refresh_tokens(&self, user_id: i64) -> StoreResult<()> {
        self.lock().refresh_tokens.retain(|(u, _)| *u != user_id);
        Ok(())
    }
}

#[async_trait]
impl ProfileRepo for MemoryStore {
    async fn freelancer_data(&self, user_id: i64) -> StoreResult<Option<FreelancerData>> {
        Ok(self.lock().freelancers.get(&user_id).cloned())
    }

    async fn client_data(&self, user_id: i64) -> StoreResult<Option<ClientData>> {
        Ok(self.lock().clients.get(&user_id).cloned())
    }

    async fn update_freelancer_data(&self, user_id: i64, update: FreelancerUpdate) -> StoreResult<FreelancerData> {
        let mut inner = self.lock();
        let data = inner.freelancers.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        if update.title.is_some() {
            data.title = update.title;
        }
        if update.description.is_some() {
            data.description = update.description;
        }
        if update.hourly_rate.is_some() {
            data.hourly_rate = update.hourly_rate;
        }
        if update.hours_per_week.is_some() {
            data.hours_per_week = update.hours_per_week;
        }
        Ok(data.clone())
    }

    async fn update_client_data(&self, user_id: i64, update: ClientUpdate) -> StoreResult<ClientData> {
        let mut inner = self.lock();
        let data = inner.clients.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        if update.description.is_some() {
            data.description = update.description;
        }
        if update.company_name.is_some() {
            data.company_name = update.company_name;
        }
        if update.industry.is_some() {
            data.industry = update.industry;
        }
        if update.location.is_some() {
            data.location = update.location;
        }
        Ok(data.clone())
    }
}

#[async_trait]
impl SkillRepo for MemoryStore {
    async fn list_skills(&self) -> StoreResult<Vec<Skill>> {
        let mut skills: Vec<Skill> = self.lock().skills.values().cloned().collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(skills)
    }

    async fn find_skill(&self, id: i64) -> StoreResult<Option<Skill>> {
        Ok(self.lock().skills.get(&id).cloned())
    }

    async fn find_skills(&self, ids: &[i64]) -> StoreResult<Vec<Skill>> {
        let inner = self.lock();
        Ok(inner
            .skills
            .values()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn create_skill(&self, name: &str) -> StoreResult<Skill> {
        let mut inner = self.lock();
        if inner.skills.values().any(|s| s.name == name) {
            return Err(StoreError::Conflict("skills_name_key".into()));
        }
        let skill = Skill {
            id: inner.next_id(),
            name: name.to_string(),
        };
        inner.skills.insert(skill.id, skill.clone());
        Ok(skill)
    }

    async fn rename_skill(&self, id: i64, name: &str) -> StoreResult<Skill> {
        let mut inner = self.lock();
        if inner.skills.values().any(|s| s.name == name && s.id != id) {
            return Err(StoreError::Conflict("skills_name_key".into()));
        }
        let skill = inner.skills.get_mut(&id).ok_or(StoreError::NotFound)?;
        skill.name = name.to_string();
        Ok(skill.clone())
    }

    async fn delete_skill(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.skills.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        inner.freelancer_skills.retain(|(_, s)| *s != id);
        inner.job_skills.retain(|(_, s)| *s != id);
        Ok(())
    }

    async fn freelancer_skills(&self, user_id: i64) -> StoreResult<Vec<Skill>> {
        let inner = self.lock();
        Ok(inner.skills_of(&inner.freelancer_skills, user_id))
    }

    async fn add_freelancer_skill(&self, user_id: i64, skill_id: i64) -> StoreResult<bool> {
        let mut inner = self.lock();
        if !inner.freelancers.contains_key(&user_id) || !inner.skills.contains_key(&skill_id) {
            return Err(StoreError::NotFound);
        }
        Ok(inner.freelancer_skills.insert((user_id, skill_id)))
    }

    async fn remove_freelancer_skill(&self, user_id: i64, skill_id: i64) -> StoreResult<bool> {
        Ok(self.lock().freelancer_skills.remove(&(user_id, skill_id)))
    }
}

#[async_trait]
impl JobRepo for MemoryStore {
    async fn create_job(&self, new: NewJob, skill_ids: &[i64]) -> StoreResult<Job> {
        let mut inner = self.lock();
        let job = Job {
            id: inner.next_id(),
            client_id: new.client_id,
            freelancer_id: None,
            title: new.title,
            description: new.description,
            job_type: new.job_type,
            rate: new.rate,
            amount: new.amount,
            length: new.length,
            hours_per_week: new.hours_per_week,
            status: JobStatus::Open,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.jobs.insert(job.id, job.clone());
        inner.set_job_skills(job.id, skill_ids);
        Ok(job)
    }

    async fn find_job(&self, id: i64) -> StoreResult<Option<Job>> {
        Ok(self.lock().jobs.get(&id).cloned())
    }

    async fn list_jobs_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        let jobs = self
            .lock()
            .jobs
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect();
        Ok(newest_first(jobs))
    }

    async fn list_jobs_by_client(&self, client_id: i64) -> StoreResult<Vec<Job>> {
        let jobs = self
            .lock()
            .jobs
            .values()
            .filter(|j| j.client_id == client_id)
            .cloned()
            .collect();
        Ok(newest_first(jobs))
    }

    async fn list_jobs_by_freelancer(&self, freelancer_id: i64) -> StoreResult<Vec<Job>> {
        let jobs = self
            .lock()
            .jobs
            .values()
            .filter(|j| j.freelancer_id == Some(freelancer_id))
            .cloned()
            .collect();
        Ok(newest_first(jobs))
    }

    async fn update_open_job(&self, id: i64, update: JobUpdate, skill_ids: Option<&[i64]>) -> StoreResult<Job> {
        let mut inner = self.lock();
        let job = inner.jobs.get_mut(&id).ok_or(StoreError::NotFound)?;
        if !job.is_open() {
            return Err(StoreError::StaleState("job is no longer open".into()));
        }
        if let Some(title) = update.title {
            job.title = title;
        }
        if let Some(description) = update.description {
            job.description = description;
        }
        if let Some(job_type) = update.job_type {
            job.job_type = job_type;
        }
        if let Some(rate) = update.rate {
            job.rate = rate;
        }
        if let Some(amount) = update.amount {
            job.amount = amount;
        }
        if let Some(length) = update.length {
            job.length = length;
        }
        if let Some(hours) = update.hours_per_week {
            job.hours_per_week = hours;
        }
        let job = job.clone();
        if let Some(ids) = skill_ids {
            inner.set_job_skills(id, ids);
        }
        Ok(job)
    }

    async fn delete_open_job(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.lock();
        let job = inner.jobs.get(&id).ok_or(StoreError::NotFound)?;
        if !job.is_open() {
            return Err(StoreError::StaleState("job is no longer open".into()));
        }
        inner.remove_job(id);
        Ok(())
    }

    async fn delete_job(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.lock();
        if !inner.jobs.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        inner.remove_job(id);
        Ok(())
    }

    async fn job_skills(&self, job_id: i64) -> StoreResult<Vec<Skill>> {
        let inner = self.lock();
        Ok(inner.skills_of(&inner.job_skills, job_id))
    }
}

#[async_trait]
impl ApplicationRepo for MemoryStore {
    async fn create_application(&self, user_id: i64, job_id: i64, description: &str) -> StoreResult<Application> {
        let mut inner = self.lock();
        match inner.jobs.get(&job_id) {
            Some(job) if job.is_open() => {}
            _ => return Err(StoreError::StaleState("job is not open".into())),
        }
        if inner
            .applications
            .values()
            .any(|a| a.user_id == user_id && a.job_id == job_id)
        {
            return Err(StoreError::Conflict("applications_user_job_key".into()));
        }
        let app = Application {
            id: inner.next_id(),
            user_id,
            job_id,
            description: description.to_string(),
            status: ApplicationStatus::Pending,
            rejection_reason: None,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.applications.insert(app.id, app.clone());
        Ok(app)
    }

    async fn find_application(&self, id: i64) -> StoreResult<Option<Application>> {
        Ok(self.lock().applications.get(&id).cloned())
    }

    async fn find_application_for(&self, user_id: i64, job_id: i64) -> StoreResult<Option<Application>> {
        Ok(self
            .lock()
            .applications
            .values()
            .find(|a| a.user_id == user_id && a.job_id == job_id)
            .cloned())
    }

    async fn list_applications_by_user(&self, user_id: i64) -> StoreResult<Vec<Application>> {
        let mut apps: Vec<Application> = self
            .lock()
            .applications
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        apps.reverse();
        Ok(apps)
    }

    async fn list_applications_by_job(&self, job_id: i64) -> StoreResult<Vec<Application>> {
        Ok(self
            .lock()
            .applications
            .values()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn count_applications_by_job(&self, job_id: i64) -> StoreResult<i64> {
        Ok(self
            .lock()
            .applications
            .values()
            .filter(|a| a.job_id == job_id)
            .count() as i64)
    }

    async fn update_pending_application(
        &self,
        id: i64,
        description: Option<String>,
        attachment: Option<NewAttachment<'_>>,
    ) -> StoreResult<Revision> {
        let mut inner = self.lock();
        let app = inner.applications.get_mut(&id).ok_or(StoreError::NotFound)?;
        if app.status != ApplicationStatus::Pending {
            return Err(StoreError::StaleState("application is no longer pending".into()));
        }
        if let Some(description) = description {
            app.description = description;
        }
        let application = app.clone();

        let mut replaced = None;
        if let Some(new) = attachment {
            let previous = inner
                .attachments
                .values()
                .find(|a| a.application_id == id)
                .map(|a| a.id);
            replaced = previous.and_then(|old| inner.attachments.remove(&old));
            let attachment = Attachment {
                id: inner.next_id(),
                application_id: id,
                file_name: new.file_name.to_string(),
                storage_key: new.storage_key.to_string(),
                created_at: OffsetDateTime::now_utc(),
            };
            inner.attachments.insert(attachment.id, attachment);
        }
        Ok(Revision { application, replaced })
    }

    async fn delete_pending_application(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.lock();
        let app = inner.applications.get(&id).ok_or(StoreError::NotFound)?;
        if app.status != ApplicationStatus::Pending {
            return Err(StoreError::StaleState("application is no longer pending".into()));
        }
        inner.remove_application(id);
        Ok(())
    }

    async fn reject_application(&self, id: i64, reason: &str) -> StoreResult<Application> {
        let mut inner = self.lock();
        let app = inner.applications.get(&id).ok_or(StoreError::NotFound)?;
        let job_open = inner.jobs.get(&app.job_id).map(Job::is_open).unwrap_or(false);
        if app.status != ApplicationStatus::Pending || !job_open {
            return Err(StoreError::StaleState("application can no longer be rejected".into()));
        }
        let app = inner.applications.get_mut(&id).ok_or(StoreError::NotFound)?;
        app.status = ApplicationStatus::Rejected;
        app.rejection_reason = Some(reason.to_string());
        Ok(app.clone())
    }

    async fn accept_application(&self, id: i64, sibling_reason: &str) -> StoreResult<Acceptance> {
        let mut inner = self.lock();
        let app = inner.applications.get(&id).cloned().ok_or(StoreError::NotFound)?;
        let job_open = inner.jobs.get(&app.job_id).map(Job::is_open).unwrap_or(false);
        if !job_open {
            return Err(StoreError::StaleState("job is no longer open".into()));
        }
        if app.status != ApplicationStatus::Pending {
            return Err(StoreError::StaleState("application is no longer pending".into()));
        }

        let mut auto_rejected = Vec::new();
        for other in inner.applications.values_mut() {
            if other.job_id == app.job_id
                && other.id != id
                && other.status == ApplicationStatus::Pending
            {
                other.status = ApplicationStatus::Rejected;
                other.rejection_reason = Some(sibling_reason.to_string());
                auto_rejected.push(other.id);
            }
        }

        let accepted = inner.applications.get_mut(&id).ok_or(StoreError::NotFound)?;
        accepted.status = ApplicationStatus::Accepted;
        accepted.rejection_reason = None;
        let application = accepted.clone();

        let job = inner.jobs.get_mut(&app.job_id).ok_or(StoreError::NotFound)?;
        job.freelancer_id = Some(app.user_id);
        job.status = JobStatus::InProgress;
        let job = job.clone();

        Ok(Acceptance {
            application,
            job,
            auto_rejected,
        })
    }

    async fn find_attachment(&self, id: i64) -> StoreResult<Option<Attachment>> {
        Ok(self.lock().attachments.get(&id).cloned())
    }

    async fn attachment_for_application(&self, application_id: i64) -> StoreResult<Option<Attachment>> {
        Ok(self
            .lock()
            .attachments
            .values()
            .find(|a| a.application_id == application_id)
            .cloned())
    }

    async fn create_attachment(&self, application_id: i64, file_name: &str, storage_key: &str) -> StoreResult<Attachment> {
        let mut inner = self.lock();
        if !inner.applications.contains_key(&application_id) {
            return Err(StoreError::NotFound);
        }
        if inner
            .attachments
            .values()
            .any(|a| a.application_id == application_id)
        {
            return Err(StoreError::Conflict("attachments_application_id_key".into()));
        }
        let attachment = Attachment {
            id: inner.next_id(),
            application_id,
            file_name: file_name.to_string(),
            storage_key: storage_key.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        inner.attachments.insert(attachment.id, attachment.clone());
        Ok(attachment)
    }

    async fn attachment_keys_for_job(&self, job_id: i64) -> StoreResult<Vec<String>> {
        let inner = self.lock();
        Ok(inner
            .attachments
            .values()
            .filter(|at| {
                inner
                    .applications
                    .get(&at.application_id)
                    .map(|a| a.job_id == job_id)
                    .unwrap_or(false)
            })
            .map(|at| at.storage_key.clone())
            .collect())
    }

    async fn attachment_keys_for_user(&self, user_id: i64) -> StoreResult<Vec<String>> {
        let inner = self.lock();
        Ok(inner
            .attachments
            .values()
            .filter(|at| {
                inner
                    .applications
                    .get(&at.application_id)
                    .map(|a| {
                        a.user_id == user_id
                            || inner
                                .jobs
                                .get(&a.job_id)
                                .map(|j| j.client_id == user_id)
                                .unwrap_or(false)
                    })
                    .unwrap_or(false)
            })
            .map(|at| at.storage_key.clone())
            .collect())
    }
}
