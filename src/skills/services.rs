use tracing::{info, warn};

use crate::{
    auth::extractors::Caller,
    db::{Store, StoreError},
    error::{AppError, AppResult},
    skills::{repo::SkillRepo, repo_types::Skill},
    types::Role,
};

fn skill_error(e: StoreError) -> AppError {
    match e {
        StoreError::NotFound => AppError::not_found("Skill not found"),
        StoreError::Conflict(_) => AppError::conflict("Skill already exists"),
        other => other.into(),
    }
}

pub async fn list(store: &dyn Store) -> AppResult<Vec<Skill>> {
    Ok(store.list_skills().await?)
}

pub async fn create(store: &dyn Store, name: &str) -> AppResult<Skill> {
    let skill = store.create_skill(name.trim()).await.map_err(skill_error)?;
    info!(skill_id = skill.id, name = %skill.name, "skill created");
    Ok(skill)
}

pub async fn rename(store: &dyn Store, id: i64, name: &str) -> AppResult<Skill> {
    let skill = store.rename_skill(id, name.trim()).await.map_err(skill_error)?;
    info!(skill_id = skill.id, name = %skill.name, "skill renamed");
    Ok(skill)
}

pub async fn delete(store: &dyn Store, id: i64) -> AppResult<()> {
    store.delete_skill(id).await.map_err(skill_error)?;
    info!(skill_id = id, "skill deleted");
    Ok(())
}

async fn existing_skill(store: &dyn Store, skill_id: i64) -> AppResult<Skill> {
    store
        .find_skill(skill_id)
        .await?
        .ok_or_else(|| AppError::not_found("Skill not found"))
}

/// Adds a skill to the caller's freelancer profile.
pub async fn attach(store: &dyn Store, caller: Caller, skill_id: i64) -> AppResult<Vec<Skill>> {
    caller.require(Role::Freelancer, "Only freelancers can manage skills")?;
    existing_skill(store, skill_id).await?;
    if !store.add_freelancer_skill(caller.id, skill_id).await.map_err(skill_error)? {
        warn!(user_id = caller.id, skill_id, "skill already attached");
        return Err(AppError::validation("Freelancer already has this skill"));
    }
    Ok(store.freelancer_skills(caller.id).await?)
}

pub async fn detach(store: &dyn Store, caller: Caller, skill_id: i64) -> AppResult<Vec<Skill>> {
    caller.require(Role::Freelancer, "Only freelancers can manage skills")?;
    existing_skill(store, skill_id).await?;
    if !store.remove_freelancer_skill(caller.id, skill_id).await? {
        return Err(AppError::validation("Freelancer does not have this skill"));
    }
    Ok(store.freelancer_skills(caller.id).await?)
}
