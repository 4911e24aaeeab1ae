use tracing::{info, warn};

use crate::{
    applications::repo::ApplicationRepo,
    auth::{
        extractors::Caller,
        password::{hash_password_async, verify_password_async},
        repo::UserRepo,
        repo_types::{User, UserUpdate},
    },
    db::{Store, StoreError},
    error::{AppError, AppResult},
    skills::repo::SkillRepo,
    storage::{delete_quietly, StorageClient},
    types::{HoursPerWeek, Role},
    users::{
        dto::{
            AdminUpdateUserRequest, AdminUserView, ClientProfile, ClientSummary, FreelancerProfile,
            FreelancerSummary, ProfileData, UpdateClientRequest, UpdateFreelancerRequest,
            UpdateUserRequest, UserView,
        },
        repo::ProfileRepo,
        repo_types::{ClientUpdate, FreelancerUpdate},
    },
};

async fn profile_of(store: &dyn Store, user: &User) -> AppResult<ProfileData> {
    let profile = match user.role {
        Role::Freelancer => match store.freelancer_data(user.id).await? {
            Some(data) => ProfileData::Freelancer(FreelancerProfile {
                title: data.title,
                description: data.description,
                hourly_rate: data.hourly_rate,
                hours_per_week: data.hours_per_week,
                skills: store.freelancer_skills(user.id).await?,
            }),
            None => ProfileData::None,
        },
        Role::Client => match store.client_data(user.id).await? {
            Some(data) => ProfileData::Client(ClientProfile {
                description: data.description,
                company_name: data.company_name,
                industry: data.industry,
                location: data.location,
            }),
            None => ProfileData::None,
        },
        Role::Admin => ProfileData::None,
    };
    Ok(profile)
}

pub async fn user_view(store: &dyn Store, user: User) -> AppResult<UserView> {
    let profile = profile_of(store, &user).await?;
    Ok(UserView {
        id: user.id,
        email: user.email,
        name: user.name,
        surname: user.surname,
        role: user.role,
        profile,
    })
}

async fn admin_view(store: &dyn Store, user: User) -> AppResult<AdminUserView> {
    let ban = user.ban;
    let created_at = user.created_at;
    Ok(AdminUserView {
        user: user_view(store, user).await?,
        ban,
        created_at,
    })
}

async fn load_user(store: &dyn Store, id: i64) -> AppResult<User> {
    store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn get_me(store: &dyn Store, caller: Caller) -> AppResult<UserView> {
    let user = load_user(store, caller.id).await?;
    user_view(store, user).await
}

pub async fn update_me(store: &dyn Store, caller: Caller, req: UpdateUserRequest) -> AppResult<UserView> {
    let user = load_user(store, caller.id).await?;
    let mut update = UserUpdate {
        name: req.name.map(|n| n.trim().to_string()),
        surname: req.surname.map(|s| s.trim().to_string()),
        ..UserUpdate::default()
    };

    if let Some(email) = req.email.map(|e| e.trim().to_lowercase()) {
        if email != user.email {
            if store.find_user_by_email(&email).await?.is_some() {
                return Err(AppError::conflict("Email already in use"));
            }
            update.email = Some(email);
        }
    }

    if let (Some(old), Some(new)) = (req.password, req.new_password) {
        if !verify_password_async(old, user.password_hash.clone()).await? {
            warn!(user_id = user.id, "password change with wrong current password");
            return Err(AppError::validation("Incorrect old password"));
        }
        update.password_hash = Some(hash_password_async(new).await?);
    }

    let updated = store
        .update_user(user.id, update)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::conflict("Email already in use"),
            other => other.into(),
        })?;
    info!(user_id = updated.id, "user updated");
    user_view(store, updated).await
}

/// Deletes the account with everything hanging off it, stored files included.
pub async fn delete_user_and_files(
    store: &dyn Store,
    storage: &dyn StorageClient,
    user_id: i64,
) -> AppResult<()> {
    let keys = store.attachment_keys_for_user(user_id).await?;
    store.delete_user(user_id).await.map_err(|e| match e {
        StoreError::NotFound => AppError::not_found("User not found"),
        other => other.into(),
    })?;
    delete_quietly(storage, &keys).await;
    info!(user_id, files = keys.len(), "user deleted");
    Ok(())
}

pub async fn update_freelancer_profile(
    store: &dyn Store,
    caller: Caller,
    req: UpdateFreelancerRequest,
) -> AppResult<UserView> {
    caller.require(Role::Freelancer, "Only freelancers can update freelancer data")?;
    let hours_per_week = req
        .hours_per_week
        .map(|h| h.parse::<HoursPerWeek>())
        .transpose()
        .map_err(AppError::Validation)?;
    store
        .update_freelancer_data(
            caller.id,
            FreelancerUpdate {
                title: req.title,
                description: req.description,
                hourly_rate: req.hourly_rate,
                hours_per_week,
            },
        )
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::not_found("Freelancer data not found"),
            other => other.into(),
        })?;
    info!(user_id = caller.id, "freelancer profile updated");
    get_me(store, caller).await
}

pub async fn update_client_profile(
    store: &dyn Store,
    caller: Caller,
    req: UpdateClientRequest,
) -> AppResult<UserView> {
    caller.require(Role::Client, "Only clients can update client data")?;
    store
        .update_client_data(
            caller.id,
            ClientUpdate {
                description: req.description,
                company_name: req.company_name,
                industry: req.industry,
                location: req.location,
            },
        )
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::not_found("Client data not found"),
            other => other.into(),
        })?;
    info!(user_id = caller.id, "client profile updated");
    get_me(store, caller).await
}

pub async fn list_freelancers(store: &dyn Store) -> AppResult<Vec<FreelancerSummary>> {
    let users = store.list_users_by_role(Role::Freelancer).await?;
    let mut out = Vec::with_capacity(users.len());
    for user in users {
        let Some(data) = store.freelancer_data(user.id).await? else {
            continue;
        };
        out.push(FreelancerSummary {
            id: user.id,
            name: user.name,
            surname: user.surname,
            title: data.title,
            hourly_rate: data.hourly_rate,
        });
    }
    Ok(out)
}

pub async fn get_freelancer(store: &dyn Store, id: i64) -> AppResult<UserView> {
    match store.find_user(id).await? {
        Some(user) if user.role == Role::Freelancer => user_view(store, user).await,
        _ => Err(AppError::not_found("Freelancer not found")),
    }
}

pub async fn list_clients(store: &dyn Store) -> AppResult<Vec<ClientSummary>> {
    let users = store.list_users_by_role(Role::Client).await?;
    let mut out = Vec::with_capacity(users.len());
    for user in users {
        let Some(data) = store.client_data(user.id).await? else {
            continue;
        };
        out.push(ClientSummary {
            id: user.id,
            name: user.name,
            surname: user.surname,
            company_name: data.company_name,
            industry: data.industry,
            location: data.location,
        });
    }
    Ok(out)
}

pub async fn get_client(store: &dyn Store, id: i64) -> AppResult<UserView> {
    match store.find_user(id).await? {
        Some(user) if user.role == Role::Client => user_view(store, user).await,
        _ => Err(AppError::not_found("Client not found")),
    }
}

pub async fn admin_list_users(store: &dyn Store) -> AppResult<Vec<AdminUserView>> {
    let users = store.list_users().await?;
    let mut out = Vec::with_capacity(users.len());
    for user in users {
        out.push(admin_view(store, user).await?);
    }
    Ok(out)
}

pub async fn admin_update_user(
    store: &dyn Store,
    id: i64,
    req: AdminUpdateUserRequest,
) -> AppResult<AdminUserView> {
    let role = req
        .role
        .map(|r| r.parse::<Role>())
        .transpose()
        .map_err(AppError::Validation)?;
    let user = store
        .set_role_and_ban(id, role, req.ban)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::not_found("User not found"),
            other => other.into(),
        })?;
    info!(user_id = user.id, role = %user.role, ban = user.ban, "user updated by admin");
    admin_view(store, user).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{password::hash_password, repo_types::NewUser},
        db::MemoryStore,
        storage::LocalStorage,
    };
    use bytes::Bytes;

    async fn seed(store: &MemoryStore, email: &str, role: Role) -> Caller {
        let user = store
            .create_user(NewUser {
                email: email.into(),
                password_hash: hash_password("Passw0rd!").unwrap(),
                name: "Sam".into(),
                surname: "Doe".into(),
                role,
            })
            .await
            .unwrap();
        Caller { id: user.id, role }
    }

    fn no_changes() -> UpdateUserRequest {
        UpdateUserRequest {
            email: None,
            name: None,
            surname: None,
            password: None,
            new_password: None,
        }
    }

    #[tokio::test]
    async fn profile_shape_follows_role() {
        let store = MemoryStore::default();
        let f = seed(&store, "f@x.com", Role::Freelancer).await;
        let c = seed(&store, "c@x.com", Role::Client).await;
        let a = seed(&store, "a@x.com", Role::Admin).await;

        assert!(matches!(get_me(&store, f).await.unwrap().profile, ProfileData::Freelancer(_)));
        assert!(matches!(get_me(&store, c).await.unwrap().profile, ProfileData::Client(_)));
        assert!(matches!(get_me(&store, a).await.unwrap().profile, ProfileData::None));
    }

    #[tokio::test]
    async fn email_change_to_taken_address_conflicts() {
        let store = MemoryStore::default();
        let f = seed(&store, "f@x.com", Role::Freelancer).await;
        seed(&store, "c@x.com", Role::Client).await;

        let req = UpdateUserRequest {
            email: Some("c@x.com".into()),
            ..no_changes()
        };
        assert!(matches!(update_me(&store, f, req).await, Err(AppError::Conflict(_))));

        // same address as before is not a change
        let req = UpdateUserRequest {
            email: Some("f@x.com".into()),
            ..no_changes()
        };
        assert!(update_me(&store, f, req).await.is_ok());
    }

    #[tokio::test]
    async fn password_change_requires_current_password() {
        let store = MemoryStore::default();
        let f = seed(&store, "f@x.com", Role::Freelancer).await;

        let wrong = UpdateUserRequest {
            password: Some("Wr0ngPass".into()),
            new_password: Some("N3wPassword".into()),
            ..no_changes()
        };
        match update_me(&store, f, wrong).await {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Incorrect old password"),
            other => panic!("unexpected {other:?}"),
        }

        let right = UpdateUserRequest {
            password: Some("Passw0rd!".into()),
            new_password: Some("N3wPassword".into()),
            ..no_changes()
        };
        update_me(&store, f, right).await.unwrap();
        let user = store.find_user(f.id).await.unwrap().unwrap();
        assert!(crate::auth::password::verify_password("N3wPassword", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn freelancer_profile_is_freelancer_only() {
        let store = MemoryStore::default();
        let c = seed(&store, "c@x.com", Role::Client).await;
        let f = seed(&store, "f@x.com", Role::Freelancer).await;
        let req = || UpdateFreelancerRequest {
            title: Some("Rust dev".into()),
            description: None,
            hourly_rate: Some(55.0),
            hours_per_week: Some("20-40".into()),
        };

        assert!(matches!(
            update_freelancer_profile(&store, c, req()).await,
            Err(AppError::Forbidden(_))
        ));
        let view = update_freelancer_profile(&store, f, req()).await.unwrap();
        match view.profile {
            ProfileData::Freelancer(p) => {
                assert_eq!(p.title.as_deref(), Some("Rust dev"));
                assert_eq!(p.hours_per_week, Some(HoursPerWeek::TwentyToForty));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn public_lookups_check_role() {
        let store = MemoryStore::default();
        let f = seed(&store, "f@x.com", Role::Freelancer).await;
        let c = seed(&store, "c@x.com", Role::Client).await;

        assert!(get_freelancer(&store, f.id).await.is_ok());
        assert!(matches!(get_freelancer(&store, c.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(get_client(&store, f.id).await, Err(AppError::NotFound(_))));
        assert_eq!(list_freelancers(&store).await.unwrap().len(), 1);
        assert_eq!(list_clients(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn admin_promotion_creates_profile_row() {
        let store = MemoryStore::default();
        let a = seed(&store, "a@x.com", Role::Admin).await;
        let view = admin_update_user(
            &store,
            a.id,
            AdminUpdateUserRequest {
                role: Some("client".into()),
                ban: Some(true),
            },
        )
        .await
        .unwrap();
        assert!(view.ban);
        assert!(matches!(view.user.profile, ProfileData::Client(_)));
    }

    #[tokio::test]
    async fn deleting_a_user_removes_their_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let store = MemoryStore::default();
        let f = seed(&store, "f@x.com", Role::Freelancer).await;
        let c = seed(&store, "c@x.com", Role::Client).await;

        let job = crate::jobs::repo::JobRepo::create_job(
            &store,
            crate::jobs::repo_types::NewJob {
                client_id: c.id,
                title: "Site".into(),
                description: "Build it".into(),
                job_type: crate::types::JobType::OneTime,
                rate: crate::types::RateKind::Fixed,
                amount: 500,
                length: crate::types::ProjectLength::UnderOne,
                hours_per_week: HoursPerWeek::UnderTen,
            },
            &[],
        )
        .await
        .unwrap();
        let app = store.create_application(f.id, job.id, "hi").await.unwrap();
        let key = format!("applications/{}/cv.pdf", app.id);
        storage
            .put_object(&key, Bytes::from_static(b"%PDF-1.4"), "application/pdf")
            .await
            .unwrap();
        store.create_attachment(app.id, "cv.pdf", &key).await.unwrap();

        delete_user_and_files(&store, &storage, f.id).await.unwrap();
        assert!(store.find_user(f.id).await.unwrap().is_none());
        assert!(store.find_application(app.id).await.unwrap().is_none());
        assert!(storage.get_object(&key).await.unwrap().is_none());
    }
}
