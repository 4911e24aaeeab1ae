mod common;

use axum::http::{header, Method, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::TestApp;
use marketplace::auth::repo::UserRepo;
use serde_json::json;

#[tokio::test]
async fn accepting_an_application_closes_the_job() {
    let app = TestApp::new();
    let f1 = app.signup("f@x.com", "freelancer").await;
    let f2 = app.signup("g@x.com", "freelancer").await;
    let client = app.signup("c@x.com", "client").await;

    let job_id = app.create_job(&client, "J1").await;

    let (status, a1) = app.apply(&f1, job_id, None).await;
    assert_eq!(status, StatusCode::OK, "{a1}");
    assert_eq!(a1["message"], "Application submitted successfully");
    let (status, a2) = app.apply(&f2, job_id, None).await;
    assert_eq!(status, StatusCode::OK, "{a2}");
    let (a1, a2) = (a1["id"].as_i64().unwrap(), a2["id"].as_i64().unwrap());

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/user/client/applications/{a1}"),
            Some(&client),
            Some(json!({ "status": "accepted" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Application status updated successfully");

    let (_, job) = app
        .call(Method::GET, &format!("/user/client/jobs/{job_id}"), Some(&client), None)
        .await;
    assert_eq!(job["status"], "in-progress");
    let apps = job["applications"].as_array().unwrap();
    let status_of = |id: i64| {
        apps.iter()
            .find(|a| a["id"] == id)
            .map(|a| a["status"].clone())
            .unwrap()
    };
    assert_eq!(status_of(a1), "accepted");
    assert_eq!(status_of(a2), "rejected");

    // the winner sees the job as theirs, the other applicant does not
    let (status, mine) = app.call(Method::GET, "/user/freelancer/jobs", Some(&f1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["application_id"], a1);
    let (_, theirs) = app.call(Method::GET, "/user/freelancer/jobs", Some(&f2), None).await;
    assert!(theirs.as_array().unwrap().is_empty());

    // no longer listed as open
    let (_, open) = app.call(Method::GET, "/jobs", Some(&f2), None).await;
    assert!(open.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn closed_jobs_take_no_applications() {
    let app = TestApp::new();
    let f1 = app.signup("f@x.com", "freelancer").await;
    let late = app.signup("h@x.com", "freelancer").await;
    let client = app.signup("c@x.com", "client").await;
    let job_id = app.create_job(&client, "J1").await;

    let (_, a1) = app.apply(&f1, job_id, None).await;
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/user/client/applications/{}", a1["id"]),
            Some(&client),
            Some(json!({ "status": "accepted" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let pdf = STANDARD.encode(b"%PDF-1.4\n%test\n");
    let (status, body) = app.apply(&late, job_id, Some(("cv.pdf", &pdf))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "Job is not open for applications");

    let (status, mine) = app
        .call(Method::GET, "/user/freelancer/applications", Some(&late), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(mine.as_array().unwrap().is_empty());

    let (_, job) = app
        .call(Method::GET, &format!("/user/client/jobs/{job_id}"), Some(&client), None)
        .await;
    assert_eq!(job["applications"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app.call(Method::GET, "/jobs", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::Value::Null);
}

#[tokio::test]
async fn banned_users_are_locked_out() {
    let app = TestApp::new();
    let token = app.signup("f@x.com", "freelancer").await;
    let admin = app.admin().await;

    let user = app
        .state
        .store
        .find_user_by_email("f@x.com")
        .await
        .unwrap()
        .unwrap();
    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/admin/users/{}", user.id),
            Some(&admin),
            Some(json!({ "ban": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ban"], true);

    let (status, body) = app.call(Method::GET, "/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "User is banned");
}

#[tokio::test]
async fn admin_routes_reject_other_roles() {
    let app = TestApp::new();
    let client = app.signup("c@x.com", "client").await;

    let (status, body) = app.call(Method::GET, "/admin/users", Some(&client), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied: Admins only");

    let admin = app.admin().await;
    let (status, users) = app.call(Method::GET, "/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_input_is_a_400() {
    let app = TestApp::new();
    let res = app
        .raw(Method::POST, "/register", None, Some("{not json".to_string()))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(body["error"], "Invalid input");

    let (status, body) = app
        .call(
            Method::POST,
            "/register",
            None,
            Some(json!({
                "email": "f@x.com",
                "password": "password",
                "role": "freelancer",
                "name": "A",
                "surname": "B",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let token = app.signup("f@x.com", "freelancer").await;
    let (status, _) = app.call(Method::GET, "/jobs/abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = TestApp::new();
    app.register("f@x.com", "freelancer").await;
    let (status, body) = app
        .call(
            Method::POST,
            "/register",
            None,
            Some(json!({
                "email": "F@X.com",
                "password": common::PASSWORD,
                "role": "client",
                "name": "A",
                "surname": "B",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn refresh_rotates_and_logout_ends_the_session() {
    let app = TestApp::new();
    app.register("f@x.com", "freelancer").await;
    let (_, pair) = app
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "f@x.com", "password": common::PASSWORD })),
        )
        .await;
    let refresh = pair["refresh_token"].as_str().unwrap().to_string();

    let (status, next) = app
        .call(Method::POST, "/refresh", None, Some(json!({ "refresh_token": refresh })))
        .await;
    assert_eq!(status, StatusCode::OK, "{next}");

    // the old refresh token was consumed
    let (status, _) = app
        .call(Method::POST, "/refresh", None, Some(json!({ "refresh_token": refresh })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let access = next["access_token"].as_str().unwrap();
    let (status, who) = app.call(Method::GET, "/user/auth", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(who["role"], "freelancer");

    let (status, body) = app.call(Method::POST, "/user/logout", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");
    let (status, _) = app
        .call(
            Method::POST,
            "/refresh",
            None,
            Some(json!({ "refresh_token": next["refresh_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn attachment_upload_and_download() {
    let app = TestApp::new();
    let freelancer = app.signup("f@x.com", "freelancer").await;
    let outsider = app.signup("g@x.com", "freelancer").await;
    let client = app.signup("c@x.com", "client").await;
    let job_id = app.create_job(&client, "With CV").await;

    let not_pdf = STANDARD.encode(b"hello");
    let (status, body) = app
        .apply(&freelancer, job_id, Some(("cv.pdf", &not_pdf)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let pdf = STANDARD.encode(b"%PDF-1.4\n%test\n");
    let (status, body) = app.apply(&freelancer, job_id, Some(("cv.pdf", &pdf))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let app_id = body["id"].as_i64().unwrap();

    let (_, mine) = app
        .call(
            Method::GET,
            &format!("/user/freelancer/applications/{app_id}"),
            Some(&freelancer),
            None,
        )
        .await;
    assert_eq!(mine["attachment"]["file_name"], "cv.pdf");
    assert!(mine["attachment"].get("storage_key").is_none());
    let attachment_id = mine["attachment"]["id"].as_i64().unwrap();

    let path = format!("/user/attachments/{attachment_id}");
    let res = app.raw(Method::GET, &path, Some(&client), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        res.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"cv.pdf\""
    );
    assert!(res.body.starts_with(b"%PDF"));

    let res = app.raw(Method::GET, &path, Some(&outsider), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn skills_flow() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let freelancer = app.signup("f@x.com", "freelancer").await;

    let (status, skill) = app
        .call(Method::POST, "/admin/skills", Some(&admin), Some(json!({ "name": "Rust" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{skill}");
    assert_eq!(skill["name"], "Rust");
    let (status, body) = app
        .call(Method::POST, "/admin/skills", Some(&admin), Some(json!({ "name": "Rust" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Skill already exists");

    let link = json!({ "skill_id": skill["id"] });
    let (status, _) = app
        .call(Method::POST, "/user/freelancer/skills", Some(&freelancer), Some(link.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .call(Method::POST, "/user/freelancer/skills", Some(&freelancer), Some(link.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Freelancer already has this skill");

    let (_, me) = app.call(Method::GET, "/user", Some(&freelancer), None).await;
    assert_eq!(me["profile"]["kind"], "freelancer");
    assert_eq!(me["profile"]["skills"][0]["name"], "Rust");

    let (status, _) = app
        .call(Method::DELETE, "/user/freelancer/skills", Some(&freelancer), Some(link.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .call(Method::DELETE, "/user/freelancer/skills", Some(&freelancer), Some(link))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Freelancer does not have this skill");
}

#[tokio::test]
async fn deleting_the_account_removes_it() {
    let app = TestApp::new();
    let token = app.signup("f@x.com", "freelancer").await;

    let (status, _) = app.call(Method::DELETE, "/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, "/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
