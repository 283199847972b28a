mod helpers;

use axum::http::StatusCode;
use hackhub::domain::context::OpContext;
use hackhub::domain::entities::{Resource, ResourceId, Role, Team};
use hackhub::infrastructure::http::controllers::bot::SECRET_HEADER;
use hackhub::infrastructure::http::middleware::INIT_DATA_HEADER;
use hackhub::{Repository, TeamRepository, UserRepository};
use helpers::*;
use serde_json::json;
use std::sync::Arc;
use tokio_test::assert_ok;

#[tokio::test]
async fn test_health() {
    let app = test_app(memory_store());
    let response = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_list_users_requires_page_and_limit() {
    let store = memory_store();
    seed_user(&store, "ivan", Role::Participant, None).await;
    let app = test_app(store);

    let response = send(&app, request("GET", "/users/?limit=10", None, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "No page number provided"
    );

    let response = send(&app, request("GET", "/users/?page=0&limit=10", None, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, request("GET", "/users/?page=abc&limit=10", None, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid page number");

    let response = send(&app, request("GET", "/users/?page=1&limit=10", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["users"][0]["username"], "ivan");
    assert_eq!(body["users"][0]["_id"].as_str().unwrap().len(), 32);
}

#[tokio::test]
async fn test_get_user_by_id_and_name() {
    let store = memory_store();
    let ivan = seed_user(&store, "ivan", Role::Participant, None).await;
    let app = test_app(store);

    let response = send(&app, request("GET", &format!("/users/{}", ivan.id), None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["username"], "ivan");

    let response = send(&app, request("GET", "/users/by-name/ivan", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["_id"], ivan.id.to_string());

    let response = send(&app, request("GET", "/users/not-an-id", None, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let absent = ResourceId::new();
    let response = send(&app, request("GET", &format!("/users/{}", absent), None, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_writes_require_identity() {
    let store = memory_store();
    let ivan = seed_user(&store, "ivan", Role::Participant, None).await;
    let app = test_app(store);
    let uri = format!("/users/{}", ivan.id);
    let body = json!({ "name": "Петров Пётр" });

    let response = send(&app, request("PATCH", &uri, None, Some(body.clone()))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, request("PATCH", &uri, Some("stranger"), Some(body.clone()))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let tampered = axum::http::Request::builder()
        .method("PATCH")
        .uri(&uri)
        .header("content-type", "application/json")
        .header(
            INIT_DATA_HEADER,
            signed_init_data("ivan").replace("Test", "Evil"),
        )
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    let response = send(&app, tampered).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_returns_resolved_identity() {
    let store = memory_store();
    let judge = seed_user(&store, "judy", Role::Judge, None).await;
    let app = test_app(store);

    let response = send(&app, request("GET", "/me", Some("judy"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], judge.id.to_string());
    assert_eq!(body["role"], "judge");
}

#[tokio::test]
async fn test_user_patch_field_access() {
    let store = memory_store();
    let ivan = seed_user(&store, "ivan", Role::Participant, None).await;
    let petr = seed_user(&store, "petr", Role::Participant, None).await;
    let app = test_app(store.clone());

    let response = send(
        &app,
        request(
            "PATCH",
            &format!("/users/{}", ivan.id),
            Some("ivan"),
            Some(json!({ "name": "Иван" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Successfully updated");

    // Someone else's name.
    let response = send(
        &app,
        request(
            "PATCH",
            &format!("/users/{}", petr.id),
            Some("ivan"),
            Some(json!({ "name": "Хакер" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["violations"][0]["field"], "name");
    assert_eq!(body["violations"][0]["kind"], "access");

    // Self-promotion.
    let response = send(
        &app,
        request(
            "PATCH",
            &format!("/users/{}", ivan.id),
            Some("ivan"),
            Some(json!({ "role": "admin" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let users = UserRepository::new(store);
    let ctx = OpContext::background();
    let stored = users.get_by_id(&ctx, ivan.id).await.unwrap();
    assert_eq!(stored.name, "Иван");
    assert_eq!(stored.role, Role::Participant);
    assert_eq!(stored.birthdate, ivan.birthdate);
    assert_eq!(users.get_by_id(&ctx, petr.id).await.unwrap().name, petr.name);
}

#[tokio::test]
async fn test_joining_unknown_team_is_rejected() {
    let store = memory_store();
    let ivan = seed_user(&store, "ivan", Role::Participant, None).await;
    let app = test_app(store);

    let absent = ResourceId::new();
    let response = send(
        &app,
        request(
            "PATCH",
            &format!("/users/{}", ivan.id),
            Some("ivan"),
            Some(json!({ "team": absent.to_string() })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let store = memory_store();
    let ivan = seed_user(&store, "ivan", Role::Participant, None).await;
    let app = test_app(store);

    let broken = axum::http::Request::builder()
        .method("PATCH")
        .uri(format!("/users/{}", ivan.id))
        .header("content-type", "application/json")
        .header(
            INIT_DATA_HEADER,
            signed_init_data("ivan"),
        )
        .body(axum::body::Body::from("{\"name\": "))
        .unwrap();
    let response = send(&app, broken).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_team_lifecycle() {
    let store = memory_store();
    let leader = seed_user(&store, "leader", Role::Participant, None).await;
    let app = test_app(store.clone());

    let response = send(
        &app,
        request("POST", "/teams/", Some("leader"), Some(json!({ "name": "Alpha" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let team_id = body_text(response).await;
    assert_eq!(team_id.len(), 32);

    let team = TeamRepository::new(store.clone())
        .get_by_id(&OpContext::background(), team_id.parse().unwrap())
        .await
        .unwrap();
    assert_eq!(team.leader, leader.id);

    let member = seed_user(&store, "member", Role::Participant, Some(team.id)).await;

    let response = send(&app, request("GET", &format!("/teams/{}/members", team_id), None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await[0]["_id"], member.id.to_string());

    let response = send(&app, request("GET", "/teams/?page=1&limit=5", None, None)).await;
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["teams"][0]["name"], "Alpha");

    let response = send(
        &app,
        request(
            "PATCH",
            &format!("/teams/{}", team_id),
            Some("member"),
            Some(json!({ "repos": ["https://github.com/alpha/app"] })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        request("DELETE", &format!("/teams/{}", team_id), Some("leader"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Successfully deleted");

    let member = UserRepository::new(store)
        .get_by_id(&OpContext::background(), member.id)
        .await
        .unwrap();
    assert_eq!(member.team, None);
}

#[tokio::test]
async fn test_team_creation_gates() {
    let store = memory_store();
    let owner = seed_user(&store, "owner", Role::Participant, None).await;
    let team = seed_team(&store, "Alpha", owner.id).await;
    seed_user(&store, "member", Role::Participant, Some(team.id)).await;
    seed_user(&store, "free", Role::Participant, None).await;
    let app = test_app(store);

    let response = send(
        &app,
        request("POST", "/teams/", Some("member"), Some(json!({ "name": "Beta" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        request(
            "POST",
            "/teams/",
            Some("free"),
            Some(json!({ "name": "A name that is far too long" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_team_update_gates_and_grades() {
    let store = memory_store();
    let owner = seed_user(&store, "owner", Role::Participant, None).await;
    let team = seed_team(&store, "Alpha", owner.id).await;
    let member = seed_user(&store, "member", Role::Participant, Some(team.id)).await;
    let judge = seed_user(&store, "judy", Role::Judge, None).await;
    let other_judge = seed_user(&store, "jack", Role::Judge, None).await;
    seed_user(&store, "outsider", Role::Participant, None).await;
    let app = test_app(store.clone());
    let uri = format!("/teams/{}", team.id);

    let response = send(
        &app,
        request("PATCH", &uri, Some("outsider"), Some(json!({ "name": "Mine" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let grades = |judge_id: String, score: i32| {
        json!({ "grades": { judge_id: { member.id.to_string(): score } } })
    };

    let response = send(
        &app,
        request("PATCH", &uri, Some("judy"), Some(grades(judge.id.to_string(), 10))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        request("PATCH", &uri, Some("judy"), Some(grades(judge.id.to_string(), 11))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        request("PATCH", &uri, Some("judy"), Some(grades(other_judge.id.to_string(), 5))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Judges may grade but not rename.
    let response = send(
        &app,
        request("PATCH", &uri, Some("judy"), Some(json!({ "name": "Renamed" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        request("PATCH", &uri, Some("member"), Some(json!({ "grades": {} , "name": "Beta" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stored = TeamRepository::new(store)
        .get_by_id(&OpContext::background(), team.id)
        .await
        .unwrap();
    assert_eq!(stored.name, "Alpha");
    assert_eq!(stored.grades[&judge.id][&member.id], 10);
    assert!(!stored.grades.contains_key(&other_judge.id));

    let response = send(&app, request("DELETE", &uri, Some("judy"), None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reference_resources_are_admin_managed() {
    let store = memory_store();
    seed_user(&store, "root", Role::Admin, None).await;
    seed_user(&store, "ivan", Role::Participant, None).await;
    let app = test_app(store);
    let case = json!({ "name": "Fintech", "description": "Payments" });

    let response = send(&app, request("POST", "/cases/", Some("ivan"), Some(case.clone()))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, request("POST", "/cases/", Some("root"), Some(case))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_text(response).await;

    let response = send(
        &app,
        request(
            "PATCH",
            &format!("/cases/{}", id),
            Some("root"),
            Some(json!({ "image_uri": "not a url" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, request("GET", "/cases/", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Fintech");

    let response = send(
        &app,
        request(
            "POST",
            "/events/",
            Some("root"),
            Some(json!({
                "name": "Opening",
                "description": "Kick-off",
                "time": "2024-03-01T10:00:00Z"
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, request("DELETE", &format!("/cases/{}", id), Some("root"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&app, request("GET", &format!("/cases/{}", id), None, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_requires_secret() {
    let app = test_app(memory_store());
    let update = json!({
        "update_id": 1,
        "message": {
            "chat": { "id": 555 },
            "from": { "id": 555, "first_name": "Иван", "username": "ivan" },
            "text": "/start"
        }
    });

    let response = send(&app, request("POST", "/bot/webhook", None, Some(update.clone()))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let signed = axum::http::Request::builder()
        .method("POST")
        .uri("/bot/webhook")
        .header("content-type", "application/json")
        .header(SECRET_HEADER, WEBHOOK_SECRET)
        .body(axum::body::Body::from(update.to_string()))
        .unwrap();
    let response = send(&app, signed).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["method"], "sendMessage");
    assert_eq!(body["chat_id"], 555);
    assert_eq!(
        body["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
        "register"
    );
}

#[tokio::test]
async fn test_webhook_acknowledges_unsupported_updates() {
    let app = test_app(memory_store());
    let sticker = axum::http::Request::builder()
        .method("POST")
        .uri("/bot/webhook")
        .header("content-type", "application/json")
        .header(SECRET_HEADER, WEBHOOK_SECRET)
        .body(axum::body::Body::from(
            json!({
                "update_id": 2,
                "message": { "chat": { "id": 1 }, "from": { "id": 1, "first_name": "A" } }
            })
            .to_string(),
        ))
        .unwrap();
    let response = send(&app, sticker).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_failed_team_delete_keeps_team_and_can_be_retried() {
    let store = memory_store();
    let leader = seed_user(&store, "leader", Role::Participant, None).await;
    let team = seed_team(&store, "Alpha", leader.id).await;
    let member = seed_user(&store, "member", Role::Participant, Some(team.id)).await;

    let failing = Arc::new(FailingStore::new(store.clone()));
    let app = test_app(failing.clone());
    let ctx = OpContext::background();
    let teams = TeamRepository::new(store.clone());
    let users = UserRepository::new(store);

    failing.fail_update_many(true);
    let response = send(
        &app,
        request("DELETE", &format!("/teams/{}", team.id), Some("leader"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Nothing dangles: the team is still there for its members to point at.
    assert_ok!(teams.get_by_id(&ctx, team.id).await);
    assert_eq!(users.get_by_id(&ctx, member.id).await.unwrap().team, Some(team.id));

    failing.fail_update_many(false);
    let response = send(
        &app,
        request("DELETE", &format!("/teams/{}", team.id), Some("leader"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(users.get_by_id(&ctx, member.id).await.unwrap().team, None);

    let response = send(
        &app,
        request("POST", "/teams/", Some("member"), Some(json!({ "name": "Beta" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_join_is_undone_when_team_disappears_mid_update() {
    let store = memory_store();
    let leader = seed_user(&store, "leader", Role::Participant, None).await;
    let team = seed_team(&store, "Alpha", leader.id).await;
    let ivan = seed_user(&store, "ivan", Role::Participant, None).await;

    let failing = Arc::new(FailingStore::new(store.clone()));
    failing.delete_before_next_update(Team::COLLECTION, team.id);
    let app = test_app(failing);

    let response = send(
        &app,
        request(
            "PATCH",
            &format!("/users/{}", ivan.id),
            Some("ivan"),
            Some(json!({ "team": team.id.to_string() })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let ivan = UserRepository::new(store)
        .get_by_id(&OpContext::background(), ivan.id)
        .await
        .unwrap();
    assert_eq!(ivan.team, None);
}

#[tokio::test]
async fn test_leader_handoff_requires_existing_user() {
    let store = memory_store();
    let leader = seed_user(&store, "leader", Role::Participant, None).await;
    let team = seed_team(&store, "Alpha", leader.id).await;
    let successor = seed_user(&store, "successor", Role::Participant, Some(team.id)).await;
    let app = test_app(store.clone());

    let response = send(
        &app,
        request(
            "PATCH",
            &format!("/teams/{}", team.id),
            Some("leader"),
            Some(json!({ "leader": ResourceId::new().to_string() })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        request(
            "PATCH",
            &format!("/teams/{}", team.id),
            Some("leader"),
            Some(json!({ "leader": successor.id.to_string() })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let team = TeamRepository::new(store)
        .get_by_id(&OpContext::background(), team.id)
        .await
        .unwrap();
    assert_eq!(team.leader, successor.id);
}
