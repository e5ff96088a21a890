mod common;

use axum::{
    Json,
    extract::{Path, State},
    http::{Method, StatusCode, header},
    response::IntoResponse,
};
use common::{TestApp, product_id, spawn_app};
use puchealth::{
    auth::AuthUser,
    handlers,
    models::{BookmarkView, Role},
    seed,
};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

fn titles(views: &[BookmarkView]) -> Vec<&str> {
    views.iter().map(|v| v.title.as_str()).collect()
}

async fn list(app: &TestApp, token: &str) -> Vec<BookmarkView> {
    let (status, body) = app
        .send_json(Method::GET, "/v1/bookmarks/", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(body).expect("body is a list of bookmarks")
}

async fn bookmark(app: &TestApp, token: &str, product: Uuid) -> StatusCode {
    let (status, _) = app
        .send_json(
            Method::POST,
            &format!("/v1/bookmarks/{product}/"),
            Some(token),
            None,
        )
        .await;
    status
}

/// Creates an ordinary account through the API and logs it in.
async fn new_user(app: &TestApp, name: &str, email: &str, password: &str) -> String {
    let (status, _) = app
        .send_json(
            Method::POST,
            "/v1/users/",
            Some(&app.admin_token()),
            Some(json!({ "name": name, "email": email, "password": password })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app.login(email, password).await
}

#[tokio::test]
async fn test_empty_bookmark_list() {
    let app = spawn_app().await;
    let token = app.user_token();
    assert!(list(&app, &token).await.is_empty());
}

#[tokio::test]
async fn test_bookmarks_listed_by_title_not_insertion_order() {
    let app = spawn_app().await;
    let token = new_user(&app, "Alice", "alice@other.company.com", "AliceSecretPassw000rd!").await;

    // Película first, then Colcha.
    assert_eq!(bookmark(&app, &token, product_id(2)).await, StatusCode::CREATED);
    assert_eq!(bookmark(&app, &token, product_id(4)).await, StatusCode::CREATED);

    let views = list(&app, &token).await;
    assert_eq!(
        titles(&views),
        vec![
            "Colcha/Cobre-Leito Patchwork Casal Camesa Curação",
            "Película Protetora para Samsung Galaxy S6",
        ]
    );
}

#[tokio::test]
async fn test_bookmark_order_over_interleaved_inserts() {
    let app = spawn_app().await;
    let token = app.user_token();

    for n in [4, 1, 3, 2] {
        assert_eq!(bookmark(&app, &token, product_id(n)).await, StatusCode::CREATED);
    }

    let views = list(&app, &token).await;
    assert_eq!(
        titles(&views),
        vec![
            "Assento Sanitário Cristal Translúcido Century",
            "Cadeira para Auto Burigotto Matrix p/ Crianças",
            "Colcha/Cobre-Leito Patchwork Casal Camesa Curação",
            "Película Protetora para Samsung Galaxy S6",
        ]
    );
}

#[tokio::test]
async fn test_create_bookmark_returns_product_view() {
    let app = spawn_app().await;
    let token = app.user_token();
    let id = product_id(4);

    let (status, headers, bytes) = app
        .send(
            Method::POST,
            &format!("/v1/bookmarks/{id}"),
            Some(&token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        headers.get(header::LOCATION).unwrap(),
        &format!("v1/bookmarks/{id}")
    );

    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["title"], "Colcha/Cobre-Leito Patchwork Casal Camesa Curação");
    assert_eq!(
        body["image"],
        "http://challenge-api.luizalabs.com/images/b5e7410b-cd4f-bb9d-3c95-49010fbee801.jpg"
    );
    assert_eq!(body["price"], 159.75);
    assert_eq!(body["reviewScore"], 1.0);
}

#[tokio::test]
async fn test_missing_review_score_serializes_as_null() {
    let app = spawn_app().await;
    let token = app.user_token();
    bookmark(&app, &token, product_id(2)).await;

    let (_, body) = app
        .send_json(Method::GET, "/v1/bookmarks", Some(&token), None)
        .await;
    assert!(body[0]["reviewScore"].is_null());
    assert_eq!(body[0]["price"], 39.9);
}

#[tokio::test]
async fn test_bookmark_unknown_product_is_not_found() {
    let app = spawn_app().await;
    let token = app.user_token();

    assert_eq!(
        bookmark(&app, &token, Uuid::new_v4()).await,
        StatusCode::NOT_FOUND
    );
    assert!(list(&app, &token).await.is_empty());
}

#[tokio::test]
async fn test_bookmarking_twice_is_idempotent() {
    let app = spawn_app().await;
    let token = app.user_token();

    assert_eq!(bookmark(&app, &token, product_id(1)).await, StatusCode::CREATED);
    assert_eq!(bookmark(&app, &token, product_id(1)).await, StatusCode::CREATED);

    assert_eq!(list(&app, &token).await.len(), 1);
}

#[tokio::test]
async fn test_delete_bookmark_leaves_the_rest() {
    let app = spawn_app().await;
    let token = app.user_token();
    bookmark(&app, &token, product_id(2)).await;
    bookmark(&app, &token, product_id(4)).await;

    let (status, _, body) = app
        .send(
            Method::DELETE,
            &format!("/v1/bookmarks/{}/", product_id(4)),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let views = list(&app, &token).await;
    assert_eq!(
        titles(&views),
        vec!["Película Protetora para Samsung Galaxy S6"]
    );
}

#[tokio::test]
async fn test_delete_missing_bookmark_does_not_error() {
    let app = spawn_app().await;
    let token = app.user_token();

    for target in [product_id(3), Uuid::new_v4()] {
        let (status, _) = app
            .send_json(
                Method::DELETE,
                &format!("/v1/bookmarks/{target}"),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_bookmarks_are_private_to_each_account() {
    let app = spawn_app().await;
    let alice = new_user(&app, "Alice", "alice@other.company.com", "AliceSecretPassw000rd!").await;
    let bob = new_user(&app, "Bob", "bob@other.company.com", "BobSecretPassw000rd!").await;

    bookmark(&app, &alice, product_id(1)).await;
    bookmark(&app, &bob, product_id(3)).await;

    // Bob removing Alice's product touches only his own (empty) pair.
    app.send_json(
        Method::DELETE,
        &format!("/v1/bookmarks/{}", product_id(1)),
        Some(&bob),
        None,
    )
    .await;

    let alice_views = list(&app, &alice).await;
    let bob_views = list(&app, &bob).await;
    assert_eq!(alice_views.len(), 1);
    assert_eq!(alice_views[0].id, product_id(1));
    assert_eq!(bob_views.len(), 1);
    assert_eq!(bob_views[0].id, product_id(3));
}

#[tokio::test]
async fn test_bookmark_handlers_use_the_token_identity() {
    let app = spawn_app().await;
    let acting = AuthUser {
        id: seed::SUPER_ADMIN_ID,
        name: "SuperAdmin".to_string(),
        email: seed::SUPER_ADMIN_EMAIL.to_string(),
        role: Role::Super,
    };

    let created = handlers::create_bookmark(
        acting.clone(),
        State(app.state.clone()),
        Path(product_id(3)),
    )
    .await
    .unwrap()
    .into_response();
    assert_eq!(created.status(), StatusCode::CREATED);

    let Json(views) = handlers::list_bookmarks(acting, State(app.state.clone()))
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].price, Decimal::new(55690, 2));

    let stored = app
        .state
        .repo
        .list_bookmarked_products(seed::SUPER_ADMIN_ID)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_token_of_deleted_account_cannot_bookmark() {
    let app = spawn_app().await;
    let token = new_user(&app, "Carla", "carla@other.company.com", "CarlaSecretPassw000rd!").await;
    let id = app
        .state
        .repo
        .find_account_by_email("CARLA@OTHER.COMPANY.COM")
        .await
        .unwrap()
        .unwrap()
        .id;

    let (status, _) = app
        .send_json(
            Method::DELETE,
            &format!("/v1/users/{id}"),
            Some(&app.admin_token()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The token is still cryptographically valid, but its subject is gone.
    assert_eq!(
        bookmark(&app, &token, product_id(1)).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_bookmark_handler_rejects_unknown_subject() {
    let app = spawn_app().await;
    let ghost = AuthUser {
        id: Uuid::new_v4(),
        name: "Ghost".to_string(),
        email: "ghost@puchealth.com.br".to_string(),
        role: Role::User,
    };

    let result = handlers::create_bookmark(ghost, State(app.state.clone()), Path(product_id(1))).await;
    assert!(matches!(result, Err(puchealth::AppError::Unauthorized)));
}
