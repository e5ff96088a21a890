mod common;

use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode},
};
use chrono::{TimeDelta, Utc};
use common::spawn_app;
use jsonwebtoken::{EncodingKey, Header, encode};
use puchealth::{
    AppError, TokenIssuer,
    auth::{AuthUser, Claims, TOKEN_AUDIENCE, TOKEN_ISSUER},
    gate::{Access, ROUTES, authorize},
    models::{Account, Role},
    seed,
};
use uuid::Uuid;

// --- Helpers ---

/// Concrete URI for a route pattern, with every placeholder replaced by a fresh id.
fn concrete(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| {
            if segment.starts_with('{') {
                Uuid::new_v4().to_string()
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn method(name: &str) -> Method {
    Method::from_bytes(name.as_bytes()).expect("route table holds a valid method")
}

// --- Login ---

#[tokio::test]
async fn test_login_returns_token_with_identity_claims() {
    let app = spawn_app().await;

    let token = app.login(seed::ADMIN_EMAIL, seed::ADMIN_PASSWORD).await;
    let claims = app.state.tokens.validate(&token).expect("token must validate");

    assert_eq!(claims.sub, seed::ADMIN_ID);
    assert_eq!(claims.unique_name, "Admin");
    assert_eq!(claims.email, seed::ADMIN_EMAIL);
    assert_eq!(claims.role, "admin");
    assert_eq!(claims.iss, TOKEN_ISSUER);
    assert_eq!(claims.aud, TOKEN_AUDIENCE);
    assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
}

#[tokio::test]
async fn test_login_embeds_primary_role() {
    let app = spawn_app().await;

    let super_token = app
        .login(seed::SUPER_ADMIN_EMAIL, seed::SUPER_ADMIN_PASSWORD)
        .await;
    let professional_token = app
        .login(seed::PROFESSIONAL_EMAIL, seed::PROFESSIONAL_PASSWORD)
        .await;

    assert_eq!(app.state.tokens.validate(&super_token).unwrap().role, "super");
    assert_eq!(
        app.state.tokens.validate(&professional_token).unwrap().role,
        "user"
    );
}

#[tokio::test]
async fn test_login_email_lookup_is_case_insensitive() {
    let app = spawn_app().await;
    let token = app
        .login("ADMIN@PUCHEALTH.COM.BR", seed::ADMIN_PASSWORD)
        .await;
    assert!(app.state.tokens.validate(&token).is_some());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = spawn_app().await;

    let (unknown_status, _, unknown_body) = app
        .send(
            Method::POST,
            "/v1/account/login/",
            None,
            Some(serde_json::json!({ "email": "nobody@puchealth.com.br", "password": "Whatever1!" })),
        )
        .await;
    let (wrong_status, _, wrong_body) = app
        .send(
            Method::POST,
            "/v1/account/login/",
            None,
            Some(serde_json::json!({ "email": seed::ADMIN_EMAIL, "password": "Wrongpassw000rd!" })),
        )
        .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_body, wrong_body);
}

// --- Gate over the full router ---

#[tokio::test]
async fn test_every_protected_route_requires_a_token() {
    let app = spawn_app().await;

    for route in ROUTES.iter().filter(|r| r.access != Access::Anonymous) {
        let (status, _, _) = app
            .send(method(route.method), &concrete(route.path), None, None)
            .await;
        assert_eq!(
            status,
            StatusCode::UNAUTHORIZED,
            "{} {} without token",
            route.method,
            route.path
        );
    }
}

#[tokio::test]
async fn test_admin_routes_forbid_plain_users() {
    let app = spawn_app().await;
    let token = app.user_token();

    for route in ROUTES.iter().filter(|r| r.access == Access::Admin) {
        let (status, _, _) = app
            .send(method(route.method), &concrete(route.path), Some(&token), None)
            .await;
        assert_eq!(
            status,
            StatusCode::FORBIDDEN,
            "{} {} with user token",
            route.method,
            route.path
        );
    }
}

#[tokio::test]
async fn test_admin_token_passes_the_gate_everywhere() {
    let app = spawn_app().await;
    let token = app.admin_token();

    for route in ROUTES.iter().filter(|r| r.access != Access::Anonymous) {
        let (status, _, _) = app
            .send(method(route.method), &concrete(route.path), Some(&token), None)
            .await;
        assert!(
            ![
                StatusCode::UNAUTHORIZED,
                StatusCode::FORBIDDEN,
                StatusCode::METHOD_NOT_ALLOWED
            ]
            .contains(&status),
            "{} {} rejected with {}",
            route.method,
            route.path,
            status
        );
    }
}

#[tokio::test]
async fn test_super_role_is_admitted_to_admin_routes() {
    let app = spawn_app().await;
    let token = app.token_for(seed::SUPER_ADMIN_ID, Role::Super);

    let (status, _, _) = app
        .send(
            Method::DELETE,
            &format!("/v1/users/{}/", Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unrouted_method_is_method_not_allowed() {
    let app = spawn_app().await;
    let token = app.admin_token();

    let (anonymous, _, _) = app.send(Method::PATCH, "/v1/users/", None, None).await;
    let (with_token, _, _) = app
        .send(Method::PATCH, "/v1/users/", Some(&token), None)
        .await;
    let (bookmarks_put, _, _) = app
        .send(Method::PUT, "/v1/bookmarks/", Some(&token), None)
        .await;
    let (login_get, _, _) = app.send(Method::GET, "/v1/account/login", None, None).await;

    assert_eq!(anonymous, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(with_token, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(bookmarks_put, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(login_get, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = spawn_app().await;
    let (status, _, _) = app.send(Method::GET, "/v1/nothing-here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trailing_slash_is_optional() {
    let app = spawn_app().await;
    let token = app.admin_token();

    let (with_slash, _) = app
        .send_json(Method::GET, "/v1/users/", Some(&token), None)
        .await;
    let (without_slash, _) = app
        .send_json(Method::GET, "/v1/users", Some(&token), None)
        .await;

    assert_eq!(with_slash, StatusCode::OK);
    assert_eq!(without_slash, StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app().await;
    let (status, _, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

// --- Token validation ---

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = spawn_app().await;
    let stale = TokenIssuer::new(&app.state.config.jwt_key).with_lifetime(TimeDelta::hours(-2));
    let account = Account::new(seed::ADMIN_ID, "Admin", seed::ADMIN_EMAIL, Role::Admin);
    let token = stale.issue(&account, Role::Admin).unwrap();

    let (status, _, _) = app.send(Method::GET, "/v1/users/", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_another_key_is_unauthorized() {
    let app = spawn_app().await;
    let forged = TokenIssuer::new("some-other-signing-key");
    let account = Account::new(seed::ADMIN_ID, "Admin", seed::ADMIN_EMAIL, Role::Admin);
    let token = forged.issue(&account, Role::Admin).unwrap();

    let (status, _, _) = app.send(Method::GET, "/v1/users/", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_token_is_unauthorized() {
    let app = spawn_app().await;
    let (status, _, _) = app
        .send(Method::GET, "/v1/bookmarks/", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_audience_is_rejected() {
    let app = spawn_app().await;
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: seed::ADMIN_ID,
        unique_name: "Admin".to_string(),
        email: seed::ADMIN_EMAIL.to_string(),
        role: "admin".to_string(),
        iss: TOKEN_ISSUER.to_string(),
        aud: "someone-else".to_string(),
        exp: now + 3600,
        iat: now,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(app.state.config.jwt_key.as_bytes()),
    )
    .unwrap();

    assert!(app.state.tokens.validate(&token).is_none());
}

#[tokio::test]
async fn test_unknown_role_claim_is_unauthorized() {
    let app = spawn_app().await;
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: seed::ADMIN_ID,
        unique_name: "Admin".to_string(),
        email: seed::ADMIN_EMAIL.to_string(),
        role: "root".to_string(),
        iss: TOKEN_ISSUER.to_string(),
        aud: TOKEN_AUDIENCE.to_string(),
        exp: now + 3600,
        iat: now,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(app.state.config.jwt_key.as_bytes()),
    )
    .unwrap();

    let (status, _, _) = app.send(Method::GET, "/v1/users/", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// --- Gate predicate ---

#[test]
fn test_authorize_decisions() {
    let tokens = TokenIssuer::new("predicate-key");
    let user = Account::new(Uuid::new_v4(), "Plain", "plain@puchealth.com.br", Role::User);
    let user_token = tokens.issue(&user, Role::User).unwrap();

    // Unknown path: left to the router.
    assert!(matches!(
        authorize(&Method::GET, "/v2/whatever", None, &tokens),
        Ok(None)
    ));
    // Anonymous route needs nothing.
    assert!(matches!(
        authorize(&Method::POST, "/v1/account/login/", None, &tokens),
        Ok(None)
    ));
    // Method check happens before the token check.
    assert!(matches!(
        authorize(&Method::PATCH, "/v1/bookmarks", None, &tokens),
        Err(AppError::MethodNotAllowed)
    ));
    assert!(matches!(
        authorize(&Method::GET, "/v1/bookmarks", None, &tokens),
        Err(AppError::Unauthorized)
    ));
    assert!(matches!(
        authorize(&Method::POST, "/v1/users/", Some(&user_token), &tokens),
        Err(AppError::Forbidden)
    ));

    let resolved = authorize(&Method::GET, "/v1/users/", Some(&user_token), &tokens)
        .unwrap()
        .expect("identity resolved");
    assert_eq!(resolved.id, user.id);
    assert_eq!(resolved.role, Role::User);

    // HEAD follows GET.
    assert!(matches!(
        authorize(&Method::HEAD, "/v1/procedimentooferecido", Some(&user_token), &tokens),
        Ok(Some(_))
    ));
}

#[test]
fn test_access_sets() {
    for role in Role::ALL {
        assert!(Access::Any.permits(role));
    }
    assert!(!Access::Admin.permits(Role::User));
    assert!(Access::Admin.permits(Role::Admin));
    assert!(Access::Admin.permits(Role::Super));
}

#[tokio::test]
async fn test_auth_user_extractor_requires_gate_identity() {
    let (mut parts, _) = Request::builder()
        .uri("/v1/bookmarks")
        .body(())
        .unwrap()
        .into_parts();

    let result = AuthUser::from_request_parts(&mut parts, &()).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);

    let identity = AuthUser {
        id: Uuid::new_v4(),
        name: "Someone".to_string(),
        email: "someone@puchealth.com.br".to_string(),
        role: Role::User,
    };
    parts.extensions.insert(identity.clone());
    let resolved = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(resolved, identity);
}
