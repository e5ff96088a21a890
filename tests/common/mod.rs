#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use puchealth::{
    AppConfig, AppState, MemoryRepository, SequentialIdGenerator, create_router,
    models::{Account, Product, Role},
    repository::RepositoryState,
    seed::{self, SeedData},
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// Everything a test needs: the shared state (for direct handler calls and store inspection)
/// and the fully layered router.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

/// Product ids of the shape `00000000-000n-0000-0000-000000000000`, disjoint from the ids the
/// sequential generator hands out.
pub fn product_id(n: u16) -> Uuid {
    Uuid::from_fields(0, n, 0, &[0; 8])
}

pub fn products() -> Vec<Product> {
    let image = |name: &str| format!("http://challenge-api.luizalabs.com/images/{name}.jpg");
    vec![
        Product {
            id: product_id(1),
            title: "Cadeira para Auto Burigotto Matrix p/ Crianças".to_string(),
            image: image("ddeb989e-53c4-e68b-aa93-6e43afddb797"),
            price: Decimal::new(70480, 2),
            review_score: None,
        },
        Product {
            id: product_id(2),
            title: "Película Protetora para Samsung Galaxy S6".to_string(),
            image: image("de2911eb-ce5c-e783-1ca5-82d0ccd4e3d8"),
            price: Decimal::new(3990, 2),
            review_score: None,
        },
        Product {
            id: product_id(3),
            title: "Assento Sanitário Cristal Translúcido Century".to_string(),
            image: image("1cc8ece1-895e-5d2a-de69-ad2d7884e722"),
            price: Decimal::new(55690, 2),
            review_score: None,
        },
        Product {
            id: product_id(4),
            title: "Colcha/Cobre-Leito Patchwork Casal Camesa Curação".to_string(),
            image: image("b5e7410b-cd4f-bb9d-3c95-49010fbee801"),
            price: Decimal::new(15975, 2),
            review_score: Some(1.0),
        },
    ]
}

/// Memory-backed app with sequential ids, cheapest bcrypt cost, the standard seed rows and the
/// four test products.
pub async fn spawn_app() -> TestApp {
    let repo: RepositoryState = Arc::new(MemoryRepository::new());
    let state = AppState::new(
        repo,
        Arc::new(SequentialIdGenerator::new()),
        AppConfig::default(),
    );

    seed::seed(
        &state.repo,
        &state.credentials,
        &SeedData::standard().with_products(products()),
    )
    .await
    .expect("seeding the memory store failed");

    let router = create_router(state.clone());
    TestApp { state, router }
}

impl TestApp {
    /// Mints a token directly, bypassing the login flow.
    pub fn token_for(&self, id: Uuid, role: Role) -> String {
        let account = Account::new(id, "Token Holder", "holder@puchealth.com.br", role);
        self.state
            .tokens
            .issue(&account, role)
            .expect("token minting failed")
    }

    pub fn admin_token(&self) -> String {
        self.token_for(seed::ADMIN_ID, Role::Admin)
    }

    pub fn user_token(&self) -> String {
        self.token_for(seed::PROFESSIONAL_ID, Role::User)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request build failed");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router call failed");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read failed");
        (status, headers, bytes)
    }

    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, bytes) = self.send(method, uri, token, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is not JSON")
        };
        (status, value)
    }

    /// Logs in through the HTTP surface and returns the token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, _, bytes) = self
            .send(
                Method::POST,
                "/v1/account/login/",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed for {email}");
        String::from_utf8(bytes.to_vec()).expect("token is not UTF-8")
    }
}
