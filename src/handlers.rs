use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    catalog::{self, OfferingFilter},
    error::{AppError, AppResult},
    identity::{IdentityError, codes},
    models::{
        Account, Bookmark, BookmarkView, CreateUserRequest, LoginRequest, ProcedureOfferingView,
        Role, UpdateUserRequest, UserView,
    },
};

/// rejected
///
/// Turns credential-service validation failures into the 400 response. User name and email are
/// the same value, so every duplicate email is also reported as a duplicate user name; the
/// `DuplicateEmail` entry is dropped to report the fault once.
fn rejected(errors: Vec<IdentityError>) -> AppError {
    AppError::Validation(
        errors
            .into_iter()
            .filter(|e| !e.is(codes::DUPLICATE_EMAIL))
            .collect(),
    )
}

// --- Account ---

/// login
///
/// [Public Route] Exchanges email and password for a bearer token (returned as plain text).
///
/// An unknown email and a wrong password produce the same 401 so callers cannot probe which
/// accounts exist.
#[utoipa::path(
    post,
    path = "/v1/account/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token", body = String),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<String> {
    let Some(account) = state.credentials.find_by_email(&payload.email).await? else {
        tracing::info!("Login rejected");
        return Err(AppError::Unauthorized);
    };

    if !state
        .credentials
        .check_password(&account, &payload.password)
        .await?
    {
        tracing::info!("Login rejected");
        return Err(AppError::Unauthorized);
    }

    let token = state.tokens.issue(&account, account.role)?;
    tracing::info!(account_id = %account.id, role = account.role.name(), "Login succeeded");
    Ok(token)
}

// --- Users ---

/// list_users
///
/// [Authenticated Route] All accounts ordered by (name, id).
#[utoipa::path(
    get,
    path = "/v1/users",
    responses((status = 200, description = "Accounts", body = [UserView]))
)]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserView>>> {
    let accounts = state.repo.list_accounts().await?;
    Ok(Json(accounts.iter().map(UserView::from).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Found", body = UserView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserView>> {
    let account = state
        .credentials
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(UserView::from(&account)))
}

/// create_user
///
/// [Admin Route] Creates a plain user account. The id comes from the injected generator and
/// the login name is the email. Responds 201 with a Location reference to the new account.
#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserView),
        (status = 400, description = "Validation errors", body = [IdentityError])
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let account = Account::new(state.ids.next_id(), payload.name, payload.email, Role::User);

    state
        .credentials
        .create(&account, &payload.password)
        .await?
        .map_err(rejected)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("v1/users/{}/", account.id))],
        Json(UserView::from(&account)),
    ))
}

/// update_user
///
/// [Admin Route] Overwrites name and email (and with it the login name). Same validation
/// contract as `create_user`.
#[utoipa::path(
    put,
    path = "/v1/users/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserView),
        (status = 400, description = "Validation errors", body = [IdentityError]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserView>> {
    let mut account = state
        .credentials
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;

    account.name = payload.name;
    account.user_name = payload.email.clone();
    account.email = payload.email;

    state
        .credentials
        .update(&account)
        .await?
        .map_err(rejected)?;

    Ok(Json(UserView::from(&account)))
}

/// delete_user
///
/// [Admin Route] Removes the account. Its bookmarks go with it.
#[utoipa::path(
    delete,
    path = "/v1/users/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let account = state
        .credentials
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;

    if state.credentials.delete(&account).await? {
        Ok(StatusCode::OK)
    } else {
        // Deleted concurrently between lookup and delete.
        Err(AppError::NotFound)
    }
}

// --- Bookmarks ---

/// list_bookmarks
///
/// [Authenticated Route] Products bookmarked by the caller, ordered by (title, id).
#[utoipa::path(
    get,
    path = "/v1/bookmarks",
    responses((status = 200, description = "Bookmarked products", body = [BookmarkView]))
)]
pub async fn list_bookmarks(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<BookmarkView>>> {
    let products = state.repo.list_bookmarked_products(id).await?;
    Ok(Json(products.iter().map(BookmarkView::from).collect()))
}

/// create_bookmark
///
/// [Authenticated Route] Bookmarks a product for the caller. The product must exist (404
/// otherwise) and so must the caller's account (401 otherwise). Bookmarking the same product
/// again is a no-op that still answers 201.
#[utoipa::path(
    post,
    path = "/v1/bookmarks/{productId}",
    params(("productId" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 201, description = "Bookmarked", body = BookmarkView),
        (status = 401, description = "Account no longer exists"),
        (status = 404, description = "Unknown product")
    )
)]
pub async fn create_bookmark(
    AuthUser { id: account_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    // Tokens outlive deleted accounts; the subject must still exist.
    if state.credentials.find_by_id(account_id).await?.is_none() {
        return Err(AppError::Unauthorized);
    }

    let product = state
        .repo
        .get_product(product_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let inserted = state
        .repo
        .insert_bookmark(&Bookmark {
            account_id,
            product_id,
            created_at: Utc::now(),
        })
        .await?;
    tracing::debug!(%account_id, %product_id, inserted, "Bookmark stored");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("v1/bookmarks/{product_id}"))],
        Json(BookmarkView::from(&product)),
    ))
}

/// delete_bookmark
///
/// [Authenticated Route] Idempotent: removing a pair that does not exist still answers 200.
#[utoipa::path(
    delete,
    path = "/v1/bookmarks/{productId}",
    params(("productId" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Removed"))
)]
pub async fn delete_bookmark(
    AuthUser { id: account_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let removed = state.repo.delete_bookmark(account_id, product_id).await?;
    tracing::debug!(%account_id, %product_id, removed, "Bookmark removed");
    Ok(StatusCode::OK)
}

// --- Catalog ---

/// list_offerings
///
/// [Authenticated Route] Procedure offerings joined with procedure, establishment, address,
/// professional and specialty. Filters are optional, case-sensitive and combined with AND.
#[utoipa::path(
    get,
    path = "/v1/procedimentooferecido",
    params(OfferingFilter),
    responses(
        (status = 200, description = "Offerings", body = [ProcedureOfferingView]),
        (status = 400, description = "Malformed filter")
    )
)]
pub async fn list_offerings(
    State(state): State<AppState>,
    query: Result<Query<OfferingFilter>, QueryRejection>,
) -> AppResult<Json<Vec<ProcedureOfferingView>>> {
    // An unknown `tipo` is a client error, reported with the deserializer's message.
    let Query(filter) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let records = state.repo.list_offerings(&filter.normalized()).await?;
    Ok(Json(records.iter().map(catalog::project).collect()))
}
