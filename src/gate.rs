use axum::{
    extract::{Request, State},
    http::{Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    auth::{AuthUser, TokenIssuer},
    error::AppError,
    models::Role,
};

/// Access
///
/// The set of roles a route admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No token required (login, health).
    Anonymous,
    /// Any authenticated role: user, admin or super.
    Any,
    /// Admin or super.
    Admin,
}

impl Access {
    pub fn permits(self, role: Role) -> bool {
        match self {
            Access::Anonymous | Access::Any => true,
            Access::Admin => matches!(role, Role::Admin | Role::Super),
        }
    }
}

#[derive(Debug)]
pub struct RouteRule {
    pub method: &'static str,
    /// Path pattern; `{name}` matches exactly one segment. Trailing slashes are ignored.
    pub path: &'static str,
    pub access: Access,
}

const fn rule(method: &'static str, path: &'static str, access: Access) -> RouteRule {
    RouteRule {
        method,
        path,
        access,
    }
}

/// ROUTES
///
/// Static route table consulted by the gate. Every route the router serves under `/v1` or
/// `/health` has exactly one entry here.
pub static ROUTES: &[RouteRule] = &[
    rule("GET", "/health", Access::Anonymous),
    rule("POST", "/v1/account/login", Access::Anonymous),
    // Users, and the historical `clients` alias.
    rule("GET", "/v1/users", Access::Any),
    rule("POST", "/v1/users", Access::Admin),
    rule("GET", "/v1/users/{id}", Access::Any),
    rule("PUT", "/v1/users/{id}", Access::Admin),
    rule("DELETE", "/v1/users/{id}", Access::Admin),
    rule("GET", "/v1/clients", Access::Any),
    rule("POST", "/v1/clients", Access::Admin),
    rule("GET", "/v1/clients/{id}", Access::Any),
    rule("PUT", "/v1/clients/{id}", Access::Admin),
    rule("DELETE", "/v1/clients/{id}", Access::Admin),
    // Bookmarks
    rule("GET", "/v1/bookmarks", Access::Any),
    rule("POST", "/v1/bookmarks/{productId}", Access::Any),
    rule("DELETE", "/v1/bookmarks/{productId}", Access::Any),
    // Catalog
    rule("GET", "/v1/procedimentooferecido", Access::Any),
];

fn path_matches(pattern: &str, path: &str) -> bool {
    let mut expected = pattern.split('/').filter(|s| !s.is_empty());
    let mut actual = path.split('/').filter(|s| !s.is_empty());
    loop {
        match (expected.next(), actual.next()) {
            (None, None) => return true,
            (Some(want), Some(got)) => {
                let placeholder = want.starts_with('{') && want.ends_with('}');
                if !placeholder && want != got {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// authorize
///
/// The gate's decision for one request, with no side effects:
/// * path unknown to the table: `Ok(None)`, the router answers 404;
/// * path known, method not routed: `MethodNotAllowed`, before any token check;
/// * anonymous route: `Ok(None)`;
/// * missing, forged or expired token, or unknown role claim: `Unauthorized`;
/// * role outside the route's set: `Forbidden`;
/// * otherwise the resolved identity.
pub fn authorize(
    method: &Method,
    path: &str,
    bearer: Option<&str>,
    tokens: &TokenIssuer,
) -> Result<Option<AuthUser>, AppError> {
    // HEAD is served by every GET route.
    let method = if *method == Method::HEAD {
        "GET"
    } else {
        method.as_str()
    };

    let mut candidates = ROUTES.iter().filter(|r| path_matches(r.path, path)).peekable();
    if candidates.peek().is_none() {
        return Ok(None);
    }
    let route = candidates
        .find(|r| r.method == method)
        .ok_or(AppError::MethodNotAllowed)?;

    if route.access == Access::Anonymous {
        return Ok(None);
    }

    let user = bearer
        .and_then(|token| tokens.validate(token))
        .and_then(AuthUser::from_claims)
        .ok_or(AppError::Unauthorized)?;

    if !route.access.permits(user.role) {
        return Err(AppError::Forbidden);
    }

    Ok(Some(user))
}

/// authorization_gate
///
/// Middleware wrapping the whole router. On success the resolved `AuthUser` is placed in the
/// request extensions for the `AuthUser` extractor.
pub async fn authorization_gate(
    State(tokens): State<TokenIssuer>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match authorize(request.method(), request.uri().path(), bearer, &tokens) {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => {
            tracing::info!(
                method = %request.method(),
                path = %request.uri().path(),
                outcome = %e,
                "Request rejected by authorization gate"
            );
            e.into_response()
        }
    }
}
