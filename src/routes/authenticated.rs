use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

use super::RouteBothExt;

/// Authenticated Router Module
///
/// Routes any role (user, admin, super) may call. Bookmark handlers take the acting account
/// from the `AuthUser` the gate resolved, never from the request.
pub fn authenticated_routes() -> Router<AppState> {
    let mut router = Router::<AppState>::new();

    // GET /v1/users, GET /v1/users/{id}
    // `clients` is the historical name of the same resource.
    for base in ["/v1/users", "/v1/clients"] {
        router = router
            .route_both(base, get(handlers::list_users))
            .route_both(&format!("{base}/{{id}}"), get(handlers::get_user));
    }

    router
        // --- Bookmarks ---
        // GET /v1/bookmarks
        .route_both("/v1/bookmarks", get(handlers::list_bookmarks))
        // POST/DELETE /v1/bookmarks/{productId}
        .route_both(
            "/v1/bookmarks/{productId}",
            post(handlers::create_bookmark).delete(handlers::delete_bookmark),
        )
        // --- Catalog ---
        // GET /v1/procedimentooferecido?name=&bairroOuCidade=&tipo=
        .route_both("/v1/procedimentooferecido", get(handlers::list_offerings))
}
