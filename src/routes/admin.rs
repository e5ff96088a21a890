use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

use super::RouteBothExt;

/// Admin Router Module
///
/// Account creation, update and deletion. The gate admits only admin and super tokens here;
/// a plain user gets 403 before the handler runs.
pub fn admin_routes() -> Router<AppState> {
    let mut router = Router::<AppState>::new();

    for base in ["/v1/users", "/v1/clients"] {
        router = router
            // POST /v1/users
            .route_both(base, post(handlers::create_user))
            // PUT/DELETE /v1/users/{id}
            .route_both(
                &format!("{base}/{{id}}"),
                put(handlers::update_user).delete(handlers::delete_user),
            );
    }

    router
}
