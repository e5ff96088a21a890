use axum::{Router, routing::MethodRouter};

/// Router Module Index
///
/// Routes are grouped by the access level the authorization gate enforces for them (see
/// `gate::ROUTES`). The gate wraps the whole router, so these modules only describe dispatch.

/// Login and health check; no token required.
pub mod public;

/// Routes open to any authenticated role.
pub mod authenticated;

/// Account mutations, restricted to admin and super.
pub mod admin;

/// Registers a route under both `path` and `path/`. Existing clients always
/// address resources with a trailing slash.
pub(crate) trait RouteBothExt<S> {
    fn route_both(self, path: &str, method_router: MethodRouter<S>) -> Self;
}

impl<S> RouteBothExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn route_both(self, path: &str, method_router: MethodRouter<S>) -> Self {
        self.route(path, method_router.clone())
            .route(&format!("{path}/"), method_router)
    }
}
