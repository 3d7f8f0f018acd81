//! Router Module Index
//!
//! Every endpoint is declared once as a `RouteEntry`: method, path, the roles allowed to
//! call it and the handler. `mount` wraps each entry in its own guard layer, so there is no
//! way to register a handler without stating who may reach it.
//!
//! The three modules group entries by audience.

use std::sync::Arc;

use axum::{
    Router,
    handler::Handler,
    http::Method,
    middleware,
    routing::{MethodFilter, MethodRouter, on},
};

use crate::{
    AppState,
    auth::{GuardPolicy, Role, guard},
    config::AppConfig,
    token::TokenService,
};

/// Health and the sign-in flow; no credential required.
pub mod public;

/// Catalog reads, open or members-only depending on configuration.
pub mod catalog;

/// Catalog mutations, administrators only.
pub mod admin;

/// RouteEntry
///
/// One row of the route table. The method router is built from the declared method, so the
/// method a test reads off the row is the method axum serves.
pub struct RouteEntry {
    method: Method,
    path: &'static str,
    roles: &'static [Role],
    handler: MethodRouter<AppState>,
}

impl RouteEntry {
    pub fn get<H, T>(path: &'static str, roles: &'static [Role], handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::serve(Method::GET, MethodFilter::GET, path, roles, handler)
    }

    pub fn post<H, T>(path: &'static str, roles: &'static [Role], handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::serve(Method::POST, MethodFilter::POST, path, roles, handler)
    }

    pub fn put<H, T>(path: &'static str, roles: &'static [Role], handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::serve(Method::PUT, MethodFilter::PUT, path, roles, handler)
    }

    pub fn delete<H, T>(path: &'static str, roles: &'static [Role], handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self::serve(Method::DELETE, MethodFilter::DELETE, path, roles, handler)
    }

    fn serve<H, T>(
        method: Method,
        filter: MethodFilter,
        path: &'static str,
        roles: &'static [Role],
        handler: H,
    ) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method,
            path,
            roles,
            handler: on(filter, handler),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn roles(&self) -> &'static [Role] {
        self.roles
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

/// route_table
///
/// The complete list of endpoints for `config`.
pub fn route_table(config: &AppConfig) -> Vec<RouteEntry> {
    let mut table = public::routes();
    table.extend(catalog::routes(config));
    table.extend(admin::routes());
    table
}

/// mount
///
/// Registers each entry behind a guard configured with that entry's roles. Entries sharing a
/// path are merged by axum into one method router, each method keeping its own guard.
pub fn mount(table: Vec<RouteEntry>, tokens: &Arc<TokenService>) -> Router<AppState> {
    table.into_iter().fold(Router::new(), |router, entry| {
        let policy = GuardPolicy {
            tokens: Arc::clone(tokens),
            roles: entry.roles,
        };
        router.route(
            entry.path,
            entry
                .handler
                .route_layer(middleware::from_fn_with_state(policy, guard)),
        )
    })
}
