//! Admin API: status and manual update endpoints, all behind bearer auth.

pub mod auth;
pub mod handlers;
pub mod request;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AdminState;

pub use request::{HandlerError, RequestError, RequestKind, UpdateRequestBody, UpdateRequestHandler};

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/config/{identifier}", get(get_config).put(put_config))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{body::Body, http::Request, http::StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::deployment::{
        AuthoritySettings, ProxyError, RegistryApplier, RemoteConfigProxy, UpdateCoordinator,
        UpdatePolicy, VersionIdentifier,
    };

    struct OfflineProxy;

    #[async_trait]
    impl RemoteConfigProxy for OfflineProxy {
        async fn get_latest_version_id(
            &self,
            _endpoint: &str,
            _instance_id: &str,
            _api_key: &str,
        ) -> Result<Option<VersionIdentifier>, ProxyError> {
            Err(ProxyError::Transport("offline".into()))
        }

        async fn get_configuration(&self, _endpoint: &str, _api_key: &str) -> Result<Value, ProxyError> {
            Err(ProxyError::Transport("offline".into()))
        }

        async fn notify_applied(
            &self,
            _endpoint: &str,
            _instance_id: &str,
            _version: &VersionIdentifier,
            _api_key: &str,
        ) -> Result<(), ProxyError> {
            Ok(())
        }
    }

    fn router() -> Router {
        let coordinator = UpdateCoordinator::new(
            Arc::new(OfflineProxy),
            Arc::new(RegistryApplier::new()),
            AuthoritySettings {
                config_api_url_prefix: "http://authority/api".into(),
                instance_id: "inst-1".into(),
                api_key: "apikey".into(),
            },
            UpdatePolicy::default(),
        );
        let requests = Arc::new(UpdateRequestHandler::new(Arc::new(coordinator)));
        setup_admin_router(AdminState::new(requests, "secret"))
    }

    fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_or_wrong_token_is_unauthorized() {
        let res = router().oneshot(request("GET", "/admin/status", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = router()
            .oneshot(request("GET", "/admin/status", Some("nope")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status_with_token() {
        let res = router()
            .oneshot(request("GET", "/admin/status", Some("secret")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upstream_failure_maps_to_bad_gateway() {
        let res = router()
            .oneshot(request("GET", "/config/refresh", Some("secret")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

        let res = router()
            .oneshot(request("PUT", "/config/update", Some("secret")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
