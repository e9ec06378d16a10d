//! Surface de contrôle HTTP d'un device émulé.
//!
//! Table statique chemin → handler, dispatch par correspondance exacte
//! uniquement. Un chemin inconnu est un résultat 404 normal, jamais une
//! erreur.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::any,
};
use tracing::info;

use crate::device::EmulatedSwitch;
use crate::setup;

/// Construit le router de contrôle d'un device.
///
/// Toutes les méthodes HTTP sont acceptées sur chaque chemin : les clients
/// Belkin mélangent GET et POST selon les versions.
pub fn control_router(device: Arc<EmulatedSwitch>) -> Router {
    Router::new()
        .route("/setup.xml", any(setup_handler))
        .route(setup::CONTROL_URL, any(basicevent_handler))
        .fallback(not_found_handler)
        .with_state(device)
}

/// Sert le document de description du device, avec son état courant.
async fn setup_handler(State(device): State<Arc<EmulatedSwitch>>, method: Method) -> Response {
    info!("{} << {} /setup.xml", device.friendly_name(), method);

    let document = setup::setup_document(device.friendly_name(), device.binary_state());
    match setup::to_xml_string(&document) {
        Ok(xml) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/xml; charset=\"utf-8\"")],
            xml,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to serialize setup document: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Accepte toute requête de contrôle basicevent, sans mutation d'état.
async fn basicevent_handler(
    State(device): State<Arc<EmulatedSwitch>>,
    method: Method,
) -> StatusCode {
    info!(
        "{} << {} {}",
        device.friendly_name(),
        method,
        setup::CONTROL_URL
    );
    StatusCode::NO_CONTENT
}

async fn not_found_handler(
    State(device): State<Arc<EmulatedSwitch>>,
    method: Method,
    uri: Uri,
) -> StatusCode {
    info!("404 {} << {} {}", device.friendly_name(), method, uri);
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SwitchOptions;
    use emussdp::{SsdpMessage, SsdpMultiplexer, SsdpTransport};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::net::SocketAddr;
    use tower::util::ServiceExt;

    struct InertTransport;

    impl SsdpTransport for InertTransport {
        fn start(&self, _multiplexer: Arc<SsdpMultiplexer>) -> std::io::Result<()> {
            Ok(())
        }

        fn send_unicast(&self, _to: SocketAddr, _message: &SsdpMessage) -> std::io::Result<()> {
            Ok(())
        }

        fn send_multicast(&self, _message: &SsdpMessage) -> std::io::Result<()> {
            Ok(())
        }

        fn stop(&self) {}
    }

    async fn test_device(binary_state: u8) -> Arc<EmulatedSwitch> {
        let mux = SsdpMultiplexer::new(Arc::new(InertTransport));
        let mut options = SwitchOptions::named("Lampe salon");
        options.binary_state = binary_state;
        EmulatedSwitch::start(options, mux).await.unwrap()
    }

    #[tokio::test]
    async fn test_setup_xml_returns_device_description() {
        let device = test_device(1).await;
        let router = control_router(Arc::clone(&device));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/setup.xml")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/xml; charset=\"utf-8\"")
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("<friendlyName>Lampe salon</friendlyName>"));
        assert!(body.contains("<binaryState>1</binaryState>"));
        assert!(body.contains("urn:Belkin:device:controllee:1"));

        device.close();
    }

    #[tokio::test]
    async fn test_setup_xml_reflects_current_state() {
        let device = test_device(0).await;

        device.set_binary_state(1);

        let response = control_router(Arc::clone(&device))
            .oneshot(
                Request::builder()
                    .uri("/setup.xml")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("<binaryState>1</binaryState>"));

        device.close();
    }

    #[tokio::test]
    async fn test_basicevent_control_is_no_content() {
        let device = test_device(0).await;

        let response = control_router(Arc::clone(&device))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upnp/control/basicevent1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());

        device.close();
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let device = test_device(0).await;

        let response = control_router(Arc::clone(&device))
            .oneshot(
                Request::builder()
                    .uri("/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());

        device.close();
    }

    #[tokio::test]
    async fn test_advertised_event_paths_are_not_served() {
        let device = test_device(0).await;
        let router = control_router(Arc::clone(&device));

        for path in ["/upnp/event/basicevent1", "/eventservice.xml"] {
            let response = router
                .clone()
                .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        device.close();
    }
}
