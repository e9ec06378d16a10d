//! Identité SSDP d'un device émulé.

use crate::message::{SsdpMessage, SsdpMethod};
use crate::{MAX_AGE, SSDP_ALL, SSDP_MULTICAST_ADDR, SSDP_PORT, URN_BELKIN_BASICEVENT, URN_BELKIN_CONTROLLEE};

/// Endpoint de découverte appartenant à exactement un device émulé.
///
/// Détenu en 1:1 par son switch : l'endpoint ne connaît que l'UUID du
/// device, l'URL de description annoncée et les types de notification
/// Belkin. Il ne fait aucune I/O : il produit des [`SsdpMessage`] que le
/// multiplexeur enrichit et que le transport envoie.
#[derive(Debug, Clone)]
pub struct DiscoveryEndpoint {
    /// UUID du device propriétaire (sans le préfixe "uuid:")
    device_uuid: String,

    /// URL de description annoncée (`http://<host>:<port>/setup.xml`)
    location: String,

    /// Durée de validité des annonces, en secondes
    max_age: u32,

    /// Types de notification (NT) annoncés
    notification_types: Vec<String>,
}

impl DiscoveryEndpoint {
    /// Crée l'endpoint d'un switch émulé.
    ///
    /// Les types de notification sont ceux qu'un vrai WeMo publie :
    /// l'UUID du device, le type de device "controllee" et le service
    /// "basicevent".
    pub fn new(device_uuid: impl Into<String>, location: impl Into<String>) -> Self {
        let device_uuid = device_uuid.into();
        let notification_types = vec![
            format!("uuid:{}", device_uuid),
            URN_BELKIN_CONTROLLEE.to_string(),
            URN_BELKIN_BASICEVENT.to_string(),
        ];

        Self {
            device_uuid,
            location: location.into(),
            max_age: MAX_AGE,
            notification_types,
        }
    }

    /// Remplace la durée de validité des annonces
    pub fn with_max_age(mut self, max_age: u32) -> Self {
        self.max_age = max_age;
        self
    }

    /// UUID du device propriétaire
    pub fn device_uuid(&self) -> &str {
        &self.device_uuid
    }

    /// URL de description annoncée
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Durée de validité des annonces
    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    /// Types de notification annoncés
    pub fn notification_types(&self) -> &[String] {
        &self.notification_types
    }

    fn usn(&self, nt: &str) -> String {
        if nt.starts_with("uuid:") {
            nt.to_string()
        } else {
            format!("uuid:{}::{}", self.device_uuid, nt)
        }
    }

    /// Construit les réponses de ce device à un M-SEARCH.
    ///
    /// `ssdp:all` produit une réponse par type de notification ; une cible
    /// exacte produit une seule réponse ; toute autre cible ne produit rien,
    /// le device reste silencieux.
    pub fn search_responses(&self, search_target: &str) -> Vec<SsdpMessage> {
        let mut matched = Vec::new();

        if search_target == SSDP_ALL {
            matched.extend(self.notification_types.iter().cloned());
        } else if self
            .notification_types
            .iter()
            .any(|nt| nt == search_target)
        {
            matched.push(search_target.to_string());
        } else {
            return Vec::new();
        }

        let date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();

        matched
            .iter()
            .map(|nt| {
                let mut message = SsdpMessage::new(SsdpMethod::SearchResponse);
                message.set_header("CACHE-CONTROL", format!("max-age={}", self.max_age));
                message.set_header("DATE", date.clone());
                message.set_header("EXT", "");
                message.set_header("LOCATION", &self.location);
                message.set_header("ST", nt);
                message.set_header("USN", self.usn(nt));
                message
            })
            .collect()
    }

    /// Construit les NOTIFY ssdp:alive de ce device (un par NT)
    pub fn alive_messages(&self) -> Vec<SsdpMessage> {
        self.notification_types
            .iter()
            .map(|nt| {
                let mut message = SsdpMessage::new(SsdpMethod::Notify);
                message.set_header("HOST", format!("{}:{}", SSDP_MULTICAST_ADDR, SSDP_PORT));
                message.set_header("CACHE-CONTROL", format!("max-age={}", self.max_age));
                message.set_header("LOCATION", &self.location);
                message.set_header("NT", nt);
                message.set_header("NTS", "ssdp:alive");
                message.set_header("USN", self.usn(nt));
                message
            })
            .collect()
    }

    /// Construit les NOTIFY ssdp:byebye de ce device (un par NT)
    pub fn byebye_messages(&self) -> Vec<SsdpMessage> {
        self.notification_types
            .iter()
            .map(|nt| {
                let mut message = SsdpMessage::new(SsdpMethod::Notify);
                message.set_header("HOST", format!("{}:{}", SSDP_MULTICAST_ADDR, SSDP_PORT));
                message.set_header("NT", nt);
                message.set_header("NTS", "ssdp:byebye");
                message.set_header("USN", self.usn(nt));
                message
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> DiscoveryEndpoint {
        DiscoveryEndpoint::new("deadbeef-0000-4000-8000-000000000001", "http://192.168.1.10:9100/setup.xml")
    }

    #[test]
    fn test_notification_types_are_belkin() {
        let ep = endpoint();
        assert_eq!(
            ep.notification_types(),
            &[
                "uuid:deadbeef-0000-4000-8000-000000000001".to_string(),
                URN_BELKIN_CONTROLLEE.to_string(),
                URN_BELKIN_BASICEVENT.to_string(),
            ]
        );
    }

    #[test]
    fn test_search_all_answers_every_notification_type() {
        let responses = endpoint().search_responses(SSDP_ALL);
        assert_eq!(responses.len(), 3);

        for response in &responses {
            assert_eq!(
                response.header("LOCATION"),
                Some("http://192.168.1.10:9100/setup.xml")
            );
            assert!(response.header("DATE").is_some());
            assert_eq!(response.header("EXT"), Some(""));
        }
    }

    #[test]
    fn test_search_exact_target_answers_once() {
        let responses = endpoint().search_responses(URN_BELKIN_CONTROLLEE);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].header("ST"), Some(URN_BELKIN_CONTROLLEE));
        assert_eq!(
            responses[0].header("USN"),
            Some("uuid:deadbeef-0000-4000-8000-000000000001::urn:Belkin:device:controllee:1")
        );
    }

    #[test]
    fn test_search_unrelated_target_stays_silent() {
        let responses = endpoint().search_responses("urn:schemas-upnp-org:device:MediaRenderer:1");
        assert!(responses.is_empty());
    }

    #[test]
    fn test_uuid_notification_type_is_its_own_usn() {
        let ep = endpoint();
        let responses = ep.search_responses("uuid:deadbeef-0000-4000-8000-000000000001");
        assert_eq!(responses.len(), 1);
        assert_eq!(
            responses[0].header("USN"),
            Some("uuid:deadbeef-0000-4000-8000-000000000001")
        );
    }

    #[test]
    fn test_alive_messages_carry_location_and_nts() {
        let messages = endpoint().alive_messages();
        assert_eq!(messages.len(), 3);

        for message in &messages {
            assert_eq!(message.header("NTS"), Some("ssdp:alive"));
            assert_eq!(
                message.header("LOCATION"),
                Some("http://192.168.1.10:9100/setup.xml")
            );
            assert_eq!(message.header("CACHE-CONTROL"), Some("max-age=86400"));
        }
    }

    #[test]
    fn test_with_max_age_changes_cache_control() {
        let ep = endpoint().with_max_age(1800);
        assert_eq!(ep.max_age(), 1800);

        let responses = ep.search_responses(SSDP_ALL);
        assert_eq!(responses[0].header("CACHE-CONTROL"), Some("max-age=1800"));
    }

    #[test]
    fn test_byebye_messages_have_no_location() {
        let messages = endpoint().byebye_messages();
        assert_eq!(messages.len(), 3);

        for message in &messages {
            assert_eq!(message.header("NTS"), Some("ssdp:byebye"));
            assert!(message.header("LOCATION").is_none());
        }
    }
}
