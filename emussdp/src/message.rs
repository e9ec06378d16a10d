//! Modèle des messages SSDP sortants.
//!
//! Les endpoints produisent des messages, le multiplexeur les enrichit,
//! le transport les sérialise et les envoie. Les en-têtes restent
//! mutables jusqu'à l'envoi.

/// Ligne de départ d'un message SSDP sortant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsdpMethod {
    /// Annonce multicast (`NOTIFY * HTTP/1.1`)
    Notify,

    /// Réponse unicast à un M-SEARCH (`HTTP/1.1 200 OK`)
    SearchResponse,
}

impl SsdpMethod {
    fn start_line(&self) -> &'static str {
        match self {
            SsdpMethod::Notify => "NOTIFY * HTTP/1.1",
            SsdpMethod::SearchResponse => "HTTP/1.1 200 OK",
        }
    }
}

/// Message SSDP avec ses en-têtes ordonnés
#[derive(Debug, Clone)]
pub struct SsdpMessage {
    method: SsdpMethod,
    headers: Vec<(String, String)>,
}

impl SsdpMessage {
    /// Crée un message vide pour la méthode donnée
    pub fn new(method: SsdpMethod) -> Self {
        Self {
            method,
            headers: Vec::new(),
        }
    }

    /// Retourne la méthode du message
    pub fn method(&self) -> SsdpMethod {
        self.method
    }

    /// Retourne la valeur d'un en-tête (nom insensible à la casse)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Définit un en-tête, en remplaçant sa valeur s'il existe déjà.
    ///
    /// L'ordre d'insertion est conservé, les clients WeMo étant pointilleux
    /// sur la forme des réponses.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    /// Retourne tous les en-têtes dans l'ordre d'insertion
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Sérialise le message au format filaire SSDP (CRLF, ligne vide finale)
    pub fn to_wire(&self) -> String {
        let mut wire = String::new();
        wire.push_str(self.method.start_line());
        wire.push_str("\r\n");

        for (name, value) in &self.headers {
            if value.is_empty() {
                // EXT: se sérialise sans valeur ni espace
                wire.push_str(name);
                wire.push(':');
            } else {
                wire.push_str(name);
                wire.push_str(": ");
                wire.push_str(value);
            }
            wire.push_str("\r\n");
        }

        wire.push_str("\r\n");
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_wire_format() {
        let mut message = SsdpMessage::new(SsdpMethod::Notify);
        message.set_header("HOST", "239.255.255.250:1900");
        message.set_header("NTS", "ssdp:alive");

        let wire = message.to_wire();
        assert!(wire.starts_with("NOTIFY * HTTP/1.1\r\n"));
        assert!(wire.contains("HOST: 239.255.255.250:1900\r\n"));
        assert!(wire.contains("NTS: ssdp:alive\r\n"));
        assert!(wire.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_search_response_start_line() {
        let message = SsdpMessage::new(SsdpMethod::SearchResponse);
        assert!(message.to_wire().starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn test_empty_header_value_has_no_trailing_space() {
        let mut message = SsdpMessage::new(SsdpMethod::SearchResponse);
        message.set_header("EXT", "");

        assert!(message.to_wire().contains("EXT:\r\n"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut message = SsdpMessage::new(SsdpMethod::Notify);
        message.set_header("LOCATION", "http://192.168.1.10:9100/setup.xml");

        assert_eq!(
            message.header("location"),
            Some("http://192.168.1.10:9100/setup.xml")
        );
    }

    #[test]
    fn test_set_header_replaces_existing_value() {
        let mut message = SsdpMessage::new(SsdpMethod::Notify);
        message.set_header("SERVER", "placeholder");
        message.set_header("SERVER", "Unspecified, UPnP/1.0, Unspecified");

        assert_eq!(message.header("SERVER"), Some("Unspecified, UPnP/1.0, Unspecified"));
        assert_eq!(
            message
                .headers()
                .iter()
                .filter(|(k, _)| k == "SERVER")
                .count(),
            1
        );
    }
}
