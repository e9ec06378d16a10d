//! Enrichissement des en-têtes SSDP sortants.
//!
//! Les clients Belkin attendent sur chaque message des en-têtes que le
//! protocole SSDP standard ne prévoit pas : un marqueur vendeur et
//! l'identifiant du device émetteur dans `01-NLS`. Comme le socket est
//! partagé entre tous les devices, l'identifiant est retrouvé en comparant
//! le `LOCATION` du message aux endpoints enregistrés.

use std::sync::Arc;

use crate::endpoint::DiscoveryEndpoint;
use crate::message::SsdpMessage;

/// Valeur de l'en-tête OPT attendue par les clients Belkin
pub const OPT_HEADER: &str = "\"http://schemas.upnp.org/upnp/1/0/\"; ns=01";

/// User-Agent vendeur, tel qu'émis par un vrai WeMo
pub const VENDOR_USER_AGENT: &str = "redsonic";

/// En-tête SERVER d'un vrai WeMo
pub const VENDOR_SERVER: &str = "Unspecified, UPnP/1.0, Unspecified";

/// Enrichit un message sortant avec les en-têtes vendeur.
///
/// Le device propriétaire est retrouvé par égalité stricte entre le
/// `LOCATION` du message et la location d'un endpoint enregistré ; le
/// premier trouvé gagne. Les messages sans `LOCATION` (byebye, certaines
/// réponses) partent sans `01-NLS` : ils n'en ont pas besoin.
///
/// Les en-têtes sont mutés en place, avant la sérialisation filaire.
pub fn enrich_outbound(members: &[Arc<DiscoveryEndpoint>], message: &mut SsdpMessage) {
    let owner_uuid = message.header("LOCATION").and_then(|location| {
        members
            .iter()
            .find(|member| member.location() == location)
            .map(|member| member.device_uuid().to_string())
    });

    message.set_header("OPT", OPT_HEADER);
    if let Some(uuid) = owner_uuid {
        message.set_header("01-NLS", uuid);
    }
    message.set_header("X-User-Agent", VENDOR_USER_AGENT);
    message.set_header("SERVER", VENDOR_SERVER);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SsdpMethod;

    fn members() -> Vec<Arc<DiscoveryEndpoint>> {
        vec![
            Arc::new(DiscoveryEndpoint::new(
                "aaaaaaaa-0000-4000-8000-000000000001",
                "http://192.168.1.10:9100/setup.xml",
            )),
            Arc::new(DiscoveryEndpoint::new(
                "bbbbbbbb-0000-4000-8000-000000000002",
                "http://192.168.1.10:9101/setup.xml",
            )),
        ]
    }

    #[test]
    fn test_enrich_matches_owner_by_location() {
        let members = members();
        let mut message = SsdpMessage::new(SsdpMethod::Notify);
        message.set_header("LOCATION", "http://192.168.1.10:9101/setup.xml");

        enrich_outbound(&members, &mut message);

        assert_eq!(
            message.header("01-NLS"),
            Some("bbbbbbbb-0000-4000-8000-000000000002")
        );
        assert_eq!(message.header("OPT"), Some(OPT_HEADER));
        assert_eq!(message.header("X-User-Agent"), Some(VENDOR_USER_AGENT));
        assert_eq!(message.header("SERVER"), Some(VENDOR_SERVER));
    }

    #[test]
    fn test_enrich_without_location_omits_identifier() {
        let members = members();
        let mut message = SsdpMessage::new(SsdpMethod::Notify);
        message.set_header("NTS", "ssdp:byebye");

        enrich_outbound(&members, &mut message);

        assert!(message.header("01-NLS").is_none());
        assert_eq!(message.header("OPT"), Some(OPT_HEADER));
    }

    #[test]
    fn test_enrich_with_unknown_location_omits_identifier() {
        let members = members();
        let mut message = SsdpMessage::new(SsdpMethod::Notify);
        message.set_header("LOCATION", "http://192.168.1.99:9999/setup.xml");

        enrich_outbound(&members, &mut message);

        assert!(message.header("01-NLS").is_none());
    }
}
