//! Génération du document de description `setup.xml`.
//!
//! Le document est construit élément par élément avec `xmltree` puis
//! sérialisé via `EmitterConfig` : l'attribut `xmlns` du root doit rester
//! un attribut, pas un nœud texte, et les wrappers de plus haut niveau se
//! trompent là-dessus.

use emussdp::{URN_BELKIN_BASICEVENT, URN_BELKIN_CONTROLLEE};
use xmltree::{Element, EmitterConfig, XMLNode};

/// Namespace du document de description Belkin
pub const SETUP_XMLNS: &str = "urn:Belkin:device-1-0";

/// Identifiant du service basicevent
pub const SERVICE_ID_BASICEVENT: &str = "urn:Belkin:serviceId:basicevent1";

/// Chemin de contrôle du service basicevent
pub const CONTROL_URL: &str = "/upnp/control/basicevent1";

/// Chemin d'abonnement aux événements (annoncé mais non servi)
pub const EVENT_SUB_URL: &str = "/upnp/event/basicevent1";

/// Chemin du descripteur de service (annoncé mais non servi)
pub const SCPD_URL: &str = "/eventservice.xml";

fn text_element(name: &str, value: impl Into<String>) -> Element {
    let mut element = Element::new(name);
    element.children.push(XMLNode::Text(value.into()));
    element
}

/// Construit le document de description d'un switch émulé.
///
/// Reflète l'état courant du device : le `binaryState` est celui du moment
/// de la requête, pas celui de la construction.
pub fn setup_document(friendly_name: &str, binary_state: u8) -> Element {
    let mut root = Element::new("root");
    root.attributes
        .insert("xmlns".to_string(), SETUP_XMLNS.to_string());

    // specVersion
    let mut spec = Element::new("specVersion");
    spec.children
        .push(XMLNode::Element(text_element("major", "1")));
    spec.children
        .push(XMLNode::Element(text_element("minor", "0")));
    root.children.push(XMLNode::Element(spec));

    // device
    let mut device = Element::new("device");
    device.children.push(XMLNode::Element(text_element(
        "deviceType",
        URN_BELKIN_CONTROLLEE,
    )));
    device.children.push(XMLNode::Element(text_element(
        "friendlyName",
        friendly_name,
    )));
    device.children.push(XMLNode::Element(text_element(
        "binaryState",
        binary_state.to_string(),
    )));

    // serviceList : le seul service qu'un controllee expose
    let mut service = Element::new("service");
    service.children.push(XMLNode::Element(text_element(
        "serviceType",
        URN_BELKIN_BASICEVENT,
    )));
    service.children.push(XMLNode::Element(text_element(
        "serviceId",
        SERVICE_ID_BASICEVENT,
    )));
    service
        .children
        .push(XMLNode::Element(text_element("controlURL", CONTROL_URL)));
    service
        .children
        .push(XMLNode::Element(text_element("eventSubURL", EVENT_SUB_URL)));
    service
        .children
        .push(XMLNode::Element(text_element("SCPDURL", SCPD_URL)));

    let mut service_list = Element::new("serviceList");
    service_list.children.push(XMLNode::Element(service));
    device.children.push(XMLNode::Element(service_list));

    root.children.push(XMLNode::Element(device));
    root
}

/// Sérialise un document avec l'en-tête XML attendu par les clients Belkin.
pub fn to_xml_string(element: &Element) -> Result<String, xmltree::Error> {
    let config = EmitterConfig::new()
        .perform_indent(true)
        .indent_string("  ")
        .write_document_declaration(false);

    let mut output = Vec::new();
    element.write_with_config(&mut output, config)?;

    let mut xml = String::from_utf8_lossy(&output).to_string();
    xml.insert_str(0, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_document_structure() {
        let document = setup_document("Lampe salon", 1);

        assert_eq!(document.name, "root");
        assert_eq!(
            document.attributes.get("xmlns").map(String::as_str),
            Some(SETUP_XMLNS)
        );

        let device = document.get_child("device").expect("device element");
        assert_eq!(
            device.get_child("deviceType").and_then(Element::get_text),
            Some(URN_BELKIN_CONTROLLEE.into())
        );
        assert_eq!(
            device.get_child("friendlyName").and_then(Element::get_text),
            Some("Lampe salon".into())
        );
        assert_eq!(
            device.get_child("binaryState").and_then(Element::get_text),
            Some("1".into())
        );
    }

    #[test]
    fn test_setup_document_service_entry() {
        let document = setup_document("Prise", 0);

        let service = document
            .get_child("device")
            .and_then(|d| d.get_child("serviceList"))
            .and_then(|l| l.get_child("service"))
            .expect("service element");

        assert_eq!(
            service.get_child("serviceType").and_then(Element::get_text),
            Some(URN_BELKIN_BASICEVENT.into())
        );
        assert_eq!(
            service.get_child("controlURL").and_then(Element::get_text),
            Some(CONTROL_URL.into())
        );
        assert_eq!(
            service.get_child("SCPDURL").and_then(Element::get_text),
            Some(SCPD_URL.into())
        );
    }

    #[test]
    fn test_serialized_document_parses_back() {
        let document = setup_document("Cafetière", 0);
        let xml = to_xml_string(&document).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        // Une seule déclaration XML
        assert_eq!(xml.matches("<?xml").count(), 1);

        let parsed = Element::parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.name, "root");
        assert_eq!(
            parsed
                .get_child("device")
                .and_then(|d| d.get_child("friendlyName"))
                .and_then(Element::get_text),
            Some("Cafetière".into())
        );
    }
}
