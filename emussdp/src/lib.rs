//! # Module SSDP - Découverte multiplexée des switches émulés
//!
//! Ce module implémente la couche SSDP (Simple Service Discovery Protocol)
//! d'EMUSwitch : un seul endpoint UDP partagé derrière lequel N devices
//! virtuels s'annoncent et répondent aux recherches comme autant de prises
//! WeMo indépendantes.
//!
//! ## Fonctionnalités
//!
//! - ✅ Multiplexage de N identités de device sur un seul socket 1900
//! - ✅ Réponse aux M-SEARCH en unicast, fan-out vers chaque device
//! - ✅ Envoi de NOTIFY alive/byebye en multicast
//! - ✅ Enrichissement des en-têtes sortants (01-NLS, OPT, X-User-Agent)
//! - ✅ Annonces périodiques automatiques
//! - ✅ Démarrage unique du transport, arrêt propre avec byebye
//!
//! ## Architecture
//!
//! - [`SsdpMultiplexer`] : Registre process-wide des endpoints de découverte
//! - [`DiscoveryEndpoint`] : Identité SSDP d'un device émulé (1:1)
//! - [`SsdpTransport`] / [`MulticastTransport`] : Seam d'I/O UDP multicast
//! - [`SsdpMessage`] : Modèle de message NOTIFY / réponse M-SEARCH
//!
//! ## Constantes SSDP
//!
//! - **Multicast Address**: 239.255.255.250:1900
//! - **Max-Age**: 86400 secondes (24 heures, ce qu'annonce un vrai WeMo)

pub mod config_ext;
pub mod endpoint;
pub mod headers;
pub mod message;
pub mod multiplexer;
pub mod transport;

pub use config_ext::SsdpConfigExt;
pub use endpoint::DiscoveryEndpoint;
pub use message::{SsdpMessage, SsdpMethod};
pub use multiplexer::SsdpMultiplexer;
pub use transport::{MulticastTransport, SsdpTransport};

/// Adresse multicast SSDP
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// Port SSDP
pub const SSDP_PORT: u16 = 1900;

/// Durée de validité des annonces (en secondes)
pub const MAX_AGE: u32 = 86400;

/// Cible de recherche "tout le monde répond"
pub const SSDP_ALL: &str = "ssdp:all";

/// Type de device Belkin annoncé par les switches émulés
pub const URN_BELKIN_CONTROLLEE: &str = "urn:Belkin:device:controllee:1";

/// Service Belkin de commande on/off
pub const URN_BELKIN_BASICEVENT: &str = "urn:Belkin:service:basicevent:1";
