//! Multiplexeur SSDP : un transport partagé, N identités de device.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use crate::endpoint::DiscoveryEndpoint;
use crate::headers::enrich_outbound;
use crate::message::SsdpMessage;
use crate::transport::{MulticastTransport, SsdpTransport};
use crate::SSDP_ALL;

/// Instance process-wide du multiplexeur, créée sur le transport multicast réel.
///
/// Utilise Lazy pour une initialisation paresseuse : le socket UDP n'est
/// ouvert qu'au premier `start_once`, jamais au chargement.
static SHARED_MULTIPLEXER: Lazy<Arc<SsdpMultiplexer>> =
    Lazy::new(|| SsdpMultiplexer::new(Arc::new(MulticastTransport::new())));

/// Réécrit la cible de recherche Belkin à joker en `ssdp:all`.
///
/// L'app WeMo et Echo cherchent `urn:Belkin:device:*` (ou `**`, ou la forme
/// nue sans astérisque) sans respecter la grammaire hiérarchique SSDP. On
/// élargit volontairement cette seule forme en "tout le monde répond" ;
/// toute autre cible est transmise telle quelle. Cas particulier nommé et
/// isolé, à ne pas généraliser dans le matching.
fn broaden_belkin_wildcard(search_target: &str) -> &str {
    if search_target.trim_end_matches('*').ends_with("Belkin:device:") {
        SSDP_ALL
    } else {
        search_target
    }
}

/// Registre process-wide des endpoints de découverte.
///
/// Tous les devices émulés partagent le même transport UDP : le
/// multiplexeur maintient la liste ordonnée de leurs endpoints, fan-out
/// chaque recherche et chaque annonce vers chacun d'eux, et garantit que
/// le transport partagé n'est démarré qu'une seule fois par processus.
///
/// Le multiplexeur est un objet injectable (les tests en construisent un
/// sur un transport factice) ; l'application passe par [`SsdpMultiplexer::shared`].
pub struct SsdpMultiplexer {
    /// Vrai dès que le démarrage du transport a été tenté ; jamais remis à faux
    started: AtomicBool,

    /// Endpoints enregistrés, dans l'ordre d'enregistrement
    members: RwLock<Vec<Arc<DiscoveryEndpoint>>>,

    /// Seam d'I/O UDP partagé par tous les endpoints
    transport: Arc<dyn SsdpTransport>,

    /// Référence faible sur soi-même, remise au transport au démarrage
    self_ref: Weak<SsdpMultiplexer>,
}

impl SsdpMultiplexer {
    /// Crée un multiplexeur sur le transport donné
    pub fn new(transport: Arc<dyn SsdpTransport>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            started: AtomicBool::new(false),
            members: RwLock::new(Vec::new()),
            transport,
            self_ref: self_ref.clone(),
        })
    }

    /// Retourne le multiplexeur partagé du processus
    pub fn shared() -> Arc<SsdpMultiplexer> {
        Arc::clone(&SHARED_MULTIPLEXER)
    }

    /// Vrai si le démarrage du transport a déjà été tenté
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Retourne les endpoints enregistrés, dans l'ordre d'enregistrement
    pub fn members(&self) -> Vec<Arc<DiscoveryEndpoint>> {
        self.members.read().unwrap().clone()
    }

    /// Nombre d'endpoints enregistrés
    pub fn member_count(&self) -> usize {
        self.members.read().unwrap().len()
    }

    /// Enregistre l'endpoint d'un device.
    ///
    /// Aucun contrôle d'unicité : un double enregistrement ne coûte que des
    /// réponses dupliquées. Si le transport tourne déjà, l'endpoint annonce
    /// immédiatement sa présence en multicast.
    pub fn register(&self, endpoint: Arc<DiscoveryEndpoint>) {
        let messages = {
            let mut members = self.members.write().unwrap();
            members.push(Arc::clone(&endpoint));
            info!(
                "📡 SSDP endpoint registered: {} ({} member(s))",
                endpoint.location(),
                members.len()
            );

            if self.is_started() {
                let mut messages = endpoint.alive_messages();
                for message in &mut messages {
                    enrich_outbound(&members, message);
                }
                messages
            } else {
                Vec::new()
            }
        };

        for message in &messages {
            if let Err(e) = self.transport.send_multicast(message) {
                warn!("❌ Failed to send NOTIFY alive for {}: {}", endpoint.location(), e);
            }
        }
    }

    /// Désenregistre l'endpoint d'un device par UUID.
    ///
    /// Appelé par `close()` du device : l'entrée est retirée du registre et,
    /// si le transport tourne, un byebye part en multicast pour que les
    /// clients oublient le device.
    pub fn unregister(&self, device_uuid: &str) -> Option<Arc<DiscoveryEndpoint>> {
        let removed = {
            let mut members = self.members.write().unwrap();
            let position = members
                .iter()
                .position(|member| member.device_uuid() == device_uuid)?;
            members.remove(position)
        };

        info!("👋 SSDP endpoint unregistered: {}", removed.location());

        if self.is_started() {
            let mut messages = removed.byebye_messages();
            {
                let members = self.members.read().unwrap();
                for message in &mut messages {
                    enrich_outbound(&members, message);
                }
            }
            for message in &messages {
                if let Err(e) = self.transport.send_multicast(message) {
                    warn!("❌ Failed to send NOTIFY byebye for {}: {}", removed.location(), e);
                }
            }
        }

        Some(removed)
    }

    /// Fan-out d'un M-SEARCH vers tous les endpoints.
    ///
    /// La cible passe d'abord par [`broaden_belkin_wildcard`], puis chaque
    /// endpoint décide indépendamment de répondre. Retourne les réponses
    /// enrichies, prêtes à partir en unicast vers le demandeur.
    pub fn dispatch_search(&self, search_target: &str, from: SocketAddr) -> Vec<SsdpMessage> {
        let target = broaden_belkin_wildcard(search_target);
        let members = self.members.read().unwrap();

        debug!(
            "M-SEARCH from {} with ST={} ({} member(s))",
            from,
            target,
            members.len()
        );

        let mut responses: Vec<SsdpMessage> = members
            .iter()
            .flat_map(|member| member.search_responses(target))
            .collect();
        for response in &mut responses {
            enrich_outbound(&members, response);
        }
        responses
    }

    /// Fan-out des NOTIFY alive de tous les endpoints, enrichis
    pub fn dispatch_alive(&self) -> Vec<SsdpMessage> {
        let members = self.members.read().unwrap();
        let mut messages: Vec<SsdpMessage> = members
            .iter()
            .flat_map(|member| member.alive_messages())
            .collect();
        for message in &mut messages {
            enrich_outbound(&members, message);
        }
        messages
    }

    /// Fan-out des NOTIFY byebye de tous les endpoints, enrichis
    pub fn dispatch_byebye(&self) -> Vec<SsdpMessage> {
        let members = self.members.read().unwrap();
        let mut messages: Vec<SsdpMessage> = members
            .iter()
            .flat_map(|member| member.byebye_messages())
            .collect();
        for message in &mut messages {
            enrich_outbound(&members, message);
        }
        messages
    }

    /// Démarre le transport partagé si ce n'est pas déjà fait.
    ///
    /// Le flag est levé avant la tentative : un échec de démarrage est fatal
    /// pour l'appelant et n'est jamais retenté. Les devices créés ensuite ne
    /// redéclenchent rien.
    pub fn start_once(&self) -> std::io::Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("🚀 Starting shared SSDP transport...");
        match self.self_ref.upgrade() {
            Some(multiplexer) => self.transport.start(multiplexer),
            // self est détenu par un Arc vivant pendant cet appel
            None => Ok(()),
        }
    }

    /// Arrête le transport partagé en signalant le départ de chaque device.
    ///
    /// Appelé sur le chemin de sortie du processus ; best-effort, sans ordre
    /// garanti entre devices.
    pub fn shutdown(&self) {
        if self.is_started() {
            info!("👋 Shutting down SSDP, sending byebye for all devices");
            for message in self.dispatch_byebye() {
                if let Err(e) = self.transport.send_multicast(&message) {
                    warn!("❌ Failed to send NOTIFY byebye: {}", e);
                }
            }
        }
        self.transport.stop();
    }
}

impl std::fmt::Debug for SsdpMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsdpMultiplexer")
            .field("started", &self.is_started())
            .field("member_count", &self.member_count())
            .finish()
    }
}
