//! Le device virtuel et son cycle de vie.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use emuconfig::get_config;
use emussdp::{DiscoveryEndpoint, SsdpMultiplexer};

use crate::control::control_router;
use crate::errors::DeviceError;
use crate::options::SwitchOptions;

/// États du cycle de vie d'un device émulé
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Le listener de contrôle est en cours de bind
    Binding,

    /// Listener lié et identité de découverte enregistrée
    Listening,

    /// Listener et identité de découverte démontés
    Closed,
}

/// Un switch WeMo émulé.
///
/// Chaque instance possède son propre listener HTTP de contrôle et son
/// [`DiscoveryEndpoint`] enregistré dans le multiplexeur SSDP partagé.
/// Le premier device dont le listener est prêt déclenche le démarrage du
/// transport partagé ; les suivants ne redéclenchent rien.
///
/// `start` rend le device une fois — et seulement une fois — l'écoute
/// effective : le futur résolu tient lieu d'événement "listening", avec le
/// device lui-même en payload.
pub struct EmulatedSwitch {
    /// UUID stable, généré à la construction si non fourni
    uuid: String,

    /// Nom affiché dans l'app WeMo et Alexa
    friendly_name: String,

    /// Adresse IP annoncée, résolue une fois à la construction
    host: String,

    /// Port réel du listener de contrôle, résolu au bind
    port: u16,

    /// État binaire courant (0 = off, 1 = on)
    binary_state: AtomicU8,

    state: RwLock<DeviceState>,

    multiplexer: Arc<SsdpMultiplexer>,

    endpoint: Arc<DiscoveryEndpoint>,

    /// Signal d'arrêt gracieux du listener axum
    shutdown: CancellationToken,

    closed: AtomicBool,
}

impl EmulatedSwitch {
    /// Crée et démarre un switch émulé.
    ///
    /// Valide les options (fail-fast : sans `friendly_name`, rien n'est lié
    /// ni enregistré), lie le listener de contrôle, enregistre l'identité
    /// de découverte puis démarre le transport SSDP partagé si c'est le
    /// premier device du processus.
    ///
    /// # Errors
    ///
    /// [`DeviceError::MissingFriendlyName`] si le nom manque,
    /// [`DeviceError::Bind`] si le port demandé est indisponible,
    /// [`DeviceError::TransportStart`] si le transport partagé ne démarre
    /// pas (fatal, non retenté).
    pub async fn start(
        options: SwitchOptions,
        multiplexer: Arc<SsdpMultiplexer>,
    ) -> Result<Arc<Self>, DeviceError> {
        let friendly_name = options
            .friendly_name
            .ok_or(DeviceError::MissingFriendlyName)?;
        let uuid = options
            .uuid
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let host = get_config().get_host_address();

        let listener = TcpListener::bind(("0.0.0.0", options.port))
            .await
            .map_err(DeviceError::Bind)?;
        let port = listener.local_addr().map_err(DeviceError::Bind)?.port();
        let location = format!("http://{}:{}/setup.xml", host, port);

        let endpoint = Arc::new(DiscoveryEndpoint::new(uuid.clone(), location));
        let device = Arc::new(Self {
            uuid,
            friendly_name,
            host,
            port,
            binary_state: AtomicU8::new(options.binary_state),
            state: RwLock::new(DeviceState::Binding),
            multiplexer: Arc::clone(&multiplexer),
            endpoint: Arc::clone(&endpoint),
            shutdown: CancellationToken::new(),
            closed: AtomicBool::new(false),
        });

        let router = control_router(Arc::clone(&device));
        let token = device.shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
            {
                warn!("❌ Control listener error: {}", e);
            }
        });

        // L'enregistrement précède le retour à l'appelant : aucun message
        // sortant ne peut référencer une location absente du registre.
        multiplexer.register(endpoint);
        multiplexer
            .start_once()
            .map_err(DeviceError::TransportStart)?;

        *device.state.write().unwrap() = DeviceState::Listening;
        info!(
            "✅ {} listening at {} (uuid {})",
            device.friendly_name,
            device.location(),
            device.uuid
        );

        Ok(device)
    }

    /// UUID stable du device
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Nom affiché du device
    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    /// Adresse IP annoncée
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port réel du listener de contrôle
    pub fn port(&self) -> u16 {
        self.port
    }

    /// URL de description annoncée en SSDP
    pub fn location(&self) -> &str {
        self.endpoint.location()
    }

    /// Identité de découverte du device
    pub fn endpoint(&self) -> &Arc<DiscoveryEndpoint> {
        &self.endpoint
    }

    /// État courant du cycle de vie
    pub fn state(&self) -> DeviceState {
        *self.state.read().unwrap()
    }

    /// État binaire courant (0 = off, 1 = on)
    pub fn binary_state(&self) -> u8 {
        self.binary_state.load(Ordering::SeqCst)
    }

    /// Change l'état binaire ; visible au prochain fetch de setup.xml
    pub fn set_binary_state(&self, value: u8) {
        self.binary_state.store(value, Ordering::SeqCst);
        info!("🔀 {} binaryState = {}", self.friendly_name, value);
    }

    /// Ferme le device : arrêt du listener de contrôle et désenregistrement
    /// de l'identité de découverte.
    ///
    /// Idempotent : les appels suivants ne font rien.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("🔌 Closing {} ({})", self.friendly_name, self.location());
        self.shutdown.cancel();
        self.multiplexer.unregister(&self.uuid);
        *self.state.write().unwrap() = DeviceState::Closed;
    }
}

impl Drop for EmulatedSwitch {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for EmulatedSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmulatedSwitch")
            .field("uuid", &self.uuid)
            .field("friendly_name", &self.friendly_name)
            .field("location", &self.location())
            .field("state", &self.state())
            .finish()
    }
}
