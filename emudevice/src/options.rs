//! Options de construction d'un switch émulé.

use emuconfig::DeviceConfig;
use serde::Deserialize;

/// Options reconnues à la création d'un [`EmulatedSwitch`].
///
/// Seul `friendly_name` est obligatoire ; tout le reste a une valeur par
/// défaut raisonnable. La validation est faite par
/// `EmulatedSwitch::start`, qui échoue sans rien construire si le nom
/// manque.
///
/// [`EmulatedSwitch`]: crate::device::EmulatedSwitch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SwitchOptions {
    /// Nom affiché dans l'app WeMo et Alexa (obligatoire)
    pub friendly_name: Option<String>,

    /// UUID stable du device ; généré (v4) si absent
    pub uuid: Option<String>,

    /// Port TCP du listener de contrôle ; 0 = port éphémère choisi par l'OS
    pub port: u16,

    /// État binaire initial (0 = off, 1 = on)
    pub binary_state: u8,
}

impl SwitchOptions {
    /// Options minimales : un nom, tout le reste par défaut
    pub fn named(friendly_name: impl Into<String>) -> Self {
        Self {
            friendly_name: Some(friendly_name.into()),
            ..Self::default()
        }
    }
}

impl From<DeviceConfig> for SwitchOptions {
    fn from(config: DeviceConfig) -> Self {
        Self {
            friendly_name: config.friendly_name,
            uuid: config.uuid,
            port: config.port.unwrap_or(0),
            binary_state: config.initial_state.unwrap_or(0),
        }
    }
}
