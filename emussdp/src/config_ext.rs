//! Extension pour intégrer la configuration SSDP dans emuconfig
//!
//! Ce module fournit le trait `SsdpConfigExt` qui ajoute les réglages SSDP
//! à `emuconfig::Config`, selon le pattern d'extension utilisé partout dans
//! EMUSwitch : la crate de config reste agnostique du protocole.

use anyhow::Result;
use emuconfig::Config;
use serde_yaml::Value;

use crate::MAX_AGE;

/// Intervalle par défaut entre deux salves d'annonces (secondes)
pub const DEFAULT_ANNOUNCE_INTERVAL: u64 = (MAX_AGE / 2) as u64;

/// Trait d'extension pour la configuration SSDP
///
/// # Exemple
///
/// ```rust,ignore
/// use emuconfig::get_config;
/// use emussdp::SsdpConfigExt;
///
/// let config = get_config();
/// let interval = config.get_ssdp_announce_interval()?;
/// ```
pub trait SsdpConfigExt {
    /// Récupère l'intervalle entre deux salves de NOTIFY alive
    ///
    /// # Returns
    ///
    /// L'intervalle en secondes (défaut : max-age / 2)
    fn get_ssdp_announce_interval(&self) -> Result<u64>;

    /// Définit l'intervalle entre deux salves de NOTIFY alive
    fn set_ssdp_announce_interval(&self, seconds: u64) -> Result<()>;
}

impl SsdpConfigExt for Config {
    fn get_ssdp_announce_interval(&self) -> Result<u64> {
        match self.get_value(&["ssdp", "announce_interval"]) {
            Ok(Value::Number(n)) if n.is_u64() && n.as_u64().unwrap() > 0 => {
                Ok(n.as_u64().unwrap())
            }
            _ => Ok(DEFAULT_ANNOUNCE_INTERVAL),
        }
    }

    fn set_ssdp_announce_interval(&self, seconds: u64) -> Result<()> {
        self.set_value(
            &["ssdp", "announce_interval"],
            Value::Number(seconds.into()),
        )
    }
}
