//! Erreurs relatives aux devices émulés.

use thiserror::Error;

/// Erreurs de construction et de démarrage d'un device émulé.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Nom affiché manquant : aucun device n'est construit
    #[error("friendly name is required")]
    MissingFriendlyName,

    /// Échec du bind du listener de contrôle
    #[error("failed to bind control listener: {0}")]
    Bind(#[source] std::io::Error),

    /// Échec du démarrage du transport SSDP partagé (fatal, non retenté)
    #[error("failed to start shared SSDP transport: {0}")]
    TransportStart(#[source] std::io::Error),
}
