//! # Module Device - Switches WeMo émulés
//!
//! Ce module implémente le device virtuel d'EMUSwitch : un listener HTTP de
//! contrôle (axum) par device, une identité de découverte enregistrée dans
//! le multiplexeur SSDP partagé, et le document de description que les
//! clients Belkin viennent chercher.
//!
//! ## Fonctionnalités
//!
//! - ✅ Création fail-fast à partir d'options ou de la configuration YAML
//! - ✅ Port de contrôle fixe ou éphémère, résolu au bind
//! - ✅ Enregistrement SSDP et démarrage unique du transport partagé
//! - ✅ Surface de contrôle `/setup.xml` + `/upnp/control/basicevent1`
//! - ✅ Fermeture idempotente avec désenregistrement SSDP
//!
//! ## Architecture
//!
//! - [`EmulatedSwitch`] : le device virtuel et son cycle de vie
//! - [`SwitchOptions`] : les options de construction
//! - [`control_router`] : la table chemin → handler de la surface de contrôle

pub mod control;
pub mod device;
pub mod errors;
pub mod options;
pub mod setup;

pub use control::control_router;
pub use device::{DeviceState, EmulatedSwitch};
pub use errors::DeviceError;
pub use options::SwitchOptions;
