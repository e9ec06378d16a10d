//! # EMUSwitch Utils - Utilitaires réseau
//!
//! Fonctions partagées par les crates EMUSwitch :
//!
//! - [`guess_local_ip`] : Devine l'adresse IP locale utilisée pour les connexions sortantes
//! - [`non_loopback_ipv4`] : Liste les adresses IPv4 des interfaces réseau actives
//!
//! # Examples
//!
//! ```
//! use emuutils::guess_local_ip;
//!
//! let ip = guess_local_ip();
//! println!("Adresse IP locale: {}", ip);
//! ```
mod ip_utils;

pub use ip_utils::{guess_local_ip, non_loopback_ipv4};
