//! Transport UDP multicast partagé.
//!
//! Le trait [`SsdpTransport`] est le seam entre le multiplexeur et l'I/O
//! réseau : le multiplexeur décide quoi envoyer, le transport possède le
//! socket. L'enrichissement des en-têtes se fait au-dessus de ce seam,
//! jamais dedans.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use emuconfig::get_config;
use emuutils::non_loopback_ipv4;

use crate::config_ext::SsdpConfigExt;
use crate::message::SsdpMessage;
use crate::multiplexer::SsdpMultiplexer;
use crate::{SSDP_MULTICAST_ADDR, SSDP_PORT};

/// Seam d'I/O du multiplexeur SSDP.
///
/// Une seule implémentation réelle ([`MulticastTransport`]) ; les tests du
/// multiplexeur et des devices en fournissent des factices.
pub trait SsdpTransport: Send + Sync {
    /// Démarre le transport : ouvre le socket partagé et lance l'écoute
    /// des M-SEARCH ainsi que les annonces périodiques.
    ///
    /// Appelé au plus une fois par processus, par `SsdpMultiplexer::start_once`.
    fn start(&self, multiplexer: Arc<SsdpMultiplexer>) -> io::Result<()>;

    /// Envoie un message en unicast vers un demandeur
    fn send_unicast(&self, to: SocketAddr, message: &SsdpMessage) -> io::Result<()>;

    /// Envoie un message sur le groupe multicast SSDP
    fn send_multicast(&self, message: &SsdpMessage) -> io::Result<()>;

    /// Arrête le transport ; les threads d'écoute se terminent au prochain timeout
    fn stop(&self);
}

/// Transport réel : socket UDP 1900, groupe multicast, threads d'écoute.
pub struct MulticastTransport {
    /// Socket UDP partagé, présent entre start() et stop()
    socket: RwLock<Option<Arc<UdpSocket>>>,

    /// Signal d'arrêt pour les threads d'écoute et d'annonce
    stopping: Arc<AtomicBool>,
}

impl MulticastTransport {
    /// Crée un transport non démarré
    pub fn new() -> Self {
        Self {
            socket: RwLock::new(None),
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ouvre le socket SSDP partagé.
    ///
    /// SO_REUSEADDR permet de cohabiter avec un autre serveur SSDP sur la
    /// machine ; le groupe multicast est rejoint sur chaque interface IPv4
    /// active, à défaut sur INADDR_ANY.
    fn open_socket() -> io::Result<UdpSocket> {
        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;

        let bind_addr: SocketAddr = format!("0.0.0.0:{}", SSDP_PORT).parse().unwrap();
        socket2.bind(&bind_addr.into())?;

        let socket: UdpSocket = socket2.into();
        socket.set_read_timeout(Some(Duration::from_secs(1)))?;
        socket.set_multicast_loop_v4(false)?;

        let group: Ipv4Addr = SSDP_MULTICAST_ADDR.parse().unwrap();
        let interfaces = non_loopback_ipv4();
        if interfaces.is_empty() {
            socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
        } else {
            for ipv4 in interfaces {
                match socket.join_multicast_v4(&group, &ipv4) {
                    Ok(()) => debug!("SSDP: joined {} on {}", SSDP_MULTICAST_ADDR, ipv4),
                    Err(e) => warn!("SSDP: failed to join {} on {}: {}", SSDP_MULTICAST_ADDR, ipv4, e),
                }
            }
        }

        Ok(socket)
    }

    /// Démarre l'écoute des M-SEARCH
    fn spawn_search_listener(&self, socket: Arc<UdpSocket>, multiplexer: Arc<SsdpMultiplexer>) {
        let stopping = Arc::clone(&self.stopping);

        std::thread::spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                if stopping.load(Ordering::SeqCst) {
                    break;
                }
                match socket.recv_from(&mut buf) {
                    Ok((n, src)) => {
                        let data = String::from_utf8_lossy(&buf[..n]);
                        if data.starts_with("M-SEARCH") {
                            if let Some(st) = Self::parse_st(&data) {
                                for response in multiplexer.dispatch_search(&st, src) {
                                    match socket.send_to(response.to_wire().as_bytes(), src) {
                                        Ok(_) => info!(
                                            "📡 M-SEARCH response sent to {} with ST={}",
                                            src,
                                            response.header("ST").unwrap_or("-")
                                        ),
                                        Err(e) => warn!(
                                            "❌ Failed to send M-SEARCH response to {}: {}",
                                            src, e
                                        ),
                                    }
                                }
                            }
                        }
                    }
                    Err(e)
                        if e.kind() == io::ErrorKind::WouldBlock
                            || e.kind() == io::ErrorKind::TimedOut =>
                    {
                        // Timeout, continuer
                        continue;
                    }
                    Err(e) => {
                        warn!("❌ SSDP read error: {}", e);
                    }
                }
            }
        });
    }

    /// Démarre les annonces périodiques
    fn spawn_periodic_announcements(&self, socket: Arc<UdpSocket>, multiplexer: Arc<SsdpMultiplexer>) {
        let stopping = Arc::clone(&self.stopping);
        let interval = get_config()
            .get_ssdp_announce_interval()
            .unwrap_or(crate::config_ext::DEFAULT_ANNOUNCE_INTERVAL);
        let period = Duration::from_secs(interval);
        let group_addr: SocketAddr = format!("{}:{}", SSDP_MULTICAST_ADDR, SSDP_PORT)
            .parse()
            .unwrap();

        std::thread::spawn(move || {
            loop {
                std::thread::sleep(period);
                if stopping.load(Ordering::SeqCst) {
                    break;
                }

                for message in multiplexer.dispatch_alive() {
                    match socket.send_to(message.to_wire().as_bytes(), group_addr) {
                        Ok(_) => debug!(
                            "✅ NOTIFY alive (periodic): {}",
                            message.header("USN").unwrap_or("-")
                        ),
                        Err(e) => warn!("❌ Failed to send periodic NOTIFY alive: {}", e),
                    }
                }
            }
        });
    }

    /// Parse le champ ST d'un M-SEARCH
    fn parse_st(data: &str) -> Option<String> {
        for line in data.lines() {
            if line.to_uppercase().starts_with("ST:") {
                let st = line[3..].trim().to_string();
                info!("✅ M-SEARCH received with ST={}", st);
                return Some(st);
            }
        }
        None
    }

    fn shared_socket(&self) -> io::Result<Arc<UdpSocket>> {
        self.socket
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "SSDP transport not started"))
    }
}

impl SsdpTransport for MulticastTransport {
    fn start(&self, multiplexer: Arc<SsdpMultiplexer>) -> io::Result<()> {
        let socket = Arc::new(Self::open_socket()?);
        *self.socket.write().unwrap() = Some(Arc::clone(&socket));

        info!(
            "✅ SSDP transport started on {}:{}",
            SSDP_MULTICAST_ADDR, SSDP_PORT
        );

        // Salve initiale : chaque device déjà enregistré annonce sa présence
        for message in multiplexer.dispatch_alive() {
            if let Err(e) = self.send_multicast(&message) {
                warn!("❌ Failed to send NOTIFY alive: {}", e);
            }
        }

        self.spawn_search_listener(Arc::clone(&socket), Arc::clone(&multiplexer));
        self.spawn_periodic_announcements(socket, multiplexer);

        Ok(())
    }

    fn send_unicast(&self, to: SocketAddr, message: &SsdpMessage) -> io::Result<()> {
        let socket = self.shared_socket()?;
        socket.send_to(message.to_wire().as_bytes(), to)?;
        Ok(())
    }

    fn send_multicast(&self, message: &SsdpMessage) -> io::Result<()> {
        let group_addr: SocketAddr = format!("{}:{}", SSDP_MULTICAST_ADDR, SSDP_PORT)
            .parse()
            .unwrap();
        self.send_unicast(group_addr, message)
    }

    fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        if self.socket.write().unwrap().take().is_some() {
            info!("✅ SSDP transport stopped");
        }
    }
}

impl Default for MulticastTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_st_extracts_target() {
        let msearch = "M-SEARCH * HTTP/1.1\r\n\
                       HOST: 239.255.255.250:1900\r\n\
                       MAN: \"ssdp:discover\"\r\n\
                       MX: 2\r\n\
                       ST: urn:Belkin:device:*\r\n\
                       \r\n";

        assert_eq!(
            MulticastTransport::parse_st(msearch),
            Some("urn:Belkin:device:*".to_string())
        );
    }

    #[test]
    fn test_parse_st_is_case_insensitive() {
        let msearch = "M-SEARCH * HTTP/1.1\r\nst: ssdp:all\r\n\r\n";
        assert_eq!(MulticastTransport::parse_st(msearch), Some("ssdp:all".to_string()));
    }

    #[test]
    fn test_parse_st_missing_is_none() {
        let msearch = "M-SEARCH * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\n\r\n";
        assert_eq!(MulticastTransport::parse_st(msearch), None);
    }

    #[test]
    fn test_send_before_start_is_not_connected() {
        let transport = MulticastTransport::new();
        let message = SsdpMessage::new(crate::message::SsdpMethod::Notify);

        let err = transport.send_multicast(&message).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
