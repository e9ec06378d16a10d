use get_if_addrs::get_if_addrs;
use std::net::{Ipv4Addr, UdpSocket};

/// Devine l'adresse IP locale de la machine.
///
/// Crée un socket UDP lié à `0.0.0.0:0` et demande une "connexion" vers un
/// serveur DNS public (aucun paquet n'est émis, UDP est sans connexion) :
/// le système d'exploitation choisit alors l'interface qui serait utilisée
/// pour joindre Internet, et son adresse devient l'adresse annoncée par les
/// devices émulés.
///
/// # Returns
///
/// L'adresse IP locale sous forme de `String`, ou `"127.0.0.1"` si aucune
/// interface ne peut être déterminée.
///
/// # Examples
///
/// ```
/// use emuutils::guess_local_ip;
///
/// let ip = guess_local_ip();
/// println!("IP locale détectée: {}", ip);
/// ```
pub fn guess_local_ip() -> String {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            if socket.connect("8.8.8.8:80").is_ok() {
                if let Ok(local_addr) = socket.local_addr() {
                    return local_addr.ip().to_string();
                }
            }
            "127.0.0.1".to_string()
        }
        Err(_) => "127.0.0.1".to_string(),
    }
}

/// Liste les adresses IPv4 non-loopback des interfaces réseau.
///
/// Utilisée pour rejoindre le groupe multicast SSDP sur chacune des
/// interfaces actives de la machine. Les adresses IPv6 et les loopback
/// sont ignorées.
///
/// # Returns
///
/// Le vecteur des adresses IPv4 trouvées, éventuellement vide.
pub fn non_loopback_ipv4() -> Vec<Ipv4Addr> {
    let mut addresses = Vec::new();

    if let Ok(interfaces) = get_if_addrs() {
        for iface in interfaces {
            if let std::net::IpAddr::V4(ipv4) = iface.ip() {
                if !ipv4.is_loopback() {
                    addresses.push(ipv4);
                }
            }
        }
    }

    addresses
}
