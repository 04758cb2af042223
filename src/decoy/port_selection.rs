use log::{debug, warn};
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use std::net::{IpAddr, SocketAddr};
use tokio::net::{TcpListener, TcpSocket};

use crate::configuration::types::PortRange;
use crate::error_handling::types::DecoyError;

/// Random ports tried from a range before the decoy gives up.
pub const MAX_PORT_ATTEMPTS: usize = 10;

const LISTEN_BACKLOG: u32 = 1024;

/// Up to [`MAX_PORT_ATTEMPTS`] distinct ports from the range, in random order.
pub fn candidate_ports<R: Rng + ?Sized>(range: PortRange, rng: &mut R) -> Vec<u16> {
    let mut ports = (range.start..=range.end).choose_multiple(rng, MAX_PORT_ATTEMPTS);
    ports.shuffle(rng);
    ports
}

/// Binds a listening socket on one port of the range.
///
/// Every attempt is a real bind, so there is no window between checking a port and taking it.
/// Must be called from within a Tokio runtime.
pub fn bind_in_range<R: Rng + ?Sized>(
    address: IpAddr,
    range: PortRange,
    rng: &mut R,
) -> Result<TcpListener, DecoyError> {
    let candidates = candidate_ports(range, rng);
    let single = candidates.len() == 1;

    for port in candidates {
        match bind_port(SocketAddr::new(address, port)) {
            Ok(listener) => return Ok(listener),
            Err(e) if single => return Err(DecoyError::BindError(port, e)),
            Err(e) => debug!("Port {} unavailable: {}", port, e),
        }
    }

    warn!(
        "No free port after {} attempts in range [{}-{}]",
        MAX_PORT_ATTEMPTS, range.start, range.end
    );
    Err(DecoyError::NoPortAvailable {
        start: range.start,
        end: range.end,
    })
}

fn bind_port(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    #[cfg(unix)]
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn localhost() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[test]
    fn test_candidates_are_distinct_and_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let range = PortRange {
            start: 8000,
            end: 8999,
        };
        let ports = candidate_ports(range, &mut rng);

        assert_eq!(ports.len(), MAX_PORT_ATTEMPTS);
        assert!(ports.iter().all(|p| (8000..=8999).contains(p)));
        assert_eq!(ports.iter().collect::<HashSet<_>>().len(), ports.len());
    }

    #[test]
    fn test_small_range_tries_every_port() {
        let mut rng = StdRng::seed_from_u64(2);
        let range = PortRange {
            start: 2222,
            end: 2224,
        };
        let mut ports = candidate_ports(range, &mut rng);
        ports.sort_unstable();
        assert_eq!(ports, vec![2222, 2223, 2224]);
    }

    #[tokio::test]
    async fn test_single_port_range_binds_that_port() {
        let scratch = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = scratch.local_addr().unwrap().port();
        drop(scratch);

        let mut rng = StdRng::seed_from_u64(3);
        let listener =
            bind_in_range(localhost(), PortRange { start: port, end: port }, &mut rng).unwrap();
        assert_eq!(listener.local_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_port_in_use_is_bind_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let mut rng = StdRng::seed_from_u64(4);
        let result = bind_in_range(localhost(), PortRange { start: port, end: port }, &mut rng);
        assert!(matches!(result, Err(DecoyError::BindError(p, _)) if p == port));
    }

    #[tokio::test]
    async fn test_busy_range_is_exhausted() {
        let first = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = first.local_addr().unwrap().port();
        let second = (port < u16::MAX)
            .then(|| std::net::TcpListener::bind(("127.0.0.1", port + 1)).ok())
            .flatten();

        // Only meaningful when both neighbouring ports could be held.
        if let Some(_second) = second {
            let mut rng = StdRng::seed_from_u64(5);
            let range = PortRange {
                start: port,
                end: port + 1,
            };
            let result = bind_in_range(localhost(), range, &mut rng);
            assert!(matches!(
                result,
                Err(DecoyError::NoPortAvailable { start, end }) if start == port && end == port + 1
            ));
        }
    }
}
