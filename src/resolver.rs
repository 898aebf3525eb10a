//! Memoized hostname to IPv4 resolution.
//!
//! Results are cached for the lifetime of the [`Resolver`] and never
//! invalidated: a hostname's address is assumed stable within a run. The
//! process-wide instance returned by [`Resolver::global`] survives settings
//! reloads.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use tracing::{debug, warn};

const LOOPBACK: &str = "127.0.0.1";

/// Names that resolve to the loopback address without any lookup.
const LOCAL_NAMES: [&str; 3] = [LOOPBACK, "localhost", "localhost.localdomain"];

static GLOBAL: Lazy<Arc<Resolver>> = Lazy::new(|| Arc::new(Resolver::new(SystemLookup)));

/// Address lookup primitive used on cache misses.
pub trait AddressLookup: Send + Sync {
    /// Returns the IPv4 candidates for `hostname`, in resolver order.
    fn lookup(&self, hostname: &str) -> io::Result<Vec<Ipv4Addr>>;
}

/// Lookup through the platform resolver (`getaddrinfo` on Unix).
///
/// This blocks the calling thread for as long as the platform resolver
/// takes; there is no timeout beyond the one the system applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

impl AddressLookup for SystemLookup {
    fn lookup(&self, hostname: &str) -> io::Result<Vec<Ipv4Addr>> {
        let addrs = (hostname, 0u16).to_socket_addrs()?;
        Ok(addrs
            .filter_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
            .collect())
    }
}

/// Hostname resolver with an append-only cache.
///
/// Concurrent callers resolving the same hostname share one lookup; the
/// cache lock is never held across a lookup, so unrelated hostnames do not
/// wait on each other.
pub struct Resolver {
    lookup: Box<dyn AddressLookup>,
    cache: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl Resolver {
    pub fn new(lookup: impl AddressLookup + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide resolver, created on first use.
    pub fn global() -> Arc<Resolver> {
        Arc::clone(&GLOBAL)
    }

    /// Resolves `hostname` to a dotted-quad address.
    ///
    /// The first non-loopback candidate wins, where loopback means all of
    /// `127.0.0.0/8`: a `127.0.1.1` hostname entry is passed over in favour
    /// of a routable address, and only picked when nothing else is returned.
    ///
    /// Returns an empty string if the host has no IPv4 address or the
    /// lookup failed; that outcome is cached like any other.
    pub fn resolve(&self, hostname: &str) -> String {
        if LOCAL_NAMES.contains(&hostname) {
            return LOOPBACK.to_string();
        }

        let cell = {
            let mut cache = self.cache.lock();
            Arc::clone(cache.entry(hostname.to_string()).or_default())
        };

        cell.get_or_init(|| self.lookup_uncached(hostname)).clone()
    }

    /// Returns the cached address for `hostname`, if a lookup has completed.
    pub fn cached(&self, hostname: &str) -> Option<String> {
        let cache = self.cache.lock();
        cache.get(hostname).and_then(|cell| cell.get().cloned())
    }

    /// Number of hostnames with a cache entry.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup_uncached(&self, hostname: &str) -> String {
        match self.lookup.lookup(hostname) {
            Ok(candidates) => {
                let picked = pick_address(&candidates)
                    .map(|addr| addr.to_string())
                    .unwrap_or_default();
                debug!(hostname, address = %picked, "resolved hostname");
                picked
            }
            Err(e) => {
                warn!(hostname, error = %e, "hostname lookup failed");
                String::new()
            }
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("cached", &self.len())
            .finish_non_exhaustive()
    }
}

/// First non-loopback address, else the first loopback one.
fn pick_address(candidates: &[Ipv4Addr]) -> Option<Ipv4Addr> {
    candidates
        .iter()
        .find(|addr| !addr.is_loopback())
        .or_else(|| candidates.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Default)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        answer: Vec<Ipv4Addr>,
    }

    impl AddressLookup for Counting {
        fn lookup(&self, _hostname: &str) -> io::Result<Vec<Ipv4Addr>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.clone())
        }
    }

    struct Failing;

    impl AddressLookup for Failing {
        fn lookup(&self, hostname: &str) -> io::Result<Vec<Ipv4Addr>> {
            Err(io::Error::new(io::ErrorKind::NotFound, hostname.to_string()))
        }
    }

    /// Blocks lookups of `slow.host` until released.
    struct Gated {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl AddressLookup for Gated {
        fn lookup(&self, hostname: &str) -> io::Result<Vec<Ipv4Addr>> {
            if hostname == "slow.host" {
                self.entered.lock().send(()).unwrap();
                self.release.lock().recv().unwrap();
                return Ok(vec![Ipv4Addr::new(10, 0, 0, 2)]);
            }
            Ok(vec![Ipv4Addr::new(10, 0, 0, 1)])
        }
    }

    #[test]
    fn test_local_names_skip_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = Resolver::new(Counting {
            calls: Arc::clone(&calls),
            answer: vec![Ipv4Addr::new(10, 0, 0, 1)],
        });

        for name in ["localhost", "127.0.0.1", "localhost.localdomain"] {
            assert_eq!(resolver.resolve(name), "127.0.0.1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_lookup_is_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = Resolver::new(Counting {
            calls: Arc::clone(&calls),
            answer: vec![Ipv4Addr::new(10, 0, 0, 1)],
        });

        assert_eq!(resolver.resolve("db.internal"), "10.0.0.1");
        assert_eq!(resolver.resolve("db.internal"), "10.0.0.1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cached("db.internal").as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_prefers_first_non_loopback() {
        let candidates = [
            Ipv4Addr::new(127, 0, 0, 1),
            Ipv4Addr::new(192, 168, 1, 5),
            Ipv4Addr::new(10, 0, 0, 1),
        ];
        assert_eq!(pick_address(&candidates), Some(Ipv4Addr::new(192, 168, 1, 5)));
        assert_eq!(
            pick_address(&[Ipv4Addr::new(127, 0, 1, 1), Ipv4Addr::new(127, 0, 0, 1)]),
            Some(Ipv4Addr::new(127, 0, 1, 1))
        );
        assert_eq!(pick_address(&[]), None);
    }

    #[test]
    fn test_unresolved_is_empty_and_cached() {
        let resolver = Resolver::new(Failing);
        assert_eq!(resolver.resolve("nowhere.invalid"), "");
        assert_eq!(resolver.cached("nowhere.invalid").as_deref(), Some(""));

        let empty = Resolver::new(Counting::default());
        assert_eq!(empty.resolve("v6only.example"), "");
    }

    #[test]
    fn test_concurrent_resolves_share_one_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = Arc::new(Resolver::new(Counting {
            calls: Arc::clone(&calls),
            answer: vec![Ipv4Addr::new(10, 1, 2, 3)],
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || resolver.resolve("shared.host"))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "10.1.2.3");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pending_lookup_does_not_block_other_hosts() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let resolver = Arc::new(Resolver::new(Gated {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        }));

        let slow = {
            let resolver = Arc::clone(&resolver);
            std::thread::spawn(move || resolver.resolve("slow.host"))
        };
        entered_rx.recv().unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        {
            let resolver = Arc::clone(&resolver);
            std::thread::spawn(move || done_tx.send(resolver.resolve("fast.host")).unwrap());
        }
        let fast = done_rx.recv_timeout(Duration::from_secs(5));
        assert_eq!(fast.as_deref(), Ok("10.0.0.1"));
        assert_eq!(resolver.cached("slow.host"), None);

        release_tx.send(()).unwrap();
        assert_eq!(slow.join().unwrap(), "10.0.0.2");
        assert_eq!(resolver.cached("slow.host").as_deref(), Some("10.0.0.2"));
    }
}
