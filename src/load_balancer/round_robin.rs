//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Round-robin selector.
///
/// One counter is shared by all selection calls and indexes into whatever
/// healthy subset the caller passes in. When the subset changes between calls
/// the cycle is approximate; with a stable subset each backend gets an even share.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, healthy: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if healthy.is_empty() {
            return None;
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        healthy.get(n % healthy.len()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::pool::BackendRegistry;
    use std::collections::HashMap;

    fn registry(n: usize) -> BackendRegistry {
        BackendRegistry::new((1..=n).map(|i| format!("http://b{i}:{i}"))).unwrap()
    }

    #[test]
    fn test_round_robin() {
        let reg = registry(2);
        let lb = RoundRobin::new();

        let picks: Vec<String> = (0..3)
            .map(|_| lb.select(&reg).unwrap().address().to_string())
            .collect();
        assert_eq!(picks, vec!["http://b1:1", "http://b2:2", "http://b1:1"]);
    }

    #[test]
    fn none_when_nothing_is_healthy() {
        let reg = registry(3);
        for b in reg.all() {
            b.set_healthy(false);
        }
        let lb = RoundRobin::new();
        assert!(lb.select(&reg).is_none());
        assert!(lb.next_server(&[]).is_none());
    }

    #[test]
    fn never_returns_unhealthy_backend() {
        let reg = registry(5);
        let lb = RoundRobin::new();

        for round in 0..200 {
            // flip a varying subset, always leaving b1 healthy
            for (i, b) in reg.all().iter().enumerate().skip(1) {
                b.set_healthy((round + i) % 3 != 0);
            }
            let picked = lb.select(&reg).unwrap();
            assert!(picked.is_healthy(), "picked unhealthy {}", picked.address());
        }
    }

    #[test]
    fn fair_under_stable_membership() {
        let reg = registry(4);
        reg.set_health("http://b2:2", false);
        let lb = RoundRobin::new();

        let n = 100;
        let k = reg.list_healthy().len();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..n {
            let b = lb.select(&reg).unwrap();
            *counts.entry(b.address().to_string()).or_default() += 1;
        }

        assert_eq!(counts.len(), k);
        assert!(!counts.contains_key("http://b2:2"));
        for count in counts.values() {
            assert!(*count >= n / k);
        }
    }

    #[test]
    fn every_backend_reachable_under_concurrency() {
        let reg = Arc::new(registry(3));
        let lb = Arc::new(RoundRobin::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let reg = Arc::clone(&reg);
                let lb = Arc::clone(&lb);
                std::thread::spawn(move || {
                    (0..300)
                        .map(|_| lb.select(&reg).unwrap().address().to_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for address in handle.join().unwrap() {
                *counts.entry(address).or_default() += 1;
            }
        }

        // 1200 picks over 3 backends; every index was handed out exactly once.
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|&c| c == 400));
    }
}
