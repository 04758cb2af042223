use rand::seq::SliceRandom;
use rand::Rng;
use std::net::IpAddr;

/// Ordered set of candidate identities, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPool {
    identities: Vec<IpAddr>,
}

impl IdentityPool {
    /// Builds a pool, dropping duplicates while keeping first-seen order.
    pub fn new<I: IntoIterator<Item = IpAddr>>(identities: I) -> Self {
        let mut unique: Vec<IpAddr> = Vec::new();
        for ip in identities {
            if !unique.contains(&ip) {
                unique.push(ip);
            }
        }
        Self { identities: unique }
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.identities.contains(ip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.identities.iter()
    }

    /// Rotation only makes sense with at least two distinct identities.
    pub fn can_rotate(&self) -> bool {
        self.identities.len() >= 2
    }

    /// Picks a candidate uniformly from the pool minus `active`.
    ///
    /// Returns `None` when the pool is too small to rotate.
    pub fn choose_candidate<R: Rng + ?Sized>(&self, active: IpAddr, rng: &mut R) -> Option<IpAddr> {
        if !self.can_rotate() {
            return None;
        }
        let candidates: Vec<IpAddr> = self
            .identities
            .iter()
            .copied()
            .filter(|ip| *ip != active)
            .collect();
        candidates.choose(rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn pool() -> IdentityPool {
        IdentityPool::new([ip("10.0.0.1"), ip("10.0.0.2"), ip("10.0.0.3")])
    }

    #[test]
    fn test_duplicates_are_removed_in_order() {
        let pool = IdentityPool::new([ip("10.0.0.2"), ip("10.0.0.1"), ip("10.0.0.2")]);
        let ordered: Vec<IpAddr> = pool.iter().copied().collect();
        assert_eq!(ordered, vec![ip("10.0.0.2"), ip("10.0.0.1")]);
    }

    #[test]
    fn test_never_selects_active_identity() {
        let pool = pool();
        let mut rng = StdRng::seed_from_u64(7);
        let active = ip("10.0.0.1");
        for _ in 0..500 {
            let candidate = pool.choose_candidate(active, &mut rng).unwrap();
            assert_ne!(candidate, active);
            assert!(pool.contains(&candidate));
        }
    }

    #[test]
    fn test_every_other_member_is_eventually_selected() {
        let pool = pool();
        let mut rng = StdRng::seed_from_u64(42);
        let active = ip("10.0.0.2");
        let seen: HashSet<IpAddr> = (0..200)
            .filter_map(|_| pool.choose_candidate(active, &mut rng))
            .collect();
        assert_eq!(seen, HashSet::from([ip("10.0.0.1"), ip("10.0.0.3")]));
    }

    #[test]
    fn test_pool_smaller_than_two_is_noop() {
        let mut rng = StdRng::seed_from_u64(1);
        let single = IdentityPool::new([ip("10.0.0.1"), ip("10.0.0.1")]);
        assert_eq!(single.len(), 1);
        assert!(!single.can_rotate());
        assert_eq!(single.choose_candidate(ip("10.0.0.1"), &mut rng), None);

        let empty = IdentityPool::new([]);
        assert_eq!(empty.choose_candidate(ip("10.0.0.1"), &mut rng), None);
    }

    #[test]
    fn test_active_outside_pool_draws_from_whole_pool() {
        let pool = pool();
        let mut rng = StdRng::seed_from_u64(3);
        let candidate = pool.choose_candidate(ip("192.168.1.1"), &mut rng).unwrap();
        assert!(pool.contains(&candidate));
    }
}
