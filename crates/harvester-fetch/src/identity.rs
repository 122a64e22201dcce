//! Client identity rotation.
//!
//! Each request goes out with a user agent drawn at random from the
//! configured pool.

use crate::error::{FetchError, Result};
use rand::seq::SliceRandom;

/// Pool of client identities rotated per request for anti-detection
#[derive(Debug, Clone)]
pub struct IdentityPool {
    user_agents: Vec<String>,
}

impl IdentityPool {
    /// Create a pool from configured user agents
    pub fn new(user_agents: Vec<String>) -> Result<Self> {
        let user_agents: Vec<String> = user_agents
            .into_iter()
            .filter(|ua| !ua.trim().is_empty())
            .collect();
        if user_agents.is_empty() {
            return Err(FetchError::NoIdentities);
        }
        Ok(Self { user_agents })
    }

    /// Pick a user agent at random
    #[must_use]
    pub fn pick(&self) -> &str {
        let mut rng = rand::thread_rng();
        // The pool is never empty after construction
        self.user_agents
            .choose(&mut rng)
            .map_or("", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_rejected() {
        assert!(matches!(
            IdentityPool::new(vec![]),
            Err(FetchError::NoIdentities)
        ));
        assert!(IdentityPool::new(vec!["  ".to_string()]).is_err());
    }

    #[test]
    fn test_pick_from_pool() {
        let pool = IdentityPool::new(vec![
            "agent-a".to_string(),
            " ".to_string(),
            "agent-b".to_string(),
        ])
        .expect("non-empty pool");
        let picked = pool.pick();
        assert!(picked == "agent-a" || picked == "agent-b");

        // Blank entries are never handed out
        assert!((0..50).all(|_| !pool.pick().trim().is_empty()));
    }

    #[test]
    fn test_identity_variation() {
        let pool = IdentityPool::new(vec![
            "agent-a".to_string(),
            "agent-b".to_string(),
            "agent-c".to_string(),
        ])
        .expect("non-empty pool");

        // Probabilistic but very unlikely to fail
        let picks: Vec<_> = (0..20).map(|_| pool.pick().to_string()).collect();
        let all_same = picks.iter().all(|p| p == &picks[0]);
        assert!(!all_same, "Expected variation in user agents");
    }
}
