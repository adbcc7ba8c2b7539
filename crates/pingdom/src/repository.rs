use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::config::PingdomConfig;
use crate::models::Check;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("check {0} not found")]
    NotFound(u64),

    #[error("pingdom unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the checks of one Pingdom account
#[async_trait]
pub trait PingdomRepository: Send + Sync {
    async fn get_check(&self, id: u64) -> Result<Check, RepositoryError>;

    async fn get_checks(&self) -> Result<Vec<Check>, RepositoryError>;
}

const FAKE_CHECKS: &[(&str, &[&str])] = &[
    ("api", &["prod", "backend"]),
    ("auth", &["prod", "backend"]),
    ("billing", &["prod"]),
    ("docs", &["prod", "frontend"]),
    ("staging-api", &["staging", "backend"]),
    ("status-page", &["frontend"]),
    ("website", &["prod", "frontend"]),
];

const FAKE_STATUSES: &[&str] = &["up", "up", "up", "down", "unconfirmed_down", "paused"];

/// Deterministic repository: the same account always yields the same checks
pub struct FakerRepository {
    checks: Vec<Check>,
}

impl FakerRepository {
    pub fn new(seed: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        let mut rng = ChaCha8Rng::from_seed(bytes);

        let checks = FAKE_CHECKS
            .iter()
            .enumerate()
            .map(|(i, (name, tags))| Check {
                id: 1000 + i as u64,
                name: name.to_string(),
                status: FAKE_STATUSES[rng.gen_range(0..FAKE_STATUSES.len())].to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            })
            .collect();
        Self { checks }
    }

    pub fn from_config(config: &PingdomConfig) -> Self {
        Self::new(&format!("{}|{}", config.url, config.token))
    }
}

#[async_trait]
impl PingdomRepository for FakerRepository {
    async fn get_check(&self, id: u64) -> Result<Check, RepositoryError> {
        self.checks
            .iter()
            .find(|check| check.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn get_checks(&self) -> Result<Vec<Check>, RepositoryError> {
        Ok(self.checks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_faker_is_deterministic() {
        let a = FakerRepository::new("account").get_checks().await.unwrap();
        let b = FakerRepository::new("account").get_checks().await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), FAKE_CHECKS.len());
    }

    #[tokio::test]
    async fn test_get_unknown_check() {
        let repository = FakerRepository::new("account");
        assert_eq!(repository.get_check(1000).await.unwrap().name, "api");
        assert_eq!(
            repository.get_check(7).await,
            Err(RepositoryError::NotFound(7))
        );
    }
}
