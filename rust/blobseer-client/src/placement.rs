use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use blobseer_metadata::{ProviderDesc, ProviderList};

use crate::ClientError;

/// Decides which providers receive the replicas of newly written pages.
#[async_trait]
pub trait Placement: Send + Sync {
    /// Pick `replication` distinct providers for each of `pages` pages
    async fn allocate(
        &self,
        pages: usize,
        replication: u32,
    ) -> Result<Vec<ProviderList>, ClientError>;
}

/// Spreads replicas over a fixed set of providers in turn.
#[derive(Clone)]
pub struct RoundRobinPlacement {
    providers: Arc<Vec<ProviderDesc>>,
    next: Arc<AtomicUsize>,
}

impl RoundRobinPlacement {
    /// Create a new [`RoundRobinPlacement`] over `providers`
    pub fn new(providers: Vec<ProviderDesc>) -> Self {
        Self {
            providers: Arc::new(providers),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Placement for RoundRobinPlacement {
    async fn allocate(
        &self,
        pages: usize,
        replication: u32,
    ) -> Result<Vec<ProviderList>, ClientError> {
        let replication = replication as usize;
        if replication == 0 || replication > self.providers.len() {
            return Err(ClientError::ResourceExhausted(format!(
                "cannot place {replication} replicas on {} providers",
                self.providers.len()
            )));
        }

        let start = self.next.fetch_add(pages, Ordering::Relaxed);
        Ok((0..pages)
            .map(|page| {
                (0..replication)
                    .map(|replica| {
                        self.providers[(start + page + replica) % self.providers.len()].clone()
                    })
                    .collect()
            })
            .collect())
    }
}
