use rand::Rng;

use crate::{PageKey, ProviderDesc, ProviderList};

/// Picks which replica of a page to fetch next.
///
/// Each call to [`ReplicaSelection::try_next`] draws a random provider that
/// has not been tried yet, so a failing provider is never asked twice for
/// the same read. [`ReplicaSelection::try_again`] repeats the last choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSelection {
    key: PageKey,
    remaining: ProviderList,
    last: Option<ProviderDesc>,
}

impl ReplicaSelection {
    /// Create a new [`ReplicaSelection`] over `providers` of the page `key`
    pub fn new(key: PageKey, providers: ProviderList) -> Self {
        Self {
            key,
            remaining: providers,
            last: None,
        }
    }

    /// The key of the page being fetched
    pub fn key(&self) -> &PageKey {
        &self.key
    }

    /// Providers that have not been tried yet
    pub fn remaining(&self) -> &[ProviderDesc] {
        &self.remaining
    }

    /// Draw a random untried provider, or `None` once all have been tried
    pub fn try_next(&mut self) -> Option<ProviderDesc> {
        if self.remaining.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..self.remaining.len());
        let provider = self.remaining.swap_remove(index);
        self.last = Some(provider.clone());
        Some(provider)
    }

    /// The provider returned by the last call to [`ReplicaSelection::try_next`]
    pub fn try_again(&self) -> Option<ProviderDesc> {
        self.last.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::Interval;

    #[test]
    fn it_tries_every_provider_once() {
        let providers = vec![
            ProviderDesc::new("a", "1"),
            ProviderDesc::new("b", "1"),
            ProviderDesc::new("c", "1"),
        ];
        let mut selection = ReplicaSelection::new(
            PageKey::for_chunk(&Interval::new(1, 1, 0, 8)),
            providers.clone(),
        );

        let mut seen = BTreeSet::new();
        while let Some(provider) = selection.try_next() {
            assert_eq!(selection.try_again(), Some(provider.clone()));
            assert!(seen.insert(provider));
        }

        assert_eq!(seen, providers.into_iter().collect::<BTreeSet<_>>());
        assert!(selection.remaining().is_empty());
    }

    #[test]
    fn it_has_nothing_to_offer_without_providers() {
        let mut selection =
            ReplicaSelection::new(PageKey::for_content(b"page"), ProviderList::new());

        assert_eq!(selection.try_next(), None);
        assert_eq!(selection.try_again(), None);
    }
}
