//! Priority-ordered set of domains with a name index.
//!
//! Ordering is total: domains compare by priority ascending, and equal
//! priorities never collapse; the domain registered later sorts strictly
//! after the earlier one. The first domain in that order is the primary
//! domain, the default for operations that omit a domain name.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use fedid_core::error::Error;

use crate::domain::Domain;
use crate::Result;

/// Registry of every domain the store serves.
#[derive(Debug)]
pub struct DomainRegistry {
    // Keyed on (priority, insertion sequence) so equal priorities keep
    // their registration order.
    ordered: BTreeMap<(u32, u64), Arc<Domain>>,
    by_name: HashMap<String, Arc<Domain>>,
}

impl DomainRegistry {
    /// Builds a registry from domains in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the list is empty or two domains share
    /// a name.
    pub fn new(domains: Vec<Domain>) -> Result<Self> {
        if domains.is_empty() {
            return Err(Error::Config("No domains registered.".to_string()));
        }

        let mut ordered = BTreeMap::new();
        let mut by_name = HashMap::new();

        for (sequence, domain) in domains.into_iter().enumerate() {
            let domain = Arc::new(domain);
            if by_name
                .insert(domain.name().to_string(), Arc::clone(&domain))
                .is_some()
            {
                return Err(Error::Config(format!(
                    "domain `{}` is registered more than once",
                    domain.name()
                )));
            }
            ordered.insert((domain.priority(), sequence as u64), domain);
        }

        Ok(Self { ordered, by_name })
    }

    /// The first domain in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] when the registry holds no domains.
    pub fn primary_domain(&self) -> Result<&Arc<Domain>> {
        self.ordered
            .values()
            .next()
            .ok_or_else(|| Error::Domain("no domains registered".to_string()))
    }

    /// Looks up a domain by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] when no domain carries the name.
    pub fn domain(&self, name: &str) -> Result<&Arc<Domain>> {
        self.by_name
            .get(name)
            .ok_or_else(|| Error::Domain(format!("domain `{name}` not found")))
    }

    /// Iterates domains in priority order.
    pub fn domains(&self) -> impl Iterator<Item = &Arc<Domain>> {
        self.ordered.values()
    }

    /// Number of registered domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Returns true if the registry holds no domains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryUniqueIdResolver;
    use crate::resolver::UniqueIdResolver;

    fn domain(name: &str, priority: u32) -> Domain {
        let resolver: Arc<dyn UniqueIdResolver> = Arc::new(InMemoryUniqueIdResolver::new());
        Domain::builder(name, priority, resolver).build().unwrap()
    }

    #[test]
    fn empty_registry_rejected() {
        let err = DomainRegistry::new(Vec::new()).unwrap_err();
        assert_eq!(err, Error::Config("No domains registered.".to_string()));
    }

    #[test]
    fn primary_is_lowest_priority() {
        let registry =
            DomainRegistry::new(vec![domain("b", 20), domain("a", 10), domain("c", 30)]).unwrap();
        assert_eq!(registry.primary_domain().unwrap().name(), "a");
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let registry = DomainRegistry::new(vec![domain("a", 10), domain("b", 10)]).unwrap();
        assert_eq!(registry.primary_domain().unwrap().name(), "a");

        let order: Vec<_> = registry.domains().map(|d| d.name().to_string()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn iteration_order_is_total() {
        let registry = DomainRegistry::new(vec![
            domain("low-second", 10),
            domain("high", 5),
            domain("low-third", 10),
        ])
        .unwrap();

        let order: Vec<_> = registry.domains().map(|d| d.name().to_string()).collect();
        assert_eq!(order, vec!["high", "low-second", "low-third"]);
    }

    #[test]
    fn lookup_by_name() {
        let registry = DomainRegistry::new(vec![domain("a", 10), domain("b", 20)]).unwrap();
        assert_eq!(registry.domain("b").unwrap().priority(), 20);
        assert!(matches!(
            registry.domain("missing").unwrap_err(),
            Error::Domain(_)
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = DomainRegistry::new(vec![domain("a", 10), domain("a", 20)]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
