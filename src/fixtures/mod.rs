//! Fixture Store
//!
//! Sample records embedded in the binary and decoded once at start-up. A
//! [`FixtureContext`] is the owned, mutable copy a benchmark set works on.

use crate::model::{Address, Record, SaleReport};
use chrono::Duration;
use std::sync::Arc;

const ADDRESSES_JSON: &str = include_str!("addresses.json");
const SALES_JSON: &str = include_str!("sales.json");

/// Fixture failures
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to decode {name} fixture: {source}")]
    Decode {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{name} fixture is empty")]
    Empty { name: &'static str },

    #[error("{requested} {name} requested but the fixture holds {available}")]
    Exhausted {
        name: &'static str,
        requested: usize,
        available: usize,
    },
}

/// Fixture kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    Addresses,
    Sales,
}

impl FixtureKind {
    pub fn name(&self) -> &'static str {
        match self {
            FixtureKind::Addresses => "addresses",
            FixtureKind::Sales => "sales",
        }
    }
}

/// Immutable base records
#[derive(Debug, Clone)]
pub struct FixtureStore {
    addresses: Arc<[Address]>,
    sales: Arc<[SaleReport]>,
}

impl FixtureStore {
    /// Decodes the embedded documents
    pub fn embedded() -> Result<Self, FixtureError> {
        Self::from_json(ADDRESSES_JSON, SALES_JSON)
    }

    pub fn from_json(addresses: &str, sales: &str) -> Result<Self, FixtureError> {
        let addresses: Vec<Address> = decode(FixtureKind::Addresses, addresses)?;
        let sales: Vec<SaleReport> = decode(FixtureKind::Sales, sales)?;
        tracing::debug!(
            addresses = addresses.len(),
            sales = sales.len(),
            "fixtures decoded"
        );
        Ok(Self {
            addresses: addresses.into(),
            sales: sales.into(),
        })
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn sales(&self) -> &[SaleReport] {
        &self.sales
    }

    pub fn len(&self, kind: FixtureKind) -> usize {
        match kind {
            FixtureKind::Addresses => self.addresses.len(),
            FixtureKind::Sales => self.sales.len(),
        }
    }

    /// Address at `index` modulo the fixture size
    pub fn address_at(&self, index: usize) -> &Address {
        &self.addresses[index % self.addresses.len()]
    }

    /// Sale at `index` modulo the fixture size
    pub fn sale_at(&self, index: usize) -> &SaleReport {
        &self.sales[index % self.sales.len()]
    }

    /// A fresh owned copy for one benchmark set
    pub fn context(&self) -> FixtureContext {
        FixtureContext::new(self.clone())
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    kind: FixtureKind,
    json: &str,
) -> Result<Vec<T>, FixtureError> {
    let records: Vec<T> = serde_json::from_str(json).map_err(|source| FixtureError::Decode {
        name: kind.name(),
        source,
    })?;
    if records.is_empty() {
        return Err(FixtureError::Empty { name: kind.name() });
    }
    Ok(records)
}

/// Mutable working copy of the fixtures
///
/// Write workloads assign identity and markers to these records in place;
/// update workloads rely on that having happened first.
#[derive(Debug, Clone)]
pub struct FixtureContext {
    store: FixtureStore,
    addresses: Vec<Address>,
}

impl FixtureContext {
    pub fn new(store: FixtureStore) -> Self {
        let addresses = store.addresses().to_vec();
        Self { store, addresses }
    }

    pub fn store(&self) -> &FixtureStore {
        &self.store
    }

    /// The first `n` working addresses; write workloads may not reuse records
    pub fn addresses_mut(&mut self, n: usize) -> Result<&mut [Address], FixtureError> {
        if n > self.addresses.len() {
            return Err(FixtureError::Exhausted {
                name: FixtureKind::Addresses.name(),
                requested: n,
                available: self.addresses.len(),
            });
        }
        Ok(&mut self.addresses[..n])
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// `n` addresses, cycling through the working set
    pub fn cycled_addresses(&self, n: usize) -> Vec<Address> {
        self.addresses.iter().cycle().take(n).cloned().collect()
    }

    /// `n` sales, cycling through the base set
    pub fn cycled_sales(&self, n: usize) -> Vec<SaleReport> {
        (0..n).map(|i| self.store.sale_at(i).clone()).collect()
    }

    /// Perturbs the first `n` addresses and rewinds their modified marker by one hour
    pub fn prepare_for_update(&mut self, n: usize) -> Result<(), FixtureError> {
        for address in self.addresses_mut(n)? {
            address.perturb();
            address.rewind_modified(Duration::hours(1));
        }
        Ok(())
    }

    /// Restores the base records
    pub fn reset(&mut self) {
        self.addresses = self.store.addresses().to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamp;

    #[test]
    fn test_embedded_fixtures_decode() {
        let store = FixtureStore::embedded().unwrap();
        assert_eq!(store.len(FixtureKind::Addresses), 1000);
        assert!(store.len(FixtureKind::Sales) > 0);
        assert!(store.addresses().iter().all(|a| a.id == 0 && !a.created_time.is_set()));
        assert!(store.sales().iter().all(|s| s.id > 0 && s.created_time.is_set()));
    }

    #[test]
    fn test_corrupt_json_is_decode_error() {
        let result = FixtureStore::from_json("[{", "[]");
        assert!(matches!(result, Err(FixtureError::Decode { name: "addresses", .. })));
    }

    #[test]
    fn test_empty_fixture_rejected() {
        let addresses = r#"[{"street":"a","city":"b","state":"c","zip":"d"}]"#;
        let result = FixtureStore::from_json(addresses, "[]");
        assert!(matches!(result, Err(FixtureError::Empty { name: "sales" })));
    }

    #[test]
    fn test_record_at_wraps() {
        let store = FixtureStore::embedded().unwrap();
        let size = store.len(FixtureKind::Addresses);
        assert_eq!(store.address_at(size + 3), store.address_at(3));
        let sales = store.len(FixtureKind::Sales);
        assert_eq!(store.sale_at(sales), store.sale_at(0));
    }

    #[test]
    fn test_cycled_reads_exceed_fixture() {
        let context = FixtureStore::embedded().unwrap().context();
        assert_eq!(context.cycled_sales(10_000).len(), 10_000);
        assert_eq!(context.cycled_addresses(1500).len(), 1500);
    }

    #[test]
    fn test_write_workloads_cannot_exceed_fixture() {
        let mut context = FixtureStore::embedded().unwrap().context();
        assert!(context.addresses_mut(1000).is_ok());
        assert!(matches!(
            context.addresses_mut(1001),
            Err(FixtureError::Exhausted { available: 1000, .. })
        ));
    }

    #[test]
    fn test_prepare_for_update_and_reset() {
        let mut context = FixtureStore::embedded().unwrap().context();
        let base = context.addresses()[0].clone();
        let at = chrono::Utc::now();
        context.addresses_mut(2).unwrap()[0].modified_time = Timestamp::new(at);

        context.prepare_for_update(2).unwrap();
        let first = &context.addresses()[0];
        assert_eq!(first.street, base.street.repeat(2));
        assert_eq!(first.modified_time, Timestamp::new(at - Duration::hours(1)));
        assert_eq!(context.addresses()[2], context.store().addresses()[2]);

        context.reset();
        assert_eq!(context.addresses()[0], base);
    }
}
