use super::{FieldBindings, FieldRole, Record, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Denormalized sales report row; a select destination only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReport {
    pub id: i64,
    pub created_time: Timestamp,
    pub modified_time: Timestamp,
    pub price: i64,
    pub quantity: i64,
    pub total: i64,
    pub customer_id: i64,
    pub customer_first: String,
    pub customer_last: String,
    pub vendor_id: i64,
    pub vendor_name: String,
    pub vendor_description: String,
    pub vendor_contact_id: i64,
    pub vendor_contact_first: String,
    pub vendor_contact_last: String,
}

impl Record for SaleReport {
    fn bindings() -> &'static FieldBindings<Self> {
        static BINDINGS: OnceLock<FieldBindings<SaleReport>> = OnceLock::new();
        BINDINGS.get_or_init(|| {
            use FieldRole::*;
            FieldBindings::new(vec![
                field!(SaleReport, "pk", Key, id: int),
                field!(SaleReport, "created_tmz", CreatedMarker, created_time: marker),
                field!(SaleReport, "modified_tmz", ModifiedMarker, modified_time: marker),
                field!(SaleReport, "price", Data, price: int),
                field!(SaleReport, "quantity", Data, quantity: int),
                field!(SaleReport, "total", Data, total: int),
                field!(SaleReport, "customer_id", Data, customer_id: int),
                field!(SaleReport, "customer_first", Data, customer_first: text),
                field!(SaleReport, "customer_last", Data, customer_last: text),
                field!(SaleReport, "vendor_id", Data, vendor_id: int),
                field!(SaleReport, "vendor_name", Data, vendor_name: text),
                field!(SaleReport, "vendor_description", Data, vendor_description: text),
                field!(SaleReport, "vendor_contact_id", Data, vendor_contact_id: int),
                field!(SaleReport, "vendor_contact_first", Data, vendor_contact_first: text),
                field!(SaleReport, "vendor_contact_last", Data, vendor_contact_last: text),
            ])
        })
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn created(&self) -> Timestamp {
        self.created_time
    }

    fn modified(&self) -> Timestamp {
        self.modified_time
    }

    fn set_modified(&mut self, marker: Timestamp) {
        self.modified_time = marker;
    }

    fn clear_generated(&mut self) {
        self.id = 0;
        self.created_time = Timestamp::UNSET;
        self.modified_time = Timestamp::UNSET;
    }

    fn perturb(&mut self) {
        self.customer_first = self.customer_first.repeat(2);
        self.customer_last = self.customer_last.repeat(2);
        self.vendor_name = self.vendor_name.repeat(2);
        self.vendor_description = self.vendor_description.repeat(2);
        self.vendor_contact_first = self.vendor_contact_first.repeat(2);
        self.vendor_contact_last = self.vendor_contact_last.repeat(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifteen_columns() {
        let bindings = SaleReport::bindings();
        assert_eq!(bindings.fields().len(), 15);
        assert!(bindings.lookup("vendor_contact_last").is_some());
    }

    #[test]
    fn test_positional_values_roundtrip_through_bindings() {
        let report = SaleReport {
            id: 4,
            price: 250,
            quantity: 2,
            total: 500,
            customer_first: "Ava".to_string(),
            ..Default::default()
        };
        let bindings = SaleReport::bindings();
        let row = bindings.values(&report, bindings.fields().iter());
        assert_eq!(SaleReport::from_values(row).unwrap(), report);
    }
}
