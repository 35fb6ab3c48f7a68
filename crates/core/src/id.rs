//! Serial-number identifiers.
//!
//! Every record is numbered by a storage sequence. Numbers are never reused
//! and a lower number means an older record; allocation relies on that for
//! its first-in-first-out order.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! serial_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw serial. Fresh ids come from the database sequences.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self).map_err(|e| {
                    DomainError::invalid_id(format!("{} '{}': {e}", stringify!($name), s.trim()))
                })
            }
        }
    };
}

serial_id!(
    /// A delivery note.
    DeliveryId
);
serial_id!(
    /// One physical unit received on a delivery.
    StockItemId
);
serial_id!(
    /// A catalogue entry: manufacturer and product.
    StockTypeId
);
serial_id!(
    /// A sale position: a pump, an optic, a shelf.
    StockLineId
);
serial_id!(SupplierId);
serial_id!(UnitId);
serial_id!(DepartmentId);
