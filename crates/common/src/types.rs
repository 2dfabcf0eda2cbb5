use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw row identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row identifier.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a client row.
    ClientId
);

entity_id!(
    /// Identifier of a product row.
    ProductId
);

entity_id!(
    /// Identifier of an order row.
    ///
    /// Kept distinct from the other ids so an order id can never be passed
    /// where a client or product id is expected.
    OrderId
);

entity_id!(
    /// Identifier of an order line item row.
    OrderItemId
);
