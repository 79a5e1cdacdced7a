//! dynquorum types - value types shared by the governance engine and CLI.
//!
//! - `U256` (256-bit unsigned integer for vote counts and token supply)
//! - `Bps` (basis points, 10000 = 100%)
//! - `Address` (20-byte account identifier)

pub mod address;
pub mod bps;
pub mod u256;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use bps::Bps;
pub use u256::U256;
pub use error::TypesError;

/// Block height on the governed chain.
pub type BlockNumber = u64;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, BlockNumber, Bps, TypesError, U256};
}
