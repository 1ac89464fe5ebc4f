//! hl-core: stable foundation for hydrolift.
//!
//! Contains:
//! - units (uom SI types + reporting conversions)
//! - numeric (sign and loop-angle helpers)
//! - ids (compact floater identifiers)
//! - timing (wall-clock measurement for step pacing)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
