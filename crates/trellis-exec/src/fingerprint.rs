//! Plan fingerprints.
//!
//! The fingerprint is a blake3 digest of the serialized plan description, so
//! two chains over structurally identical shapes (same kinds, parameters and
//! cost estimates) log the same id.

use trellis_core::hash::{fingerprint_serde, Fingerprint};
use trellis_core::prelude::Result;
use trellis_operators::Shape;

pub fn plan_fingerprint(shape: &Shape) -> Result<Fingerprint> {
    fingerprint_serde(&shape.describe())
}
