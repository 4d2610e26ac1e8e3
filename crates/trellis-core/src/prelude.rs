//! Convenient re-exports for downstream crates.

pub use crate::config::ExecConfig;
pub use crate::costs::Costs;
pub use crate::error::{Error, Result};
pub use crate::id::{NodeId, QuadId};
pub use crate::namer::{resolve, Namer, StoreStats};
pub use crate::quad::{Action, Delta, Direction, IgnoreOpts, Quad};
pub use crate::refs::{Ref, RefKey, Size, TagMap};
pub use crate::value::Value;
