#![forbid(unsafe_code)]
//! trellis-core: the shared vocabulary of the query core.
//!
//! Everything here is plain data plus the read half of the store contract
//! (`Namer`). Execution lives in `trellis-operators`, rewriting in
//! `trellis-planner`, and the pull driver in `trellis-exec`.

pub mod config;
pub mod costs;
pub mod error;
pub mod hash;
pub mod id;
pub mod namer;
pub mod prelude;
pub mod quad;
pub mod refs;
pub mod value;

pub use error::{Error, Result};
