//! # minimact_core - Minimact Core Primitives
//!
//! Zero-dependency primitives shared by the reconciliation core and the
//! boundary layer that exposes it to host languages.
//!
//! The main export is the generational handle arena: predictor instances
//! live inside the core and callers only ever see an opaque integer. A
//! destroyed instance's handle stays detectably invalid, so use-after-free
//! from a host binding surfaces as an error instead of touching another
//! instance.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub mod error;
pub mod handle;

pub use error::*;
pub use handle::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::HandleError;
    pub use crate::handle::{Handle, HandleAllocator, HandleMap};
}
