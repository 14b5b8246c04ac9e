//! relsnap Gate - bounded-concurrency worker pool
//!
//! Admits at most `capacity` units of work at once and queues the rest in
//! submission order. Two observable signals:
//! - a work-error hook, called for every unit of work that fails or panics
//!   (diagnostics only; the pool keeps running)
//! - an idle signal, raised once when executing plus queued work drops to
//!   zero after having been non-zero
//!
//! # Example
//!
//! ```rust,ignore
//! use relsnap_gate::ConcurrencyGate;
//!
//! let gate = ConcurrencyGate::builder(4).build()?;
//! let idle = gate.on_idle();
//! {
//!     let _hold = gate.hold();
//!     for url in urls {
//!         gate.submit(url.clone(), move || fetch(url));
//!     }
//! }
//! let stats = idle.await;
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod gate;

pub use error::GateError;
pub use gate::{ConcurrencyGate, GateBuilder, GateHold, GateStats, Submission, WorkFailure};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
