#![forbid(unsafe_code)]
//! Interval tree clocks.
//!
//! Causality tracking for systems where the set of replicas changes
//! at runtime: identity over the interval \[0, 1) is forked, merged,
//! and retired without coordination, while the event tree records the
//! observed history. Generalizes version vectors without per-replica
//! index bookkeeping.
//!
//! From Almeida, Baquero & Fonte (2008), "Interval Tree Clocks".
//!
//! ```
//! use treeclock_core::{CausalOrdering, Stamp};
//!
//! let (mut a, mut b) = Stamp::seed().fork();
//! a.event()?;
//! b.event()?;
//! assert_eq!(a.compare(&b), CausalOrdering::Concurrent);
//!
//! let merged = Stamp::join(&a, &b.peek())?;
//! assert_eq!(merged.compare(&a), CausalOrdering::Greater);
//! # Ok::<(), treeclock_core::Error>(())
//! ```

pub mod codec;
pub mod error;
pub mod ops;
pub mod text;
pub mod tree;

pub use codec::WIRE_VERSION;
pub use error::Error;
pub use ops::CausalOrdering;
pub use tree::{Counter, Event, Id, Stamp};
