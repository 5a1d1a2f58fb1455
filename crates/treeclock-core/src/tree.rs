//! Interval tree clock data structures.
//!
//! - [`Id`] partitions the interval \[0, 1) among replicas: which
//!   fraction of the id space this stamp may place events in.
//! - [`Event`] records observed causal history as a binary tree of
//!   counters; an interior node's counter is a shared base added to
//!   everything below it.
//! - [`Stamp`] pairs the two.
//!
//! The smart constructors ([`Id::branch`], [`Event::branch`]) keep
//! trees in their unique minimal form, so anything built through them
//! is already normalized. [`Id::validate`] and [`Event::validate`]
//! exist for trees that arrive from outside — the wire decoder and
//! host code that assembles variants directly.
//!
//! Operations (fork, event, join, compare) live in [`crate::ops`];
//! the binary codec lives in [`crate::codec`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// Event counter width, selected at build time.
///
/// `u32` by default; the `counter-u64` cargo feature widens it to
/// `u64` (and with it the maximum serialized counter size).
#[cfg(not(feature = "counter-u64"))]
pub type Counter = u32;

/// Event counter width, selected at build time.
#[cfg(feature = "counter-u64")]
pub type Counter = u64;

// ---------------------------------------------------------------------------
// Identity tree
// ---------------------------------------------------------------------------

/// An identity tree: a partition of \[0, 1) among replicas.
///
/// Leaves either own their sub-interval (`One`) or do not (`Zero`);
/// a branch halves the interval. Only leaves carry ownership — the
/// enum has nowhere to put a flag on a branch, which is the point.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Id {
    /// Leaf `0`: this sub-interval is not owned here.
    Zero,
    /// Leaf `1`: this sub-interval is owned here.
    One,
    /// Interior node splitting the interval into halves.
    Branch(Box<Self>, Box<Self>),
}

impl Id {
    /// The non-owning leaf `0`.
    #[must_use]
    pub const fn zero() -> Self {
        Self::Zero
    }

    /// The owning leaf `1`.
    #[must_use]
    pub const fn one() -> Self {
        Self::One
    }

    /// Build a branch, collapsing `(0, 0)` to `0` and `(1, 1)` to `1`.
    ///
    /// Given normalized children this yields a normalized tree.
    #[must_use]
    pub fn branch(left: Self, right: Self) -> Self {
        // arms that agree on a leaf fold into that leaf
        if left.is_leaf() && left == right {
            return left;
        }
        Self::Branch(Box::new(left), Box::new(right))
    }

    /// `true` when no part of the interval is owned.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        matches!(self, Self::Zero)
    }

    /// `true` when the whole interval is owned.
    #[must_use]
    pub const fn is_one(&self) -> bool {
        matches!(self, Self::One)
    }

    /// `true` for `Zero` and `One`.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        !matches!(self, Self::Branch(..))
    }

    /// Levels below this node; 0 for a leaf.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending: Vec<(&Self, usize)> = vec![(self, 0)];
        while let Some((node, level)) = pending.pop() {
            if let Self::Branch(l, r) = node {
                pending.push((l, level + 1));
                pending.push((r, level + 1));
            } else {
                deepest = deepest.max(level);
            }
        }
        deepest
    }

    /// Total node count, leaves included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut pending: Vec<&Self> = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            if let Self::Branch(l, r) = node {
                pending.push(l);
                pending.push(r);
            }
        }
        count
    }

    /// Rewrite to minimal form, bottom up. Idempotent; preserves the
    /// ownership set.
    #[must_use]
    pub fn normalize(self) -> Self {
        if let Self::Branch(l, r) = self {
            Self::branch(l.normalize(), r.normalize())
        } else {
            self
        }
    }

    /// `true` when no subtree matches `(0, 0)` or `(1, 1)`.
    #[must_use]
    pub fn is_normal(&self) -> bool {
        match self {
            Self::Zero | Self::One => true,
            Self::Branch(l, r) => !(l.is_leaf() && l == r) && l.is_normal() && r.is_normal(),
        }
    }

    /// Reject a tree that is not in normal form.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptId`] when a collapsible `(0, 0)` or `(1, 1)`
    /// pattern is present.
    pub fn validate(&self) -> Result<(), Error> {
        if self.is_normal() {
            Ok(())
        } else {
            Err(Error::CorruptId)
        }
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "0"),
            Self::One => write!(f, "1"),
            Self::Branch(l, r) => write!(f, "({l:?}, {r:?})"),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Event tree
// ---------------------------------------------------------------------------

/// An event tree: causal history as a binary tree of counters.
///
/// The effective count at any position is the sum of counters on the
/// path from the root. Normal form lifts the children's common floor
/// into the parent and collapses a branch over two equal leaves.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    /// Leaf carrying a counter.
    Leaf(Counter),
    /// Interior node: a base counter shared by both subtrees.
    Branch(Counter, Box<Self>, Box<Self>),
}

impl Event {
    /// Leaf with the given counter.
    #[must_use]
    pub const fn leaf(value: Counter) -> Self {
        Self::Leaf(value)
    }

    /// The empty history: leaf `0`.
    #[must_use]
    pub const fn zero() -> Self {
        Self::Leaf(0)
    }

    /// Build a branch in normal form.
    ///
    /// The arms' common floor is lifted into the base first; if the
    /// arms then level out to one leaf value the branch folds into a
    /// single leaf. Given normalized children the result is
    /// normalized.
    #[must_use]
    pub fn branch(base: Counter, mut left: Self, mut right: Self) -> Self {
        let floor = left.min_value().min(right.min_value());
        if floor > 0 {
            let n = left.root_counter_mut();
            *n = n.saturating_sub(floor);
            let n = right.root_counter_mut();
            *n = n.saturating_sub(floor);
        }
        let base = base.saturating_add(floor);
        if let (Self::Leaf(a), Self::Leaf(b)) = (&left, &right) {
            if a == b {
                return Self::Leaf(base.saturating_add(*a));
            }
        }
        Self::Branch(base, Box::new(left), Box::new(right))
    }

    /// `true` for a leaf node.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        !matches!(self, Self::Branch(..))
    }

    /// The counter at this node: leaf value or branch base.
    #[must_use]
    pub const fn value(&self) -> Counter {
        match self {
            Self::Leaf(n) => *n,
            Self::Branch(n, _, _) => *n,
        }
    }

    /// Smallest effective count anywhere in the subtree: the lowest
    /// root-to-leaf path sum.
    #[must_use]
    pub fn min_value(&self) -> Counter {
        let mut lowest = Counter::MAX;
        let mut pending: Vec<(&Self, Counter)> = vec![(self, 0)];
        while let Some((node, offset)) = pending.pop() {
            let reach = offset.saturating_add(node.value());
            if let Self::Branch(_, l, r) = node {
                pending.push((l, reach));
                pending.push((r, reach));
            } else {
                lowest = lowest.min(reach);
            }
        }
        lowest
    }

    /// Largest effective count anywhere in the subtree: the highest
    /// root-to-leaf path sum.
    ///
    /// A leaf carrying this value dominates the whole subtree; that is
    /// exactly the "maximised" event used when a fully-owned region is
    /// inflated.
    #[must_use]
    pub fn max_value(&self) -> Counter {
        let mut highest = 0;
        let mut pending: Vec<(&Self, Counter)> = vec![(self, 0)];
        while let Some((node, offset)) = pending.pop() {
            let reach = offset.saturating_add(node.value());
            if let Self::Branch(_, l, r) = node {
                pending.push((l, reach));
                pending.push((r, reach));
            } else {
                highest = highest.max(reach);
            }
        }
        highest
    }

    /// Levels below this node; 0 for a leaf.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending: Vec<(&Self, usize)> = vec![(self, 0)];
        while let Some((node, level)) = pending.pop() {
            if let Self::Branch(_, l, r) = node {
                pending.push((l, level + 1));
                pending.push((r, level + 1));
            } else {
                deepest = deepest.max(level);
            }
        }
        deepest
    }

    /// Total node count, leaves included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut pending: Vec<&Self> = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            if let Self::Branch(_, l, r) = node {
                pending.push(l);
                pending.push(r);
            }
        }
        count
    }

    /// Rewrite to minimal form, bottom up. Idempotent; preserves the
    /// effective count at every position.
    #[must_use]
    pub fn normalize(self) -> Self {
        if let Self::Branch(n, l, r) = self {
            Self::branch(n, l.normalize(), r.normalize())
        } else {
            self
        }
    }

    /// `true` when every branch has a zero-floored child and no branch
    /// sits over two equal leaves.
    #[must_use]
    pub fn is_normal(&self) -> bool {
        match self {
            Self::Leaf(_) => true,
            Self::Branch(_, l, r) => {
                let folds = matches!((&**l, &**r), (Self::Leaf(a), Self::Leaf(b)) if a == b);
                let lifted = l.min_value().min(r.min_value()) == 0;
                !folds && lifted && l.is_normal() && r.is_normal()
            }
        }
    }

    /// Reject a tree that is not in normal form.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptEvent`] when a branch folds to a leaf or still
    /// carries a liftable common floor.
    pub fn validate(&self) -> Result<(), Error> {
        if self.is_normal() {
            Ok(())
        } else {
            Err(Error::CorruptEvent)
        }
    }

    /// Raise this node's counter by `delta`.
    ///
    /// Saturates at the counter width; trees satisfying the finiteness
    /// invariant never reach saturation through the crate's own
    /// operations.
    #[must_use]
    pub fn lift(mut self, delta: Counter) -> Self {
        let n = self.root_counter_mut();
        *n = n.saturating_add(delta);
        self
    }

    /// The root counter, writable. Backs [`Event::lift`] and the floor
    /// lift in [`Event::branch`].
    fn root_counter_mut(&mut self) -> &mut Counter {
        match self {
            Self::Leaf(n) | Self::Branch(n, _, _) => n,
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(n) => write!(f, "{n}"),
            Self::Branch(n, l, r) => write!(f, "({n}, {l:?}, {r:?})"),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Stamp
// ---------------------------------------------------------------------------

/// A stamp: one replica's identity paired with its observed history.
///
/// The identity names which fraction of the id space this replica may
/// inflate; the event tree records what has been observed over the
/// whole interval, including work done by others. Both trees are
/// exclusively owned and all clones are deep.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stamp {
    /// Identity partition owned by this replica.
    pub id: Id,
    /// Observed causal history.
    pub event: Event,
}

impl Stamp {
    /// Pair an identity with an event history.
    #[must_use]
    pub const fn new(id: Id, event: Event) -> Self {
        Self { id, event }
    }

    /// The initial stamp `(1, 0)`: full ownership, empty history.
    #[must_use]
    pub const fn seed() -> Self {
        Self {
            id: Id::one(),
            event: Event::zero(),
        }
    }

    /// A stamp `(0, 0)` that owns nothing.
    ///
    /// Anonymous stamps can observe, compare, and be joined, but
    /// cannot inflate their history.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            id: Id::zero(),
            event: Event::zero(),
        }
    }

    /// `true` when the stamp owns no part of the interval.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.id.is_zero()
    }

    /// Normalize both components.
    #[must_use]
    pub fn normalize(self) -> Self {
        Self {
            id: self.id.normalize(),
            event: self.event.normalize(),
        }
    }

    /// Reject a stamp whose components are not in normal form.
    ///
    /// # Errors
    ///
    /// The component-specific kind: [`Error::CorruptId`] or
    /// [`Error::CorruptEvent`].
    pub fn validate(&self) -> Result<(), Error> {
        self.id.validate()?;
        self.event.validate()
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.id, self.event)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
