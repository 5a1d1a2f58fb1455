//! Stamp operations: fork, event, join, peek, compare.
//!
//! The identity algebra (`split`/`sum`) conserves total ownership of
//! the interval across the replica population; the event algebra
//! (`leq`/`join`/`fill`/`grow`) keeps histories in a join semilattice.
//! The public [`Stamp`] methods compose the two.
//!
//! Inflation is fill-then-grow: `fill` raises counters inside owned
//! regions without adding nodes, and only when that cannot register
//! progress does `grow` enlarge the tree, picking the shallowest
//! enlargement available.

use crate::error::Error;
use crate::tree::{Counter, Event, Id, Stamp};

/// Outcome of comparing two stamps' histories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CausalOrdering {
    /// Self's history is strictly contained in the other's.
    Less,
    /// The two histories are identical.
    Equal,
    /// Self's history strictly contains the other's.
    Greater,
    /// Each history holds events the other has not observed.
    Concurrent,
}

// ===========================================================================
// Identity algebra
// ===========================================================================

/// Halve ownership deterministically: the pieces are disjoint and
/// together cover exactly the input's interval.
fn split_id(id: &Id) -> (Id, Id) {
    match id {
        Id::Zero => (Id::zero(), Id::zero()),
        Id::One => (
            Id::branch(Id::one(), Id::zero()),
            Id::branch(Id::zero(), Id::one()),
        ),
        Id::Branch(l, r) => {
            if l.is_zero() {
                // ownership is all on the right; subdivide there
                let (a, b) = split_id(r);
                (Id::branch(Id::zero(), a), Id::branch(Id::zero(), b))
            } else if r.is_zero() {
                let (a, b) = split_id(l);
                (Id::branch(a, Id::zero()), Id::branch(b, Id::zero()))
            } else {
                // both halves owned in part: hand each side out whole
                (
                    Id::branch((**l).clone(), Id::zero()),
                    Id::branch(Id::zero(), (**r).clone()),
                )
            }
        }
    }
}

/// Reunite two disjoint identities.
fn sum_ids(a: &Id, b: &Id) -> Result<Id, Error> {
    match (a, b) {
        (Id::Zero, other) | (other, Id::Zero) => Ok(other.clone()),
        (Id::Branch(al, ar), Id::Branch(bl, br)) => {
            Ok(Id::branch(sum_ids(al, bl)?, sum_ids(ar, br)?))
        }
        // any remaining pair puts ownership in both operands
        _ => Err(Error::OverlappingInterval),
    }
}

impl Id {
    /// Split this identity into two disjoint halves covering it.
    ///
    /// Splitting `0` yields two `0`s: an anonymous identity stays
    /// anonymous however often it is divided.
    #[must_use]
    pub fn split(&self) -> (Self, Self) {
        split_id(self)
    }

    /// The union of this identity with a disjoint one.
    ///
    /// # Errors
    ///
    /// [`Error::OverlappingInterval`] when any sub-interval is owned
    /// by both operands.
    pub fn sum(&self, other: &Self) -> Result<Self, Error> {
        sum_ids(self, other)
    }
}

// ===========================================================================
// Event algebra
// ===========================================================================

/// Causal order: does `a` (offset by `base_a`) stay at-or-below `b`
/// (offset by `base_b`) at every position?
///
/// Offsets accumulate down the recursion instead of rewriting trees,
/// so the comparison allocates nothing.
fn event_leq(a: &Event, base_a: Counter, b: &Event, base_b: Counter) -> bool {
    let here_a = base_a.saturating_add(a.value());
    let here_b = base_b.saturating_add(b.value());
    match a {
        Event::Leaf(_) => here_a <= here_b,
        Event::Branch(_, al, ar) => {
            if here_a > here_b {
                return false;
            }
            match b {
                Event::Leaf(_) => {
                    event_leq(al, here_a, b, base_b) && event_leq(ar, here_a, b, base_b)
                }
                Event::Branch(_, bl, br) => {
                    event_leq(al, here_a, bl, here_b) && event_leq(ar, here_a, br, here_b)
                }
            }
        }
    }
}

/// Pointwise supremum of two histories, normalized.
fn join_events(a: &Event, b: &Event) -> Event {
    match (a, b) {
        (Event::Leaf(x), Event::Leaf(y)) => Event::leaf((*x).max(*y)),
        (Event::Leaf(n), Event::Branch(..)) => {
            // a flat history is a branch with empty arms
            let expanded = Event::Branch(*n, Box::new(Event::zero()), Box::new(Event::zero()));
            join_events(&expanded, b)
        }
        (Event::Branch(..), Event::Leaf(_)) => join_events(b, a),
        (Event::Branch(na, al, ar), Event::Branch(nb, bl, br)) => {
            if na > nb {
                return join_events(b, a);
            }
            // align the higher base onto the lower one
            let delta = nb - na;
            Event::branch(
                *na,
                join_events(al, &(**bl).clone().lift(delta)),
                join_events(ar, &(**br).clone().lift(delta)),
            )
        }
    }
}

impl Event {
    /// `true` when this history is at-or-below `other` at every
    /// position in the interval.
    #[must_use]
    pub fn leq(&self, other: &Self) -> bool {
        event_leq(self, 0, other, 0)
    }

    /// The least history that dominates both `self` and `other`.
    ///
    /// Commutative, associative, and idempotent.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        join_events(self, other)
    }
}

/// Raise counters inside regions the identity owns, without growing
/// the tree. Counters only rise to values already observed elsewhere
/// in the history, so the result stays dominated by anything that
/// dominated the input joined with its own reports.
///
/// Returns the filled history and whether it differs from the input.
fn fill(id: &Id, event: &Event) -> (Event, bool) {
    let filled = fill_tree(id, event);
    let changed = filled != *event;
    (filled, changed)
}

fn fill_tree(id: &Id, event: &Event) -> Event {
    match (id, event) {
        (Id::Zero, _) | (Id::Branch(..), Event::Leaf(_)) => event.clone(),
        // full ownership flattens the whole subtree to its maximum
        (Id::One, _) => Event::leaf(event.max_value()),
        (Id::Branch(il, ir), Event::Branch(n, el, er)) => {
            if il.is_one() {
                // the owned left arm may rise to whatever the right
                // arm already reports everywhere
                let fr = fill_tree(ir, er);
                let fl = Event::leaf(el.max_value().max(fr.min_value()));
                Event::branch(*n, fl, fr)
            } else if ir.is_one() {
                let fl = fill_tree(il, el);
                let fr = Event::leaf(er.max_value().max(fl.min_value()));
                Event::branch(*n, fl, fr)
            } else {
                Event::branch(*n, fill_tree(il, el), fill_tree(ir, er))
            }
        }
    }
}

/// Cost charged when growth must expand a leaf into a branch; larger
/// than any possible descent cost so in-place growth always wins.
const EXPANSION_COST: u64 = 1 << 32;

/// Enlarge the history at a position the identity owns.
///
/// Returns the grown history and the depth-derived cost of the
/// enlargement, or `None` under an anonymous identity.
///
/// # Errors
///
/// [`Error::CounterOverflow`] when the increment would exceed the
/// counter width.
fn grow(id: &Id, event: &Event) -> Result<Option<(Event, u64)>, Error> {
    match (id, event) {
        (Id::Zero, _) => Ok(None),
        (Id::One, Event::Leaf(n)) => {
            let bumped = n.checked_add(1).ok_or(Error::CounterOverflow)?;
            Ok(Some((Event::leaf(bumped), 0)))
        }
        (Id::One, Event::Branch(n, l, r)) => {
            let grown_l = grow(&Id::One, l)?;
            let grown_r = grow(&Id::One, r)?;
            Ok(pick_side(*n, l, r, grown_l, grown_r, 1))
        }
        (Id::Branch(il, ir), Event::Leaf(n)) => {
            // expand the leaf into (n, 0, 0), then grow inside it
            let arm = Event::zero();
            let grown_l = grow(il, &arm)?;
            let grown_r = grow(ir, &arm)?;
            Ok(pick_side(*n, &arm, &arm, grown_l, grown_r, EXPANSION_COST))
        }
        (Id::Branch(il, ir), Event::Branch(n, el, er)) => {
            let grown_l = grow(il, el)?;
            let grown_r = grow(ir, er)?;
            Ok(pick_side(*n, el, er, grown_l, grown_r, 1))
        }
    }
}

/// Keep the cheaper of two candidate growths (ties go left) and
/// rebuild the branch around it.
fn pick_side(
    base: Counter,
    left: &Event,
    right: &Event,
    grown_left: Option<(Event, u64)>,
    grown_right: Option<(Event, u64)>,
    surcharge: u64,
) -> Option<(Event, u64)> {
    let take_left = match (&grown_left, &grown_right) {
        (Some((_, cl)), Some((_, cr))) => cl <= cr,
        (Some(_), None) => true,
        (None, _) => false,
    };
    if take_left {
        grown_left.map(|(gl, cl)| (Event::branch(base, gl, right.clone()), cl + surcharge))
    } else {
        grown_right.map(|(gr, cr)| (Event::branch(base, left.clone(), gr), cr + surcharge))
    }
}

// ===========================================================================
// Stamp operations
// ===========================================================================

impl Stamp {
    /// Split this stamp into two replicas.
    ///
    /// The identity is halved; each side carries a deep copy of the
    /// history. Joining the pair immediately reproduces a stamp equal
    /// to this one.
    #[must_use]
    pub fn fork(&self) -> (Self, Self) {
        let (left, right) = self.id.split();
        (
            Self::new(left, self.event.clone()),
            Self::new(right, self.event.clone()),
        )
    }

    /// An anonymous stamp carrying a copy of this history.
    ///
    /// Peek stamps transmit observations; they cannot inflate.
    #[must_use]
    pub fn peek(&self) -> Self {
        Self::new(Id::zero(), self.event.clone())
    }

    /// Record one new event at a position this stamp owns.
    ///
    /// Fill is tried first; when it cannot register progress the tree
    /// is grown by the shallowest enlargement. On an anonymous stamp
    /// this is a silent no-op. On error the stamp is unchanged.
    ///
    /// # Errors
    ///
    /// [`Error::CounterOverflow`] when the owned counter is already at
    /// the width limit.
    pub fn event(&mut self) -> Result<(), Error> {
        if self.id.is_zero() {
            return Ok(());
        }
        let (filled, changed) = fill(&self.id, &self.event);
        if changed {
            self.event = filled;
            return Ok(());
        }
        if let Some((grown, _cost)) = grow(&self.id, &self.event)? {
            self.event = grown;
        }
        Ok(())
    }

    /// Merge two stamps: identities reunite, histories take their
    /// supremum.
    ///
    /// # Errors
    ///
    /// [`Error::OverlappingInterval`] when the identities are not
    /// disjoint.
    pub fn join(a: &Self, b: &Self) -> Result<Self, Error> {
        let id = a.id.sum(&b.id)?;
        let event = a.event.join(&b.event);
        Ok(Self::new(id, event))
    }

    /// `true` when every event here is also recorded in `other`.
    #[must_use]
    pub fn leq(&self, other: &Self) -> bool {
        self.event.leq(&other.event)
    }

    /// `true` when neither history dominates the other.
    #[must_use]
    pub fn concurrent(&self, other: &Self) -> bool {
        !self.leq(other) && !other.leq(self)
    }

    /// Four-way causal comparison, decided from the histories alone.
    ///
    /// Identity plays no part: causality is a property of what was
    /// observed, not of who currently owns the interval.
    #[must_use]
    pub fn compare(&self, other: &Self) -> CausalOrdering {
        match (self.leq(other), other.leq(self)) {
            (true, true) => CausalOrdering::Equal,
            (true, false) => CausalOrdering::Less,
            (false, true) => CausalOrdering::Greater,
            (false, false) => CausalOrdering::Concurrent,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ev_branch_raw(n: Counter, l: Event, r: Event) -> Event {
        Event::Branch(n, Box::new(l), Box::new(r))
    }

    // === split / sum ========================================================

    #[test]
    fn split_seed_gives_complementary_halves() {
        let (a, b) = Id::one().split();
        assert_eq!(a, Id::branch(Id::one(), Id::zero()));
        assert_eq!(b, Id::branch(Id::zero(), Id::one()));
    }

    #[test]
    fn split_zero_stays_zero() {
        assert_eq!(Id::zero().split(), (Id::Zero, Id::Zero));
    }

    #[test]
    fn split_descends_into_the_owned_side() {
        // (1, 0) -> ((1,0), 0) and ((0,1), 0)
        let (a, b) = Id::branch(Id::one(), Id::zero()).split();
        assert_eq!(a, Id::branch(Id::branch(Id::one(), Id::zero()), Id::zero()));
        assert_eq!(b, Id::branch(Id::branch(Id::zero(), Id::one()), Id::zero()));

        // mirrored for (0, 1)
        let (c, d) = Id::branch(Id::zero(), Id::one()).split();
        assert_eq!(c, Id::branch(Id::zero(), Id::branch(Id::one(), Id::zero())));
        assert_eq!(d, Id::branch(Id::zero(), Id::branch(Id::zero(), Id::one())));
    }

    #[test]
    fn split_mixed_branch_hands_out_whole_sides() {
        let id = Id::branch(
            Id::branch(Id::one(), Id::zero()),
            Id::branch(Id::zero(), Id::one()),
        );
        let (a, b) = id.split();
        assert_eq!(a, Id::branch(Id::branch(Id::one(), Id::zero()), Id::zero()));
        assert_eq!(b, Id::branch(Id::zero(), Id::branch(Id::zero(), Id::one())));
    }

    #[test]
    fn sum_inverts_split() {
        let cases = [
            Id::one(),
            Id::branch(Id::one(), Id::zero()),
            Id::branch(Id::zero(), Id::branch(Id::one(), Id::zero())),
        ];
        for id in cases {
            let (a, b) = id.split();
            assert_eq!(a.sum(&b).expect("disjoint"), id);
        }
    }

    #[test]
    fn sum_rejects_overlap() {
        assert_eq!(Id::one().sum(&Id::one()), Err(Error::OverlappingInterval));

        let half = Id::branch(Id::one(), Id::zero());
        assert_eq!(Id::one().sum(&half), Err(Error::OverlappingInterval));
        assert_eq!(half.sum(&half), Err(Error::OverlappingInterval));

        // overlap buried one level down
        let quarter = Id::branch(Id::branch(Id::one(), Id::zero()), Id::zero());
        assert_eq!(half.sum(&quarter), Err(Error::OverlappingInterval));
    }

    #[test]
    fn sum_with_zero_is_identity() {
        let half = Id::branch(Id::zero(), Id::one());
        assert_eq!(Id::zero().sum(&half).expect("disjoint"), half);
        assert_eq!(half.sum(&Id::zero()).expect("disjoint"), half);
    }

    // === leq ================================================================

    #[test]
    fn leq_on_leaves_is_counter_order() {
        assert!(Event::leaf(2).leq(&Event::leaf(2)));
        assert!(Event::leaf(2).leq(&Event::leaf(5)));
        assert!(!Event::leaf(5).leq(&Event::leaf(2)));
    }

    #[test]
    fn leq_branch_against_dominating_leaf() {
        let e = ev_branch_raw(1, Event::Leaf(0), Event::Leaf(2));
        assert!(e.leq(&Event::leaf(3)));
        assert!(!e.leq(&Event::leaf(2)));
        assert!(!Event::leaf(2).leq(&e));
    }

    #[test]
    fn leq_compares_positionwise_not_by_max() {
        // a peaks left, b peaks right: concurrent
        let a = ev_branch_raw(0, Event::Leaf(3), Event::Leaf(0));
        let b = ev_branch_raw(0, Event::Leaf(0), Event::Leaf(3));
        assert!(!a.leq(&b));
        assert!(!b.leq(&a));
    }

    #[test]
    fn leq_accumulates_bases_down_the_tree() {
        let a = ev_branch_raw(
            1,
            ev_branch_raw(0, Event::Leaf(0), Event::Leaf(1)),
            Event::Leaf(0),
        );
        let b = ev_branch_raw(
            2,
            ev_branch_raw(0, Event::Leaf(0), Event::Leaf(1)),
            Event::Leaf(1),
        );
        assert!(a.leq(&b));
        assert!(!b.leq(&a));
    }

    // === join ===============================================================

    #[test]
    fn join_of_leaves_is_max() {
        assert_eq!(Event::leaf(3).join(&Event::leaf(5)), Event::Leaf(5));
    }

    #[test]
    fn join_flat_history_against_branch() {
        let b = ev_branch_raw(1, Event::Leaf(0), Event::Leaf(3));
        // flat 5 dominates everything in b
        assert_eq!(Event::leaf(5).join(&b), Event::Leaf(5));
        // flat 2 only dominates the left arm
        let joined = Event::leaf(2).join(&b);
        assert_eq!(joined, ev_branch_raw(2, Event::Leaf(0), Event::Leaf(2)));
    }

    #[test]
    fn join_aligns_mismatched_bases() {
        let a = ev_branch_raw(1, Event::Leaf(0), Event::Leaf(2));
        let b = ev_branch_raw(3, Event::Leaf(1), Event::Leaf(0));
        let joined = a.join(&b);
        // positionwise sup: left max(1, 4) = 4, right max(3, 3) = 3
        assert_eq!(joined, ev_branch_raw(3, Event::Leaf(1), Event::Leaf(0)));
        assert!(a.leq(&joined));
        assert!(b.leq(&joined));
    }

    #[test]
    fn join_collapses_when_arms_level_out() {
        let a = ev_branch_raw(0, Event::Leaf(1), Event::Leaf(0));
        let b = ev_branch_raw(0, Event::Leaf(0), Event::Leaf(1));
        assert_eq!(a.join(&b), Event::Leaf(1));
    }

    // === fill ===============================================================

    #[test]
    fn fill_is_inert_without_ownership() {
        let e = ev_branch_raw(0, Event::Leaf(0), Event::Leaf(2));
        let (filled, changed) = fill(&Id::zero(), &e);
        assert_eq!(filled, e);
        assert!(!changed);
    }

    #[test]
    fn fill_flattens_fully_owned_history() {
        let e = ev_branch_raw(1, Event::Leaf(0), Event::Leaf(2));
        let (filled, changed) = fill(&Id::one(), &e);
        assert_eq!(filled, Event::Leaf(3));
        assert!(changed);
    }

    #[test]
    fn fill_leaves_a_leaf_alone() {
        let (filled, changed) = fill(&Id::one(), &Event::leaf(4));
        assert_eq!(filled, Event::Leaf(4));
        assert!(!changed);

        let id = Id::branch(Id::one(), Id::zero());
        let (filled, changed) = fill(&id, &Event::leaf(4));
        assert_eq!(filled, Event::Leaf(4));
        assert!(!changed);
    }

    #[test]
    fn fill_owned_arm_rises_to_the_other_arms_floor() {
        // own the left half; the right arm reports at least 2 everywhere
        let id = Id::branch(Id::one(), Id::zero());
        let e = ev_branch_raw(0, Event::Leaf(1), Event::Leaf(2));
        let (filled, changed) = fill(&id, &e);
        assert_eq!(filled, Event::Leaf(2));
        assert!(changed);
        assert!(e.leq(&filled));
    }

    #[test]
    fn fill_owned_arm_keeps_its_own_peak() {
        // the owned arm's own maximum beats the other arm's floor
        let id = Id::branch(Id::one(), Id::zero());
        let e = ev_branch_raw(
            0,
            ev_branch_raw(0, Event::Leaf(3), Event::Leaf(0)),
            Event::Leaf(1),
        );
        let (filled, changed) = fill(&id, &e);
        assert_eq!(filled, ev_branch_raw(1, Event::Leaf(2), Event::Leaf(0)));
        assert!(changed);
        assert!(e.leq(&filled));
    }

    #[test]
    fn fill_recurses_into_partial_ownership() {
        // own only the outer-left quarter; nothing there to raise
        let id = Id::branch(Id::branch(Id::one(), Id::zero()), Id::zero());
        let e = ev_branch_raw(0, Event::Leaf(0), Event::Leaf(3));
        let (_, changed) = fill(&id, &e);
        assert!(!changed);
    }

    // === grow ===============================================================

    #[test]
    fn grow_increments_a_fully_owned_leaf() {
        let grown = grow(&Id::one(), &Event::zero())
            .expect("no overflow")
            .expect("owned");
        assert_eq!(grown, (Event::Leaf(1), 0));
    }

    #[test]
    fn grow_refuses_anonymous_identity() {
        assert_eq!(grow(&Id::zero(), &Event::zero()).expect("no overflow"), None);
    }

    #[test]
    fn grow_expands_a_leaf_under_a_half_identity() {
        let right_half = Id::branch(Id::zero(), Id::one());
        let (grown, cost) = grow(&right_half, &Event::zero())
            .expect("no overflow")
            .expect("owned");
        assert_eq!(grown, ev_branch_raw(0, Event::Leaf(0), Event::Leaf(1)));
        assert!(cost >= EXPANSION_COST);
    }

    #[test]
    fn grow_under_full_ownership_picks_the_shallower_arm() {
        // left arm is a leaf, right arm a branch: growing left costs
        // one level, growing right costs two, so left wins
        let e = ev_branch_raw(
            0,
            Event::Leaf(0),
            ev_branch_raw(0, Event::Leaf(1), Event::Leaf(0)),
        );
        let (grown, _) = grow(&Id::one(), &e).expect("no overflow").expect("owned");
        assert_eq!(
            grown,
            ev_branch_raw(
                0,
                Event::Leaf(1),
                ev_branch_raw(0, Event::Leaf(1), Event::Leaf(0))
            )
        );
        assert!(e.leq(&grown));
    }

    #[test]
    fn grow_overflow_is_reported() {
        let maxed = Event::leaf(Counter::MAX);
        assert_eq!(grow(&Id::one(), &maxed), Err(Error::CounterOverflow));
    }

    // === stamp ops ==========================================================

    #[test]
    fn fork_halves_identity_and_copies_history() {
        let mut s = Stamp::seed();
        s.event().expect("inflate");
        let (a, b) = s.fork();
        assert_eq!(a.event, s.event);
        assert_eq!(b.event, s.event);
        assert_ne!(a.id, b.id);
        assert!(!a.id.is_zero());
        assert!(!b.id.is_zero());
    }

    #[test]
    fn fork_of_anonymous_stays_anonymous() {
        let (a, b) = Stamp::anonymous().fork();
        assert!(a.is_anonymous());
        assert!(b.is_anonymous());
    }

    #[test]
    fn join_reunites_a_fork() {
        let s = Stamp::seed();
        let (a, b) = s.fork();
        let joined = Stamp::join(&a, &b).expect("disjoint");
        assert_eq!(joined.id, Id::one());
        assert_eq!(joined.compare(&s), CausalOrdering::Equal);
    }

    #[test]
    fn join_of_two_seeds_overlaps() {
        assert_eq!(
            Stamp::join(&Stamp::seed(), &Stamp::seed()),
            Err(Error::OverlappingInterval)
        );
    }

    #[test]
    fn event_advances_strictly() {
        let mut s = Stamp::seed();
        let before = s.clone();
        s.event().expect("inflate");
        assert_eq!(s.compare(&before), CausalOrdering::Greater);
    }

    #[test]
    fn event_on_anonymous_is_a_silent_noop() {
        let mut p = Stamp::seed().peek();
        let before = p.clone();
        assert_eq!(p.event(), Ok(()));
        assert_eq!(p, before);
    }

    #[test]
    fn event_at_counter_limit_fails_cleanly() {
        let mut s = Stamp::new(Id::one(), Event::leaf(Counter::MAX));
        let before = s.clone();
        assert_eq!(s.event(), Err(Error::CounterOverflow));
        assert_eq!(s, before);
    }

    #[test]
    fn peek_carries_history_without_identity() {
        let mut s = Stamp::seed();
        s.event().expect("inflate");
        let p = s.peek();
        assert!(p.is_anonymous());
        assert_eq!(p.event, s.event);
        assert_eq!(p.compare(&s), CausalOrdering::Equal);
    }

    #[test]
    fn compare_covers_all_four_outcomes() {
        let s0 = Stamp::seed();
        let mut s1 = s0.clone();
        s1.event().expect("inflate");

        assert_eq!(s0.compare(&s0), CausalOrdering::Equal);
        assert_eq!(s0.compare(&s1), CausalOrdering::Less);
        assert_eq!(s1.compare(&s0), CausalOrdering::Greater);

        let (mut a, mut b) = s0.fork();
        a.event().expect("inflate");
        b.event().expect("inflate");
        assert_eq!(a.compare(&b), CausalOrdering::Concurrent);
        assert!(a.concurrent(&b));
    }

    #[test]
    fn compare_ignores_identity() {
        let mut s = Stamp::seed();
        s.event().expect("inflate");
        let p = s.peek();
        // same history, wildly different identities
        assert_eq!(p.compare(&s), CausalOrdering::Equal);
    }

    #[test]
    fn sibling_fork_event_sequence() {
        let (mut a, mut b) = Stamp::seed().fork();
        a.event().expect("inflate");
        b.event().expect("inflate");
        assert_eq!(a.event, ev_branch_raw(0, Event::Leaf(1), Event::Leaf(0)));
        assert_eq!(b.event, ev_branch_raw(0, Event::Leaf(0), Event::Leaf(1)));

        let j = Stamp::join(&a, &b).expect("disjoint");
        assert_eq!(j.id, Id::one());
        assert_eq!(j.event, Event::Leaf(1));
        assert_eq!(j.compare(&a), CausalOrdering::Greater);
        assert_eq!(j.compare(&b), CausalOrdering::Greater);
    }

    // === properties =========================================================

    proptest! {
        #[test]
        fn prop_fork_join_is_identity(n_events in 0u32..8) {
            let mut s = Stamp::seed();
            for _ in 0..n_events {
                s.event().expect("inflate");
            }
            let (a, b) = s.fork();
            let joined = Stamp::join(&a, &b).expect("fork halves are disjoint");
            prop_assert_eq!(&joined.id, &s.id);
            prop_assert_eq!(joined.compare(&s), CausalOrdering::Equal);
        }

        #[test]
        fn prop_event_is_strictly_monotone(n_events in 1u32..16) {
            let mut s = Stamp::seed();
            for _ in 0..n_events {
                let before = s.clone();
                s.event().expect("inflate");
                prop_assert_eq!(s.compare(&before), CausalOrdering::Greater);
            }
        }

        #[test]
        fn prop_join_dominates_both_inputs(n_a in 0u32..6, n_b in 0u32..6) {
            let (mut a, mut b) = Stamp::seed().fork();
            for _ in 0..n_a {
                a.event().expect("inflate");
            }
            for _ in 0..n_b {
                b.event().expect("inflate");
            }
            let joined = Stamp::join(&a, &b).expect("disjoint");
            prop_assert!(a.leq(&joined));
            prop_assert!(b.leq(&joined));
        }

        #[test]
        fn prop_split_sum_roundtrip(depth in 0u32..5) {
            // derive a nontrivial id by repeated forking
            let mut id = Id::one();
            for _ in 0..depth {
                id = id.split().0;
            }
            let (a, b) = id.split();
            prop_assert_eq!(a.sum(&b).expect("disjoint"), id);
        }

        #[test]
        fn prop_fill_never_loses_history(n_events in 0u32..6) {
            let (mut a, mut b) = Stamp::seed().fork();
            for _ in 0..n_events {
                a.event().expect("inflate");
                b.event().expect("inflate");
            }
            let merged = Stamp::join(&a.peek(), &b).expect("peek is anonymous");
            let (filled, _) = fill(&merged.id, &merged.event);
            prop_assert!(merged.event.leq(&filled));
        }
    }
}
