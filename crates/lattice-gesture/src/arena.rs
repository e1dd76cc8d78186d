//! The per-pointer gesture arena.
//!
//! Every recognizer interested in a pointer joins that pointer's arena on
//! pointer-down. The [`GestureArenaManager`](crate::GestureArenaManager)
//! decides which one member wins; all others are rejected.

use std::fmt;
use std::rc::Rc;

use crate::error::{GestureError, Result};
use crate::logging::targets;
use crate::pointer::PointerId;

/// A participant in gesture arbitration.
///
/// Both methods are called at most once per pointer per member, and never
/// while the manager holds internal borrows, so implementations may call back
/// into the manager.
pub trait GestureArenaMember {
    /// This member won the arena for `pointer`.
    fn accept_gesture(&self, pointer: PointerId);

    /// This member lost the arena for `pointer`, or withdrew from it.
    fn reject_gesture(&self, pointer: PointerId);
}

/// Shared handle to an arena member.
pub type ArenaMember = Rc<dyn GestureArenaMember>;

/// Compare members by identity.
pub(crate) fn same_member(a: &ArenaMember, b: &ArenaMember) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Contention state for a single pointer.
pub struct GestureArena {
    pointer: PointerId,
    members: Vec<ArenaMember>,
    is_open: bool,
    is_held: bool,
    has_pending_sweep: bool,
    eager_winner: Option<ArenaMember>,
}

impl GestureArena {
    /// Create an open, empty arena for `pointer`.
    pub fn new(pointer: PointerId) -> Self {
        Self {
            pointer,
            members: Vec::new(),
            is_open: true,
            is_held: false,
            has_pending_sweep: false,
            eager_winner: None,
        }
    }

    /// Add a member. A closed arena never gains members.
    pub fn add(&mut self, member: ArenaMember) -> Result<()> {
        if !self.is_open {
            tracing::error!(
                target: targets::ARENA,
                pointer = %self.pointer,
                "member added to a closed gesture arena"
            );
            return Err(GestureError::ArenaClosed {
                pointer: self.pointer,
            });
        }
        if self.contains(&member) {
            tracing::trace!(target: targets::ARENA, pointer = %self.pointer, "member already in arena");
            return Ok(());
        }
        self.members.push(member);
        Ok(())
    }

    /// Remove a member by identity. Returns whether it was present.
    ///
    /// A removed member also loses any eager claim it made.
    pub fn remove(&mut self, member: &ArenaMember) -> bool {
        if self
            .eager_winner
            .as_ref()
            .is_some_and(|winner| same_member(winner, member))
        {
            self.eager_winner = None;
        }
        match self.members.iter().position(|m| same_member(m, member)) {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, member: &ArenaMember) -> bool {
        self.members.iter().any(|m| same_member(m, member))
    }

    pub fn pointer(&self) -> PointerId {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether new members may still join.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Whether sweeping is deferred until release.
    pub fn is_held(&self) -> bool {
        self.is_held
    }

    pub(crate) fn members(&self) -> &[ArenaMember] {
        &self.members
    }

    pub(crate) fn first_member(&self) -> Option<&ArenaMember> {
        self.members.first()
    }

    pub(crate) fn close(&mut self) {
        self.is_open = false;
    }

    pub(crate) fn set_held(&mut self, held: bool) {
        self.is_held = held;
    }

    pub(crate) fn has_pending_sweep(&self) -> bool {
        self.has_pending_sweep
    }

    pub(crate) fn set_pending_sweep(&mut self) {
        self.has_pending_sweep = true;
    }

    pub(crate) fn eager_winner(&self) -> Option<&ArenaMember> {
        self.eager_winner.as_ref()
    }

    /// Record an eager claim. Only the first claim counts.
    pub(crate) fn claim_eagerly(&mut self, member: &ArenaMember) {
        if self.eager_winner.is_none() {
            self.eager_winner = Some(member.clone());
        }
    }
}

impl fmt::Debug for GestureArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureArena")
            .field("pointer", &self.pointer)
            .field("members", &self.members.len())
            .field("is_open", &self.is_open)
            .field("is_held", &self.is_held)
            .field("has_pending_sweep", &self.has_pending_sweep)
            .field("has_eager_winner", &self.eager_winner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl GestureArenaMember for Nop {
        fn accept_gesture(&self, _pointer: PointerId) {}
        fn reject_gesture(&self, _pointer: PointerId) {}
    }

    fn member() -> ArenaMember {
        Rc::new(Nop)
    }

    #[test]
    fn test_add_and_remove_by_identity() {
        let mut arena = GestureArena::new(PointerId(1));
        let a = member();
        let b = member();
        arena.add(a.clone()).unwrap();
        arena.add(b.clone()).unwrap();
        arena.add(a.clone()).unwrap();
        assert_eq!(arena.len(), 2);

        assert!(arena.remove(&a));
        assert!(!arena.remove(&a));
        assert!(arena.contains(&b));
        assert!(!arena.contains(&a));
    }

    #[test]
    fn test_closed_arena_rejects_members() {
        let mut arena = GestureArena::new(PointerId(3));
        arena.add(member()).unwrap();
        arena.close();

        let err = arena.add(member()).unwrap_err();
        assert!(matches!(err, GestureError::ArenaClosed { pointer } if pointer == PointerId(3)));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_first_eager_claim_wins_and_is_dropped_on_remove() {
        let mut arena = GestureArena::new(PointerId(1));
        let a = member();
        let b = member();
        arena.add(a.clone()).unwrap();
        arena.add(b.clone()).unwrap();

        arena.claim_eagerly(&b);
        arena.claim_eagerly(&a);
        assert!(same_member(arena.eager_winner().unwrap(), &b));

        arena.remove(&b);
        assert!(arena.eager_winner().is_none());
    }
}
