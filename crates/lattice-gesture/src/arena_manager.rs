//! Arbitration protocol over all live gesture arenas.
//!
//! The manager drives each pointer's arena through its lifecycle:
//!
//! 1. **add**: recognizers join on pointer-down; the arena is created lazily.
//! 2. **close**: after pointer-down has been dispatched no one else may join.
//!    If only one member is left it wins immediately.
//! 3. **resolve**: a member accepts (eagerly, if the arena is still open) or
//!    withdraws.
//! 4. **sweep**: after pointer-up the first remaining member wins, unless a
//!    member has put the arena on **hold**, in which case the sweep waits for
//!    **release**.
//!
//! An arena is removed from the registry before any member is notified of the
//! outcome, so `accept_gesture`/`reject_gesture` implementations may call back
//! into the manager. Operations on a pointer with no arena are no-ops.

use std::cell::RefCell;
use std::collections::HashMap;

use lattice_gesture_core::ThreadAffinity;

use crate::arena::{ArenaMember, GestureArena, same_member};
use crate::error::{GestureError, Result};
use crate::logging::targets;
use crate::pointer::PointerId;

/// Registry of per-pointer arenas, owned by one gesture context.
pub struct GestureArenaManager {
    arenas: RefCell<HashMap<PointerId, GestureArena>>,
    affinity: ThreadAffinity,
}

static_assertions::assert_not_impl_any!(GestureArenaManager: Send, Sync);

impl Default for GestureArenaManager {
    fn default() -> Self {
        Self::new()
    }
}

/// How a closed arena should be settled.
enum Settlement {
    Discard,
    Default,
    InFavorOf(ArenaMember),
}

impl GestureArenaManager {
    /// Create an empty manager bound to the current thread.
    pub fn new() -> Self {
        Self {
            arenas: RefCell::new(HashMap::new()),
            affinity: ThreadAffinity::current(),
        }
    }

    /// Add `member` to the arena for `pointer`, creating the arena if needed.
    pub fn add(&self, pointer: PointerId, member: ArenaMember) -> Result<()> {
        self.affinity.debug_assert_owner();
        let mut arenas = self.arenas.borrow_mut();
        let arena = arenas.entry(pointer).or_insert_with(|| {
            tracing::trace!(target: targets::ARENA, %pointer, "arena created");
            GestureArena::new(pointer)
        });
        arena.add(member)
    }

    /// Close the arena to new members and try to resolve it.
    pub fn close(&self, pointer: PointerId) -> Result<()> {
        self.affinity.debug_assert_owner();
        {
            let mut arenas = self.arenas.borrow_mut();
            let Some(arena) = arenas.get_mut(&pointer) else {
                tracing::trace!(target: targets::ARENA, %pointer, "close: no arena");
                return Ok(());
            };
            arena.close();
        }
        tracing::trace!(target: targets::ARENA, %pointer, "arena closed");
        self.try_to_resolve_arena(pointer)
    }

    /// Force resolution: the first remaining member wins.
    ///
    /// A held arena records the request and sweeps on [`release`](Self::release).
    pub fn sweep(&self, pointer: PointerId) -> Result<()> {
        self.affinity.debug_assert_owner();
        let arena = {
            let mut arenas = self.arenas.borrow_mut();
            let Some(arena) = arenas.get_mut(&pointer) else {
                tracing::trace!(target: targets::ARENA, %pointer, "sweep: no arena");
                return Ok(());
            };
            if arena.is_open() {
                tracing::error!(target: targets::ARENA, %pointer, "sweep of an open gesture arena");
                return Err(GestureError::ArenaOpen { pointer });
            }
            if arena.is_held() {
                tracing::trace!(target: targets::ARENA, %pointer, "sweep deferred by hold");
                arena.set_pending_sweep();
                return Ok(());
            }
            arenas.remove(&pointer)
        };

        if let Some(arena) = arena
            && let Some(winner) = arena.first_member().cloned()
        {
            tracing::debug!(target: targets::ARENA, %pointer, members = arena.len(), "arena swept");
            notify(arena, &winner);
        }
        Ok(())
    }

    /// Defer sweeping of the arena until [`release`](Self::release).
    ///
    /// Returns `false` if there is no arena for `pointer`.
    pub fn hold(&self, pointer: PointerId) -> bool {
        self.affinity.debug_assert_owner();
        match self.arenas.borrow_mut().get_mut(&pointer) {
            Some(arena) => {
                arena.set_held(true);
                tracing::trace!(target: targets::ARENA, %pointer, "arena held");
                true
            }
            None => false,
        }
    }

    /// Lift a hold, running a sweep that was requested in the meantime.
    pub fn release(&self, pointer: PointerId) -> Result<()> {
        self.affinity.debug_assert_owner();
        let pending = {
            let mut arenas = self.arenas.borrow_mut();
            let Some(arena) = arenas.get_mut(&pointer) else {
                tracing::trace!(target: targets::ARENA, %pointer, "release: no arena");
                return Ok(());
            };
            arena.set_held(false);
            arena.has_pending_sweep()
        };
        tracing::trace!(target: targets::ARENA, %pointer, pending, "arena released");
        if pending { self.sweep(pointer) } else { Ok(()) }
    }

    /// A member declares it wants (`accepted`) or gives up the pointer.
    ///
    /// Accepting while the arena is open records an eager claim that wins at
    /// close. Accepting a closed arena wins it at once. Withdrawing removes the
    /// member, rejects it, and re-checks a closed arena.
    pub fn resolve(&self, pointer: PointerId, member: &ArenaMember, accepted: bool) -> Result<()> {
        self.affinity.debug_assert_owner();
        if accepted {
            let is_open = {
                let mut arenas = self.arenas.borrow_mut();
                let Some(arena) = arenas.get_mut(&pointer) else {
                    tracing::trace!(target: targets::ARENA, %pointer, "accept: no arena");
                    return Ok(());
                };
                if !arena.contains(member) {
                    tracing::trace!(target: targets::ARENA, %pointer, "accept from a non-member ignored");
                    return Ok(());
                }
                if arena.is_open() {
                    arena.claim_eagerly(member);
                }
                arena.is_open()
            };
            if is_open {
                tracing::trace!(target: targets::ARENA, %pointer, "eager claim recorded");
                Ok(())
            } else {
                self.resolve_in_favor_of(pointer, member)
            }
        } else {
            let (removed, is_open) = {
                let mut arenas = self.arenas.borrow_mut();
                let Some(arena) = arenas.get_mut(&pointer) else {
                    tracing::trace!(target: targets::ARENA, %pointer, "reject: no arena");
                    return Ok(());
                };
                (arena.remove(member), arena.is_open())
            };
            if removed {
                tracing::trace!(target: targets::ARENA, %pointer, "member withdrew");
                member.reject_gesture(pointer);
            }
            if is_open {
                Ok(())
            } else {
                self.try_to_resolve_arena(pointer)
            }
        }
    }

    /// Whether an arena exists for `pointer`.
    pub fn contains(&self, pointer: PointerId) -> bool {
        self.arenas.borrow().contains_key(&pointer)
    }

    /// Whether the arena for `pointer` exists and is held.
    pub fn is_held(&self, pointer: PointerId) -> bool {
        self.arenas
            .borrow()
            .get(&pointer)
            .is_some_and(GestureArena::is_held)
    }

    /// Whether the arena for `pointer` exists and still accepts members.
    pub fn is_open(&self, pointer: PointerId) -> bool {
        self.arenas
            .borrow()
            .get(&pointer)
            .is_some_and(GestureArena::is_open)
    }

    /// Number of members contending for `pointer`.
    pub fn member_count(&self, pointer: PointerId) -> usize {
        self.arenas.borrow().get(&pointer).map_or(0, GestureArena::len)
    }

    /// Number of live arenas.
    pub fn len(&self) -> usize {
        self.arenas.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.arenas.borrow().is_empty()
    }

    fn try_to_resolve_arena(&self, pointer: PointerId) -> Result<()> {
        let settlement = {
            let mut arenas = self.arenas.borrow_mut();
            let Some(arena) = arenas.get(&pointer) else {
                return Ok(());
            };
            if arena.is_open() {
                tracing::error!(target: targets::ARENA, %pointer, "resolving an open gesture arena");
                return Err(GestureError::ArenaOpen { pointer });
            }
            let settlement = match arena.len() {
                0 => Settlement::Discard,
                1 => Settlement::Default,
                _ => match arena.eager_winner() {
                    Some(winner) => Settlement::InFavorOf(winner.clone()),
                    None => return Ok(()),
                },
            };
            if matches!(settlement, Settlement::Discard) {
                arenas.remove(&pointer);
                tracing::trace!(target: targets::ARENA, %pointer, "empty arena discarded");
            }
            settlement
        };

        match settlement {
            Settlement::Discard => Ok(()),
            Settlement::Default => self.resolve_by_default(pointer),
            Settlement::InFavorOf(winner) => self.resolve_in_favor_of(pointer, &winner),
        }
    }

    fn resolve_by_default(&self, pointer: PointerId) -> Result<()> {
        let winner = {
            let arenas = self.arenas.borrow();
            let Some(arena) = arenas.get(&pointer) else {
                return Ok(());
            };
            if arena.len() != 1 {
                tracing::error!(
                    target: targets::ARENA,
                    %pointer,
                    members = arena.len(),
                    "default resolution needs exactly one member"
                );
                return Ok(());
            }
            arena.first_member().cloned()
        };
        match winner {
            Some(winner) => self.resolve_in_favor_of(pointer, &winner),
            None => Ok(()),
        }
    }

    /// The only path that tells a member it won.
    fn resolve_in_favor_of(&self, pointer: PointerId, winner: &ArenaMember) -> Result<()> {
        let arena = {
            let mut arenas = self.arenas.borrow_mut();
            let Some(is_open) = arenas.get(&pointer).map(GestureArena::is_open) else {
                return Ok(());
            };
            if is_open {
                tracing::error!(target: targets::ARENA, %pointer, "resolving an open gesture arena");
                return Err(GestureError::ArenaOpen { pointer });
            }
            arenas.remove(&pointer)
        };
        if let Some(arena) = arena {
            tracing::debug!(target: targets::ARENA, %pointer, members = arena.len(), "arena resolved");
            notify(arena, winner);
        }
        Ok(())
    }
}

/// Reject every member except `winner`, then accept `winner`.
fn notify(arena: GestureArena, winner: &ArenaMember) {
    let pointer = arena.pointer();
    for member in arena.members() {
        if !same_member(member, winner) {
            member.reject_gesture(pointer);
        }
    }
    winner.accept_gesture(pointer);
}

impl std::fmt::Debug for GestureArenaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureArenaManager")
            .field("arenas", &self.arenas.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::GestureArenaMember;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        log: RefCell<Vec<(&'static str, PointerId)>>,
    }

    impl GestureArenaMember for Recorder {
        fn accept_gesture(&self, pointer: PointerId) {
            self.log.borrow_mut().push(("accept", pointer));
        }
        fn reject_gesture(&self, pointer: PointerId) {
            self.log.borrow_mut().push(("reject", pointer));
        }
    }

    fn recorder() -> (Rc<Recorder>, ArenaMember) {
        let r = Rc::new(Recorder::default());
        let m: ArenaMember = r.clone();
        (r, m)
    }

    const P: PointerId = PointerId(1);

    #[test]
    fn test_single_member_wins_at_close() {
        let manager = GestureArenaManager::new();
        let (a, am) = recorder();
        manager.add(P, am).unwrap();
        manager.close(P).unwrap();

        assert_eq!(*a.log.borrow(), vec![("accept", P)]);
        assert!(!manager.contains(P));
    }

    #[test]
    fn test_missing_arena_is_noop() {
        let manager = GestureArenaManager::new();
        let (a, am) = recorder();
        manager.close(P).unwrap();
        manager.sweep(P).unwrap();
        manager.release(P).unwrap();
        manager.resolve(P, &am, true).unwrap();
        manager.resolve(P, &am, false).unwrap();
        assert!(!manager.hold(P));
        assert!(a.log.borrow().is_empty());
    }

    #[test]
    fn test_sweep_open_arena_is_error() {
        let manager = GestureArenaManager::new();
        let (_a, am) = recorder();
        manager.add(P, am).unwrap();
        let err = manager.sweep(P).unwrap_err();
        assert!(matches!(err, GestureError::ArenaOpen { .. }));
        assert!(err.is_protocol_violation());
        assert!(manager.contains(P));
        assert!(manager.is_open(P));
    }

    #[test]
    fn test_withdraw_leaves_last_member_winner() {
        let manager = GestureArenaManager::new();
        let (a, am) = recorder();
        let (b, bm) = recorder();
        manager.add(P, am.clone()).unwrap();
        manager.add(P, bm).unwrap();
        manager.close(P).unwrap();
        assert_eq!(manager.member_count(P), 2);

        manager.resolve(P, &am, false).unwrap();
        assert_eq!(*a.log.borrow(), vec![("reject", P)]);
        assert_eq!(*b.log.borrow(), vec![("accept", P)]);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_accept_from_non_member_ignored() {
        let manager = GestureArenaManager::new();
        let (a, am) = recorder();
        let (b, bm) = recorder();
        let (_c, cm) = recorder();
        manager.add(P, am).unwrap();
        manager.add(P, bm).unwrap();
        manager.close(P).unwrap();

        manager.resolve(P, &cm, true).unwrap();
        assert!(manager.contains(P));
        assert!(a.log.borrow().is_empty());
        assert!(b.log.borrow().is_empty());
    }

    /// Resolving another pointer from inside a callback must not deadlock the
    /// registry borrow.
    #[test]
    fn test_reentrant_callback() {
        struct Chain {
            manager: Rc<GestureArenaManager>,
            next: RefCell<Option<ArenaMember>>,
            accepted: RefCell<Vec<PointerId>>,
        }
        impl GestureArenaMember for Chain {
            fn accept_gesture(&self, pointer: PointerId) {
                self.accepted.borrow_mut().push(pointer);
                let next = self.next.borrow_mut().take();
                if let Some(next) = next {
                    self.manager.resolve(PointerId(2), &next, true).unwrap();
                }
            }
            fn reject_gesture(&self, _pointer: PointerId) {}
        }

        let manager = Rc::new(GestureArenaManager::new());
        let chain = Rc::new(Chain {
            manager: manager.clone(),
            next: RefCell::new(None),
            accepted: RefCell::new(Vec::new()),
        });
        let member: ArenaMember = chain.clone();
        *chain.next.borrow_mut() = Some(member.clone());

        let (_other, other) = recorder();
        manager.add(PointerId(2), member.clone()).unwrap();
        manager.add(PointerId(2), other).unwrap();
        manager.close(PointerId(2)).unwrap();

        manager.add(P, member).unwrap();
        manager.close(P).unwrap();

        assert_eq!(*chain.accepted.borrow(), vec![P, PointerId(2)]);
        assert!(manager.is_empty());
    }
}
