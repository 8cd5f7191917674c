//! Interest graph computed once from the declarations.
//!
//! For every kind index it lists the same-thread receivers (by position in
//! the engine's same-thread list) and the own-thread receivers (by inbox
//! position) that receive it, in declaration order.

use smallvec::SmallVec;

use crate::event::KindSet;
use crate::queue::InboxMode;
use crate::receiver::{Declaration, Role};

/// Receiver positions interested in one kind.
pub(crate) type Targets = SmallVec<[usize; 4]>;

#[derive(Debug, Clone)]
pub(crate) struct Topology {
    same_thread: Vec<Targets>,
    own_thread: Vec<Targets>,
    /// Producer count per own-thread receiver, by inbox position.
    producers: Vec<usize>,
    needs_remote: bool,
}

impl Topology {
    pub(crate) fn build(kind_count: usize, declarations: &[Declaration]) -> Self {
        let mut same_thread = vec![Targets::new(); kind_count];
        let mut own_thread = vec![Targets::new(); kind_count];
        let mut producers = Vec::new();

        let mut same_position = 0;
        for declaration in declarations {
            let receives = declaration.receives.iter().filter(|&kind| kind < kind_count);
            match declaration.role {
                Role::SameThread => {
                    for kind in receives {
                        same_thread[kind].push(same_position);
                    }
                    same_position += 1;
                }
                Role::OwnThread => {
                    for kind in receives {
                        own_thread[kind].push(producers.len());
                    }
                    producers.push(producer_count(declaration, declarations));
                }
                Role::External => {}
            }
        }

        let same_thread_receives = declarations
            .iter()
            .filter(|d| d.role == Role::SameThread)
            .fold(KindSet::EMPTY, |acc, d| acc.union(d.receives));
        let needs_remote = declarations
            .iter()
            .any(|d| d.is_off_thread_producer() && d.emits.intersects(same_thread_receives));

        Self {
            same_thread,
            own_thread,
            producers,
            needs_remote,
        }
    }

    /// Same-thread positions receiving `kind`, in declaration order.
    #[inline]
    pub(crate) fn same_thread_for(&self, kind: usize) -> &[usize] {
        self.same_thread.get(kind).map_or(&[][..], |targets| targets.as_slice())
    }

    /// Own-thread inbox positions receiving `kind`, in declaration order.
    #[inline]
    pub(crate) fn own_thread_for(&self, kind: usize) -> &[usize] {
        self.own_thread.get(kind).map_or(&[][..], |targets| targets.as_slice())
    }

    #[inline]
    pub(crate) fn has_same_thread(&self, kind: usize) -> bool {
        !self.same_thread_for(kind).is_empty()
    }

    #[inline]
    pub(crate) fn has_own_thread(&self, kind: usize) -> bool {
        !self.own_thread_for(kind).is_empty()
    }

    pub(crate) fn producers(&self, inbox: usize) -> usize {
        self.producers[inbox]
    }

    pub(crate) fn inbox_mode(&self, inbox: usize) -> InboxMode {
        InboxMode::for_producers(self.producers(inbox))
    }

    /// True if workers or external handles can emit to same-thread receivers.
    pub(crate) fn needs_remote(&self) -> bool {
        self.needs_remote
    }
}

/// Contexts that may push into `target`'s inbox.
///
/// The engine thread always counts once, since [`Engine::emit`] accepts any
/// kind. Every own-thread or external declaration emitting a kind `target`
/// receives adds one more.
///
/// [`Engine::emit`]: crate::Engine::emit
pub(crate) fn producer_count(target: &Declaration, declarations: &[Declaration]) -> usize {
    1 + declarations
        .iter()
        .filter(|d| d.is_off_thread_producer() && d.emits.intersects(target.receives))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::TypeId;

    struct A;
    struct B;
    struct C;
    struct D;

    fn decl<T: 'static>(role: Role, receives: &[usize], emits: &[usize]) -> Declaration {
        Declaration {
            name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            receives: KindSet::from_indices(receives),
            emits: KindSet::from_indices(emits),
            role,
        }
    }

    #[test]
    fn test_targets_follow_declaration_order() {
        let decls = [
            decl::<A>(Role::SameThread, &[0, 1], &[]),
            decl::<B>(Role::OwnThread, &[1], &[]),
            decl::<C>(Role::SameThread, &[1, 2], &[]),
            decl::<D>(Role::External, &[], &[1]),
        ];
        let topology = Topology::build(3, &decls);

        assert_eq!(topology.same_thread_for(0), &[0]);
        assert_eq!(topology.same_thread_for(1), &[0, 1]);
        assert_eq!(topology.same_thread_for(2), &[1]);
        assert_eq!(topology.own_thread_for(1), &[0]);
        assert!(!topology.has_own_thread(0));
        assert!(topology.needs_remote());
    }

    #[test]
    fn test_kinds_outside_the_set_are_ignored() {
        let decls = [decl::<A>(Role::SameThread, &[0, 5], &[])];
        let topology = Topology::build(2, &decls);
        assert!(topology.has_same_thread(0));
        assert!(!topology.has_same_thread(5));
        assert!(topology.same_thread_for(99).is_empty());
    }

    #[test]
    fn test_single_same_thread_emitter_selects_spsc() {
        let decls = [
            decl::<A>(Role::SameThread, &[], &[0]),
            decl::<B>(Role::OwnThread, &[0], &[]),
        ];
        let topology = Topology::build(1, &decls);
        assert_eq!(topology.producers(0), 1);
        assert_eq!(topology.inbox_mode(0), InboxMode::Spsc);
        assert!(!topology.needs_remote());
    }

    #[test]
    fn test_two_own_thread_emitters_select_mpsc() {
        let decls = [
            decl::<A>(Role::OwnThread, &[1], &[0]),
            decl::<B>(Role::OwnThread, &[1], &[0]),
            decl::<C>(Role::OwnThread, &[0], &[]),
        ];
        let topology = Topology::build(2, &decls);
        assert_eq!(topology.producers(2), 3);
        assert_eq!(topology.inbox_mode(2), InboxMode::Mpsc);
        assert_eq!(topology.inbox_mode(0), InboxMode::Spsc);
    }

    #[test]
    fn test_lone_worker_emitter_still_counts_engine_thread() {
        let decls = [
            decl::<A>(Role::OwnThread, &[1], &[0]),
            decl::<B>(Role::OwnThread, &[0], &[]),
        ];
        let topology = Topology::build(2, &decls);
        assert_eq!(topology.producers(1), 2);
        assert_eq!(topology.inbox_mode(1), InboxMode::Mpsc);
    }

    #[test]
    fn test_same_thread_plus_external_emitter_selects_mpsc() {
        let decls = [
            decl::<A>(Role::SameThread, &[], &[0]),
            decl::<B>(Role::External, &[], &[0]),
            decl::<C>(Role::OwnThread, &[0], &[]),
        ];
        let topology = Topology::build(1, &decls);
        assert_eq!(topology.producers(0), 2);
        assert_eq!(topology.inbox_mode(0), InboxMode::Mpsc);
    }

    #[test]
    fn test_own_thread_emitting_to_same_thread_needs_remote() {
        let decls = [
            decl::<A>(Role::OwnThread, &[0], &[1]),
            decl::<B>(Role::SameThread, &[1], &[0]),
        ];
        let topology = Topology::build(2, &decls);
        assert!(topology.needs_remote());
        assert_eq!(topology.producers(0), 1);
    }
}
