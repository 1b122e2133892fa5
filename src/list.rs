//! Slot arena and index-linked doubly linked lists.
//!
//! Entries live in an [`Arena`] and are addressed by stable integer slot ids.
//! A [`List`] threads a doubly linked list through the arena by storing
//! `prev`/`next` slot ids inside each entry instead of raw pointers, so the
//! same entry can sit in several lists at once (one [`Link`] per list kind).
//!
//! The list kind is selected with a zero-sized tag type. An entry type that
//! takes part in a list of kind `Tag` implements [`Linked<Tag>`] to expose the
//! matching link field.
//!
//! ```text
//!   arena:  [0: a] [1: -] [2: c] [3: b]
//!
//!   head ──▶ 2 ⇄ 3 ⇄ 0 ◀── tail
//! ```
//!
//! **Note**: This module is internal infrastructure. Callers must only pass
//! slot ids that are currently occupied and, for `unlink`/`move_to_front`,
//! currently attached to the list they call.

use core::fmt;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};

/// Stable index of an occupied slot in an [`Arena`].
pub(crate) type SlotId = usize;

/// Fixed-position storage with slot reuse.
///
/// Removing an entry frees its slot for a later insert; ids of other entries
/// never change.
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<SlotId>,
    len: usize,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    pub(crate) fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Stores `value` and returns the id of the slot that now holds it.
    pub(crate) fn insert(&mut self, value: T) -> SlotId {
        self.len += 1;
        match self.free.pop() {
            Some(id) => {
                debug_assert!(self.slots[id].is_none(), "free list points at a live slot");
                self.slots[id] = Some(value);
                id
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        }
    }

    /// Takes the value out of slot `id`, freeing the slot.
    pub(crate) fn remove(&mut self, id: SlotId) -> Option<T> {
        let value = self.slots.get_mut(id)?.take()?;
        self.free.push(id);
        self.len -= 1;
        Some(value)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every value. Previously issued ids become invalid.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }
}

impl<T> Index<SlotId> for Arena<T> {
    type Output = T;

    fn index(&self, id: SlotId) -> &T {
        match self.slots.get(id) {
            Some(Some(value)) => value,
            _ => panic!("arena slot {id} is vacant"),
        }
    }
}

impl<T> IndexMut<SlotId> for Arena<T> {
    fn index_mut(&mut self, id: SlotId) -> &mut T {
        match self.slots.get_mut(id) {
            Some(Some(value)) => value,
            _ => panic!("arena slot {id} is vacant"),
        }
    }
}

impl<T> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("len", &self.len)
            .field("slots", &self.slots.len())
            .field("free", &self.free.len())
            .finish()
    }
}

/// Neighbour pointers of one entry within one list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Link {
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Gives a [`List`] of kind `Tag` access to the link it owns inside an entry.
pub(crate) trait Linked<Tag> {
    fn link(&self) -> &Link;
    fn link_mut(&mut self) -> &mut Link;
}

/// A doubly linked list of arena slots.
///
/// The front is the most recently attached slot and the back the oldest one.
/// All operations are O(1) except [`List::iter`].
pub(crate) struct List<Tag> {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
    _tag: PhantomData<Tag>,
}

impl<Tag> List<Tag> {
    pub(crate) fn new() -> Self {
        List {
            head: None,
            tail: None,
            len: 0,
            _tag: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub(crate) fn back(&self) -> Option<SlotId> {
        self.tail
    }

    /// Attaches the detached slot `id` at the front.
    pub(crate) fn push_front<T: Linked<Tag>>(&mut self, arena: &mut Arena<T>, id: SlotId) {
        *arena[id].link_mut() = Link {
            prev: None,
            next: self.head,
        };
        match self.head {
            Some(old_head) => arena[old_head].link_mut().prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
    }

    /// Detaches slot `id` from this list. The slot itself stays in the arena.
    pub(crate) fn unlink<T: Linked<Tag>>(&mut self, arena: &mut Arena<T>, id: SlotId) {
        let Link { prev, next } = core::mem::take(arena[id].link_mut());
        match prev {
            Some(p) => arena[p].link_mut().next = next,
            None => {
                debug_assert_eq!(self.head, Some(id), "unlinking a slot from the wrong list");
                self.head = next;
            }
        }
        match next {
            Some(n) => arena[n].link_mut().prev = prev,
            None => {
                debug_assert_eq!(self.tail, Some(id), "unlinking a slot from the wrong list");
                self.tail = prev;
            }
        }
        self.len -= 1;
    }

    pub(crate) fn move_to_front<T: Linked<Tag>>(&mut self, arena: &mut Arena<T>, id: SlotId) {
        if self.head == Some(id) {
            return;
        }
        self.unlink(arena, id);
        self.push_front(arena, id);
    }

    /// Iterates slot ids from front to back.
    pub(crate) fn iter<'a, T: Linked<Tag>>(&self, arena: &'a Arena<T>) -> Iter<'a, T, Tag> {
        Iter {
            arena,
            next: self.head,
            remaining: self.len,
            _tag: PhantomData,
        }
    }
}

impl<Tag> fmt::Debug for List<Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("len", &self.len)
            .finish()
    }
}

/// Front-to-back iterator over the slot ids of a [`List`].
pub(crate) struct Iter<'a, T, Tag> {
    arena: &'a Arena<T>,
    next: Option<SlotId>,
    remaining: usize,
    _tag: PhantomData<Tag>,
}

impl<T: Linked<Tag>, Tag> Iterator for Iter<'_, T, Tag> {
    type Item = SlotId;

    fn next(&mut self) -> Option<SlotId> {
        let id = self.next?;
        self.next = self.arena[id].link().next;
        self.remaining -= 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Order;

    #[derive(Debug)]
    struct Node {
        value: u32,
        link: Link,
    }

    impl Linked<Order> for Node {
        fn link(&self) -> &Link {
            &self.link
        }

        fn link_mut(&mut self) -> &mut Link {
            &mut self.link
        }
    }

    fn node(value: u32) -> Node {
        Node {
            value,
            link: Link::default(),
        }
    }

    fn values(list: &List<Order>, arena: &Arena<Node>) -> Vec<u32> {
        list.iter(arena).map(|id| arena[id].value).collect()
    }

    #[test]
    fn test_arena_reuses_freed_slots() {
        let mut arena = Arena::new();
        let a = arena.insert(node(1));
        let b = arena.insert(node(2));
        assert_eq!(arena.len(), 2);

        assert_eq!(arena.remove(a).map(|n| n.value), Some(1));
        assert!(arena.remove(a).is_none());

        let c = arena.insert(node(3));
        assert_eq!(c, a);
        assert_eq!(arena[b].value, 2);
        assert_eq!(arena[c].value, 3);
        assert_eq!(arena.len(), 2);

        arena.clear();
        assert!(arena.is_empty());
    }

    #[test]
    #[should_panic(expected = "vacant")]
    fn test_arena_index_vacant_panics() {
        let mut arena = Arena::new();
        let a = arena.insert(node(1));
        arena.remove(a);
        let _ = &arena[a];
    }

    #[test]
    fn test_list_push_order() {
        let mut arena = Arena::new();
        let mut list = List::<Order>::new();
        for v in 1..=3 {
            let id = arena.insert(node(v));
            list.push_front(&mut arena, id);
        }
        assert_eq!(values(&list, &arena), vec![3, 2, 1]);
        assert_eq!(list.len(), 3);

        let back = list.back().unwrap();
        assert_eq!(arena[back].value, 1);
        list.unlink(&mut arena, back);
        assert_eq!(values(&list, &arena), vec![3, 2]);
    }

    #[test]
    fn test_list_unlink_middle_and_ends() {
        let mut arena = Arena::new();
        let mut list = List::<Order>::new();
        let ids: Vec<_> = (1..=4)
            .map(|v| {
                let id = arena.insert(node(v));
                list.push_front(&mut arena, id);
                id
            })
            .collect();

        list.unlink(&mut arena, ids[1]);
        assert_eq!(values(&list, &arena), vec![4, 3, 1]);
        list.unlink(&mut arena, ids[3]);
        assert_eq!(values(&list, &arena), vec![3, 1]);
        list.unlink(&mut arena, ids[0]);
        assert_eq!(values(&list, &arena), vec![3]);
        assert_eq!(list.back(), Some(ids[2]));
        list.unlink(&mut arena, ids[2]);
        assert!(list.is_empty());
        assert_eq!(list.back(), None);
    }

    #[test]
    fn test_list_move_to_front() {
        let mut arena = Arena::new();
        let mut list = List::<Order>::new();
        let ids: Vec<_> = (1..=3)
            .map(|v| {
                let id = arena.insert(node(v));
                list.push_front(&mut arena, id);
                id
            })
            .collect();

        list.move_to_front(&mut arena, ids[0]);
        assert_eq!(values(&list, &arena), vec![1, 3, 2]);
        list.move_to_front(&mut arena, ids[0]);
        assert_eq!(values(&list, &arena), vec![1, 3, 2]);
        assert_eq!(list.len(), 3);
    }
}
