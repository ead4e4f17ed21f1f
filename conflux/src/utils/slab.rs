/// Token-indexed storage with slot reuse.
///
/// The reactor hands out a slab index as the token it passes to the OS
/// poller, and looks the registration back up when the poller reports an
/// event for that token. A token is only valid between `insert` and the
/// matching removal; after that it may be handed out again.
///
/// Removal is fallible because a readiness event can race with the
/// registration being torn down.
pub(crate) struct Slab<T> {
    /// Occupied and vacant slots.
    slots: Vec<Option<T>>,

    /// Stack of vacant indices, most recently freed on top.
    free: Vec<usize>,

    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates a slab with room for `capacity` entries before growing.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Stores `item` and returns its token.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        self.len += 1;

        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(item);
                index
            }
            None => {
                self.slots.push(Some(item));
                self.slots.len() - 1
            }
        }
    }

    /// Removes the entry for `token`, if it is still occupied.
    pub(crate) fn try_remove(&mut self, token: usize) -> Option<T> {
        let item = self.slots.get_mut(token)?.take()?;

        self.free.push(token);
        self.len -= 1;

        Some(item)
    }

    pub(crate) fn get(&self, token: usize) -> Option<&T> {
        self.slots.get(token)?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, token: usize) -> Option<&mut T> {
        self.slots.get_mut(token)?.as_mut()
    }

    /// Number of occupied entries.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Removes every entry, returning them in token order.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let items = self.slots.drain(..).flatten().collect();

        self.free.clear();
        self.len = 0;

        items
    }
}

#[cfg(test)]
mod tests {
    use super::Slab;

    #[test]
    fn test_tokens_are_reused_after_removal() {
        let mut slab = Slab::with_capacity(2);

        let a = slab.insert("a");
        let b = slab.insert("b");
        assert_ne!(a, b);
        assert_eq!(slab.len(), 2);

        assert_eq!(slab.try_remove(a), Some("a"));
        assert_eq!(slab.try_remove(a), None);

        let c = slab.insert("c");
        assert_eq!(c, a);
        assert_eq!(slab.get(c), Some(&"c"));

        if let Some(item) = slab.get_mut(b) {
            *item = "bb";
        }
        assert_eq!(slab.try_remove(b), Some("bb"));
        let b = slab.insert("b");
        assert_eq!(slab.try_remove(b), Some("b"));
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn test_stale_or_unknown_token_is_ignored() {
        let mut slab: Slab<u32> = Slab::with_capacity(0);

        assert_eq!(slab.try_remove(17), None);

        let token = slab.insert(5);
        assert_eq!(slab.drain(), vec![5]);
        assert_eq!(slab.len(), 0);
        assert_eq!(slab.try_remove(token), None);
    }
}
