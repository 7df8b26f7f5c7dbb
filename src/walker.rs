use std::collections::btree_map;
use std::iter::Peekable;

use crate::sample::Sample;

/// A forward-only, non-restartable cursor over a forest's committed
/// sample set, in id order.
///
/// Produced by [`crate::Forest::samples`]. The walker borrows the forest,
/// so it cannot outlive it and no mutation can happen while it is alive.
/// Besides the pull-style [`still_some`](SampleWalker::still_some) /
/// [`get`](SampleWalker::get) pair it implements [`Iterator`], so `for`
/// loops and iterator adapters work directly.
#[derive(Debug)]
pub struct SampleWalker<'a> {
    inner: Peekable<btree_map::Values<'a, String, Sample>>,
}

impl<'a> SampleWalker<'a> {
    pub(crate) fn new(values: btree_map::Values<'a, String, Sample>) -> Self {
        Self {
            inner: values.peekable(),
        }
    }

    /// Return `true` if another sample is available.
    pub fn still_some(&mut self) -> bool {
        self.inner.peek().is_some()
    }

    /// Return the next sample and advance the cursor, `None` once the set
    /// is exhausted.
    pub fn get(&mut self) -> Option<&'a Sample> {
        self.inner.next()
    }
}

impl<'a> Iterator for SampleWalker<'a> {
    type Item = &'a Sample;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
