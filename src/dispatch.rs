//! Kernel dispatch over independent work items.
//!
//! A kernel is a function of `(global_index, item)` that touches only its
//! own item (plus shared read-only data it captured). Work items are grouped
//! into chunks of [`Dispatch::group_size`], mirroring GPU work groups; the
//! dispatch call returns only when every item has run, which is the barrier
//! between passes.

use rayon::prelude::*;

use crate::population::WORKGROUP_SIZE;

/// Runs a kernel over every item of a slice.
pub trait Dispatch: Send + Sync {
    /// Items per work group.
    fn group_size(&self) -> usize;

    /// Run `kernel(index, item)` for every item.
    fn for_each<T, K>(&self, items: &mut [T], kernel: K)
    where
        T: Send,
        K: Fn(usize, &mut T) + Send + Sync;

    /// Run `kernel(index, item, output)` over two slices of equal length.
    fn for_each_with<T, U, K>(&self, items: &mut [T], outputs: &mut [U], kernel: K)
    where
        T: Send,
        U: Send,
        K: Fn(usize, &mut T, &mut U) + Send + Sync;
}

/// Single-threaded, in-order dispatch. Fully deterministic.
#[derive(Clone, Copy, Debug)]
pub struct Serial {
    group_size: usize,
}

impl Default for Serial {
    fn default() -> Self {
        Self {
            group_size: WORKGROUP_SIZE,
        }
    }
}

impl Dispatch for Serial {
    fn group_size(&self) -> usize {
        self.group_size
    }

    fn for_each<T, K>(&self, items: &mut [T], kernel: K)
    where
        T: Send,
        K: Fn(usize, &mut T) + Send + Sync,
    {
        for (i, item) in items.iter_mut().enumerate() {
            kernel(i, item);
        }
    }

    fn for_each_with<T, U, K>(&self, items: &mut [T], outputs: &mut [U], kernel: K)
    where
        T: Send,
        U: Send,
        K: Fn(usize, &mut T, &mut U) + Send + Sync,
    {
        debug_assert_eq!(items.len(), outputs.len());
        for (i, (item, out)) in items.iter_mut().zip(outputs.iter_mut()).enumerate() {
            kernel(i, item, out);
        }
    }
}

/// Work groups spread over the rayon thread pool.
#[derive(Clone, Copy, Debug)]
pub struct Parallel {
    group_size: usize,
}

impl Parallel {
    /// Use a custom group size (minimum 1).
    pub fn with_group_size(group_size: usize) -> Self {
        Self {
            group_size: group_size.max(1),
        }
    }
}

impl Default for Parallel {
    fn default() -> Self {
        Self {
            group_size: WORKGROUP_SIZE,
        }
    }
}

impl Dispatch for Parallel {
    fn group_size(&self) -> usize {
        self.group_size
    }

    fn for_each<T, K>(&self, items: &mut [T], kernel: K)
    where
        T: Send,
        K: Fn(usize, &mut T) + Send + Sync,
    {
        let group = self.group_size;
        items
            .par_chunks_mut(group)
            .enumerate()
            .for_each(|(g, chunk)| {
                let base = g * group;
                for (j, item) in chunk.iter_mut().enumerate() {
                    kernel(base + j, item);
                }
            });
    }

    fn for_each_with<T, U, K>(&self, items: &mut [T], outputs: &mut [U], kernel: K)
    where
        T: Send,
        U: Send,
        K: Fn(usize, &mut T, &mut U) + Send + Sync,
    {
        debug_assert_eq!(items.len(), outputs.len());
        let group = self.group_size;
        items
            .par_chunks_mut(group)
            .zip(outputs.par_chunks_mut(group))
            .enumerate()
            .for_each(|(g, (chunk, out))| {
                let base = g * group;
                for (j, (item, o)) in chunk.iter_mut().zip(out.iter_mut()).enumerate() {
                    kernel(base + j, item, o);
                }
            });
    }
}
