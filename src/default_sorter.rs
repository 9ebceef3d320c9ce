use std::mem::{align_of, size_of};

use tracing::warn;

use crate::collective::{lane_of, merge_sort};
use crate::memory::Carver;
use crate::{
    comparator, Ascending, Compare, Group, GroupRange, GroupSlice, MemoryScope, Result, Scratch, SortError, SortOrder,
};

/// Comparison based group sorter, a stable merge sort under the comparator `C`.
///
/// `C` must be a strict weak ordering for the whole lifetime of the sorter.
#[derive(Debug, Clone, Copy)]
pub struct DefaultSorter<'a, C = Ascending> {
    comp: C,
    scratch: Scratch<'a>,
}

impl<'a> DefaultSorter<'a, Ascending> {
    /// Sorter in ascending order.
    pub fn new(scratch: Scratch<'a>) -> Self {
        Self {
            comp: Ascending,
            scratch,
        }
    }

    /// Scratch bytes needed to sort a range of `range_size` elements.
    pub const fn memory_required<T>(_scope: MemoryScope, range_size: usize) -> usize {
        range_size * size_of::<T>() + align_of::<T>()
    }

    /// Scratch bytes needed to sort one value per lane in a group of the given extent.
    pub const fn memory_required_for<T, const D: usize>(scope: MemoryScope, range: GroupRange<D>) -> usize {
        2 * Self::memory_required::<T>(scope, range.size())
    }
}

impl<'a, T: PartialOrd> DefaultSorter<'a, fn(&T, &T) -> bool> {
    /// Sorter comparing with `<` in the given order, see [`comparator`].
    pub fn with_order(scratch: Scratch<'a>, order: SortOrder) -> Self {
        Self {
            comp: comparator(order),
            scratch,
        }
    }
}

impl<'a, C> DefaultSorter<'a, C> {
    /// Sorter ordering by `comp`, which returns whether its first argument goes before the second.
    pub fn with_comparator(scratch: Scratch<'a>, comp: C) -> Self {
        Self { comp, scratch }
    }

    /// The comparator the sorter orders by.
    pub fn comparator(&self) -> &C {
        &self.comp
    }

    /// Sorts `data` in place, keeping equal elements in input order.
    ///
    /// Every lane of the group calls this with the same range. `scratch` must hold at least
    /// [`DefaultSorter::memory_required`] bytes for `data.len()` elements.
    pub fn sort_range<G, T>(&self, g: &G, data: GroupSlice<'_, T>) -> Result<()>
    where
        G: Group,
        T: Copy + Send,
        C: Compare<T>,
    {
        if !g.execution_context().supports_collectives() {
            warn!(len = data.len(), "group merge sort requested outside device execution");
            return Err(SortError::unsupported("DefaultSorter::sort_range"));
        }

        merge_sort(g, data, &self.comp, self.scratch);
        Ok(())
    }

    /// Sorts the values of all lanes and returns the one ranked at the calling lane.
    ///
    /// `scratch` must hold at least [`DefaultSorter::memory_required_for`] bytes for the group.
    pub fn sort_value<G, T>(&self, g: &G, value: T) -> Result<T>
    where
        G: Group,
        T: Copy + Send,
        C: Compare<T>,
    {
        if !g.execution_context().supports_collectives() {
            warn!("group merge sort of lane values requested outside device execution");
            return Err(SortError::unsupported("DefaultSorter::sort_value"));
        }

        let (lanes, id) = lane_of(g);

        let mut carver = Carver::new(self.scratch);
        let staging = carver.take::<T>(lanes);
        // the slot is raw memory, write without reading or dropping a previous value
        unsafe { staging.add(id).write(value) };

        let values = unsafe { GroupSlice::from_raw(staging, lanes) };
        merge_sort(g, values, &self.comp, carver.into_rest());

        let sorted = unsafe { staging.add(id).read() };
        // the staging slots are reused by the next call
        g.barrier();
        Ok(sorted)
    }
}
