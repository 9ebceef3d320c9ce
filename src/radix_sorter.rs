use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ops::Range;

use tracing::{debug, warn};

use crate::collective::{exchange_region, radix_sort_range, radix_sort_values, RadixPasses};
use crate::total_order::width_mask;
use crate::{
    Ascending, Group, GroupRange, GroupSlice, MemoryScope, Order, RadixCounter, RadixKey, Result, Scratch, SortError,
    DEFAULT_BITS_PER_PASS,
};

/// Radix sorter for element types with a [`RadixKey`] encoding.
///
/// Sorts by the bits `first_bit..last_bit` of the total order key, `BITS_PER_PASS` bits per pass, in the
/// order `O`. Elements whose selected bits are equal are ties.
#[derive(Debug)]
pub struct RadixSorter<'a, T, O = Ascending, const BITS_PER_PASS: u32 = DEFAULT_BITS_PER_PASS> {
    scratch: Scratch<'a>,
    first_bit: u32,
    last_bit: u32,
    _marker: PhantomData<(fn() -> T, O)>,
}

impl<T, O, const BITS_PER_PASS: u32> Clone for RadixSorter<'_, T, O, BITS_PER_PASS> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, O, const BITS_PER_PASS: u32> Copy for RadixSorter<'_, T, O, BITS_PER_PASS> {}

impl<'a, T: RadixKey, O: Order, const BITS_PER_PASS: u32> RadixSorter<'a, T, O, BITS_PER_PASS> {
    const VALID_BITS_PER_PASS: () = assert!(
        BITS_PER_PASS >= 1 && BITS_PER_PASS <= 16,
        "bits per pass must be in 1..=16"
    );

    /// Sorter over all bits of the key.
    pub fn new(scratch: Scratch<'a>) -> Self {
        Self::with_mask(scratch, u64::MAX)
    }

    /// Sorter over the first run of set bits in `mask`, counted from the least significant bit.
    ///
    /// Bits above `T::BITS` are ignored. Runs after the first one are ignored as well, the mask
    /// `0b1100_0110` selects the bits `1..3`.
    pub fn with_mask(scratch: Scratch<'a>, mask: u64) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_BITS_PER_PASS;

        let mask = mask & width_mask(T::BITS);
        let first_bit = mask.trailing_zeros().min(T::BITS);
        let last_bit = if first_bit == T::BITS {
            first_bit
        } else {
            (first_bit + (mask >> first_bit).trailing_ones()).min(T::BITS)
        };

        debug!(first_bit, last_bit, bits_per_pass = BITS_PER_PASS, "radix sorter bit window");

        Self {
            scratch,
            first_bit,
            last_bit,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn first_bit(&self) -> u32 {
        self.first_bit
    }

    #[inline]
    pub fn last_bit(&self) -> u32 {
        self.last_bit
    }

    /// The bits `first_bit..last_bit` of the key the sorter orders by.
    pub fn bit_window(&self) -> Range<u32> {
        self.first_bit..self.last_bit
    }

    fn passes(&self) -> RadixPasses {
        RadixPasses::new(self.first_bit, self.last_bit, BITS_PER_PASS, O::ORDER)
    }

    /// Sorts `data` in place.
    ///
    /// Every lane of the group calls this with the same range. `scratch` must hold at least
    /// [`RadixSorter::memory_required`] bytes for `data.len()` elements.
    pub fn sort_range<G: Group>(&self, g: &G, data: GroupSlice<'_, T>) -> Result<()> {
        if !g.execution_context().supports_collectives() {
            warn!(len = data.len(), "group radix sort requested outside device execution");
            return Err(SortError::unsupported("RadixSorter::sort_range"));
        }

        radix_sort_range(g, data, self.scratch, self.passes());
        Ok(())
    }

    /// Sorts the values of all lanes and returns the one ranked at the calling lane.
    ///
    /// `scratch` must hold at least [`RadixSorter::memory_required_for`] bytes for the group.
    pub fn sort_value<G: Group>(&self, g: &G, value: T) -> Result<T> {
        if !g.execution_context().supports_collectives() {
            warn!("group radix sort of lane values requested outside device execution");
            return Err(SortError::unsupported("RadixSorter::sort_value"));
        }

        Ok(radix_sort_values(g, value, self.scratch, self.passes()))
    }

    /// Scratch bytes needed to sort a range of `range_size` elements, or one value per lane in a group
    /// of `range_size` lanes.
    ///
    /// Bits per pass outside `1..=16` are rejected here as well:
    ///
    /// ```compile_fail
    /// use group_sort::{Ascending, MemoryScope, RadixSorter};
    ///
    /// const BYTES: usize = RadixSorter::<u8, Ascending, 0>::memory_required(MemoryScope::WorkGroup, 4);
    /// println!("{BYTES}");
    /// ```
    pub const fn memory_required(_scope: MemoryScope, range_size: usize) -> usize {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_BITS_PER_PASS;

        range_size * size_of::<T>()
            + (1 << BITS_PER_PASS) * range_size * size_of::<RadixCounter>()
            + align_of::<T>()
            + align_of::<RadixCounter>()
    }

    /// Scratch bytes needed to sort one value per lane in a group of the given extent.
    ///
    /// Counters and exchanged values share one region, so this is the larger of the two.
    pub const fn memory_required_for<const D: usize>(_scope: MemoryScope, range: GroupRange<D>) -> usize {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_BITS_PER_PASS;

        let (len, align) = exchange_region::<T>(range.size(), 1 << BITS_PER_PASS);
        len + align
    }
}
