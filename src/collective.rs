// Group-wide sort primitives.
//
// Every lane of a group calls the same primitive with the same arguments. Lanes work on disjoint parts
// of the data and scratch buffers between barriers, so all shared memory is accessed through raw
// pointers and never through references spanning another lane's part.
//
// LSD radix sort based on the counting/scatter scheme of
// http://codercorner.com/RadixSortRevisited.htm
// http://stereopsis.com/radix.html
// with one counter column per lane, as in GPU block radix sorts.

use std::mem::{align_of, size_of};
use std::ptr;

use tracing::trace;

use crate::memory::Carver;
use crate::total_order::width_mask;
use crate::{Compare, Group, GroupSlice, RadixCounter, RadixKey, Scratch, SortOrder};

/// Group size and id of the calling lane, checked before the id addresses shared memory.
#[inline]
pub(crate) fn lane_of<G: Group>(g: &G) -> (usize, usize) {
    let lanes = g.local_range();
    let id = g.local_linear_id();
    assert!(id < lanes, "lane {id} out of range for a group of {lanes} lanes");
    (lanes, id)
}

/// Range of the data handled by one lane when `len` elements are split into chunks of `chunk`.
#[inline]
fn lane_chunk(id: usize, chunk: usize, len: usize) -> (usize, usize) {
    ((id * chunk).min(len), ((id + 1) * chunk).min(len))
}

/// Merge the sorted runs `src[lo..mid]` and `src[mid..hi]` into `dst[lo..hi]`.
///
/// Ties take the left run, which keeps equal elements in input order.
#[inline]
unsafe fn merge_runs<T: Copy, C: Compare<T> + ?Sized>(
    src: *const T,
    dst: *mut T,
    lo: usize,
    mid: usize,
    hi: usize,
    comp: &C,
) {
    let (mut i, mut j, mut k) = (lo, mid, lo);
    while i < mid && j < hi {
        if comp.is_less(&*src.add(j), &*src.add(i)) {
            dst.add(k).write(src.add(j).read());
            j += 1;
        } else {
            dst.add(k).write(src.add(i).read());
            i += 1;
        }
        k += 1;
    }
    ptr::copy_nonoverlapping(src.add(i), dst.add(k), mid - i);
    k += mid - i;
    ptr::copy_nonoverlapping(src.add(j), dst.add(k), hi - j);
}

/// Bottom-up merge sort of `data[lo..hi]`, using `buffer[lo..hi]` as the second half of the ping-pong.
/// The result always ends up in `data`.
unsafe fn sort_chunk<T: Copy, C: Compare<T> + ?Sized>(data: *mut T, buffer: *mut T, lo: usize, hi: usize, comp: &C) {
    let (mut from, mut to) = (data, buffer);
    let mut width = 1;
    while lo + width < hi {
        let mut start = lo;
        while start < hi {
            let mid = (start + width).min(hi);
            let end = (start + 2 * width).min(hi);
            merge_runs(from, to, start, mid, end, comp);
            start = end;
        }
        std::mem::swap(&mut from, &mut to);
        width *= 2;
    }
    if from != data {
        ptr::copy_nonoverlapping(from.add(lo), data.add(lo), hi - lo);
    }
}

/// Stable group-wide merge sort of `data`.
///
/// Each lane sorts one chunk, then pairs of sorted runs are merged in rounds, with lanes taking pairs
/// round robin. Requires `data.len()` elements of `T` in `scratch`.
pub(crate) fn merge_sort<G, T, C>(g: &G, data: GroupSlice<'_, T>, comp: &C, scratch: Scratch<'_>)
where
    G: Group,
    T: Copy,
    C: Compare<T> + ?Sized,
{
    let len = data.len();
    let (lanes, id) = lane_of(g);

    // the values to sort may have just been written by other lanes
    g.barrier();
    if len < 2 {
        return;
    }

    trace!(lane = id, lanes, len, "group merge sort");

    let buffer = Carver::new(scratch).take::<T>(len);
    let values = data.as_mut_ptr();
    let chunk = len.div_ceil(lanes);

    let (lo, hi) = lane_chunk(id, chunk, len);
    unsafe { sort_chunk(values, buffer, lo, hi, comp) };
    g.barrier();

    let (mut from, mut to) = (values, buffer);
    let mut width = chunk;
    while width < len {
        let pairs = len.div_ceil(2 * width);
        let mut pair = id;
        while pair < pairs {
            let start = pair * 2 * width;
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            unsafe { merge_runs(from, to, start, mid, end, comp) };
            pair += lanes;
        }
        g.barrier();
        std::mem::swap(&mut from, &mut to);
        width *= 2;
    }

    if from != values {
        unsafe { ptr::copy_nonoverlapping(from.add(lo), values.add(lo), hi - lo) };
        g.barrier();
    }
}

/// Digit extraction for the passes over a bit window of the total order key.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RadixPasses {
    first_bit: u32,
    last_bit: u32,
    bits_per_pass: u32,
    descending: bool,
}

impl RadixPasses {
    pub(crate) fn new(first_bit: u32, last_bit: u32, bits_per_pass: u32, order: SortOrder) -> Self {
        debug_assert!(first_bit <= last_bit && last_bit <= u64::BITS);
        debug_assert!(bits_per_pass > 0);
        Self {
            first_bit,
            last_bit,
            bits_per_pass,
            descending: order == SortOrder::Descending,
        }
    }

    #[inline]
    pub(crate) fn count(&self) -> u32 {
        (self.last_bit - self.first_bit).div_ceil(self.bits_per_pass)
    }

    /// Number of distinct digit values, the counters needed per lane.
    #[inline]
    pub(crate) fn buckets(&self) -> usize {
        1 << self.bits_per_pass
    }

    /// Bucket of `key` in `pass`. Descending order reverses the buckets.
    #[inline(always)]
    pub(crate) fn bucket(&self, key: u64, pass: u32) -> usize {
        let shift = self.first_bit + pass * self.bits_per_pass;
        let mask = width_mask(self.bits_per_pass.min(self.last_bit - shift));
        let digit = (key >> shift) & mask;
        (if self.descending { mask - digit } else { digit }) as usize
    }
}

/// Count the buckets of `values[lo..hi]` into counter column `column` of `columns`.
#[inline(never)]
unsafe fn fill_histogram<T: RadixKey>(
    values: *const T,
    lo: usize,
    hi: usize,
    counters: *mut RadixCounter,
    column: usize,
    columns: usize,
    passes: &RadixPasses,
    pass: u32,
) {
    for bucket in 0..passes.buckets() {
        counters.add(bucket * columns + column).write(0);
    }
    for i in lo..hi {
        let bucket = passes.bucket((*values.add(i)).to_total_order(), pass);
        let counter = counters.add(bucket * columns + column);
        counter.write(counter.read() + 1);
    }
}

/// Calculate the prefix sum of the histogram, resulting in the starting indices to the output for each
/// bucket and column.
#[inline(never)]
pub(crate) fn cumulative_histogram(histogram: &mut [RadixCounter]) {
    let mut sum = 0;
    histogram.iter_mut().for_each(|count| {
        let tmp = *count;
        *count = sum;
        sum += tmp;
    });
}

/// Scatter `values[lo..hi]` to `output`, advancing the lane's counter column as output index.
#[inline(never)]
unsafe fn reorder_values<T: RadixKey>(
    values: *const T,
    output: *mut T,
    lo: usize,
    hi: usize,
    counters: *mut RadixCounter,
    column: usize,
    columns: usize,
    passes: &RadixPasses,
    pass: u32,
) {
    for i in lo..hi {
        let value = values.add(i).read();
        let bucket = passes.bucket(value.to_total_order(), pass);
        let counter = counters.add(bucket * columns + column);
        let output_idx = counter.read();
        output.add(output_idx as usize).write(value);
        counter.write(output_idx + 1);
    }
}

/// Group-wide LSD radix sort of `data`.
///
/// Needs `data.len()` elements of `T` and `buckets * data.len()` counters in `scratch`.
pub(crate) fn radix_sort_range<G, T>(g: &G, data: GroupSlice<'_, T>, scratch: Scratch<'_>, passes: RadixPasses)
where
    G: Group,
    T: RadixKey,
{
    let len = data.len();
    let (lanes, id) = lane_of(g);

    g.barrier();
    if len < 2 || passes.count() == 0 {
        return;
    }

    trace!(lane = id, lanes, len, passes = passes.count(), "group radix sort");

    let chunk = len.div_ceil(lanes);
    let columns = len.div_ceil(chunk);
    let mut carver = Carver::new(scratch);
    let buffer = carver.take::<T>(len);
    let counters = carver.take::<RadixCounter>(passes.buckets() * columns);

    let (lo, hi) = lane_chunk(id, chunk, len);
    let values = data.as_mut_ptr();
    let (mut from, mut to) = (values, buffer);

    for pass in 0..passes.count() {
        if id < columns {
            unsafe { fill_histogram(from, lo, hi, counters, id, columns, &passes, pass) };
        }
        g.barrier();

        if id == 0 {
            // the other lanes wait at the next barrier and do not touch the counters meanwhile
            let histogram = unsafe { std::slice::from_raw_parts_mut(counters, passes.buckets() * columns) };
            cumulative_histogram(histogram);
        }
        g.barrier();

        if id < columns {
            unsafe { reorder_values(from, to, lo, hi, counters, id, columns, &passes, pass) };
        }
        g.barrier();

        std::mem::swap(&mut from, &mut to);
    }

    if from != values {
        unsafe { ptr::copy_nonoverlapping(from.add(lo), values.add(lo), hi - lo) };
        g.barrier();
    }
}

/// Scratch bytes and alignment of the region shared by counters and exchanged values in
/// [`radix_sort_values`].
pub(crate) const fn exchange_region<T>(lanes: usize, buckets: usize) -> (usize, usize) {
    let values = lanes * size_of::<T>();
    let counters = lanes * buckets * size_of::<RadixCounter>();
    let align = if align_of::<T>() > align_of::<RadixCounter>() {
        align_of::<T>()
    } else {
        align_of::<RadixCounter>()
    };
    (if values > counters { values } else { counters }, align)
}

/// Group-wide radix sort of one value per lane. Returns the value ranked at the calling lane.
///
/// Per pass each lane flags its bucket in its counter column and takes as rank the number of flags
/// before it in bucket-major order, then the values are exchanged through the same region.
pub(crate) fn radix_sort_values<G, T>(g: &G, value: T, scratch: Scratch<'_>, passes: RadixPasses) -> T
where
    G: Group,
    T: RadixKey,
{
    let (lanes, id) = lane_of(g);
    if lanes < 2 || passes.count() == 0 {
        return value;
    }

    trace!(lane = id, lanes, passes = passes.count(), "group radix sort of lane values");

    let (len, align) = exchange_region::<T>(lanes, passes.buckets());
    let region = Carver::new(scratch).take_bytes(len, align);
    let counters = region.cast::<RadixCounter>();
    let exchange = region.cast::<T>();

    let mut value = value;
    for pass in 0..passes.count() {
        let bucket = passes.bucket(value.to_total_order(), pass);
        for b in 0..passes.buckets() {
            unsafe { counters.add(b * lanes + id).write((b == bucket) as RadixCounter) };
        }
        g.barrier();

        let rank = (0..bucket * lanes + id)
            .map(|i| unsafe { counters.add(i).read() as usize })
            .sum::<usize>();
        g.barrier();

        unsafe { exchange.add(rank).write(value) };
        g.barrier();

        value = unsafe { exchange.add(id).read() };
        // the next pass or call overwrites the region
        g.barrier();
    }

    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::StrayLane;
    use crate::{HostGroup, WorkGroup};

    fn host() -> HostGroup {
        HostGroup::new(1, 0)
    }

    #[test]
    fn test_bucket_window() {
        let passes = RadixPasses::new(4, 10, 4, SortOrder::Ascending);
        assert_eq!(passes.count(), 2);
        assert_eq!(passes.bucket(0b11_1010_0000, 0), 0b1010);
        // the second pass only covers the two bits left in the window
        assert_eq!(passes.bucket(0b1111_1010_0000, 1), 0b11);

        let descending = RadixPasses::new(4, 10, 4, SortOrder::Descending);
        assert_eq!(descending.bucket(0b11_1010_0000, 0), 0b0101);
        assert_eq!(descending.bucket(0b1111_1010_0000, 1), 0b00);
    }

    #[test]
    fn test_empty_window() {
        assert_eq!(RadixPasses::new(8, 8, 4, SortOrder::Ascending).count(), 0);
        assert_eq!(RadixPasses::new(0, 64, 4, SortOrder::Ascending).count(), 16);
        assert_eq!(RadixPasses::new(0, 64, 5, SortOrder::Ascending).count(), 13);
    }

    #[test]
    fn test_cumulative_histogram() {
        let mut histogram = [0, 2, 2, 1, 0];
        cumulative_histogram(&mut histogram);
        assert_eq!(histogram, [0, 0, 2, 4, 5]);
    }

    #[test]
    fn test_merge_sort_single_lane() {
        let mut data = [5, 1, 4, 1, 3, 9, 2, 6];
        let mut bytes = [0u8; 64];
        merge_sort(&host(), GroupSlice::new(&mut data), &|a: &i32, b: &i32| a < b, Scratch::new(&mut bytes));
        assert_eq!(data, [1, 1, 2, 3, 4, 5, 6, 9]);
    }

    #[test]
    fn test_merge_sort_uneven_chunks() {
        let mut data = (0..23).rev().collect::<Vec<u32>>();
        let mut bytes = vec![0u8; 23 * 4 + 4];
        let slice = GroupSlice::new(&mut data);
        let scratch = Scratch::new(&mut bytes);
        WorkGroup::new(5).launch(|lane| merge_sort(lane, slice, &|a: &u32, b: &u32| a < b, scratch));
        assert_eq!(data, (0..23).collect::<Vec<u32>>());
    }

    #[test]
    fn test_radix_sort_range_more_lanes_than_values() {
        let mut data = [3_u16, 1, 2];
        let passes = RadixPasses::new(0, 16, 4, SortOrder::Ascending);
        let mut bytes = vec![0u8; 3 * 2 + 16 * 3 * 4 + 8];
        let slice = GroupSlice::new(&mut data);
        let scratch = Scratch::new(&mut bytes);
        WorkGroup::new(8).launch(|lane| radix_sort_range(lane, slice, scratch, passes));
        assert_eq!(data, [1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "lane 8 out of range for a group of 1 lanes")]
    fn test_radix_sort_values_lane_out_of_range() {
        let passes = RadixPasses::new(0, 32, 4, SortOrder::Ascending);
        let mut bytes = [0u8; 256];
        radix_sort_values(&StrayLane { size: 1, id: 8 }, 1_u32, Scratch::new(&mut bytes), passes);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_merge_sort_lane_out_of_range() {
        let mut data = [2, 1];
        let mut bytes = [0u8; 64];
        let lane = StrayLane { size: 2, id: 2 };
        merge_sort(&lane, GroupSlice::new(&mut data), &|a: &i32, b: &i32| a < b, Scratch::new(&mut bytes));
    }

    #[test]
    fn test_radix_sort_values() {
        let input = [7_i32, -3, 12, 0, -3, 5];
        let passes = RadixPasses::new(0, 32, 4, SortOrder::Descending);
        let (len, align) = exchange_region::<i32>(input.len(), passes.buckets());
        let mut bytes = vec![0u8; len + align];
        let scratch = Scratch::new(&mut bytes);
        let sorted = WorkGroup::new(input.len()).launch(|lane| radix_sort_values(lane, input[lane.id()], scratch, passes));
        assert_eq!(sorted, vec![12, 7, 5, 0, -3, -3]);
    }
}
