//! Property-based tests of the group sorters using proptest.
//!
//! Every case launches a fresh work-group with one thread per lane, so groups are kept small and the
//! number of cases is limited.

use group_sort::{
    DefaultSorter, Descending, GroupRange, GroupSlice, MemoryScope, RadixKey, RadixSorter, Scratch, WorkGroup,
};
use proptest::prelude::*;

const NUM_CASES: u32 = 64;

fn merge_sort_range(values: &mut [i32], lanes: usize) {
    let mut bytes = vec![0u8; DefaultSorter::memory_required::<i32>(MemoryScope::WorkGroup, values.len())];
    let sorter = DefaultSorter::new(Scratch::new(&mut bytes));
    let range = GroupSlice::new(values);
    WorkGroup::new(lanes).launch(|lane| sorter.sort_range(lane, range).unwrap());
}

fn radix_sort_range<T: RadixKey>(values: &mut [T], lanes: usize, mask: u64) {
    let mut bytes = vec![0u8; RadixSorter::<T>::memory_required(MemoryScope::WorkGroup, values.len())];
    let sorter = RadixSorter::<T>::with_mask(Scratch::new(&mut bytes), mask);
    let range = GroupSlice::new(values);
    WorkGroup::new(lanes).launch(|lane| sorter.sort_range(lane, range).unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(NUM_CASES))]

    #[test]
    fn merge_range_sorts_a_permutation(mut values in prop::collection::vec(any::<i32>(), 0..300), lanes in 1..9_usize) {
        let mut expected = values.clone();
        expected.sort();

        merge_sort_range(&mut values, lanes);
        prop_assert_eq!(&values, &expected);

        // sorting a sorted range changes nothing
        merge_sort_range(&mut values, lanes);
        prop_assert_eq!(&values, &expected);
    }

    #[test]
    fn radix_full_window_matches_natural_order(mut values in prop::collection::vec(any::<i64>(), 0..300), lanes in 1..9_usize) {
        let mut expected = values.clone();
        expected.sort();

        radix_sort_range(&mut values, lanes, u64::MAX);
        prop_assert_eq!(values, expected);
    }

    #[test]
    fn radix_floats_match_total_cmp(bits in prop::collection::vec(any::<u32>(), 0..200), lanes in 1..9_usize) {
        let mut values = bits.iter().map(|b| f32::from_bits(*b)).collect::<Vec<_>>();
        let mut expected = values.clone();
        expected.sort_by(f32::total_cmp);

        radix_sort_range(&mut values, lanes, u64::MAX);
        prop_assert_eq!(
            values.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            expected.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn radix_window_ties_outside_bits(mut values in prop::collection::vec(any::<u16>(), 0..200), lanes in 1..9_usize, first in 0..16_u32, width in 1..8_u32) {
        let last = (first + width).min(16);
        let mask = ((1_u64 << last) - 1) & !((1_u64 << first) - 1);
        let selected = |v: &u16| (*v as u64 & mask) >> first;

        let mut expected = values.clone();
        // the window orders by the selected bits only and a stable sort keeps ties in input order
        expected.sort_by_key(selected);

        radix_sort_range(&mut values, lanes, mask);
        prop_assert!(values.windows(2).all(|w| selected(&w[0]) <= selected(&w[1])));
        prop_assert_eq!(values, expected);
    }

    #[test]
    fn sort_value_returns_sorted_permutation(values in prop::collection::vec(any::<u8>(), 1..17)) {
        let group = WorkGroup::new(values.len());
        let range = GroupRange::new([values.len()]);
        let mut merge_bytes = vec![0u8; DefaultSorter::memory_required_for::<u8, 1>(MemoryScope::WorkGroup, range)];
        let mut radix_bytes = vec![0u8; RadixSorter::<u8, Descending>::memory_required_for(MemoryScope::WorkGroup, range)];
        let merge = DefaultSorter::new(Scratch::new(&mut merge_bytes));
        let radix = RadixSorter::<u8, Descending>::new(Scratch::new(&mut radix_bytes));

        let results = group.launch(|lane| {
            let value = values[lane.id()];
            (merge.sort_value(lane, value).unwrap(), radix.sort_value(lane, value).unwrap())
        });

        let mut ascending = values.clone();
        ascending.sort();
        let mut descending = ascending.clone();
        descending.reverse();

        prop_assert_eq!(results.iter().map(|r| r.0).collect::<Vec<_>>(), ascending);
        prop_assert_eq!(results.iter().map(|r| r.1).collect::<Vec<_>>(), descending);
    }

    #[test]
    fn memory_required_grows_linearly(n in 0..10_000_usize) {
        let scope = MemoryScope::WorkGroup;
        prop_assert_eq!(
            DefaultSorter::memory_required::<u64>(scope, n + 1) - DefaultSorter::memory_required::<u64>(scope, n),
            8
        );
        prop_assert_eq!(
            RadixSorter::<u32>::memory_required(scope, n + 1) - RadixSorter::<u32>::memory_required(scope, n),
            4 + 16 * 4
        );
        prop_assert_eq!(
            RadixSorter::<u32, Descending, 6>::memory_required(scope, n + 1) - RadixSorter::<u32, Descending, 6>::memory_required(scope, n),
            4 + 64 * 4
        );
    }
}
