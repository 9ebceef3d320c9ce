//! Cooperative sorting for execution groups.
//!
//! A group of lanes sorts either one value per lane ([`DefaultSorter::sort_value`],
//! [`RadixSorter::sort_value`]) or a range shared by the whole group ([`DefaultSorter::sort_range`],
//! [`RadixSorter::sort_range`]). The caller provides the scratch memory, sized with the sorter's
//! `memory_required` functions.
//!
//! ```
//! use group_sort::{DefaultSorter, GroupRange, MemoryScope, Scratch, WorkGroup};
//!
//! let group = WorkGroup::new(4);
//! let mut scratch = vec![0u8; DefaultSorter::memory_required_for::<u32, 1>(MemoryScope::WorkGroup, GroupRange::new([4]))];
//! let scratch = Scratch::new(&mut scratch);
//!
//! let sorted = group.launch(|lane| {
//!     let input = [30_u32, 10, 40, 20];
//!     DefaultSorter::new(scratch).sort_value(lane, input[lane.id()]).unwrap()
//! });
//! assert_eq!(sorted, vec![10, 20, 30, 40]);
//! ```
mod collective;
mod default_sorter;
mod error;
mod group;
mod memory;
mod order;
mod radix_sorter;
mod total_order;

pub use default_sorter::*;
pub use error::*;
pub use group::*;
pub use memory::*;
pub use order::*;
pub use radix_sorter::*;
pub use total_order::*;

// 4 -> 16 counters per lane, 16 passes per u64
// 8 -> 256 counters per lane, 8 passes per u64, but 16x the scratch memory for counters
// 16 is the upper limit, larger digits no longer fit a scratch region of any realistic group
pub const DEFAULT_BITS_PER_PASS: u32 = 4;

/// Counter slot of the radix counting pass, one per digit value and lane.
pub type RadixCounter = u32;
