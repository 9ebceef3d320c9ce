use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ops::Range;
use std::ptr::NonNull;

/// Caller-owned byte region used by the sorters as working memory.
///
/// The region is shared by every lane of a group for the duration of a sort call, so it is `Copy`:
/// each lane holds the same view. The sorter never allocates or frees it.
///
/// A region is not re-entrant. Sort calls of one group reusing it one after the other are fine, but
/// two groups running sorts on the same region at the same time race on its bytes, which is undefined
/// behavior. Every concurrently running group needs its own region.
#[derive(Debug, Clone, Copy)]
pub struct Scratch<'a> {
    ptr: NonNull<u8>,
    len: usize,
    _marker: PhantomData<&'a mut [u8]>,
}

// Accesses through a scratch region are only made by the collective primitives, which order them
// with group barriers.
unsafe impl Send for Scratch<'_> {}
unsafe impl Sync for Scratch<'_> {}

impl<'a> Scratch<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self {
            len: bytes.len(),
            ptr: NonNull::from(bytes).cast(),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<'a> From<&'a mut [u8]> for Scratch<'a> {
    fn from(bytes: &'a mut [u8]) -> Self {
        Self::new(bytes)
    }
}

/// Hands out aligned, non-overlapping buffers from a scratch region.
///
/// Every lane carves the same sequence of buffers and therefore derives the same addresses.
pub(crate) struct Carver<'a> {
    scratch: Scratch<'a>,
    offset: usize,
}

impl<'a> Carver<'a> {
    pub(crate) fn new(scratch: Scratch<'a>) -> Self {
        Self { scratch, offset: 0 }
    }

    /// Next `len` bytes aligned to `align`.
    pub(crate) fn take_bytes(&mut self, len: usize, align: usize) -> *mut u8 {
        let base = self.scratch.ptr.as_ptr();
        // offset never exceeds the region, see the assertion below
        let padding = unsafe { base.add(self.offset) }.align_offset(align);
        let end = self
            .offset
            .checked_add(padding)
            .and_then(|start| start.checked_add(len))
            .filter(|&end| end <= self.scratch.len);

        match end {
            Some(end) => {
                let start = end - len;
                self.offset = end;
                unsafe { base.add(start) }
            }
            None => panic!(
                "scratch region of {} bytes is too small, {} more bytes needed at offset {}",
                self.scratch.len, len, self.offset
            ),
        }
    }

    /// Next buffer of `count` elements of `T`.
    pub(crate) fn take<T>(&mut self, count: usize) -> *mut T {
        let len = count
            .checked_mul(size_of::<T>())
            .unwrap_or_else(|| panic!("scratch buffer of {count} elements overflows usize"));
        self.take_bytes(len, align_of::<T>()).cast()
    }

    /// Remainder of the region after everything carved so far.
    pub(crate) fn into_rest(self) -> Scratch<'a> {
        Scratch {
            ptr: unsafe { NonNull::new_unchecked(self.scratch.ptr.as_ptr().add(self.offset)) },
            len: self.scratch.len - self.offset,
            _marker: PhantomData,
        }
    }
}

/// Contiguous range of elements owned collectively by the lanes of a group.
///
/// Like [`Scratch`] the view is `Copy`, every lane passes the same range to a range sort. Two groups
/// sorting the same range, or overlapping subslices of it, at the same time race on its elements,
/// which is undefined behavior.
#[derive(Debug)]
pub struct GroupSlice<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

impl<T> Clone for GroupSlice<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for GroupSlice<'_, T> {}

unsafe impl<T: Send> Send for GroupSlice<'_, T> {}
unsafe impl<T: Send> Sync for GroupSlice<'_, T> {}

impl<'a, T> GroupSlice<'a, T> {
    pub fn new(data: &'a mut [T]) -> Self {
        Self {
            len: data.len(),
            ptr: NonNull::from(data).cast(),
            _marker: PhantomData,
        }
    }

    /// View of `len` elements starting at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` elements for `'a`.
    pub(crate) unsafe fn from_raw(ptr: *mut T, len: usize) -> Self {
        Self {
            ptr: NonNull::new_unchecked(ptr),
            len,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The elements `[range.start, range.end)` of this range.
    pub fn subslice(self, range: Range<usize>) -> Self {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "range {:?} out of bounds for group slice of length {}",
            range,
            self.len
        );
        Self {
            ptr: unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(range.start)) },
            len: range.end - range.start,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn as_mut_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}
