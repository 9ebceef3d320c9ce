use std::sync::Barrier;
use std::thread;

use tracing::debug;

/// Memory scope a scratch region is shared at. Accepted by the sizing functions, the required size
/// does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryScope {
    WorkItem,
    SubGroup,
    WorkGroup,
    Device,
    System,
}

/// Where a group handle is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Lanes are running and can take part in collective operations.
    Device,
    /// Control path outside any running group, collective operations are unavailable.
    Host,
}

impl ExecutionContext {
    #[inline]
    pub fn supports_collectives(self) -> bool {
        matches!(self, ExecutionContext::Device)
    }
}

/// Handle of one lane within a set of cooperating lanes.
///
/// Sorts are collective: every lane of the group has to make the same call with the same arguments,
/// and no lane returns before all lanes have finished their part.
///
/// # Safety
///
/// The sorters index scratch memory with these answers through raw pointers. An implementation must
/// guarantee that
///
/// - `local_linear_id()` is below `local_range()`, and that every lane of a group reports the same
///   `local_range()` and a distinct id,
/// - `barrier()` returns only after all `local_range()` lanes called it, and makes memory written
///   before it visible to every lane after it.
///
/// A handle whose `execution_context()` is not [`ExecutionContext::Device`] is never used for
/// memory accesses and only has to report a consistent id and range.
pub unsafe trait Group: Sync {
    /// Number of lanes in the group.
    fn local_range(&self) -> usize;

    /// Index of the calling lane, in `0..local_range()`.
    fn local_linear_id(&self) -> usize;

    fn execution_context(&self) -> ExecutionContext;

    /// Blocks until every lane of the group reached this barrier. Memory written before the barrier is
    /// visible to all lanes after it.
    fn barrier(&self);
}

/// Extent of a group in up to `D` dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRange<const D: usize>([usize; D]);

impl<const D: usize> GroupRange<D> {
    pub const fn new(extent: [usize; D]) -> Self {
        Self(extent)
    }

    /// Number of lanes along each dimension.
    pub const fn extent(&self) -> [usize; D] {
        self.0
    }

    /// Total number of lanes.
    pub const fn size(&self) -> usize {
        let mut size = 1;
        let mut i = 0;
        while i < D {
            size *= self.0[i];
            i += 1;
        }
        size
    }
}

impl From<usize> for GroupRange<1> {
    fn from(size: usize) -> Self {
        Self([size])
    }
}

/// Launches kernels on a group of lanes, one scoped thread per lane.
#[derive(Debug, Clone, Copy)]
pub struct WorkGroup {
    size: usize,
}

impl WorkGroup {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "a work-group needs at least one lane");
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn range(&self) -> GroupRange<1> {
        GroupRange::new([self.size])
    }

    /// Runs `kernel` once per lane and returns the results in lane order.
    ///
    /// A panic in any lane is resumed on the calling thread. Lanes still waiting at a barrier for
    /// the panicked lane never return, so kernels must not panic between collective calls.
    pub fn launch<R, F>(&self, kernel: F) -> Vec<R>
    where
        R: Send,
        F: Fn(&Lane<'_>) -> R + Sync,
    {
        debug!(lanes = self.size, "launching work-group");

        let barrier = Barrier::new(self.size);
        let kernel = &kernel;
        let barrier = &barrier;
        let size = self.size;

        thread::scope(|scope| {
            let handles = (0..size)
                .map(|id| scope.spawn(move || kernel(&Lane { id, size, barrier })))
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}

/// One running lane of a [`WorkGroup`].
#[derive(Debug)]
pub struct Lane<'a> {
    id: usize,
    size: usize,
    barrier: &'a Barrier,
}

impl Lane<'_> {
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }
}

// ids come from `0..size` of one launch, the barrier counts `size` lanes
unsafe impl Group for Lane<'_> {
    #[inline]
    fn local_range(&self) -> usize {
        self.size
    }

    #[inline]
    fn local_linear_id(&self) -> usize {
        self.id
    }

    #[inline]
    fn execution_context(&self) -> ExecutionContext {
        ExecutionContext::Device
    }

    fn barrier(&self) {
        self.barrier.wait();
    }
}

/// Group handle evaluated on the host control path, where no lanes run.
#[derive(Debug, Clone, Copy)]
pub struct HostGroup {
    size: usize,
    id: usize,
}

impl HostGroup {
    pub fn new(size: usize, id: usize) -> Self {
        assert!(id < size, "lane {id} out of range for a group of {size} lanes");
        Self { size, id }
    }
}

unsafe impl Group for HostGroup {
    fn local_range(&self) -> usize {
        self.size
    }

    fn local_linear_id(&self) -> usize {
        self.id
    }

    fn execution_context(&self) -> ExecutionContext {
        ExecutionContext::Host
    }

    fn barrier(&self) {}
}

/// Group handle that breaks the [`Group`] contract by reporting an id outside its range.
#[cfg(test)]
pub(crate) struct StrayLane {
    pub(crate) size: usize,
    pub(crate) id: usize,
}

#[cfg(test)]
unsafe impl Group for StrayLane {
    fn local_range(&self) -> usize {
        self.size
    }

    fn local_linear_id(&self) -> usize {
        self.id
    }

    fn execution_context(&self) -> ExecutionContext {
        ExecutionContext::Device
    }

    fn barrier(&self) {}
}
