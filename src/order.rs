/// Direction of a sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Strict weak ordering predicate: `is_less(a, b)` is true when `a` sorts before `b`.
pub trait Compare<T: ?Sized> {
    fn is_less(&self, a: &T, b: &T) -> bool;
}

impl<T: ?Sized, F> Compare<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    #[inline(always)]
    fn is_less(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}

/// Sort direction chosen at compile time.
pub trait Order: Copy + Default + Send + Sync + 'static {
    const ORDER: SortOrder;
}

/// Smallest element first, compares with `<`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ascending;

/// Largest element first, compares with `>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Descending;

impl Order for Ascending {
    const ORDER: SortOrder = SortOrder::Ascending;
}

impl Order for Descending {
    const ORDER: SortOrder = SortOrder::Descending;
}

impl<T: PartialOrd + ?Sized> Compare<T> for Ascending {
    #[inline(always)]
    fn is_less(&self, a: &T, b: &T) -> bool {
        a < b
    }
}

impl<T: PartialOrd + ?Sized> Compare<T> for Descending {
    #[inline(always)]
    fn is_less(&self, a: &T, b: &T) -> bool {
        a > b
    }
}

/// Predicate sorting `T` in the given order.
pub fn comparator<T: PartialOrd>(order: SortOrder) -> fn(&T, &T) -> bool {
    match order {
        SortOrder::Ascending => |a: &T, b: &T| a < b,
        SortOrder::Descending => |a: &T, b: &T| a > b,
    }
}
