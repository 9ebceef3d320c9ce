use half::{bf16, f16};

/// Element types with a fixed-width bit encoding that the radix sorter can order.
///
/// `to_total_order` maps a value to an unsigned key of `BITS` significant bits whose unsigned order
/// is the natural order of the type. For floats this is the order of `total_cmp`.
///
/// Types without such an encoding can not be radix sorted:
///
/// ```compile_fail
/// use group_sort::{RadixSorter, Scratch};
///
/// let mut bytes = [0u8; 64];
/// let sorter = RadixSorter::<String>::new(Scratch::new(&mut bytes));
/// ```
pub trait RadixKey: Copy + Send + 'static {
    /// Width of the encoding in bits.
    const BITS: u32;

    fn to_total_order(&self) -> u64;
}

/// Mask covering all `bits` low bits of a key.
#[inline(always)]
pub(crate) const fn width_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl RadixKey for $t {
            const BITS: u32 = <$t>::BITS;

            #[inline(always)]
            fn to_total_order(&self) -> u64 {
                *self as u64
            }
        }
    )*};
}

// cast through the unsigned type of the same width, sign extension would break the order
macro_rules! impl_signed {
    ($($t:ty => $u:ty),*) => {$(
        impl RadixKey for $t {
            const BITS: u32 = <$t>::BITS;

            #[inline(always)]
            fn to_total_order(&self) -> u64 {
                (*self as $u as u64) ^ (1 << (<$t>::BITS - 1))
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64, usize);
impl_signed!(i8 => u8, i16 => u16, i32 => u32, i64 => u64, isize => usize);

impl RadixKey for bool {
    const BITS: u32 = 1;

    #[inline(always)]
    fn to_total_order(&self) -> u64 {
        *self as u64
    }
}

impl RadixKey for f64 {
    const BITS: u32 = 64;

    #[inline(always)]
    fn to_total_order(&self) -> u64 {
        // see f64::total_cmp
        let bits = self.to_bits();
        (bits ^ ((bits as i64 >> 63) as u64 >> 1)) ^ (1 << 63)
    }
}

impl RadixKey for f32 {
    const BITS: u32 = 32;

    #[inline(always)]
    fn to_total_order(&self) -> u64 {
        // see f32::total_cmp
        let bits = self.to_bits();
        ((bits ^ ((bits as i32 >> 31) as u32 >> 1)) ^ (1 << 31)) as u64
    }
}

impl RadixKey for f16 {
    const BITS: u32 = 16;

    #[inline(always)]
    fn to_total_order(&self) -> u64 {
        let bits = self.to_bits();
        ((bits ^ ((bits as i16 >> 15) as u16 >> 1)) ^ (1 << 15)) as u64
    }
}

impl RadixKey for bf16 {
    const BITS: u32 = 16;

    #[inline(always)]
    fn to_total_order(&self) -> u64 {
        let bits = self.to_bits();
        ((bits ^ ((bits as i16 >> 15) as u16 >> 1)) ^ (1 << 15)) as u64
    }
}
