//! Fixed-width values readable from and writable to raw memory

use std::ptr;

/// A plain value with a fixed byte width and an unaligned native load/store
pub(crate) trait Primitive: Copy {
    const WIDTH: usize;

    /// # Safety
    /// `src` must be valid for reads of `WIDTH` bytes
    unsafe fn load(src: *const u8) -> Self;

    /// # Safety
    /// `dst` must be valid for writes of `WIDTH` bytes
    unsafe fn store(self, dst: *mut u8);

    /// The value with its byte representation reversed
    fn swapped(self) -> Self;
}

macro_rules! integer_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                unsafe fn load(src: *const u8) -> Self {
                    ptr::read_unaligned(src as *const $ty)
                }

                unsafe fn store(self, dst: *mut u8) {
                    ptr::write_unaligned(dst as *mut $ty, self)
                }

                fn swapped(self) -> Self {
                    self.swap_bytes()
                }
            }
        )*
    };
}

macro_rules! float_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                unsafe fn load(src: *const u8) -> Self {
                    ptr::read_unaligned(src as *const $ty)
                }

                unsafe fn store(self, dst: *mut u8) {
                    ptr::write_unaligned(dst as *mut $ty, self)
                }

                fn swapped(self) -> Self {
                    <$ty>::from_bits(self.to_bits().swap_bytes())
                }
            }
        )*
    };
}

integer_primitive!(u8, i16, u16, i32, i64);
float_primitive!(f32, f64);
