//! Untyped read-only pointers into value memory.

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

/// A read-only pointer to a value whose type is only known through its
/// [`Shape`](crate::Shape).
///
/// The `'mem` lifetime ties the pointer to the borrow of the value being
/// encoded.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PtrConst<'mem> {
    ptr: NonNull<u8>,
    phantom: PhantomData<&'mem ()>,
}

impl fmt::Debug for PtrConst<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ptr.fmt(f)
    }
}

impl<'mem> PtrConst<'mem> {
    /// Creates a pointer to `value`. Metadata of unsized values is dropped.
    #[inline]
    pub fn new<T: ?Sized>(value: &'mem T) -> Self {
        Self {
            ptr: NonNull::from(value).cast::<u8>(),
            phantom: PhantomData,
        }
    }

    /// Rebuilds a pointer from an address obtained through [`Self::addr`].
    ///
    /// # Safety
    ///
    /// `addr` must be non-zero and point into memory that lives for `'mem`.
    #[inline]
    pub unsafe fn from_addr(addr: usize) -> Self {
        debug_assert!(addr != 0, "null address");
        Self {
            ptr: unsafe { NonNull::new_unchecked(addr as *mut u8) },
            phantom: PhantomData,
        }
    }

    /// The address of the pointee.
    #[inline]
    pub fn addr(self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Offsets the pointer by `offset` bytes.
    ///
    /// # Safety
    ///
    /// The result must stay inside the allocation of the original value.
    #[inline]
    pub unsafe fn field(self, offset: usize) -> Self {
        Self {
            ptr: unsafe { self.ptr.byte_add(offset) },
            phantom: PhantomData,
        }
    }

    /// Borrows the pointee as a `T`.
    ///
    /// # Safety
    ///
    /// The pointee must be a valid, initialized `T`.
    #[inline]
    pub unsafe fn get<T>(self) -> &'mem T {
        unsafe { self.ptr.cast::<T>().as_ref() }
    }

    /// Copies the pointee out as a `T`.
    ///
    /// # Safety
    ///
    /// The pointee must be a valid, initialized `T`.
    #[inline]
    pub unsafe fn read<T: Copy>(self) -> T {
        unsafe { *self.get::<T>() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opjson_testhelpers::test;

    #[test]
    fn address_roundtrip_reads_same_value() {
        let value = (7u16, 9u64);
        let ptr = PtrConst::new(&value);
        let again = unsafe { PtrConst::from_addr(ptr.addr()) };
        assert_eq!(ptr, again);
        assert_eq!(unsafe { again.get::<(u16, u64)>() }, &value);
    }

    #[test]
    fn field_offsets_reach_members() {
        #[repr(C)]
        struct Pair {
            a: u8,
            b: u32,
        }
        let pair = Pair { a: 1, b: 42 };
        let ptr = PtrConst::new(&pair);
        let b = unsafe { ptr.field(core::mem::offset_of!(Pair, b)).read::<u32>() };
        assert_eq!(b, 42);
        assert_eq!(unsafe { ptr.read::<u8>() }, pair.a);
    }
}
