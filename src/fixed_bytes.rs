//! Fixed-width byte encodings for the typed front-end.

/// A type with a fixed-size byte encoding.
///
/// `from_bytes(x.write_bytes())` must reproduce `x`, and equal values must
/// encode to equal bytes: the table compares keys byte for byte.
pub trait FixedBytes: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Writes the encoding into `out`, which is exactly `SIZE` bytes.
    fn write_bytes(&self, out: &mut [u8]);

    /// Decodes from `bytes`, which is exactly `SIZE` bytes.
    fn from_bytes(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_bytes_le {
    ($($t:ty),* $(,)?) => {
        $(
            impl FixedBytes for $t {
                const SIZE: usize = core::mem::size_of::<$t>();

                #[inline]
                fn write_bytes(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn from_bytes(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

// Floats compare by bit pattern: 0.0 and -0.0 are distinct keys, and a NaN
// finds itself.
impl_fixed_bytes_le!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);

impl FixedBytes for bool {
    const SIZE: usize = 1;

    #[inline]
    fn write_bytes(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }

    #[inline]
    fn from_bytes(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

impl<const N: usize> FixedBytes for [u8; N] {
    const SIZE: usize = N;

    #[inline]
    fn write_bytes(&self, out: &mut [u8]) {
        out.copy_from_slice(self);
    }

    #[inline]
    fn from_bytes(bytes: &[u8]) -> Self {
        let mut raw = [0u8; N];
        raw.copy_from_slice(bytes);
        raw
    }
}
