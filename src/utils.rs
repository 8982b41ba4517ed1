use std::convert::AsRef;
use std::ops;
use std::ops::Deref;

/// Packet payload: borrowed from the reader's buffer or mapping, or owned
///
/// Borrowed data cannot outlive the [`PacketReader`](crate::PacketReader) it comes
/// from. Use [`Data::into_owned`] (or [`Packet::into_owned`](crate::Packet::into_owned))
/// to keep it longer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Data<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a [u8]),
}

impl<'a> Data<'a> {
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Data::Owned(o) => o.deref(),
            Data::Borrowed(b) => b,
        }
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Returns true if the bytes still live in the reader's buffer or mapping
    #[inline]
    pub fn is_borrowed(&self) -> bool {
        matches!(self, Data::Borrowed(_))
    }
    /// Copy borrowed bytes, so the result no longer depends on the source
    pub fn into_owned(self) -> Data<'static> {
        match self {
            Data::Owned(o) => Data::Owned(o),
            Data::Borrowed(b) => Data::Owned(b.to_vec()),
        }
    }
}

impl Default for Data<'_> {
    fn default() -> Self {
        Data::Borrowed(&[])
    }
}

impl<'a> AsRef<[u8]> for Data<'a> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<'a> Deref for Data<'a> {
    type Target = [u8];
    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for Data<'static> {
    fn from(v: Vec<u8>) -> Self {
        Data::Owned(v)
    }
}

impl<'a> From<&'a [u8]> for Data<'a> {
    fn from(b: &'a [u8]) -> Self {
        Data::Borrowed(b)
    }
}

macro_rules! impl_index {
    ($t:ident, $index_t:ty, $output_t:ty) => {
        impl<'p> ops::Index<$index_t> for $t<'p> {
            type Output = $output_t;
            #[inline]
            fn index(&self, index: $index_t) -> &$output_t {
                &self.as_slice()[index]
            }
        }
    };
}

impl_index!(Data, usize, u8);
impl_index!(Data, ops::Range<usize>, [u8]);
impl_index!(Data, ops::RangeTo<usize>, [u8]);
impl_index!(Data, ops::RangeFrom<usize>, [u8]);
impl_index!(Data, ops::RangeFull, [u8]);

/// Fixed-size view on 4 bytes at `offset`, caller checks bounds
#[inline]
pub(crate) fn array_ref4(s: &[u8], offset: usize) -> [u8; 4] {
    [s[offset], s[offset + 1], s[offset + 2], s[offset + 3]]
}
