use core::fmt;

/// Bytes rendered as uppercase hex, cut off after `limit` bytes.
pub struct HexPreview<'a> {
    bytes: &'a [u8],
    limit: usize,
}

impl fmt::Display for HexPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.bytes.iter().take(self.limit) {
            write!(f, "{:02X}", byte)?;
        }
        if self.bytes.len() > self.limit {
            write!(f, "..(+{} bytes)", self.bytes.len() - self.limit)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HexPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

pub trait HexDisplayExt {
    fn hex_preview(&self, limit: usize) -> HexPreview<'_>;
}

impl<T> HexDisplayExt for T
where
    T: ?Sized + AsRef<[u8]>,
{
    fn hex_preview(&self, limit: usize) -> HexPreview<'_> {
        HexPreview {
            bytes: self.as_ref(),
            limit,
        }
    }
}
