use crate::{Error, Result};

/// Sequential, bounds checked access to fixed width fields of a byte slice.
///
/// Every accessor either consumes exactly the width of the field or fails with
/// [Error::NotEnoughData] without consuming anything.
pub(crate) struct Fields<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Fields<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Fields { buf, offset: 0 }
    }

    pub fn take(&mut self, num: usize) -> Result<&'a [u8]> {
        let end = self.offset + num;
        if end > self.buf.len() {
            return Err(Error::NotEnoughData {
                actual: self.buf.len(),
                minimum: end,
            });
        }
        let dat = &self.buf[self.offset..end];
        self.offset = end;
        Ok(dat)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.take(N)?);
        Ok(arr)
    }

    pub fn skip(&mut self, num: usize) -> Result<()> {
        self.take(num).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    /// Everything not yet consumed. Does not advance.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.offset..]
    }
}
