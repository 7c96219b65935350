use std::mem::size_of;

use bytes::{Buf, BufMut, Bytes};

use crate::codec::error::ProtocolError;

macro_rules! try_read_impl {
    ($try_reader: ident, $ty:ty, $getter: ident) => {
        fn $try_reader(&mut self) -> Result<$ty, ProtocolError> {
            self.ensure_remaining(size_of::<$ty>())?;
            Ok(self.$getter())
        }
    }
}

/// Checked reads: running out of bytes is reported as [ProtocolError::TruncatedInput] rather
///  than panicking the way [Buf]'s getters do. All numbers are in network byte order.
pub trait BufExt: Buf {
    fn ensure_remaining(&self, needed: usize) -> Result<(), ProtocolError> {
        if self.remaining() < needed {
            return Err(ProtocolError::TruncatedInput {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    try_read_impl!(try_read_u8, u8, get_u8);
    try_read_impl!(try_read_u16, u16, get_u16);
    try_read_impl!(try_read_u32, u32, get_u32);
    try_read_impl!(try_read_u64, u64, get_u64);

    fn try_read_length_prefixed(&mut self) -> Result<Bytes, ProtocolError> {
        let len = self.try_read_u32()? as usize;
        self.ensure_remaining(len)?;
        Ok(self.copy_to_bytes(len))
    }

    fn try_read_string(&mut self) -> Result<String, ProtocolError> {
        let raw = self.try_read_length_prefixed()?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| ProtocolError::invalid_encoding(format!("string is not valid UTF-8: {}", e)))
    }
}

pub trait BufMutExt: BufMut {
    fn put_length_prefixed(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let len = u32::try_from(data.len())
            .map_err(|_| ProtocolError::Range {
                field_type: "length prefix",
                value: data.len() as i128,
                max: u32::MAX as u64,
            })?;
        self.put_u32(len);
        self.put_slice(data);
        Ok(())
    }

    fn put_string(&mut self, s: &str) -> Result<(), ProtocolError> {
        self.put_length_prefixed(s.as_bytes())
    }
}

impl <T: Buf> BufExt for T {
}

impl <T: BufMut> BufMutExt for T {
}
