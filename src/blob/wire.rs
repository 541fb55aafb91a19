// Just enough of the proto2 wire format for blob messages: varints, field
// tags, length-delimited payloads, 32-bit scalars. Readers have to accept
// both packed and unpacked encodings of repeated scalar fields, so the
// plumbing for both lives here and the field semantics stay in the parent
// module.

pub const VARINT: u32 = 0;
pub const FIXED64: u32 = 1;
pub const LEN: u32 = 2;
pub const FIXED32: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("message ends in the middle of a field")]
    Truncated,
    #[error("varint does not fit into 64 bits")]
    VarintOverflow,
    #[error("unsupported wire type {0}")]
    UnsupportedWireType(u32),
}

pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn has_more(&self) -> bool {
        self.pos < self.data.len()
    }

    pub(crate) fn read_varint(&mut self) -> Result<u64, WireError> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = *self.data.get(self.pos).ok_or(WireError::Truncated)?;
            self.pos += 1;
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(WireError::VarintOverflow);
            }
        }
    }

    pub(crate) fn read_tag(&mut self) -> Result<(u64, u32), WireError> {
        let varint = self.read_varint()?;
        Ok((varint >> 3, (varint & 0x7) as u32))
    }

    pub(crate) fn read_bytes(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_varint()? as usize;
        if self.data.len() - self.pos < len {
            return Err(WireError::Truncated);
        }
        let result = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(result)
    }

    pub(crate) fn read_f32(&mut self) -> Result<f32, WireError> {
        if self.data.len() - self.pos < 4 {
            return Err(WireError::Truncated);
        }
        let bytes = [
            self.data[self.pos],
            self.data[self.pos + 1],
            self.data[self.pos + 2],
            self.data[self.pos + 3],
        ];
        self.pos += 4;
        Ok(f32::from_le_bytes(bytes))
    }

    fn skip(&mut self, len: usize) -> Result<(), WireError> {
        if self.data.len() - self.pos < len {
            return Err(WireError::Truncated);
        }
        self.pos += len;
        Ok(())
    }

    /// Skip over one field value of the given wire type.
    pub(crate) fn skip_field(&mut self, wire_type: u32) -> Result<(), WireError> {
        match wire_type {
            VARINT => self.read_varint().map(|_| ()),
            FIXED64 => self.skip(8),
            LEN => {
                let len = self.read_varint()? as usize;
                self.skip(len)
            }
            FIXED32 => self.skip(4),
            other => Err(WireError::UnsupportedWireType(other)),
        }
    }
}

pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    fn tag(&mut self, field: u64, wire_type: u32) {
        self.varint(field << 3 | u64::from(wire_type));
    }

    pub(crate) fn bytes_field(&mut self, field: u64, payload: &[u8]) {
        self.tag(field, LEN);
        self.varint(payload.len() as u64);
        self.buf.extend_from_slice(payload);
    }

    pub(crate) fn packed_f32s(&mut self, field: u64, values: &[f32]) {
        self.tag(field, LEN);
        self.varint((values.len() * 4) as u64);
        for value in values {
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    pub(crate) fn packed_i64s(&mut self, field: u64, values: &[i64]) {
        let mut payload = Writer::new();
        for &value in values {
            // negative values take the full ten bytes, like any int64 field
            payload.varint(value as u64);
        }
        self.bytes_field(field, &payload.buf);
    }
}
