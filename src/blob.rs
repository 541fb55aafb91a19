//! The serialized tensor container used by Caffe tooling: an N-dimensional
//! shape plus row-major `f32` payloads. Encoding matches what the protobuf
//! serializer emits for `BlobProto` (fields in ascending field-number order,
//! empty repeated fields omitted), so the files interoperate with existing
//! consumers. Decoding additionally accepts the deprecated 4-D
//! `num/channels/height/width` fields that older writers produce.

use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn};

use self::wire::WireError;

pub mod wire;

// BlobProto field numbers
const LEGACY_NUM: u64 = 1;
const LEGACY_CHANNELS: u64 = 2;
const LEGACY_HEIGHT: u64 = 3;
const LEGACY_WIDTH: u64 = 4;
const DATA: u64 = 5;
const DIFF: u64 = 6;
const SHAPE: u64 = 7;
// BlobShape field numbers
const DIM: u64 = 1;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlobError {
    #[error("blob shape {shape:?} does not hold {count} data values")]
    CountMismatch { shape: Vec<i64>, count: usize },
    #[error("invalid blob shape {0:?}")]
    InvalidShape(Vec<i64>),
    #[error("diff payload has {diff} values, data has {data}")]
    DiffMismatch { diff: usize, data: usize },
    #[error("packed float payload of {0} bytes is not a multiple of 4")]
    PackedFloatLen(usize),
    #[error("malformed blob message: {0}")]
    Wire(#[from] WireError),
}

/// Number of elements a shape spans, or None for negative/overflowing dims.
fn element_count(shape: &[i64]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |count, &dim| count.checked_mul(usize::try_from(dim).ok()?))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
    pub diff: Option<Vec<f32>>,
}

impl Blob {
    pub fn new(shape: Vec<i64>, data: Vec<f32>) -> Result<Self, BlobError> {
        let count =
            element_count(&shape).ok_or_else(|| BlobError::InvalidShape(shape.clone()))?;
        if data.len() != count {
            return Err(BlobError::CountMismatch { shape, count: data.len() });
        }
        Ok(Self { shape, data, diff: None })
    }

    /// Attach a gradient payload; it has to cover every data value.
    pub fn with_diff(mut self, diff: Vec<f32>) -> Result<Self, BlobError> {
        if diff.len() != self.data.len() {
            return Err(BlobError::DiffMismatch {
                diff: diff.len(),
                data: self.data.len(),
            });
        }
        self.diff = Some(diff);
        Ok(self)
    }

    /// Wrap an array, keeping its logical (row-major) element order.
    pub fn from_array<S, D>(array: &ArrayBase<S, D>) -> Self
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        Self {
            shape: array.shape().iter().map(|&dim| dim as i64).collect(),
            data: array.iter().copied().collect(),
            diff: None,
        }
    }

    pub fn to_array(&self) -> Result<ArrayD<f32>, BlobError> {
        let dims = self
            .shape
            .iter()
            .map(|&dim| {
                usize::try_from(dim).map_err(|_| BlobError::InvalidShape(self.shape.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        ArrayD::from_shape_vec(IxDyn(&dims), self.data.clone()).map_err(|_| {
            BlobError::CountMismatch { shape: self.shape.clone(), count: self.data.len() }
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, BlobError> {
        let count = element_count(&self.shape)
            .ok_or_else(|| BlobError::InvalidShape(self.shape.clone()))?;
        if self.data.len() != count {
            return Err(BlobError::CountMismatch {
                shape: self.shape.clone(),
                count: self.data.len(),
            });
        }

        let mut writer = wire::Writer::new();
        if !self.data.is_empty() {
            writer.packed_f32s(DATA, &self.data);
        }
        if let Some(diff) = &self.diff {
            if diff.len() != self.data.len() {
                return Err(BlobError::DiffMismatch {
                    diff: diff.len(),
                    data: self.data.len(),
                });
            }
            if !diff.is_empty() {
                writer.packed_f32s(DIFF, diff);
            }
        }
        let mut shape = wire::Writer::new();
        if !self.shape.is_empty() {
            shape.packed_i64s(DIM, &self.shape);
        }
        writer.bytes_field(SHAPE, &shape.into_bytes());
        Ok(writer.into_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlobError> {
        let mut reader = wire::Reader::new(bytes);
        let mut shape: Option<Vec<i64>> = None;
        let mut legacy = [0i64; 4];
        let mut data = Vec::new();
        let mut diff = Vec::new();

        while reader.has_more() {
            let (field, wire_type) = reader.read_tag()?;
            match (field, wire_type) {
                (DATA, wire::LEN) => read_packed_f32s(reader.read_bytes()?, &mut data)?,
                (DATA, wire::FIXED32) => data.push(reader.read_f32()?),
                (DIFF, wire::LEN) => read_packed_f32s(reader.read_bytes()?, &mut diff)?,
                (DIFF, wire::FIXED32) => diff.push(reader.read_f32()?),
                (SHAPE, wire::LEN) => {
                    read_shape(reader.read_bytes()?, shape.get_or_insert_with(Vec::new))?;
                }
                (LEGACY_NUM, wire::VARINT) => legacy[0] = reader.read_varint()? as i64,
                (LEGACY_CHANNELS, wire::VARINT) => legacy[1] = reader.read_varint()? as i64,
                (LEGACY_HEIGHT, wire::VARINT) => legacy[2] = reader.read_varint()? as i64,
                (LEGACY_WIDTH, wire::VARINT) => legacy[3] = reader.read_varint()? as i64,
                (_, other) => reader.skip_field(other)?,
            }
        }

        // writers either fill the shape submessage or the deprecated 4-D fields
        let shape = shape.unwrap_or_else(|| legacy.to_vec());
        let blob = Blob::new(shape, data)?;
        if diff.is_empty() { Ok(blob) } else { blob.with_diff(diff) }
    }
}

fn read_packed_f32s(payload: &[u8], values: &mut Vec<f32>) -> Result<(), BlobError> {
    if payload.len() % 4 != 0 {
        return Err(BlobError::PackedFloatLen(payload.len()));
    }
    values.reserve(payload.len() / 4);
    for chunk in payload.chunks_exact(4) {
        values.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(())
}

fn read_shape(payload: &[u8], dims: &mut Vec<i64>) -> Result<(), BlobError> {
    let mut reader = wire::Reader::new(payload);
    while reader.has_more() {
        let (field, wire_type) = reader.read_tag()?;
        match (field, wire_type) {
            (DIM, wire::LEN) => {
                let mut packed = wire::Reader::new(reader.read_bytes()?);
                while packed.has_more() {
                    dims.push(packed.read_varint()? as i64);
                }
            }
            (DIM, wire::VARINT) => dims.push(reader.read_varint()? as i64),
            (_, other) => reader.skip_field(other)?,
        }
    }
    Ok(())
}
