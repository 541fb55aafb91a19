//! Build class-weight matrices and persist them as serialized blobs.
//!
//! The weight file convention is a (1, 1, L, L) blob holding the L×L matrix
//! that carries one weight per class on its diagonal and zeros elsewhere.

use std::{fs, io, path::Path};

use ndarray::{Array2, ErrorKind, ShapeError};

use crate::{
    blob::{Blob, BlobError},
    matrix::MatrixTools,
};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("building the weight tensor failed: {0}")]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error("blob file access failed: {0}")]
    Io(#[from] io::Error),
}

/// The class-weight blob for `diagonal`: the matrix with the given values on
/// its diagonal, wrapped in a (1, 1, L, L) shape. An empty slice yields the
/// valid degenerate (1, 1, 0, 0) blob.
pub fn diagonal_blob(diagonal: &[f32]) -> Result<Blob, WriteError> {
    let side = diagonal.len();
    let matrix = Array2::scaled_identity(diagonal);
    let tensor = matrix.into_shape((1, 1, side, side))?;
    Ok(Blob::from_array(&tensor))
}

/// Serialize the class-weight blob for `diagonal` into the file at `path`,
/// replacing whatever the file held before. The file handle is closed on
/// every exit path; errors are passed through unchanged and nothing is
/// retried.
pub fn write_diagonal_blob<P: AsRef<Path>>(
    path: P,
    diagonal: &[f32],
) -> Result<(), WriteError> {
    let bytes = diagonal_blob(diagonal)?.to_bytes()?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Read a weight file back into its L×L matrix. Accepts any blob whose
/// leading dimensions are all 1.
pub fn read_diagonal_blob<P: AsRef<Path>>(path: P) -> Result<Array2<f32>, WriteError> {
    let blob = Blob::from_bytes(&fs::read(path)?)?;
    let split = blob.shape.len().saturating_sub(2);
    let (leading, plane) = blob.shape.split_at(split);
    let [rows, cols] = plane else {
        return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
    };
    let (Ok(rows), Ok(cols)) = (usize::try_from(*rows), usize::try_from(*cols)) else {
        return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
    };
    if leading.iter().any(|&dim| dim != 1) {
        return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
    }
    Ok(Array2::from_vec_with_shape(blob.data, (rows, cols))?)
}
