// This implementation just calls basic ndarray methods; we care about
// correctness here, not about performance.

use ndarray::{Array2, LinalgScalar};

use super::MatrixTools;

impl<T> MatrixTools<T> for Array2<T>
where
    T: LinalgScalar,
{
    type Error = ndarray::ShapeError;

    fn from_vec_with_shape(
        vec: Vec<T>,
        shape: (usize, usize),
    ) -> Result<Self, Self::Error> {
        Array2::from_shape_vec(shape, vec)
    }

    fn scaled_identity(diagonal: &[T]) -> Self {
        let mut matrix = Array2::eye(diagonal.len());
        for (entry, value) in matrix.diag_mut().iter_mut().zip(diagonal) {
            *entry = *value;
        }
        matrix
    }
}
