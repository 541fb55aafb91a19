// the matrix construction operations we need, kept behind a trait so the
// backing implementation stays exchangeable

pub trait MatrixTools<T> {
    type Error;

    fn from_vec_with_shape(
        vec: Vec<T>,
        shape: (usize, usize),
    ) -> Result<Self, Self::Error>
    where
        Self: Sized;

    /// The L×L identity with its diagonal overwritten, index for index, by
    /// the given values; L is the number of values.
    fn scaled_identity(diagonal: &[T]) -> Self
    where
        Self: Sized;
}

pub mod ndarray;
