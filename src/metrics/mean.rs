use ndarray::ArrayView1;

/// Arithmetic mean of a vector of per-class performance measures.
///
/// An empty vector yields NaN, the same 0/0 every other aggregation here
/// produces when nothing contributes.
pub fn mean(measures: ArrayView1<'_, f32>) -> f32 {
    measures.sum() / measures.len() as f32
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn averages_the_measures() {
        assert_eq!(mean(array![2.0_f32, 4.0, 6.0].view()), 4.0);
    }

    #[test]
    fn single_measure_passes_through() {
        assert_eq!(mean(array![0.25_f32].view()), 0.25);
    }

    #[test]
    fn empty_input_is_nan() {
        assert!(mean(ndarray::Array1::<f32>::zeros(0).view()).is_nan());
    }
}
