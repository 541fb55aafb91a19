use ndarray::ArrayViewD;

use super::{class_layout, predicted_class, MetricError};

/// Mean intersection-over-union of argmax predictions against ground-truth
/// labels.
///
/// Per image, each class present in the ground truth contributes
/// `tp / (gt + fp)`, its true predictions over the union of its
/// ground-truth pixels and the pixels falsely predicted as it, and the
/// contributions are averaged over those classes. The image scores are then
/// averaged into the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeanIu {
    /// prediction axis that enumerates the classes; negative values count
    /// from the last axis
    pub axis: isize,
    /// label value whose pixels are left out of the statistics
    pub ignore_label: Option<i32>,
}

impl Default for MeanIu {
    fn default() -> Self {
        Self { axis: 1, ignore_label: None }
    }
}

impl MeanIu {
    pub fn evaluate(
        &self,
        predictions: ArrayViewD<'_, f32>,
        labels: ArrayViewD<'_, f32>,
    ) -> Result<f32, MetricError> {
        let layout = class_layout(predictions.shape(), self.axis)?;
        let slots = layout.outer * layout.inner;
        if labels.len() != slots {
            return Err(MetricError::LabelCount { labels: labels.len(), slots });
        }
        // flatten into row-major order; correctness over performance
        let predictions: Vec<f32> = predictions.iter().copied().collect();
        let labels: Vec<f32> = labels.iter().copied().collect();

        let mut outer_accum = 0.0_f32;
        for i in 0..layout.outer {
            let mut true_positives = vec![0.0_f32; layout.classes];
            let mut false_positives = vec![0.0_f32; layout.classes];
            let mut ground_truth = vec![0.0_f32; layout.classes];
            for j in 0..layout.inner {
                let label_value = labels[i * layout.inner + j] as i32;
                if self.ignore_label == Some(label_value) {
                    continue;
                }
                let label = label_value as usize;
                debug_assert!(label < layout.classes);
                ground_truth[label] += 1.0;
                let predicted = predicted_class(&predictions, &layout, i, j);
                if predicted == label {
                    true_positives[label] += 1.0;
                } else {
                    false_positives[predicted] += 1.0;
                }
            }
            let mut inner_accum = 0.0_f32;
            let mut present = 0.0_f32;
            for class in 0..layout.classes {
                if self.ignore_label == Some(class as i32) {
                    continue;
                }
                if ground_truth[class] > 0.0 {
                    present += 1.0;
                    inner_accum += true_positives[class]
                        / (ground_truth[class] + false_positives[class]);
                }
            }
            outer_accum += inner_accum / present;
        }
        Ok(outer_accum / layout.outer as f32)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array3, Array4, ArrayD, IxDyn};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;

    use super::*;

    // two pixels, two classes: pixel 0 is predicted as class 0, pixel 1 as
    // class 1
    fn two_pixel_predictions() -> ArrayD<f32> {
        ArrayD::from_shape_vec(IxDyn(&[1, 2, 1, 2]), vec![0.9, 0.2, 0.1, 0.8])
            .unwrap()
    }

    fn labels(values: &[f32]) -> ArrayD<f32> {
        ArrayD::from_shape_vec(IxDyn(&[1, 1, values.len()]), values.to_vec()).unwrap()
    }

    #[test]
    fn half_right_on_a_single_class() {
        // both pixels are class 0; one is predicted right, one falsely as
        // class 1, so class 0 scores 1 / (2 + 0)
        let metric = MeanIu::default();
        let got = metric
            .evaluate(two_pixel_predictions().view(), labels(&[0.0, 0.0]).view())
            .unwrap();
        assert_eq!(got, 0.5);
    }

    #[test]
    fn absent_classes_do_not_contribute() {
        // both pixels are class 1; class 0 never occurs in the ground truth
        // and stays out of the average even though it was predicted
        let metric = MeanIu::default();
        let got = metric
            .evaluate(two_pixel_predictions().view(), labels(&[1.0, 1.0]).view())
            .unwrap();
        assert_eq!(got, 0.5);
    }

    #[test]
    fn ignored_pixels_are_skipped() {
        let metric = MeanIu { ignore_label: Some(-1), ..Default::default() };
        let got = metric
            .evaluate(two_pixel_predictions().view(), labels(&[0.0, -1.0]).view())
            .unwrap();
        assert_eq!(got, 1.0);
    }

    #[test]
    fn negative_axis_matches_positive_axis() {
        let metric = MeanIu { axis: -3, ..Default::default() };
        let got = metric
            .evaluate(two_pixel_predictions().view(), labels(&[0.0, 0.0]).view())
            .unwrap();
        assert_eq!(got, 0.5);
    }

    #[test]
    fn label_count_mismatch_is_rejected() {
        let metric = MeanIu::default();
        assert_eq!(
            metric.evaluate(two_pixel_predictions().view(), labels(&[0.0]).view()),
            Err(MetricError::LabelCount { labels: 1, slots: 2 })
        );
    }

    #[test]
    fn matches_reference_on_random_spatial_input() {
        let mut rng = Pcg64::seed_from_u64(0x1234_5678);
        let predictions = Array4::from_shape_fn((2, 10, 4, 5), |_| rng.gen::<f32>());
        let labels =
            Array3::from_shape_fn((2, 4, 5), |_| rng.gen_range(0..10) as f32);

        let got = MeanIu::default()
            .evaluate(predictions.view().into_dyn(), labels.view().into_dyn())
            .unwrap();

        assert!((got - reference(&predictions, &labels, None)).abs() < 1e-5);
    }

    #[test]
    fn matches_reference_with_ignored_pixels() {
        let mut rng = Pcg64::seed_from_u64(0x9abc_def0);
        let predictions = Array4::from_shape_fn((2, 10, 4, 5), |_| rng.gen::<f32>());
        let mut labels =
            Array3::from_shape_fn((2, 4, 5), |_| rng.gen_range(0..10) as f32);
        labels[[0, 0, 0]] = -1.0;
        labels[[0, 1, 2]] = -1.0;
        labels[[1, 3, 4]] = -1.0;

        let metric = MeanIu { ignore_label: Some(-1), ..Default::default() };
        let got = metric
            .evaluate(predictions.view().into_dyn(), labels.view().into_dyn())
            .unwrap();

        assert!((got - reference(&predictions, &labels, Some(-1))).abs() < 1e-5);
    }

    // straightforward per-image tallies, written out independently of the
    // flattened-index arithmetic in the implementation
    fn reference(
        predictions: &Array4<f32>,
        labels: &Array3<f32>,
        ignore_label: Option<i32>,
    ) -> f32 {
        let (images, classes, height, width) = predictions.dim();
        let mut sum_iu = 0.0_f32;
        for n in 0..images {
            let mut tp = vec![0.0_f32; classes];
            let mut fp = vec![0.0_f32; classes];
            let mut gt = vec![0.0_f32; classes];
            for h in 0..height {
                for w in 0..width {
                    let label_value = labels[[n, h, w]] as i32;
                    if ignore_label == Some(label_value) {
                        continue;
                    }
                    let label = label_value as usize;
                    gt[label] += 1.0;
                    let mut best = 0;
                    let mut best_value = f32::NEG_INFINITY;
                    for c in 0..classes {
                        if predictions[[n, c, h, w]] > best_value {
                            best_value = predictions[[n, c, h, w]];
                            best = c;
                        }
                    }
                    if best == label {
                        tp[label] += 1.0;
                    } else {
                        fp[best] += 1.0;
                    }
                }
            }
            let mut accum = 0.0_f32;
            let mut present = 0.0_f32;
            for c in 0..classes {
                if gt[c] > 0.0 {
                    present += 1.0;
                    accum += tp[c] / (gt[c] + fp[c]);
                }
            }
            sum_iu += accum / present;
        }
        sum_iu / images as f32
    }
}
