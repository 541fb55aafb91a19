use ndarray::ArrayViewD;
use serde::{Deserialize, Serialize};

use super::{class_layout, predicted_class, MetricError};

/// Image-averaged intersection-over-union plus the per-class breakdown.
///
/// `per_class[c]` is the IoU of class `c` averaged over the images in which
/// the class participated (occurred in the ground truth or was predicted);
/// classes that never participated report 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IouSummary {
    pub mean: f32,
    pub per_class: Vec<f32>,
}

/// Intersection-over-union of argmax predictions against ground-truth
/// labels.
///
/// Differs from [`MeanIu`](super::MeanIu) in which classes enter an image's
/// average: here a class participates as soon as its union is non-empty,
/// i.e. also when it only ever shows up as a false prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionOverUnion {
    /// prediction axis that enumerates the classes; negative values count
    /// from the last axis
    pub axis: isize,
    /// label value whose pixels are left out of the statistics
    pub ignore_label: Option<i32>,
}

impl Default for IntersectionOverUnion {
    fn default() -> Self {
        Self { axis: 1, ignore_label: None }
    }
}

impl IntersectionOverUnion {
    pub fn evaluate(
        &self,
        predictions: ArrayViewD<'_, f32>,
        labels: ArrayViewD<'_, f32>,
    ) -> Result<IouSummary, MetricError> {
        let layout = class_layout(predictions.shape(), self.axis)?;
        let slots = layout.outer * layout.inner;
        if labels.len() != slots {
            return Err(MetricError::LabelCount { labels: labels.len(), slots });
        }
        // flatten into row-major order; correctness over performance
        let predictions: Vec<f32> = predictions.iter().copied().collect();
        let labels: Vec<f32> = labels.iter().copied().collect();

        let mut outer_accum = 0.0_f32;
        let mut per_class = vec![0.0_f32; layout.classes];
        let mut appearances = vec![0.0_f32; layout.classes];
        for i in 0..layout.outer {
            let mut intersection = vec![0.0_f32; layout.classes];
            let mut union = vec![0.0_f32; layout.classes];
            for j in 0..layout.inner {
                let label_value = labels[i * layout.inner + j] as i32;
                if self.ignore_label == Some(label_value) {
                    continue;
                }
                let label = label_value as usize;
                debug_assert!(label < layout.classes);
                // the union holds every ground-truth pixel of the class plus
                // every pixel falsely predicted as it; the intersection holds
                // the true predictions
                union[label] += 1.0;
                let predicted = predicted_class(&predictions, &layout, i, j);
                if predicted == label {
                    intersection[label] += 1.0;
                } else {
                    union[predicted] += 1.0;
                }
            }
            let mut inner_accum = 0.0_f32;
            let mut participating = 0.0_f32;
            for class in 0..layout.classes {
                if self.ignore_label == Some(class as i32) {
                    continue;
                }
                if union[class] > 0.0 {
                    appearances[class] += 1.0;
                    participating += 1.0;
                    let iou = intersection[class] / union[class];
                    inner_accum += iou;
                    per_class[class] += iou;
                }
            }
            outer_accum += inner_accum / participating;
        }

        for (accum, count) in per_class.iter_mut().zip(&appearances) {
            if *count > 0.0 {
                *accum /= count;
            }
        }
        Ok(IouSummary {
            mean: outer_accum / layout.outer as f32,
            per_class,
        })
    }
}
