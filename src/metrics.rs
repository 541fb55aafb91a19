//! Evaluation metrics for dense classification: argmax predictions over a
//! class axis, compared against ground-truth label maps.
//!
//! Predictions are N-D score arrays with one axis enumerating the classes;
//! labels store class indices as floats (the convention of the blob files
//! these arrays come from) and cover every prediction slot outside the
//! class axis.

pub mod iou;
pub mod mean;
pub mod mean_iu;

pub use self::iou::{IntersectionOverUnion, IouSummary};
pub use self::mean::mean;
pub use self::mean_iu::MeanIu;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MetricError {
    #[error("class axis {axis} is out of bounds for {ndim} prediction axes")]
    AxisOutOfBounds { axis: isize, ndim: usize },
    #[error("{labels} labels cannot cover {slots} prediction slots")]
    LabelCount { labels: usize, slots: usize },
}

/// How the flattened prediction array splits around the class axis: `outer`
/// images, `classes` scores per pixel, `inner` pixels per image.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ClassLayout {
    pub(crate) outer: usize,
    pub(crate) inner: usize,
    pub(crate) classes: usize,
    /// elements per outer slice, i.e. `classes * inner`
    pub(crate) dim: usize,
}

/// Resolve a (possibly negative) class axis against `shape` and split the
/// remaining axes into outer and inner counts.
pub(crate) fn class_layout(shape: &[usize], axis: isize) -> Result<ClassLayout, MetricError> {
    let ndim = shape.len();
    let canonical = if axis < 0 { axis + ndim as isize } else { axis };
    if canonical < 0 || canonical as usize >= ndim {
        return Err(MetricError::AxisOutOfBounds { axis, ndim });
    }
    let canonical = canonical as usize;
    let outer = shape[..canonical].iter().product();
    let classes = shape[canonical];
    let inner = shape[canonical + 1..].iter().product::<usize>();
    Ok(ClassLayout { outer, inner, classes, dim: classes * inner })
}

/// Argmax over the class scores of one pixel; ties go to the lower class.
pub(crate) fn predicted_class(
    scores: &[f32],
    layout: &ClassLayout,
    outer: usize,
    inner: usize,
) -> usize {
    let base = outer * layout.dim + inner;
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for class in 0..layout.classes {
        let value = scores[base + class * layout.inner];
        if value > best_value {
            best_value = value;
            best = class;
        }
    }
    best
}
