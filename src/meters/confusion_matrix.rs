//! Confusion matrix meter
//!
//! `matrix[t][p]` counts the samples with true class `t` predicted as `p`.
//! Counts live in a controller that decides how the matrix is sized:
//!
//! - [`FixedConfusionMatrixController`]: `C×C` known upfront, labels outside
//!   `[0, C)` are rejected
//! - [`ResizableConfusionMatrixController`]: starts at `1×1` and grows to
//!   `max_label + 1` whenever a larger label shows up, keeping prior counts in
//!   place; labels from [`MAX_AUTO_CLASSES`] up are rejected
//!
//! Every check runs before the matrix is touched, so a rejected batch leaves
//! no trace.

use super::batch::Meter;
use crate::error::{Error, Result};
use crate::Tensor;
use ndarray::{s, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backing store of a confusion matrix
pub trait ConfusionMatrixController: fmt::Debug {
    /// Current counts
    fn matrix(&self) -> &Array2<u64>;

    /// Zero every count
    fn reset(&mut self);

    /// Add one count at `matrix[t][p]` for every pair of labels
    ///
    /// Both slices must have the same length. On error the matrix is unchanged.
    fn increment(&mut self, predicted: &[i64], targets: &[i64]) -> Result<()>;

    /// Side length of the matrix
    fn nr_classes(&self) -> usize {
        self.matrix().nrows()
    }
}

fn add_counts(matrix: &mut Array2<u64>, predicted: &[i64], targets: &[i64]) {
    for (&p, &t) in predicted.iter().zip(targets) {
        matrix[[t as usize, p as usize]] += 1;
    }
}

/// Largest side a resizable matrix grows to on its own
///
/// Larger class counts must be given upfront with [`NrClasses::Fixed`].
pub const MAX_AUTO_CLASSES: usize = 1 << 12;

fn zeros(nr_classes: usize) -> Option<Array2<u64>> {
    let cells = nr_classes.checked_mul(nr_classes)?;
    isize::try_from(cells).ok()?;
    Some(Array2::zeros((nr_classes, nr_classes)))
}

fn first_label_outside(labels: &[i64], nr_classes: usize) -> Option<i64> {
    labels
        .iter()
        .copied()
        .find(|&l| l < 0 || l as u64 >= nr_classes as u64)
}

// =============================================================================
// Fixed-size controller
// =============================================================================

/// Confusion matrix with a class count fixed at construction
#[derive(Clone, Debug)]
pub struct FixedConfusionMatrixController {
    matrix: Array2<u64>,
}

impl FixedConfusionMatrixController {
    pub fn new(nr_classes: usize) -> Result<Self> {
        let matrix = (nr_classes > 0)
            .then(|| zeros(nr_classes))
            .flatten()
            .ok_or_else(|| Error::InvalidNrOfClasses {
                nr_classes: nr_classes.to_string(),
            })?;
        Ok(Self { matrix })
    }
}

impl ConfusionMatrixController for FixedConfusionMatrixController {
    fn matrix(&self) -> &Array2<u64> {
        &self.matrix
    }

    fn reset(&mut self) {
        self.matrix.fill(0);
    }

    fn increment(&mut self, predicted: &[i64], targets: &[i64]) -> Result<()> {
        let nr_classes = self.nr_classes();
        if let Some(label) = first_label_outside(predicted, nr_classes)
            .or_else(|| first_label_outside(targets, nr_classes))
        {
            return Err(Error::InvalidLabels { label, nr_classes });
        }
        add_counts(&mut self.matrix, predicted, targets);
        Ok(())
    }
}

// =============================================================================
// Resizable controller
// =============================================================================

/// Confusion matrix that grows as new class labels are observed
#[derive(Clone, Debug)]
pub struct ResizableConfusionMatrixController {
    matrix: Array2<u64>,
}

impl ResizableConfusionMatrixController {
    pub fn new() -> Self {
        Self {
            matrix: Array2::zeros((1, 1)),
        }
    }

    /// Grow to `size×size`, copying the old counts into the top-left block
    fn expand(&mut self, size: usize) {
        let old = self.nr_classes();
        let mut grown = Array2::zeros((size, size));
        grown.slice_mut(s![..old, ..old]).assign(&self.matrix);
        self.matrix = grown;
        log::debug!("confusion matrix resized from {old}x{old} to {size}x{size}");
    }
}

impl Default for ResizableConfusionMatrixController {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfusionMatrixController for ResizableConfusionMatrixController {
    fn matrix(&self) -> &Array2<u64> {
        &self.matrix
    }

    fn reset(&mut self) {
        self.matrix = Array2::zeros((1, 1));
    }

    fn increment(&mut self, predicted: &[i64], targets: &[i64]) -> Result<()> {
        let nr_classes = self.nr_classes();
        if let Some(&label) = predicted.iter().chain(targets).find(|&&l| l < 0) {
            return Err(Error::InvalidLabels { label, nr_classes });
        }

        let Some(max_label) = predicted.iter().chain(targets).copied().max() else {
            return Ok(());
        };
        let Some(max_label) = usize::try_from(max_label)
            .ok()
            .filter(|&l| l < MAX_AUTO_CLASSES)
        else {
            return Err(Error::InvalidLabels {
                label: max_label,
                nr_classes,
            });
        };
        if max_label >= nr_classes {
            self.expand(max_label + 1);
        }

        add_counts(&mut self.matrix, predicted, targets);
        Ok(())
    }
}

// =============================================================================
// Number of classes
// =============================================================================

/// Class count of a confusion matrix: discovered (`"auto"`) or fixed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NrClassesRepr", into = "NrClassesRepr")]
pub enum NrClasses {
    /// Grow as labels are observed
    #[default]
    Auto,
    /// Fixed positive class count
    Fixed(usize),
}

impl NrClasses {
    /// Parse `"auto"` or a positive integer
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "auto" {
            return Ok(NrClasses::Auto);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(NrClasses::Fixed(n)),
            _ => Err(Error::InvalidNrOfClasses {
                nr_classes: s.to_string(),
            }),
        }
    }

    fn controller(self) -> Result<Box<dyn ConfusionMatrixController>> {
        Ok(match self {
            NrClasses::Auto => Box::new(ResizableConfusionMatrixController::new()),
            NrClasses::Fixed(n) => Box::new(FixedConfusionMatrixController::new(n)?),
        })
    }
}

impl FromStr for NrClasses {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for NrClasses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NrClasses::Auto => f.write_str("auto"),
            NrClasses::Fixed(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NrClassesRepr {
    Count(i64),
    Marker(String),
}

impl TryFrom<NrClassesRepr> for NrClasses {
    type Error = Error;

    fn try_from(repr: NrClassesRepr) -> Result<Self> {
        match repr {
            NrClassesRepr::Count(n) if n > 0 => Ok(NrClasses::Fixed(n as usize)),
            NrClassesRepr::Count(n) => Err(Error::InvalidNrOfClasses {
                nr_classes: n.to_string(),
            }),
            NrClassesRepr::Marker(s) => NrClasses::parse(&s),
        }
    }
}

impl From<NrClasses> for NrClassesRepr {
    fn from(n: NrClasses) -> Self {
        match n {
            NrClasses::Auto => NrClassesRepr::Marker("auto".to_string()),
            NrClasses::Fixed(n) => NrClassesRepr::Count(n as i64),
        }
    }
}

// =============================================================================
// Meter
// =============================================================================

/// Confusion matrix meter over predicted and true class labels
///
/// # Example
///
/// ```
/// use medidor::meters::{ConfusionMatrix, Meter, NrClasses};
/// use medidor::Tensor;
///
/// let mut cm = ConfusionMatrix::new(NrClasses::Fixed(3), false).unwrap();
/// cm.measure(&Tensor::from_indices(vec![0, 1, 2]), &Tensor::from_indices(vec![0, 1, 2]))
///     .unwrap();
/// let m = cm.value().unwrap();
/// assert_eq!(m.diag().sum(), 3.0);
/// ```
#[derive(Debug)]
pub struct ConfusionMatrix {
    controller: Box<dyn ConfusionMatrixController>,
    normalize: bool,
}

impl ConfusionMatrix {
    pub fn new(nr_classes: NrClasses, normalize: bool) -> Result<Self> {
        Ok(Self {
            controller: nr_classes.controller()?,
            normalize,
        })
    }

    /// Resizable, unnormalized matrix
    pub fn auto() -> Self {
        Self {
            controller: Box::new(ResizableConfusionMatrixController::new()),
            normalize: false,
        }
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    /// Current side length
    pub fn nr_classes(&self) -> usize {
        self.controller.nr_classes()
    }

    /// Raw counts
    pub fn counts(&self) -> &Array2<u64> {
        self.controller.matrix()
    }

    /// Reduce scores to class indices and check the result is `[N]` integers
    fn class_indices(input: &Tensor) -> Result<Vec<i64>> {
        let reduced;
        let input = if input.ndim() == 2 {
            reduced = input.argmax().ok_or(Error::InvalidBatchDimension { dims: 2 })?;
            &reduced
        } else {
            input
        };

        let Some(indices) = input.as_indices() else {
            return Err(Error::InvalidInputType {
                dtype: input.dtype(),
            });
        };
        if indices.ndim() != 1 {
            return Err(Error::InvalidBatchDimension {
                dims: indices.ndim(),
            });
        }
        Ok(indices.iter().copied().collect())
    }
}

impl Meter for ConfusionMatrix {
    type Value = Array2<f64>;

    fn reset(&mut self) {
        self.controller.reset();
    }

    fn measure(&mut self, predictions: &Tensor, targets: &Tensor) -> Result<()> {
        let predicted = Self::class_indices(predictions)?;
        let targets = Self::class_indices(targets)?;

        if predicted.len() != targets.len() {
            return Err(Error::InvalidLengths {
                predictions: predicted.len(),
                targets: targets.len(),
            });
        }

        self.controller.increment(&predicted, &targets)
    }

    /// Copy of the counts, column-normalized when requested
    ///
    /// Columns without any count stay zero.
    fn value(&self) -> Result<Array2<f64>> {
        let mut result = self.controller.matrix().mapv(|c| c as f64);
        if self.normalize {
            for mut column in result.axis_iter_mut(Axis(1)) {
                let sum = column.sum();
                if sum > 0.0 {
                    column /= sum;
                }
            }
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "confusion_matrix"
    }
}
