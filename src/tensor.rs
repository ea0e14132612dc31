//! Typed batch tensors consumed by meters
//!
//! Meters never compute gradients; they only need to know the element type,
//! the shape, and how to reduce per-class scores to a class index. `Tensor`
//! keeps exactly that much of a numeric array.

use ndarray::{Array1, Array2, ArrayD, Axis};

/// Batch tensor with either integer class indices or floating point scores
#[derive(Clone, Debug, PartialEq)]
pub enum Tensor {
    /// Integer tensor (class indices)
    Int(ArrayD<i64>),
    /// Floating point tensor (probabilities, logits, binary scores)
    Float(ArrayD<f32>),
}

impl Tensor {
    /// Create a rank-1 tensor of class indices
    pub fn from_indices(data: Vec<i64>) -> Self {
        Tensor::Int(Array1::from(data).into_dyn())
    }

    /// Create a rank-1 float tensor
    pub fn from_vec(data: Vec<f32>) -> Self {
        Tensor::Float(Array1::from(data).into_dyn())
    }

    /// Create a rank-2 `[batch, classes]` score tensor
    pub fn from_scores(scores: Array2<f32>) -> Self {
        Tensor::Float(scores.into_dyn())
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        match self {
            Tensor::Int(a) => a.ndim(),
            Tensor::Float(a) => a.ndim(),
        }
    }

    /// Shape of the tensor
    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::Int(a) => a.shape(),
            Tensor::Float(a) => a.shape(),
        }
    }

    /// Batch length (size of the first axis, 0 for scalars)
    pub fn len(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    /// Check if the batch is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the element type, used in error messages
    pub fn dtype(&self) -> &'static str {
        match self {
            Tensor::Int(_) => "int64",
            Tensor::Float(_) => "float32",
        }
    }

    /// Whether the elements are integers
    pub fn is_integer(&self) -> bool {
        matches!(self, Tensor::Int(_))
    }

    /// Borrow the integer data, if any
    pub fn as_indices(&self) -> Option<&ArrayD<i64>> {
        match self {
            Tensor::Int(a) => Some(a),
            Tensor::Float(_) => None,
        }
    }

    /// Elements as `f64`, in logical order
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Tensor::Int(a) => a.iter().map(|&x| x as f64).collect(),
            Tensor::Float(a) => a.iter().map(|&x| f64::from(x)).collect(),
        }
    }

    /// Index of the maximum along the last axis
    ///
    /// The result has one dimension less and is always an integer tensor.
    /// Ties resolve to the first maximum. NaN ranks above every number, so a
    /// lane holding NaN reduces to its first NaN. Returns `None` for scalars
    /// and for a zero-width last axis with rows left to reduce.
    ///
    /// # Example
    ///
    /// ```
    /// use medidor::Tensor;
    /// use ndarray::array;
    ///
    /// let scores = Tensor::from_scores(array![[0.1, 0.7, 0.2], [0.9, 0.05, 0.05]]);
    /// assert_eq!(scores.argmax(), Some(Tensor::from_indices(vec![1, 0])));
    /// ```
    pub fn argmax(&self) -> Option<Tensor> {
        let ndim = self.ndim();
        if ndim == 0 {
            return None;
        }
        let (lanes, width) = self.shape().split_at(ndim - 1);
        if width[0] == 0 && lanes.iter().product::<usize>() > 0 {
            return None;
        }
        let axis = Axis(ndim - 1);
        let reduced = match self {
            Tensor::Int(a) => a.map_axis(axis, |lane| first_max(lane.iter().copied())),
            Tensor::Float(a) => a.map_axis(axis, |lane| first_max(lane.iter().copied())),
        };
        Some(Tensor::Int(reduced))
    }
}

fn is_nan<T: PartialOrd>(v: &T) -> bool {
    v.partial_cmp(v).is_none()
}

fn first_max<T: PartialOrd + Copy>(values: impl Iterator<Item = T>) -> i64 {
    let mut best: Option<(usize, T)> = None;
    for (i, v) in values.enumerate() {
        let better = match best {
            None => true,
            Some((_, b)) => !is_nan(&b) && (is_nan(&v) || v > b),
        };
        if better {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i as i64).unwrap_or(0)
}
