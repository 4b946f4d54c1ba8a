use serde::{Deserialize, Serialize};

/// Element type of a [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    U8,
    F32,
}

/// Flat, row-major tensor storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorData {
    U8(Vec<u8>),
    F32(Vec<f32>),
}

impl TensorData {
    pub fn dtype(&self) -> DType {
        match self {
            TensorData::U8(_) => DType::U8,
            TensorData::F32(_) => DType::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorData::U8(v) => v.len(),
            TensorData::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` widened to `f32`.
    pub fn get_f32(&self, i: usize) -> Option<f32> {
        match self {
            TensorData::U8(v) => v.get(i).map(|&x| x as f32),
            TensorData::F32(v) => v.get(i).copied(),
        }
    }
}

/// A dense tensor with an explicit shape.
///
/// Raw dataset records and canonical steps both carry observations as
/// tensors; images are `[H, W, C]`, state vectors are `[N]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: TensorData,
}

/// Number of elements a shape describes, or `None` if it overflows `usize`.
pub fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

impl Tensor {
    /// Returns `None` when the element count does not match the shape.
    pub fn new(shape: Vec<usize>, data: TensorData) -> Option<Self> {
        if checked_numel(&shape) != Some(data.len()) {
            return None;
        }
        Some(Self { shape, data })
    }

    pub fn from_f32(shape: Vec<usize>, values: Vec<f32>) -> Option<Self> {
        Self::new(shape, TensorData::F32(values))
    }

    pub fn from_u8(shape: Vec<usize>, values: Vec<u8>) -> Option<Self> {
        Self::new(shape, TensorData::U8(values))
    }

    /// 1-D `f32` tensor.
    pub fn vector(values: Vec<f32>) -> Self {
        Self {
            shape: vec![values.len()],
            data: TensorData::F32(values),
        }
    }

    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let n = shape.iter().product();
        let data = match dtype {
            DType::U8 => TensorData::U8(vec![0; n]),
            DType::F32 => TensorData::F32(vec![0.0; n]),
        };
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            TensorData::F32(v) => Some(v),
            TensorData::U8(_) => None,
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.data {
            TensorData::U8(v) => Some(v),
            TensorData::F32(_) => None,
        }
    }

    /// True when shape and dtype agree (values are not compared).
    pub fn same_layout(&self, other: &Tensor) -> bool {
        self.shape == other.shape && self.dtype() == other.dtype()
    }
}
