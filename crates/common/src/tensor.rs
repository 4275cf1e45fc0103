//! Tensor values exchanged with runners
//!
//! A `Tensor` is a dynamically-shaped `ndarray` array tagged with its
//! element type. Inputs and outputs of a model are maps from names to tensors.

use std::collections::HashMap;
use anyhow::Result;
use ndarray::ArrayD;

use crate::error::Error;
use crate::types::DataType;

/// Named tensors passed to or returned from a model
pub type TensorMap = HashMap<String, Tensor>;

macro_rules! tensor_types {
    ($(($variant:ident, $ty:ty, $accessor:ident)),* $(,)?) => {
        /// A multi-dimensional array of one of the supported element types
        #[derive(Debug, Clone, PartialEq)]
        pub enum Tensor {
            $($variant(ArrayD<$ty>),)*
        }

        impl Tensor {
            /// Element type of this tensor
            pub fn dtype(&self) -> DataType {
                match self {
                    $(Tensor::$variant(_) => DataType::$variant,)*
                }
            }

            /// Dimensions of this tensor
            pub fn shape(&self) -> &[usize] {
                match self {
                    $(Tensor::$variant(a) => a.shape(),)*
                }
            }

            /// Number of elements
            pub fn len(&self) -> usize {
                match self {
                    $(Tensor::$variant(a) => a.len(),)*
                }
            }

            $(
                #[doc = concat!("Borrows the array if this is a `", stringify!($variant), "` tensor")]
                pub fn $accessor(&self) -> Option<&ArrayD<$ty>> {
                    match self {
                        Tensor::$variant(a) => Some(a),
                        _ => None,
                    }
                }
            )*
        }

        $(
            impl From<ArrayD<$ty>> for Tensor {
                fn from(array: ArrayD<$ty>) -> Self {
                    Tensor::$variant(array)
                }
            }
        )*
    };
}

tensor_types! {
    (Float16, half::f16, as_f16),
    (Float32, f32, as_f32),
    (Float64, f64, as_f64),
    (Int8, i8, as_i8),
    (Int16, i16, as_i16),
    (Int32, i32, as_i32),
    (Int64, i64, as_i64),
    (Uint8, u8, as_u8),
    (Uint16, u16, as_u16),
    (Uint32, u32, as_u32),
    (Uint64, u64, as_u64),
    (String, String, as_string),
}

impl Tensor {
    /// Returns true if the tensor has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero-filled tensor of the given type and shape
    pub fn zeros(dtype: DataType, shape: &[usize]) -> Result<Self> {
        Self::filled(dtype, shape, |_| 0.0)
    }

    /// Tensor whose elements count up from zero in row-major order
    ///
    /// Fails if the largest index is not representable in `dtype`.
    pub fn arange(dtype: DataType, shape: &[usize]) -> Result<Self> {
        let numel = element_count(shape)?;
        if let Some(max) = largest_exact_value(dtype) {
            if numel > 0 && (numel - 1) as f64 > max {
                return Err(Error::InvalidArgument(format!(
                    "arange over {} elements does not fit in {}",
                    numel, dtype
                ))
                .into());
            }
        }
        Self::filled(dtype, shape, |i| i as f64)
    }

    /// Tensor filled element by element from a row-major index
    ///
    /// Numeric values are cast to the element type with `as` semantics, so
    /// out-of-range values saturate. String tensors receive the decimal
    /// rendering of the value.
    pub fn filled(dtype: DataType, shape: &[usize], f: impl Fn(usize) -> f64) -> Result<Self> {
        let numel = element_count(shape)?;
        let dim = ndarray::IxDyn(shape);
        macro_rules! build {
            ($variant:ident, $conv:expr) => {{
                let data = (0..numel).map(|i| $conv(f(i))).collect::<Vec<_>>();
                let array = ArrayD::from_shape_vec(dim, data)
                    .map_err(|e| Error::InvalidArgument(format!("shape {:?}: {}", shape, e)))?;
                Tensor::$variant(array)
            }};
        }
        let tensor = match dtype {
            DataType::Float16 => build!(Float16, half::f16::from_f64),
            DataType::Float32 => build!(Float32, |v: f64| v as f32),
            DataType::Float64 => build!(Float64, |v: f64| v),
            DataType::Int8 => build!(Int8, |v: f64| v as i8),
            DataType::Int16 => build!(Int16, |v: f64| v as i16),
            DataType::Int32 => build!(Int32, |v: f64| v as i32),
            DataType::Int64 => build!(Int64, |v: f64| v as i64),
            DataType::Uint8 => build!(Uint8, |v: f64| v as u8),
            DataType::Uint16 => build!(Uint16, |v: f64| v as u16),
            DataType::Uint32 => build!(Uint32, |v: f64| v as u32),
            DataType::Uint64 => build!(Uint64, |v: f64| v as u64),
            DataType::String => build!(String, |v: f64| v.to_string()),
        };
        Ok(tensor)
    }
}

/// Number of elements in `shape`, rejecting shapes whose size overflows
fn element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .filter(|&n| n <= isize::MAX as usize)
        .ok_or_else(|| Error::InvalidArgument(format!("shape {:?} has too many elements", shape)).into())
}

/// Largest integer a dtype holds exactly, `None` when the question does not apply
fn largest_exact_value(dtype: DataType) -> Option<f64> {
    match dtype {
        DataType::Float16 => Some(2048.0),
        DataType::Int8 => Some(i8::MAX as f64),
        DataType::Int16 => Some(i16::MAX as f64),
        DataType::Int32 => Some(i32::MAX as f64),
        DataType::Uint8 => Some(u8::MAX as f64),
        DataType::Uint16 => Some(u16::MAX as f64),
        DataType::Uint32 => Some(u32::MAX as f64),
        DataType::Float32 | DataType::Float64 | DataType::Int64 | DataType::Uint64 | DataType::String => None,
    }
}
