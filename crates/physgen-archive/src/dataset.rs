//! Typed, shaped datasets.

use serde::{Deserialize, Serialize};

use physgen_types::{PhysgenError, PhysgenResult};

/// Flat element storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Data {
    F32(Vec<f32>),
    I32(Vec<i32>),
    Bool(Vec<bool>),
    /// Opaque bytes, e.g. an encoded image.
    Bytes(Vec<u8>),
    Str(Vec<String>),
}

impl Data {
    pub fn len(&self) -> usize {
        match self {
            Data::F32(v) => v.len(),
            Data::I32(v) => v.len(),
            Data::Bool(v) => v.len(),
            Data::Bytes(v) => v.len(),
            Data::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            Data::F32(_) => "f32",
            Data::I32(_) => "i32",
            Data::Bool(_) => "bool",
            Data::Bytes(_) => "bytes",
            Data::Str(_) => "str",
        }
    }
}

/// A dataset: flat data plus an explicit row-major shape.
///
/// The product of `shape` always equals the element count. A scalar has
/// shape `[]`; a zero-row table such as an empty collision list keeps its
/// trailing dimensions, e.g. `[0, 2, 3]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    shape: Vec<usize>,
    data: Data,
}

impl Dataset {
    /// Builds a dataset, checking the shape against the element count.
    pub fn new(shape: Vec<usize>, data: Data) -> PhysgenResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(PhysgenError::Archive(format!(
                "shape {shape:?} expects {expected} elements, got {} {}",
                data.len(),
                data.dtype()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn scalar_f32(v: f32) -> Self {
        Self {
            shape: Vec::new(),
            data: Data::F32(vec![v]),
        }
    }

    pub fn scalar_i32(v: i32) -> Self {
        Self {
            shape: Vec::new(),
            data: Data::I32(vec![v]),
        }
    }

    pub fn scalar_bool(v: bool) -> Self {
        Self {
            shape: Vec::new(),
            data: Data::Bool(vec![v]),
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self {
            shape: Vec::new(),
            data: Data::Str(vec![s.into()]),
        }
    }

    pub fn f32s(values: Vec<f32>) -> Self {
        Self {
            shape: vec![values.len()],
            data: Data::F32(values),
        }
    }

    pub fn i32s(values: Vec<i32>) -> Self {
        Self {
            shape: vec![values.len()],
            data: Data::I32(values),
        }
    }

    pub fn bools(values: Vec<bool>) -> Self {
        Self {
            shape: vec![values.len()],
            data: Data::Bool(values),
        }
    }

    pub fn strings(values: Vec<String>) -> Self {
        Self {
            shape: vec![values.len()],
            data: Data::Str(values),
        }
    }

    pub fn bytes(values: Vec<u8>) -> Self {
        Self {
            shape: vec![values.len()],
            data: Data::Bytes(values),
        }
    }

    /// An f32 table with `cols` values per row.
    pub fn f32_rows(cols: usize, values: Vec<f32>) -> PhysgenResult<Self> {
        let rows = if cols == 0 { 0 } else { values.len() / cols };
        Self::new(vec![rows, cols], Data::F32(values))
    }

    /// An f32 array with an explicit shape.
    pub fn f32_shaped(shape: Vec<usize>, values: Vec<f32>) -> PhysgenResult<Self> {
        Self::new(shape, Data::F32(values))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of rows (first dimension); 1 for scalars.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            Data::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.data {
            Data::I32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<&[bool]> {
        match &self.data {
            Data::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            Data::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match &self.data {
            Data::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Row `i` of an f32 table.
    pub fn f32_row(&self, i: usize) -> Option<&[f32]> {
        let values = self.as_f32()?;
        let width: usize = self.shape.iter().skip(1).product();
        values.get(i * width..(i + 1) * width)
    }
}
