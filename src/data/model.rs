use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ArrayValue – the contents of one dataset
// ---------------------------------------------------------------------------

/// A dynamically-typed n-dimensional array mirroring the common HDF5 dtypes.
///
/// Integer widths are widened to 64 bits. Every string dataset, fixed or
/// variable length, ASCII or UTF-8, is decoded into `Text`. Anything else
/// (compounds such as complex numbers, enums, opaque, array and reference
/// types) is kept as stored bytes in `Raw`. Scalar datasets are 0-d arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Int(ArrayD<i64>),
    UInt(ArrayD<u64>),
    Bool(ArrayD<bool>),
    Text(ArrayD<String>),
    Raw(RawArray),
}

/// Elements of a dataset whose type has no native mapping, exactly as
/// stored: `bytes.len() == element_size * shape.iter().product()`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArray {
    /// Description of the stored datatype.
    pub dtype: String,
    pub shape: Vec<usize>,
    pub element_size: usize,
    pub bytes: Vec<u8>,
}

impl RawArray {
    /// Bytes of the i-th element in row-major order.
    pub fn element(&self, i: usize) -> Option<&[u8]> {
        let start = i.checked_mul(self.element_size)?;
        self.bytes.get(start..start + self.element_size)
    }
}

impl ArrayValue {
    pub fn shape(&self) -> &[usize] {
        match self {
            ArrayValue::Float32(a) => a.shape(),
            ArrayValue::Float64(a) => a.shape(),
            ArrayValue::Int(a) => a.shape(),
            ArrayValue::UInt(a) => a.shape(),
            ArrayValue::Bool(a) => a.shape(),
            ArrayValue::Text(a) => a.shape(),
            ArrayValue::Raw(r) => &r.shape,
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements (1 for a scalar).
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_scalar(&self) -> bool {
        self.ndim() == 0
    }

    /// Short dtype label, numpy style.
    pub fn dtype_name(&self) -> &'static str {
        match self {
            ArrayValue::Float32(_) => "float32",
            ArrayValue::Float64(_) => "float64",
            ArrayValue::Int(_) => "int64",
            ArrayValue::UInt(_) => "uint64",
            ArrayValue::Bool(_) => "bool",
            ArrayValue::Text(_) => "str",
            ArrayValue::Raw(_) => "raw",
        }
    }

    /// Widen a numeric array to `f64`. `None` for bool and text.
    pub fn to_f64(&self) -> Option<ArrayD<f64>> {
        match self {
            ArrayValue::Float32(a) => Some(a.mapv(f64::from)),
            ArrayValue::Float64(a) => Some(a.clone()),
            ArrayValue::Int(a) => Some(a.mapv(|v| v as f64)),
            ArrayValue::UInt(a) => Some(a.mapv(|v| v as f64)),
            ArrayValue::Bool(_) | ArrayValue::Text(_) | ArrayValue::Raw(_) => None,
        }
    }

    /// Interpret a scalar (or single-element) numeric array as an `f64`.
    pub fn scalar_f64(&self) -> Option<f64> {
        if self.len() != 1 {
            return None;
        }
        match self {
            ArrayValue::Float32(a) => a.iter().next().map(|v| f64::from(*v)),
            ArrayValue::Float64(a) => a.iter().next().copied(),
            ArrayValue::Int(a) => a.iter().next().map(|v| *v as f64),
            ArrayValue::UInt(a) => a.iter().next().map(|v| *v as f64),
            ArrayValue::Bool(_) | ArrayValue::Text(_) | ArrayValue::Raw(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&ArrayD<String>> {
        match self {
            ArrayValue::Text(a) => Some(a),
            _ => None,
        }
    }

    /// Flatten a text array into a `Vec<String>` in logical (row-major) order.
    pub fn to_text_vec(&self) -> Option<Vec<String>> {
        self.as_text().map(|a| a.iter().cloned().collect())
    }

    /// Render every element as a label, numpy `astype('U')` style: text as
    /// is, numbers in their shortest form, booleans as `True`/`False`.
    /// `None` for raw values.
    pub fn to_label_vec(&self) -> Option<Vec<String>> {
        match self {
            ArrayValue::Text(a) => Some(a.iter().cloned().collect()),
            ArrayValue::Float32(a) => Some(a.iter().map(|v| format!("{v:?}")).collect()),
            ArrayValue::Float64(a) => Some(a.iter().map(|v| format!("{v:?}")).collect()),
            ArrayValue::Int(a) => Some(a.iter().map(i64::to_string).collect()),
            ArrayValue::UInt(a) => Some(a.iter().map(u64::to_string).collect()),
            ArrayValue::Bool(a) => Some(
                a.iter()
                    .map(|b| if *b { "True" } else { "False" }.to_string())
                    .collect(),
            ),
            ArrayValue::Raw(_) => None,
        }
    }
}

impl fmt::Display for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArrayValue::Raw(r) => format!("raw({})", r.dtype),
            other => other.dtype_name().to_string(),
        };
        if self.is_scalar() {
            write!(f, "{name} scalar")
        } else {
            write!(f, "{name}{:?}", self.shape())
        }
    }
}

// ---------------------------------------------------------------------------
// Continuous data
// ---------------------------------------------------------------------------

/// Acquisition metadata stored alongside a waveform array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMetadata {
    pub stations: Vec<String>,
    pub components: Vec<String>,
    /// Start of the recording.
    pub date: DateTime<Utc>,
    /// Samples per second.
    pub sampling_rate: f64,
}

/// Metadata plus the continuous waveforms, conventionally shaped
/// stations × components × samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBundle {
    pub metadata: StationMetadata,
    pub waveforms: ArrayD<f64>,
}

impl DataBundle {
    pub fn n_stations(&self) -> Option<usize> {
        self.axis_len(0)
    }

    pub fn n_components(&self) -> Option<usize> {
        self.axis_len(1)
    }

    pub fn n_samples(&self) -> Option<usize> {
        self.axis_len(2)
    }

    /// Length of the recording in seconds, when the layout is 3-d.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.n_samples().map(|n| n as f64 / self.metadata.sampling_rate)
    }

    fn axis_len(&self, axis: usize) -> Option<usize> {
        let shape = self.waveforms.shape();
        if shape.len() == 3 {
            Some(shape[axis])
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Every top-level dataset of a template file, by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateBundle {
    pub entries: BTreeMap<String, ArrayValue>,
}

impl TemplateBundle {
    pub fn get(&self, key: &str) -> Option<&ArrayValue> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Detections
// ---------------------------------------------------------------------------

/// Detections of one template, read from a paired meta/wav file set.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBundle {
    pub event_id: String,
    pub stations: Vec<String>,
    pub components: Vec<String>,
    /// Every dataset of the identifier's metadata group, including
    /// `stations` and `components` as text.
    pub metadata: BTreeMap<String, ArrayValue>,
    pub waveforms: ArrayD<f64>,
}

impl DetectionBundle {
    /// Number of detections, i.e. the length of the first waveform axis.
    pub fn n_detections(&self) -> usize {
        self.waveforms.shape().first().copied().unwrap_or(0)
    }
}
