/// Data layer: core types, HDF5 access, and the loaders.
///
/// Architecture:
/// ```text
///  <dir>/<file>.h5
///        │
///        ▼
///   ┌───────────┐
///   │ container │  open read-only, dataset → ArrayValue
///   └───────────┘
///        │
///        ▼
///   ┌───────────┐
///   │  loader   │  data / template / cc_sum / detections
///   └───────────┘   (timestamp: stored date → DateTime<Utc>)
///        │
///        ▼
///   ┌───────────┐
///   │   model   │  DataBundle, TemplateBundle, DetectionBundle
///   └───────────┘
/// ```

pub mod container;
pub mod loader;
pub mod model;
pub mod sample;
pub mod timestamp;
