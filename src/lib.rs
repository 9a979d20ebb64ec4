//! Loaders for matched-filter HDF5 files: continuous waveforms with their
//! station metadata, templates, cross-correlation sums, and detections.
//!
//! ```no_run
//! let data = fmf_data::load_data("data.h5", fmf_data::DEFAULT_DATA_DIR)?;
//! println!("{:?} at {} Hz", data.metadata.stations, data.metadata.sampling_rate);
//!
//! let det = fmf_data::load_detections("detections_1_", 1, fmf_data::DEFAULT_OUTPUT_DIR)?;
//! println!("{} detections", det.n_detections());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod data;
pub mod error;

pub use config::{LoaderConfig, DEFAULT_DATA_DIR, DEFAULT_OUTPUT_DIR};
pub use data::loader::{load_cc, load_data, load_detections, load_template, Loader};
pub use data::model::{
    ArrayValue, DataBundle, DetectionBundle, RawArray, StationMetadata, TemplateBundle,
};
pub use error::LoadError;
