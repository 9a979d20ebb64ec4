use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hdf5::Group;
use log::{info, warn};
use ndarray::ArrayD;

use super::container;
use super::model::{ArrayValue, DataBundle, DetectionBundle, StationMetadata, TemplateBundle};
use super::timestamp::{parse_timestamp, DEFAULT_TIMESTAMP_FORMATS};
use crate::config::LoaderConfig;
use crate::error::LoadError;

/// File name suffix of the detection metadata half.
pub const DETECTION_META_SUFFIX: &str = "meta.h5";
/// File name suffix of the detection waveform half.
pub const DETECTION_WAV_SUFFIX: &str = "wav.h5";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load continuous data: station/component labels, start date, sampling
/// rate, and the waveform array from `dir/filename`.
///
/// Expected keys: `stations`, `components` (text arrays), `date` (text or
/// POSIX seconds), `sampling_rate` (numeric scalar), `waveforms` (numeric).
pub fn load_data(filename: impl AsRef<Path>, dir: impl AsRef<Path>) -> Result<DataBundle> {
    read_data_bundle(&dir.as_ref().join(filename), DEFAULT_TIMESTAMP_FORMATS)
}

/// Load every top-level dataset of `dir/filename` as-is.
pub fn load_template(filename: impl AsRef<Path>, dir: impl AsRef<Path>) -> Result<TemplateBundle> {
    read_template_bundle(&dir.as_ref().join(filename))
}

/// Load the `cc_sum` array from `dir/filename`.
pub fn load_cc(filename: impl AsRef<Path>, dir: impl AsRef<Path>) -> Result<ArrayD<f64>> {
    read_cc_sum(&dir.as_ref().join(filename))
}

/// Load the detections of one template from the file pair
/// `dir/<prefix>meta.h5` and `dir/<prefix>wav.h5`.
///
/// Both files hold one group per template, named after `event_id`. The
/// metadata group must contain `stations` and `components`; the waveform
/// group must contain `waveforms`.
pub fn load_detections(
    prefix: &str,
    event_id: impl Display,
    dir: impl AsRef<Path>,
) -> Result<DetectionBundle> {
    read_detection_bundle(dir.as_ref(), prefix, &event_id.to_string())
}

// ---------------------------------------------------------------------------
// Configured loader
// ---------------------------------------------------------------------------

/// Loaders bound to the directories and date layouts of a [`LoaderConfig`].
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// [`load_data`] relative to `data_dir`.
    pub fn data(&self, filename: impl AsRef<Path>) -> Result<DataBundle> {
        read_data_bundle(
            &self.config.data_dir.join(filename),
            &self.config.timestamp_formats,
        )
    }

    /// [`load_template`] relative to `data_dir`.
    pub fn template(&self, filename: impl AsRef<Path>) -> Result<TemplateBundle> {
        read_template_bundle(&self.config.data_dir.join(filename))
    }

    /// [`load_cc`] relative to `output_dir`.
    pub fn cc(&self, filename: impl AsRef<Path>) -> Result<ArrayD<f64>> {
        read_cc_sum(&self.config.output_dir.join(filename))
    }

    /// [`load_detections`] relative to `output_dir`.
    pub fn detections(&self, prefix: &str, event_id: impl Display) -> Result<DetectionBundle> {
        read_detection_bundle(&self.config.output_dir, prefix, &event_id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

fn read_data_bundle<S: AsRef<str>>(path: &Path, formats: &[S]) -> Result<DataBundle> {
    let file = container::open(path)?;
    let ctx = || format!("loading data from {}", path.display());

    let stations = read_text_vec(&file, "stations").with_context(ctx)?;
    let components = read_text_vec(&file, "components").with_context(ctx)?;
    let date_value = container::read_value(&file, "date").with_context(ctx)?;
    let date = parse_timestamp(&date_value, formats)
        .context("parsing 'date'")
        .with_context(ctx)?;
    let sampling_rate = read_scalar_f64(&file, "sampling_rate").with_context(ctx)?;
    let waveforms = container::read_f64(&file, "waveforms").with_context(ctx)?;

    let bundle = DataBundle {
        metadata: StationMetadata {
            stations,
            components,
            date,
            sampling_rate,
        },
        waveforms,
    };
    check_layout(&bundle, path);

    info!(
        "Loaded {} stations x {} components starting {} ({} Hz) from {}",
        bundle.metadata.stations.len(),
        bundle.metadata.components.len(),
        bundle.metadata.date,
        bundle.metadata.sampling_rate,
        path.display()
    );
    Ok(bundle)
}

fn read_template_bundle(path: &Path) -> Result<TemplateBundle> {
    let file = container::open(path)?;
    let entries = container::read_all(&file)
        .with_context(|| format!("loading template from {}", path.display()))?;

    info!(
        "Loaded template with keys {:?} from {}",
        entries.keys().collect::<Vec<_>>(),
        path.display()
    );
    Ok(TemplateBundle { entries })
}

fn read_cc_sum(path: &Path) -> Result<ArrayD<f64>> {
    let file = container::open(path)?;
    let cc_sum = container::read_f64(&file, "cc_sum")
        .with_context(|| format!("loading cc_sum from {}", path.display()))?;

    info!("Loaded cc_sum {:?} from {}", cc_sum.shape(), path.display());
    Ok(cc_sum)
}

fn read_detection_bundle(dir: &Path, prefix: &str, event_id: &str) -> Result<DetectionBundle> {
    let meta_path = detection_path(dir, prefix, DETECTION_META_SUFFIX);
    let wav_path = detection_path(dir, prefix, DETECTION_WAV_SUFFIX);

    let metadata = {
        let file = container::open(&meta_path)?;
        let group = container::subgroup(&file, event_id)?;
        container::read_all(&group).with_context(|| {
            format!("loading detection metadata '{event_id}' from {}", meta_path.display())
        })?
    };

    let waveforms = {
        let file = container::open(&wav_path)?;
        let group = container::subgroup(&file, event_id)?;
        container::read_f64(&group, "waveforms").with_context(|| {
            format!("loading detection waveforms '{event_id}' from {}", wav_path.display())
        })?
    };

    let stations = text_entry(&metadata, "stations", &meta_path)?;
    let components = text_entry(&metadata, "components", &meta_path)?;

    let bundle = DetectionBundle {
        event_id: event_id.to_string(),
        stations,
        components,
        metadata,
        waveforms,
    };

    info!(
        "Loaded {} detections for template {event_id} from {} / {}",
        bundle.n_detections(),
        meta_path.display(),
        wav_path.display()
    );
    Ok(bundle)
}

/// `dir/<prefix><suffix>`; the prefix may carry its own sub-directories.
pub fn detection_path(dir: &Path, prefix: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{prefix}{suffix}"))
}

// -- Field helpers --

/// Labels are rendered as text whatever their stored type; numeric station
/// codes become their decimal form.
fn read_text_vec(group: &Group, key: &str) -> Result<Vec<String>> {
    let value = container::read_value(group, key)?;
    value.to_label_vec().ok_or_else(|| {
        LoadError::NotText {
            key: key.to_string(),
            dtype: value.to_string(),
        }
        .into()
    })
}

fn read_scalar_f64(group: &Group, key: &str) -> Result<f64> {
    let value = container::read_value(group, key)?;
    if value.to_f64().is_none() {
        return Err(LoadError::NotNumeric {
            key: key.to_string(),
            dtype: value.to_string(),
        }
        .into());
    }
    value.scalar_f64().ok_or_else(|| {
        LoadError::NotScalar {
            key: key.to_string(),
            shape: value.shape().to_vec(),
        }
        .into()
    })
}

fn text_entry(
    metadata: &BTreeMap<String, ArrayValue>,
    key: &str,
    path: &Path,
) -> Result<Vec<String>> {
    let value = metadata.get(key).ok_or_else(|| LoadError::MissingKey {
        key: key.to_string(),
        path: path.to_path_buf(),
    })?;
    value.to_label_vec().ok_or_else(|| {
        LoadError::NotText {
            key: key.to_string(),
            dtype: value.to_string(),
        }
        .into()
    })
}

/// Nothing is rejected here; odd-looking content is only reported.
fn check_layout(bundle: &DataBundle, path: &Path) {
    let meta = &bundle.metadata;
    if meta.sampling_rate <= 0.0 || !meta.sampling_rate.is_finite() {
        warn!("{}: sampling rate is {}", path.display(), meta.sampling_rate);
    }
    if meta.stations.is_empty() {
        warn!("{}: no stations listed", path.display());
    }
    match (bundle.n_stations(), bundle.n_components()) {
        (Some(ns), Some(nc)) => {
            if ns != meta.stations.len() || nc != meta.components.len() {
                warn!(
                    "{}: waveforms {:?} disagree with {} stations x {} components",
                    path.display(),
                    bundle.waveforms.shape(),
                    meta.stations.len(),
                    meta.components.len()
                );
            }
        }
        _ => warn!(
            "{}: waveforms have shape {:?}, expected stations x components x samples",
            path.display(),
            bundle.waveforms.shape()
        ),
    }
}
