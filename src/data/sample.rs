//! Synthetic file set written with the same keys the loaders read.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hdf5::types::{FixedAscii, VarLenUnicode};
use hdf5::{File, Group, H5Type};
use log::info;
use ndarray::{Array, Array1, Array2, Array3, Array4, Dimension};

use super::loader::{detection_path, DETECTION_META_SUFFIX, DETECTION_WAV_SUFFIX};

pub const STATIONS: [&str; 3] = ["ST01", "ST02", "ST03"];
pub const COMPONENTS: [&str; 3] = ["N", "E", "Z"];
pub const START_DATE: &str = "2012-07-26T00:00:00.000000Z";
pub const SAMPLING_RATE: f64 = 50.0;
pub const TEMPLATE_ID: u32 = 1;

const N_SAMPLES: usize = 3000;
const TEMPLATE_SAMPLES: usize = 200;
const N_DETECTIONS: usize = 4;

/// Paths of a written sample set.
#[derive(Debug, Clone)]
pub struct SampleSet {
    pub data: PathBuf,
    pub template: PathBuf,
    pub cc_sum: PathBuf,
    pub detections_meta: PathBuf,
    pub detections_wav: PathBuf,
    /// Prefix to pass to `load_detections`.
    pub detection_prefix: String,
}

/// Write a small continuous-data / template / detection set under `dir`.
///
/// Layout: `dir/data.h5`, `dir/template_1.h5`, and under `dir/output/`
/// `cc_sum_1.h5` plus the `detections_1_meta.h5` / `detections_1_wav.h5`
/// pair.
pub fn write_sample_set(dir: &Path) -> Result<SampleSet> {
    let output_dir = dir.join("output");
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let mut rng = NoiseRng::seeded(42);
    let waveforms = continuous_waveforms(&mut rng);

    let data = dir.join("data.h5");
    write_data_file(&data, &waveforms)?;

    let template = dir.join(format!("template_{TEMPLATE_ID}.h5"));
    write_template_file(&template, &waveforms)?;

    let cc_sum = output_dir.join(format!("cc_sum_{TEMPLATE_ID}.h5"));
    write_cc_file(&cc_sum, &mut rng)?;

    let detection_prefix = format!("detections_{TEMPLATE_ID}_");
    let detections_meta = detection_path(&output_dir, &detection_prefix, DETECTION_META_SUFFIX);
    let detections_wav = detection_path(&output_dir, &detection_prefix, DETECTION_WAV_SUFFIX);
    write_detection_files(&detections_meta, &detections_wav, &waveforms)?;

    info!("Wrote sample set to {}", dir.display());
    Ok(SampleSet {
        data,
        template,
        cc_sum,
        detections_meta,
        detections_wav,
        detection_prefix,
    })
}

// ---------------------------------------------------------------------------
// File writers
// ---------------------------------------------------------------------------

fn write_data_file(path: &Path, waveforms: &Array3<f32>) -> Result<()> {
    let file = create(path)?;
    write_station_labels(&file)?;
    write_scalar(&file, "date", &START_DATE.parse::<VarLenUnicode>()?)?;
    write_scalar(&file, "sampling_rate", &SAMPLING_RATE)?;
    write_array(&file, "waveforms", waveforms)?;
    info!("Wrote {} ({:?})", path.display(), waveforms.shape());
    Ok(())
}

fn write_template_file(path: &Path, waveforms: &Array3<f32>) -> Result<()> {
    let file = create(path)?;
    let (template, moveouts) = template_window(waveforms);
    write_station_labels(&file)?;
    write_scalar(&file, "sampling_rate", &SAMPLING_RATE)?;
    write_scalar(&file, "latitude", &42.6)?;
    write_scalar(&file, "longitude", &13.2)?;
    write_scalar(&file, "depth", &9.5)?;
    write_array(&file, "moveouts", &moveouts)?;
    write_array(&file, "waveforms", &template)?;
    info!("Wrote {} ({:?})", path.display(), template.shape());
    Ok(())
}

fn write_cc_file(path: &Path, rng: &mut NoiseRng) -> Result<()> {
    let file = create(path)?;
    let n_corr = N_SAMPLES - TEMPLATE_SAMPLES;
    let mut cc: Array1<f32> = (0..n_corr).map(|_| rng.noise(0.05) as f32).collect();
    for k in 0..N_DETECTIONS {
        cc[detection_sample(k)] = 0.8 - 0.1 * k as f32;
    }
    write_array(&file, "cc_sum", &cc)?;
    info!("Wrote {} ({n_corr} correlation samples)", path.display());
    Ok(())
}

fn write_detection_files(meta: &Path, wav: &Path, waveforms: &Array3<f32>) -> Result<()> {
    let id = TEMPLATE_ID.to_string();

    let meta_file = create(meta)?;
    let group = meta_file
        .create_group(&id)
        .with_context(|| format!("creating group {id}"))?;
    write_station_labels(&group)?;
    let origin_times: Array1<f64> = (0..N_DETECTIONS)
        .map(|k| detection_sample(k) as f64 / SAMPLING_RATE)
        .collect();
    let cc: Array1<f32> = (0..N_DETECTIONS).map(|k| 0.8 - 0.1 * k as f32).collect();
    write_array(&group, "origin_times", &origin_times)?;
    write_array(&group, "correlation_coefficients", &cc)?;

    let wav_file = create(wav)?;
    let group = wav_file
        .create_group(&id)
        .with_context(|| format!("creating group {id}"))?;
    let (ns, nc, _) = waveforms.dim();
    let mut snippets = Array4::<f32>::zeros((N_DETECTIONS, ns, nc, TEMPLATE_SAMPLES));
    for k in 0..N_DETECTIONS {
        let start = detection_sample(k);
        let window = waveforms.slice(ndarray::s![.., .., start..start + TEMPLATE_SAMPLES]);
        snippets
            .index_axis_mut(ndarray::Axis(0), k)
            .assign(&window);
    }
    write_array(&group, "waveforms", &snippets)?;

    info!(
        "Wrote {N_DETECTIONS} detections to {} / {}",
        meta.display(),
        wav.display()
    );
    Ok(())
}

// -- HDF5 helpers --

fn create(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("creating {}", path.display()))
}

fn write_array<T: H5Type, D: Dimension>(
    group: &Group,
    name: &str,
    data: &Array<T, D>,
) -> Result<()> {
    group
        .new_dataset_builder()
        .with_data(data)
        .create(name)
        .with_context(|| format!("writing '{name}'"))?;
    Ok(())
}

fn write_scalar<T: H5Type>(group: &Group, name: &str, value: &T) -> Result<()> {
    group
        .new_dataset::<T>()
        .shape(())
        .create(name)
        .and_then(|ds| ds.write_scalar(value))
        .with_context(|| format!("writing '{name}'"))
}

/// Fixed-length byte strings, the layout numpy `S` arrays produce.
fn write_station_labels(group: &Group) -> Result<()> {
    write_array(group, "stations", &ascii_array(&STATIONS)?)?;
    write_array(group, "components", &ascii_array(&COMPONENTS)?)
}

fn ascii_array(items: &[&str]) -> Result<Array1<FixedAscii<8>>> {
    items
        .iter()
        .map(|s| {
            FixedAscii::<8>::from_ascii(s.as_bytes())
                .with_context(|| format!("'{s}' is not a short ASCII label"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Synthetic signals
// ---------------------------------------------------------------------------

/// Sample index of the k-th synthetic event.
fn detection_sample(k: usize) -> usize {
    400 + k * 600
}

/// Bell-shaped envelope of an event wavelet peaking at `onset` seconds.
fn envelope(time: f64, onset: f64, width: f64, amplitude: f64) -> f64 {
    amplitude * (-(time - onset).powi(2) / (2.0 * width.powi(2))).exp()
}

/// Noise plus a repeating 5 Hz wavelet at each detection time, delayed
/// by station.
fn continuous_waveforms(rng: &mut NoiseRng) -> Array3<f32> {
    let mut out = Array3::<f32>::zeros((STATIONS.len(), COMPONENTS.len(), N_SAMPLES));
    for ((s, c, t), v) in out.indexed_iter_mut() {
        let time = t as f64 / SAMPLING_RATE;
        let signal: f64 = (0..N_DETECTIONS)
            .map(|k| {
                let onset = (detection_sample(k) + 10 * s) as f64 / SAMPLING_RATE + 1.0;
                let amp = 1.0 / (1.0 + c as f64);
                let carrier = (2.0 * std::f64::consts::PI * 5.0 * time).sin();
                envelope(time, onset, 0.3, amp) * carrier
            })
            .sum();
        *v = (signal + rng.noise(0.02)) as f32;
    }
    out
}

/// Cut the first event as the template and record per-channel moveouts.
fn template_window(waveforms: &Array3<f32>) -> (Array3<f32>, Array2<i32>) {
    let start = detection_sample(0);
    let template = waveforms
        .slice(ndarray::s![.., .., start..start + TEMPLATE_SAMPLES])
        .to_owned();
    let moveouts = Array2::from_shape_fn((STATIONS.len(), COMPONENTS.len()), |(s, _)| {
        (10 * s) as i32
    });
    (template, moveouts)
}

/// Deterministic source of background noise for the synthetic traces and
/// the cc_sum floor, so every generated file set is byte-identical.
/// xoshiro256** seeded through an LCG.
struct NoiseRng {
    state: [u64; 4],
}

impl NoiseRng {
    fn seeded(seed: u64) -> Self {
        let mut state = [0u64; 4];
        let mut x = seed;
        for word in &mut state {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *word = x;
        }
        NoiseRng { state }
    }

    fn next_u64(&mut self) -> u64 {
        let [s0, s1, s2, s3] = &mut self.state;
        let result = s1.wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = *s1 << 17;
        *s2 ^= *s0;
        *s3 ^= *s1;
        *s1 ^= *s2;
        *s0 ^= *s3;
        *s2 ^= t;
        *s3 = s3.rotate_left(45);
        result
    }

    /// Uniform in [0, 1).
    fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Zero-mean normal noise sample (Box-Muller).
    fn noise(&mut self, std_dev: f64) -> f64 {
        let u1 = self.uniform().max(1e-15);
        let u2 = self.uniform();
        std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}
