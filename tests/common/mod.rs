#![allow(dead_code)]

use std::path::Path;
#[allow(unused_imports)]
use std::str::FromStr;

use fmf_data::LoadError;
use hdf5::types::{FixedAscii, FixedUnicode, VarLenUnicode};
use hdf5::{File, Group, H5Type};
use ndarray::{Array, Array1, Dimension};

pub fn create(path: &Path) -> File {
    File::create(path).unwrap_or_else(|e| panic!("creating {}: {e}", path.display()))
}

pub fn write_array<T: H5Type, D: Dimension>(group: &Group, name: &str, data: &Array<T, D>) {
    group
        .new_dataset_builder()
        .with_data(data)
        .create(name)
        .unwrap_or_else(|e| panic!("writing {name}: {e}"));
}

pub fn write_scalar<T: H5Type>(group: &Group, name: &str, value: &T) {
    group
        .new_dataset::<T>()
        .shape(())
        .create(name)
        .and_then(|ds| ds.write_scalar(value))
        .unwrap_or_else(|e| panic!("writing {name}: {e}"));
}

/// numpy `S` style fixed-width byte strings.
pub fn ascii(items: &[&str]) -> Array1<FixedAscii<16>> {
    fixed_ascii::<16>(items)
}

pub fn fixed_ascii<const N: usize>(items: &[&str]) -> Array1<FixedAscii<N>> {
    items
        .iter()
        .map(|s| FixedAscii::<N>::from_ascii(s.as_bytes()).unwrap())
        .collect()
}

/// Fixed-width UTF-8 strings, `N` bytes each.
pub fn fixed_unicode<const N: usize>(items: &[&str]) -> Array1<FixedUnicode<N>> {
    items
        .iter()
        .map(|s| FixedUnicode::<N>::from_str(s).unwrap())
        .collect()
}

/// h5py `str` style variable-length UTF-8 strings.
pub fn unicode(items: &[&str]) -> Array1<VarLenUnicode> {
    items.iter().map(|s| s.parse::<VarLenUnicode>().unwrap()).collect()
}

pub fn vlen(s: &str) -> VarLenUnicode {
    s.parse().unwrap()
}

/// The `LoadError` at the root of a loader failure.
pub fn load_error(err: &anyhow::Error) -> &LoadError {
    err.downcast_ref::<LoadError>()
        .unwrap_or_else(|| panic!("expected a LoadError, got: {err:#}"))
}
