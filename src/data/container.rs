//! Thin read-only layer over the HDF5 binding.
//!
//! Everything here takes a [`Group`] (a `File` derefs to its root group) and
//! returns owned arrays, so handles never outlive the loader call that
//! opened them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use hdf5::types::{FloatSize, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Dataset, Datatype, File, Group, H5Type};
use hdf5_sys::h5d::H5Dread;
use hdf5_sys::h5p::H5P_DEFAULT;
use hdf5_sys::h5s::H5S_ALL;
use hdf5_sys::h5t::{H5Tget_class, H5T_class_t};
use log::debug;
use ndarray::{ArrayD, IxDyn};

use super::model::{ArrayValue, RawArray};
use crate::error::LoadError;

/// Open an existing container read-only.
pub fn open(path: &Path) -> Result<File> {
    if !path.is_file() {
        return Err(LoadError::FileNotFound(path.to_path_buf()).into());
    }
    File::open(path).with_context(|| format!("opening HDF5 file {}", path.display()))
}

/// Look up a child group, failing with [`LoadError::MissingGroup`].
pub fn subgroup(parent: &Group, name: &str) -> Result<Group> {
    if !parent.link_exists(name) {
        return Err(LoadError::MissingGroup {
            group: name.to_string(),
            path: file_path(parent),
        }
        .into());
    }
    parent
        .group(name)
        .with_context(|| format!("'{name}' is not a group"))
}

/// Read one dataset into an [`ArrayValue`], dispatching on its stored type.
///
/// Types without a native variant come back as [`ArrayValue::Raw`]. Only
/// types holding variable-length sequences are refused.
pub fn read_value(group: &Group, key: &str) -> Result<ArrayValue> {
    let ds = dataset(group, key)?;
    let dtype = ds
        .dtype()
        .with_context(|| format!("reading datatype of '{key}'"))?;

    let descriptor = match dtype.to_descriptor() {
        Ok(descriptor) => descriptor,
        Err(_) => {
            // opaque, bitfield and time classes have no descriptor
            let class = type_class(&dtype);
            debug!("reading '{key}' {:?} as raw {class}", ds.shape());
            return read_raw(&ds, &dtype, class).map(ArrayValue::Raw);
        }
    };
    debug!("reading '{key}' {:?} as {descriptor:?}", ds.shape());

    let value = match &descriptor {
        TypeDescriptor::Float(FloatSize::U4) => ArrayValue::Float32(ds.read_dyn()?),
        TypeDescriptor::Float(_) => ArrayValue::Float64(ds.read_dyn()?),
        TypeDescriptor::Integer(_) => ArrayValue::Int(ds.read_dyn()?),
        TypeDescriptor::Unsigned(_) => ArrayValue::UInt(ds.read_dyn()?),
        TypeDescriptor::Boolean => ArrayValue::Bool(ds.read_dyn()?),
        TypeDescriptor::VarLenAscii => ArrayValue::Text(read_text(&ds, VarLenAscii::as_str)?),
        TypeDescriptor::VarLenUnicode => {
            ArrayValue::Text(read_text(&ds, VarLenUnicode::as_str)?)
        }
        TypeDescriptor::FixedAscii(_) | TypeDescriptor::FixedUnicode(_) => {
            ArrayValue::Text(read_fixed_text(&ds, &dtype)?)
        }
        other if has_varlen(other) => {
            return Err(LoadError::UnsupportedType {
                key: key.to_string(),
                dtype: format!("{other:?}"),
            }
            .into())
        }
        other => ArrayValue::Raw(read_raw(&ds, &dtype, format!("{other:?}"))?),
    };
    Ok(value)
}

/// Read a numeric dataset as `f64`, letting HDF5 convert the element type.
pub fn read_f64(group: &Group, key: &str) -> Result<ArrayD<f64>> {
    let ds = dataset(group, key)?;
    debug!("reading '{key}' {:?} as f64", ds.shape());
    ds.read_dyn::<f64>()
        .with_context(|| format!("reading '{key}' as float64"))
}

/// Read every member of `group` as a dataset, keyed by name.
pub fn read_all(group: &Group) -> Result<BTreeMap<String, ArrayValue>> {
    let names = group
        .member_names()
        .with_context(|| format!("listing members of {}", group.name()))?;

    names
        .into_iter()
        .map(|name| {
            let value = read_value(group, &name)?;
            Ok((name, value))
        })
        .collect()
}

fn dataset(group: &Group, key: &str) -> Result<Dataset> {
    if !group.link_exists(key) {
        return Err(LoadError::MissingKey {
            key: key.to_string(),
            path: file_path(group),
        }
        .into());
    }
    group
        .dataset(key)
        .with_context(|| format!("'{key}' in {} is not a dataset", group.name()))
}

fn read_text<T, F>(ds: &Dataset, as_str: F) -> Result<ArrayD<String>>
where
    T: H5Type,
    F: Fn(&T) -> &str,
{
    let raw = ds.read_dyn::<T>()?;
    Ok(raw.map(|s| as_str(s).trim_end_matches('\0').to_owned()))
}

/// Fixed-width strings of any width: the stored bytes split by element size,
/// NUL padding stripped. Invalid UTF-8 is replaced rather than rejected.
fn read_fixed_text(ds: &Dataset, dtype: &Datatype) -> Result<ArrayD<String>> {
    let width = dtype.size();
    let bytes = read_bytes(ds, dtype)?;
    let items: Vec<String> = bytes
        .chunks_exact(width.max(1))
        .map(|chunk| {
            let end = chunk.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
            String::from_utf8_lossy(&chunk[..end]).into_owned()
        })
        .collect();
    ArrayD::from_shape_vec(IxDyn(&ds.shape()), items)
        .with_context(|| format!("shaping text of {}", ds.name()))
}

fn read_raw(ds: &Dataset, dtype: &Datatype, description: String) -> Result<RawArray> {
    Ok(RawArray {
        dtype: description,
        shape: ds.shape(),
        element_size: dtype.size(),
        bytes: read_bytes(ds, dtype)?,
    })
}

/// Every element of `ds` in its stored representation, without conversion.
fn read_bytes(ds: &Dataset, dtype: &Datatype) -> Result<Vec<u8>> {
    let mut buf = vec![0_u8; ds.size() * dtype.size()];
    if buf.is_empty() {
        return Ok(buf);
    }
    let _lock = hdf5_sys::LOCK.lock();
    // SAFETY: `buf` holds `ds.size()` elements of the file type, which is also
    // the memory type, and callers never pass types with variable-length parts.
    let status = unsafe {
        H5Dread(
            ds.id(),
            dtype.id(),
            H5S_ALL,
            H5S_ALL,
            H5P_DEFAULT,
            buf.as_mut_ptr().cast(),
        )
    };
    if status < 0 {
        bail!("reading stored bytes of {} failed", ds.name());
    }
    Ok(buf)
}

/// Whether a type embeds variable-length data anywhere in its layout.
fn has_varlen(descriptor: &TypeDescriptor) -> bool {
    match descriptor {
        TypeDescriptor::VarLenArray(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => true,
        TypeDescriptor::FixedArray(inner, _) => has_varlen(inner),
        TypeDescriptor::Compound(compound) => {
            compound.fields.iter().any(|field| has_varlen(&field.ty))
        }
        _ => false,
    }
}

/// HDF5 class name of a type, for types without a descriptor.
fn type_class(dtype: &Datatype) -> String {
    let _lock = hdf5_sys::LOCK.lock();
    let class: H5T_class_t = unsafe { H5Tget_class(dtype.id()) };
    format!("{class:?}")
}

fn file_path(group: &Group) -> PathBuf {
    PathBuf::from(group.filename())
}
