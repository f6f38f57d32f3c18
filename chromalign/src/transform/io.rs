//! Binary `.transform` files.
//!
//! Layout (big-endian): a 4-byte signed dimension count `N` (2 or 3),
//! followed by `N * (N + 1)` IEEE-754 doubles in row-packed order.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;

use super::AffineTransform;
use crate::error::{AlignError, Result};
use crate::grid::Dimensionality;

pub const TRANSFORM_SUFFIX: &str = ".transform";

fn has_transform_suffix(path: &Path) -> bool {
    path.to_str()
        .is_some_and(|name| name.ends_with(TRANSFORM_SUFFIX))
}

/// Dimensionality stored in `path` if it looks like a transform file.
///
/// Never fails: unreadable files, other suffixes and unexpected headers
/// all report `None`.
pub fn supports_open(path: &Path) -> Option<Dimensionality> {
    if !has_transform_suffix(path) {
        return None;
    }
    let mut file = File::open(path).ok()?;
    let mut header = [0u8; 4];
    file.read_exact(&mut header).ok()?;
    match i32::from_be_bytes(header) {
        2 => Some(Dimensionality::Two),
        3 => Some(Dimensionality::Three),
        _ => None,
    }
}

pub fn supports_save(path: &Path) -> bool {
    has_transform_suffix(path)
}

pub fn open(path: &Path) -> Result<AffineTransform> {
    let file = File::open(path).map_err(|e| AlignError::io(path, e))?;
    let transform = read_from(&mut BufReader::new(file)).map_err(|e| AlignError::io(path, e))?;
    debug!("Read {} from {}", transform, path.display());
    Ok(transform)
}

pub fn save(transform: &AffineTransform, path: &Path) -> Result<()> {
    if !supports_save(path) {
        return Err(AlignError::io(
            path,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("destination does not end with '{TRANSFORM_SUFFIX}'"),
            ),
        ));
    }
    let file = File::create(path).map_err(|e| AlignError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_to(transform, &mut writer)
        .and_then(|_| writer.flush())
        .map_err(|e| AlignError::io(path, e))?;
    debug!("Wrote {} to {}", transform, path.display());
    Ok(())
}

pub fn write_to<W: Write>(transform: &AffineTransform, writer: &mut W) -> io::Result<()> {
    let dims = transform.dims().count() as i32;
    writer.write_all(&dims.to_be_bytes())?;
    for value in transform.to_row_packed() {
        writer.write_all(&value.to_be_bytes())?;
    }
    Ok(())
}

pub fn read_from<R: Read>(reader: &mut R) -> io::Result<AffineTransform> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header)?;
    let dims = match i32::from_be_bytes(header) {
        2 => 2usize,
        3 => 3usize,
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported transform dimensionality {other}"),
            ))
        }
    };

    let mut values = Vec::with_capacity(dims * (dims + 1));
    let mut buf = [0u8; 8];
    for _ in 0..dims * (dims + 1) {
        reader.read_exact(&mut buf)?;
        values.push(f64::from_be_bytes(buf));
    }

    AffineTransform::from_row_packed(&values)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
