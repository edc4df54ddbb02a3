//! Saving and loading of arrays and records.
//!
//! Four encodings are supported, selected with [`SaveMode`]:
//!
//! | Mode                        | Extension | Accepts                     |
//! |-----------------------------|-----------|-----------------------------|
//! | [`SaveMode::Object`]        | none      | [`Record`] of any values    |
//! | [`SaveMode::Npy`]           | `.npy`    | a single [`NdArray`]        |
//! | [`SaveMode::Npz`]           | `.npz`    | arrays (record or bare)     |
//! | [`SaveMode::CompressedNpz`] | `.npz`    | arrays (record or bare)     |
//!
//! The object encoding is a small binary envelope around a MessagePack
//! payload, which keeps non-finite floats intact:
//!
//! ```text
//! MAGIC(4) + VERSION(4, little endian) + PAYLOAD_LEN(8, little endian) + PAYLOAD
//! ```
//!
//! `.npy` and `.npz` files follow the NumPy formats and can be exchanged with
//! NumPy directly.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use npyz::npz::{NpzArchive, NpzWriter};
use npyz::zip::CompressionMethod;
use npyz::zip::write::FileOptions;
use npyz::{NpyFile, Order, WriteOptions, WriterBuilder};
use num_complex::Complex64;
use tracing::{debug, warn};

use super::paths::PathSpec;
use super::record::{Data, Record, Value};
use crate::{NdArray, ToolboxError, ToolboxResult};

const OBJECT_MAGIC: &[u8; 4] = b"SBX\x01";
const FORMAT_VERSION: u32 = 2;
const HEADER_LEN: usize = 16;

/// Key under which a bare array is stored in an npz archive.
pub const DEFAULT_ARRAY_KEY: &str = "arr1";

/// Extensions probed by [`load`], in probing order.
const CANDIDATE_EXTENSIONS: [&str; 3] = [".npy", ".npz", ""];

/// Encoding used by [`save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SaveMode {
    /// Generic object serialization of a [`Record`], stored without extension.
    #[default]
    Object,
    /// A single array in the `.npy` format.
    Npy,
    /// A zip archive of `.npy` members, uncompressed.
    Npz,
    /// A zip archive of `.npy` members, deflate compressed.
    CompressedNpz,
}

impl SaveMode {
    /// File extension appended by this mode, including the leading dot.
    pub const fn extension(self) -> &'static str {
        match self {
            SaveMode::Object => "",
            SaveMode::Npy => ".npy",
            SaveMode::Npz | SaveMode::CompressedNpz => ".npz",
        }
    }

    /// Name of the mode, as accepted by [`SaveMode::from_str`].
    pub const fn as_str(self) -> &'static str {
        match self {
            SaveMode::Object => "pickle",
            SaveMode::Npy => "npy",
            SaveMode::Npz => "npz",
            SaveMode::CompressedNpz => "comp-npz",
        }
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaveMode {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pickle" | "object" => Ok(SaveMode::Object),
            "npy" => Ok(SaveMode::Npy),
            "npz" => Ok(SaveMode::Npz),
            "comp-npz" | "compressed-npz" => Ok(SaveMode::CompressedNpz),
            other => Err(ToolboxError::InvalidParameter(format!(
                "unknown saving mode '{other}', expected one of pickle, npy, npz, comp-npz"
            ))),
        }
    }
}

/// Save `data` under `name` inside the folder described by `path`.
///
/// The extension of `mode` is appended to `name`. Returns the full path of
/// the written file.
///
/// # Errors
///
/// [`ToolboxError::WrongDataType`] when the data does not fit the mode, I/O
/// and serialization errors otherwise.
///
/// # Examples
///
/// ```rust,no_run
/// use signal_toolbox::savebox::{save, SaveMode};
/// use ndarray::array;
///
/// let path = save(array![1.0, 2.0, 3.0], "signal", "results", SaveMode::Npy).unwrap();
/// assert!(path.ends_with("results/signal.npy"));
/// ```
pub fn save<D, P>(data: D, name: &str, path: P, mode: SaveMode) -> ToolboxResult<PathBuf>
where
    D: Into<Data>,
    P: Into<PathSpec>,
{
    let folder = path.into().resolve()?;
    save_in(&data.into(), &folder, name, mode)
}

/// Load data previously written by [`save`].
///
/// Any extension on `name` is ignored; the files `name.npy`, `name.npz` and
/// `name` are probed. Returns `Ok(None)` without loading anything when more
/// than one of them exists.
///
/// # Errors
///
/// [`ToolboxError::FileNotFound`] when none of the candidates exists, I/O and
/// serialization errors otherwise.
pub fn load<P: Into<PathSpec>>(name: &str, path: P) -> ToolboxResult<Option<Data>> {
    let folder = path.into().resolve()?;
    load_in(&folder, name)
}

pub(crate) fn save_in(data: &Data, folder: &Path, name: &str, mode: SaveMode) -> ToolboxResult<PathBuf> {
    let full_path = folder.join(format!("{name}{}", mode.extension()));

    match mode {
        SaveMode::Object => match data {
            Data::Mapping(record) => write_object(record, &full_path)?,
            Data::Array(_) => return Err(ToolboxError::wrong_data_type(mode, describe(data))),
        },
        SaveMode::Npy => match data {
            Data::Array(arr) => write_npy(arr, &full_path)?,
            Data::Mapping(_) => return Err(ToolboxError::wrong_data_type(mode, describe(data))),
        },
        SaveMode::Npz | SaveMode::CompressedNpz => {
            let arrays = npz_members(data, mode)?;
            let method = if mode == SaveMode::CompressedNpz {
                CompressionMethod::Deflated
            } else {
                CompressionMethod::Stored
            };
            write_npz(&arrays, &full_path, method)?;
        }
    }

    debug!(path = %full_path.display(), %mode, "saved data");
    Ok(full_path)
}

pub(crate) fn load_in(folder: &Path, name: &str) -> ToolboxResult<Option<Data>> {
    let stem = Path::new(name).with_extension("");
    let base = folder.join(stem);

    let found: Vec<(&str, PathBuf)> = CANDIDATE_EXTENSIONS
        .iter()
        .map(|ext| {
            let mut candidate = base.clone().into_os_string();
            candidate.push(ext);
            (*ext, PathBuf::from(candidate))
        })
        .filter(|(_, candidate)| candidate.is_file())
        .collect();

    match found.as_slice() {
        [] => Err(ToolboxError::FileNotFound(folder.join(name))),
        [(ext, file)] => {
            let data = match *ext {
                ".npy" => Data::Array(read_npy(file)?),
                ".npz" => Data::Mapping(read_npz(file)?),
                _ => Data::Mapping(read_object(file)?),
            };
            debug!(path = %file.display(), "loaded data");
            Ok(Some(data))
        }
        several => {
            let extensions: Vec<&str> = several.iter().map(|(ext, _)| *ext).collect();
            warn!(
                "Several files {name} were found with different extensions {extensions:?}, no file was loaded."
            );
            Ok(None)
        }
    }
}

fn describe(data: &Data) -> String {
    data.to_string()
}

fn npz_members(data: &Data, mode: SaveMode) -> ToolboxResult<Vec<(String, NdArray)>> {
    match data {
        Data::Array(arr) => Ok(vec![(DEFAULT_ARRAY_KEY.to_string(), arr.clone())]),
        Data::Mapping(record) => record
            .iter()
            .map(|(key, value)| match value {
                Value::Array(arr) => Ok((key.to_string(), arr.clone())),
                other => Err(ToolboxError::wrong_data_type(
                    mode,
                    format!("mapping whose entry '{key}' is a {}", other.type_name()),
                )),
            })
            .collect(),
    }
}

fn npy_shape(arr: &NdArray) -> Vec<u64> {
    arr.shape().iter().map(|&d| d as u64).collect()
}

fn write_npy(arr: &NdArray, path: &Path) -> ToolboxResult<()> {
    let file = File::create(path).map_err(|e| ToolboxError::io(format!("creating {}", path.display()), e))?;
    let shape = npy_shape(arr);
    let io_err = |e| ToolboxError::io(format!("writing {}", path.display()), e);

    match arr {
        NdArray::Real(data) => {
            let mut writer = WriteOptions::<f64>::new()
                .default_dtype()
                .shape(&shape)
                .writer(BufWriter::new(file))
                .begin_nd()
                .map_err(io_err)?;
            writer.extend(data.iter().copied()).map_err(io_err)?;
            writer.finish().map_err(io_err)
        }
        NdArray::Complex(data) => {
            let mut writer = WriteOptions::<Complex64>::new()
                .default_dtype()
                .shape(&shape)
                .writer(BufWriter::new(file))
                .begin_nd()
                .map_err(io_err)?;
            writer.extend(data.iter().copied()).map_err(io_err)?;
            writer.finish().map_err(io_err)
        }
    }
}

fn write_npz(arrays: &[(String, NdArray)], path: &Path, method: CompressionMethod) -> ToolboxResult<()> {
    let io_err = |e| ToolboxError::io(format!("writing {}", path.display()), e);
    let mut npz = NpzWriter::create(path).map_err(io_err)?;
    let options = FileOptions::default().compression_method(method);

    for (key, arr) in arrays {
        let shape = npy_shape(arr);
        match arr {
            NdArray::Real(data) => {
                let mut writer = npz
                    .array::<f64>(key, options)
                    .map_err(io_err)?
                    .default_dtype()
                    .shape(&shape)
                    .begin_nd()
                    .map_err(io_err)?;
                writer.extend(data.iter().copied()).map_err(io_err)?;
                writer.finish().map_err(io_err)?;
            }
            NdArray::Complex(data) => {
                let mut writer = npz
                    .array::<Complex64>(key, options)
                    .map_err(io_err)?
                    .default_dtype()
                    .shape(&shape)
                    .begin_nd()
                    .map_err(io_err)?;
                writer.extend(data.iter().copied()).map_err(io_err)?;
                writer.finish().map_err(io_err)?;
            }
        }
    }

    let mut inner = npz
        .zip_writer()
        .finish()
        .map_err(|e| ToolboxError::serialization("npz", e.to_string()))?;
    inner.flush().map_err(io_err)
}

fn read_npy(path: &Path) -> ToolboxResult<NdArray> {
    let file = File::open(path).map_err(|e| ToolboxError::io(format!("opening {}", path.display()), e))?;
    let npy = NpyFile::new(BufReader::new(file))
        .map_err(|e| ToolboxError::serialization("npy", e.to_string()))?;
    decode_npy(npy)
}

fn read_npz(path: &Path) -> ToolboxResult<Record> {
    let mut archive = NpzArchive::open(path)
        .map_err(|e| ToolboxError::serialization("npz", e.to_string()))?;
    let names: Vec<String> = archive.array_names().map(str::to_string).collect();

    let mut record = Record::new();
    for name in names {
        let npy = archive
            .by_name(&name)
            .map_err(|e| ToolboxError::serialization("npz", e.to_string()))?
            .ok_or_else(|| ToolboxError::serialization("npz", format!("member '{name}' vanished")))?;
        record.insert(name, decode_npy(npy)?);
    }
    Ok(record)
}

fn decode_npy<R: Read>(npy: NpyFile<R>) -> ToolboxResult<NdArray> {
    let shape: Vec<usize> = npy.shape().iter().map(|&d| d as usize).collect();
    let fortran = npy.order() == Order::Fortran;
    let dim = IxDyn(&shape).set_f(fortran);
    let decode_err = |e: std::io::Error| ToolboxError::serialization("npy", e.to_string());

    match npy.try_data::<f64>() {
        Ok(reader) => {
            let values = reader.collect::<Result<Vec<f64>, _>>().map_err(decode_err)?;
            let arr = ArrayD::from_shape_vec(dim, values)
                .map_err(|e| ToolboxError::serialization("npy", e.to_string()))?;
            Ok(NdArray::Real(arr))
        }
        Err(npy) => {
            let dtype = npy.dtype();
            let reader = npy.try_data::<Complex64>().map_err(|_| {
                ToolboxError::serialization(
                    "npy",
                    format!("unsupported element type {}", dtype.descr()),
                )
            })?;
            let values = reader
                .collect::<Result<Vec<Complex64>, _>>()
                .map_err(decode_err)?;
            let arr = ArrayD::from_shape_vec(dim, values)
                .map_err(|e| ToolboxError::serialization("npy", e.to_string()))?;
            Ok(NdArray::Complex(arr))
        }
    }
}

fn write_object(record: &Record, path: &Path) -> ToolboxResult<()> {
    let payload = rmp_serde::to_vec_named(record)
        .map_err(|e| ToolboxError::serialization("object", e.to_string()))?;

    let mut buffer = Vec::with_capacity(HEADER_LEN + payload.len());
    buffer.extend_from_slice(OBJECT_MAGIC);
    buffer.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buffer.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buffer.extend_from_slice(&payload);

    std::fs::write(path, buffer).map_err(|e| ToolboxError::io(format!("writing {}", path.display()), e))
}

fn read_object(path: &Path) -> ToolboxResult<Record> {
    let bytes = std::fs::read(path).map_err(|e| ToolboxError::io(format!("reading {}", path.display()), e))?;
    decode_object(&bytes)
}

fn decode_object(bytes: &[u8]) -> ToolboxResult<Record> {
    if bytes.len() < HEADER_LEN {
        return Err(ToolboxError::serialization("object", "file too short for header"));
    }
    if &bytes[0..4] != OBJECT_MAGIC {
        return Err(ToolboxError::serialization("object", "invalid magic bytes"));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(ToolboxError::serialization(
            "object",
            format!("unsupported format version {version}"),
        ));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[8..HEADER_LEN]);
    let truncated = || ToolboxError::serialization("object", "payload shorter than declared length");
    let payload_end = usize::try_from(u64::from_le_bytes(len_bytes))
        .ok()
        .and_then(|len| HEADER_LEN.checked_add(len))
        .ok_or_else(truncated)?;
    let payload = bytes.get(HEADER_LEN..payload_end).ok_or_else(truncated)?;

    rmp_serde::from_slice(payload).map_err(|e| ToolboxError::serialization("object", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    fn sample_record() -> Record {
        Record::new()
            .with("signal", array![0.0, 0.5, 1.0])
            .with("kernel", array![[1.0, 2.0], [3.0, 4.0]])
    }

    #[test]
    fn test_mode_parsing_and_extensions() {
        assert_eq!("pickle".parse::<SaveMode>().unwrap(), SaveMode::Object);
        assert_eq!("comp-npz".parse::<SaveMode>().unwrap(), SaveMode::CompressedNpz);
        assert!("hdf5".parse::<SaveMode>().is_err());
        assert_eq!(SaveMode::Object.extension(), "");
        assert_eq!(SaveMode::Npy.extension(), ".npy");
        assert_eq!(SaveMode::Npz.extension(), SaveMode::CompressedNpz.extension());
        assert_eq!(SaveMode::CompressedNpz.to_string(), "comp-npz");
    }

    #[test]
    fn test_object_round_trip_with_mixed_values() {
        let tmp = tempfile::tempdir().unwrap();
        let record = sample_record()
            .with("fs", 44100.0)
            .with("label", "sweep")
            .with("orders", vec![1_i64, 2, 3])
            .with("complex", array![Complex64::new(1.0, -1.0)]);

        let path = save_in(&record.clone().into(), tmp.path(), "x", SaveMode::Object).unwrap();
        assert_eq!(path, tmp.path().join("x"));

        let loaded = load_in(tmp.path(), "x").unwrap().unwrap();
        assert_eq!(loaded, Data::Mapping(record));
    }

    #[test]
    fn test_object_round_trip_keeps_non_finite_values() {
        let tmp = tempfile::tempdir().unwrap();
        let record = Record::new()
            .with("spectrum_db", array![1.0, f64::NEG_INFINITY, f64::NAN, f64::INFINITY])
            .with(
                "response",
                array![Complex64::new(f64::NAN, 1.0), Complex64::new(0.0, f64::NEG_INFINITY)],
            )
            .with("gain", f64::NEG_INFINITY);

        save_in(&record.into(), tmp.path(), "spectra", SaveMode::Object).unwrap();
        let loaded = load_in(tmp.path(), "spectra").unwrap().unwrap();
        let loaded = loaded.as_mapping().unwrap();

        match loaded.array("spectrum_db") {
            Some(NdArray::Real(values)) => {
                let values: Vec<f64> = values.iter().copied().collect();
                assert_eq!(values[0], 1.0);
                assert_eq!(values[1], f64::NEG_INFINITY);
                assert!(values[2].is_nan());
                assert_eq!(values[3], f64::INFINITY);
            }
            other => panic!("expected a real array, got {other:?}"),
        }
        match loaded.array("response") {
            Some(NdArray::Complex(values)) => {
                let values: Vec<Complex64> = values.iter().copied().collect();
                assert!(values[0].re.is_nan());
                assert_eq!(values[0].im, 1.0);
                assert_eq!(values[1], Complex64::new(0.0, f64::NEG_INFINITY));
            }
            other => panic!("expected a complex array, got {other:?}"),
        }
        assert_eq!(loaded.get("gain"), Some(&Value::Float(f64::NEG_INFINITY)));
    }

    #[test]
    fn test_npy_round_trip_real_and_complex() {
        let tmp = tempfile::tempdir().unwrap();
        let real = Array2::from_shape_fn((3, 4), |(i, j)| (i * 10 + j) as f64);
        let path = save_in(&real.clone().into(), tmp.path(), "real", SaveMode::Npy).unwrap();
        assert_eq!(path, tmp.path().join("real.npy"));
        let loaded = load_in(tmp.path(), "real.npy").unwrap().unwrap();
        assert_eq!(loaded, Data::Array(real.into()));

        let complex = array![Complex64::new(1.0, 2.0), Complex64::new(-3.0, 0.5)];
        save_in(&complex.clone().into(), tmp.path(), "cplx", SaveMode::Npy).unwrap();
        let loaded = load_in(tmp.path(), "cplx").unwrap().unwrap();
        assert_eq!(loaded, Data::Array(complex.into()));
    }

    #[test]
    fn test_npz_round_trip_both_compressions() {
        let tmp = tempfile::tempdir().unwrap();
        for (name, mode) in [("plain", SaveMode::Npz), ("packed", SaveMode::CompressedNpz)] {
            let path = save_in(&sample_record().into(), tmp.path(), name, mode).unwrap();
            assert_eq!(path, tmp.path().join(format!("{name}.npz")));
            let loaded = load_in(tmp.path(), name).unwrap().unwrap();
            assert_eq!(loaded, Data::Mapping(sample_record()));
        }
    }

    #[test]
    fn test_npz_compression_methods() {
        let tmp = tempfile::tempdir().unwrap();
        let zeros: Data = Array2::<f64>::zeros((100, 100)).into();

        let plain = save_in(&zeros, tmp.path(), "plain", SaveMode::Npz).unwrap();
        let packed = save_in(&zeros, tmp.path(), "packed", SaveMode::CompressedNpz).unwrap();

        for (path, expected) in [
            (&plain, CompressionMethod::Stored),
            (&packed, CompressionMethod::Deflated),
        ] {
            let mut archive = npyz::zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
            let member = archive.by_index(0).unwrap();
            assert_eq!(member.name(), "arr1.npy");
            assert_eq!(member.compression(), expected);
        }

        let plain_len = std::fs::metadata(&plain).unwrap().len();
        let packed_len = std::fs::metadata(&packed).unwrap().len();
        assert!(plain_len > 80_000, "stored archive is {plain_len} bytes");
        assert!(packed_len < plain_len / 10, "deflated archive is {packed_len} bytes");
    }

    #[test]
    fn test_bare_array_in_npz_is_wrapped() {
        let tmp = tempfile::tempdir().unwrap();
        let arr = array![1.0, 2.0, 3.0];
        save_in(&arr.clone().into(), tmp.path(), "bare", SaveMode::Npz).unwrap();
        let loaded = load_in(tmp.path(), "bare").unwrap().unwrap();
        let record = loaded.as_mapping().unwrap();
        assert_eq!(record.keys().collect::<Vec<_>>(), vec![DEFAULT_ARRAY_KEY]);
        assert_eq!(record.array(DEFAULT_ARRAY_KEY), Some(&NdArray::from(arr)));
    }

    #[test]
    fn test_wrong_data_types_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let arr: Data = array![1.0].into();
        let rec: Data = sample_record().into();
        let mixed: Data = Record::new().with("a", array![1.0]).with("b", "text").into();

        for (data, mode) in [
            (&arr, SaveMode::Object),
            (&rec, SaveMode::Npy),
            (&mixed, SaveMode::Npz),
            (&mixed, SaveMode::CompressedNpz),
        ] {
            let err = save_in(data, tmp.path(), "bad", mode).unwrap_err();
            match err {
                ToolboxError::WrongDataType { mode: m, .. } => assert_eq!(m, mode),
                other => panic!("unexpected error {other:?}"),
            }
        }
        assert!(std::fs::read_dir(tmp.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_in(tmp.path(), "ghost").unwrap_err();
        assert!(matches!(err, ToolboxError::FileNotFound(p) if p.ends_with("ghost")));
    }

    #[test]
    fn test_load_ambiguous_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        save_in(&array![1.0].into(), tmp.path(), "dup", SaveMode::Npy).unwrap();
        save_in(&array![1.0].into(), tmp.path(), "dup", SaveMode::Npz).unwrap();
        assert_eq!(load_in(tmp.path(), "dup").unwrap(), None);
    }

    #[test]
    fn test_public_save_and_load_with_absolute_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("nested");
        let path = save(array![4.0, 5.0], "vec", folder.clone(), SaveMode::Npy).unwrap();
        assert_eq!(path, folder.join("vec.npy"));

        let loaded = load(path.to_str().unwrap(), None::<&str>).unwrap();
        assert_eq!(loaded, Some(Data::Array(array![4.0, 5.0].into())));
    }

    #[test]
    fn test_object_header_validation() {
        assert!(decode_object(b"short").is_err());

        let mut bad_magic = vec![0u8; HEADER_LEN];
        bad_magic[0..4].copy_from_slice(b"BADX");
        assert!(decode_object(&bad_magic).is_err());

        let mut bad_version = vec![0u8; HEADER_LEN];
        bad_version[0..4].copy_from_slice(OBJECT_MAGIC);
        bad_version[4..8].copy_from_slice(&999u32.to_le_bytes());
        match decode_object(&bad_version) {
            Err(ToolboxError::Serialization { details, .. }) => assert!(details.contains("999")),
            other => panic!("expected version error, got {other:?}"),
        }

        let mut truncated = vec![0u8; HEADER_LEN];
        truncated[0..4].copy_from_slice(OBJECT_MAGIC);
        truncated[4..8].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        truncated[8..16].copy_from_slice(&64u64.to_le_bytes());
        assert!(decode_object(&truncated).is_err());

        let mut oversized = truncated.clone();
        oversized[8..16].copy_from_slice(&u64::MAX.to_le_bytes());
        match decode_object(&oversized) {
            Err(ToolboxError::Serialization { details, .. }) => {
                assert_eq!(details, "payload shorter than declared length");
            }
            other => panic!("expected length error, got {other:?}"),
        }
    }
}
