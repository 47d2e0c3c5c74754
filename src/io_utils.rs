//! Input plumbing for booking datasets.
//!
//! Every read of a bookings file goes through [`CsvSource`], which resolves
//! the delimiter (extension-based: `.tsv` → tab, anything else → comma, with
//! manual override), the character encoding (`encoding_rs`, UTF-8 by
//! default), and the file's modification time used as a cache key.
//! The dashboard never writes files, so there is no writer side here.

use std::{
    fs::{self, File},
    io::{BufReader, Read},
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl CsvSource {
    pub fn new(path: &Path, delimiter: Option<u8>, encoding: Option<&str>) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            delimiter: resolve_input_delimiter(path, delimiter),
            encoding: resolve_encoding(encoding)?,
        })
    }

    pub fn open(&self) -> Result<csv::Reader<Box<dyn Read>>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Opening input file {:?}", self.path))?;
        let reader: Box<dyn Read> = Box::new(BufReader::new(file));
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(true)
            .delimiter(self.delimiter)
            .double_quote(true)
            .flexible(false);
        Ok(builder.from_reader(reader))
    }

    pub fn modified(&self) -> Result<SystemTime> {
        fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .with_context(|| format!("Reading modification time of {:?}", self.path))
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

/// Decodes a raw record into a `StringRecord` so it can be deserialized
/// against the header row.
pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> Result<csv::StringRecord> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect::<Result<Vec<_>>>()
        .map(csv::StringRecord::from)
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<csv::StringRecord>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    let mut decoded = decode_record(&headers, encoding)?;
    decoded.trim();
    Ok(decoded)
}
