//! CSV adapter: turns delimited files into [`Dataset`]s and back.
//!
//! Delimiters follow the file extension (`.tsv` → tab, otherwise comma)
//! unless given explicitly. Input is decoded and output encoded through
//! `encoding_rs`, defaulting to UTF-8. The `-` path means stdin/stdout.

use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::dataset::Dataset;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| delimiter_for_extension(path).unwrap_or(DEFAULT_CSV_DELIMITER))
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    provided
        .or_else(|| path.and_then(delimiter_for_extension))
        .unwrap_or(fallback)
}

fn delimiter_for_extension(path: &Path) -> Option<u8> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => Some(DEFAULT_TSV_DELIMITER),
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Some(DEFAULT_CSV_DELIMITER),
        _ => None,
    }
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(reader))
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

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Reads a whole delimited file into a dataset named `name`.
pub fn read_dataset(
    path: &Path,
    name: &str,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Dataset> {
    let mut reader = open_csv_reader_from_path(path, delimiter)?;
    let headers = reader
        .byte_headers()
        .with_context(|| format!("Reading headers of {path:?}"))?
        .clone();
    let headers = decode_record(&headers, encoding)?
        .into_iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect::<Vec<_>>();

    let mut records = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", idx + 2))?;
        records.push(decode_record(&record, encoding)?);
    }
    let dataset = Dataset::from_records(name, headers.as_slice(), records.as_slice())
        .with_context(|| format!("Loading {path:?}"))?;
    debug!(
        "Read {} row(s) across {} column(s) from {:?} as '{}'",
        dataset.row_count(),
        dataset.columns().len(),
        path,
        name
    );
    Ok(dataset)
}

/// Writes a header row plus `rows`, encoded with `encoding`. Output goes to
/// stdout when `path` is `None` or `-`.
pub fn write_csv(
    path: Option<&Path>,
    headers: &[String],
    rows: &[Vec<String>],
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(Vec::new());
    writer.write_record(headers).context("Writing headers")?;
    for row in rows {
        writer.write_record(row).context("Writing row")?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|err| anyhow!("Flushing CSV output: {}", err.error()))?;
    let bytes = encode_output(buffer, encoding)?;

    match path {
        Some(p) if !is_dash(p) => {
            let mut file =
                File::create(p).with_context(|| format!("Creating output file {p:?}"))?;
            file.write_all(&bytes)
                .with_context(|| format!("Writing output file {p:?}"))?;
        }
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes).context("Writing to stdout")?;
            stdout.flush().context("Flushing stdout")?;
        }
    }
    Ok(())
}

pub fn write_dataset(
    dataset: &Dataset,
    path: Option<&Path>,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<()> {
    write_csv(
        path,
        dataset.columns(),
        &dataset.display_rows(),
        delimiter,
        encoding,
    )
}

fn encode_output(buffer: Vec<u8>, encoding: &'static Encoding) -> Result<Vec<u8>> {
    if encoding == UTF_8 {
        return Ok(buffer);
    }
    let text = String::from_utf8(buffer).context("CSV output is not valid UTF-8")?;
    let (encoded, _, had_errors) = encoding.encode(&text);
    if had_errors {
        return Err(anyhow!("Failed to encode output using {}", encoding.name()));
    }
    Ok(encoded.into_owned())
}
