use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::record::ResultRecord;
use super::store::ResultStore;
use crate::metrics;
use crate::Result;

pub const HEADER: [&str; 7] = [
    "frame_nmr",
    "car_id",
    "car_bbox",
    "license_plate_bbox",
    "license_plate_bbox_score",
    "license_number",
    "license_number_score",
];

const DELIMITER: u8 = b',';

impl ResultRecord {
    /// The record as output fields, in [`HEADER`] order.
    pub fn to_row(&self) -> [String; 7] {
        [
            self.frame_index.to_string(),
            self.vehicle_track_id.to_string(),
            self.vehicle_bbox.to_string(),
            self.plate_bbox.to_string(),
            self.plate_bbox_score.to_string(),
            self.plate_text.clone(),
            self.plate_text_score.to_string(),
        ]
    }
}

/// Row by row writer for the results table.
///
/// The header goes out when the writer is created. Output is buffered and
/// flushed by [`ResultWriter::finish`]; dropping the writer early still
/// flushes whatever rows were written.
pub struct ResultWriter<W: Write> {
    out: BufWriter<W>,
    rows: usize,
}

/// Creates (or truncates) the output file, along with missing parent
/// directories.
pub fn create_output(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}

impl ResultWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(create_output(path)?)
    }
}

impl<W: Write> ResultWriter<W> {
    pub fn new(inner: W) -> Result<Self> {
        let mut out = BufWriter::new(inner);
        write_line(&mut out, HEADER.iter().copied())?;
        Ok(Self { out, rows: 0 })
    }

    pub fn write_record(&mut self, record: &ResultRecord) -> Result<()> {
        let row = record.to_row();
        write_line(&mut self.out, row.iter().map(String::as_str))?;
        self.rows += 1;
        metrics::ROWS_WRITTEN.inc();
        Ok(())
    }

    pub fn write_records<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a ResultRecord>,
    ) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Data rows written so far, header excluded.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.out
            .into_inner()
            .map_err(|e| crate::PlateError::Output(e.into_error()))
    }
}

/// Writes the header and every record of `store`, frames ascending and
/// track ids ascending within a frame.
pub fn serialize<W: Write>(store: &ResultStore, out: W) -> Result<W> {
    let mut writer = ResultWriter::new(out)?;
    writer.write_records(store.records())?;
    writer.finish()
}

pub fn write_results(store: &ResultStore, path: impl AsRef<Path>) -> Result<()> {
    let mut writer = ResultWriter::create(path)?;
    writer.write_records(store.records())?;
    writer.finish()?;
    Ok(())
}

fn write_line<'a, W: Write>(out: &mut W, fields: impl Iterator<Item = &'a str>) -> Result<()> {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.write_all(&[DELIMITER])?;
        }
        out.write_all(escape_field(field).as_bytes())?;
    }
    out.write_all(b"\n")?;
    Ok(())
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
