//! Process wide pipeline counters, exposed in the Prometheus text format.

use lazy_static::lazy_static;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

use crate::Result;

lazy_static! {
    pub static ref FRAMES_PROCESSED: IntCounter = register_int_counter!(
        "plates_frames_processed_total",
        "Decoded frames run through detection and matching"
    )
    .expect("register plates_frames_processed_total");
    pub static ref PLATES_DETECTED: IntCounter = register_int_counter!(
        "plates_detected_total",
        "Plate candidates returned by the plate detector"
    )
    .expect("register plates_detected_total");
    pub static ref PLATES_UNMATCHED: IntCounter = register_int_counter!(
        "plates_unmatched_total",
        "Plates not enclosed by any tracked vehicle"
    )
    .expect("register plates_unmatched_total");
    pub static ref PLATES_UNREADABLE: IntCounter = register_int_counter!(
        "plates_unreadable_total",
        "Matched plates dropped for lack of legible text"
    )
    .expect("register plates_unreadable_total");
    pub static ref RECORDS_ACCUMULATED: IntCounter = register_int_counter!(
        "plates_records_accumulated_total",
        "Records inserted into the result store, overwrites included"
    )
    .expect("register plates_records_accumulated_total");
    pub static ref ROWS_WRITTEN: IntCounter = register_int_counter!(
        "plates_rows_written_total",
        "Data rows written to the results table"
    )
    .expect("register plates_rows_written_total");
}

/// Renders every registered metric in the text exposition format.
pub fn render() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_text_names_counters() {
        FRAMES_PROCESSED.inc();
        ROWS_WRITTEN.inc_by(0);
        let text = render().unwrap();
        assert!(text.contains("plates_frames_processed_total"));
        assert!(text.contains("plates_rows_written_total"));
    }
}
