//! Pipe-delimited framed file output (C4): a buffered writer that frames a
//! single HEADER line, N DETAIL lines, and a single TRAILER line, deleting
//! whatever it wrote if the cycle never reaches `write_trailer`.

use anyhow::{Context, Result};
use drain_schemas::{FileHeader, FlatProjection, TrailerStats};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const WRITE_BUFFER_BYTES: usize = 32 * 1024;

/// Scoped acquisition of the output file: every exit path (success, error,
/// cancellation) must route through `close` or `abort` so a partial file
/// never survives a failed cycle. Dropping the sink without calling either
/// treats the run as a failure and deletes the file, matching the
/// fail-closed default the claim protocol relies on.
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    wrote_trailer: bool,
}

impl FileSink {
    /// Opens `<output_directory>/<business_center_code>_<master_id>_<monotonic_tag>.txt`
    /// for writing, truncating any existing file of the same name.
    pub fn open(output_directory: &Path, business_center_code: &str, master_id: i64, monotonic_tag: i64) -> Result<Self> {
        fs::create_dir_all(output_directory)
            .with_context(|| format!("create output directory failed: {}", output_directory.display()))?;

        let file_name = format!("{business_center_code}_{master_id}_{monotonic_tag}.txt");
        let path = output_directory.join(file_name);

        let file = File::create(&path)
            .with_context(|| format!("create output file failed: {}", path.display()))?;

        Ok(Self {
            path,
            writer: Some(BufWriter::with_capacity(WRITE_BUFFER_BYTES, file)),
            wrote_trailer: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_header(&mut self, header: &FileHeader) -> Result<()> {
        self.write_line(&format!(
            "HEADER|{}|{}|{}|0|{}",
            header.master_id, header.business_center_code, header.date, header.file_version
        ))
    }

    pub fn write_detail(&mut self, projection: &FlatProjection) -> Result<()> {
        self.write_line(&format!(
            "DETAIL|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            projection.detail_id,
            projection.account_number,
            projection.customer_name,
            projection.amount,
            projection.currency,
            projection.description,
            projection.transaction_date,
            projection.transaction_id,
            projection.transaction_type,
            projection.risk_score.map(|v| v.to_string()).unwrap_or_default(),
            projection.status,
            projection.customer_id,
            projection.customer_email,
            projection.customer_phone,
            projection.customer_city,
            projection.customer_state,
            projection.customer_country,
            projection.merchant_id,
            projection.merchant_name,
            projection.merchant_category,
            projection.payment_type,
            projection.payment_last_four,
            projection.payment_brand,
            projection.item_count,
        ))
    }

    pub fn write_trailer(&mut self, stats: &TrailerStats) -> Result<()> {
        self.write_line(&format!(
            "TRAILER|{}|{}|{}|{}",
            stats.total_records, stats.total_amount, stats.average_risk_score, stats.unique_customers
        ))?;
        self.wrote_trailer = true;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .context("write attempted on a closed sink")?;
        writeln!(writer, "{line}").context("write to output buffer failed")?;
        Ok(())
    }

    /// Flushes and fsyncs the file on a successful run. Consumes the sink so
    /// a closed sink can't be written to again.
    pub fn close(mut self) -> Result<()> {
        let mut writer = self.writer.take().context("sink already closed")?;
        writer.flush().context("flush output buffer failed")?;
        writer
            .get_ref()
            .sync_all()
            .context("fsync output file failed")?;
        if !self.wrote_trailer {
            drop(writer);
            self.delete_partial();
            anyhow::bail!("sink closed before a trailer was written");
        }
        Ok(())
    }

    /// Explicitly abandons the run: drops the writer and deletes whatever was
    /// written so far. Safe to call even if nothing was ever written.
    pub fn abort(mut self) {
        self.writer.take();
        self.delete_partial();
    }

    fn delete_partial(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %self.path.display(), error = %err, "failed to delete partial output file");
            }
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if self.writer.is_some() {
            self.writer.take();
            self.delete_partial();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::io::Read;

    fn header() -> FileHeader {
        FileHeader {
            master_id: 1,
            business_center_code: "NYC".to_string(),
            date: "2026-08-01".to_string(),
            file_version: "1.0",
        }
    }

    fn stats() -> TrailerStats {
        TrailerStats {
            total_records: 1,
            total_amount: Decimal::new(1000, 2),
            average_risk_score: Decimal::ZERO,
            unique_customers: 0,
        }
    }

    #[test]
    fn closed_sink_leaves_a_complete_framed_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::open(dir.path(), "NYC", 1, 123).unwrap();
        sink.write_header(&header()).unwrap();
        sink.write_detail(&FlatProjection {
            detail_id: 1,
            ..Default::default()
        })
        .unwrap();
        sink.write_trailer(&stats()).unwrap();
        let path = sink.path().to_path_buf();
        sink.close().unwrap();

        let mut contents = String::new();
        File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("HEADER|"));
        assert!(lines[1].starts_with("DETAIL|"));
        assert!(lines[2].starts_with("TRAILER|"));
    }

    #[test]
    fn aborted_sink_deletes_the_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::open(dir.path(), "NYC", 2, 456).unwrap();
        let path = sink.path().to_path_buf();
        assert!(path.exists());
        sink.abort();
        assert!(!path.exists());
    }

    #[test]
    fn dropping_without_trailer_deletes_the_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path;
        {
            let mut sink = FileSink::open(dir.path(), "NYC", 3, 789).unwrap();
            path = sink.path().to_path_buf();
            sink.write_header(&header()).unwrap();
        }
        assert!(!path.exists());
    }

    #[test]
    fn close_without_trailer_is_an_error_and_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::open(dir.path(), "NYC", 4, 1).unwrap();
        sink.write_header(&header()).unwrap();
        let path = sink.path().to_path_buf();
        assert!(sink.close().is_err());
        assert!(!path.exists());
    }

    #[test]
    fn filenames_embed_business_center_master_and_tag() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::open(dir.path(), "LDN", 99, 555).unwrap();
        assert_eq!(
            sink.path().file_name().unwrap().to_str().unwrap(),
            "LDN_99_555.txt"
        );
        sink.abort();
    }
}
