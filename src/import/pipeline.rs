//! Streaming CSV import: count, batch, upsert, report.
//!
//! Progress is written at batch granularity against a pre-counted total, so
//! the percent only ever moves forward and large files do not flood the
//! progress store with per-row writes.

use anyhow::{Context, Result};
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use crate::import::progress::ProgressStore;
use crate::store::products::{CatalogWriter, ProductRow};

/// Rows per upsert statement. Bounds statement size and lock duration.
pub const BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Done,
    Empty,
}

#[derive(Debug)]
pub struct ImportSummary {
    pub processed: usize,
    pub outcome: ImportOutcome,
}

fn open_reader(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file =
        File::open(path).with_context(|| format!("failed to open csv {}", path.display()))?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file)))
}

/// Run one import job end to end. Exactly one execution per token; the
/// caller owns failure signalling (see `jobs::JobQueue`).
pub async fn run_import(
    path: &Path,
    token: &str,
    writer: &dyn CatalogWriter,
    progress: &dyn ProgressStore,
    batch_size: usize,
) -> Result<ImportSummary> {
    // First pass: count data rows so percent math needs no estimation.
    let mut rdr = open_reader(path)?;
    let mut total = 0usize;
    let mut raw = ByteRecord::new();
    while rdr.read_byte_record(&mut raw).context("failed to count csv rows")? {
        total += 1;
    }

    if total == 0 {
        progress.set(token, 100, "No rows").await;
        info!(token, "import finished: no rows");
        return Ok(ImportSummary {
            processed: 0,
            outcome: ImportOutcome::Empty,
        });
    }

    // Second pass: stream, normalize, batch.
    let mut rdr = open_reader(path)?;
    let headers = rdr.headers().context("failed to read csv header")?.clone();
    let idx_sku = headers
        .iter()
        .position(|h| h == "sku")
        .or_else(|| headers.iter().position(|h| h == "SKU"));
    let idx_name = headers.iter().position(|h| h == "name");
    let idx_desc = headers.iter().position(|h| h == "description");

    let mut batch: Vec<ProductRow> = Vec::with_capacity(batch_size.min(total));
    let mut processed = 0usize;
    let mut record = StringRecord::new();

    while rdr.read_record(&mut record).context("failed to read csv row")? {
        let sku = idx_sku
            .and_then(|i| record.get(i))
            .unwrap_or("")
            .trim();
        // Rows without a SKU are dropped silently: they still count toward
        // the total but never toward processed.
        if sku.is_empty() {
            continue;
        }

        batch.push(ProductRow {
            sku: sku.to_string(),
            sku_normalized: sku.to_lowercase(),
            name: idx_name.and_then(|i| record.get(i)).unwrap_or("").to_string(),
            description: idx_desc.and_then(|i| record.get(i)).unwrap_or("").to_string(),
            active: true,
        });

        if batch.len() == batch_size {
            writer.upsert_batch(&batch).await?;
            processed += batch.len();
            batch.clear();
            let pct = (processed * 100 / total) as u8;
            progress
                .set(token, pct, &format!("Processed {processed}/{total}"))
                .await;
        }
    }

    if !batch.is_empty() {
        writer.upsert_batch(&batch).await?;
        processed += batch.len();
        let pct = (processed * 100 / total) as u8;
        progress
            .set(token, pct, &format!("Processed {processed}/{total}"))
            .await;
    }

    progress.set(token, 100, "Completed").await;
    info!(token, processed, total, "import completed");
    Ok(ImportSummary {
        processed,
        outcome: ImportOutcome::Done,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::progress::InMemoryProgress;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    #[derive(Default)]
    struct RecordingWriter {
        batches: Mutex<Vec<Vec<ProductRow>>>,
    }

    #[async_trait]
    impl CatalogWriter for RecordingWriter {
        async fn upsert_batch(&self, rows: &[ProductRow]) -> Result<()> {
            self.batches.lock().unwrap().push(rows.to_vec());
            Ok(())
        }
    }

    /// Double that applies the store's insert-or-update contract: one entry
    /// per normalized SKU, incoming values overwrite.
    #[derive(Default)]
    struct UpsertingWriter {
        products: Mutex<HashMap<String, ProductRow>>,
    }

    #[async_trait]
    impl CatalogWriter for UpsertingWriter {
        async fn upsert_batch(&self, rows: &[ProductRow]) -> Result<()> {
            let mut products = self.products.lock().unwrap();
            for r in rows {
                products.insert(r.sku_normalized.clone(), r.clone());
            }
            Ok(())
        }
    }

    struct FailingWriter;

    #[async_trait]
    impl CatalogWriter for FailingWriter {
        async fn upsert_batch(&self, _rows: &[ProductRow]) -> Result<()> {
            Err(anyhow!("connection reset"))
        }
    }

    /// Records every (percent, message) write so ordering can be asserted.
    #[derive(Default)]
    struct RecordingProgress {
        writes: Mutex<Vec<(u8, String)>>,
    }

    #[async_trait]
    impl ProgressStore for RecordingProgress {
        async fn set(&self, _token: &str, percent: u8, message: &str) {
            self.writes.lock().unwrap().push((percent, message.to_string()));
        }

        async fn get(&self, _token: &str) -> (u8, String) {
            self.writes
                .lock()
                .unwrap()
                .last()
                .cloned()
                .unwrap_or((0, "not found".to_string()))
        }
    }

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn header_only_file_completes_immediately() {
        let file = csv_file("sku,name,description\n");
        let writer = RecordingWriter::default();
        let progress = InMemoryProgress::new();

        let summary = run_import(file.path(), "t", &writer, &progress, BATCH_SIZE)
            .await
            .unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.outcome, ImportOutcome::Empty);
        assert!(writer.batches.lock().unwrap().is_empty());
        assert_eq!(progress.get("t").await, (100, "No rows".to_string()));
    }

    #[tokio::test]
    async fn blank_sku_rows_are_dropped_but_counted_in_total() {
        let mut body = String::from("sku,name\n");
        for i in 0..10 {
            // rows 3 and 7 carry a blank SKU
            if i == 3 || i == 7 {
                body.push_str(",skipped\n");
            } else {
                body.push_str(&format!("SKU-{i},item {i}\n"));
            }
        }
        let file = csv_file(&body);
        let writer = RecordingWriter::default();
        let progress = RecordingProgress::default();

        let summary = run_import(file.path(), "t", &writer, &progress, 4)
            .await
            .unwrap();

        assert_eq!(summary.processed, 8);
        assert_eq!(summary.outcome, ImportOutcome::Done);

        // Percent math uses the full 10-row denominator.
        let writes = progress.writes.lock().unwrap();
        assert_eq!(writes[0], (40, "Processed 4/10".to_string()));
        assert_eq!(writes[1], (80, "Processed 8/10".to_string()));
        assert_eq!(writes.last().unwrap(), &(100, "Completed".to_string()));
    }

    #[tokio::test]
    async fn batches_flush_at_the_configured_boundary() {
        let mut body = String::from("sku,name,description\n");
        for i in 0..2500 {
            body.push_str(&format!("SKU-{i},name {i},desc {i}\n"));
        }
        let file = csv_file(&body);
        let writer = RecordingWriter::default();
        let progress = RecordingProgress::default();

        let summary = run_import(file.path(), "t", &writer, &progress, 1000)
            .await
            .unwrap();

        assert_eq!(summary.processed, 2500);
        let batches = writer.batches.lock().unwrap();
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);

        let writes = progress.writes.lock().unwrap();
        let percents: Vec<u8> = writes.iter().map(|(p, _)| *p).collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents, vec![40, 80, 100, 100]);
        assert_eq!(writes[2].1, "Processed 2500/2500");
        assert_eq!(writes[3].1, "Completed");
    }

    #[tokio::test]
    async fn uppercase_sku_header_is_accepted() {
        let file = csv_file("SKU,name\nAbC-1,widget\n");
        let writer = RecordingWriter::default();
        let progress = InMemoryProgress::new();

        let summary = run_import(file.path(), "t", &writer, &progress, BATCH_SIZE)
            .await
            .unwrap();

        assert_eq!(summary.processed, 1);
        let batches = writer.batches.lock().unwrap();
        assert_eq!(batches[0][0].sku, "AbC-1");
        assert_eq!(batches[0][0].sku_normalized, "abc-1");
        assert!(batches[0][0].active);
    }

    #[tokio::test]
    async fn sku_is_trimmed_and_missing_columns_default_empty() {
        let file = csv_file("sku\n  ABC-1  \n");
        let writer = RecordingWriter::default();
        let progress = InMemoryProgress::new();

        run_import(file.path(), "t", &writer, &progress, BATCH_SIZE)
            .await
            .unwrap();

        let batches = writer.batches.lock().unwrap();
        assert_eq!(batches[0][0].sku, "ABC-1");
        assert_eq!(batches[0][0].name, "");
        assert_eq!(batches[0][0].description, "");
    }

    #[tokio::test]
    async fn reimport_updates_instead_of_duplicating() {
        let writer = UpsertingWriter::default();
        let progress = InMemoryProgress::new();

        let first = csv_file("sku,name,description\nABC-1,first,old\nXYZ-2,other,\n");
        run_import(first.path(), "t1", &writer, &progress, BATCH_SIZE)
            .await
            .unwrap();

        // Same catalog, different case for the same SKU: must update in
        // place, not create a second entry.
        let second = csv_file("sku,name,description\nabc-1,second,new\nXYZ-2,other,\n");
        let summary = run_import(second.path(), "t2", &writer, &progress, BATCH_SIZE)
            .await
            .unwrap();
        assert_eq!(summary.processed, 2);

        let products = writer.products.lock().unwrap();
        assert_eq!(products.len(), 2);

        let p = &products["abc-1"];
        assert_eq!(p.sku, "abc-1");
        assert_eq!(p.name, "second");
        assert_eq!(p.description, "new");
    }

    #[tokio::test]
    async fn writer_failure_propagates() {
        let file = csv_file("sku\nABC-1\n");
        let progress = InMemoryProgress::new();

        let err = run_import(file.path(), "t", &FailingWriter, &progress, BATCH_SIZE)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }
}
