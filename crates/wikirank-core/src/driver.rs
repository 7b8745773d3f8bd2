//! Chunk driver: read → normalize → append to sink → aggregate, per chunk

use std::time::Duration;

use crate::error::EtlError;
use crate::normalize::{NormalizedRecord, RawRow};
use crate::progress::ChunkProgress;
use crate::session::AggregationSession;
use crate::sink::RecordSink;
use crate::source::RowSource;

/// Statistics from driving a source to exhaustion
#[derive(Debug, Clone, Default)]
pub struct DriveStats {
    pub chunks: usize,
    pub rows_read: u64,
    pub elapsed: Duration,
}

/// Drive `source` to exhaustion in chunks of `chunk_size` rows.
///
/// Each chunk is normalized, appended to `sink` in one call, then folded
/// into `session`. Memory is one chunk of raw rows plus one of records.
pub fn drive<S, K>(
    source: &mut S,
    session: &mut AggregationSession,
    sink: &mut K,
    chunk_size: usize,
    progress: &ChunkProgress,
) -> Result<DriveStats, EtlError>
where
    S: RowSource + ?Sized,
    K: RecordSink + ?Sized,
{
    if chunk_size == 0 {
        return Err(EtlError::InvalidConfig("chunk_size must be >= 1".into()));
    }

    let mut raw: Vec<RawRow> = Vec::with_capacity(chunk_size.min(1 << 20));
    let mut records: Vec<NormalizedRecord> = Vec::with_capacity(raw.capacity());
    let mut stats = DriveStats::default();

    loop {
        let n = source.next_chunk(chunk_size, &mut raw)?;
        if n == 0 {
            break;
        }
        stats.chunks += 1;
        stats.rows_read += n as u64;

        records.clear();
        records.extend(raw.drain(..).map(|row| session.normalize(row)));

        sink.append(&records)?;
        for record in &records {
            session.observe(record);
        }

        log::debug!("chunk {}: {} rows", stats.chunks, n);
        progress.chunk_done(
            stats.chunks,
            stats.rows_read,
            source.bytes_read(),
            sink.bytes_written(),
        );
    }

    stats.elapsed = progress.elapsed();
    progress.finish();
    Ok(stats)
}
