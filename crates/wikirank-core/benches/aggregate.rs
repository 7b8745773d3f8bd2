use wikirank_core::normalize::RawRow;
use wikirank_core::{AggregationSession, EtlParams, JsonlSink, RecordSink};

fn synthetic_rows(n: usize) -> Vec<RawRow> {
    let langs = ["en", "de", "fr", "pl", "ja", "es", "it", "ru"];
    (0..n)
        .map(|i| RawRow {
            language: Some(langs[i % langs.len()].to_string()),
            title: Some(format!("Article title number {i}")),
            page_id: Some(i.to_string()),
            quality: Some(format!("{:.2}", (i * 7919 % 10_000) as f64 / 100.0)),
        })
        .collect()
}

#[divan::bench(args = [10, 50, 500])]
fn normalize_and_observe(bencher: divan::Bencher, top_k: usize) {
    let rows = synthetic_rows(100_000);
    let params = EtlParams {
        top_k,
        ..Default::default()
    };
    bencher
        .with_inputs(|| rows.clone())
        .bench_values(|rows| {
            let mut session = AggregationSession::new(&params);
            for raw in rows {
                let rec = session.normalize(raw);
                session.observe(&rec);
            }
            session.finish()
        });
}

#[divan::bench]
fn jsonl_append(bencher: divan::Bencher) {
    let session = AggregationSession::new(&EtlParams::default());
    let records: Vec<_> = synthetic_rows(20_000)
        .into_iter()
        .map(|raw| session.normalize(raw))
        .collect();
    let dir = tempfile::tempdir().unwrap();
    bencher.bench(|| {
        let mut sink = JsonlSink::create(dir.path()).unwrap();
        sink.append(&records).unwrap();
        sink.finish().unwrap();
    });
}

fn main() {
    divan::main();
}
