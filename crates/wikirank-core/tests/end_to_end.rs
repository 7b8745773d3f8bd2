//! End-to-end tests: CSV on disk → `run` → output directory

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wikirank_core::manifest::MANIFEST_FILE;
use wikirank_core::report::{LANG_SUMMARY_FILE, QUALITY_BINS_FILE, TITLE_LEN_BINS_FILE, TOPK_FILE};
use wikirank_core::sink::RECORDS_FILE;
use wikirank_core::{Config, EtlError, EtlParams, NormalizedRecord, ProgressContext, RunManifest};

const HEADER: &str = "Language,Title,Page_ID,WikiRank_score\n";

fn write_input(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("{HEADER}{body}")).expect("Failed to write input");
    path
}

fn config(input: PathBuf, output_dir: PathBuf) -> Config {
    Config {
        input,
        output_dir,
        ..Default::default()
    }
}

fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap_or_else(|e| panic!("{name}: {e}"))
}

fn records(dir: &Path) -> Vec<NormalizedRecord> {
    read(dir, RECORDS_FILE)
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid JSONL line"))
        .collect()
}

/// Deterministic mixed input: several languages, some missing fields.
fn synthetic_body(n: usize) -> String {
    let langs = ["en", "fr", "de", "pl", ""];
    let mut body = String::new();
    for i in 0..n {
        let lang = langs[i % langs.len()];
        let quality = match i % 7 {
            0 => String::new(),
            // repeated scores exercise the page_id tie-break
            1 | 2 => "80".to_string(),
            _ => format!("{:.3}", (i * 37 % 1000) as f64 / 10.0),
        };
        let page_id = if i % 11 == 0 { String::new() } else { (i * 13 % 97).to_string() };
        body.push_str(&format!("{lang},\"Title, number {i}\",{page_id},{quality}\n"));
    }
    body
}

#[test]
fn three_row_scenario() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(tmp.path(), "in.csv", "en,Cat,1,85\nen,Dog,2,60\nfr,Chat,3,\n");
    let out = tmp.path().join("out");

    let mut cfg = config(input, out.clone());
    cfg.params.top_k = 1;
    let summary = wikirank_core::run(&cfg, &ProgressContext::hidden()).expect("Run should succeed");

    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.languages, 2);
    assert_eq!(summary.topk_entries, 1);
    assert_eq!(summary.chunks, 1);

    assert_eq!(
        read(&out, LANG_SUMMARY_FILE),
        "lang,article_count,avg_quality,high_quality_ratio\nen,2,72.5,0.5\nfr,1,0.0,0.0\n"
    );
    assert_eq!(
        read(&out, QUALITY_BINS_FILE),
        "lang,quality_bin,bin_count\nen,60,1\nen,80,1\nfr,-1,1\n"
    );
    assert_eq!(
        read(&out, TITLE_LEN_BINS_FILE),
        concat!(
            "lang,title_len_bin,bin_count,avg_quality,high_quality_ratio\n",
            "en,0,2,72.5,0.5\nfr,0,1,0.0,0.0\n"
        )
    );
    assert_eq!(
        read(&out, TOPK_FILE),
        "lang\trank\tquality\tpage_id\ttitle\nen\t1\t85.0\t1\tCat\n"
    );

    let jsonl = read(&out, RECORDS_FILE);
    let lines: Vec<&str> = jsonl.lines().collect();
    assert_eq!(
        lines[0],
        r#"{"lang":"en","title":"Cat","page_id":1,"quality":85.0,"title_len":3,"quality_bin":80,"is_high_quality":1,"title_len_bin":0}"#
    );
    assert_eq!(
        lines[2],
        r#"{"lang":"fr","title":"Chat","page_id":3,"quality":null,"title_len":4,"quality_bin":-1,"is_high_quality":0,"title_len_bin":0}"#
    );
    assert!(out.join(MANIFEST_FILE).exists());
}

#[test]
fn missing_columns_fail_before_touching_outputs() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.csv");
    std::fs::write(&input, "lang,Title,page\nen,Cat,1\n").unwrap();
    let out = tmp.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join(LANG_SUMMARY_FILE), "previous run").unwrap();

    let err = wikirank_core::run(&config(input, out.clone()), &ProgressContext::hidden())
        .expect_err("Run should fail on missing columns");

    let etl = err
        .downcast_ref::<EtlError>()
        .expect("Root cause should be an EtlError");
    match etl {
        EtlError::MissingColumns(cols) => {
            assert_eq!(cols, &["Language", "Page_ID", "WikiRank_score"]);
        }
        other => panic!("Unexpected error: {other}"),
    }
    assert_eq!(etl.exit_code(), 2);
    assert_eq!(read(&out, LANG_SUMMARY_FILE), "previous run");
    assert!(!out.join(RECORDS_FILE).exists());
}

#[test]
fn invalid_params_rejected() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(tmp.path(), "in.csv", "en,Cat,1,85\n");
    let mut cfg = config(input, tmp.path().join("out"));
    cfg.params.quality_bin_size = 0;

    let err = wikirank_core::run(&cfg, &ProgressContext::hidden()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EtlError>(),
        Some(EtlError::InvalidConfig(_))
    ));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn stale_outputs_removed_on_rerun() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(tmp.path(), "in.csv", "en,Cat,1,85\n");
    let out = tmp.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("lang_topk.parquet"), b"stale").unwrap();
    std::fs::write(out.join("articles_clean.jsonl.tmp"), b"partial").unwrap();
    std::fs::write(out.join("keep.txt"), b"user file").unwrap();

    wikirank_core::run(&config(input, out.clone()), &ProgressContext::hidden()).unwrap();

    assert!(!out.join("lang_topk.parquet").exists());
    assert!(!out.join("articles_clean.jsonl.tmp").exists());
    assert!(out.join("keep.txt").exists());
    assert_eq!(records(&out).len(), 1);
}

#[test]
fn jsonl_preserves_row_order_and_cleans_titles() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(
        tmp.path(),
        "in.csv",
        "en,\"  Multi\nLine\tTitle \",10,12.5\nde,Zebra,12.0,NaN\nen,,x,99\n",
    );
    let out = tmp.path().join("out");
    wikirank_core::run(&config(input, out.clone()), &ProgressContext::hidden()).unwrap();

    let recs = records(&out);
    assert_eq!(recs.len(), 3);
    assert_eq!(recs[0].title, "Multi Line Title");
    assert_eq!(recs[0].title_len, 16);
    assert_eq!(recs[0].quality_bin, 10);
    assert_eq!(recs[1].language.as_deref(), Some("de"));
    assert_eq!(recs[1].page_id, Some(12));
    assert_eq!(recs[1].quality, None);
    assert_eq!(recs[2].title, "");
    assert_eq!(recs[2].page_id, None);
    assert!(recs[2].is_high_quality);
}

#[test]
fn chunk_size_does_not_change_outputs() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(tmp.path(), "in.csv", &synthetic_body(500));

    let mut outputs = Vec::new();
    for chunk_size in [1, 7, 1000] {
        let out = tmp.path().join(format!("out_{chunk_size}"));
        let mut cfg = config(input.clone(), out.clone());
        cfg.params.chunk_size = chunk_size;
        cfg.params.top_k = 5;
        let summary = wikirank_core::run(&cfg, &ProgressContext::hidden()).unwrap();
        assert_eq!(summary.rows_read, 500);
        outputs.push((out, summary));
    }

    let (first_dir, first) = &outputs[0];
    assert_eq!(first.chunks, 500);
    for (dir, summary) in &outputs[1..] {
        for name in [
            RECORDS_FILE,
            LANG_SUMMARY_FILE,
            QUALITY_BINS_FILE,
            TITLE_LEN_BINS_FILE,
            TOPK_FILE,
        ] {
            assert_eq!(read(first_dir, name), read(dir, name), "{name} differs");
        }
        assert_eq!(first.content_hash, summary.content_hash);
    }
}

#[test]
fn rows_without_language_dropped_by_default() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(tmp.path(), "in.csv", "en,Cat,1,85\n,Ghost,2,90\nNA,Other,3,95\n");
    let out = tmp.path().join("out");

    let summary =
        wikirank_core::run(&config(input, out.clone()), &ProgressContext::hidden()).unwrap();
    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.rows_without_language, 2);
    assert_eq!(summary.languages, 1);

    let recs = records(&out);
    assert_eq!(recs.len(), 3);
    assert_eq!(recs[1].language, None);
    assert!(read(&out, RECORDS_FILE).contains(r#"{"lang":null,"title":"Ghost""#));
    assert_eq!(
        read(&out, LANG_SUMMARY_FILE),
        "lang,article_count,avg_quality,high_quality_ratio\nen,1,85.0,1.0\n"
    );
}

#[test]
fn rows_without_language_bucketed_when_configured() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(tmp.path(), "in.csv", "en,Cat,1,85\n,Ghost,2,90\n");
    let out = tmp.path().join("out");
    let mut cfg = config(input, out.clone());
    cfg.params = EtlParams {
        unknown_language: Some("unknown".to_string()),
        ..Default::default()
    };

    let summary = wikirank_core::run(&cfg, &ProgressContext::hidden()).unwrap();
    assert_eq!(summary.rows_without_language, 0);
    assert_eq!(summary.languages, 2);
    assert!(read(&out, LANG_SUMMARY_FILE).contains("unknown,1,90.0,1.0"));
    assert!(read(&out, TOPK_FILE).contains("unknown\t1\t90.0\t2\tGhost"));
    // The record stream keeps the source value
    assert_eq!(records(&out)[1].language, None);
}

#[test]
fn gzip_input_matches_plain() {
    let tmp = TempDir::new().unwrap();
    let body = synthetic_body(120);
    let plain = write_input(tmp.path(), "in.csv", &body);

    let gz_path = tmp.path().join("in.csv.gz");
    let mut encoder = flate2::write::GzEncoder::new(
        std::fs::File::create(&gz_path).unwrap(),
        flate2::Compression::default(),
    );
    encoder.write_all(HEADER.as_bytes()).unwrap();
    encoder.write_all(body.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let out_plain = tmp.path().join("plain");
    let out_gz = tmp.path().join("gz");
    let a = wikirank_core::run(&config(plain, out_plain), &ProgressContext::hidden()).unwrap();
    let b = wikirank_core::run(&config(gz_path, out_gz), &ProgressContext::hidden()).unwrap();

    assert_eq!(b.rows_read, 120);
    assert_eq!(a.content_hash, b.content_hash);
}

#[test]
fn parquet_tables_written_when_enabled() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(tmp.path(), "in.csv", &synthetic_body(50));
    let out = tmp.path().join("out");
    let mut cfg = config(input, out.clone());
    cfg.parquet = true;

    let summary = wikirank_core::run(&cfg, &ProgressContext::hidden()).unwrap();
    assert_eq!(summary.tables.len(), 8);
    for name in [
        "lang_summary.parquet",
        "lang_quality_bin_summary.parquet",
        "lang_titlelen_bin_summary.parquet",
        "lang_topk.parquet",
    ] {
        assert!(wikirank_core::sink::is_valid_parquet(&out.join(name)), "{name}");
    }

    let manifest = RunManifest::read_from(&out).unwrap();
    assert_eq!(manifest.file_hashes.len(), 9);
}

#[test]
fn manifest_verifies_and_detects_tampering() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(tmp.path(), "in.csv", &synthetic_body(40));
    let out = tmp.path().join("out");
    let summary =
        wikirank_core::run(&config(input, out.clone()), &ProgressContext::hidden()).unwrap();

    let manifest = RunManifest::read_from(&out).unwrap();
    assert_eq!(manifest.content_hash, summary.content_hash);
    assert_eq!(manifest.counts.rows_read, 40);
    assert!(manifest.verify(&out).is_clean());

    std::fs::write(out.join(TOPK_FILE), "lang\trank\n").unwrap();
    let report = manifest.verify(&out);
    assert_eq!(report.mismatched, vec![TOPK_FILE.to_string()]);
}

#[test]
fn empty_input_produces_header_only_tables() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(tmp.path(), "in.csv", "");
    let out = tmp.path().join("out");

    let summary =
        wikirank_core::run(&config(input, out.clone()), &ProgressContext::hidden()).unwrap();
    assert_eq!(summary.rows_read, 0);
    assert_eq!(summary.chunks, 0);
    assert_eq!(read(&out, RECORDS_FILE), "");
    assert_eq!(read(&out, TOPK_FILE), "lang\trank\tquality\tpage_id\ttitle\n");
}
