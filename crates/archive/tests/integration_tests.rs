//! Integration tests for the archive crate
//!
//! These tests run the complete export flow from discovery to the
//! acquisition log, over in-memory and on-disk collaborators.

use anyhow::bail;
use archive::models::{Attachment, Message, MessageId, ThreadId};
use archive::{
    ArchiveLedger, ConversionBackend, DraftId, ExportConfig, ExportReport, ExportStatus, Exporter,
    FsDestination, InMemoryDestination, InMemoryKeyValueStore, InMemoryMailSource, KeyValueLedger,
    LocalPdfBackend, RenderMode, SqliteKeyValueStore,
};
use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Backend that fails for any content containing a marker string
#[derive(Default)]
struct MarkerBackend {
    fail_marker: Mutex<Option<String>>,
    drafts_open: Mutex<usize>,
}

impl MarkerBackend {
    fn fail_on(&self, marker: Option<&str>) {
        *self.fail_marker.lock().unwrap() = marker.map(String::from);
    }

    fn check(&self, content: &str) -> anyhow::Result<()> {
        if let Some(marker) = self.fail_marker.lock().unwrap().as_deref()
            && content.contains(marker)
        {
            bail!("renderer rejected content containing {marker}");
        }
        Ok(())
    }
}

impl ConversionBackend for MarkerBackend {
    fn create_draft(&self, _title: &str, text: &str) -> anyhow::Result<DraftId> {
        *self.drafts_open.lock().unwrap() += 1;
        Ok(DraftId(text.to_string()))
    }

    fn export_pdf(&self, draft: &DraftId) -> anyhow::Result<Vec<u8>> {
        self.check(&draft.0)?;
        Ok(format!("%PDF {}", draft.0.len()).into_bytes())
    }

    fn discard_draft(&self, _draft: &DraftId) -> anyhow::Result<()> {
        *self.drafts_open.lock().unwrap() -= 1;
        Ok(())
    }

    fn markup_to_pdf(&self, markup: &str) -> anyhow::Result<Vec<u8>> {
        self.check(markup)?;
        Ok(b"%PDF html".to_vec())
    }
}

/// Helper to create test messages
fn make_message(id: &str, thread_id: &str, subject: &str, body: &str) -> Message {
    Message::builder(MessageId::new(id), ThreadId::new(thread_id))
        .rfc822_id(format!("<{}@mail.example.com>", id))
        .from("Alice Example <alice@example.com>")
        .to("Bob <bob@example.com>, carol@example.com")
        .subject(subject)
        .body_text(body)
        .received_at(Utc.with_ymd_and_hms(2024, 5, 2, 14, 30, 0).unwrap())
        .build()
}

/// Q1 matches t1 and t2, Q2 matches t2 and t3
fn overlapping_source() -> InMemoryMailSource {
    let source = InMemoryMailSource::new();
    source.insert_thread("t1", vec![make_message("m1", "t1", "Budget review", "numbers")]);
    source.insert_thread(
        "t2",
        vec![
            make_message("m2", "t2", "Site visit", "see you there"),
            make_message("m3", "t2", "Re: Site visit", "POISON reply"),
        ],
    );
    source.insert_thread("t3", vec![make_message("m4", "t3", "Invoice 42", "attached")]);
    source.set_results("Q1", ["t1", "t2"]);
    source.set_results("Q2", ["t2", "t3"]);
    source
}

fn test_config(queries: &[&str]) -> ExportConfig {
    ExportConfig {
        queries: queries.iter().map(|q| q.to_string()).collect(),
        delay_ms: 0,
        ..ExportConfig::default()
    }
}

fn run(
    config: &ExportConfig,
    source: &InMemoryMailSource,
    ledger: &dyn ArchiveLedger,
    destination: &InMemoryDestination,
    backend: &MarkerBackend,
) -> ExportReport {
    Exporter::new(config, source, ledger, destination, backend)
        .run()
        .unwrap()
}

fn summary(report: &ExportReport) -> Vec<(String, String, ExportStatus)> {
    report
        .log
        .rows()
        .iter()
        .map(|r| (r.query.clone(), r.thread_id.to_string(), r.status))
        .collect()
}

#[test]
fn test_idempotent_across_runs() {
    let source = overlapping_source();
    let ledger = KeyValueLedger::new(Arc::new(InMemoryKeyValueStore::new()), "exported_");
    let destination = InMemoryDestination::new();
    let backend = MarkerBackend::default();
    let config = test_config(&["Q1", "Q2"]);

    let first = run(&config, &source, &ledger, &destination, &backend);
    assert_eq!(
        summary(&first),
        vec![
            ("Q1".into(), "t1".into(), ExportStatus::Exported),
            ("Q1".into(), "t2".into(), ExportStatus::Exported),
            ("Q2".into(), "t3".into(), ExportStatus::Exported),
        ]
    );
    assert_eq!(first.stats.duplicates, 1);

    let second = run(&config, &source, &ledger, &destination, &backend);
    assert_eq!(
        summary(&second),
        vec![
            ("Q1".into(), "t1".into(), ExportStatus::SkipExists),
            ("Q1".into(), "t2".into(), ExportStatus::SkipExists),
            ("Q2".into(), "t3".into(), ExportStatus::SkipExists),
        ]
    );
    assert_eq!(second.stats.exported, 0);

    // Three archives and two logs, nothing else
    let pdfs = destination
        .paths()
        .into_iter()
        .filter(|p| p.ends_with(".pdf"))
        .count();
    assert_eq!(pdfs, 3);
}

#[test]
fn test_conversion_failure_is_retried_next_run() {
    let source = overlapping_source();
    let ledger = KeyValueLedger::new(Arc::new(InMemoryKeyValueStore::new()), "exported_");
    let destination = InMemoryDestination::new();
    let backend = MarkerBackend::default();
    let config = test_config(&["Q1", "Q2"]);

    backend.fail_on(Some("POISON"));
    let first = run(&config, &source, &ledger, &destination, &backend);

    let t2 = &first.log.rows()[1];
    assert_eq!(t2.thread_id, ThreadId::new("t2"));
    assert_eq!(t2.status, ExportStatus::Error);
    assert!(t2.error.contains("POISON"));
    assert!(t2.filename.is_empty());
    assert!(!ledger.is_archived(&ThreadId::new("t2")).unwrap());
    // The failure did not stop later threads
    assert_eq!(first.log.rows()[2].status, ExportStatus::Exported);
    // Every draft was discarded
    assert_eq!(*backend.drafts_open.lock().unwrap(), 0);

    backend.fail_on(None);
    let second = run(&config, &source, &ledger, &destination, &backend);
    assert_eq!(
        summary(&second),
        vec![
            ("Q1".into(), "t1".into(), ExportStatus::SkipExists),
            ("Q1".into(), "t2".into(), ExportStatus::Exported),
            ("Q2".into(), "t3".into(), ExportStatus::SkipExists),
        ]
    );
}

#[test]
fn test_log_has_one_row_per_distinct_thread() {
    let source = overlapping_source();
    source.set_results("Q3", ["t3", "t1", "missing"]);
    let ledger = KeyValueLedger::new(Arc::new(InMemoryKeyValueStore::new()), "exported_");
    let destination = InMemoryDestination::new();
    let backend = MarkerBackend::default();

    let report = run(&test_config(&["Q1", "Q2", "Q3"]), &source, &ledger, &destination, &backend);

    let ids: Vec<String> = report.log.rows().iter().map(|r| r.thread_id.to_string()).collect();
    let distinct: HashSet<&String> = ids.iter().collect();
    assert_eq!(ids.len(), distinct.len());
    assert_eq!(ids, vec!["t1", "t2", "t3", "missing"]);
    assert_eq!(report.stats.threads_logged(), 4);
    assert_eq!(report.stats.duplicates, 3);
}

#[test]
fn test_failed_query_does_not_stop_run() {
    let source = overlapping_source();
    source.fail_query("Q1");
    let ledger = KeyValueLedger::new(Arc::new(InMemoryKeyValueStore::new()), "exported_");
    let destination = InMemoryDestination::new();
    let backend = MarkerBackend::default();

    let report = run(&test_config(&["Q1", "Q2"]), &source, &ledger, &destination, &backend);

    assert_eq!(report.stats.queries_failed, 1);
    assert_eq!(
        summary(&report),
        vec![
            ("Q2".into(), "t2".into(), ExportStatus::Exported),
            ("Q2".into(), "t3".into(), ExportStatus::Exported),
        ]
    );
}

#[test]
fn test_rich_mode_converts_markup() {
    let source = InMemoryMailSource::new();
    let html = Message::builder(MessageId::new("m1"), ThreadId::new("t1"))
        .from("alice@example.com")
        .subject("<Quarterly> & more")
        .body_html("<p>Figures attached</p>")
        .build();
    source.insert_thread("t1", vec![html]);
    source.set_results("q", ["t1"]);

    let ledger = KeyValueLedger::new(Arc::new(InMemoryKeyValueStore::new()), "exported_");
    let destination = InMemoryDestination::new();
    let backend = MarkerBackend::default();
    // Escaped header text must not trip the marker
    backend.fail_on(Some("<Quarterly>"));

    let config = ExportConfig {
        render_mode: RenderMode::Rich,
        ..test_config(&["q"])
    };
    let report = run(&config, &source, &ledger, &destination, &backend);

    assert_eq!(report.log.rows()[0].status, ExportStatus::Exported);
    let name = &report.log.rows()[0].filename;
    assert_eq!(destination.read(name).unwrap(), b"%PDF html");
    // Angle brackets never reach the file name
    assert!(!name.contains('<') && !name.contains('>'));
}

#[test]
fn test_attachments_named_after_archive() {
    let source = InMemoryMailSource::new();
    let msg = make_message("m1", "t1", "Scans", "see attached");
    let msg = Message {
        attachments: vec![
            Attachment::inline("scan 1.png", "image/png", vec![1, 2, 3]),
            Attachment::inline("", "application/octet-stream", vec![4]),
        ],
        ..msg
    };
    source.insert_thread("t1", vec![msg]);
    source.set_results("q", ["t1"]);

    let ledger = KeyValueLedger::new(Arc::new(InMemoryKeyValueStore::new()), "exported_");
    let destination = InMemoryDestination::new();
    let backend = MarkerBackend::default();
    let report = run(&test_config(&["q"]), &source, &ledger, &destination, &backend);

    assert_eq!(report.log.rows()[0].attachments_count, Some(2));
    let stem = "[2024-05-02]_[Scans]_[Alice_Example]_[Bob]";
    let folder = format!("{stem}_attachments");
    let attachments: Vec<String> = destination
        .paths()
        .into_iter()
        .filter(|p| p.starts_with(&format!("{folder}/")))
        .collect();
    assert_eq!(attachments.len(), 2);
    assert!(attachments[0].starts_with(&format!("{folder}/{stem}__msg_")));
    assert!(attachments.iter().any(|p| p.ends_with("__att_1__scan_1.png")));
    assert!(attachments.iter().any(|p| p.ends_with("__att_2__attachment")));
}

#[test]
fn test_end_to_end_on_disk() {
    let dir = TempDir::new().unwrap();
    let source = overlapping_source();
    let config = ExportConfig {
        destination: dir.path().join("archive"),
        ledger_path: Some(dir.path().join("state").join("ledger.test.sqlite")),
        scratch_dir: Some(dir.path().join("drafts")),
        ..test_config(&["Q1", "Q2"])
    };

    let run_once = || {
        let store = Arc::new(SqliteKeyValueStore::new(config.resolved_ledger_path().unwrap()).unwrap());
        let ledger = KeyValueLedger::new(store, config.ledger_key_prefix.clone());
        let destination = FsDestination::new(&config.destination).unwrap();
        let backend = LocalPdfBackend::new(config.resolved_scratch_dir()).unwrap();
        Exporter::new(&config, &source, &ledger, &destination, &backend)
            .run()
            .unwrap()
    };

    let first = run_once();
    assert_eq!(first.stats.exported, 3);
    let exported = &first.log.rows()[0];
    let pdf = std::fs::read(config.destination.join(&exported.filename)).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert!(exported.file_url.starts_with("file://"));

    let log_path = config.destination.join(&first.log_file.name);
    let csv = std::fs::read_to_string(log_path).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.starts_with("query,threadId,filename,"));

    // Drafts never outlive a conversion
    assert_eq!(std::fs::read_dir(dir.path().join("drafts")).unwrap().count(), 0);

    // A fresh process sees the same ledger
    let second = run_once();
    assert_eq!(second.stats.skipped, 3);
    assert_eq!(second.stats.exported, 0);
}

#[test]
fn test_multibyte_subject_exports_on_disk() {
    let dir = TempDir::new().unwrap();
    let subject = "会議の議事録と来期予算の最終確認について至急ご確認ください".repeat(3);
    let msg = make_message("m1", "18c2f9a0b1d2e3f4", &subject, "本文");
    let msg = Message {
        attachments: vec![Attachment::inline(
            format!("{}.pdf", "見積書".repeat(30)),
            "application/pdf",
            vec![1, 2, 3],
        )],
        ..msg
    };
    let source = InMemoryMailSource::new();
    source.insert_thread("18c2f9a0b1d2e3f4", vec![msg]);
    source.set_results("q", ["18c2f9a0b1d2e3f4"]);

    let config = ExportConfig {
        destination: dir.path().join("out"),
        scratch_dir: Some(dir.path().join("drafts")),
        ..test_config(&["q"])
    };
    let ledger = KeyValueLedger::new(Arc::new(InMemoryKeyValueStore::new()), "exported_");
    let destination = FsDestination::new(&config.destination).unwrap();
    let backend = LocalPdfBackend::new(config.resolved_scratch_dir()).unwrap();
    let report = Exporter::new(&config, &source, &ledger, &destination, &backend)
        .run()
        .unwrap();

    let row = &report.log.rows()[0];
    assert_eq!(row.status, ExportStatus::Exported, "{}", row.error);
    assert!(row.filename.ends_with("__TID_b1d2e3f4.pdf"));
    assert!(config.destination.join(&row.filename).is_file());
    assert_eq!(report.stats.attachments_captured, 1);
    assert_eq!(report.stats.attachments_failed, 0);
    assert!(ledger.is_archived(&ThreadId::new("18c2f9a0b1d2e3f4")).unwrap());
}

#[test]
fn test_existing_archive_from_other_tool_is_skipped() {
    let dir = TempDir::new().unwrap();
    let source = overlapping_source();
    let config = test_config(&["Q1"]);

    let destination = FsDestination::new(dir.path()).unwrap();
    let expected = "[2024-05-02]_[Budget_review]_[Alice_Example]_[Bob]__TID_t1.pdf";
    std::fs::write(dir.path().join(expected), b"manual copy").unwrap();

    let ledger = KeyValueLedger::new(Arc::new(InMemoryKeyValueStore::new()), "exported_");
    let backend = MarkerBackend::default();
    let report = Exporter::new(&config, &source, &ledger, &destination, &backend)
        .run()
        .unwrap();

    let row = &report.log.rows()[0];
    assert_eq!(row.status, ExportStatus::SkipExists);
    assert_eq!(row.filename, expected);
    assert!(ledger.is_archived(&ThreadId::new("t1")).unwrap());
    assert_eq!(std::fs::read(dir.path().join(expected)).unwrap(), b"manual copy");
}
