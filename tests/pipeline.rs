//! Integration tests over fake PDF, OCR and NER backends.
//!
//! No native libraries are needed: pdfium and tesseract are replaced by
//! in-memory fakes that count how often they are called.

use image::DynamicImage;
use resume_lens::{
    Category, ContactField, EntityReconciler, ExtractionMethod, ExtractionOrchestrator, InferenceError,
    ModelCache, NerBackend, OcrEngine, OcrSettings, PdfBackend, PipelineConfig, PipelineError,
    ProcessingMethod, RawEntity, RenderSettings, ResumePipeline, SkillsDictionary, MIME_DOCX,
    MIME_PDF, MIME_TEXT,
};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// PDF whose pages carry the given text layer.
struct FakePdf {
    pages: Vec<String>,
    broken: bool,
}

impl FakePdf {
    fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            broken: false,
        }
    }

    fn broken() -> Self {
        Self {
            pages: vec![],
            broken: true,
        }
    }
}

impl PdfBackend for FakePdf {
    fn page_texts(&self, _path: &Path) -> Result<Vec<Result<String, String>>, String> {
        if self.broken {
            return Err("cannot open PDF: FormatError".into());
        }
        Ok(self.pages.iter().cloned().map(Ok).collect())
    }

    fn render_pages(
        &self,
        _path: &Path,
        _settings: &RenderSettings,
        visit: &mut dyn FnMut(usize, Result<DynamicImage, String>),
    ) -> Result<usize, String> {
        if self.broken {
            return Err("cannot open PDF: FormatError".into());
        }
        for idx in 0..self.pages.len() {
            visit(idx, Ok(DynamicImage::new_rgb8(4, 4)));
        }
        Ok(self.pages.len())
    }
}

/// PDF that remembers the staged path it was given, then blocks for `delay`.
struct SlowPdf {
    seen: Arc<Mutex<Option<(PathBuf, bool)>>>,
    delay: Duration,
}

impl PdfBackend for SlowPdf {
    fn page_texts(&self, path: &Path) -> Result<Vec<Result<String, String>>, String> {
        *self.seen.lock().unwrap() = Some((path.to_path_buf(), path.exists()));
        std::thread::sleep(self.delay);
        Ok(vec![Ok("x".repeat(300))])
    }

    fn render_pages(
        &self,
        _path: &Path,
        _settings: &RenderSettings,
        _visit: &mut dyn FnMut(usize, Result<DynamicImage, String>),
    ) -> Result<usize, String> {
        Ok(0)
    }
}

/// OCR engine that returns fixed text and counts calls.
struct SpyOcr {
    text: String,
    calls: AtomicUsize,
}

impl SpyOcr {
    fn new(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            text: text.into(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for SpyOcr {
    fn recognise(&self, _image: &DynamicImage, settings: &OcrSettings) -> Result<String, String> {
        assert_eq!(settings.page_seg_mode, 6);
        assert_eq!(settings.language, "eng");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

struct FakeNer(Vec<RawEntity>);

impl NerBackend for FakeNer {
    fn model_name(&self) -> &str {
        "fake-ner"
    }

    fn infer(&self, _text: &str) -> Result<Vec<RawEntity>, InferenceError> {
        Ok(self.0.clone())
    }
}

struct FailingNer;

impl NerBackend for FailingNer {
    fn model_name(&self) -> &str {
        "failing-ner"
    }

    fn infer(&self, _text: &str) -> Result<Vec<RawEntity>, InferenceError> {
        Err(InferenceError::Failed("model crashed".into()))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Route library logs to the test harness (`RUST_LOG=resume_lens=debug`).
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn orchestrator(pdf: FakePdf, ocr: Arc<SpyOcr>) -> ExtractionOrchestrator {
    ExtractionOrchestrator::with_backends(PipelineConfig::default(), Arc::new(pdf), ocr)
}

fn docx_bytes(body_xml: &str) -> Vec<u8> {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body_xml}</w:body></w:document>"#
    );
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file("word/document.xml", opts).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

fn ocr_page_text() -> String {
    let mut text = "Jane Roe, Senior Engineer at Acme Inc. ".repeat(25);
    text.truncate(800);
    text
}

// ── Text extraction ──────────────────────────────────────────────────────────

#[tokio::test]
async fn digital_pdf_never_calls_ocr() {
    let pages = vec!["x".repeat(300); 50];
    let ocr = SpyOcr::new("should not be used");
    let doc = orchestrator(FakePdf::new(pages), ocr.clone())
        .extract(b"%PDF-1.7", "cv.pdf", MIME_PDF)
        .await
        .unwrap();

    assert_eq!(doc.processing_method(), ProcessingMethod::DigitalPdf);
    assert_eq!(doc.text().chars().filter(|c| *c == 'x').count(), 15_000);
    assert_eq!(doc.confidence_score(), 1.0);
    assert_eq!(ocr.calls(), 0);
}

#[tokio::test]
async fn scanned_pdf_is_replaced_by_ocr_text() {
    init_logging();
    let ocr_text = ocr_page_text();
    assert_eq!(ocr_text.chars().count(), 800);

    let ocr = SpyOcr::new(ocr_text.clone());
    let doc = orchestrator(FakePdf::new(vec!["y".repeat(50)]), ocr.clone())
        .extract(b"%PDF-1.7", "scan.pdf", MIME_PDF)
        .await
        .unwrap();

    assert_eq!(doc.processing_method(), ProcessingMethod::Ocr);
    assert_eq!(doc.text(), ocr_text);
    assert_eq!(doc.confidence_score(), 0.8);
    assert_eq!(ocr.calls(), 1);
}

#[tokio::test]
async fn staged_file_is_removed_after_caller_times_out() {
    let seen = Arc::new(Mutex::new(None));
    let config = PipelineConfig::builder().concurrency(1).build().unwrap();
    let orch = ExtractionOrchestrator::with_backends(
        config,
        Arc::new(SlowPdf {
            seen: Arc::clone(&seen),
            delay: Duration::from_millis(300),
        }),
        SpyOcr::new("unused"),
    );

    let timed_out = tokio::time::timeout(
        Duration::from_millis(20),
        orch.extract(b"%PDF", "slow.pdf", MIME_PDF),
    )
    .await;
    assert!(timed_out.is_err(), "extraction should still be running");

    // The blocking task keeps going after the caller gave up.
    let mut path = None;
    for _ in 0..200 {
        if let Some((p, existed)) = seen.lock().unwrap().clone() {
            assert!(existed, "backend saw a missing staged file");
            if !p.exists() {
                path = Some(p);
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(path.is_some(), "staged file was never removed");

    // The single permit came back too.
    let doc = tokio::time::timeout(
        Duration::from_secs(5),
        orch.extract(b"%PDF", "again.pdf", MIME_PDF),
    )
    .await
    .expect("permit leaked")
    .unwrap();
    assert_eq!(doc.processing_method(), ProcessingMethod::DigitalPdf);
}

#[tokio::test]
async fn ocr_threshold_is_exact() {
    let ocr = SpyOcr::new("ocr text");
    let doc = orchestrator(FakePdf::new(vec!["z".repeat(199)]), ocr.clone())
        .extract(b"%PDF", "a.pdf", MIME_PDF)
        .await
        .unwrap();
    assert_eq!(doc.processing_method(), ProcessingMethod::Ocr);
    assert_eq!(ocr.calls(), 1);

    let ocr = SpyOcr::new("ocr text");
    let doc = orchestrator(FakePdf::new(vec!["z".repeat(200)]), ocr.clone())
        .extract(b"%PDF", "b.pdf", MIME_PDF)
        .await
        .unwrap();
    assert_eq!(doc.processing_method(), ProcessingMethod::DigitalPdf);
    assert_eq!(ocr.calls(), 0);
}

#[tokio::test]
async fn ocr_threshold_is_configurable() {
    let config = PipelineConfig::builder()
        .ocr_fallback_min_chars(10)
        .build()
        .unwrap();
    let ocr = SpyOcr::new("ocr text");
    let doc = ExtractionOrchestrator::with_backends(
        config,
        Arc::new(FakePdf::new(vec!["short page".into()])),
        ocr.clone(),
    )
    .extract(b"%PDF", "a.pdf", MIME_PDF)
    .await
    .unwrap();
    assert_eq!(doc.processing_method(), ProcessingMethod::DigitalPdf);
    assert_eq!(ocr.calls(), 0);
}

#[tokio::test]
async fn unreadable_pdf_reports_last_stage() {
    let err = orchestrator(FakePdf::broken(), SpyOcr::new(""))
        .extract(b"garbage", "bad.pdf", MIME_PDF)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some("ocr_extraction"));
    match err {
        PipelineError::DocumentProcessing { file_name, .. } => assert_eq!(file_name, "bad.pdf"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn zero_page_pdf_is_an_error() {
    let err = orchestrator(FakePdf::new(vec![]), SpyOcr::new(""))
        .extract(b"%PDF", "empty.pdf", MIME_PDF)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some("ocr_extraction"));
}

#[tokio::test]
async fn docx_paragraphs_and_tables() {
    let body = "<w:p><w:r><w:t>Jane Roe</w:t></w:r></w:p>\
                <w:p><w:r><w:t>Staff Engineer</w:t></w:r></w:p>\
                <w:tbl><w:tr>\
                <w:tc><w:p><w:r><w:t>Rust</w:t></w:r></w:p></w:tc>\
                <w:tc><w:p><w:r><w:t>Go</w:t></w:r></w:p></w:tc>\
                </w:tr></w:tbl>";
    let doc = orchestrator(FakePdf::new(vec![]), SpyOcr::new(""))
        .extract(&docx_bytes(body), "cv.docx", MIME_DOCX)
        .await
        .unwrap();

    assert_eq!(doc.processing_method(), ProcessingMethod::Docx);
    assert_eq!(doc.text(), "Jane Roe\nStaff Engineer\nRust | Go");
    assert_eq!(doc.confidence_score(), 0.95);
}

#[tokio::test]
async fn corrupt_docx_is_docx_extraction_error() {
    let err = orchestrator(FakePdf::new(vec![]), SpyOcr::new(""))
        .extract(b"not a zip", "cv.docx", MIME_DOCX)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some("docx_extraction"));
}

#[test]
fn plain_text_with_charset_parameter() {
    let orch = orchestrator(FakePdf::new(vec![]), SpyOcr::new(""));
    let doc = tokio_test::block_on(orch.extract(
        "Zoë Roe\r\nData Analyst\r\n".as_bytes(),
        "cv.txt",
        "Text/Plain; charset=utf-8",
    ))
    .unwrap();

    assert_eq!(doc.processing_method(), ProcessingMethod::PlainText);
    assert_eq!(doc.text(), "Zoë Roe\nData Analyst");
    assert!(doc.confidence_score() > 0.0 && doc.confidence_score() <= 0.95);
    assert_eq!(doc.file_size(), 24);
}

// ── Entity extraction ────────────────────────────────────────────────────────

fn reconciler(ner: Arc<dyn NerBackend>) -> EntityReconciler {
    let skills = Arc::new(SkillsDictionary::builtin().unwrap());
    EntityReconciler::new(&ModelCache::new(ner, skills), &PipelineConfig::default())
}

#[tokio::test]
async fn ner_entities_below_threshold_are_dropped() {
    let ner = FakeNer(vec![
        RawEntity::new("SKILLS", "Python", 0, 6, 0.95),
        RawEntity::new("COMPANY", "Initech", 20, 27, 0.79),
        RawEntity::new("COMPANY", "Globex", 40, 46, 0.80),
    ]);
    let entities = reconciler(Arc::new(ner))
        .extract("Python developer at Initech, later Globex")
        .await
        .unwrap();

    assert_eq!(entities.extraction_method, ExtractionMethod::Statistical);
    assert_eq!(entities.skills, vec!["Python"]);
    assert_eq!(entities.companies, vec!["Globex"]);
    assert_eq!(entities.confidence(Category::Companies), 0.85);
}

#[tokio::test]
async fn failing_model_yields_rule_based_profile() {
    let text = "Jane Roe\njane@example.com\nSenior Backend Engineer\njavascript nodejs aws";
    let skills = Arc::new(SkillsDictionary::builtin().unwrap());
    let expected = resume_lens::RuleBasedFallbackExtractor::new(
        Arc::clone(&skills),
        &PipelineConfig::default(),
    )
    .extract(text);

    let entities = reconciler(Arc::new(FailingNer)).extract(text).await.unwrap();
    assert_eq!(entities, expected);
    assert_eq!(entities.extraction_method, ExtractionMethod::RuleBased);
    assert_eq!(entities.skills, vec!["AWS", "JavaScript", "Node.js"]);
}

#[tokio::test]
async fn full_pipeline_over_scanned_pdf() {
    init_logging();
    let ocr = SpyOcr::new(
        "Jane Roe\njane@example.com\nSenior Engineer\nAcme Inc.\nPython, Docker",
    );
    let orch = ExtractionOrchestrator::with_backends(
        PipelineConfig::default(),
        Arc::new(FakePdf::new(vec![String::new()])),
        ocr.clone(),
    );
    let pipeline = ResumePipeline::from_parts(orch, reconciler(Arc::new(FailingNer)));

    let analysis = pipeline.analyse(b"%PDF", "scan.pdf", MIME_PDF).await.unwrap();
    assert_eq!(analysis.document.processing_method(), ProcessingMethod::Ocr);
    assert_eq!(analysis.entities.extraction_method, ExtractionMethod::RuleBased);
    assert_eq!(analysis.entities.companies, vec!["Acme Inc."]);
    assert_eq!(analysis.entities.job_titles, vec!["Senior Engineer"]);
    assert_eq!(analysis.entities.skills, vec!["Docker", "Python"]);
    assert_eq!(
        analysis.entities.contact_info[&ContactField::Email],
        "jane@example.com"
    );
    assert_eq!(ocr.calls(), 1);
}

#[tokio::test]
async fn analysis_serialises_to_json() {
    let models = ModelCache::rules_only().unwrap();
    let pipeline = ResumePipeline::new(PipelineConfig::default(), &models);
    let analysis = pipeline
        .analyse(b"Rust and Kubernetes\nPlatform Engineer", "cv.txt", MIME_TEXT)
        .await
        .unwrap();

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["document"]["processing_method"], "plain_text");
    assert_eq!(json["entities"]["extraction_method"], "rule_based");
    assert_eq!(json["entities"]["skills"][0], "Kubernetes");
}
