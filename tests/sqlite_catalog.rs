//! End-to-end runs against a SQLite catalog with the built-in extractors.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use lopdf::{dictionary, Document, Object, Stream};
use pubrecon::catalog::{Catalog, SqlCatalog};
use pubrecon::config::{parse_config, Config};
use pubrecon::models::Attribute;
use pubrecon::{db, migrate, service};
use tempfile::TempDir;

/// Minimal valid PDF whose only page shows `phrase` in Helvetica.
fn text_pdf(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// One-page PDF carrying a JPEG XObject of each given size.
fn image_pdf(path: &Path, sizes: &[usize]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut xobjects = lopdf::Dictionary::new();
    for (i, size) in sizes.iter().enumerate() {
        let id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            vec![0x5A; *size],
        ));
        xobjects.set(format!("Im{}", i), id);
    }
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "XObject" => xobjects },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

struct Env {
    tmp: TempDir,
    config_path: PathBuf,
    config: Config,
}

impl Env {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("storage");
        fs::create_dir_all(root.join("papers")).unwrap();

        let content = format!(
            r#"[db]
driver = "sqlite"
name = "{db}"

[storage]
root = "{root}"

[schedule]
interval_secs = 3600
settle_delay_secs = 0

[workers]
concurrency = 2
operation_timeout_secs = 30
"#,
            db = tmp.path().join("data/catalog.sqlite").display(),
            root = root.display()
        );
        let config_path = tmp.path().join("pubrecon.toml");
        fs::write(&config_path, &content).unwrap();
        let config = parse_config(&content, |_| None).unwrap();

        Self {
            tmp,
            config_path,
            config,
        }
    }

    fn storage(&self) -> PathBuf {
        self.tmp.path().join("storage")
    }

    async fn seed(&self) -> SqlCatalog {
        migrate::run_migrations(&self.config).await.unwrap();
        let pool = db::connect(&self.config).await.unwrap();

        fs::write(
            self.storage().join("papers/intro.pdf"),
            text_pdf("reconciled phrase"),
        )
        .unwrap();
        image_pdf(&self.storage().join("papers/scan.pdf"), &[300, 900, 600]);

        for (id, title, path) in [
            (1i64, "Intro", "papers/intro.pdf"),
            (2, "Scan", "papers/scan.pdf"),
        ] {
            sqlx::query("INSERT INTO publications (id, title, author, year, path, type) VALUES (?, ?, ?, ?, ?, ?)")
                .bind(id)
                .bind(title)
                .bind("Someone")
                .bind(2021i64)
                .bind(path)
                .bind("pdf")
                .execute(&pool)
                .await
                .unwrap();
        }
        SqlCatalog::new(pool)
    }
}

#[tokio::test]
async fn sql_catalog_reads_and_writes_single_columns() {
    let env = Env::new();
    let catalog = env.seed().await;
    catalog.ping().await.unwrap();

    let records = catalog.list_all().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, 1);
    assert_eq!(records[0].title.as_deref(), Some("Intro"));
    assert_eq!(records[0].year, Some(2021));
    assert_eq!(records[0].path, "papers/intro.pdf");
    assert!(records[0].hash.is_none());

    catalog
        .update_attribute(2, Attribute::ImagePath, "papers/cover.png")
        .await
        .unwrap();
    // Unknown ids are not an error.
    catalog
        .update_attribute(99, Attribute::Hash, "x")
        .await
        .unwrap();

    let records = catalog.list_all().await.unwrap();
    assert_eq!(records[1].image_path.as_deref(), Some("papers/cover.png"));
    assert!(records[0].image_path.is_none());
    assert_eq!(records[1].title.as_deref(), Some("Scan"));
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let env = Env::new();
    migrate::run_migrations(&env.config).await.unwrap();
    migrate::run_migrations(&env.config).await.unwrap();
}

#[tokio::test]
async fn full_scan_derives_hash_text_and_image() {
    let env = Env::new();
    let catalog = env.seed().await;

    let summary = service::run_scan_once(&env.config).await.unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(summary.writes_for(Attribute::Hash), 2);
    assert_eq!(summary.writes_for(Attribute::ImagePath), 1);

    let records = catalog.list_all().await.unwrap();
    let intro = &records[0];
    let scan = &records[1];

    let hash = intro.hash.as_deref().unwrap();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(intro
        .text
        .as_deref()
        .unwrap_or_default()
        .contains("reconciled phrase"));
    assert!(intro.image_path.is_none());

    assert_eq!(scan.image_path.as_deref(), Some("papers/auto_scan.jpg"));
    let installed = env.storage().join("papers/auto_scan.jpg");
    assert_eq!(fs::metadata(installed).unwrap().len(), 900);

    let second = service::run_scan_once(&env.config).await.unwrap();
    assert_eq!(second.writes_for(Attribute::Hash), 0);
    assert_eq!(second.writes_for(Attribute::ImagePath), 0);
    assert_eq!(second.writes_for(Attribute::Text), 0);
}

fn run_cli(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_pubrecon"))
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .expect("failed to run pubrecon binary");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[tokio::test]
async fn cli_init_then_scan() {
    let env = Env::new();
    let (stdout, stderr, ok) = run_cli(&env.config_path, &["init"]);
    assert!(ok, "init failed: stdout={} stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    env.seed().await.pool().close().await;

    let (stdout, stderr, ok) = run_cli(&env.config_path, &["scan"]);
    assert!(ok, "scan failed: stdout={} stderr={}", stdout, stderr);
    assert!(stdout.contains("records: 2"));
    assert!(stdout.contains("hash written: 2"));
    assert!(stdout.trim_end().ends_with("ok"));
}

#[test]
fn cli_rejects_invalid_config() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.toml");
    fs::write(&path, "[db]\nname = \"x\"\n[storage]\nroot = \"/data\"\n[workers]\nconcurrency = 0\n").unwrap();
    let (_, stderr, ok) = run_cli(&path, &["scan"]);
    assert!(!ok);
    assert!(stderr.contains("concurrency"));
}
