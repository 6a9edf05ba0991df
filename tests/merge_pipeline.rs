//! Integration tests for the merge pipeline.

use lopdf::{dictionary, Document, Object};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use zepbmerge::cancel::CancelToken;
use zepbmerge::merge::{MergeEvent, MergeOptions, MergePipeline};

/// Build a minimal valid PDF with `pages` pages, all sharing the same
/// square MediaBox of `box_size` points (used to tell the two source
/// documents apart after merging).
fn build_document(pages: usize, box_size: i64) -> Document {
    let mut doc = Document::with_version("1.4");

    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();
    for _ in 0..pages {
        let page_id = doc.new_object_id();
        let page = lopdf::dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), box_size.into(), box_size.into()],
        };
        doc.objects.insert(page_id, page.into());
        page_ids.push(page_id);
    }

    let catalog_id = doc.new_object_id();
    let catalog = lopdf::dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    let pages_dict = lopdf::dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.into_iter().map(Object::from).collect::<Vec<Object>>(),
        "Count" => pages as i64,
    };

    doc.objects.insert(catalog_id, catalog.into());
    doc.objects.insert(pages_id, pages_dict.into());
    doc.trailer.set("Root", catalog_id);

    doc
}

fn write_pdf(dir: &Path, name: &str, pages: usize, box_size: i64) -> PathBuf {
    let path = dir.join(name);
    build_document(pages, box_size).save(&path).unwrap();
    path
}

fn load_pdf(path: &Path) -> Document {
    Document::load_mem(&std::fs::read(path).unwrap()).unwrap()
}

/// Read the MediaBox width of a 1-based page number.
fn page_box_size(doc: &Document, page_number: u32) -> i64 {
    let pages = doc.get_pages();
    let page_id = pages[&page_number];
    let Ok(Object::Dictionary(dict)) = doc.get_object(page_id) else {
        panic!("page {page_number} is not a dictionary");
    };
    let Ok(Object::Array(media_box)) = dict.get(b"MediaBox") else {
        panic!("page {page_number} has no MediaBox");
    };
    media_box[2].as_i64().unwrap()
}

struct Folders {
    _temp: TempDir,
    main: PathBuf,
    insert: PathBuf,
    output: PathBuf,
}

fn setup_folders() -> Folders {
    let temp = TempDir::new().unwrap();
    let main = temp.path().join("zepb");
    let insert = temp.path().join("notifications");
    let output = temp.path().join("merged");
    std::fs::create_dir(&main).unwrap();
    std::fs::create_dir(&insert).unwrap();

    Folders {
        _temp: temp,
        main,
        insert,
        output,
    }
}

fn options(folders: &Folders) -> MergeOptions {
    MergeOptions {
        main_folder: folders.main.clone(),
        insert_folder: folders.insert.clone(),
        output_folder: folders.output.clone(),
        recursive_main: false,
        recursive_insert: false,
    }
}

#[tokio::test]
async fn test_matched_pair_merges_notification_pages_first() {
    let folders = setup_folders();
    write_pdf(&folders.insert, "уведомление СПД-1.pdf", 2, 500);
    write_pdf(&folders.main, "ЗЭПБ СПД-1.pdf", 3, 600);

    let pipeline = MergePipeline::new();
    let summary = pipeline
        .merge(&options(&folders), &CancelToken::new(), |_| {})
        .await;

    assert!(summary.errors.is_empty(), "errors: {:?}", summary.errors);
    assert_eq!(summary.total, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 0);
    assert!(!summary.canceled);

    let out_path = folders.output.join("ЗЭПБ СПД-1 (с увед).pdf");
    assert!(out_path.exists(), "merged output missing");

    let merged = load_pdf(&out_path);
    assert_eq!(merged.get_pages().len(), 5);

    // Notification pages (500pt box) come before ZEPB pages (600pt).
    assert_eq!(page_box_size(&merged, 1), 500);
    assert_eq!(page_box_size(&merged, 2), 500);
    assert_eq!(page_box_size(&merged, 3), 600);
    assert_eq!(page_box_size(&merged, 5), 600);
}

#[tokio::test]
async fn test_register_is_written_when_output_produced() {
    let folders = setup_folders();
    write_pdf(&folders.insert, "уведомление СПД-7.pdf", 1, 500);
    write_pdf(&folders.main, "ЗЭПБ СПД-7.pdf", 1, 600);

    let pipeline = MergePipeline::new();
    let summary = pipeline
        .merge(&options(&folders), &CancelToken::new(), |_| {})
        .await;

    let registry = summary.registry.expect("register path missing");
    assert!(registry.exists());
    let content = std::fs::read_to_string(&registry).unwrap();
    assert!(content.contains("ЗЭПБ СПД-7 (с увед)"));
}

#[tokio::test]
async fn test_no_register_without_output() {
    let folders = setup_folders();
    write_pdf(&folders.insert, "уведомление СПД-1.pdf", 1, 500);
    // No matching ZEPB at all.

    let pipeline = MergePipeline::new();
    let summary = pipeline
        .merge(&options(&folders), &CancelToken::new(), |_| {})
        .await;

    assert_eq!(summary.processed, 0);
    assert!(summary.registry.is_none());
}

#[tokio::test]
async fn test_unmatched_sets_emitted_before_progress() {
    let folders = setup_folders();
    write_pdf(&folders.insert, "уведомление СПД-2.pdf", 1, 500);
    write_pdf(&folders.main, "ЗЭПБ СПД-3.pdf", 1, 600);

    let mut events = Vec::new();
    let pipeline = MergePipeline::new();
    let summary = pipeline
        .merge(&options(&folders), &CancelToken::new(), |event| {
            events.push(event);
        })
        .await;

    assert_eq!(summary.total, 0);
    assert_eq!(summary.unmatched_notifications.len(), 1);
    assert_eq!(summary.unmatched_notifications[0].code, "СПД-2");
    assert_eq!(summary.unmatched_zepb.len(), 1);
    assert_eq!(summary.unmatched_zepb[0].code, "СПД-3");

    assert!(matches!(events.first(), Some(MergeEvent::Unmatched { .. })));
}

#[tokio::test]
async fn test_processed_zepb_is_silently_excluded() {
    let folders = setup_folders();
    write_pdf(&folders.insert, "уведомление СПД-1.pdf", 1, 500);
    write_pdf(&folders.main, "ЗЭПБ СПД-1 (с увед).pdf", 1, 600);

    let pipeline = MergePipeline::new();
    let summary = pipeline
        .merge(&options(&folders), &CancelToken::new(), |_| {})
        .await;

    // The marked file never enters the dictionary, so the code shows
    // up as an unmatched notification rather than a merge target.
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.total, 0);
    assert_eq!(summary.unmatched_notifications.len(), 1);
    assert!(summary.unmatched_zepb.is_empty());
    assert!(!folders.output.exists() || std::fs::read_dir(&folders.output).unwrap().next().is_none());
}

#[tokio::test]
async fn test_corrupt_pair_is_skipped_and_run_continues() {
    let folders = setup_folders();
    write_pdf(&folders.insert, "уведомление СПД-1.pdf", 1, 500);
    write_pdf(&folders.insert, "уведомление СПД-2.pdf", 1, 500);
    write_pdf(&folders.main, "ЗЭПБ СПД-1.pdf", 1, 600);
    std::fs::write(folders.main.join("ЗЭПБ СПД-2.pdf"), b"not really a pdf").unwrap();

    let pipeline = MergePipeline::new();
    let summary = pipeline
        .merge(&options(&folders), &CancelToken::new(), |_| {})
        .await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("СПД-2"));
    assert!(!summary.canceled);
    assert!(folders.output.join("ЗЭПБ СПД-1 (с увед).pdf").exists());
}

#[tokio::test]
async fn test_cancellation_before_loop_processes_nothing() {
    let folders = setup_folders();
    write_pdf(&folders.insert, "уведомление СПД-1.pdf", 1, 500);
    write_pdf(&folders.main, "ЗЭПБ СПД-1.pdf", 1, 600);

    let token = CancelToken::new();
    token.cancel();

    let pipeline = MergePipeline::new();
    let summary = pipeline.merge(&options(&folders), &token, |_| {}).await;

    assert!(summary.canceled);
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.total, 1);
}

#[tokio::test]
async fn test_cancellation_mid_run_stops_at_next_pair() {
    let folders = setup_folders();
    for i in 1..=3 {
        write_pdf(&folders.insert, &format!("уведомление СПД-{i}.pdf"), 1, 500);
        write_pdf(&folders.main, &format!("ЗЭПБ СПД-{i}.pdf"), 1, 600);
    }

    let token = CancelToken::new();
    let cancel_handle = token.clone();

    let pipeline = MergePipeline::new();
    let summary = pipeline
        .merge(&options(&folders), &token, move |event| {
            // Cancel as soon as the first pair completes; the loop is
            // sequential so exactly one pair must have been merged.
            if matches!(event, MergeEvent::Progress { .. }) {
                cancel_handle.cancel();
            }
        })
        .await;

    assert!(summary.canceled);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 1);
    assert!(
        summary
            .log
            .iter()
            .any(|line| line.contains("canceled by user"))
    );
}

#[tokio::test]
async fn test_newer_duplicate_wins_collision() {
    let folders = setup_folders();
    write_pdf(&folders.insert, "уведомление СПД-1.pdf", 1, 500);

    // Two ZEPB scans of the same record: the newer one (2 pages) must
    // be the merge source regardless of directory order.
    write_pdf(&folders.main, "ЗЭПБ СПД-1.10.pdf", 1, 600);
    std::thread::sleep(std::time::Duration::from_millis(50));
    write_pdf(&folders.main, "ЗЭПБ СПД-1.20.pdf", 2, 600);

    let pipeline = MergePipeline::new();
    let summary = pipeline
        .merge(&options(&folders), &CancelToken::new(), |_| {})
        .await;

    assert_eq!(summary.processed, 1);
    let out_path = folders.output.join("ЗЭПБ СПД-1.20 (с увед).pdf");
    assert!(out_path.exists());

    let merged = load_pdf(&out_path);
    assert_eq!(merged.get_pages().len(), 3);
}

#[tokio::test]
async fn test_output_folder_is_created() {
    let folders = setup_folders();
    write_pdf(&folders.insert, "уведомление СПД-1.pdf", 1, 500);
    write_pdf(&folders.main, "ЗЭПБ СПД-1.pdf", 1, 600);

    assert!(!folders.output.exists());

    let pipeline = MergePipeline::new();
    let summary = pipeline
        .merge(&options(&folders), &CancelToken::new(), |_| {})
        .await;

    assert!(summary.errors.is_empty());
    assert!(folders.output.exists());
}
