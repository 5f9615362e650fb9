//! End-to-end editing and batch runs against the pure Rust backend.
//!
//! Faces come from a landmark JSON file so no detector model is needed.

use image::{ImageFormat, Rgba, RgbaImage};
use stache_stash::adjust::{Handle, RotateDirection};
use stache_stash::batch::{self, BatchEvent, BatchOptions, DetectionStatus};
use stache_stash::catalog;
use stache_stash::config::DetectionConfig;
use stache_stash::detect::{Detector, LandmarkFile, ModelState};
use stache_stash::editor::{Editor, EditorError, EditorSettings, NoticeLevel};
use stache_stash::imaging::{PlacementRatios, RustBackend};
use std::io::Cursor;
use std::path::Path;

const SKIN: Rgba<u8> = Rgba([220, 180, 150, 255]);

/// One face filling the middle of a 200x160 photo, mouth centered at (90, 103).
const FACES_JSON: &str = r#"[{
    "bounding_box": {"x": 40, "y": 20, "width": 100, "height": 120},
    "mouth_contour": [[70, 100], [90, 102], [110, 100], [90, 110]]
}]"#;

fn photo_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, SKIN);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn landmark_editor(faces_path: &Path) -> Editor<RustBackend> {
    let detector = Detector::new(Box::new(LandmarkFile::new(faces_path)));
    Editor::new(RustBackend::new(), detector, EditorSettings::default())
}

fn titles(editor: &mut Editor<RustBackend>) -> Vec<String> {
    editor.take_notices().into_iter().map(|n| n.title).collect()
}

#[test]
fn upload_detect_adjust_and_save() {
    let tmp = tempfile::TempDir::new().unwrap();
    let faces_path = tmp.path().join("faces.json");
    std::fs::write(&faces_path, FACES_JSON).unwrap();

    let mut editor = landmark_editor(&faces_path);
    editor.init_detection().unwrap();
    assert_eq!(editor.detection_state(), ModelState::Loaded);
    assert_eq!(titles(&mut editor), vec!["Face detection ready"]);

    let dims = editor.upload(&photo_png(200, 160), Some("image/png")).unwrap();
    assert_eq!(dims.as_tuple(), (200, 160));
    assert_eq!(editor.faces().len(), 1);
    assert_eq!(editor.placements().len(), 1);
    assert_eq!(editor.placements()[0].face_index, Some(0));
    assert_eq!(titles(&mut editor), vec!["Found 1 face(s)"]);

    editor.select_style("walrus").unwrap();
    editor.render().unwrap();
    let original = editor.original().unwrap().clone();
    let processed = editor.processed().unwrap();
    assert_eq!(processed.dimensions(), (200, 160));
    assert_ne!(processed.as_raw(), original.as_raw());
    assert!(titles(&mut editor).contains(&"Mustache applied!".to_string()));

    // Preview drawn at half size: a (10, 5) pointer move is (20, 10) pixels.
    editor.set_manual_mode(true);
    editor.set_viewport(100.0, 80.0).unwrap();
    let before = editor.placements()[0];
    {
        let mut session = editor.begin_pointer(0, Handle::Body, (10.0, 10.0)).unwrap();
        session.move_to((20.0, 15.0)).unwrap();
        session.finish();
    }
    let after = editor.placements()[0];
    assert!((after.x - before.x - 20.0).abs() < 1e-9);
    assert!((after.y - before.y - 10.0).abs() < 1e-9);
    assert!(editor.pointer_state().is_idle());

    editor.rotate(0, RotateDirection::Clockwise).unwrap();
    assert!((editor.placements()[0].rotation - 15.0).abs() < 1e-9);

    let out = tmp.path().join("distinguished-photo.png");
    editor.save_png(&out).unwrap();
    let saved = image::open(&out).unwrap();
    assert_eq!((saved.width(), saved.height()), (200, 160));
    assert!(titles(&mut editor).contains(&"Download complete!".to_string()));
}

#[test]
fn rejected_upload_keeps_previous_photo() {
    let tmp = tempfile::TempDir::new().unwrap();
    let faces_path = tmp.path().join("faces.json");
    std::fs::write(&faces_path, FACES_JSON).unwrap();

    let mut editor = landmark_editor(&faces_path);
    editor.init_detection().unwrap();
    editor.upload(&photo_png(200, 160), None).unwrap();
    let placements = editor.placements().to_vec();
    editor.take_notices();

    let result = editor.upload(b"just some text", Some("text/plain"));
    assert!(matches!(result, Err(EditorError::InvalidFileType(_))));
    assert_eq!(editor.placements(), placements.as_slice());
    assert_eq!(editor.image_dimensions().unwrap().as_tuple(), (200, 160));

    let notices = editor.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].title, "Invalid file type");
}

#[test]
fn missing_landmarks_fall_back_to_default_placement() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut editor = landmark_editor(&tmp.path().join("missing.json"));

    assert!(editor.init_detection().is_err());
    assert_eq!(editor.detection_state(), ModelState::Failed);
    assert!(editor.manual_mode());

    editor.upload(&photo_png(400, 300), None).unwrap();
    assert!(editor.faces().is_empty());
    let placement = &editor.placements()[0];
    assert_eq!(placement.face_index, None);
    // horizontally centered
    assert!((placement.x + placement.width / 2.0 - 200.0).abs() < 1e-9);

    editor.select_style("monocle").unwrap();
    let png = editor.export_png().unwrap();
    assert!(png.starts_with(b"\x89PNG"));
}

#[test]
fn batch_decorates_every_photo() {
    let tmp = tempfile::TempDir::new().unwrap();
    let root = tmp.path().join("photos");
    std::fs::create_dir_all(root.join("2024")).unwrap();
    std::fs::write(root.join("beach.png"), photo_png(120, 90)).unwrap();
    std::fs::write(root.join("2024/party.png"), photo_png(90, 120)).unwrap();
    std::fs::write(root.join("notes.txt"), "not a photo").unwrap();

    let output_dir = root.join("distinguished");
    let options = BatchOptions {
        graphic: catalog::find_style("classic").unwrap().graphic(),
        ratios: PlacementRatios::default(),
        output_dir: output_dir.clone(),
    };
    let detector = Detector::from_config(&DetectionConfig::default());
    let (tx, rx) = std::sync::mpsc::channel();

    let summary =
        batch::run_batch(&RustBackend::new(), &detector, &options, &root, Some(tx)).unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.faces, 0);

    assert!(output_dir.join("beach-distinguished.png").exists());
    assert!(output_dir.join("2024/party-distinguished.png").exists());

    let events: Vec<BatchEvent> = rx.into_iter().collect();
    assert!(matches!(events[0], BatchEvent::Started { total: 2 }));
    let done = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                BatchEvent::ImageDone {
                    detection: DetectionStatus::Unavailable,
                    placements: 1,
                    ..
                }
            )
        })
        .count();
    assert_eq!(done, 2);

    // A second run must not pick up its own outputs.
    let again = batch::run_batch(&RustBackend::new(), &detector, &options, &root, None).unwrap();
    assert_eq!(again.processed, 2);
}
