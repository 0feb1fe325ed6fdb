//! End-to-end watch sessions over real directories.

mod common;

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use common::{StubCodec, drop_file, memory_sink, settle, wait_until};
use image::ImageDecoder;
use image::codecs::jpeg::JpegDecoder;
use jxrwatch::convert::{FailureKind, HDR_DOWNCONVERT_WARNING};
use jxrwatch::{
    ConversionOutcome, ImageCodec, LogFileSink, NotificationSink, OutcomeStatus, SessionRegistry, SessionState,
    StartStatus, StopStatus, WatchConfig, WatchSession,
};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(10);

struct Dirs {
    _temp: TempDir,
    source: PathBuf,
    destination: PathBuf,
}

fn dirs() -> Dirs {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("incoming");
    let destination = temp.path().join("converted");
    fs::create_dir(&source).unwrap();
    Dirs {
        _temp: temp,
        source,
        destination,
    }
}

#[test]
fn test_existing_file_converted_on_start() {
    let dirs = dirs();
    fs::write(dirs.source.join("a.jxr"), b"ok").unwrap();
    let (sink, sinks) = memory_sink();
    let session = WatchSession::new(StubCodec::new());

    let status = session
        .start(WatchConfig::new(&dirs.source, &dirs.destination), sinks)
        .unwrap();

    assert_eq!(status, StartStatus::Started { bootstrapped: 1 });
    assert!(wait_until(TIMEOUT, || sink.len() == 1));
    let outcome = &sink.snapshot()[0];
    assert_eq!(outcome.source_name, "a.jxr");
    assert_eq!(outcome.destination_name, "a.jpg");
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert!(dirs.destination.join("a.jpg").exists());

    // Nothing converts it a second time.
    settle();
    assert_eq!(session.stop(), StopStatus::Stopped);
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_decode_failure_does_not_stop_session() {
    let dirs = dirs();
    let (sink, sinks) = memory_sink();
    let session = WatchSession::new(StubCodec::new());
    session
        .start(WatchConfig::new(&dirs.source, &dirs.destination), sinks)
        .unwrap();

    drop_file(&dirs.source, "bad.jxr", b"corrupt");
    assert!(wait_until(TIMEOUT, || sink.len() == 1));
    assert_eq!(session.state(), SessionState::Running);

    drop_file(&dirs.source, "good.jxr", b"ok");
    assert!(wait_until(TIMEOUT, || sink.len() == 2));
    session.stop();

    let outcomes = sink.snapshot();
    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Decode));
    assert!(!dirs.destination.join("bad.jpg").exists());
    assert_eq!(outcomes[1].status, OutcomeStatus::Success);
    assert!(dirs.destination.join("good.jpg").exists());
}

#[test]
fn test_decoder_panic_fails_one_file_and_keeps_watching() {
    let dirs = dirs();
    let (sink, sinks) = memory_sink();
    let session = WatchSession::new(StubCodec::new());
    session
        .start(WatchConfig::new(&dirs.source, &dirs.destination), sinks)
        .unwrap();

    drop_file(&dirs.source, "crash.jxr", b"panic");
    assert!(wait_until(TIMEOUT, || sink.len() == 1));
    assert_eq!(session.state(), SessionState::Running);

    drop_file(&dirs.source, "after.jxr", b"ok");
    assert!(wait_until(TIMEOUT, || sink.len() == 2));
    assert_eq!(session.stop(), StopStatus::Stopped);

    let outcomes = sink.snapshot();
    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Decode));
    assert!(outcomes[0].to_string().contains("stub decoder crashed"));
    assert!(outcomes[1].is_success());
    assert!(dirs.destination.join("after.jpg").exists());
}

#[test]
fn test_decoder_panic_during_bootstrap_still_starts() {
    let dirs = dirs();
    fs::write(dirs.source.join("a_crash.jxr"), b"panic").unwrap();
    fs::write(dirs.source.join("b_fine.jxr"), b"ok").unwrap();
    let (sink, sinks) = memory_sink();
    let session = WatchSession::new(StubCodec::new());

    let status = session
        .start(WatchConfig::new(&dirs.source, &dirs.destination), sinks)
        .unwrap();

    assert_eq!(status, StartStatus::Started { bootstrapped: 2 });
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(session.stop(), StopStatus::Stopped);
    assert_eq!(session.state(), SessionState::Idle);
    let outcomes = sink.snapshot();
    assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::Decode));
    assert!(outcomes[1].is_success());
}

#[test]
fn test_stop_waits_for_in_flight_conversion() {
    let dirs = dirs();
    let codec = StubCodec::new();
    let (sink, sinks) = memory_sink();
    let session = WatchSession::new(codec.clone());
    session
        .start(WatchConfig::new(&dirs.source, &dirs.destination), sinks)
        .unwrap();

    drop_file(&dirs.source, "slow.jxr", b"slow:800");
    assert!(wait_until(TIMEOUT, || codec.decodes() == 1));

    assert_eq!(session.stop(), StopStatus::Stopped);
    // The outcome was emitted before stop returned.
    let outcomes = sink.snapshot();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_success());
    assert!(dirs.destination.join("slow.jpg").exists());

    drop_file(&dirs.source, "late.jxr", b"ok");
    settle();
    assert_eq!(sink.len(), 1);
    assert_eq!(codec.decodes(), 1);
}

#[test]
fn test_rapid_notifications_for_one_file_yield_one_outcome() {
    let dirs = dirs();
    let codec = StubCodec::new();
    let (sink, sinks) = memory_sink();
    let session = WatchSession::new(codec.clone());
    session
        .start(WatchConfig::new(&dirs.source, &dirs.destination), sinks)
        .unwrap();

    let path = dirs.source.join("burst.jxr");
    fs::write(&path, b"o").unwrap();
    fs::write(&path, b"ok").unwrap();
    assert!(wait_until(TIMEOUT, || sink.len() == 1));
    settle();
    session.stop();

    assert_eq!(sink.len(), 1);
    assert_eq!(codec.decodes(), 1);
    assert!(sink.snapshot()[0].is_success());
}

#[test]
fn test_every_new_file_yields_exactly_one_outcome() {
    let dirs = dirs();
    let (sink, sinks) = memory_sink();
    let session = WatchSession::new(StubCodec::new());
    session
        .start(WatchConfig::new(&dirs.source, &dirs.destination), sinks)
        .unwrap();

    let names: Vec<String> = (0..6).map(|i| format!("frame{i}.JXR")).collect();
    for name in &names {
        drop_file(&dirs.source, name, b"ok");
    }
    fs::write(dirs.source.join("readme.txt"), b"ignored").unwrap();

    assert!(wait_until(TIMEOUT, || sink.len() >= names.len()));
    settle();
    session.stop();

    let outcomes = sink.snapshot();
    assert_eq!(outcomes.len(), names.len());
    let sources: HashSet<_> = outcomes.iter().map(|o| o.source_name.clone()).collect();
    assert_eq!(sources, names.iter().cloned().collect());
    for outcome in &outcomes {
        let stem = outcome.source_name.trim_end_matches(".JXR");
        assert_eq!(outcome.destination_name, format!("{stem}.jpg"));
        assert!(dirs.destination.join(&outcome.destination_name).exists());
    }
}

#[test]
fn test_hdr_source_reports_warning() {
    let dirs = dirs();
    fs::write(dirs.source.join("bright.jxr"), b"hdr").unwrap();
    let (sink, sinks) = memory_sink();
    let session = WatchSession::new(StubCodec::new());

    session
        .start(WatchConfig::new(&dirs.source, &dirs.destination), sinks)
        .unwrap();
    session.stop();

    assert_eq!(
        sink.snapshot()[0].status,
        OutcomeStatus::SuccessWithWarning(HDR_DOWNCONVERT_WARNING.to_string())
    );
}

#[test]
fn test_recursive_watch_picks_up_subdirectories() {
    let dirs = dirs();
    let nested = dirs.source.join("day1");
    fs::create_dir(&nested).unwrap();
    let (sink, sinks) = memory_sink();
    let session = WatchSession::new(StubCodec::new());
    session
        .start(
            WatchConfig::new(&dirs.source, &dirs.destination).recursive(true),
            sinks,
        )
        .unwrap();

    drop_file(&nested, "deep.jxr", b"ok");
    assert!(wait_until(TIMEOUT, || sink.len() == 1));
    session.stop();

    assert!(dirs.destination.join("deep.jpg").exists());
}

#[test]
fn test_png_pattern_survives_conversion() {
    let dirs = dirs();
    let mut img = image::RgbImage::new(32, 16);
    for (x, _, pixel) in img.enumerate_pixels_mut() {
        *pixel = if x < 16 {
            image::Rgb([220, 40, 40])
        } else {
            image::Rgb([30, 60, 210])
        };
    }
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let (sink, sinks) = memory_sink();
    let session = WatchSession::new(Arc::new(ImageCodec));
    let config = WatchConfig::new(&dirs.source, &dirs.destination)
        .source_extension("png")
        .color_profile(b"test-icc-profile".to_vec());
    session.start(config, sinks).unwrap();

    drop_file(&dirs.source, "pattern.png", &png);
    assert!(wait_until(TIMEOUT, || sink.len() == 1));
    session.stop();
    assert_eq!(sink.snapshot()[0].status, OutcomeStatus::Success);

    let jpeg = fs::read(dirs.destination.join("pattern.jpg")).unwrap();
    let embedded = JpegDecoder::new(std::io::Cursor::new(&jpeg))
        .unwrap()
        .icc_profile()
        .unwrap();
    assert_eq!(embedded.as_deref(), Some(&b"test-icc-profile"[..]));
    let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (32, 16));
    let close = |a: [u8; 3], b: [u8; 3]| a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 16);
    assert!(close(decoded.get_pixel(4, 8).0, [220, 40, 40]));
    assert!(close(decoded.get_pixel(27, 8).0, [30, 60, 210]));
}

#[test]
fn test_same_directory_refused_across_sessions() {
    let dirs = dirs();
    let registry = SessionRegistry::new();
    let first = WatchSession::with_registry(StubCodec::new(), registry.clone());
    let second = WatchSession::with_registry(StubCodec::new(), registry.clone());

    first
        .start(WatchConfig::new(&dirs.source, &dirs.destination), vec![])
        .unwrap();
    // Same directory spelled differently.
    let alias = dirs.source.join("..").join("incoming");
    let status = second
        .start(WatchConfig::new(alias, dirs.destination.join("other")), vec![])
        .unwrap();

    assert!(matches!(status, StartStatus::DirectoryInUse(_)));
    assert_eq!(second.state(), SessionState::Idle);
    assert_eq!(first.state(), SessionState::Running);
}

#[test]
fn test_restart_after_stop() {
    let dirs = dirs();
    let (sink, sinks) = memory_sink();
    let session = WatchSession::new(StubCodec::new());
    let config = WatchConfig::new(&dirs.source, &dirs.destination);

    session.start(config.clone(), sinks.clone()).unwrap();
    session.stop();
    drop_file(&dirs.source, "between.jxr", b"ok");

    // Bootstrap of the second run picks up the file that arrived while stopped.
    let status = session.start(config, sinks).unwrap();
    assert_eq!(status, StartStatus::Started { bootstrapped: 1 });
    session.stop();

    assert_eq!(sink.len(), 1);
}

#[test]
fn test_log_file_and_channel_sinks() {
    let dirs = dirs();
    fs::create_dir_all(&dirs.destination).unwrap();
    fs::write(dirs.source.join("one.jxr"), b"ok").unwrap();
    fs::write(dirs.source.join("two.jxr"), b"broken").unwrap();

    let log = Arc::new(LogFileSink::in_directory(&dirs.destination).unwrap());
    let (tx, rx) = crossbeam_channel::unbounded::<ConversionOutcome>();
    let log_sink: Arc<dyn NotificationSink> = log.clone();
    let channel_sink: Arc<dyn NotificationSink> = Arc::new(tx);
    let sinks = vec![log_sink, channel_sink];
    let session = WatchSession::new(StubCodec::new());

    session
        .start(WatchConfig::new(&dirs.source, &dirs.destination), sinks)
        .unwrap();
    session.stop();

    let received: Vec<_> = rx.try_iter().map(|o| o.source_name).collect();
    assert_eq!(received, vec!["one.jxr", "two.jxr"]);

    let content = fs::read_to_string(log.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(" - INFO - Converted one.jxr -> one.jpg"));
    assert!(lines[1].contains(" - ERROR - Failed to convert two.jxr"));
}
