#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use jxrwatch::convert::{CodecError, EncodeOptions, PixelBuffer};
use jxrwatch::{Codec, MemorySink, NotificationSink};

/// Codec driven by file contents:
/// - `ok` decodes to one grey pixel
/// - `hdr` decodes to an HDR pixel
/// - `slow:<ms>` sleeps, then decodes like `ok`
/// - `panic` makes the decoder panic
/// - anything else is a decode error
#[derive(Default)]
pub struct StubCodec {
    decodes: AtomicUsize,
}

impl StubCodec {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of decode calls entered so far.
    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl Codec for StubCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, CodecError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);

        if let Some(ms) = bytes.strip_prefix(b"slow:") {
            let ms: u64 = std::str::from_utf8(ms).ok().and_then(|s| s.parse().ok()).unwrap_or(500);
            thread::sleep(Duration::from_millis(ms));
            return PixelBuffer::new(1, 1, vec![128, 128, 128]);
        }
        match bytes {
            b"ok" => PixelBuffer::new(1, 1, vec![128, 128, 128]),
            b"hdr" => Ok(PixelBuffer::new(1, 1, vec![255, 255, 255])?.with_hdr(true)),
            b"panic" => panic!("stub decoder crashed"),
            _ => Err(CodecError::Malformed {
                reason: "stub cannot read this".to_string(),
            }),
        }
    }

    fn encode(&self, image: &PixelBuffer, _options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        let mut out = b"STUBJPEG".to_vec();
        out.extend_from_slice(&image.data);
        Ok(out)
    }
}

pub fn memory_sink() -> (Arc<MemorySink>, Vec<Arc<dyn NotificationSink>>) {
    let sink = Arc::new(MemorySink::new());
    let sinks: Vec<Arc<dyn NotificationSink>> = vec![sink.clone() as Arc<dyn NotificationSink>];
    (sink, sinks)
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}

/// Give the watcher time to settle and deliver anything outstanding.
pub fn settle() {
    thread::sleep(Duration::from_millis(700));
}

/// Write `bytes` next to `dir` and move the finished file in.
pub fn drop_file(dir: &Path, name: &str, bytes: &[u8]) {
    let staging = dir
        .parent()
        .expect("watched dir has a parent")
        .join(format!(".staging-{name}.part"));
    std::fs::write(&staging, bytes).unwrap();
    std::fs::rename(&staging, dir.join(name)).unwrap();
}
