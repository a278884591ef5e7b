//! Background texture decoding and the one-shot texture sources.
//!
//! Image files are read and decoded on worker threads. The main thread
//! drains finished results and settles the matching [`OneShot`] source, so
//! the dataflow itself never leaves the main thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use pulse_scene::{Texture, TextureError};
use pulse_stream::{OneShot, Stream};

/// The three globe texture slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Color,
    Bump,
    Specular,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 3] = [TextureSlot::Color, TextureSlot::Bump, TextureSlot::Specular];

    pub fn name(self) -> &'static str {
        match self {
            TextureSlot::Color => "color",
            TextureSlot::Bump => "bump",
            TextureSlot::Specular => "specular",
        }
    }
}

/// A decode job for one slot.
#[derive(Debug, Clone)]
pub struct TextureRequest {
    pub slot: TextureSlot,
    pub path: PathBuf,
}

/// Outcome of a decode job.
#[derive(Debug)]
pub struct TextureResult {
    pub slot: TextureSlot,
    pub result: Result<Texture, TextureError>,
}

/// Read and decode an image file into an RGBA8 texture named after the file.
pub fn decode_texture(path: &Path) -> Result<Texture, TextureError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let bytes = std::fs::read(path).map_err(|source| TextureError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let image = image::load_from_memory(&bytes).map_err(|err| TextureError::Decode {
        name: name.clone(),
        message: err.to_string(),
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Texture::from_rgba8(name, width, height, rgba.into_raw())
}

/// Texture decoding backed by a small thread pool.
///
/// Submit with [`submit`](Self::submit), then collect finished results on the
/// main thread with [`drain_results`](Self::drain_results).
pub struct TextureLoader {
    request_sender: Option<crossbeam_channel::Sender<TextureRequest>>,
    result_receiver: crossbeam_channel::Receiver<TextureResult>,
    worker_handles: Vec<JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
}

impl TextureLoader {
    /// Spawn `worker_count` decoder threads (at least one).
    pub fn new(worker_count: usize) -> Self {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<TextureRequest>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let worker_handles = (0..worker_count.max(1))
            .map(|index| {
                let rx = request_rx.clone();
                let tx = result_tx.clone();
                let flight = Arc::clone(&in_flight);
                std::thread::Builder::new()
                    .name(format!("texture-decode-{index}"))
                    .spawn(move || {
                        while let Ok(request) = rx.recv() {
                            let started = Instant::now();
                            let result = decode_texture(&request.path);
                            tracing::debug!(
                                slot = request.slot.name(),
                                path = %request.path.display(),
                                ok = result.is_ok(),
                                elapsed_ms = started.elapsed().as_millis() as u64,
                                "Decoded texture"
                            );
                            let _ = tx.send(TextureResult {
                                slot: request.slot,
                                result,
                            });
                            flight.fetch_sub(1, Ordering::Release);
                        }
                    })
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(err) => {
                    tracing::error!(error = %err, "Failed to spawn texture worker");
                    None
                }
            })
            .collect();

        Self {
            request_sender: Some(request_tx),
            result_receiver: result_rx,
            worker_handles,
            in_flight,
        }
    }

    /// Queue a decode. Returns `false` once the loader has shut down or has
    /// no workers.
    pub fn submit(&self, slot: TextureSlot, path: impl Into<PathBuf>) -> bool {
        let Some(sender) = &self.request_sender else {
            return false;
        };
        if self.worker_handles.is_empty() {
            return false;
        }
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let request = TextureRequest {
            slot,
            path: path.into(),
        };
        if sender.send(request).is_err() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    /// Every result finished since the last drain. Never blocks.
    pub fn drain_results(&self) -> Vec<TextureResult> {
        self.result_receiver.try_iter().collect()
    }

    /// Block until every submitted decode has finished or `timeout` elapses,
    /// returning the results collected meanwhile.
    pub fn wait_results(&self, timeout: Duration) -> Vec<TextureResult> {
        let deadline = Instant::now() + timeout;
        let mut results = Vec::new();
        loop {
            results.extend(self.result_receiver.try_iter());
            if self.in_flight_count() == 0 {
                results.extend(self.result_receiver.try_iter());
                return results;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(pending = self.in_flight_count(), "Timed out waiting for textures");
                return results;
            }
            if let Ok(result) = self
                .result_receiver
                .recv_timeout(remaining.min(Duration::from_millis(50)))
            {
                results.push(result);
            }
        }
    }

    /// Decodes queued or running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Close the queue and join the workers. Queued decodes still finish.
    pub fn shutdown(&mut self) {
        self.request_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for TextureLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One-shot source per texture slot.
#[derive(Clone, Default)]
pub struct TextureSet {
    pub color: OneShot<Texture>,
    pub bump: OneShot<Texture>,
    pub specular: OneShot<Texture>,
}

impl TextureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, slot: TextureSlot) -> &OneShot<Texture> {
        match slot {
            TextureSlot::Color => &self.color,
            TextureSlot::Bump => &self.bump,
            TextureSlot::Specular => &self.specular,
        }
    }

    /// Settle the slot of `result`. A slot settles once; later results for
    /// it are ignored and `false` is returned.
    pub fn deliver(&self, result: TextureResult) -> bool {
        let origin = format!("texture:{}", result.slot.name());
        if let Err(err) = &result.result {
            tracing::warn!(slot = result.slot.name(), error = %err, "Texture failed to load");
        }
        self.slot(result.slot).settle(&origin, result.result)
    }

    pub fn is_complete(&self) -> bool {
        TextureSlot::ALL.iter().all(|slot| self.slot(*slot).is_settled())
    }

    pub fn stream(&self, slot: TextureSlot) -> Stream<Texture> {
        self.slot(slot).stream()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pulse_stream::Observer;

    use super::*;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let image = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([x as u8, y as u8, 128, 255])
        });
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn test_decode_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "earth_color.png", 4, 2);
        let texture = decode_texture(&path).unwrap();
        assert_eq!(texture.name, "earth_color.png");
        assert_eq!((texture.width, texture.height), (4, 2));
        assert_eq!(texture.texel(3, 1), Some([3, 1, 128, 255]));
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode_texture(&dir.path().join("nope.jpg")).unwrap_err();
        assert!(matches!(err, TextureError::Io { .. }));
    }

    #[test]
    fn test_decode_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        let err = decode_texture(&path).unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }));
    }

    #[test]
    fn test_loader_decodes_on_workers() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = TextureLoader::new(2);
        for slot in TextureSlot::ALL {
            let path = write_png(dir.path(), &format!("{}.png", slot.name()), 2, 2);
            assert!(loader.submit(slot, path));
        }

        let results = loader.wait_results(Duration::from_secs(10));
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.result.is_ok()));
        assert_eq!(loader.in_flight_count(), 0);

        loader.shutdown();
        assert!(!loader.submit(TextureSlot::Color, dir.path().join("color.png")));
    }

    #[test]
    fn test_texture_set_settles_each_slot_once() {
        let set = TextureSet::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (next, error) = (Rc::clone(&seen), Rc::clone(&seen));
        let _sub = set.stream(TextureSlot::Bump).subscribe(Observer::new(
            move |t: Texture| next.borrow_mut().push(t.name),
            move |e| error.borrow_mut().push(e.to_string()),
            || {},
        ));

        let texture = Texture::from_rgba8("bump", 1, 1, vec![0; 4]).unwrap();
        assert!(set.deliver(TextureResult {
            slot: TextureSlot::Bump,
            result: Ok(texture),
        }));
        assert!(!set.deliver(TextureResult {
            slot: TextureSlot::Bump,
            result: Err(TextureError::ZeroDimensions { width: 0, height: 0 }),
        }));
        assert_eq!(*seen.borrow(), vec!["bump".to_string()]);
        assert!(!set.is_complete());
    }

    #[test]
    fn test_failed_slot_reports_origin() {
        let set = TextureSet::new();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let _sub = set.stream(TextureSlot::Specular).subscribe(Observer::new(
            |_| {},
            move |e| *sink.borrow_mut() = Some(e.to_string()),
            || {},
        ));
        set.deliver(TextureResult {
            slot: TextureSlot::Specular,
            result: Err(TextureError::Decode {
                name: "spec.jpg".into(),
                message: "bad huffman table".into(),
            }),
        });
        let message = seen.borrow().clone().unwrap();
        assert!(message.starts_with("texture:specular failed:"));
        assert!(message.contains("bad huffman table"));
    }
}
