//! Background decoding of tile images.
//!
//! One worker thread per view walks the tile catalog, decodes each image and
//! resolves its anchor from the KDL manifest, then publishes the result over a
//! channel. The owning thread drains the channel while drawing and promotes
//! images to textures itself, since texture creation must stay on the thread
//! that owns the graphics context.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use image::RgbaImage;

use crate::tile_types::{CATALOG, TileType};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("missing resource {file}: {source}")]
    Missing {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {file}: {source}")]
    Decode {
        file: String,
        #[source]
        source: image::ImageError,
    },
    #[error("malformed manifest: {0}")]
    Manifest(#[from] kdl::KdlError),
    #[error("texture upload failed: {reason}")]
    Upload { reason: String },
}

/// Where tile images and the anchor manifest come from.
pub trait ImageSource: Send + 'static {
    fn decode(&self, file: &str) -> Result<RgbaImage, AssetError>;

    /// Raw text of the anchor manifest.
    fn read_manifest(&self) -> Result<String, AssetError>;
}

/// Images stored as files under one directory.
#[derive(Debug, Clone)]
pub struct DirImageSource {
    root: PathBuf,
    manifest: String,
}

impl DirImageSource {
    pub fn new(root: impl Into<PathBuf>, manifest: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            manifest: manifest.into(),
        }
    }
}

impl ImageSource for DirImageSource {
    fn decode(&self, file: &str) -> Result<RgbaImage, AssetError> {
        let bytes = std::fs::read(self.root.join(file)).map_err(|source| AssetError::Missing {
            file: file.to_string(),
            source,
        })?;
        let image = image::load_from_memory(&bytes).map_err(|source| AssetError::Decode {
            file: file.to_string(),
            source,
        })?;
        Ok(image.to_rgba8())
    }

    fn read_manifest(&self) -> Result<String, AssetError> {
        std::fs::read_to_string(self.root.join(&self.manifest)).map_err(|source| {
            AssetError::Missing {
                file: self.manifest.clone(),
                source,
            }
        })
    }
}

/// Images already held in memory, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageSource {
    pub images: HashMap<String, RgbaImage>,
    pub manifest: Option<String>,
    /// Artificial per-image decode time.
    pub delay: Duration,
}

impl ImageSource for MemoryImageSource {
    fn decode(&self, file: &str) -> Result<RgbaImage, AssetError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.images
            .get(file)
            .cloned()
            .ok_or_else(|| AssetError::Missing {
                file: file.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }

    fn read_manifest(&self) -> Result<String, AssetError> {
        self.manifest.clone().ok_or_else(|| AssetError::Missing {
            file: "manifest".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

/// Declared horizontal anchors, keyed by image file name.
///
/// Format: one `image "<file>" x=<int>` node per image. A `y` property is
/// accepted and ignored; the vertical anchor is always the image height.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    anchors: HashMap<String, i32>,
}

impl Manifest {
    /// Parse a manifest. Nodes with a bad anchor are skipped with a warning.
    pub fn parse(text: &str) -> Result<Self, AssetError> {
        let doc = text.parse::<kdl::KdlDocument>()?;
        let mut anchors = HashMap::new();
        for node in doc.nodes() {
            if node.name().to_string() != "image" {
                continue;
            }
            let Some(file) = node.get(0).and_then(|v| v.as_string()) else {
                log::warn!("manifest: image node without a file name");
                continue;
            };
            let Some(raw) = node.get("x") else {
                continue;
            };
            match anchor_value(raw) {
                Some(x) => {
                    anchors.insert(file.to_string(), x);
                }
                None => {
                    log::warn!("manifest: bad anchor {raw:?} for {file}, using image centre");
                }
            }
        }
        Ok(Self { anchors })
    }

    pub fn anchor_x(&self, file: &str) -> Option<i32> {
        self.anchors.get(file).copied()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Non-negative integer, given either as a number or a numeric string.
fn anchor_value(value: &kdl::KdlValue) -> Option<i32> {
    let parsed = match value.as_integer() {
        Some(i) => i32::try_from(i).ok(),
        None => value.as_string().and_then(|s| s.trim().parse::<i32>().ok()),
    };
    parsed.filter(|x| *x >= 0)
}

/// Pixel inside an image that sits on the tile's south corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

/// A decoded image ready for promotion.
#[derive(Debug)]
pub struct LoadedTile {
    pub kind: TileType,
    pub image: RgbaImage,
    pub anchor: Anchor,
}

#[derive(Debug)]
pub enum LoaderEvent {
    Loaded(LoadedTile),
    Finished { loaded: usize, missing: usize },
}

/// Called from the worker once every image has been attempted.
pub type RedrawSignal = Box<dyn Fn() + Send + 'static>;

/// One image to decode for one tile type.
pub type LoadJob = (TileType, &'static str);

/// Every catalog entry that has an image file.
pub fn catalog_jobs() -> Vec<LoadJob> {
    TileType::all()
        .zip(CATALOG.iter())
        .filter_map(|(kind, info)| info.file.map(|file| (kind, file)))
        .collect()
}

/// Handle to the worker thread. Dropping it stops and joins the worker.
pub struct AssetLoader {
    stop: Arc<AtomicBool>,
    events: Receiver<LoaderEvent>,
    worker: Option<JoinHandle<()>>,
    finished: bool,
}

impl AssetLoader {
    /// Start the worker on `jobs`.
    pub fn spawn<S: ImageSource>(source: S, jobs: Vec<LoadJob>, on_finished: RedrawSignal) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, events) = crossbeam_channel::unbounded();
        let worker_stop = Arc::clone(&stop);
        let worker = std::thread::Builder::new()
            .name("tile-loader".to_string())
            .spawn(move || run_worker(&source, jobs, &worker_stop, &tx, &on_finished));
        let (worker, finished) = match worker {
            Ok(handle) => (Some(handle), false),
            Err(e) => {
                log::error!("cannot start tile loader: {e}");
                (None, true)
            }
        };
        Self {
            stop,
            events,
            worker,
            finished,
        }
    }

    /// Images decoded since the last call. Never blocks.
    pub fn poll(&mut self) -> Vec<LoadedTile> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            accept(event, &mut out, &mut self.finished);
        }
        out
    }

    /// Block until the worker is done or `timeout` passes, returning every
    /// image received meanwhile.
    pub fn wait(&mut self, timeout: Duration) -> Vec<LoadedTile> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        while !self.finished {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(left) {
                Ok(event) => accept(event, &mut out, &mut self.finished),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    self.finished = true;
                }
            }
        }
        out
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Ask the worker to stop before its next image and wait for it.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker.take()
            && handle.join().is_err()
        {
            log::error!("tile loader panicked");
        }
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("running", &self.worker.is_some())
            .field("finished", &self.finished)
            .finish()
    }
}

fn accept(event: LoaderEvent, out: &mut Vec<LoadedTile>, finished: &mut bool) {
    match event {
        LoaderEvent::Loaded(tile) => out.push(tile),
        LoaderEvent::Finished { loaded, missing } => {
            log::debug!("tile loader done: {loaded} loaded, {missing} missing");
            *finished = true;
        }
    }
}

fn run_worker<S: ImageSource>(
    source: &S,
    jobs: Vec<LoadJob>,
    stop: &AtomicBool,
    tx: &Sender<LoaderEvent>,
    on_finished: &RedrawSignal,
) {
    log::info!("loading {} tile images", jobs.len());
    let manifest = match source.read_manifest().and_then(|text| Manifest::parse(&text)) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("{e}, anchoring every image at its centre");
            Manifest::default()
        }
    };

    let mut loaded = 0;
    let mut missing = 0;
    for (kind, file) in jobs {
        if stop.load(Ordering::Relaxed) {
            log::info!("tile loading stopped after {loaded} images");
            return;
        }
        match source.decode(file) {
            Ok(image) => {
                let anchor = Anchor {
                    x: manifest
                        .anchor_x(file)
                        .unwrap_or((image.width() / 2) as i32),
                    y: image.height() as i32,
                };
                let tile = LoadedTile {
                    kind,
                    image,
                    anchor,
                };
                if tx.send(LoaderEvent::Loaded(tile)).is_err() {
                    return;
                }
                loaded += 1;
            }
            Err(e) => {
                log::warn!("{e}");
                missing += 1;
            }
        }
    }

    log::info!("finished loading tile images ({loaded} loaded, {missing} missing)");
    // The receiver may already be gone during teardown.
    let _ = tx.send(LoaderEvent::Finished { loaded, missing });
    on_finished();
}
