//! Replay source for recorded grayscale frames
//!
//! Plays back a directory of PNM images (`.pgm`, `.ppm`, `.pnm`) in file-name order,
//! converted to 8-bit grayscale and looping by default, so the scanner can run without a camera. Frame buffers come from a fixed
//! pool the way a camera driver hands out DMA buffers: a buffer is only reused after
//! its frame has been released.

use image::{GrayImage, ImageError, ImageFormat};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::source::FrameSource;
use crate::types::{Frame, FrameFormat, PixelFormat};
use crate::{Result, ScanError};

/// Buffers in the pool unless configured otherwise
pub const DEFAULT_POOL_SIZE: usize = 2;

const FRAME_EXTENSIONS: [&str; 3] = ["pgm", "ppm", "pnm"];

/// Decode one PNM file to 8-bit grayscale
fn load_frame(path: &Path) -> Result<GrayImage> {
    let data = std::fs::read(path).map_err(|e| ScanError::file_error(path.to_path_buf(), e))?;
    let image = image::load_from_memory_with_format(&data, ImageFormat::Pnm).map_err(|e| match e {
        ImageError::IoError(e) => ScanError::file_error(path.to_path_buf(), e),
        other => ScanError::file_error(path.to_path_buf(), std::io::Error::new(ErrorKind::InvalidData, other)),
    })?;
    Ok(image.to_luma8())
}

struct PlaybackState {
    cursor: usize,
    next_seq: u64,
    free: Vec<Box<[u8]>>,
    outstanding: HashSet<u64>,
    shut_down: bool,
}

/// Frame source that replays recorded images
pub struct ReplaySource {
    images: Vec<Box<[u8]>>,
    format: FrameFormat,
    looping: bool,
    state: Mutex<PlaybackState>,
}

impl ReplaySource {
    /// Load every PNM file in `dir`, sorted by file name.
    ///
    /// Fails if the directory holds no images, any image is malformed, or the
    /// images disagree on dimensions.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let entries =
            std::fs::read_dir(dir).map_err(|e| ScanError::file_error(dir.to_path_buf(), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ScanError::file_error(dir.to_path_buf(), e))?.path();
            let is_frame = path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
                FRAME_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known))
            });
            if is_frame {
                paths.push(path);
            }
        }
        paths.sort();

        let mut format: Option<FrameFormat> = None;
        let mut images = Vec::with_capacity(paths.len());
        for path in &paths {
            let image = load_frame(path)?;

            let image_format = FrameFormat::new(image.width(), image.height(), PixelFormat::Grayscale);
            match format {
                None => format = Some(image_format),
                Some(expected) if expected != image_format => {
                    return Err(ScanError::frame_format(
                        expected.to_string(),
                        format!("{image_format} in {}", path.display()),
                    ));
                }
                Some(_) => {}
            }
            images.push(image.into_raw());
        }

        let Some(format) = format else {
            return Err(ScanError::camera_unavailable(format!(
                "no PNM frames in {}",
                dir.display()
            )));
        };

        info!("Opened replay directory {}: {} frames at {}", dir.display(), images.len(), format);
        Self::from_images(format, images)
    }

    /// Build a source from in-memory frames, each exactly `format.buffer_len()` bytes
    pub fn from_images(format: FrameFormat, images: Vec<Vec<u8>>) -> Result<Self> {
        if images.is_empty() {
            return Err(ScanError::camera_unavailable("replay needs at least one frame"));
        }
        if let Some((index, image)) =
            images.iter().enumerate().find(|(_, image)| image.len() != format.buffer_len())
        {
            return Err(ScanError::frame_format(
                format!("{} bytes", format.buffer_len()),
                format!("{} bytes in frame {index}", image.len()),
            ));
        }

        let source = Self {
            images: images.into_iter().map(Vec::into_boxed_slice).collect(),
            format,
            looping: true,
            state: Mutex::new(PlaybackState {
                cursor: 0,
                next_seq: 0,
                free: Vec::new(),
                outstanding: HashSet::new(),
                shut_down: false,
            }),
        };
        Ok(source.with_pool_size(DEFAULT_POOL_SIZE))
    }

    /// Number of buffers that may be checked out at once (at least one)
    pub fn with_pool_size(self, size: usize) -> Self {
        {
            let mut state = self.lock();
            let buffer_len = self.format.buffer_len();
            state.free = (0..size.max(1)).map(|_| vec![0u8; buffer_len].into_boxed_slice()).collect();
        }
        self
    }

    /// Stop after the last frame instead of starting over
    pub fn once(mut self) -> Self {
        self.looping = false;
        self
    }

    /// Number of recorded frames
    pub fn frame_count(&self) -> usize {
        self.images.len()
    }

    /// Frames currently checked out
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding.len()
    }

    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl FrameSource for ReplaySource {
    async fn acquire(&self) -> Result<Frame> {
        let mut state = self.lock();
        if state.shut_down {
            return Err(ScanError::camera_unavailable("replay source shut down"));
        }

        if state.cursor >= self.images.len() {
            if !self.looping {
                return Err(ScanError::camera_unavailable("end of replay"));
            }
            debug!("Replay wrapped around");
            state.cursor = 0;
        }

        let Some(mut buffer) = state.free.pop() else {
            return Err(ScanError::camera_unavailable(format!(
                "all {} frame buffers in use",
                state.outstanding.len()
            )));
        };
        buffer.copy_from_slice(&self.images[state.cursor]);
        state.cursor += 1;

        let seq = state.next_seq;
        state.next_seq += 1;
        state.outstanding.insert(seq);
        Ok(Frame::new(buffer, self.format, seq))
    }

    fn release(&self, frame: Frame) {
        let mut state = self.lock();
        if !state.outstanding.remove(&frame.seq) {
            warn!(seq = frame.seq, "Release of a frame that is not checked out");
            return;
        }
        if frame.data.len() == self.format.buffer_len() {
            state.free.push(frame.data);
        }
    }

    fn shutdown(&self) {
        let mut state = self.lock();
        if !state.shut_down {
            state.shut_down = true;
            info!(outstanding = state.outstanding.len(), "Replay source shut down");
        }
    }

    fn format(&self) -> FrameFormat {
        self.format
    }
}
