// src/frame_source.rs
//
// Frame acquisition. A source yields `Ok(Some(frame))` per frame and
// `Ok(None)` for transient empty frames (video decoders emit a few at
// stream start), which callers skip.

use crate::error::LaneError;
use anyhow::Result;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

pub type FrameSource = Box<dyn Iterator<Item = Result<Option<RgbImage>>>>;

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

pub fn is_video(path: &Path) -> bool {
    has_extension(path, &VIDEO_EXTENSIONS)
}

pub fn is_image(path: &Path) -> bool {
    has_extension(path, &IMAGE_EXTENSIONS)
}

/// Pick a source for `path`: a directory of images, a video file or a
/// single image.
pub fn open_source(path: &Path) -> Result<FrameSource> {
    if !path.exists() {
        return Err(LaneError::UnreadableInput {
            path: path.display().to_string(),
            reason: "no such file or directory".to_string(),
        }
        .into());
    }

    if path.is_dir() {
        return Ok(Box::new(ImageSource::from_dir(path)?));
    }

    if is_video(path) {
        return open_video(path);
    }

    Ok(Box::new(ImageSource::single(path)))
}

#[cfg(feature = "video")]
fn open_video(path: &Path) -> Result<FrameSource> {
    Ok(Box::new(video::VideoSource::open(path)?))
}

#[cfg(not(feature = "video"))]
fn open_video(path: &Path) -> Result<FrameSource> {
    Err(LaneError::UnreadableInput {
        path: path.display().to_string(),
        reason: "video input requires the `video` feature".to_string(),
    }
    .into())
}

// ============================================================================
// IMAGES
// ============================================================================

/// Still images, read in path order.
pub struct ImageSource {
    paths: std::vec::IntoIter<PathBuf>,
}

impl ImageSource {
    pub fn single(path: &Path) -> Self {
        Self {
            paths: vec![path.to_path_buf()].into_iter(),
        }
    }

    pub fn from_dir(dir: &Path) -> Result<Self> {
        let entries = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LaneError::UnreadableInput {
                path: e
                    .path()
                    .unwrap_or(dir)
                    .display()
                    .to_string(),
                reason: e.to_string(),
            })?;

        let mut paths: Vec<PathBuf> = entries
            .into_iter()
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        paths.sort();

        info!("Found {} image(s) in {}", paths.len(), dir.display());
        Ok(Self {
            paths: paths.into_iter(),
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.len() == 0
    }
}

pub fn read_image(path: &Path) -> Result<RgbImage, LaneError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|e| LaneError::UnreadableInput {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

impl Iterator for ImageSource {
    type Item = Result<Option<RgbImage>>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        Some(read_image(&path).map(Some).map_err(Into::into))
    }
}

// ============================================================================
// VIDEO
// ============================================================================

#[cfg(feature = "video")]
pub mod video {
    use anyhow::{Context, Result};
    use image::RgbImage;
    use opencv::{
        core::Mat,
        imgproc,
        prelude::*,
        videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst},
    };
    use std::path::Path;
    use tracing::{debug, info};

    /// Consecutive empty reads after which the stream is treated as ended.
    const MAX_EMPTY_FRAMES: u32 = 30;

    pub struct VideoSource {
        cap: VideoCapture,
        current_frame: u64,
        empty_streak: u32,
    }

    impl VideoSource {
        pub fn open(path: &Path) -> Result<Self> {
            info!("Opening video: {}", path.display());

            let path_str = path
                .to_str()
                .with_context(|| format!("Non UTF-8 video path {}", path.display()))?;
            let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;

            if !cap.is_opened()? {
                anyhow::bail!("Failed to open video file {}", path.display());
            }

            let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
            let total_frames = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT)? as i64;
            let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
            let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

            info!(
                "Video properties: {}x{} @ {:.1} FPS, {} frames",
                width, height, fps, total_frames
            );

            Ok(Self {
                cap,
                current_frame: 0,
                empty_streak: 0,
            })
        }

        fn read_frame(&mut self) -> Result<Option<Option<RgbImage>>> {
            let mut mat = Mat::default();
            if !VideoCaptureTrait::read(&mut self.cap, &mut mat)? {
                return Ok(None);
            }
            self.current_frame += 1;

            if mat.empty() {
                self.empty_streak += 1;
                if self.empty_streak > MAX_EMPTY_FRAMES {
                    return Ok(None);
                }
                debug!("Empty frame #{}", self.current_frame);
                return Ok(Some(None));
            }
            self.empty_streak = 0;

            let mut rgb_mat = Mat::default();
            imgproc::cvt_color(&mat, &mut rgb_mat, imgproc::COLOR_BGR2RGB, 0)?;

            let width = rgb_mat.cols() as u32;
            let height = rgb_mat.rows() as u32;
            let data = rgb_mat.data_bytes()?.to_vec();
            let frame = RgbImage::from_raw(width, height, data)
                .context("Decoded frame does not match its dimensions")?;

            Ok(Some(Some(frame)))
        }
    }

    impl Iterator for VideoSource {
        type Item = Result<Option<RgbImage>>;

        fn next(&mut self) -> Option<Self::Item> {
            self.read_frame().transpose()
        }
    }
}
