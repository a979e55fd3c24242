// src/output.rs
//
// Where processed frames go: optional PNG files named by frame index and an
// optional preview window.

use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct FrameSink {
    save_dir: Option<PathBuf>,
    display: bool,
    #[cfg(not(feature = "video"))]
    display_warned: bool,
}

impl FrameSink {
    pub fn new(save_dir: Option<PathBuf>, display: bool) -> Self {
        if let Some(dir) = &save_dir {
            info!("💾 Output frames will be written to: {}", dir.display());
        }
        Self {
            save_dir,
            display,
            #[cfg(not(feature = "video"))]
            display_warned: false,
        }
    }

    pub fn save_dir(&self) -> Option<&Path> {
        self.save_dir.as_deref()
    }

    /// Save and/or show frame `index`.
    pub fn emit(&mut self, index: u64, frame: &RgbImage) -> Result<()> {
        if let Some(dir) = &self.save_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
            let path = dir.join(format!("{}.png", index));
            frame
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!("Saved frame {} to {}", index, path.display());
        }

        if self.display {
            self.show(frame)?;
        }

        Ok(())
    }

    #[cfg(feature = "video")]
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        window::show(frame)
    }

    #[cfg(not(feature = "video"))]
    fn show(&mut self, _frame: &RgbImage) -> Result<()> {
        if !self.display_warned {
            tracing::warn!("Display requested but this build has no window support (enable the `video` feature)");
            self.display_warned = true;
        }
        Ok(())
    }
}

#[cfg(feature = "video")]
mod window {
    use anyhow::Result;
    use image::RgbImage;
    use opencv::{core, highgui, imgproc, prelude::*};

    const WINDOW_NAME: &str = "lane detection";
    const WAIT_MS: i32 = 100;

    pub fn show(frame: &RgbImage) -> Result<()> {
        let rgb_mat = unsafe {
            Mat::new_rows_cols_with_data(
                frame.height() as i32,
                frame.width() as i32,
                core::CV_8UC3,
                frame.as_raw().as_ptr() as *mut core::c_void,
                core::Mat_AUTO_STEP,
            )?
        };

        let mut bgr_mat = Mat::default();
        imgproc::cvt_color(&rgb_mat, &mut bgr_mat, imgproc::COLOR_RGB2BGR, 0)?;

        highgui::imshow(WINDOW_NAME, &bgr_mat)?;
        highgui::wait_key(WAIT_MS)?;
        Ok(())
    }
}
