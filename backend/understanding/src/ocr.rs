//! Optical Character Recognition (OCR)
//!
//! Fallback for scanned PDFs: rasterize every page with `pdftoppm`, binarize
//! it (grayscale + Otsu threshold), then read it with `tesseract`. Every tool
//! invocation runs under the configured timeout.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use audittrack_config::OcrConfig;
use image::{GrayImage, Luma};
use serde_json::json;
use tokio::process::Command;
use tracing::{debug, info};

/// Reads text out of page images.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// One recognized text per page, in document order.
    async fn recognize_pages(&self, pdf: &Path) -> Result<Vec<String>>;
}

/// `pdftoppm` + `tesseract` backed OCR.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    config: OcrConfig,
}

/// Availability of one external OCR tool.
#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub program: String,
    pub available: bool,
    pub version: Option<String>,
}

impl ToolStatus {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "program": self.program,
            "available": self.available,
            "version": self.version,
        })
    }
}

impl TesseractOcr {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn run_tool<I, S>(&self, program: &str, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = tokio::time::timeout(
            self.timeout(),
            Command::new(program).args(args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| anyhow!("{program} timed out after {}s", self.config.timeout_secs))?
        .with_context(|| format!("Failed to launch {program}"))?;

        if !output.status.success() {
            bail!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }

    /// Renders each page to `<out_dir>/page-N.png`, sorted by page number.
    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let prefix = out_dir.join("page");
        let dpi = self.config.dpi.to_string();
        self.run_tool(
            &self.config.pdftoppm_bin,
            [
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-png"),
                pdf.as_os_str(),
                prefix.as_os_str(),
            ],
        )
        .await?;

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir)
            .await
            .context("Failed to list rasterized pages")?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(number) = page_number(&path) {
                pages.push((number, path));
            }
        }
        // pdftoppm zero-pads to the page count's width, so sort numerically.
        pages.sort_by_key(|(number, _)| *number);
        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }

    async fn read_page(&self, image: &Path) -> Result<String> {
        let psm = self.config.page_seg_mode.to_string();
        let output = self
            .run_tool(
                &self.config.tesseract_bin,
                [
                    image.as_os_str(),
                    OsStr::new("stdout"),
                    OsStr::new("--psm"),
                    OsStr::new(&psm),
                    OsStr::new("-l"),
                    OsStr::new(&self.config.language),
                ],
            )
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Probe both tools; used by `audittrack status`.
    pub async fn check_tools(&self) -> Vec<ToolStatus> {
        let mut statuses = Vec::new();
        for (program, flag) in [
            (&self.config.pdftoppm_bin, "-v"),
            (&self.config.tesseract_bin, "--version"),
        ] {
            let probe = tokio::time::timeout(
                Duration::from_secs(5),
                Command::new(program).arg(flag).kill_on_drop(true).output(),
            )
            .await;
            let status = match probe {
                Ok(Ok(output)) => {
                    // pdftoppm prints its version on stderr.
                    let text = if output.stdout.is_empty() {
                        String::from_utf8_lossy(&output.stderr).into_owned()
                    } else {
                        String::from_utf8_lossy(&output.stdout).into_owned()
                    };
                    ToolStatus {
                        program: program.clone(),
                        available: true,
                        version: text.lines().next().map(|l| l.trim().to_string()),
                    }
                }
                _ => ToolStatus {
                    program: program.clone(),
                    available: false,
                    version: None,
                },
            };
            statuses.push(status);
        }
        statuses
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize_pages(&self, pdf: &Path) -> Result<Vec<String>> {
        let workdir = tempfile::tempdir().context("Failed to create OCR scratch directory")?;
        let pages = self.rasterize(pdf, workdir.path()).await?;
        if pages.is_empty() {
            bail!("pdftoppm produced no page images for {}", pdf.display());
        }
        info!(pdf = %pdf.display(), pages = pages.len(), "Running OCR");

        let mut texts = Vec::with_capacity(pages.len());
        for (idx, page) in pages.into_iter().enumerate() {
            let binarized = tokio::task::spawn_blocking(move || binarize_file(&page))
                .await
                .context("Image thresholding task panicked")??;
            let text = self
                .read_page(&binarized)
                .await
                .with_context(|| format!("OCR failed on page {}", idx + 1))?;
            debug!(page = idx + 1, chars = text.len(), "Page recognized");
            texts.push(text);
        }
        Ok(texts)
    }
}

/// `page-07.png` -> 7
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("page-")?.parse().ok()
}

fn binarize_file(page: &Path) -> Result<PathBuf> {
    let gray = image::open(page)
        .with_context(|| format!("Failed to open page image {}", page.display()))?
        .to_luma8();
    let out = page.with_extension("bin.png");
    binarize(&gray)
        .save(&out)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    Ok(out)
}

/// Threshold maximizing between-class variance of the gray histogram.
pub fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel[0] as usize] += 1;
    }
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return 0;
    }

    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(value, count)| value as f64 * *count as f64)
        .sum();

    let mut weight_bg = 0u64;
    let mut sum_bg = 0f64;
    let mut best = (0u8, 0f64);
    for (t, count) in histogram.iter().enumerate() {
        weight_bg += count;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += t as f64 * *count as f64;
        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let between = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);
        if between > best.1 {
            best = (t as u8, between);
        }
    }
    best.0
}

/// Pixels above the Otsu threshold become white, the rest black.
pub fn binarize(image: &GrayImage) -> GrayImage {
    let threshold = otsu_threshold(image);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
