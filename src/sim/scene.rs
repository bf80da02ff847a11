/// The Level 3 picture: background with the hidden object pasted on top.
///
/// ## Geometry
///   The overlay is centered on the background with floor division:
///     x0 = (bg_w - ov_w) div 2      y0 = (bg_h - ov_h) div 2
///     x1 = x0 + ov_w                y1 = y0 + ov_h
///   The target box is inclusive on all four edges, so it is one pixel
///   wider and taller than the overlay itself.
///
/// ## Sources
///   1. Background + overlay image files (composited in memory)
///   2. Fallback: configured sizes, procedurally drawn forest
///
/// ## Viewport
///   The renderer draws the scene into a block of terminal cells, two scene
///   rows per cell (upper/lower half block). `SceneViewport` converts between
///   terminal cells and scene pixels for mouse clicks and the crosshair.

use image::RgbaImage;

use crate::config::SceneConfig;
use crate::domain::challenge::{AssetRef, BoundingBox};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SceneLayout {
    pub background: (u32, u32),
    pub overlay: (u32, u32),
}

impl SceneLayout {
    pub fn overlay_origin(&self) -> (i64, i64) {
        let (bw, bh) = (self.background.0 as i64, self.background.1 as i64);
        let (ow, oh) = (self.overlay.0 as i64, self.overlay.1 as i64);
        ((bw - ow).div_euclid(2), (bh - oh).div_euclid(2))
    }

    pub fn target_box(&self) -> BoundingBox {
        let (x0, y0) = self.overlay_origin();
        BoundingBox::new(
            x0,
            y0,
            x0 + self.overlay.0 as i64,
            y0 + self.overlay.1 as i64,
        )
    }
}

pub struct Scene {
    pub layout: SceneLayout,
    pub asset: AssetRef,
    /// Composited picture; `None` when drawn procedurally.
    pixels: Option<RgbaImage>,
}

impl Scene {
    /// Load and composite the configured images, or fall back to the
    /// configured sizes if either file cannot be decoded.
    pub fn load(cfg: &SceneConfig) -> Scene {
        let asset = AssetRef {
            background: cfg.background.display().to_string(),
            overlay: cfg.overlay.display().to_string(),
        };

        let loaded = image::open(&cfg.background)
            .and_then(|bg| image::open(&cfg.overlay).map(|ov| (bg, ov)));

        match loaded {
            Ok((bg, ov)) => {
                let mut canvas = bg.to_rgba8();
                let top = ov.to_rgba8();
                let layout = SceneLayout {
                    background: canvas.dimensions(),
                    overlay: top.dimensions(),
                };
                let (x, y) = layout.overlay_origin();
                image::imageops::overlay(&mut canvas, &top, x, y);
                log::info!(
                    "scene loaded from {} + {} ({}x{}, target {:?})",
                    asset.background, asset.overlay,
                    layout.background.0, layout.background.1,
                    layout.target_box(),
                );
                Scene { layout, asset, pixels: Some(canvas) }
            }
            Err(e) => {
                log::warn!("scene images unavailable ({e}); drawing procedural scene");
                let layout = SceneLayout {
                    background: (cfg.fallback_background.0.max(1), cfg.fallback_background.1.max(1)),
                    overlay: cfg.fallback_overlay,
                };
                Scene::procedural(layout, asset)
            }
        }
    }

    pub fn procedural(layout: SceneLayout, asset: AssetRef) -> Scene {
        Scene { layout, asset, pixels: None }
    }

    pub fn width(&self) -> u32 {
        self.layout.background.0
    }

    pub fn height(&self) -> u32 {
        self.layout.background.1
    }

    pub fn target_box(&self) -> BoundingBox {
        self.layout.target_box()
    }

    /// RGB at a scene pixel. Coordinates are clamped to the picture.
    pub fn color_at(&self, x: u32, y: u32) -> [u8; 3] {
        let x = x.min(self.width().saturating_sub(1));
        let y = y.min(self.height().saturating_sub(1));
        match &self.pixels {
            Some(img) => {
                let p = img.get_pixel(x, y).0;
                [p[0], p[1], p[2]]
            }
            None => self.procedural_color(x, y),
        }
    }

    fn procedural_color(&self, x: u32, y: u32) -> [u8; 3] {
        let noise = hash2(x / 3, y / 3);
        let (ox, oy) = self.layout.overlay_origin();
        let inside_overlay = (x as i64) >= ox
            && (x as i64) < ox + self.layout.overlay.0 as i64
            && (y as i64) >= oy
            && (y as i64) < oy + self.layout.overlay.1 as i64;
        if inside_overlay {
            // Brown fur, close enough to bark to take a second look.
            let shade = 60 + (noise % 25) as u8;
            [shade + 40, shade, 20]
        } else if noise % 11 == 0 {
            [70, 50, 25] // trunk
        } else {
            let g = 70 + (noise % 90) as u8;
            [15, g, 20]
        }
    }
}

fn hash2(x: u32, y: u32) -> u32 {
    let mut h = x.wrapping_mul(374_761_393) ^ y.wrapping_mul(668_265_263);
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^ (h >> 16)
}

// ══════════════════════════════════════════════════════════════
// Viewport: terminal cells ↔ scene pixels
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SceneViewport {
    /// Top-left terminal cell of the picture.
    pub col: u16,
    pub row: u16,
    /// Size in terminal cells. Each cell shows two scene rows.
    pub cols: u16,
    pub rows: u16,
    pub scene_w: u32,
    pub scene_h: u32,
}

impl SceneViewport {
    /// Largest aspect-correct block that fits in `term_w` x `max_rows`,
    /// centered horizontally, top edge at `row`.
    pub fn fit(term_w: u16, row: u16, max_rows: u16, scene_w: u32, scene_h: u32) -> Self {
        let scene_w = scene_w.max(1);
        let scene_h = scene_h.max(1);
        let max_cols = term_w.max(1) as u32;
        let max_rows = max_rows.max(1) as u32;

        // One cell = 1 px wide, 2 px tall, so rows = cols * h / w / 2.
        let mut cols = max_cols;
        let mut rows = (cols as u64 * scene_h as u64).div_ceil(2 * scene_w as u64) as u32;
        if rows > max_rows {
            rows = max_rows;
            cols = ((rows as u64 * 2 * scene_w as u64) / scene_h as u64).max(1) as u32;
        }
        let cols = cols.min(max_cols);

        SceneViewport {
            col: ((max_cols - cols) / 2) as u16,
            row,
            cols: cols as u16,
            rows: rows.max(1) as u16,
            scene_w,
            scene_h,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }

    /// Scene pixel under the center of a terminal cell, or `None` outside the picture.
    pub fn to_scene(&self, col: u16, row: u16) -> Option<(i64, i64)> {
        if self.is_empty()
            || col < self.col || col >= self.col + self.cols
            || row < self.row || row >= self.row + self.rows
        {
            return None;
        }
        let c = (col - self.col) as i64;
        let r = (row - self.row) as i64;
        let x = ((2 * c + 1) * self.scene_w as i64) / (2 * self.cols as i64);
        let y = ((2 * r + 1) * self.scene_h as i64) / (2 * self.rows as i64);
        Some((x, y))
    }

    /// Terminal cell showing a scene pixel, or `None` outside the picture.
    pub fn to_cell(&self, x: i64, y: i64) -> Option<(u16, u16)> {
        if self.is_empty()
            || x < 0 || y < 0
            || x >= self.scene_w as i64 || y >= self.scene_h as i64
        {
            return None;
        }
        let c = x * self.cols as i64 / self.scene_w as i64;
        let r = y * self.rows as i64 / self.scene_h as i64;
        Some((self.col + c as u16, self.row + r as u16))
    }

    /// Inclusive pixel rectangle shown by a terminal cell, or `None` outside
    /// the picture. Pixels are assigned to cells exactly as `to_cell` does,
    /// so the rectangles tile the scene. A cell too small to own a pixel
    /// falls back to the pixel under its centre.
    pub fn cell_rect(&self, col: u16, row: u16) -> Option<BoundingBox> {
        let (cx, cy) = self.to_scene(col, row)?;
        let c = (col - self.col) as i64;
        let r = (row - self.row) as i64;
        let (w, h) = (self.scene_w as i64, self.scene_h as i64);
        let (cols, rows) = (self.cols as i64, self.rows as i64);

        // First pixel p with p * cols / w >= c is ceil(c * w / cols).
        let span = |i: i64, size: i64, n: i64, centre: i64| {
            let lo = (i * size + n - 1) / n;
            let hi = ((i + 1) * size + n - 1) / n - 1;
            if hi < lo { (centre, centre) } else { (lo, hi) }
        };
        let (x0, x1) = span(c, w, cols, cx);
        let (y0, y1) = span(r, h, rows, cy);
        Some(BoundingBox::new(x0, y0, x1, y1))
    }

    /// Scene pixels covered by one terminal cell step (at least 1).
    pub fn step(&self) -> (i64, i64) {
        if self.is_empty() {
            return (1, 1);
        }
        (
            (self.scene_w as i64 / self.cols as i64).max(1),
            (self.scene_h as i64 / self.rows as i64).max(1),
        )
    }
}
