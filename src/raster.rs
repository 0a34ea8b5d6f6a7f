//! SVG frame rasterization
//!
//! Frames are rendered with resvg into a premultiplied RGBA pixmap. The
//! viewer uploads that as a texture; the `render` command writes it as PNG.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid SVG frame: {0}")]
    Svg(#[from] usvg::Error),
    #[error("Cannot allocate a {0}x{1} pixmap")]
    Pixmap(u32, u32),
    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Render an SVG document at its own size
pub fn rasterize(svg: &str) -> Result<tiny_skia::Pixmap, RenderError> {
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(svg, &opt)?;

    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or(RenderError::Pixmap(size.width(), size.height()))?;
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    debug!("Rasterized frame {}x{}", pixmap.width(), pixmap.height());
    Ok(pixmap)
}

/// Texture image for the viewer
pub fn to_color_image(pixmap: &tiny_skia::Pixmap) -> egui::ColorImage {
    egui::ColorImage::from_rgba_premultiplied(
        [pixmap.width() as usize, pixmap.height() as usize],
        pixmap.data(),
    )
}

/// Straight-alpha RGBA image
pub fn to_rgba_image(pixmap: &tiny_skia::Pixmap) -> Option<image::RgbaImage> {
    let mut flat = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        flat.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    image::RgbaImage::from_raw(pixmap.width(), pixmap.height(), flat)
}

pub fn write_png(pixmap: &tiny_skia::Pixmap, path: &Path) -> Result<(), RenderError> {
    let img = to_rgba_image(pixmap).ok_or(RenderError::Pixmap(pixmap.width(), pixmap.height()))?;
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

pub fn write_svg(svg: &str, path: &Path) -> Result<(), RenderError> {
    std::fs::write(path, svg).map_err(|source| RenderError::Write {
        path: path.display().to_string(),
        source,
    })
}
