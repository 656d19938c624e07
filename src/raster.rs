//! PNG export of the composed SVG and the base64 payload for inline display.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::config::RasterConfig;
use crate::error::RasterError;

#[cfg(feature = "png")]
mod backend {
    use std::sync::Arc;

    use log::debug;
    use once_cell::sync::Lazy;
    use resvg::tiny_skia::{Pixmap, Transform};

    use crate::config::RasterConfig;
    use crate::error::RasterError;

    // Loaded once, read-only afterwards.
    static SYSTEM_FONTS: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        debug!(faces = db.len(); "loaded system fonts");
        Arc::new(db)
    });

    static NO_FONTS: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| Arc::new(usvg::fontdb::Database::new()));

    pub(super) fn rasterize(svg: &str, config: &RasterConfig) -> Result<Vec<u8>, RasterError> {
        let mut options = usvg::Options::default();
        options.font_family = config.font_family.clone();
        options.fontdb = if config.load_system_fonts {
            Arc::clone(&SYSTEM_FONTS)
        } else {
            Arc::clone(&NO_FONTS)
        };

        let tree = usvg::Tree::from_str(svg, &options).map_err(|err| RasterError::Parse(err.to_string()))?;
        let size = tree.size();
        let (width, height) = (size.width(), size.height());

        let mut scale = if config.scale.is_finite() && config.scale > 0.0 {
            config.scale
        } else {
            1.0
        };
        let limit = config.max_dimension.max(1) as f32;
        let largest = width.max(height) * scale;
        if largest > limit {
            scale *= limit / largest;
            debug!(scale = scale; "raster scale reduced to the size limit");
        }

        let scaled_width = (width * scale).ceil().clamp(1.0, limit) as u32;
        let scaled_height = (height * scale).ceil().clamp(1.0, limit) as u32;
        let mut pixmap = Pixmap::new(scaled_width, scaled_height).ok_or(RasterError::Allocation {
            width: scaled_width,
            height: scaled_height,
        })?;
        resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
        pixmap.encode_png().map_err(|err| RasterError::Encode(err.to_string()))
    }
}

/// Rasterizes the exact markup produced by [`crate::render::render_svg`].
pub fn rasterize_png(svg: &str, config: &RasterConfig) -> Result<Vec<u8>, RasterError> {
    #[cfg(feature = "png")]
    {
        backend::rasterize(svg, config)
    }
    #[cfg(not(feature = "png"))]
    {
        let _ = (svg, config);
        Err(RasterError::Unsupported)
    }
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
