#![warn(clippy::pedantic)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use mosaic_core::bezier::BezierPath;
use mosaic_core::boundary::{self, BoundaryType, TraceFormat};
use mosaic_core::buffer::{Depth, Layout, PixelBuffer, PixelFormat, PixelSource};
use mosaic_core::tile::{Projectable, RenderNode, TileHandlerProjectable, TileValidator, TiledBuffer};
use mosaic_core::units::{Resolution, Unit};
use mosaic_core::util::Rect;

mod config;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Bounds {
    /// Cut outlines open where they reach the edge of the region.
    Within,
    /// Compare the edge of the region against the pixels just outside it.
    Ignore,
}
impl From<Bounds> for BoundaryType {
    fn from(value: Bounds) -> Self {
        match value {
            Bounds::Within => Self::WithinBounds,
            Bounds::Ignore => Self::IgnoreBounds,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Channel {
    Alpha,
    Luminance,
}
impl From<Channel> for TraceFormat {
    fn from(value: Channel) -> Self {
        match value {
            Channel::Alpha => Self::Alpha,
            Channel::Luminance => Self::Luminance,
        }
    }
}

/// Trace the outlines of an image's mask into a vector path.
///
/// Pixels at or above the threshold are inside. Unset options take their value from the config file in
/// the user's preferences directory.
#[derive(clap::Parser, Debug)]
#[command(name = "mosaic", version)]
struct Args {
    /// Image to trace.
    input: PathBuf,
    /// Write an SVG document here. Without it, path data is printed to stdout.
    #[arg(short, long, value_name = "FILE.svg")]
    output: Option<PathBuf>,
    /// Inside/outside cut-off, from 0 to 1.
    #[arg(short, long)]
    threshold: Option<f32>,
    #[arg(short, long, value_enum)]
    bounds: Option<Bounds>,
    /// Which part of each pixel is compared against the threshold.
    #[arg(short, long, value_enum)]
    channel: Option<Channel>,
    /// Only trace this area, as `x,y,width,height`.
    #[arg(short, long, value_parser = parse_region)]
    region: Option<Rect>,
    /// Unit of the SVG document's size: px, in, mm, pt or pc.
    #[arg(long, default_value = "px")]
    unit: Unit,
    /// Pixels per inch, for sizing the SVG document in physical units.
    #[arg(long, default_value_t = 72.0)]
    dpi: f32,
    /// Keep every unit segment, rather than merging straight runs.
    #[arg(long)]
    no_simplify: bool,
    /// Save the effective settings as the new defaults.
    #[arg(long)]
    save_config: bool,
}

fn parse_region(arg: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = arg.split(',').map(str::trim).collect();
    let [x, y, width, height] = parts[..] else {
        return Err("expected x,y,width,height".to_owned());
    };
    let int = |s: &str| s.parse::<i32>().map_err(|e| format!("{s:?}: {e}"));
    let uint = |s: &str| s.parse::<u32>().map_err(|e| format!("{s:?}: {e}"));
    Rect::try_from_size(int(x)?, int(y)?, uint(width)?, uint(height)?)
        .ok_or_else(|| "region extends past the largest coordinate".to_owned())
}

/// A decoded picture, rendered into tiles on demand.
struct Picture {
    pixels: Arc<PixelBuffer>,
}
impl Projectable for Picture {
    fn begin_render(&self) {
        log::trace!("Begin render");
    }
    fn end_render(&self) {
        log::trace!("End render");
    }
    fn graph(&self) -> Arc<dyn RenderNode> {
        self.pixels.clone()
    }
}

/// Decode an image file, keeping its channel layout and bit depth where possible.
fn load(path: &std::path::Path) -> AnyResult<PixelBuffer> {
    use image::{ColorType, GenericImageView};
    let picture = image::open(path).with_context(|| format!("opening {}", path.display()))?;
    let extent = Rect::from_size(0, 0, picture.width(), picture.height());
    let wide = |data: Vec<u16>| data.into_iter().flat_map(u16::to_ne_bytes).collect::<Vec<u8>>();
    let (layout, depth, data) = match picture.color() {
        ColorType::L8 => (Layout::Y, Depth::U8, picture.into_luma8().into_raw()),
        ColorType::La8 => (Layout::YA, Depth::U8, picture.into_luma_alpha8().into_raw()),
        ColorType::Rgb8 => (Layout::Rgb, Depth::U8, picture.into_rgb8().into_raw()),
        ColorType::L16 => (Layout::Y, Depth::U16, wide(picture.into_luma16().into_raw())),
        ColorType::La16 => (
            Layout::YA,
            Depth::U16,
            wide(picture.into_luma_alpha16().into_raw()),
        ),
        ColorType::Rgb16 => (Layout::Rgb, Depth::U16, wide(picture.into_rgb16().into_raw())),
        ColorType::Rgba16 => (Layout::Rgba, Depth::U16, wide(picture.into_rgba16().into_raw())),
        ColorType::Rgb32F | ColorType::Rgba32F => (
            Layout::Rgba,
            Depth::F32,
            picture
                .into_rgba32f()
                .into_raw()
                .into_iter()
                .flat_map(f32::to_ne_bytes)
                .collect(),
        ),
        _ => (Layout::Rgba, Depth::U8, picture.into_rgba8().into_raw()),
    };
    log::debug!(
        "Loaded {} as {}x{} {} {}",
        path.display(),
        extent.width(),
        extent.height(),
        layout.as_ref(),
        depth.as_ref()
    );
    Ok(PixelBuffer::from_data(
        extent,
        PixelFormat { layout, depth },
        data,
    )?)
}

fn svg_document(path: &BezierPath, extent: Rect, resolution: Resolution, closed: bool) -> String {
    // Loops are wound so that holes cancel out under the default nonzero rule.
    let style = if closed {
        r#"fill="black""#
    } else {
        r#"fill="none" stroke="black""#
    };
    let unit = resolution.unit;
    let [width, height] = resolution.size_in(extent.width(), extent.height(), unit);
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}{unit}\" height=\"{height}{unit}\" \
         viewBox=\"{x} {y} {w} {h}\">\n<path {style} d=\"{d}\"/>\n</svg>\n",
        unit = unit.as_ref(),
        x = extent.x1,
        y = extent.y1,
        w = extent.width(),
        h = extent.height(),
        d = path.to_svg_path(),
    )
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stderr());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Info)
            .parse_default_env()
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Info);
    }
    let args = <Args as clap::Parser>::parse();

    let mut config = config::Config::load();
    let trace = &mut config.core.trace;
    if let Some(threshold) = args.threshold {
        anyhow::ensure!(
            (0.0..=1.0).contains(&threshold),
            "threshold must be between 0 and 1"
        );
        trace.threshold = threshold;
    }
    if let Some(bounds) = args.bounds {
        trace.bound_type = bounds.into();
    }
    if let Some(channel) = args.channel {
        trace.format = channel.into();
    }
    if args.no_simplify {
        trace.simplify = false;
    }
    let trace = *trace;
    anyhow::ensure!(args.dpi > 0.0, "dpi must be positive");
    let resolution = Resolution::new(args.dpi, args.dpi, args.unit)?;
    if args.save_config {
        let path = config.save().context("saving config")?;
        log::info!("Saved settings to {}", path.display());
    }

    let pixels = load(&args.input)?;
    let extent = pixels.extent();
    let format = pixels.format();

    // Render the picture through a tile cache, as a projection would be.
    let picture = Arc::new(Picture {
        pixels: Arc::new(pixels),
    });
    let mut handler = TileHandlerProjectable::new(&picture, format);
    handler.handler_mut().invalidate(extent);
    let mut tiles = TiledBuffer::with_tile_size(extent, format, config.core.tiles.tile_size);
    tiles.set_validator(handler);
    let pixels = tiles.read(extent)?;
    log::debug!("Rendered {} tiles", tiles.n_tiles());

    let region = match args.region {
        Some(region) => region
            .intersect(&extent)
            .context("region lies outside of the image")?,
        None => extent,
    };
    let segs = boundary::trace(
        &pixels,
        region,
        trace.format,
        trace.bound_type,
        trace.threshold,
    );
    let mut sorted = boundary::sort(&segs);
    if trace.simplify {
        sorted = boundary::simplify(&sorted);
    }
    let closed = (0..sorted.n_groups()).all(|group| sorted.is_closed(group));
    log::info!(
        "Traced {} segments into {} outlines, enclosing {} pixels",
        sorted.segs().len(),
        sorted.n_groups(),
        sorted.area()
    );
    let path = BezierPath::from_bound_segs(&sorted);

    match args.output {
        Some(output) => {
            std::fs::write(&output, svg_document(&path, extent, resolution, closed))
                .with_context(|| format!("writing {}", output.display()))?;
            log::info!("Wrote {} at {resolution}", output.display());
        }
        None => println!("{}", path.to_svg_path()),
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{parse_region, svg_document};
    use mosaic_core::bezier::BezierPath;
    use mosaic_core::boundary::SortedBoundary;
    use mosaic_core::units::{Resolution, Unit};
    use mosaic_core::util::Rect;

    #[test]
    fn regions() {
        assert_eq!(parse_region("1, 2,3,4"), Ok(Rect::from_size(1, 2, 3, 4)));
        assert!(parse_region("1,2,3").is_err());
        assert!(parse_region("1,2,-3,4").is_err());
        assert!(parse_region("2147483000,0,1000,10").is_err());
        assert!(parse_region("0,0,4294967295,1").is_err());
    }
    #[test]
    fn document_size_in_units() {
        let path = BezierPath::from_bound_segs(&SortedBoundary::default());
        let extent = Rect::from_size(0, 0, 144, 72);
        let svg = svg_document(&path, extent, Resolution::new(72.0, 72.0, Unit::Inch).unwrap(), true);
        assert!(svg.contains(r#"width="2in" height="1in""#));
        assert!(svg.contains(r#"viewBox="0 0 144 72""#));
        let svg = svg_document(&path, extent, Resolution::default(), true);
        assert!(svg.contains(r#"width="2in""#));
    }
}
