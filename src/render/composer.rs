use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Pixel, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::assets::{AssetLoadError, AssetLoader, Gallery, RenderAssets};
use super::layout::{self, BlockLayout, Placement, Side};
use super::selector::{choose, Selector};
use super::text::{capitalize_first, draw_text, Align, TextStyle, Typeface};
use crate::forecast::{ForecastResult, PeriodSummary};

pub const DEFAULT_TITLE_TEMPLATE: &str = "Погода в Білій Церкві на завтра {date}";

pub const DEFAULT_PHRASES: &[&str] = &["ОТАКОЇ", "ТА НУ", "ОЦЕ ТАК", "НУ ВСЕ", "ТРИМАЙСЯ"];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Asset(#[from] AssetLoadError),

    #[error("Failed to load font {path}: {reason}")]
    Font { path: String, reason: String },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

/// A PNG on disk, owned by whoever delivers it.
///
/// Dropping it without calling [`RenderedImage::remove`] still deletes the
/// file, so a cancelled delivery leaves nothing behind.
#[derive(Debug)]
pub struct RenderedImage {
    path: PathBuf,
    armed: bool,
}

impl RenderedImage {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remove(mut self) -> std::io::Result<()> {
        let result = tokio::fs::remove_file(&self.path).await;
        self.armed = false;
        result
    }
}

impl Drop for RenderedImage {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed abandoned card");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove abandoned card");
            }
        }
    }
}

pub struct ComposerOptions {
    pub regular: Typeface,
    pub bold: Typeface,
    pub gallery: Gallery,
    pub phrases: Vec<String>,
    pub title_template: String,
    pub output_dir: PathBuf,
}

pub struct ImageComposer {
    regular: Typeface,
    bold: Typeface,
    gallery: Gallery,
    phrases: Vec<String>,
    title_template: String,
    output_dir: PathBuf,
    selector: Arc<dyn Selector>,
}

pub fn load_typeface(path: &Path) -> Result<Typeface, RenderError> {
    let bytes = std::fs::read(path).map_err(|e| RenderError::Font {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Typeface::from_bytes(bytes).map_err(|e| RenderError::Font {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

impl ImageComposer {
    pub fn new(options: ComposerOptions, selector: Arc<dyn Selector>) -> Self {
        Self {
            regular: options.regular,
            bold: options.bold,
            gallery: options.gallery,
            phrases: options.phrases,
            title_template: options.title_template,
            output_dir: options.output_dir,
            selector,
        }
    }

    /// Draw the card. Pure apart from the injected phrase selector.
    pub fn compose(
        &self,
        result: &ForecastResult,
        assets: &RenderAssets,
        title_date: &str,
    ) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(
            layout::CANVAS_WIDTH,
            layout::CANVAS_HEIGHT,
            layout::BACKGROUND,
        );

        let title = self.title_template.replace("{date}", title_date);
        draw_text(
            &mut canvas,
            &self.regular,
            &title,
            layout::title_anchor(),
            &TextStyle::new(layout::TITLE_SIZE, layout::WHITE, Align::Center),
        );

        draw_separator(&mut canvas);

        self.draw_block(&mut canvas, Side::Night, &result.night, &assets.night_icon);
        self.draw_block(&mut canvas, Side::Day, &result.day, &assets.day_icon);

        let character = &assets.character;
        let placement = layout::character_placement(character.width(), character.height());
        overlay_scaled(&mut canvas, character, placement);

        if let Some(phrase) = choose(self.selector.as_ref(), &self.phrases) {
            let style = TextStyle::new(layout::CAPTION_SIZE, layout::WHITE, Align::Center)
                .with_outline(layout::BLACK, layout::CAPTION_STROKE_WIDTH);
            draw_text(
                &mut canvas,
                &self.bold,
                phrase,
                layout::caption_anchor(),
                &style,
            );
        }

        canvas
    }

    fn draw_block(
        &self,
        canvas: &mut RgbaImage,
        side: Side,
        summary: &PeriodSummary,
        icon: &DynamicImage,
    ) {
        let block = BlockLayout::for_side(side);

        draw_text(
            canvas,
            &self.bold,
            side.label(),
            block.label,
            &TextStyle::new(layout::LABEL_SIZE, layout::LABEL_COLOR, Align::Center),
        );

        overlay_scaled(canvas, icon, block.icon);

        draw_text(
            canvas,
            &self.bold,
            &format!("{}°", summary.temperature),
            block.temperature,
            &TextStyle::new(layout::TEMPERATURE_SIZE, layout::WHITE, Align::Left),
        );

        draw_text(
            canvas,
            &self.bold,
            &capitalize_first(&summary.description),
            block.description,
            &TextStyle::new(layout::DESCRIPTION_SIZE, layout::WHITE, Align::Center),
        );
    }

    /// Load the bitmaps, compose, and write the PNG into the output directory.
    pub async fn render(
        &self,
        result: &ForecastResult,
        loader: &dyn AssetLoader,
        title_date: &str,
    ) -> Result<RenderedImage, RenderError> {
        let character_path = self.gallery.pick(self.selector.as_ref())?;

        let (night_icon, day_icon, character) = tokio::try_join!(
            loader.icon(&result.night.icon_code),
            loader.icon(&result.day.icon_code),
            loader.character(character_path),
        )?;

        let assets = RenderAssets {
            night_icon,
            day_icon,
            character,
        };

        let canvas = self.compose(result, &assets, title_date);
        let image = RenderedImage::new(self.write_png(&canvas).await?);

        tracing::info!(
            path = %image.path().display(),
            night_icon = %result.night.icon_code,
            day_icon = %result.day.icon_code,
            character = %character_path.display(),
            "Rendered forecast card"
        );

        Ok(image)
    }

    /// Encode fully in memory, then publish with a rename so readers never see a partial file.
    async fn write_png(&self, canvas: &RgbaImage) -> Result<PathBuf, RenderError> {
        let mut bytes = Cursor::new(Vec::new());
        canvas.write_to(&mut bytes, ImageFormat::Png)?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| RenderError::Io {
                path: self.output_dir.display().to_string(),
                source,
            })?;

        let name = format!("forecast-{}.png", uuid::Uuid::new_v4());
        let target = self.output_dir.join(&name);
        let partial = self.output_dir.join(format!("{}.part", name));

        if let Err(source) = tokio::fs::write(&partial, bytes.into_inner()).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(RenderError::Io {
                path: partial.display().to_string(),
                source,
            });
        }

        if let Err(source) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(RenderError::Io {
                path: target.display().to_string(),
                source,
            });
        }

        Ok(target)
    }
}

fn draw_separator(canvas: &mut RgbaImage) {
    let left = layout::separator_x().max(0) as u32;
    for x in left..(left + layout::SEPARATOR_WIDTH).min(canvas.width()) {
        for y in layout::SEPARATOR_TOP..=layout::SEPARATOR_BOTTOM.min(canvas.height() - 1) {
            canvas
                .get_pixel_mut(x, y)
                .blend(&layout::SEPARATOR_COLOR);
        }
    }
}

fn overlay_scaled(canvas: &mut RgbaImage, source: &DynamicImage, placement: Placement) {
    let scaled = imageops::resize(
        source,
        placement.width,
        placement.height,
        FilterType::Lanczos3,
    );
    imageops::overlay(canvas, &scaled, placement.x, placement.y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_icon_cache;
    use crate::forecast::PeriodSummary;
    use crate::render::assets::{AssetService, IconSource};
    use crate::render::selector::FixedSelector;
    use image::Rgba;

    const REGULAR: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/assets/fonts/DejaVuSans.ttf"
    ));
    const BOLD: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/assets/fonts/DejaVuSans-Bold.ttf"
    ));

    struct Fixture {
        root: tempfile::TempDir,
        icons: PathBuf,
        output: PathBuf,
        composer: ImageComposer,
    }

    fn write_png(path: &Path, width: u32, height: u32, color: [u8; 4]) {
        RgbaImage::from_pixel(width, height, Rgba(color))
            .save(path)
            .unwrap();
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let icons = root.path().join("icons");
        let characters = root.path().join("characters");
        let output = root.path().join("out");
        std::fs::create_dir_all(&icons).unwrap();
        std::fs::create_dir_all(&characters).unwrap();

        write_png(&icons.join("01n.png"), 200, 200, [250, 220, 90, 255]);
        write_png(&icons.join("10d.png"), 200, 200, [120, 120, 130, 255]);
        write_png(&characters.join("character_1.png"), 200, 280, [230, 80, 40, 255]);

        let composer = ImageComposer::new(
            ComposerOptions {
                regular: Typeface::from_bytes(REGULAR.to_vec()).unwrap(),
                bold: Typeface::from_bytes(BOLD.to_vec()).unwrap(),
                gallery: Gallery::scan(&characters).unwrap(),
                phrases: DEFAULT_PHRASES.iter().map(|p| p.to_string()).collect(),
                title_template: DEFAULT_TITLE_TEMPLATE.to_string(),
                output_dir: output.clone(),
            },
            Arc::new(FixedSelector(0)),
        );

        Fixture {
            root,
            icons,
            output,
            composer,
        }
    }

    fn loader(icons: &Path) -> AssetService {
        AssetService::new(
            reqwest::Client::new(),
            IconSource::Directory(icons.to_path_buf()),
            create_icon_cache(),
        )
    }

    fn result() -> ForecastResult {
        ForecastResult {
            night: PeriodSummary {
                temperature: -3,
                description: "ясно".to_string(),
                icon_code: "01n".to_string(),
                humidity: 80,
                wind_speed: 2.0,
            },
            day: PeriodSummary {
                temperature: 7,
                description: "легкий дощ".to_string(),
                icon_code: "10d".to_string(),
                humidity: 91,
                wind_speed: 4.5,
            },
        }
    }

    fn assets() -> RenderAssets {
        RenderAssets {
            night_icon: Arc::new(DynamicImage::new_rgba8(200, 200)),
            day_icon: Arc::new(DynamicImage::new_rgba8(50, 50)),
            character: Arc::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                200,
                280,
                Rgba([230, 80, 40, 255]),
            ))),
        }
    }

    fn output_files(dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_compose_has_fixed_dimensions() {
        let f = fixture();
        let canvas = f.composer.compose(&result(), &assets(), "16.01.2026");
        assert_eq!(canvas.dimensions(), (609, 340));

        // odd-sized inputs never change the canvas
        let mut odd = assets();
        odd.character = Arc::new(DynamicImage::new_rgba8(1000, 30));
        let canvas = f.composer.compose(&result(), &odd, "");
        assert_eq!(canvas.dimensions(), (609, 340));
    }

    #[test]
    fn test_compose_is_deterministic_with_fixed_selector() {
        let f = fixture();
        let first = f.composer.compose(&result(), &assets(), "16.01.2026");
        let second = f.composer.compose(&result(), &assets(), "16.01.2026");
        assert_eq!(first, second);
    }

    #[test]
    fn test_compose_background_and_separator() {
        let f = fixture();
        let canvas = f.composer.compose(&result(), &assets(), "16.01.2026");

        assert_eq!(*canvas.get_pixel(2, 2), layout::BACKGROUND);

        let separator = canvas.get_pixel(layout::separator_x() as u32, 90);
        let background = layout::BACKGROUND;
        for channel in 0..3 {
            assert!(separator.0[channel] > background.0[channel]);
            assert!(separator.0[channel] < 255);
        }
    }

    #[test]
    fn test_compose_draws_character_in_the_middle() {
        let f = fixture();
        let canvas = f.composer.compose(&result(), &assets(), "16.01.2026");
        // between the caption and the blocks, nothing covers the character
        let pixel = canvas.get_pixel(304, 240);
        for (actual, expected) in pixel.0.iter().zip([230u8, 80, 40, 255]) {
            assert!(actual.abs_diff(expected) <= 2);
        }
    }

    #[test]
    fn test_phrase_choice_changes_output() {
        let f = fixture();
        let other = ImageComposer {
            selector: Arc::new(FixedSelector(1)),
            ..f.composer
        };
        let g = fixture();

        let a = g.composer.compose(&result(), &assets(), "16.01.2026");
        let b = other.compose(&result(), &assets(), "16.01.2026");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_render_writes_decodable_png() {
        let f = fixture();
        let rendered = f
            .composer
            .render(&result(), &loader(&f.icons), "16.01.2026")
            .await
            .unwrap();

        let path = rendered.path().to_path_buf();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (609, 340));

        assert_eq!(output_files(&f.output), vec![path.clone()]);

        rendered.remove().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_render_fails_on_missing_icon_without_leaving_files() {
        let f = fixture();
        let mut forecast = result();
        forecast.day.icon_code = "13d".to_string();

        let err = f
            .composer
            .render(&forecast, &loader(&f.icons), "16.01.2026")
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Asset(AssetLoadError::Read { .. })));
        assert!(output_files(&f.output).is_empty());
    }

    #[tokio::test]
    async fn test_render_fails_on_missing_night_icon() {
        let f = fixture();
        let mut forecast = result();
        forecast.night.icon_code = "50n".to_string();

        let err = f
            .composer
            .render(&forecast, &loader(&f.icons), "16.01.2026")
            .await
            .unwrap_err();

        match err {
            RenderError::Asset(AssetLoadError::Read { path, .. }) => {
                assert!(path.contains("50n.png"));
            }
            other => panic!("expected read error, got {other:?}"),
        }
        assert!(output_files(&f.output).is_empty());
    }

    #[tokio::test]
    async fn test_dropped_render_removes_file() {
        let f = fixture();
        let rendered = f
            .composer
            .render(&result(), &loader(&f.icons), "16.01.2026")
            .await
            .unwrap();
        let path = rendered.path().to_path_buf();
        assert!(path.exists());

        drop(rendered);
        assert!(!path.exists());
        assert!(output_files(&f.output).is_empty());
    }

    #[tokio::test]
    async fn test_render_fails_on_corrupt_character() {
        let f = fixture();
        let characters = f.root.path().join("characters");
        std::fs::write(characters.join("character_1.png"), b"garbage").unwrap();

        let err = f
            .composer
            .render(&result(), &loader(&f.icons), "16.01.2026")
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Asset(AssetLoadError::Decode { .. })));
        assert!(output_files(&f.output).is_empty());
    }

    #[test]
    fn test_load_typeface_reports_path() {
        let err = load_typeface(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/font.ttf"));
    }
}
