use image::Rgba;

pub const CANVAS_WIDTH: u32 = 609;
pub const CANVAS_HEIGHT: u32 = 340;

pub const BACKGROUND: Rgba<u8> = Rgba([0x2b, 0x5f, 0x8a, 0xff]);
pub const WHITE: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);
pub const BLACK: Rgba<u8> = Rgba([0x00, 0x00, 0x00, 0xff]);

pub const TITLE_SIZE: f32 = 22.0;
pub const TITLE_BASELINE: f32 = 35.0;

pub const SEPARATOR_TOP: u32 = 70;
pub const SEPARATOR_BOTTOM: u32 = 220;
pub const SEPARATOR_WIDTH: u32 = 2;
/// White at 30%
pub const SEPARATOR_COLOR: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 77]);

pub const LABEL_SIZE: f32 = 22.0;
pub const LABEL_BASELINE: f32 = 75.0;
/// White at 80%
pub const LABEL_COLOR: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 204]);

/// Icon and temperature share this line
pub const BLOCK_BASELINE: f32 = 135.0;
pub const ICON_SIZE: u32 = 180;
const ICON_LEFT_OF_CENTER: f32 = 150.0;

pub const TEMPERATURE_SIZE: f32 = 75.0;
const TEMPERATURE_GAP: f32 = 5.0;
const TEMPERATURE_DROP: f32 = 25.0;

pub const DESCRIPTION_SIZE: f32 = 24.0;
pub const DESCRIPTION_BASELINE: f32 = 216.0;

/// Blocks are pushed this far away from the centerline
const BLOCK_SPREAD: f32 = 40.0;

pub const CHARACTER_HEIGHT_RATIO: f32 = 0.7;
/// The character's feet hang below the bottom edge
const CHARACTER_OVERHANG: f32 = 15.0;

pub const CAPTION_SIZE: f32 = 66.0;
pub const CAPTION_STROKE_WIDTH: f32 = 12.0;
const CAPTION_BOTTOM_MARGIN: f32 = 15.0;

/// Text position on the alphabetic baseline, as a 2D canvas `fillText` uses
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

/// Top-left corner and size of a bitmap. May lie partly off the canvas; drawing clips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Night,
    Day,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Night => "НІЧ",
            Side::Day => "ДЕНЬ",
        }
    }

    pub fn center_x(self) -> f32 {
        let width = CANVAS_WIDTH as f32;
        match self {
            Side::Night => width * 0.25 - BLOCK_SPREAD,
            Side::Day => width * 0.75 + BLOCK_SPREAD,
        }
    }
}

/// Where each element of one weather block goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockLayout {
    pub label: Anchor,
    pub icon: Placement,
    /// Left-aligned
    pub temperature: Anchor,
    pub description: Anchor,
}

impl BlockLayout {
    pub fn for_side(side: Side) -> Self {
        let center = side.center_x();
        let icon_top = BLOCK_BASELINE - ICON_SIZE as f32 / 2.0;

        Self {
            label: Anchor {
                x: center,
                y: LABEL_BASELINE,
            },
            icon: Placement {
                x: (center - ICON_LEFT_OF_CENTER).round() as i64,
                y: icon_top.round() as i64,
                width: ICON_SIZE,
                height: ICON_SIZE,
            },
            temperature: Anchor {
                x: center + TEMPERATURE_GAP,
                y: BLOCK_BASELINE + TEMPERATURE_DROP,
            },
            description: Anchor {
                x: center,
                y: DESCRIPTION_BASELINE,
            },
        }
    }
}

pub fn title_anchor() -> Anchor {
    Anchor {
        x: CANVAS_WIDTH as f32 / 2.0,
        y: TITLE_BASELINE,
    }
}

pub fn caption_anchor() -> Anchor {
    Anchor {
        x: CANVAS_WIDTH as f32 / 2.0,
        y: CANVAS_HEIGHT as f32 - CAPTION_BOTTOM_MARGIN,
    }
}

/// Left edge of the separator; it is centered on the canvas midline
pub fn separator_x() -> i32 {
    ((CANVAS_WIDTH - SEPARATOR_WIDTH) as f32 / 2.0).round() as i32
}

/// Scale the character so its height fills the configured share of the canvas.
pub fn character_placement(image_width: u32, image_height: u32) -> Placement {
    let target_height = CANVAS_HEIGHT as f32 * CHARACTER_HEIGHT_RATIO;
    let scale = target_height / image_height.max(1) as f32;
    let width = (image_width as f32 * scale).round().max(1.0);
    let height = target_height.round();

    Placement {
        x: (CANVAS_WIDTH as f32 / 2.0 - width / 2.0).round() as i64,
        y: (CANVAS_HEIGHT as f32 - height + CHARACTER_OVERHANG).round() as i64,
        width: width as u32,
        height: height as u32,
    }
}
