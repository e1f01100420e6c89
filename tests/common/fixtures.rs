use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

pub const BACKGROUND: Rgba<u8> = Rgba([200, 200, 200, 255]);
pub const PANEL: Rgba<u8> = Rgba([20, 20, 20, 255]);
pub const LABEL_GREY: Rgba<u8> = Rgba([90, 90, 90, 255]);
pub const RED_ICON: Rgba<u8> = Rgba([200, 30, 30, 255]);
pub const BLUE_ICON: Rgba<u8> = Rgba([30, 30, 200, 255]);

/// Class table matching `FakeClassifier`: red icons are 0, blue icons are 1
pub fn class_labels() -> Vec<String> {
    vec!["Bmat".to_string(), "Rifle-crated".to_string()]
}

pub fn blank_screenshot(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, BACKGROUND)
}

/// `(x, y, width, height)`
pub type Area = (u32, u32, u32, u32);

/// 1px dark frame covering exactly `area`
pub fn draw_frame(image: &mut RgbaImage, area: Area) {
    let (x, y, width, height) = area;
    draw_hollow_rect_mut(image, Rect::at(x as i32, y as i32).of_size(width, height), PANEL);
}

/// An item drawn inside a panel, in panel coordinates
pub struct DrawnItem {
    pub label: Area,
    pub icon: Area,
    pub icon_color: Rgba<u8>,
}

/// Filled dark panel holding `items`
pub fn stockpile_screenshot(
    width: u32,
    height: u32,
    panel: Area,
    items: &[DrawnItem],
) -> DynamicImage {
    let mut image = blank_screenshot(width, height);
    let (px, py, pw, ph) = panel;
    draw_filled_rect_mut(&mut image, Rect::at(px as i32, py as i32).of_size(pw, ph), PANEL);

    for item in items {
        let (lx, ly, lw, lh) = item.label;
        draw_filled_rect_mut(
            &mut image,
            Rect::at((px + lx) as i32, (py + ly) as i32).of_size(lw, lh),
            LABEL_GREY,
        );
        let (ix, iy, iw, ih) = item.icon;
        draw_filled_rect_mut(
            &mut image,
            Rect::at((px + ix) as i32, (py + iy) as i32).of_size(iw, ih),
            item.icon_color,
        );
    }

    DynamicImage::ImageRgba8(image)
}

/// Panel at (100, 80) 240x180 with one item on each of two rows.
/// Labels are 50 and 60 pixels wide, so their upscaled crops are 250 and 300 wide.
pub fn two_row_stockpile() -> DynamicImage {
    stockpile_screenshot(
        440,
        320,
        (100, 80, 240, 180),
        &[
            DrawnItem {
                label: (100, 40, 50, 40),
                icon: (30, 40, 40, 40),
                icon_color: RED_ICON,
            },
            DrawnItem {
                label: (100, 110, 60, 40),
                icon: (30, 110, 40, 40),
                icon_color: BLUE_ICON,
            },
        ],
    )
}

/// Panel at (120, 90) 360x200 with two items on each of two rows
pub fn four_item_stockpile() -> DynamicImage {
    stockpile_screenshot(
        600,
        320,
        (120, 90, 360, 200),
        &[
            DrawnItem {
                label: (100, 40, 50, 40),
                icon: (30, 40, 40, 40),
                icon_color: RED_ICON,
            },
            DrawnItem {
                label: (220, 40, 50, 40),
                icon: (165, 40, 40, 40),
                icon_color: BLUE_ICON,
            },
            DrawnItem {
                label: (100, 120, 50, 40),
                icon: (30, 120, 40, 40),
                icon_color: BLUE_ICON,
            },
            DrawnItem {
                label: (220, 120, 50, 40),
                icon: (165, 120, 40, 40),
                icon_color: RED_ICON,
            },
        ],
    )
}
