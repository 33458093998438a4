//! Per-project label colors.
//!
//! A project's color depends only on its id, so it stays the same across
//! runs and machines.

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Derives a stable color from a project id.
pub fn project_color(key: &str) -> Rgb {
    // FNV-1a
    let hash = key.bytes().fold(0x811c_9dc5_u32, |acc, b| {
        (acc ^ u32::from(b)).wrapping_mul(0x0100_0193)
    });
    hsl_to_rgb(hash % 360, 65, 55)
}

/// Wraps `label` in a 24-bit ANSI foreground color when `enabled`.
pub fn paint(label: &str, color_key: &str, enabled: bool) -> String {
    if !enabled {
        return label.to_string();
    }
    let Rgb(r, g, b) = project_color(color_key);
    format!("\x1b[38;2;{r};{g};{b}m{label}\x1b[0m")
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "channel values are clamped to 0..=255 before the cast"
)]
fn hsl_to_rgb(hue: u32, saturation: u8, lightness: u8) -> Rgb {
    let s = f64::from(saturation) / 100.0;
    let l = f64::from(lightness) / 100.0;
    let h = f64::from(hue) / 60.0;

    let chroma = (1.0 - 2.0f64.mul_add(l, -1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match hue / 60 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = l - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb(channel(r), channel(g), channel(b))
}
