// Debug drawing on color frames: blob circles, reference marker and "x y" labels.
// Rasterising is `imageproc::drawing`, which clips at the frame edge. Labels use a
// built-in 3x5 digit font so the crate ships no font file.

use crate::core_modules::blob_extractor::Blob;
use crate::core_modules::frame::ColorFrame;
use crate::core_modules::geometry::Point2;
use image::Rgb;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const REFERENCE_COLOR: Rgb<u8> = Rgb([255, 64, 64]);

/// Glyph rows for a 3×5 pixel font, MSB = leftmost column.
fn glyph(c: char) -> Option<[u8; 5]> {
    Some(match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        ' ' => [0; 5],
        _ => return None,
    })
}

/// Whether a ring between `inner` and `outer` around `center` touches the frame at all.
fn ring_meets_frame(frame: &ColorFrame, center: Point2, inner: f64, outer: f64) -> bool {
    let (w, h) = (frame.width() as f64, frame.height() as f64);
    let nearest = (center.x.clamp(0.0, w) - center.x).hypot(center.y.clamp(0.0, h) - center.y);
    let farthest = (center.x.max(w - center.x)).hypot(center.y.max(h - center.y));
    outer >= nearest && inner <= farthest
}

/// Draws a circle outline `thickness` pixels wide, centered on the true radius.
/// Rings that miss the frame entirely cost nothing, whatever their radius.
pub fn draw_circle(frame: &mut ColorFrame, center: Point2, radius: f64, thickness: u32, color: Rgb<u8>) {
    let thickness = thickness.max(1);
    let first = radius.round() - (thickness / 2) as f64;
    let last = first + (thickness - 1) as f64;
    if !radius.is_finite() || !ring_meets_frame(frame, center, first.max(0.0), last) {
        return;
    }
    let at = (center.x.round() as i32, center.y.round() as i32);
    for r in first.max(0.0) as i32..=last as i32 {
        draw_hollow_circle_mut(frame, at, r, color);
    }
}

/// Renders digits, '-' and spaces with the top-left corner at `origin`.
/// Unsupported characters are skipped.
pub fn draw_text(frame: &mut ColorFrame, origin: (i32, i32), text: &str, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1);
    let step = scale as i32;
    let mut pen_x = origin.0;
    for c in text.chars() {
        let Some(rows) = glyph(c) else { continue };
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..3 {
                if bits & (0b100 >> col) != 0 {
                    let cell = Rect::at(pen_x + col * step, origin.1 + row as i32 * step)
                        .of_size(scale, scale);
                    draw_filled_rect_mut(frame, cell, color);
                }
            }
        }
        pen_x += 4 * step;
    }
}

/// Small plus sign marking a point.
pub fn draw_cross(frame: &mut ColorFrame, at: Point2, arm: f32, color: Rgb<u8>) {
    let (x, y) = (at.x.round() as f32, at.y.round() as f32);
    draw_line_segment_mut(frame, (x - arm, y), (x + arm, y), color);
    draw_line_segment_mut(frame, (x, y - arm), (x, y + arm), color);
}

/// Circle plus integer "x y" label at the blob's center.
pub fn annotate_blob(frame: &mut ColorFrame, blob: &Blob, thickness: u32) {
    draw_circle(frame, blob.center, blob.radius, thickness, WHITE);
    let label = format!("{} {}", blob.center.x as i32, blob.center.y as i32);
    draw_text(
        frame,
        (blob.center.x as i32, blob.center.y as i32),
        &label,
        2,
        WHITE,
    );
}

/// Reference point and the radius inside which a blob counts as the end effector.
pub fn annotate_reference(frame: &mut ColorFrame, reference: Point2, role_radius: f64) {
    draw_cross(frame, reference, 5.0, REFERENCE_COLOR);
    draw_circle(frame, reference, role_radius, 1, REFERENCE_COLOR);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(frame: &ColorFrame) -> usize {
        frame.pixels().filter(|p| p.0 != [0, 0, 0]).count()
    }

    #[test]
    fn circle_is_drawn_on_its_radius_only() {
        let mut frame = ColorFrame::new(60, 60);
        draw_circle(&mut frame, Point2::new(30.0, 30.0), 20.0, 2, WHITE);
        assert_eq!(frame.get_pixel(50, 30).0, [255; 3]);
        assert_eq!(frame.get_pixel(30, 10).0, [255; 3]);
        assert_eq!(frame.get_pixel(30, 30).0, [0; 3]);
        assert_eq!(frame.get_pixel(55, 30).0, [0; 3]);
    }

    #[test]
    fn drawing_off_the_edge_clips() {
        let mut frame = ColorFrame::new(10, 10);
        draw_text(&mut frame, (8, 8), "123", 3, WHITE);
        draw_cross(&mut frame, Point2::new(-50.0, -50.0), 5.0, WHITE);
        draw_circle(&mut frame, Point2::new(0.0, 0.0), 30.0, 2, WHITE);
        assert_eq!(lit(&frame), 0);

        draw_circle(&mut frame, Point2::new(0.0, 0.0), 5.0, 2, WHITE);
        assert_eq!(frame.get_pixel(5, 0).0, [255; 3]);
        assert_eq!(frame.get_pixel(0, 0).0, [0; 3]);
    }

    #[test]
    fn labels_render_digits_and_skip_unknown_characters() {
        let mut digits = ColorFrame::new(40, 10);
        draw_text(&mut digits, (0, 0), "18", 1, WHITE);
        let mut with_junk = ColorFrame::new(40, 10);
        draw_text(&mut with_junk, (0, 0), "1x8", 1, WHITE);
        assert_eq!(digits, with_junk);
        assert_eq!(lit(&digits), 8 + 13);
    }

    #[test]
    fn cross_marks_its_center_and_arms() {
        let mut frame = ColorFrame::new(20, 20);
        draw_cross(&mut frame, Point2::new(10.0, 10.0), 3.0, WHITE);
        for at in [(10, 10), (7, 10), (13, 10), (10, 7), (10, 13)] {
            assert_eq!(frame.get_pixel(at.0, at.1).0, [255; 3]);
        }
        assert_eq!(lit(&frame), 13);
    }

    #[test]
    fn rings_far_larger_than_the_frame_draw_nothing_and_return() {
        let mut frame = ColorFrame::new(640, 480);
        let started = std::time::Instant::now();
        annotate_reference(&mut frame, Point2::new(290.0, 180.0), 1e7);
        draw_circle(&mut frame, Point2::new(0.0, 0.0), f64::INFINITY, 1, WHITE);
        draw_circle(&mut frame, Point2::new(0.0, 0.0), f64::NAN, 1, WHITE);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        // Only the reference cross is left on the canvas.
        assert_eq!(lit(&frame), 21);
    }
}
