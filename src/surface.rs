use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::core::Rgba8Premul;

/// Shared handle to the drawable container. Exactly one backend draws into a
/// surface at any time; the manager enforces the ownership hand-off.
pub type SurfaceHandle = Rc<RefCell<PixelSurface>>;

pub fn surface_handle(width: u32, height: u32) -> SurfaceHandle {
    Rc::new(RefCell::new(PixelSurface::new(width, height)))
}

/// An owned premultiplied RGBA8 pixel buffer with the few primitives the
/// backends need: clear, dots, soft circles and thin lines.
#[derive(Clone, Debug)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// True when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Reallocates the buffer for the new dimensions. Contents are dropped;
    /// backends redraw on the next update.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data = vec![0; (width as usize) * (height as usize) * 4];
    }

    /// Blends a single pixel source-over. Out-of-bounds coordinates are ignored.
    pub fn plot(&mut self, x: i64, y: i64, color: Rgba8Premul, opacity: f32) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let dst = [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ];
        let out = over(dst, color.to_array(), opacity);
        self.data[idx..idx + 4].copy_from_slice(&out);
    }

    /// Fills a circle with a one-pixel antialiased rim.
    pub fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba8Premul, opacity: f32) {
        if radius <= 0.0 || opacity <= 0.0 {
            return;
        }
        let x0 = (cx - radius - 1.0).floor() as i64;
        let x1 = (cx + radius + 1.0).ceil() as i64;
        let y0 = (cy - radius - 1.0).floor() as i64;
        let y1 = (cy + radius + 1.0).ceil() as i64;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = (x as f64 + 0.5) - cx;
                let dy = (y as f64 + 0.5) - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                let coverage = (radius - dist + 0.5).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.plot(x, y, color, opacity * coverage as f32);
                }
            }
        }
    }

    /// Draws a one-pixel line by uniform sampling along the segment.
    pub fn draw_line(
        &mut self,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        color: Rgba8Premul,
        opacity: f32,
    ) {
        if opacity <= 0.0 {
            return;
        }
        let dx = x1 - x0;
        let dy = y1 - y0;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = (x0 + dx * t).round() as i64;
            let y = (y0 + dy * t).round() as i64;
            self.plot(x, y, color, opacity);
        }
    }
}

/// Source-over for premultiplied RGBA8, scaled by an extra opacity.
fn over(dst: [u8; 4], src: [u8; 4], opacity: f32) -> [u8; 4] {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);
    let mut out = [0u8; 4];
    out[3] = mul_div255(u16::from(dst[3]), inv).saturating_add(sa);
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Rgba8Premul {
        Rgba8Premul::from_straight_rgba(255, 0, 0, 255)
    }

    #[test]
    fn new_surface_is_blank() {
        let s = PixelSurface::new(8, 4);
        assert!(s.is_blank());
        assert_eq!(s.data().len(), 8 * 4 * 4);
    }

    #[test]
    fn plot_ignores_out_of_bounds() {
        let mut s = PixelSurface::new(4, 4);
        s.plot(-1, 0, red(), 1.0);
        s.plot(0, 99, red(), 1.0);
        assert!(s.is_blank());
    }

    #[test]
    fn plot_opaque_replaces_pixel() {
        let mut s = PixelSurface::new(4, 4);
        s.plot(1, 2, red(), 1.0);
        let idx = (2 * 4 + 1) * 4;
        assert_eq!(&s.data()[idx..idx + 4], &[255, 0, 0, 255]);
    }

    #[test]
    fn clear_and_resize_drop_contents() {
        let mut s = PixelSurface::new(4, 4);
        s.fill_circle(2.0, 2.0, 1.5, red(), 1.0);
        assert!(!s.is_blank());
        s.clear();
        assert!(s.is_blank());

        s.fill_circle(2.0, 2.0, 1.5, red(), 1.0);
        s.resize(6, 3);
        assert_eq!((s.width(), s.height()), (6, 3));
        assert!(s.is_blank());
    }

    #[test]
    fn line_touches_both_endpoints() {
        let mut s = PixelSurface::new(8, 8);
        s.draw_line(0.0, 0.0, 7.0, 7.0, red(), 1.0);
        assert_eq!(s.data()[3], 255);
        let last = ((7 * 8 + 7) * 4) as usize;
        assert_eq!(s.data()[last + 3], 255);
    }
}
