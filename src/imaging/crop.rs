//! Crop state manager.
//!
//! Holds exactly one crop region over the displayed image. The region is
//! stored in percent, so it survives the editor being laid out at a
//! different size; every mutation goes through display pixels, where the
//! ratio and bounds rules of [`geometry`](super::geometry) apply.
//!
//! Input handling (drag handles, live redraw) belongs to the caller, which
//! drives the manager through [`CropManager::set_aspect_ratio`],
//! [`CropManager::update_region`] and [`CropManager::commit`].

use super::backend::Dimensions;
use super::geometry::{
    AspectRatio, CommittedCrop, CropRect, CropUnit, RegionUpdate, apply_update,
    centered_aspect_rect,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CropManager {
    display: Dimensions,
    aspect: AspectRatio,
    region: CropRect,
}

impl CropManager {
    /// Start with the full image selected and no ratio constraint.
    pub fn new(display: Dimensions) -> Self {
        Self {
            display,
            aspect: AspectRatio::Free,
            region: CropRect::full(CropUnit::Percent, display),
        }
    }

    pub fn display(&self) -> Dimensions {
        self.display
    }

    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    /// Current region in percent of the displayed image.
    pub fn region(&self) -> CropRect {
        self.region
    }

    /// Current region in display pixels.
    pub fn region_pixels(&self) -> CropRect {
        self.region.to_pixels(self.display)
    }

    /// Switch the ratio constraint and recreate the region.
    ///
    /// A fixed ratio gives the largest centred rectangle of that ratio;
    /// `Free` resets to the full image.
    pub fn set_aspect_ratio(&mut self, aspect: AspectRatio) {
        self.aspect = aspect;
        self.region = match aspect.value() {
            Some(ratio) => centered_aspect_rect(self.display, ratio).to_percent(self.display),
            None => CropRect::full(CropUnit::Percent, self.display),
        };
    }

    /// Apply a drag/resize step, keeping the region in bounds and on ratio.
    pub fn update_region(&mut self, update: RegionUpdate) -> CropRect {
        let next = apply_update(self.region, update, self.display, self.aspect);
        self.region = next.to_percent(self.display);
        next
    }

    /// Snapshot the region in display pixels.
    pub fn commit(&self) -> CommittedCrop {
        CommittedCrop::from_rect(self.region, self.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::geometry::RATIO_TOLERANCE;

    fn manager(w: u32, h: u32) -> CropManager {
        CropManager::new(Dimensions::new(w, h))
    }

    #[test]
    fn starts_at_full_image() {
        let m = manager(640, 480);
        assert_eq!(m.region(), CropRect::full(CropUnit::Percent, m.display()));
        let crop = m.commit();
        assert_eq!((crop.x, crop.y, crop.width, crop.height), (0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn aspect_ratio_holds_in_pixels() {
        for ratio in [AspectRatio::SQUARE, AspectRatio::LANDSCAPE, AspectRatio::PORTRAIT] {
            let mut m = manager(1200, 800);
            m.set_aspect_ratio(ratio);
            let px = m.region_pixels();
            let r = ratio.value().unwrap();
            assert!((px.ratio() - r).abs() < RATIO_TOLERANCE, "{ratio}: {}", px.ratio());
            assert!(px.x >= 0.0 && px.y >= 0.0);
            assert!(px.x + px.width <= 1200.0 + 1e-9);
            assert!(px.y + px.height <= 800.0 + 1e-9);
        }
    }

    #[test]
    fn free_square_free_round_trips_to_full_bounds() {
        let mut m = manager(1024, 683);
        let untouched = m.region();

        m.set_aspect_ratio(AspectRatio::Free);
        m.set_aspect_ratio(AspectRatio::SQUARE);
        assert_ne!(m.region(), untouched);
        m.set_aspect_ratio(AspectRatio::Free);

        assert_eq!(m.region(), untouched);
    }

    #[test]
    fn update_with_ratio_adjusts_non_driving_dimension() {
        let mut m = manager(1000, 1000);
        m.set_aspect_ratio(AspectRatio::LANDSCAPE);

        let px = m.update_region(RegionUpdate::pixels().with_width(320.0).with_position(10.0, 10.0));
        assert_eq!(px.width, 320.0);
        assert!((px.height - 180.0).abs() < 1e-9);
        assert_eq!((px.x, px.y), (10.0, 10.0));
    }

    #[test]
    fn region_is_stored_in_percent() {
        let mut m = manager(400, 200);
        m.update_region(
            RegionUpdate::pixels()
                .with_position(100.0, 50.0)
                .with_width(200.0)
                .with_height(100.0),
        );
        let r = m.region();
        assert_eq!(r.unit, CropUnit::Percent);
        assert_eq!((r.x, r.y, r.width, r.height), (25.0, 25.0, 50.0, 50.0));
    }

    #[test]
    fn drag_past_edge_is_clamped() {
        let mut m = manager(400, 200);
        m.update_region(RegionUpdate::pixels().with_width(100.0).with_height(100.0));
        let px = m.update_region(RegionUpdate::pixels().with_position(1000.0, 1000.0));
        assert_eq!((px.x, px.y), (300.0, 100.0));
    }

    #[test]
    fn commit_converts_to_display_pixels() {
        let mut m = manager(500, 250);
        m.update_region(
            RegionUpdate::percent()
                .with_position(20.0, 20.0)
                .with_width(20.0)
                .with_height(20.0),
        );
        let crop = m.commit();
        assert_eq!((crop.x, crop.y, crop.width, crop.height), (100.0, 50.0, 100.0, 50.0));
    }
}
