//! On-screen offset tracking between the target and output regions.

use crate::{
    host::{BlurRegion, BlurTarget},
    px::PxPosition,
};

/// Records where the target and output regions currently sit on screen.
///
/// The offset is how far the output region's origin has drifted from the
/// target region's origin in the containing coordinate space (independent
/// scrolling, animations, transforms). It must be re-read every frame;
/// nothing about it is stable across frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateTracker {
    target_location: PxPosition,
    region_location: PxPosition,
}

impl CoordinateTracker {
    /// Re-reads both on-screen locations. Best-effort against whatever the
    /// host reports at call time.
    pub fn refresh(&mut self, target: &dyn BlurTarget, region: &dyn BlurRegion) {
        self.target_location = target.location_on_screen();
        self.region_location = region.location_on_screen();
    }

    /// `region - target`, component-wise, as of the last refresh.
    pub fn offset(&self) -> PxPosition {
        self.region_location - self.target_location
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        host::PreDrawRegistry,
        px::Px,
        testing::{TestRegion, TestTarget},
    };

    #[test]
    fn test_offset_is_region_minus_target() {
        let registry = Arc::new(PreDrawRegistry::new());
        let target = TestTarget::new([100, 100], [10, 4], registry.clone());
        let region = TestRegion::new([20, 20], [30, 44], registry);
        let mut tracker = CoordinateTracker::default();
        tracker.refresh(&target, &region);
        assert_eq!(tracker.offset(), PxPosition::new(Px(20), Px(40)));

        // Scrolling moved the target; the next refresh picks it up.
        target.set_location([0, 0]);
        tracker.refresh(&target, &region);
        assert_eq!(tracker.offset(), PxPosition::new(Px(30), Px(44)));
    }
}
