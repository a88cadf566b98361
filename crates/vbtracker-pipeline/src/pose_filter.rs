use nalgebra::Translation3;
use vbtracker_core::{Iso3, OneEuroFilter, OneEuroParams, Real, UnitQuat, Vec3};

/// Independent one-euro smoothing of position and orientation.
///
/// The two tracks are not coupled: the filtered translation is never
/// re-expressed in the filtered orientation's frame.
#[derive(Debug, Clone, Default)]
pub struct PoseFilter {
    position: OneEuroFilter<Vec3>,
    orientation: OneEuroFilter<UnitQuat>,
}

impl PoseFilter {
    pub fn new(position_params: OneEuroParams, orientation_params: OneEuroParams) -> Self {
        Self {
            position: OneEuroFilter::new(position_params),
            orientation: OneEuroFilter::new(orientation_params),
        }
    }

    /// Feed one pose sample. Non-positive `dt` is treated as `1`.
    pub fn filter(&mut self, dt: Real, position: &Vec3, orientation: &UnitQuat) {
        let dt = if dt <= 0.0 { 1.0 } else { dt };
        self.position.filter(dt, position);
        self.orientation.filter(dt, orientation);
    }

    pub fn position(&self) -> &Vec3 {
        self.position.state()
    }

    pub fn orientation(&self) -> &UnitQuat {
        self.orientation.state()
    }

    pub fn isometry(&self) -> Iso3 {
        Iso3::from_parts(Translation3::from(*self.position()), *self.orientation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primed() -> PoseFilter {
        let mut f = PoseFilter::default();
        f.filter(1.0, &Vec3::new(0.0, 0.0, 1.0), &UnitQuat::identity());
        f
    }

    #[test]
    fn non_positive_dt_behaves_like_one_second() {
        let p = Vec3::new(0.2, -0.1, 1.3);
        let q = UnitQuat::from_euler_angles(0.0, 0.3, 0.1);

        let mut reference = primed();
        reference.filter(1.0, &p, &q);
        for dt in [0.0, -5.0] {
            let mut f = primed();
            f.filter(dt, &p, &q);
            assert_eq!(f.position(), reference.position(), "dt {dt}");
            assert_eq!(f.orientation(), reference.orientation(), "dt {dt}");
        }
    }

    #[test]
    fn isometry_composes_translation_and_rotation() {
        let mut f = PoseFilter::default();
        let p = Vec3::new(1.0, 2.0, 3.0);
        let q = UnitQuat::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        f.filter(0.1, &p, &q);
        let iso = f.isometry();
        assert_eq!(iso.translation.vector, p);
        // Rotate first, then translate.
        let moved = iso.transform_point(&nalgebra::Point3::new(1.0, 0.0, 0.0));
        assert!((moved.coords - Vec3::new(1.0, 3.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn shorter_steps_smooth_harder() {
        let target = Vec3::new(0.0, 0.0, 2.0);
        let mut fast = primed();
        let mut slow = primed();
        fast.filter(0.001, &target, &UnitQuat::identity());
        slow.filter(0.5, &target, &UnitQuat::identity());
        assert!(fast.position().z < slow.position().z);
    }
}
