use nalgebra::{DMatrix, Matrix3x4, Rotation3, Translation3};
use thiserror::Error;
use vbtracker_core::{ransac, Estimator, Iso3, Pt3, RansacOptions, Real, UnitQuat, Vec2};

/// Errors that can occur during PnP estimation.
#[derive(Debug, Error)]
pub enum PnpError {
    #[error("need at least 6 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("got {world} model points but {image} image points")]
    MismatchedInput { world: usize, image: usize },
    #[error("eigen decomposition failed in PnP DLT")]
    DecompositionFailed,
    #[error("ransac found no consensus pose ({inliers} inliers at best)")]
    RansacFailed { inliers: usize },
}

const MIN_POINTS: usize = 6;

/// Linear PnP on undistorted normalized image coordinates.
///
/// Solves for `T_C_M` (model to camera). The model points must not be
/// coplanar: the 12-parameter DLT is degenerate on planar constellations.
#[derive(Debug, Clone, Copy)]
pub struct PnpSolver;

impl PnpSolver {
    pub fn dlt(model: &[Pt3], normalized: &[Vec2]) -> Result<Iso3, PnpError> {
        let n = model.len();
        if normalized.len() != n {
            return Err(PnpError::MismatchedInput {
                world: n,
                image: normalized.len(),
            });
        }
        if n < MIN_POINTS {
            return Err(PnpError::NotEnoughPoints(n));
        }

        let mut a = DMatrix::<Real>::zeros(2 * n, 12);
        for (i, (p, uv)) in model.iter().zip(normalized).enumerate() {
            let (r0, r1) = (2 * i, 2 * i + 1);
            for (c, v) in [p.x, p.y, p.z, 1.0].into_iter().enumerate() {
                a[(r0, c)] = v;
                a[(r0, 8 + c)] = -uv.x * v;
                a[(r1, 4 + c)] = v;
                a[(r1, 8 + c)] = -uv.y * v;
            }
        }

        // Null vector of A from the smallest eigenvalue of A^T A.
        let eig = (a.transpose() * &a).symmetric_eigen();
        let min_idx = eig
            .eigenvalues
            .iter()
            .enumerate()
            .min_by(|(_, x), (_, y)| x.total_cmp(y))
            .map(|(idx, _)| idx)
            .ok_or(PnpError::DecompositionFailed)?;
        let p = eig.eigenvectors.column(min_idx);

        let mut p_mtx = Matrix3x4::<Real>::from_fn(|r, c| p[4 * r + c]);
        // Fix the overall sign so the rotation block is proper.
        if p_mtx.fixed_view::<3, 3>(0, 0).into_owned().determinant() < 0.0 {
            p_mtx = -p_mtx;
        }

        let m = p_mtx.fixed_view::<3, 3>(0, 0).into_owned();
        let scale = (m.row(0).norm() + m.row(1).norm() + m.row(2).norm()) / 3.0;
        if scale <= Real::EPSILON {
            return Err(PnpError::DecompositionFailed);
        }

        let svd = (m / scale).svd(true, true);
        let u = svd.u.ok_or(PnpError::DecompositionFailed)?;
        let v_t = svd.v_t.ok_or(PnpError::DecompositionFailed)?;
        let mut r = u * v_t;
        if r.determinant() < 0.0 {
            let mut u_flipped = u;
            u_flipped.column_mut(2).neg_mut();
            r = u_flipped * v_t;
        }

        let t = p_mtx.column(3).into_owned() / scale;
        let rot = UnitQuat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
        Ok(Iso3::from_parts(Translation3::from(t), rot))
    }

    /// DLT inside RANSAC. `focal` converts normalized residuals to pixels so
    /// `opts.thresh` is in pixels.
    pub fn dlt_ransac(
        model: &[Pt3],
        normalized: &[Vec2],
        focal: Real,
        opts: &RansacOptions,
    ) -> Result<(Iso3, Vec<usize>), PnpError> {
        if normalized.len() != model.len() {
            return Err(PnpError::MismatchedInput {
                world: model.len(),
                image: normalized.len(),
            });
        }
        if model.len() < MIN_POINTS {
            return Err(PnpError::NotEnoughPoints(model.len()));
        }

        let data: Vec<(Pt3, Vec2)> = model.iter().copied().zip(normalized.iter().copied()).collect();
        let res = ransac(&PnpEstimator { focal }, &data, opts);
        match res.model {
            Some(pose) => Ok((pose, res.inliers)),
            None => Err(PnpError::RansacFailed {
                inliers: res.inliers.len(),
            }),
        }
    }
}

struct PnpEstimator {
    focal: Real,
}

impl PnpEstimator {
    fn split(data: &[(Pt3, Vec2)], indices: &[usize]) -> (Vec<Pt3>, Vec<Vec2>) {
        indices.iter().map(|&i| data[i]).unzip()
    }
}

impl Estimator for PnpEstimator {
    type Datum = (Pt3, Vec2);
    type Model = Iso3;

    const MIN_SAMPLES: usize = MIN_POINTS;

    fn fit(&self, data: &[Self::Datum], sample: &[usize]) -> Option<Iso3> {
        let (model, image) = Self::split(data, sample);
        PnpSolver::dlt(&model, &image).ok()
    }

    fn residual(&self, pose: &Iso3, datum: &Self::Datum) -> f64 {
        let pc = pose.transform_point(&datum.0);
        if pc.z <= 0.0 {
            return f64::INFINITY;
        }
        let proj = Vec2::new(pc.x / pc.z, pc.y / pc.z);
        (proj - datum.1).norm() * self.focal
    }

    fn refit(&self, data: &[Self::Datum], inliers: &[usize]) -> Option<Iso3> {
        let (model, image) = Self::split(data, inliers);
        PnpSolver::dlt(&model, &image).ok()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Non-coplanar constellation roughly the size of a headset.
    pub(crate) fn constellation() -> Vec<Pt3> {
        let mut pts = Vec::new();
        for z in 0..2 {
            for y in 0..3 {
                for x in 0..3 {
                    pts.push(Pt3::new(
                        (x as Real - 1.0) * 0.06,
                        (y as Real - 1.0) * 0.04,
                        z as Real * 0.05 + (x * y) as Real * 0.005,
                    ));
                }
            }
        }
        pts
    }

    pub(crate) fn project(pose: &Iso3, pts: &[Pt3]) -> Vec<Vec2> {
        pts.iter()
            .map(|p| {
                let pc = pose.transform_point(p);
                Vec2::new(pc.x / pc.z, pc.y / pc.z)
            })
            .collect()
    }

    pub(crate) fn ground_truth() -> Iso3 {
        Iso3::from_parts(
            Translation3::new(0.05, -0.02, 0.6),
            UnitQuat::from_euler_angles(0.1, -0.15, 0.2),
        )
    }

    #[test]
    fn dlt_recovers_pose() {
        let gt = ground_truth();
        let pts = constellation();
        let est = PnpSolver::dlt(&pts, &project(&gt, &pts)).unwrap();
        assert!((est.translation.vector - gt.translation.vector).norm() < 1e-6);
        assert!(est.rotation.angle_to(&gt.rotation) < 1e-6);
    }

    #[test]
    fn dlt_rejects_short_input() {
        let pts = constellation();
        let img = project(&ground_truth(), &pts);
        assert!(matches!(
            PnpSolver::dlt(&pts[..5], &img[..5]),
            Err(PnpError::NotEnoughPoints(5))
        ));
        assert!(matches!(
            PnpSolver::dlt(&pts, &img[..7]),
            Err(PnpError::MismatchedInput { .. })
        ));
    }

    #[test]
    fn ransac_ignores_swapped_blobs() {
        let gt = ground_truth();
        let pts = constellation();
        let mut img = project(&gt, &pts);
        img.swap(0, 17);
        img[5] += Vec2::new(0.2, -0.1);

        let opts = RansacOptions {
            max_iters: 300,
            thresh: 1.0,
            min_inliers: 12,
            seed: 3,
            ..RansacOptions::default()
        };
        let (est, inliers) = PnpSolver::dlt_ransac(&pts, &img, 700.0, &opts).unwrap();
        assert_eq!(inliers.len(), pts.len() - 3);
        assert!(!inliers.contains(&0) && !inliers.contains(&5) && !inliers.contains(&17));
        assert!((est.translation.vector - gt.translation.vector).norm() < 1e-6);
    }
}
