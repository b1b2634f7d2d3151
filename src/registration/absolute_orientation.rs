use nalgebra::{Matrix3, Matrix4, SymmetricEigen, Vector4};

use crate::error::{DendriteError, DendriteResult};
use crate::geometry::{is_finite, Vec3};

/// Rigid transform with `rotation * from + translation ≈ to`.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidFit {
    pub fitted: Vec<Vec3>,
    pub rotation: Matrix3<f64>,
    pub translation: Vec3,
}

impl RigidFit {
    pub fn apply(&self, p: &Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    /// Sum of squared residuals against the target cloud.
    pub fn residual(&self, to: &[Vec3]) -> f64 {
        self.fitted
            .iter()
            .zip(to)
            .map(|(a, b)| (a - b).norm_squared())
            .sum()
    }
}

/// Closed-form least-squares rigid alignment of matched point sets (Horn 1987).
///
/// Empty input gives the identity; a single point (or a cloud with no spread)
/// gives a pure translation.
pub fn absolute_orientation(from: &[Vec3], to: &[Vec3]) -> DendriteResult<RigidFit> {
    if from.len() != to.len() {
        return Err(DendriteError::MismatchedInputs {
            from: from.len(),
            to: to.len(),
        });
    }
    if from.iter().chain(to).any(|p| !is_finite(p)) {
        return Err(DendriteError::InvalidInput(
            "absolute orientation needs finite coordinates".into(),
        ));
    }
    if from.is_empty() {
        return Ok(RigidFit {
            fitted: Vec::new(),
            rotation: Matrix3::identity(),
            translation: Vec3::zeros(),
        });
    }

    let n = from.len() as f64;
    let m_from = from.iter().fold(Vec3::zeros(), |acc, p| acc + p) / n;
    let m_to = to.iter().fold(Vec3::zeros(), |acc, p| acc + p) / n;

    // cross-dispersion: M[a][b] = sum(left_a * right_b)
    let mut m = Matrix3::zeros();
    for (a, b) in from.iter().zip(to) {
        m += (a - m_from) * (b - m_to).transpose();
    }

    let rotation = if m.norm() < 1e-12 {
        Matrix3::identity()
    } else {
        let q = dominant_quaternion(&m)?;
        quaternion_to_rotation(&q)
    };
    let translation = m_to - rotation * m_from;
    let fitted = from.iter().map(|p| rotation * p + translation).collect();

    Ok(RigidFit {
        fitted,
        rotation,
        translation,
    })
}

fn horn_matrix(m: &Matrix3<f64>) -> Matrix4<f64> {
    let (sxx, sxy, sxz) = (m[(0, 0)], m[(0, 1)], m[(0, 2)]);
    let (syx, syy, syz) = (m[(1, 0)], m[(1, 1)], m[(1, 2)]);
    let (szx, szy, szz) = (m[(2, 0)], m[(2, 1)], m[(2, 2)]);

    Matrix4::new(
        sxx + syy + szz,
        syz - szy,
        szx - sxz,
        sxy - syx,
        //
        syz - szy,
        sxx - syy - szz,
        sxy + syx,
        szx + sxz,
        //
        szx - sxz,
        sxy + syx,
        -sxx + syy - szz,
        syz + szy,
        //
        sxy - syx,
        szx + sxz,
        syz + szy,
        -sxx - syy + szz,
    )
}

/// Unit eigenvector of the largest eigenvalue of Horn's N, sign-fixed so the
/// largest-magnitude component is non-negative.
fn dominant_quaternion(m: &Matrix3<f64>) -> DendriteResult<Vector4<f64>> {
    let eigen = SymmetricEigen::new(horn_matrix(m));
    let best = eigen.eigenvalues.imax();
    let mut q: Vector4<f64> = eigen.eigenvectors.column(best).into_owned();

    let norm = q.norm();
    if norm == 0.0 || !norm.is_finite() {
        return Err(DendriteError::SingularQuaternion);
    }
    q /= norm;
    if q[q.iamax()] < 0.0 {
        q = -q;
    }
    Ok(q)
}

/// `R = v·vᵀ + A·A` with `v = (qx, qy, qz)` and `A = q0·I + [v]ₓ`.
fn quaternion_to_rotation(q: &Vector4<f64>) -> Matrix3<f64> {
    let (q0, qx, qy, qz) = (q[0], q[1], q[2], q[3]);
    let v = Vec3::new(qx, qy, qz);
    let a = Matrix3::new(
        q0, -qz, qy, //
        qz, q0, -qx, //
        -qy, qx, q0,
    );
    v * v.transpose() + a * a
}
