use nalgebra::{Matrix3, Vector3};

/// Below this angle (rad) the series expansion is used instead of sin/cos
/// ratios, which lose precision near zero.
const SMALL_ANGLE: f64 = 1e-8;

/// Cross-product matrix: `skew(v) * u == v.cross(&u)`.
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y,
        v.z, 0.0, -v.x,
        -v.y, v.x, 0.0,
    )
}

/// Exponential map of a rotation vector (axis * angle) via Rodrigues' formula.
///
/// `R = I + sin(θ)/θ·K + (1 - cos(θ))/θ²·K²` with `K = skew(rotvec)`.
pub fn rodrigues(rotvec: &Vector3<f64>) -> Matrix3<f64> {
    let theta = rotvec.norm();
    let k = skew(rotvec);
    let k2 = k * k;

    if theta < SMALL_ANGLE {
        return Matrix3::identity() + k + k2 * 0.5;
    }

    Matrix3::identity() + k * (theta.sin() / theta) + k2 * ((1.0 - theta.cos()) / (theta * theta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;
    use std::f64::consts::FRAC_PI_2;

    fn max_abs_diff(a: &Matrix3<f64>, b: &Matrix3<f64>) -> f64 {
        (a - b).amax()
    }

    #[test]
    fn test_zero_vector_is_identity() {
        let r = rodrigues(&Vector3::zeros());
        assert_eq!(r, Matrix3::identity());
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let r = rodrigues(&Vector3::new(0.0, 0.0, FRAC_PI_2));
        let v = r * Vector3::x();
        assert!((v - Vector3::y()).norm() < 1e-12, "got {}", v);
    }

    #[test]
    fn test_matches_nalgebra_exponential_map() {
        let vectors = [
            Vector3::new(0.3, -0.2, 0.1),
            Vector3::new(1.5, 0.0, 0.0),
            Vector3::new(-2.0, 1.0, 0.5),
            Vector3::new(1e-9, -2e-9, 0.0),
            Vector3::new(0.0, 3.0, 0.0),
        ];
        for v in vectors {
            let expected = Rotation3::new(v).into_inner();
            let got = rodrigues(&v);
            assert!(max_abs_diff(&got, &expected) < 1e-9, "rotvec {}: {} vs {}", v, got, expected);
        }
    }

    #[test]
    fn test_result_is_orthonormal() {
        let r = rodrigues(&Vector3::new(0.7, -1.1, 0.4));
        assert!(max_abs_diff(&(r.transpose() * r), &Matrix3::identity()) < 1e-12);
        assert!((r.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_skew_is_cross_product() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(-0.5, 4.0, 0.25);
        assert!((skew(&a) * b - a.cross(&b)).norm() < 1e-12);
    }
}
