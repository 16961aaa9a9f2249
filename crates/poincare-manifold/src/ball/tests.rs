//! Tests for Poincare ball Mobius operations.

#[cfg(test)]
#[allow(clippy::module_inception)]
mod tests {
    use candle_core::{DType, Device, Tensor, D};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::ball::PoincareBall;
    use crate::config::BallConfig;
    use crate::error::ManifoldError;

    fn default_ball() -> PoincareBall {
        PoincareBall::new(BallConfig::default())
    }

    fn points(rows: &[[f64; 2]]) -> Tensor {
        let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::from_vec(flat, (rows.len(), 2), &Device::Cpu).unwrap()
    }

    fn rows(t: &Tensor) -> Vec<Vec<f64>> {
        t.to_vec2::<f64>().unwrap()
    }

    fn flat(t: &Tensor) -> Vec<f64> {
        t.flatten_all().unwrap().to_vec1::<f64>().unwrap()
    }

    fn assert_close(a: &Tensor, b: &Tensor, tol: f64) {
        let (a, b) = (flat(a), flat(b));
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!((x - y).abs() < tol, "index {}: {} vs {}", i, x, y);
        }
    }

    // ========== CONSTRUCTION TESTS ==========

    #[test]
    fn test_new_creates_ball_with_config() {
        let ball = PoincareBall::new(BallConfig::with_curvature(-0.5));
        assert_eq!(ball.config().curvature, -0.5);
        assert_eq!(ball.c(), 0.5);
        assert!((ball.sqrt_c() - 0.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_try_new_rejects_positive_curvature() {
        assert!(PoincareBall::try_new(BallConfig::with_curvature(1.0)).is_err());
        assert!(PoincareBall::shared(0.0).is_err());
    }

    #[test]
    fn test_same_compares_instances() {
        let a = PoincareBall::shared(-1.0).unwrap();
        let b = PoincareBall::shared(-1.0).unwrap();
        assert!(PoincareBall::same(&a, &a.clone()));
        assert!(!PoincareBall::same(&a, &b));
    }

    // ========== CONFORMAL FACTOR / PROJECTION TESTS ==========

    #[test]
    fn test_lambda_at_origin_is_two() {
        let ball = default_ball();
        let x = points(&[[0.0, 0.0], [0.6, 0.0]]);
        let lam = flat(&ball.lambda_x(&x, D::Minus1, false).unwrap());
        assert!((lam[0] - 2.0).abs() < 1e-12);
        assert!((lam[1] - 2.0 / (1.0 - 0.36)).abs() < 1e-9);

        let kept = ball.lambda_x(&x, D::Minus1, true).unwrap();
        assert_eq!(kept.dims(), &[2, 1]);
    }

    #[test]
    fn test_projx_clips_outside_points_only() {
        let ball = default_ball();
        let x = points(&[[3.0, 4.0], [0.3, 0.1]]);
        let p = rows(&ball.projx(&x, D::Minus1).unwrap());
        let n0 = (p[0][0].powi(2) + p[0][1].powi(2)).sqrt();
        assert!((n0 - ball.config().max_norm()).abs() < 1e-9);
        assert!((p[0][0] / p[0][1] - 0.75).abs() < 1e-9);
        assert_eq!(p[1], vec![0.3, 0.1]);
        assert!(ball.check_point(&ball.projx(&x, D::Minus1).unwrap(), D::Minus1, 0.0).unwrap());
        assert!(!ball.check_point(&x, D::Minus1, 0.0).unwrap());
    }

    // ========== MOBIUS ADDITION TESTS ==========

    #[test]
    fn test_mobius_add_with_origin_returns_other() {
        let ball = default_ball();
        let origin = points(&[[0.0, 0.0]]);
        let x = points(&[[0.3, -0.2]]);
        assert_close(&ball.mobius_add(&x, &origin, D::Minus1).unwrap(), &x, 1e-12);
        assert_close(&ball.mobius_add(&origin, &x, D::Minus1).unwrap(), &x, 1e-12);
    }

    #[test]
    fn test_mobius_add_inverse_is_origin() {
        let ball = default_ball();
        let x = points(&[[0.3, -0.2], [0.7, 0.1]]);
        let zero = ball.mobius_add(&x.neg().unwrap(), &x, D::Minus1).unwrap();
        assert!(flat(&zero).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_mobius_add_collinear_matches_velocity_addition() {
        // On a line through the origin, Mobius addition is relativistic velocity addition.
        let ball = default_ball();
        let x = points(&[[0.5, 0.0]]);
        let y = points(&[[0.3, 0.0]]);
        let z = rows(&ball.mobius_add(&x, &y, D::Minus1).unwrap());
        assert!((z[0][0] - 0.8 / 1.15).abs() < 1e-12);
        assert!(z[0][1].abs() < 1e-12);
    }

    #[test]
    fn test_mobius_add_broadcasts_single_point() {
        let ball = default_ball();
        let m = points(&[[0.1, 0.2]]);
        let xs = Tensor::zeros((3, 4, 2), DType::F64, &Device::Cpu).unwrap();
        let out = ball.mobius_add(&m, &xs, D::Minus1).unwrap();
        assert_eq!(out.dims(), &[3, 4, 2]);
        let first = out.get(2).unwrap().get(3).unwrap();
        assert_close(&first, &m.squeeze(0).unwrap(), 1e-12);
    }

    // ========== SCALAR MULTIPLICATION TESTS ==========

    #[test]
    fn test_mobius_scale_identities() {
        let ball = default_ball();
        let x = points(&[[0.3, 0.4]]);
        assert_close(&ball.mobius_scale(1.0, &x, D::Minus1).unwrap(), &x, 1e-9);
        let zero = ball.mobius_scale(0.0, &x, D::Minus1).unwrap();
        assert!(flat(&zero).iter().all(|v| v.abs() < 1e-12));

        // 2 (x) x == x (+) x
        let twice = ball.mobius_scale(2.0, &x, D::Minus1).unwrap();
        let sum = ball.mobius_add(&x, &x, D::Minus1).unwrap();
        assert_close(&twice, &sum, 1e-9);
    }

    #[test]
    fn test_mobius_scalar_mul_broadcasts_per_row() {
        let ball = default_ball();
        let x = points(&[[0.3, 0.4], [0.1, 0.0]]);
        let r = Tensor::new(&[[1.0f64], [0.0]], &Device::Cpu).unwrap();
        let out = rows(&ball.mobius_scalar_mul(&r, &x, D::Minus1).unwrap());
        assert!((out[0][0] - 0.3).abs() < 1e-9 && (out[0][1] - 0.4).abs() < 1e-9);
        assert!(out[1].iter().all(|v| v.abs() < 1e-12));
    }

    // ========== MATVEC TESTS ==========

    #[test]
    fn test_mobius_matvec_identity_and_zero() {
        let ball = default_ball();
        let x = points(&[[0.3, 0.4], [-0.2, 0.1]]);
        let eye = Tensor::eye(2, DType::F64, &Device::Cpu).unwrap();
        assert_close(&ball.mobius_matvec(&eye, &x).unwrap(), &x, 1e-9);

        let zeros = Tensor::zeros((2, 3), DType::F64, &Device::Cpu).unwrap();
        let out = ball.mobius_matvec(&zeros, &x).unwrap();
        assert_eq!(out.dims(), &[2, 3]);
        assert!(flat(&out).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_mobius_matvec_rejects_wrong_input_dim() {
        let ball = default_ball();
        let x = points(&[[0.3, 0.4]]);
        let w = Tensor::zeros((3, 3), DType::F64, &Device::Cpu).unwrap();
        assert!(ball.mobius_matvec(&w, &x).is_err());
    }

    // ========== GYRATION TESTS ==========

    #[test]
    fn test_gyration_restores_associativity() {
        let ball = default_ball();
        let a = points(&[[0.2, 0.3]]);
        let b = points(&[[-0.4, 0.1]]);
        let u = points(&[[0.1, -0.3]]);
        let left = ball
            .mobius_add(&a, &ball.mobius_add(&b, &u, D::Minus1).unwrap(), D::Minus1)
            .unwrap();
        let ab = ball.mobius_add(&a, &b, D::Minus1).unwrap();
        let gyr = ball.gyration(&a, &b, &u, D::Minus1).unwrap();
        let right = ball.mobius_add(&ab, &gyr, D::Minus1).unwrap();
        assert_close(&left, &right, 1e-9);
    }

    #[test]
    fn test_gyration_preserves_norm() {
        let ball = default_ball();
        let a = points(&[[0.2, 0.3]]);
        let b = points(&[[-0.4, 0.1]]);
        let u = points(&[[1.5, -2.0]]);
        let g = flat(&ball.gyration(&a, &b, &u, D::Minus1).unwrap());
        let n = (g[0] * g[0] + g[1] * g[1]).sqrt();
        assert!((n - 2.5).abs() < 1e-9);
    }

    // ========== DISTANCE TESTS ==========

    #[test]
    fn test_dist_symmetry_and_origin() {
        let ball = default_ball();
        let x = points(&[[0.3, -0.2]]);
        let y = points(&[[-0.5, 0.4]]);
        let dxy = flat(&ball.dist(&x, &y, D::Minus1, false).unwrap());
        let dyx = flat(&ball.dist(&y, &x, D::Minus1, false).unwrap());
        assert!((dxy[0] - dyx[0]).abs() < 1e-9);

        let origin = points(&[[0.0, 0.0]]);
        let d0 = flat(&ball.dist0(&x, D::Minus1, false).unwrap());
        let d = flat(&ball.dist(&origin, &x, D::Minus1, false).unwrap());
        assert!((d0[0] - d[0]).abs() < 1e-9);

        let r = (0.13f64).sqrt();
        assert!((d0[0] - 2.0 * r.atanh()).abs() < 1e-9);

        let d2 = flat(&ball.dist2(&x, &y, D::Minus1, false).unwrap());
        assert!((d2[0] - dxy[0] * dxy[0]).abs() < 1e-9);
    }

    #[test]
    fn test_dist_keepdim_shapes() {
        let ball = default_ball();
        let x = Tensor::zeros((3, 5, 2), DType::F64, &Device::Cpu).unwrap();
        assert_eq!(ball.dist0(&x, D::Minus1, true).unwrap().dims(), &[3, 5, 1]);
        assert_eq!(ball.dist0(&x, D::Minus1, false).unwrap().dims(), &[3, 5]);
    }

    #[test]
    fn test_dist2plane_through_origin_matches_dist0() {
        let ball = default_ball();
        let x = points(&[[0.4, 0.0], [-0.4, 0.0]]);
        let p = points(&[[0.0, 0.0]]);
        let a = points(&[[1.0, 0.0]]);
        let d = flat(
            &ball
                .dist2plane(&x, &p, &a, D::Minus1, true, false, false)
                .unwrap(),
        );
        let expected = 2.0 * 0.4f64.atanh();
        assert!((d[0] - expected).abs() < 1e-9);
        assert!((d[1] + expected).abs() < 1e-9);

        let unsigned = flat(
            &ball
                .dist2plane(&x, &p, &a, D::Minus1, false, false, false)
                .unwrap(),
        );
        assert!((unsigned[1] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_dist2plane_scaled_multiplies_by_normal_norm() {
        let ball = default_ball();
        let x = points(&[[0.1, 0.3]]);
        let p = points(&[[0.2, -0.1]]);
        let a = points(&[[0.0, 3.0]]);
        let plain = flat(&ball.dist2plane(&x, &p, &a, D::Minus1, true, false, false).unwrap());
        let scaled = flat(&ball.dist2plane(&x, &p, &a, D::Minus1, true, true, false).unwrap());
        assert!((scaled[0] - 3.0 * plain[0]).abs() < 1e-9);
    }

    // ========== MIDPOINT TESTS ==========

    #[test]
    fn test_midpoint_of_identical_points_is_the_point() {
        let ball = default_ball();
        let x = points(&[[0.3, 0.5], [0.3, 0.5], [0.3, 0.5]]);
        let m = ball
            .weighted_midpoint(&x, None, None, D::Minus1, false, false)
            .unwrap();
        assert_eq!(m.dims(), &[2]);
        assert_close(&m, &points(&[[0.3, 0.5]]), 1e-9);
    }

    #[test]
    fn test_midpoint_of_opposite_points_is_origin() {
        let ball = default_ball();
        let x = points(&[[0.3, 0.5], [-0.3, -0.5]]);
        let m = ball
            .weighted_midpoint(&x, None, None, D::Minus1, true, false)
            .unwrap();
        assert_eq!(m.dims(), &[1, 2]);
        assert!(flat(&m).iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_midpoint_one_hot_weights_select_point() {
        let ball = default_ball();
        let centroids = points(&[[0.3, 0.5], [-0.6, 0.1]]);
        // (batch=2, K=2, 1) weights against (K, D) points
        let w = Tensor::new(&[[[0.0f64], [1.0]], [[1.0], [0.0]]], &Device::Cpu).unwrap();
        let m = ball
            .weighted_midpoint(&centroids, Some(&w), Some(&[D::Minus2]), D::Minus1, false, true)
            .unwrap();
        assert_eq!(m.dims(), &[2, 2]);
        let m = rows(&m);
        assert!((m[0][0] + 0.6).abs() < 1e-9 && (m[0][1] - 0.1).abs() < 1e-9);
        assert!((m[1][0] - 0.3).abs() < 1e-9 && (m[1][1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_midpoint_rejects_feature_axis_reduction() {
        let ball = default_ball();
        let x = points(&[[0.3, 0.5]]);
        assert!(ball
            .weighted_midpoint(&x, None, Some(&[D::Minus1]), D::Minus1, false, false)
            .is_err());
    }

    // ========== SAMPLING TESTS ==========

    #[test]
    fn test_random_normal_stays_inside_ball() {
        let ball = PoincareBall::new(BallConfig::with_curvature(-2.0));
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let x = ball
            .random_normal((64, 3), 3.0, DType::F32, &Device::Cpu, &mut rng)
            .unwrap();
        assert_eq!(x.dims(), &[64, 3]);
        assert_eq!(x.dtype(), DType::F32);
        assert!(ball.check_point(&x, D::Minus1, 0.0).unwrap());
    }

    #[test]
    fn test_random_normal_rejects_negative_std() {
        let ball = default_ball();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for std in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                ball.random_normal((2, 2), std, DType::F32, &Device::Cpu, &mut rng),
                Err(ManifoldError::InvalidInput(_))
            ));
        }
        // zero spread puts every sample at the origin
        let origin = ball
            .random_normal((2, 2), 0.0, DType::F32, &Device::Cpu, &mut rng)
            .unwrap();
        assert_eq!(origin.to_vec2::<f32>().unwrap(), vec![vec![0.0; 2]; 2]);
    }
}
