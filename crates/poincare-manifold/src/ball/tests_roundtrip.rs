//! Round-trip and edge case tests for Poincare ball operations.
//!
//! Critical tests for inverse relationships (Mobius add, exp/log maps) and
//! transport/geodesic consistency.

#[cfg(test)]
mod tests {
    use candle_core::{DType, Device, Tensor, D};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::ball::PoincareBall;
    use crate::config::BallConfig;

    fn sample(ball: &PoincareBall, n: usize, dim: usize, seed: u64) -> Tensor {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        ball.random_normal((n, dim), 0.2, DType::F64, &Device::Cpu, &mut rng)
            .unwrap()
    }

    fn max_abs_diff(a: &Tensor, b: &Tensor) -> f64 {
        a.sub(b)
            .unwrap()
            .abs()
            .unwrap()
            .flatten_all()
            .unwrap()
            .max(0)
            .unwrap()
            .to_scalar::<f64>()
            .unwrap()
    }

    // ========== ROUND-TRIP TESTS (CRITICAL) ==========

    #[test]
    fn test_mobius_add_left_cancellation() {
        for curvature in [-1.0, -0.3, -2.5] {
            let ball = PoincareBall::new(BallConfig::with_curvature(curvature));
            let m = sample(&ball, 16, 5, 1);
            let p = sample(&ball, 16, 5, 2);
            let shifted = ball.mobius_add(&m, &p, D::Minus1).unwrap();
            let back = ball.mobius_add(&m.neg().unwrap(), &shifted, D::Minus1).unwrap();
            let err = max_abs_diff(&back, &p);
            assert!(err < 1e-9, "curvature {}: round-trip error {}", curvature, err);
        }
    }

    #[test]
    fn test_exp_log_roundtrip_from_origin() {
        let ball = PoincareBall::default();
        let v = Tensor::new(&[[0.5f64, 0.3, -0.2], [0.0, 1.2, 0.4]], &Device::Cpu).unwrap();
        let point = ball.expmap0(&v, D::Minus1).unwrap();
        let recovered = ball.logmap0(&point, D::Minus1).unwrap();
        assert!(max_abs_diff(&v, &recovered) < 1e-9);
    }

    #[test]
    fn test_exp_log_roundtrip_at_point() {
        let ball = PoincareBall::new(BallConfig::with_curvature(-0.7));
        let x = sample(&ball, 8, 4, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let u = ball
            .random_normal((8, 4), 0.4, DType::F64, &Device::Cpu, &mut rng)
            .unwrap();
        let y = ball.expmap(&x, &u, D::Minus1).unwrap();
        let recovered = ball.logmap(&x, &y, D::Minus1).unwrap();
        assert!(max_abs_diff(&u, &recovered) < 1e-7);
    }

    #[test]
    fn test_log_exp_roundtrip_between_points() {
        let ball = PoincareBall::default();
        let x = sample(&ball, 8, 3, 5);
        let y = sample(&ball, 8, 3, 6);
        let v = ball.logmap(&x, &y, D::Minus1).unwrap();
        let back = ball.expmap(&x, &v, D::Minus1).unwrap();
        assert!(max_abs_diff(&y, &back) < 1e-7);
    }

    #[test]
    fn test_expmap_at_origin_matches_expmap0() {
        let ball = PoincareBall::default();
        let origin = Tensor::zeros((1, 3), DType::F64, &Device::Cpu).unwrap();
        let u = Tensor::new(&[[0.4f64, -0.1, 0.8]], &Device::Cpu).unwrap();
        let a = ball.expmap(&origin, &u, D::Minus1).unwrap();
        let b = ball.expmap0(&u, D::Minus1).unwrap();
        assert!(max_abs_diff(&a, &b) < 1e-9);
    }

    #[test]
    fn test_logmap_length_is_distance() {
        let ball = PoincareBall::default();
        let x = sample(&ball, 6, 3, 7);
        let y = sample(&ball, 6, 3, 8);
        let v = ball.logmap(&x, &y, D::Minus1).unwrap();
        let lam = ball.lambda_x(&x, D::Minus1, false).unwrap();
        let metric_norm = v.sqr().unwrap().sum(1).unwrap().sqrt().unwrap().mul(&lam).unwrap();
        let d = ball.dist(&x, &y, D::Minus1, false).unwrap();
        assert!(max_abs_diff(&metric_norm, &d) < 1e-7);
    }

    // ========== GEODESIC TESTS ==========

    #[test]
    fn test_geodesic_endpoints() {
        let ball = PoincareBall::new(BallConfig::with_curvature(-1.5));
        let x = sample(&ball, 10, 3, 9);
        let y = sample(&ball, 10, 3, 10);
        let start = ball.geodesic(0.0, &x, &y, D::Minus1).unwrap();
        let end = ball.geodesic(1.0, &x, &y, D::Minus1).unwrap();
        assert!(max_abs_diff(&start, &x) < 1e-9);
        assert!(max_abs_diff(&end, &y) < 1e-9);
    }

    #[test]
    fn test_geodesic_midpoint_is_equidistant() {
        let ball = PoincareBall::default();
        let x = sample(&ball, 5, 2, 11);
        let y = sample(&ball, 5, 2, 12);
        let mid = ball.geodesic(0.5, &x, &y, D::Minus1).unwrap();
        let dx = ball.dist(&x, &mid, D::Minus1, false).unwrap();
        let dy = ball.dist(&mid, &y, D::Minus1, false).unwrap();
        assert!(max_abs_diff(&dx, &dy) < 1e-7);
    }

    // ========== TRANSPORT TESTS ==========

    #[test]
    fn test_transport_preserves_metric_norm() {
        let ball = PoincareBall::default();
        let x = sample(&ball, 6, 3, 13);
        let y = sample(&ball, 6, 3, 14);
        let v = Tensor::new(
            &[
                [1.0f64, 0.0, 0.0],
                [0.0, 2.0, 0.0],
                [0.3, 0.3, 0.3],
                [-1.0, 0.5, 0.0],
                [0.0, 0.0, -0.7],
                [0.2, -0.4, 0.9],
            ],
            &Device::Cpu,
        )
        .unwrap();
        let moved = ball.transp(&x, &y, &v, D::Minus1).unwrap();

        let norm_at = |p: &Tensor, t: &Tensor| {
            let lam = ball.lambda_x(p, D::Minus1, false).unwrap();
            t.sqr().unwrap().sum(1).unwrap().sqrt().unwrap().mul(&lam).unwrap()
        };
        assert!(max_abs_diff(&norm_at(&x, &v), &norm_at(&y, &moved)) < 1e-9);
    }

    #[test]
    fn test_transport_from_origin_matches_transp0() {
        let ball = PoincareBall::default();
        let origin = Tensor::zeros((4, 3), DType::F64, &Device::Cpu).unwrap();
        let y = sample(&ball, 4, 3, 15);
        let v = sample(&ball, 4, 3, 16);
        let a = ball.transp(&origin, &y, &v, D::Minus1).unwrap();
        let b = ball.transp0(&y, &v, D::Minus1).unwrap();
        assert!(max_abs_diff(&a, &b) < 1e-9);
    }

    // ========== EDGE CASES ==========

    #[test]
    fn test_boundary_points_stay_finite() {
        let ball = PoincareBall::default();
        let x = Tensor::new(&[[0.999_999f64, 0.0], [0.0, -1.0]], &Device::Cpu).unwrap();
        let d = ball.dist0(&x, D::Minus1, false).unwrap();
        let projected = ball.projx(&x, D::Minus1).unwrap();
        let d2 = ball.dist0(&projected, D::Minus1, false).unwrap();
        for t in [d, d2] {
            let vals = t.to_vec1::<f64>().unwrap();
            assert!(vals.iter().all(|v| v.is_finite()), "{:?}", vals);
        }
    }

    #[test]
    fn test_large_tangent_expmap0_stays_inside() {
        let ball = PoincareBall::default();
        let u = Tensor::new(&[[100.0f32, 100.0]], &Device::Cpu).unwrap();
        let x = ball.expmap0(&u, D::Minus1).unwrap();
        assert!(ball.check_point(&x, D::Minus1, 0.0).unwrap());
    }
}
