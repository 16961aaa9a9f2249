//! Parameter initialisation helpers.

use candle_core::{DType, Device, Shape, Tensor};
use rand::Rng;
use rand_distr::Distribution;

use crate::error::LayerResult;

/// Tensor of i.i.d. samples from `dist`.
pub(crate) fn sample<R, T, S>(
    dist: &T,
    shape: S,
    dtype: DType,
    device: &Device,
    rng: &mut R,
) -> LayerResult<Tensor>
where
    R: Rng + ?Sized,
    T: Distribution<f64>,
    S: Into<Shape>,
{
    let shape: Shape = shape.into();
    let data: Vec<f64> = (0..shape.elem_count()).map(|_| dist.sample(rng)).collect();
    Ok(Tensor::from_vec(data, shape, device)?.to_dtype(dtype)?)
}

/// `(rows, cols)` matrix with ones on the main diagonal.
pub(crate) fn rect_eye(
    rows: usize,
    cols: usize,
    dtype: DType,
    device: &Device,
) -> LayerResult<Tensor> {
    let mut data = vec![0f64; rows * cols];
    for i in 0..rows.min(cols) {
        data[i * cols + i] = 1.0;
    }
    Ok(Tensor::from_vec(data, (rows, cols), device)?.to_dtype(dtype)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::Uniform;

    #[test]
    fn test_sample_shape_and_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let dist = Uniform::new(-0.5, 0.5);
        let t = sample(&dist, (3, 4), DType::F32, &Device::Cpu, &mut rng).unwrap();
        assert_eq!(t.dims(), &[3, 4]);
        let v = t.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert!(v.iter().all(|x| (-0.5..=0.5).contains(x)));
    }

    #[test]
    fn test_rect_eye() {
        let e = rect_eye(2, 3, DType::F64, &Device::Cpu).unwrap();
        assert_eq!(e.to_vec2::<f64>().unwrap(), vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }
}
