use anyhow::{bail, ensure, Context, Result};
use half::bf16;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tensorbin_core::{DType, Shape, Tensor};

const MAX_ATTEMPTS: usize = 1000;

/// Tensor of values drawn uniformly from `[min, max)`. Integer types take the
/// floor of each draw. Draws that leave the range after narrowing to `dtype`
/// are redrawn.
pub fn uniform_tensor(
    dtype: DType,
    shape: Shape,
    min: f64,
    max: f64,
    seed: Option<u64>,
) -> Result<Tensor> {
    ensure!(
        min.is_finite() && max.is_finite(),
        "bounds must be finite (got {min}, {max})"
    );
    ensure!(min < max, "min ({min}) must be less than max ({max})");

    let n = shape
        .checked_numel()
        .with_context(|| format!("shape {shape} has too many elements"))?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let dist = Uniform::new(min, max);
    let draw = move || dist.sample(&mut rng);

    let tensor = match dtype {
        DType::BF16 => Tensor::from_vec(
            shape,
            draws(n, draw, bf16::from_f64, bf16::to_f64, min, max)?,
        )?,
        DType::F32 => Tensor::from_vec(shape, draws(n, draw, |x| x as f32, f64::from, min, max)?)?,
        DType::F64 => Tensor::from_vec(shape, draws(n, draw, |x| x, |x| x, min, max)?)?,
        DType::I32 => {
            ensure!(
                min >= i32::MIN as f64 && max <= i32::MAX as f64 + 1.0,
                "[{min}, {max}) does not fit in i32"
            );
            Tensor::from_vec(
                shape,
                draws(n, draw, |x| x.floor() as i32, f64::from, min, max)?,
            )?
        }
        DType::I64 => {
            ensure!(
                min >= i64::MIN as f64 && max <= i64::MAX as f64,
                "[{min}, {max}) does not fit in i64"
            );
            Tensor::from_vec(
                shape,
                draws(n, draw, |x| x.floor() as i64, |v| v as f64, min, max)?,
            )?
        }
        other => bail!("cannot generate {other} records"),
    };
    Ok(tensor)
}

/// `n` draws narrowed to `T`, each redrawn until it lies in `[min, max)`.
fn draws<T: Copy>(
    n: usize,
    mut draw: impl FnMut() -> f64,
    narrow: impl Fn(f64) -> T,
    widen: impl Fn(T) -> f64,
    min: f64,
    max: f64,
) -> Result<Vec<T>> {
    (0..n)
        .map(|_| {
            for _ in 0..MAX_ATTEMPTS {
                let v = narrow(draw());
                if (min..max).contains(&widen(v)) {
                    return Ok(v);
                }
            }
            bail!("no value of the target type lies in [{min}, {max})")
        })
        .collect()
}
