//! Row initializers for keys that are read before they are written.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{VarError, VarResult};
use crate::types::Key;

/// Bound used by the named `"random"` initializer.
pub const DEFAULT_UNIFORM_BOUND: f32 = 0.05;

/// How a freshly inserted row is filled.
///
/// Random initializers are deterministic per key: the RNG is seeded with
/// `seed ^ key`, so the same key always receives the same row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    /// Every element equals the value.
    Constant(f32),
    /// Template row copied verbatim. Length equals the variable dimension.
    Row(Vec<f32>),
    /// Uniform draw in `[low, high)`.
    Uniform { low: f32, high: f32, seed: u64 },
    /// Normal draw via Box-Muller.
    Normal { mean: f32, stddev: f32, seed: u64 },
}

impl Default for Initializer {
    fn default() -> Self {
        Initializer::Constant(0.0)
    }
}

impl Initializer {
    /// Build from an initializer value list.
    ///
    /// A single value is a constant; `dim` values are a template row.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInitializer` for any other length.
    pub fn from_values(values: &[f32], dim: usize) -> VarResult<Self> {
        match values.len() {
            1 => Ok(Initializer::Constant(values[0])),
            n if n == dim => Ok(Initializer::Row(values.to_vec())),
            n => Err(VarError::InvalidInitializer(format!(
                "expected 1 or {} values, got {}",
                dim, n
            ))),
        }
    }

    /// Build from a named initializer: `zeros`, `ones` or `random`.
    pub fn from_name(name: &str) -> VarResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "zeros" => Ok(Initializer::Constant(0.0)),
            "ones" => Ok(Initializer::Constant(1.0)),
            "random" | "uniform" => Ok(Initializer::Uniform {
                low: -DEFAULT_UNIFORM_BOUND,
                high: DEFAULT_UNIFORM_BOUND,
                seed: 0,
            }),
            other => Err(VarError::InvalidInitializer(format!(
                "unknown initializer '{}'",
                other
            ))),
        }
    }

    /// Parse a command-line style initializer: a name or comma-separated values.
    pub fn parse(spec: &str, dim: usize) -> VarResult<Self> {
        let spec = spec.trim();
        if spec.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            return Self::from_name(spec);
        }
        let values = spec
            .split(',')
            .map(|v| {
                v.trim().parse::<f32>().map_err(|e| {
                    VarError::InvalidInitializer(format!("bad value '{}': {}", v.trim(), e))
                })
            })
            .collect::<VarResult<Vec<f32>>>()?;
        Self::from_values(&values, dim)
    }

    /// Check the initializer can produce rows of width `dim`.
    pub fn validate(&self, dim: usize) -> VarResult<()> {
        match self {
            Initializer::Row(row) if row.len() != dim => Err(VarError::InvalidInitializer(
                format!("template row has {} values, variable dim is {}", row.len(), dim),
            )),
            Initializer::Uniform { low, high, .. } if !(low < high) => {
                Err(VarError::InvalidInitializer(format!(
                    "uniform bounds must satisfy low < high, got [{}, {})",
                    low, high
                )))
            }
            // The sampler needs finite bounds and a finite width.
            Initializer::Uniform { low, high, .. } if !(high - low).is_finite() => {
                Err(VarError::InvalidInitializer(format!(
                    "uniform range [{}, {}) is not representable as f32",
                    low, high
                )))
            }
            Initializer::Normal { stddev, .. } if !(*stddev > 0.0) => Err(
                VarError::InvalidInitializer(format!("stddev must be positive, got {}", stddev)),
            ),
            Initializer::Normal { mean, stddev, .. }
                if !mean.is_finite() || !stddev.is_finite() =>
            {
                Err(VarError::InvalidInitializer(format!(
                    "normal parameters must be finite, got mean {} stddev {}",
                    mean, stddev
                )))
            }
            _ => Ok(()),
        }
    }

    /// Fill `out` with the initial row for `key`.
    pub fn fill(&self, key: Key, out: &mut [f32]) {
        match self {
            Initializer::Constant(v) => out.fill(*v),
            Initializer::Row(row) => out.copy_from_slice(row),
            Initializer::Uniform { low, high, seed } => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed ^ key as u64);
                for v in out.iter_mut() {
                    *v = rng.gen_range(*low..*high);
                }
            }
            Initializer::Normal { mean, stddev, seed } => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed ^ key as u64);
                for v in out.iter_mut() {
                    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
                    let u2: f32 = rng.gen_range(0.0..1.0);
                    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
                    *v = mean + z * stddev;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_constant() {
        let init = Initializer::from_values(&[2.71828], 128).unwrap();
        let mut row = vec![0.0; 128];
        init.fill(42, &mut row);
        assert!(row.iter().all(|&v| (v - 2.71828).abs() < 1e-6));
    }

    #[test]
    fn test_from_values_row() {
        let init = Initializer::from_values(&[1.0, 2.0, 3.0], 3).unwrap();
        let mut row = vec![0.0; 3];
        init.fill(0, &mut row);
        assert_eq!(row, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_values_bad_length() {
        let err = Initializer::from_values(&[1.0, 2.0], 8).unwrap_err();
        assert!(matches!(err, VarError::InvalidInitializer(_)));
        assert!(Initializer::from_values(&[], 8).is_err());
    }

    #[test]
    fn test_named_initializers() {
        assert_eq!(
            Initializer::from_name("zeros").unwrap(),
            Initializer::Constant(0.0)
        );
        assert_eq!(
            Initializer::from_name("ones").unwrap(),
            Initializer::Constant(1.0)
        );
        assert!(matches!(
            Initializer::from_name("random").unwrap(),
            Initializer::Uniform { .. }
        ));
        assert!(Initializer::from_name("xavier").is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            Initializer::parse("2.5", 4).unwrap(),
            Initializer::Constant(2.5)
        );
        assert_eq!(
            Initializer::parse("1, 2, 3, 4", 4).unwrap(),
            Initializer::Row(vec![1.0, 2.0, 3.0, 4.0])
        );
        assert_eq!(
            Initializer::parse("ones", 4).unwrap(),
            Initializer::Constant(1.0)
        );
        assert!(Initializer::parse("1,x", 2).is_err());
    }

    #[test]
    fn test_uniform_deterministic_per_key() {
        let init = Initializer::Uniform {
            low: -1.0,
            high: 1.0,
            seed: 7,
        };
        let mut a = vec![0.0; 16];
        let mut b = vec![0.0; 16];
        let mut c = vec![0.0; 16];
        init.fill(3, &mut a);
        init.fill(3, &mut b);
        init.fill(4, &mut c);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|&v| (-1.0..1.0).contains(&v)));
    }

    #[test]
    fn test_normal_finite() {
        let init = Initializer::Normal {
            mean: 0.0,
            stddev: 0.1,
            seed: 1,
        };
        let mut row = vec![0.0; 256];
        init.fill(99, &mut row);
        assert!(row.iter().all(|v| v.is_finite()));
        let mean: f32 = row.iter().sum::<f32>() / row.len() as f32;
        assert!(mean.abs() < 0.05, "sample mean {} too far from 0", mean);
    }

    #[test]
    fn test_validate() {
        assert!(Initializer::Row(vec![0.0; 3]).validate(4).is_err());
        assert!(Initializer::Uniform {
            low: 1.0,
            high: 1.0,
            seed: 0
        }
        .validate(4)
        .is_err());
        assert!(Initializer::Normal {
            mean: 0.0,
            stddev: 0.0,
            seed: 0
        }
        .validate(4)
        .is_err());
        assert!(Initializer::Constant(1.0).validate(4).is_ok());
    }

    #[test]
    fn test_validate_rejects_unrepresentable_ranges() {
        let bad = [
            Initializer::Uniform {
                low: f32::NEG_INFINITY,
                high: 0.0,
                seed: 0,
            },
            Initializer::Uniform {
                low: -f32::MAX,
                high: f32::MAX,
                seed: 0,
            },
            Initializer::Normal {
                mean: f32::NAN,
                stddev: 1.0,
                seed: 0,
            },
            Initializer::Normal {
                mean: 0.0,
                stddev: f32::INFINITY,
                seed: 0,
            },
        ];
        for init in &bad {
            let err = init.validate(4).unwrap_err();
            assert!(
                matches!(err, VarError::InvalidInitializer(_)),
                "{:?} should be rejected",
                init
            );
        }

        // Widest range that still has a finite width.
        let wide = Initializer::Uniform {
            low: -f32::MAX / 2.0,
            high: f32::MAX / 2.0,
            seed: 0,
        };
        assert!(wide.validate(4).is_ok());
        let mut row = vec![0.0; 4];
        wide.fill(1, &mut row);
        assert!(row.iter().all(|v| v.is_finite()));
    }
}
