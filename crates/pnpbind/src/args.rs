use log::trace;
use pnpbind_array::Value;
use pnpbind_pnp::ExtrinsicGuess;

use crate::error::BindError;
use crate::points::ensure_finite;

/// Number of positional arguments every call carries.
pub const REQUIRED_ARGS: usize = 3;

/// Index of the first option name; index 3 holds the distortion coefficients.
pub const OPTIONS_START: usize = 4;

/// Largest number of outputs a call may request.
pub const MAX_OUTPUTS: usize = 2;

/// Validate the number of inputs and requested outputs.
///
/// Valid calls have exactly the three required arguments, or the distortion
/// coefficients followed by complete name/value pairs, which makes the total even.
pub fn check_call_shape(nrhs: usize, nlhs: usize) -> Result<(), BindError> {
    let inputs_ok = nrhs == REQUIRED_ARGS || (nrhs >= OPTIONS_START && nrhs % 2 == 0);
    if !inputs_ok || nlhs > MAX_OUTPUTS {
        return Err(BindError::InvalidArgumentCount { nrhs, nlhs });
    }
    Ok(())
}

/// Options recognized after the positional arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PnPOptions {
    /// Refine from `rvec`/`tvec` instead of solving from scratch.
    pub use_extrinsic_guess: bool,
    /// Seed rotation vector.
    pub rvec: Option<[f64; 3]>,
    /// Seed translation vector.
    pub tvec: Option<[f64; 3]>,
}

impl PnPOptions {
    /// The starting pose handed to the solver.
    ///
    /// `None` unless `UseExtrinsicGuess` is set; seeds given without the flag are ignored.
    pub fn extrinsic_guess(&self) -> Result<Option<ExtrinsicGuess>, BindError> {
        if !self.use_extrinsic_guess {
            return Ok(None);
        }
        match (self.rvec, self.tvec) {
            (Some(rvec), Some(tvec)) => Ok(Some(ExtrinsicGuess { rvec, tvec })),
            _ => Err(BindError::MissingExtrinsicGuess),
        }
    }
}

/// Parse name/value option pairs. Names match exactly; a repeated name keeps the last value.
///
/// `pairs` has even length once [`check_call_shape`] has passed.
pub(crate) fn parse_options(pairs: &[Value]) -> Result<PnPOptions, BindError> {
    let mut options = PnPOptions::default();

    for (i, pair) in pairs.chunks_exact(2).enumerate() {
        let (key, val) = (&pair[0], &pair[1]);
        let name = key
            .to_string()
            .map_err(|e| BindError::invalid_type(format!("option name {}", i + 1), e))?;
        trace!("option {name} = {val:?}");

        match name.as_str() {
            "UseExtrinsicGuess" => {
                options.use_extrinsic_guess = val
                    .to_bool()
                    .map_err(|e| BindError::invalid_type("UseExtrinsicGuess", e))?;
            }
            "Rvec" => options.rvec = seed_vector("Rvec", val)?,
            "Tvec" => options.tvec = seed_vector("Tvec", val)?,
            _ => return Err(BindError::UnrecognizedOption(name)),
        }
    }

    Ok(options)
}

/// An empty value leaves the seed unset.
fn seed_vector(name: &str, val: &Value) -> Result<Option<[f64; 3]>, BindError> {
    if val.is_numeric() && val.is_empty() {
        return Ok(None);
    }
    let seed = val.to_vec3().map_err(|e| BindError::invalid_type(name, e))?;
    ensure_finite(name, &seed)?;
    Ok(Some(seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_call_shape() {
        for nrhs in [3, 4, 6, 8, 10] {
            for nlhs in 0..=2 {
                assert!(check_call_shape(nrhs, nlhs).is_ok(), "nrhs={nrhs} nlhs={nlhs}");
            }
        }
        for nrhs in [0, 1, 2, 5, 7, 9] {
            assert!(matches!(
                check_call_shape(nrhs, 1),
                Err(BindError::InvalidArgumentCount { .. })
            ));
        }
        assert!(matches!(
            check_call_shape(4, 3),
            Err(BindError::InvalidArgumentCount { nrhs: 4, nlhs: 3 })
        ));
    }

    #[test]
    fn test_parse_options() -> Result<(), BindError> {
        let pairs = [
            Value::from("Rvec"),
            Value::matrix(&[[0.1], [0.2], [0.3]]),
            Value::from("Tvec"),
            Value::matrix(&[[1.0, 2.0, 3.0]]),
            Value::from("UseExtrinsicGuess"),
            Value::from(true),
        ];
        let options = parse_options(&pairs)?;
        assert_eq!(
            options,
            PnPOptions {
                use_extrinsic_guess: true,
                rvec: Some([0.1, 0.2, 0.3]),
                tvec: Some([1.0, 2.0, 3.0]),
            }
        );
        assert_eq!(
            options.extrinsic_guess()?,
            Some(ExtrinsicGuess {
                rvec: [0.1, 0.2, 0.3],
                tvec: [1.0, 2.0, 3.0]
            })
        );
        Ok(())
    }

    #[test]
    fn test_parse_options_defaults() -> Result<(), BindError> {
        let options = parse_options(&[])?;
        assert_eq!(options, PnPOptions::default());
        assert_eq!(options.extrinsic_guess()?, None);

        let options = parse_options(&[Value::from("Rvec"), Value::empty()])?;
        assert_eq!(options.rvec, None);
        Ok(())
    }

    #[test]
    fn test_parse_options_last_value_wins() -> Result<(), BindError> {
        let pairs = [
            Value::from("UseExtrinsicGuess"),
            Value::from(true),
            Value::from("UseExtrinsicGuess"),
            Value::from(false),
        ];
        assert!(!parse_options(&pairs)?.use_extrinsic_guess);
        Ok(())
    }

    #[test]
    fn test_parse_options_errors() {
        let unknown = parse_options(&[Value::from("Foo"), Value::from(1.0)]);
        assert!(matches!(unknown, Err(BindError::UnrecognizedOption(ref n)) if n == "Foo"));

        // names are case-sensitive
        let lower = parse_options(&[Value::from("rvec"), Value::empty()]);
        assert!(matches!(lower, Err(BindError::UnrecognizedOption(_))));

        let numeric_name = parse_options(&[Value::from(1.0), Value::from(1.0)]);
        assert!(matches!(
            numeric_name,
            Err(BindError::InvalidArgumentType { .. })
        ));

        let short = parse_options(&[Value::from("Tvec"), Value::matrix(&[[1.0, 2.0]])]);
        assert!(matches!(short, Err(BindError::InvalidArgumentType { ref argument, .. }) if argument == "Tvec"));

        let nan_seed = parse_options(&[Value::from("Rvec"), Value::matrix(&[[0.0, f64::NAN, 0.0]])]);
        assert!(matches!(nan_seed, Err(BindError::InvalidArgumentType { ref argument, .. }) if argument == "Rvec"));

        let flag = parse_options(&[Value::from("UseExtrinsicGuess"), Value::from("yes")]);
        assert!(matches!(flag, Err(BindError::InvalidArgumentType { .. })));
    }

    #[test]
    fn test_guess_requires_both_seeds() {
        let options = PnPOptions {
            use_extrinsic_guess: true,
            rvec: Some([0.0; 3]),
            tvec: None,
        };
        assert!(matches!(
            options.extrinsic_guess(),
            Err(BindError::MissingExtrinsicGuess)
        ));

        let ignored = PnPOptions {
            use_extrinsic_guess: false,
            ..options
        };
        assert!(matches!(ignored.extrinsic_guess(), Ok(None)));
    }
}
