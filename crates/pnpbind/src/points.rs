use pnpbind_array::{Array, Value};
use pnpbind_pnp::SolverCapabilities;

use crate::error::BindError;

/// Point correspondences, tagged by the form they arrived in.
#[derive(Debug, Clone, PartialEq)]
pub enum PointInput {
    /// `N x 3` object points and `N x 2` image points as numeric matrices.
    Matrices {
        /// Object points, one per row.
        object: Vec<[f64; 3]>,
        /// Image points, one per row.
        image: Vec<[f64; 2]>,
    },
    /// Cells holding one point-like numeric vector per element.
    Lists {
        /// Object points in cell order.
        object: Vec<[f64; 3]>,
        /// Image points in cell order.
        image: Vec<[f64; 2]>,
    },
}

impl PointInput {
    /// Resolve the form of the point arguments and convert them.
    ///
    /// Both arguments must be numeric matrices, or both cells. The cell form
    /// is accepted only when `capabilities.point_lists` is set.
    pub fn classify(
        object: &Value,
        image: &Value,
        capabilities: SolverCapabilities,
    ) -> Result<Self, BindError> {
        let input = match (object, image) {
            (Value::Numeric(o), Value::Numeric(i)) => PointInput::Matrices {
                object: matrix_points::<3>("objectPoints", o)?,
                image: matrix_points::<2>("imagePoints", i)?,
            },
            (Value::Cell(o), Value::Cell(i)) => {
                if !capabilities.point_lists {
                    return Err(BindError::invalid_type(
                        "objectPoints",
                        "point lists are not supported by this solver",
                    ));
                }
                PointInput::Lists {
                    object: list_points("objectPoints", o, Value::to_point3)?,
                    image: list_points("imagePoints", i, Value::to_point2)?,
                }
            }
            _ => {
                return Err(BindError::invalid_type(
                    "objectPoints",
                    format!(
                        "object and image points must both be numeric matrices or both cells, got {} and {}",
                        object.class_name(),
                        image.class_name()
                    ),
                ))
            }
        };

        let (object, image) = input.correspondences();
        if object.len() != image.len() {
            return Err(BindError::invalid_type(
                "imagePoints",
                format!(
                    "{} image points for {} object points",
                    image.len(),
                    object.len()
                ),
            ));
        }
        Ok(input)
    }

    /// The object and image points.
    pub fn correspondences(&self) -> (&[[f64; 3]], &[[f64; 2]]) {
        match self {
            PointInput::Matrices { object, image } | PointInput::Lists { object, image } => {
                (object.as_slice(), image.as_slice())
            }
        }
    }

    /// Number of correspondences.
    pub fn len(&self) -> usize {
        self.correspondences().0.len()
    }

    /// Whether there are no correspondences.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matrix_points<const N: usize>(
    argument: &str,
    m: &Array<f64>,
) -> Result<Vec<[f64; N]>, BindError> {
    let points = m.to_rows::<N>().ok_or_else(|| {
        BindError::invalid_type(
            argument,
            format!("expected an Nx{N} matrix, got {}x{}", m.rows(), m.cols()),
        )
    })?;
    ensure_finite(argument, points.iter().flatten())?;
    Ok(points)
}

fn list_points<const N: usize, E: std::fmt::Display>(
    argument: &str,
    cell: &Array<Value>,
    convert: impl Fn(&Value) -> Result<[f64; N], E>,
) -> Result<Vec<[f64; N]>, BindError> {
    cell.as_slice()
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let element = format!("{argument}{{{}}}", i + 1);
            let point = convert(v).map_err(|e| BindError::invalid_type(&element, e))?;
            ensure_finite(&element, &point)?;
            Ok(point)
        })
        .collect()
}

/// Reject NaN and infinite entries of a numeric argument.
pub(crate) fn ensure_finite<'a>(
    argument: &str,
    values: impl IntoIterator<Item = &'a f64>,
) -> Result<(), BindError> {
    if values.into_iter().any(|v| !v.is_finite()) {
        return Err(BindError::invalid_type(argument, "non-finite value"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WITH_LISTS: SolverCapabilities = SolverCapabilities { point_lists: true };
    const WITHOUT_LISTS: SolverCapabilities = SolverCapabilities { point_lists: false };

    #[test]
    fn test_matrices() -> Result<(), BindError> {
        let object = Value::matrix(&[[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]]);
        let image = Value::matrix(&[[10.0, 20.0], [30.0, 40.0]]);
        let input = PointInput::classify(&object, &image, WITHOUT_LISTS)?;
        assert_eq!(
            input,
            PointInput::Matrices {
                object: vec![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]],
                image: vec![[10.0, 20.0], [30.0, 40.0]],
            }
        );
        assert_eq!(input.len(), 2);
        Ok(())
    }

    #[test]
    fn test_lists() -> Result<(), BindError> {
        let object = Value::cell_row(vec![
            Value::matrix(&[[0.0, 0.0, 0.0]]),
            Value::matrix(&[[1.0], [2.0], [3.0]]),
        ]);
        let image = Value::cell_row(vec![
            Value::matrix(&[[10.0, 20.0]]),
            Value::matrix(&[[30.0, 40.0]]),
        ]);
        let input = PointInput::classify(&object, &image, WITH_LISTS)?;
        let (o, i) = input.correspondences();
        assert!(matches!(input, PointInput::Lists { .. }));
        assert_eq!(o[1], [1.0, 2.0, 3.0]);
        assert_eq!(i[1], [30.0, 40.0]);

        let err = PointInput::classify(&object, &image, WITHOUT_LISTS);
        assert!(matches!(err, Err(BindError::InvalidArgumentType { .. })));
        Ok(())
    }

    #[test]
    fn test_mixed_forms_rejected() {
        let object = Value::matrix(&[[0.0, 0.0, 0.0]]);
        let image = Value::cell_row(vec![Value::matrix(&[[1.0, 2.0]])]);
        assert!(matches!(
            PointInput::classify(&object, &image, WITH_LISTS),
            Err(BindError::InvalidArgumentType { .. })
        ));
        assert!(matches!(
            PointInput::classify(&Value::from("pts"), &Value::from("pts"), WITH_LISTS),
            Err(BindError::InvalidArgumentType { .. })
        ));
    }

    #[test]
    fn test_bad_shapes_rejected() {
        let object = Value::matrix(&[[0.0, 0.0], [1.0, 1.0]]);
        let image = Value::matrix(&[[10.0, 20.0], [30.0, 40.0]]);
        assert!(matches!(
            PointInput::classify(&object, &image, WITH_LISTS),
            Err(BindError::InvalidArgumentType { ref argument, .. }) if argument == "objectPoints"
        ));

        let object = Value::cell_row(vec![Value::matrix(&[[0.0, 0.0, 0.0]]), Value::from(1.0)]);
        let image = Value::cell_row(vec![Value::matrix(&[[1.0, 2.0]]), Value::matrix(&[[1.0, 2.0]])]);
        assert!(matches!(
            PointInput::classify(&object, &image, WITH_LISTS),
            Err(BindError::InvalidArgumentType { ref argument, .. }) if argument == "objectPoints{2}"
        ));

        let object = Value::matrix(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let image = Value::matrix(&[[10.0, 20.0]]);
        assert!(matches!(
            PointInput::classify(&object, &image, WITH_LISTS),
            Err(BindError::InvalidArgumentType { ref argument, .. }) if argument == "imagePoints"
        ));
    }

    #[test]
    fn test_non_finite_points_rejected() {
        let object = Value::matrix(&[[0.0, 0.0, 0.0], [1.0, f64::NAN, 1.0]]);
        let image = Value::matrix(&[[10.0, 20.0], [30.0, 40.0]]);
        assert!(matches!(
            PointInput::classify(&object, &image, WITH_LISTS),
            Err(BindError::InvalidArgumentType { ref argument, ref reason })
                if argument == "objectPoints" && reason == "non-finite value"
        ));

        let object = Value::matrix(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let image = Value::matrix(&[[10.0, 20.0], [f64::INFINITY, 40.0]]);
        assert!(matches!(
            PointInput::classify(&object, &image, WITH_LISTS),
            Err(BindError::InvalidArgumentType { ref argument, .. }) if argument == "imagePoints"
        ));

        let object = Value::cell_row(vec![Value::matrix(&[[0.0, 0.0, 0.0]])]);
        let image = Value::cell_row(vec![Value::matrix(&[[f64::NAN, 2.0]])]);
        assert!(matches!(
            PointInput::classify(&object, &image, WITH_LISTS),
            Err(BindError::InvalidArgumentType { ref argument, .. }) if argument == "imagePoints{1}"
        ));
    }
}
