//! Argument transformation between match resolution and invocation.

use crate::arguments::{Argument, Arguments};
use crate::error::TransformError;
use crate::model::MultilineArgument;
use crate::registry::Registry;

use super::guarded;

/// Builds the invocation arguments for a matched step.
///
/// Each capture matched by exactly one scalar transform is replaced by the
/// transform's value; a table matched by exactly one table transform is
/// replaced likewise. Unmatched values pass through unchanged. The multiline
/// argument, if any, is appended last.
///
/// # Errors
///
/// Returns [`TransformError::Ambiguous`] when several transforms match one
/// value and [`TransformError::Failed`] when a transform errors or panics.
pub fn transform_arguments<W>(
    registry: &Registry<W>,
    world: &mut W,
    captures: &[String],
    multiline: Option<&MultilineArgument>,
) -> Result<Arguments, TransformError> {
    let mut items = captures
        .iter()
        .map(|capture| transform_capture(registry, world, capture))
        .collect::<Result<Vec<_>, _>>()?;

    match multiline {
        Some(MultilineArgument::Table(table)) => {
            let signature = table.signature();
            let item = match registry.matching_table_transforms(&signature).as_slice() {
                [] => Argument::Table(table.clone()),
                [transform] => {
                    tracing::trace!(pattern = %transform.pattern(), %signature, "transforming table");
                    let value = guarded(|| transform.invoke(world, table)).map_err(|report| {
                        TransformError::Failed {
                            pattern: transform.pattern().source().to_owned(),
                            value: signature.clone(),
                            details: format!("{report:?}"),
                            source: report.into(),
                        }
                    })?;
                    Argument::Transformed {
                        raw: signature,
                        value,
                    }
                }
                several => {
                    return Err(TransformError::Ambiguous {
                        patterns: several
                            .iter()
                            .map(|transform| transform.pattern().source().to_owned())
                            .collect(),
                        value: signature,
                    });
                }
            };
            items.push(item);
        }
        Some(MultilineArgument::Text(text)) => items.push(Argument::Text(text.clone())),
        None => {}
    }

    Ok(Arguments::new(items))
}

fn transform_capture<W>(
    registry: &Registry<W>,
    world: &mut W,
    capture: &str,
) -> Result<Argument, TransformError> {
    match registry.matching_transforms(capture).as_slice() {
        [] => Ok(Argument::Captured(capture.to_owned())),
        [transform] => {
            tracing::trace!(pattern = %transform.pattern(), value = capture, "transforming argument");
            let groups = transform
                .pattern()
                .captures(capture)
                .filter(|groups| !groups.is_empty())
                .unwrap_or_else(|| vec![capture.to_owned()]);
            let value = guarded(|| transform.invoke(world, &groups)).map_err(|report| {
                TransformError::Failed {
                    pattern: transform.pattern().source().to_owned(),
                    value: capture.to_owned(),
                    details: format!("{report:?}"),
                    source: report.into(),
                }
            })?;
            Ok(Argument::Transformed {
                raw: capture.to_owned(),
                value,
            })
        }
        several => Err(TransformError::Ambiguous {
            value: capture.to_owned(),
            patterns: several
                .iter()
                .map(|transform| transform.pattern().source().to_owned())
                .collect(),
        }),
    }
}
