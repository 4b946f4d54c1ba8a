use std::collections::BTreeMap;

use crate::schema::{ActionBounds, ActionRemap};

/// Why a raw action could not be remapped: the offending field and a reason.
pub(crate) type RemapFailure = (String, String);

/// Applies `remap` to a raw action map, producing `(action, mask)` of width
/// `dim`. Dimensions the remap does not write are zero with mask `false`.
pub(crate) fn remap(
    remap: &ActionRemap,
    raw: &BTreeMap<String, Vec<f32>>,
    dim: usize,
) -> Result<(Vec<f32>, Vec<bool>), RemapFailure> {
    let mut action = vec![0.0; dim];
    let mut mask = vec![false; dim];

    match remap {
        ActionRemap::Select { dims } => {
            for (out, source) in dims.iter().enumerate() {
                let Some(source) = source else { continue };
                let values = lookup(raw, &source.key)?;
                let value = values.get(source.index).copied().ok_or_else(|| {
                    (
                        field(&source.key),
                        format!("index {} out of range for length {}", source.index, values.len()),
                    )
                })?;
                action[out] = value * source.scale + source.offset;
                mask[out] = true;
            }
        }
        ActionRemap::Linear { key, matrix, bias } => {
            let values = lookup(raw, key)?;
            for (out, row) in matrix.iter().enumerate() {
                if row.len() != values.len() {
                    return Err((
                        field(key),
                        format!("expected length {}, found {}", row.len(), values.len()),
                    ));
                }
                let dot: f32 = row.iter().zip(values).map(|(w, v)| w * v).sum();
                action[out] = dot + bias.get(out).copied().unwrap_or(0.0);
                mask[out] = true;
            }
        }
    }
    Ok((action, mask))
}

/// Clips the populated dimensions into `bounds`; zero-filled ones stay zero.
pub(crate) fn clip(action: &mut [f32], mask: &[bool], bounds: &ActionBounds) {
    for (i, value) in action.iter_mut().enumerate() {
        if mask[i] {
            *value = value.clamp(bounds.low[i], bounds.high[i]);
        }
    }
}

fn lookup<'a>(raw: &'a BTreeMap<String, Vec<f32>>, key: &str) -> Result<&'a [f32], RemapFailure> {
    let values = raw
        .get(key)
        .ok_or_else(|| (field(key), "missing required action field".to_string()))?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err((field(key), "non-finite action value".to_string()));
    }
    Ok(values)
}

fn field(key: &str) -> String {
    format!("action.{key}")
}
