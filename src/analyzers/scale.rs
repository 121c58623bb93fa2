use std::collections::BTreeMap;

use crate::error::{PipelineError, Result};
use crate::records::Region;

/// Computes overlay multipliers so every series peaks at the same height.
///
/// The first region in `maxima` (by [`Region`] ordering, so `Local` when
/// present) is the primary series and keeps a factor of 1.0. Every other
/// region gets `primary_max / region_max`.
///
/// | primary max | secondary max | secondary factor |
/// |-------------|---------------|------------------|
/// | 20          | 400           | 0.05             |
/// | 12          | 3             | 4.0              |
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateSeries`] naming the first region whose
/// maximum is zero (or not a positive finite number).
pub fn axis_scales(maxima: &BTreeMap<Region, f64>) -> Result<BTreeMap<Region, f64>> {
    let mut iter = maxima.iter();
    let Some((&primary, &primary_max)) = iter.next() else {
        return Ok(BTreeMap::new());
    };

    if !is_scalable(primary_max) {
        return Err(PipelineError::DegenerateSeries { region: primary });
    }

    let mut scales = BTreeMap::from([(primary, 1.0)]);
    for (&region, &max) in iter {
        if !is_scalable(max) {
            return Err(PipelineError::DegenerateSeries { region });
        }
        scales.insert(region, primary_max / max);
    }

    Ok(scales)
}

/// 1:1 multipliers for every region, used when scaling is undefined.
pub fn unscaled(maxima: &BTreeMap<Region, f64>) -> BTreeMap<Region, f64> {
    maxima.keys().map(|&region| (region, 1.0)).collect()
}

fn is_scalable(max: f64) -> bool {
    max.is_finite() && max > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secondary_scaled_to_primary_peak() {
        let maxima = BTreeMap::from([(Region::Local, 20.0), (Region::County, 400.0)]);
        let scales = axis_scales(&maxima).unwrap();

        assert_eq!(scales[&Region::Local], 1.0);
        assert!((scales[&Region::County] - 0.05).abs() < 1e-12);
        assert!((400.0 * scales[&Region::County] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_secondary_smaller_than_primary_is_scaled_up() {
        let maxima = BTreeMap::from([(Region::Local, 12.0), (Region::County, 3.0)]);
        assert_eq!(axis_scales(&maxima).unwrap()[&Region::County], 4.0);
    }

    #[test]
    fn test_single_region_gets_unit_scale() {
        let maxima = BTreeMap::from([(Region::County, 250.0)]);
        let scales = axis_scales(&maxima).unwrap();

        assert_eq!(scales.len(), 1);
        assert_eq!(scales[&Region::County], 1.0);
    }

    #[test]
    fn test_zero_secondary_is_degenerate() {
        let maxima = BTreeMap::from([(Region::Local, 20.0), (Region::County, 0.0)]);

        assert!(matches!(
            axis_scales(&maxima),
            Err(PipelineError::DegenerateSeries {
                region: Region::County
            })
        ));
    }

    #[test]
    fn test_zero_primary_is_degenerate() {
        let maxima = BTreeMap::from([(Region::Local, 0.0), (Region::County, 10.0)]);

        assert!(matches!(
            axis_scales(&maxima),
            Err(PipelineError::DegenerateSeries {
                region: Region::Local
            })
        ));
    }

    #[test]
    fn test_unscaled_is_one_to_one() {
        let maxima = BTreeMap::from([(Region::Local, 0.0), (Region::County, 10.0)]);
        let scales = unscaled(&maxima);

        assert_eq!(scales[&Region::Local], 1.0);
        assert_eq!(scales[&Region::County], 1.0);
    }

    #[test]
    fn test_no_series() {
        assert!(axis_scales(&BTreeMap::new()).unwrap().is_empty());
    }
}
