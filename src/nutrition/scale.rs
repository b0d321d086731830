//! Serving scaling

use crate::models::NutritionProfile;

/// Multiplier turning a dish's native servings into the requested servings
///
/// Unset native servings count as 1, and unset requested servings follow the
/// native count. A native count that is zero, negative, or non-finite cannot
/// be divided by, so the profile passes through unchanged (factor 1).
pub fn serving_factor(native: Option<f64>, requested: Option<f64>) -> f64 {
    let native = native.unwrap_or(1.0);
    if !native.is_finite() || native <= 0.0 {
        tracing::debug!(native, "native servings unusable; not scaling");
        return 1.0;
    }

    let requested = requested.unwrap_or(native);
    let factor = requested / native;
    if !factor.is_finite() || factor < 0.0 {
        tracing::warn!(native, requested, "invalid serving factor; not scaling");
        return 1.0;
    }

    factor
}

/// Scale a profile by a serving factor, returning a new profile
pub fn scale_profile(profile: &NutritionProfile, factor: f64) -> NutritionProfile {
    if !factor.is_finite() {
        return profile.clone();
    }
    profile.scale(factor)
}

/// Scale a profile from native to requested servings
pub fn scale_to_servings(
    profile: &NutritionProfile,
    native: Option<f64>,
    requested: Option<f64>,
) -> NutritionProfile {
    scale_profile(profile, serving_factor(native, requested))
}
