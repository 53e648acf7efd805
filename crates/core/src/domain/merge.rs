use crate::domain::params::RecommendationQueryParams;
use crate::domain::preferences::UserPreferences;

/// Combine saved preferences with explicit filters into the effective query.
///
/// Explicit values win field by field. Preferences only ever supply the
/// investment-style filters (`holding_period`, `risk_level`); confidence and
/// sort options come from the explicit params alone. `None` means "no opinion
/// from either side" and is distinct from an empty params value.
pub fn merge_preferences_with_params(
    preferences: Option<&UserPreferences>,
    explicit: Option<&RecommendationQueryParams>,
) -> Option<RecommendationQueryParams> {
    match (preferences, explicit) {
        (None, None) => None,
        (None, Some(explicit)) => Some(*explicit),
        (Some(prefs), None) => Some(RecommendationQueryParams {
            holding_period: Some(prefs.holding_period),
            risk_level: Some(prefs.risk_tolerance),
            ..Default::default()
        }),
        (Some(prefs), Some(explicit)) => Some(RecommendationQueryParams {
            holding_period: explicit.holding_period.or(Some(prefs.holding_period)),
            risk_level: explicit.risk_level.or(Some(prefs.risk_tolerance)),
            confidence_min: explicit.confidence_min,
            sort_by: explicit.sort_by,
            sort_direction: explicit.sort_direction,
        }),
    }
}
