use crate::engine::catalog::{ExerciseCatalog, ExerciseConfig, SupportTool, SupportToolCatalog};
use crate::engine::profile::Profile;
use crate::engine::types::ChallengeArea;

fn overlap(profile_areas: &[ChallengeArea], target: &[ChallengeArea]) -> usize {
    target
        .iter()
        .filter(|area| profile_areas.contains(area))
        .count()
}

/// Exercises whose challenge areas intersect the profile's, most relevant
/// first. Ties on overlap break toward the easier catalog entry, then
/// catalog order.
pub fn recommend_exercises(profile: &Profile, catalog: &ExerciseCatalog) -> Vec<ExerciseConfig> {
    let mut matches: Vec<(usize, ExerciseConfig)> = catalog
        .entries()
        .iter()
        .filter_map(|entry| {
            let n = overlap(&profile.challenge_areas, entry.challenge_areas);
            if n > 0 {
                Some((n, *entry))
            } else {
                None
            }
        })
        .collect();

    matches.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then(a.1.difficulty.cmp(&b.1.difficulty))
    });
    matches.into_iter().map(|(_, entry)| entry).collect()
}

/// Support tools matching the profile's challenge areas, capped at the
/// profile's recommended support level. Lighter tools rank first on ties.
pub fn recommend_support_tools(profile: &Profile, catalog: &SupportToolCatalog) -> Vec<SupportTool> {
    let mut matches: Vec<(usize, SupportTool)> = catalog
        .entries()
        .iter()
        .filter_map(|tool| {
            if tool.support_level > profile.recommended_support_level {
                return None;
            }
            let n = overlap(&profile.challenge_areas, tool.target_challenge_areas);
            if n > 0 {
                Some((n, *tool))
            } else {
                None
            }
        })
        .collect();

    matches.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then(a.1.support_level.cmp(&b.1.support_level))
    });
    matches.into_iter().map(|(_, tool)| tool).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{ExerciseKind, SupportLevel};

    fn profile_with(areas: &[ChallengeArea], level: SupportLevel) -> Profile {
        Profile {
            challenge_areas: areas.to_vec(),
            recommended_support_level: level,
            ..Profile::default()
        }
    }

    #[test]
    fn visual_spatial_profile_gets_spatial_exercises_only() {
        let profile = profile_with(
            &[ChallengeArea::VisualSpatialSketchpad],
            SupportLevel::Moderate,
        );
        let exercises = recommend_exercises(&profile, &ExerciseCatalog::builtin());
        let kinds: Vec<ExerciseKind> = exercises.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ExerciseKind::PatternMemory, ExerciseKind::SpatialLocation],
            "easier spatial exercise first, no sequential entries"
        );
    }

    #[test]
    fn higher_overlap_outranks_lower_difficulty() {
        let profile = profile_with(
            &[
                ChallengeArea::CentralExecutive,
                ChallengeArea::PhonologicalLoop,
            ],
            SupportLevel::Moderate,
        );
        let exercises = recommend_exercises(&profile, &ExerciseCatalog::builtin());
        let kinds: Vec<ExerciseKind> = exercises.iter().map(|e| e.kind).collect();
        // Both sequential exercises overlap on two areas; the spatial ones
        // overlap on none and disappear.
        assert_eq!(
            kinds,
            vec![ExerciseKind::DigitSpan, ExerciseKind::ReverseDigitSpan]
        );
    }

    #[test]
    fn tools_never_exceed_the_recommended_support_level() {
        let profile = profile_with(
            &[ChallengeArea::VisualSpatialSketchpad],
            SupportLevel::Moderate,
        );
        let tools = recommend_support_tools(&profile, &SupportToolCatalog::builtin());
        assert!(!tools.is_empty());
        assert!(
            tools
                .iter()
                .all(|t| t.support_level <= SupportLevel::Moderate),
            "comprehensive tools must be filtered out"
        );
    }

    #[test]
    fn comprehensive_profile_sees_the_full_ladder() {
        let profile = profile_with(
            &[ChallengeArea::CentralExecutive],
            SupportLevel::Comprehensive,
        );
        let tools = recommend_support_tools(&profile, &SupportToolCatalog::builtin());
        assert!(tools
            .iter()
            .any(|t| t.support_level == SupportLevel::Comprehensive));
    }

    #[test]
    fn ties_order_lighter_tools_first() {
        let profile = profile_with(
            &[
                ChallengeArea::CentralExecutive,
                ChallengeArea::PhonologicalLoop,
            ],
            SupportLevel::Moderate,
        );
        let tools = recommend_support_tools(&profile, &SupportToolCatalog::builtin());
        let levels: Vec<SupportLevel> = tools.iter().map(|t| t.support_level).collect();
        let mut sorted = levels.clone();
        sorted.sort();
        assert_eq!(levels, sorted, "equal-overlap tools sort by level");
    }

    #[test]
    fn ordering_is_deterministic() {
        let profile = profile_with(
            &[
                ChallengeArea::VisualSpatialSketchpad,
                ChallengeArea::EpisodicBuffer,
            ],
            SupportLevel::Substantial,
        );
        let catalog = ExerciseCatalog::builtin();
        let tools = SupportToolCatalog::builtin();
        let first = recommend_exercises(&profile, &catalog);
        let second = recommend_exercises(&profile, &catalog);
        assert_eq!(first, second);
        assert_eq!(
            recommend_support_tools(&profile, &tools),
            recommend_support_tools(&profile, &tools)
        );
    }
}
