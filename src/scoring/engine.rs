use crate::config::ScoringConfig;
use crate::error::{CoreError, CoreResult};
use crate::models::{CategoryConfig, CategoryRef, GroupRef, PluginReport, RefType, Report};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a binary category decides between 0 and 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinaryScorePolicy {
    #[default]
    WeightedAverage,
    AllRefsPerfect,
}

impl std::fmt::Display for BinaryScorePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryScorePolicy::WeightedAverage => write!(f, "weighted-average"),
            BinaryScorePolicy::AllRefsPerfect => write!(f, "all-refs-perfect"),
        }
    }
}

/// A ref that contributes to a weighted average
pub trait Weighted {
    fn weight(&self) -> f64;
    fn describe(&self) -> String;
}

impl Weighted for GroupRef {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn describe(&self) -> String {
        self.slug.clone()
    }
}

impl Weighted for CategoryRef {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn describe(&self) -> String {
        self.key()
    }
}

/// Weighted average of the scores `score_fn` assigns to `refs`
pub fn calculate_score<R, F>(refs: &[R], mut score_fn: F) -> CoreResult<f64>
where
    R: Weighted,
    F: FnMut(&R) -> CoreResult<f64>,
{
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for r in refs {
        let score = score_fn(r)?;
        weighted_sum += r.weight() * score;
        weight_sum += r.weight();
    }

    if weight_sum == 0.0 {
        let names: Vec<String> = refs.iter().map(Weighted::describe).collect();
        return Err(CoreError::Config(format!(
            "Sum of weights is zero for refs [{}]",
            names.join(", ")
        )));
    }
    Ok(weighted_sum / weight_sum)
}

/// Compute group and category scores, returning a new report
///
/// Audit scores are taken as they are. Refs that do not resolve are
/// `UserInput` errors.
pub fn score_report(report: &Report, config: &ScoringConfig) -> CoreResult<Report> {
    let mut scored = report.clone();

    // (plugin, group) -> score, for category refs
    let mut group_scores: HashMap<(String, String), f64> = HashMap::new();
    for plugin in &mut scored.plugins {
        let scores = plugin_group_scores(plugin)?;
        for (group, score) in plugin.groups.iter_mut().zip(scores) {
            group.score = Some(score);
            group_scores.insert((plugin.slug.clone(), group.slug.clone()), score);
        }
    }

    let plugins = &scored.plugins;
    for category in &mut scored.categories {
        let score = category_score(category, plugins, &group_scores, config.binary_policy)?;
        category.score = Some(score);
    }

    Ok(scored)
}

fn plugin_group_scores(plugin: &PluginReport) -> CoreResult<Vec<f64>> {
    plugin
        .groups
        .iter()
        .map(|group| {
            calculate_score(&group.refs, |r| {
                plugin.audit(&r.slug).map(|a| a.score).ok_or_else(|| {
                    CoreError::UserInput(format!(
                        "Group {} has invalid ref - audit with slug {} not found in {} plugin",
                        group.slug, r.slug, plugin.slug
                    ))
                })
            })
        })
        .collect()
}

fn category_score(
    category: &CategoryConfig,
    plugins: &[PluginReport],
    group_scores: &HashMap<(String, String), f64>,
    policy: BinaryScorePolicy,
) -> CoreResult<f64> {
    let resolve = |r: &CategoryRef| -> CoreResult<f64> {
        let not_found = || {
            CoreError::UserInput(format!(
                "Category {} has invalid ref - {} with slug {} not found in {} plugin",
                category.slug, r.ref_type, r.slug, r.plugin
            ))
        };
        let plugin = plugins
            .iter()
            .find(|p| p.slug == r.plugin)
            .ok_or_else(not_found)?;
        match r.ref_type {
            RefType::Audit => plugin.audit(&r.slug).map(|a| a.score).ok_or_else(not_found),
            RefType::Group => group_scores
                .get(&(r.plugin.clone(), r.slug.clone()))
                .copied()
                .ok_or_else(not_found),
        }
    };

    let average = calculate_score(&category.refs, resolve)?;
    if !category.is_binary {
        return Ok(average);
    }

    let passed = match policy {
        BinaryScorePolicy::WeightedAverage => average == 1.0,
        BinaryScorePolicy::AllRefsPerfect => {
            let mut all_perfect = true;
            for r in &category.refs {
                all_perfect &= resolve(r)? == 1.0;
            }
            all_perfect
        }
    };
    Ok(if passed { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::report_mock;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn binary_category() -> CategoryConfig {
        CategoryConfig {
            slug: "no-regressions".into(),
            title: "No regressions".into(),
            description: None,
            docs_url: None,
            is_binary: true,
            refs: vec![
                CategoryRef {
                    ref_type: RefType::Audit,
                    plugin: "eslint".into(),
                    slug: "eslint-functional".into(),
                    weight: 1.0,
                },
                CategoryRef {
                    ref_type: RefType::Audit,
                    plugin: "eslint".into(),
                    slug: "typescript-eslint-typing".into(),
                    weight: 0.0,
                },
            ],
            score: None,
        }
    }

    #[test]
    fn test_weighted_average() {
        let refs = vec![
            GroupRef { slug: "a".into(), weight: 3.0 },
            GroupRef { slug: "b".into(), weight: 1.0 },
        ];
        let score = calculate_score(&refs, |r| Ok(if r.slug == "a" { 0.5 } else { 1.0 }))
            .expect("score");
        assert_eq!(score, 0.625);
    }

    #[test]
    fn test_zero_weight_is_ignored() {
        let refs = vec![
            GroupRef { slug: "a".into(), weight: 1.0 },
            GroupRef { slug: "b".into(), weight: 0.0 },
        ];
        let score = calculate_score(&refs, |r| Ok(if r.slug == "a" { 0.8 } else { 0.0 }))
            .expect("score");
        assert!(approx(score, 0.8));
    }

    #[test]
    fn test_zero_weight_sum_is_config_error() {
        let refs = vec![GroupRef { slug: "a".into(), weight: 0.0 }];
        let err = calculate_score(&refs, |_| Ok(1.0)).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_score_report() {
        let report = report_mock();
        let scored = score_report(&report, &ScoringConfig::default()).expect("score report");

        let group = scored.plugins[1].group("typescript-eslint").expect("group");
        assert!(approx(group.score.expect("group score"), 0.25));
        assert!(approx(scored.categories[0].score.expect("score"), 0.625));
        assert!(approx(scored.categories[1].score.expect("score"), 3.0 / 9.0));

        // Input untouched
        assert!(report.categories[0].score.is_none());
        assert_eq!(report.plugins[0].audits, scored.plugins[0].audits);
    }

    #[test]
    fn test_unresolved_category_ref() {
        let mut report = report_mock();
        report.categories[0].refs[0].slug = "cypress-unit-tests".into();
        let err = score_report(&report, &ScoringConfig::default()).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, CoreError::UserInput(_)));
        assert!(msg.contains("audit"));
        assert!(msg.contains("cypress-unit-tests"));
        assert!(msg.contains("cypress"));
    }

    #[test]
    fn test_unresolved_group_ref() {
        let mut report = report_mock();
        report.plugins[1].groups[0].refs[0].slug = "gone".into();
        let err = score_report(&report, &ScoringConfig::default()).unwrap_err();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_binary_weighted_average_policy() {
        let mut report = report_mock();
        report.categories.push(binary_category());
        let scored = score_report(&report, &ScoringConfig::default()).expect("score");
        assert_eq!(scored.categories[2].score, Some(1.0));
    }

    #[test]
    fn test_binary_all_refs_perfect_policy() {
        let mut report = report_mock();
        report.categories.push(binary_category());
        let config = ScoringConfig {
            binary_policy: BinaryScorePolicy::AllRefsPerfect,
        };
        let scored = score_report(&report, &config).expect("score");
        assert_eq!(scored.categories[2].score, Some(0.0));
    }

    #[test]
    fn test_binary_fails_below_one() {
        let mut report = report_mock();
        let mut category = binary_category();
        category.refs[1].weight = 1.0;
        report.categories.push(category);
        let scored = score_report(&report, &ScoringConfig::default()).expect("score");
        assert_eq!(scored.categories[2].score, Some(0.0));
    }
}
