//! Rubric evaluation
//!
//! Maps each competency's achieved score onto the rubric band that covers it
//! and assembles the [`PerformanceReview`] shown to the learner.
//!
//! Bands are chosen per difficulty tier: a competency may author its own
//! bands for a tier, otherwise the shared bands apply.
//!
//! A score that no band covers, or that more than one band covers, is a
//! data-quality problem of the rubric rather than a runtime failure. The
//! competency is reported as unscored with the reason, and every other
//! competency in the same call still resolves.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::difficulty::DifficultyTier;
use crate::error::{Error, Result};

use super::band::ScoreRange;
use super::store::{Competency, RubricEntry};
use super::transcript::TranscriptSummary;

// ─────────────────────────────────────────────────────────────────
// Parsed Rubric
// ─────────────────────────────────────────────────────────────────

/// A rubric entry with its score range parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub entry: RubricEntry,
    pub range: ScoreRange,
}

/// A competency whose bands have all been parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetencyRubric {
    pub competency: Competency,
    /// Shared bands.
    pub bands: Vec<Band>,
    pub tier_bands: BTreeMap<DifficultyTier, Vec<Band>>,
}

/// Authoring problem found in a rubric.
#[derive(Debug, Clone, PartialEq)]
pub enum RubricIssue {
    NoBands,
    /// Whole scores between two adjacent bands that neither covers.
    Gap { after: String, before: String },
    Overlap { first: String, second: String },
}

impl fmt::Display for RubricIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RubricIssue::NoBands => write!(f, "competency has no rubric bands"),
            RubricIssue::Gap { after, before } => {
                write!(f, "gap between bands {} and {}", after, before)
            }
            RubricIssue::Overlap { first, second } => {
                write!(f, "bands {} and {} overlap", first, second)
            }
        }
    }
}

impl CompetencyRubric {
    /// Parse every band of a competency, failing on the first malformed range.
    pub fn load(competency: Competency) -> Result<Self> {
        let bands = parse_bands(&competency.id, &competency.rubrics)?;
        let tier_bands = competency
            .tiers
            .iter()
            .map(|(tier, entries)| parse_bands(&competency.id, entries).map(|bands| (*tier, bands)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            competency,
            bands,
            tier_bands,
        })
    }

    /// Bands that apply at `tier`.
    pub fn bands_for(&self, tier: DifficultyTier) -> &[Band] {
        self.tier_bands.get(&tier).unwrap_or(&self.bands)
    }

    /// Gaps and overlaps in every band set. Scores are authored on a
    /// whole-number scale, so bands "1-2" and "3-4" are contiguous.
    pub fn issues(&self) -> Vec<RubricIssue> {
        let mut issues = Vec::new();
        if DifficultyTier::all().iter().any(|t| self.bands_for(*t).is_empty()) {
            issues.push(RubricIssue::NoBands);
        }
        issues.extend(layout_issues(&self.bands));
        for bands in self.tier_bands.values() {
            issues.extend(layout_issues(bands));
        }
        issues
    }

    /// Pick the band covering `score` among the bands for `tier`.
    pub fn select(&self, tier: DifficultyTier, score: Option<f64>) -> BandSelection {
        let score = match score {
            None => return BandSelection::unscored(UnscoredReason::MissingScore),
            Some(s) if !s.is_finite() => return BandSelection::unscored(UnscoredReason::InvalidScore),
            Some(s) => s,
        };

        let matches: Vec<&Band> = self
            .bands_for(tier)
            .iter()
            .filter(|b| b.range.contains(score))
            .collect();
        match matches.as_slice() {
            [] => BandSelection::unscored(UnscoredReason::NoMatchingBand),
            [band] => BandSelection::Scored {
                entry: band.entry.clone(),
                range: band.range,
            },
            many => BandSelection::unscored(UnscoredReason::OverlappingBands {
                entry_ids: many.iter().map(|b| b.entry.id.clone()).collect(),
            }),
        }
    }
}

fn parse_bands(competency_id: &str, entries: &[RubricEntry]) -> Result<Vec<Band>> {
    entries
        .iter()
        .map(|entry| {
            ScoreRange::parse(&entry.score_range)
                .map(|range| Band {
                    entry: entry.clone(),
                    range,
                })
                .map_err(|reason| Error::ScoreRangeMalformed {
                    competency_id: competency_id.to_string(),
                    entry_id: entry.id.clone(),
                    raw: entry.score_range.clone(),
                    reason,
                })
        })
        .collect()
}

fn layout_issues(bands: &[Band]) -> Vec<RubricIssue> {
    let mut issues = Vec::new();
    for (i, a) in bands.iter().enumerate() {
        for b in &bands[i + 1..] {
            if a.range.overlaps(&b.range) {
                issues.push(RubricIssue::Overlap {
                    first: a.entry.id.clone(),
                    second: b.entry.id.clone(),
                });
            }
        }
    }

    let mut sorted: Vec<&Band> = bands.iter().collect();
    sorted.sort_by(|a, b| a.range.low.total_cmp(&b.range.low));
    for pair in sorted.windows(2) {
        if pair[1].range.low > pair[0].range.high + 1.0 {
            issues.push(RubricIssue::Gap {
                after: pair[0].entry.id.clone(),
                before: pair[1].entry.id.clone(),
            });
        }
    }
    issues
}

// ─────────────────────────────────────────────────────────────────
// Review Types
// ─────────────────────────────────────────────────────────────────

/// Why a competency could not be scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UnscoredReason {
    /// No band covers the score.
    NoMatchingBand,
    /// More than one band covers the score.
    #[serde(rename_all = "camelCase")]
    OverlappingBands { entry_ids: Vec<String> },
    /// No score was supplied for the competency.
    MissingScore,
    /// The supplied score is not a finite number.
    InvalidScore,
}

impl fmt::Display for UnscoredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnscoredReason::NoMatchingBand => write!(f, "no rubric band covers the score"),
            UnscoredReason::OverlappingBands { entry_ids } => {
                write!(f, "overlapping rubric bands {}", entry_ids.join(", "))
            }
            UnscoredReason::MissingScore => write!(f, "no score recorded"),
            UnscoredReason::InvalidScore => write!(f, "score is not a number"),
        }
    }
}

/// Band chosen for a competency, or the explicit unscored marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BandSelection {
    Scored { entry: RubricEntry, range: ScoreRange },
    Unscored { reason: UnscoredReason },
}

impl BandSelection {
    fn unscored(reason: UnscoredReason) -> Self {
        BandSelection::Unscored { reason }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, BandSelection::Scored { .. })
    }

    /// Criteria text of the matched band.
    pub fn criteria(&self) -> Option<&str> {
        match self {
            BandSelection::Scored { entry, .. } => Some(&entry.criteria),
            BandSelection::Unscored { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyReview {
    pub competency_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub selection: BandSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectation: Option<String>,
}

/// Structured review of one completed session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReview {
    /// Tier whose bands were applied.
    pub difficulty: DifficultyTier,
    pub competencies: Vec<CompetencyReview>,
    /// Mean of the scored competencies, one decimal.
    pub overall_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_expectation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<TranscriptSummary>,
    pub analysis: String,
    #[serde(skip)]
    analysis_supplied: bool,
}

impl PerformanceReview {
    pub fn scored(&self) -> impl Iterator<Item = &CompetencyReview> {
        self.competencies.iter().filter(|c| c.selection.is_scored())
    }

    pub fn unscored(&self) -> impl Iterator<Item = &CompetencyReview> {
        self.competencies.iter().filter(|c| !c.selection.is_scored())
    }

    /// Attach engagement facts. A generated analysis is rewritten to mention them.
    pub fn with_transcript(mut self, summary: TranscriptSummary) -> Self {
        self.transcript = Some(summary);
        if !self.analysis_supplied {
            self.analysis = narrative(&self);
        }
        self
    }

    /// Replace the generated analysis with collaborator-written text.
    pub fn with_analysis(mut self, analysis: impl Into<String>) -> Self {
        let analysis = analysis.into();
        if !analysis.trim().is_empty() {
            self.analysis = analysis;
            self.analysis_supplied = true;
        }
        self
    }
}

// ─────────────────────────────────────────────────────────────────
// Evaluation
// ─────────────────────────────────────────────────────────────────

/// Qualitative reading of a score on the 10-point scale.
pub fn expectation(score: f64) -> &'static str {
    if score >= 9.0 {
        "Outstanding performance that exceeds expectations."
    } else if score >= 7.0 {
        "Strong performance that meets expectations."
    } else if score >= 5.0 {
        "Satisfactory performance with room for improvement."
    } else if score >= 3.0 {
        "Below expectations. Significant improvement needed."
    } else {
        "Critical improvement required. Performance is unacceptable."
    }
}

/// Evaluate raw competencies at `tier`. Fails only on a malformed score range.
pub fn evaluate(
    competencies: &[Competency],
    scores: &HashMap<String, f64>,
    tier: DifficultyTier,
) -> Result<PerformanceReview> {
    let rubrics = competencies
        .iter()
        .cloned()
        .map(CompetencyRubric::load)
        .collect::<Result<Vec<_>>>()?;
    Ok(evaluate_rubrics(&rubrics, scores, tier))
}

/// Evaluate pre-parsed rubrics at `tier`. Output follows input order.
pub fn evaluate_rubrics<'a, I>(rubrics: I, scores: &HashMap<String, f64>, tier: DifficultyTier) -> PerformanceReview
where
    I: IntoIterator<Item = &'a CompetencyRubric>,
{
    let competencies: Vec<CompetencyReview> = rubrics
        .into_iter()
        .map(|rubric| review_competency(rubric, tier, scores.get(&rubric.competency.id).copied()))
        .collect();

    let scored: Vec<f64> = competencies
        .iter()
        .filter(|c| c.selection.is_scored())
        .filter_map(|c| c.score)
        .collect();
    let overall_score = (!scored.is_empty())
        .then(|| round_tenth(scored.iter().sum::<f64>() / scored.len() as f64));

    let mut review = PerformanceReview {
        difficulty: tier,
        competencies,
        overall_score,
        overall_expectation: overall_score.map(|s| expectation(s).to_string()),
        transcript: None,
        analysis: String::new(),
        analysis_supplied: false,
    };
    review.analysis = narrative(&review);

    debug!(
        difficulty = %tier,
        competencies = review.competencies.len(),
        scored = scored.len(),
        overall = ?review.overall_score,
        "Performance review assembled"
    );
    review
}

fn review_competency(rubric: &CompetencyRubric, tier: DifficultyTier, score: Option<f64>) -> CompetencyReview {
    let selection = rubric.select(tier, score);
    if let BandSelection::Unscored { reason } = &selection {
        warn!(
            competency = %rubric.competency.id,
            difficulty = %tier,
            score = ?score,
            reason = %reason,
            "Competency left unscored"
        );
    }

    let expectation = match &selection {
        BandSelection::Scored { .. } => score.map(|s| expectation(s).to_string()),
        BandSelection::Unscored { .. } => None,
    };

    CompetencyReview {
        competency_id: rubric.competency.id.clone(),
        name: rubric.competency.name.clone(),
        score: score.filter(|s| s.is_finite()),
        selection,
        expectation,
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Deterministic summary used when no collaborator narrative is supplied.
fn narrative(review: &PerformanceReview) -> String {
    let total = review.competencies.len();
    if total == 0 {
        return "No competencies were evaluated.".to_string();
    }

    let scored: Vec<&CompetencyReview> = review.scored().collect();
    let mut parts = vec![format!("{} of {} competencies scored.", scored.len(), total)];

    if let (Some(overall), Some(reading)) = (review.overall_score, &review.overall_expectation) {
        parts.push(format!("Overall score {}: {}", overall, reading));
    }

    let by_score = |a: &&&CompetencyReview, b: &&&CompetencyReview| {
        a.score.unwrap_or_default().total_cmp(&b.score.unwrap_or_default())
    };
    if let (Some(best), Some(worst)) = (scored.iter().max_by(by_score), scored.iter().min_by(by_score)) {
        if best.score != worst.score {
            parts.push(format!(
                "Strongest: {} ({}). Weakest: {} ({}).",
                best.name,
                best.score.unwrap_or_default(),
                worst.name,
                worst.score.unwrap_or_default()
            ));
        }
    }

    let unscored: Vec<String> = review
        .unscored()
        .map(|c| match &c.selection {
            BandSelection::Unscored { reason } => format!("{} ({})", c.name, reason),
            BandSelection::Scored { .. } => c.name.clone(),
        })
        .collect();
    if !unscored.is_empty() {
        parts.push(format!("Not scored: {}.", unscored.join("; ")));
    }

    if let Some(t) = review.transcript.as_ref().filter(|t| t.low_engagement) {
        parts.push(format!(
            "The learner sent only {} message(s), which indicates minimal engagement.",
            t.learner_turns
        ));
    }

    parts.join(" ")
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::transcript::{Role, Turn};

    const EASY: DifficultyTier = DifficultyTier::Beginner;

    fn entry(id: &str, range: &str, criteria: &str) -> RubricEntry {
        RubricEntry {
            id: id.into(),
            competency_id: String::new(),
            score_range: range.into(),
            criteria: criteria.into(),
        }
    }

    fn entries(bands: &[(&str, &str, &str)]) -> Vec<RubricEntry> {
        bands.iter().map(|(i, r, c)| entry(i, r, c)).collect()
    }

    fn competency(id: &str, bands: &[(&str, &str, &str)]) -> Competency {
        Competency::new(id, id.to_uppercase(), entries(bands))
    }

    fn three_band(id: &str) -> Competency {
        competency(
            id,
            &[("low", "0\u{2013}4", "low"), ("mid", "5\u{2013}7", "mid"), ("high", "8\u{2013}9", "high")],
        )
    }

    fn scores(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_selects_covering_band() {
        let review = evaluate(&[three_band("communication")], &scores(&[("communication", 6.0)]), EASY)
            .unwrap();
        let c = &review.competencies[0];
        assert_eq!(c.selection.criteria(), Some("mid"));
        assert_eq!(c.expectation.as_deref(), Some("Satisfactory performance with room for improvement."));
        assert_eq!(review.overall_score, Some(6.0));
    }

    #[test]
    fn test_gap_is_unscored_for_that_competency_only() {
        let review = evaluate(
            &[three_band("a"), three_band("b")],
            &scores(&[("a", 10.0), ("b", 8.0)]),
            EASY,
        )
        .unwrap();

        assert_eq!(
            review.competencies[0].selection,
            BandSelection::Unscored { reason: UnscoredReason::NoMatchingBand }
        );
        assert!(review.competencies[0].expectation.is_none());
        assert_eq!(review.competencies[1].selection.criteria(), Some("high"));
        assert_eq!(review.overall_score, Some(8.0));
    }

    #[test]
    fn test_overlap_is_reported_not_guessed() {
        let c = competency("x", &[("a", "1-5", "a"), ("b", "5-9", "b")]);
        let review = evaluate(&[c], &scores(&[("x", 5.0)]), EASY).unwrap();
        match &review.competencies[0].selection {
            BandSelection::Unscored { reason: UnscoredReason::OverlappingBands { entry_ids } } => {
                assert_eq!(entry_ids, &vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("Expected overlap, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_and_invalid_scores() {
        let review = evaluate(
            &[three_band("a"), three_band("b")],
            &scores(&[("b", f64::NAN)]),
            EASY,
        )
        .unwrap();
        assert_eq!(
            review.competencies[0].selection,
            BandSelection::Unscored { reason: UnscoredReason::MissingScore }
        );
        assert_eq!(
            review.competencies[1].selection,
            BandSelection::Unscored { reason: UnscoredReason::InvalidScore }
        );
        assert!(review.competencies[1].score.is_none());
        assert!(review.overall_score.is_none());
    }

    #[test]
    fn test_malformed_range_is_error() {
        let c = competency("x", &[("bad", "lots", "?")]);
        let err = evaluate(&[c], &HashMap::new(), EASY).unwrap_err();
        assert!(matches!(err, Error::ScoreRangeMalformed { .. }));
    }

    #[test]
    fn test_preserves_input_order() {
        let ids = ["zeta", "alpha", "mu"];
        let comps: Vec<Competency> = ids.iter().map(|id| three_band(id)).collect();
        let review = evaluate(&comps, &HashMap::new(), EASY).unwrap();
        let order: Vec<&str> = review.competencies.iter().map(|c| c.competency_id.as_str()).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn test_overall_is_mean_of_scored() {
        let review = evaluate(
            &[three_band("a"), three_band("b"), three_band("c")],
            &scores(&[("a", 3.0), ("b", 8.0), ("c", 9.5)]),
            EASY,
        )
        .unwrap();
        assert_eq!(review.overall_score, Some(5.5));
        assert!(review.analysis.contains("Strongest: B (8). Weakest: A (3)."));
        assert!(review.analysis.contains("Not scored: C (no rubric band covers the score)."));
    }

    #[test]
    fn test_expectation_thresholds() {
        assert_eq!(expectation(10.0), "Outstanding performance that exceeds expectations.");
        assert_eq!(expectation(7.0), "Strong performance that meets expectations.");
        assert_eq!(expectation(5.5), "Satisfactory performance with room for improvement.");
        assert_eq!(expectation(3.0), "Below expectations. Significant improvement needed.");
        assert_eq!(expectation(2.9), "Critical improvement required. Performance is unacceptable.");
    }

    #[test]
    fn test_transcript_updates_generated_analysis() {
        let review = evaluate(&[three_band("a")], &scores(&[("a", 6.0)]), EASY)
            .unwrap()
            .with_transcript(TranscriptSummary::from_turns(&[Turn::new(Role::Learner, "hi")]));
        assert!(review.analysis.contains("only 1 message(s)"));

        let supplied = evaluate(&[three_band("a")], &scores(&[("a", 6.0)]), EASY)
            .unwrap()
            .with_analysis("Good discovery questions.")
            .with_transcript(TranscriptSummary::from_turns(&[]));
        assert_eq!(supplied.analysis, "Good discovery questions.");
    }

    #[test]
    fn test_issues() {
        let rubric = CompetencyRubric::load(three_band("a")).unwrap();
        assert!(rubric.issues().is_empty());

        let gappy = CompetencyRubric::load(competency("g", &[("a", "1-2", ""), ("b", "5-6", "")])).unwrap();
        assert_eq!(
            gappy.issues(),
            vec![RubricIssue::Gap { after: "a".into(), before: "b".into() }]
        );

        let empty = CompetencyRubric::load(competency("e", &[])).unwrap();
        assert_eq!(empty.issues(), vec![RubricIssue::NoBands]);
    }

    #[test]
    fn test_tier_bands_replace_shared() {
        let strict = three_band("c").with_tier(
            DifficultyTier::Advanced,
            entries(&[("adv-low", "0-6", "not yet"), ("adv-high", "7-10", "ready")]),
        );

        let easy = evaluate(&[strict.clone()], &scores(&[("c", 6.0)]), EASY).unwrap();
        assert_eq!(easy.difficulty, DifficultyTier::Beginner);
        assert_eq!(easy.competencies[0].selection.criteria(), Some("mid"));

        let medium = evaluate(&[strict.clone()], &scores(&[("c", 6.0)]), DifficultyTier::Intermediate).unwrap();
        assert_eq!(medium.competencies[0].selection.criteria(), Some("mid"));

        let hard = evaluate(&[strict], &scores(&[("c", 6.0)]), DifficultyTier::Advanced).unwrap();
        assert_eq!(hard.difficulty, DifficultyTier::Advanced);
        assert_eq!(hard.competencies[0].selection.criteria(), Some("not yet"));
        match &hard.competencies[0].selection {
            BandSelection::Scored { entry, .. } => assert_eq!(entry.id, "adv-low"),
            other => panic!("Expected scored, got {:?}", other),
        }
    }

    #[test]
    fn test_tier_bands_cover_score_missing_from_shared() {
        let c = three_band("c").with_tier(DifficultyTier::Advanced, entries(&[("all", "0-10", "any")]));
        let rubric = CompetencyRubric::load(c).unwrap();
        assert!(!rubric.select(EASY, Some(10.0)).is_scored());
        assert!(rubric.select(DifficultyTier::Advanced, Some(10.0)).is_scored());
    }

    #[test]
    fn test_tier_issues() {
        let mut only_tiers = competency("t", &[]);
        for tier in DifficultyTier::all() {
            only_tiers = only_tiers.with_tier(*tier, entries(&[("x", "1-10", "")]));
        }
        assert!(CompetencyRubric::load(only_tiers).unwrap().issues().is_empty());

        let partial = competency("p", &[]).with_tier(DifficultyTier::Advanced, entries(&[("x", "1-10", "")]));
        assert_eq!(CompetencyRubric::load(partial).unwrap().issues(), vec![RubricIssue::NoBands]);

        let gappy = three_band("g").with_tier(
            DifficultyTier::Intermediate,
            entries(&[("lo", "1-2", ""), ("hi", "6-9", "")]),
        );
        assert_eq!(
            CompetencyRubric::load(gappy).unwrap().issues(),
            vec![RubricIssue::Gap { after: "lo".into(), before: "hi".into() }]
        );
    }

    #[test]
    fn test_malformed_tier_range_is_error() {
        let c = three_band("c").with_tier(DifficultyTier::Beginner, entries(&[("odd", "some", "")]));
        match evaluate(&[c], &HashMap::new(), EASY).unwrap_err() {
            Error::ScoreRangeMalformed { entry_id, .. } => assert_eq!(entry_id, "odd"),
            other => panic!("Expected ScoreRangeMalformed, got {:?}", other),
        }
    }

    #[test]
    fn test_review_serialization() {
        let review = evaluate(
            &[three_band("a"), three_band("b")],
            &scores(&[("a", 6.0), ("b", 12.0)]),
            EASY,
        )
        .unwrap();
        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(json["competencies"][0]["selection"]["status"], "scored");
        assert_eq!(json["competencies"][0]["selection"]["entry"]["criteria"], "mid");
        assert_eq!(json["competencies"][1]["selection"]["status"], "unscored");
        assert_eq!(json["competencies"][1]["selection"]["reason"]["kind"], "noMatchingBand");
        assert_eq!(json["overallScore"], 6.0);
        assert_eq!(json["difficulty"], "beginner");
    }
}
