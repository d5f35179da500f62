//! Per-question score resolution and hierarchical weighted aggregation.
//!
//! Aggregation is always renormalized by the weight of the questions that
//! actually scored; a section with nothing scored is excluded from its
//! dimension rather than treated as zero, and likewise for dimensions in the
//! overall rollup.

use tracing::warn;

use super::applicability::{Disposition, QuestionStatus};
use super::context::AnswerSet;
use super::report::{
    DimensionReport, ImprovementItem, ImprovementOption, ImprovementPriority, SectionReport,
};
use super::schema::{AnswerToken, AssessmentSchema, Question, QuestionFlag, ScoreBand};
use super::validate::CompiledSchema;

/// Improvement potential thresholds on the 0-100 weighted scale.
const HIGH_PRIORITY_POTENTIAL: f64 = 5.0;
const MEDIUM_PRIORITY_POTENTIAL: f64 = 2.0;

/// Resolution of one question within a pass: its final status, the answer
/// recorded for reporting, the score fraction (when it participates in
/// aggregation), and any flags raised.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoredQuestion {
    pub status: QuestionStatus,
    pub answer: Option<AnswerToken>,
    pub fraction: Option<f64>,
    pub flags: Vec<QuestionFlag>,
}

pub(crate) fn score_question(
    schema: &AssessmentSchema,
    question: &Question,
    disposition: Disposition,
    answers: &AnswerSet,
) -> ScoredQuestion {
    let mut flags = Vec::new();
    if let Some(flag) = disposition.flag {
        flags.push(flag);
    }

    match disposition.status {
        QuestionStatus::NaSystem => {
            // The engine auto-sets the value; the user never saw the question.
            ScoredQuestion {
                status: QuestionStatus::NaSystem,
                answer: Some(AnswerToken::Na),
                fraction: None,
                flags,
            }
        }
        QuestionStatus::Hidden | QuestionStatus::Pending => ScoredQuestion {
            status: disposition.status,
            answer: None,
            fraction: None,
            flags,
        },
        QuestionStatus::Active => {
            let Some(token) = answers.get(&question.id) else {
                return ScoredQuestion {
                    status: QuestionStatus::Active,
                    answer: None,
                    fraction: None,
                    flags,
                };
            };

            let Some(option) = question.options.iter().find(|option| option.value == token)
            else {
                // One bad input must not abort the run; the question is
                // treated as unanswered and the defect surfaces as a flag.
                warn!(
                    question = %question.id,
                    answer = token.label(),
                    "answer does not match any option; treating question as unanswered"
                );
                flags.push(QuestionFlag::InvalidAnswer);
                return ScoredQuestion {
                    status: QuestionStatus::Active,
                    answer: Some(token),
                    fraction: None,
                    flags,
                };
            };

            if schema.flags.review_on.contains(&token) {
                flags.push(QuestionFlag::Review);
            }
            if schema.flags.follow_up_on.contains(&token) {
                flags.push(QuestionFlag::FollowUp);
            }
            if schema.flags.risk_on.contains(&token) {
                flags.push(QuestionFlag::Risk);
            }

            let fraction = schema
                .answer_scoring
                .get(&option.scoring_token())
                .copied()
                .flatten();

            ScoredQuestion {
                status: QuestionStatus::Active,
                answer: Some(token),
                fraction,
                flags,
            }
        }
    }
}

/// Roll scored questions up into section, dimension, and overall scores.
/// All reported scores are on the `[0,100]` scale.
pub(crate) fn aggregate(
    schema: &CompiledSchema,
    scored: &[ScoredQuestion],
) -> (Vec<SectionReport>, Vec<DimensionReport>, f64) {
    let document = schema.schema();

    let mut sections = Vec::with_capacity(document.sections.len());
    for (section_position, section) in document.sections.iter().enumerate() {
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        let mut questions_total = 0;
        let mut questions_answered = 0;
        let mut review_count = 0;

        for question_position in schema.questions_in_section(section_position) {
            let question = &document.questions[*question_position];
            let resolution = &scored[*question_position];

            if matches!(
                resolution.status,
                QuestionStatus::Active | QuestionStatus::Pending
            ) {
                questions_total += 1;
            }
            if resolution.status == QuestionStatus::Active
                && resolution.answer.is_some()
                && !resolution.flags.contains(&QuestionFlag::InvalidAnswer)
            {
                questions_answered += 1;
            }
            if resolution.flags.contains(&QuestionFlag::Review) {
                review_count += 1;
            }

            if let Some(fraction) = resolution.fraction {
                weighted_sum += f64::from(question.weight) * fraction;
                weight_sum += f64::from(question.weight);
            }
        }

        let score = if weight_sum > 0.0 {
            Some(weighted_sum / weight_sum * 100.0)
        } else {
            None
        };

        let progress = if questions_total > 0 {
            questions_answered as f64 / questions_total as f64
        } else {
            0.0
        };

        sections.push(SectionReport {
            id: section.id.clone(),
            label: section.label.clone(),
            score,
            questions_total,
            questions_answered,
            review_count,
            progress,
        });
    }

    let mut dimensions = Vec::with_capacity(document.dimensions.len());
    let mut overall_weighted = 0.0;
    let mut overall_weight = 0.0;
    for dimension in &document.dimensions {
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for (section_position, section) in document.sections.iter().enumerate() {
            if section.dimension != dimension.id {
                continue;
            }
            if let Some(score) = sections[section_position].score {
                weighted_sum += section.weight * score;
                weight_sum += section.weight;
            }
        }

        let score = if weight_sum > 0.0 {
            Some(weighted_sum / weight_sum)
        } else {
            None
        };

        if let Some(score) = score {
            // An explicit dimension weight wins; otherwise the dimension
            // carries the summed weight of its scored sections.
            let weight = dimension.weight.unwrap_or(weight_sum);
            overall_weighted += weight * score;
            overall_weight += weight;
        }

        dimensions.push(DimensionReport {
            id: dimension.id.clone(),
            label: dimension.label.clone(),
            score,
        });
    }

    let overall = if overall_weight > 0.0 {
        overall_weighted / overall_weight
    } else {
        0.0
    };

    (sections, dimensions, overall)
}

/// Select the band for an overall score. Scores are rounded half-up to the
/// band grid; bands are searched highest-first so a score on a shared
/// boundary resolves to the higher band.
pub(crate) fn band_for(bands: &[ScoreBand], overall: f64) -> Option<&ScoreBand> {
    let rounded = (overall + 0.5).floor();
    bands
        .iter()
        .rev()
        .find(|band| rounded >= band.min && rounded <= band.max)
        .or_else(|| bands.first())
}

/// Rank every under-scored active question by the weighted score gain
/// available from answering it better.
pub(crate) fn improvement_items(
    schema: &CompiledSchema,
    scored: &[ScoredQuestion],
) -> Vec<ImprovementItem> {
    let document = schema.schema();

    let mut section_weight_sums = vec![0.0_f64; document.sections.len()];
    for (section_position, _) in document.sections.iter().enumerate() {
        for question_position in schema.questions_in_section(section_position) {
            if scored[*question_position].fraction.is_some() {
                let question = &document.questions[*question_position];
                section_weight_sums[section_position] += f64::from(question.weight);
            }
        }
    }

    let mut items = Vec::new();
    for (question_position, question) in document.questions.iter().enumerate() {
        let resolution = &scored[question_position];
        let (Some(answer), Some(fraction)) = (resolution.answer, resolution.fraction) else {
            continue;
        };
        if resolution.status != QuestionStatus::Active || fraction >= 1.0 {
            continue;
        }

        let Some(section_position) = schema.section_position(&question.section_id) else {
            continue;
        };
        let section = &document.sections[section_position];
        let weight_sum = section_weight_sums[section_position];
        if weight_sum <= 0.0 {
            continue;
        }

        let share = f64::from(question.weight) / weight_sum;
        let potential = (1.0 - fraction) * share * section.weight;
        let priority = if potential >= HIGH_PRIORITY_POTENTIAL {
            ImprovementPriority::High
        } else if potential >= MEDIUM_PRIORITY_POTENTIAL {
            ImprovementPriority::Medium
        } else {
            ImprovementPriority::Low
        };

        let improvement_options = question
            .options
            .iter()
            .filter(|option| {
                document
                    .answer_scoring
                    .get(&option.scoring_token())
                    .copied()
                    .flatten()
                    .is_some_and(|candidate| candidate > fraction)
            })
            .map(|option| ImprovementOption {
                value: option.value,
                label: option.label.clone(),
            })
            .collect();

        items.push(ImprovementItem {
            question_id: question.id.clone(),
            section_id: question.section_id.clone(),
            section_label: section.label.clone(),
            prompt: question.prompt.clone(),
            answer,
            score_fraction: fraction,
            improvement_potential: potential,
            priority,
            improvement_options,
        });
    }

    items.sort_by(|a, b| {
        b.improvement_potential
            .partial_cmp(&a.improvement_potential)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.question_id.cmp(&b.question_id))
    });
    items
}
