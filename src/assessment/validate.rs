//! Load-time schema validation and predicate compilation.
//!
//! Every invariant the runtime relies on is checked here, once, before any
//! run can be evaluated: dangling references, forward-referencing predicates,
//! duplicate identifiers, band coverage, malformed predicate syntax. A schema
//! that fails validation must not be used for any run.

use std::collections::BTreeMap;

use super::expr::{Expr, PredicateParseError};
use super::schema::{AssessmentSchema, GateResult, QuestionFlag};

/// Fatal schema defects reported with the offending identifier.
#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    #[error("duplicate dimension id '{0}'")]
    DuplicateDimension(String),
    #[error("duplicate section id '{0}'")]
    DuplicateSection(String),
    #[error("duplicate question id '{0}'")]
    DuplicateQuestion(String),
    #[error("section '{section}' references unknown dimension '{dimension}'")]
    UnknownDimension { section: String, dimension: String },
    #[error("question '{question}' references unknown section '{section}'")]
    UnknownSection { question: String, section: String },
    #[error(
        "question '{question}' declares dimension '{declared}' but its section belongs to '{resolved}'"
    )]
    DimensionMismatch {
        question: String,
        declared: String,
        resolved: String,
    },
    #[error("question '{question}' has no options")]
    NoOptions { question: String },
    #[error("question '{question}' repeats option value '{value}'")]
    DuplicateOptionValue { question: String, value: &'static str },
    #[error("question '{question}' weight must be positive")]
    ZeroQuestionWeight { question: String },
    #[error("section '{section}' weight must be a finite non-negative number")]
    InvalidSectionWeight { section: String },
    #[error("dimension '{dimension}' weight must be a finite non-negative number")]
    InvalidDimensionWeight { dimension: String },
    #[error("question '{question}' scoring token '{token}' is missing from answer_scoring")]
    MissingScoringEntry {
        question: String,
        token: &'static str,
    },
    #[error("answer_scoring value for '{token}' must lie in [0,1], found {value}")]
    ScoreOutOfRange { token: &'static str, value: f64 },
    #[error("predicate for {context} is malformed: {source}")]
    MalformedPredicate {
        context: String,
        #[source]
        source: PredicateParseError,
    },
    #[error("{context} references unknown question '{question}'")]
    UnknownQuestionReference { context: String, question: String },
    #[error("{context} references question '{question}' that is not earlier in evaluation order")]
    ForwardReference { context: String, question: String },
    #[error("{context} references unknown profile field '{field}'")]
    UnknownProfileField { context: String, field: String },
    #[error("{context} targets unknown question '{question}'")]
    UnknownGateTarget { context: String, question: String },
    #[error("profile gate '{context}' must use result 'na'")]
    InvalidProfileGateResult { context: String },
    #[error("schema defines no score bands")]
    NoScoreBands,
    #[error("score bands must cover [0,100] in ascending, gap-free order; offending band '{0}'")]
    BandCoverage(String),
}

/// Gate rule with its predicate compiled and targets resolved to indices.
#[derive(Debug, Clone)]
pub struct CompiledGate {
    pub when: Expr,
    pub result: GateResult,
    pub flag: Option<QuestionFlag>,
    pub question_indices: Vec<usize>,
}

/// A validated schema with every predicate pre-parsed and the lookup tables
/// the evaluation pass needs. Construction is the engine's `Initializing`
/// step; afterwards the value is read-only and shareable across runs.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    schema: AssessmentSchema,
    applies: Vec<Expr>,
    profile_gates: Vec<CompiledGate>,
    soft_gates: Vec<CompiledGate>,
    profile_gate_targets: Vec<Vec<usize>>,
    soft_gate_targets: Vec<Vec<usize>>,
    question_index: BTreeMap<String, usize>,
    section_index: BTreeMap<String, usize>,
    section_questions: Vec<Vec<usize>>,
}

impl CompiledSchema {
    pub fn compile(schema: AssessmentSchema) -> Result<Self, SchemaValidationError> {
        let mut dimension_index = BTreeMap::new();
        for (idx, dimension) in schema.dimensions.iter().enumerate() {
            if dimension_index.insert(dimension.id.clone(), idx).is_some() {
                return Err(SchemaValidationError::DuplicateDimension(
                    dimension.id.clone(),
                ));
            }
            if let Some(weight) = dimension.weight {
                if !weight.is_finite() || weight < 0.0 {
                    return Err(SchemaValidationError::InvalidDimensionWeight {
                        dimension: dimension.id.clone(),
                    });
                }
            }
        }

        let mut section_index = BTreeMap::new();
        for (idx, section) in schema.sections.iter().enumerate() {
            if section_index.insert(section.id.clone(), idx).is_some() {
                return Err(SchemaValidationError::DuplicateSection(section.id.clone()));
            }
            if !dimension_index.contains_key(&section.dimension) {
                return Err(SchemaValidationError::UnknownDimension {
                    section: section.id.clone(),
                    dimension: section.dimension.clone(),
                });
            }
            if !section.weight.is_finite() || section.weight < 0.0 {
                return Err(SchemaValidationError::InvalidSectionWeight {
                    section: section.id.clone(),
                });
            }
        }

        for (token, value) in &schema.answer_scoring {
            if let Some(value) = value {
                if !value.is_finite() || *value < 0.0 || *value > 1.0 {
                    return Err(SchemaValidationError::ScoreOutOfRange {
                        token: token.label(),
                        value: *value,
                    });
                }
            }
        }

        let mut question_index = BTreeMap::new();
        let mut section_questions = vec![Vec::new(); schema.sections.len()];
        for (position, question) in schema.questions.iter().enumerate() {
            if question_index
                .insert(question.id.clone(), position)
                .is_some()
            {
                return Err(SchemaValidationError::DuplicateQuestion(question.id.clone()));
            }

            let section_position = *section_index.get(&question.section_id).ok_or_else(|| {
                SchemaValidationError::UnknownSection {
                    question: question.id.clone(),
                    section: question.section_id.clone(),
                }
            })?;
            section_questions[section_position].push(position);

            if let Some(declared) = &question.dimension {
                let resolved = &schema.sections[section_position].dimension;
                if declared != resolved {
                    return Err(SchemaValidationError::DimensionMismatch {
                        question: question.id.clone(),
                        declared: declared.clone(),
                        resolved: resolved.clone(),
                    });
                }
            }

            if question.weight == 0 {
                return Err(SchemaValidationError::ZeroQuestionWeight {
                    question: question.id.clone(),
                });
            }

            if question.options.is_empty() {
                return Err(SchemaValidationError::NoOptions {
                    question: question.id.clone(),
                });
            }

            // Duplicate literal values are rejected outright: a stored answer
            // token must resolve to exactly one option.
            let mut seen = Vec::with_capacity(question.options.len());
            for option in &question.options {
                if seen.contains(&option.value) {
                    return Err(SchemaValidationError::DuplicateOptionValue {
                        question: question.id.clone(),
                        value: option.value.label(),
                    });
                }
                seen.push(option.value);

                let scoring_token = option.scoring_token();
                if !schema.answer_scoring.contains_key(&scoring_token) {
                    return Err(SchemaValidationError::MissingScoringEntry {
                        question: question.id.clone(),
                        token: scoring_token.label(),
                    });
                }
            }
        }

        let profile_fields: Vec<&str> = schema
            .profile_questions
            .iter()
            .map(|profile_question| profile_question.field.as_str())
            .collect();

        let mut applies = Vec::with_capacity(schema.questions.len());
        for (position, question) in schema.questions.iter().enumerate() {
            let context = format!("applies_if of question '{}'", question.id);
            let expr = Expr::parse(&question.applies_if).map_err(|source| {
                SchemaValidationError::MalformedPredicate {
                    context: context.clone(),
                    source,
                }
            })?;
            check_references(
                &expr,
                &context,
                &question_index,
                &profile_fields,
                Some(position),
            )?;
            applies.push(expr);
        }

        let mut profile_gates = Vec::with_capacity(schema.profile_gates.len());
        let mut profile_gate_targets = vec![Vec::new(); schema.questions.len()];
        for (gate_position, gate) in schema.profile_gates.iter().enumerate() {
            let context = format!("profile gate #{gate_position}");
            if gate.result != GateResult::Na {
                return Err(SchemaValidationError::InvalidProfileGateResult { context });
            }
            let compiled = compile_gate(
                gate,
                &context,
                &question_index,
                &profile_fields,
                GateOrdering::Unordered,
            )?;
            for question_position in &compiled.question_indices {
                profile_gate_targets[*question_position].push(gate_position);
            }
            profile_gates.push(compiled);
        }

        let mut soft_gates = Vec::with_capacity(schema.soft_gates.len());
        let mut soft_gate_targets = vec![Vec::new(); schema.questions.len()];
        for (gate_position, gate) in schema.soft_gates.iter().enumerate() {
            let context = format!("soft gate #{gate_position}");
            let compiled = compile_gate(
                gate,
                &context,
                &question_index,
                &profile_fields,
                GateOrdering::BeforeTargets,
            )?;
            for question_position in &compiled.question_indices {
                soft_gate_targets[*question_position].push(gate_position);
            }
            soft_gates.push(compiled);
        }

        validate_bands(&schema)?;

        Ok(Self {
            schema,
            applies,
            profile_gates,
            soft_gates,
            profile_gate_targets,
            soft_gate_targets,
            question_index,
            section_index,
            section_questions,
        })
    }

    pub fn schema(&self) -> &AssessmentSchema {
        &self.schema
    }

    pub(crate) fn applies_for(&self, question_position: usize) -> &Expr {
        &self.applies[question_position]
    }

    pub(crate) fn profile_gates(&self) -> &[CompiledGate] {
        &self.profile_gates
    }

    pub(crate) fn soft_gates(&self) -> &[CompiledGate] {
        &self.soft_gates
    }

    pub(crate) fn profile_gates_for(&self, question_position: usize) -> &[usize] {
        &self.profile_gate_targets[question_position]
    }

    pub(crate) fn soft_gates_for(&self, question_position: usize) -> &[usize] {
        &self.soft_gate_targets[question_position]
    }

    pub(crate) fn section_position(&self, section_id: &str) -> Option<usize> {
        self.section_index.get(section_id).copied()
    }

    pub(crate) fn questions_in_section(&self, section_position: usize) -> &[usize] {
        &self.section_questions[section_position]
    }

    pub fn question_position(&self, question_id: &str) -> Option<usize> {
        self.question_index.get(question_id).copied()
    }
}

enum GateOrdering {
    /// Profile gates read profile facts; no evaluation-order constraint.
    Unordered,
    /// Soft gates must only read questions earlier than every target.
    BeforeTargets,
}

fn compile_gate(
    gate: &super::schema::GateRule,
    context: &str,
    question_index: &BTreeMap<String, usize>,
    profile_fields: &[&str],
    ordering: GateOrdering,
) -> Result<CompiledGate, SchemaValidationError> {
    let when =
        Expr::parse(&gate.when).map_err(|source| SchemaValidationError::MalformedPredicate {
            context: context.to_string(),
            source,
        })?;

    let mut question_indices = Vec::with_capacity(gate.questions.len());
    for target in &gate.questions {
        let position = *question_index.get(target).ok_or_else(|| {
            SchemaValidationError::UnknownGateTarget {
                context: context.to_string(),
                question: target.clone(),
            }
        })?;
        question_indices.push(position);
    }

    let boundary = match ordering {
        GateOrdering::Unordered => None,
        GateOrdering::BeforeTargets => question_indices.iter().min().copied(),
    };
    check_references(&when, context, question_index, profile_fields, boundary)?;

    Ok(CompiledGate {
        when,
        result: gate.result,
        flag: gate.flag,
        question_indices,
    })
}

/// Referenced questions must exist and, when a boundary is given, be strictly
/// earlier in evaluation order. Referenced profile fields must exist.
fn check_references(
    expr: &Expr,
    context: &str,
    question_index: &BTreeMap<String, usize>,
    profile_fields: &[&str],
    boundary: Option<usize>,
) -> Result<(), SchemaValidationError> {
    for referenced in expr.referenced_questions() {
        let position = *question_index.get(referenced).ok_or_else(|| {
            SchemaValidationError::UnknownQuestionReference {
                context: context.to_string(),
                question: referenced.to_string(),
            }
        })?;
        if let Some(boundary) = boundary {
            if position >= boundary {
                return Err(SchemaValidationError::ForwardReference {
                    context: context.to_string(),
                    question: referenced.to_string(),
                });
            }
        }
    }

    for field in expr.referenced_fields() {
        if !profile_fields.contains(&field) {
            return Err(SchemaValidationError::UnknownProfileField {
                context: context.to_string(),
                field: field.to_string(),
            });
        }
    }

    Ok(())
}

fn validate_bands(schema: &AssessmentSchema) -> Result<(), SchemaValidationError> {
    let bands = &schema.score_bands;
    if bands.is_empty() {
        return Err(SchemaValidationError::NoScoreBands);
    }

    let mut previous_max: Option<f64> = None;
    for band in bands {
        let well_formed = band.min.is_finite()
            && band.max.is_finite()
            && band.min >= 0.0
            && band.max <= 100.0
            && band.min <= band.max;
        if !well_formed {
            return Err(SchemaValidationError::BandCoverage(band.label.clone()));
        }

        match previous_max {
            // Adjacent bands may share a boundary or sit on consecutive integers.
            Some(max) if band.min != max && band.min != max + 1.0 => {
                return Err(SchemaValidationError::BandCoverage(band.label.clone()));
            }
            None if band.min != 0.0 => {
                return Err(SchemaValidationError::BandCoverage(band.label.clone()));
            }
            _ => {}
        }
        previous_max = Some(band.max);
    }

    if previous_max != Some(100.0) {
        let last = &bands[bands.len() - 1];
        return Err(SchemaValidationError::BandCoverage(last.label.clone()));
    }

    Ok(())
}
