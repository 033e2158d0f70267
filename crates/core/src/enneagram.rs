//! Enneagram types, assessment scoring and growth advice.
//!
//! The assessment runs as a chat; each answer the client records is an
//! [`AssessmentResponse`] tying an agreement rating to one of the nine types.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Lowest/highest agreement rating in an assessment answer.
pub const MIN_AGREEMENT: u8 = 1;
pub const MAX_AGREEMENT: u8 = 5;

/// Upper bound of a type score.
pub const MAX_SCORE: f64 = 100.0;

/// One of the nine Enneagram types, numbered 1 through 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnneagramType(u8);

impl EnneagramType {
    pub fn new(number: u8) -> Result<Self, CoreError> {
        if (1..=9).contains(&number) {
            Ok(Self(number))
        } else {
            Err(CoreError::Validation(format!(
                "Enneagram type must be between 1 and 9, got {number}"
            )))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            1 => "The Reformer",
            2 => "The Helper",
            3 => "The Achiever",
            4 => "The Individualist",
            5 => "The Investigator",
            6 => "The Loyalist",
            7 => "The Enthusiast",
            8 => "The Challenger",
            _ => "The Peacemaker",
        }
    }

    /// Static coaching advice used to personalize nudges.
    pub fn growth_advice(self) -> &'static str {
        match self.0 {
            1 => "Progress beats perfection: finish a rough version today and refine it later.",
            2 => "Put your own goal on today's list before offering help to anyone else.",
            3 => "Measure today by the step you took, not by how it looks to others.",
            4 => "Act before the mood arrives; small consistent steps build the meaning you want.",
            5 => "You already know enough to start. Trade one hour of research for one hour of doing.",
            6 => "Trust the plan you made. Take the next step even while the doubt is still there.",
            7 => "Stay with one thing a little longer; depth is where this goal pays off.",
            8 => "Channel your drive into steady pacing, and let others support you along the way.",
            _ => "Name the one step that matters most today and do it first, before the day fills up.",
        }
    }

    pub fn all() -> impl Iterator<Item = EnneagramType> {
        (1..=9).map(EnneagramType)
    }
}

impl std::fmt::Display for EnneagramType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Type {} ({})", self.0, self.name())
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Nine type scores; index 0 is type 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnneagramScores(pub [f64; 9]);

impl EnneagramScores {
    /// Build scores from a client-supplied list, checking count and range.
    pub fn from_slice(values: &[f64]) -> Result<Self, CoreError> {
        let scores: [f64; 9] = values.try_into().map_err(|_| {
            CoreError::Validation(format!(
                "Expected exactly 9 Enneagram scores, got {}",
                values.len()
            ))
        })?;
        let result = Self(scores);
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        for (i, score) in self.0.iter().enumerate() {
            if !score.is_finite() || *score < 0.0 || *score > MAX_SCORE {
                return Err(CoreError::Validation(format!(
                    "Score for type {} must be between 0 and {MAX_SCORE}, got {score}",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    pub fn score(&self, kind: EnneagramType) -> f64 {
        self.0[usize::from(kind.number() - 1)]
    }

    /// Highest-scoring type; ties go to the lower type number.
    pub fn dominant(&self) -> EnneagramType {
        let mut best = 0usize;
        for (i, score) in self.0.iter().enumerate() {
            if *score > self.0[best] {
                best = i;
            }
        }
        EnneagramType(best as u8 + 1)
    }
}

/// One recorded answer from the chat assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponse {
    pub type_number: u8,
    pub agreement: u8,
}

/// Score a set of assessment answers.
///
/// Each type scores `100 * sum(agreement) / (5 * answers)` over the answers
/// that target it, rounded to one decimal. Types with no answers score 0.
pub fn score_responses(responses: &[AssessmentResponse]) -> Result<EnneagramScores, CoreError> {
    if responses.is_empty() {
        return Err(CoreError::Validation(
            "At least one assessment response is required".to_string(),
        ));
    }

    let mut sums = [0u32; 9];
    let mut counts = [0u32; 9];
    for response in responses {
        let kind = EnneagramType::new(response.type_number)?;
        if !(MIN_AGREEMENT..=MAX_AGREEMENT).contains(&response.agreement) {
            return Err(CoreError::Validation(format!(
                "Agreement must be between {MIN_AGREEMENT} and {MAX_AGREEMENT}, got {}",
                response.agreement
            )));
        }
        let idx = usize::from(kind.number() - 1);
        sums[idx] += u32::from(response.agreement);
        counts[idx] += 1;
    }

    let mut scores = [0.0; 9];
    for i in 0..9 {
        if counts[i] > 0 {
            let raw = MAX_SCORE * f64::from(sums[i]) / (f64::from(MAX_AGREEMENT) * f64::from(counts[i]));
            scores[i] = (raw * 10.0).round() / 10.0;
        }
    }
    Ok(EnneagramScores(scores))
}

// ---------------------------------------------------------------------------
// Stored result
// ---------------------------------------------------------------------------

/// Assessment outcome stored on the user row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnneagramResult {
    pub scores: EnneagramScores,
    pub dominant_type: u8,
    pub summary: String,
    pub completed_at: Timestamp,
}

impl EnneagramResult {
    pub fn new(scores: EnneagramScores, summary: String, completed_at: Timestamp) -> Self {
        Self {
            dominant_type: scores.dominant().number(),
            scores,
            summary,
            completed_at,
        }
    }

    pub fn dominant(&self) -> Option<EnneagramType> {
        EnneagramType::new(self.dominant_type).ok()
    }
}

/// Summary used when the assistant cannot write one.
pub fn fallback_summary(scores: &EnneagramScores) -> String {
    let dominant = scores.dominant();
    format!(
        "Your strongest pattern is {dominant}, scoring {:.1} out of 100. {}",
        scores.score(dominant),
        dominant.growth_advice()
    )
}

/// Message asking the assistant to write the personality summary.
pub fn build_summary_prompt(scores: &EnneagramScores, transcript: Option<&str>) -> String {
    let table = EnneagramType::all()
        .map(|kind| format!("{kind}: {:.1}", scores.score(kind)))
        .collect::<Vec<_>>()
        .join("\n");
    let mut prompt = format!(
        "Write a warm three-sentence personality summary for a user whose Enneagram \
         assessment scored as follows. Name their dominant type and one growth edge. \
         Reply with the summary only.\n\n{table}"
    );
    if let Some(transcript) = transcript.map(str::trim).filter(|t| !t.is_empty()) {
        prompt.push_str("\n\nAssessment conversation:\n");
        prompt.push_str(transcript);
    }
    prompt
}
