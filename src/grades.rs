use std::fmt;

use thiserror::Error;

use crate::models::GradeBand;

pub const LOWEST_PERCENTAGE: i32 = 0;
pub const HIGHEST_PERCENTAGE: i32 = 100;
pub const UNRATED_LEVEL: i32 = 0;
pub const UNRATED_TEXT: &str = "Not Rated";

/// Result of classifying a percentage against configured bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade<'a> {
    Rated(&'a GradeBand),
    Unrated,
}

impl<'a> Grade<'a> {
    pub fn level(&self) -> i32 {
        match self {
            Grade::Rated(band) => band.grade_level,
            Grade::Unrated => UNRATED_LEVEL,
        }
    }

    pub fn text(&self) -> &'a str {
        match *self {
            Grade::Rated(band) => band.grade_text.as_str(),
            Grade::Unrated => UNRATED_TEXT,
        }
    }

    pub fn is_rated(&self) -> bool {
        matches!(self, Grade::Rated(_))
    }
}

impl fmt::Display for Grade<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (level {})", self.text(), self.level())
    }
}

/// Five-band scale used when an organization has not configured its own.
pub fn default_bands() -> Vec<GradeBand> {
    vec![
        GradeBand::new(0, 20, "Unsatisfactory", 1),
        GradeBand::new(21, 40, "Weak", 2),
        GradeBand::new(41, 60, "Normal", 3),
        GradeBand::new(61, 80, "Good", 4),
        GradeBand::new(81, 100, "Excellent", 5),
    ]
}

/// First band containing the percentage wins; no match is `Grade::Unrated`.
pub fn classify(percentage: i32, bands: &[GradeBand]) -> Grade<'_> {
    bands
        .iter()
        .find(|band| band.contains(percentage))
        .map(Grade::Rated)
        .unwrap_or(Grade::Unrated)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GradeBandError {
    #[error("grade band '{grade_text}' has min_score {min_score} above max_score {max_score}")]
    InvertedRange {
        grade_text: String,
        min_score: i32,
        max_score: i32,
    },
    #[error("grade band '{grade_text}' reaches outside 0..=100 ({min_score}..={max_score})")]
    OutOfRange {
        grade_text: String,
        min_score: i32,
        max_score: i32,
    },
    #[error("grade band '{grade_text}' has grade_level {grade_level}, expected 1 or more")]
    InvalidLevel { grade_text: String, grade_level: i32 },
    #[error("grade band {min_score}..={max_score} has no grade_text")]
    MissingText { min_score: i32, max_score: i32 },
}

pub fn validate_bands(bands: &[GradeBand]) -> Result<(), GradeBandError> {
    for band in bands {
        if band.grade_text.trim().is_empty() {
            return Err(GradeBandError::MissingText {
                min_score: band.min_score,
                max_score: band.max_score,
            });
        }
        if band.min_score > band.max_score {
            return Err(GradeBandError::InvertedRange {
                grade_text: band.grade_text.clone(),
                min_score: band.min_score,
                max_score: band.max_score,
            });
        }
        if band.min_score < LOWEST_PERCENTAGE || band.max_score > HIGHEST_PERCENTAGE {
            return Err(GradeBandError::OutOfRange {
                grade_text: band.grade_text.clone(),
                min_score: band.min_score,
                max_score: band.max_score,
            });
        }
        if band.grade_level < 1 {
            return Err(GradeBandError::InvalidLevel {
                grade_text: band.grade_text.clone(),
                grade_level: band.grade_level,
            });
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverageIssue {
    Gap { from: i32, to: i32 },
    Overlap { first: String, second: String },
}

impl fmt::Display for CoverageIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageIssue::Gap { from, to } if from == to => {
                write!(f, "score {from} is not covered by any band")
            }
            CoverageIssue::Gap { from, to } => {
                write!(f, "scores {from}..={to} are not covered by any band")
            }
            CoverageIssue::Overlap { first, second } => {
                write!(f, "bands '{first}' and '{second}' overlap; '{first}' wins")
            }
        }
    }
}

pub fn coverage_issues(bands: &[GradeBand]) -> Vec<CoverageIssue> {
    let mut issues = Vec::new();

    let mut gap_start: Option<i32> = None;
    for score in LOWEST_PERCENTAGE..=HIGHEST_PERCENTAGE {
        let covered = bands.iter().any(|band| band.contains(score));
        match (covered, gap_start) {
            (false, None) => gap_start = Some(score),
            (true, Some(from)) => {
                issues.push(CoverageIssue::Gap {
                    from,
                    to: score - 1,
                });
                gap_start = None;
            }
            _ => {}
        }
    }
    if let Some(from) = gap_start {
        issues.push(CoverageIssue::Gap {
            from,
            to: HIGHEST_PERCENTAGE,
        });
    }

    for (index, first) in bands.iter().enumerate() {
        for second in &bands[index + 1..] {
            if first.min_score.max(second.min_score) <= first.max_score.min(second.max_score) {
                issues.push(CoverageIssue::Overlap {
                    first: first.grade_text.clone(),
                    second: second.grade_text.clone(),
                });
            }
        }
    }

    issues
}
