//! Participation grading schemes.
//!
//! Every scheme maps a participation count to a grade in
//! `[min_grade, max_grade]`, is non-decreasing in the count, and returns
//! exactly `max_grade` once the count reaches `cap_participations`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{RaterError, Result};

/// Bounds shared by all schemes.
///
/// `floor_grade` is the grade the generous schemes (linear, logarithmic,
/// square root) award at zero participation. When unset each scheme uses its
/// own default, see [`GradingScheme::default_floor`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchemeBounds {
    pub min_grade: f64,
    pub max_grade: f64,
    pub cap_participations: u32,
    pub floor_grade: Option<f64>,
}

impl Default for SchemeBounds {
    fn default() -> Self {
        Self {
            min_grade: 0.0,
            max_grade: 5.0,
            cap_participations: 7,
            floor_grade: None,
        }
    }
}

impl SchemeBounds {
    pub fn validate(&self) -> Result<()> {
        if !self.min_grade.is_finite() || !self.max_grade.is_finite() {
            return Err(RaterError::InvalidBounds(
                "min_grade and max_grade must be finite".to_string(),
            ));
        }
        if self.min_grade > self.max_grade {
            return Err(RaterError::InvalidBounds(format!(
                "min_grade {} exceeds max_grade {}",
                self.min_grade, self.max_grade
            )));
        }
        if let Some(floor) = self.floor_grade {
            if !floor.is_finite() || floor < self.min_grade || floor > self.max_grade {
                return Err(RaterError::InvalidBounds(format!(
                    "floor_grade {floor} must lie within [{}, {}]",
                    self.min_grade, self.max_grade
                )));
            }
        }
        Ok(())
    }

    /// Forces `grade` into `[min_grade, max_grade]`; NaN maps to `min_grade`.
    ///
    /// Never panics. Inverted bounds (`min_grade > max_grade`, rejected by
    /// [`validate`](Self::validate)) yield `max_grade` for every non-NaN input.
    pub fn clamp(&self, grade: f64) -> f64 {
        if grade.is_nan() {
            return self.min_grade;
        }
        grade.max(self.min_grade).min(self.max_grade)
    }

    /// Share of the cap reached, in `[0, 1]`. A zero cap saturates immediately.
    fn progress(&self, count: u32) -> f64 {
        if self.cap_participations == 0 {
            return 1.0;
        }
        f64::from(count.min(self.cap_participations)) / f64::from(self.cap_participations)
    }
}

/// The built-in schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingScheme {
    /// Fixed step table: 0 → min, 1 → 2.0, then +0.5 per participation from 2.5.
    Tiered,
    /// Straight line from the floor to `max_grade` at the cap.
    Linear,
    /// Concave: steep early gains, diminishing after.
    Logarithmic,
    /// Concave, milder than logarithmic.
    #[serde(alias = "sqrt")]
    SquareRoot,
    /// Straight line through `min_grade`; no floor.
    Percentage,
}

impl GradingScheme {
    pub const ALL: [GradingScheme; 5] = [
        GradingScheme::Tiered,
        GradingScheme::Linear,
        GradingScheme::Logarithmic,
        GradingScheme::SquareRoot,
        GradingScheme::Percentage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GradingScheme::Tiered => "tiered",
            GradingScheme::Linear => "linear",
            GradingScheme::Logarithmic => "logarithmic",
            GradingScheme::SquareRoot => "sqrt",
            GradingScheme::Percentage => "percentage",
        }
    }

    /// Grade awarded at zero participation when `floor_grade` is unset.
    /// Tiered and percentage have no floor and start at `min_grade`.
    pub fn default_floor(&self) -> Option<f64> {
        match self {
            GradingScheme::Linear | GradingScheme::Logarithmic => Some(1.0),
            GradingScheme::SquareRoot => Some(0.5),
            GradingScheme::Tiered | GradingScheme::Percentage => None,
        }
    }

    fn floor(&self, bounds: &SchemeBounds) -> f64 {
        match self.default_floor() {
            Some(default) => bounds.clamp(bounds.floor_grade.unwrap_or(default)),
            None => bounds.min_grade,
        }
    }

    /// Grades `count` without validating `bounds`; [`score`] is the checked
    /// entry point. Invalid bounds never panic but give meaningless grades.
    pub fn grade(&self, count: u32, bounds: &SchemeBounds) -> f64 {
        if count >= bounds.cap_participations {
            return bounds.max_grade;
        }

        let min = bounds.min_grade;
        let max = bounds.max_grade;
        let floor = self.floor(bounds);

        let raw = match self {
            GradingScheme::Tiered => match count {
                0 => min,
                1 => 2.0,
                n => 2.5 + 0.5 * f64::from(n - 2),
            },
            GradingScheme::Linear => floor + (max - floor) * bounds.progress(count),
            GradingScheme::Logarithmic => {
                let capped = count.min(bounds.cap_participations);
                let ratio = f64::from(capped).ln_1p() / f64::from(bounds.cap_participations).ln_1p();
                floor + (max - floor) * ratio
            }
            GradingScheme::SquareRoot => floor + (max - floor) * bounds.progress(count).sqrt(),
            GradingScheme::Percentage => min + (max - min) * bounds.progress(count),
        };

        bounds.clamp(raw)
    }
}

impl fmt::Display for GradingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GradingScheme {
    type Err = RaterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tiered" => Ok(GradingScheme::Tiered),
            "linear" => Ok(GradingScheme::Linear),
            "logarithmic" | "log" => Ok(GradingScheme::Logarithmic),
            "sqrt" | "square_root" | "square-root" => Ok(GradingScheme::SquareRoot),
            "percentage" => Ok(GradingScheme::Percentage),
            _ => Err(RaterError::UnknownScheme {
                name: s.to_string(),
                available: available_schemes(),
            }),
        }
    }
}

fn available_schemes() -> String {
    GradingScheme::ALL
        .iter()
        .map(GradingScheme::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A caller-supplied grading function.
pub type CustomGradeFn = Arc<dyn Fn(u32, &SchemeBounds) -> f64 + Send + Sync>;

/// A scheme selected for one grading run: a built-in, or a custom function.
#[derive(Clone)]
pub enum Scheme {
    Builtin(GradingScheme),
    Custom { name: String, grade: CustomGradeFn },
}

impl Scheme {
    /// Resolves a scheme by name. A supplied custom function always wins;
    /// otherwise the name must be a built-in.
    pub fn resolve(name: &str, custom: Option<CustomGradeFn>) -> Result<Self> {
        match custom {
            Some(grade) => Ok(Scheme::Custom {
                name: name.to_string(),
                grade,
            }),
            None => Ok(Scheme::Builtin(name.parse()?)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Scheme::Builtin(scheme) => scheme.name(),
            Scheme::Custom { name, .. } => name,
        }
    }

    /// Custom results are clamped into the bounds; NaN maps to `min_grade`.
    pub fn grade(&self, count: u32, bounds: &SchemeBounds) -> f64 {
        match self {
            Scheme::Builtin(scheme) => scheme.grade(count, bounds),
            Scheme::Custom { grade, .. } => bounds.clamp(grade(count, bounds)),
        }
    }
}

impl From<GradingScheme> for Scheme {
    fn from(scheme: GradingScheme) -> Self {
        Scheme::Builtin(scheme)
    }
}

impl fmt::Debug for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Builtin(scheme) => f.debug_tuple("Builtin").field(scheme).finish(),
            Scheme::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
        }
    }
}

/// Grades a single count under the built-in scheme called `scheme_name`.
pub fn score(scheme_name: &str, count: u32, bounds: &SchemeBounds) -> Result<f64> {
    bounds.validate()?;
    let scheme: GradingScheme = scheme_name.parse()?;
    Ok(scheme.grade(count, bounds))
}
