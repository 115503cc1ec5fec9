use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("grade must be between 1 and 5, got {0}")]
    InvalidGrade(u8),

    #[error("digit count must be 1 or 2, got {0}")]
    InvalidDigits(u8),

    #[error("table {0} is outside 1..=12")]
    InvalidTable(i64),

    #[error("unknown mode: {0}")]
    UnknownMode(String),

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── LIMITS ────────────────────────────────────────────────────────────────────
//

pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 5;
pub const MIN_QUESTIONS: u32 = 10;
pub const MAX_QUESTIONS: u32 = 20;
pub const DEFAULT_TABLES: [i64; 5] = [2, 3, 4, 5, 10];

const TABLE_BOUNDS: (i64, i64) = (1, 12);
const COUNTING_BOUNDS: (i64, i64) = (1, 1000);

//
// ─── ENUMS ─────────────────────────────────────────────────────────────────────
//

/// Arithmetic family a session draws its questions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Tables,
    BeforeAfter,
    MoreLess,
    AddSubtract,
    Mixed,
}

impl Mode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Tables => "tables",
            Mode::BeforeAfter => "beforeAfter",
            Mode::MoreLess => "moreLess",
            Mode::AddSubtract => "addSubtract",
            Mode::Mixed => "mixed",
        }
    }

    /// Concrete modes a mixed session rotates through for a grade.
    #[must_use]
    pub fn mixed_for_grade(grade: u8) -> &'static [Mode] {
        if grade <= 2 {
            &[Mode::Tables, Mode::BeforeAfter, Mode::AddSubtract]
        } else {
            &[Mode::Tables, Mode::BeforeAfter, Mode::AddSubtract, Mode::MoreLess]
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "tables" => Ok(Mode::Tables),
            "beforeAfter" | "before-after" => Ok(Mode::BeforeAfter),
            "moreLess" | "more-less" => Ok(Mode::MoreLess),
            "addSubtract" | "add-subtract" => Ok(Mode::AddSubtract),
            "mixed" => Ok(Mode::Mixed),
            other => Err(SettingsError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Countdown length, in timer units, for each question.
    #[must_use]
    pub fn time_limit(self) -> u32 {
        match self {
            Difficulty::Easy => 30,
            Difficulty::Medium => 20,
            Difficulty::Hard => 10,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(SettingsError::UnknownDifficulty(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BeforeAfterKind {
    Before,
    After,
    #[default]
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Digits {
    One,
    Two,
}

impl Digits {
    /// Operand bounds for plain (regrouping allowed) questions.
    #[must_use]
    pub fn operand_range(self) -> NumberRange {
        match self {
            Digits::One => NumberRange::new(0, 9),
            Digits::Two => NumberRange::new(10, 99),
        }
    }
}

impl TryFrom<u8> for Digits {
    type Error = SettingsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Digits::One),
            2 => Ok(Digits::Two),
            other => Err(SettingsError::InvalidDigits(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Subtract,
}

impl Operator {
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
        }
    }

    #[must_use]
    pub fn apply(self, a: i64, b: i64) -> i64 {
        match self {
            Operator::Add => a + b,
            Operator::Subtract => a - b,
        }
    }
}

//
// ─── VALUE TYPES ───────────────────────────────────────────────────────────────
//

/// Inclusive integer range, always stored with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberRange {
    min: i64,
    max: i64,
}

impl NumberRange {
    /// Builds a range, swapping the bounds when given in reverse.
    #[must_use]
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    fn clamped(a: i64, b: i64, (lo, hi): (i64, i64)) -> Self {
        Self::new(a.clamp(lo, hi), b.clamp(lo, hi))
    }

    #[must_use]
    pub fn min(&self) -> i64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> i64 {
        self.max
    }

    #[must_use]
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Which "more/less than" offsets a session may ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Offsets {
    pub more10: bool,
    pub less10: bool,
    pub more100: bool,
    pub less100: bool,
}

impl Offsets {
    /// Enabled offsets as `(label, delta)` pairs, falling back to "10 more".
    #[must_use]
    pub fn options(&self) -> Vec<(&'static str, i64)> {
        let mut options = Vec::with_capacity(4);
        if self.more10 {
            options.push(("10 more", 10));
        }
        if self.less10 {
            options.push(("10 less", -10));
        }
        if self.more100 {
            options.push(("100 more", 100));
        }
        if self.less100 {
            options.push(("100 less", -100));
        }
        if options.is_empty() {
            options.push(("10 more", 10));
        }
        options
    }
}

impl Default for Offsets {
    fn default() -> Self {
        Self {
            more10: true,
            less10: true,
            more100: false,
            less100: false,
        }
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Fully resolved configuration for one practice session.
///
/// Built through [`SettingsDraft::validate`], which clamps every range and count, so the
/// engine never sees a missing or out-of-bounds field.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Settings {
    grade: u8,
    mode: Mode,
    tables: Vec<i64>,
    table_range: NumberRange,
    before_after_range: NumberRange,
    before_after_kind: BeforeAfterKind,
    more_less_range: NumberRange,
    offsets: Offsets,
    digits: Digits,
    no_regrouping: bool,
    operators: Vec<Operator>,
    difficulty: Difficulty,
    question_count: u32,
    show_shapes: bool,
}

impl Settings {
    #[must_use]
    pub fn grade(&self) -> u8 {
        self.grade
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn tables(&self) -> &[i64] {
        &self.tables
    }

    #[must_use]
    pub fn table_range(&self) -> NumberRange {
        self.table_range
    }

    #[must_use]
    pub fn before_after_range(&self) -> NumberRange {
        self.before_after_range
    }

    #[must_use]
    pub fn before_after_kind(&self) -> BeforeAfterKind {
        self.before_after_kind
    }

    #[must_use]
    pub fn more_less_range(&self) -> NumberRange {
        self.more_less_range
    }

    #[must_use]
    pub fn offsets(&self) -> Offsets {
        self.offsets
    }

    #[must_use]
    pub fn digits(&self) -> Digits {
        self.digits
    }

    #[must_use]
    pub fn no_regrouping(&self) -> bool {
        self.no_regrouping
    }

    /// Enabled operators; never empty.
    #[must_use]
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn show_shapes(&self) -> bool {
        self.show_shapes
    }
}

/// Partially specified settings, as read from a settings file or a form.
///
/// Every field is optional; `validate` fills the gaps and clamps what is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsDraft {
    pub grade: Option<u8>,
    pub mode: Option<Mode>,
    pub tables: Option<Vec<i64>>,
    pub table_min: Option<i64>,
    pub table_max: Option<i64>,
    pub before_after_min: Option<i64>,
    pub before_after_max: Option<i64>,
    pub before_after_type: Option<BeforeAfterKind>,
    pub more_less_min: Option<i64>,
    pub more_less_max: Option<i64>,
    pub offsets: Option<Offsets>,
    pub digits: Option<u8>,
    pub no_regrouping: Option<bool>,
    pub allow_add: Option<bool>,
    pub allow_subtract: Option<bool>,
    pub difficulty: Option<Difficulty>,
    pub question_count: Option<u32>,
    pub show_shapes: Option<bool>,
}

impl SettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draft pre-filled with the defaults for a school grade.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidGrade` outside grades 1 to 5.
    pub fn for_grade(grade: u8) -> Result<Self, SettingsError> {
        let (tables, table_max, counting_max, digits, no_regrouping, difficulty): (
            Vec<i64>,
            i64,
            i64,
            u8,
            bool,
            Difficulty,
        ) = match grade {
            1 => (vec![2, 5, 10], 5, 100, 1, true, Difficulty::Easy),
            2 => (DEFAULT_TABLES.to_vec(), 10, 200, 2, true, Difficulty::Medium),
            3 => ((2..=10).collect(), 12, 500, 2, false, Difficulty::Medium),
            4 | 5 => ((2..=12).collect(), 12, 1000, 2, false, Difficulty::Hard),
            other => return Err(SettingsError::InvalidGrade(other)),
        };

        Ok(Self {
            grade: Some(grade),
            tables: Some(tables),
            table_max: Some(table_max),
            before_after_max: Some(counting_max),
            more_less_max: Some(counting_max),
            digits: Some(digits),
            no_regrouping: Some(no_regrouping),
            difficulty: Some(difficulty),
            ..Self::default()
        })
    }

    /// Fields set in `overrides` replace the ones here.
    #[must_use]
    pub fn overlay(self, overrides: SettingsDraft) -> Self {
        Self {
            grade: overrides.grade.or(self.grade),
            mode: overrides.mode.or(self.mode),
            tables: overrides.tables.or(self.tables),
            table_min: overrides.table_min.or(self.table_min),
            table_max: overrides.table_max.or(self.table_max),
            before_after_min: overrides.before_after_min.or(self.before_after_min),
            before_after_max: overrides.before_after_max.or(self.before_after_max),
            before_after_type: overrides.before_after_type.or(self.before_after_type),
            more_less_min: overrides.more_less_min.or(self.more_less_min),
            more_less_max: overrides.more_less_max.or(self.more_less_max),
            offsets: overrides.offsets.or(self.offsets),
            digits: overrides.digits.or(self.digits),
            no_regrouping: overrides.no_regrouping.or(self.no_regrouping),
            allow_add: overrides.allow_add.or(self.allow_add),
            allow_subtract: overrides.allow_subtract.or(self.allow_subtract),
            difficulty: overrides.difficulty.or(self.difficulty),
            question_count: overrides.question_count.or(self.question_count),
            show_shapes: overrides.show_shapes.or(self.show_shapes),
        }
    }

    /// Resolve defaults, clamp ranges and counts, and normalize range bounds.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` for a grade outside 1..=5, a digit count other than 1 or 2,
    /// or a table value outside 1..=12.
    pub fn validate(self) -> Result<Settings, SettingsError> {
        let grade = self.grade.unwrap_or(2);
        if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
            return Err(SettingsError::InvalidGrade(grade));
        }

        let mut tables = self.tables.unwrap_or_default();
        if let Some(bad) = tables.iter().copied().find(|t| !(1..=12).contains(t)) {
            return Err(SettingsError::InvalidTable(bad));
        }
        tables.sort_unstable();
        tables.dedup();
        if tables.is_empty() {
            tables = DEFAULT_TABLES.to_vec();
        }

        let digits = Digits::try_from(self.digits.unwrap_or(2))?;

        let mut operators = Vec::with_capacity(2);
        if self.allow_add.unwrap_or(true) {
            operators.push(Operator::Add);
        }
        if self.allow_subtract.unwrap_or(true) {
            operators.push(Operator::Subtract);
        }
        if operators.is_empty() {
            operators.push(Operator::Add);
        }

        Ok(Settings {
            grade,
            mode: self.mode.unwrap_or(Mode::Mixed),
            tables,
            table_range: NumberRange::clamped(
                non_zero_or(self.table_min, 1),
                non_zero_or(self.table_max, 10),
                TABLE_BOUNDS,
            ),
            before_after_range: NumberRange::clamped(
                non_zero_or(self.before_after_min, 1),
                non_zero_or(self.before_after_max, 200),
                COUNTING_BOUNDS,
            ),
            before_after_kind: self.before_after_type.unwrap_or_default(),
            more_less_range: NumberRange::clamped(
                non_zero_or(self.more_less_min, 1),
                non_zero_or(self.more_less_max, 300),
                COUNTING_BOUNDS,
            ),
            offsets: self.offsets.unwrap_or_default(),
            digits,
            no_regrouping: self.no_regrouping.unwrap_or(false),
            operators,
            difficulty: self.difficulty.unwrap_or_default(),
            question_count: self
                .question_count
                .unwrap_or(MIN_QUESTIONS)
                .clamp(MIN_QUESTIONS, MAX_QUESTIONS),
            show_shapes: self.show_shapes.unwrap_or(true),
        })
    }
}

// A zero bound means "not filled in", like an empty form field.
fn non_zero_or(value: Option<i64>, fallback: i64) -> i64 {
    value.filter(|v| *v != 0).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_resolves_defaults() {
        let settings = SettingsDraft::new().validate().unwrap();
        assert_eq!(settings.grade(), 2);
        assert_eq!(settings.mode(), Mode::Mixed);
        assert_eq!(settings.tables(), &DEFAULT_TABLES);
        assert_eq!(settings.table_range(), NumberRange::new(1, 10));
        assert_eq!(settings.question_count(), 10);
        assert_eq!(settings.difficulty(), Difficulty::Medium);
        assert_eq!(settings.operators(), &[Operator::Add, Operator::Subtract]);
    }

    #[test]
    fn ranges_are_swapped_and_clamped() {
        let settings = SettingsDraft {
            table_min: Some(15),
            table_max: Some(3),
            before_after_min: Some(5000),
            before_after_max: Some(-4),
            ..SettingsDraft::default()
        }
        .validate()
        .unwrap();

        assert_eq!(settings.table_range(), NumberRange::new(3, 12));
        assert_eq!(settings.before_after_range(), NumberRange::new(1, 1000));
    }

    #[test]
    fn question_count_is_clamped() {
        let low = SettingsDraft {
            question_count: Some(3),
            ..SettingsDraft::default()
        };
        let high = SettingsDraft {
            question_count: Some(99),
            ..SettingsDraft::default()
        };
        assert_eq!(low.validate().unwrap().question_count(), MIN_QUESTIONS);
        assert_eq!(high.validate().unwrap().question_count(), MAX_QUESTIONS);
    }

    #[test]
    fn no_operators_falls_back_to_addition() {
        let settings = SettingsDraft {
            allow_add: Some(false),
            allow_subtract: Some(false),
            ..SettingsDraft::default()
        }
        .validate()
        .unwrap();
        assert_eq!(settings.operators(), &[Operator::Add]);
    }

    #[test]
    fn invalid_fields_are_rejected() {
        let grade = SettingsDraft {
            grade: Some(9),
            ..SettingsDraft::default()
        };
        assert_eq!(grade.validate(), Err(SettingsError::InvalidGrade(9)));

        let digits = SettingsDraft {
            digits: Some(3),
            ..SettingsDraft::default()
        };
        assert_eq!(digits.validate(), Err(SettingsError::InvalidDigits(3)));

        let tables = SettingsDraft {
            tables: Some(vec![2, 13]),
            ..SettingsDraft::default()
        };
        assert_eq!(tables.validate(), Err(SettingsError::InvalidTable(13)));
    }

    fn preset(grade: u8, mode: Mode) -> Settings {
        SettingsDraft {
            mode: Some(mode),
            ..SettingsDraft::for_grade(grade).unwrap()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn grade_presets_match_the_curriculum() {
        let first = preset(1, Mode::Tables);
        assert_eq!(first.tables(), &[2, 5, 10]);
        assert_eq!(first.table_range().max(), 5);
        assert_eq!(first.digits(), Digits::One);
        assert_eq!(first.difficulty(), Difficulty::Easy);

        assert!(first.no_regrouping());

        let third = preset(3, Mode::AddSubtract);
        assert!(!third.no_regrouping());
        assert_eq!(third.before_after_range().max(), 500);
        assert_eq!(third.tables().len(), 9);

        let fifth = preset(5, Mode::Mixed);
        assert_eq!(fifth.difficulty(), Difficulty::Hard);
        assert_eq!(fifth.more_less_range().max(), 1000);

        assert!(SettingsDraft::for_grade(0).is_err());
    }

    #[test]
    fn mixed_modes_add_more_less_from_grade_three() {
        assert!(!Mode::mixed_for_grade(2).contains(&Mode::MoreLess));
        assert!(Mode::mixed_for_grade(3).contains(&Mode::MoreLess));
    }

    #[test]
    fn overrides_win_over_the_preset() {
        let preset = SettingsDraft::for_grade(1).unwrap();
        let merged = preset
            .overlay(SettingsDraft {
                difficulty: Some(Difficulty::Hard),
                tables: Some(vec![9]),
                ..SettingsDraft::default()
            })
            .validate()
            .unwrap();
        assert_eq!(merged.grade(), 1);
        assert_eq!(merged.tables(), &[9]);
        assert_eq!(merged.difficulty(), Difficulty::Hard);
        assert_eq!(merged.digits(), Digits::One);
    }

    #[test]
    fn draft_deserializes_from_camel_case_json() {
        let draft: SettingsDraft = serde_json::from_str(
            r#"{"mode":"beforeAfter","beforeAfterType":"after","difficulty":"hard","questionCount":12}"#,
        )
        .unwrap();
        let settings = draft.validate().unwrap();
        assert_eq!(settings.mode(), Mode::BeforeAfter);
        assert_eq!(settings.before_after_kind(), BeforeAfterKind::After);
        assert_eq!(settings.difficulty(), Difficulty::Hard);
        assert_eq!(settings.question_count(), 12);
    }

    #[test]
    fn modes_parse_from_their_names() {
        for mode in [
            Mode::Tables,
            Mode::BeforeAfter,
            Mode::MoreLess,
            Mode::AddSubtract,
            Mode::Mixed,
        ] {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
        assert!("fractions".parse::<Mode>().is_err());
    }

    #[test]
    fn time_limits_follow_difficulty() {
        assert_eq!(Difficulty::Easy.time_limit(), 30);
        assert_eq!(Difficulty::Medium.time_limit(), 20);
        assert_eq!(Difficulty::Hard.time_limit(), 10);
    }
}
