use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::fmt;
use tracing::debug;

use crate::model::settings::DEFAULT_TABLES;
use crate::model::{BeforeAfterKind, Digits, Mode, NumberRange, Operator, Question, Settings};

/// Random draws allowed before the no-regrouping path builds operands digit by digit.
pub const MAX_REJECTION_ATTEMPTS: usize = 100;

//
// ─── GENERATOR ─────────────────────────────────────────────────────────────────
//

/// Produces questions for a session from an owned random source.
pub struct QuestionGenerator<R = StdRng> {
    rng: R,
}

impl QuestionGenerator<StdRng> {
    /// Generator seeded from the operating system.
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic generator, for tests and reproducible drills.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> QuestionGenerator<R> {
    #[must_use]
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Generate the next question. Always returns a valid question.
    pub fn generate(&mut self, settings: &Settings) -> Question {
        generate_question(settings, &mut self.rng)
    }
}

impl<R> fmt::Debug for QuestionGenerator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestionGenerator").finish_non_exhaustive()
    }
}

/// Generate one question for `settings`, drawing from `rng`.
pub fn generate_question<R: Rng>(settings: &Settings, rng: &mut R) -> Question {
    let mode = match settings.mode() {
        Mode::Mixed => Mode::mixed_for_grade(settings.grade())
            .choose(rng)
            .copied()
            .unwrap_or(Mode::Tables),
        mode => mode,
    };

    match mode {
        Mode::Tables => tables(settings, rng),
        Mode::BeforeAfter => before_after(settings, rng),
        Mode::MoreLess => more_less(settings, rng),
        Mode::AddSubtract | Mode::Mixed => add_subtract(settings, rng),
    }
}

fn pick<R: Rng>(range: NumberRange, rng: &mut R) -> i64 {
    rng.random_range(range.min()..=range.max())
}

//
// ─── FAMILIES ──────────────────────────────────────────────────────────────────
//

fn tables<R: Rng>(settings: &Settings, rng: &mut R) -> Question {
    let table = settings
        .tables()
        .choose(rng)
        .copied()
        .unwrap_or(DEFAULT_TABLES[0]);
    let multiplier = pick(settings.table_range(), rng);
    Question::new(format!("{table} × {multiplier}"), table * multiplier)
}

fn before_after<R: Rng>(settings: &Settings, rng: &mut R) -> Question {
    let range = settings.before_after_range();
    let before = match settings.before_after_kind() {
        BeforeAfterKind::Before => true,
        BeforeAfterKind::After => false,
        BeforeAfterKind::Both => rng.random_bool(0.5),
    };

    // Nudge inward so the answer never leaves the range.
    let mut value = pick(range, rng);
    if before && value <= range.min() {
        value = range.min() + 1;
    }
    if !before && value >= range.max() {
        value = range.max() - 1;
    }

    if before {
        Question::new(format!("What comes before {value}?"), value - 1)
    } else {
        Question::new(format!("What comes after {value}?"), value + 1)
    }
}

fn more_less<R: Rng>(settings: &Settings, rng: &mut R) -> Question {
    let range = settings.more_less_range();
    let options = settings.offsets().options();
    let (mut label, mut delta) = options.choose(rng).copied().unwrap_or(("10 more", 10));

    let mut base = pick(range, rng);
    let fits = range.max() - range.min() >= delta.abs();
    if fits {
        if delta < 0 && base + delta < range.min() {
            base = range.min() - delta;
        }
        if delta > 0 && base + delta > range.max() {
            base = range.max() - delta;
        }
    } else if base + delta < 0 {
        // Range narrower than the offset: keep the base in range and ask the
        // "more" form instead of producing a negative answer.
        delta = -delta;
        label = more_label(delta);
    }

    Question::new(format!("{label} than {base}"), base + delta)
}

fn more_label(delta: i64) -> &'static str {
    if delta >= 100 { "100 more" } else { "10 more" }
}

fn add_subtract<R: Rng>(settings: &Settings, rng: &mut R) -> Question {
    let op = settings
        .operators()
        .choose(rng)
        .copied()
        .unwrap_or(Operator::Add);

    let (a, b) = if settings.no_regrouping() && settings.digits() == Digits::Two {
        no_regrouping_operands(op, rng)
    } else {
        let operands = settings.digits().operand_range();
        let (a, b) = (pick(operands, rng), pick(operands, rng));
        if op == Operator::Subtract && b > a {
            (b, a)
        } else {
            (a, b)
        }
    };

    let answer = op.apply(a, b);
    let question = Question::new(format!("{a} {} {b}", op.symbol()), answer);
    if op == Operator::Add && settings.show_shapes() {
        question.with_shapes(answer)
    } else {
        question
    }
}

//
// ─── NO-REGROUPING OPERANDS ────────────────────────────────────────────────────
//

/// Two-digit operands whose column-wise sum (or difference) needs no carrying (borrowing).
fn no_regrouping_operands<R: Rng>(op: Operator, rng: &mut R) -> (i64, i64) {
    let two_digits = Digits::Two.operand_range();
    for _ in 0..MAX_REJECTION_ATTEMPTS {
        let (a, b) = (pick(two_digits, rng), pick(two_digits, rng));
        if is_regrouping_free(op, a, b) {
            return (a, b);
        }
    }

    debug!(?op, "rejection sampling exhausted, building operands digit-wise");
    construct_operands(op, rng)
}

#[must_use]
pub fn is_regrouping_free(op: Operator, a: i64, b: i64) -> bool {
    let (a_tens, a_ones) = (a / 10, a % 10);
    let (b_tens, b_ones) = (b / 10, b % 10);
    match op {
        Operator::Add => a_tens + b_tens < 10 && a_ones + b_ones < 10,
        Operator::Subtract => a >= b && a_tens >= b_tens && a_ones >= b_ones,
    }
}

fn construct_operands<R: Rng>(op: Operator, rng: &mut R) -> (i64, i64) {
    match op {
        Operator::Add => {
            let a_tens = rng.random_range(1..=8);
            let b_tens = rng.random_range(1..=9 - a_tens);
            let a_ones = rng.random_range(0..=9);
            let b_ones = rng.random_range(0..=9 - a_ones);
            (a_tens * 10 + a_ones, b_tens * 10 + b_ones)
        }
        Operator::Subtract => {
            let a_tens = rng.random_range(1..=9);
            let b_tens = rng.random_range(1..=a_tens);
            let a_ones = rng.random_range(0..=9);
            let b_ones = rng.random_range(0..=a_ones);
            (a_tens * 10 + a_ones, b_tens * 10 + b_ones)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Offsets, SettingsDraft};

    const ROUNDS: usize = 2_000;

    fn settings(draft: SettingsDraft) -> Settings {
        draft.validate().unwrap()
    }

    /// Split `"a op b"` back into its parts.
    fn operands(text: &str) -> (i64, char, i64) {
        let parts: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(parts.len(), 3, "unexpected question text: {text}");
        (
            parts[0].parse().unwrap(),
            parts[1].chars().next().unwrap(),
            parts[2].parse().unwrap(),
        )
    }

    #[test]
    fn single_table_and_multiplier_is_deterministic() {
        let s = settings(SettingsDraft {
            mode: Some(Mode::Tables),
            tables: Some(vec![7]),
            table_min: Some(3),
            table_max: Some(3),
            ..SettingsDraft::default()
        });
        let q = QuestionGenerator::seeded(1).generate(&s);
        assert_eq!(q.text(), "7 × 3");
        assert_eq!(q.answer(), 21);
        assert_eq!(q.shapes(), None);
    }

    #[test]
    fn table_answers_match_text() {
        let s = settings(SettingsDraft {
            mode: Some(Mode::Tables),
            tables: Some(vec![2, 9, 12]),
            table_min: Some(12),
            table_max: Some(1),
            ..SettingsDraft::default()
        });
        let mut generator = QuestionGenerator::seeded(7);
        for _ in 0..ROUNDS {
            let q = generator.generate(&s);
            let (table, multiplier) = q.text().split_once(" × ").unwrap();
            let (table, multiplier): (i64, i64) =
                (table.parse().unwrap(), multiplier.parse().unwrap());
            assert!([2, 9, 12].contains(&table));
            assert!((1..=12).contains(&multiplier));
            assert_eq!(q.answer(), table * multiplier);
        }
    }

    #[test]
    fn no_regrouping_addition_never_carries() {
        let s = settings(SettingsDraft {
            mode: Some(Mode::AddSubtract),
            digits: Some(2),
            no_regrouping: Some(true),
            allow_subtract: Some(false),
            ..SettingsDraft::default()
        });
        let mut generator = QuestionGenerator::seeded(11);
        for _ in 0..ROUNDS {
            let q = generator.generate(&s);
            let (a, op, b) = operands(q.text());
            assert_eq!(op, '+');
            assert!((10..=99).contains(&a) && (10..=99).contains(&b));
            assert!(a % 10 + b % 10 < 10, "ones carry in {}", q.text());
            assert!(a / 10 + b / 10 < 10, "tens carry in {}", q.text());
            assert_eq!(q.answer(), a + b);
        }
    }

    #[test]
    fn no_regrouping_subtraction_never_borrows() {
        let s = settings(SettingsDraft {
            mode: Some(Mode::AddSubtract),
            digits: Some(2),
            no_regrouping: Some(true),
            allow_add: Some(false),
            ..SettingsDraft::default()
        });
        let mut generator = QuestionGenerator::seeded(13);
        for _ in 0..ROUNDS {
            let q = generator.generate(&s);
            let (a, op, b) = operands(q.text());
            assert_eq!(op, '-');
            assert!(a % 10 >= b % 10 && a / 10 >= b / 10);
            assert!(q.answer() >= 0);
            assert_eq!(q.answer(), a - b);
        }
    }

    #[test]
    fn subtraction_is_never_negative() {
        for digits in [1, 2] {
            let s = settings(SettingsDraft {
                mode: Some(Mode::AddSubtract),
                digits: Some(digits),
                no_regrouping: Some(false),
                allow_add: Some(false),
                ..SettingsDraft::default()
            });
            let mut generator = QuestionGenerator::seeded(u64::from(digits));
            for _ in 0..ROUNDS {
                let q = generator.generate(&s);
                let (a, _, b) = operands(q.text());
                assert!(q.answer() >= 0, "{} gave {}", q.text(), q.answer());
                assert_eq!(q.answer(), a - b);
                assert_eq!(q.shapes(), None);
            }
        }
    }

    #[test]
    fn constructive_fallback_satisfies_constraints() {
        let mut rng = StdRng::seed_from_u64(99);
        for op in [Operator::Add, Operator::Subtract] {
            for _ in 0..ROUNDS {
                let (a, b) = construct_operands(op, &mut rng);
                assert!((10..=99).contains(&a) && (10..=99).contains(&b));
                assert!(is_regrouping_free(op, a, b), "{a} {op:?} {b}");
            }
        }
    }

    #[test]
    fn shapes_only_for_small_sums_when_enabled() {
        let draft = SettingsDraft {
            mode: Some(Mode::AddSubtract),
            digits: Some(1),
            allow_subtract: Some(false),
            ..SettingsDraft::default()
        };
        let mut generator = QuestionGenerator::seeded(3);

        let shown = settings(draft.clone());
        for _ in 0..200 {
            let q = generator.generate(&shown);
            assert_eq!(q.shapes(), Some(u32::try_from(q.answer()).unwrap()));
        }

        let hidden = settings(SettingsDraft {
            show_shapes: Some(false),
            ..draft
        });
        for _ in 0..200 {
            assert_eq!(generator.generate(&hidden).shapes(), None);
        }
    }

    #[test]
    fn before_after_answers_stay_in_range() {
        for kind in [BeforeAfterKind::Before, BeforeAfterKind::After, BeforeAfterKind::Both] {
            let s = settings(SettingsDraft {
                mode: Some(Mode::BeforeAfter),
                before_after_min: Some(40),
                before_after_max: Some(45),
                before_after_type: Some(kind),
                ..SettingsDraft::default()
            });
            let mut generator = QuestionGenerator::seeded(5);
            for _ in 0..ROUNDS {
                let q = generator.generate(&s);
                assert!((40..=45).contains(&q.answer()), "{} -> {}", q.text(), q.answer());
                let value: i64 = q
                    .text()
                    .trim_end_matches('?')
                    .rsplit(' ')
                    .next()
                    .unwrap()
                    .parse()
                    .unwrap();
                if q.text().contains("before") {
                    assert_ne!(kind, BeforeAfterKind::After);
                    assert_eq!(q.answer(), value - 1);
                } else {
                    assert_ne!(kind, BeforeAfterKind::Before);
                    assert_eq!(q.answer(), value + 1);
                }
            }
        }
    }

    #[test]
    fn single_value_before_after_range_answers_the_bound() {
        for kind in [BeforeAfterKind::Before, BeforeAfterKind::After, BeforeAfterKind::Both] {
            let s = settings(SettingsDraft {
                mode: Some(Mode::BeforeAfter),
                before_after_min: Some(7),
                before_after_max: Some(7),
                before_after_type: Some(kind),
                ..SettingsDraft::default()
            });
            let mut generator = QuestionGenerator::seeded(29);
            for _ in 0..200 {
                let q = generator.generate(&s);
                assert_eq!(q.answer(), 7, "{}", q.text());
                match kind {
                    BeforeAfterKind::Before => assert_eq!(q.text(), "What comes before 8?"),
                    BeforeAfterKind::After => assert_eq!(q.text(), "What comes after 6?"),
                    BeforeAfterKind::Both => assert!(
                        q.text() == "What comes before 8?" || q.text() == "What comes after 6?",
                        "{}",
                        q.text()
                    ),
                }
            }
        }
    }

    #[test]
    fn narrow_more_range_keeps_the_base() {
        let s = settings(SettingsDraft {
            mode: Some(Mode::MoreLess),
            more_less_min: Some(1),
            more_less_max: Some(5),
            offsets: Some(Offsets {
                more10: true,
                less10: false,
                more100: true,
                less100: false,
            }),
            ..SettingsDraft::default()
        });
        let mut generator = QuestionGenerator::seeded(37);
        for _ in 0..200 {
            let q = generator.generate(&s);
            let (label, base) = q.text().split_once(" than ").unwrap();
            let base: i64 = base.parse().unwrap();
            let delta = match label {
                "10 more" => 10,
                "100 more" => 100,
                other => panic!("unexpected label {other}"),
            };
            assert!((1..=5).contains(&base), "{}", q.text());
            assert_eq!(q.answer(), base + delta);
        }
    }

    #[test]
    fn more_less_results_stay_in_range() {
        let s = settings(SettingsDraft {
            mode: Some(Mode::MoreLess),
            more_less_min: Some(50),
            more_less_max: Some(400),
            offsets: Some(Offsets {
                more10: true,
                less10: true,
                more100: true,
                less100: true,
            }),
            ..SettingsDraft::default()
        });
        let mut generator = QuestionGenerator::seeded(17);
        for _ in 0..ROUNDS {
            let q = generator.generate(&s);
            let (label, base) = q.text().split_once(" than ").unwrap();
            let base: i64 = base.parse().unwrap();
            let delta = match label {
                "10 more" => 10,
                "10 less" => -10,
                "100 more" => 100,
                "100 less" => -100,
                other => panic!("unexpected label {other}"),
            };
            assert!((50..=400).contains(&base));
            assert!((50..=400).contains(&q.answer()));
            assert_eq!(q.answer(), base + delta);
        }
    }

    #[test]
    fn more_less_defaults_to_ten_more() {
        let s = settings(SettingsDraft {
            mode: Some(Mode::MoreLess),
            offsets: Some(Offsets {
                more10: false,
                less10: false,
                more100: false,
                less100: false,
            }),
            ..SettingsDraft::default()
        });
        let q = QuestionGenerator::seeded(2).generate(&s);
        assert!(q.text().starts_with("10 more than "));
    }

    #[test]
    fn narrow_more_less_range_never_goes_negative() {
        let s = settings(SettingsDraft {
            mode: Some(Mode::MoreLess),
            more_less_min: Some(1),
            more_less_max: Some(5),
            offsets: Some(Offsets {
                more10: false,
                less10: false,
                more100: false,
                less100: true,
            }),
            ..SettingsDraft::default()
        });
        let mut generator = QuestionGenerator::seeded(23);
        for _ in 0..200 {
            let q = generator.generate(&s);
            assert!(q.text().starts_with("100 more than "), "{}", q.text());
            assert!(q.answer() > 0);
        }
    }

    #[test]
    fn mixed_mode_respects_grade() {
        let young = settings(SettingsDraft {
            grade: Some(1),
            mode: Some(Mode::Mixed),
            ..SettingsDraft::default()
        });
        let mut generator = QuestionGenerator::seeded(31);
        for _ in 0..ROUNDS {
            assert!(!generator.generate(&young).text().contains(" than "));
        }

        let older = settings(SettingsDraft {
            grade: Some(4),
            mode: Some(Mode::Mixed),
            ..SettingsDraft::default()
        });
        let saw_more_less = (0..ROUNDS).any(|_| generator.generate(&older).text().contains(" than "));
        assert!(saw_more_less);
    }
}
