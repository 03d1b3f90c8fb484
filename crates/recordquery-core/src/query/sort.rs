use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::record::{stringify, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCondition {
    pub field: String,
    pub direction: SortDirection,
}

impl SortCondition {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
}

/// Returns the records ordered by the conditions, first condition primary.
///
/// Keys are the lower-cased string forms of the values; they are never
/// coerced to numbers. This is not plain string order: runs of ASCII digits
/// inside a key compare by value, so `"5"` sorts before `"10"` and `"item 2"`
/// before `"item 10"`, where a bytewise `<` would put `"10"` first. Ties keep
/// their input order.
pub fn sort_records(records: &[Record], conditions: &[SortCondition]) -> Vec<Record> {
    if conditions.is_empty() {
        return records.to_vec();
    }

    let mut keyed = records
        .iter()
        .map(|r| {
            let keys = conditions
                .iter()
                .map(|c| stringify(r.value(&c.field).as_deref()).to_lowercase())
                .collect::<Vec<_>>();
            (keys, r)
        })
        .collect::<Vec<_>>();

    // stable
    keyed.sort_by(|(a, _), (b, _)| {
        conditions
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(c, (ka, kb))| c.direction.apply(compare_keys(ka, kb)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    keyed.into_iter().map(|(_, r)| r.clone()).collect()
}

/// Character-wise comparison with digit runs ordered by magnitude. Equal
/// magnitudes fall back to plain string order so the result stays total.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    let (mut xs, mut ys) = (a.char_indices().peekable(), b.char_indices().peekable());
    loop {
        match (xs.peek().copied(), ys.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((i, x)), Some((j, y))) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let run_a = digit_run(&a[i..]);
                let run_b = digit_run(&b[j..]);
                let ord = compare_magnitude(run_a, run_b);
                if ord.is_ne() {
                    return ord;
                }
                xs.nth(run_a.len() - 1);
                ys.nth(run_b.len() - 1);
            }
            (Some((_, x)), Some((_, y))) => {
                let ord = x.cmp(&y);
                if ord.is_ne() {
                    return ord;
                }
                xs.next();
                ys.next();
            }
        }
    }
}

fn digit_run(s: &str) -> &str {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    &s[..end]
}

fn compare_magnitude(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Replaces the condition on the same field, or appends.
pub fn upsert_sort_condition(conditions: &mut Vec<SortCondition>, condition: SortCondition) {
    match conditions.iter_mut().find(|c| c.field == condition.field) {
        Some(existing) => *existing = condition,
        None => conditions.push(condition),
    }
}

/// Swaps a condition with its neighbour. Out-of-range moves do nothing.
pub fn move_sort_condition(conditions: &mut [SortCondition], index: usize, to: Move) {
    let target = match to {
        Move::Up => index.checked_sub(1),
        Move::Down => index.checked_add(1),
    };
    if let Some(target) = target {
        if index < conditions.len() && target < conditions.len() {
            conditions.swap(index, target);
        }
    }
}
