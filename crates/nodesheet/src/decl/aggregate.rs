//! Aggregate functions computed per group.

use std::fmt;
use std::sync::Arc;

use crate::value::Scalar;

type AggregateFn = Arc<dyn Fn(&[Scalar]) -> Option<Scalar> + Send + Sync>;

/// Summarises a field across the entries of one group.
///
/// Aggregators only ever see available values: missing and unavailable
/// entries are filtered out before the call. `None` means "no aggregate" and
/// renders as an empty cell.
#[derive(Clone)]
pub enum Aggregator {
    /// Sum of numeric values. Integral when every input is an integer.
    Sum,
    /// Number of available values.
    Count,
    Min,
    Max,
    /// Arithmetic mean of numeric values.
    Average,
    Custom(AggregateFn),
}

impl Aggregator {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[Scalar]) -> Option<Scalar> + Send + Sync + 'static,
    {
        Aggregator::Custom(Arc::new(f))
    }

    pub fn aggregate(&self, values: &[Scalar]) -> Option<Scalar> {
        match self {
            Aggregator::Sum => sum(values),
            Aggregator::Count => Some(Scalar::Int(values.len() as i64)),
            Aggregator::Min => values.iter().min_by(|a, b| a.sort_cmp(b)).cloned(),
            Aggregator::Max => values.iter().max_by(|a, b| a.sort_cmp(b)).cloned(),
            Aggregator::Average => {
                let numbers: Vec<f64> = values.iter().filter_map(Scalar::as_f64).collect();
                if numbers.is_empty() {
                    None
                } else {
                    Some(Scalar::Float(
                        numbers.iter().sum::<f64>() / numbers.len() as f64,
                    ))
                }
            }
            Aggregator::Custom(f) => f(values),
        }
    }
}

fn sum(values: &[Scalar]) -> Option<Scalar> {
    let numbers: Vec<Scalar> = values.iter().filter_map(Scalar::to_number).collect();
    if numbers.is_empty() {
        return None;
    }

    let all_int = numbers.iter().all(|n| matches!(n, Scalar::Int(_)));
    if all_int {
        let total = numbers.iter().try_fold(0i64, |acc, n| match n {
            Scalar::Int(i) => acc.checked_add(*i),
            _ => None,
        });
        if let Some(total) = total {
            return Some(Scalar::Int(total));
        }
    }

    Some(Scalar::Float(
        numbers.iter().filter_map(Scalar::as_f64).sum::<f64>(),
    ))
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregator::Sum => write!(f, "Sum"),
            Aggregator::Count => write!(f, "Count"),
            Aggregator::Min => write!(f, "Min"),
            Aggregator::Max => write!(f, "Max"),
            Aggregator::Average => write!(f, "Average"),
            Aggregator::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

impl PartialEq for Aggregator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Aggregator::Custom(a), Aggregator::Custom(b)) => Arc::ptr_eq(a, b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}
