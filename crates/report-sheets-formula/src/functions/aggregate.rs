//! Aggregation functions over sample series

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::Value;

/// Flatten every argument into one sample sequence, preserving order
fn samples(args: &[Value]) -> Vec<f64> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::Number(n) => out.push(*n),
            Value::List(items) => out.extend_from_slice(items),
        }
    }
    out
}

/// LST function: the last sample, or 0 when there are none
pub fn fn_lst(args: &[Value]) -> FormulaResult<f64> {
    Ok(samples(args).last().copied().unwrap_or(0.0))
}

/// SNM function: the first sample, or 0 when there are none
pub fn fn_snm(args: &[Value]) -> FormulaResult<f64> {
    Ok(samples(args).first().copied().unwrap_or(0.0))
}

/// AVE function: arithmetic mean, or 0 when there are no samples
pub fn fn_ave(args: &[Value]) -> FormulaResult<f64> {
    let values = samples(args);
    if values.is_empty() {
        return Ok(0.0);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// COUNT function
pub fn fn_count(args: &[Value]) -> FormulaResult<f64> {
    Ok(samples(args).len() as f64)
}

/// SUM function
pub fn fn_sum(args: &[Value]) -> FormulaResult<f64> {
    Ok(samples(args).iter().sum())
}

/// MAX function
pub fn fn_max(args: &[Value]) -> FormulaResult<f64> {
    samples(args)
        .into_iter()
        .reduce(f64::max)
        .ok_or_else(|| FormulaError::function("max", "no samples to compare"))
}

/// MIN function
pub fn fn_min(args: &[Value]) -> FormulaResult<f64> {
    samples(args)
        .into_iter()
        .reduce(f64::min)
        .ok_or_else(|| FormulaError::function("min", "no samples to compare"))
}

/// TAVE function: sum of the series divided by a total sample count
///
/// The total defaults to the series length. It may exceed the length when
/// some readings were discarded as non-numeric.
pub fn fn_tave(args: &[Value]) -> FormulaResult<f64> {
    let values = match args.first() {
        Some(series) => samples(std::slice::from_ref(series)),
        None => Vec::new(),
    };

    let total = match args.get(1) {
        None => values.len() as f64,
        Some(arg) => arg
            .as_scalar()
            .ok_or_else(|| FormulaError::function("tave", "total must be a single number"))?,
    };
    if total < 0.0 {
        return Err(FormulaError::function("tave", "total must not be negative"));
    }
    if total == 0.0 {
        return Ok(0.0);
    }

    Ok(values.iter().sum::<f64>() / total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<Value> {
        vec![Value::List(values.to_vec())]
    }

    #[test]
    fn test_positional_functions() {
        let args = series(&[10.0, 20.0, 30.0]);
        assert_eq!(fn_lst(&args).unwrap(), 30.0);
        assert_eq!(fn_snm(&args).unwrap(), 10.0);

        // A scalar is its own first and last sample
        assert_eq!(fn_lst(&[Value::Number(4.5)]).unwrap(), 4.5);
        assert_eq!(fn_snm(&[Value::Number(4.5)]).unwrap(), 4.5);
    }

    #[test]
    fn test_empty_series_policies() {
        let empty = series(&[]);
        assert_eq!(fn_lst(&empty).unwrap(), 0.0);
        assert_eq!(fn_snm(&empty).unwrap(), 0.0);
        assert_eq!(fn_ave(&empty).unwrap(), 0.0);
        assert_eq!(fn_sum(&empty).unwrap(), 0.0);
        assert_eq!(fn_count(&empty).unwrap(), 0.0);
        assert!(matches!(
            fn_max(&empty),
            Err(FormulaError::FunctionEvaluation { function, .. }) if function == "max"
        ));
        assert!(matches!(
            fn_min(&empty),
            Err(FormulaError::FunctionEvaluation { function, .. }) if function == "min"
        ));
    }

    #[test]
    fn test_reductions() {
        let args = series(&[3.0, -1.0, 7.0, 1.0]);
        assert_eq!(fn_ave(&args).unwrap(), 2.5);
        assert_eq!(fn_count(&args).unwrap(), 4.0);
        assert_eq!(fn_sum(&args).unwrap(), 10.0);
        assert_eq!(fn_max(&args).unwrap(), 7.0);
        assert_eq!(fn_min(&args).unwrap(), -1.0);
    }

    #[test]
    fn test_variadic_arguments_are_flattened() {
        let args = [Value::List(vec![1.0, 2.0]), Value::Number(3.0)];
        assert_eq!(fn_sum(&args).unwrap(), 6.0);
        assert_eq!(fn_lst(&args).unwrap(), 3.0);
    }

    #[test]
    fn test_tave_total() {
        let values = Value::List(vec![2.0, 4.0, 6.0]);
        assert_eq!(fn_tave(&[values.clone()]).unwrap(), 4.0);
        assert_eq!(fn_tave(&[values.clone(), Value::Number(6.0)]).unwrap(), 2.0);
        assert_eq!(fn_tave(&[values.clone(), Value::Number(0.0)]).unwrap(), 0.0);
        assert_eq!(fn_tave(&series(&[])).unwrap(), 0.0);
        assert!(fn_tave(&[values.clone(), Value::Number(-1.0)]).is_err());
        assert!(fn_tave(&[values, Value::List(vec![1.0, 2.0])]).is_err());
    }
}
