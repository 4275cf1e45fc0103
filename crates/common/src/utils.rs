//! Utility functions for Carton
//!
//! This module provides small helpers used throughout the Carton crates.

use std::time::{Duration, Instant};
use std::future::Future;
use tokio::time::timeout;
use crate::error::Error;

/// Formats a duration into a human-readable string
///
/// # Examples
///
/// ```
/// use common::utils::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
/// assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs == 0 {
        let millis = duration.subsec_millis();
        if millis == 0 {
            return format!("{}µs", duration.subsec_micros());
        }
        return format!("{}ms", millis);
    }

    let hours = total_secs / (60 * 60);
    let minutes = (total_secs % (60 * 60)) / 60;
    let seconds = total_secs % 60;

    let mut result = String::new();

    if hours > 0 {
        result.push_str(&format!("{}h ", hours));
    }

    if minutes > 0 || !result.is_empty() {
        result.push_str(&format!("{}m ", minutes));
    }

    result.push_str(&format!("{}s", seconds));

    result
}

/// Formats tensor dimensions as `[d0, d1, ...]`
///
/// # Examples
///
/// ```
/// use common::utils::format_shape;
///
/// assert_eq!(format_shape(&[4, 5]), "[4, 5]");
/// assert_eq!(format_shape(&[]), "[]");
/// ```
pub fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("[{}]", dims.join(", "))
}

/// Executes a future with a timeout
///
/// Elapsing the deadline yields `Error::Timeout` naming the operation.
///
/// # Examples
///
/// ```
/// use common::utils::execute_with_timeout;
/// use std::time::Duration;
///
/// let rt = tokio::runtime::Builder::new_current_thread()
///     .enable_time()
///     .build()
///     .unwrap();
/// let value = rt
///     .block_on(execute_with_timeout(
///         async { Ok::<_, anyhow::Error>(42) },
///         Duration::from_secs(1),
///         "example operation",
///     ))
///     .unwrap();
/// assert_eq!(value, 42);
/// ```
pub async fn execute_with_timeout<T, F>(
    future: F,
    duration: Duration,
    operation_name: &str,
) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(format!(
            "Operation '{}' timed out after {}",
            operation_name,
            format_duration(duration)
        ))
        .into()),
    }
}

/// Measures the execution time of a function
pub fn measure_execution_time<T, F>(f: F) -> anyhow::Result<(T, Duration)>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    let start = Instant::now();
    let result = f()?;
    let duration = start.elapsed();
    Ok((result, duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_micros(12)), "12µs");
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(3600 + 2)), "1h 0m 2s");
    }

    #[tokio::test]
    async fn test_execute_with_timeout_elapses() {
        let err = execute_with_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            Duration::from_millis(10),
            "slow load",
        )
        .await
        .unwrap_err();

        let inner = err.downcast_ref::<Error>().unwrap();
        assert!(inner.is_timeout());
        assert!(err.to_string().contains("slow load"));
    }

    #[test]
    fn test_measure_execution_time_propagates_errors() {
        let (value, _) = measure_execution_time(|| Ok(7)).unwrap();
        assert_eq!(value, 7);

        let failed = measure_execution_time::<(), _>(|| Err(Error::Internal("boom".into()).into()));
        assert!(failed.is_err());
    }
}
