//! Metrics recording for store operations.

use std::time::Instant;

/// Records count and latency for one store operation.
///
/// Emits `cookbook_store_operations_total` (counter) and
/// `cookbook_store_operation_duration_ms` (histogram), both labelled by
/// operation and status ("success" or "error").
pub fn record_operation_metrics(operation: &'static str, start: Instant, status: &'static str) {
    metrics::counter!(
        "cookbook_store_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "cookbook_store_operation_duration_ms",
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Runs `body`, recording its outcome under `operation`.
pub fn timed<T, E>(operation: &'static str, body: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let start = Instant::now();
    let result = body();
    let status = if result.is_ok() { "success" } else { "error" };
    record_operation_metrics(operation, start, status);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_passes_result_through() {
        let ok: Result<u8, ()> = timed("test_ok", || Ok(3));
        assert_eq!(ok, Ok(3));

        let err: Result<u8, &str> = timed("test_err", || Err("boom"));
        assert_eq!(err, Err("boom"));
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_operation_metrics("noop", Instant::now(), "success");
    }
}
