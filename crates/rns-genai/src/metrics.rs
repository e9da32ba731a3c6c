//! Counters and latency for calls to the hosted models.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding binary installs a recorder.

use std::time::Instant;

use metrics::{counter, histogram};

/// HTTP calls, labelled by client operation and status code.
pub const REQUESTS: &str = "genai_requests_total";
/// Wall time of each HTTP call, labelled by client operation.
pub const REQUEST_DURATION: &str = "genai_request_duration_seconds";
/// Status checks of long-running operations, labelled by whether they were done.
pub const OPERATION_POLLS: &str = "genai_operation_polls_total";

pub fn record_request(operation: &'static str, status: u16, started: Instant) {
    counter!(REQUESTS, "operation" => operation, "status" => status.to_string()).increment(1);
    histogram!(REQUEST_DURATION, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_poll(done: bool) {
    let done = if done { "true" } else { "false" };
    counter!(OPERATION_POLLS, "done" => done).increment(1);
}
