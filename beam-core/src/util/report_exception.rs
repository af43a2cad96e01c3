//! "report and continue": the points where a routine or background task catches an
//! otherwise-unhandled error and logs it rather than propagating it further -- a
//! routine's top-level function catch, and the `TaskRunner` drain loop -- both funnel
//! through this one logging call.

use std::fmt::Display;

/// logs `error` at `tracing::error!` under a consistent target, with `context`
/// naming the call site (e.g. `"scheduler routine"`, `"TaskRunner task"`).
pub fn report_exception<E: Display>(context: &str, error: E) {
    tracing::error!(target: "beam_core::report_exception", context, %error, "unhandled error, continuing");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn does_not_panic() {
        report_exception("test", "boom");
    }
}
