/// Returned from a run that was cut short by an interruption or termination request.
///
/// The run has still taken its final sample and flushed everything it collected by the time this
/// error is surfaced. It exists so that `main` exits with a non-zero status, which tells callers
/// apart from a run that completed naturally.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct InterruptedError {
    msg: String,
}

impl Default for InterruptedError {
    fn default() -> Self {
        Self {
            msg: "Run interrupted before natural completion".to_string(),
        }
    }
}
