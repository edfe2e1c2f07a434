use super::models::Config;
use thiserror::Error;

/// Smallest worker stack we accept; below this the hosted runtime overflows.
pub const MIN_STACK_SIZE: u64 = 64 * 1024;
/// Largest worker stack we accept; fits in `usize` on 32-bit targets.
pub const MAX_STACK_SIZE: u64 = 1024 * 1024 * 1024;
pub const MAX_VIEWERS: usize = 256;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("exit_poll_attempts must be at least 1")]
    NoExitPollAttempts,

    #[error("Duration must be positive: {field}")]
    ZeroDuration { field: &'static str },

    #[error("stack_size ({actual}) is below the minimum of {min} bytes")]
    StackTooSmall { actual: u64, min: u64 },

    #[error("stack_size ({actual}) exceeds the maximum of {max} bytes")]
    StackTooLarge { actual: u64, max: u64 },

    #[error("viewers must be between 1 and {max}, got {actual}")]
    ViewerCount { actual: usize, max: usize },

    #[error("log_filter must not be empty")]
    EmptyLogFilter,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_lifecycle(config)?;
    validate_demo(config)?;
    validate_telemetry(config)?;
    Ok(())
}

fn validate_lifecycle(config: &Config) -> Result<(), ValidationError> {
    let lifecycle = &config.lifecycle;

    if lifecycle.exit_poll_attempts == 0 {
        return Err(ValidationError::NoExitPollAttempts);
    }

    if lifecycle.exit_poll_interval.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "lifecycle.exit_poll_interval",
        });
    }

    // A zero wait_end_timeout is a legitimate poll; a zero start bound is not.
    if lifecycle.start_timeout.is_some_and(|t| t.is_zero()) {
        return Err(ValidationError::ZeroDuration {
            field: "lifecycle.start_timeout",
        });
    }

    if let Some(stack_size) = lifecycle.stack_size {
        if stack_size.as_u64() < MIN_STACK_SIZE {
            return Err(ValidationError::StackTooSmall {
                actual: stack_size.as_u64(),
                min: MIN_STACK_SIZE,
            });
        }
        stack_bytes(stack_size.as_u64())?;
    }

    Ok(())
}

/// Convert a configured stack size to the `usize` the thread builder takes.
pub(super) fn stack_bytes(size: u64) -> Result<usize, ValidationError> {
    if size > MAX_STACK_SIZE {
        return Err(ValidationError::StackTooLarge {
            actual: size,
            max: MAX_STACK_SIZE,
        });
    }
    usize::try_from(size).map_err(|_| ValidationError::StackTooLarge {
        actual: size,
        max: MAX_STACK_SIZE,
    })
}

fn validate_demo(config: &Config) -> Result<(), ValidationError> {
    let viewers = config.demo.viewers;
    if viewers == 0 || viewers > MAX_VIEWERS {
        return Err(ValidationError::ViewerCount {
            actual: viewers,
            max: MAX_VIEWERS,
        });
    }

    if config.demo.tick.is_zero() {
        return Err(ValidationError::ZeroDuration { field: "demo.tick" });
    }

    Ok(())
}

fn validate_telemetry(config: &Config) -> Result<(), ValidationError> {
    if config.telemetry.log_filter.trim().is_empty() {
        return Err(ValidationError::EmptyLogFilter);
    }
    Ok(())
}
