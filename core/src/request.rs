//! Shared contract for request models built through fluent builders.
//!
//! Builders are consuming: every `with_*` call takes `self` and returns the
//! builder with one more field set, and a terminal call consumes it, so a
//! builder cannot be reused after its request has been sent. Intermediate
//! calls only accumulate data. Constraints spanning several fields are
//! checked once, when the terminal call builds the model, so a chain that
//! sets conflicting fields only fails at that point.

use crate::error::ApiError;

/// An immutable parameter object for one API call.
pub trait RequestModel: Sized {
    /// Check cross-field constraints.
    fn validate(&self) -> Result<(), ApiError>;

    /// Validate and hand the model back, for use at terminal build time.
    fn validated(self) -> Result<Self, ApiError> {
        self.validate()?;
        Ok(self)
    }
}

/// Error unless at most one of the named options is set.
pub(crate) fn at_most_one(options: &[(&str, bool)]) -> Result<(), ApiError> {
    let set: Vec<&str> = options.iter().filter(|(_, is_set)| *is_set).map(|(name, _)| *name).collect();
    if set.len() > 1 {
        return Err(ApiError::validation(format!("only one of {} may be set", set.join(", "))));
    }
    Ok(())
}

/// Error unless exactly one of the named options is set.
pub(crate) fn exactly_one(options: &[(&str, bool)]) -> Result<(), ApiError> {
    at_most_one(options)?;
    if !options.iter().any(|(_, is_set)| *is_set) {
        let names: Vec<&str> = options.iter().map(|(name, _)| *name).collect();
        return Err(ApiError::validation(format!("one of {} must be set", names.join(", "))));
    }
    Ok(())
}
