/*! Objects that can validate themselves.

Validation is compositional: a structure either is valid, or it explains
itself with a nonempty list of typed errors, each usually a [`thiserror`]
enum variant. Producers stream their failures through [`iter_invalid`] so
that callers can stop at the first error or collect them all.

[`thiserror`]: https://crates.io/crates/thiserror
[`iter_invalid`]: Validate::iter_invalid
*/

use nonempty::NonEmpty;

/** An object that can validate itself.

Such an object is either valid, which carries no additional information, or
invalid, as described by a nonempty list of validation errors.
 */
pub trait Validate {
    /// The type of a validation error.
    type ValidationError;

    /// Validates the object.
    fn validate(&self) -> Result<(), NonEmpty<Self::ValidationError>> {
        wrap_errors(self.iter_invalid())
    }

    /// Iterates over validation errors.
    fn iter_invalid(&self) -> impl Iterator<Item = Self::ValidationError>;
}

/// Collects validation errors into the result of validating.
pub fn wrap_errors<Error>(iter: impl Iterator<Item = Error>) -> Result<(), NonEmpty<Error>> {
    match NonEmpty::collect(iter) {
        Some(errors) => Err(errors),
        None => Ok(()),
    }
}

/// Renders a list of validation errors as a single human-readable string.
pub fn errors_to_string<Error: std::fmt::Display>(errors: &NonEmpty<Error>) -> String {
    itertools::Itertools::join(&mut errors.iter(), "; ")
}
