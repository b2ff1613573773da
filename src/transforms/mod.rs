//! Per-file transform steps.
//!
//! Every step is a pure `String -> String` function. Tasks compose steps into
//! a [`Chain`] and apply it to each source file in a fixed order, so a task's
//! pipeline reads top to bottom the way it runs.

pub mod css;
pub mod html;
pub mod svg;
pub mod typograf;

use thiserror::Error;

pub use css::CssOptimize;
pub use html::{HtmlFormat, HtmlMinify};
pub use svg::SvgOptimize;
pub use typograf::Typograf;

/// Error produced by a transform step.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Stylesheet could not be parsed, minified or printed
    #[error("CSS error: {0}")]
    Css(String),
    /// A step failed for another reason
    #[error("{step}: {message}")]
    Step {
        /// Step name
        step: &'static str,
        /// What went wrong
        message: String,
    },
}

/// A single document transform.
pub trait Transform: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Transform a document.
    fn apply(&self, input: String) -> Result<String, TransformError>;
}

/// An ordered sequence of transforms applied one after another.
#[derive(Default)]
pub struct Chain {
    steps: Vec<Box<dyn Transform>>,
}

impl Chain {
    /// Create an empty chain (the identity transform).
    pub fn new() -> Self {
        Self { steps: vec![] }
    }

    /// Append a step.
    pub fn then<T: Transform + 'static>(mut self, step: T) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Append a step only when `condition` holds.
    pub fn then_if<T: Transform + 'static>(self, condition: bool, step: T) -> Self {
        if condition {
            self.then(step)
        } else {
            self
        }
    }

    /// Names of the steps, in order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the chain has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order.
    pub fn apply(&self, input: String) -> Result<String, TransformError> {
        self.steps.iter().try_fold(input, |doc, step| step.apply(doc))
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("steps", &self.step_names()).finish()
    }
}

/// Prepend a fixed header to the document.
#[derive(Debug, Clone)]
pub struct Prepend(pub String);

impl Transform for Prepend {
    fn name(&self) -> &'static str {
        "prepend"
    }

    fn apply(&self, input: String) -> Result<String, TransformError> {
        let mut out = String::with_capacity(self.0.len() + input.len());
        out.push_str(&self.0);
        out.push_str(&input);
        Ok(out)
    }
}

/// Adapter turning a plain function into a transform step.
pub struct FnTransform<F> {
    name: &'static str,
    f: F,
}

impl<F> FnTransform<F>
where
    F: Fn(String) -> Result<String, TransformError> + Send + Sync,
{
    /// Wrap `f` under the given step name.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> Transform for FnTransform<F>
where
    F: Fn(String) -> Result<String, TransformError> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, input: String) -> Result<String, TransformError> {
        (self.f)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = Chain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.apply("body {}".to_string()).unwrap(), "body {}");
    }

    #[test]
    fn test_chain_runs_in_order() {
        let chain = Chain::new()
            .then(Prepend("b".to_string()))
            .then(Prepend("a".to_string()))
            .then(FnTransform::new("upper", |s: String| Ok(s.to_uppercase())));

        assert_eq!(chain.step_names(), vec!["prepend", "prepend", "upper"]);
        assert_eq!(chain.apply("c".to_string()).unwrap(), "ABC");
    }

    #[test]
    fn test_then_if_skips_step() {
        let chain = Chain::new()
            .then_if(false, Prepend("x".to_string()))
            .then_if(true, Prepend("y".to_string()));
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.apply(String::new()).unwrap(), "y");
    }

    #[test]
    fn test_chain_stops_on_error() {
        let chain = Chain::new()
            .then(FnTransform::new("fail", |_s: String| {
                Err(TransformError::Step { step: "fail", message: "boom".to_string() })
            }))
            .then(Prepend("never".to_string()));

        let err = chain.apply("x".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "fail: boom");
    }
}
