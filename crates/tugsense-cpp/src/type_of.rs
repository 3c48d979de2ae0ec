//! Typing C++ fragments: macro expansion followed by evaluation.

use tugsense_core::evaluate::{Evaluator, LookupItem};
use tugsense_core::scope::ScopeChain;

use crate::preprocess::{MacroEnvironment, PreprocessError, Preprocessor};

/// Whether a fragment is macro-expanded before it is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreprocessMode {
    #[default]
    Preprocess,
    NoPreprocess,
}

/// Evaluates C++ fragments at one scope chain.
#[derive(Debug)]
pub struct TypeOfExpression<'c, 's> {
    evaluator: Evaluator<'c, 's>,
    preprocessor: Preprocessor,
}

impl<'c, 's> TypeOfExpression<'c, 's> {
    /// Evaluate against `chain`, expanding macros visible from its document.
    pub fn new(chain: &'c ScopeChain<'s>, max_expansion_depth: usize) -> Self {
        let env = MacroEnvironment::for_document(chain.snapshot(), chain.document());
        TypeOfExpression {
            evaluator: Evaluator::new(chain),
            preprocessor: Preprocessor::new(env, max_expansion_depth),
        }
    }

    /// The underlying evaluator.
    pub fn evaluator(&self) -> &Evaluator<'c, 's> {
        &self.evaluator
    }

    /// The macro environment of the chain's document.
    pub fn macros(&self) -> &MacroEnvironment {
        self.preprocessor.environment()
    }

    /// Expand `expression`; a malformed invocation leaves it unexpanded.
    pub fn preprocess(&self, expression: &str) -> String {
        self.preprocessor.expand(expression)
    }

    /// Expand `expression`, reporting malformed invocations.
    pub fn try_preprocess(&self, expression: &str) -> Result<String, PreprocessError> {
        self.preprocessor.try_expand(expression)
    }

    /// Candidate types of `expression`.
    pub fn evaluate(&self, expression: &str, mode: PreprocessMode) -> Vec<LookupItem<'s>> {
        match mode {
            PreprocessMode::Preprocess => {
                let expanded = self.preprocess(expression);
                self.evaluator.evaluate_text(&expanded)
            }
            PreprocessMode::NoPreprocess => self.evaluator.evaluate_text(expression),
        }
    }
}
