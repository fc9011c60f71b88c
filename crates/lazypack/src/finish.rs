//! Code finisher: optional down-level transform followed by optional minification
//!
//! Both stages are fail-soft. A stage whose collaborator reports any
//! diagnostic leaves the code exactly as it received it; the diagnostics
//! still go to the build log.

use log::debug;

use crate::{
    config::SourceTarget,
    diagnostics::BuildDiagnostics,
    host::{DownlevelTransformer, Optimizer},
};

/// Why a stage kept its input code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnchangedReason {
    /// The collaborator reported this many diagnostics
    Diagnostics(usize),
    /// The optimizer returned no output
    NoOutput,
}

/// Result of a single finishing stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Transformed(String),
    Unchanged(UnchangedReason),
}

impl StageOutcome {
    /// The code the next stage should receive
    pub fn into_code(self, previous: String) -> String {
        match self {
            Self::Transformed(code) => code,
            Self::Unchanged(_) => previous,
        }
    }
}

#[derive(Clone, Copy)]
pub struct CodeFinisher<'a> {
    transformer: &'a dyn DownlevelTransformer,
    optimizer: &'a dyn Optimizer,
    diagnostics: &'a BuildDiagnostics,
}

impl<'a> CodeFinisher<'a> {
    pub fn new(
        transformer: &'a dyn DownlevelTransformer,
        optimizer: &'a dyn Optimizer,
        diagnostics: &'a BuildDiagnostics,
    ) -> Self {
        Self {
            transformer,
            optimizer,
            diagnostics,
        }
    }

    /// Run the enabled stages over `code`
    pub async fn finish(&self, code: String, target: SourceTarget, minify: bool) -> String {
        let mut code = code;

        if target.is_legacy() {
            let outcome = self.downlevel(&code, target).await;
            debug!("Down-level transform to {}: {outcome:?}", target.as_str());
            code = outcome.into_code(code);
        }

        if minify {
            let outcome = self.minify(&code, target).await;
            debug!("Minify: {}", describe(&outcome));
            code = outcome.into_code(code);
        }

        code
    }

    pub async fn downlevel(&self, code: &str, target: SourceTarget) -> StageOutcome {
        let result = self.transformer.transform(code, target).await;
        let count = result.diagnostics.len();
        self.diagnostics.extend(result.diagnostics);

        if count == 0 {
            StageOutcome::Transformed(result.code)
        } else {
            StageOutcome::Unchanged(UnchangedReason::Diagnostics(count))
        }
    }

    pub async fn minify(&self, code: &str, target: SourceTarget) -> StageOutcome {
        let result = self.optimizer.optimize(code, target).await;
        let count = result.diagnostics.len();
        self.diagnostics.extend(result.diagnostics);

        match result.output {
            _ if count > 0 => StageOutcome::Unchanged(UnchangedReason::Diagnostics(count)),
            Some(output) => StageOutcome::Transformed(output),
            None => StageOutcome::Unchanged(UnchangedReason::NoOutput),
        }
    }
}

impl std::fmt::Debug for CodeFinisher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeFinisher")
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

fn describe(outcome: &StageOutcome) -> String {
    match outcome {
        StageOutcome::Transformed(code) => format!("transformed ({} bytes)", code.len()),
        StageOutcome::Unchanged(reason) => format!("unchanged ({reason:?})"),
    }
}

#[cfg(test)]
mod tests;
