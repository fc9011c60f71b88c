//! Tests for the code finisher

use async_trait::async_trait;
use futures::executor::block_on;

use super::*;
use crate::{
    diagnostics::Diagnostic,
    host::{OptimizeOutput, TransformOutput},
};

/// Upper-cases the code, optionally reporting diagnostics alongside
struct Shout {
    diagnostics: Vec<Diagnostic>,
}

#[async_trait]
impl DownlevelTransformer for Shout {
    async fn transform(&self, code: &str, _target: SourceTarget) -> TransformOutput {
        TransformOutput {
            code: code.to_uppercase(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Strips spaces, optionally reporting diagnostics or dropping the output
struct Squeeze {
    diagnostics: Vec<Diagnostic>,
    no_output: bool,
}

#[async_trait]
impl Optimizer for Squeeze {
    async fn optimize(&self, code: &str, _target: SourceTarget) -> OptimizeOutput {
        OptimizeOutput {
            output: (!self.no_output).then(|| code.replace(' ', "")),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

fn clean_transformer() -> Shout {
    Shout {
        diagnostics: Vec::new(),
    }
}

fn clean_optimizer() -> Squeeze {
    Squeeze {
        diagnostics: Vec::new(),
        no_output: false,
    }
}

#[test]
fn test_modern_target_without_minify_is_identity() {
    let log = BuildDiagnostics::new();
    let (transformer, optimizer) = (clean_transformer(), clean_optimizer());
    let finisher = CodeFinisher::new(&transformer, &optimizer, &log);

    let code = block_on(finisher.finish("let a = 1;".into(), SourceTarget::Es2017, false));

    assert_eq!(code, "let a = 1;");
    assert!(log.is_empty());
}

#[test]
fn test_legacy_target_then_minify() {
    let log = BuildDiagnostics::new();
    let (transformer, optimizer) = (clean_transformer(), clean_optimizer());
    let finisher = CodeFinisher::new(&transformer, &optimizer, &log);

    let code = block_on(finisher.finish("let a = 1;".into(), SourceTarget::Es5, true));

    assert_eq!(code, "LETA=1;");
}

#[test]
fn test_transform_diagnostics_keep_original_code() {
    let log = BuildDiagnostics::new();
    let transformer = Shout {
        diagnostics: vec![Diagnostic::warning("Transpile", "unsupported syntax")],
    };
    let optimizer = clean_optimizer();
    let finisher = CodeFinisher::new(&transformer, &optimizer, &log);

    let outcome = block_on(finisher.downlevel("let a = 1;", SourceTarget::Es5));
    assert_eq!(
        outcome,
        StageOutcome::Unchanged(UnchangedReason::Diagnostics(1))
    );

    // The optimizer still runs, on the untransformed code
    let code = block_on(finisher.finish("let a = 1;".into(), SourceTarget::Es5, true));
    assert_eq!(code, "leta=1;");
    assert_eq!(log.len(), 2);
}

#[test]
fn test_optimizer_diagnostics_keep_input_code() {
    let log = BuildDiagnostics::new();
    let transformer = clean_transformer();
    let optimizer = Squeeze {
        diagnostics: vec![Diagnostic::error("Minify", "parse error")],
        no_output: false,
    };
    let finisher = CodeFinisher::new(&transformer, &optimizer, &log);

    let code = block_on(finisher.finish("let a = 1;".into(), SourceTarget::Es5, true));

    assert_eq!(code, "LET A = 1;");
    assert!(log.has_errors());
}

#[test]
fn test_optimizer_without_output_keeps_input_code() {
    let log = BuildDiagnostics::new();
    let transformer = clean_transformer();
    let optimizer = Squeeze {
        diagnostics: Vec::new(),
        no_output: true,
    };
    let finisher = CodeFinisher::new(&transformer, &optimizer, &log);

    let outcome = block_on(finisher.minify("let a = 1;", SourceTarget::Es2017));

    assert_eq!(outcome, StageOutcome::Unchanged(UnchangedReason::NoOutput));
    assert!(log.is_empty());
}
