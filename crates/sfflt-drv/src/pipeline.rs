//! Lex → parse → resolve → codegen → format → write, in that order,
//! bailing out (and reporting to stderr) the moment any phase fails.

use std::cell::RefCell;
use std::path::Path;

use sfflt_par::{BundledLibraries, FsFallbackResolver, ParseSession};
use sfflt_util::{Handler, SourceMap};
use thiserror::Error;
use tracing::{debug, info, info_span};

use crate::config::{Config, FormatOptionError};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A phase already printed its own diagnostics or message to stderr;
    /// the driver just needs to exit `1`, not print anything more.
    #[error("compilation failed")]
    Reported,
}

impl From<FormatOptionError> for PipelineError {
    fn from(_: FormatOptionError) -> Self {
        PipelineError::Reported
    }
}

/// Reads `path`, compiles it end to end, and writes the result to
/// `{basename}.fflt`. Every failure path prints its own message to
/// stderr before returning `Err(PipelineError::Reported)`.
pub fn compile_path(path: &Path, config: &Config) -> Result<(), PipelineError> {
    let _span = info_span!("compile", file = %path.display()).entered();

    let source = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("{e}");
        PipelineError::Reported
    })?;

    let handler = Handler::new();
    let source_map = RefCell::new(SourceMap::new());
    let resolver = FsFallbackResolver::new(BundledLibraries::new());
    let session = ParseSession::new(&handler, &source_map, &resolver);

    let filename = path.to_string_lossy();
    let program = {
        let _span = info_span!("parse").entered();
        sfflt_par::parse_program(&source, &filename, &session)
    };
    if handler.has_errors() {
        report(&handler, &source_map.borrow());
        return Err(PipelineError::Reported);
    }
    debug!(items = program.items.len(), "parsed");

    {
        let _span = info_span!("resolve").entered();
        sfflt_sem::resolve_program(&program, &handler);
    }
    if handler.has_errors() {
        report(&handler, &source_map.borrow());
        return Err(PipelineError::Reported);
    }

    let instrs = {
        let _span = info_span!("codegen").entered();
        sfflt_gen::compile_program(&program)
    };
    info!(instructions = instrs.len(), "compiled");

    let rendered = {
        let _span = info_span!("format").entered();
        sfflt_gen::render_program(&instrs, config.format).map_err(|e| {
            eprintln!("{e}");
            PipelineError::Reported
        })?
    };

    let output_path = path.with_extension("fflt");
    std::fs::write(&output_path, rendered).map_err(|e| {
        eprintln!("{e}");
        PipelineError::Reported
    })?;

    Ok(())
}

fn report(handler: &Handler, source_map: &SourceMap) {
    for diag in handler.diagnostics() {
        let location = source_map.location_prefix(diag.span);
        eprintln!("{}", diag.render(&location));
    }
}
