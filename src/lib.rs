//! Instrumenting compiled JVM classes
//!
//! `bctransform` reads a jar, injects entry logging and timing code into the methods selected
//! by name patterns and annotations, and writes the result to a new jar. Frames and limits of
//! every rewritten method are recomputed, so the output still passes bytecode verification.

pub mod archive;
pub mod config;
mod error;
pub mod instrument;
pub mod jvm;
pub mod report;

pub use error::*;

use config::Options;
use report::TransformReport;

/// Run the whole pipeline for already resolved options
///
/// The report is written (if requested) only once the archive was processed successfully, and
/// before the output jar is moved into place.
pub fn run(options: &Options) -> Result<TransformReport, Error> {
    let transformer = archive::JarTransformer {
        criteria: options.config.criteria()?,
        sink: options.config.sink()?,
        prefix: options.config.log_prefix.clone(),
        dry_run: options.dry_run,
        report: options.report.clone(),
    };
    transformer.transform(&options.input, &options.output)
}
