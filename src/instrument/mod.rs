//! Injecting logging and timing into method bodies
//!
//! Classes go through one fixed pipeline, driven by [`ClassInstrumenter::instrument_class`]:
//!
//!   1. decode the class ([`ClassModel`]) and check each method against the
//!      [`EligibilityCriteria`]
//!   2. decode eligible bodies and find their exits ([`find_exits`]) before anything changes
//!   3. inject the entry and exit sequences ([`Injector`])
//!   4. lay out the body again, recomputing its frames
//!
//! A class in which nothing was injected is reported as unchanged so that the caller can keep
//! the original bytes.

mod eligibility;
mod exits;
mod injector;
mod sink;

pub use eligibility::*;
pub use exits::*;
pub use injector::*;
pub use sink::*;

use crate::jvm::model::ClassModel;
use crate::jvm::verifier::ClassHierarchy;
use crate::report::{MethodRecord, TransformReport};
use crate::Error;

/// Result of running one class through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassOutcome {
    /// No method was instrumented, the original bytes should be kept
    Unchanged,

    /// Bytes of the rewritten class
    Transformed(Vec<u8>),
}

/// Everything needed to instrument classes, fixed for the whole run
#[derive(Debug)]
pub struct ClassInstrumenter<'a> {
    pub criteria: &'a EligibilityCriteria,
    pub injector: Injector,
    pub hierarchy: &'a ClassHierarchy,
}

impl<'a> ClassInstrumenter<'a> {
    pub fn new(
        criteria: &'a EligibilityCriteria,
        sink: LoggerSink,
        prefix: &str,
        hierarchy: &'a ClassHierarchy,
    ) -> ClassInstrumenter<'a> {
        ClassInstrumenter {
            criteria,
            injector: Injector {
                sink,
                prefix: prefix.to_string(),
                entry_log: criteria.entry_log,
                timing: criteria.timing,
            },
            hierarchy,
        }
    }

    /// Instrument every eligible method of a class
    ///
    /// Class level eligibility is the caller's business (it is decided from the entry name,
    /// before the class is even parsed).
    pub fn instrument_class(
        &self,
        bytes: &[u8],
        report: &mut TransformReport,
    ) -> Result<ClassOutcome, Error> {
        let mut class = ClassModel::decode(bytes)?;
        let owner = class.dotted_name();

        let mut instrumented = 0;
        for method_index in 0..class.methods.len() {
            let method = &class.methods[method_index];
            if !self.criteria.is_method_eligible(method) {
                continue;
            }
            let name = method.name.clone();
            let descriptor = method.descriptor.clone();
            let parsed_descriptor = method.parsed_descriptor.clone();

            let mut code = match class.decode_code(method_index)? {
                Some(code) => code,
                None => continue,
            };
            let exits = find_exits(&mut code, &parsed_descriptor)?;
            let target = InjectionTarget {
                owner: &owner,
                name: &name,
                descriptor: &descriptor,
            };
            let injection = self
                .injector
                .inject(&mut code, &exits, target, class.constants_mut())?;
            if injection.is_empty() {
                continue;
            }

            class
                .replace_code(method_index, code, self.hierarchy)
                .map_err(|err| Error::from(err).context(target))?;
            log::debug!(
                "Instrumented {} ({} exits{})",
                target,
                injection.exits,
                if injection.entry_log { ", entry log" } else { "" }
            );

            report.mark_class_instrumented(&owner);
            report.record_method(MethodRecord {
                owner: owner.clone(),
                name,
                desc: descriptor,
                entry_log: injection.entry_log,
                timing: injection.timing,
            });
            instrumented += 1;
        }

        if instrumented == 0 {
            Ok(ClassOutcome::Unchanged)
        } else {
            Ok(ClassOutcome::Transformed(class.encode()?))
        }
    }
}
