//! Rewriting jars
//!
//! The input archive is read twice. A first pass registers every class in a [`ClassHierarchy`]
//! (frame computation needs to know how the classes of the jar relate to each other), then a
//! second pass copies the entries in their original order, routing eligible classes through the
//! [`ClassInstrumenter`].
//!
//! Untouched entries are copied without being decompressed, so they come out byte for byte
//! identical, metadata included.

mod manifest;

pub use manifest::*;

use crate::instrument::{ClassInstrumenter, ClassOutcome, EligibilityCriteria, LoggerSink};
use crate::jvm::class_file::ClassFile;
use crate::jvm::verifier::ClassHierarchy;
use crate::jvm::{self, ClassAccessFlags};
use crate::report::TransformReport;
use crate::Error;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// How to transform a jar
#[derive(Debug, Clone)]
pub struct JarTransformer {
    pub criteria: EligibilityCriteria,
    pub sink: LoggerSink,
    pub prefix: String,

    /// Do everything in memory, but don't write the output
    pub dry_run: bool,

    /// Where to write the JSON report, if anywhere
    pub report: Option<PathBuf>,
}

/// Name and metadata of one archive entry
#[derive(Debug, Clone)]
struct EntryInfo {
    name: String,
    is_dir: bool,
    last_modified: DateTime,
}

impl EntryInfo {
    fn is_class(&self) -> bool {
        !self.is_dir && self.name.ends_with(".class")
    }

    fn is_manifest(&self) -> bool {
        self.name.eq_ignore_ascii_case(MANIFEST_NAME)
    }
}

impl JarTransformer {
    /// Transform `input` into `output`
    ///
    /// The output is first written to a temporary file next to its destination and only moved
    /// into place once complete and once the report is written, so a failed run leaves no
    /// output jar behind.
    pub fn transform(&self, input: &Path, output: &Path) -> Result<TransformReport, Error> {
        log::info!("Reading '{}'", input.display());
        let file = File::open(input).map_err(|err| Error::Io(err).context(input.display()))?;
        let mut archive =
            ZipArchive::new(file).map_err(|err| Error::from(err).context(input.display()))?;

        let entries = list_entries(&mut archive)?;
        let mut hierarchy = ClassHierarchy::with_java_library();
        register_classes(&mut archive, &entries, &mut hierarchy)?;
        log::debug!("Class hierarchy knows {} classes", hierarchy.len());

        let instrumenter =
            ClassInstrumenter::new(&self.criteria, self.sink, &self.prefix, &hierarchy);
        let mut report = TransformReport::new();

        if self.dry_run {
            log::info!("Dry run, '{}' will not be written", output.display());
            rewrite_entries::<_, File>(&mut archive, &entries, &instrumenter, None, &mut report)?;
            self.write_report(&report)?;
            return Ok(report);
        }

        let directory = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(directory)?;
        let temporary = tempfile::Builder::new()
            .prefix(".bctransform-")
            .suffix(".jar")
            .tempfile_in(directory)?;

        let mut writer = ZipWriter::new(temporary);
        rewrite_entries(
            &mut archive,
            &entries,
            &instrumenter,
            Some(&mut writer),
            &mut report,
        )?;
        let temporary = writer.finish()?;
        self.write_report(&report)?;
        temporary
            .persist(output)
            .map_err(|err| Error::Io(err.error).context(output.display()))?;
        log::info!("Wrote '{}'", output.display());

        Ok(report)
    }

    fn write_report(&self, report: &TransformReport) -> Result<(), Error> {
        if let Some(path) = &self.report {
            log::info!("Writing report to '{}'", path.display());
            report
                .write_to(path)
                .map_err(|err| err.context(path.display()))?;
        }
        Ok(())
    }
}

fn list_entries<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<EntryInfo>, Error> {
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        entries.push(EntryInfo {
            name: entry.name().to_string(),
            is_dir: entry.is_dir(),
            last_modified: entry.last_modified(),
        });
    }
    Ok(entries)
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
) -> Result<Vec<u8>, Error> {
    let mut entry = archive.by_index(index)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Add every class of the archive to the hierarchy
///
/// Classes that don't parse are skipped here: if they turn out to matter, the main pass reports
/// them properly.
fn register_classes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    entries: &[EntryInfo],
    hierarchy: &mut ClassHierarchy,
) -> Result<(), Error> {
    for (index, entry) in entries.iter().enumerate() {
        if !entry.is_class() {
            continue;
        }
        let bytes = read_entry(archive, index)?;
        match class_edges(&bytes) {
            Ok((name, super_name, interfaces, is_interface)) => {
                hierarchy.add_class(&name, super_name.as_deref(), interfaces, is_interface)
            }
            Err(err) => log::warn!("Skipping '{}' in class hierarchy: {}", entry.name, err),
        }
    }
    Ok(())
}

/// Name, superclass, interfaces, and whether the class is an interface
fn class_edges(bytes: &[u8]) -> Result<(String, Option<String>, Vec<String>, bool), jvm::Error> {
    let class = ClassFile::decode(bytes)?;
    Ok((
        class.name()?,
        class.super_name()?,
        class.interface_names()?,
        class.access_flags.contains(ClassAccessFlags::INTERFACE),
    ))
}

/// Copy or transform every entry, in order
///
/// Without a writer, this only fills in the report.
fn rewrite_entries<R: Read + Seek, W: Write + Seek>(
    archive: &mut ZipArchive<R>,
    entries: &[EntryInfo],
    instrumenter: &ClassInstrumenter,
    mut writer: Option<&mut ZipWriter<W>>,
    report: &mut TransformReport,
) -> Result<(), Error> {
    let mut written: HashSet<String> = HashSet::new();

    // The manifest always comes first
    let manifest = entries.iter().position(EntryInfo::is_manifest);
    if let Some(index) = manifest {
        let parsed = Manifest::parse(&read_entry(archive, index)?)?;
        if let Some(writer) = writer.as_deref_mut() {
            let options = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(entries[index].last_modified);
            writer.start_file(MANIFEST_NAME, options)?;
            writer.write_all(&parsed.to_bytes())?;
        }
        written.insert(MANIFEST_NAME.to_string());
    }

    let criteria = instrumenter.criteria;
    for (index, entry) in entries.iter().enumerate() {
        if manifest.is_some() && entry.is_manifest() {
            continue;
        }
        if !written.insert(entry.name.clone()) {
            log::warn!("Skipping duplicate entry '{}'", entry.name);
            continue;
        }

        if entry.is_class() {
            report.mark_class_scanned();
            if criteria.any_feature() && criteria.is_class_eligible(&entry.name) {
                let bytes = read_entry(archive, index)?;
                let outcome = instrumenter
                    .instrument_class(&bytes, report)
                    .map_err(|err| err.context(&entry.name))?;
                if let ClassOutcome::Transformed(transformed) = outcome {
                    log::debug!("Rewrote '{}'", entry.name);
                    if let Some(writer) = writer.as_deref_mut() {
                        let options = FileOptions::default()
                            .compression_method(CompressionMethod::Deflated)
                            .last_modified_time(entry.last_modified);
                        writer.start_file(entry.name.as_str(), options)?;
                        writer.write_all(&transformed)?;
                    }
                    continue;
                }
            }
        }

        if let Some(writer) = writer.as_deref_mut() {
            writer.raw_copy_file(archive.by_index_raw(index)?)?;
        }
    }

    Ok(())
}
