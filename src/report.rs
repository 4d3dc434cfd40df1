use crate::Error;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Counters and per-method records accumulated over one pass over an archive
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformReport {
    pub scanned_classes: usize,
    pub transformed_classes: usize,
    pub transformed_methods: usize,
    pub methods: Vec<MethodRecord>,

    #[serde(skip)]
    instrumented_classes: HashSet<String>,
}

/// One instrumented method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodRecord {
    /// Dotted name of the declaring class
    pub owner: String,
    pub name: String,
    pub desc: String,
    pub entry_log: bool,
    pub timing: bool,
}

impl TransformReport {
    pub fn new() -> TransformReport {
        TransformReport::default()
    }

    pub fn mark_class_scanned(&mut self) {
        self.scanned_classes += 1;
    }

    /// Count a class as transformed (only the first call per class counts)
    pub fn mark_class_instrumented(&mut self, owner: &str) {
        if self.instrumented_classes.insert(owner.to_string()) {
            self.transformed_classes += 1;
        }
    }

    pub fn record_method(&mut self, record: MethodRecord) {
        self.transformed_methods += 1;
        self.methods.push(record);
    }

    /// Write the report as pretty printed JSON, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(owner: &str, name: &str) -> MethodRecord {
        MethodRecord {
            owner: owner.to_string(),
            name: name.to_string(),
            desc: "()V".to_string(),
            entry_log: true,
            timing: false,
        }
    }

    #[test]
    fn classes_are_counted_once() {
        let mut report = TransformReport::new();
        report.mark_class_scanned();
        report.mark_class_scanned();
        for name in ["bar", "baz"] {
            report.mark_class_instrumented("a.Foo");
            report.record_method(record("a.Foo", name));
        }

        assert_eq!(report.scanned_classes, 2);
        assert_eq!(report.transformed_classes, 1);
        assert_eq!(report.transformed_methods, 2);
        assert_eq!(report.methods.len(), report.transformed_methods);
    }

    #[test]
    fn json_shape() {
        let mut report = TransformReport::new();
        report.mark_class_scanned();
        report.mark_class_instrumented("a.Foo");
        report.record_method(record("a.Foo", "bar"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "scannedClasses": 1,
                "transformedClasses": 1,
                "transformedMethods": 1,
                "methods": [
                    { "owner": "a.Foo", "name": "bar", "desc": "()V", "entryLog": true, "timing": false }
                ]
            })
        );
    }

    #[test]
    fn parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("report.json");
        TransformReport::new().write_to(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["scannedClasses"], 0);
        assert_eq!(written["methods"], serde_json::json!([]));
    }
}
