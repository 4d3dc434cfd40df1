mod common;

use bctransform::archive::JarTransformer;
use bctransform::config::{Config, Options};
use bctransform::instrument::LoggerSink;
use bctransform::jvm::class_file::Version;
use bctransform::jvm::code::{CodeElement, Instruction, InvokeType};
use bctransform::jvm::model::ClassModel;
use bctransform::Error;
use common::*;
use std::path::{Path, PathBuf};

fn transformer(config: &Config, dry_run: bool) -> JarTransformer {
    JarTransformer {
        criteria: config.criteria().unwrap(),
        sink: config.sink().unwrap(),
        prefix: config.log_prefix.clone(),
        dry_run,
        report: None,
    }
}

fn everything() -> Config {
    Config {
        entry_log: true,
        timing: true,
        ..Config::default()
    }
}

/// `a/Foo` with `bar()V` (two returns), `b/Baz` with a native `qux()V`, and a resource
fn sample_jar(dir: &Path) -> PathBuf {
    let path = dir.join("in.jar");
    write_jar(
        &path,
        &[
            ("a/", vec![]),
            (
                "a/Foo.class",
                class_bytes(
                    "a/Foo",
                    Version::JAVA8,
                    &[TestMethod::new("bar", "()V", TWO_RETURNS)],
                ),
            ),
            (
                "b/Baz.class",
                class_bytes("b/Baz", Version::JAVA8, &[TestMethod::native("qux", "()V")]),
            ),
            ("config/app.properties", b"answer=42\n".to_vec()),
        ],
    );
    path
}

/// Number of calls to `System.nanoTime()` in a method
fn nano_time_calls(class: &mut ClassModel, method_index: usize) -> usize {
    let nano_time = class
        .constants_mut()
        .get_method_ref("java/lang/System", "nanoTime", "()J", false)
        .unwrap();
    let code = class.decode_code(method_index).unwrap().unwrap();
    code.elements
        .iter()
        .filter_map(CodeElement::instruction)
        .filter(|insn| **insn == Instruction::Invoke(InvokeType::Static, nano_time))
        .count()
}

#[test]
fn only_included_classes_are_instrumented() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_jar(dir.path());
    let output = dir.path().join("out.jar");

    let config = Config {
        include_class_regex: Some(r"^a\.".to_string()),
        ..everything()
    };
    let report = transformer(&config, false)
        .transform(&input, &output)
        .unwrap();

    assert_eq!(report.scanned_classes, 2);
    assert_eq!(report.transformed_classes, 1);
    assert_eq!(report.transformed_methods, 1);
    assert_eq!(report.methods.len(), 1);
    let record = &report.methods[0];
    assert_eq!(
        (record.owner.as_str(), record.name.as_str(), record.desc.as_str()),
        ("a.Foo", "bar", "()V")
    );
    assert!(record.entry_log && record.timing);

    let before = read_jar(&input);
    let after = read_jar(&output);
    let names: Vec<_> = after.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec!["a/", "a/Foo.class", "b/Baz.class", "config/app.properties"]
    );
    assert_eq!(entry(&after, "b/Baz.class"), entry(&before, "b/Baz.class"));
    assert_eq!(
        entry(&after, "config/app.properties"),
        entry(&before, "config/app.properties")
    );
    assert_ne!(entry(&after, "a/Foo.class"), entry(&before, "a/Foo.class"));

    // One entry and two exits
    let mut foo = ClassModel::decode(entry(&after, "a/Foo.class")).unwrap();
    assert_eq!(nano_time_calls(&mut foo, 0), 3);
    let code = foo.methods[0].code().unwrap();
    assert_eq!(code.max_locals, 2 + 2 + 2 + 2);
    assert_eq!(code.attributes.len(), 1);
}

#[test]
fn dry_run_matches_real_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_jar(dir.path());
    let output = dir.path().join("out").join("dry.jar");

    let dry = transformer(&everything(), true)
        .transform(&input, &output)
        .unwrap();
    assert!(!output.exists());
    assert!(!dir.path().join("out").exists());

    let real = transformer(&everything(), false)
        .transform(&input, &output)
        .unwrap();
    assert!(output.exists());

    assert_eq!(dry.scanned_classes, real.scanned_classes);
    assert_eq!(dry.transformed_classes, real.transformed_classes);
    assert_eq!(dry.transformed_methods, real.transformed_methods);
    assert_eq!(dry.methods, real.methods);
}

#[test]
fn excludes_win_and_excluded_bytes_are_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_jar(dir.path());
    let output = dir.path().join("out.jar");

    let config = Config {
        include_class_regex: Some(r"^a\.".to_string()),
        exclude_class_regex: vec!["Foo".to_string()],
        ..everything()
    };
    let report = transformer(&config, false)
        .transform(&input, &output)
        .unwrap();
    assert_eq!(report.scanned_classes, 2);
    assert_eq!(report.transformed_classes, 0);
    assert_eq!(read_jar(&output), read_jar(&input));
}

#[test]
fn nothing_enabled_means_nothing_changes() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_jar(dir.path());
    let output = dir.path().join("out.jar");

    let report = transformer(&Config::default(), false)
        .transform(&input, &output)
        .unwrap();
    assert_eq!(report.scanned_classes, 2);
    assert_eq!(report.transformed_methods, 0);
    assert_eq!(read_jar(&output), read_jar(&input));
}

#[test]
fn exits_of_every_kind_are_timed() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    write_jar(
        &input,
        &[(
            "c/Mixed.class",
            class_bytes(
                "c/Mixed",
                Version::JAVA8,
                &[
                    TestMethod::new("fail", "()V", THROWS),
                    TestMethod::new("pick", "(I)I", PICK),
                ],
            ),
        )],
    );
    let output = dir.path().join("out.jar");

    let config = Config {
        timing: true,
        logger: "structured".to_string(),
        ..Config::default()
    };
    let report = transformer(&config, false)
        .transform(&input, &output)
        .unwrap();
    assert_eq!(report.transformed_classes, 1);
    assert_eq!(report.transformed_methods, 2);
    assert!(report.methods.iter().all(|m| !m.entry_log && m.timing));

    let after = read_jar(&output);
    let mut mixed = ClassModel::decode(entry(&after, "c/Mixed.class")).unwrap();
    assert_eq!(nano_time_calls(&mut mixed, 0), 2);

    // The trailing `athrow` is unreachable, so its timing code is replaced along with it
    assert_eq!(nano_time_calls(&mut mixed, 1), 3);
}

#[test]
fn old_class_files_get_no_frames() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    write_jar(
        &input,
        &[(
            "a/Old.class",
            class_bytes(
                "a/Old",
                Version::JAVA5,
                &[TestMethod::new("bar", "()V", TWO_RETURNS)],
            ),
        )],
    );
    let output = dir.path().join("out.jar");
    transformer(&everything(), false)
        .transform(&input, &output)
        .unwrap();

    let after = read_jar(&output);
    let old = ClassModel::decode(entry(&after, "a/Old.class")).unwrap();
    let code = old.methods[0].code().unwrap();
    assert!(code.attributes.is_empty());
    assert_eq!(code.max_stack, 2 + 4);
}

#[test]
fn required_annotation_filters_methods() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    write_jar(
        &input,
        &[(
            "a/Traced.class",
            class_bytes(
                "a/Traced",
                Version::JAVA8,
                &[
                    TestMethod::new("plain", "()V", TWO_RETURNS),
                    TestMethod::new("traced", "()V", TWO_RETURNS).annotated("La/Trace;"),
                ],
            ),
        )],
    );
    let output = dir.path().join("out.jar");

    let config = Config {
        require_annotation_desc: Some("La/Trace;".to_string()),
        ..everything()
    };
    let report = transformer(&config, false)
        .transform(&input, &output)
        .unwrap();
    assert_eq!(report.scanned_classes, 1);
    assert_eq!(report.transformed_methods, 1);
    assert_eq!(report.methods[0].name, "traced");
}

#[test]
fn manifest_goes_first() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    write_jar(
        &input,
        &[
            ("a/", vec![]),
            (
                "a/Foo.class",
                class_bytes(
                    "a/Foo",
                    Version::JAVA8,
                    &[TestMethod::new("bar", "()V", TWO_RETURNS)],
                ),
            ),
            (
                "meta-inf/manifest.mf",
                b"Manifest-Version: 1.0\nMain-Class: a.Foo\n".to_vec(),
            ),
        ],
    );
    let output = dir.path().join("out.jar");
    transformer(&everything(), false)
        .transform(&input, &output)
        .unwrap();

    let after = read_jar(&output);
    let names: Vec<_> = after.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["META-INF/MANIFEST.MF", "a/", "a/Foo.class"]);
    assert_eq!(
        after[0].1,
        b"Manifest-Version: 1.0\r\nMain-Class: a.Foo\r\n\r\n".to_vec()
    );
}

#[test]
fn malformed_classes_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let mut truncated = class_bytes(
        "a/Foo",
        Version::JAVA8,
        &[TestMethod::new("bar", "()V", TWO_RETURNS)],
    );
    truncated.truncate(truncated.len() / 2);
    write_jar(&input, &[("a/Foo.class", truncated)]);
    let output = dir.path().join("out.jar");

    let result = transformer(&everything(), false).transform(&input, &output);
    match result {
        Err(Error::MalformedInput(message)) => assert!(message.starts_with("a/Foo.class")),
        other => panic!("unexpected {:?}", other),
    }
    assert!(!output.exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn malformed_excluded_classes_are_copied() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    write_jar(&input, &[("b/Junk.class", b"not a class".to_vec())]);
    let output = dir.path().join("out.jar");

    let config = Config {
        exclude_class_regex: vec!["Junk".to_string()],
        ..everything()
    };
    let report = transformer(&config, false)
        .transform(&input, &output)
        .unwrap();
    assert_eq!(report.scanned_classes, 1);
    assert_eq!(read_jar(&output), read_jar(&input));
}

#[test]
fn not_a_jar() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    std::fs::write(&input, b"definitely not a zip").unwrap();
    let result = transformer(&everything(), false).transform(&input, &dir.path().join("out.jar"));
    assert!(matches!(result, Err(Error::MalformedInput(_))));
}

#[test]
fn run_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_jar(dir.path());
    let report_path = dir.path().join("reports").join("run.json");

    let options = Options {
        input,
        output: dir.path().join("out.jar"),
        dry_run: true,
        report: Some(report_path.clone()),
        config: Config {
            include_class_regex: Some(r"^a\.".to_string()),
            ..everything()
        },
    };
    let report = bctransform::run(&options).unwrap();
    assert_eq!(report.transformed_classes, 1);
    assert!(!options.output.exists());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["scannedClasses"], 2);
    assert_eq!(json["transformedClasses"], 1);
    assert_eq!(json["transformedMethods"], 1);
    assert_eq!(json["methods"][0]["owner"], "a.Foo");
    assert_eq!(json["methods"][0]["desc"], "()V");
    assert_eq!(json["methods"][0]["entryLog"], true);
}

#[test]
fn oversized_log_message_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_jar(dir.path());
    let output = dir.path().join("out.jar");
    let config = Config {
        log_prefix: "X".repeat(70_000),
        ..everything()
    };

    match transformer(&config, false).transform(&input, &output) {
        Err(Error::VerificationRepair(message)) => assert!(message.contains("a/Foo.class")),
        other => panic!("expected a repair error, got {:?}", other),
    }
    assert!(!output.exists());
}

#[test]
fn failed_report_leaves_no_output_jar() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_jar(dir.path());
    let report_path = dir.path().join("taken");
    std::fs::create_dir(&report_path).unwrap();

    let options = Options {
        input,
        output: dir.path().join("out.jar"),
        dry_run: false,
        report: Some(report_path),
        config: everything(),
    };
    match bctransform::run(&options) {
        Err(Error::Io(_)) => {}
        other => panic!("expected an io error, got {:?}", other),
    }
    assert!(!options.output.exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".jar") && name != "in.jar")
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}

#[test]
fn unknown_logger_is_rejected_before_anything_runs() {
    let dir = tempfile::tempdir().unwrap();
    let options = Options {
        input: dir.path().join("missing.jar"),
        output: dir.path().join("out.jar"),
        dry_run: false,
        report: None,
        config: Config {
            logger: "syslog".to_string(),
            ..everything()
        },
    };
    assert!(matches!(bctransform::run(&options), Err(Error::Config(_))));
    assert_eq!(LoggerSink::default(), LoggerSink::Console);
}

#[test]
fn untouched_classes_round_trip() {
    let bytes = class_bytes(
        "a/Foo",
        Version::JAVA8,
        &[
            TestMethod::new("bar", "()V", TWO_RETURNS).annotated("La/Trace;"),
            TestMethod::native("qux", "()V"),
        ],
    );
    let class = ClassModel::decode(&bytes).unwrap();
    assert_eq!(class.methods[0].annotations, vec!["La/Trace;".to_string()]);
    assert_eq!(class.encode().unwrap(), bytes);
}
