//! Run configuration
//!
//! Settings are resolved in three layers: built-in defaults, then the YAML file passed with
//! `--config` (if any), then individual command line flags. Only flags that are actually given
//! override the file.

use crate::instrument::{EligibilityCriteria, LoggerSink};
use crate::Error;
use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Instrumentation settings, as found in the YAML file
///
/// Keys are camelCase and unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub entry_log: bool,
    pub timing: bool,

    /// `stdout` (or `console`) and `structured` (or `slf4j`)
    pub logger: String,
    pub log_prefix: String,

    pub include_class_regex: Option<String>,
    pub exclude_class_regex: Vec<String>,
    pub include_method_regex: Option<String>,
    pub exclude_method_regex: Vec<String>,
    pub require_annotation_desc: Option<String>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            entry_log: false,
            timing: false,
            logger: LoggerSink::Console.to_string(),
            log_prefix: String::from("[BC]"),
            include_class_regex: None,
            exclude_class_regex: vec![],
            include_method_regex: None,
            exclude_method_regex: vec![],
            require_annotation_desc: None,
        }
    }
}

impl Config {
    /// Parse a YAML document (an empty document means all defaults)
    pub fn from_yaml(source: &str) -> Result<Config, Error> {
        if source.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Config, Error> {
        let source = fs::read_to_string(path).map_err(|err| {
            Error::config(format!("cannot read {}: {}", path.display(), err))
        })?;
        Config::from_yaml(&source).map_err(|err| err.context(path.display()))
    }

    /// Override settings with the flags present on the command line
    pub fn apply_matches(&mut self, matches: &ArgMatches) {
        if let Some(regex) = matches.get_one::<String>("include-class-regex") {
            self.include_class_regex = Some(regex.clone());
        }
        if let Some(regexes) = matches.get_many::<String>("exclude-class-regex") {
            self.exclude_class_regex = regexes.cloned().collect();
        }
        if let Some(regex) = matches.get_one::<String>("include-method-regex") {
            self.include_method_regex = Some(regex.clone());
        }
        if let Some(regexes) = matches.get_many::<String>("exclude-method-regex") {
            self.exclude_method_regex = regexes.cloned().collect();
        }
        if let Some(desc) = matches.get_one::<String>("require-annotation-desc") {
            self.require_annotation_desc = Some(desc.clone());
        }
        if matches.get_flag("entry-log") {
            self.entry_log = true;
        }
        if matches.get_flag("timing") {
            self.timing = true;
        }
        if let Some(logger) = matches.get_one::<String>("logger") {
            self.logger = logger.clone();
        }
        if let Some(prefix) = matches.get_one::<String>("log-prefix") {
            self.log_prefix = prefix.clone();
        }
    }

    /// Compile the patterns
    pub fn criteria(&self) -> Result<EligibilityCriteria, Error> {
        Ok(EligibilityCriteria {
            include_class: compile_optional(&self.include_class_regex, "includeClassRegex")?,
            exclude_classes: compile_all(&self.exclude_class_regex, "excludeClassRegex")?,
            include_method: compile_optional(&self.include_method_regex, "includeMethodRegex")?,
            exclude_methods: compile_all(&self.exclude_method_regex, "excludeMethodRegex")?,
            required_annotation: self.require_annotation_desc.clone(),
            entry_log: self.entry_log,
            timing: self.timing,
        })
    }

    pub fn sink(&self) -> Result<LoggerSink, Error> {
        self.logger.parse().map_err(Error::Config)
    }
}

fn compile(pattern: &str, key: &str) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|err| Error::from(err).context(key))
}

fn compile_optional(pattern: &Option<String>, key: &str) -> Result<Option<Regex>, Error> {
    pattern.as_deref().map(|p| compile(p, key)).transpose()
}

fn compile_all(patterns: &[String], key: &str) -> Result<Vec<Regex>, Error> {
    patterns.iter().map(|p| compile(p, key)).collect()
}

/// Everything a run needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub input: PathBuf,
    pub output: PathBuf,
    pub dry_run: bool,

    /// Where to write the JSON report, if anywhere
    pub report: Option<PathBuf>,
    pub config: Config,
}

impl Options {
    /// Resolve options from parsed command line arguments (reading the config file if needed)
    pub fn from_matches(matches: &ArgMatches) -> Result<Options, Error> {
        let mut config = match matches.get_one::<PathBuf>("config") {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        config.apply_matches(matches);

        let input = matches
            .get_one::<PathBuf>("input")
            .cloned()
            .ok_or_else(|| Error::config("missing --input"))?;
        let output = matches
            .get_one::<PathBuf>("output")
            .cloned()
            .ok_or_else(|| Error::config("missing --output"))?;

        Ok(Options {
            input,
            output,
            dry_run: matches.get_flag("dry-run"),
            report: matches.get_one::<PathBuf>("report").cloned(),
            config,
        })
    }
}

/// Command line interface
pub fn command() -> Command {
    Command::new("bctransform")
        .version(crate_version!())
        .about("Injects entry logging and timing into the methods of the classes in a jar")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("JAR")
                .help("Input jar")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("JAR")
                .help("Output jar")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("YAML configuration file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Scan and transform in memory, but do not write anything")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .value_name("FILE")
                .help("Write a JSON report to this path")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("include-class-regex")
                .long("include-class-regex")
                .value_name("REGEX")
                .help("Only transform classes whose dotted name matches"),
        )
        .arg(
            Arg::new("exclude-class-regex")
                .long("exclude-class-regex")
                .value_name("REGEX")
                .help("Skip classes whose dotted name matches (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("include-method-regex")
                .long("include-method-regex")
                .value_name("REGEX")
                .help("Only transform methods whose name+descriptor matches (eg. 'run\\(I\\)V')"),
        )
        .arg(
            Arg::new("exclude-method-regex")
                .long("exclude-method-regex")
                .value_name("REGEX")
                .help("Skip methods whose name+descriptor matches (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("require-annotation-desc")
                .long("require-annotation-desc")
                .value_name("DESC")
                .help("Only transform methods with this annotation (eg. 'Lcom/acme/Trace;')"),
        )
        .arg(
            Arg::new("entry-log")
                .long("entry-log")
                .help("Log every call on method entry")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timing")
                .long("timing")
                .help("Log the time spent in the method on every exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("logger")
                .long("logger")
                .value_name("SINK")
                .help("Where injected messages go: stdout or structured (SLF4J)"),
        )
        .arg(
            Arg::new("log-prefix")
                .long("log-prefix")
                .value_name("PREFIX")
                .help("Prefix of injected messages [default: [BC]]"),
        )
}
