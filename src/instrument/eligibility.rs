use crate::jvm::model::MethodModel;
use regex::Regex;

/// Class names that never hold instrumentable code
const RESERVED_CLASS_NAMES: [&str; 2] = ["module-info", "package-info"];

/// Which classes and methods get instrumented, and with what
///
/// Patterns are searched (not anchored) in dotted class names and in method `name+descriptor`
/// signatures. Excludes always beat includes, and a missing include pattern matches everything.
#[derive(Debug, Clone, Default)]
pub struct EligibilityCriteria {
    pub include_class: Option<Regex>,
    pub exclude_classes: Vec<Regex>,
    pub include_method: Option<Regex>,
    pub exclude_methods: Vec<Regex>,

    /// Annotation descriptor (eg. `Lcom/acme/Trace;`) a method must carry
    pub required_annotation: Option<String>,

    pub entry_log: bool,
    pub timing: bool,
}

impl EligibilityCriteria {
    /// Whether either kind of instrumentation is turned on
    pub fn any_feature(&self) -> bool {
        self.entry_log || self.timing
    }

    /// Accepts binary names (`a/Foo`), dotted names, and archive entry names (`a/Foo.class`)
    pub fn is_class_eligible(&self, class_name: &str) -> bool {
        let dotted = dotted_class_name(class_name);
        if RESERVED_CLASS_NAMES
            .iter()
            .any(|reserved| dotted == *reserved || dotted.ends_with(&format!(".{}", reserved)))
        {
            return false;
        }
        if self.exclude_classes.iter().any(|re| re.is_match(&dotted)) {
            return false;
        }
        match &self.include_class {
            Some(include) => include.is_match(&dotted),
            None => true,
        }
    }

    pub fn is_method_eligible(&self, method: &MethodModel) -> bool {
        if !self.any_feature() || method.is_bodiless() {
            return false;
        }
        if method.name == "<init>" || method.name == "<clinit>" {
            return false;
        }

        let signature = method.signature();
        if self.exclude_methods.iter().any(|re| re.is_match(&signature)) {
            return false;
        }
        if let Some(include) = &self.include_method {
            if !include.is_match(&signature) {
                return false;
            }
        }

        match &self.required_annotation {
            Some(required) => method.annotations.iter().any(|desc| desc == required),
            None => true,
        }
    }
}

/// `a/Foo.class` → `a.Foo`
pub fn dotted_class_name(class_name: &str) -> String {
    class_name
        .strip_suffix(".class")
        .unwrap_or(class_name)
        .replace('/', ".")
}
