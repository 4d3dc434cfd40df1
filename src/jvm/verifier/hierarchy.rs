use std::collections::{HashMap, HashSet};

const OBJECT: &str = "java/lang/Object";

/// Interfaces implemented by every array type
const ARRAY_INTERFACES: [&str; 2] = ["java/lang/Cloneable", "java/io/Serializable"];

/// Superclass and interface edges of a class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEdges {
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub is_interface: bool,
}

/// Class hierarchy used to merge reference types where control flow joins
///
/// The hierarchy only knows about the classes that were explicitly added to it (some well known
/// JDK types and the classes found in the archive being processed). Merging two types it cannot
/// relate always produces `java/lang/Object`, which is what the JVM does with interfaces anyway.
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    classes: HashMap<String, ClassEdges>,
}

impl ClassHierarchy {
    /// Empty hierarchy, apart from `java/lang/Object`
    pub fn new() -> ClassHierarchy {
        let mut hierarchy = ClassHierarchy::default();
        hierarchy.add_class(OBJECT, None, vec![], false);
        hierarchy
    }

    /// Hierarchy pre-populated with common classes from the Java library
    pub fn with_java_library() -> ClassHierarchy {
        let mut hierarchy = ClassHierarchy::new();
        for (name, superclass, interfaces) in JAVA_CLASSES {
            hierarchy.add_class(
                name,
                Some(superclass),
                interfaces.iter().map(|s| s.to_string()).collect(),
                false,
            );
        }
        for (name, interfaces) in JAVA_INTERFACES {
            hierarchy.add_class(
                name,
                Some(OBJECT),
                interfaces.iter().map(|s| s.to_string()).collect(),
                true,
            );
        }
        hierarchy
    }

    /// Register a class (replacing anything previously known under the same name)
    pub fn add_class(
        &mut self,
        name: &str,
        superclass: Option<&str>,
        interfaces: Vec<String>,
        is_interface: bool,
    ) {
        self.classes.insert(
            name.to_owned(),
            ClassEdges {
                superclass: superclass.map(str::to_owned),
                interfaces,
                is_interface,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&ClassEdges> {
        self.classes.get(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn is_interface(&self, name: &str) -> bool {
        self.classes
            .get(name)
            .map_or(false, |edges| edges.is_interface)
    }

    /// Query if one (binary name or array descriptor) type is assignable to another
    ///
    /// Unknown classes are only assignable to themselves and `java/lang/Object`.
    pub fn is_assignable(&self, sub_type: &str, super_type: &str) -> bool {
        if sub_type == super_type || super_type == OBJECT {
            return true;
        }

        match (array_component(sub_type), array_component(super_type)) {
            (Some(_), None) => ARRAY_INTERFACES.contains(&super_type),
            (None, Some(_)) => false,
            (Some(sub_component), Some(super_component)) => {
                is_reference_name(sub_component)
                    && is_reference_name(super_component)
                    && self.is_assignable(
                        &component_name(sub_component),
                        &component_name(super_component),
                    )
            }
            (None, None) => {
                // Search up the superclasses and superinterfaces looking for the super type
                let mut to_visit: Vec<&str> = vec![sub_type];
                let mut visited: HashSet<&str> = HashSet::new();
                while let Some(class) = to_visit.pop() {
                    if class == super_type {
                        return true;
                    }
                    if !visited.insert(class) {
                        continue;
                    }
                    if let Some(edges) = self.classes.get(class) {
                        to_visit.extend(edges.superclass.as_deref());
                        to_visit.extend(edges.interfaces.iter().map(String::as_str));
                    }
                }
                false
            }
        }
    }

    /// Most specific common superclass of two reference types
    pub fn common_superclass(&self, type1: &str, type2: &str) -> String {
        if self.is_assignable(type1, type2) {
            return type2.to_owned();
        }
        if self.is_assignable(type2, type1) {
            return type1.to_owned();
        }

        match (array_component(type1), array_component(type2)) {
            (Some(component1), Some(component2)) => {
                if is_reference_name(component1) && is_reference_name(component2) {
                    let common = self.common_superclass(
                        &component_name(component1),
                        &component_name(component2),
                    );
                    array_of(&common)
                } else {
                    OBJECT.to_owned()
                }
            }
            (None, None) if !self.is_interface(type1) && !self.is_interface(type2) => {
                let ancestors1: Vec<&str> = self.superclass_chain(type1);
                let ancestors2: HashSet<&str> = self.superclass_chain(type2).into_iter().collect();
                ancestors1
                    .into_iter()
                    .find(|class| ancestors2.contains(class))
                    .unwrap_or(OBJECT)
                    .to_owned()
            }
            _ => OBJECT.to_owned(),
        }
    }

    /// The class itself followed by all its known superclasses
    fn superclass_chain<'a>(&'a self, class: &'a str) -> Vec<&'a str> {
        let mut chain = vec![class];
        let mut current = class;
        while let Some(superclass) = self
            .classes
            .get(current)
            .and_then(|edges| edges.superclass.as_deref())
        {
            if chain.contains(&superclass) {
                break;
            }
            chain.push(superclass);
            current = superclass;
        }
        chain
    }
}

/// Component descriptor of an array type (eg. `Ljava/lang/String;` for `[Ljava/lang/String;`)
fn array_component(name: &str) -> Option<&str> {
    name.strip_prefix('[')
}

fn is_reference_name(descriptor: &str) -> bool {
    descriptor.starts_with('L') || descriptor.starts_with('[')
}

/// Name of the type described by a reference component descriptor
fn component_name(descriptor: &str) -> String {
    match descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
    {
        Some(class) => class.to_owned(),
        None => descriptor.to_owned(),
    }
}

/// Array type whose components have the given (binary name or array descriptor) type
pub fn array_of(name: &str) -> String {
    if name.starts_with('[') {
        format!("[{}", name)
    } else {
        format!("[L{};", name)
    }
}

/// Array component type, as a name usable in `Object` verification types
pub fn array_element(name: &str) -> Option<String> {
    let component = array_component(name)?;
    if is_reference_name(component) {
        Some(component_name(component))
    } else {
        None
    }
}

/// Classes from the Java library: name, superclass, interfaces
const JAVA_CLASSES: [(&str, &str, &[&str]); 40] = [
    ("java/lang/String", OBJECT, &["java/io/Serializable", "java/lang/Comparable", "java/lang/CharSequence"]),
    ("java/lang/Class", OBJECT, &["java/io/Serializable", "java/lang/reflect/Type"]),
    ("java/lang/System", OBJECT, &[]),
    ("java/lang/Math", OBJECT, &[]),
    ("java/lang/Thread", OBJECT, &["java/lang/Runnable"]),
    ("java/lang/StringBuilder", "java/lang/AbstractStringBuilder", &["java/io/Serializable", "java/lang/CharSequence", "java/lang/Appendable"]),
    ("java/lang/StringBuffer", "java/lang/AbstractStringBuilder", &["java/io/Serializable", "java/lang/CharSequence", "java/lang/Appendable"]),
    ("java/lang/AbstractStringBuilder", OBJECT, &["java/lang/CharSequence", "java/lang/Appendable"]),
    ("java/lang/Number", OBJECT, &["java/io/Serializable"]),
    ("java/lang/Integer", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Long", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Short", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Byte", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Float", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Double", "java/lang/Number", &["java/lang/Comparable"]),
    ("java/lang/Boolean", OBJECT, &["java/io/Serializable", "java/lang/Comparable"]),
    ("java/lang/Character", OBJECT, &["java/io/Serializable", "java/lang/Comparable"]),
    ("java/lang/Enum", OBJECT, &["java/io/Serializable", "java/lang/Comparable"]),
    ("java/lang/Throwable", OBJECT, &["java/io/Serializable"]),
    ("java/lang/Exception", "java/lang/Throwable", &[]),
    ("java/lang/Error", "java/lang/Throwable", &[]),
    ("java/lang/AssertionError", "java/lang/Error", &[]),
    ("java/lang/RuntimeException", "java/lang/Exception", &[]),
    ("java/lang/ArithmeticException", "java/lang/RuntimeException", &[]),
    ("java/lang/ClassCastException", "java/lang/RuntimeException", &[]),
    ("java/lang/IllegalArgumentException", "java/lang/RuntimeException", &[]),
    ("java/lang/NumberFormatException", "java/lang/IllegalArgumentException", &[]),
    ("java/lang/IllegalStateException", "java/lang/RuntimeException", &[]),
    ("java/lang/IndexOutOfBoundsException", "java/lang/RuntimeException", &[]),
    ("java/lang/ArrayIndexOutOfBoundsException", "java/lang/IndexOutOfBoundsException", &[]),
    ("java/lang/NullPointerException", "java/lang/RuntimeException", &[]),
    ("java/lang/UnsupportedOperationException", "java/lang/RuntimeException", &[]),
    ("java/lang/InterruptedException", "java/lang/Exception", &[]),
    ("java/lang/ReflectiveOperationException", "java/lang/Exception", &[]),
    ("java/lang/ClassNotFoundException", "java/lang/ReflectiveOperationException", &[]),
    ("java/io/IOException", "java/lang/Exception", &[]),
    ("java/io/UncheckedIOException", "java/lang/RuntimeException", &[]),
    ("java/io/OutputStream", OBJECT, &["java/io/Closeable", "java/io/Flushable"]),
    ("java/io/FilterOutputStream", "java/io/OutputStream", &[]),
    ("java/io/PrintStream", "java/io/FilterOutputStream", &["java/lang/Appendable", "java/io/Closeable"]),
];

/// Interfaces from the Java library: name, superinterfaces
const JAVA_INTERFACES: [(&str, &[&str]); 18] = [
    ("java/io/Serializable", &[]),
    ("java/lang/Cloneable", &[]),
    ("java/lang/Comparable", &[]),
    ("java/lang/CharSequence", &[]),
    ("java/lang/Appendable", &[]),
    ("java/lang/Runnable", &[]),
    ("java/lang/AutoCloseable", &[]),
    ("java/io/Closeable", &["java/lang/AutoCloseable"]),
    ("java/io/Flushable", &[]),
    ("java/lang/Iterable", &[]),
    ("java/lang/reflect/Type", &[]),
    ("java/util/Collection", &["java/lang/Iterable"]),
    ("java/util/List", &["java/util/Collection"]),
    ("java/util/Set", &["java/util/Collection"]),
    ("java/util/Map", &[]),
    ("java/util/Iterator", &[]),
    ("org/slf4j/Logger", &[]),
    ("java/util/function/Supplier", &[]),
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn common_superclasses_of_library_types() {
        let hierarchy = ClassHierarchy::with_java_library();
        assert_eq!(
            hierarchy.common_superclass("java/lang/Integer", "java/lang/Long"),
            "java/lang/Number"
        );
        assert_eq!(
            hierarchy.common_superclass(
                "java/lang/IllegalStateException",
                "java/lang/NullPointerException"
            ),
            "java/lang/RuntimeException"
        );
        assert_eq!(
            hierarchy.common_superclass("java/io/IOException", "java/lang/RuntimeException"),
            "java/lang/Exception"
        );
        assert_eq!(
            hierarchy.common_superclass("java/lang/String", "java/lang/CharSequence"),
            "java/lang/CharSequence"
        );
    }

    #[test]
    fn unknown_types_merge_to_object() {
        let hierarchy = ClassHierarchy::with_java_library();
        assert_eq!(hierarchy.common_superclass("a/Foo", "b/Bar"), OBJECT);
        assert_eq!(hierarchy.common_superclass("a/Foo", "a/Foo"), "a/Foo");
        assert_eq!(
            hierarchy.common_superclass("java/util/List", "java/util/Set"),
            OBJECT
        );
    }

    #[test]
    fn archive_classes() {
        let mut hierarchy = ClassHierarchy::with_java_library();
        hierarchy.add_class("a/Base", Some(OBJECT), vec![], false);
        hierarchy.add_class("a/Left", Some("a/Base"), vec![], false);
        hierarchy.add_class("a/Right", Some("a/Base"), vec![], false);
        hierarchy.add_class("a/Failure", Some("java/lang/RuntimeException"), vec![], false);
        assert_eq!(hierarchy.common_superclass("a/Left", "a/Right"), "a/Base");
        assert_eq!(
            hierarchy.common_superclass("a/Failure", "java/lang/IllegalArgumentException"),
            "java/lang/RuntimeException"
        );
        assert!(hierarchy.is_assignable("a/Failure", "java/io/Serializable"));
    }

    #[test]
    fn arrays() {
        let mut hierarchy = ClassHierarchy::with_java_library();
        hierarchy.add_class("a/Base", Some(OBJECT), vec![], false);
        hierarchy.add_class("a/Left", Some("a/Base"), vec![], false);
        hierarchy.add_class("a/Right", Some("a/Base"), vec![], false);
        assert_eq!(
            hierarchy.common_superclass("[La/Left;", "[La/Right;"),
            "[La/Base;"
        );
        assert_eq!(hierarchy.common_superclass("[I", "[J"), OBJECT);
        assert_eq!(hierarchy.common_superclass("[I", "[I"), "[I");
        assert_eq!(
            hierarchy.common_superclass("[[I", "[Ljava/lang/String;"),
            "[Ljava/lang/Object;"
        );
        assert!(hierarchy.is_assignable("[J", "java/lang/Cloneable"));
        assert_eq!(array_element("[[I").as_deref(), Some("[I"));
        assert_eq!(array_element("[La/Left;").as_deref(), Some("a/Left"));
        assert_eq!(array_element("[I"), None);
        assert_eq!(array_of("a/Left"), "[La/Left;");
    }
}
