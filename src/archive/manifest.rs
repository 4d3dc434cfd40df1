use crate::Error;

/// Name of the manifest entry inside a jar
pub const MANIFEST_NAME: &str = "META-INF/MANIFEST.MF";

/// Longest line (in bytes, without the line break) allowed in a manifest
const MAX_LINE_LENGTH: usize = 72;

/// Jar manifest: a main section followed by per-entry sections
///
/// Attribute names are case insensitive and keep the order they were first seen in. Writing
/// always produces the canonical form (`\r\n` line breaks, lines wrapped at 72 bytes, version
/// attribute first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub main: Section,
    pub entries: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    attributes: Vec<(String, String)>,
}

impl Section {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing the value of an existing one with the same name
    pub fn insert(&mut self, name: &str, value: &str) {
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Manifest, Error> {
        let text = std::str::from_utf8(bytes)
            .map_err(|err| Error::MalformedInput(format!("{}: {}", MANIFEST_NAME, err)))?;

        let mut manifest = Manifest::default();
        let mut current = Section::default();
        let mut in_main = true;
        let mut last_name: Option<String> = None;

        for line in text.split("\r\n").flat_map(|l| l.split(['\n', '\r'])) {
            if line.is_empty() {
                if in_main {
                    manifest.main = std::mem::take(&mut current);
                    in_main = false;
                } else if !current.is_empty() {
                    manifest.entries.push(std::mem::take(&mut current));
                }
                last_name = None;
                continue;
            }

            if let Some(continued) = line.strip_prefix(' ') {
                let name = last_name.as_deref().ok_or_else(|| {
                    Error::MalformedInput(format!(
                        "{}: continuation without attribute",
                        MANIFEST_NAME
                    ))
                })?;
                let mut value = current.get(name).unwrap_or_default().to_string();
                value.push_str(continued);
                current.insert(name, &value);
                continue;
            }

            let (name, value) = line.split_once(": ").ok_or_else(|| {
                Error::MalformedInput(format!("{}: invalid header {:?}", MANIFEST_NAME, line))
            })?;
            current.insert(name, value);
            last_name = Some(name.to_string());
        }

        if in_main {
            manifest.main = current;
        } else if !current.is_empty() {
            manifest.entries.push(current);
        }
        Ok(manifest)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();

        let version = ["Manifest-Version", "Signature-Version"]
            .iter()
            .find_map(|name| self.main.get(name).map(|value| (*name, value)));
        if let Some((name, value)) = version {
            write_attribute(&mut out, name, value);
        }
        for (name, value) in self.main.attributes() {
            if version.map_or(true, |(version_name, _)| !name.eq_ignore_ascii_case(version_name)) {
                write_attribute(&mut out, name, value);
            }
        }
        out.push_str("\r\n");

        for section in &self.entries {
            if let Some(name) = section.get("Name") {
                write_attribute(&mut out, "Name", name);
            }
            for (key, value) in section.attributes() {
                if !key.eq_ignore_ascii_case("Name") {
                    write_attribute(&mut out, key, value);
                }
            }
            out.push_str("\r\n");
        }

        out.into_bytes()
    }
}

/// `name: value`, wrapped into continuation lines
fn write_attribute(out: &mut String, name: &str, value: &str) {
    let line = format!("{}: {}", name, value);
    let mut remaining = line.as_str();
    let mut limit = MAX_LINE_LENGTH;
    loop {
        if remaining.len() <= limit {
            out.push_str(remaining);
            out.push_str("\r\n");
            return;
        }

        // Never split a multi-byte character
        let mut split = limit;
        while !remaining.is_char_boundary(split) {
            split -= 1;
        }
        out.push_str(&remaining[..split]);
        out.push_str("\r\n ");
        remaining = &remaining[split..];
        limit = MAX_LINE_LENGTH - 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_sections() {
        let manifest = Manifest::parse(
            b"Manifest-Version: 1.0\nMain-Class: a.Main\n\nName: a/Foo.class\nSHA-256-Digest: abc\n\n",
        )
        .unwrap();
        assert_eq!(manifest.main.get("manifest-version"), Some("1.0"));
        assert_eq!(manifest.main.get("Main-Class"), Some("a.Main"));
        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(manifest.entries[0].get("Name"), Some("a/Foo.class"));
    }

    #[test]
    fn continuation_lines() {
        let manifest =
            Manifest::parse(b"Manifest-Version: 1.0\r\nClass-Path: lib/a.jar\r\n  lib/b.jar\r\n")
                .unwrap();
        assert_eq!(manifest.main.get("Class-Path"), Some("lib/a.jar lib/b.jar"));
    }

    #[test]
    fn canonical_output() {
        let mut manifest = Manifest::default();
        manifest.main.insert("Created-By", "hand");
        manifest.main.insert("Manifest-Version", "1.0");
        assert_eq!(
            String::from_utf8(manifest.to_bytes()).unwrap(),
            "Manifest-Version: 1.0\r\nCreated-By: hand\r\n\r\n"
        );
    }

    #[test]
    fn long_values_are_wrapped() {
        let mut manifest = Manifest::default();
        manifest.main.insert("Manifest-Version", "1.0");
        let class_path = (0..30)
            .map(|i| format!("lib/dependency-{}.jar", i))
            .collect::<Vec<_>>()
            .join(" ");
        manifest.main.insert("Class-Path", &class_path);

        let bytes = manifest.to_bytes();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.split("\r\n").all(|line| line.len() <= MAX_LINE_LENGTH));
        assert!(text.contains("\r\n "));

        let reparsed = Manifest::parse(&bytes).unwrap();
        assert_eq!(reparsed.main.get("Class-Path"), Some(class_path.as_str()));
        assert_eq!(reparsed, manifest);
    }

    #[test]
    fn wrapping_respects_characters() {
        let mut out = String::new();
        let value = "é".repeat(60);
        write_attribute(&mut out, "Implementation-Title", &value);
        for line in out.split("\r\n") {
            assert!(line.len() <= MAX_LINE_LENGTH);
        }
        let unwrapped = out.replace("\r\n ", "");
        assert_eq!(unwrapped, format!("Implementation-Title: {}\r\n", value));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            Manifest::parse(b"Manifest-Version 1.0\n"),
            Err(Error::MalformedInput(_))
        ));
        assert!(matches!(
            Manifest::parse(b" leading continuation\n"),
            Err(Error::MalformedInput(_))
        ));
    }
}
