//! File naming for goldens and comparison outputs.
//!
//! Outputs derived from a golden live in the output directory and reuse the
//! golden's stem and extension:
//! - `<stem>_compare.<ext>` for the comparison artifact
//! - `<stem>_actual.<ext>` for the new capture
//!
//! Those suffixes are therefore reserved and a golden may not end in one.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Suffix of comparison artifacts
pub const COMPARE_SUFFIX: &str = "_compare";

/// Suffix of saved new captures
pub const ACTUAL_SUFFIX: &str = "_actual";

/// Stems a golden file may not end with
pub const RESERVED_SUFFIXES: [&str; 2] = [COMPARE_SUFFIX, ACTUAL_SUFFIX];

/// The reserved suffix `golden`'s stem ends with, if any
pub fn reserved_suffix(golden: &Path) -> Option<&'static str> {
    let stem = golden.file_stem()?.to_string_lossy();
    RESERVED_SUFFIXES.into_iter().find(|suffix| stem.ends_with(suffix))
}

fn sibling_output(golden: &Path, output_dir: &Path, suffix: &str) -> PathBuf {
    let stem = golden
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match golden.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    output_dir.join(name)
}

/// `<output_dir>/<stem>_compare.<ext>`
pub fn compare_file_path(golden: &Path, output_dir: &Path) -> PathBuf {
    sibling_output(golden, output_dir, COMPARE_SUFFIX)
}

/// `<output_dir>/<stem>_actual.<ext>`
pub fn actual_file_path(golden: &Path, output_dir: &Path) -> PathBuf {
    sibling_output(golden, output_dir, ACTUAL_SUFFIX)
}

/// Replace characters that do not belong in a file name
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

/// How a test's identity becomes a golden name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStrategy {
    /// `com.example.HomeTest.opens`
    #[default]
    PackageClassMethod,
    /// `com_example_HomeTest.opens`
    EscapedPackageClassMethod,
    /// `HomeTest.opens`
    ClassMethod,
}

impl NamingStrategy {
    pub fn option_name(self) -> &'static str {
        match self {
            NamingStrategy::PackageClassMethod => "testPackageAndClassAndMethod",
            NamingStrategy::EscapedPackageClassMethod => "escapedTestPackageAndClassAndMethod",
            NamingStrategy::ClassMethod => "testClassAndMethod",
        }
    }

    /// Build the test name for a qualified class and a method
    pub fn test_name(self, qualified_class: &str, method: &str) -> String {
        match self {
            NamingStrategy::PackageClassMethod => format!("{}.{}", qualified_class, method),
            NamingStrategy::EscapedPackageClassMethod => {
                format!("{}.{}", qualified_class.replace('.', "_"), method)
            }
            NamingStrategy::ClassMethod => {
                let class = qualified_class.rsplit('.').next().unwrap_or(qualified_class);
                format!("{}.{}", class, method)
            }
        }
    }
}

/// Unknown names fall back to the default strategy, so this never fails.
impl FromStr for NamingStrategy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "escapedTestPackageAndClassAndMethod" => NamingStrategy::EscapedPackageClassMethod,
            "testClassAndMethod" => NamingStrategy::ClassMethod,
            _ => NamingStrategy::PackageClassMethod,
        })
    }
}

impl fmt::Display for NamingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.option_name())
    }
}

/// Hands out golden names, numbering repeats: `name`, `name_2`, `name_3`...
#[derive(Debug, Default)]
pub struct NameGenerator {
    strategy: NamingStrategy,
    taken: HashMap<String, usize>,
}

impl NameGenerator {
    pub fn new(strategy: NamingStrategy) -> Self {
        Self {
            strategy,
            taken: HashMap::new(),
        }
    }

    /// Next free name for a test
    pub fn generate(&mut self, qualified_class: &str, method: &str) -> String {
        let name = self.strategy.test_name(qualified_class, method);
        self.countable(name)
    }

    /// Golden path for a test under `dir`
    pub fn file_path(&mut self, dir: &Path, qualified_class: &str, method: &str, extension: &str) -> PathBuf {
        let name = sanitize_name(&self.generate(qualified_class, method));
        dir.join(format!("{}.{}", name, extension))
    }

    fn countable(&mut self, name: String) -> String {
        let count = self.taken.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            name
        } else {
            format!("{}_{}", name, count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_paths() {
        let golden = Path::new("/goldens/home.png");
        let out = Path::new("/build/out");
        assert_eq!(compare_file_path(golden, out), PathBuf::from("/build/out/home_compare.png"));
        assert_eq!(actual_file_path(golden, out), PathBuf::from("/build/out/home_actual.png"));
        assert_eq!(
            compare_file_path(Path::new("noext"), out),
            PathBuf::from("/build/out/noext_compare")
        );
    }

    #[test]
    fn test_reserved_suffix() {
        assert_eq!(reserved_suffix(Path::new("a/home_compare.png")), Some("_compare"));
        assert_eq!(reserved_suffix(Path::new("home_actual.png")), Some("_actual"));
        assert_eq!(reserved_suffix(Path::new("home_actually.png")), None);
        assert_eq!(reserved_suffix(Path::new("home.png")), None);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("hello world"), "hello_world");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("HomeTest.opens"), "HomeTest.opens");
    }

    #[test]
    fn test_naming_strategies() {
        let class = "com.example.HomeTest";
        assert_eq!(
            NamingStrategy::PackageClassMethod.test_name(class, "opens"),
            "com.example.HomeTest.opens"
        );
        assert_eq!(
            NamingStrategy::EscapedPackageClassMethod.test_name(class, "opens"),
            "com_example_HomeTest.opens"
        );
        assert_eq!(NamingStrategy::ClassMethod.test_name(class, "opens"), "HomeTest.opens");
        assert_eq!("testClassAndMethod".parse(), Ok(NamingStrategy::ClassMethod));
        assert_eq!("nonsense".parse(), Ok(NamingStrategy::PackageClassMethod));
    }

    #[test]
    fn test_countable_names() {
        let mut names = NameGenerator::new(NamingStrategy::ClassMethod);
        assert_eq!(names.generate("a.B", "c"), "B.c");
        assert_eq!(names.generate("a.B", "c"), "B.c_2");
        assert_eq!(names.generate("a.B", "d"), "B.d");
        assert_eq!(names.generate("x.B", "c"), "B.c_3");
        assert_eq!(
            names.file_path(Path::new("/g"), "a.B", "d", "png"),
            PathBuf::from("/g/B.d_2.png")
        );
    }
}
