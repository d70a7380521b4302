//! The ordered class list shared by the parser, result writer and evaluator.
//!
//! Index 0 is always the background class. The list is built once and then
//! passed by reference to every component that translates labels.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::VocmapError;

/// Reserved name of the class at index 0.
pub const BACKGROUND: &str = "__background__";

/// Foreground classes of the d2City dataset, in index order (after background).
pub const D2CITY_CLASSES: [&str; 12] = [
    "car",
    "van",
    "bus",
    "truck",
    "person",
    "bicycle",
    "motorcycle",
    "open-tricycle",
    "closed-tricycle",
    "forklift",
    "large-block",
    "small-block",
];

/// Immutable class-name to index mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassList {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl ClassList {
    /// Builds a class list whose first entry is [`BACKGROUND`].
    ///
    /// Names must be unique, non-empty, and free of whitespace and path
    /// separators.
    pub fn new<I, S>(names: I) -> Result<Self, VocmapError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        match names.first() {
            Some(first) if first == BACKGROUND => {}
            Some(first) => {
                return Err(VocmapError::ClassListInvalid {
                    message: format!("index 0 must be '{BACKGROUND}', found '{first}'"),
                });
            }
            None => {
                return Err(VocmapError::ClassListInvalid {
                    message: "class list is empty".to_string(),
                });
            }
        }

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(VocmapError::ClassListInvalid {
                    message: format!("class {i} has an empty name"),
                });
            }
            // Names are annotation tokens and parts of result file names.
            if name.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
                return Err(VocmapError::ClassListInvalid {
                    message: format!(
                        "class {i} '{name}' contains whitespace or a path separator"
                    ),
                });
            }
            if let Some(previous) = index.insert(name.clone(), i) {
                return Err(VocmapError::ClassListInvalid {
                    message: format!("duplicate class '{name}' at indices {previous} and {i}"),
                });
            }
        }

        Ok(Self { names, index })
    }

    /// Builds a class list from foreground names, prepending the background.
    pub fn with_background<I, S>(foreground: I) -> Result<Self, VocmapError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = vec![BACKGROUND.to_string()];
        names.extend(foreground.into_iter().map(Into::into));
        Self::new(names)
    }

    /// The d2City class list.
    pub fn d2city() -> Self {
        let mut names = vec![BACKGROUND.to_string()];
        names.extend(D2CITY_CLASSES.iter().map(|name| name.to_string()));
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    /// Reads a class list from a `.yaml`/`.yml` file (`names: [...]`) or a
    /// plain text file with one class per line.
    ///
    /// The background entry is prepended unless the file already starts
    /// with it.
    pub fn from_file(path: &Path) -> Result<Self, VocmapError> {
        let data = fs::read_to_string(path)
            .map_err(|err| VocmapError::open_failed("class list", path, err))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        let names = if is_yaml {
            parse_yaml_names(&data, path)?
        } else {
            parse_text_names(&data)?
        };

        if names.first().map(String::as_str) == Some(BACKGROUND) {
            Self::new(names)
        } else {
            Self::with_background(names)
        }
    }

    /// Total number of classes, background included.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false; a class list holds at least the background class.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `(index, name)` for every class except the background.
    pub fn foreground(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, name)| (i, name.as_str()))
    }
}

impl Default for ClassList {
    fn default() -> Self {
        Self::d2city()
    }
}

#[derive(Debug, Deserialize)]
struct ClassesYaml {
    names: Vec<String>,
}

fn parse_yaml_names(data: &str, path: &Path) -> Result<Vec<String>, VocmapError> {
    let parsed: ClassesYaml =
        serde_yaml::from_str(data).map_err(|source| VocmapError::ClassListYamlParse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parsed.names)
}

fn parse_text_names(data: &str) -> Result<Vec<String>, VocmapError> {
    let mut names = Vec::new();
    for (line_idx, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            // trailing blank lines are common; interior ones are not
            if data.lines().skip(line_idx).all(|rest| rest.trim().is_empty()) {
                break;
            }
            return Err(VocmapError::ClassListInvalid {
                message: format!("line {} is empty", line_idx + 1),
            });
        }
        names.push(trimmed.to_string());
    }
    Ok(names)
}
