use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CatalogError;

pub const FASTQ_GZ: &str = "fastq_gz";
pub const COUNT: &str = "count";
pub const FASTQC_DATA: &str = "fastqc_data";
pub const MULTIQC_FASTQC: &str = "multiqc_fastqc";
pub const ASSEMBLY_TABLE: &str = "assembly_table";
pub const MERGED_PAIRS: &str = "merged_pairs";
pub const MERGE_MANIFEST: &str = "merge_manifest";
pub const SAMPLE_SET_DIR: &str = "sample_set_dir";

pub const WILDCARD: &str = "*";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

pub fn default_templates() -> BTreeMap<String, String> {
    [
        (
            FASTQ_GZ,
            "{fs_prefix}/{dataset}/reads/{preprocessing}/{sample}_{strand}.fastq.gz",
        ),
        (
            COUNT,
            "{fs_prefix}/{dataset}/reads/{preprocessing}/profile/{sample}_{strand}.count",
        ),
        (
            FASTQC_DATA,
            "{fs_prefix}/{dataset}/profile/fastqc/{preprocessing}/{sample}/{sample}_{strand}/fastqc_data.txt",
        ),
        (
            MULTIQC_FASTQC,
            "{fs_prefix}/{dataset}/profile/multiqc/{sample_set}/{strand}/fastqc_list.txt",
        ),
        (
            ASSEMBLY_TABLE,
            "{fs_prefix}/{dataset}/assembly/{assembler}__{params}/{sample_set}/sample_set.tsv",
        ),
        (
            MERGED_PAIRS,
            "{fs_prefix}/{dataset}/reads/{preprocessing}/merged/{sample_set}/{sample}.fastq.gz",
        ),
        (
            MERGE_MANIFEST,
            "{fs_prefix}/{dataset}/merged/{sample_set}/samples.tsv",
        ),
        (SAMPLE_SET_DIR, "{fs_prefix}/{dataset}/sample_sets/{sample_set}"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name.to_string(), pattern.to_string()))
    .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders(BTreeMap<String, String>);

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn extend_missing(&mut self, other: &Placeholders) {
        for (name, value) in &other.0 {
            self.0
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Placeholders {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    name: String,
    pattern: String,
}

impl PathTemplate {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&self.pattern) {
            if let Some(name) = caps.get(1).map(|m| m.as_str()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitutes every placeholder. The pattern is otherwise copied verbatim,
    /// separators included.
    pub fn render(&self, values: &Placeholders) -> Result<String, CatalogError> {
        self.expand(|name| {
            values
                .get(name)
                .map(str::to_string)
                .ok_or_else(|| self.missing(name))
        })
    }

    pub fn matcher(
        &self,
        values: &Placeholders,
        capture: &str,
    ) -> Result<TemplateMatcher, CatalogError> {
        if !self.placeholders().contains(&capture) {
            return Err(CatalogError::InvalidPlaceholder {
                name: capture.to_string(),
                value: format!("not referenced by template {}", self.name),
            });
        }

        let mut captured = false;
        let mut expression = String::from("^");
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(&self.pattern) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            expression.push_str(&regex::escape(&self.pattern[last..whole.start()]));
            let name = name.as_str();
            if name == capture {
                if captured {
                    expression.push_str("[^/]+");
                } else {
                    expression.push_str("(?P<value>[^/]+)");
                    captured = true;
                }
            } else {
                let value = values.get(name).ok_or_else(|| self.missing(name))?;
                expression.push_str(&glob_to_regex(value));
            }
            last = whole.end();
        }
        expression.push_str(&regex::escape(&self.pattern[last..]));
        expression.push('$');

        let regex = Regex::new(&expression).map_err(|err| CatalogError::InvalidGlob {
            pattern: self.pattern.clone(),
            message: err.to_string(),
        })?;
        Ok(TemplateMatcher { regex })
    }

    fn expand<F>(&self, mut lookup: F) -> Result<String, CatalogError>
    where
        F: FnMut(&str) -> Result<String, CatalogError>,
    {
        let mut out = String::with_capacity(self.pattern.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(&self.pattern) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&self.pattern[last..whole.start()]);
            out.push_str(&lookup(name.as_str())?);
            last = whole.end();
        }
        out.push_str(&self.pattern[last..]);
        Ok(out)
    }

    fn missing(&self, placeholder: &str) -> CatalogError {
        CatalogError::MissingPlaceholder {
            template: self.name.clone(),
            placeholder: placeholder.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    regex: Regex,
}

impl TemplateMatcher {
    pub fn capture(&self, path: &str) -> Option<String> {
        self.regex
            .captures(path)
            .and_then(|caps| caps.name("value"))
            .map(|m| m.as_str().to_string())
    }
}

fn glob_to_regex(value: &str) -> String {
    let mut out = String::new();
    for ch in value.chars() {
        match ch {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct PathTemplates {
    templates: BTreeMap<String, PathTemplate>,
}

impl PathTemplates {
    pub fn new(patterns: BTreeMap<String, String>) -> Self {
        let templates = patterns
            .into_iter()
            .map(|(name, pattern)| (name.clone(), PathTemplate::new(name, pattern)))
            .collect();
        Self { templates }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_templates())
    }

    pub fn merge(&mut self, overrides: BTreeMap<String, String>) {
        for (name, pattern) in overrides {
            self.templates
                .insert(name.clone(), PathTemplate::new(name, pattern));
        }
    }

    pub fn get(&self, name: &str) -> Result<&PathTemplate, CatalogError> {
        self.templates
            .get(name)
            .ok_or_else(|| CatalogError::UnknownTemplate(name.to_string()))
    }

    pub fn render(&self, name: &str, values: &Placeholders) -> Result<String, CatalogError> {
        self.get(name)?.render(values)
    }
}

impl Default for PathTemplates {
    fn default() -> Self {
        Self::with_defaults()
    }
}
