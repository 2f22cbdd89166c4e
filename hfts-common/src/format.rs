//! Placeholder substitution for chunk file names.
//!
//! A placeholder is `{name}` where `name` is non-empty and contains no brace.
//! Everything else, including `{}` and runs of doubled braces, is copied through
//! as literal text. Placeholders that cannot be resolved are left as written.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::common_config::HfConfig;

/// Replaces `{key}` with `args[key]`.
pub fn format_named(template: &str, args: &HashMap<&str, &str>) -> String {
    substitute(template, |key| args.get(key).map(|v| v.to_string()))
}

/// Replaces placeholders left to right with successive `args`, ignoring their names.
pub fn format_positional(template: &str, args: &[&str]) -> String {
    let mut next = args.iter();
    substitute(template, |_| next.next().map(|v| v.to_string()))
}

fn substitute(template: &str, mut resolve: impl FnMut(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut key = String::new();

    for c in template.chars() {
        match c {
            '{' => {
                out.push_str(&key);
                key.clear();
                out.push('{');
            }
            '}' if !key.is_empty() && !key.contains('}') && out.ends_with('{') => {
                out.pop();
                match resolve(&key) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(&key);
                        out.push('}');
                    }
                }
                key.clear();
            }
            _ => key.push(c),
        }
    }

    out.push_str(&key);
    out
}

/// Builds `{prefix}`/`{index}` chunk file names for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkNaming {
    pub template: String,
    pub prefix: String,
    pub index_width: usize,
}

impl ChunkNaming {
    pub fn new(template: impl Into<String>, prefix: impl Into<String>, index_width: usize) -> Self {
        ChunkNaming {
            template: template.into(),
            prefix: prefix.into(),
            index_width,
        }
    }

    pub fn timestamps(config: &HfConfig) -> Self {
        Self::new(&config.file_name_format, &config.timestamps_prefix, config.index_width)
    }

    pub fn values(config: &HfConfig) -> Self {
        Self::new(&config.file_name_format, &config.values_prefix, config.index_width)
    }

    pub fn file_name(&self, index: u64) -> String {
        let index = format!("{:0width$}", index, width = self.index_width);
        let args = HashMap::from([("prefix", self.prefix.as_str()), ("index", index.as_str())]);
        format_named(&self.template, &args)
    }

    pub fn path(&self, dir: &Path, index: u64) -> PathBuf {
        dir.join(self.file_name(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "12{index}32{}{{}{prefix}}}";

    #[test]
    fn named_arguments() {
        let args = HashMap::from([("prefix", "timestamps"), ("index", "1")]);
        assert_eq!(format_named(TEMPLATE, &args), "12132{}{{}timestamps}}");
    }

    #[test]
    fn positional_arguments() {
        assert_eq!(format_positional(TEMPLATE, &["timestamps", "1"]), "12timestamps32{}{{}1}}");
    }

    #[test]
    fn unknown_and_exhausted_placeholders_stay() {
        let args = HashMap::from([("prefix", "v")]);
        assert_eq!(format_named("{prefix}-{other}", &args), "v-{other}");
        assert_eq!(format_positional("{a}{b}{c}", &["x"]), "x{b}{c}");
        assert_eq!(format_named("", &args), "");
        assert_eq!(format_named("}{", &args), "}{");
    }

    #[test]
    fn chunk_names_are_zero_padded() {
        let naming = ChunkNaming::new("{prefix}_{index}.zst", "values", 10);
        assert_eq!(naming.file_name(42), "values_0000000042.zst");
        let short = ChunkNaming::new("{prefix}{index}", "ts", 3);
        assert_eq!(short.file_name(12345), "ts12345");
    }
}
