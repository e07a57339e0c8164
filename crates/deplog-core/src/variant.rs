use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ids::{short_hash, ImageTag};
use crate::PipelineError;

/// One build flavor: the bare package, or the package with one optional extra.
///
/// `Base` orders before every `Named` variant, and there is no string that
/// stands in for it, so an extra literally called "base" is just another
/// named variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Base,
    Named(String),
}

impl Variant {
    /// Validate and wrap an extra name.
    pub fn named(name: impl Into<String>) -> Result<Self, PipelineError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Variant::Named(name))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Variant::Base => None,
            Variant::Named(n) => Some(n),
        }
    }

    /// What to hand to `pip install` for this variant.
    pub fn install_target(&self, root: &str) -> String {
        match self {
            Variant::Base => root.to_string(),
            Variant::Named(n) => format!("{root}[{n}]"),
        }
    }

    pub fn image_tag(&self, prefix: &str) -> ImageTag {
        match self {
            Variant::Base => ImageTag::compose(&[prefix, "base"]),
            Variant::Named(n) => ImageTag::compose(&[prefix, "extra", n, &short_hash(n)]),
        }
    }

    /// File name of this variant's log, derived from the base log file name.
    ///
    /// `dependencies.log` stays as is for `Base` and becomes
    /// `dependencies-<name>.log` for a named variant.
    pub fn log_file_name(&self, base_file_name: &str) -> String {
        let name = match self {
            Variant::Base => return base_file_name.to_string(),
            Variant::Named(n) => n,
        };
        let path = Path::new(base_file_name);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(base_file_name);
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) => format!("{stem}-{name}.{ext}"),
            None => format!("{stem}-{name}"),
        }
    }

    pub fn log_path(&self, log_dir: &Path, base_file_name: &str) -> PathBuf {
        log_dir.join(self.log_file_name(base_file_name))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // parentheses are not valid in extra names, so this never collides
            Variant::Base => f.write_str("(base)"),
            Variant::Named(n) => f.write_str(n),
        }
    }
}

fn validate_name(name: &str) -> Result<(), PipelineError> {
    if name.is_empty() {
        return Err(PipelineError::Usage("variant name must not be empty".into()));
    }
    if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))) {
        return Err(PipelineError::Usage(format!("variant name {name:?} contains invalid character {bad:?}")));
    }
    if name.starts_with('.') {
        return Err(PipelineError::Usage(format!("variant name {name:?} must not start with '.'")));
    }
    Ok(())
}

/// The full variant set for one run: `Base` first, then the named variants sorted.
///
/// Duplicate names are rejected rather than silently merged.
pub fn variant_set<I, S>(names: I) -> Result<Vec<Variant>, PipelineError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = BTreeSet::new();
    for name in names {
        let variant = Variant::named(name)?;
        if !seen.insert(variant.clone()) {
            return Err(PipelineError::Usage(format!("duplicate variant {variant}")));
        }
    }
    let mut out = Vec::with_capacity(seen.len() + 1);
    out.push(Variant::Base);
    out.extend(seen);
    Ok(out)
}
