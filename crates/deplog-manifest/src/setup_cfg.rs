use std::path::Path;

use crate::{ManifestError, ManifestKind, ProjectManifest};

/// Sections and keys of an INI file, in file order.
///
/// Keys are lower-cased and continuation lines are folded into the
/// preceding value, the way Python's `configparser` reads `setup.cfg`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl IniDocument {
    pub fn keys(&self, section: &str) -> Vec<&str> {
        self.section(section).map(|entries| entries.iter().map(|(k, _)| k.as_str()).collect()).unwrap_or_default()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.section(section)?.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    fn section(&self, name: &str) -> Option<&Vec<(String, String)>> {
        self.sections.iter().find(|(s, _)| s == name).map(|(_, entries)| entries)
    }
}

pub fn parse_setup_cfg(text: &str, path: &Path) -> Result<IniDocument, ManifestError> {
    let err = |line: usize, message: &str| ManifestError::Ini { path: path.to_path_buf(), line, message: message.to_string() };

    let mut doc = IniDocument::default();
    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if raw.starts_with(char::is_whitespace) {
            let Some((_, entries)) = doc.sections.last_mut() else {
                return Err(err(lineno, "continuation line outside of a section"));
            };
            let Some((_, value)) = entries.last_mut() else {
                return Err(err(lineno, "continuation line without a key"));
            };
            if !value.is_empty() {
                value.push('\n');
            }
            value.push_str(trimmed);
            continue;
        }

        if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            doc.sections.push((name.trim().to_string(), Vec::new()));
            continue;
        }

        let Some(split) = trimmed.find(['=', ':']) else {
            return Err(err(lineno, "expected `key = value`"));
        };
        let Some((_, entries)) = doc.sections.last_mut() else {
            return Err(err(lineno, "key outside of a section"));
        };
        let key = trimmed[..split].trim().to_ascii_lowercase();
        let value = trimmed[split + 1..].trim().to_string();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => entries.push((key, value)),
        }
    }
    Ok(doc)
}

pub fn read_setup_cfg(path: &Path) -> Result<ProjectManifest, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io { path: path.to_path_buf(), source })?;
    let doc = parse_setup_cfg(&text, path)?;
    Ok(ProjectManifest {
        path: path.to_path_buf(),
        kind: ManifestKind::SetupCfg,
        package_name: doc.get("metadata", "name").filter(|n| !n.is_empty()).map(str::to_string),
        extras: doc.keys("options.extras_require").into_iter().map(str::to_string).collect(),
    })
}
