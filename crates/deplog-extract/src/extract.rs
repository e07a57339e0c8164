use std::path::PathBuf;

use tracing::debug;

use crate::{DependencyLog, SelfPackage};

/// Text captured from one in-container run.
#[derive(Clone, Debug, Default)]
pub struct CapturedListings {
    pub freeze: String,
    pub tree: String,
    pub python_version: String,
}

#[derive(Clone, Debug)]
pub struct LogExtractor {
    self_package: Option<SelfPackage>,
}

impl LogExtractor {
    /// An empty `self_package_name` turns all filtering off.
    pub fn new(self_package_name: &str) -> Self {
        Self { self_package: SelfPackage::new(self_package_name) }
    }

    pub fn self_package(&self) -> Option<&SelfPackage> {
        self.self_package.as_ref()
    }

    pub fn extract(&self, captured: &CapturedListings, subtitle: &str, target_path: PathBuf) -> DependencyLog {
        let raw_freeze_listing = filter_freeze(&captured.freeze, self.self_package.as_ref());
        let dependency_tree = rewrite_tree(&captured.tree, self.self_package.as_ref());
        DependencyLog {
            target_path,
            subtitle: subtitle.to_string(),
            python_version: parse_python_version(&captured.python_version),
            raw_freeze_listing,
            dependency_tree,
        }
    }
}

/// Names a freeze line refers to: its leading requirement name and, when
/// present, the `#egg=` marker value.
pub fn package_tokens(line: &str) -> Vec<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return vec![];
    }
    let mut tokens = Vec::with_capacity(2);

    let req = line
        .strip_prefix("-e ")
        .or_else(|| line.strip_prefix("--editable "))
        .unwrap_or(line)
        .trim_start();
    let end = req.find(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~' | '@' | ';' | '[') || c.is_whitespace());
    let name = &req[..end.unwrap_or(req.len())];
    // VCS and URL requirements have no leading name, only the egg marker
    if !name.is_empty() && !name.contains(|c: char| matches!(c, ':' | '/' | '#')) {
        tokens.push(name);
    }

    if let Some(idx) = line.find("#egg=") {
        let rest = &line[idx + "#egg=".len()..];
        let end = rest.find(|c: char| c == '&' || c == ',' || c.is_whitespace()).unwrap_or(rest.len());
        if end > 0 {
            tokens.push(&rest[..end]);
        }
    }
    tokens
}

/// Apply self-package exclusion to a freeze listing.
///
/// With no self package the listing passes through untouched. Otherwise
/// comment-only and blank lines go too, since pip annotates editable installs
/// with comments that vary between machines.
pub fn filter_freeze(text: &str, self_package: Option<&SelfPackage>) -> Vec<String> {
    let Some(pkg) = self_package else {
        return text.lines().map(str::to_string).collect();
    };
    let mut dropped = 0usize;
    let kept: Vec<String> = text
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            let keep = !(trimmed.is_empty()
                || trimmed.starts_with('#')
                || package_tokens(trimmed).into_iter().any(|t| pkg.matches(t)));
            if !keep {
                dropped += 1;
            }
            keep
        })
        .map(str::to_string)
        .collect();
    debug!(package = pkg.name(), dropped, "filtered freeze listing");
    kept
}

/// Strip the version from the self package's root line(s) in a pipdeptree listing.
pub fn rewrite_tree(text: &str, self_package: Option<&SelfPackage>) -> Vec<String> {
    let Some(pkg) = self_package else {
        return text.lines().map(str::to_string).collect();
    };
    text.lines().map(|line| rewrite_tree_line(line, pkg)).collect()
}

fn rewrite_tree_line(line: &str, pkg: &SelfPackage) -> String {
    // nested entries are indented or prefixed with box-drawing characters
    if line.starts_with(char::is_whitespace) {
        return line.to_string();
    }
    let split = line.find(char::is_whitespace).unwrap_or(line.len());
    let (head, rest) = line.split_at(split);
    match head.split_once("==") {
        Some((name, _version)) if pkg.matches(name) => format!("{name}{rest}"),
        _ => line.to_string(),
    }
}

/// `Python 3.12.1` -> `3.12.1`; anything else is kept, trimmed.
pub fn parse_python_version(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix("Python ").unwrap_or(text).trim().to_string()
}
