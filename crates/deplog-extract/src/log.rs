use std::path::PathBuf;

use serde::Serialize;

pub const BANNER: &str = "##############################################################";

/// A rendered-ready dependency log for one variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DependencyLog {
    pub target_path: PathBuf,
    pub subtitle: String,
    pub python_version: String,
    pub raw_freeze_listing: Vec<String>,
    pub dependency_tree: Vec<String>,
}

impl DependencyLog {
    /// Header, freeze section, tree section; always in that order.
    ///
    /// No timestamps: rendering the same listings twice gives identical bytes.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n", self.subtitle));
        out.push_str("# This file was generated by deplog. Do not edit by hand.\n");
        out.push_str(&format!("# Python: {}\n", self.python_version));
        push_section(&mut out, "pip freeze", &self.raw_freeze_listing);
        push_section(&mut out, "pipdeptree", &self.dependency_tree);
        out
    }
}

fn push_section(out: &mut String, title: &str, lines: &[String]) {
    out.push_str(BANNER);
    out.push('\n');
    out.push_str(&format!("#  {title}\n"));
    out.push_str(BANNER);
    out.push('\n');
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_layout() {
        let log = DependencyLog {
            target_path: PathBuf::from("dependencies.log"),
            subtitle: "demo-pkg (base)".into(),
            python_version: "3.12.1".into(),
            raw_freeze_listing: vec!["requests==2.27.1".into()],
            dependency_tree: vec!["demo-pkg".into(), "└── requests [required: >=2, installed: 2.27.1]".into()],
        };
        let text = log.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# demo-pkg (base)");
        assert_eq!(lines[2], "# Python: 3.12.1");
        assert_eq!(lines[3], BANNER);
        assert_eq!(lines[4], "#  pip freeze");
        assert_eq!(lines[6], "requests==2.27.1");
        assert_eq!(lines[8], "#  pipdeptree");
        assert_eq!(lines[10], "demo-pkg");
        assert!(text.ends_with("installed: 2.27.1]\n"));
        assert_eq!(text, log.render());
    }
}
