/// Spellings under which the package under test can show up in pip output.
///
/// Matching is case-sensitive; editable installs may swap `-` and `_`, so
/// both normalized forms are accepted alongside the configured name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelfPackage {
    name: String,
    forms: Vec<String>,
}

impl SelfPackage {
    /// `None` for an empty (or all-whitespace) name: nothing is filtered then.
    pub fn new(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut forms = vec![name.to_string()];
        for form in [name.replace('-', "_"), name.replace('_', "-")] {
            if !forms.contains(&form) {
                forms.push(form);
            }
        }
        Some(Self { name: name.to_string(), forms })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, token: &str) -> bool {
        self.forms.iter().any(|f| f == token)
    }
}
