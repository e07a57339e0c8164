use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn from_str(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(RunId);

/// Container image reference produced by the builder and consumed by the sandbox.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageTag(pub String);

impl ImageTag {
    pub fn from_str(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ImageTag {
    /// Slug every part and join the non-empty ones with `-`.
    ///
    /// The result always matches the registry repository grammar
    /// `[a-z0-9]+((\.|_|__|-+)[a-z0-9]+)*`.
    pub fn compose(parts: &[&str]) -> Self {
        let slugs: Vec<String> = parts.iter().map(|p| tag_slug(p)).filter(|s| !s.is_empty()).collect();
        if slugs.is_empty() {
            return Self("deplog".to_string());
        }
        Self(slugs.join("-"))
    }
}

/// Lower-cases `name`, turns every run of characters outside `[a-z0-9]` into a
/// single `-` and trims `-` from both ends.
pub fn tag_slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// First 8 hex chars of the SHA-256 of `s`. Keeps tags distinct for names that
/// only differ by case.
pub fn short_hash(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    hex::encode(digest)[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Repository grammar: `[a-z0-9]+((\.|_|__|-+)[a-z0-9]+)*`.
    fn is_registry_name(tag: &str) -> bool {
        let mut chars = tag.chars().peekable();
        let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
        let mut expect_component = true;
        while let Some(c) = chars.next() {
            if alnum(c) {
                expect_component = false;
                continue;
            }
            if expect_component {
                return false;
            }
            match c {
                '.' => {}
                '_' => {
                    if chars.peek() == Some(&'_') {
                        chars.next();
                    }
                }
                '-' => {
                    while chars.peek() == Some(&'-') {
                        chars.next();
                    }
                }
                _ => return false,
            }
            expect_component = true;
        }
        !expect_component
    }

    #[test]
    fn slug_lowercases_and_collapses_separators() {
        assert_eq!(tag_slug("Dev_Tools"), "dev-tools");
        assert_eq!(tag_slug("a b/c"), "a-b-c");
        assert_eq!(tag_slug("_private"), "private");
        assert_eq!(tag_slug("dev_"), "dev");
        assert_eq!(tag_slug("a-.b"), "a-b");
        assert_eq!(tag_slug("..."), "");
    }

    #[test]
    fn composed_tags_match_registry_grammar() {
        for parts in [
            &["deplog", "extra", "_private", "3ce6c249"][..],
            &["deplog", "extra", "a..b", "ff"],
            &["Deplog_", "_deps", "00"],
            &["", "-", "_"],
            &["deplog", "base"],
        ] {
            let tag = ImageTag::compose(parts);
            assert!(is_registry_name(tag.as_str()), "{parts:?} -> {tag}");
        }
        assert_eq!(ImageTag::compose(&["deplog", "", "base"]).as_str(), "deplog-base");
    }

    #[test]
    fn variant_tags_match_registry_grammar() {
        for name in ["_private", "dev_", "a..b", "a-.b", "Dev", "x.y_z-1", "_", "base"] {
            let tag = crate::Variant::named(name).unwrap().image_tag("deplog");
            assert!(is_registry_name(tag.as_str()), "{name:?} -> {tag}");
        }
        assert!(is_registry_name(crate::Variant::Base.image_tag("Deplog_").as_str()));
    }

    #[test]
    fn grammar_checker_rejects_bad_separators() {
        assert!(is_registry_name("a__b"));
        assert!(is_registry_name("a---b"));
        assert!(!is_registry_name("a-_b"));
        assert!(!is_registry_name("a..b"));
        assert!(!is_registry_name("-a"));
        assert!(!is_registry_name("a_"));
        assert!(!is_registry_name(""));
    }

    #[test]
    fn short_hash_is_stable_and_case_sensitive() {
        assert_eq!(short_hash("dev"), short_hash("dev"));
        assert_ne!(short_hash("dev"), short_hash("Dev"));
        assert_eq!(short_hash("dev").len(), 8);
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
