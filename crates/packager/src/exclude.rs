//! Exclude rules for staging.
//!
//! Patterns follow rsync `--exclude` conventions:
//!
//! - A trailing `/` restricts the rule to directories.
//! - A leading `/` anchors the rule to the project root.
//! - A pattern without any other `/` matches the entry name at any depth.
//! - A pattern with an inner `/` matches the trailing components of the
//!   relative path.
//!
//! An excluded directory prunes its whole subtree.

use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};

use crate::error::PackageError;

/// Paths never shipped to the server: VCS metadata, dependencies,
/// secrets, logs, tests and the deploy tooling itself.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "node_modules",
    ".env",
    ".env.local",
    "*.log",
    "__tests__",
    ".DS_Store",
    "deploy-*.sh",
    "deploy-*.py",
    ".gitignore",
    "secrets/",
];

#[derive(Debug, Clone)]
enum Target {
    Name,
    Path,
}

#[derive(Debug, Clone)]
struct Rule {
    matcher: GlobMatcher,
    target: Target,
    dir_only: bool,
}

/// A compiled list of exclude patterns.
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    rules: Vec<Rule>,
}

impl ExcludeSet {
    /// Compiles `patterns`. Empty patterns are ignored.
    pub fn new<I, S>(patterns: I) -> Result<Self, PackageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for pattern in patterns {
            if let Some(rule) = compile(pattern.as_ref())? {
                rules.push(rule);
            }
        }
        Ok(Self { rules })
    }

    /// The built-in [`DEFAULT_EXCLUDES`] list.
    pub fn default_rules() -> Result<Self, PackageError> {
        Self::new(DEFAULT_EXCLUDES)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns `true` if `rel_path` (relative to the project root) is excluded.
    pub fn is_excluded(&self, rel_path: &Path, is_dir: bool) -> bool {
        self.rules.iter().any(|rule| {
            if rule.dir_only && !is_dir {
                return false;
            }
            match rule.target {
                Target::Name => rel_path
                    .file_name()
                    .is_some_and(|name| rule.matcher.is_match(Path::new(name))),
                Target::Path => rule.matcher.is_match(rel_path),
            }
        })
    }
}

fn compile(pattern: &str) -> Result<Option<Rule>, PackageError> {
    let dir_only = pattern.ends_with('/');
    let trimmed = pattern.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }

    let (glob, target) = if let Some(anchored) = trimmed.strip_prefix('/') {
        (anchored.to_string(), Target::Path)
    } else if trimmed.contains('/') {
        (format!("**/{trimmed}"), Target::Path)
    } else {
        (trimmed.to_string(), Target::Name)
    };

    let matcher = GlobBuilder::new(&glob)
        .literal_separator(true)
        .build()
        .map_err(|source| PackageError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    Ok(Some(Rule {
        matcher,
        target,
        dir_only,
    }))
}
