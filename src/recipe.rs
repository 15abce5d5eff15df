//! TOML patch recipes
//!
//! A recipe lists patches to run in order in a single invocation:
//!
//! ```toml
//! [[patch]]
//! kind = "remove"
//! file = "src/app/Dashboard.tsx"
//! contains = ["<th", "KDV %"]
//!
//! [[patch]]
//! kind = "splice"
//! file = "src/app/Dashboard.tsx"
//! start = 516
//! end = 781
//! payload_file = "widget_grid.tsx"
//! ```
//!
//! `replace-text` entries take `old`/`old_file` and `new`/`new_file`.
//! Relative paths resolve against the directory holding the recipe.

use crate::lines::read_payload;
use crate::matcher::MatcherSpec;
use crate::patcher::BoundaryPolicy;
use crate::processor::{Patch, resolve_path};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    #[serde(default, rename = "patch")]
    pub patches: Vec<RecipeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RecipeEntry {
    Remove {
        file: PathBuf,
        #[serde(default)]
        contains: Vec<String>,
        #[serde(default)]
        regex: Option<String>,
    },
    Splice {
        file: PathBuf,
        start: usize,
        end: usize,
        #[serde(default)]
        payload: Option<String>,
        #[serde(default)]
        payload_file: Option<PathBuf>,
        #[serde(default)]
        boundary_policy: Option<BoundaryPolicy>,
    },
    ReplaceBetween {
        file: PathBuf,
        start_marker: MatcherSpec,
        end_marker: MatcherSpec,
        #[serde(default)]
        payload: Option<String>,
        #[serde(default)]
        payload_file: Option<PathBuf>,
        #[serde(default)]
        inclusive: bool,
    },
    ReplaceText {
        file: PathBuf,
        #[serde(default)]
        old: Option<String>,
        #[serde(default)]
        old_file: Option<PathBuf>,
        #[serde(default)]
        new: Option<String>,
        #[serde(default)]
        new_file: Option<PathBuf>,
    },
}

/// Inline text or a file holding it; exactly one must be set
///
/// `field` names the recipe keys (`<field>` and `<field>_file`) in errors.
#[derive(Debug, Clone)]
pub struct PayloadSource {
    pub field: &'static str,
    pub text: Option<String>,
    pub file: Option<PathBuf>,
}

impl PayloadSource {
    pub fn new(payload: Option<String>, payload_file: Option<PathBuf>) -> Self {
        Self::named("payload", payload, payload_file)
    }

    pub fn named(field: &'static str, text: Option<String>, file: Option<PathBuf>) -> Self {
        Self { field, text, file }
    }

    pub fn resolve(&self, base: &Path) -> Result<String> {
        match (&self.text, &self.file) {
            (Some(text), None) => Ok(text.clone()),
            (None, Some(path)) => read_payload(&resolve_path(base, path)),
            (Some(_), Some(_)) => anyhow::bail!(
                "Set either '{0}' or '{0}_file', not both",
                self.field
            ),
            (None, None) => anyhow::bail!("Missing '{0}' or '{0}_file'", self.field),
        }
    }
}

impl Recipe {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse recipe")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipe: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid recipe: {}", path.display()))
    }

    /// Turn entries into patches, resolving paths and payload files against `base`
    ///
    /// `default_policy` applies to splices that do not set `boundary_policy`.
    pub fn into_patches(self, base: &Path, default_policy: BoundaryPolicy) -> Result<Vec<Patch>> {
        self.patches
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                entry
                    .into_patch(base, default_policy)
                    .with_context(|| format!("Invalid patch #{} in recipe", i + 1))
            })
            .collect()
    }
}

impl RecipeEntry {
    fn into_patch(self, base: &Path, default_policy: BoundaryPolicy) -> Result<Patch> {
        match self {
            RecipeEntry::Remove {
                file,
                contains,
                regex,
            } => {
                let guard = match (contains.is_empty(), regex) {
                    (false, None) => MatcherSpec::Contains(contains),
                    (true, Some(pattern)) => MatcherSpec::Regex(pattern),
                    (false, Some(_)) => anyhow::bail!("Set either 'contains' or 'regex', not both"),
                    (true, None) => anyhow::bail!("Missing 'contains' or 'regex'"),
                };
                Ok(Patch::remove(resolve_path(base, &file), guard))
            }
            RecipeEntry::Splice {
                file,
                start,
                end,
                payload,
                payload_file,
                boundary_policy,
            } => Ok(Patch::splice(
                resolve_path(base, &file),
                start,
                end,
                PayloadSource::new(payload, payload_file).resolve(base)?,
                boundary_policy.unwrap_or(default_policy),
            )),
            RecipeEntry::ReplaceBetween {
                file,
                start_marker,
                end_marker,
                payload,
                payload_file,
                inclusive,
            } => Ok(Patch::replace_between(
                resolve_path(base, &file),
                start_marker,
                end_marker,
                PayloadSource::new(payload, payload_file).resolve(base)?,
                inclusive,
            )),
            RecipeEntry::ReplaceText {
                file,
                old,
                old_file,
                new,
                new_file,
            } => Ok(Patch::replace_text(
                resolve_path(base, &file),
                PayloadSource::named("old", old, old_file).resolve(base)?,
                PayloadSource::named("new", new, new_file).resolve(base)?,
            )),
        }
    }
}
