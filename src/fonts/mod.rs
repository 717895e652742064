//! Font resolution with an ordered family fallback.
//!
//! Reports are mostly Chinese text, so CJK-capable families are preferred. Each family is looked
//! up in every font directory before moving on to the next family.

use std::env;
use std::path::{Path, PathBuf};

use genpdf::fonts::{FontData, FontFamily};
use log::{debug, warn};

use crate::error::RenderError;

/// Environment variable naming the first font directory to search.
pub const FONTS_DIR_ENV: &str = "REPORT_FONTS_DIR";

/// One font family and the file names it may be installed under.
struct FamilyCandidate {
    name: &'static str,
    regular: &'static [&'static str],
    /// Empty when the family ships without a bold face; the regular face is used instead.
    bold: &'static [&'static str],
}

const FAMILY_CANDIDATES: &[FamilyCandidate] = &[
    FamilyCandidate {
        name: "NotoSansSC",
        regular: &["NotoSansSC-Regular.ttf", "NotoSansSC-Regular.otf"],
        bold: &["NotoSansSC-Bold.ttf", "NotoSansSC-Bold.otf"],
    },
    FamilyCandidate {
        name: "SimHei",
        regular: &["SimHei.ttf", "simhei.ttf"],
        bold: &[],
    },
    FamilyCandidate {
        name: "Roboto",
        regular: &["Roboto-Regular.ttf"],
        bold: &["Roboto-Bold.ttf"],
    },
];

/// Font family chosen for a document.
#[derive(Clone, Debug)]
pub struct ResolvedFonts {
    pub name: &'static str,
    pub directory: PathBuf,
    pub family: FontFamily<FontData>,
}

/// Ordered list of directories searched for font files.
#[derive(Clone, Debug)]
pub struct FontResolver {
    directories: Vec<PathBuf>,
}

impl Default for FontResolver {
    /// Searches the directory named by [`FONTS_DIR_ENV`], then the bundled locations.
    fn default() -> Self {
        Self::new(env_path(FONTS_DIR_ENV))
    }
}

impl FontResolver {
    /// Searches `preferred` first, then `assets/fonts` next to the executable and in the crate.
    pub fn new(preferred: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut directories = Vec::new();
        let bundled = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("assets/fonts")))
            .into_iter()
            .chain([PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts")]);

        for candidate in preferred.into_iter().chain(bundled) {
            if !candidate.as_os_str().is_empty() && !directories.contains(&candidate) {
                directories.push(candidate);
            }
        }
        Self { directories }
    }

    /// Searches exactly the given directories.
    pub fn with_directories(directories: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            directories: directories.into_iter().collect(),
        }
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Loads the first family whose regular face exists in any search directory.
    pub fn resolve(&self) -> Result<ResolvedFonts, RenderError> {
        let mut attempts = Vec::new();

        for candidate in FAMILY_CANDIDATES {
            for directory in &self.directories {
                match load_family(candidate, directory) {
                    Ok(family) => {
                        if !attempts.is_empty() {
                            warn!(
                                "Preferred fonts unavailable ({}); using '{}' from {}",
                                attempts.join(", "),
                                candidate.name,
                                directory.display()
                            );
                        }
                        debug!(
                            "Resolved font family '{}' in {}",
                            candidate.name,
                            directory.display()
                        );
                        return Ok(ResolvedFonts {
                            name: candidate.name,
                            directory: directory.clone(),
                            family,
                        });
                    }
                    Err(reason) => attempts.push(format!(
                        "{} in {} ({reason})",
                        candidate.name,
                        directory.display()
                    )),
                }
            }
        }

        let attempts = if attempts.is_empty() {
            "no search paths were available".to_owned()
        } else {
            attempts.join(", ")
        };
        Err(RenderError::FontUnavailable { attempts })
    }

    /// Indicates whether any candidate family can be loaded.
    pub fn fonts_available(&self) -> bool {
        self.resolve().is_ok()
    }
}

fn find_file(directory: &Path, names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| directory.join(name))
        .find(|path| path.is_file())
}

fn load_face(path: &Path) -> Result<FontData, String> {
    FontData::load(path, None).map_err(|err| format!("failed to load {}: {err}", path.display()))
}

fn load_family(
    candidate: &FamilyCandidate,
    directory: &Path,
) -> Result<FontFamily<FontData>, String> {
    if !directory.is_dir() {
        return Err("directory missing".to_owned());
    }
    let regular_path = find_file(directory, candidate.regular)
        .ok_or_else(|| format!("missing files [{}]", candidate.regular.join(", ")))?;
    let regular = load_face(&regular_path)?;
    let bold = match find_file(directory, candidate.bold) {
        Some(path) => load_face(&path)?,
        None => regular.clone(),
    };

    Ok(FontFamily {
        regular: regular.clone(),
        bold: bold.clone(),
        italic: regular,
        bold_italic: bold,
    })
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_directories_come_first_without_duplicates() {
        let custom = PathBuf::from("/opt/report-fonts");
        let resolver = FontResolver::new([custom.clone(), custom.clone(), PathBuf::new()]);
        assert_eq!(resolver.directories()[0], custom);
        assert_eq!(
            resolver.directories().iter().filter(|dir| **dir == custom).count(),
            1
        );
        assert!(resolver
            .directories()
            .iter()
            .any(|dir| dir.ends_with("assets/fonts")));
    }

    #[test]
    fn reports_every_attempt_when_nothing_resolves() {
        let resolver = FontResolver::with_directories([PathBuf::from("/nonexistent/fonts")]);
        let Err(RenderError::FontUnavailable { attempts }) = resolver.resolve() else {
            panic!("expected FontUnavailable");
        };
        for family in ["NotoSansSC", "SimHei", "Roboto"] {
            assert!(attempts.contains(family), "{attempts}");
        }
        assert!(!resolver.fonts_available());
    }

    #[test]
    fn empty_search_path_is_reported() {
        let resolver = FontResolver::with_directories(Vec::new());
        let Err(RenderError::FontUnavailable { attempts }) = resolver.resolve() else {
            panic!("expected FontUnavailable");
        };
        assert_eq!(attempts, "no search paths were available");
    }
}
