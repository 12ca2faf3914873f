use super::BuildError;
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// One pattern rule: `$(TARGET_DIR)/<subdir>/%.<ext>: <prereqs>` + recipe
struct RuleTemplate {
    target_dir: &'static str,
    target_ext: &'static str,
    source_dir: &'static str,
    source_ext: &'static str,
    extra_prereq: Option<&'static str>,
    recipe: &'static str,
}

const RULES: [RuleTemplate; 5] = [
    RuleTemplate {
        target_dir: "$(MAKEDIR)",
        target_ext: "d",
        source_dir: "$(SRCDIR)",
        source_ext: "cpp",
        extra_prereq: None,
        recipe: "$(GET_DEPS)",
    },
    RuleTemplate {
        target_dir: "$(MAKEDIR)",
        target_ext: "d",
        source_dir: "$(SRCDIR)",
        source_ext: "cxx",
        extra_prereq: None,
        recipe: "$(GET_DEPS)",
    },
    RuleTemplate {
        target_dir: "$(OBJDIR)",
        target_ext: "o",
        source_dir: "$(SRCDIR)",
        source_ext: "cpp",
        extra_prereq: None,
        recipe: "$(COMPILE)",
    },
    RuleTemplate {
        target_dir: "$(OBJDIR)",
        target_ext: "o",
        source_dir: "$(SRCDIR)",
        source_ext: "cxx",
        extra_prereq: None,
        recipe: "$(COMPILE)",
    },
    RuleTemplate {
        target_dir: "$(EXEDIR)",
        target_ext: "exe",
        source_dir: "$(OBJDIR)",
        source_ext: "o",
        extra_prereq: Some("$(LIBFILE)"),
        recipe: "$(LINK)",
    },
];

/// Number of rules emitted per subdirectory
pub const RULES_PER_SUBDIR: usize = RULES.len();

/// Write the five pattern rules for every subdirectory, in set order.
pub fn write_rules<W: Write>(subdirs: &BTreeSet<PathBuf>, out: &mut W) -> io::Result<()> {
    for subdir in subdirs {
        let subdir = make_path(subdir);
        for rule in &RULES {
            write!(
                out,
                "{}/{}/%.{}: {}/{}/%.{}",
                rule.target_dir, subdir, rule.target_ext, rule.source_dir, subdir, rule.source_ext
            )?;
            if let Some(extra) = rule.extra_prereq {
                write!(out, " {}", extra)?;
            }
            write!(out, "\n\t{}\n\n", rule.recipe)?;
        }
    }
    Ok(())
}

/// Render the fragment into a string
pub fn render_rules(subdirs: &BTreeSet<PathBuf>) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_rules(subdirs, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Overwrite the fragment file at `path`.
pub fn write_fragment(path: &Path, subdirs: &BTreeSet<PathBuf>) -> Result<(), BuildError> {
    let to_err = |source| BuildError::WriteFragment {
        path: path.to_path_buf(),
        source,
    };
    let mut file = io::BufWriter::new(fs::File::create(path).map_err(to_err)?);
    write_rules(subdirs, &mut file).map_err(to_err)?;
    file.flush().map_err(to_err)?;

    info!(
        fragment = %path.display(),
        subdirs = subdirs.len(),
        "Wrote build fragment"
    );
    Ok(())
}

/// Makefiles always use forward slashes
fn make_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
