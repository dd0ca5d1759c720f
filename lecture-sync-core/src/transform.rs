//! Rewrites lecture markdown so it runs under a WASM notebook kernel.
//!
//! Two independent line rules are applied:
//!
//! 1. Shell-style installs (`!pip install ...`) become notebook magics
//!    (`%pip install ...`) and lose any `--upgrade` flag, which the in-browser
//!    installer does not understand. Every other `!` on such a line is dropped
//!    as well.
//! 2. Paired MyST directive fences (`{solution-start}`/`{solution-end}` and
//!    `{exercise-start}`/`{exercise-end}`) are collapsed to the plain
//!    `{solution}` / `{exercise}` directives.
//!
//! Both rules are plain substring rewrites whose output never matches their
//! input pattern again, so transforming twice is the same as transforming
//! once.

use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::TransformIoError;

const SHELL_MARKER: char = '!';
const SHELL_PIP: &str = "!pip";
const MAGIC_PIP: &str = "%pip";
const INSTALL: &str = "install";
const UPGRADE_FLAG: &str = "--upgrade";

const DIRECTIVE_REWRITES: [(&str, &str); 4] = [
    ("```{solution-start}", "```{solution}"),
    ("```{solution-end}", "```{solution}"),
    ("```{exercise-start}", "```{exercise}"),
    ("```{exercise-end}", "```{exercise}"),
];

/// Applies both rewrite rules to a single line. The line may carry its
/// terminator; it is left untouched.
pub fn transform_line(line: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(line);

    if out.contains(SHELL_PIP) && out.contains(INSTALL) {
        out = Cow::Owned(rewrite_install(&out));
    }

    for (from, to) in DIRECTIVE_REWRITES {
        if out.contains(from) {
            out = Cow::Owned(out.replace(from, to));
        }
    }

    out
}

fn rewrite_install(line: &str) -> String {
    line.replace(SHELL_PIP, MAGIC_PIP)
        .replace(SHELL_MARKER, "")
        .replace(&format!(" {UPGRADE_FLAG}"), "")
        .replace(UPGRADE_FLAG, "")
}

/// Applies [`transform_line`] to every line of `text`, keeping line
/// terminators exactly as they were.
pub fn transform_text(text: &str) -> Cow<'_, str> {
    let mut changed = false;
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let line_out = transform_line(line);
        changed |= matches!(line_out, Cow::Owned(_));
        out.push_str(&line_out);
    }

    if changed && out != text {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}

/// Rewrites the file at `path` in place. Returns whether its content changed.
///
/// The new content goes to a temporary file in the same directory which then
/// replaces the original, so a crash leaves either the old or the new file.
pub fn transform_file(path: &Path) -> Result<bool, TransformIoError> {
    let io_err = |source: std::io::Error| TransformIoError {
        path: path.to_path_buf(),
        source,
    };

    let original = fs::read_to_string(path).map_err(io_err)?;
    let updated = match transform_text(&original) {
        Cow::Borrowed(_) => {
            debug!(path = %path.display(), "Unchanged");
            return Ok(false);
        }
        Cow::Owned(updated) => updated,
    };

    let permissions = fs::metadata(path).map_err(io_err)?.permissions();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(updated.as_bytes()).map_err(io_err)?;
    tmp.as_file().set_permissions(permissions).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!(path = %path.display(), "Rewritten");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_install_becomes_magic_without_upgrade() {
        assert_eq!(
            transform_line("!pip install --upgrade foo"),
            "%pip install foo"
        );
        assert_eq!(
            transform_line("!pip install quantecon --upgrade\n"),
            "%pip install quantecon\n"
        );
        assert_eq!(transform_line("!pip install numpy\n"), "%pip install numpy\n");
    }

    #[test]
    fn every_shell_marker_is_dropped_on_install_lines() {
        assert_eq!(
            transform_line("!pip install foo  # done!"),
            "%pip install foo  # done"
        );
    }

    #[test]
    fn pip_without_install_is_left_alone() {
        let line = "!pip list";
        assert!(matches!(transform_line(line), Cow::Borrowed(_)));
        assert_eq!(transform_line("Run pip install yourself!"), "Run pip install yourself!");
    }

    #[test]
    fn package_names_containing_pip_are_not_rewritten() {
        assert_eq!(transform_line("!pip install pipenv"), "%pip install pipenv");
    }

    #[test]
    fn directive_fences_are_collapsed() {
        assert_eq!(transform_line("```{solution-start}"), "```{solution}");
        assert_eq!(transform_line("```{solution-end}\n"), "```{solution}\n");
        assert_eq!(
            transform_line("```{exercise-start} ex1\n"),
            "```{exercise} ex1\n"
        );
        assert_eq!(transform_line("```{exercise-end}"), "```{exercise}");
        assert_eq!(transform_line("````{solution-start}"), "````{solution}");
    }

    #[test]
    fn both_rules_apply_to_the_same_line() {
        assert_eq!(
            transform_line("!pip install --upgrade x ```{exercise-end}"),
            "%pip install x ```{exercise}"
        );
    }

    #[test]
    fn unrelated_lines_pass_through() {
        for line in [
            "",
            "\n",
            "# A lecture\n",
            "import numpy as np",
            "```{code-cell} ipython3",
            "Hello world!",
            "```{solution}",
        ] {
            let out = transform_line(line);
            assert!(matches!(out, Cow::Borrowed(_)), "{line:?} was rewritten");
            assert_eq!(out, line);
        }
    }

    #[test]
    fn transform_is_idempotent() {
        for line in [
            "!pip install --upgrade foo",
            "!!pip install --upgrade --upgrade foo\n",
            "```{solution-start}",
            "```{exercise-end}\n",
            "!pip install x ```{solution-end}",
            "plain text",
        ] {
            let once = transform_line(line).into_owned();
            let twice = transform_line(&once).into_owned();
            assert_eq!(once, twice, "not idempotent for {line:?}");
        }
    }

    #[test]
    fn text_keeps_line_endings() {
        let text = "# Title\r\n!pip install --upgrade numpy\r\nbody\n```{solution-start}";
        assert_eq!(
            transform_text(text),
            "# Title\r\n%pip install numpy\r\nbody\n```{solution}"
        );
        assert!(matches!(transform_text("nothing here\n"), Cow::Borrowed(_)));
    }

    #[test]
    fn file_is_rewritten_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lecture.md");
        fs::write(&path, "# L\n!pip install --upgrade numpy\n").unwrap();

        assert!(transform_file(&path).unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# L\n%pip install numpy\n"
        );
        assert!(!transform_file(&path).unwrap());
    }

    #[test]
    fn unreadable_file_reports_its_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing.md");
        let err = transform_file(&path).unwrap_err();
        assert_eq!(err.path, path);
    }
}
