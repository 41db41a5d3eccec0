/// Output verification: byte-for-byte comparison with the expected answer
use crate::config::types::{HarnessError, Result};
use std::fmt::Write as _;
use std::path::Path;

/// Differing lines listed in a diff artifact before it is cut short
pub const MAX_REPORTED_LINES: usize = 64;

fn read_artifact(path: &Path, role: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        HarnessError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read {} {}: {}", role, path.display(), e),
        ))
    })
}

/// Compare `produced` with `expected`, writing the discrepancy listing to
/// `diff_artifact` (empty when they match). Returns whether they match.
pub fn verify(produced: &Path, expected: &Path, diff_artifact: &Path) -> Result<bool> {
    let expected_bytes = read_artifact(expected, "expected answer")?;
    let produced_bytes = read_artifact(produced, "produced output")?;

    let matched = produced_bytes == expected_bytes;
    let listing = if matched {
        String::new()
    } else {
        render_diff(&expected_bytes, &produced_bytes)
    };

    std::fs::write(diff_artifact, listing).map_err(|e| {
        HarnessError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write diff {}: {}", diff_artifact.display(), e),
        ))
    })?;

    Ok(matched)
}

fn push_line(out: &mut String, marker: char, line: &[u8]) {
    let (body, terminated) = match line.strip_suffix(b"\n") {
        Some(body) => (body, true),
        None => (line, false),
    };
    let _ = writeln!(out, "{}{}", marker, String::from_utf8_lossy(body));
    if !terminated {
        out.push_str("\\ No newline at end of file\n");
    }
}

/// Line-aligned listing of the lines that differ, `-` expected / `+` actual
pub fn render_diff(expected: &[u8], actual: &[u8]) -> String {
    let expected_lines: Vec<&[u8]> = expected.split_inclusive(|&b| b == b'\n').collect();
    let actual_lines: Vec<&[u8]> = actual.split_inclusive(|&b| b == b'\n').collect();
    let total = expected_lines.len().max(actual_lines.len());

    let mut out = String::from("--- expected\n+++ actual\n");
    let mut reported = 0;
    let mut differing = 0;

    for index in 0..total {
        let want = expected_lines.get(index);
        let got = actual_lines.get(index);
        if want == got {
            continue;
        }
        differing += 1;
        if reported == MAX_REPORTED_LINES {
            continue;
        }
        reported += 1;

        let _ = writeln!(out, "@@ line {} @@", index + 1);
        if let Some(line) = want {
            push_line(&mut out, '-', line);
        }
        if let Some(line) = got {
            push_line(&mut out, '+', line);
        }
    }

    if differing > reported {
        let _ = writeln!(out, "... {} more differing lines", differing - reported);
    }
    let _ = writeln!(
        out,
        "expected {} bytes, got {} bytes",
        expected.len(),
        actual.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ojtest-verify-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_identical_output_matches_with_empty_diff() {
        let dir = scratch_dir();
        std::fs::write(dir.join("a"), b"1 2 3\n").unwrap();
        std::fs::write(dir.join("b"), b"1 2 3\n").unwrap();

        assert!(verify(&dir.join("a"), &dir.join("b"), &dir.join("d")).unwrap());
        assert_eq!(std::fs::read(dir.join("d")).unwrap(), b"");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_trailing_newline_is_significant() {
        let dir = scratch_dir();
        std::fs::write(dir.join("out"), b"42").unwrap();
        std::fs::write(dir.join("ans"), b"42\n").unwrap();

        assert!(!verify(&dir.join("out"), &dir.join("ans"), &dir.join("d")).unwrap());
        let diff = std::fs::read_to_string(dir.join("d")).unwrap();
        assert!(diff.contains("\\ No newline at end of file"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_diff_lists_differing_lines() {
        let diff = render_diff(b"a\nb\nc\n", b"a\nx\nc\nd\n");
        assert!(diff.contains("@@ line 2 @@\n-b\n+x\n"));
        assert!(diff.contains("@@ line 4 @@\n+d\n"));
        assert!(!diff.contains("line 1 @@"));
        assert!(diff.ends_with("expected 6 bytes, got 8 bytes\n"));
    }

    #[test]
    fn test_diff_is_bounded() {
        let expected = "x\n".repeat(MAX_REPORTED_LINES + 10);
        let actual = "y\n".repeat(MAX_REPORTED_LINES + 10);
        let diff = render_diff(expected.as_bytes(), actual.as_bytes());
        assert_eq!(diff.matches("@@ line").count(), MAX_REPORTED_LINES);
        assert!(diff.contains("... 10 more differing lines"));
    }

    #[test]
    fn test_missing_expected_answer_is_an_error() {
        let dir = scratch_dir();
        std::fs::write(dir.join("out"), b"").unwrap();
        assert!(verify(&dir.join("out"), &dir.join("absent"), &dir.join("d")).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
