//! Dangerous-function heuristic.
//!
//! A single case-insensitive alternation over call sites commonly abused by
//! web shells: code evaluation, shell execution, decode-and-run chains and
//! file disclosure primitives. Independent of the fingerprint database.

use crate::core::types::SuspiciousLine;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// Constructs that need more than a bare name to match.
const EXECUTION_CONSTRUCTS: &[&str] = &[
    // preg_replace with the /e (evaluate) modifier
    r"preg_replace.*/e",
    // backtick shell execution with variable interpolation
    r"`.*?\$.*?`",
];

/// Function names matched as whole words.
const DANGEROUS_FUNCTIONS: &[&str] = &[
    "passthru",
    "shell_exec",
    "exec",
    "base64_decode",
    "eval",
    "system",
    "proc_open",
    "popen",
    "curl_exec",
    "curl_multi_exec",
    "parse_ini_file",
    "show_source",
];

static HEURISTIC_RE: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = EXECUTION_CONSTRUCTS
        .iter()
        .map(|c| c.to_string())
        .chain(DANGEROUS_FUNCTIONS.iter().map(|f| format!(r"\b{}\b", f)))
        .collect();
    // Byte mode so `.` spans any byte and `\b` is ASCII-only.
    Regex::new(&format!("(?si-u)({})", alternatives.join("|"))).expect("valid heuristic regex")
});

/// Matcher for dangerous-function call sites.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMatcher;

impl HeuristicMatcher {
    /// Create a new matcher.
    pub fn new() -> Self {
        Self
    }

    /// Quick check for any match.
    pub fn has_match(&self, content: &[u8]) -> bool {
        HEURISTIC_RE.is_match(content)
    }

    /// All non-overlapping matches in `content`, in order.
    pub fn find_all(&self, content: &[u8]) -> Vec<String> {
        HEURISTIC_RE
            .find_iter(content)
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
            .collect()
    }

    /// Matches grouped by line.
    ///
    /// Lines without a match are skipped, and the reported `line` is a
    /// counter over matching lines only: the first matching line is 1, the
    /// second is 2, whatever their physical position in the file.
    pub fn find_by_line(&self, content: &[u8]) -> Vec<SuspiciousLine> {
        let mut counter = 1;
        let mut lines = Vec::new();

        for line in content.split(|&b| b == b'\n') {
            let func = self.find_all(line);
            if func.is_empty() {
                continue;
            }
            lines.push(SuspiciousLine {
                line: counter,
                func,
            });
            counter += 1;
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_tokens() {
        let matcher = HeuristicMatcher::new();
        let found = matcher.find_all(b"<?php eval(base64_decode($_POST['c'])); system('id'); ?>");
        assert_eq!(found, vec!["eval", "base64_decode", "system"]);
    }

    #[test]
    fn test_case_insensitive() {
        let matcher = HeuristicMatcher::new();
        assert_eq!(matcher.find_all(b"EVAL($x); Shell_Exec($y);"), vec!["EVAL", "Shell_Exec"]);
    }

    #[test]
    fn test_word_boundaries() {
        let matcher = HeuristicMatcher::new();
        assert!(matcher.find_all(b"evaluate(); my_system(); execute();").is_empty());
        assert!(!matcher.has_match(b"ecosystem"));
        assert_eq!(matcher.find_all(b"curl_multi_exec($mh)"), vec!["curl_multi_exec"]);
    }

    #[test]
    fn test_backtick_execution() {
        let matcher = HeuristicMatcher::new();
        assert_eq!(matcher.find_all(b"$out = `ls $dir`;"), vec!["`ls $dir`"]);
        // Backticks without a variable are not flagged.
        assert!(matcher.find_all(b"$md = `plain`;").is_empty());
    }

    #[test]
    fn test_preg_replace_eval_modifier() {
        let matcher = HeuristicMatcher::new();
        let found = matcher.find_all(b"preg_replace('/.*/e', $_GET['x'], '');");
        assert_eq!(found, vec!["preg_replace('/.*/e"]);
    }

    #[test]
    fn test_binary_content() {
        let matcher = HeuristicMatcher::new();
        let mut content = vec![0xff, 0xfe, b' '];
        content.extend_from_slice(b"passthru($c)");
        content.push(0x80);
        assert_eq!(matcher.find_all(&content), vec!["passthru"]);
    }

    #[test]
    fn test_clean_content() {
        let matcher = HeuristicMatcher::new();
        assert!(matcher.find_all(b"<html><body>Hello</body></html>").is_empty());
        assert!(matcher.find_by_line(b"one\ntwo\nthree").is_empty());
    }

    #[test]
    fn test_line_counter_counts_matching_lines() {
        let matcher = HeuristicMatcher::new();

        let lines = matcher.find_by_line(b"harmless\neval($x);\nharmless");
        assert_eq!(
            lines,
            vec![SuspiciousLine {
                line: 1,
                func: vec!["eval".to_string()],
            }]
        );

        let lines = matcher.find_by_line(b"system($a);\n\n\n\nexec($b); popen($c);\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, 1);
        assert_eq!(lines[1].line, 2);
        assert_eq!(lines[1].func, vec!["exec", "popen"]);
    }
}
