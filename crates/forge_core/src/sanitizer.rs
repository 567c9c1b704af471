//! Extraction of source code from free-form model output.
//!
//! Models are asked to answer with a single fenced code block, but they
//! regularly wrap it in prose or drop the fences altogether. The sanitizer
//! prefers the most explicit signal available:
//!
//! 1. a fenced block tagged with a source language
//! 2. any fenced block
//! 3. the first line that looks like the start of a source file
//! 4. the trimmed input as-is

use regex::Regex;

/// Language profile used to recognize source code in model output.
#[derive(Debug, Clone)]
pub struct CodeSanitizer {
    tagged_block: Option<Regex>,
    any_block: Option<Regex>,
    residual_fence: Option<Regex>,
    start_tokens: Vec<String>,
}

impl Default for CodeSanitizer {
    fn default() -> Self {
        Self::python()
    }
}

impl CodeSanitizer {
    /// Build a profile from fence tags and line-start tokens.
    pub fn new<T, S>(tags: T, start_tokens: S) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let tags: Vec<String> = tags
            .into_iter()
            .map(|t| regex::escape(t.as_ref()))
            .collect();
        let tagged_block = if tags.is_empty() {
            None
        } else {
            Regex::new(&format!(r"(?s)```(?:{})\s+(.*?)\s+```", tags.join("|"))).ok()
        };

        Self {
            tagged_block,
            any_block: Regex::new(r"(?s)```\s+(.*?)\s+```").ok(),
            residual_fence: Regex::new(r"```[A-Za-z0-9_+\-]*").ok(),
            start_tokens: start_tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Profile for Python game code.
    pub fn python() -> Self {
        Self::new(
            ["python", "python3", "py"],
            ["import ", "from ", "class ", "def ", "\"\"\"", "'''"],
        )
    }

    /// Extract the source payload from `raw`. Never fails.
    pub fn sanitize(&self, raw: &str) -> String {
        if let Some(code) = Self::capture(self.tagged_block.as_ref(), raw) {
            return code;
        }
        if let Some(code) = Self::capture(self.any_block.as_ref(), raw) {
            return code;
        }

        let lines: Vec<&str> = raw.lines().collect();
        let start = lines.iter().position(|line| {
            let trimmed = line.trim();
            self.start_tokens.iter().any(|t| trimmed.starts_with(t.as_str()))
        });
        if let Some(index) = start {
            return lines[index..].join("\n").trim().to_string();
        }

        raw.trim().to_string()
    }

    /// Remove any fence markers left in already-extracted code.
    pub fn strip_fences(&self, text: &str) -> String {
        match &self.residual_fence {
            Some(re) => re.replace_all(text, "").trim().to_string(),
            None => text.replace("```", "").trim().to_string(),
        }
    }

    /// Sanitize and strip residual fences, as applied to repair output.
    pub fn clean_repair(&self, raw: &str) -> String {
        self.strip_fences(&self.sanitize(raw))
    }

    fn capture(re: Option<&Regex>, raw: &str) -> Option<String> {
        re.and_then(|re| re.captures(raw))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    }
}

/// Sanitize with the default profile.
pub fn sanitize(raw: &str) -> String {
    CodeSanitizer::default().sanitize(raw)
}

/// Strip residual fences with the default profile.
pub fn strip_fences(text: &str) -> String {
    CodeSanitizer::default().strip_fences(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME: &str = "import arcade\n\nclass Game(arcade.Window):\n    pass";

    #[test]
    fn test_tagged_block_wins_over_prose() {
        let raw = format!(
            "Sure! Here is the game:\n\n```python\n{}\n```\n\nLet me know if you need more.",
            GAME
        );
        assert_eq!(sanitize(&raw), GAME);
    }

    #[test]
    fn test_tagged_block_preferred_over_earlier_untagged() {
        let raw = format!("```\npip install arcade\n```\nthen:\n```python\n{}\n```", GAME);
        assert_eq!(sanitize(&raw), GAME);
    }

    #[test]
    fn test_untagged_block() {
        let raw = "Fixed version:\n```\nx = 1\ny = 2\n```";
        assert_eq!(sanitize(raw), "x = 1\ny = 2");
    }

    #[test]
    fn test_line_scan_without_fences() {
        let raw = "The bug was a missing None check.\nHere is the code.\nimport arcade\nprint('ok')\n";
        assert_eq!(sanitize(raw), "import arcade\nprint('ok')");
    }

    #[test]
    fn test_docstring_start_token() {
        let raw = "Explanation first\n\"\"\"Game module.\"\"\"\nx = 1";
        assert_eq!(sanitize(raw), "\"\"\"Game module.\"\"\"\nx = 1");
    }

    #[test]
    fn test_fallback_trims_input() {
        assert_eq!(sanitize("   just prose   \n"), "just prose");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_idempotent_on_single_block_inputs() {
        let inputs = [
            format!("```python\n{}\n```", GAME),
            format!("Here you go\n```\n{}\n```\nbye", GAME),
            format!("Some words\n{}", GAME),
            "no code at all".to_string(),
        ];
        for input in inputs {
            let once = sanitize(&input);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_strip_fences_removes_residual_markers() {
        assert_eq!(strip_fences("```python\nx = 1\n```"), "x = 1");
        assert_eq!(strip_fences("x = 1"), "x = 1");
    }

    #[test]
    fn test_clean_repair_handles_unterminated_fence() {
        let sanitizer = CodeSanitizer::default();
        let raw = "```python\nimport arcade\nprint('fixed')";
        assert_eq!(sanitizer.clean_repair(raw), "import arcade\nprint('fixed')");
    }

    #[test]
    fn test_custom_profile() {
        let rust = CodeSanitizer::new(["rust", "rs"], ["use ", "fn ", "mod "]);
        let raw = "Answer:\n```rust\nfn main() {}\n```";
        assert_eq!(rust.sanitize(raw), "fn main() {}");
        assert_eq!(rust.sanitize("note\nuse std::fs;\nfn a() {}"), "use std::fs;\nfn a() {}");
    }
}
