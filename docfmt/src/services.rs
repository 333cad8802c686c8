//! Rule-based formatting and cleanup services backing the CLI.
//!
//! Both read their rules from the configuration the pipeline resolved and attached to
//! the document snapshot, so a project layer changing `formatting.indent_size` reaches
//! the services through the command.

use async_trait::async_trait;
use docfmt_core::contract::{CleanupService, FormattingService, ServiceError};
use docfmt_core::diff::LineDiffService;
use docfmt_core::document::{
    FORMATTING_INDENT_SIZE, FORMATTING_INSERT_FINAL_NEWLINE, FORMATTING_TRIM_TRAILING_WHITESPACE,
    FORMATTING_USE_TABS,
};
use docfmt_core::{Configuration, Document, TextChange, TextSpan};
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_INDENT_SIZE: usize = 4;

/// Layout rules read from a resolved [`Configuration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingRules {
    pub indent_size: usize,
    pub use_tabs: bool,
    pub trim_trailing_whitespace: bool,
    pub insert_final_newline: bool,
}

impl Default for FormattingRules {
    fn default() -> Self {
        Self {
            indent_size: DEFAULT_INDENT_SIZE,
            use_tabs: false,
            trim_trailing_whitespace: true,
            insert_final_newline: true,
        }
    }
}

impl FormattingRules {
    pub fn from_configuration(config: &Configuration) -> Self {
        let defaults = Self::default();
        Self {
            indent_size: config
                .get_u64(FORMATTING_INDENT_SIZE)
                .and_then(|size| usize::try_from(size).ok())
                .filter(|size| *size > 0)
                .unwrap_or(defaults.indent_size),
            use_tabs: config
                .get_bool(FORMATTING_USE_TABS)
                .unwrap_or(defaults.use_tabs),
            trim_trailing_whitespace: config
                .get_bool(FORMATTING_TRIM_TRAILING_WHITESPACE)
                .unwrap_or(defaults.trim_trailing_whitespace),
            insert_final_newline: config
                .get_bool(FORMATTING_INSERT_FINAL_NEWLINE)
                .unwrap_or(defaults.insert_final_newline),
        }
    }
}

/// Compiled line patterns shared by both services.
#[derive(Debug, Clone)]
struct LinePatterns {
    indent: Regex,
    trailing: Regex,
    import: Regex,
}

impl LinePatterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            indent: Regex::new(r"^[ \t]+")?,
            trailing: Regex::new(r"[ \t]+$")?,
            import: Regex::new(r"^[ \t]*(?:use |import |#include )")?,
        })
    }

    /// Applies `rules` to every line of `text`, keeping line endings.
    fn format(&self, rules: &FormattingRules, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for line in text.split_inclusive('\n') {
            let (body, ending) = split_line_ending(line);
            let body = self.reindent(rules, body);
            let body = if rules.trim_trailing_whitespace {
                self.trailing.replace(&body, "").into_owned()
            } else {
                body
            };
            out.push_str(&body);
            out.push_str(ending);
        }
        if rules.insert_final_newline && !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    fn reindent(&self, rules: &FormattingRules, line: &str) -> String {
        let Some(found) = self.indent.find(line) else {
            return line.to_string();
        };
        let width: usize = found
            .as_str()
            .chars()
            .map(|c| if c == '\t' { rules.indent_size } else { 1 })
            .sum();
        let indent = if rules.use_tabs {
            let mut indent = "\t".repeat(width / rules.indent_size);
            indent.push_str(&" ".repeat(width % rules.indent_size));
            indent
        } else {
            " ".repeat(width)
        };
        format!("{indent}{}", &line[found.end()..])
    }

    fn is_import(&self, line: &str) -> bool {
        // multi-line `use a::{` blocks are left alone
        self.import.is_match(line) && (!line.contains('{') || line.contains('}'))
    }

    /// Sorts and de-duplicates each contiguous run of single-line imports.
    fn organise_imports(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut run: Vec<&str> = Vec::new();
        for line in text.split_inclusive('\n') {
            if self.is_import(line) && line.ends_with('\n') {
                run.push(line);
                continue;
            }
            flush_imports(&mut run, &mut out);
            out.push_str(line);
        }
        flush_imports(&mut run, &mut out);
        out
    }
}

fn flush_imports(run: &mut Vec<&str>, out: &mut String) {
    run.sort_by(|a, b| a.trim().cmp(b.trim()));
    run.dedup_by(|a, b| a.trim() == b.trim());
    for line in run.drain(..) {
        out.push_str(line);
    }
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// [`FormattingService`] normalising indentation, trailing whitespace and the final newline.
#[derive(Clone)]
pub struct RuleFormatter {
    patterns: LinePatterns,
    differ: LineDiffService,
}

impl RuleFormatter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: LinePatterns::new()?,
            differ: LineDiffService::default(),
        })
    }

    pub fn rules_for(&self, document: &Document) -> FormattingRules {
        FormattingRules::from_configuration(&document.configuration)
    }

    pub fn format_text(&self, document: &Document) -> String {
        self.patterns.format(&self.rules_for(document), document.text())
    }
}

#[async_trait]
impl FormattingService for RuleFormatter {
    async fn format_span(
        &self,
        document: &Document,
        selection: Option<TextSpan>,
        token: CancellationToken,
    ) -> Result<Vec<TextChange>, ServiceError> {
        if token.is_cancelled() {
            return Err("formatting cancelled".into());
        }
        let formatted = self.format_text(document);
        let mut changes = self.differ.line_changes(document.text(), &formatted);
        if let Some(selection) = selection {
            changes.retain(|change| selection.contains_span(&change.span));
        }
        debug!(
            document = %document.id,
            changes = changes.len(),
            "[CHANGES] Rule formatter finished"
        );
        Ok(changes)
    }
}

/// [`CleanupService`] organising import runs, then formatting like [`RuleFormatter`].
#[derive(Clone)]
pub struct RuleCleanup {
    formatter: RuleFormatter,
}

impl RuleCleanup {
    pub fn new(formatter: RuleFormatter) -> Self {
        Self { formatter }
    }
}

#[async_trait]
impl CleanupService for RuleCleanup {
    async fn cleanup_and_format(
        &self,
        document: &Document,
        token: CancellationToken,
    ) -> Result<Document, ServiceError> {
        if token.is_cancelled() {
            return Err("cleanup cancelled".into());
        }
        let patterns = &self.formatter.patterns;
        let organised = patterns.organise_imports(document.text());
        let cleaned = patterns.format(&self.formatter.rules_for(document), &organised);
        Ok(document.with_text(cleaned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfmt_core::document::DocumentId;
    use docfmt_core::text::apply_changes;

    fn formatter() -> RuleFormatter {
        RuleFormatter::new().unwrap()
    }

    fn doc(text: &str) -> Document {
        Document::new(DocumentId::new(), "app", "rust".into(), text, 1)
    }

    fn doc_with(text: &str, configuration: Configuration) -> Document {
        doc(text).with_configuration(configuration)
    }

    #[tokio::test]
    async fn formats_indent_trailing_whitespace_and_final_newline() {
        let formatter = formatter();
        let document = doc_with(
            "fn main() {\n\tlet x = 1;   \n}",
            Configuration::new().with(FORMATTING_INDENT_SIZE, 2),
        );

        let changes = formatter
            .format_span(&document, None, CancellationToken::new())
            .await
            .unwrap();
        let formatted = apply_changes(document.text(), &changes).unwrap();
        assert_eq!(formatted, "fn main() {\n  let x = 1;\n}\n");
    }

    #[tokio::test]
    async fn converts_spaces_to_tabs_when_asked() {
        let document = doc_with(
            "a\n        b\n      c\n",
            Configuration::new()
                .with(FORMATTING_USE_TABS, true)
                .with(FORMATTING_INDENT_SIZE, 4),
        );
        assert_eq!(formatter().format_text(&document), "a\n\t\tb\n\t  c\n");
    }

    #[tokio::test]
    async fn selection_keeps_only_edits_inside_it() {
        let formatter = formatter();
        let document = doc("a  \nb\nc  \n");

        let changes = formatter
            .format_span(&document, Some(TextSpan::new(0, 4)), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(changes, vec![TextChange::new(TextSpan::new(0, 4), "a\n")]);
    }

    #[test]
    fn rules_follow_the_configuration_attached_to_the_snapshot() {
        let formatter = formatter();
        let plain = doc("a\n\tb\n");
        let narrow = plain.with_configuration(Configuration::new().with(FORMATTING_INDENT_SIZE, 2));

        assert_eq!(formatter.rules_for(&plain), FormattingRules::default());
        assert_eq!(formatter.format_text(&plain), "a\n    b\n");
        assert_eq!(formatter.format_text(&narrow), "a\n  b\n");
    }

    #[test]
    fn rules_fall_back_to_defaults_for_bad_values() {
        let rules = FormattingRules::from_configuration(
            &Configuration::new()
                .with(FORMATTING_INDENT_SIZE, 0)
                .with(FORMATTING_USE_TABS, "yes"),
        );
        assert_eq!(rules, FormattingRules::default());
    }

    #[tokio::test]
    async fn cleanup_sorts_and_dedups_import_runs() {
        let cleanup = RuleCleanup::new(formatter());
        let document = doc("use b;\nuse a;\nuse b;\n\nuse std::{\n    io,\n};\nfn f() {}  \n");

        let cleaned = cleanup
            .cleanup_and_format(&document, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(cleaned.id, document.id);
        assert_eq!(cleaned.version, document.version);
        assert_eq!(
            cleaned.text(),
            "use a;\nuse b;\n\nuse std::{\n    io,\n};\nfn f() {}\n"
        );
    }

    #[tokio::test]
    async fn cancelled_token_fails_fast() {
        let token = CancellationToken::new();
        token.cancel();
        let result = formatter()
            .format_span(&doc("x"), None, token)
            .await;
        assert!(result.is_err());
    }
}
