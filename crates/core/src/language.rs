//! Best-effort source language detection for `<pre><code>` blocks.
//!
//! [`GrammarDetector`] tries a fixed, ordered set of token grammars and
//! reports the first one that splits the code into more than one token. Plain
//! text matches nothing and stays a single token, so it is never tagged.
//! The heuristic is crude: most snippets with punctuation come out as the
//! first grammar in the list.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Result, SiphonError};

/// Detects the language of a code snippet.
pub trait LanguageDetector: Send + Sync {
    /// Returns the grammar name, `None` when nothing matched.
    ///
    /// # Errors
    ///
    /// [`SiphonError::LanguageDetection`] when the detector cannot run at all.
    fn detect(&self, code: &str) -> Result<Option<&'static str>>;
}

/// Never tags anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDetector;

impl LanguageDetector for NoopDetector {
    fn detect(&self, _code: &str) -> Result<Option<&'static str>> {
        Ok(None)
    }
}

/// Token grammar for one language
#[derive(Debug)]
pub struct Grammar {
    name: &'static str,
    pattern: Regex,
}

impl Grammar {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of tokens: grammar matches plus the plain runs between them
    pub fn token_count(&self, code: &str) -> usize {
        let mut count = 0;
        let mut last = 0;

        for m in self.pattern.find_iter(code) {
            if m.is_empty() {
                continue;
            }
            if m.start() > last {
                count += 1;
            }
            count += 1;
            last = m.end();
        }

        if last < code.len() {
            count += 1;
        }

        count
    }
}

struct GrammarSource {
    name: &'static str,
    keywords: &'static [&'static str],
    rules: &'static [&'static str],
}

const C_COMMENTS: &str = r"//[^\n]*|/\*[\s\S]*?\*/";
const HASH_COMMENT: &str = r"#[^\n]*";
const DOUBLE_QUOTED: &str = r#""(?:\\.|[^"\\\n])*""#;
const SINGLE_QUOTED: &str = r"'(?:\\.|[^'\\\n])*'";
const NUMBER: &str = r"\b0x[0-9a-fA-F]+\b|\b\d+(?:\.\d+)?\b";
const PUNCTUATION: &str = r"[{}()\[\];,.]";
const OPERATORS: &str = r"[-+*/%=!<>&|^~?:]+";

/// Tried in this order; the first grammar producing several tokens wins
const SOURCES: &[GrammarSource] = &[
    GrammarSource {
        name: "javascript",
        keywords: &[
            "var", "let", "const", "function", "return", "if", "else", "for", "while", "class", "new", "import",
            "export", "async", "await", "this", "typeof", "null", "undefined", "true", "false",
        ],
        rules: &[C_COMMENTS, DOUBLE_QUOTED, SINGLE_QUOTED, r"`[^`]*`", "=>", NUMBER, PUNCTUATION, OPERATORS],
    },
    GrammarSource {
        name: "typescript",
        keywords: &[
            "interface", "type", "enum", "implements", "readonly", "declare", "namespace", "keyof", "string",
            "number", "boolean", "any", "unknown", "never",
        ],
        rules: &[C_COMMENTS, DOUBLE_QUOTED, SINGLE_QUOTED, r":\s*[A-Z]\w*", NUMBER, PUNCTUATION, OPERATORS],
    },
    GrammarSource {
        name: "python",
        keywords: &[
            "def", "class", "import", "from", "as", "return", "if", "elif", "else", "for", "while", "in", "not",
            "and", "or", "lambda", "with", "yield", "None", "True", "False", "self", "pass",
        ],
        rules: &[HASH_COMMENT, r#""""[\s\S]*?""""#, DOUBLE_QUOTED, SINGLE_QUOTED, r"@\w+", NUMBER, PUNCTUATION],
    },
    GrammarSource {
        name: "java",
        keywords: &[
            "public", "private", "protected", "static", "final", "void", "class", "interface", "extends",
            "implements", "new", "return", "package", "import", "throws", "int", "boolean",
        ],
        rules: &[C_COMMENTS, DOUBLE_QUOTED, r"@\w+", NUMBER, PUNCTUATION, OPERATORS],
    },
    GrammarSource {
        name: "cpp",
        keywords: &[
            "int", "char", "void", "struct", "class", "namespace", "template", "typename", "const", "auto",
            "return", "std", "nullptr", "virtual",
        ],
        rules: &[C_COMMENTS, r"(?m)^\s*#\s*\w+[^\n]*", DOUBLE_QUOTED, "::", NUMBER, PUNCTUATION, OPERATORS],
    },
    GrammarSource {
        name: "csharp",
        keywords: &[
            "using", "namespace", "public", "private", "class", "void", "var", "string", "async", "await",
            "return", "new", "get", "set",
        ],
        rules: &[C_COMMENTS, r#"@?"(?:\\.|[^"\\\n])*""#, r"\[\w+\]", NUMBER, PUNCTUATION, OPERATORS],
    },
    GrammarSource {
        name: "go",
        keywords: &[
            "package", "import", "func", "var", "const", "type", "struct", "interface", "map", "chan", "go",
            "defer", "return", "range", "nil",
        ],
        rules: &[C_COMMENTS, DOUBLE_QUOTED, r"`[^`]*`", ":=", NUMBER, PUNCTUATION, OPERATORS],
    },
    GrammarSource {
        name: "rust",
        keywords: &[
            "fn", "let", "mut", "pub", "struct", "enum", "impl", "trait", "use", "mod", "match", "return", "self",
            "Self", "where",
        ],
        rules: &[C_COMMENTS, DOUBLE_QUOTED, r"\b\w+!", "'[a-z]+\\b", "::", NUMBER, PUNCTUATION, OPERATORS],
    },
    GrammarSource {
        name: "php",
        keywords: &["function", "echo", "return", "class", "public", "private", "new", "array", "foreach", "as"],
        rules: &[r"<\?php|\?>", C_COMMENTS, HASH_COMMENT, r"\$\w+", DOUBLE_QUOTED, SINGLE_QUOTED, "->", PUNCTUATION],
    },
    GrammarSource {
        name: "ruby",
        keywords: &[
            "def", "end", "class", "module", "require", "do", "if", "unless", "elsif", "yield", "nil", "puts",
            "attr_accessor",
        ],
        rules: &[HASH_COMMENT, r":\w+", r"@{1,2}\w+", DOUBLE_QUOTED, SINGLE_QUOTED, NUMBER, PUNCTUATION],
    },
    GrammarSource {
        name: "markdown",
        keywords: &[],
        rules: &[
            r"(?m)^#{1,6}\s[^\n]*",
            r"(?m)^\s*(?:[-*+]|\d+\.)\s",
            r"(?m)^>\s?",
            r"\*\*[^*\n]+\*\*",
            r"`[^`\n]+`",
            r"\[[^\]\n]*\]\([^)\n]*\)",
        ],
    },
    GrammarSource {
        name: "bash",
        keywords: &[
            "if", "then", "else", "fi", "for", "do", "done", "case", "esac", "echo", "export", "function", "local",
            "sudo", "cd",
        ],
        rules: &[HASH_COMMENT, r"\$\{[^}]*\}|\$\w+", DOUBLE_QUOTED, SINGLE_QUOTED, r"\|\||&&|[|;<>]", r"\s--?\w[\w-]*"],
    },
];

fn compile(source: &GrammarSource) -> std::result::Result<Grammar, String> {
    let mut alternatives: Vec<String> = source.rules.iter().map(|r| format!("(?:{r})")).collect();
    if !source.keywords.is_empty() {
        alternatives.push(format!(r"\b(?:{})\b", source.keywords.join("|")));
    }

    Regex::new(&alternatives.join("|"))
        .map(|pattern| Grammar { name: source.name, pattern })
        .map_err(|e| format!("grammar {}: {e}", source.name))
}

static GRAMMARS: LazyLock<std::result::Result<Vec<Grammar>, String>> =
    LazyLock::new(|| SOURCES.iter().map(compile).collect());

/// Regex-grammar detector over the built-in language set.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarDetector;

impl GrammarDetector {
    pub fn new() -> Self {
        Self
    }

    /// Loaded grammars, in detection order.
    ///
    /// # Errors
    ///
    /// [`SiphonError::LanguageDetection`] if any grammar failed to compile.
    pub fn grammars(&self) -> Result<&'static [Grammar]> {
        GRAMMARS.as_deref().map_err(|e| SiphonError::LanguageDetection(e.clone()))
    }
}

impl LanguageDetector for GrammarDetector {
    fn detect(&self, code: &str) -> Result<Option<&'static str>> {
        let grammars = self.grammars()?;
        Ok(grammars.iter().find(|g| g.token_count(code) > 1).map(Grammar::name))
    }
}
