use crate::checklist::Checklist;
use crate::ports::TreeView;
use crate::project::ConfigurationView;
use regex::Regex;
use std::sync::OnceLock;
use subcheck_types::check::check_ids;

const DEPTH: u8 = 2;

fn using_namespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|;)\s*using\s+namespace\s+\w").expect("valid regex"))
}

/// Lexer state carried from one line to the next.
#[derive(Debug, Default)]
struct Scanner {
    depth: usize,
    in_block_comment: bool,
}

impl Scanner {
    /// The parts of `line` that sit at file scope, with comments and literals
    /// removed. Braces become `;` so each block boundary starts a new statement.
    fn file_scope_code(&mut self, line: &str) -> String {
        let mut out = String::new();
        let mut chars = line.chars().peekable();
        let mut quote: Option<char> = None;
        let mut prev = ' ';
        while let Some(c) = chars.next() {
            if self.in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                    out.push(' ');
                }
                continue;
            }
            if let Some(q) = quote {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                '"' => quote = Some(c),
                // `1'000` is a digit separator, not a character literal.
                '\''
                    if !(prev.is_ascii_digit()
                        && chars.peek().is_some_and(|n| n.is_ascii_digit())) =>
                {
                    quote = Some(c)
                }
                '{' => {
                    self.depth += 1;
                    out.push(';');
                }
                '}' => {
                    self.depth = self.depth.saturating_sub(1);
                    out.push(';');
                }
                _ if self.depth == 0 => out.push(c),
                _ => {}
            }
            prev = c;
        }
        out
    }
}

/// 1-based line of the first `using namespace` directive at file scope.
///
/// Directives inside a function body or a `namespace` block only affect that
/// scope and are allowed. Comments, string literals and preprocessor lines
/// are skipped.
pub fn find_using_namespace(text: &str) -> Option<usize> {
    let mut scanner = Scanner::default();
    for (idx, line) in text.lines().enumerate() {
        if !scanner.in_block_comment && line.trim_start().starts_with('#') {
            continue;
        }
        let code = scanner.file_scope_code(line);
        if using_namespace_re().is_match(&code) {
            return Some(idx + 1);
        }
    }
    None
}

/// No header of the configuration may pull a namespace into every includer.
/// Missing headers are reported as issues.
pub(crate) fn check_headers(
    list: &mut Checklist<'_>,
    tree: &dyn TreeView,
    view: &ConfigurationView<'_>,
) -> u64 {
    let mut issues = 0;
    for header in &view.headers {
        let name = header.file_name().unwrap_or(header.as_str());

        if !tree.exists(header) {
            issues += list.fail(
                check_ids::HEADER_EXISTS,
                DEPTH,
                format!("Header {name} exists"),
                Some(format!(" - {header} could not be found")),
            );
            continue;
        }

        let text = match tree.read_to_string(header) {
            Ok(text) => text,
            Err(err) => {
                issues += list.fail(
                    check_ids::HEADER_EXISTS,
                    DEPTH,
                    format!("Header {name} exists"),
                    Some(format!(" - unreadable: {err}")),
                );
                continue;
            }
        };

        let hit = find_using_namespace(&text);
        issues += list.assert(
            check_ids::HEADER_USING_NAMESPACE,
            DEPTH,
            hit.is_none(),
            format!("No using namespace in {name}"),
            hit.map(|line| format!(" - line {line}")),
        );
    }
    issues
}
