//! Path pattern matching
//!
//! Literal, prefix, suffix and simple-glob matchers used by filter data
//! entries. The glob syntax is the platform's: `.` matches any character,
//! `x*` matches zero or more `x`, `.*` matches any run, and `\` escapes the
//! next character.

use serde::{Deserialize, Serialize};

/// How a pattern string is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Literal,
    Prefix,
    Suffix,
    SimpleGlob,
}

/// A compiled path matcher
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternMatcher {
    pub pattern: String,
    pub kind: PatternKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Atom {
    Any,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token {
    atom: Atom,
    repeated: bool,
}

impl PatternMatcher {
    pub fn new(pattern: &str, kind: PatternKind) -> Self {
        Self {
            pattern: pattern.to_string(),
            kind,
        }
    }

    pub fn literal(pattern: &str) -> Self {
        Self::new(pattern, PatternKind::Literal)
    }

    pub fn prefix(pattern: &str) -> Self {
        Self::new(pattern, PatternKind::Prefix)
    }

    pub fn suffix(pattern: &str) -> Self {
        Self::new(pattern, PatternKind::Suffix)
    }

    pub fn glob(pattern: &str) -> Self {
        Self::new(pattern, PatternKind::SimpleGlob)
    }

    /// Check `input` against this pattern
    pub fn matches(&self, input: &str) -> bool {
        match self.kind {
            PatternKind::Literal => self.pattern == input,
            PatternKind::Prefix => input.starts_with(&self.pattern),
            PatternKind::Suffix => input.ends_with(&self.pattern),
            PatternKind::SimpleGlob => {
                let tokens = tokenize(&self.pattern);
                let chars: Vec<char> = input.chars().collect();
                glob_match(&tokens, &chars)
            }
        }
    }

    /// True when the glob ends in a dangling escape
    pub fn is_malformed(&self) -> bool {
        self.kind == PatternKind::SimpleGlob && {
            let trailing = self.pattern.chars().rev().take_while(|c| *c == '\\').count();
            trailing % 2 == 1
        }
    }
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        let atom = match c {
            '\\' => match chars.next() {
                Some(escaped) => Atom::Char(escaped),
                None => Atom::Char('\\'),
            },
            '.' => Atom::Any,
            '*' => {
                match tokens.last_mut() {
                    Some(last) if !last.repeated => last.repeated = true,
                    _ => tokens.push(Token { atom: Atom::Char('*'), repeated: false }),
                }
                continue;
            }
            other => Atom::Char(other),
        };
        tokens.push(Token { atom, repeated: false });
    }
    tokens
}

fn atom_matches(atom: Atom, c: char) -> bool {
    match atom {
        Atom::Any => true,
        Atom::Char(expected) => expected == c,
    }
}

/// Single forward pass over `input`, tracking every token position still
/// alive. Cost is bounded by tokens times input length.
fn glob_match(tokens: &[Token], input: &[char]) -> bool {
    let mut alive = vec![false; tokens.len() + 1];
    alive[0] = true;
    skip_optional(tokens, &mut alive);

    for &c in input {
        let mut next = vec![false; tokens.len() + 1];
        for (index, token) in tokens.iter().enumerate() {
            if alive[index] && atom_matches(token.atom, c) {
                if token.repeated {
                    next[index] = true;
                } else {
                    next[index + 1] = true;
                }
            }
        }
        skip_optional(tokens, &mut next);
        if !next.contains(&true) {
            return false;
        }
        alive = next;
    }
    alive[tokens.len()]
}

/// A repeated token may match nothing, so reaching it reaches the next one.
fn skip_optional(tokens: &[Token], alive: &mut [bool]) {
    for (index, token) in tokens.iter().enumerate() {
        if alive[index] && token.repeated {
            alive[index + 1] = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_prefix_suffix() {
        assert!(PatternMatcher::literal("/people").matches("/people"));
        assert!(!PatternMatcher::literal("/people").matches("/people/1"));
        assert!(PatternMatcher::prefix("/people").matches("/people/1"));
        assert!(PatternMatcher::suffix(".pdf").matches("/docs/a.pdf"));
        assert!(!PatternMatcher::suffix(".pdf").matches("/docs/a.png"));
    }

    #[test]
    fn test_glob_any_run() {
        let glob = PatternMatcher::glob("/items/.*");
        assert!(glob.matches("/items/"));
        assert!(glob.matches("/items/42/detail"));
        assert!(!glob.matches("/other/42"));
    }

    #[test]
    fn test_glob_repeated_char() {
        let glob = PatternMatcher::glob("/a*b");
        assert!(glob.matches("/b"));
        assert!(glob.matches("/aaab"));
        assert!(!glob.matches("/acb"));
    }

    #[test]
    fn test_glob_any_char_and_escape() {
        assert!(PatternMatcher::glob("/file..txt").matches("/file1.txt"));
        assert!(PatternMatcher::glob("/file.\\.txt").matches("/file1.txt"));
        assert!(!PatternMatcher::glob("/file.\\.txt").matches("/file1xtxt"));
        assert!(PatternMatcher::glob(".*\\.pdf").matches("/a/b/c.pdf"));
    }

    #[test]
    fn test_glob_backtracks() {
        assert!(PatternMatcher::glob(".*/x/.*").matches("/a/x/b/x/c"));
        assert!(PatternMatcher::glob(".*a").matches("banana"));
    }

    #[test]
    fn test_glob_many_repeats_stays_linear() {
        let glob = PatternMatcher::glob("/a*a*a*a*a*a*a*a*a*a*a*a*b");
        let long_run = format!("/{}", "a".repeat(2_000));
        let started = std::time::Instant::now();
        assert!(!glob.matches(&long_run));
        assert!(glob.matches(&format!("{}b", long_run)));
        assert!(started.elapsed() < std::time::Duration::from_secs(2));

        assert!(PatternMatcher::glob(&".*x".repeat(30)).matches(&"x".repeat(30)));
        assert!(!PatternMatcher::glob(&".*x".repeat(30)).matches(&"y".repeat(5_000)));
    }

    #[test]
    fn test_empty_glob() {
        assert!(PatternMatcher::glob("").matches(""));
        assert!(!PatternMatcher::glob("").matches("/"));
    }

    #[test]
    fn test_malformed_glob() {
        assert!(PatternMatcher::glob("/a\\").is_malformed());
        assert!(!PatternMatcher::glob("/a\\\\").is_malformed());
        assert!(!PatternMatcher::literal("/a\\").is_malformed());
    }
}
