//! SQL text utilities built on sqlparser's tokenizer: minification,
//! statement splitting and Workbench-style reformatting.
//!
//! Every function here is best-effort: when the tokenizer rejects the
//! input (half-finished model output, stray prose) we fall back to plain
//! whitespace handling instead of returning an error.

use sqlparser::dialect::MySqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Word};

/// Strip comments, collapse whitespace and uppercase keywords, producing a
/// compact single-line rendition suitable for prompt context.
pub fn minify_sql(sql: &str) -> String {
    match tokenize(sql) {
        Some(tokens) => render(&tokens, false),
        None => collapse_whitespace(sql),
    }
}

/// Split text into individual statements on top-level semicolons.
/// Semicolons inside string literals or comments do not split.
pub fn split_statements(text: &str) -> Vec<String> {
    let Some(tokens) = tokenize(text) else {
        // Tokenizer refused the input; a naive split is the best we can do.
        return text
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("{s};"))
            .collect();
    };

    let mut statements = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    for token in tokens {
        match token {
            Token::Whitespace(_) | Token::EOF => continue,
            Token::SemiColon => {
                current.push(Token::SemiColon);
                let rendered = render(&current, false);
                if !rendered.trim_matches(';').trim().is_empty() {
                    statements.push(rendered);
                }
                current.clear();
            }
            other => current.push(other),
        }
    }
    let tail = render(&current, false);
    if !tail.trim().is_empty() {
        statements.push(tail);
    }
    statements
}

/// Format one statement: uppercase keywords, major clauses on their own
/// lines, guaranteed trailing semicolon. Idempotent modulo whitespace.
pub fn format_statement(stmt: &str) -> String {
    let mut text = stmt.trim().trim_end_matches(';').trim_end().to_string();
    text.push(';');
    match tokenize(&text) {
        Some(tokens) => render(&tokens, true),
        None => collapse_whitespace(&text),
    }
}

fn tokenize(sql: &str) -> Option<Vec<Token>> {
    Tokenizer::new(&MySqlDialect {}, sql).tokenize().ok()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

enum Sep {
    None,
    Space,
    Newline,
    IndentNewline,
}

fn render(tokens: &[Token], multiline: bool) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for token in tokens {
        if matches!(token, Token::Whitespace(_) | Token::EOF) {
            continue;
        }
        if let Some(prev) = prev {
            match separator(prev, token, multiline) {
                Sep::None => {}
                Sep::Space => out.push(' '),
                Sep::Newline => out.push('\n'),
                Sep::IndentNewline => out.push_str("\n  "),
            }
        }
        out.push_str(&token_text(token));
        prev = Some(token);
    }
    out
}

fn token_text(token: &Token) -> String {
    if let Token::Word(word) = token {
        if word.quote_style.is_none() && word.keyword != Keyword::NoKeyword {
            return word.value.to_uppercase();
        }
    }
    token.to_string()
}

fn separator(prev: &Token, cur: &Token, multiline: bool) -> Sep {
    if matches!(
        cur,
        Token::Comma | Token::SemiColon | Token::Period | Token::RParen
    ) {
        return Sep::None;
    }
    if matches!(prev, Token::LParen | Token::Period) {
        return Sep::None;
    }
    if matches!(cur, Token::LParen) {
        if let Token::Word(word) = prev {
            if tight_paren(word) {
                return Sep::None;
            }
        }
    }
    if multiline {
        if let Token::Word(word) = cur {
            if word.quote_style.is_none() {
                if starts_clause(word, prev) {
                    return Sep::Newline;
                }
                if matches!(word.keyword, Keyword::AND | Keyword::OR) {
                    return Sep::IndentNewline;
                }
            }
        }
    }
    Sep::Space
}

/// Identifiers and call-like keywords hug their opening paren:
/// `COUNT(*)`, `VARCHAR(50)`, `estudiantes(id, nombre)`.
fn tight_paren(word: &Word) -> bool {
    matches!(
        word.keyword,
        Keyword::NoKeyword
            | Keyword::VARCHAR
            | Keyword::CHAR
            | Keyword::DECIMAL
            | Keyword::NUMERIC
            | Keyword::INT
            | Keyword::INTEGER
            | Keyword::BIGINT
            | Keyword::SMALLINT
            | Keyword::FLOAT
            | Keyword::COUNT
            | Keyword::SUM
            | Keyword::AVG
            | Keyword::MIN
            | Keyword::MAX
    )
}

fn starts_clause(word: &Word, prev: &Token) -> bool {
    match word.keyword {
        Keyword::WHERE
        | Keyword::GROUP
        | Keyword::ORDER
        | Keyword::HAVING
        | Keyword::LIMIT
        | Keyword::UNION
        | Keyword::VALUES
        | Keyword::SET
        | Keyword::LEFT
        | Keyword::RIGHT
        | Keyword::INNER
        | Keyword::FULL
        | Keyword::CROSS => true,
        // `DELETE FROM` stays on one line; any other FROM opens a clause.
        Keyword::FROM => !prev_is_keyword(prev, Keyword::DELETE),
        // JOIN already broke the line at its LEFT/INNER/... qualifier.
        Keyword::JOIN => !prev_is_join_qualifier(prev),
        _ => false,
    }
}

fn prev_is_keyword(prev: &Token, keyword: Keyword) -> bool {
    matches!(prev, Token::Word(w) if w.keyword == keyword)
}

fn prev_is_join_qualifier(prev: &Token) -> bool {
    matches!(
        prev,
        Token::Word(w) if matches!(
            w.keyword,
            Keyword::LEFT
                | Keyword::RIGHT
                | Keyword::INNER
                | Keyword::FULL
                | Keyword::CROSS
                | Keyword::OUTER
                | Keyword::NATURAL
        )
    )
}
