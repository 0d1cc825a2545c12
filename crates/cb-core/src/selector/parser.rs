use crate::error::{Error, Result};

/// One part of a parsed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorToken {
    /// `.name` - struct field access
    Field(String),
    /// `[]` - loop over a list
    List,
}

struct RawToken {
    text: String,
    pos: usize,
    pos_after: usize,
}

/// Parses a selector string like `[].inner[].int` into tokens. A selector
/// is a sequence of parts; each part starts with `.` or `[]`.
pub fn parse(selector: &str) -> Result<Vec<SelectorToken>> {
    let raw = tokenize(selector);
    if raw.is_empty() {
        return Err(parse_error(selector, "selectorPath must not be empty", 0));
    }

    let mut parts = Vec::new();
    let mut idx = 0usize;
    while idx < raw.len() {
        match raw[idx].text.as_str() {
            "." => match raw.get(idx + 1) {
                None => {
                    return Err(parse_error(
                        selector,
                        "Unexpected selector end",
                        token_pos(&raw, idx + 1),
                    ))
                }
                Some(next) if next.text == "." || next.text == "[]" => {
                    return Err(parse_error(
                        selector,
                        "Expected field name",
                        token_pos(&raw, idx + 1),
                    ))
                }
                Some(next) => {
                    parts.push(SelectorToken::Field(next.text.clone()));
                    idx += 2;
                }
            },
            "[]" => {
                if let Some(next) = raw.get(idx + 1) {
                    if next.text != "." && next.text != "[]" {
                        return Err(parse_error(
                            selector,
                            "Unexpected identifier",
                            token_pos(&raw, idx),
                        ));
                    }
                }
                parts.push(SelectorToken::List);
                idx += 1;
            }
            _ => {
                return Err(parse_error(
                    selector,
                    "A selector part should begin with . or []",
                    token_pos(&raw, idx),
                ))
            }
        }
    }
    Ok(parts)
}

fn token_pos(raw: &[RawToken], idx: usize) -> usize {
    match raw.get(idx) {
        Some(token) => token.pos,
        None => raw.last().map_or(0, |token| token.pos_after),
    }
}

fn parse_error(selector: &str, text: &str, pos: usize) -> Error {
    let end = (pos + 10).min(selector.len());
    let snippet = selector.get(pos..end).unwrap_or("");
    Error::SelectorParse(format!(
        "Error: \"{}\", at col {} : \"{}\". Full selector: \"{}\"",
        text, pos, snippet, selector
    ))
}

/// Splits a selector into delimiter tokens (`.` and `[]`) and the
/// identifiers between them.
fn tokenize(selector: &str) -> Vec<RawToken> {
    let mut delims: Vec<RawToken> = Vec::new();
    delims.extend(find_delimiters(selector, "."));
    delims.extend(find_delimiters(selector, "[]"));
    delims.sort_by_key(|d| d.pos);

    let mut tokens = Vec::new();
    let mut last_pos = 0usize;
    for delim in delims {
        if delim.pos > last_pos {
            tokens.push(RawToken {
                text: selector[last_pos..delim.pos].to_string(),
                pos: last_pos,
                pos_after: delim.pos,
            });
        }
        last_pos = delim.pos_after;
        tokens.push(delim);
    }
    if last_pos < selector.len() {
        tokens.push(RawToken {
            text: selector[last_pos..].to_string(),
            pos: last_pos,
            pos_after: selector.len(),
        });
    }
    tokens
}

fn find_delimiters(selector: &str, delimiter: &str) -> Vec<RawToken> {
    let mut found = Vec::new();
    let mut offset = 0usize;
    while let Some(rel) = selector[offset..].find(delimiter) {
        let pos = offset + rel;
        let pos_after = pos + delimiter.len();
        found.push(RawToken {
            text: delimiter.to_string(),
            pos,
            pos_after,
        });
        offset = pos_after;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_token() {
        assert_eq!(parse("[]").unwrap(), vec![SelectorToken::List]);
    }

    #[test]
    fn list_then_field() {
        assert_eq!(
            parse("[].inner").unwrap(),
            vec![
                SelectorToken::List,
                SelectorToken::Field("inner".to_string())
            ]
        );
    }

    #[test]
    fn nested_lists() {
        assert_eq!(
            parse("[].inner[]").unwrap(),
            vec![
                SelectorToken::List,
                SelectorToken::Field("inner".to_string()),
                SelectorToken::List,
            ]
        );
        assert_eq!(
            parse("[].inner[].int").unwrap(),
            vec![
                SelectorToken::List,
                SelectorToken::Field("inner".to_string()),
                SelectorToken::List,
                SelectorToken::Field("int".to_string()),
            ]
        );
    }

    #[test]
    fn empty_selector_is_an_error() {
        let err = parse("").unwrap_err();
        assert!(err.to_string().contains("selectorPath must not be empty"));
    }

    #[test]
    fn selector_must_start_with_a_delimiter() {
        let err = parse("foo").unwrap_err();
        assert!(err
            .to_string()
            .contains("A selector part should begin with . or []"));
        assert!(err.to_string().contains("at col 0"));
    }

    #[test]
    fn dangling_dot_is_an_error() {
        let err = parse(".").unwrap_err();
        assert!(err.to_string().contains("Unexpected selector end"));
        assert!(err.to_string().contains("at col 1"));
    }

    #[test]
    fn double_dot_needs_a_field_name() {
        let err = parse("..").unwrap_err();
        assert!(err.to_string().contains("Expected field name"));

        let err = parse(".[]").unwrap_err();
        assert!(err.to_string().contains("Expected field name"));
    }

    #[test]
    fn identifier_after_list_token_is_an_error() {
        let err = parse("[]x").unwrap_err();
        assert!(err.to_string().contains("Unexpected identifier"));
    }
}
