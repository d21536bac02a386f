use logos::{Lexer, Logos};

/// Markup-level tokens.
///
/// Raw-text element content (`<script>`, `<style>`, ...) is not tokenized
/// here: the tree builder slices it straight out of the remainder.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token<'src> {
    /// Comment body, without the `<!--` / `-->` delimiters
    #[token("<!--", comment_body)]
    Comment(&'src str),

    /// `<!DOCTYPE ...>` and other declarations
    #[regex(r"<![^-][^>]*>", |lex| lex.slice())]
    Declaration(&'src str),

    /// `<?...>` processing instructions, dropped by the tree builder
    #[regex(r"<\?[^>]*>", |lex| lex.slice())]
    ProcessingInstruction(&'src str),

    #[regex(r#"<[A-Za-z][^>"']*("[^"]*"[^>"']*|'[^']*'[^>"']*)*>"#, |lex| lex.slice())]
    StartTag(&'src str),

    #[regex(r"</[A-Za-z][^>]*>", |lex| lex.slice())]
    EndTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),

    /// A `<` that does not open a tag
    #[token("<", |lex| lex.slice())]
    Lt(&'src str),
}

fn comment_body<'src>(lex: &mut Lexer<'src, Token<'src>>) -> &'src str {
    let rest = lex.remainder();
    match rest.find("-->") {
        Some(end) => {
            lex.bump(end + 3);
            &rest[..end]
        }
        None => {
            lex.bump(rest.len());
            rest
        }
    }
}

/// Tokens inside a start tag, after the tag name
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\x0C]+")]
pub enum AttrToken<'src> {
    #[regex(r#"[^ \t\r\n\x0C"'>/=]+"#, |lex| lex.slice())]
    Word(&'src str),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    DoubleQuoted(&'src str),

    #[regex(r"'[^']*'", |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    SingleQuoted(&'src str),

    #[token("/")]
    Slash,
}

/// A start tag split into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct StartTag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
}

/// Split the full `<tag ...>` slice into name, attributes and the `/>` flag.
///
/// Attribute values are returned undecoded.
pub fn split_start_tag(slice: &str) -> StartTag {
    let inner = slice
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(slice);
    let name_end = inner
        .find(|c: char| c.is_ascii_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();
    let rest = &inner[name_end..];

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;
    let mut pending_name: Option<String> = None;
    let mut awaiting_value = false;
    // (value, end offset) of an unquoted value still being extended
    let mut unquoted: Option<(String, usize)> = None;

    let mut lex = AttrToken::lexer(rest);
    while let Some(token) = lex.next() {
        let span = lex.span();
        let Ok(token) = token else {
            continue;
        };

        // Unquoted values may contain `/` and run until whitespace
        if let Some((value, end)) = unquoted.as_mut() {
            if span.start == *end {
                match token {
                    AttrToken::Word(w) => {
                        value.push_str(w);
                        *end = span.end;
                        continue;
                    }
                    AttrToken::Slash if span.end < rest.len() => {
                        value.push('/');
                        *end = span.end;
                        continue;
                    }
                    _ => {}
                }
            }
            if let (Some(name), Some((value, _))) = (pending_name.take(), unquoted.take()) {
                attrs.push((name, value));
            }
        }

        match token {
            AttrToken::Word(word) => {
                if awaiting_value {
                    awaiting_value = false;
                    unquoted = Some((word.to_string(), span.end));
                } else {
                    if let Some(name) = pending_name.take() {
                        attrs.push((name, String::new()));
                    }
                    pending_name = Some(word.to_ascii_lowercase());
                }
                self_closing = false;
            }
            AttrToken::Equals => {
                if pending_name.is_some() {
                    awaiting_value = true;
                }
            }
            AttrToken::DoubleQuoted(v) | AttrToken::SingleQuoted(v) => {
                if awaiting_value {
                    awaiting_value = false;
                    if let Some(name) = pending_name.take() {
                        attrs.push((name, v.to_string()));
                    }
                }
                self_closing = false;
            }
            AttrToken::Slash => {
                self_closing = true;
            }
        }
    }

    if let (Some(name), Some((value, _))) = (pending_name.as_ref(), unquoted.take()) {
        attrs.push((name.clone(), value));
        pending_name = None;
    }
    if let Some(name) = pending_name {
        attrs.push((name, String::new()));
    }

    StartTag {
        name,
        attrs,
        self_closing,
    }
}

/// Tag name of a `</tag>` slice, lowercased
pub fn end_tag_name(slice: &str) -> String {
    slice
        .trim_start_matches("</")
        .trim_end_matches('>')
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token<'_>> {
        Token::lexer(src).filter_map(Result::ok).collect()
    }

    #[test]
    fn test_tokenize_basic_markup() {
        let toks = tokens("<!DOCTYPE html><p class=\"a\">hi</p><!-- note -->");
        assert_eq!(
            toks,
            vec![
                Token::Declaration("<!DOCTYPE html>"),
                Token::StartTag("<p class=\"a\">"),
                Token::Text("hi"),
                Token::EndTag("</p>"),
                Token::Comment(" note "),
            ]
        );
    }

    #[test]
    fn test_quoted_gt_stays_inside_tag() {
        let toks = tokens("<a title=\"1 > 0\">x</a>");
        assert_eq!(toks[0], Token::StartTag("<a title=\"1 > 0\">"));
    }

    #[test]
    fn test_stray_lt_is_not_a_tag() {
        let toks = tokens("a < b");
        assert_eq!(toks, vec![Token::Text("a "), Token::Lt("<"), Token::Text(" b")]);
    }

    #[test]
    fn test_split_start_tag_attribute_forms() {
        let tag = split_start_tag("<IMG src=a/b.png alt='x y' hidden data-k=\"v\">");
        assert_eq!(tag.name, "img");
        assert_eq!(
            tag.attrs,
            vec![
                ("src".to_string(), "a/b.png".to_string()),
                ("alt".to_string(), "x y".to_string()),
                ("hidden".to_string(), String::new()),
                ("data-k".to_string(), "v".to_string()),
            ]
        );
        assert!(!tag.self_closing);
    }

    #[test]
    fn test_split_start_tag_self_closing() {
        let tag = split_start_tag("<br/>");
        assert_eq!(tag.name, "br");
        assert!(tag.self_closing);
        assert!(tag.attrs.is_empty());

        let tag = split_start_tag("<circle r=\"4\" />");
        assert!(tag.self_closing);
        assert_eq!(tag.attrs, vec![("r".to_string(), "4".to_string())]);
    }

    #[test]
    fn test_end_tag_name() {
        assert_eq!(end_tag_name("</DIV >"), "div");
    }
}
