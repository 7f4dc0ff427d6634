//! User-Agent 分词
//! URL / 邮箱 / UUID / base64 用锚定正则整体识别，其余按标点切分
use once_cell::sync::Lazy;
use regex::Regex;

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?(?:[a-zA-Z][a-zA-Z0-9+.-]*://|www\.)[^\s;,()]+").unwrap()
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}").unwrap()
});

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

static BASE64_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]{24,}={0,2}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Url,
    Email,
    Uuid,
    Base64,
    Space,
    Open,
    Close,
    Semicolon,
    Comma,
    Slash,
}

impl TokenKind {
    /// 可以作为单个值出现的词法单元
    #[inline]
    pub fn is_value(self) -> bool {
        matches!(
            self,
            TokenKind::Word | TokenKind::Url | TokenKind::Email | TokenKind::Uuid | TokenKind::Base64
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

#[inline]
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | ';' | ',' | '/')
}

/// 整段匹配后必须紧跟分隔符或到达结尾
fn bounded_match(regex: &Regex, rest: &str) -> Option<usize> {
    let found = regex.find(rest)?;
    match rest[found.end()..].chars().next() {
        None => Some(found.end()),
        Some(c) if is_delimiter(c) => Some(found.end()),
        Some(_) => None,
    }
}

/// base64 还要求同时含有数字和字母，避免把长单词误判
fn base64_match(rest: &str) -> Option<usize> {
    let end = bounded_match(&BASE64_REGEX, rest)?;
    let blob = &rest[..end];
    let has_digit = blob.bytes().any(|b| b.is_ascii_digit());
    let has_alpha = blob.bytes().any(|b| b.is_ascii_alphabetic());
    (has_digit && has_alpha).then_some(end)
}

/// 把输入切成词法单元；不会失败，任何字符都归入某个单元
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        let punct = match c {
            '(' => Some(TokenKind::Open),
            ')' => Some(TokenKind::Close),
            ';' => Some(TokenKind::Semicolon),
            ',' => Some(TokenKind::Comma),
            '/' => Some(TokenKind::Slash),
            _ => None,
        };
        if let Some(kind) = punct {
            chars.next();
            tokens.push(Token { kind, start, end: start + 1 });
            continue;
        }

        if c.is_whitespace() {
            let mut end = start;
            while let Some(&(i, w)) = chars.peek() {
                if !w.is_whitespace() {
                    break;
                }
                end = i + w.len_utf8();
                chars.next();
            }
            tokens.push(Token { kind: TokenKind::Space, start, end });
            continue;
        }

        let rest = &input[start..];
        let special = bounded_match(&URL_REGEX, rest)
            .map(|len| (TokenKind::Url, len))
            .or_else(|| bounded_match(&EMAIL_REGEX, rest).map(|len| (TokenKind::Email, len)))
            .or_else(|| bounded_match(&UUID_REGEX, rest).map(|len| (TokenKind::Uuid, len)))
            .or_else(|| base64_match(rest).map(|len| (TokenKind::Base64, len)));

        let (kind, end) = match special {
            Some((kind, len)) => (kind, start + len),
            None => {
                let len = rest.find(is_delimiter).unwrap_or(rest.len());
                (TokenKind::Word, start + len)
            }
        };
        while matches!(chars.peek(), Some(&(i, _)) if i < end) {
            chars.next();
        }
        tokens.push(Token { kind, start, end });
    }
    tokens
}
