//! 值规整：品牌名与版本号

/// 品牌名中全大写且不超过该长度的词视为缩写原样保留（SONY、ASUS）
const ACRONYM_LIMIT: usize = 4;

#[inline(always)]
fn is_token_separator(c: char) -> bool {
    matches!(c, ' ' | '-' | '_' | '/')
}

/// 品牌名规整
/// - 整体不超过 3 个字符：全部大写
/// - 含数字或不超过 3 个字符的词：全部大写
/// - 短的全大写词：保留
/// - 其它词：首字母大写，只有紧跟在至少 3 个小写字母之后的大写字母被保留
pub fn normalize_brand(brand: &str) -> String {
    let trimmed = brand.trim();
    if trimmed.chars().count() <= 3 {
        return trimmed.to_uppercase();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut word_start: Option<usize> = None;
    let mut pending_space = false;
    for (i, c) in trimmed.char_indices() {
        if !is_token_separator(c) {
            if word_start.is_none() {
                word_start = Some(i);
            }
            continue;
        }
        if let Some(start) = word_start.take() {
            normalize_word(&trimmed[start..i], &mut out);
        }
        // 连续空白折叠为一个
        if c == ' ' {
            if !pending_space {
                out.push(' ');
            }
            pending_space = true;
        } else {
            out.push(c);
            pending_space = false;
        }
    }
    if let Some(start) = word_start {
        normalize_word(&trimmed[start..], &mut out);
    }
    out
}

fn normalize_word(word: &str, out: &mut String) {
    let len = word.chars().count();
    if len <= 3 || word.chars().any(|c| c.is_numeric()) {
        out.push_str(&word.to_uppercase());
        return;
    }
    if len <= ACRONYM_LIMIT && word.chars().all(|c| c.is_uppercase()) {
        out.push_str(word);
        return;
    }

    let mut lower_run = 0usize;
    for (i, c) in word.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
            continue;
        }
        if c.is_uppercase() {
            if lower_run >= 3 {
                out.push(c);
            } else {
                out.extend(c.to_lowercase());
            }
            lower_run = 0;
        } else {
            out.extend(c.to_lowercase());
            lower_run += 1;
        }
    }
}

/// 版本号规整：`_` 换成 `.`，去掉数字前的 `v` 前缀与首尾空白
pub fn clean_version(version: &str) -> String {
    let trimmed = version.trim();
    let mut chars = trimmed.chars();
    let stripped = match (chars.next(), chars.next()) {
        (Some('v' | 'V'), Some(d)) if d.is_ascii_digit() => &trimmed[1..],
        _ => trimmed,
    };
    stripped.replace('_', ".").trim_matches('.').to_string()
}
