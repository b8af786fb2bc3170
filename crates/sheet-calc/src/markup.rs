//! 渲染輸出的標記處理
//!
//! 計算引擎輸出類 HTML 標記。此處只處理擷取需要的最小子集：標籤切分、
//! 字元實體、上下標，以及分式（`dvc` 容器）與斜體單位詞元。

use crate::normalize::normalize_text;

/// 造成換行的區塊標籤
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "table", "pre", "ul", "ol",
    "blockquote",
];

/// 分式容器與分隔線的 class
const FRACTION_CLASS: &str = "dvc";
const FRACTION_RULE_CLASS: &str = "dvl";

/// 渲染輸出的一行：純文字與原始標記成對保存
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub text: String,
    pub markup: String,
}

#[derive(Debug, Clone)]
struct Tag<'a> {
    name: String,
    closing: bool,
    attrs: &'a str,
    start: usize,
    end: usize,
}

impl<'a> Tag<'a> {
    fn has_class(&self, class: &str) -> bool {
        self.class_attr()
            .map(|value| value.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    fn class_attr(&self) -> Option<&'a str> {
        let index = self.attrs.find("class=")?;
        let rest = &self.attrs[index + "class=".len()..];
        let quote = rest.chars().next().filter(|q| *q == '"' || *q == '\'')?;
        let value = &rest[1..];
        let close = value.find(quote)?;
        Some(&value[..close])
    }

    fn is_opening(&self, name: &str) -> bool {
        !self.closing && self.name == name
    }

    fn is_closing(&self, name: &str) -> bool {
        self.closing && self.name == name
    }
}

/// 解析位於 `i` 的標籤；不像標籤的 `<`（例如比較運算）回傳 `None`
fn parse_tag_at(s: &str, i: usize) -> Option<Tag<'_>> {
    let rest = &s[i..];
    let after = rest.strip_prefix('<')?;
    let first = after.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '/' || first == '!') {
        return None;
    }

    let close = rest.find('>')?;
    let inner = &rest[1..close];
    let (closing, body) = match inner.strip_prefix('/') {
        Some(body) => (true, body),
        None => (false, inner),
    };
    let name_len = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    if name_len == 0 && !inner.starts_with('!') {
        return None;
    }

    Some(Tag {
        name: body[..name_len].to_ascii_lowercase(),
        closing,
        attrs: &body[name_len..],
        start: i,
        end: i + close + 1,
    })
}

/// 依序列出所有標籤
fn tags(s: &str) -> Vec<Tag<'_>> {
    let mut found = Vec::new();
    let mut i = 0;
    while let Some(offset) = s[i..].find('<') {
        let at = i + offset;
        match parse_tag_at(s, at) {
            Some(tag) => {
                i = tag.end;
                found.push(tag);
            }
            None => i = at + 1,
        }
    }
    found
}

fn is_block_tag(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

/// 解碼位於開頭的字元實體，回傳解碼結果與消耗的位元組數
fn decode_entity(s: &str) -> Option<(char, usize)> {
    let body = s.strip_prefix('&')?;
    let end = body.find(';').filter(|&end| end > 0 && end <= 10)?;
    let name = &body[..end];

    let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)?
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)?
    } else {
        match name {
            "nbsp" => '\u{00A0}',
            "thinsp" => '\u{2009}',
            "ensp" => '\u{2002}',
            "emsp" => '\u{2003}',
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "minus" => '-',
            "times" => '×',
            "middot" => '·',
            "divide" => '÷',
            "deg" => '°',
            "micro" => 'µ',
            "mu" => 'μ',
            "Omega" => 'Ω',
            "omega" => 'ω',
            "alpha" => 'α',
            "beta" => 'β',
            "gamma" => 'γ',
            "delta" => 'δ',
            "Delta" => 'Δ',
            "epsilon" => 'ε',
            "lambda" => 'λ',
            "pi" => 'π',
            "rho" => 'ρ',
            "sigma" => 'σ',
            "tau" => 'τ',
            "phi" => 'φ',
            "sup2" => '²',
            "sup3" => '³',
            "le" => '≤',
            "ge" => '≥',
            "ne" => '≠',
            "equiv" => '≡',
            "radic" => '√',
            "prime" => '′',
            "Prime" => '″',
            _ => return None,
        }
    };

    Some((decoded, end + 2))
}

/// 將標記轉為純文字
///
/// 區塊標籤與 `<br>` 轉為換行，`<sup>` 轉為 `^`，`<sub>` 轉為 `_`，
/// 其餘標籤移除；字元實體解碼；Unicode 減號轉為 `-`。
pub fn markup_to_text(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut i = 0;

    while let Some(c) = markup[i..].chars().next() {
        if c == '<' {
            if let Some(tag) = parse_tag_at(markup, i) {
                match tag.name.as_str() {
                    "br" => out.push('\n'),
                    "sup" if !tag.closing => out.push('^'),
                    "sub" if !tag.closing => out.push('_'),
                    name if tag.closing && is_block_tag(name) => out.push('\n'),
                    _ => {}
                }
                i = tag.end;
                continue;
            }
        }
        if c == '&' {
            if let Some((decoded, len)) = decode_entity(&markup[i..]) {
                out.push(decoded);
                i += len;
                continue;
            }
        }
        out.push(if c == '−' { '-' } else { c });
        i += c.len_utf8();
    }

    out
}

/// 將渲染輸出切分為行（換行字元、`<br>` 與區塊結束標籤）
pub fn split_rendered_lines(markup: &str) -> Vec<RenderedLine> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while let Some(c) = markup[i..].chars().next() {
        match c {
            '\n' | '\r' => {
                pieces.push(&markup[start..i]);
                i += 1;
                if c == '\r' && markup[i..].starts_with('\n') {
                    i += 1;
                }
                start = i;
            }
            '<' => match parse_tag_at(markup, i) {
                Some(tag) => {
                    if tag.name == "br" || (tag.closing && is_block_tag(&tag.name)) {
                        pieces.push(&markup[start..tag.end]);
                        start = tag.end;
                    }
                    i = tag.end;
                }
                None => i += 1,
            },
            c => i += c.len_utf8(),
        }
    }
    pieces.push(&markup[start..]);

    pieces
        .into_iter()
        .map(|piece| RenderedLine {
            text: normalize_text(&markup_to_text(piece)).trim().to_string(),
            markup: piece.to_string(),
        })
        .collect()
}

/// 最後一個（標籤外的）`=` 之後、直到該行結尾的標記
pub fn tail_markup(markup: &str) -> &str {
    let mut last_eq = None;
    let mut i = 0;

    while let Some(c) = markup[i..].chars().next() {
        if c == '<' {
            if let Some(tag) = parse_tag_at(markup, i) {
                i = tag.end;
                continue;
            }
        }
        if c == '=' || c == '＝' {
            last_eq = Some(i + c.len_utf8());
        }
        i += c.len_utf8();
    }

    match last_eq {
        Some(start) => {
            let tail = &markup[start..];
            tail.split('\n').next().unwrap_or(tail)
        }
        None => "",
    }
}

fn clean_unit_text(markup: &str) -> String {
    normalize_text(&markup_to_text(markup))
        .split_whitespace()
        .collect()
}

/// 緊接在 `from` 之後的 `<sup>…</sup>` 內容
fn exponent_after(markup: &str, from: usize) -> Option<String> {
    let rest = &markup[from..];
    let skipped = rest.len() - rest.trim_start().len();
    let sup = parse_tag_at(markup, from + skipped).filter(|tag| tag.is_opening("sup"))?;
    let close = markup[sup.end..].find("</sup>")?;
    let exponent = clean_unit_text(&markup[sup.end..sup.end + close]);
    (!exponent.is_empty()).then_some(exponent)
}

/// 從分式結構取得單位：`numerator/denominator[^exponent]`
///
/// 取最後一個 `dvc` 容器。分子分母可以是兩個子 span，或以空的 `dvl`
/// 分隔線前後的內容。純數字分式不視為單位。
pub fn fraction_unit(markup: &str) -> Option<String> {
    let all = tags(markup);
    let open_index = all
        .iter()
        .rposition(|tag| tag.is_opening("span") && tag.has_class(FRACTION_CLASS))?;
    let container = &all[open_index];

    let mut depth = 0usize;
    let mut children: Vec<(bool, usize, usize, usize, usize)> = Vec::new();
    let mut child_open: Option<(bool, usize, usize)> = None;
    let mut container_end = None;

    for tag in &all[open_index + 1..] {
        if tag.is_opening("span") {
            if depth == 0 {
                child_open = Some((tag.has_class(FRACTION_RULE_CLASS), tag.start, tag.end));
            }
            depth += 1;
        } else if tag.is_closing("span") {
            if depth == 0 {
                container_end = Some((tag.start, tag.end));
                break;
            }
            depth -= 1;
            if depth == 0 {
                if let Some((is_rule, outer_start, inner_start)) = child_open.take() {
                    children.push((is_rule, outer_start, inner_start, tag.start, tag.end));
                }
            }
        }
    }

    let (inner_end, outer_end) = container_end?;
    let inner_start = container.end;

    let rule = children
        .iter()
        .find(|(is_rule, _, start, end, _)| *is_rule && clean_unit_text(&markup[*start..*end]).is_empty());

    let (numerator, denominator) = match rule {
        Some(&(_, rule_start, _, _, rule_end)) => (
            clean_unit_text(&markup[inner_start..rule_start]),
            clean_unit_text(&markup[rule_end..inner_end]),
        ),
        None => match children.as_slice() {
            [(_, _, num_start, num_end, _), (_, _, den_start, den_end, _), ..] => (
                clean_unit_text(&markup[*num_start..*num_end]),
                clean_unit_text(&markup[*den_start..*den_end]),
            ),
            _ => return None,
        },
    };

    if numerator.is_empty() || denominator.is_empty() {
        return None;
    }
    let has_letter = |s: &str| s.chars().any(char::is_alphabetic);
    if !has_letter(&numerator) && !has_letter(&denominator) {
        return None;
    }

    let mut unit = format!("{}/{}", numerator, denominator);
    if let Some(exponent) = exponent_after(markup, outer_end) {
        unit.push('^');
        unit.push_str(&exponent);
    }
    Some(unit)
}

/// 最後一個斜體單位詞元 `<i>…</i>`，含緊接的上標指數
pub fn styled_unit(markup: &str) -> Option<String> {
    let all = tags(markup);
    let open = all.iter().rev().find(|tag| tag.is_opening("i"))?;
    let close = all
        .iter()
        .find(|tag| tag.start >= open.end && tag.is_closing("i"))?;

    let mut unit = clean_unit_text(&markup[open.end..close.start]);
    if unit.is_empty() {
        return None;
    }
    if let Some(exponent) = exponent_after(markup, close.end) {
        unit.push('^');
        unit.push_str(&exponent);
    }
    Some(unit)
}
