//! 結果擷取：從渲染輸出取回每個結果名稱的最終數值與單位

use once_cell::sync::Lazy;
use regex::Regex;
use sheet_core::{ExtractionMiss, MissReason, ResultBlock};

use crate::markup::{fraction_unit, split_rendered_lines, styled_unit, tail_markup};
use crate::syntax::SyntaxClassifier;

/// `mantissa × 10^exponent`
static SCIENTIFIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([+-]?\d+(?:\.\d+)?)\s*[×x*·]\s*10\s*\^\s*\(?\s*([+-]?\d+)\s*\)?")
        .expect("scientific pattern is valid")
});

/// 開頭的十進位數字
static DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)").expect("decimal pattern is valid")
});

/// 行首若為 `name =` 則回傳名稱
pub fn opening_name(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let first = trimmed.chars().next()?;
    if !(first.is_alphabetic() || first == '_') {
        return None;
    }

    let len = trimmed
        .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '′' | '″')))
        .unwrap_or(trimmed.len());
    let rest = trimmed[len..].trim_start();
    let after = rest.strip_prefix('=')?;
    if after.starts_with('=') {
        return None;
    }
    Some(&trimmed[..len])
}

/// 將渲染輸出切分為結果區塊
///
/// 以 `name =` 開頭的行開啟新區塊，其後的行併入該區塊，直到下一個開頭行。
/// 第一個開頭行之前的內容與空白行不屬於任何區塊。
pub fn result_blocks(output: &str) -> Vec<ResultBlock> {
    let mut blocks: Vec<ResultBlock> = Vec::new();

    for line in split_rendered_lines(output) {
        if line.text.is_empty() {
            continue;
        }
        if let Some(name) = opening_name(&line.text) {
            blocks.push(ResultBlock::new(name.to_string()));
        }
        if let Some(block) = blocks.last_mut() {
            block.push_line(&line.text, &line.markup);
        }
    }

    blocks
}

/// 同名區塊以最後一個為準（最終計算值）
pub fn find_block<'a>(blocks: &'a [ResultBlock], name: &str) -> Option<&'a ResultBlock> {
    blocks.iter().rev().find(|block| block.name == name)
}

/// 解析數值，回傳數值與在文字中的結束位置
///
/// 先找 `mantissa × 10^exponent`，否則取開頭的十進位數字。
pub fn parse_scalar(text: &str) -> Option<(f64, usize)> {
    if let Some(caps) = SCIENTIFIC.captures(text) {
        let whole = caps.get(0)?;
        let mantissa = caps.get(1)?.as_str();
        let exponent = caps.get(2)?.as_str();
        if let Ok(value) = format!("{}e{}", mantissa, exponent).parse::<f64>() {
            return Some((value, whole.end()));
        }
    }

    let caps = DECIMAL.captures(text)?;
    let number = caps.get(1)?;
    let value = number.as_str().parse::<f64>().ok()?;
    Some((value, number.end()))
}

/// 區塊的最終數值
pub fn extract_value(block: &ResultBlock) -> Result<f64, ExtractionMiss> {
    parse_scalar(block.tail_text())
        .map(|(value, _)| value)
        .ok_or_else(|| ExtractionMiss::new(&block.name, MissReason::Unparsable))
}

/// 以純文字比對數值之後的單位詞元
pub fn text_unit(tail: &str, classifier: &SyntaxClassifier) -> Option<String> {
    let (_, end) = parse_scalar(tail)?;
    let rest = tail[end..].trim_start();
    let len = classifier.unit_len(rest);
    (len > 0).then(|| rest[..len].to_string())
}

/// 區塊的單位
///
/// 依序嘗試：分式結構、最後一個斜體單位詞元、純文字比對。
pub fn extract_unit(
    block: &ResultBlock,
    classifier: &SyntaxClassifier,
) -> Result<String, ExtractionMiss> {
    let markup = tail_markup(&block.markup);

    fraction_unit(markup)
        .or_else(|| styled_unit(markup))
        .or_else(|| text_unit(block.tail_text(), classifier))
        .ok_or_else(|| ExtractionMiss::new(&block.name, MissReason::NoUnit))
}
