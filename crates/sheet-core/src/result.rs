//! 計算結果模型

use serde::{Deserialize, Serialize};

/// 結果區塊：渲染輸出中屬於同一個左側名稱的連續片段
///
/// 每次擷取時重新建立，不跨越計算保存。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultBlock {
    /// 左側名稱
    pub name: String,

    /// 已轉為純文字並正規化的內容（多行以 `\n` 連接）
    pub text: String,

    /// 對應的原始標記內容
    pub markup: String,
}

impl ResultBlock {
    pub fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            markup: String::new(),
        }
    }

    /// 加入一行（純文字與標記需成對加入）
    pub fn push_line(&mut self, text: &str, markup: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
            self.markup.push('\n');
        }
        self.text.push_str(text);
        self.markup.push_str(markup);
    }

    /// 最後一個 `=` 之後、直到該行結尾的文字
    pub fn tail_text(&self) -> &str {
        match self.text.rfind('=') {
            Some(index) => {
                let tail = &self.text[index + 1..];
                tail.split('\n').next().unwrap_or(tail)
            }
            None => "",
        }
    }
}

/// 單一結果名稱的擷取值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedResult {
    pub name: String,

    /// 數值；擷取失敗時為 `NaN`
    pub value: f64,

    /// 單位；找不到時為空字串
    pub unit: String,
}

impl ExtractedResult {
    pub fn new(name: String, value: f64, unit: String) -> Self {
        Self { name, value, unit }
    }

    /// 是否成功取得數值
    pub fn has_value(&self) -> bool {
        !self.value.is_nan()
    }
}

/// 擷取失敗原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissReason {
    /// 尚未渲染或找不到對應的結果區塊
    NoBlock,
    /// 區塊尾端無法解析為數值
    Unparsable,
    /// 區塊中找不到單位
    NoUnit,
}

/// 單一項目擷取失敗（不中斷批次擷取）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("無法擷取結果 {name}: {reason:?}")]
pub struct ExtractionMiss {
    pub name: String,
    pub reason: MissReason,
}

impl ExtractionMiss {
    pub fn new(name: &str, reason: MissReason) -> Self {
        Self {
            name: name.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_tail_uses_last_equals() {
        let mut block = ResultBlock::new("A".to_string());
        block.push_line("A = L·L", "<var>A</var> = <var>L</var>·<var>L</var>");
        block.push_line("= 25 m^2", "= 25 <i>m</i><sup>2</sup>");

        assert_eq!(block.tail_text(), " 25 m^2");
        assert_eq!(block.text.lines().count(), 2);
        assert_eq!(block.markup.lines().count(), 2);
    }

    #[test]
    fn test_block_tail_stops_at_line_end() {
        let mut block = ResultBlock::new("A".to_string());
        block.push_line("A = 25 m^2", "");
        block.push_line("Section 2", "");

        assert_eq!(block.tail_text(), " 25 m^2");
    }

    #[test]
    fn test_empty_block_tail() {
        let block = ResultBlock::new("A".to_string());
        assert_eq!(block.tail_text(), "");
    }

    #[test]
    fn test_extracted_result_has_value() {
        assert!(ExtractedResult::new("A".to_string(), 1.0, String::new()).has_value());
        assert!(!ExtractedResult::new("A".to_string(), f64::NAN, String::new()).has_value());
    }
}
