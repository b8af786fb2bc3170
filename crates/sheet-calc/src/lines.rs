//! 原始碼行表
//!
//! 代換變數值時先將原始碼拆成行記錄，只改寫目標敘述的數值欄位，再重新
//! 組回文字；其他行與空白保持原樣。

use sheet_core::{EquationEntry, SheetError};

use crate::syntax::{ScannedLine, SyntaxClassifier};

/// 單行記錄
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    /// 行內容（不含換行字元）
    pub content: String,

    /// 原始換行字元（`\n`、`\r\n` 或最後一行的空字串）
    pub ending: String,

    /// 掃描結果
    pub scanned: ScannedLine,
}

/// 原始碼行表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineTable {
    records: Vec<LineRecord>,
}

impl LineTable {
    /// 拆解原始碼
    pub fn parse(source: &str, classifier: &SyntaxClassifier) -> Self {
        let records = source
            .split_inclusive('\n')
            .map(|piece| {
                let (content, ending) = split_ending(piece);
                LineRecord {
                    content: content.to_string(),
                    ending: ending.to_string(),
                    scanned: classifier.scan_line(content),
                }
            })
            .collect();

        Self { records }
    }

    pub fn records(&self) -> &[LineRecord] {
        &self.records
    }

    /// 第一個可改寫的宣告位置（行索引, 敘述索引）
    pub fn find_declaration(&self, name: &str) -> Option<(usize, usize)> {
        self.records
            .iter()
            .enumerate()
            .find_map(|(line_index, record)| {
                record
                    .scanned
                    .statements
                    .iter()
                    .position(|statement| {
                        statement.kind.is_declaration()
                            && statement.value_span.is_some()
                            && statement.name.as_deref() == Some(name)
                    })
                    .map(|statement_index| (line_index, statement_index))
            })
    }

    /// 改寫宣告的數值字面，保留單位與 `';'` 形式
    pub fn set_value(
        &mut self,
        name: &str,
        value: f64,
        classifier: &SyntaxClassifier,
    ) -> sheet_core::Result<()> {
        let (line_index, statement_index) = self
            .find_declaration(name)
            .ok_or_else(|| SheetError::VariableNotFound(name.to_string()))?;

        let record = &mut self.records[line_index];
        let span = record.scanned.statements[statement_index]
            .value_span
            .clone()
            .ok_or_else(|| SheetError::VariableNotFound(name.to_string()))?;

        record.content.replace_range(span, &format_value(value));
        record.scanned = classifier.scan_line(&record.content);
        Ok(())
    }

    /// 依原順序列出計算方程式
    pub fn equations(&self) -> Vec<EquationEntry> {
        self.records
            .iter()
            .filter_map(|record| record.scanned.equation())
            .collect()
    }

    /// 重新組回原始碼
    pub fn to_source(&self) -> String {
        let mut source = String::new();
        for record in &self.records {
            source.push_str(&record.content);
            source.push_str(&record.ending);
        }
        source
    }
}

fn split_ending(piece: &str) -> (&str, &str) {
    if let Some(content) = piece.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = piece.strip_suffix('\n') {
        (content, "\n")
    } else {
        (piece, "")
    }
}

/// 數值寫回格式：最短且可還原的十進位表示（不使用指數記號）
pub fn format_value(value: f64) -> String {
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(source: &str) -> LineTable {
        LineTable::parse(source, &SyntaxClassifier::new())
    }

    #[test]
    fn test_round_trip_preserves_text() {
        let source = "'Beam\r\nL = ?{5}m\r\n\n  A = L*L   # area\nend";
        assert_eq!(table(source).to_source(), source);
        assert_eq!(table("").to_source(), "");
        assert_eq!(table("x = 1\n").records().len(), 1);
    }

    #[test]
    fn test_set_value_keeps_unit_and_other_lines() {
        let classifier = SyntaxClassifier::new();
        let mut lines = table("L = ?{5}m\nb = 200 mm 'width\nA = L*b");

        lines.set_value("b", 250.5, &classifier).unwrap();
        assert_eq!(lines.to_source(), "L = ?{5}m\nb = 250.5 mm 'width\nA = L*b");

        lines.set_value("L", -0.125, &classifier).unwrap();
        assert_eq!(lines.to_source(), "L = ?{-0.125}m\nb = 250.5 mm 'width\nA = L*b");
    }

    #[test]
    fn test_set_value_inline_form() {
        let classifier = SyntaxClassifier::new();
        let mut lines = table("b = ?{200}mm';'h = ?{400}mm");

        lines.set_value("h", 450.0, &classifier).unwrap();
        assert_eq!(lines.to_source(), "b = ?{200}mm';'h = ?{450}mm");
    }

    #[test]
    fn test_similar_names_are_not_confused() {
        let classifier = SyntaxClassifier::new();
        let mut lines = table("h_1 = ?{1}m\nh = ?{2}m\nhh = ?{3}m");

        lines.set_value("h", 9.0, &classifier).unwrap();
        assert_eq!(lines.to_source(), "h_1 = ?{1}m\nh = ?{9}m\nhh = ?{3}m");
    }

    #[test]
    fn test_only_first_duplicate_is_rewritten() {
        let classifier = SyntaxClassifier::new();
        let mut lines = table("a = ?{1}\na = ?{2}");

        lines.set_value("a", 7.0, &classifier).unwrap();
        assert_eq!(lines.to_source(), "a = ?{7}\na = ?{2}");
    }

    #[test]
    fn test_malformed_explicit_value_can_be_rewritten() {
        let classifier = SyntaxClassifier::new();
        let mut lines = table("x = ?{}kN");

        lines.set_value("x", 3.0, &classifier).unwrap();
        assert_eq!(lines.to_source(), "x = ?{3}kN");
    }

    #[test]
    fn test_set_value_not_found() {
        let classifier = SyntaxClassifier::new();
        let mut lines = table("A = L*L\nt = ?");

        assert!(matches!(
            lines.set_value("A", 1.0, &classifier),
            Err(SheetError::VariableNotFound(name)) if name == "A"
        ));
        assert!(lines.set_value("t", 1.0, &classifier).is_err());
        assert!(lines.set_value("missing", 1.0, &classifier).is_err());
    }

    #[test]
    fn test_equations_in_source_order() {
        let lines = table("L = ?{5}m\nA = L*L\nB = L';'C = ?{1}\nA = A + 1 'again");
        let equations = lines.equations();

        assert_eq!(equations.len(), 2);
        assert_eq!(equations[0], EquationEntry::new("A".to_string(), "L*L".to_string()));
        assert_eq!(equations[1].rhs, "A + 1");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(5.0), "5");
        assert_eq!(format_value(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_value(1e-7), "0.0000001");
        assert_eq!(format_value(-0.0), "-0");
    }

    proptest! {
        #[test]
        fn prop_set_value_round_trips(value in -1.0e12f64..1.0e12f64) {
            let classifier = SyntaxClassifier::new();
            let source = "b = ?{200}mm';'h = 400 mm\nL = ?{5}m 'span\nA = L*L";
            let mut lines = LineTable::parse(source, &classifier);

            lines.set_value("L", value, &classifier).unwrap();
            let updated = lines.to_source();
            let parsed = classifier.parse_variables(&updated, false);

            prop_assert_eq!(parsed.value_of("L"), Some(value));
            prop_assert_eq!(parsed.unit_of("L"), Some("m"));
            let untouched: Vec<&str> = updated.lines().filter(|l| !l.starts_with("L =")).collect();
            prop_assert_eq!(untouched, vec!["b = ?{200}mm';'h = 400 mm", "A = L*L"]);
        }
    }
}
