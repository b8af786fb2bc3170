//! 語法分類器
//!
//! 將計算書原始碼的每一行（或以 `';'` 分隔的片段）辨識為明確輸入宣告、
//! 串接宣告、字面值指派或計算方程式。分類器在建構時固定單位字元集與
//! 已知函數表，之後不再變動。

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use once_cell::sync::Lazy;
use sheet_core::{EquationEntry, ParsedVariables, SyntaxConfig, VarKind};

/// 同一行多個敘述之間的分隔標記
pub const INLINE_MARKER: &str = "';'";

/// 內建單位符號（字母與數字之外）
const SEED_UNIT_SYMBOLS: &[char] = &[
    '°', 'Ω', 'µ', 'μ', '·', '^', '/', '%', '‰', '′', '″', '_', '²', '³', '⁻',
];

/// 可作為單位詞元起始的符號
const UNIT_START_SYMBOLS: &[char] = &['°', 'Ω', 'µ', 'μ', '%', '‰', '′', '″'];

/// 單位詞元不可以這些字元結尾
const UNIT_TRAILING_OPERATORS: &[char] = &['^', '/', '-', '·', '_'];

/// 算術、比較與分組運算符號
const OPERATORS: &[char] = &[
    '+', '-', '*', '/', '^', '(', ')', '[', ']', '{', '}', '÷', '×', '·', '<', '>', '≤', '≥', '≡',
    '≠', '!', '|', '&', '√', '∛', '∜', '\\',
];

/// 內建已知函數
const SEED_FUNCTIONS: &[&str] = &[
    "abs", "sign", "sqrt", "cbrt", "root", "exp", "ln", "log", "log_2", "sin", "cos", "tan", "cot",
    "sec", "csc", "asin", "acos", "atan", "atan2", "acot", "sinh", "cosh", "tanh", "coth", "asinh",
    "acosh", "atanh", "round", "floor", "ceiling", "trunc", "mod", "gcd", "lcm", "min", "max",
    "sum", "sumsq", "average", "product", "mean", "hypot", "if", "switch", "not", "and", "or",
    "xor", "fact", "random", "re", "im", "phase", "take", "line", "spline",
];

static SHARED: Lazy<Arc<SyntaxClassifier>> = Lazy::new(|| Arc::new(SyntaxClassifier::new()));

/// 行（片段）類型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// 空白
    Blank,
    /// 僅含註解
    Comment,
    /// 明確輸入宣告 `name = ?{value}unit`
    Explicit,
    /// 位於 `';'` 之後的串接宣告
    InlinePostfix,
    /// 字面值指派 `name = value unit`
    Literal,
    /// 計算方程式 `name = expression`
    Equation,
    /// 其他無法分類的內容（標題、函數定義、別名等）
    Other,
}

impl LineKind {
    /// 是否為變數宣告
    pub fn is_declaration(&self) -> bool {
        matches!(self, LineKind::Explicit | LineKind::InlinePostfix | LineKind::Literal)
    }
}

/// 單一敘述的分類結果
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: LineKind,

    /// 左側名稱
    pub name: Option<String>,

    /// 宣告的數值；數值格式錯誤時為 `None`
    pub value: Option<f64>,

    /// 數值字面在該行中的位元組範圍
    pub value_span: Option<Range<usize>>,

    /// 數值之後的單位詞元
    pub unit: String,

    /// 右側內容（已去除註解與前後空白）
    pub rhs: String,
}

impl Statement {
    fn unnamed(kind: LineKind) -> Self {
        Self {
            kind,
            name: None,
            value: None,
            value_span: None,
            unit: String::new(),
            rhs: String::new(),
        }
    }

    fn named(kind: LineKind, name: &str, rhs: &str) -> Self {
        Self {
            kind,
            name: Some(name.to_string()),
            value: None,
            value_span: None,
            unit: String::new(),
            rhs: rhs.to_string(),
        }
    }
}

/// 單行掃描結果
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedLine {
    /// 依出現順序排列的敘述（每個 `';'` 片段一個）
    pub statements: Vec<Statement>,

    /// 該行含有 `';'` 標記
    pub has_marker: bool,

    /// 該行含有註解
    pub has_comment: bool,

    /// 程式碼部分（註解之前）的位元組長度
    pub code_end: usize,
}

impl ScannedLine {
    /// 整行的類型：以第一個非空白敘述為準
    pub fn kind(&self) -> LineKind {
        match self.statements.iter().find(|s| s.kind != LineKind::Blank) {
            Some(statement) => statement.kind,
            None if self.has_comment => LineKind::Comment,
            None => LineKind::Blank,
        }
    }

    /// 該行若為單一計算方程式則回傳
    pub fn equation(&self) -> Option<EquationEntry> {
        if self.has_marker {
            return None;
        }
        match self.statements.as_slice() {
            [statement] if statement.kind == LineKind::Equation => {
                let lhs = statement.name.clone()?;
                Some(EquationEntry::new(lhs, statement.rhs.clone()))
            }
            _ => None,
        }
    }
}

/// 語法分類器
#[derive(Debug, Clone)]
pub struct SyntaxClassifier {
    unit_chars: HashSet<char>,
    unit_start: HashSet<char>,
    functions: HashSet<String>,
}

impl SyntaxClassifier {
    /// 僅以內建種子集建立
    pub fn new() -> Self {
        Self {
            unit_chars: SEED_UNIT_SYMBOLS.iter().copied().collect(),
            unit_start: UNIT_START_SYMBOLS.iter().copied().collect(),
            functions: SEED_FUNCTIONS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// 以擴充詞元資料建立
    pub fn with_config(config: &SyntaxConfig) -> Self {
        let mut classifier = Self::new();

        for c in config.extra_unit_chars.chars().filter(|c| !c.is_whitespace()) {
            classifier.unit_chars.insert(c);
            if !OPERATORS.contains(&c) && !c.is_ascii_digit() {
                classifier.unit_start.insert(c);
            }
        }

        classifier.functions.extend(
            config
                .extra_functions
                .iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty()),
        );

        classifier
    }

    /// 全程序共用的預設分類器
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    pub fn is_unit_char(&self, c: char) -> bool {
        c.is_alphanumeric() || self.unit_chars.contains(&c)
    }

    pub fn is_unit_start(&self, c: char) -> bool {
        c.is_alphabetic() || self.unit_start.contains(&c)
    }

    pub fn is_known_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    /// 從字串開頭取單位詞元的位元組長度；開頭不是單位時回傳 0
    pub fn unit_len(&self, s: &str) -> usize {
        let Some(first) = s.chars().next() else {
            return 0;
        };
        if !self.is_unit_start(first) {
            return 0;
        }

        let mut end = 0;
        let mut prev = '\0';
        for (i, c) in s.char_indices() {
            let accepted = i == 0 || self.is_unit_char(c) || (c == '-' && prev == '^');
            if !accepted {
                break;
            }
            end = i + c.len_utf8();
            prev = c;
        }

        while let Some(last) = s[..end].chars().last() {
            if UNIT_TRAILING_OPERATORS.contains(&last) {
                end -= last.len_utf8();
            } else {
                break;
            }
        }
        end
    }

    /// 整段文字是否為單一單位詞元（空字串視為無單位）
    fn full_unit(&self, s: &str) -> Option<String> {
        if s.is_empty() {
            return Some(String::new());
        }
        (self.unit_len(s) == s.len()).then(|| s.to_string())
    }

    /// 右側運算式是否含有運算符號或已知函數呼叫
    pub fn is_expression(&self, rhs: &str) -> bool {
        rhs.chars().any(|c| OPERATORS.contains(&c)) || self.calls_known_function(rhs)
    }

    fn calls_known_function(&self, rhs: &str) -> bool {
        let mut rest = rhs;
        while let Some(start) = rest.find(is_identifier_start) {
            let candidate = &rest[start..];
            let len = candidate
                .find(|c: char| !is_identifier_char(c))
                .unwrap_or(candidate.len());
            let name = &candidate[..len];
            let after = candidate[len..].trim_start();
            if after.starts_with('(') && self.is_known_function(name) {
                return true;
            }
            rest = &candidate[len..];
        }
        false
    }

    /// 掃描單行（不含換行字元）
    pub fn scan_line(&self, line: &str) -> ScannedLine {
        let (segments, has_marker, has_comment) = split_segments(line);
        let code_end = segments.last().map(|r| r.end).unwrap_or(0);

        let statements = segments
            .into_iter()
            .enumerate()
            .map(|(index, range)| self.classify_segment(line, range, index > 0))
            .collect();

        ScannedLine {
            statements,
            has_marker,
            has_comment,
            code_end,
        }
    }

    /// 分類單一片段（便利函數）
    pub fn classify(&self, segment: &str) -> LineKind {
        self.scan_line(segment).kind()
    }

    fn classify_segment(&self, line: &str, range: Range<usize>, inline: bool) -> Statement {
        let text = &line[range.clone()];
        if text.trim().is_empty() {
            return Statement::unnamed(LineKind::Blank);
        }

        let assignments = assignment_positions(text);
        let [(eq, eq_len)] = assignments.as_slice() else {
            return Statement::unnamed(LineKind::Other);
        };

        let lhs = text[..*eq].trim();
        if !is_identifier(lhs) {
            return Statement::unnamed(LineKind::Other);
        }

        let rhs_start = range.start + eq + eq_len;
        self.classify_rhs(lhs, line, rhs_start..range.end, inline)
    }

    fn classify_rhs(
        &self,
        name: &str,
        line: &str,
        range: Range<usize>,
        inline: bool,
    ) -> Statement {
        let raw = &line[range.clone()];
        let body = raw.trim();
        let body_start = range.start + (raw.len() - raw.trim_start().len());
        let declaration_kind = if inline {
            LineKind::InlinePostfix
        } else {
            LineKind::Explicit
        };

        // ?{value}unit：大括號內的運算符號不影響分類
        if let Some(after_mark) = body.strip_prefix('?') {
            let inner = after_mark.trim_start();
            let inner_start = body_start + 1 + (after_mark.len() - inner.len());

            if let Some(braced) = inner.strip_prefix('{') {
                if let Some(close) = braced.find('}') {
                    let interior = &braced[..close];
                    let value_text = interior.trim();
                    let value_start = inner_start + 1 + (interior.len() - interior.trim_start().len());

                    if let Some(unit) = self.full_unit(braced[close + 1..].trim()) {
                        let mut statement = Statement::named(declaration_kind, name, body);
                        statement.value = parse_number(value_text);
                        statement.value_span = Some(value_start..value_start + value_text.len());
                        statement.unit = unit;
                        return statement;
                    }
                }
            } else if let Some(unit) = self.full_unit(inner) {
                let mut statement = Statement::named(declaration_kind, name, body);
                statement.unit = unit;
                return statement;
            }
        }

        let number = number_len(body);
        if number > 0 {
            if let Some(unit) = self.full_unit(body[number..].trim_start()) {
                let kind = if inline {
                    LineKind::InlinePostfix
                } else {
                    LineKind::Literal
                };
                let mut statement = Statement::named(kind, name, body);
                statement.value = parse_number(&body[..number]);
                statement.value_span = Some(body_start..body_start + number);
                statement.unit = unit;
                return statement;
            }
        }

        if self.is_expression(body) {
            return Statement::named(LineKind::Equation, name, body);
        }

        Statement::named(LineKind::Other, name, body)
    }

    /// 解析整份原始碼的變數宣告
    ///
    /// `explicit_only` 為 true 時略過字面值指派。重複宣告的名稱保留首次
    /// 出現的位置，數值與單位以最後一次為準。
    pub fn parse_variables(&self, text: &str, explicit_only: bool) -> ParsedVariables {
        let mut parsed = ParsedVariables::new();

        for line in text.lines() {
            for statement in self.scan_line(line).statements {
                let (Some(name), Some(value)) = (statement.name.as_deref(), statement.value) else {
                    continue;
                };
                let kind = match statement.kind {
                    LineKind::Explicit | LineKind::InlinePostfix => VarKind::Explicit,
                    LineKind::Literal if !explicit_only => VarKind::Literal,
                    _ => continue,
                };
                parsed.upsert(name, value, &statement.unit, kind);
            }
        }

        tracing::debug!(
            "解析變數宣告: {} 筆 (explicit_only = {})",
            parsed.len(),
            explicit_only
        );
        parsed
    }
}

impl Default for SyntaxClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// 以 `';'` 切分片段並截斷註解
///
/// `';'` 標記優先辨識，其中的引號不視為註解起始。
fn split_segments(line: &str) -> (Vec<Range<usize>>, bool, bool) {
    let mut segments = Vec::new();
    let mut has_marker = false;
    let mut has_comment = false;
    let mut start = 0;
    let mut end = line.len();
    let mut i = 0;

    while let Some(c) = line[i..].chars().next() {
        if line[i..].starts_with(INLINE_MARKER) {
            segments.push(start..i);
            i += INLINE_MARKER.len();
            start = i;
            has_marker = true;
            continue;
        }
        if matches!(c, '#' | '\'' | '"') {
            has_comment = true;
            end = i;
            break;
        }
        i += c.len_utf8();
    }

    segments.push(start..end);
    (segments, has_marker, has_comment)
}

fn is_equals(c: char) -> bool {
    c == '=' || c == '＝'
}

/// 指派用 `=` 的位置（排除 `==`、`<=`、`>=`、`!=`）
fn assignment_positions(s: &str) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    let mut positions = Vec::new();

    for (k, &(i, c)) in chars.iter().enumerate() {
        if !is_equals(c) {
            continue;
        }
        let prev = k.checked_sub(1).map(|p| chars[p].1);
        let next = chars.get(k + 1).map(|&(_, n)| n);
        if next.is_some_and(is_equals) {
            continue;
        }
        if prev.is_some_and(|p| is_equals(p) || matches!(p, '<' | '>' | '!' | '≤' | '≥')) {
            continue;
        }
        positions.push((i, c.len_utf8()));
    }
    positions
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '′' | '″')
}

/// 是否符合變數名稱語法
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => chars.all(is_identifier_char),
        _ => false,
    }
}

/// 從字串開頭取十進位數字（可帶正負號、小數與指數）的位元組長度
pub fn number_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i = 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return 0;
    }

    if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }

    i
}

/// 整段文字為單一數字時解析
fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() || number_len(s) != s.len() {
        return None;
    }
    s.parse::<f64>().ok()
}
