//! 渲染前處理：單位別名代換

use std::collections::HashSet;

use sheet_core::UnitAlias;

use crate::syntax::SyntaxClassifier;

/// 將計算引擎不認得的單位別名展開
///
/// 只處理註解之前的程式碼部分，且只在單位位置代換：緊接數字字面
/// （`5kgf`、`5 tf`）或 `?{…}` 的右大括號之後。別名後方不能接字母、數字
/// 或底線，較長的別名優先比對。與原始碼中任何宣告名稱同名的別名整份
/// 略過，識別字與等號左側不會被改寫。
pub fn substitute_unit_aliases(
    source: &str,
    aliases: &[UnitAlias],
    classifier: &SyntaxClassifier,
) -> String {
    let scanned: Vec<_> = source
        .split_inclusive('\n')
        .map(|line| (line, classifier.scan_line(line)))
        .collect();

    let declared: HashSet<&str> = scanned
        .iter()
        .flat_map(|(_, line)| line.statements.iter())
        .filter_map(|statement| statement.name.as_deref())
        .collect();

    let mut ordered: Vec<&UnitAlias> = aliases
        .iter()
        .filter(|a| !a.alias.is_empty() && !declared.contains(a.alias.as_str()))
        .collect();
    if ordered.is_empty() {
        return source.to_string();
    }
    ordered.sort_by(|a, b| {
        b.alias
            .len()
            .cmp(&a.alias.len())
            .then_with(|| a.alias.cmp(&b.alias))
    });

    let mut out = String::with_capacity(source.len());
    for (line, scanned_line) in &scanned {
        let code_end = scanned_line.code_end;
        out.push_str(&replace_units(&line[..code_end], &ordered));
        out.push_str(&line[code_end..]);
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

/// 位置 `i` 是否為單位位置
fn in_unit_position(code: &str, i: usize) -> bool {
    let before = code[..i].trim_end_matches([' ', '\t']);

    if let Some(inner) = before.strip_suffix('}') {
        return inner
            .rfind('{')
            .is_some_and(|open| inner[..open].trim_end().ends_with('?'));
    }

    // 前一個詞元必須是數字字面，`x2` 之類的識別字不算
    let token_start = before
        .char_indices()
        .rev()
        .find(|&(_, c)| !(is_word_char(c) || c == '.'))
        .map(|(p, c)| p + c.len_utf8())
        .unwrap_or(0);
    let token = &before[token_start..];

    token.starts_with(is_number_char) && token.ends_with(is_number_char)
}

fn replace_units(code: &str, aliases: &[&UnitAlias]) -> String {
    let mut out = String::with_capacity(code.len());
    let mut i = 0;

    while let Some(c) = code[i..].chars().next() {
        if in_unit_position(code, i) {
            let matched = aliases.iter().find(|a| {
                code[i..].starts_with(a.alias.as_str())
                    && !code[i + a.alias.len()..]
                        .chars()
                        .next()
                        .is_some_and(is_word_char)
            });
            if let Some(alias) = matched {
                out.push_str(&alias.expansion);
                i += alias.alias.len();
                continue;
            }
        }
        out.push(c);
        i += c.len_utf8();
    }

    out
}
