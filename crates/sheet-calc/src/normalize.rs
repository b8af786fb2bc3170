//! 文字正規化

/// 正規化渲染輸出文字
///
/// - 各種 Unicode 空白轉為 ASCII 空白，連續的水平空白合併為一個
/// - `\r\n`、`\r` 與 Unicode 行分隔符號統一為 `\n`
/// - 全形等號 `＝` 轉為 `=`
///
/// 重複套用結果不變。
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_space = false;

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
                in_space = false;
            }
            '\n' | '\u{0085}' | '\u{2028}' | '\u{2029}' => {
                out.push('\n');
                in_space = false;
            }
            c if c.is_whitespace() => {
                if !in_space {
                    out.push(' ');
                    in_space = true;
                }
            }
            '＝' => {
                out.push('=');
                in_space = false;
            }
            c => {
                out.push(c);
                in_space = false;
            }
        }
    }

    out
}
