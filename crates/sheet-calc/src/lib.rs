//! # Sheet Calculation Engine
//!
//! 計算書語法分類、變數代換、渲染與結果擷取

pub mod extract;
pub mod lines;
pub mod markup;
pub mod normalize;
pub mod preprocess;
pub mod render;
pub mod sheet;
pub mod syntax;

// Re-export 主要類型
pub use markup::markup_to_text;
pub use normalize::normalize_text;
pub use render::{RenderError, Renderer};
pub use sheet::{Sheet, SheetState, SubstitutionReport};
pub use syntax::{LineKind, SyntaxClassifier, INLINE_MARKER};

use sheet_core::ParsedVariables;

/// 以共用分類器解析變數宣告
pub fn parse_variables(text: &str, explicit_only: bool) -> ParsedVariables {
    SyntaxClassifier::shared().parse_variables(text, explicit_only)
}
