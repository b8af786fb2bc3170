//! 外部計算引擎介面

/// 計算引擎回傳的錯誤
pub type RenderError = Box<dyn std::error::Error + Send + Sync>;

/// 外部計算引擎：將計算書原始碼渲染為標記文字
///
/// 呼叫為同步執行；若引擎需要隔離（不可重入、執行緒綁定），由實作端負責。
pub trait Renderer: Send {
    fn render(&self, source: &str) -> Result<String, RenderError>;
}

impl<F, E> Renderer for F
where
    F: Fn(&str) -> Result<String, E> + Send,
    E: Into<RenderError>,
{
    fn render(&self, source: &str) -> Result<String, RenderError> {
        self(source).map_err(Into::into)
    }
}
