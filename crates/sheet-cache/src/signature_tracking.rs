//! 問題簽章追蹤

/// 簽章比對結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureChange {
    /// 與目前簽章相同
    Unchanged,
    /// 簽章不同（或第一次設定），緩存與歷史需清除
    Changed,
}

impl SignatureChange {
    pub fn is_changed(&self) -> bool {
        *self == SignatureChange::Changed
    }
}

/// 簽章追蹤器
#[derive(Debug, Clone, Default)]
pub struct SignatureTracker {
    current: Option<String>,
    change_count: usize,
}

impl SignatureTracker {
    /// 創建新的追蹤器
    pub fn new() -> Self {
        Self::default()
    }

    /// 比對新簽章，不同時取代目前簽章
    pub fn update(&mut self, signature: &str) -> SignatureChange {
        if self.current.as_deref() == Some(signature) {
            return SignatureChange::Unchanged;
        }

        if self.current.is_some() {
            tracing::debug!("問題簽章變更，舊簽章作廢");
        }
        self.current = Some(signature.to_string());
        self.change_count += 1;
        SignatureChange::Changed
    }

    /// 目前簽章
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// 簽章被設定或變更的次數
    pub fn change_count(&self) -> usize {
        self.change_count
    }

    /// 清除目前簽章
    pub fn clear(&mut self) {
        self.current = None;
    }
}
