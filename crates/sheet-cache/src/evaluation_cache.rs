//! 評估緩存
//!
//! 以緩存鍵對應設計變數向量的評估結果；命中時不需重新渲染計算書。
//! 設定上限時依插入順序淘汰最早的項目。

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 單次評估的結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: Uuid,

    /// 設計變數數值
    pub input_vector: Vec<f64>,

    /// 總適應值
    pub fitness: f64,

    /// 各目標函數值（順序同目標函數名稱）
    pub objectives: Vec<f64>,

    /// 評估序號（自 1 起算）
    pub iteration: usize,

    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    /// 創建新的評估結果
    pub fn new(
        input_vector: Vec<f64>,
        fitness: f64,
        objectives: Vec<f64>,
        iteration: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_vector,
            fitness,
            objectives,
            iteration,
            timestamp: Utc::now(),
        }
    }
}

/// 緩存統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

impl CacheStats {
    /// 命中率（尚無查詢時為 0）
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// 評估緩存
#[derive(Debug, Clone, Default)]
pub struct EvaluationCache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    capacity: Option<usize>,
    hits: usize,
    misses: usize,
}

impl EvaluationCache {
    /// 創建空的緩存（不限筆數）
    pub fn new() -> Self {
        Self::default()
    }

    /// 創建有筆數上限的緩存；`None` 表示不限
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// 查詢緩存並記錄命中統計
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits += 1;
                tracing::debug!("緩存命中：第 {} 次評估的結果", entry.iteration);
                Some(entry)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// 查詢但不影響統計
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// 插入項目；已達上限時先淘汰最早插入的項目
    pub fn insert(&mut self, key: String, entry: CacheEntry) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key, entry);
            return;
        }

        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity.max(1) {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                if let Some(evicted) = self.entries.remove(&oldest) {
                    tracing::debug!("緩存已滿，淘汰第 {} 次評估的結果", evicted.iteration);
                }
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, entry);
    }

    /// 清除所有項目（統計保留）
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!("清除評估緩存：{} 筆", self.entries.len());
        }
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fitness: f64, iteration: usize) -> CacheEntry {
        CacheEntry::new(vec![1.0, 2.0], fitness, vec![fitness], iteration)
    }

    #[test]
    fn test_get_and_insert() {
        let mut cache = EvaluationCache::new();
        assert!(cache.get("k").is_none());

        cache.insert("k".to_string(), entry(3.5, 1));
        let hit = cache.get("k").unwrap();
        assert_eq!(hit.fitness, 3.5);
        assert_eq!(hit.iteration, 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_peek_does_not_count() {
        let mut cache = EvaluationCache::new();
        cache.insert("k".to_string(), entry(1.0, 1));

        assert!(cache.peek("k").is_some());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_clear() {
        let mut cache = EvaluationCache::new();
        cache.insert("a".to_string(), entry(1.0, 1));
        cache.insert("b".to_string(), entry(2.0, 2));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.peek("a").is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut cache = EvaluationCache::with_capacity(Some(2));
        cache.insert("a".to_string(), entry(1.0, 1));
        cache.insert("b".to_string(), entry(2.0, 2));
        cache.insert("c".to_string(), entry(3.0, 3));

        assert_eq!(cache.len(), 2);
        assert!(cache.peek("a").is_none());
        assert_eq!(cache.peek("b").map(|e| e.fitness), Some(2.0));
        assert_eq!(cache.peek("c").map(|e| e.fitness), Some(3.0));
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let mut cache = EvaluationCache::with_capacity(Some(2));
        cache.insert("a".to_string(), entry(1.0, 1));
        cache.insert("b".to_string(), entry(2.0, 2));
        cache.insert("b".to_string(), entry(5.0, 3));

        assert_eq!(cache.len(), 2);
        assert!(cache.peek("a").is_some());
        assert_eq!(cache.peek("b").map(|e| e.fitness), Some(5.0));

        // 重新插入不改變淘汰順序
        cache.insert("c".to_string(), entry(3.0, 4));
        assert!(cache.peek("a").is_none());
        assert!(cache.peek("b").is_some());
    }

    #[test]
    fn test_unbounded_by_default() {
        let mut cache = EvaluationCache::new();
        for i in 0..100 {
            cache.insert(format!("k{}", i), entry(i as f64, i + 1));
        }
        assert_eq!(cache.capacity(), None);
        assert_eq!(cache.len(), 100);
    }

    #[test]
    fn test_entries_have_distinct_ids() {
        let a = entry(1.0, 1);
        let b = entry(1.0, 1);
        assert_ne!(a.id, b.id);
        assert!(a.timestamp <= Utc::now());
    }

    #[test]
    fn test_entry_serializes() {
        let json = serde_json::to_string(&entry(1.5, 4)).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fitness, 1.5);
        assert_eq!(back.iteration, 4);
    }

    #[test]
    fn test_hit_rate_without_queries() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
