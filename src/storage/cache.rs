// 存储缓存层 - 仪表盘读取使用，按 TTL 缓存设置和记录

use super::repository::{CleaningRepository, SheetStatus};
use crate::models::{CleaningRecord, CleaningTypeSetting};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// 带过期时间的缓存项
struct TtlSlot<V: Clone> {
    value: Option<(V, Instant)>,
    ttl: Duration,
}

impl<V: Clone> TtlSlot<V> {
    fn new(ttl: Duration) -> Self {
        Self { value: None, ttl }
    }

    fn get(&self) -> Option<V> {
        match &self.value {
            Some((value, stored_at)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    fn put(&mut self, value: V) {
        self.value = Some((value, Instant::now()));
    }

    fn clear(&mut self) {
        self.value = None;
    }
}

/// 带缓存的存储包装器
///
/// 只缓存列表读取；任何写入都会清空缓存。语音路径不经过此包装器。
pub struct CachedRepository {
    /// 底层存储
    inner: Arc<dyn CleaningRepository>,
    settings_cache: RwLock<TtlSlot<Vec<CleaningTypeSetting>>>,
    records_cache: RwLock<TtlSlot<Vec<CleaningRecord>>>,
    /// 每次清空加一；读取期间发生清空时，读到的结果不写回缓存
    generation: AtomicU64,
}

impl CachedRepository {
    /// 创建新的缓存存储
    pub fn new(inner: Arc<dyn CleaningRepository>, ttl: Duration) -> Self {
        Self {
            inner,
            settings_cache: RwLock::new(TtlSlot::new(ttl)),
            records_cache: RwLock::new(TtlSlot::new(ttl)),
            generation: AtomicU64::new(0),
        }
    }

    /// 清空所有缓存
    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.settings_cache.write().await.clear();
        self.records_cache.write().await.clear();
        debug!("仪表盘缓存已清空");
    }
}

#[async_trait]
impl CleaningRepository for CachedRepository {
    async fn ensure_records_sheet(&self) -> Result<SheetStatus> {
        let status = self.inner.ensure_records_sheet().await?;
        if status == SheetStatus::Created {
            self.invalidate().await;
        }
        Ok(status)
    }

    async fn ensure_settings_sheet(&self) -> Result<SheetStatus> {
        let status = self.inner.ensure_settings_sheet().await?;
        if status == SheetStatus::Created {
            self.invalidate().await;
        }
        Ok(status)
    }

    async fn list_settings(&self) -> Result<Vec<CleaningTypeSetting>> {
        // 先检查缓存
        if let Some(settings) = self.settings_cache.read().await.get() {
            return Ok(settings);
        }

        // 缓存未命中，从底层读取
        let generation = self.generation.load(Ordering::SeqCst);
        let settings = self.inner.list_settings().await?;
        let mut slot = self.settings_cache.write().await;
        if self.generation.load(Ordering::SeqCst) == generation {
            slot.put(settings.clone());
        } else {
            debug!("读取期间缓存被清空，不写回掃除種別設定");
        }
        Ok(settings)
    }

    async fn save_schedule(&self, setting: &CleaningTypeSetting) -> Result<()> {
        let result = self.inner.save_schedule(setting).await;
        self.invalidate().await;
        result
    }

    async fn append_record(&self, record: &CleaningRecord) -> Result<()> {
        let result = self.inner.append_record(record).await;
        self.invalidate().await;
        result
    }

    async fn list_records(&self) -> Result<Vec<CleaningRecord>> {
        if let Some(records) = self.records_cache.read().await.get() {
            return Ok(records);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let records = self.inner.list_records().await?;
        let mut slot = self.records_cache.write().await;
        if self.generation.load(Ordering::SeqCst) == generation {
            slot.put(records.clone());
        } else {
            debug!("读取期间缓存被清空，不写回掃除記録");
        }
        Ok(records)
    }

    fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_cleaning_settings;
    use crate::storage::MemoryRepository;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// 第一次读取记录后停住，等待测试放行
    struct GatedRepository {
        inner: MemoryRepository,
        gate: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
    }

    #[async_trait]
    impl CleaningRepository for GatedRepository {
        async fn ensure_records_sheet(&self) -> Result<SheetStatus> {
            self.inner.ensure_records_sheet().await
        }

        async fn ensure_settings_sheet(&self) -> Result<SheetStatus> {
            self.inner.ensure_settings_sheet().await
        }

        async fn list_settings(&self) -> Result<Vec<CleaningTypeSetting>> {
            self.inner.list_settings().await
        }

        async fn save_schedule(&self, setting: &CleaningTypeSetting) -> Result<()> {
            self.inner.save_schedule(setting).await
        }

        async fn append_record(&self, record: &CleaningRecord) -> Result<()> {
            self.inner.append_record(record).await
        }

        async fn list_records(&self) -> Result<Vec<CleaningRecord>> {
            let records = self.inner.list_records().await?;
            let gate = self.gate.lock().unwrap().take();
            if let Some((entered, release)) = gate {
                let _ = entered.send(());
                let _ = release.await;
            }
            Ok(records)
        }

        fn backend_name(&self) -> &str {
            "gated"
        }
    }

    fn at_noon() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_are_cached_until_ttl() {
        let inner = Arc::new(MemoryRepository::new(default_cleaning_settings()));
        let cached = CachedRepository::new(inner.clone(), Duration::from_secs(300));

        assert!(cached.list_records().await.unwrap().is_empty());

        // 绕过缓存直接写入底层
        inner
            .append_record(&CleaningRecord::voice("床掃除", at_noon()))
            .await
            .unwrap();
        assert!(cached.list_records().await.unwrap().is_empty());

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(cached.list_records().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_invalidate() {
        let inner = Arc::new(MemoryRepository::new(default_cleaning_settings()));
        let cached = CachedRepository::new(inner, Duration::from_secs(300));

        assert!(cached.list_records().await.unwrap().is_empty());
        cached
            .append_record(&CleaningRecord::voice("床掃除", at_noon()))
            .await
            .unwrap();
        assert_eq!(cached.list_records().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_invalidate() {
        let inner = Arc::new(MemoryRepository::new(default_cleaning_settings()));
        let cached = CachedRepository::new(inner.clone(), Duration::from_secs(300));

        let before = cached.list_settings().await.unwrap();
        let updated = before[0].clone().with_last_done(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        inner.save_schedule(&updated).await.unwrap();

        assert_eq!(cached.list_settings().await.unwrap(), before);
        cached.invalidate().await;
        assert_eq!(cached.list_settings().await.unwrap()[0], updated);
    }

    #[tokio::test]
    async fn test_invalidate_during_read_is_not_overwritten() {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let inner = Arc::new(GatedRepository {
            inner: MemoryRepository::new(default_cleaning_settings()),
            gate: Mutex::new(Some((entered_tx, release_rx))),
        });
        let cached = Arc::new(CachedRepository::new(inner, Duration::from_secs(300)));

        let reader = {
            let cached = cached.clone();
            tokio::spawn(async move { cached.list_records().await })
        };
        entered_rx.await.unwrap();

        // 旧数据已读出但尚未写回时发生写入
        cached
            .append_record(&CleaningRecord::voice("床掃除", at_noon()))
            .await
            .unwrap();
        release_tx.send(()).unwrap();

        assert!(reader.await.unwrap().unwrap().is_empty());
        assert_eq!(cached.list_records().await.unwrap().len(), 1);
    }
}
