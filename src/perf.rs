// ==========================================
// 需求冲减引擎 - 性能统计
// ==========================================
// 线程内计数: 分配台账每完成一次数量转移计一次
// PerfGuard 在析构时输出 elapsed_ms 与期间的转移次数
// ==========================================

use std::cell::Cell;
use std::time::Instant;

thread_local! {
    static PERF_DEPTH: Cell<u32> = Cell::new(0);
    static TRANSFER_COUNT: Cell<u64> = Cell::new(0);
}

/// 记录一次数量转移（由分配台账调用）
pub fn record_transfer() {
    let active = PERF_DEPTH.with(|d| d.get() > 0);
    if active {
        TRANSFER_COUNT.with(|c| c.set(c.get().saturating_add(1)));
    }
}

/// 当前线程累计转移次数
pub fn transfer_count() -> u64 {
    TRANSFER_COUNT.with(|c| c.get())
}

/// 阶段性能统计 Guard：记录 elapsed_ms + 转移次数
///
/// 使用方式：
/// ```ignore
/// let _perf = demand_netting::perf::PerfGuard::new("rtf_net");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    transfer_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        PERF_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            op,
            start: Instant::now(),
            transfer_start: transfer_count(),
        }
    }

    /// 自创建以来的转移次数
    pub fn transfers(&self) -> u64 {
        transfer_count().saturating_sub(self.transfer_start)
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let transfers = self.transfers();

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            transfers,
            "done"
        );

        PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfers_counted_only_inside_guard() {
        record_transfer();
        let guard = PerfGuard::new("test");
        record_transfer();
        record_transfer();
        assert_eq!(guard.transfers(), 2);
    }
}
