use async_trait::async_trait;

/// External-service-reported request allowance: `allowance` requests per
/// `window_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub allowance: u32,
    pub window_seconds: u32,
}

impl Quota {
    /// Sentinel used when the live quota is unavailable or unauthorized.
    pub const FALLBACK: Quota = Quota {
        allowance: 5,
        window_seconds: 1,
    };

    pub fn is_valid(&self) -> bool {
        self.allowance > 0 && self.window_seconds > 0
    }
}

/// Source of the live quota descriptor.
#[async_trait]
pub trait QuotaSource: Send + Sync {
    /// Fetch the live quota. Implementations degrade to
    /// [`Quota::FALLBACK`] instead of failing.
    async fn fetch_quota(&self) -> Quota;
}
