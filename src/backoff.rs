use std::time::Duration;

/// Delay before retry number `attempt` (0-based): `base * 2^attempt`,
/// saturating at `cap`. Pure so the growth curve can be tested without
/// sleeping.
pub fn delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let shift = attempt.min(16);
    base.checked_mul(1u32 << shift)
        .map(|d| d.min(cap))
        .unwrap_or(cap)
}
