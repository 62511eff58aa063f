//! Fixed per-currency pricing for the single paid plan.
//!
//! Currency detection heuristics live upstream; this module only resolves an
//! optional preferred currency against the supported set.

/// (currency code, price in minor units) for one 30-day window.
pub const FIXED_PRICING: [(&str, i64); 3] = [("NGN", 140_000), ("USD", 400), ("GBP", 300)];

pub const DEFAULT_CURRENCY: &str = "USD";

pub fn price_for_currency(currency: &str) -> Option<i64> {
    FIXED_PRICING
        .iter()
        .find(|(code, _)| *code == currency)
        .map(|(_, cents)| *cents)
}

/// Resolve an optional preferred currency to a supported (currency, amount)
/// pair, falling back to the default for anything unknown.
pub fn resolve_currency(preferred: Option<&str>) -> (&'static str, i64) {
    if let Some(raw) = preferred {
        let upper = raw.trim().to_uppercase();
        if let Some((code, cents)) = FIXED_PRICING.iter().find(|(code, _)| *code == upper) {
            return (*code, *cents);
        }
    }
    (
        DEFAULT_CURRENCY,
        price_for_currency(DEFAULT_CURRENCY).expect("default currency is priced"),
    )
}
