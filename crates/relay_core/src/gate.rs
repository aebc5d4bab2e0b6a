/// Outcome of the time gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Newer than anything accepted before, or nothing accepted yet.
    New,
    /// Not newer, but the caller asked to send anyway.
    Forced { last_observed_at: i64 },
    /// Not newer than `last_observed_at`; the run stops here.
    Stale { last_observed_at: i64 },
}

pub fn freshness(last_observed_at: Option<i64>, observed_at: i64, force: bool) -> Freshness {
    match last_observed_at {
        Some(last) if observed_at <= last => {
            if force {
                Freshness::Forced {
                    last_observed_at: last,
                }
            } else {
                Freshness::Stale {
                    last_observed_at: last,
                }
            }
        }
        _ => Freshness::New,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCheck {
    Changed,
    Unchanged,
}

/// Byte-for-byte comparison of field-encoding strings.
pub fn content_check(previous: Option<&str>, current: &str) -> ContentCheck {
    match previous {
        Some(prev) if prev == current => ContentCheck::Unchanged,
        _ => ContentCheck::Changed,
    }
}
