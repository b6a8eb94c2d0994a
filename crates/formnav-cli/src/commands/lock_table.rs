use anyhow::{Result, anyhow};
use formnav_core::config::NavigatorConfig;
use formnav_infrastructure::LockRegistry;
use std::collections::BTreeMap;

/// Accepts decimal or `0x`-prefixed hex.
pub fn parse_mask(value: &str) -> Result<u32> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| anyhow!("invalid mask '{}': {}", value, e))
}

/// Groups keys by bucket, in bucket order.
pub fn placements<'a>(registry: &LockRegistry, keys: &'a [String]) -> BTreeMap<usize, Vec<&'a str>> {
    let mut buckets: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for key in keys {
        let slot = buckets.entry(registry.bucket_index(key)).or_default();
        if !slot.contains(&key.as_str()) {
            slot.push(key);
        }
    }
    buckets
}

pub fn show(config: &NavigatorConfig, mask: Option<u32>, keys: &[String]) -> Result<()> {
    let lock = &config.lock;
    let registry = LockRegistry::with_settings(
        mask.unwrap_or(lock.mask),
        lock.lock_duration(),
        lock.eviction_grace(),
    )?;

    println!(
        "mask {:#x}, {} buckets, locks expire after {}s",
        registry.mask(),
        registry.bucket_count(),
        lock.lock_duration_secs
    );
    let mut collisions = 0;
    for (bucket, keys) in placements(&registry, keys) {
        let marker = if keys.len() > 1 {
            collisions += 1;
            "  <- shared lock"
        } else {
            ""
        };
        println!("  bucket {:>6}: {}{}", bucket, keys.join(", "), marker);
    }
    if collisions > 0 {
        println!("{} bucket(s) shared by more than one session", collisions);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_mask() {
        assert_eq!(parse_mask("0xFF").unwrap(), 255);
        assert_eq!(parse_mask("65535").unwrap(), 0xFFFF);
        assert!(parse_mask("0xZZ").is_err());
    }

    #[test]
    fn test_single_bucket_groups_everything() {
        let registry =
            LockRegistry::with_settings(0, Duration::from_secs(1), Duration::from_secs(1)).unwrap();
        let keys = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let placed = placements(&registry, &keys);
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[&0], vec!["a", "b"]);
    }
}
