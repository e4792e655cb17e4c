//! Stable 32-bit target identity.
//!
//! Targets are identified across processes (logs, failover history) by the
//! CRC-32 (IEEE 802.3, reflected, polynomial `0xEDB88320`) of the UTF-8
//! bytes of their address string. The value never depends on process state,
//! so it is stable across restarts and hosts.

/// Computes the checksum of an address string.
///
/// # Example
///
/// ```
/// use relay_descriptor::checksum;
///
/// assert_eq!(checksum("123456789"), 0xCBF4_3926);
/// ```
pub fn checksum(address: &str) -> u32 {
    crc32fast::hash(address.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_known_check_value() {
        assert_eq!(checksum("123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(checksum(""), 0);
    }

    #[test]
    fn test_pinned_address() {
        // Published CRC-32 of the ASCII pangram
        assert_eq!(
            checksum("The quick brown fox jumps over the lazy dog"),
            0x414F_A339
        );
    }

    #[test]
    fn test_deterministic() {
        let addr = "10.0.0.1:9001";
        assert_eq!(checksum(addr), checksum(addr));
        assert_eq!(checksum(addr), checksum(&addr.to_string()));
    }

    #[test]
    fn test_no_collisions_in_address_corpus() {
        let corpus: Vec<String> = (0..64)
            .flat_map(|host| {
                (9000..9016).map(move |port| format!("10.0.{}.{}:{}", host / 8, host, port))
            })
            .chain((0..256).map(|i| format!("http://service-{}.internal/api", i)))
            .collect();

        let checksums: HashSet<u32> = corpus.iter().map(|a| checksum(a)).collect();
        assert_eq!(checksums.len(), corpus.len(), "checksum collision in corpus");
    }

    #[test]
    fn test_case_sensitive() {
        assert_ne!(checksum("Host:80"), checksum("host:80"));
    }
}
