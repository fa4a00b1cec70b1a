//! Unique resource names for e2e runs

use rand::Rng;

const E2E_PREFIX: &str = "e2e";
const RAND_STRING_LENGTH: usize = 8;
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// `e2e-<test_prefix>-<rand_prefix>-<name>`
pub fn generate_e2e_name(name: &str, test_prefix: &str, rand_prefix: &str) -> String {
    format!("{E2E_PREFIX}-{test_prefix}-{rand_prefix}-{name}")
}

/// Eight random characters from `[a-z0-9]`, safe for DNS-1123 labels.
pub fn rand_str() -> String {
    let mut rng = rand::thread_rng();
    (0..RAND_STRING_LENGTH)
        .map(|_| char::from(CHARSET[rng.gen_range(0..CHARSET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_prefixed_name() {
        assert_eq!(
            generate_e2e_name("web", "rbac", "x1y2z3ab"),
            "e2e-rbac-x1y2z3ab-web"
        );
    }

    #[test]
    fn rand_str_is_dns_safe() {
        let s = rand_str();
        assert_eq!(s.len(), RAND_STRING_LENGTH);
        assert!(s.bytes().all(|b| CHARSET.contains(&b)));
    }

    #[test]
    fn rand_str_varies() {
        let samples: std::collections::HashSet<String> = (0..16).map(|_| rand_str()).collect();
        assert!(samples.len() > 1);
    }
}
