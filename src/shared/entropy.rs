use std::collections::HashMap;

/// Shannon entropy in bits/byte over the given content.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<u8, u64> = HashMap::new();
    for &b in data {
        *counts.entry(b).or_insert(0) += 1;
    }

    let len = data.len() as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_byte_has_zero_entropy() {
        let data = vec![b'a'; 1000];
        assert_eq!(shannon_entropy(&data), 0.0);
    }

    #[test]
    fn random_looking_bytes_have_high_entropy() {
        let data: Vec<u8> = (0u32..=255).map(|b| b as u8).collect();
        let entropy = shannon_entropy(&data);
        assert!(entropy > 7.9, "expected near-max entropy, got {entropy}");
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(shannon_entropy(&[]), 0.0);
    }
}
