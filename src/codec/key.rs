//! Key successors for paged scans

/// Smallest key strictly greater than `key`
pub fn successor_of_key(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0x00);
    next
}

/// Smallest key greater than every key starting with `prefix`. `None` when
/// no such key exists (empty or all-0xFF prefix).
pub fn successor_of_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let end = prefix.iter().rposition(|&b| b != 0xFF)?;
    let mut next = prefix[..=end].to_vec();
    next[end] += 1;
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successor_of_key() {
        assert_eq!(successor_of_key(b"ab"), b"ab\x00".to_vec());
        assert!(successor_of_key(b"ab").as_slice() > b"ab".as_slice());
    }

    #[test]
    fn test_successor_of_prefix() {
        assert_eq!(successor_of_prefix(&[1, 2, 3]), Some(vec![1, 2, 4]));
        assert_eq!(successor_of_prefix(&[1, 0xFF, 0xFF]), Some(vec![2]));
        assert_eq!(successor_of_prefix(&[0xFF, 0xFF]), None);
        assert_eq!(successor_of_prefix(&[]), None);
    }
}
