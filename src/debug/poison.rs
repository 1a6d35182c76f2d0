//! Memory poisoning for simulated device memory.
//!
//! Fresh allocations are filled with a known pattern so code that assumes
//! device memory starts zeroed shows up in tests.

/// Pattern written into freshly allocated, not yet uploaded memory.
pub const UNINIT_PATTERN: u8 = 0xAB;

/// Fill a block with the uninitialized pattern.
pub fn poison_uninit(block: &mut [u8]) {
    block.fill(UNINIT_PATTERN);
}

/// Whether every byte of `block` still carries the uninitialized pattern.
pub fn is_uninit_poison(block: &[u8]) -> bool {
    block.iter().all(|&b| b == UNINIT_PATTERN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poison_roundtrip() {
        let mut block = vec![0u8; 64];
        assert!(!is_uninit_poison(&block));
        poison_uninit(&mut block);
        assert!(is_uninit_poison(&block));
        block[10] = 0;
        assert!(!is_uninit_poison(&block));
    }
}
