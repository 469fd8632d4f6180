//! 32-bit FNV-1 hash used for function fingerprints.
//!
//! Integers are folded as 4 little-endian bytes and numbers as the 8
//! little-endian bytes of their IEEE-754 representation, so fingerprints do
//! not depend on the host.

/// Running FNV-1 state. Seeded with 0 rather than the FNV offset basis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fnv1(u32);

impl Fnv1 {
    pub fn new() -> Self {
        Fnv1(0)
    }

    /// Fold bytes into the hash, left to right.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            // h * 16777619, spelled as the shift sum of the FNV prime.
            let h = self.0;
            self.0 = h
                .wrapping_add(h << 1)
                .wrapping_add(h << 4)
                .wrapping_add(h << 7)
                .wrapping_add(h << 8)
                .wrapping_add(h << 24)
                ^ u32::from(b);
        }
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Current hash value.
    pub fn finish(&self) -> u32 {
        self.0
    }
}

/// Hash a byte slice from a zero seed.
pub fn fnv1_32(bytes: &[u8]) -> u32 {
    let mut h = Fnv1::new();
    h.write(bytes);
    h.finish()
}
