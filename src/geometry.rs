use std::error::Error;
use std::fmt;

/// Logical left shift that yields zero instead of overflowing when the
/// shift amount reaches or exceeds the operand width.
pub(crate) fn shl(value: u64, amount: u32) -> u64 {
    if amount >= u64::BITS { 0 } else { value << amount }
}

/// Logical right shift with the same full-width guard as [`shl`].
pub(crate) fn shr(value: u64, amount: u32) -> u64 {
    if amount >= u64::BITS { 0 } else { value >> amount }
}

fn log2(x: u64) -> u32 {
    if x <= 1 { 0 } else { x.ilog2() }
}

#[derive(Debug, PartialEq, Eq)]
pub enum GeometryError {
    NotPowerOfTwo { field: &'static str, value: u64 },
    ZeroAssociativity { sets: u64 },
    AddressWidthTooSmall { addr_bits: u32, needed: u32 },
    UnsupportedAddressWidth(u32),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::NotPowerOfTwo { field, value } => {
                write!(f, "invalid geometry: {} must be a power of two, got {}", field, value)
            }
            GeometryError::ZeroAssociativity { sets } => {
                write!(f, "invalid geometry: associativity is zero but the level has {} sets", sets)
            }
            GeometryError::AddressWidthTooSmall { addr_bits, needed } => {
                write!(
                    f,
                    "invalid geometry: offset and index need {} bits but addresses are {} bits wide",
                    needed, addr_bits
                )
            }
            GeometryError::UnsupportedAddressWidth(bits) => {
                write!(f, "invalid geometry: address width must be 1..=64 bits, got {}", bits)
            }
        }
    }
}

impl Error for GeometryError {}

/// Derived bit-field layout of one cache level.
///
/// `sets == 0` marks an absent level: every access passes straight through
/// to the next level and the widths are all zero-sized placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub sets: u64,
    pub assoc: u64,
    pub block_size: u64,
    pub addr_bits: u32,
    pub offset_bits: u32,
    pub index_bits: u32,
    pub tag_bits: u32,
}

impl Geometry {
    /// Turn raw level parameters into bit-field widths, failing fast on a
    /// layout that would silently truncate (the source of this model left
    /// that behavior undefined).
    pub fn resolve(
        sets: u64,
        assoc: u64,
        block_size: u64,
        addr_bits: u32,
    ) -> Result<Self, GeometryError> {
        if addr_bits == 0 || addr_bits > 64 {
            return Err(GeometryError::UnsupportedAddressWidth(addr_bits));
        }
        if sets != 0 && !sets.is_power_of_two() {
            return Err(GeometryError::NotPowerOfTwo { field: "sets", value: sets });
        }
        if block_size != 0 && !block_size.is_power_of_two() {
            return Err(GeometryError::NotPowerOfTwo { field: "block size", value: block_size });
        }
        if sets > 0 && assoc == 0 {
            return Err(GeometryError::ZeroAssociativity { sets });
        }

        let offset_bits = log2(block_size);
        let index_bits = log2(sets);
        if offset_bits + index_bits > addr_bits {
            return Err(GeometryError::AddressWidthTooSmall {
                addr_bits,
                needed: offset_bits + index_bits,
            });
        }
        let tag_bits = addr_bits - offset_bits - index_bits;

        Ok(Geometry { sets, assoc, block_size, addr_bits, offset_bits, index_bits, tag_bits })
    }

    pub fn is_absent(&self) -> bool {
        self.sets == 0
    }

    fn addr_mask(&self) -> u64 {
        if self.addr_bits >= 64 { u64::MAX } else { (1u64 << self.addr_bits) - 1 }
    }

    /// Split an address into its (tag, set index) parts for this level.
    ///
    /// The shifts operate in the `addr_bits`-wide domain: bits shifted past
    /// the address width are discarded before shifting back down, and a
    /// shift spanning the full width yields zero.
    pub fn decompose(&self, addr: u64) -> (u64, usize) {
        let addr = addr & self.addr_mask();
        let tag = shr(addr, self.addr_bits - self.tag_bits);
        let index = shr(
            shl(addr, self.tag_bits) & self.addr_mask(),
            self.addr_bits - self.index_bits,
        );
        (tag, index as usize)
    }

    /// Rebuild the block-aligned address a (tag, set index) pair came from.
    /// The offset bits are unrecoverable and come back zero-filled, which is
    /// all inclusion invalidation needs.
    pub fn reconstruct(&self, tag: u64, index: u64) -> u64 {
        shl(tag, self.offset_bits + self.index_bits) | shl(index, self.offset_bits)
    }
}
