use std::ops::BitAnd;

pub fn has_flag<U, T: Into<U>>(value: U, flag: T) -> bool
    where U: BitAnd<Output = U> + PartialEq + Copy {
    let flag = flag.into();

    value & flag == flag
}

/// Reassembles a 64 bit literal from the two 32 bit constant pool slots it was stored in.
/// Slot order follows the platform's endianness, matching `split_slots`.
#[inline(always)]
pub fn join_slots(slot1: u32, slot2: u32) -> u64 {
    #[cfg(target_endian = "little")]
    {
        ((slot2 as u64) << 32) | (slot1 as u64)
    }
    #[cfg(target_endian = "big")]
    {
        ((slot1 as u64) << 32) | (slot2 as u64)
    }
}

#[inline(always)]
pub fn split_slots(value: u64) -> (u32, u32) {
    let high = (value >> 32) as u32;
    let low = value as u32;

    #[cfg(target_endian = "little")]
    {
        (low, high)
    }
    #[cfg(target_endian = "big")]
    {
        (high, low)
    }
}

/// Class file stores 64 bit constants as (high, low) big endian words.
pub fn slots_from_class_file(high: u32, low: u32) -> (u32, u32) {
    split_slots(((high as u64) << 32) | low as u64)
}
