use bitflags::bitflags;

use super::File;

bitflags! {
    /// Access being requested, in the same layout as one triplet of mode bits.
    pub struct Access: u32 {
        const READ = 4;
        const WRITE = 2;
        const EXECUTE = 1;
    }
}

/// Whether `uid`/`gid` may access `file` in any of the `requested` ways.
///
/// The owner and group triplets only count when the caller matches; the
/// "other" triplet always counts.
pub fn is_permitted(file: &File, uid: u32, gid: u32, requested: Access) -> bool {
    let owner_bits = (file.mode >> 6) & 0o7;
    let group_bits = (file.mode >> 3) & 0o7;
    let other_bits = file.mode & 0o7;

    let mut effective = other_bits;
    if uid == file.owner {
        effective |= owner_bits;
    }
    if gid == file.group {
        effective |= group_bits;
    }

    effective & requested.bits() != 0
}
