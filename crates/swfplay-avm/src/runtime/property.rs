//! Property attributes.
//!
//! Every slot carries a bitmask deciding whether scripts can enumerate,
//! delete or overwrite it, plus version gates that hide the slot entirely
//! from older bytecode.

use swfplay_macros::flag_set;

flag_set! {
    /// Attribute bits stored with every property slot.
    pub struct PropFlags: u16 {
        /// Skipped by enumeration
        const DONT_ENUM = 0x0001;
        /// Survives `delete`
        const DONT_DELETE = 0x0002;
        /// Assignments are refused
        const READ_ONLY = 0x0004;
        /// Assigned in place when found on a prototype
        const STATIC = 0x0008;
        /// Hidden below version 6
        const ONLY_SWF6_UP = 0x0080;
        /// Hidden at exactly version 6
        const IGNORE_SWF6 = 0x0100;
        /// Hidden below version 7
        const ONLY_SWF7_UP = 0x0400;
        /// Hidden below version 8
        const ONLY_SWF8_UP = 0x1000;
    }
}

impl PropFlags {
    /// Bits a locked slot can no longer clear.
    pub const PROTECTION: Self = Self::DONT_ENUM
        .union(Self::DONT_DELETE)
        .union(Self::READ_ONLY);

    /// Bits that hide a slot from some versions.
    pub const VERSION_GATES: Self = Self::ONLY_SWF6_UP
        .union(Self::IGNORE_SWF6)
        .union(Self::ONLY_SWF7_UP)
        .union(Self::ONLY_SWF8_UP);

    /// Bits scripts may change through `ASSetPropFlags`.
    pub const USER_MASK: Self = Self::all().difference(Self::STATIC);
}

/// Attributes of one property slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyAttributes {
    flags: PropFlags,
    locked: bool,
}

impl PropertyAttributes {
    /// Creates unlocked attributes.
    pub const fn new(flags: PropFlags) -> Self {
        Self {
            flags,
            locked: false,
        }
    }

    /// The current bits.
    pub const fn flags(&self) -> PropFlags {
        self.flags
    }

    /// Whether [`lock`](Self::lock) was called.
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether enumeration lists the slot.
    pub const fn is_enumerable(&self) -> bool {
        !self.flags.contains(PropFlags::DONT_ENUM)
    }

    /// Whether `delete` may remove the slot.
    pub const fn is_deletable(&self) -> bool {
        !self.flags.contains(PropFlags::DONT_DELETE)
    }

    /// Whether assignments are accepted.
    pub const fn is_writable(&self) -> bool {
        !self.flags.contains(PropFlags::READ_ONLY)
    }

    /// Whether the slot is assigned in place from derived objects.
    pub const fn is_static(&self) -> bool {
        self.flags.contains(PropFlags::STATIC)
    }

    /// Whether the slot exists for `version`. Every gate must pass.
    pub fn is_visible(&self, version: u8) -> bool {
        let flags = self.flags;
        if flags.contains(PropFlags::ONLY_SWF6_UP) && version < 6 {
            return false;
        }
        if flags.contains(PropFlags::IGNORE_SWF6) && version == 6 {
            return false;
        }
        if flags.contains(PropFlags::ONLY_SWF7_UP) && version < 7 {
            return false;
        }
        if flags.contains(PropFlags::ONLY_SWF8_UP) && version < 8 {
            return false;
        }
        true
    }

    /// Clears `clear`, then sets `set`.
    ///
    /// Once locked, a request that would clear a protection bit fails and
    /// leaves the attributes untouched. Locked slots still accept new bits.
    pub fn set_flags(&mut self, set: PropFlags, clear: PropFlags) -> bool {
        if self.locked && clear.intersects(PropFlags::PROTECTION) {
            return false;
        }
        self.flags.remove(clear);
        self.flags.insert(set);
        true
    }

    /// Freezes the protection bits.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Drops the gates that hide the slot from `version`.
    ///
    /// Used when a script assigns to a slot it cannot see. At version 6 the
    /// version-7 gate survives.
    pub fn clear_visible(&mut self, version: u8) {
        if version == 6 {
            self.flags.remove(
                PropFlags::ONLY_SWF6_UP
                    | PropFlags::IGNORE_SWF6
                    | PropFlags::ONLY_SWF8_UP,
            );
        } else {
            self.flags.remove(PropFlags::VERSION_GATES);
        }
    }
}

impl From<PropFlags> for PropertyAttributes {
    fn from(flags: PropFlags) -> Self {
        Self::new(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_open() {
        let attrs = PropertyAttributes::default();
        assert!(attrs.is_enumerable());
        assert!(attrs.is_deletable());
        assert!(attrs.is_writable());
        assert!(!attrs.is_static());
        assert!((1..=10).all(|v| attrs.is_visible(v)));
    }

    #[test]
    fn test_version_gates() {
        let swf6 = PropertyAttributes::new(PropFlags::ONLY_SWF6_UP);
        assert!(!swf6.is_visible(5));
        assert!(swf6.is_visible(6));

        let not6 = PropertyAttributes::new(PropFlags::IGNORE_SWF6);
        assert!(not6.is_visible(5));
        assert!(!not6.is_visible(6));
        assert!(not6.is_visible(7));

        let swf8 = PropertyAttributes::new(PropFlags::ONLY_SWF8_UP);
        assert!(!swf8.is_visible(7));
        assert!(swf8.is_visible(8));
    }

    #[test]
    fn test_gates_compose() {
        let attrs = PropertyAttributes::new(PropFlags::ONLY_SWF6_UP | PropFlags::IGNORE_SWF6);
        assert!(!attrs.is_visible(5));
        assert!(!attrs.is_visible(6));
        assert!(attrs.is_visible(7));
    }

    #[test]
    fn test_set_flags_clears_then_sets() {
        let mut attrs = PropertyAttributes::new(PropFlags::READ_ONLY);
        assert!(attrs.set_flags(PropFlags::READ_ONLY, PropFlags::READ_ONLY));
        assert!(!attrs.is_writable());
        assert!(attrs.set_flags(PropFlags::DONT_ENUM, PropFlags::READ_ONLY));
        assert_eq!(attrs.flags(), PropFlags::DONT_ENUM);
    }

    #[test]
    fn test_lock_refuses_clearing_protection() {
        let mut attrs = PropertyAttributes::new(PropFlags::READ_ONLY);
        attrs.lock();
        attrs.lock();
        assert!(attrs.is_locked());
        assert!(!attrs.set_flags(PropFlags::empty(), PropFlags::READ_ONLY));
        assert!(!attrs.is_writable());
        assert!(!attrs.set_flags(PropFlags::DONT_ENUM, PropFlags::READ_ONLY));
        assert!(attrs.is_enumerable());
    }

    #[test]
    fn test_lock_still_adds_protection() {
        let mut attrs = PropertyAttributes::default();
        attrs.lock();
        assert!(attrs.set_flags(PropFlags::DONT_DELETE, PropFlags::empty()));
        assert!(!attrs.is_deletable());
    }

    #[test]
    fn test_clear_visible() {
        let gates = PropFlags::ONLY_SWF6_UP | PropFlags::ONLY_SWF7_UP | PropFlags::ONLY_SWF8_UP;

        let mut attrs = PropertyAttributes::new(gates);
        attrs.clear_visible(6);
        assert_eq!(attrs.flags(), PropFlags::ONLY_SWF7_UP);

        let mut attrs = PropertyAttributes::new(gates | PropFlags::DONT_ENUM);
        attrs.clear_visible(5);
        assert_eq!(attrs.flags(), PropFlags::DONT_ENUM);
    }

    #[test]
    fn test_user_mask_excludes_static() {
        assert!(!PropFlags::USER_MASK.contains(PropFlags::STATIC));
        assert!(PropFlags::USER_MASK.contains(PropFlags::PROTECTION));
    }
}
