// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed bit sets.

/// Define a typed set of bit flags over an integer representation.
///
/// # Example
///
/// ```
/// use swfplay_macros::flag_set;
///
/// flag_set! {
///     pub struct Access: u8 {
///         const READ = 0b001;
///         const WRITE = 0b010;
///         const EXEC = 0b100;
///     }
/// }
///
/// let mut access = Access::READ | Access::WRITE;
/// assert!(access.contains(Access::READ));
/// assert!(!access.contains(Access::EXEC));
/// access.remove(Access::WRITE);
/// assert_eq!(access, Access::READ);
/// assert_eq!(Access::from_bits_truncate(0xFF), Access::all());
/// assert_eq!(format!("{:?}", Access::READ | Access::EXEC), "Access(READ | EXEC)");
/// ```
#[macro_export]
macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $repr:ty {
            $($(#[$fmeta:meta])* const $flag:ident = $value:expr;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name($repr);

        impl $name {
            $($(#[$fmeta])* pub const $flag: Self = Self($value);)+

            /// No flags set.
            #[inline]
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Every declared flag.
            #[inline]
            pub const fn all() -> Self {
                Self(0 $(| $value)+)
            }

            /// The raw bits.
            #[inline]
            pub const fn bits(self) -> $repr {
                self.0
            }

            /// Keeps only the declared bits of `bits`.
            #[inline]
            pub const fn from_bits_truncate(bits: $repr) -> Self {
                Self(bits & Self::all().0)
            }

            /// Whether every flag of `other` is set.
            #[inline]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Whether any flag of `other` is set.
            #[inline]
            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            /// Whether no flag is set.
            #[inline]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Flags set in either operand.
            #[inline]
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Flags of `self` not set in `other`.
            #[inline]
            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            /// Sets every flag of `other`.
            #[inline]
            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            /// Clears every flag of `other`.
            #[inline]
            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }
        }

        impl ::core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl ::core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl ::core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}(", stringify!($name))?;
                let mut first = true;
                $(
                    if Self::$flag.0 != 0 && self.contains(Self::$flag) {
                        if !first {
                            f.write_str(" | ")?;
                        }
                        f.write_str(stringify!($flag))?;
                        first = false;
                    }
                )+
                if first {
                    write!(f, "{:#x}", self.0)?;
                }
                f.write_str(")")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    flag_set! {
        struct Gate: u16 {
            const LOW = 1 << 0;
            const HIGH = 1 << 12;
        }
    }

    #[test]
    fn test_truncate_drops_undeclared_bits() {
        assert_eq!(Gate::from_bits_truncate(0xFFFF).bits(), 0x1001);
    }

    #[test]
    fn test_insert_remove() {
        let mut gate = Gate::empty();
        assert!(gate.is_empty());
        gate.insert(Gate::HIGH);
        assert!(gate.intersects(Gate::all()));
        assert!(!gate.contains(Gate::all()));
        gate.remove(Gate::HIGH);
        assert!(gate.is_empty());
    }

    #[test]
    fn test_difference_and_union() {
        let both = Gate::LOW.union(Gate::HIGH);
        assert_eq!(both.difference(Gate::LOW), Gate::HIGH);
    }

    #[test]
    fn test_debug_empty() {
        assert_eq!(format!("{:?}", Gate::empty()), "Gate(0x0)");
    }
}
