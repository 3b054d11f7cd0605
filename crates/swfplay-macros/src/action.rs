// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Action code tables.
//!
//! Bytecode actions are identified by a single byte. Codes with the high bit
//! set carry a length-prefixed operand.

/// Define an action code table.
///
/// Generates a `#[repr(u8)]` enum with a `TryFrom<u8>` conversion (the
/// rejected byte is returned as the error), the mnemonic of each code, and
/// whether the code carries an operand.
///
/// # Example
///
/// ```
/// use swfplay_macros::action_codes;
///
/// action_codes! {
///     pub enum Code {
///         End = 0x00,
///         Add = 0x0A,
///         Push = 0x96,
///     }
/// }
///
/// assert_eq!(Code::try_from(0x0A), Ok(Code::Add));
/// assert_eq!(Code::try_from(0x42), Err(0x42));
/// assert!(Code::Push.has_operand());
/// assert!(!Code::Add.has_operand());
/// assert_eq!(Code::Push.name(), "Push");
/// assert_eq!(Code::ALL.len(), 3);
/// ```
///
/// Each variant gets a generated doc line naming its mnemonic and byte, so
/// a public table passes `missing_docs` without per-variant comments:
///
/// ```
/// #![deny(missing_docs)]
/// #![doc = "Action table."]
/// use swfplay_macros::action_codes;
///
/// action_codes! {
///     /// Codes of the table.
///     pub enum Code {
///         End = 0x00,
///         Push = 0x96,
///     }
/// }
///
/// fn main() {
///     assert_eq!(Code::try_from(0x96), Ok(Code::Push));
/// }
/// ```
#[macro_export]
macro_rules! action_codes {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $code:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        $vis enum $name {
            $(
                #[doc = concat!("`", stringify!($code), "` (", stringify!($value), ").")]
                $(#[$vmeta])*
                $code = $value
            ),+
        }

        impl ::core::convert::TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(value: u8) -> ::core::result::Result<Self, u8> {
                match value {
                    $($value => Ok(Self::$code),)+
                    other => Err(other),
                }
            }
        }

        impl $name {
            /// Every code in the table, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$code),+];

            /// The encoded byte.
            #[inline]
            pub const fn byte(self) -> u8 {
                self as u8
            }

            /// Whether the action is followed by a `u16` operand length.
            #[inline]
            pub const fn has_operand(self) -> bool {
                (self as u8) & 0x80 != 0
            }

            /// The mnemonic of the code.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$code => stringify!($code),)+
                }
            }
        }
    };
}
