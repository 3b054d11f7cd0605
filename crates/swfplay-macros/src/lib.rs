// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Declarative macros for the swfplay scripting core.
//!
//! # Macros Overview
//!
//! ## Bytecode
//! - [`action_codes!`] - Action code enum with byte decoding and mnemonics
//!
//! ## Types
//! - [`flag_set!`] - Typed bit sets (property attributes, calling flags)
//!
//! ## Testing
//! - [`assert_matches!`] - Pattern assertion with optional guard
//! - [`assert_number!`] - Numeric conversion assertion, `NaN`-aware
//! - [`assert_fault!`] - Assert a result failed with a given error
//!
//! # Examples
//!
//! ```
//! use swfplay_macros::*;
//!
//! flag_set! {
//!     pub struct Visibility: u16 {
//!         const HIDDEN = 1;
//!         const LOCKED = 2;
//!     }
//! }
//!
//! let v = Visibility::HIDDEN | Visibility::LOCKED;
//! assert!(v.contains(Visibility::LOCKED));
//! ```

#![warn(missing_docs)]

mod action;
mod flags;
mod testing;
