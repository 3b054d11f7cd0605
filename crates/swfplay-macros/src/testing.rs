// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Testing helper macros.
//!
//! Assertions for script values and execution results.

/// Assert that an expression matches a pattern.
///
/// # Example
///
/// ```
/// use swfplay_macros::assert_matches;
///
/// #[derive(Debug)]
/// enum Slot { Empty, Held(u32) }
///
/// assert_matches!(Slot::Held(3), Slot::Held(n) if n > 2);
/// assert_matches!(Slot::Empty, Slot::Empty);
/// ```
#[macro_export]
macro_rules! assert_matches {
    ($expr:expr, $pat:pat $(if $guard:expr)? $(,)?) => {
        match $expr {
            $pat $(if $guard)? => {}
            ref other => panic!(
                "assertion failed: `{}` does not match `{}`\n  value: {:?}",
                stringify!($expr),
                stringify!($pat $(if $guard)?),
                other
            ),
        }
    };
}

/// Assert that a value converts to the expected number.
///
/// The value only needs a `to_number(&self) -> f64` method. `NaN` matches
/// `NaN`, and the sign of zero must agree.
///
/// # Example
///
/// ```
/// use swfplay_macros::assert_number;
///
/// struct Cell(f64);
/// impl Cell {
///     fn to_number(&self) -> f64 { self.0 }
/// }
///
/// assert_number!(Cell(5.0), 5.0);
/// assert_number!(Cell(f64::NAN), f64::NAN);
/// ```
#[macro_export]
macro_rules! assert_number {
    ($value:expr, $expected:expr $(,)?) => {{
        let actual: f64 = $value.to_number();
        let expected: f64 = $expected;
        let same = if expected.is_nan() {
            actual.is_nan()
        } else {
            actual == expected && actual.is_sign_negative() == expected.is_sign_negative()
        };
        if !same {
            panic!(
                "assertion failed: `{}` converts to {:?}, expected {:?}",
                stringify!($value),
                actual,
                expected
            );
        }
    }};
}

/// Assert that a result is an error matching a pattern.
///
/// # Example
///
/// ```
/// use swfplay_macros::assert_fault;
///
/// #[derive(Debug)]
/// enum Fault { Truncated { pc: usize } }
///
/// let result: Result<(), Fault> = Err(Fault::Truncated { pc: 4 });
/// assert_fault!(result, Fault::Truncated { pc: 4 });
/// ```
#[macro_export]
macro_rules! assert_fault {
    ($result:expr, $pat:pat $(if $guard:expr)? $(,)?) => {
        match $result {
            Err($pat) $(if $guard)? => {}
            ref other => panic!(
                "assertion failed: `{}` did not fail with `{}`\n  result: {:?}",
                stringify!($result),
                stringify!($pat),
                other
            ),
        }
    };
}
