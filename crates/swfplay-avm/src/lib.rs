// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # swfplay-avm
//!
//! The ActionScript 1/2 scripting core of the swfplay multimedia player.
//!
//! ## Overview
//!
//! This crate provides:
//! - Dynamically typed values with version-dependent conversions
//! - Script objects with protected, version-gated slots
//! - Scope chains with local, register, `with` and global lookup
//! - A bounded bytecode interpreter for SWF action blocks
//! - Weak listener registries for event broadcasting
//! - The built-in objects scripts expect (`Object`, `String`, `Key`, ...)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use swfplay_avm::{Avm, Value, VmConfig};
//! use swfplay_avm::vm::{ActionCode, ActionWriter, PushItem};
//!
//! let mut avm = Avm::new(VmConfig::default().with_version(6));
//! let mut w = ActionWriter::new();
//! w.push(&[PushItem::Integer(2), PushItem::Integer(3)])
//!     .action(ActionCode::Add)
//!     .action(ActionCode::Return);
//! let result = avm.run(&w.finish())?;
//! assert_eq!(result, Some(Value::Number(5.0)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtins;
pub mod config;
pub mod error;
pub mod runtime;
pub mod vm;

// Re-exports for convenience
pub use config::{ConfigError, VmConfig};
pub use error::{BytecodeFault, Error, Result};
pub use runtime::context::{Avm, HostInterface, TargetResolver};
pub use runtime::environment::Environment;
pub use runtime::listener::ListenerBroadcast;
pub use runtime::object::ObjectRef;
pub use runtime::property::{PropFlags, PropertyAttributes};
pub use runtime::value::Value;
pub use vm::{ActionBuffer, ExecutionThread};
