//! Host input queue and key state.
//!
//! Hosts push events from any thread through an [`InputSender`]. The VM
//! context drains the queue in `Avm::process_input`, updates the key map and
//! notifies the `Key` and `Mouse` listeners.

use crossbeam::channel::Sender;

/// One input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A key went down
    KeyDown {
        /// Virtual key code
        code: u8,
        /// Character code, 0 when none
        ascii: u32,
    },
    /// A key went up
    KeyUp {
        /// Virtual key code
        code: u8,
        /// Character code, 0 when none
        ascii: u32,
    },
    /// Primary button pressed
    MouseDown,
    /// Primary button released
    MouseUp,
    /// Pointer moved, in stage coordinates
    MouseMove {
        /// Horizontal position
        x: f64,
        /// Vertical position
        y: f64,
    },
}

/// Clonable handle for queueing input from host threads.
#[derive(Debug, Clone)]
pub struct InputSender(pub(crate) Sender<InputEvent>);

impl InputSender {
    /// Queues an event. Returns false once the VM context is gone.
    pub fn send(&self, event: InputEvent) -> bool {
        self.0.send(event).is_ok()
    }

    /// Queues a key press.
    pub fn key_down(&self, code: u8, ascii: u32) -> bool {
        self.send(InputEvent::KeyDown { code, ascii })
    }

    /// Queues a key release.
    pub fn key_up(&self, code: u8, ascii: u32) -> bool {
        self.send(InputEvent::KeyUp { code, ascii })
    }
}

/// Virtual key codes exposed as `Key` constants.
pub mod key_code {
    /// Backspace
    pub const BACKSPACE: u8 = 8;
    /// Tab
    pub const TAB: u8 = 9;
    /// Enter
    pub const ENTER: u8 = 13;
    /// Shift
    pub const SHIFT: u8 = 16;
    /// Control
    pub const CONTROL: u8 = 17;
    /// Caps lock
    pub const CAPSLOCK: u8 = 20;
    /// Escape
    pub const ESCAPE: u8 = 27;
    /// Space bar
    pub const SPACE: u8 = 32;
    /// Page up
    pub const PGUP: u8 = 33;
    /// Page down
    pub const PGDN: u8 = 34;
    /// End
    pub const END: u8 = 35;
    /// Home
    pub const HOME: u8 = 36;
    /// Left arrow
    pub const LEFT: u8 = 37;
    /// Up arrow
    pub const UP: u8 = 38;
    /// Right arrow
    pub const RIGHT: u8 = 39;
    /// Down arrow
    pub const DOWN: u8 = 40;
    /// Insert
    pub const INSERT: u8 = 45;
    /// Delete
    pub const DELETEKEY: u8 = 46;

    /// Name and code of every constant, in `Key` object order.
    pub const ALL: [(&str, u8); 18] = [
        ("BACKSPACE", BACKSPACE),
        ("CAPSLOCK", CAPSLOCK),
        ("CONTROL", CONTROL),
        ("DELETEKEY", DELETEKEY),
        ("DOWN", DOWN),
        ("END", END),
        ("ENTER", ENTER),
        ("ESCAPE", ESCAPE),
        ("HOME", HOME),
        ("INSERT", INSERT),
        ("LEFT", LEFT),
        ("PGDN", PGDN),
        ("PGUP", PGUP),
        ("RIGHT", RIGHT),
        ("SHIFT", SHIFT),
        ("SPACE", SPACE),
        ("TAB", TAB),
        ("UP", UP),
    ];
}

/// Which keys are down, plus the most recent key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    down: [u64; 4],
    last_code: u8,
    last_ascii: u32,
    caps_lock: bool,
}

impl KeyState {
    /// Records a key press.
    pub fn press(&mut self, code: u8, ascii: u32) {
        let (word, bit) = Self::position(code);
        if code == key_code::CAPSLOCK && self.down[word] & bit == 0 {
            self.caps_lock = !self.caps_lock;
        }
        self.down[word] |= bit;
        self.last_code = code;
        self.last_ascii = ascii;
    }

    /// Records a key release. The last pressed key is kept.
    pub fn release(&mut self, code: u8) {
        let (word, bit) = Self::position(code);
        self.down[word] &= !bit;
    }

    /// Whether `code` is held down.
    pub fn is_down(&self, code: u8) -> bool {
        let (word, bit) = Self::position(code);
        self.down[word] & bit != 0
    }

    /// Key code of the last event.
    pub fn last_code(&self) -> u8 {
        self.last_code
    }

    /// Character code of the last event.
    pub fn last_ascii(&self) -> u32 {
        self.last_ascii
    }

    /// Whether caps lock is toggled on.
    pub fn caps_lock(&self) -> bool {
        self.caps_lock
    }

    const fn position(code: u8) -> (usize, u64) {
        ((code / 64) as usize, 1 << (code % 64))
    }
}
