//! Opcode table
//!
//! Every host service a plugin can reach has a fixed number. Both backends
//! use the same numbers, so a plugin runs unchanged in-process or over a
//! socket. Numbers are never reused; new services get new numbers and bump
//! [`PROTOCOL_VERSION`].
//!
//! | Range    | Category                    |
//! |----------|-----------------------------|
//! | 0-9      | host info, assets           |
//! | 10-19    | relational storage          |
//! | 20-39    | div tree                    |
//! | 40-49    | dialogs                     |
//! | 50-69    | paint and text measurement  |
//! | 70-79    | return buffers              |
//! | 80-99    | reserved for widget helpers |
//! | 100-109  | drag and drop               |
//! | 110-119  | sub-render                  |
//! | 1000     | render finished             |

use std::fmt;

use crate::error::ProtocolError;

/// Version of the opcode table.
pub const PROTOCOL_VERSION: u32 = 1;

macro_rules! opcodes {
    ($($(#[$meta:meta])* $name:ident = $num:literal,)+) => {
        /// Host operation number.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u64)]
        pub enum Opcode {
            $($(#[$meta])* $name = $num,)+
        }

        impl Opcode {
            /// Every opcode in table order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name,)+];

            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name),)+
                }
            }
        }

        impl TryFrom<u64> for Opcode {
            type Error = ProtocolError;

            fn try_from(value: u64) -> Result<Self, Self::Error> {
                match value {
                    $($num => Ok(Opcode::$name),)+
                    other => Err(ProtocolError::UnknownOpcode(other)),
                }
            }
        }
    };
}

opcodes! {
    Log = 0,
    Time = 1,
    WindowSize = 2,
    Translate = 3,
    ReadAsset = 4,
    CellSize = 5,

    SqlExecute = 10,
    SqlQuery = 11,
    SqlLastInsertId = 12,
    SqlChanges = 13,
    SqlLastError = 14,

    DivStart = 20,
    DivEnd = 21,
    DivCol = 22,
    DivRow = 23,
    DivInfo = 24,
    ScrollInfo = 25,
    SetScroll = 26,
    DivInput = 27,
    DivEnable = 28,
    GridInfo = 29,

    DialogOpen = 40,
    DialogStart = 41,
    DialogEnd = 42,
    /// Empty name closes every dialog.
    DialogClose = 43,

    PaintRect = 50,
    PaintLine = 51,
    PaintCircle = 52,
    PaintImage = 53,
    PaintText = 54,
    PaintCrop = 55,
    TextWidth = 56,
    TextCells = 57,

    SetReturn = 70,
    AppendReturn = 71,
    ClearReturn = 72,

    DragSource = 100,
    DropTarget = 101,

    SubRender = 110,

    /// Ends the remote opcode stream for the current call.
    RenderDone = 1000,
}

impl Opcode {
    pub fn code(self) -> u64 {
        self as u64
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}
