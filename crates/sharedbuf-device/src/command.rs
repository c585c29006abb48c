//! Binary control commands.
//!
//! Codes use the Linux `_IOC` layout (`dir:2 | size:14 | type:8 | nr:8`) with
//! type `'k'`, so a host can hand raw request numbers straight through.

use std::sync::Arc;

use sharedbuf_core::error::DeviceError;

use crate::log::{dev_debug, dev_warn};
use crate::manager::BufferManager;
use crate::transfer::UserWord;

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;

pub const IOC_NONE: u32 = 0;
pub const IOC_WRITE: u32 = 1;
pub const IOC_READ: u32 = 2;

/// Command type byte.
pub const IOC_MAGIC: u8 = b'k';

pub const fn ioc(dir: u32, ty: u8, nr: u8, size: u32) -> u32 {
    (dir << IOC_DIRSHIFT)
        | ((ty as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
        | (size << IOC_SIZESHIFT)
}

pub const fn io(ty: u8, nr: u8) -> u32 {
    ioc(IOC_NONE, ty, nr, 0)
}

pub const fn ior(ty: u8, nr: u8, size: u32) -> u32 {
    ioc(IOC_READ, ty, nr, size)
}

pub const fn iow(ty: u8, nr: u8, size: u32) -> u32 {
    ioc(IOC_WRITE, ty, nr, size)
}

const WORD: u32 = std::mem::size_of::<u32>() as u32;

pub const CLEAR_BUF: u32 = io(IOC_MAGIC, 1);
pub const GET_SIZE: u32 = ior(IOC_MAGIC, 2, WORD);
pub const SET_SIZE: u32 = iow(IOC_MAGIC, 3, WORD);

/// Fields of a raw request number, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IocFields {
    pub dir: u32,
    pub ty: u8,
    pub nr: u8,
    pub size: u32,
}

impl IocFields {
    pub fn decode(cmd: u32) -> Self {
        Self {
            dir: cmd >> IOC_DIRSHIFT,
            ty: (cmd >> IOC_TYPESHIFT) as u8,
            nr: (cmd >> IOC_NRSHIFT) as u8,
            size: (cmd >> IOC_SIZESHIFT) & ((1 << IOC_SIZEBITS) - 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Clear,
    GetSize,
    SetSize,
}

impl Command {
    pub fn from_code(cmd: u32) -> Option<Self> {
        match cmd {
            CLEAR_BUF => Some(Command::Clear),
            GET_SIZE => Some(Command::GetSize),
            SET_SIZE => Some(Command::SetSize),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Command::Clear => CLEAR_BUF,
            Command::GetSize => GET_SIZE,
            Command::SetSize => SET_SIZE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Clear => "clear",
            Command::GetSize => "get_size",
            Command::SetSize => "set_size",
        }
    }
}

/// Decodes request numbers and dispatches them to the manager.
#[derive(Debug, Clone)]
pub struct CommandFacade {
    manager: Arc<BufferManager>,
}

impl CommandFacade {
    pub fn new(manager: Arc<BufferManager>) -> Self {
        Self { manager }
    }

    /// Execute request `cmd` with argument slot `arg`.
    ///
    /// `SET_SIZE` accepts zero here; only the attribute path rejects it.
    pub fn ioctl<W>(&self, cmd: u32, arg: &mut W) -> Result<(), DeviceError>
    where
        W: UserWord + ?Sized,
    {
        let Some(command) = Command::from_code(cmd) else {
            dev_warn!(code = cmd, fields = ?IocFields::decode(cmd), "unsupported ioctl");
            return Err(DeviceError::UnsupportedOperation { cmd });
        };
        dev_debug!(cmd = command.name(), code = cmd, "ioctl");
        match command {
            Command::Clear => self.manager.clear(),
            Command::GetSize => {
                let size = self.manager.get_size();
                if !arg.write_word(size) {
                    return Err(DeviceError::Fault);
                }
            }
            Command::SetSize => {
                let new_size = arg.read_word().ok_or(DeviceError::Fault)?;
                self.manager.set_size(new_size)?;
            }
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), DeviceError> {
        self.ioctl(CLEAR_BUF, &mut 0u32)
    }

    pub fn get_size(&self) -> Result<u32, DeviceError> {
        let mut out = 0u32;
        self.ioctl(GET_SIZE, &mut out)?;
        Ok(out)
    }

    pub fn set_size(&self, new_size: u32) -> Result<(), DeviceError> {
        let mut arg = new_size;
        self.ioctl(SET_SIZE, &mut arg)
    }
}
