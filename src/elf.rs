//! Minimal ELF header reader for CPU-architecture auto-detection (C7).
//!
//! Only the fixed-offset fields named in §4.7 are read — not worth a
//! dependency on a general-purpose ELF/object crate for a handful of
//! fields nothing else in this tool needs.

use crate::error::{ContainerToolError, Result};

const ELF_MAGIC: [u8; 4] = [0x7F, 0x45, 0x4C, 0x46];
const MIN_HEADER_LEN: usize = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Elf32,
    Elf64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    X86_64,
    Aarch64,
    X86,
    Ppc,
    Ppc64,
    S390,
    Arm,
    RiscV,
    Unknown(u16),
}

impl Machine {
    fn from_u16(value: u16) -> Machine {
        match value {
            0x3E => Machine::X86_64,
            0xB7 => Machine::Aarch64,
            0x03 => Machine::X86,
            0x14 => Machine::Ppc,
            0x15 => Machine::Ppc64,
            0x16 => Machine::S390,
            0x28 => Machine::Arm,
            0xF3 => Machine::RiscV,
            other => Machine::Unknown(other),
        }
    }

    /// Container-architecture name, when this machine maps to one of the
    /// two architectures this tool can auto-detect (§4.7). Any other value
    /// forces the caller to supply `--architecture` explicitly.
    pub fn container_architecture(&self) -> Option<&'static str> {
        match self {
            Machine::X86_64 => Some("amd64"),
            Machine::Aarch64 => Some("arm64"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf {
    pub class: Class,
    pub endianness: Endianness,
    pub abi: u8,
    pub object_type: u16,
    pub machine: Machine,
}

/// Parse the first `MIN_HEADER_LEN` bytes of an ELF file. Rejects any buffer
/// that does not begin with the ELF magic or whose version byte (offset 6)
/// is not 1.
pub fn read_elf(bytes: &[u8]) -> Result<Elf> {
    if bytes.len() < MIN_HEADER_LEN {
        return Err(ContainerToolError::InvalidElf(format!(
            "buffer too short: {} bytes, need at least {MIN_HEADER_LEN}",
            bytes.len()
        )));
    }
    if bytes[0..4] != ELF_MAGIC {
        return Err(ContainerToolError::InvalidElf("missing ELF magic".to_string()));
    }
    if bytes[6] != 1 {
        return Err(ContainerToolError::InvalidElf(format!(
            "unsupported ELF version byte: {}",
            bytes[6]
        )));
    }

    let class = match bytes[4] {
        1 => Class::Elf32,
        2 => Class::Elf64,
        other => {
            return Err(ContainerToolError::InvalidElf(format!(
                "unknown EI_CLASS: {other}"
            )))
        }
    };
    let endianness = match bytes[5] {
        1 => Endianness::Little,
        2 => Endianness::Big,
        other => {
            return Err(ContainerToolError::InvalidElf(format!(
                "unknown EI_DATA: {other}"
            )))
        }
    };
    let abi = bytes[7];

    let read_u16 = |offset: usize| -> u16 {
        let raw = [bytes[offset], bytes[offset + 1]];
        match endianness {
            Endianness::Little => u16::from_le_bytes(raw),
            Endianness::Big => u16::from_be_bytes(raw),
        }
    };

    let object_type = read_u16(16);
    let machine = Machine::from_u16(read_u16(18));

    Ok(Elf {
        class,
        endianness,
        abi,
        object_type,
        machine,
    })
}

pub fn read_elf_file(path: &std::path::Path) -> Result<Elf> {
    let mut file = std::fs::File::open(path)?;
    let mut header = vec![0u8; MIN_HEADER_LEN];
    std::io::Read::read_exact(&mut file, &mut header)?;
    read_elf(&header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(machine: u16, little_endian: bool) -> Vec<u8> {
        let mut h = vec![0u8; MIN_HEADER_LEN];
        h[0..4].copy_from_slice(&ELF_MAGIC);
        h[4] = 2; // ELF64
        h[5] = if little_endian { 1 } else { 2 };
        h[6] = 1; // version
        h[7] = 0; // System V ABI
        let obj_type: u16 = 2; // ET_EXEC
        let machine_bytes = if little_endian {
            machine.to_le_bytes()
        } else {
            machine.to_be_bytes()
        };
        let obj_type_bytes = if little_endian {
            obj_type.to_le_bytes()
        } else {
            obj_type.to_be_bytes()
        };
        h[16..18].copy_from_slice(&obj_type_bytes);
        h[18..20].copy_from_slice(&machine_bytes);
        h
    }

    #[test]
    fn aarch64_maps_to_arm64() {
        let header = sample_header(0xB7, true);
        let elf = read_elf(&header).unwrap();
        assert_eq!(elf.machine, Machine::Aarch64);
        assert_eq!(elf.machine.container_architecture(), Some("arm64"));
    }

    #[test]
    fn x86_64_maps_to_amd64() {
        let header = sample_header(0x3E, true);
        let elf = read_elf(&header).unwrap();
        assert_eq!(elf.machine.container_architecture(), Some("amd64"));
    }

    #[test]
    fn unsupported_machine_returns_none_for_auto_detect() {
        let header = sample_header(0x28, true); // arm (32-bit)
        let elf = read_elf(&header).unwrap();
        assert_eq!(elf.machine, Machine::Arm);
        assert_eq!(elf.machine.container_architecture(), None);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut header = sample_header(0x3E, true);
        header[0] = 0;
        assert!(read_elf(&header).is_err());
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(read_elf(&[0x7F, 0x45, 0x4C, 0x46]).is_err());
    }

    #[test]
    fn rejects_bad_version() {
        let mut header = sample_header(0x3E, true);
        header[6] = 0;
        assert!(read_elf(&header).is_err());
    }

    #[test]
    fn big_endian_machine_field_is_read_correctly() {
        let header = sample_header(0xB7, false);
        let elf = read_elf(&header).unwrap();
        assert_eq!(elf.endianness, Endianness::Big);
        assert_eq!(elf.machine, Machine::Aarch64);
    }
}
