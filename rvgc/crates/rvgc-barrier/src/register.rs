//! Register and register-set model
//!
//! Barrier implementations declare which machine registers they may clobber
//! and callers declare which registers must survive a slow-path call. Both
//! are plain value types: a register is its encoding, a set is a 32-bit mask.

use std::fmt;
use std::ops::{Add, Sub};

/// Integer register of the RV32 register file
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(i8);

impl Register {
    pub const NUMBER_OF_REGISTERS: usize = 32;

    /// Register with the given encoding
    pub const fn new(encoding: i8) -> Self {
        Register(encoding)
    }

    /// Encoding of a valid register
    #[inline]
    pub fn encoding(self) -> u32 {
        debug_assert!(self.is_valid(), "invalid register");
        self.0 as u32
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0 && (self.0 as usize) < Self::NUMBER_OF_REGISTERS
    }

    /// Next register by encoding
    pub const fn successor(self) -> Self {
        Register(self.0 + 1)
    }

    /// Mask bit of this register
    #[inline]
    pub fn bit(self) -> u32 {
        1 << self.encoding()
    }

    /// Assembler name
    pub fn name(self) -> &'static str {
        if self.is_valid() {
            REGISTER_NAMES[self.0 as usize]
        } else {
            "noreg"
        }
    }
}

impl fmt::Debug for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const REGISTER_NAMES: [&str; Register::NUMBER_OF_REGISTERS] = [
    "zr", "ra", "sp", "gp", "tp", "lr", "x6", "x7", "fp", "x9", "c_rarg0", "c_rarg1", "c_rarg2",
    "c_rarg3", "c_rarg4", "c_rarg5", "c_rarg6", "c_rarg7", "x18", "x19", "esp", "xdispatch",
    "xbcp", "xthread", "xlocals", "xmonitors", "xcpool", "xheapbase", "x28", "x29", "x30",
    "xmethod",
];

pub const NOREG: Register = Register(-1);
pub const X0: Register = Register(0);
pub const X1: Register = Register(1);
pub const X2: Register = Register(2);
pub const X3: Register = Register(3);
pub const X4: Register = Register(4);
pub const X5: Register = Register(5);
pub const X6: Register = Register(6);
pub const X7: Register = Register(7);
pub const X8: Register = Register(8);
pub const X9: Register = Register(9);
pub const X10: Register = Register(10);
pub const X11: Register = Register(11);
pub const X12: Register = Register(12);
pub const X13: Register = Register(13);
pub const X14: Register = Register(14);
pub const X15: Register = Register(15);
pub const X16: Register = Register(16);
pub const X17: Register = Register(17);
pub const X18: Register = Register(18);
pub const X19: Register = Register(19);
pub const X20: Register = Register(20);
pub const X21: Register = Register(21);
pub const X22: Register = Register(22);
pub const X23: Register = Register(23);
pub const X24: Register = Register(24);
pub const X25: Register = Register(25);
pub const X26: Register = Register(26);
pub const X27: Register = Register(27);
pub const X28: Register = Register(28);
pub const X29: Register = Register(29);
pub const X30: Register = Register(30);
pub const X31: Register = Register(31);

// Runtime roles
pub const ZR: Register = X0;
pub const RA: Register = X1;
pub const SP: Register = X2;
pub const T0: Register = X5;
pub const T1: Register = X6;
pub const T2: Register = X7;
pub const C_RARG0: Register = X10;
pub const C_RARG7: Register = X17;
pub const XTHREAD: Register = X23;
pub const XHEAPBASE: Register = X27;
pub const XMETHOD: Register = X31;

/// Floating-point register
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FloatRegister(i8);

impl FloatRegister {
    pub const NUMBER_OF_REGISTERS: usize = 32;

    pub const fn new(encoding: i8) -> Self {
        FloatRegister(encoding)
    }

    #[inline]
    pub fn encoding(self) -> u32 {
        debug_assert!(self.is_valid(), "invalid float register");
        self.0 as u32
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0 && (self.0 as usize) < Self::NUMBER_OF_REGISTERS
    }

    pub const fn successor(self) -> Self {
        FloatRegister(self.0 + 1)
    }

    pub fn name(self) -> &'static str {
        if self.is_valid() {
            FLOAT_REGISTER_NAMES[self.0 as usize]
        } else {
            "fnoreg"
        }
    }
}

impl fmt::Debug for FloatRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const FLOAT_REGISTER_NAMES: [&str; FloatRegister::NUMBER_OF_REGISTERS] = [
    "f0", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "f13", "f14",
    "f15", "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23", "f24", "f25", "f26", "f27",
    "f28", "f29", "f30", "f31",
];

pub const FNOREG: FloatRegister = FloatRegister(-1);

/// Immutable set of integer registers
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegSet(u32);

impl RegSet {
    pub const EMPTY: RegSet = RegSet(0);

    /// Set from a raw mask
    pub const fn from_bits(bits: u32) -> Self {
        RegSet(bits)
    }

    /// Set of the given registers
    pub fn of(regs: &[Register]) -> Self {
        regs.iter().fold(Self::EMPTY, |set, &reg| set + reg)
    }

    /// Every register from `start` to `end`, inclusive
    pub fn range(start: Register, end: Register) -> Self {
        let (lo, hi) = (start.encoding(), end.encoding());
        if lo > hi {
            return Self::EMPTY;
        }
        let bits = (u32::MAX << lo) & (u32::MAX >> (31 - hi));
        RegSet(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn contains(self, reg: Register) -> bool {
        reg.is_valid() && self.0 & reg.bit() != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Registers common to both sets
    pub const fn intersection(self, other: RegSet) -> RegSet {
        RegSet(self.0 & other.0)
    }

    pub const fn is_disjoint(self, other: RegSet) -> bool {
        self.0 & other.0 == 0
    }

    /// Members in encoding order
    pub fn iter(self) -> impl Iterator<Item = Register> {
        (0..Register::NUMBER_OF_REGISTERS as i8)
            .map(Register)
            .filter(move |reg| self.0 & (1 << reg.0) != 0)
    }
}

impl Add for RegSet {
    type Output = RegSet;

    fn add(self, rhs: RegSet) -> RegSet {
        RegSet(self.0 | rhs.0)
    }
}

impl Add<Register> for RegSet {
    type Output = RegSet;

    fn add(self, rhs: Register) -> RegSet {
        if rhs.is_valid() {
            RegSet(self.0 | rhs.bit())
        } else {
            self
        }
    }
}

impl Sub for RegSet {
    type Output = RegSet;

    fn sub(self, rhs: RegSet) -> RegSet {
        RegSet(self.0 & !rhs.0)
    }
}

impl Sub<Register> for RegSet {
    type Output = RegSet;

    fn sub(self, rhs: Register) -> RegSet {
        if rhs.is_valid() {
            RegSet(self.0 & !rhs.bit())
        } else {
            self
        }
    }
}

impl From<Register> for RegSet {
    fn from(reg: Register) -> Self {
        RegSet::EMPTY + reg
    }
}

impl fmt::Debug for RegSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
