use std::{convert::Infallible, fmt, ops::Neg, str::FromStr};

use bitflags::bitflags;

/// Compression scheme of the tablebase files.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Compression {
    Uncompressed,
    /// Huffman (cp1).
    Huffman,
    /// LZF (cp2).
    Lzf,
    /// Zlib-9 (cp3).
    Zlib9,
    /// LZMA-5 (cp4). Also used for unrecognized names.
    #[default]
    Lzma5,
}

impl Compression {
    pub const ALL: [Compression; 5] = [
        Compression::Uncompressed,
        Compression::Huffman,
        Compression::Lzf,
        Compression::Zlib9,
        Compression::Lzma5,
    ];

    /// Resolves an option value. Unrecognized names fall back to
    /// [`Compression::Lzma5`].
    pub fn from_name(name: &str) -> Compression {
        match name {
            "Uncompressed" => Compression::Uncompressed,
            "Huffman (cp1)" => Compression::Huffman,
            "LZF (cp2)" => Compression::Lzf,
            "Zlib-9 (cp3)" => Compression::Zlib9,
            _ => Compression::Lzma5,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Compression::Uncompressed => "Uncompressed",
            Compression::Huffman => "Huffman (cp1)",
            Compression::Lzf => "LZF (cp2)",
            Compression::Zlib9 => "Zlib-9 (cp3)",
            Compression::Lzma5 => "LZMA-5 (cp4)",
        }
    }

    /// Scheme identifier as understood by the probing library.
    pub const fn code(self) -> u32 {
        match self {
            Compression::Uncompressed => 0,
            Compression::Huffman => 1,
            Compression::Lzf => 2,
            Compression::Zlib9 => 3,
            Compression::Lzma5 => 4,
        }
    }
}

impl FromStr for Compression {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Compression, Infallible> {
        Ok(Compression::from_name(s))
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Castling rights in the bit layout of the probing library.
    ///
    /// The empty set means no castling.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
    pub struct Castling: u32 {
        const BLACK_LONG = 1;
        const BLACK_SHORT = 2;
        const WHITE_LONG = 4;
        const WHITE_SHORT = 8;
    }
}

/// Outcome reported by a probe, from white's point of view.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Outcome {
    Draw,
    WhiteMates,
    BlackMates,
    /// The position is illegal.
    Forbidden,
    Unknown,
}

impl Outcome {
    /// Decodes an info code of the probing library.
    pub const fn from_code(code: u32) -> Outcome {
        match code {
            0 => Outcome::Draw,
            1 => Outcome::WhiteMates,
            2 => Outcome::BlackMates,
            3 => Outcome::Forbidden,
            _ => Outcome::Unknown,
        }
    }

    pub const fn code(self) -> u32 {
        match self {
            Outcome::Draw => 0,
            Outcome::WhiteMates => 1,
            Outcome::BlackMates => 2,
            Outcome::Forbidden => 3,
            Outcome::Unknown => 7,
        }
    }
}

/// One of the four probe entry points.
///
/// *Hard* probes may load from disk, *soft* probes only consult what is
/// already cached and may decline to answer. *Dtm* probes report the
/// distance to mate, *Wdl* probes only the outcome.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Variant {
    HardDtm,
    HardWdl,
    SoftDtm,
    SoftWdl,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::HardDtm,
        Variant::HardWdl,
        Variant::SoftDtm,
        Variant::SoftWdl,
    ];

    pub const fn new(hard: bool, exact: bool) -> Variant {
        match (hard, exact) {
            (true, true) => Variant::HardDtm,
            (true, false) => Variant::HardWdl,
            (false, true) => Variant::SoftDtm,
            (false, false) => Variant::SoftWdl,
        }
    }

    pub const fn is_hard(self) -> bool {
        matches!(self, Variant::HardDtm | Variant::HardWdl)
    }

    pub const fn is_exact(self) -> bool {
        matches!(self, Variant::HardDtm | Variant::SoftDtm)
    }
}

/// Raw answer of a backend probe.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProbeResult {
    pub available: bool,
    pub outcome: Outcome,
    /// Only present for exact probes.
    pub plies_to_mate: Option<u32>,
}

impl ProbeResult {
    pub const fn unavailable() -> ProbeResult {
        ProbeResult {
            available: false,
            outcome: Outcome::Unknown,
            plies_to_mate: None,
        }
    }

    pub const fn wdl(outcome: Outcome) -> ProbeResult {
        ProbeResult {
            available: true,
            outcome,
            plies_to_mate: None,
        }
    }

    pub const fn dtm(outcome: Outcome, plies_to_mate: u32) -> ProbeResult {
        ProbeResult {
            available: true,
            outcome,
            plies_to_mate: Some(plies_to_mate),
        }
    }
}

/// Search evaluation, from the point of view of the side to move.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Value(pub i32);

impl Value {
    pub const DRAW: Value = Value(0);
    /// Decisive result of unknown distance.
    pub const KNOWN_WIN: Value = Value(15000);
    pub const MATE: Value = Value(30000);

    /// Mating `plies` plies from the root.
    pub fn mate_in(plies: u32) -> Value {
        Value(Value::MATE.0 - clamp_plies(plies))
    }

    /// Getting mated `plies` plies from the root.
    pub fn mated_in(plies: u32) -> Value {
        Value(-Value::MATE.0 + clamp_plies(plies))
    }

    /// Distance to mate in plies, if this is a mate score.
    pub fn mate_plies(self) -> Option<u32> {
        let distance = Value::MATE.0.unsigned_abs().checked_sub(self.0.unsigned_abs())?;
        (distance < (Value::MATE.0 - Value::KNOWN_WIN.0).unsigned_abs()).then_some(distance)
    }
}

fn clamp_plies(plies: u32) -> i32 {
    // Keep mate scores above the known win range.
    i32::try_from(plies)
        .unwrap_or(i32::MAX)
        .min(Value::MATE.0 - Value::KNOWN_WIN.0 - 1)
}

impl Neg for Value {
    type Output = Value;

    fn neg(self) -> Value {
        Value(-self.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mate_plies() {
            Some(plies) if self.0 > 0 => write!(f, "mate {}", (plies + 1) / 2),
            Some(plies) => write!(f, "mate -{}", (plies + 1) / 2),
            None => write!(f, "{}", self.0),
        }
    }
}
