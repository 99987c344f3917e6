//! Consult endgame tablebases from a chess search.
//!
//! Translates [`shakmaty`] positions into the flat query format of
//! Gaviota-style probing libraries, dispatches one of four probe variants
//! (hard or soft, distance to mate or WDL only) and converts the answer into
//! a search [`Value`] for the side to move.
//!
//! [`Egtb`] owns the probing [`Backend`] and reinitializes it only when the
//! relevant [`Settings`] actually change, so it can be reconciled cheaply
//! before every search.
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "syzygy")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use egtb_probe::{Egtb, Node, Settings, SyzygyBackend, Value};
//! use shakmaty::{fen::Fen, CastlingMode, Chess};
//!
//! let mut settings = Settings::default();
//! settings.set_option("UseGaviotaTb", "true")?;
//! settings.set_option("GaviotaTbPath", "tables/chess")?;
//!
//! let mut egtb = Egtb::new(SyzygyBackend::new());
//! egtb.reconcile(&settings)?;
//!
//! let pos: Chess = "8/8/8/8/8/8/8/K6k w - - 0 1"
//!     .parse::<Fen>()?
//!     .into_position(CastlingMode::Standard)?;
//! let mut node = Node::new(pos);
//!
//! // Hard WDL probe, 4 plies from the root.
//! let value: Option<Value> = egtb.probe(&mut node, 4, true, false);
//! # let _ = value;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "syzygy"))]
//! # fn main() {}
//! ```
//!
//! # Cargo features
//!
//! * `syzygy`: Enables [`SyzygyBackend`], a backend for Syzygy tables
//!   built on `shakmaty-syzygy`.

#![warn(missing_debug_implementations)]
#![cfg_attr(docs_rs, feature(doc_auto_cfg))]

mod backend;
mod errors;
mod query;
mod settings;
#[cfg(feature = "syzygy")]
mod syzygy;
mod tablebase;
mod types;

#[cfg(feature = "syzygy")]
pub use crate::syzygy::SyzygyBackend;
pub use crate::{
    backend::Backend,
    errors::{InitError, QueryError, SettingsError},
    query::{PieceList, Query, MAX_PIECES_PER_SIDE, NO_PIECE, NO_SQUARE},
    settings::{parse_paths, Settings},
    tablebase::{Egtb, Node, WDL_CACHE_FRACTION},
    types::{Castling, Compression, Outcome, ProbeResult, Value, Variant},
};
