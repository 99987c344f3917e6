use std::{io, path::Path, path::PathBuf};

use shakmaty::{
    CastlingMode, Chess, Color, FromSetup as _, Position as _, Setup, Square,
};
use shakmaty_syzygy::{Tablebase, Wdl};
use tracing::{debug, warn};

use crate::{
    backend::Backend,
    query::Query,
    types::{Castling, Compression, Outcome, ProbeResult},
};

/// A [`Backend`] for Syzygy tables, using `shakmaty-syzygy`.
///
/// Syzygy tables do not store distance to mate, so exact probes are always
/// unavailable. There is no cache-only access either, so soft probes behave
/// like hard probes. Cache size and compression scheme are ignored.
#[derive(Debug, Default)]
pub struct SyzygyBackend {
    paths: Vec<PathBuf>,
    tables: Option<Tablebase<Chess>>,
}

impl SyzygyBackend {
    pub fn new() -> SyzygyBackend {
        SyzygyBackend::default()
    }

    /// Returns the maximum number of pieces over all loaded tables.
    pub fn max_pieces(&self) -> usize {
        self.tables.as_ref().map_or(0, Tablebase::max_pieces)
    }

    fn probe_wdl(&self, query: &Query) -> ProbeResult {
        let Some(tables) = self.tables.as_ref() else {
            return ProbeResult::unavailable();
        };
        let Some(pos) = position(query) else {
            return ProbeResult::unavailable();
        };
        if pos.board().occupied().count() > tables.max_pieces() {
            return ProbeResult::unavailable();
        }

        match tables.probe_wdl_after_zeroing(&pos) {
            Ok(wdl) => ProbeResult::wdl(outcome(wdl, pos.turn())),
            Err(err) => {
                debug!(%err, "syzygy probe failed");
                ProbeResult::unavailable()
            }
        }
    }
}

/// Converts a result for the side to move into an outcome from white's
/// point of view. Cursed wins and blessed losses count as decisive.
fn outcome(wdl: Wdl, turn: Color) -> Outcome {
    let winner = match wdl {
        Wdl::Win | Wdl::CursedWin => turn,
        Wdl::Loss | Wdl::BlessedLoss => !turn,
        Wdl::Draw => return Outcome::Draw,
    };
    match winner {
        Color::White => Outcome::WhiteMates,
        Color::Black => Outcome::BlackMates,
    }
}

/// Rebuilds a position from a query. `None` if it is not legal.
fn position(query: &Query) -> Option<Chess> {
    let mut setup = Setup::empty();
    for color in Color::ALL {
        for (sq, role) in query.by_color(color).iter() {
            setup.board.set_piece_at(sq, role.of(color));
        }
    }
    setup.turn = query.turn;
    setup.ep_square = query.ep_square;
    for (flag, rook) in [
        (Castling::WHITE_SHORT, Square::H1),
        (Castling::WHITE_LONG, Square::A1),
        (Castling::BLACK_SHORT, Square::H8),
        (Castling::BLACK_LONG, Square::A8),
    ] {
        if query.castling.contains(flag) {
            setup.castling_rights.add(rook);
        }
    }
    Chess::from_setup(setup, CastlingMode::Standard).ok()
}

impl Backend for SyzygyBackend {
    fn add_path(&mut self, path: &Path) -> io::Result<()> {
        self.paths.push(path.to_owned());
        Ok(())
    }

    fn init(&mut self, compression: Compression) -> io::Result<()> {
        debug!(%compression, "compression scheme not applicable to syzygy tables");
        let mut tables = Tablebase::new();
        for path in &self.paths {
            match tables.add_directory(path) {
                Ok(num) => debug!(?path, num, "added syzygy tables"),
                Err(err) => warn!(?path, %err, "skipping syzygy directory"),
            }
        }
        self.tables = Some(tables);
        Ok(())
    }

    fn init_cache(&mut self, bytes: usize, _wdl_fraction: u32) -> io::Result<()> {
        debug!(bytes, "syzygy tables are not cached");
        Ok(())
    }

    fn release_cache(&mut self) {}

    fn release(&mut self) {
        self.tables = None;
    }

    fn clear_paths(&mut self) {
        self.paths.clear();
    }

    fn reset_stats(&mut self) {}

    fn probe_hard(&self, _query: &Query) -> ProbeResult {
        ProbeResult::unavailable()
    }

    fn probe_wdl_hard(&self, query: &Query) -> ProbeResult {
        self.probe_wdl(query)
    }

    fn probe_soft(&self, _query: &Query) -> ProbeResult {
        ProbeResult::unavailable()
    }

    fn probe_wdl_soft(&self, query: &Query) -> ProbeResult {
        self.probe_wdl(query)
    }
}
