#![no_main]

use std::{io, path::Path};

use egtb_probe::{Backend, Compression, Egtb, Node, Outcome, ProbeResult, Query, Settings};
use libfuzzer_sys::fuzz_target;
use shakmaty::{fen::Fen, CastlingMode, Chess};

/// Answers every probe with the same result.
struct FakeBackend {
    result: ProbeResult,
}

impl Backend for FakeBackend {
    fn add_path(&mut self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn init(&mut self, _compression: Compression) -> io::Result<()> {
        Ok(())
    }

    fn init_cache(&mut self, _bytes: usize, _wdl_fraction: u32) -> io::Result<()> {
        Ok(())
    }

    fn release_cache(&mut self) {}

    fn release(&mut self) {}

    fn clear_paths(&mut self) {}

    fn reset_stats(&mut self) {}

    fn probe_hard(&self, query: &Query) -> ProbeResult {
        assert!(query.white.len() <= 16 && query.black.len() <= 16);
        self.result
    }

    fn probe_wdl_hard(&self, _query: &Query) -> ProbeResult {
        self.result
    }

    fn probe_soft(&self, _query: &Query) -> ProbeResult {
        self.result
    }

    fn probe_wdl_soft(&self, _query: &Query) -> ProbeResult {
        self.result
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&code, fen)) = data.split_first() else {
        return;
    };
    let Ok(fen) = Fen::from_ascii(fen) else {
        return;
    };
    let mode = CastlingMode::from_chess960(code & 0x80 != 0);
    let Ok(pos) = fen.into_position::<Chess>(mode) else {
        return;
    };

    let mut egtb = Egtb::new(FakeBackend {
        result: ProbeResult::dtm(Outcome::from_code(u32::from(code & 0x07)), u32::from(code >> 3)),
    });
    egtb.reconcile(&Settings {
        enabled: true,
        castling_mode: mode,
        ..Settings::default()
    })
    .expect("fake backend initializes");

    let mut node = Node::new(pos);
    for hard in [true, false] {
        for exact in [true, false] {
            let _ = egtb.probe(&mut node, u32::from(code), hard, exact);
        }
    }
});
