use std::path::PathBuf;

use shakmaty::{CastlingMode, Color, Position};
use tracing::{debug, info, trace, warn};

use crate::{
    backend::Backend,
    errors::InitError,
    query::Query,
    settings::{parse_paths, Settings},
    types::{Compression, Outcome, ProbeResult, Value, Variant},
};

/// Share of the cache reserved for WDL information, in units of 1/128.
pub const WDL_CACHE_FRACTION: u32 = 124;

/// The part of [`Settings`] that requires reinitialization when changed.
#[derive(Debug, Clone, Eq, PartialEq)]
struct Applied {
    cache_mib: u32,
    paths: String,
    compression: Compression,
}

impl Applied {
    fn requested(settings: &Settings) -> Applied {
        Applied {
            cache_mib: settings.cache_mib,
            paths: settings.paths.clone(),
            compression: settings.compression,
        }
    }
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Active(Applied),
    /// Initialization with this configuration failed. Not retried until the
    /// configuration changes.
    Failed(Applied),
}

/// A position together with its cumulative count of tablebase hits.
#[derive(Debug, Clone)]
pub struct Node<P> {
    pos: P,
    tb_hits: u64,
}

impl<P> Node<P> {
    pub fn new(pos: P) -> Node<P> {
        Node { pos, tb_hits: 0 }
    }

    pub fn position(&self) -> &P {
        &self.pos
    }

    /// Number of successful probes of this node so far.
    pub fn tb_hits(&self) -> u64 {
        self.tb_hits
    }
}

impl<P> From<P> for Node<P> {
    fn from(pos: P) -> Node<P> {
        Node::new(pos)
    }
}

/// Endgame tablebases, as seen from a search.
///
/// Owns the probing [`Backend`] and remembers the configuration it was
/// initialized with, so that [`Egtb::reconcile()`] can be called before
/// every search and only does work when settings actually changed.
///
/// Reconciling requires `&mut self`, probing only `&self`, so probes from
/// multiple search threads can never overlap with reinitialization.
#[derive(Debug)]
pub struct Egtb<B: Backend> {
    backend: B,
    state: State,
    castling_mode: CastlingMode,
}

impl<B: Backend> Egtb<B> {
    /// Wraps an uninitialized backend.
    pub fn new(backend: B) -> Egtb<B> {
        Egtb {
            backend,
            state: State::Uninitialized,
            castling_mode: CastlingMode::Standard,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns `true` if the backend is initialized and probes will be
    /// dispatched.
    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    pub fn castling_mode(&self) -> CastlingMode {
        self.castling_mode
    }

    /// Brings the backend in line with `settings`.
    ///
    /// * Disabled: releases the backend, if initialized.
    /// * Enabled with the cache size, path list and compression scheme
    ///   that are already applied: does nothing.
    /// * Otherwise: releases the backend and initializes it again with the
    ///   new configuration.
    ///
    /// An empty path list is not an error. The backend is initialized
    /// without paths and will not find any tables.
    ///
    /// # Errors
    ///
    /// Returns an [`InitError`] if the backend fails to initialize. All
    /// probes will then report no information. Reconciling the same
    /// configuration again does not retry.
    pub fn reconcile(&mut self, settings: &Settings) -> Result<(), InitError> {
        self.castling_mode = settings.castling_mode;

        if !settings.enabled {
            self.teardown();
            return Ok(());
        }

        let requested = Applied::requested(settings);
        match self.state {
            State::Active(ref applied) if *applied == requested => {
                trace!("tablebase configuration unchanged");
                Ok(())
            }
            State::Failed(ref applied) if *applied == requested => {
                debug!("tablebase configuration unchanged since failed initialization");
                Ok(())
            }
            _ => self.initialize(requested),
        }
    }

    fn initialize(&mut self, requested: Applied) -> Result<(), InitError> {
        self.teardown();

        let paths = parse_paths(&requested.paths);
        if paths.is_empty() {
            warn!("no tablebase paths configured");
        }

        match self.init_backend(&paths, &requested) {
            Ok(()) => {
                info!(
                    paths = paths.len(),
                    cache_mib = requested.cache_mib,
                    compression = %requested.compression,
                    "tablebases initialized"
                );
                self.state = State::Active(requested);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "tablebases disabled");
                self.release_backend();
                self.state = State::Failed(requested);
                Err(err)
            }
        }
    }

    fn init_backend(&mut self, paths: &[PathBuf], requested: &Applied) -> Result<(), InitError> {
        let mib = requested.cache_mib;
        let bytes = usize::try_from(mib)
            .ok()
            .and_then(|mib| mib.checked_mul(1024 * 1024))
            .ok_or(InitError::CacheTooLarge { mib })?;

        for path in paths {
            self.backend
                .add_path(path)
                .map_err(|source| InitError::Path {
                    path: path.clone(),
                    source,
                })?;
        }
        self.backend
            .init(requested.compression)
            .map_err(InitError::Init)?;
        self.backend
            .init_cache(bytes, WDL_CACHE_FRACTION)
            .map_err(|source| InitError::Cache { mib, source })?;
        self.backend.reset_stats();
        Ok(())
    }

    fn release_backend(&mut self) {
        self.backend.release_cache();
        self.backend.release();
        self.backend.clear_paths();
    }

    /// Releases the backend, if initialized. Does nothing otherwise.
    pub fn teardown(&mut self) {
        match std::mem::replace(&mut self.state, State::Uninitialized) {
            State::Active(_) => {
                debug!("releasing tablebases");
                self.release_backend();
            }
            State::Failed(_) | State::Uninitialized => (),
        }
    }

    /// Probes the position of `node`, `ply` plies from the search root.
    ///
    /// Selects one of the four backend probes: `hard` probes may load from
    /// disk, `exact` probes report the distance to mate.
    ///
    /// Returns the value for the side to move, or `None` if no information
    /// is available. Mate distances are counted from the root. In WDL mode
    /// decisive results are reported as [`Value::KNOWN_WIN`] or its
    /// negation. Each answered probe counts as a hit of `node`, even if the
    /// answer is not usable.
    ///
    /// Positions with castling rights are not probed in
    /// [`CastlingMode::Chess960`].
    pub fn probe<P: Position>(
        &self,
        node: &mut Node<P>,
        ply: u32,
        hard: bool,
        exact: bool,
    ) -> Option<Value> {
        if !self.is_active() {
            return None;
        }

        let query = match Query::from_position(node.position(), self.castling_mode) {
            Ok(query) => query,
            Err(err) => {
                trace!(%err, "position not probed");
                return None;
            }
        };

        let variant = Variant::new(hard, exact);
        let result = match variant {
            Variant::HardDtm => self.backend.probe_hard(&query),
            Variant::HardWdl => self.backend.probe_wdl_hard(&query),
            Variant::SoftDtm => self.backend.probe_soft(&query),
            Variant::SoftWdl => self.backend.probe_wdl_soft(&query),
        };
        trace!(?variant, ?result, "probed tablebases");

        if !result.available {
            return None;
        }
        node.tb_hits += 1;
        decode(result, query.turn, ply, variant.is_exact())
    }
}

impl<B: Backend> Drop for Egtb<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn decode(result: ProbeResult, turn: Color, ply: u32, exact: bool) -> Option<Value> {
    let winner = match result.outcome {
        Outcome::Draw => return Some(Value::DRAW),
        Outcome::WhiteMates => Color::White,
        Outcome::BlackMates => Color::Black,
        Outcome::Forbidden | Outcome::Unknown => return None,
    };

    let value = if exact {
        Value::mate_in(result.plies_to_mate?.saturating_add(ply))
    } else {
        Value::KNOWN_WIN
    };

    Some(if winner == turn { value } else { -value })
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        path::Path,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
    };

    use proptest::prelude::*;
    use shakmaty::{fen::Fen, Chess, PositionError};

    use super::*;

    #[derive(Debug, Default)]
    struct Log {
        calls: Vec<&'static str>,
        paths: Vec<PathBuf>,
        compression: Option<Compression>,
        cache: Option<(usize, u32)>,
    }

    #[derive(Debug, Default)]
    struct Recorder {
        log: Arc<Mutex<Log>>,
        probes: Arc<[AtomicUsize; 4]>,
        fail_init: bool,
        answer: Option<ProbeResult>,
    }

    impl Recorder {
        fn record(&self, call: &'static str) {
            self.log.lock().unwrap().calls.push(call);
        }

        fn respond(&self, variant: Variant) -> ProbeResult {
            let index = Variant::ALL.iter().position(|v| *v == variant).unwrap();
            self.probes[index].fetch_add(1, Ordering::SeqCst);
            self.answer.unwrap_or(ProbeResult::unavailable())
        }
    }

    impl Backend for Recorder {
        fn add_path(&mut self, path: &Path) -> io::Result<()> {
            self.record("add_path");
            self.log.lock().unwrap().paths.push(path.to_owned());
            Ok(())
        }

        fn init(&mut self, compression: Compression) -> io::Result<()> {
            self.record("init");
            self.log.lock().unwrap().compression = Some(compression);
            if self.fail_init {
                Err(io::Error::new(io::ErrorKind::Other, "broken index"))
            } else {
                Ok(())
            }
        }

        fn init_cache(&mut self, bytes: usize, wdl_fraction: u32) -> io::Result<()> {
            self.record("init_cache");
            self.log.lock().unwrap().cache = Some((bytes, wdl_fraction));
            Ok(())
        }

        fn release_cache(&mut self) {
            self.record("release_cache");
        }

        fn release(&mut self) {
            self.record("release");
        }

        fn clear_paths(&mut self) {
            self.record("clear_paths");
            self.log.lock().unwrap().paths.clear();
        }

        fn reset_stats(&mut self) {
            self.record("reset_stats");
        }

        fn probe_hard(&self, _query: &Query) -> ProbeResult {
            self.respond(Variant::HardDtm)
        }

        fn probe_wdl_hard(&self, _query: &Query) -> ProbeResult {
            self.respond(Variant::HardWdl)
        }

        fn probe_soft(&self, _query: &Query) -> ProbeResult {
            self.respond(Variant::SoftDtm)
        }

        fn probe_wdl_soft(&self, _query: &Query) -> ProbeResult {
            self.respond(Variant::SoftWdl)
        }
    }

    fn enabled(paths: &str) -> Settings {
        Settings {
            enabled: true,
            paths: paths.to_owned(),
            cache_mib: 2,
            ..Settings::default()
        }
    }

    fn node(fen: &str, mode: CastlingMode) -> Node<Chess> {
        fen.parse::<Fen>()
            .expect("valid fen")
            .into_position::<Chess>(mode)
            .expect("legal position")
            .into()
    }

    fn active(answer: ProbeResult) -> (Egtb<Recorder>, Arc<[AtomicUsize; 4]>) {
        let recorder = Recorder {
            answer: Some(answer),
            ..Recorder::default()
        };
        let probes = Arc::clone(&recorder.probes);
        let mut egtb = Egtb::new(recorder);
        egtb.reconcile(&enabled("gtb")).expect("init");
        (egtb, probes)
    }

    fn total(probes: &[AtomicUsize; 4]) -> usize {
        probes.iter().map(|n| n.load(Ordering::SeqCst)).sum()
    }

    #[test]
    fn test_send_sync() {
        fn assert_send<T: Send>(_: T) {}
        fn assert_sync<T: Sync>(_: T) {}

        assert_send(Egtb::new(Recorder::default()));
        assert_sync(Egtb::new(Recorder::default()));
    }

    #[test]
    fn test_initialize() {
        let recorder = Recorder::default();
        let log = Arc::clone(&recorder.log);
        let mut egtb = Egtb::new(recorder);
        assert!(!egtb.is_active());

        let settings = Settings {
            compression: Compression::Zlib9,
            ..enabled("a ; b;; c ")
        };
        egtb.reconcile(&settings).expect("init");
        assert!(egtb.is_active());

        let log = log.lock().unwrap();
        assert_eq!(
            log.calls,
            ["add_path", "add_path", "add_path", "init", "init_cache", "reset_stats"]
        );
        assert_eq!(
            log.paths,
            [PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
        assert_eq!(log.compression, Some(Compression::Zlib9));
        assert_eq!(log.cache, Some((2 * 1024 * 1024, WDL_CACHE_FRACTION)));
    }

    #[test]
    fn test_unchanged_configuration_is_not_reinitialized() {
        let recorder = Recorder::default();
        let log = Arc::clone(&recorder.log);
        let mut egtb = Egtb::new(recorder);

        let settings = enabled("/tb");
        egtb.reconcile(&settings).expect("init");
        let calls = log.lock().unwrap().calls.len();

        egtb.reconcile(&settings).expect("unchanged");
        egtb.reconcile(&settings.clone()).expect("unchanged");
        assert_eq!(log.lock().unwrap().calls.len(), calls);
        assert_eq!(
            log.lock().unwrap().calls.iter().filter(|c| **c == "init").count(),
            1
        );

        // Only the castling mode changed.
        let chess960 = Settings {
            castling_mode: CastlingMode::Chess960,
            ..settings
        };
        egtb.reconcile(&chess960).expect("unchanged");
        assert_eq!(log.lock().unwrap().calls.len(), calls);
        assert_eq!(egtb.castling_mode(), CastlingMode::Chess960);
    }

    #[test]
    fn test_changed_configuration_is_rebuilt() {
        let recorder = Recorder::default();
        let log = Arc::clone(&recorder.log);
        let mut egtb = Egtb::new(recorder);

        egtb.reconcile(&enabled("/tb")).expect("init");
        log.lock().unwrap().calls.clear();

        egtb.reconcile(&Settings {
            cache_mib: 64,
            ..enabled("/tb")
        })
        .expect("reinit");

        let log = log.lock().unwrap();
        assert_eq!(
            log.calls,
            [
                "release_cache",
                "release",
                "clear_paths",
                "add_path",
                "init",
                "init_cache",
                "reset_stats"
            ]
        );
        assert_eq!(log.paths, [PathBuf::from("/tb")]);
        assert_eq!(log.cache, Some((64 * 1024 * 1024, WDL_CACHE_FRACTION)));
    }

    #[test]
    fn test_disable() {
        let recorder = Recorder::default();
        let log = Arc::clone(&recorder.log);
        let mut egtb = Egtb::new(recorder);

        // Nothing to release yet.
        egtb.reconcile(&Settings::default()).expect("disable");
        assert!(log.lock().unwrap().calls.is_empty());

        egtb.reconcile(&enabled("/tb")).expect("init");
        log.lock().unwrap().calls.clear();

        egtb.reconcile(&Settings::default()).expect("disable");
        egtb.reconcile(&Settings::default()).expect("disable again");
        egtb.teardown();
        assert!(!egtb.is_active());
        assert_eq!(
            log.lock().unwrap().calls,
            ["release_cache", "release", "clear_paths"]
        );

        // Enabling again with the previous configuration initializes.
        egtb.reconcile(&enabled("/tb")).expect("init");
        assert!(egtb.is_active());
    }

    #[test]
    fn test_drop_releases() {
        let recorder = Recorder::default();
        let log = Arc::clone(&recorder.log);
        let mut egtb = Egtb::new(recorder);
        egtb.reconcile(&enabled("/tb")).expect("init");
        log.lock().unwrap().calls.clear();

        drop(egtb);
        assert_eq!(
            log.lock().unwrap().calls,
            ["release_cache", "release", "clear_paths"]
        );
    }

    #[test]
    fn test_empty_path_list() {
        let recorder = Recorder::default();
        let log = Arc::clone(&recorder.log);
        let mut egtb = Egtb::new(recorder);

        egtb.reconcile(&enabled(" ; ")).expect("init without paths");
        assert!(egtb.is_active());
        assert_eq!(
            log.lock().unwrap().calls,
            ["init", "init_cache", "reset_stats"]
        );
    }

    #[test]
    fn test_failed_initialization() {
        let recorder = Recorder {
            fail_init: true,
            answer: Some(ProbeResult::wdl(Outcome::Draw)),
            ..Recorder::default()
        };
        let log = Arc::clone(&recorder.log);
        let probes = Arc::clone(&recorder.probes);
        let mut egtb = Egtb::new(recorder);

        assert!(matches!(
            egtb.reconcile(&enabled("/tb")),
            Err(InitError::Init(_))
        ));
        assert!(!egtb.is_active());
        assert_eq!(
            log.lock().unwrap().calls,
            ["add_path", "init", "release_cache", "release", "clear_paths"]
        );

        let mut node = node("8/8/8/8/8/8/8/K6k w - - 0 1", CastlingMode::Standard);
        assert_eq!(egtb.probe(&mut node, 0, true, true), None);
        assert_eq!(total(&probes), 0);
        assert_eq!(node.tb_hits(), 0);

        // Not retried for the same configuration.
        log.lock().unwrap().calls.clear();
        egtb.reconcile(&enabled("/tb")).expect("unchanged");
        assert!(log.lock().unwrap().calls.is_empty());

        // Disabling after a failure has nothing to release.
        egtb.reconcile(&Settings::default()).expect("disable");
        assert!(log.lock().unwrap().calls.is_empty());
    }

    #[test]
    fn test_variant_dispatch() {
        let (egtb, probes) = active(ProbeResult::unavailable());
        let mut node = node("8/8/8/8/8/8/8/K6k w - - 0 1", CastlingMode::Standard);

        for (i, variant) in Variant::ALL.into_iter().enumerate() {
            egtb.probe(&mut node, 0, variant.is_hard(), variant.is_exact());
            for (j, count) in probes.iter().enumerate() {
                assert_eq!(count.load(Ordering::SeqCst), usize::from(j <= i));
            }
        }
    }

    #[test]
    fn test_draw() {
        let (egtb, _) = active(ProbeResult::dtm(Outcome::Draw, 0));
        for fen in ["8/8/8/8/8/8/8/K6k w - - 0 1", "8/8/8/8/8/8/8/K6k b - - 0 1"] {
            let mut node = node(fen, CastlingMode::Standard);
            assert_eq!(egtb.probe(&mut node, 7, true, true), Some(Value::DRAW));
            assert_eq!(node.tb_hits(), 1);
        }
    }

    #[test]
    fn test_mate_distance() {
        let (egtb, _) = active(ProbeResult::dtm(Outcome::WhiteMates, 5));

        let mut white = node("7k/8/8/8/8/8/8/KQ6 w - - 0 1", CastlingMode::Standard);
        assert_eq!(egtb.probe(&mut white, 3, true, true), Some(Value::mate_in(8)));
        assert_eq!(egtb.probe(&mut white, 3, false, true), Some(Value(29992)));

        let mut black = node("7k/8/8/8/8/8/8/KQ6 b - - 0 1", CastlingMode::Standard);
        assert_eq!(egtb.probe(&mut black, 3, true, true), Some(Value::mated_in(8)));
        assert_eq!(egtb.probe(&mut black, 3, true, true), Some(Value(-29992)));
        assert_eq!(black.tb_hits(), 2);
    }

    #[test]
    fn test_known_win() {
        let (egtb, _) = active(ProbeResult::wdl(Outcome::BlackMates));

        let mut black = node("7k/8/8/8/8/8/2q5/K7 b - - 0 1", CastlingMode::Standard);
        assert_eq!(egtb.probe(&mut black, 9, true, false), Some(Value::KNOWN_WIN));

        let mut white = node("7k/8/8/8/8/8/2q5/K7 w - - 0 1", CastlingMode::Standard);
        assert_eq!(egtb.probe(&mut white, 9, false, false), Some(-Value::KNOWN_WIN));
    }

    #[test]
    fn test_no_information() {
        let mut node = node("8/8/8/8/8/8/8/K6k w - - 0 1", CastlingMode::Standard);

        let (egtb, _) = active(ProbeResult::unavailable());
        assert_eq!(egtb.probe(&mut node, 0, true, true), None);
        assert_eq!(node.tb_hits(), 0);

        // Answered, but not usable.
        for outcome in [Outcome::Forbidden, Outcome::Unknown] {
            let (egtb, _) = active(ProbeResult::dtm(outcome, 3));
            assert_eq!(egtb.probe(&mut node, 0, true, true), None);
        }
        assert_eq!(node.tb_hits(), 2);

        // Exact probe without distance.
        let (egtb, _) = active(ProbeResult::wdl(Outcome::WhiteMates));
        assert_eq!(egtb.probe(&mut node, 0, true, true), None);
    }

    #[test]
    fn test_too_many_pieces_not_probed() {
        let (egtb, probes) = active(ProbeResult::wdl(Outcome::WhiteMates));

        let pos: Chess = "7k/8/8/8/8/NNNNNNNN/BBBBBBBB/4K3 w - - 0 1"
            .parse::<Fen>()
            .expect("valid fen")
            .into_position(CastlingMode::Standard)
            .or_else(PositionError::ignore_too_much_material)
            .expect("valid apart from material");
        let mut node = Node::new(pos);
        for variant in Variant::ALL {
            assert_eq!(
                egtb.probe(&mut node, 0, variant.is_hard(), variant.is_exact()),
                None
            );
        }
        assert_eq!(total(&probes), 0);
        assert_eq!(node.tb_hits(), 0);
    }

    #[test]
    fn test_chess960_castling_not_probed() {
        let (mut egtb, probes) = active(ProbeResult::wdl(Outcome::Draw));
        egtb.reconcile(&Settings {
            castling_mode: CastlingMode::Chess960,
            ..enabled("gtb")
        })
        .expect("unchanged");

        let mut castling = node("4k3/8/8/8/8/8/8/R3K2R w K - 0 1", CastlingMode::Chess960);
        for variant in Variant::ALL {
            assert_eq!(
                egtb.probe(&mut castling, 0, variant.is_hard(), variant.is_exact()),
                None
            );
        }
        assert_eq!(total(&probes), 0);
        assert_eq!(castling.tb_hits(), 0);

        let mut plain = node("4k3/8/8/8/8/8/8/R3K2R w - - 0 1", CastlingMode::Chess960);
        assert_eq!(egtb.probe(&mut plain, 0, true, false), Some(Value::DRAW));
        assert_eq!(total(&probes), 1);
    }

    #[test]
    fn test_cache_too_large() {
        let mut egtb = Egtb::new(Recorder::default());
        let result = egtb.reconcile(&Settings {
            cache_mib: u32::MAX,
            ..enabled("/tb")
        });
        if usize::BITS < 64 {
            assert!(matches!(result, Err(InitError::CacheTooLarge { .. })));
        } else {
            assert!(result.is_ok());
        }
    }

    proptest! {
        #[test]
        fn test_exact_and_wdl_agree_in_sign(
            white_mates in any::<bool>(),
            white_to_move in any::<bool>(),
            plies in 0u32..500,
            ply in 0u32..128
        ) {
            let outcome = if white_mates { Outcome::WhiteMates } else { Outcome::BlackMates };
            let turn = if white_to_move { Color::White } else { Color::Black };

            let exact = decode(ProbeResult::dtm(outcome, plies), turn, ply, true).unwrap();
            let wdl = decode(ProbeResult::wdl(outcome), turn, ply, false).unwrap();

            prop_assert_eq!(exact.0.signum(), wdl.0.signum());
            prop_assert_eq!(exact.mate_plies(), Some(plies + ply));
            prop_assert_eq!(wdl.mate_plies(), None);
            prop_assert_eq!(wdl.0.abs(), Value::KNOWN_WIN.0);
        }
    }
}
