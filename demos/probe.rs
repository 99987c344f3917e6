use std::error::Error;

use clap::Parser;
use egtb_probe::{Egtb, Node, Settings, SyzygyBackend, Variant};
use shakmaty::{fen::Fen, CastlingMode, Chess};

#[derive(Debug, Parser)]
struct Opt {
    /// Tablebase directories, separated by `;`
    #[arg(long = "path")]
    path: String,
    /// Treat castling rights as chess960 rights
    #[arg(long)]
    chess960: bool,
    /// Plies from the search root
    #[arg(long, default_value_t = 0)]
    ply: u32,
    /// Positions to probe
    fen: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let opt = Opt::parse();

    let settings = Settings {
        enabled: true,
        paths: opt.path,
        castling_mode: CastlingMode::from_chess960(opt.chess960),
        ..Settings::default()
    };

    let mut egtb = Egtb::new(SyzygyBackend::new());
    egtb.reconcile(&settings)?;
    eprintln!("tables up to {} pieces", egtb.backend().max_pieces());

    for fen in opt.fen {
        let pos: Chess = fen.parse::<Fen>()?.into_position(settings.castling_mode)?;
        let mut node = Node::new(pos);

        for variant in Variant::ALL {
            match egtb.probe(&mut node, opt.ply, variant.is_hard(), variant.is_exact()) {
                Some(value) => println!("{fen}\t{variant:?}\t{value}"),
                None => println!("{fen}\t{variant:?}\t-"),
            }
        }
        println!("{fen}\ttbhits {}", node.tb_hits());
    }

    Ok(())
}
