use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use mlc_sim::cache::LevelStats;
use mlc_sim::hierarchy::{Hierarchy, HierarchyConfig, LevelConfig};
use mlc_sim::trace::TraceRecord;

#[derive(Parser)]
#[command(
    name = "mlcsim",
    version,
    about = "Multi-level cache simulator: replays a memory trace against an I$/D$/L2 hierarchy"
)]
struct Cli {
    /// Trace file: one access per line, kind letter (I/L/S) then hex address
    trace: PathBuf,

    /// Number of sets in the I$ (0 = no I$)
    #[arg(long, default_value_t = 64)]
    icache_sets: u64,
    /// I$ associativity
    #[arg(long, default_value_t = 2)]
    icache_assoc: u64,
    /// I$ hit time in cycles
    #[arg(long, default_value_t = 1)]
    icache_hit_time: u64,

    /// Number of sets in the D$ (0 = no D$)
    #[arg(long, default_value_t = 64)]
    dcache_sets: u64,
    /// D$ associativity
    #[arg(long, default_value_t = 2)]
    dcache_assoc: u64,
    /// D$ hit time in cycles
    #[arg(long, default_value_t = 1)]
    dcache_hit_time: u64,

    /// Number of sets in the L2$ (0 = no L2$)
    #[arg(long, default_value_t = 256)]
    l2cache_sets: u64,
    /// L2$ associativity
    #[arg(long, default_value_t = 8)]
    l2cache_assoc: u64,
    /// L2$ hit time in cycles
    #[arg(long, default_value_t = 10)]
    l2cache_hit_time: u64,

    /// Block size in bytes, shared by all levels
    #[arg(long, default_value_t = 64)]
    block_size: u64,
    /// Main-memory latency in cycles
    #[arg(long, default_value_t = 100)]
    mem_latency: u64,
    /// Make the L2 inclusive of both first-level caches
    #[arg(long)]
    inclusive: bool,
    /// Address width in bits
    #[arg(long, default_value_t = 32)]
    addr_bits: u32,
}

impl Cli {
    fn hierarchy_config(&self) -> HierarchyConfig {
        HierarchyConfig {
            icache: LevelConfig {
                sets: self.icache_sets,
                assoc: self.icache_assoc,
                hit_time: self.icache_hit_time,
            },
            dcache: LevelConfig {
                sets: self.dcache_sets,
                assoc: self.dcache_assoc,
                hit_time: self.dcache_hit_time,
            },
            l2: LevelConfig {
                sets: self.l2cache_sets,
                assoc: self.l2cache_assoc,
                hit_time: self.l2cache_hit_time,
            },
            block_size: self.block_size,
            mem_latency: self.mem_latency,
            inclusive: self.inclusive,
            addr_bits: self.addr_bits,
        }
    }
}

#[derive(Debug)]
struct ReplaySummary {
    accesses: u64,
    total_cycles: u64,
}

fn replay(reader: impl BufRead, hierarchy: &mut Hierarchy) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary { accesses: 0, total_cycles: 0 };
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read trace line {}", lineno + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: TraceRecord = trimmed
            .parse()
            .with_context(|| format!("trace line {}", lineno + 1))?;
        summary.accesses += 1;
        summary.total_cycles += hierarchy.access(record.address, record.kind);
    }
    Ok(summary)
}

fn print_level(name: &str, stats: &LevelStats) {
    let miss_rate = if stats.refs > 0 {
        stats.misses as f64 / stats.refs as f64 * 100.0
    } else {
        0.0
    };
    println!(
        "{:<5} refs {:>12}  misses {:>12}  miss rate {:>6.2}%  penalty cycles {:>12}",
        name, stats.refs, stats.misses, miss_rate, stats.penalty_cycles
    );
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut hierarchy = Hierarchy::new(&cli.hierarchy_config())
        .context("failed to build cache hierarchy")?;

    let reader = BufReader::new(
        File::open(&cli.trace)
            .with_context(|| format!("cant open trace file {}", cli.trace.display()))?,
    );
    let summary = replay(reader, &mut hierarchy)?;

    print_level("I$", hierarchy.icache_stats());
    print_level("D$", hierarchy.dcache_stats());
    print_level("L2$", hierarchy.l2cache_stats());
    println!();
    println!("accesses       : {}", summary.accesses);
    println!("total cycles   : {}", summary.total_cycles);
    if summary.accesses > 0 {
        println!(
            "avg access time: {:.2} cycles",
            summary.total_cycles as f64 / summary.accesses as f64
        );
    }
    Ok(())
}
