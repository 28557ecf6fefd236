use log::debug;

use crate::cache::{Cache, LevelStats};
use crate::geometry::{Geometry, GeometryError};

/// How an access enters the hierarchy. Reads and writes take the same data
/// path; the model tracks block presence only, so there is nothing to dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    InstructionFetch,
    DataRead,
    DataWrite,
}

/// Raw parameters of one cache level. `sets == 0` means the level does not
/// exist and all traffic passes through to the next one.
#[derive(Debug, Clone, Copy)]
pub struct LevelConfig {
    pub sets: u64,
    pub assoc: u64,
    pub hit_time: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct HierarchyConfig {
    pub icache: LevelConfig,
    pub dcache: LevelConfig,
    pub l2: LevelConfig,
    /// Block size in bytes, shared by every level.
    pub block_size: u64,
    /// Main-memory latency in cycles, charged on an L2 miss.
    pub mem_latency: u64,
    /// Enforce inclusion of I$ and D$ contents in L2.
    pub inclusive: bool,
    /// Architectural address width in bits.
    pub addr_bits: u32,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        HierarchyConfig {
            icache: LevelConfig { sets: 64, assoc: 2, hit_time: 1 },
            dcache: LevelConfig { sets: 64, assoc: 2, hit_time: 1 },
            l2: LevelConfig { sets: 256, assoc: 8, hit_time: 10 },
            block_size: 64,
            mem_latency: 100,
            inclusive: false,
            addr_bits: 32,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum L1 {
    Instruction,
    Data,
}

/// The simulated memory hierarchy: two independent first-level caches in
/// front of a shared L2, in front of a flat main memory.
#[derive(Debug)]
pub struct Hierarchy {
    icache: Cache,
    dcache: Cache,
    l2: Cache,
    mem_latency: u64,
    inclusive: bool,
}

impl Hierarchy {
    pub fn new(config: &HierarchyConfig) -> Result<Self, GeometryError> {
        let resolve = |level: &LevelConfig| -> Result<Geometry, GeometryError> {
            Geometry::resolve(level.sets, level.assoc, config.block_size, config.addr_bits)
        };
        let icache = Cache::new(resolve(&config.icache)?, config.icache.hit_time);
        let dcache = Cache::new(resolve(&config.dcache)?, config.dcache.hit_time);
        let l2 = Cache::new(resolve(&config.l2)?, config.l2.hit_time);

        for (name, cache) in [("I$", &icache), ("D$", &dcache), ("L2$", &l2)] {
            let g = cache.geometry();
            debug!(
                "{name}: offset {} bits, index {} bits, tag {} bits",
                g.offset_bits, g.index_bits, g.tag_bits
            );
        }

        Ok(Hierarchy {
            icache,
            dcache,
            l2,
            mem_latency: config.mem_latency,
            inclusive: config.inclusive,
        })
    }

    /// Run one access to completion and return its latency in cycles.
    pub fn access(&mut self, addr: u64, kind: AccessKind) -> u64 {
        match kind {
            AccessKind::InstructionFetch => self.icache_access(addr),
            AccessKind::DataRead | AccessKind::DataWrite => self.dcache_access(addr),
        }
    }

    pub fn icache_access(&mut self, addr: u64) -> u64 {
        self.l1_access(L1::Instruction, addr)
    }

    pub fn dcache_access(&mut self, addr: u64) -> u64 {
        self.l1_access(L1::Data, addr)
    }

    fn l1(&self, which: L1) -> &Cache {
        match which {
            L1::Instruction => &self.icache,
            L1::Data => &self.dcache,
        }
    }

    fn l1_mut(&mut self, which: L1) -> &mut Cache {
        match which {
            L1::Instruction => &mut self.icache,
            L1::Data => &mut self.dcache,
        }
    }

    // Both first-level paths are this one routine; only which cache they
    // charge differs. The install runs after the L2 access so an inclusion
    // invalidation triggered downstream can free a slot in this very set.
    fn l1_access(&mut self, which: L1, addr: u64) -> u64 {
        if self.l1(which).is_absent() {
            return self.l2cache_access(addr);
        }
        if self.l1_mut(which).lookup(addr) {
            return self.l1(which).hit_time();
        }
        self.l1_mut(which).record_miss();
        let downstream = self.l2cache_access(addr);
        let cache = self.l1_mut(which);
        cache.add_penalty(downstream);
        cache.insert(addr);
        cache.hit_time() + downstream
    }

    pub fn l2cache_access(&mut self, addr: u64) -> u64 {
        if self.l2.is_absent() {
            return self.mem_latency;
        }
        if self.l2.lookup(addr) {
            return self.l2.hit_time();
        }
        self.l2.record_miss();
        self.l2.add_penalty(self.mem_latency);
        let evicted = self.l2.insert(addr);
        if self.inclusive {
            if let Some(evicted) = evicted {
                self.enforce_inclusion(evicted.tag, evicted.set_index);
            }
        }
        self.l2.hit_time() + self.mem_latency
    }

    // An L2 eviction must not leave a stale copy live in either L1. The
    // evicted block address is rebuilt from the L2 tag and set index
    // (offset bits zero-filled) and re-decomposed under each L1 geometry.
    fn enforce_inclusion(&mut self, evicted_tag: u64, set_index: usize) {
        let evicted_addr = self.l2.geometry().reconstruct(evicted_tag, set_index as u64);
        for cache in [&mut self.icache, &mut self.dcache] {
            if cache.is_absent() {
                continue;
            }
            let (tag, index) = cache.geometry().decompose(evicted_addr);
            cache.invalidate(tag, index);
        }
    }

    pub fn icache_stats(&self) -> &LevelStats {
        self.icache.stats()
    }

    pub fn dcache_stats(&self) -> &LevelStats {
        self.dcache.stats()
    }

    pub fn l2cache_stats(&self) -> &LevelStats {
        self.l2.stats()
    }

    /// Non-mutating residency probes, mainly for assertions about the
    /// inclusion property.
    pub fn icache_contains(&self, addr: u64) -> bool {
        !self.icache.is_absent() && self.icache.contains(addr)
    }

    pub fn dcache_contains(&self, addr: u64) -> bool {
        !self.dcache.is_absent() && self.dcache.contains(addr)
    }

    pub fn l2cache_contains(&self, addr: u64) -> bool {
        !self.l2.is_absent() && self.l2.contains(addr)
    }
}
