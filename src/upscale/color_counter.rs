//! Per-round color frequency ranking.
//!
//! The distance field finalizes one wavefront per round and needs to give the
//! colors of that wavefront distinct, repeatable sub-levels. [`RankedColorCounter`]
//! counts the colors seen in a round and ranks them by descending frequency.
//!
//! The counter is reused for every round of an image, so clearing must be
//! cheap: [`EpochTable`] tags each slot with the epoch that wrote it and a
//! reset only bumps the current epoch. Stale slots are treated as empty and
//! are dropped the next time the table grows.

const INITIAL_CAPACITY: usize = 16;

/// Knuth multiplicative hash, folded so the mask sees the high bits.
fn slot_hash(key: u32) -> usize {
    let h = key.wrapping_mul(0x9E37_79B1);
    (h ^ (h >> 16)) as usize
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    key: u32,
    /// Epoch that wrote this slot; 0 is never current.
    epoch: u32,
    value: u32,
}

/// Open-addressing `u32 -> u32` map with O(1) clearing.
#[derive(Debug, Clone)]
pub struct EpochTable {
    slots: Vec<Slot>,
    epoch: u32,
    filled: usize,
}

impl Default for EpochTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EpochTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self { slots: vec![Slot::default(); INITIAL_CAPACITY], epoch: 1, filled: 0 }
    }

    /// Number of keys written since the last [`clear`](Self::clear).
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Number of slots in the backing storage.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Forget every key by starting a new epoch.
    pub fn clear(&mut self) {
        if self.filled == 0 {
            return;
        }
        self.filled = 0;
        if self.epoch == u32::MAX {
            self.slots.fill(Slot::default());
            self.epoch = 1;
        } else {
            self.epoch += 1;
        }
    }

    /// Index of the slot holding `key`, or of the first free slot on its probe path.
    fn find(&self, key: u32) -> usize {
        let mask = self.slots.len() - 1;
        let mut index = slot_hash(key) & mask;
        loop {
            let slot = &self.slots[index];
            if slot.epoch != self.epoch || slot.key == key {
                return index;
            }
            index = (index + 1) & mask;
        }
    }

    /// Look up the value stored for `key` in the current epoch.
    pub fn get(&self, key: u32) -> Option<u32> {
        let slot = &self.slots[self.find(key)];
        (slot.epoch == self.epoch).then_some(slot.value)
    }

    /// Insert or overwrite the value for `key`.
    pub fn insert(&mut self, key: u32, value: u32) {
        let index = self.find(key);
        if self.slots[index].epoch != self.epoch {
            self.filled += 1;
        }
        self.slots[index] = Slot { key, epoch: self.epoch, value };

        if self.filled * 4 > self.slots.len() * 3 {
            self.grow();
        }
    }

    /// Double the capacity, carrying over only live slots.
    fn grow(&mut self) {
        let capacity = self.slots.len() * 2;
        let old = std::mem::replace(&mut self.slots, vec![Slot::default(); capacity]);
        let mask = capacity - 1;

        for slot in old.into_iter().filter(|s| s.epoch == self.epoch) {
            let mut index = slot_hash(slot.key) & mask;
            while self.slots[index].epoch == self.epoch {
                index = (index + 1) & mask;
            }
            self.slots[index] = slot;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ColorCount {
    color: u32,
    count: u32,
    /// Sequence number of the increment that produced `count`.
    reached: u32,
}

/// Counts colors within one round and ranks them by frequency.
///
/// Usage per round: [`start`](Self::start), any number of
/// [`increment`](Self::increment) calls, [`rank`](Self::rank), then
/// [`rank_of`](Self::rank_of) lookups.
#[derive(Debug, Clone, Default)]
pub struct RankedColorCounter {
    /// Color to index into `entries`; after `rank()` that index is the rank.
    table: EpochTable,
    /// Colors in first-seen order until ranked, in rank order afterwards.
    entries: Vec<ColorCount>,
    ticks: u32,
    ranked: bool,
}

impl RankedColorCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new counting round.
    pub fn start(&mut self) {
        self.table.clear();
        self.entries.clear();
        self.ticks = 0;
        self.ranked = false;
    }

    /// Record one occurrence of `color`.
    pub fn increment(&mut self, color: u32) {
        self.ticks = self.ticks.wrapping_add(1);
        self.ranked = false;

        match self.table.get(color) {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.count += 1;
                entry.reached = self.ticks;
            }
            None => {
                self.table.insert(color, self.entries.len() as u32);
                self.entries.push(ColorCount { color, count: 1, reached: self.ticks });
            }
        }
    }

    /// Number of distinct colors seen since the last `start`.
    pub fn distinct_count(&self) -> usize {
        self.entries.len()
    }

    /// Occurrences of `color` since the last `start`.
    pub fn count_of(&self, color: u32) -> u32 {
        self.table.get(color).map_or(0, |index| self.entries[index as usize].count)
    }

    /// Assign ranks: most frequent color first, ties to whichever color reached
    /// the shared count first.
    pub fn rank(&mut self) {
        self.entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.reached.cmp(&b.reached)));
        for (rank, entry) in self.entries.iter().enumerate() {
            self.table.insert(entry.color, rank as u32);
        }
        self.ranked = true;
    }

    /// Rank of `color`, available between `rank()` and the next update.
    pub fn rank_of(&self, color: u32) -> Option<u32> {
        if !self.ranked {
            return None;
        }
        self.table.get(color)
    }
}
