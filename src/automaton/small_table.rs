//! Compact byte-range transition tables.

use super::arena::StateId;

/// Number of byte values a table covers. UTF-8 bytes 0xF5-0xFF can't appear
/// in valid strings, so 0xF5 is free to serve as the value terminator.
pub const BYTE_CEILING: usize = 0xF6;

/// Marks the end of a value being matched. Every value is traversed as if
/// this byte followed its last real byte, which separates exact matches from
/// prefix matches.
pub const VALUE_TERMINATOR: u8 = 0xF5;

/// A compact lookup table encoding byte value ranges to state transitions.
///
/// Each ceiling is the exclusive upper bound of a byte range that maps to the
/// step at the same position. To map bytes 3-4 to S1 and byte 0x34 to S2:
/// ```text
/// ceilings: [3,    5,  0x34, 0x35, BYTE_CEILING]
/// steps:    [NONE, S1, NONE, S2,   NONE]
/// ```
/// Ceilings are strictly increasing and the last one is always
/// `BYTE_CEILING`, so every byte below the ceiling has exactly one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmallTable {
    ceilings: Vec<u8>,
    steps: Vec<StateId>,
    /// Epsilon transitions (taken without consuming a byte)
    epsilons: Vec<StateId>,
}

impl Default for SmallTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SmallTable {
    /// Create a table in which every byte is a dead end.
    pub fn new() -> Self {
        Self::with_default(StateId::NONE)
    }

    /// Create a table sending every byte, terminator included, to one state.
    pub fn with_default(default: StateId) -> Self {
        Self {
            ceilings: vec![BYTE_CEILING as u8],
            steps: vec![default],
            epsilons: Vec::new(),
        }
    }

    /// Create a table with a default step and specific byte-to-state mappings.
    ///
    /// `bytes` need not be sorted; a target of `StateId::NONE` carves a dead
    /// end out of the default.
    pub fn with_mappings(default: StateId, bytes: &[u8], targets: &[StateId]) -> Self {
        debug_assert_eq!(bytes.len(), targets.len());
        let mut unpacked = [default; BYTE_CEILING];
        for (&b, &t) in bytes.iter().zip(targets.iter()) {
            unpacked[b as usize] = t;
        }
        let mut table = Self::new();
        table.pack(&unpacked);
        table
    }

    /// The state reached on `byte`, or `StateId::NONE`.
    #[inline]
    pub fn step(&self, byte: u8) -> StateId {
        for (i, &ceiling) in self.ceilings.iter().enumerate() {
            if byte < ceiling {
                return self.steps[i];
            }
        }
        // Bytes at or above BYTE_CEILING never occur in a valid value.
        StateId::NONE
    }

    #[inline]
    pub fn ceilings(&self) -> &[u8] {
        &self.ceilings
    }

    #[inline]
    pub fn steps(&self) -> &[StateId] {
        &self.steps
    }

    #[inline]
    pub fn epsilons(&self) -> &[StateId] {
        &self.epsilons
    }

    /// Add an epsilon edge unless it is already present.
    pub fn add_epsilon(&mut self, target: StateId) {
        debug_assert!(!target.is_none(), "epsilon edge to NONE");
        if !self.epsilons.contains(&target) {
            self.epsilons.push(target);
        }
    }

    /// Unpack the compact representation into one slot per byte.
    pub fn unpack(&self) -> [StateId; BYTE_CEILING] {
        let mut result = [StateId::NONE; BYTE_CEILING];
        let mut unpacked_index = 0;
        for (packed_index, &ceiling) in self.ceilings.iter().enumerate() {
            let ceiling = ceiling as usize;
            while unpacked_index < ceiling {
                result[unpacked_index] = self.steps[packed_index];
                unpacked_index += 1;
            }
        }
        result
    }

    /// Pack an unpacked array back into ranges, merging runs of equal steps.
    pub fn pack(&mut self, unpacked: &[StateId; BYTE_CEILING]) {
        self.ceilings.clear();
        self.steps.clear();

        let mut current = unpacked[0];
        for (i, &state_id) in unpacked.iter().enumerate() {
            if state_id != current {
                self.ceilings.push(i as u8);
                self.steps.push(current);
                current = state_id;
            }
        }
        self.ceilings.push(BYTE_CEILING as u8);
        self.steps.push(current);

        debug_assert!(
            self.ceilings.windows(2).all(|w| w[0] < w[1]),
            "table ceilings must be strictly increasing"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(i: usize) -> StateId {
        StateId::from_index(i)
    }

    #[test]
    fn test_small_table_step() {
        let table = SmallTable::new();
        assert!(table.step(b'a').is_none());
        assert!(table.step(VALUE_TERMINATOR).is_none());
        assert!(table.epsilons().is_empty());
    }

    #[test]
    fn test_small_table_with_mappings() {
        let table = SmallTable::with_mappings(StateId::NONE, &[b'b', b'a'], &[id(1), id(0)]);

        assert_eq!(table.step(b'a'), id(0));
        assert_eq!(table.step(b'b'), id(1));
        assert!(table.step(b'c').is_none());
        assert!(table.step(0).is_none());
    }

    #[test]
    fn test_pack_example_layout() {
        let mut unpacked = [StateId::NONE; BYTE_CEILING];
        unpacked[3] = id(1);
        unpacked[4] = id(1);
        unpacked[0x34] = id(2);
        let mut table = SmallTable::new();
        table.pack(&unpacked);

        assert_eq!(table.ceilings(), &[3, 5, 0x34, 0x35, BYTE_CEILING as u8]);
        assert_eq!(
            table.steps(),
            &[StateId::NONE, id(1), StateId::NONE, id(2), StateId::NONE]
        );
    }

    #[test]
    fn test_unpack_pack_roundtrip_keeps_ranges() {
        let table = SmallTable::with_mappings(id(7), &[VALUE_TERMINATOR], &[StateId::NONE]);
        let mut copy = SmallTable::new();
        copy.pack(&table.unpack());
        assert_eq!(copy, table);
        assert_eq!(table.ceilings().len(), 2);
        assert_eq!(table.step(0), id(7));
        assert_eq!(table.step(0xF4), id(7));
        assert!(table.step(VALUE_TERMINATOR).is_none());
    }

    #[test]
    fn test_bytes_above_ceiling_are_dead() {
        let table = SmallTable::with_default(id(3));
        assert_eq!(table.step(VALUE_TERMINATOR), id(3));
        assert!(table.step(0xF6).is_none());
        assert!(table.step(0xFF).is_none());
    }

    #[test]
    fn test_epsilons_deduplicated() {
        let mut table = SmallTable::new();
        table.add_epsilon(id(1));
        table.add_epsilon(id(1));
        assert_eq!(table.epsilons(), &[id(1)]);
    }
}
