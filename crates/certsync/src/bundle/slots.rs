//! Slot table
//!
//! Which logical parts each slot kind holds and which sub-slice of the
//! encoded `[key, leaf, intermediates...]` block list it stores. Writing,
//! the should-have predicates and need-sync detection all iterate this table.

use pem::Pem;

use certsync_config::SlotKind;

/// Logical part of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    PrivateKey,
    Certificate,
    Intermediates,
}

impl std::fmt::Display for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Part::PrivateKey => "private key",
            Part::Certificate => "certificate",
            Part::Intermediates => "intermediates",
        })
    }
}

/// Sub-slice of the encoded block list a slot stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    KeyAndChain,
    Key,
    Leaf,
    Chain,
    KeyAndLeaf,
    Intermediates,
}

impl Selection {
    /// Select from `blocks`, which must be `[key, leaf, intermediates...]`.
    pub fn apply(self, blocks: &[Pem]) -> &[Pem] {
        let end = blocks.len();
        let range = match self {
            Selection::KeyAndChain => 0..end,
            Selection::Key => 0..1.min(end),
            Selection::Leaf => 1.min(end)..2.min(end),
            Selection::Chain => 1.min(end)..end,
            Selection::KeyAndLeaf => 0..2.min(end),
            Selection::Intermediates => 2.min(end)..end,
        };
        &blocks[range]
    }
}

pub struct SlotLayout {
    pub kind: SlotKind,
    pub parts: &'static [Part],
    pub selection: Selection,
}

impl SlotLayout {
    pub fn holds(&self, part: Part) -> bool {
        self.parts.contains(&part)
    }
}

/// One entry per slot kind, in write order.
pub const SLOT_TABLE: [SlotLayout; 7] = [
    SlotLayout {
        kind: SlotKind::AllInOne,
        parts: &[Part::PrivateKey, Part::Certificate, Part::Intermediates],
        selection: Selection::KeyAndChain,
    },
    SlotLayout {
        kind: SlotKind::PrivateKey,
        parts: &[Part::PrivateKey],
        selection: Selection::Key,
    },
    SlotLayout {
        kind: SlotKind::Certificate,
        parts: &[Part::Certificate],
        selection: Selection::Leaf,
    },
    SlotLayout {
        kind: SlotKind::CertificateChain,
        parts: &[Part::Certificate, Part::Intermediates],
        selection: Selection::Chain,
    },
    SlotLayout {
        kind: SlotKind::PrivateKeyAndCertificate,
        parts: &[Part::PrivateKey, Part::Certificate],
        selection: Selection::KeyAndLeaf,
    },
    SlotLayout {
        kind: SlotKind::Intermediate,
        parts: &[Part::Intermediates],
        selection: Selection::Intermediates,
    },
    SlotLayout {
        kind: SlotKind::IntermediatePattern,
        parts: &[Part::Intermediates],
        selection: Selection::Intermediates,
    },
];

pub fn layout(kind: SlotKind) -> &'static SlotLayout {
    // SLOT_TABLE lists every SlotKind in declaration order.
    &SLOT_TABLE[kind as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(n: usize) -> Vec<Pem> {
        (0..n).map(|i| Pem::new(format!("BLOCK {}", i), vec![i as u8])).collect()
    }

    fn tags(selected: &[Pem]) -> Vec<String> {
        selected.iter().map(|b| b.tag().to_string()).collect()
    }

    #[test]
    fn test_table_covers_every_kind_in_order() {
        for kind in SlotKind::ALL {
            assert_eq!(layout(kind).kind, kind);
        }
    }

    #[test]
    fn test_selections_of_full_chain() {
        let all = blocks(4);
        assert_eq!(tags(Selection::KeyAndChain.apply(&all)).len(), 4);
        assert_eq!(tags(Selection::Key.apply(&all)), ["BLOCK 0"]);
        assert_eq!(tags(Selection::Leaf.apply(&all)), ["BLOCK 1"]);
        assert_eq!(tags(Selection::Chain.apply(&all)), ["BLOCK 1", "BLOCK 2", "BLOCK 3"]);
        assert_eq!(tags(Selection::KeyAndLeaf.apply(&all)), ["BLOCK 0", "BLOCK 1"]);
        assert_eq!(tags(Selection::Intermediates.apply(&all)), ["BLOCK 2", "BLOCK 3"]);
    }

    #[test]
    fn test_leaf_only_chain_has_no_intermediates() {
        let all = blocks(2);
        assert!(Selection::Intermediates.apply(&all).is_empty());
        assert_eq!(tags(Selection::Chain.apply(&all)), ["BLOCK 1"]);
    }
}
