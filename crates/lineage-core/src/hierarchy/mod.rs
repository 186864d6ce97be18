//! Hierarchy assembly.
//!
//! Records reference their parent by contract number, not by identifier.
//! The builder stores records in an arena, decides every parent/child edge
//! explicitly, then exports immutable root trees.

mod arena;
mod builder;

use std::cmp::Ordering;

use crate::types::ContractRecord;

pub use arena::{NodeId, RecordArena};
pub use builder::{build, Hierarchy, HierarchyBuilder};

/// Fixed order for roots and siblings: type precedence, then title by byte order.
pub fn sibling_order(a: &ContractRecord, b: &ContractRecord) -> Ordering {
    a.contract_type
        .precedence()
        .cmp(&b.contract_type.precedence())
        .then_with(|| a.title.cmp(&b.title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContractType;

    #[test]
    fn test_type_precedence_dominates_title() {
        let sow = ContractRecord::new("s", ContractType::Sow, "Aaa");
        let msa = ContractRecord::new("m", ContractType::Msa, "Zzz");
        assert_eq!(sibling_order(&msa, &sow), Ordering::Less);
    }

    #[test]
    fn test_title_breaks_ties() {
        let a = ContractRecord::new("1", ContractType::ChangeOrder, "CO 10");
        let b = ContractRecord::new("2", ContractType::ChangeOrder, "CO 2");
        assert_eq!(sibling_order(&a, &b), Ordering::Less);
    }
}
