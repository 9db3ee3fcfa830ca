//! Property tests for the ordered-membership structure
//!
//! After any sequence of insert/remove operations the order must stay
//! duplicate-free and must agree exactly with the presence index.

use std::collections::HashSet;

use proptest::prelude::*;
use uuid::Uuid;
use verascope_domain::{CardId, OrderedMembers};

#[derive(Debug, Clone)]
enum Op {
    Insert(usize),
    Remove(usize),
}

fn op_strategy(pool: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..pool).prop_map(Op::Insert),
        (0..pool).prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn order_is_duplicate_free_and_matches_presence(
        ops in proptest::collection::vec(op_strategy(8), 0..64)
    ) {
        // small fixed id pool so inserts and removes collide often
        let pool: Vec<CardId> = (0..8).map(|_| Uuid::new_v4()).collect();
        let mut members = OrderedMembers::new();
        let mut model: Vec<CardId> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(i) => {
                    let id = pool[i];
                    if !model.contains(&id) {
                        model.push(id);
                    }
                    members.insert(id);
                }
                Op::Remove(i) => {
                    let id = pool[i];
                    model.retain(|c| *c != id);
                    members.remove(id);
                }
            }

            let seen: HashSet<CardId> = members.ids().iter().copied().collect();
            prop_assert_eq!(seen.len(), members.ids().len());
            prop_assert_eq!(members.ids(), &model[..]);
            for id in &pool {
                prop_assert_eq!(members.contains(*id), model.contains(id));
            }
        }
    }

    #[test]
    fn reorder_never_changes_the_member_set(
        n in 1usize..8,
        seed in any::<u64>(),
    ) {
        let ids: Vec<CardId> = (0..n).map(|_| Uuid::new_v4()).collect();
        let mut members = OrderedMembers::from_order(ids.clone());

        // cheap deterministic shuffle
        let mut shuffled = ids.clone();
        let mut state = seed;
        for i in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            shuffled.swap(i, (state as usize) % (i + 1));
        }

        members.reorder(shuffled.clone()).unwrap();
        let before: HashSet<CardId> = ids.into_iter().collect();
        let after: HashSet<CardId> = members.ids().iter().copied().collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(members.ids(), &shuffled[..]);
    }
}
