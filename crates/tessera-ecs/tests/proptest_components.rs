//! Property tests for type-erased component operations.
//!
//! Random sequences of registry operations run against an [`EntityStore`]
//! and a plain `HashMap` model; after every step the store and the model
//! must agree.

use std::collections::HashMap;

use proptest::prelude::*;
use tessera_ecs::prelude::*;

#[derive(Debug, Default, Clone, PartialEq)]
struct Score(i64);

#[derive(Debug, Clone)]
enum Op {
    Spawn,
    Despawn(usize),
    AssignDefault(usize),
    AssignCopy(usize, i64),
    AssignMove(usize, i64),
    ReplaceCopy(usize, i64),
    ReplaceMove(usize, i64),
    GetOrAssign(usize),
    Remove(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Spawn),
        1 => (0..16usize).prop_map(Op::Despawn),
        1 => (0..16usize).prop_map(Op::AssignDefault),
        1 => (0..16usize, -100i64..100).prop_map(|(i, v)| Op::AssignCopy(i, v)),
        1 => (0..16usize, -100i64..100).prop_map(|(i, v)| Op::AssignMove(i, v)),
        1 => (0..16usize, -100i64..100).prop_map(|(i, v)| Op::ReplaceCopy(i, v)),
        1 => (0..16usize, -100i64..100).prop_map(|(i, v)| Op::ReplaceMove(i, v)),
        1 => (0..16usize).prop_map(Op::GetOrAssign),
        1 => (0..16usize).prop_map(Op::Remove),
    ]
}

#[derive(Default)]
struct Model {
    /// Every entity ever spawned, alive or not.
    spawned: Vec<EntityId>,
    alive: HashMap<EntityId, Option<i64>>,
}

impl Model {
    fn pick(&self, i: usize) -> Option<EntityId> {
        if self.spawned.is_empty() {
            None
        } else {
            Some(self.spawned[i % self.spawned.len()])
        }
    }
}

fn score(value: &dyn std::any::Any) -> i64 {
    value.downcast_ref::<Score>().map(|s| s.0).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn erased_ops_agree_with_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut registry = ComponentRegistry::new();
        let id = registry.register(ComponentOps::<Score>::full("Score"));
        let mut store = EntityStore::new();
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Spawn => {
                    let e = store.spawn();
                    model.spawned.push(e);
                    model.alive.insert(e, None);
                }
                Op::Despawn(i) => {
                    let Some(e) = model.pick(i) else { continue };
                    let was_alive = model.alive.remove(&e).is_some();
                    prop_assert_eq!(store.despawn(e).is_ok(), was_alive);
                }
                Op::AssignDefault(i) | Op::GetOrAssign(i) | Op::AssignCopy(i, _) | Op::AssignMove(i, _)
                    if model.pick(i).is_none() => {}
                Op::AssignDefault(i) => {
                    let e = model.pick(i).unwrap();
                    let result = registry.assign_default(&mut store, id, e).map(|v| score(v));
                    match model.alive.get_mut(&e) {
                        Some(slot) => {
                            prop_assert_eq!(result.ok(), Some(0));
                            *slot = Some(0);
                        }
                        None => prop_assert!(result.is_err()),
                    }
                }
                Op::AssignCopy(i, v) | Op::AssignMove(i, v) => {
                    let e = model.pick(i).unwrap();
                    let result = if matches!(op, Op::AssignCopy(..)) {
                        registry.assign_copy(&mut store, id, e, &Score(v))
                    } else {
                        registry.assign_move(&mut store, id, e, Box::new(Score(v)))
                    }
                    .map(|r| score(r));
                    match model.alive.get_mut(&e) {
                        Some(slot) => {
                            prop_assert_eq!(result.ok(), Some(v));
                            *slot = Some(v);
                        }
                        None => prop_assert!(matches!(result, Err(EcsError::StaleEntity(_)))),
                    }
                }
                Op::ReplaceCopy(i, v) | Op::ReplaceMove(i, v) => {
                    let Some(e) = model.pick(i) else { continue };
                    let result = if matches!(op, Op::ReplaceCopy(..)) {
                        registry.replace_copy(&mut store, id, e, &Score(v))
                    } else {
                        registry.replace_move(&mut store, id, e, Box::new(Score(v)))
                    };
                    match (model.alive.get_mut(&e), result) {
                        (Some(Some(current)), Ok(r)) => {
                            prop_assert_eq!(score(r), v);
                            *current = v;
                        }
                        (Some(None), Err(EcsError::MissingComponent { .. })) => {}
                        (None, Err(EcsError::StaleEntity(_))) => {}
                        (expected, got) => {
                            prop_assert!(false, "model {:?} but store returned {:?}", expected, got.map(|r| score(r)));
                        }
                    }
                }
                Op::GetOrAssign(i) => {
                    let e = model.pick(i).unwrap();
                    let result = registry.get_or_assign(&mut store, id, e).map(|v| score(v));
                    match model.alive.get_mut(&e) {
                        Some(slot) => {
                            let expected = slot.unwrap_or(0);
                            prop_assert_eq!(result.ok(), Some(expected));
                            *slot = Some(expected);
                        }
                        None => prop_assert!(result.is_err()),
                    }
                }
                Op::Remove(i) => {
                    let Some(e) = model.pick(i) else { continue };
                    let expected = matches!(model.alive.get(&e), Some(Some(_)));
                    prop_assert_eq!(registry.remove(&mut store, id, e), expected);
                    if let Some(slot) = model.alive.get_mut(&e) {
                        *slot = None;
                    }
                }
            }

            // Store and model agree on every entity ever spawned.
            for &e in &model.spawned {
                let expected = model.alive.get(&e).copied().flatten();
                prop_assert_eq!(registry.has(&store, id, e), expected.is_some());
                prop_assert_eq!(registry.get(&store, id, e).map(score), expected);
            }
            prop_assert_eq!(store.entity_count(), model.alive.len());
            prop_assert_eq!(store.count::<Score>(), model.alive.values().filter(|v| v.is_some()).count());
        }
    }
}
