#![cfg(test)]

// Property tests for Index kept inside the crate so they can check the
// chain structure through `assert_consistent` after every step.

use crate::entry::Placement;
use crate::error::Error;
use crate::index::LongIndex;
use crate::options::Options;
use proptest::prelude::*;

const KEYS: i64 = 24;

#[derive(Clone, Debug)]
enum Op {
    Put(i64),
    PutAt(usize, i64),
    Append(i64),
    Insert(usize, i64),
    Replace(usize, i64),
    RemoveAt(usize),
    RemoveKey(i64),
    Vacate(usize),
    Rehash,
    Clear,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let key = 0..KEYS;
    let pos = 0usize..32;
    let op = prop_oneof![
        4 => key.clone().prop_map(Op::Put),
        2 => (pos.clone(), key.clone()).prop_map(|(p, k)| Op::PutAt(p, k)),
        3 => key.clone().prop_map(Op::Append),
        3 => (pos.clone(), key.clone()).prop_map(|(p, k)| Op::Insert(p, k)),
        2 => (pos.clone(), key.clone()).prop_map(|(p, k)| Op::Replace(p, k)),
        2 => pos.clone().prop_map(Op::RemoveAt),
        2 => key.clone().prop_map(Op::RemoveKey),
        1 => pos.prop_map(Op::Vacate),
        1 => Just(Op::Rehash),
        1 => Just(Op::Clear),
    ];
    proptest::collection::vec(op, 1..80)
}

// Property: the index agrees with a plain key column (`Vec<Option<i64>>`)
// after any operation sequence. Checked after each step:
// - every chain is well formed and every entry's position holds its key;
// - `key(pos)` matches the model at every position, holes included;
// - `lookup_list(k)` reports exactly the model positions of `k`;
// - `lookup(k)` is the head of `lookup_list(k)`.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_matches_key_column(ops in arb_ops()) {
        let mut sut = LongIndex::with_options(Options::new().capacity(3).load_factor(0.7)).unwrap();
        let mut model: Vec<Option<i64>> = Vec::new();

        for op in ops {
            let len = model.len();
            match op {
                Op::Put(k) => {
                    let found = sut.lookup(&k);
                    let res = sut.put(k).unwrap();
                    match found {
                        Some(at) => prop_assert_eq!(res, Placement::Existing(at)),
                        None => {
                            prop_assert_eq!(res, Placement::Created(len));
                            model.push(Some(k));
                        }
                    }
                }
                Op::PutAt(p, k) => {
                    let pos = p % (len + 2);
                    let found = sut.lookup(&k);
                    let res = sut.put_at(pos, k);
                    match (found, model.get(pos)) {
                        (Some(at), _) => prop_assert_eq!(res, Ok(Placement::Existing(at))),
                        (None, Some(Some(_))) => {
                            prop_assert_eq!(res, Err(Error::SlotOccupied { pos }))
                        }
                        (None, _) => {
                            prop_assert_eq!(res, Ok(Placement::Created(pos)));
                            if pos >= model.len() {
                                model.resize(pos + 1, None);
                            }
                            model[pos] = Some(k);
                        }
                    }
                }
                Op::Append(k) => {
                    prop_assert_eq!(sut.append(k), Ok(len));
                    model.push(Some(k));
                }
                Op::Insert(p, k) => {
                    let pos = p % (len + 1);
                    let found = sut.lookup_list(&k).into_iter().find(|&at| at <= pos);
                    let res = sut.insert(pos, k).unwrap();
                    match found {
                        Some(at) => prop_assert_eq!(res, Placement::Existing(at)),
                        None => {
                            prop_assert_eq!(res, Placement::Created(pos));
                            model.insert(pos, Some(k));
                        }
                    }
                }
                Op::Replace(p, k) => {
                    if len == 0 {
                        prop_assert!(sut.replace(p, k).is_err());
                    } else {
                        let pos = p % len;
                        prop_assert_eq!(sut.replace(pos, k), Ok(model[pos]));
                        model[pos] = Some(k);
                    }
                }
                Op::RemoveAt(p) => {
                    if len == 0 {
                        prop_assert_eq!(sut.remove_at(p), Err(Error::OutOfBounds { pos: p, len: 0 }));
                    } else {
                        let pos = p % len;
                        prop_assert_eq!(sut.remove_at(pos), Ok(model.remove(pos)));
                    }
                }
                Op::RemoveKey(k) => {
                    let found = sut.lookup(&k);
                    let res = sut.remove_key(&k);
                    prop_assert_eq!(res, found.map(|at| (at, k)));
                    if let Some(at) = found {
                        model.remove(at);
                    }
                }
                Op::Vacate(p) => {
                    if len > 0 {
                        let pos = p % len;
                        prop_assert_eq!(sut.vacate(pos), Ok(model[pos].take()));
                    }
                }
                Op::Rehash => {
                    let cap = sut.capacity();
                    sut.rehash();
                    prop_assert!(sut.capacity() > cap);
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
            }

            sut.assert_consistent();
            prop_assert_eq!(sut.positions(), model.len());
            prop_assert_eq!(sut.len(), model.iter().flatten().count());
            for (pos, k) in model.iter().enumerate() {
                prop_assert_eq!(sut.key(pos), k.as_ref());
            }
            for k in 0..KEYS {
                let mut seen = sut.lookup_list(&k);
                prop_assert_eq!(sut.lookup(&k), seen.first().copied());
                seen.sort_unstable();
                let expected: Vec<usize> = model
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| **m == Some(k))
                    .map(|(pos, _)| pos)
                    .collect();
                prop_assert_eq!(seen, expected);
            }
        }
    }
}
