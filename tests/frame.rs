// FrameMap integration suite.
//
// Invariants exercised:
// - Override precedence: a child row linked to a parent key takes that
//   key's merged slot; removing it lets the parent value show again.
// - Merged order: parent order first, child additions after.
// - Laziness: every read after a mutation sees a rebuilt view.
use hasharray::{FrameMap, FrameState, IntHashing, Slot};
use std::rc::Rc;

type Frame = FrameMap<String, i32>;

fn with_pairs(pairs: &[(&str, i32)]) -> Frame {
    let mut f = Frame::new();
    for (k, v) in pairs {
        f.put(k.to_string(), *v).unwrap();
    }
    f
}

// Test: child override precedence and restoration.
// Verifies: "a" reads the child value while overridden, the merged size
// counts "a" once, and the parent value returns after the child's removal.
#[test]
fn override_precedence() {
    let parent = Rc::new(with_pairs(&[("a", 1)]));
    let mut child = Frame::new();
    child.set_parent(parent.clone()).unwrap();
    child.put("a".to_string(), 2).unwrap();

    child.frame_init();
    assert_eq!(child.len(), 1);
    assert_eq!(child.get("a"), Some(&2));
    assert_eq!(
        child.slot(0),
        Some(Slot {
            parent: Some(0),
            child: Some(0)
        })
    );

    assert_eq!(child.remove("a"), Some(2));
    child.frame_init();
    assert_eq!(child.get("a"), Some(&1));
    assert_eq!(child.len(), 1);
    assert!(!child.is_override(0));
}

// Test: merged ordering.
// Verifies: parent entries keep parent order, additions follow in child order.
#[test]
fn merged_order_is_parent_then_additions() {
    let parent = Rc::new(with_pairs(&[("host", 1), ("port", 2), ("user", 3)]));
    let mut child = Frame::new();
    child.set_parent(parent).unwrap();
    child.put("timeout".to_string(), 30).unwrap();
    child.put("port".to_string(), 8080).unwrap();
    child.put("retries".to_string(), 5).unwrap();

    let merged: Vec<(&str, i32)> = child.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    assert_eq!(
        merged,
        vec![
            ("host", 1),
            ("port", 8080),
            ("user", 3),
            ("timeout", 30),
            ("retries", 5)
        ]
    );
    assert_eq!(child.frame_list().overrides(), 1);
    assert_eq!(child.index_of("retries"), Some(4));
    assert_eq!(child.frame_list().slot_of_child(0), Some(3));
}

// Test: reads never observe a stale view.
// Verifies: each mutation is visible to the very next read without an
// explicit frame_init.
#[test]
fn reads_rebuild_after_mutation() {
    let parent = Rc::new(with_pairs(&[("a", 1), ("b", 2)]));
    let mut child = Frame::new();
    child.set_parent(parent).unwrap();
    assert_eq!(child.len(), 2);
    assert_eq!(child.state(), FrameState::Valid);

    child.put("c".to_string(), 3).unwrap();
    assert_eq!(child.state(), FrameState::Stale);
    assert_eq!(child.len(), 3);

    child.child_mut().put("b".to_string(), 20).unwrap();
    // Written through the raw child: no link, so "b" is an addition.
    assert_eq!(child.len(), 4);
    assert_eq!(child.get("b"), Some(&20));
    assert_eq!(child.index_of("b"), Some(3));
}

// Test: a parent with many children.
// Verifies: siblings share one parent without seeing each other's rows.
#[test]
fn siblings_share_a_parent() {
    let parent = Rc::new(with_pairs(&[("a", 1)]));
    let mut left = Frame::new();
    let mut right = Frame::new();
    left.set_parent(parent.clone()).unwrap();
    right.set_parent(parent.clone()).unwrap();
    left.put("a".to_string(), 10).unwrap();
    right.put("b".to_string(), 20).unwrap();

    assert_eq!(left.get("a"), Some(&10));
    assert_eq!(right.get("a"), Some(&1));
    assert!(!left.contains_key("b"));
    assert_eq!(Rc::strong_count(&parent), 3);
}

// Test: integer-keyed frames.
// Verifies: the overlay works with any key kind.
#[test]
fn integer_keyed_frames() {
    let mut base: FrameMap<i64, &str, IntHashing> = FrameMap::new();
    base.put(1, "one").unwrap();
    base.put(2, "two").unwrap();
    let mut over: FrameMap<i64, &str, IntHashing> = FrameMap::new();
    over.set_parent(Rc::new(base)).unwrap();
    over.put(2, "deux").unwrap();
    let values: Vec<&str> = over.values().copied().collect();
    assert_eq!(values, vec!["one", "deux"]);
    assert_eq!(over.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
}

// Test: copy-on-write through a stacked frame whose view repeats a key.
// Verifies: for every merged position, `set_value(pos, v)` makes
// `value(pos) == v` and leaves every other position as it was.
#[test]
fn set_value_through_stacked_duplicates() {
    let root = Rc::new(with_pairs(&[("a", 1), ("b", 2)]));
    let mut mid = Frame::new();
    mid.set_parent(root).unwrap();
    // Unlinked, so "a" shows twice in the middle frame.
    mid.child_mut().append("a".to_string(), 5).unwrap();
    let mid = Rc::new(mid);
    assert_eq!(mid.values().copied().collect::<Vec<_>>(), vec![1, 2, 5]);
    assert_eq!(mid.positions_of("a"), vec![0, 2]);

    let before: Vec<i32> = mid.values().copied().collect();
    for pos in 0..before.len() {
        let mut leaf = Frame::new();
        leaf.set_parent(mid.clone()).unwrap();
        leaf.set_value(pos, 100).unwrap();
        let mut expected = before.clone();
        expected[pos] = 100;
        assert_eq!(leaf.values().copied().collect::<Vec<_>>(), expected);
    }

    let mut leaf = Frame::new();
    leaf.set_parent(mid.clone()).unwrap();
    for pos in (0..3).rev() {
        leaf.set_value(pos, 100 + pos as i32).unwrap();
    }
    assert_eq!(
        leaf.values().copied().collect::<Vec<_>>(),
        vec![100, 101, 102]
    );
    assert_eq!(leaf.frame_list().overrides(), 3);
    assert_eq!(mid.values().copied().collect::<Vec<_>>(), before);
}
